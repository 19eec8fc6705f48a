use crate::core::error::StoreError;
use crate::models::note::Note;
use dashmap::DashMap;
use std::sync::Arc;
use uuid::Uuid;

/// In-memory note collection with an owner index.
///
/// The owner index entry doubles as the coordination point between "create
/// a note for this user" and "delete this user unless they own notes":
/// both paths hold the entry across their check and their write, so one of
/// the two always observes the other's outcome.
pub struct NoteStore {
    notes: DashMap<Uuid, Arc<Note>>,
    by_user: DashMap<Uuid, Vec<Uuid>>,
}

impl NoteStore {
    pub fn new() -> Self {
        Self {
            notes: DashMap::new(),
            by_user: DashMap::new(),
        }
    }

    /// Add a note for an owner. `owner_exists` is re-checked while the
    /// owner's index entry is held, so an owner deleted concurrently via
    /// `remove_owner_if_empty` is observed here.
    pub fn insert<F>(&self, note: Note, owner_exists: F) -> Result<(), StoreError>
    where
        F: FnOnce() -> bool,
    {
        let mut owned = self.by_user.entry(note.user).or_default();
        if !owner_exists() {
            drop(owned);
            self.by_user.remove_if(&note.user, |_, ids| ids.is_empty());
            return Err(StoreError::UserNotFound);
        }

        owned.push(note.id);
        drop(owned);
        self.notes.insert(note.id, Arc::new(note));
        Ok(())
    }

    /// Run `remove_user` while `user` owns no notes, holding the owner
    /// index entry so a concurrent insert for the same owner cannot slip
    /// between the emptiness check and the removal.
    pub fn remove_owner_if_empty<T, F>(&self, user: Uuid, remove_user: F) -> Result<T, StoreError>
    where
        F: FnOnce() -> T,
    {
        let owned = self.by_user.entry(user).or_default();
        if !owned.is_empty() {
            return Err(StoreError::UserHasNotes);
        }

        let result = remove_user();
        drop(owned);
        self.by_user.remove_if(&user, |_, ids| ids.is_empty());
        Ok(result)
    }

    pub fn get(&self, id: Uuid) -> Option<Arc<Note>> {
        self.notes.get(&id).map(|entry| Arc::clone(entry.value()))
    }

    /// Replace an existing note record.
    pub fn update(&self, note: Note) -> Result<(), StoreError> {
        match self.notes.entry(note.id) {
            dashmap::mapref::entry::Entry::Occupied(mut slot) => {
                slot.insert(Arc::new(note));
                Ok(())
            }
            dashmap::mapref::entry::Entry::Vacant(_) => Err(StoreError::NoteNotFound),
        }
    }

    /// Remove a note by id, shrinking its owner's index entry.
    /// Returns the removed record if it existed.
    pub fn remove(&self, id: Uuid) -> Option<Arc<Note>> {
        let (_, note) = self.notes.remove(&id)?;
        if let Some(mut owned) = self.by_user.get_mut(&note.user) {
            owned.retain(|candidate| *candidate != id);
        }
        self.by_user.remove_if(&note.user, |_, ids| ids.is_empty());
        Some(note)
    }

    /// A user's notes in creation order.
    pub fn list_for_user(&self, user: Uuid) -> Vec<Arc<Note>> {
        let ids: Vec<Uuid> = match self.by_user.get(&user) {
            Some(entry) => entry.value().clone(),
            None => return Vec::new(),
        };

        let mut notes: Vec<Arc<Note>> = ids.into_iter().filter_map(|id| self.get(id)).collect();
        notes.sort_by_key(|note| (note.created_at, note.id));
        notes
    }

    /// Put a record back during log replay, overwriting any previous
    /// revision.
    pub fn restore(&self, note: Note) {
        let mut owned = self.by_user.entry(note.user).or_default();
        if !owned.contains(&note.id) {
            owned.push(note.id);
        }
        drop(owned);
        self.notes.insert(note.id, Arc::new(note));
    }

    pub fn len(&self) -> usize {
        self.notes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.notes.is_empty()
    }
}

impl Default for NoteStore {
    fn default() -> Self {
        Self::new()
    }
}
