use crate::core::error::StoreError;
use crate::models::user::User;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::sync::Arc;
use uuid::Uuid;

/// In-memory user collection.
///
/// Username uniqueness is enforced here, not by the callers: the username
/// index entry is claimed while the record is written, so two concurrent
/// inserts (or renames) to the same name cannot both succeed.
pub struct UserStore {
    users: DashMap<Uuid, Arc<User>>,
    username_index: DashMap<String, Uuid>,
}

impl UserStore {
    pub fn new() -> Self {
        Self {
            users: DashMap::new(),
            username_index: DashMap::new(),
        }
    }

    /// Add a new user. Fails if the username is already claimed.
    pub fn insert(&self, user: User) -> Result<(), StoreError> {
        match self.username_index.entry(user.username.clone()) {
            Entry::Occupied(_) => Err(StoreError::UsernameTaken),
            Entry::Vacant(slot) => {
                slot.insert(user.id);
                self.users.insert(user.id, Arc::new(user));
                Ok(())
            }
        }
    }

    /// Replace an existing user record. A rename claims the new username
    /// before releasing the old one; renaming onto another user's name
    /// fails, renaming onto your own is a no-op.
    pub fn update(&self, updated: User) -> Result<(), StoreError> {
        let old = self
            .users
            .get(&updated.id)
            .map(|entry| Arc::clone(entry.value()))
            .ok_or(StoreError::UserNotFound)?;

        if old.username != updated.username {
            match self.username_index.entry(updated.username.clone()) {
                Entry::Occupied(entry) if *entry.get() != updated.id => {
                    return Err(StoreError::UsernameTaken);
                }
                Entry::Occupied(_) => {}
                Entry::Vacant(slot) => {
                    slot.insert(updated.id);
                }
            }
            self.username_index
                .remove_if(&old.username, |_, owner| *owner == updated.id);
        }

        self.users.insert(updated.id, Arc::new(updated));
        Ok(())
    }

    /// Remove a user by id, releasing their username.
    /// Returns the removed record if it existed.
    pub fn remove(&self, id: Uuid) -> Option<Arc<User>> {
        let (_, user) = self.users.remove(&id)?;
        self.username_index
            .remove_if(&user.username, |_, owner| *owner == id);
        Some(user)
    }

    pub fn get(&self, id: Uuid) -> Option<Arc<User>> {
        self.users.get(&id).map(|entry| Arc::clone(entry.value()))
    }

    pub fn contains(&self, id: Uuid) -> bool {
        self.users.contains_key(&id)
    }

    pub fn find_by_username(&self, username: &str) -> Option<Arc<User>> {
        let id = {
            let entry = self.username_index.get(username)?;
            *entry.value()
        };
        self.get(id)
    }

    /// All users in creation order.
    pub fn list(&self) -> Vec<Arc<User>> {
        let mut users: Vec<Arc<User>> = self
            .users
            .iter()
            .map(|entry| Arc::clone(entry.value()))
            .collect();
        users.sort_by_key(|user| (user.created_at, user.id));
        users
    }

    /// Put a record back during log replay, overwriting any previous
    /// revision and fixing the username index if the name changed.
    pub fn restore(&self, user: User) {
        if let Some(prev) = self.users.get(&user.id).map(|entry| Arc::clone(entry.value())) {
            if prev.username != user.username {
                self.username_index
                    .remove_if(&prev.username, |_, owner| *owner == user.id);
            }
        }
        self.username_index.insert(user.username.clone(), user.id);
        self.users.insert(user.id, Arc::new(user));
    }

    pub fn len(&self) -> usize {
        self.users.len()
    }

    pub fn is_empty(&self) -> bool {
        self.users.is_empty()
    }
}

impl Default for UserStore {
    fn default() -> Self {
        Self::new()
    }
}
