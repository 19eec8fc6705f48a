use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A stored note record, always owned by exactly one user
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Note {
    /// System-generated identifier
    pub id: Uuid,
    /// Owning user's identifier
    pub user: Uuid,
    pub title: String,
    pub text: String,
    pub completed: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// Internal revision counter, bumped on every update
    pub version: u64,
}

impl Note {
    pub fn new(user: Uuid, title: String, text: String, completed: bool) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            user,
            title,
            text,
            completed,
            created_at: now,
            updated_at: now,
            version: 0,
        }
    }

    /// A copy with the mutable fields replaced; owner and `created_at`
    /// never change.
    pub fn with_update(&self, title: String, text: String, completed: bool) -> Self {
        Self {
            id: self.id,
            user: self.user,
            title,
            text,
            completed,
            created_at: self.created_at,
            updated_at: Utc::now(),
            version: self.version + 1,
        }
    }
}

/// Wire projection of a note: the owner reference and the revision counter
/// stay internal.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NoteView {
    pub id: Uuid,
    pub title: String,
    pub text: String,
    pub completed: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<&Note> for NoteView {
    fn from(note: &Note) -> Self {
        Self {
            id: note.id,
            title: note.title.clone(),
            text: note.text.clone(),
            completed: note.completed,
            created_at: note.created_at,
            updated_at: note.updated_at,
        }
    }
}
