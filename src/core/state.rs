// Application state (AppState)

use crate::core::config::Config;
use crate::stores::{note_store::NoteStore, user_store::UserStore};
use crate::wal::wal::Wal;
use std::sync::Arc;

/// Shared application state
///
/// Contains all shared components that are accessed by request handlers.
/// All fields are wrapped in Arc for efficient cloning across threads.
#[derive(Clone)]
pub struct AppState {
    /// User collection
    pub user_store: Arc<UserStore>,

    /// Note collection
    pub note_store: Arc<NoteStore>,

    /// Write-ahead log for persistence
    pub wal: Arc<Wal>,

    /// Configuration
    pub config: Arc<Config>,
}

impl AppState {
    pub fn new(config: Config, wal: Wal) -> Self {
        Self {
            user_store: Arc::new(UserStore::new()),
            note_store: Arc::new(NoteStore::new()),
            wal: Arc::new(wal),
            config: Arc::new(config),
        }
    }
}
