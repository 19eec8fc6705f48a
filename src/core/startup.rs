use crate::core::state::AppState;
use crate::wal::wal::WalOperation;
use anyhow::Result;

// Runs at boot time: folds the replayed log back into the stores. Puts
// carry full records, so applying them in order is last-write-wins.
pub fn apply_wal_operations(state: &AppState, operations: &[WalOperation]) -> Result<()> {
    for op in operations {
        match op {
            WalOperation::PutUser { user } => {
                state.user_store.restore(user.clone());
            }
            WalOperation::RemoveUser { id } => {
                state.user_store.remove(*id);
            }
            WalOperation::PutNote { note } => {
                state.note_store.restore(note.clone());
            }
            WalOperation::RemoveNote { id } => {
                state.note_store.remove(*id);
            }
        }
    }
    Ok(())
}
