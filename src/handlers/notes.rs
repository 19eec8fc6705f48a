use crate::core::error::ApiError;
use crate::core::response::{created_with_content, no_content, ok_with_content};
use crate::core::state::AppState;
use crate::models::note::{Note, NoteView};
use crate::validation::payload::{CreateNotePayload, UpdateNotePayload};
use crate::wal::wal::WalOperation;
use axum::{
    extract::{rejection::JsonRejection, Path, State},
    response::Response,
    Json,
};
use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;

/// Resolve the owner segment of the path to an existing user.
fn resolve_owner(state: &AppState, raw: &str) -> Result<Uuid, ApiError> {
    Uuid::parse_str(raw)
        .ok()
        .filter(|id| state.user_store.contains(*id))
        .ok_or(ApiError::UserNotFound)
}

/// Resolve a note id within its owner's scope. A note under a different
/// owner is as absent as one that doesn't exist.
fn resolve_note(state: &AppState, owner: Uuid, raw: &str) -> Result<Arc<Note>, ApiError> {
    Uuid::parse_str(raw)
        .ok()
        .and_then(|id| state.note_store.get(id))
        .filter(|note| note.user == owner)
        .ok_or(ApiError::NoteNotFound)
}

/// Get all notes for a user
///
/// GET /users/{id}/notes
pub async fn list_notes_handler(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Response, ApiError> {
    let owner = resolve_owner(&state, &id)?;

    let notes: Vec<NoteView> = state
        .note_store
        .list_for_user(owner)
        .iter()
        .map(|note| NoteView::from(note.as_ref()))
        .collect();

    Ok(ok_with_content(notes))
}

/// Create a note for a user
///
/// POST /users/{id}/notes
pub async fn create_note_handler(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    payload: Result<Json<CreateNotePayload>, JsonRejection>,
) -> Result<Response, ApiError> {
    let Json(payload) = payload?;

    // Owner resolution comes before field validation
    let owner = resolve_owner(&state, &id)?;
    let valid = payload.validate()?;

    let note = Note::new(owner, valid.title, valid.text, valid.completed);

    // The store re-checks the owner while holding their index entry, so a
    // concurrent user delete cannot leave this note orphaned
    if let Err(e) = state
        .note_store
        .insert(note.clone(), || state.user_store.contains(owner))
    {
        warn!(user_id = %owner, "Note owner vanished during create");
        return Err(e.into());
    }

    if let Err(e) = state.wal.log_operation(WalOperation::PutNote { note: note.clone() }) {
        warn!(error = %e, "Failed to log note create to WAL");
        // Continue anyway - store is updated
    }

    info!(note_id = %note.id, user_id = %owner, "Note created");

    Ok(created_with_content(NoteView::from(&note)))
}

/// Update a user's note
///
/// PATCH /users/{user_id}/notes/{note_id}
pub async fn update_note_handler(
    State(state): State<Arc<AppState>>,
    Path((user_id, note_id)): Path<(String, String)>,
    payload: Result<Json<UpdateNotePayload>, JsonRejection>,
) -> Result<Response, ApiError> {
    let Json(payload) = payload?;

    let owner = resolve_owner(&state, &user_id)?;
    let valid = payload.validate()?;
    let note = resolve_note(&state, owner, &note_id)?;

    let updated = note.with_update(valid.title, valid.text, valid.completed);
    state.note_store.update(updated.clone())?;

    if let Err(e) = state.wal.log_operation(WalOperation::PutNote {
        note: updated.clone(),
    }) {
        warn!(error = %e, "Failed to log note update to WAL");
        // Continue anyway - store is updated
    }

    info!(note_id = %updated.id, user_id = %owner, "Note updated");

    Ok(ok_with_content(NoteView::from(&updated)))
}

/// Delete a user's note
///
/// DELETE /users/{user_id}/notes/{note_id}
pub async fn delete_note_handler(
    State(state): State<Arc<AppState>>,
    Path((user_id, note_id)): Path<(String, String)>,
) -> Result<Response, ApiError> {
    let owner = resolve_owner(&state, &user_id)?;
    let note = resolve_note(&state, owner, &note_id)?;

    if let Some(removed) = state.note_store.remove(note.id) {
        if let Err(e) = state
            .wal
            .log_operation(WalOperation::RemoveNote { id: removed.id })
        {
            warn!(error = %e, "Failed to log note delete to WAL");
            // Continue anyway - store is updated
        }

        info!(note_id = %removed.id, user_id = %owner, "Note deleted");
    }

    Ok(no_content())
}
