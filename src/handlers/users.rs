use crate::core::error::ApiError;
use crate::core::response::{created_with_content, no_content, ok_with_content};
use crate::core::state::AppState;
use crate::models::user::{User, UserView};
use crate::validation::payload::{CreateUserPayload, UpdateUserPayload};
use crate::wal::wal::WalOperation;
use anyhow::Context;
use axum::{
    extract::{rejection::JsonRejection, Path, State},
    response::Response,
    Json,
};
use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;

/// bcrypt cost factor for stored passwords
const PASSWORD_HASH_COST: u32 = 10;

/// An identifier that doesn't parse resolves to no user, same as an
/// unknown one.
fn parse_id(raw: &str) -> Option<Uuid> {
    Uuid::parse_str(raw).ok()
}

/// bcrypt is deliberately slow; run it off the async worker threads.
async fn hash_password(password: String) -> Result<String, ApiError> {
    let hash = tokio::task::spawn_blocking(move || bcrypt::hash(password, PASSWORD_HASH_COST))
        .await
        .context("Password hashing task failed")?
        .context("Failed to hash password")?;
    Ok(hash)
}

/// Get all users
///
/// GET /users
pub async fn list_users_handler(
    State(state): State<Arc<AppState>>,
) -> Result<Response, ApiError> {
    let users: Vec<UserView> = state
        .user_store
        .list()
        .iter()
        .map(|user| UserView::from(user.as_ref()))
        .collect();

    // No users is an empty listing, not an error
    Ok(ok_with_content(users))
}

/// Get a single user
///
/// GET /users/{id}
pub async fn get_user_handler(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Response, ApiError> {
    let user = parse_id(&id)
        .and_then(|id| state.user_store.get(id))
        .ok_or(ApiError::UserNotFound)?;

    Ok(ok_with_content(UserView::from(user.as_ref())))
}

/// Create a new user
///
/// POST /users
pub async fn create_user_handler(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<CreateUserPayload>, JsonRejection>,
) -> Result<Response, ApiError> {
    let Json(payload) = payload?;
    let valid = payload.validate()?;

    let password_hash = hash_password(valid.password).await?;
    let user = User::new(valid.username, password_hash, valid.roles);

    // The store holds the username index entry across the check and the
    // write, so concurrent creates of the same name cannot both land
    if let Err(e) = state.user_store.insert(user.clone()) {
        warn!(username = %user.username, "Rejected duplicate username");
        return Err(e.into());
    }

    if let Err(e) = state.wal.log_operation(WalOperation::PutUser { user: user.clone() }) {
        warn!(error = %e, "Failed to log user create to WAL");
        // Continue anyway - store is updated
    }

    info!(user_id = %user.id, username = %user.username, "User created");

    Ok(created_with_content(UserView::from(&user)))
}

/// Update a user
///
/// PATCH /users/{id}
pub async fn update_user_handler(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    payload: Result<Json<UpdateUserPayload>, JsonRejection>,
) -> Result<Response, ApiError> {
    let Json(payload) = payload?;
    let valid = payload.validate()?;

    let existing = parse_id(&id)
        .and_then(|id| state.user_store.get(id))
        .ok_or(ApiError::UserNotFound)?;

    // Refuse renames onto another user before paying for the hash; the
    // store repeats this check atomically below
    if let Some(other) = state.user_store.find_by_username(&valid.username) {
        if other.id != existing.id {
            warn!(username = %valid.username, "Rejected rename to taken username");
            return Err(ApiError::UsernameTaken);
        }
    }

    let password_hash = match valid.password {
        Some(password) => hash_password(password).await?,
        None => existing.password_hash.clone(),
    };

    let updated = existing.with_update(valid.username, password_hash, valid.roles, valid.active);
    state.user_store.update(updated.clone())?;

    if let Err(e) = state.wal.log_operation(WalOperation::PutUser {
        user: updated.clone(),
    }) {
        warn!(error = %e, "Failed to log user update to WAL");
        // Continue anyway - store is updated
    }

    info!(user_id = %updated.id, username = %updated.username, "User updated");

    Ok(ok_with_content(UserView::from(&updated)))
}

/// Delete a user
///
/// DELETE /users/{id}
///
/// Deleting an unknown user is a no-op; deleting a user who still owns
/// notes is refused.
pub async fn delete_user_handler(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Response, ApiError> {
    let Some(user_id) = parse_id(&id) else {
        return Ok(no_content());
    };

    // The note store holds the owner index entry across the emptiness
    // check and the removal, so a concurrent note create cannot orphan
    // itself
    let removed = match state
        .note_store
        .remove_owner_if_empty(user_id, || state.user_store.remove(user_id))
    {
        Ok(removed) => removed,
        Err(e) => {
            warn!(user_id = %user_id, "Refused to delete user with assigned notes");
            return Err(e.into());
        }
    };

    if let Some(user) = removed {
        if let Err(e) = state.wal.log_operation(WalOperation::RemoveUser { id: user.id }) {
            warn!(error = %e, "Failed to log user delete to WAL");
            // Continue anyway - store is updated
        }

        info!(user_id = %user.id, username = %user.username, "User deleted");
    }

    Ok(no_content())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::Config;
    use crate::models::note::Note;
    use crate::wal::wal::Wal;
    use axum::http::StatusCode;
    use axum::response::IntoResponse;
    use http_body_util::BodyExt;
    use serde_json::json;
    use tempfile::TempDir;

    fn create_test_state() -> Arc<AppState> {
        let temp_dir = TempDir::new().unwrap();
        let wal = Wal::new(temp_dir.path().join("test.wal")).unwrap();
        Arc::new(AppState::new(Config::default(), wal))
    }

    fn create_payload(username: &str) -> CreateUserPayload {
        CreateUserPayload {
            username: Some(username.to_string()),
            password: Some("1234".to_string()),
            roles: Some(json!(["User"])),
        }
    }

    fn update_payload(username: &str) -> UpdateUserPayload {
        UpdateUserPayload {
            username: Some(username.to_string()),
            password: None,
            roles: Some(json!(["User"])),
            active: Some(json!(true)),
        }
    }

    async fn response_json(response: Response) -> serde_json::Value {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    async fn create_user(state: &Arc<AppState>, username: &str) -> serde_json::Value {
        let response =
            create_user_handler(State(Arc::clone(state)), Ok(Json(create_payload(username))))
                .await
                .unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);
        response_json(response).await
    }

    #[tokio::test]
    async fn test_list_users_empty_is_ok() {
        let state = create_test_state();

        let response = list_users_handler(State(state)).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = response_json(response).await;
        assert_eq!(body, json!([]));
    }

    #[tokio::test]
    async fn test_create_user_success() {
        let state = create_test_state();

        let body = create_user(&state, "hank").await;

        assert_eq!(body["username"], "hank");
        assert_eq!(body["roles"], json!(["User"]));
        assert_eq!(body["active"], true);
        assert_eq!(body["createdAt"], body["updatedAt"]);
        assert!(body.get("id").is_some());
        // The projection never carries the hash or the revision marker
        assert!(body.get("password").is_none());
        assert!(body.get("passwordHash").is_none());
        assert!(body.get("version").is_none());
    }

    #[tokio::test]
    async fn test_create_user_stores_hash_not_password() {
        let state = create_test_state();

        let body = create_user(&state, "hank").await;
        let id = Uuid::parse_str(body["id"].as_str().unwrap()).unwrap();

        let stored = state.user_store.get(id).unwrap();
        assert_ne!(stored.password_hash, "1234");
        assert!(bcrypt::verify("1234", &stored.password_hash).unwrap());
    }

    #[tokio::test]
    async fn test_create_user_duplicate_username_conflicts() {
        let state = create_test_state();
        create_user(&state, "hank").await;

        let result =
            create_user_handler(State(Arc::clone(&state)), Ok(Json(create_payload("hank")))).await;

        let response = result.unwrap_err().into_response();
        assert_eq!(response.status(), StatusCode::CONFLICT);
        let body = response_json(response).await;
        assert_eq!(body["message"], "Username already taken.");
    }

    #[tokio::test]
    async fn test_create_user_empty_roles_rejected() {
        let state = create_test_state();

        let mut payload = create_payload("hank");
        payload.roles = Some(json!([]));

        let result = create_user_handler(State(state), Ok(Json(payload))).await;
        let response = result.unwrap_err().into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = response_json(response).await;
        assert_eq!(body["message"], "All fields are required.");
    }

    #[tokio::test]
    async fn test_create_user_roles_not_a_list_rejected() {
        let state = create_test_state();

        let mut payload = create_payload("hank");
        payload.roles = Some(json!("foo"));

        let result = create_user_handler(State(state), Ok(Json(payload))).await;
        let response = result.unwrap_err().into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_get_user_round_trip() {
        let state = create_test_state();
        let created = create_user(&state, "hank").await;

        let response = get_user_handler(
            State(Arc::clone(&state)),
            Path(created["id"].as_str().unwrap().to_string()),
        )
        .await
        .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = response_json(response).await;
        assert_eq!(body, created);
    }

    #[tokio::test]
    async fn test_get_user_missing_is_not_found() {
        let state = create_test_state();

        let result = get_user_handler(State(state), Path(Uuid::new_v4().to_string())).await;
        let response = result.unwrap_err().into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        let body = response_json(response).await;
        assert_eq!(body["message"], "User not found.");
    }

    #[tokio::test]
    async fn test_get_user_unparseable_id_is_not_found() {
        let state = create_test_state();

        let result = get_user_handler(State(state), Path("not-a-uuid".to_string())).await;
        let response = result.unwrap_err().into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_update_user_missing_is_not_found() {
        let state = create_test_state();

        let result = update_user_handler(
            State(state),
            Path(Uuid::new_v4().to_string()),
            Ok(Json(update_payload("hank"))),
        )
        .await;

        let response = result.unwrap_err().into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        let body = response_json(response).await;
        assert_eq!(body["message"], "User not found.");
    }

    #[tokio::test]
    async fn test_update_user_changes_updated_at() {
        let state = create_test_state();
        let created = create_user(&state, "hank").await;
        let id = created["id"].as_str().unwrap().to_string();

        let mut payload = update_payload("hank");
        payload.roles = Some(json!(["Admin"]));

        let response = update_user_handler(State(Arc::clone(&state)), Path(id), Ok(Json(payload)))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = response_json(response).await;
        assert_eq!(body["roles"], json!(["Admin"]));
        assert_eq!(body["createdAt"], created["createdAt"]);
        assert_ne!(body["updatedAt"], created["updatedAt"]);
    }

    #[tokio::test]
    async fn test_update_user_rename_to_taken_name_conflicts() {
        let state = create_test_state();
        create_user(&state, "hank").await;
        let dale = create_user(&state, "dale").await;

        let result = update_user_handler(
            State(Arc::clone(&state)),
            Path(dale["id"].as_str().unwrap().to_string()),
            Ok(Json(update_payload("hank"))),
        )
        .await;

        let response = result.unwrap_err().into_response();
        assert_eq!(response.status(), StatusCode::CONFLICT);
        let body = response_json(response).await;
        assert_eq!(body["message"], "Username already taken.");
    }

    #[tokio::test]
    async fn test_update_user_self_rename_allowed() {
        let state = create_test_state();
        let created = create_user(&state, "hank").await;

        let response = update_user_handler(
            State(Arc::clone(&state)),
            Path(created["id"].as_str().unwrap().to_string()),
            Ok(Json(update_payload("hank"))),
        )
        .await
        .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_update_user_without_password_keeps_hash() {
        let state = create_test_state();
        let created = create_user(&state, "hank").await;
        let id = Uuid::parse_str(created["id"].as_str().unwrap()).unwrap();
        let original_hash = state.user_store.get(id).unwrap().password_hash.clone();

        update_user_handler(
            State(Arc::clone(&state)),
            Path(id.to_string()),
            Ok(Json(update_payload("hank"))),
        )
        .await
        .unwrap();

        assert_eq!(state.user_store.get(id).unwrap().password_hash, original_hash);
    }

    #[tokio::test]
    async fn test_update_user_with_password_rehashes() {
        let state = create_test_state();
        let created = create_user(&state, "hank").await;
        let id = Uuid::parse_str(created["id"].as_str().unwrap()).unwrap();

        let mut payload = update_payload("hank");
        payload.password = Some("propane".to_string());

        update_user_handler(
            State(Arc::clone(&state)),
            Path(id.to_string()),
            Ok(Json(payload)),
        )
        .await
        .unwrap();

        let stored = state.user_store.get(id).unwrap();
        assert!(bcrypt::verify("propane", &stored.password_hash).unwrap());
    }

    #[tokio::test]
    async fn test_delete_user_missing_is_no_op() {
        let state = create_test_state();

        let response = delete_user_handler(State(state), Path(Uuid::new_v4().to_string()))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NO_CONTENT);
    }

    #[tokio::test]
    async fn test_delete_user_removes_record() {
        let state = create_test_state();
        let created = create_user(&state, "hank").await;
        let id = Uuid::parse_str(created["id"].as_str().unwrap()).unwrap();

        let response = delete_user_handler(State(Arc::clone(&state)), Path(id.to_string()))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NO_CONTENT);
        assert!(state.user_store.get(id).is_none());
    }

    #[tokio::test]
    async fn test_delete_user_with_notes_conflicts_until_notes_removed() {
        let state = create_test_state();
        let created = create_user(&state, "hank").await;
        let id = Uuid::parse_str(created["id"].as_str().unwrap()).unwrap();

        let note = Note::new(
            id,
            "Fix sink".to_string(),
            "Kitchen sink leaks".to_string(),
            false,
        );
        let note_id = note.id;
        state.note_store.insert(note, || true).unwrap();

        let result = delete_user_handler(State(Arc::clone(&state)), Path(id.to_string())).await;
        let response = result.unwrap_err().into_response();
        assert_eq!(response.status(), StatusCode::CONFLICT);
        let body = response_json(response).await;
        assert_eq!(
            body["message"],
            "Cannot delete user because it has assigned notes."
        );

        state.note_store.remove(note_id).unwrap();

        let response = delete_user_handler(State(Arc::clone(&state)), Path(id.to_string()))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NO_CONTENT);
        assert!(state.user_store.get(id).is_none());
    }
}
