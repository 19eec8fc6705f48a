// HTTP routes configuration

use crate::core::state::AppState;
use axum::{
    handler::HandlerWithoutStateExt,
    routing::{get, patch},
    Router,
};
use std::sync::Arc;
use tower_http::services::ServeDir;

pub fn build_router(state: Arc<AppState>) -> Router {
    // Static assets are tried for any unmatched path; whatever they don't
    // cover falls through to the content-negotiated 404.
    let static_files = ServeDir::new(&state.config.server.public_dir)
        .call_fallback_on_method_not_allowed(true)
        .not_found_service(crate::handlers::fallback::fallback_handler.into_service());

    Router::new()
        // User resource
        .route(
            "/users",
            get(crate::handlers::users::list_users_handler)
                .post(crate::handlers::users::create_user_handler),
        )
        .route(
            "/users/{id}",
            get(crate::handlers::users::get_user_handler)
                .patch(crate::handlers::users::update_user_handler)
                .delete(crate::handlers::users::delete_user_handler),
        )
        // Note resource, scoped under its owner
        .route(
            "/users/{id}/notes",
            get(crate::handlers::notes::list_notes_handler)
                .post(crate::handlers::notes::create_note_handler),
        )
        .route(
            "/users/{user_id}/notes/{note_id}",
            patch(crate::handlers::notes::update_note_handler)
                .delete(crate::handlers::notes::delete_note_handler),
        )
        .route("/health", get(crate::handlers::health::health_handler))
        .fallback_service(static_files)
        .with_state(state)
}
