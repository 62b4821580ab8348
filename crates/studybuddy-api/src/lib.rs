pub mod auth;
pub mod error;
pub mod extract;
pub mod items;
pub mod middleware;
pub mod quizzes;
pub mod render;
pub mod variants;

use axum::{
    Json, Router, middleware as axum_middleware,
    routing::{get, post},
};
use tracing::error;

use studybuddy_db::Database;
use studybuddy_types::api::HealthResponse;

use crate::auth::AppState;
use crate::error::ApiError;
use crate::middleware::require_auth;

/// All API routes. Everything except health, registration and token
/// issuance requires a bearer access token.
pub fn router(state: AppState) -> Router {
    let public_routes = Router::new()
        .route("/api/health/", get(health))
        .route("/api/users/register/", post(auth::register))
        .route("/api/users/login/", post(auth::login))
        .route("/api/token/", post(auth::login))
        .route("/api/token/refresh/", post(auth::refresh));

    let protected_routes = Router::new()
        .route("/api/users/me/", get(auth::me))
        .route(
            "/api/quizzes/quizzes/",
            get(quizzes::list_quizzes).post(quizzes::create_quiz),
        )
        .route(
            "/api/quizzes/quizzes/{id}/",
            get(quizzes::get_quiz)
                .put(quizzes::update_quiz)
                .patch(quizzes::patch_quiz)
                .delete(quizzes::delete_quiz),
        )
        .route(
            "/api/quizzes/variants/",
            get(variants::list_variants).post(variants::create_variant),
        )
        .route(
            "/api/quizzes/variants/{id}/",
            get(variants::get_variant)
                .put(variants::update_variant)
                .patch(variants::patch_variant)
                .delete(variants::delete_variant),
        )
        .route("/api/quizzes/items/", get(items::list_items).post(items::create_items))
        .route(
            "/api/quizzes/items/{id}/",
            get(items::get_item)
                .put(items::update_item)
                .patch(items::patch_item)
                .delete(items::delete_item),
        )
        .route_layer(axum_middleware::from_fn_with_state(state.clone(), require_auth));

    Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .with_state(state)
}

async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        message: "StudyBuddy API is running",
    })
}

/// Runs blocking database (and password hashing) work off the async runtime.
pub(crate) async fn blocking<F, T, E>(state: &AppState, f: F) -> Result<T, ApiError>
where
    F: FnOnce(&Database) -> Result<T, E> + Send + 'static,
    T: Send + 'static,
    E: Into<ApiError> + Send + 'static,
{
    let state = state.clone();
    tokio::task::spawn_blocking(move || f(&state.db))
        .await
        .map_err(|e| {
            error!("spawn_blocking join error: {}", e);
            ApiError::Internal(e.into())
        })?
        .map_err(Into::into)
}
