use axum::{
    extract::{Request, State},
    http::header,
    middleware::Next,
    response::Response,
};

use studybuddy_types::api::TokenType;

use crate::auth::{AppState, decode_token};
use crate::error::ApiError;

/// Extract and validate the access token from the Authorization header,
/// exposing its claims to handlers as `Extension<Claims>`.
pub async fn require_auth(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let token = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .ok_or(ApiError::Unauthorized)?;

    let claims = decode_token(&state.tokens, token, TokenType::Access).ok_or(ApiError::Unauthorized)?;

    req.extensions_mut().insert(claims);
    Ok(next.run(req).await)
}
