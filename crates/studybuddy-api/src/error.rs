use axum::{
    Json,
    extract::rejection::{JsonRejection, PathRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;
use tracing::error;

/// Errors surfaced to API callers. Resources outside the caller's ownership
/// scope are reported as `NotFound`, never as forbidden.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Not found.")]
    NotFound,

    #[error("{message}")]
    Validation {
        field: Option<&'static str>,
        message: String,
    },

    #[error("Invalid username or password")]
    AuthenticationFailed,

    #[error("Authentication credentials were not provided or are invalid.")]
    Unauthorized,

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl ApiError {
    pub fn field(field: &'static str, message: impl Into<String>) -> Self {
        ApiError::Validation {
            field: Some(field),
            message: message.into(),
        }
    }

    pub fn invalid(message: impl Into<String>) -> Self {
        ApiError::Validation {
            field: None,
            message: message.into(),
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::NotFound => StatusCode::NOT_FOUND,
            ApiError::Validation { .. } => StatusCode::BAD_REQUEST,
            ApiError::AuthenticationFailed | ApiError::Unauthorized => StatusCode::UNAUTHORIZED,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = match &self {
            ApiError::Validation {
                field: Some(field),
                message,
            } => {
                let mut fields = serde_json::Map::new();
                fields.insert(field.to_string(), json!([message]));
                serde_json::Value::Object(fields)
            }
            ApiError::Validation { field: None, message } => json!({ "message": message }),
            ApiError::AuthenticationFailed => json!({ "message": self.to_string() }),
            ApiError::NotFound | ApiError::Unauthorized => json!({ "detail": self.to_string() }),
            ApiError::Internal(e) => {
                error!("Internal error: {:#}", e);
                json!({ "detail": "Internal server error" })
            }
        };
        (status, Json(body)).into_response()
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::invalid(rejection.body_text())
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        ApiError::invalid(rejection.body_text())
    }
}

impl From<PathRejection> for ApiError {
    // Non-numeric ids cannot name any row.
    fn from(_: PathRejection) -> Self {
        ApiError::NotFound
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_codes() {
        assert_eq!(ApiError::NotFound.status_code(), StatusCode::NOT_FOUND);
        assert_eq!(ApiError::field("quiz", "x").status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(ApiError::AuthenticationFailed.status_code(), StatusCode::UNAUTHORIZED);
        assert_eq!(
            ApiError::Internal(anyhow::anyhow!("boom")).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn messages() {
        assert_eq!(ApiError::field("name", "This field may not be blank.").to_string(), "This field may not be blank.");
        assert_eq!(ApiError::AuthenticationFailed.to_string(), "Invalid username or password");
    }
}
