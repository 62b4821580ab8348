use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// -- JWT Claims --

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenType {
    Access,
    Refresh,
}

/// JWT claims carried by both access and refresh tokens. `token_type`
/// keeps a refresh token from being accepted as a bearer token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Uuid,
    pub username: String,
    pub token_type: TokenType,
    pub jti: Uuid,
    pub iat: usize,
    pub exp: usize,
}

// -- Auth --

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct LoginResponse {
    pub username: String,
    pub access: String,
    pub refresh: String,
}

#[derive(Debug, Deserialize)]
pub struct RefreshRequest {
    pub refresh: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct RefreshResponse {
    pub access: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserResponse {
    pub id: Uuid,
    pub username: String,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub message: &'static str,
}

// -- Quizzes --

/// Body for quiz create and full update. Unknown fields (such as an owner)
/// are ignored; the owner always comes from the bearer token.
#[derive(Debug, Deserialize)]
pub struct QuizRequest {
    pub title: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct PatchQuizRequest {
    pub title: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuizResponse {
    pub id: i64,
    pub title: String,
    /// Owner username, read-only.
    pub user: String,
    pub created_at: DateTime<Utc>,
    pub variants: Vec<VariantResponse>,
    pub variants_count: usize,
}

// -- Variants --

#[derive(Debug, Deserialize)]
pub struct VariantRequest {
    pub name: String,
    pub quiz: i64,
}

#[derive(Debug, Default, Deserialize)]
pub struct PatchVariantRequest {
    pub name: Option<String>,
    pub quiz: Option<i64>,
}

/// `?quiz=` is kept raw; a value that is not an id filters to nothing.
#[derive(Debug, Default, Deserialize)]
pub struct VariantQuery {
    pub quiz: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VariantResponse {
    pub id: i64,
    pub name: String,
    pub quiz: i64,
    pub items: Vec<ItemResponse>,
    pub items_count: usize,
}

// -- Items --

/// Bulk create body: `name` is a comma-separated list of item names.
#[derive(Debug, Deserialize)]
pub struct CreateItemsRequest {
    pub variant: i64,
    #[serde(default)]
    pub name: String,
}

#[derive(Debug, Deserialize)]
pub struct ItemRequest {
    pub name: String,
    pub variant: i64,
}

#[derive(Debug, Default, Deserialize)]
pub struct PatchItemRequest {
    pub name: Option<String>,
    pub variant: Option<i64>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ItemQuery {
    pub variant: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ItemResponse {
    pub id: i64,
    pub name: String,
    pub variant: i64,
    /// Parent variant name, read-only.
    pub variant_name: String,
}
