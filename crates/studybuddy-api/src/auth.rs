use std::sync::Arc;

use argon2::{
    Argon2, PasswordHash, PasswordHasher, PasswordVerifier,
    password_hash::{SaltString, rand_core::OsRng},
};
use axum::{Extension, Json, extract::State, http::StatusCode, response::IntoResponse};
use chrono::{Duration, Utc};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use tracing::{debug, info};
use uuid::Uuid;

use studybuddy_db::Database;
use studybuddy_types::api::{
    Claims, LoginRequest, LoginResponse, RefreshRequest, RefreshResponse, RegisterRequest,
    TokenType, UserResponse,
};

use crate::blocking;
use crate::error::ApiError;
use crate::extract::ApiJson;

pub type AppState = Arc<AppStateInner>;

pub struct AppStateInner {
    pub db: Database,
    pub tokens: TokenConfig,
}

#[derive(Clone)]
pub struct TokenConfig {
    pub secret: String,
    pub access_ttl: Duration,
    pub refresh_ttl: Duration,
}

/// An authenticated user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub id: Uuid,
    pub username: String,
}

pub struct TokenPair {
    pub access: String,
    pub refresh: String,
}

const MAX_USERNAME_LEN: usize = 150;

// -- Identity service --

/// Creates a user with an Argon2id-hashed password. Blocking.
pub fn register_identity(db: &Database, username: &str, password: &str) -> Result<Identity, ApiError> {
    let username = username.trim();
    if username.is_empty() {
        return Err(ApiError::field("username", "This field may not be blank."));
    }
    if username.chars().count() > MAX_USERNAME_LEN {
        return Err(ApiError::field(
            "username",
            format!("Ensure this field has no more than {} characters.", MAX_USERNAME_LEN),
        ));
    }
    if !username.chars().all(|c| c.is_alphanumeric() || "@.+-_".contains(c)) {
        return Err(ApiError::field(
            "username",
            "Enter a valid username. This value may contain only letters, numbers, and @/./+/-/_ characters.",
        ));
    }
    if password.is_empty() {
        return Err(ApiError::field("password", "This field may not be blank."));
    }

    let salt = SaltString::generate(&mut OsRng);
    let password_hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| anyhow::anyhow!("password hashing failed: {}", e))?
        .to_string();

    let id = Uuid::new_v4();
    if !db.create_user(&id.to_string(), username, &password_hash)? {
        return Err(ApiError::field("username", "A user with that username already exists."));
    }

    Ok(Identity {
        id,
        username: username.to_string(),
    })
}

/// Checks credentials. `None` for an unknown user or a wrong password. Blocking.
pub fn authenticate(db: &Database, username: &str, password: &str) -> Result<Option<Identity>, ApiError> {
    // Stored usernames are trimmed at registration.
    let Some(user) = db.get_user_by_username(username.trim())? else {
        return Ok(None);
    };

    let parsed_hash = PasswordHash::new(&user.password)
        .map_err(|e| anyhow::anyhow!("corrupt password hash for user {}: {}", user.id, e))?;

    if Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .is_err()
    {
        return Ok(None);
    }

    let id: Uuid = user
        .id
        .parse()
        .map_err(|e| anyhow::anyhow!("corrupt user id '{}': {}", user.id, e))?;

    Ok(Some(Identity {
        id,
        username: user.username,
    }))
}

pub fn issue_tokens(config: &TokenConfig, identity: &Identity) -> anyhow::Result<TokenPair> {
    Ok(TokenPair {
        access: create_token(config, identity, TokenType::Access)?,
        refresh: create_token(config, identity, TokenType::Refresh)?,
    })
}

/// Exchanges a valid refresh token for a new access token.
pub fn refresh_access(config: &TokenConfig, refresh_token: &str) -> Result<String, ApiError> {
    let claims = decode_token(config, refresh_token, TokenType::Refresh).ok_or(ApiError::Unauthorized)?;
    let identity = Identity {
        id: claims.sub,
        username: claims.username,
    };
    Ok(create_token(config, &identity, TokenType::Access)?)
}

/// Validates signature, expiry and token type. `None` on any failure.
pub fn decode_token(config: &TokenConfig, token: &str, expected: TokenType) -> Option<Claims> {
    let data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(config.secret.as_bytes()),
        &Validation::default(),
    )
    .map_err(|e| debug!("Rejected token: {}", e))
    .ok()?;

    if data.claims.token_type != expected {
        debug!("Rejected token: expected {:?}, got {:?}", expected, data.claims.token_type);
        return None;
    }
    Some(data.claims)
}

fn create_token(config: &TokenConfig, identity: &Identity, token_type: TokenType) -> anyhow::Result<String> {
    let now = Utc::now();
    let ttl = match token_type {
        TokenType::Access => config.access_ttl,
        TokenType::Refresh => config.refresh_ttl,
    };
    let claims = Claims {
        sub: identity.id,
        username: identity.username.clone(),
        token_type,
        jti: Uuid::new_v4(),
        iat: now.timestamp() as usize,
        exp: (now + ttl).timestamp() as usize,
    };

    let token = encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(config.secret.as_bytes()),
    )?;

    Ok(token)
}

// -- Handlers --

pub async fn register(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<RegisterRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let identity = blocking(&state, move |db| register_identity(db, &req.username, &req.password)).await?;

    info!("User {} registered ({})", identity.username, identity.id);

    Ok((
        StatusCode::CREATED,
        Json(UserResponse {
            id: identity.id,
            username: identity.username,
        }),
    ))
}

pub async fn login(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<LoginRequest>,
) -> Result<Json<LoginResponse>, ApiError> {
    if req.username.trim().is_empty() {
        return Err(ApiError::field("username", "This field may not be blank."));
    }
    if req.password.is_empty() {
        return Err(ApiError::field("password", "This field may not be blank."));
    }

    let identity = blocking(&state, move |db| authenticate(db, &req.username, &req.password))
        .await?
        .ok_or(ApiError::AuthenticationFailed)?;

    let tokens = issue_tokens(&state.tokens, &identity)?;
    info!("User {} logged in", identity.username);

    Ok(Json(LoginResponse {
        username: identity.username,
        access: tokens.access,
        refresh: tokens.refresh,
    }))
}

pub async fn refresh(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<RefreshRequest>,
) -> Result<Json<RefreshResponse>, ApiError> {
    let access = refresh_access(&state.tokens, &req.refresh)?;
    Ok(Json(RefreshResponse { access }))
}

/// The caller's account. A token outliving its user is treated as invalid.
pub async fn me(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<Json<UserResponse>, ApiError> {
    let id = claims.sub.to_string();
    let user = blocking(&state, move |db| db.get_user_by_id(&id))
        .await?
        .ok_or(ApiError::Unauthorized)?;

    Ok(Json(UserResponse {
        id: claims.sub,
        username: user.username,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> TokenConfig {
        TokenConfig {
            secret: "test-secret".into(),
            access_ttl: Duration::minutes(5),
            refresh_ttl: Duration::hours(1),
        }
    }

    fn alice() -> Identity {
        Identity {
            id: Uuid::new_v4(),
            username: "alice".into(),
        }
    }

    #[test]
    fn token_types_are_not_interchangeable() {
        let cfg = config();
        let pair = issue_tokens(&cfg, &alice()).unwrap();

        assert!(decode_token(&cfg, &pair.access, TokenType::Access).is_some());
        assert!(decode_token(&cfg, &pair.refresh, TokenType::Refresh).is_some());
        assert!(decode_token(&cfg, &pair.refresh, TokenType::Access).is_none());
        assert!(decode_token(&cfg, &pair.access, TokenType::Refresh).is_none());
    }

    #[test]
    fn wrong_secret_and_expired_tokens_are_rejected() {
        let cfg = config();
        let pair = issue_tokens(&cfg, &alice()).unwrap();

        let other = TokenConfig {
            secret: "other-secret".into(),
            ..config()
        };
        assert!(decode_token(&other, &pair.access, TokenType::Access).is_none());

        let expired = TokenConfig {
            access_ttl: Duration::hours(-1),
            ..config()
        };
        let stale = issue_tokens(&expired, &alice()).unwrap();
        assert!(decode_token(&expired, &stale.access, TokenType::Access).is_none());
    }

    #[test]
    fn refresh_issues_access_for_same_identity() {
        let cfg = config();
        let who = alice();
        let pair = issue_tokens(&cfg, &who).unwrap();

        let access = refresh_access(&cfg, &pair.refresh).unwrap();
        let claims = decode_token(&cfg, &access, TokenType::Access).unwrap();
        assert_eq!(claims.sub, who.id);
        assert_eq!(claims.username, "alice");

        assert!(matches!(refresh_access(&cfg, &pair.access), Err(ApiError::Unauthorized)));
    }

    #[test]
    fn register_then_authenticate() {
        let db = Database::open_in_memory().unwrap();
        let who = register_identity(&db, "alice", "correct horse").unwrap();

        assert_eq!(authenticate(&db, "alice", "correct horse").unwrap(), Some(who));
        assert_eq!(authenticate(&db, "alice", "wrong").unwrap(), None);
        assert_eq!(authenticate(&db, "nobody", "correct horse").unwrap(), None);
    }

    #[test]
    fn padded_username_matches_on_login() {
        let db = Database::open_in_memory().unwrap();
        let who = register_identity(&db, " alice ", "correct horse").unwrap();
        assert_eq!(who.username, "alice");
        assert_eq!(authenticate(&db, " alice ", "correct horse").unwrap(), Some(who));
    }

    #[test]
    fn registration_rejects_taken_and_invalid_input() {
        let db = Database::open_in_memory().unwrap();
        register_identity(&db, "alice", "correct horse").unwrap();

        assert!(matches!(
            register_identity(&db, "alice", "another"),
            Err(ApiError::Validation { field: Some("username"), .. })
        ));
        assert!(matches!(
            register_identity(&db, "bad name!", "pw"),
            Err(ApiError::Validation { field: Some("username"), .. })
        ));
        assert!(matches!(
            register_identity(&db, "bob", ""),
            Err(ApiError::Validation { field: Some("password"), .. })
        ));
    }
}
