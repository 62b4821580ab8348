use axum::{Extension, Json, extract::State, http::StatusCode, response::IntoResponse};
use tracing::info;

use studybuddy_db::{Database, ItemFilter};
use studybuddy_types::api::{Claims, PatchQuizRequest, QuizRequest, QuizResponse};

use crate::auth::AppState;
use crate::blocking;
use crate::error::ApiError;
use crate::extract::{ApiJson, ApiPath, clean_name};
use crate::render;

pub async fn list_quizzes(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<Json<Vec<QuizResponse>>, ApiError> {
    let owner = claims.sub.to_string();
    let (quizzes, variants, items) = blocking(&state, move |db| {
        Ok::<_, anyhow::Error>((
            db.list_quizzes(&owner)?,
            db.list_variants(&owner, None)?,
            db.list_items(&owner, ItemFilter::All)?,
        ))
    })
    .await?;

    Ok(Json(render::quizzes(quizzes, variants, items)))
}

pub async fn get_quiz(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    ApiPath(id): ApiPath<i64>,
) -> Result<Json<QuizResponse>, ApiError> {
    let owner = claims.sub.to_string();
    let quiz = blocking(&state, move |db| load_quiz(db, &owner, id)).await?;
    quiz.map(Json).ok_or(ApiError::NotFound)
}

/// The owner is always the caller; any owner-like field in the body is ignored.
pub async fn create_quiz(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    ApiJson(req): ApiJson<QuizRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let title = clean_name("title", &req.title)?;
    let owner = claims.sub.to_string();

    let row = blocking(&state, move |db| db.create_quiz(&owner, &title)).await?;
    info!("Quiz {} created by {}", row.id, claims.username);

    Ok((StatusCode::CREATED, Json(render::quiz(row, vec![], vec![]))))
}

pub async fn update_quiz(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    ApiPath(id): ApiPath<i64>,
    ApiJson(req): ApiJson<QuizRequest>,
) -> Result<Json<QuizResponse>, ApiError> {
    let title = clean_name("title", &req.title)?;
    rename(state, claims, id, Some(title)).await
}

pub async fn patch_quiz(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    ApiPath(id): ApiPath<i64>,
    ApiJson(req): ApiJson<PatchQuizRequest>,
) -> Result<Json<QuizResponse>, ApiError> {
    let title = req.title.as_deref().map(|t| clean_name("title", t)).transpose()?;
    rename(state, claims, id, title).await
}

pub async fn delete_quiz(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    ApiPath(id): ApiPath<i64>,
) -> Result<StatusCode, ApiError> {
    let owner = claims.sub.to_string();
    if !blocking(&state, move |db| db.delete_quiz(&owner, id)).await? {
        return Err(ApiError::NotFound);
    }
    info!("Quiz {} deleted by {}", id, claims.username);
    Ok(StatusCode::NO_CONTENT)
}

async fn rename(
    state: AppState,
    claims: Claims,
    id: i64,
    title: Option<String>,
) -> Result<Json<QuizResponse>, ApiError> {
    let owner = claims.sub.to_string();
    let quiz = blocking(&state, move |db| {
        if let Some(title) = title {
            if db.update_quiz(&owner, id, &title)?.is_none() {
                return Ok(None);
            }
        }
        load_quiz(db, &owner, id)
    })
    .await?
    .ok_or(ApiError::NotFound)?;

    info!("Quiz {} updated by {}", id, claims.username);
    Ok(Json(quiz))
}

/// One quiz with its variants and their items, or `None` if not owned.
fn load_quiz(db: &Database, owner: &str, id: i64) -> anyhow::Result<Option<QuizResponse>> {
    let Some(row) = db.get_quiz(owner, id)? else {
        return Ok(None);
    };
    let variants = db.list_variants(owner, Some(id))?;
    let items = db.list_items(owner, ItemFilter::Quiz(id))?;
    Ok(Some(render::quiz(row, variants, items)))
}
