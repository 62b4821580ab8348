use axum::{Extension, Json, extract::State, http::StatusCode, response::IntoResponse};
use tracing::info;

use studybuddy_db::{Database, ItemFilter, UpdateOutcome};
use studybuddy_types::api::{Claims, PatchVariantRequest, VariantQuery, VariantRequest, VariantResponse};

use crate::auth::AppState;
use crate::blocking;
use crate::error::ApiError;
use crate::extract::{ApiJson, ApiPath, ApiQuery, ParentFilter, clean_name};
use crate::render;

const QUIZ_NOT_OWNED: &str = "Quiz not found or not permitted.";

/// Lists the caller's variants, optionally those of one quiz (`?quiz=`).
pub async fn list_variants(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    ApiQuery(query): ApiQuery<VariantQuery>,
) -> Result<Json<Vec<VariantResponse>>, ApiError> {
    let owner = claims.sub.to_string();
    let quiz = match ParentFilter::parse(query.quiz.as_deref()) {
        ParentFilter::Any => None,
        ParentFilter::Id(quiz) => Some(quiz),
        ParentFilter::Unmatched => return Ok(Json(vec![])),
    };
    let (variants, items) = blocking(&state, move |db| {
        let variants = db.list_variants(&owner, quiz)?;
        let filter = match quiz {
            Some(quiz) => ItemFilter::Quiz(quiz),
            None => ItemFilter::All,
        };
        Ok::<_, anyhow::Error>((variants, db.list_items(&owner, filter)?))
    })
    .await?;

    Ok(Json(render::variants(variants, items)))
}

pub async fn get_variant(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    ApiPath(id): ApiPath<i64>,
) -> Result<Json<VariantResponse>, ApiError> {
    let owner = claims.sub.to_string();
    let variant = blocking(&state, move |db| load_variant(db, &owner, id)).await?;
    variant.map(Json).ok_or(ApiError::NotFound)
}

pub async fn create_variant(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    ApiJson(req): ApiJson<VariantRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let name = clean_name("name", &req.name)?;
    let owner = claims.sub.to_string();
    let quiz = req.quiz;

    let row = blocking(&state, move |db| db.create_variant(&owner, quiz, &name))
        .await?
        .ok_or_else(|| ApiError::field("quiz", QUIZ_NOT_OWNED))?;

    info!("Variant {} created in quiz {} by {}", row.id, quiz, claims.username);
    Ok((StatusCode::CREATED, Json(render::variant(row, vec![]))))
}

pub async fn update_variant(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    ApiPath(id): ApiPath<i64>,
    ApiJson(req): ApiJson<VariantRequest>,
) -> Result<Json<VariantResponse>, ApiError> {
    let name = clean_name("name", &req.name)?;
    apply_update(state, claims, id, Some(name), Some(req.quiz)).await
}

pub async fn patch_variant(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    ApiPath(id): ApiPath<i64>,
    ApiJson(req): ApiJson<PatchVariantRequest>,
) -> Result<Json<VariantResponse>, ApiError> {
    let name = req.name.as_deref().map(|n| clean_name("name", n)).transpose()?;
    apply_update(state, claims, id, name, req.quiz).await
}

/// Deletes a variant and, by cascade, its items.
pub async fn delete_variant(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    ApiPath(id): ApiPath<i64>,
) -> Result<StatusCode, ApiError> {
    let owner = claims.sub.to_string();
    if !blocking(&state, move |db| db.delete_variant(&owner, id)).await? {
        return Err(ApiError::NotFound);
    }
    info!("Variant {} deleted by {}", id, claims.username);
    Ok(StatusCode::NO_CONTENT)
}

async fn apply_update(
    state: AppState,
    claims: Claims,
    id: i64,
    name: Option<String>,
    quiz: Option<i64>,
) -> Result<Json<VariantResponse>, ApiError> {
    let owner = claims.sub.to_string();
    let variant = blocking(&state, move |db| -> Result<VariantResponse, ApiError> {
        match db.update_variant(&owner, id, name.as_deref(), quiz)? {
            UpdateOutcome::Updated(_) => {}
            UpdateOutcome::NotFound => return Err(ApiError::NotFound),
            UpdateOutcome::ParentNotOwned => return Err(ApiError::field("quiz", QUIZ_NOT_OWNED)),
        }
        load_variant(db, &owner, id)?.ok_or(ApiError::NotFound)
    })
    .await?;

    info!("Variant {} updated by {}", id, claims.username);
    Ok(Json(variant))
}

fn load_variant(db: &Database, owner: &str, id: i64) -> anyhow::Result<Option<VariantResponse>> {
    let Some(row) = db.get_variant(owner, id)? else {
        return Ok(None);
    };
    let items = db.list_items(owner, ItemFilter::Variant(id))?;
    Ok(Some(render::variant(row, items)))
}
