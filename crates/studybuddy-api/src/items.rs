use axum::{Extension, Json, extract::State, http::StatusCode, response::IntoResponse};
use tracing::{debug, info};

use studybuddy_db::{Connection, ItemFilter, ItemRow, OwnedVariant, UpdateOutcome};
use studybuddy_types::api::{Claims, CreateItemsRequest, ItemQuery, ItemRequest, ItemResponse, PatchItemRequest};

use crate::auth::AppState;
use crate::blocking;
use crate::error::ApiError;
use crate::extract::{ApiJson, ApiPath, ApiQuery, ParentFilter, clean_name};
use crate::render;

const VARIANT_NOT_OWNED: &str = "Variant not found or not permitted.";

/// Splits a comma-separated name list, trimming each entry and dropping
/// empty ones.
pub fn split_names(raw: &str) -> Vec<&str> {
    raw.split(',').map(str::trim).filter(|n| !n.is_empty()).collect()
}

/// Creates many items in one owned variant. The variant is resolved when
/// the creator is built, so every insert targets the same checked parent.
/// Build it on a transaction: an invalid name part-way through must leave
/// nothing behind.
pub struct BulkItemCreator<'c> {
    variant: OwnedVariant<'c>,
}

impl<'c> BulkItemCreator<'c> {
    pub fn new(conn: &'c Connection, owner_id: &str, variant_id: i64) -> Result<Self, ApiError> {
        let variant = OwnedVariant::resolve(conn, owner_id, variant_id)?
            .ok_or_else(|| ApiError::field("variant", VARIANT_NOT_OWNED))?;
        Ok(Self { variant })
    }

    /// Inserts one item per non-empty name in `raw`, in input order.
    pub fn create(&self, raw: &str) -> Result<Vec<ItemRow>, ApiError> {
        let mut created = Vec::new();
        for name in split_names(raw) {
            let name = clean_name("name", name)?;
            created.push(self.variant.insert(&name)?);
        }
        debug!("Inserted {} items into variant {}", created.len(), self.variant.id());
        Ok(created)
    }
}

/// Lists the caller's items, optionally those of one variant (`?variant=`).
pub async fn list_items(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    ApiQuery(query): ApiQuery<ItemQuery>,
) -> Result<Json<Vec<ItemResponse>>, ApiError> {
    let owner = claims.sub.to_string();
    let filter = match ParentFilter::parse(query.variant.as_deref()) {
        ParentFilter::Any => ItemFilter::All,
        ParentFilter::Id(variant) => ItemFilter::Variant(variant),
        ParentFilter::Unmatched => return Ok(Json(vec![])),
    };
    let rows = blocking(&state, move |db| db.list_items(&owner, filter)).await?;
    Ok(Json(render::items(rows)))
}

pub async fn get_item(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    ApiPath(id): ApiPath<i64>,
) -> Result<Json<ItemResponse>, ApiError> {
    let owner = claims.sub.to_string();
    let row = blocking(&state, move |db| db.get_item(&owner, id)).await?;
    row.map(|r| Json(render::item(r))).ok_or(ApiError::NotFound)
}

/// Bulk create. Responds with every created item, or with nothing
/// persisted if any part of the batch is rejected.
pub async fn create_items(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    ApiJson(req): ApiJson<CreateItemsRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let owner = claims.sub.to_string();
    let variant = req.variant;

    let rows = blocking(&state, move |db| {
        db.with_tx(|tx| BulkItemCreator::new(tx, &owner, req.variant)?.create(&req.name))
    })
    .await?;

    info!("{} items created in variant {} by {}", rows.len(), variant, claims.username);
    Ok((StatusCode::CREATED, Json(render::items(rows))))
}

pub async fn update_item(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    ApiPath(id): ApiPath<i64>,
    ApiJson(req): ApiJson<ItemRequest>,
) -> Result<Json<ItemResponse>, ApiError> {
    let name = clean_name("name", &req.name)?;
    apply_update(state, claims, id, Some(name), Some(req.variant)).await
}

pub async fn patch_item(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    ApiPath(id): ApiPath<i64>,
    ApiJson(req): ApiJson<PatchItemRequest>,
) -> Result<Json<ItemResponse>, ApiError> {
    let name = req.name.as_deref().map(|n| clean_name("name", n)).transpose()?;
    apply_update(state, claims, id, name, req.variant).await
}

pub async fn delete_item(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    ApiPath(id): ApiPath<i64>,
) -> Result<StatusCode, ApiError> {
    let owner = claims.sub.to_string();
    if !blocking(&state, move |db| db.delete_item(&owner, id)).await? {
        return Err(ApiError::NotFound);
    }
    info!("Item {} deleted by {}", id, claims.username);
    Ok(StatusCode::NO_CONTENT)
}

async fn apply_update(
    state: AppState,
    claims: Claims,
    id: i64,
    name: Option<String>,
    variant: Option<i64>,
) -> Result<Json<ItemResponse>, ApiError> {
    let owner = claims.sub.to_string();
    let outcome = blocking(&state, move |db| db.update_item(&owner, id, name.as_deref(), variant)).await?;

    let row = match outcome {
        UpdateOutcome::Updated(row) => row,
        UpdateOutcome::NotFound => return Err(ApiError::NotFound),
        UpdateOutcome::ParentNotOwned => return Err(ApiError::field("variant", VARIANT_NOT_OWNED)),
    };

    info!("Item {} updated by {}", id, claims.username);
    Ok(Json(render::item(row)))
}
