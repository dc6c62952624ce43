//! The same four handlers for every journal collection.

use std::collections::HashSet;

use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
    response::Html,
};
use uuid::Uuid;

use keepsake_core::render::{Render, RenderContext, render_list};
use keepsake_db::Table;
use keepsake_types::api::AddResponse;
use keepsake_types::models::Principal;

use crate::AppState;
use crate::error::ApiError;

pub async fn list<C: Table>(
    State(state): State<AppState>,
) -> Result<Json<Vec<C::Record>>, ApiError> {
    Ok(Json(state.store.list::<C>().await?))
}

/// Rendered list fragment. Hidden messages always come back locked here;
/// revealing is a per-session gateway action.
pub async fn view<C: Table + Render>(State(state): State<AppState>) -> Result<Html<String>, ApiError> {
    let records = state.store.list::<C>().await?;
    let revealed = HashSet::new();
    let ctx = RenderContext { tz: state.clock.tz(), revealed: &revealed };
    Ok(Html(render_list::<C>(&records, &ctx)))
}

pub async fn add<C: Table>(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Json(draft): Json<C::Draft>,
) -> Result<(StatusCode, Json<AddResponse<C::Record>>), ApiError> {
    let record = state.store.add::<C>(&principal, draft).await?;
    Ok((
        StatusCode::CREATED,
        Json(AddResponse { record, status: C::SAVED.to_string() }),
    ))
}

pub async fn remove<C: Table>(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    if state.store.delete::<C>(id).await? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ApiError::NotFound)
    }
}
