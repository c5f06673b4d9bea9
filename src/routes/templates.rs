//! Catalog routes: grid listing, type-ahead, import and placement.

use axum::extract::{Path, Query, State};
use axum::response::Json;
use serde::{Deserialize, Serialize};
use tracing::warn;

use super::ApiError;
use crate::catalog::{SessionFilter, TemplateSummary};
use crate::manifest::LoadSummary;
use crate::model::TemplateKey;
use crate::services::import::import_catalog;
use crate::services::placement::{PlacementReport, place_by_key};
use crate::state::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct ListParams {
    pub session: Option<String>,
    pub q: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct SuggestParams {
    pub q: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct TemplateList {
    pub total: usize,
    pub templates: Vec<TemplateSummary>,
}

/// `GET /api/templates?session=&q=`: templates passing the panel filters.
pub async fn list_templates(
    State(state): State<AppState>,
    Query(params): Query<ListParams>,
) -> Result<Json<TemplateList>, ApiError> {
    let session = SessionFilter::parse(params.session.as_deref().unwrap_or_default()).map_err(ApiError::from_error)?;
    let catalog = state.catalog.read().await;
    let templates: Vec<TemplateSummary> = catalog
        .filtered(session, params.q.as_deref().unwrap_or_default())
        .into_iter()
        .map(TemplateSummary::from)
        .collect();
    Ok(Json(TemplateList { total: catalog.len(), templates }))
}

/// `GET /api/templates/suggestions?q=`: up to five matching titles.
pub async fn suggestions(State(state): State<AppState>, Query(params): Query<SuggestParams>) -> Json<Vec<String>> {
    let catalog = state.catalog.read().await;
    Json(catalog.suggestions(params.q.as_deref().unwrap_or_default()))
}

/// `POST /api/templates/import`: re-read the manifest and replace the catalog.
pub async fn import(State(state): State<AppState>) -> Result<Json<LoadSummary>, ApiError> {
    import_catalog(&state.config.manifest_source, &state.http, &state.catalog)
        .await
        .map(Json)
        .map_err(ApiError::from_error)
}

/// `POST /api/templates/{phase}/{index}/place`: place a template at the
/// configured staging offset.
pub async fn place(
    State(state): State<AppState>,
    Path((phase, index)): Path<(u32, u32)>,
) -> Result<Json<PlacementReport>, ApiError> {
    // Snapshot so an import can proceed while the placement sleeps.
    let catalog = state.catalog.read().await.clone();
    let opts = state.config.placement_options();

    let report = place_by_key(
        state.board.host(),
        &catalog,
        TemplateKey::new(phase, index),
        state.config.staging_offset,
        &opts,
    )
    .await
    .map_err(ApiError::from_error)?;

    if let Err(e) = state.board.persist().await {
        warn!(error = %e, "board snapshot write failed after placement");
    }
    Ok(Json(report))
}

#[cfg(test)]
#[path = "templates_test.rs"]
mod tests;
