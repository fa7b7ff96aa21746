//! HTTP handlers

use axum::{
    extract::{rejection::JsonRejection, State},
    Json,
};
use serde::Serialize;
use shopsearch_common::{errors::Result, AppError};

use crate::model::{SearchOutcome, SearchRequest};
use crate::AppState;

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub service: String,
    pub version: &'static str,
}

/// Liveness probe
pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        service: state.service.to_string(),
        version: shopsearch_common::VERSION,
    })
}

/// Staged product search
pub async fn search_products(
    State(state): State<AppState>,
    payload: std::result::Result<Json<SearchRequest>, JsonRejection>,
) -> Result<Json<SearchOutcome>> {
    let Json(request) = payload.map_err(|rejection| AppError::Validation {
        message: rejection.body_text(),
        field: None,
    })?;
    request.validate()?;

    let outcome = state.pipeline.search(&request).await?;
    Ok(Json(outcome))
}
