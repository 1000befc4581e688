use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        Query, State,
    },
    Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use super::{json_body, query_params};
use crate::error::AppError;
use crate::models::delivery::QualityStatus;
use crate::models::sensor::{SensorPayload, SensorReading};
use crate::services::AppState;

#[derive(Debug, Serialize)]
pub struct UploadResponse {
    pub message: &'static str,
    pub id: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub quality_status: Option<QualityStatus>,
}

#[derive(Debug, Deserialize)]
pub struct FeedQuery {
    pub limit: Option<u32>,
}

pub async fn upload_reading(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<SensorPayload>, JsonRejection>,
) -> Result<Json<UploadResponse>, AppError> {
    let payload = json_body(payload, "Invalid payload")?;
    let outcome = state.monitoring.ingest(payload).await?;

    Ok(Json(UploadResponse {
        message: "Data received",
        id: outcome.reading.id,
        quality_status: outcome.quality_status,
    }))
}

pub async fn latest_readings(
    State(state): State<Arc<AppState>>,
    query: Result<Query<FeedQuery>, QueryRejection>,
) -> Result<Json<Vec<SensorReading>>, AppError> {
    let query = query_params(query)?;
    Ok(Json(state.monitoring.latest(query.limit).await?))
}
