use axum::{extract::State, Json};
use std::sync::Arc;

use crate::error::AppError;
use crate::services::monitoring::DashboardSummary;
use crate::services::AppState;

pub async fn summary(
    State(state): State<Arc<AppState>>,
) -> Result<Json<DashboardSummary>, AppError> {
    Ok(Json(state.monitoring.summary().await?))
}
