use axum::extract::State;
use std::sync::Arc;
use tracing::warn;

use crate::error::AppError;
use crate::services::AppState;

pub async fn health_check(State(state): State<Arc<AppState>>) -> Result<&'static str, AppError> {
    state.store.ping().await.map_err(|e| {
        warn!(error = %e, "Health check failed");
        AppError::Unavailable
    })?;
    Ok("OK")
}
