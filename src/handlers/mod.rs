pub mod dashboard;
pub mod deliveries;
pub mod forecasts;
pub mod health;
pub mod sensors;

use axum::extract::rejection::{JsonRejection, PathRejection, QueryRejection};
use axum::extract::{Path, Query};
use axum::Json;
use tracing::debug;

use crate::error::AppError;

/// Unwraps a JSON body, turning any extractor rejection into a 400 with `message`.
pub(crate) fn json_body<T>(
    payload: Result<Json<T>, JsonRejection>,
    message: &str,
) -> Result<T, AppError> {
    match payload {
        Ok(Json(value)) => Ok(value),
        Err(rejection) => {
            debug!(error = %rejection, "Rejected request body");
            Err(AppError::BadRequest(message.to_string()))
        }
    }
}

pub(crate) fn query_params<T>(query: Result<Query<T>, QueryRejection>) -> Result<T, AppError> {
    match query {
        Ok(Query(value)) => Ok(value),
        Err(rejection) => {
            debug!(error = %rejection, "Rejected query string");
            Err(AppError::BadRequest("Invalid query parameters".to_string()))
        }
    }
}

pub(crate) fn path_param<T>(path: Result<Path<T>, PathRejection>) -> Result<T, AppError> {
    match path {
        Ok(Path(value)) => Ok(value),
        Err(rejection) => {
            debug!(error = %rejection, "Rejected path parameter");
            Err(AppError::BadRequest("Invalid path parameter".to_string()))
        }
    }
}
