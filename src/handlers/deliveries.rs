use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection, QueryRejection},
        Path, Query, State,
    },
    Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

use super::{json_body, path_param, query_params};
use crate::error::AppError;
use crate::models::delivery::{Delivery, DeliveryDetail, DeliveryStatus};
use crate::models::plan::OrderReceipt;
use crate::models::profile::Profile;
use crate::services::AppState;

#[derive(Debug, Deserialize)]
pub struct PlanRequest {
    pub forecast_id: Option<i32>,
}

#[derive(Debug, Serialize)]
pub struct PlanResponse {
    pub message: &'static str,
    pub id_delivery: i32,
    pub orders: Vec<OrderReceipt>,
}

#[derive(Debug, Deserialize)]
pub struct ListDeliveriesQuery {
    pub status: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct AssignDriverRequest {
    pub id_driver: Option<Uuid>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateStatusRequest {
    pub status: String,
}

pub async fn generate_plan(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<PlanRequest>, JsonRejection>,
) -> Result<Json<PlanResponse>, AppError> {
    let request = json_body(payload, "Invalid request body")?;
    let forecast_id = request
        .forecast_id
        .ok_or_else(|| AppError::BadRequest("Missing forecast_id".to_string()))?;

    let receipt = state.planner.generate(forecast_id).await?;

    Ok(Json(PlanResponse {
        message: "Delivery plan generated",
        id_delivery: receipt.id_delivery,
        orders: receipt.orders,
    }))
}

pub async fn list_deliveries(
    State(state): State<Arc<AppState>>,
    query: Result<Query<ListDeliveriesQuery>, QueryRejection>,
) -> Result<Json<Vec<Delivery>>, AppError> {
    let query = query_params(query)?;
    let status = match query.status.as_deref() {
        None | Some("all") => None,
        Some(value) => Some(
            value
                .parse::<DeliveryStatus>()
                .map_err(AppError::BadRequest)?,
        ),
    };

    Ok(Json(state.deliveries.list(status).await?))
}

pub async fn get_delivery(
    State(state): State<Arc<AppState>>,
    id_delivery: Result<Path<i32>, PathRejection>,
) -> Result<Json<DeliveryDetail>, AppError> {
    let id_delivery = path_param(id_delivery)?;
    Ok(Json(state.deliveries.detail(id_delivery).await?))
}

pub async fn assign_driver(
    State(state): State<Arc<AppState>>,
    id_delivery: Result<Path<i32>, PathRejection>,
    payload: Result<Json<AssignDriverRequest>, JsonRejection>,
) -> Result<Json<Delivery>, AppError> {
    let id_delivery = path_param(id_delivery)?;
    let request = json_body(payload, "Invalid request body")?;
    let delivery = state
        .deliveries
        .assign_driver(id_delivery, request.id_driver)
        .await?;
    Ok(Json(delivery))
}

pub async fn update_status(
    State(state): State<Arc<AppState>>,
    id_delivery: Result<Path<i32>, PathRejection>,
    payload: Result<Json<UpdateStatusRequest>, JsonRejection>,
) -> Result<Json<Delivery>, AppError> {
    let id_delivery = path_param(id_delivery)?;
    let request = json_body(payload, "Invalid request body")?;
    let next = request
        .status
        .parse::<DeliveryStatus>()
        .map_err(AppError::BadRequest)?;

    Ok(Json(state.deliveries.update_status(id_delivery, next).await?))
}

pub async fn list_drivers(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<Profile>>, AppError> {
    Ok(Json(state.deliveries.drivers().await?))
}
