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
use crate::models::forecast::{ForecastChartPoint, NewForecast, WeeklyForecastRow};
use crate::services::forecast::DateRange;
use crate::services::AppState;

#[derive(Debug, Deserialize)]
pub struct WeeklyQuery {
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub week_of: Option<String>,
}

impl WeeklyQuery {
    fn range(&self) -> Result<DateRange, AppError> {
        DateRange::resolve(
            self.start_date.as_deref(),
            self.end_date.as_deref(),
            self.week_of.as_deref(),
        )
    }
}

#[derive(Debug, Serialize)]
pub struct ForecastCreated {
    pub message: &'static str,
    pub id_forecast: i32,
}

pub async fn generate_forecast(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<NewForecast>, JsonRejection>,
) -> Result<Json<ForecastCreated>, AppError> {
    let forecast = json_body(payload, "Invalid forecast payload")?;
    let id_forecast = state.forecasts.generate(forecast).await?;

    Ok(Json(ForecastCreated {
        message: "Forecast inserted successfully",
        id_forecast,
    }))
}

pub async fn weekly_forecast(
    State(state): State<Arc<AppState>>,
    query: Result<Query<WeeklyQuery>, QueryRejection>,
) -> Result<Json<Vec<WeeklyForecastRow>>, AppError> {
    let rows = state.forecasts.weekly(query_params(query)?.range()?).await?;
    Ok(Json(rows))
}

pub async fn weekly_chart(
    State(state): State<Arc<AppState>>,
    query: Result<Query<WeeklyQuery>, QueryRejection>,
) -> Result<Json<Vec<ForecastChartPoint>>, AppError> {
    let points = state.forecasts.weekly_chart(query_params(query)?.range()?).await?;
    Ok(Json(points))
}
