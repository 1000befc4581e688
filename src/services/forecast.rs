use chrono::NaiveDate;
use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;
use tracing::{debug, info};

use crate::error::AppError;
use crate::models::forecast::{ForecastChartPoint, NewForecast, WeeklyForecastRow};
use crate::repository::Store;
use crate::utils;

pub struct ForecastService {
    store: Arc<dyn Store>,
}

/// Inclusive date window for forecast queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    /// `week_of` wins over an explicit range; otherwise both bounds are required.
    pub fn resolve(
        start_date: Option<&str>,
        end_date: Option<&str>,
        week_of: Option<&str>,
    ) -> Result<Self, AppError> {
        if let Some(day) = week_of {
            let (start, end) = utils::iso_week_bounds(utils::parse_date(day)?);
            return Ok(Self { start, end });
        }

        let (Some(start), Some(end)) = (start_date, end_date) else {
            return Err(AppError::BadRequest("Missing parameters".to_string()));
        };

        let range = Self {
            start: utils::parse_date(start)?,
            end: utils::parse_date(end)?,
        };

        if range.start > range.end {
            return Err(AppError::BadRequest(
                "start_date must not be after end_date".to_string(),
            ));
        }

        Ok(range)
    }
}

impl ForecastService {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    pub async fn generate(&self, forecast: NewForecast) -> Result<i32, AppError> {
        validate_forecast(&forecast)?;

        let ids: Vec<i32> = forecast.products.iter().map(|p| p.id_product).collect();
        let known: HashSet<i32> = self
            .store
            .products_by_ids(&ids)
            .await?
            .into_iter()
            .map(|p| p.id_product)
            .collect();

        if let Some(missing) = ids.iter().find(|id| !known.contains(id)) {
            return Err(AppError::NotFound(format!("Product {missing} not found")));
        }

        let id_forecast = self.store.insert_forecast(&forecast).await?;

        info!(
            id_forecast,
            forecast_date = %forecast.forecast_date,
            products = forecast.products.len(),
            "Forecast inserted"
        );

        Ok(id_forecast)
    }

    pub async fn weekly(&self, range: DateRange) -> Result<Vec<WeeklyForecastRow>, AppError> {
        let rows = self.store.weekly_forecast(range.start, range.end).await?;
        debug!(start = %range.start, end = %range.end, rows = rows.len(), "Weekly forecast loaded");
        Ok(rows)
    }

    pub async fn weekly_chart(&self, range: DateRange) -> Result<Vec<ForecastChartPoint>, AppError> {
        Ok(group_by_date(self.weekly(range).await?))
    }
}

fn validate_forecast(forecast: &NewForecast) -> Result<(), AppError> {
    if forecast.products.is_empty() {
        return Err(AppError::BadRequest(
            "Forecast must contain at least one product".to_string(),
        ));
    }

    let mut seen = HashSet::new();
    for item in &forecast.products {
        if item.quantity_forecast < 0 {
            return Err(AppError::BadRequest(format!(
                "Negative quantity for product {}",
                item.id_product
            )));
        }
        if !seen.insert(item.id_product) {
            return Err(AppError::BadRequest(format!(
                "Duplicate product {}",
                item.id_product
            )));
        }
    }

    Ok(())
}

/// One point per date, products keyed by name. Repeated names on the same
/// date are summed.
pub fn group_by_date(rows: Vec<WeeklyForecastRow>) -> Vec<ForecastChartPoint> {
    let mut grouped: BTreeMap<NaiveDate, BTreeMap<String, i32>> = BTreeMap::new();

    for row in rows {
        *grouped
            .entry(row.forecast_date)
            .or_default()
            .entry(row.product_name)
            .or_insert(0) += row.quantity_forecast;
    }

    grouped
        .into_iter()
        .map(|(forecast_date, quantities)| ForecastChartPoint {
            forecast_date,
            quantities,
        })
        .collect()
}
