use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::product::Supplier;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ForecastResult {
    pub id_forecast: i32,
    pub forecast_date: NaiveDate,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ForecastItem {
    pub id_product: i32,
    pub quantity_forecast: i32,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct NewForecast {
    pub forecast_date: NaiveDate,
    pub products: Vec<ForecastItem>,
}

/// A forecast line joined with its product and the product's suppliers.
/// `product` is `None` when the referenced product row no longer exists.
#[derive(Clone, Debug, PartialEq)]
pub struct ForecastLine {
    pub id_product: i32,
    pub quantity_forecast: i32,
    pub product: Option<ProductSupply>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct ProductSupply {
    pub product_name: String,
    pub temperature_threshold: f64,
    pub suppliers: Vec<Supplier>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct WeeklyForecastRow {
    pub forecast_date: NaiveDate,
    pub product_name: String,
    pub quantity_forecast: i32,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ForecastChartPoint {
    pub forecast_date: NaiveDate,
    pub quantities: BTreeMap<String, i32>,
}
