//! Delivery-plan generation.
//!
//! A forecast becomes one draft delivery: each forecast line is ordered from
//! the product's first supplier (lowest `id_supplier`), lines sharing a
//! supplier form one order, and the delivery's temperature threshold is the
//! coldest requirement among all products carried.

use chrono::{NaiveDate, Utc};
use std::sync::Arc;
use thiserror::Error;
use tracing::{info, warn};

use crate::error::AppError;
use crate::models::delivery::{DeliveryStatus, NewDelivery};
use crate::models::forecast::{ForecastLine, ForecastResult};
use crate::models::location::Coordinates;
use crate::models::order::{OrderLine, SupplierOrder};
use crate::models::plan::{DeliveryPlan, PlanReceipt};
use crate::repository::Store;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum PlanError {
    #[error("Forecast has no products")]
    EmptyForecast,

    #[error("Product data missing")]
    ProductDataMissing { id_product: i32 },

    #[error("No supplier found for product {product_name}")]
    NoSupplier { product_name: String },
}

/// Builds the plan for `forecast` without touching storage.
pub fn build_plan(
    forecast: &ForecastResult,
    lines: &[ForecastLine],
    depot: Coordinates,
    order_date: NaiveDate,
) -> Result<DeliveryPlan, PlanError> {
    if lines.is_empty() {
        return Err(PlanError::EmptyForecast);
    }

    let mut orders: Vec<SupplierOrder> = Vec::new();
    let mut departure: Option<Coordinates> = None;
    let mut threshold = f64::INFINITY;

    for line in lines {
        let product = line
            .product
            .as_ref()
            .ok_or(PlanError::ProductDataMissing {
                id_product: line.id_product,
            })?;

        let supplier = product
            .suppliers
            .iter()
            .min_by_key(|s| s.id_supplier)
            .ok_or_else(|| PlanError::NoSupplier {
                product_name: product.product_name.clone(),
            })?;

        threshold = threshold.min(product.temperature_threshold);
        departure.get_or_insert_with(|| supplier.location());

        let order_line = OrderLine {
            id_product: line.id_product,
            quantity: line.quantity_forecast,
        };

        match orders.iter_mut().find(|o| o.id_supplier == supplier.id_supplier) {
            Some(order) => order.lines.push(order_line),
            None => orders.push(SupplierOrder {
                id_supplier: supplier.id_supplier,
                order_date,
                lines: vec![order_line],
            }),
        }
    }

    // Non-empty lines always set a departure.
    let departure = departure.ok_or(PlanError::EmptyForecast)?;

    Ok(DeliveryPlan {
        id_forecast: forecast.id_forecast,
        delivery: NewDelivery {
            delivery_status: DeliveryStatus::Draft,
            temperature_threshold: threshold,
            plan_date: forecast.forecast_date,
            departure,
            arrival: depot,
        },
        orders,
    })
}

pub struct PlannerService {
    store: Arc<dyn Store>,
    depot: Coordinates,
}

impl PlannerService {
    pub fn new(store: Arc<dyn Store>, depot: Coordinates) -> Self {
        Self { store, depot }
    }

    pub async fn generate(&self, id_forecast: i32) -> Result<PlanReceipt, AppError> {
        let forecast = self
            .store
            .find_forecast(id_forecast)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Forecast {id_forecast} not found")))?;

        let lines = self.store.forecast_lines(id_forecast).await?;

        let plan = build_plan(&forecast, &lines, self.depot, Utc::now().date_naive()).map_err(
            |e| {
                warn!(id_forecast, error = %e, "Delivery plan rejected");
                e
            },
        )?;

        let receipt = self.store.create_delivery_plan(&plan).await?;

        info!(
            id_forecast,
            id_delivery = receipt.id_delivery,
            orders = receipt.orders.len(),
            lines = plan.line_count(),
            temperature_threshold = plan.delivery.temperature_threshold,
            "Delivery plan generated"
        );

        Ok(receipt)
    }
}
