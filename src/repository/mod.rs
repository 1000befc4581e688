pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use chrono::NaiveDate;
use thiserror::Error;
use uuid::Uuid;

use crate::models::delivery::{Delivery, DeliveryStatus, QualityStatus, StatusStamp};
use crate::models::forecast::{ForecastLine, ForecastResult, NewForecast, WeeklyForecastRow};
use crate::models::order::OrderDetail;
use crate::models::plan::{DeliveryPlan, PlanReceipt};
use crate::models::product::Product;
use crate::models::profile::Profile;
use crate::models::sensor::{NewSensorReading, SensorReading};

pub use memory::MemoryStore;
pub use postgres::PgStore;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("{0} not found")]
    NotFound(String),

    #[error("conflicting update: {0}")]
    Conflict(String),

    #[error("corrupt row: {0}")]
    Corrupt(String),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Persistence seam for every table the service touches.
///
/// Multi-row writes (`insert_forecast`, `create_delivery_plan`) are atomic:
/// either every row is written or none is.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Store: Send + Sync {
    async fn ping(&self) -> StoreResult<()>;

    async fn products_by_ids(&self, ids: &[i32]) -> StoreResult<Vec<Product>>;

    async fn insert_forecast(&self, forecast: &NewForecast) -> StoreResult<i32>;

    async fn find_forecast(&self, id_forecast: i32) -> StoreResult<Option<ForecastResult>>;

    /// Lines in the order they were submitted, each product's suppliers
    /// sorted by ascending `id_supplier`.
    async fn forecast_lines(&self, id_forecast: i32) -> StoreResult<Vec<ForecastLine>>;

    async fn weekly_forecast(
        &self,
        start: NaiveDate,
        end: NaiveDate,
    ) -> StoreResult<Vec<WeeklyForecastRow>>;

    async fn create_delivery_plan(&self, plan: &DeliveryPlan) -> StoreResult<PlanReceipt>;

    async fn list_deliveries(&self, status: Option<DeliveryStatus>) -> StoreResult<Vec<Delivery>>;

    async fn find_delivery(&self, id_delivery: i32) -> StoreResult<Option<Delivery>>;

    async fn delivery_orders(&self, id_delivery: i32) -> StoreResult<Vec<OrderDetail>>;

    async fn set_driver(&self, id_delivery: i32, id_driver: Option<Uuid>) -> StoreResult<()>;

    /// Moves `id_delivery` from `from` to `to`; `Conflict` if the row is no
    /// longer in `from`.
    async fn update_status(
        &self,
        id_delivery: i32,
        from: DeliveryStatus,
        to: DeliveryStatus,
        stamp: StatusStamp,
    ) -> StoreResult<()>;

    /// Records `quality` only if it is worse than the stored level and the
    /// delivery is still `in_transit`. Returns the level stored afterwards,
    /// or `None` when the delivery is not in transit.
    async fn raise_quality(
        &self,
        id_delivery: i32,
        quality: QualityStatus,
    ) -> StoreResult<Option<QualityStatus>>;

    async fn find_profile(&self, id: Uuid) -> StoreResult<Option<Profile>>;

    async fn list_drivers(&self) -> StoreResult<Vec<Profile>>;

    async fn insert_reading(&self, reading: &NewSensorReading) -> StoreResult<SensorReading>;

    /// Newest first.
    async fn latest_readings(&self, limit: u32) -> StoreResult<Vec<SensorReading>>;
}
