use chrono::{SubsecRound, Utc};
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{error, info, warn};

use crate::error::AppError;
use crate::models::delivery::{Delivery, DeliveryStatus, QualityStatus};
use crate::models::sensor::{NewSensorReading, SensorPayload, SensorReading};
use crate::repository::Store;

const MAX_FEED_LIMIT: u32 = 500;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IngestOutcome {
    pub reading: SensorReading,
    pub quality_status: Option<QualityStatus>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DashboardSummary {
    pub deliveries_by_status: BTreeMap<&'static str, usize>,
    pub critical_in_transit: usize,
    pub latest_reading: Option<SensorReading>,
}

pub struct MonitoringService {
    store: Arc<dyn Store>,
    warning_margin: f64,
    default_limit: u32,
}

impl MonitoringService {
    pub fn new(store: Arc<dyn Store>, warning_margin: f64, default_limit: u32) -> Self {
        Self {
            store,
            warning_margin,
            default_limit,
        }
    }

    pub async fn ingest(&self, payload: SensorPayload) -> Result<IngestOutcome, AppError> {
        payload
            .location()
            .validate()
            .map_err(AppError::BadRequest)?;
        if !payload.temperature.is_finite() {
            return Err(AppError::BadRequest("temperature must be a finite number".into()));
        }

        let delivery = match payload.id_delivery {
            Some(id) => Some(
                self.store
                    .find_delivery(id)
                    .await?
                    .ok_or_else(|| AppError::NotFound(format!("Delivery {id} not found")))?,
            ),
            None => None,
        };

        let reading = NewSensorReading {
            recorded_at: Utc::now().trunc_subsecs(0),
            temperature: payload.temperature,
            location: payload.location(),
            id_delivery: payload.id_delivery,
        };

        info!(
            "[{}] Temp={} °C | Lat={} | Lon={}",
            reading.recorded_at.format("%Y-%m-%d %H:%M:%S"),
            reading.temperature,
            reading.location.latitude,
            reading.location.longitude
        );

        let stored = self.store.insert_reading(&reading).await?;

        let quality_status = match delivery {
            Some(delivery) if delivery.delivery_status == DeliveryStatus::InTransit => {
                self.record_quality(&delivery, reading.temperature).await
            }
            _ => None,
        };

        Ok(IngestOutcome {
            reading: stored,
            quality_status,
        })
    }

    /// The reading is already stored when this runs, so a failed quality
    /// write is logged rather than failing the upload.
    async fn record_quality(&self, delivery: &Delivery, temperature: f64) -> Option<QualityStatus> {
        let assessed =
            QualityStatus::assess(temperature, delivery.temperature_threshold, self.warning_margin);

        if assessed != QualityStatus::Good {
            warn!(
                id_delivery = delivery.id_delivery,
                temperature,
                threshold = delivery.temperature_threshold,
                quality = assessed.as_str(),
                "Cold-chain excursion"
            );
        }

        match self.store.raise_quality(delivery.id_delivery, assessed).await {
            Ok(stored) => stored,
            Err(e) => {
                error!(
                    id_delivery = delivery.id_delivery,
                    error = %e,
                    "Failed to record delivery quality"
                );
                None
            }
        }
    }

    pub async fn latest(&self, limit: Option<u32>) -> Result<Vec<SensorReading>, AppError> {
        let limit = limit.unwrap_or(self.default_limit).clamp(1, MAX_FEED_LIMIT);
        Ok(self.store.latest_readings(limit).await?)
    }

    pub async fn summary(&self) -> Result<DashboardSummary, AppError> {
        let deliveries = self.store.list_deliveries(None).await?;

        let mut deliveries_by_status: BTreeMap<&'static str, usize> = DeliveryStatus::ALL
            .iter()
            .map(|s| (s.as_str(), 0))
            .collect();
        for delivery in &deliveries {
            *deliveries_by_status
                .entry(delivery.delivery_status.as_str())
                .or_insert(0) += 1;
        }

        let critical_in_transit = deliveries
            .iter()
            .filter(|d| {
                d.delivery_status == DeliveryStatus::InTransit
                    && d.quality_status == Some(QualityStatus::Critical)
            })
            .count();

        let latest_reading = self.store.latest_readings(1).await?.into_iter().next();

        Ok(DashboardSummary {
            deliveries_by_status,
            critical_in_transit,
            latest_reading,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::{MockStore, StoreError};

    fn payload(lat: f64, lon: f64) -> SensorPayload {
        SensorPayload {
            temperature: 3.5,
            latitude: lat,
            longitude: lon,
            id_delivery: None,
        }
    }

    #[tokio::test]
    async fn invalid_coordinates_are_not_stored() {
        let mut store = MockStore::new();
        store.expect_insert_reading().never();

        let service = MonitoringService::new(Arc::new(store), 2.0, 20);
        let err = service.ingest(payload(123.0, 0.0)).await.unwrap_err();

        assert!(matches!(err, AppError::BadRequest(_)));
    }

    #[tokio::test]
    async fn feed_limit_is_clamped() {
        let mut store = MockStore::new();
        store
            .expect_latest_readings()
            .withf(|limit| *limit == MAX_FEED_LIMIT)
            .returning(|_| Ok(vec![]));

        let service = MonitoringService::new(Arc::new(store), 2.0, 20);
        service.latest(Some(10_000)).await.unwrap();
    }

    #[tokio::test]
    async fn default_feed_limit_comes_from_config() {
        let mut store = MockStore::new();
        store
            .expect_latest_readings()
            .withf(|limit| *limit == 20)
            .returning(|_| Ok(vec![]));

        let service = MonitoringService::new(Arc::new(store), 2.0, 20);
        service.latest(None).await.unwrap();
    }

    fn delivery(status: DeliveryStatus, quality: Option<QualityStatus>) -> Delivery {
        Delivery {
            id_delivery: 9,
            delivery_status: status,
            temperature_threshold: 4.0,
            plan_date: chrono::NaiveDate::from_ymd_opt(2025, 6, 20).unwrap(),
            depart_lat: -6.5,
            depart_lon: 106.8,
            arrive_lat: -6.2,
            arrive_lon: 106.8166,
            id_driver: None,
            id_container: None,
            quality_status: quality,
            plan_start_time: None,
            plan_end_time: None,
            start_time: None,
            end_time: None,
            driver: None,
        }
    }

    fn reading_for(temperature: f64) -> SensorPayload {
        SensorPayload {
            temperature,
            latitude: -6.3,
            longitude: 106.85,
            id_delivery: Some(9),
        }
    }

    fn stored(reading: &NewSensorReading) -> SensorReading {
        SensorReading {
            id: 1,
            recorded_at: reading.recorded_at,
            temperature: reading.temperature,
            latitude: reading.location.latitude,
            longitude: reading.location.longitude,
            id_delivery: reading.id_delivery,
        }
    }

    #[tokio::test]
    async fn reported_quality_is_the_stored_level() {
        // Snapshot still says `good`; a concurrent upload already stored `critical`.
        let mut store = MockStore::new();
        store
            .expect_find_delivery()
            .returning(|_| Ok(Some(delivery(DeliveryStatus::InTransit, Some(QualityStatus::Good)))));
        store.expect_insert_reading().returning(|r| Ok(stored(r)));
        store
            .expect_raise_quality()
            .withf(|id, quality| *id == 9 && *quality == QualityStatus::Warning)
            .times(1)
            .returning(|_, _| Ok(Some(QualityStatus::Critical)));

        let service = MonitoringService::new(Arc::new(store), 2.0, 20);
        let outcome = service.ingest(reading_for(5.0)).await.unwrap();

        assert_eq!(outcome.quality_status, Some(QualityStatus::Critical));
    }

    #[tokio::test]
    async fn readings_outside_transit_are_not_assessed() {
        let mut store = MockStore::new();
        store
            .expect_find_delivery()
            .returning(|_| Ok(Some(delivery(DeliveryStatus::Planned, None))));
        store.expect_insert_reading().times(1).returning(|r| Ok(stored(r)));
        store.expect_raise_quality().never();

        let service = MonitoringService::new(Arc::new(store), 2.0, 20);
        let outcome = service.ingest(reading_for(30.0)).await.unwrap();

        assert_eq!(outcome.quality_status, None);
        assert_eq!(outcome.reading.id_delivery, Some(9));
    }

    #[tokio::test]
    async fn quality_write_failure_keeps_the_reading() {
        let mut store = MockStore::new();
        store
            .expect_find_delivery()
            .returning(|_| Ok(Some(delivery(DeliveryStatus::InTransit, None))));
        store.expect_insert_reading().times(1).returning(|r| Ok(stored(r)));
        store
            .expect_raise_quality()
            .returning(|_, _| Err(StoreError::Database(sqlx::Error::PoolTimedOut)));

        let service = MonitoringService::new(Arc::new(store), 2.0, 20);
        let outcome = service.ingest(reading_for(9.0)).await.unwrap();

        assert_eq!(outcome.reading.id, 1);
        assert_eq!(outcome.quality_status, None);
    }

    #[tokio::test]
    async fn insert_failure_is_reported() {
        let mut store = MockStore::new();
        store
            .expect_insert_reading()
            .returning(|_| Err(StoreError::Database(sqlx::Error::PoolTimedOut)));

        let service = MonitoringService::new(Arc::new(store), 2.0, 20);
        let err = service.ingest(payload(-6.2, 106.8)).await.unwrap_err();

        assert!(matches!(err, AppError::Store(_)));
    }
}
