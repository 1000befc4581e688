use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use parking_lot::RwLock;
use std::collections::{BTreeMap, BTreeSet, HashMap, VecDeque};
use uuid::Uuid;

use super::{Store, StoreError, StoreResult};
use crate::models::delivery::{Delivery, DeliveryStatus, DriverRef, QualityStatus, StatusStamp};
use crate::models::forecast::{
    ForecastItem, ForecastLine, ForecastResult, NewForecast, ProductSupply, WeeklyForecastRow,
};
use crate::models::location::Coordinates;
use crate::models::order::{OrderDetail, OrderLine, OrderProductDetail};
use crate::models::plan::{DeliveryPlan, OrderReceipt, PlanReceipt};
use crate::models::product::{Product, Supplier};
use crate::models::profile::{Profile, Role};
use crate::models::sensor::{NewSensorReading, SensorReading};

/// Oldest readings are dropped past this many.
pub const READING_RETENTION: usize = 10_000;

struct ForecastRecord {
    forecast_date: NaiveDate,
    items: Vec<ForecastItem>,
}

struct DeliveryRecord {
    status: DeliveryStatus,
    temperature_threshold: f64,
    plan_date: NaiveDate,
    departure: Coordinates,
    arrival: Coordinates,
    id_driver: Option<Uuid>,
    quality_status: Option<QualityStatus>,
    start_time: Option<DateTime<Utc>>,
    end_time: Option<DateTime<Utc>>,
}

struct OrderRecord {
    id_delivery: i32,
    id_supplier: i32,
    order_date: NaiveDate,
    lines: Vec<OrderLine>,
}

#[derive(Default)]
struct Tables {
    products: BTreeMap<i32, Product>,
    suppliers: BTreeMap<i32, Supplier>,
    /// (id_product, id_supplier)
    supplier_products: BTreeSet<(i32, i32)>,
    forecasts: BTreeMap<i32, ForecastRecord>,
    profiles: HashMap<Uuid, Profile>,
    deliveries: BTreeMap<i32, DeliveryRecord>,
    orders: BTreeMap<i32, OrderRecord>,
    /// Insertion order, which is also id order.
    readings: VecDeque<SensorReading>,
    next_id: i64,
}

impl Tables {
    fn next_id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }

    fn next_i32(&mut self) -> i32 {
        self.next_id() as i32
    }

    fn delivery(&self, id_delivery: i32, record: &DeliveryRecord) -> Delivery {
        let driver = record
            .id_driver
            .and_then(|id| self.profiles.get(&id))
            .map(|p| DriverRef {
                id: p.id,
                name: p.name.clone(),
            });

        Delivery {
            id_delivery,
            delivery_status: record.status,
            temperature_threshold: record.temperature_threshold,
            plan_date: record.plan_date,
            depart_lat: record.departure.latitude,
            depart_lon: record.departure.longitude,
            arrive_lat: record.arrival.latitude,
            arrive_lon: record.arrival.longitude,
            id_driver: record.id_driver,
            id_container: None,
            quality_status: record.quality_status,
            plan_start_time: None,
            plan_end_time: None,
            start_time: record.start_time,
            end_time: record.end_time,
            driver,
        }
    }
}

/// Process-local store backing `STORAGE=memory` and the test suite.
#[derive(Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// A small catalog of chilled and frozen goods with suppliers and drivers.
    pub fn with_demo_catalog() -> Self {
        let store = Self::new();

        let vegetables = store.add_product("Sayuran Segar", 4.0);
        let fruit = store.add_product("Buah Import", 2.0);
        let meat = store.add_product("Daging Beku", -18.0);

        let farm = store.add_supplier("Tani Makmur", Coordinates::new(-6.5971, 106.806));
        let importer = store.add_supplier("Segar Impor", Coordinates::new(-6.1214, 106.7741));
        let butcher = store.add_supplier("Beku Jaya", Coordinates::new(-6.2383, 106.9756));

        store.link_supplier(farm, vegetables);
        store.link_supplier(importer, fruit);
        store.link_supplier(farm, fruit);
        store.link_supplier(butcher, meat);

        store.add_profile("Admin Gudang", Role::Management);
        store.add_profile("Suhono", Role::Driver);
        store.add_profile("Budi", Role::Driver);

        store
    }

    pub fn add_product(&self, name: &str, temperature_threshold: f64) -> i32 {
        let mut tables = self.tables.write();
        let id_product = tables.next_i32();
        tables.products.insert(
            id_product,
            Product {
                id_product,
                product_name: name.to_string(),
                temperature_threshold,
            },
        );
        id_product
    }

    pub fn add_supplier(&self, name: &str, location: Coordinates) -> i32 {
        let mut tables = self.tables.write();
        let id_supplier = tables.next_i32();
        tables.suppliers.insert(
            id_supplier,
            Supplier {
                id_supplier,
                supplier_name: name.to_string(),
                latitude: location.latitude,
                longitude: location.longitude,
            },
        );
        id_supplier
    }

    pub fn link_supplier(&self, id_supplier: i32, id_product: i32) {
        self.tables
            .write()
            .supplier_products
            .insert((id_product, id_supplier));
    }

    pub fn add_profile(&self, name: &str, role: Role) -> Uuid {
        let id = Uuid::new_v4();
        self.tables.write().profiles.insert(
            id,
            Profile {
                id,
                name: name.to_string(),
                role,
            },
        );
        id
    }

    pub fn remove_product(&self, id_product: i32) {
        let mut tables = self.tables.write();
        tables.products.remove(&id_product);
        tables.supplier_products.retain(|(p, _)| *p != id_product);
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn ping(&self) -> StoreResult<()> {
        Ok(())
    }

    async fn products_by_ids(&self, ids: &[i32]) -> StoreResult<Vec<Product>> {
        let tables = self.tables.read();
        let wanted: BTreeSet<i32> = ids.iter().copied().collect();
        Ok(wanted
            .into_iter()
            .filter_map(|id| tables.products.get(&id).cloned())
            .collect())
    }

    async fn insert_forecast(&self, forecast: &NewForecast) -> StoreResult<i32> {
        let mut tables = self.tables.write();
        let id_forecast = tables.next_i32();
        tables.forecasts.insert(
            id_forecast,
            ForecastRecord {
                forecast_date: forecast.forecast_date,
                items: forecast.products.clone(),
            },
        );
        Ok(id_forecast)
    }

    async fn find_forecast(&self, id_forecast: i32) -> StoreResult<Option<ForecastResult>> {
        let tables = self.tables.read();
        Ok(tables
            .forecasts
            .get(&id_forecast)
            .map(|record| ForecastResult {
                id_forecast,
                forecast_date: record.forecast_date,
            }))
    }

    async fn forecast_lines(&self, id_forecast: i32) -> StoreResult<Vec<ForecastLine>> {
        let tables = self.tables.read();
        let Some(record) = tables.forecasts.get(&id_forecast) else {
            return Ok(Vec::new());
        };

        Ok(record
            .items
            .iter()
            .map(|item| {
                let product = tables.products.get(&item.id_product).map(|p| ProductSupply {
                    product_name: p.product_name.clone(),
                    temperature_threshold: p.temperature_threshold,
                    suppliers: tables
                        .supplier_products
                        .range((item.id_product, i32::MIN)..=(item.id_product, i32::MAX))
                        .filter_map(|(_, id_supplier)| tables.suppliers.get(id_supplier).cloned())
                        .collect(),
                });

                ForecastLine {
                    id_product: item.id_product,
                    quantity_forecast: item.quantity_forecast,
                    product,
                }
            })
            .collect())
    }

    async fn weekly_forecast(
        &self,
        start: NaiveDate,
        end: NaiveDate,
    ) -> StoreResult<Vec<WeeklyForecastRow>> {
        let tables = self.tables.read();
        let mut forecasts: Vec<(&i32, &ForecastRecord)> = tables
            .forecasts
            .iter()
            .filter(|(_, f)| f.forecast_date >= start && f.forecast_date <= end)
            .collect();
        forecasts.sort_by_key(|(id, f)| (f.forecast_date, **id));

        Ok(forecasts
            .into_iter()
            .flat_map(|(_, f)| {
                f.items.iter().filter_map(|item| {
                    tables
                        .products
                        .get(&item.id_product)
                        .map(|p| WeeklyForecastRow {
                            forecast_date: f.forecast_date,
                            product_name: p.product_name.clone(),
                            quantity_forecast: item.quantity_forecast,
                        })
                })
            })
            .collect())
    }

    async fn create_delivery_plan(&self, plan: &DeliveryPlan) -> StoreResult<PlanReceipt> {
        let mut tables = self.tables.write();

        if let Some(missing) = plan
            .orders
            .iter()
            .find(|o| !tables.suppliers.contains_key(&o.id_supplier))
        {
            return Err(StoreError::NotFound(format!("supplier {}", missing.id_supplier)));
        }

        let id_delivery = tables.next_i32();
        tables.deliveries.insert(
            id_delivery,
            DeliveryRecord {
                status: plan.delivery.delivery_status,
                temperature_threshold: plan.delivery.temperature_threshold,
                plan_date: plan.delivery.plan_date,
                departure: plan.delivery.departure,
                arrival: plan.delivery.arrival,
                id_driver: None,
                quality_status: None,
                start_time: None,
                end_time: None,
            },
        );

        let mut orders = Vec::with_capacity(plan.orders.len());
        for order in &plan.orders {
            let id_order = tables.next_i32();
            tables.orders.insert(
                id_order,
                OrderRecord {
                    id_delivery,
                    id_supplier: order.id_supplier,
                    order_date: order.order_date,
                    lines: order.lines.clone(),
                },
            );
            orders.push(OrderReceipt {
                id_order,
                id_supplier: order.id_supplier,
                line_count: order.lines.len(),
            });
        }

        Ok(PlanReceipt {
            id_delivery,
            orders,
        })
    }

    async fn list_deliveries(&self, status: Option<DeliveryStatus>) -> StoreResult<Vec<Delivery>> {
        let tables = self.tables.read();
        let mut deliveries: Vec<Delivery> = tables
            .deliveries
            .iter()
            .filter(|(_, d)| status.map_or(true, |s| d.status == s))
            .map(|(id, d)| tables.delivery(*id, d))
            .collect();
        deliveries.sort_by_key(|d| (d.plan_date, d.id_delivery));
        Ok(deliveries)
    }

    async fn find_delivery(&self, id_delivery: i32) -> StoreResult<Option<Delivery>> {
        let tables = self.tables.read();
        Ok(tables
            .deliveries
            .get(&id_delivery)
            .map(|d| tables.delivery(id_delivery, d)))
    }

    async fn delivery_orders(&self, id_delivery: i32) -> StoreResult<Vec<OrderDetail>> {
        let tables = self.tables.read();
        Ok(tables
            .orders
            .iter()
            .filter(|(_, o)| o.id_delivery == id_delivery)
            .map(|(id_order, o)| OrderDetail {
                id_order: *id_order,
                id_supplier: o.id_supplier,
                supplier_name: tables
                    .suppliers
                    .get(&o.id_supplier)
                    .map(|s| s.supplier_name.clone())
                    .unwrap_or_default(),
                order_date: o.order_date,
                products: o
                    .lines
                    .iter()
                    .map(|line| OrderProductDetail {
                        id_product: line.id_product,
                        product_name: tables
                            .products
                            .get(&line.id_product)
                            .map(|p| p.product_name.clone())
                            .unwrap_or_default(),
                        quantity: line.quantity,
                    })
                    .collect(),
            })
            .collect())
    }

    async fn set_driver(&self, id_delivery: i32, id_driver: Option<Uuid>) -> StoreResult<()> {
        let mut tables = self.tables.write();
        let record = tables
            .deliveries
            .get_mut(&id_delivery)
            .ok_or_else(|| StoreError::NotFound(format!("delivery {id_delivery}")))?;
        record.id_driver = id_driver;
        Ok(())
    }

    async fn update_status(
        &self,
        id_delivery: i32,
        from: DeliveryStatus,
        to: DeliveryStatus,
        stamp: StatusStamp,
    ) -> StoreResult<()> {
        let mut tables = self.tables.write();
        let record = tables
            .deliveries
            .get_mut(&id_delivery)
            .ok_or_else(|| StoreError::NotFound(format!("delivery {id_delivery}")))?;

        if record.status != from {
            return Err(StoreError::Conflict(format!(
                "delivery {id_delivery} is no longer {from}"
            )));
        }

        record.status = to;
        record.start_time = stamp.start_time.or(record.start_time);
        record.end_time = stamp.end_time.or(record.end_time);
        Ok(())
    }

    async fn raise_quality(
        &self,
        id_delivery: i32,
        quality: QualityStatus,
    ) -> StoreResult<Option<QualityStatus>> {
        let mut tables = self.tables.write();
        let record = tables
            .deliveries
            .get_mut(&id_delivery)
            .ok_or_else(|| StoreError::NotFound(format!("delivery {id_delivery}")))?;

        if record.status != DeliveryStatus::InTransit {
            return Ok(None);
        }

        let raised = record
            .quality_status
            .map_or(quality, |current| current.max(quality));
        record.quality_status = Some(raised);
        Ok(Some(raised))
    }

    async fn find_profile(&self, id: Uuid) -> StoreResult<Option<Profile>> {
        Ok(self.tables.read().profiles.get(&id).cloned())
    }

    async fn list_drivers(&self) -> StoreResult<Vec<Profile>> {
        let tables = self.tables.read();
        let mut drivers: Vec<Profile> = tables
            .profiles
            .values()
            .filter(|p| p.role == Role::Driver)
            .cloned()
            .collect();
        drivers.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(drivers)
    }

    async fn insert_reading(&self, reading: &NewSensorReading) -> StoreResult<SensorReading> {
        let mut tables = self.tables.write();
        let stored = SensorReading {
            id: tables.next_id(),
            recorded_at: reading.recorded_at,
            temperature: reading.temperature,
            latitude: reading.location.latitude,
            longitude: reading.location.longitude,
            id_delivery: reading.id_delivery,
        };
        if tables.readings.len() == READING_RETENTION {
            tables.readings.pop_front();
        }
        tables.readings.push_back(stored.clone());
        Ok(stored)
    }

    async fn latest_readings(&self, limit: u32) -> StoreResult<Vec<SensorReading>> {
        let tables = self.tables.read();
        Ok(tables
            .readings
            .iter()
            .rev()
            .take(limit as usize)
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn in_transit(store: &MemoryStore) -> i32 {
        let mut tables = store.tables.write();
        let id_delivery = tables.next_i32();
        tables.deliveries.insert(
            id_delivery,
            DeliveryRecord {
                status: DeliveryStatus::InTransit,
                temperature_threshold: 4.0,
                plan_date: NaiveDate::from_ymd_opt(2024, 5, 7).unwrap(),
                departure: Coordinates::new(-6.5, 106.8),
                arrival: Coordinates::new(-6.2, 106.8166),
                id_driver: None,
                quality_status: None,
                start_time: None,
                end_time: None,
            },
        );
        id_delivery
    }

    fn reading(seconds: i64) -> NewSensorReading {
        NewSensorReading {
            recorded_at: Utc.with_ymd_and_hms(2024, 5, 7, 8, 0, 0).unwrap()
                + Duration::seconds(seconds),
            temperature: 3.0,
            location: Coordinates::new(-6.2, 106.8),
            id_delivery: None,
        }
    }

    #[tokio::test]
    async fn quality_is_only_raised() {
        let store = MemoryStore::new();
        let id = in_transit(&store);

        assert_eq!(
            store.raise_quality(id, QualityStatus::Critical).await.unwrap(),
            Some(QualityStatus::Critical)
        );
        assert_eq!(
            store.raise_quality(id, QualityStatus::Warning).await.unwrap(),
            Some(QualityStatus::Critical)
        );

        let delivery = store.find_delivery(id).await.unwrap().unwrap();
        assert_eq!(delivery.quality_status, Some(QualityStatus::Critical));
    }

    #[tokio::test]
    async fn quality_is_not_written_outside_transit() {
        let store = MemoryStore::new();
        let id = in_transit(&store);
        store
            .update_status(
                id,
                DeliveryStatus::InTransit,
                DeliveryStatus::Delivered,
                StatusStamp::default(),
            )
            .await
            .unwrap();

        assert_eq!(store.raise_quality(id, QualityStatus::Critical).await.unwrap(), None);
        assert_eq!(store.find_delivery(id).await.unwrap().unwrap().quality_status, None);
    }

    #[tokio::test]
    async fn raising_unknown_delivery_is_not_found() {
        let store = MemoryStore::new();
        let err = store.raise_quality(404, QualityStatus::Good).await.unwrap_err();
        assert!(matches!(err, StoreError::NotFound(_)));
    }

    #[tokio::test]
    async fn feed_is_newest_first_and_bounded() {
        let store = MemoryStore::new();
        for i in 0..(READING_RETENTION as i64 + 5) {
            store.insert_reading(&reading(i)).await.unwrap();
        }

        let latest = store.latest_readings(3).await.unwrap();
        let ids: Vec<i64> = latest.iter().map(|r| r.id).collect();
        assert_eq!(ids.len(), 3);
        assert!(ids[0] > ids[1] && ids[1] > ids[2]);

        let all = store.latest_readings(u32::MAX).await.unwrap();
        assert_eq!(all.len(), READING_RETENTION);
        assert_eq!(all.last().unwrap().recorded_at, reading(5).recorded_at);
    }
}
