use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use sqlx::PgPool;
use std::collections::HashMap;
use uuid::Uuid;

use super::{Store, StoreError, StoreResult};
use crate::models::delivery::{Delivery, DeliveryStatus, DriverRef, QualityStatus, StatusStamp};
use crate::models::forecast::{
    ForecastLine, ForecastResult, NewForecast, ProductSupply, WeeklyForecastRow,
};
use crate::models::order::{OrderDetail, OrderProductDetail};
use crate::models::plan::{DeliveryPlan, OrderReceipt, PlanReceipt};
use crate::models::product::{Product, Supplier};
use crate::models::profile::{Profile, Role};
use crate::models::sensor::{NewSensorReading, SensorReading};

const DELIVERY_COLUMNS: &str = "d.id_delivery, d.delivery_status, d.temperature_threshold, \
    d.plan_date, d.depart_lat, d.depart_lon, d.arrive_lat, d.arrive_lon, d.id_driver, \
    d.id_container, d.quality_status, d.plan_start_time, d.plan_end_time, d.start_time, \
    d.end_time, pr.name AS driver_name";

/// SQL ordering of `quality_status`, matching `QualityStatus::rank`.
const QUALITY_RANK: &str =
    "(CASE quality_status WHEN 'good' THEN 0 WHEN 'warning' THEN 1 ELSE 2 END)";

pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    fn delivery_query(filter: &str) -> String {
        format!(
            "SELECT {DELIVERY_COLUMNS} FROM deliveries d \
             LEFT JOIN profiles pr ON pr.id = d.id_driver \
             {filter} \
             ORDER BY d.plan_date ASC, d.id_delivery ASC"
        )
    }
}

#[derive(sqlx::FromRow)]
struct DeliveryRow {
    id_delivery: i32,
    delivery_status: String,
    temperature_threshold: f64,
    plan_date: NaiveDate,
    depart_lat: f64,
    depart_lon: f64,
    arrive_lat: f64,
    arrive_lon: f64,
    id_driver: Option<Uuid>,
    id_container: Option<String>,
    quality_status: Option<String>,
    plan_start_time: Option<DateTime<Utc>>,
    plan_end_time: Option<DateTime<Utc>>,
    start_time: Option<DateTime<Utc>>,
    end_time: Option<DateTime<Utc>>,
    driver_name: Option<String>,
}

impl TryFrom<DeliveryRow> for Delivery {
    type Error = StoreError;

    fn try_from(row: DeliveryRow) -> Result<Self, Self::Error> {
        let delivery_status = row
            .delivery_status
            .parse::<DeliveryStatus>()
            .map_err(StoreError::Corrupt)?;
        let quality_status = row
            .quality_status
            .map(|q| q.parse::<QualityStatus>())
            .transpose()
            .map_err(StoreError::Corrupt)?;
        let driver = match (row.id_driver, row.driver_name) {
            (Some(id), Some(name)) => Some(DriverRef { id, name }),
            _ => None,
        };

        Ok(Delivery {
            id_delivery: row.id_delivery,
            delivery_status,
            temperature_threshold: row.temperature_threshold,
            plan_date: row.plan_date,
            depart_lat: row.depart_lat,
            depart_lon: row.depart_lon,
            arrive_lat: row.arrive_lat,
            arrive_lon: row.arrive_lon,
            id_driver: row.id_driver,
            id_container: row.id_container,
            quality_status,
            plan_start_time: row.plan_start_time,
            plan_end_time: row.plan_end_time,
            start_time: row.start_time,
            end_time: row.end_time,
            driver,
        })
    }
}

#[derive(sqlx::FromRow)]
struct ProfileRow {
    id: Uuid,
    name: String,
    role: String,
}

impl TryFrom<ProfileRow> for Profile {
    type Error = StoreError;

    fn try_from(row: ProfileRow) -> Result<Self, Self::Error> {
        Ok(Profile {
            id: row.id,
            name: row.name,
            role: row.role.parse::<Role>().map_err(StoreError::Corrupt)?,
        })
    }
}

#[derive(sqlx::FromRow)]
struct ForecastLineRow {
    id_product: i32,
    quantity_forecast: i32,
    product_name: Option<String>,
    temperature_threshold: Option<f64>,
}

#[derive(sqlx::FromRow)]
struct SupplierLinkRow {
    id_product: i32,
    id_supplier: i32,
    supplier_name: String,
    latitude: f64,
    longitude: f64,
}

#[derive(sqlx::FromRow)]
struct OrderRow {
    id_order: i32,
    id_supplier: i32,
    supplier_name: String,
    order_date: NaiveDate,
}

#[derive(sqlx::FromRow)]
struct OrderProductRow {
    id_order: i32,
    id_product: i32,
    product_name: String,
    quantity: i32,
}

#[derive(sqlx::FromRow)]
struct SensorRow {
    id: i64,
    recorded_at: DateTime<Utc>,
    temperature: f64,
    latitude: f64,
    longitude: f64,
    id_delivery: Option<i32>,
}

impl From<SensorRow> for SensorReading {
    fn from(row: SensorRow) -> Self {
        SensorReading {
            id: row.id,
            recorded_at: row.recorded_at,
            temperature: row.temperature,
            latitude: row.latitude,
            longitude: row.longitude,
            id_delivery: row.id_delivery,
        }
    }
}

#[async_trait]
impl Store for PgStore {
    async fn ping(&self) -> StoreResult<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    async fn products_by_ids(&self, ids: &[i32]) -> StoreResult<Vec<Product>> {
        let rows = sqlx::query_as::<_, (i32, String, f64)>(
            "SELECT id_product, product_name, temperature_threshold \
             FROM products WHERE id_product = ANY($1) ORDER BY id_product",
        )
        .bind(ids.to_vec())
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|(id_product, product_name, temperature_threshold)| Product {
                id_product,
                product_name,
                temperature_threshold,
            })
            .collect())
    }

    async fn insert_forecast(&self, forecast: &NewForecast) -> StoreResult<i32> {
        let mut tx = self.pool.begin().await?;

        let id_forecast: i32 = sqlx::query_scalar(
            "INSERT INTO forecast_results (forecast_date) VALUES ($1) RETURNING id_forecast",
        )
        .bind(forecast.forecast_date)
        .fetch_one(&mut *tx)
        .await?;

        for (position, item) in forecast.products.iter().enumerate() {
            sqlx::query(
                "INSERT INTO forecast_products (id_forecast, id_product, quantity_forecast, position) \
                 VALUES ($1, $2, $3, $4)",
            )
            .bind(id_forecast)
            .bind(item.id_product)
            .bind(item.quantity_forecast)
            .bind(position as i32)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(id_forecast)
    }

    async fn find_forecast(&self, id_forecast: i32) -> StoreResult<Option<ForecastResult>> {
        let row = sqlx::query_as::<_, (i32, NaiveDate)>(
            "SELECT id_forecast, forecast_date FROM forecast_results WHERE id_forecast = $1",
        )
        .bind(id_forecast)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|(id_forecast, forecast_date)| ForecastResult {
            id_forecast,
            forecast_date,
        }))
    }

    async fn forecast_lines(&self, id_forecast: i32) -> StoreResult<Vec<ForecastLine>> {
        let lines = sqlx::query_as::<_, ForecastLineRow>(
            "SELECT fp.id_product, fp.quantity_forecast, p.product_name, p.temperature_threshold \
             FROM forecast_products fp \
             LEFT JOIN products p ON p.id_product = fp.id_product \
             WHERE fp.id_forecast = $1 \
             ORDER BY fp.position ASC",
        )
        .bind(id_forecast)
        .fetch_all(&self.pool)
        .await?;

        let product_ids: Vec<i32> = lines.iter().map(|l| l.id_product).collect();

        let links = sqlx::query_as::<_, SupplierLinkRow>(
            "SELECT sp.id_product, s.id_supplier, s.supplier_name, s.latitude, s.longitude \
             FROM supplier_products sp \
             JOIN suppliers s ON s.id_supplier = sp.id_supplier \
             WHERE sp.id_product = ANY($1) \
             ORDER BY s.id_supplier ASC",
        )
        .bind(product_ids)
        .fetch_all(&self.pool)
        .await?;

        let mut suppliers: HashMap<i32, Vec<Supplier>> = HashMap::new();
        for link in links {
            suppliers.entry(link.id_product).or_default().push(Supplier {
                id_supplier: link.id_supplier,
                supplier_name: link.supplier_name,
                latitude: link.latitude,
                longitude: link.longitude,
            });
        }

        Ok(lines
            .into_iter()
            .map(|line| {
                let product = match (line.product_name, line.temperature_threshold) {
                    (Some(product_name), Some(temperature_threshold)) => Some(ProductSupply {
                        product_name,
                        temperature_threshold,
                        suppliers: suppliers.get(&line.id_product).cloned().unwrap_or_default(),
                    }),
                    _ => None,
                };

                ForecastLine {
                    id_product: line.id_product,
                    quantity_forecast: line.quantity_forecast,
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
        let rows = sqlx::query_as::<_, (NaiveDate, String, i32)>(
            "SELECT fr.forecast_date, p.product_name, fp.quantity_forecast \
             FROM forecast_results fr \
             JOIN forecast_products fp ON fp.id_forecast = fr.id_forecast \
             JOIN products p ON p.id_product = fp.id_product \
             WHERE fr.forecast_date >= $1 AND fr.forecast_date <= $2 \
             ORDER BY fr.forecast_date ASC, fr.id_forecast ASC, fp.position ASC",
        )
        .bind(start)
        .bind(end)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|(forecast_date, product_name, quantity_forecast)| WeeklyForecastRow {
                forecast_date,
                product_name,
                quantity_forecast,
            })
            .collect())
    }

    async fn create_delivery_plan(&self, plan: &DeliveryPlan) -> StoreResult<PlanReceipt> {
        let mut tx = self.pool.begin().await?;
        let delivery = &plan.delivery;

        let id_delivery: i32 = sqlx::query_scalar(
            "INSERT INTO deliveries \
             (delivery_status, temperature_threshold, plan_date, depart_lat, depart_lon, arrive_lat, arrive_lon) \
             VALUES ($1, $2, $3, $4, $5, $6, $7) RETURNING id_delivery",
        )
        .bind(delivery.delivery_status.as_str())
        .bind(delivery.temperature_threshold)
        .bind(delivery.plan_date)
        .bind(delivery.departure.latitude)
        .bind(delivery.departure.longitude)
        .bind(delivery.arrival.latitude)
        .bind(delivery.arrival.longitude)
        .fetch_one(&mut *tx)
        .await?;

        let mut orders = Vec::with_capacity(plan.orders.len());

        for order in &plan.orders {
            let id_order: i32 = sqlx::query_scalar(
                "INSERT INTO orders (id_delivery, id_supplier, order_date) \
                 VALUES ($1, $2, $3) RETURNING id_order",
            )
            .bind(id_delivery)
            .bind(order.id_supplier)
            .bind(order.order_date)
            .fetch_one(&mut *tx)
            .await?;

            for (position, line) in order.lines.iter().enumerate() {
                sqlx::query(
                    "INSERT INTO order_products (id_order, id_product, quantity, position) \
                     VALUES ($1, $2, $3, $4)",
                )
                .bind(id_order)
                .bind(line.id_product)
                .bind(line.quantity)
                .bind(position as i32)
                .execute(&mut *tx)
                .await?;
            }

            orders.push(OrderReceipt {
                id_order,
                id_supplier: order.id_supplier,
                line_count: order.lines.len(),
            });
        }

        tx.commit().await?;

        Ok(PlanReceipt {
            id_delivery,
            orders,
        })
    }

    async fn list_deliveries(&self, status: Option<DeliveryStatus>) -> StoreResult<Vec<Delivery>> {
        let rows = match status {
            Some(status) => {
                sqlx::query_as::<_, DeliveryRow>(&Self::delivery_query(
                    "WHERE d.delivery_status = $1",
                ))
                .bind(status.as_str())
                .fetch_all(&self.pool)
                .await?
            }
            None => {
                sqlx::query_as::<_, DeliveryRow>(&Self::delivery_query(""))
                    .fetch_all(&self.pool)
                    .await?
            }
        };

        rows.into_iter().map(Delivery::try_from).collect()
    }

    async fn find_delivery(&self, id_delivery: i32) -> StoreResult<Option<Delivery>> {
        let row = sqlx::query_as::<_, DeliveryRow>(&Self::delivery_query(
            "WHERE d.id_delivery = $1",
        ))
        .bind(id_delivery)
        .fetch_optional(&self.pool)
        .await?;

        row.map(Delivery::try_from).transpose()
    }

    async fn delivery_orders(&self, id_delivery: i32) -> StoreResult<Vec<OrderDetail>> {
        let orders = sqlx::query_as::<_, OrderRow>(
            "SELECT o.id_order, o.id_supplier, s.supplier_name, o.order_date \
             FROM orders o JOIN suppliers s ON s.id_supplier = o.id_supplier \
             WHERE o.id_delivery = $1 ORDER BY o.id_order ASC",
        )
        .bind(id_delivery)
        .fetch_all(&self.pool)
        .await?;

        let products = sqlx::query_as::<_, OrderProductRow>(
            "SELECT op.id_order, op.id_product, p.product_name, op.quantity \
             FROM order_products op \
             JOIN orders o ON o.id_order = op.id_order \
             JOIN products p ON p.id_product = op.id_product \
             WHERE o.id_delivery = $1 ORDER BY op.id_order ASC, op.position ASC",
        )
        .bind(id_delivery)
        .fetch_all(&self.pool)
        .await?;

        let mut lines: HashMap<i32, Vec<OrderProductDetail>> = HashMap::new();
        for row in products {
            lines.entry(row.id_order).or_default().push(OrderProductDetail {
                id_product: row.id_product,
                product_name: row.product_name,
                quantity: row.quantity,
            });
        }

        Ok(orders
            .into_iter()
            .map(|order| OrderDetail {
                products: lines.remove(&order.id_order).unwrap_or_default(),
                id_order: order.id_order,
                id_supplier: order.id_supplier,
                supplier_name: order.supplier_name,
                order_date: order.order_date,
            })
            .collect())
    }

    async fn set_driver(&self, id_delivery: i32, id_driver: Option<Uuid>) -> StoreResult<()> {
        let result = sqlx::query("UPDATE deliveries SET id_driver = $2 WHERE id_delivery = $1")
            .bind(id_delivery)
            .bind(id_driver)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound(format!("delivery {id_delivery}")));
        }
        Ok(())
    }

    async fn update_status(
        &self,
        id_delivery: i32,
        from: DeliveryStatus,
        to: DeliveryStatus,
        stamp: StatusStamp,
    ) -> StoreResult<()> {
        let result = sqlx::query(
            "UPDATE deliveries SET delivery_status = $3, \
             start_time = COALESCE($4, start_time), end_time = COALESCE($5, end_time) \
             WHERE id_delivery = $1 AND delivery_status = $2",
        )
        .bind(id_delivery)
        .bind(from.as_str())
        .bind(to.as_str())
        .bind(stamp.start_time)
        .bind(stamp.end_time)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::Conflict(format!(
                "delivery {id_delivery} is no longer {from}"
            )));
        }
        Ok(())
    }

    async fn raise_quality(
        &self,
        id_delivery: i32,
        quality: QualityStatus,
    ) -> StoreResult<Option<QualityStatus>> {
        let raised: Option<String> = sqlx::query_scalar(&format!(
            "UPDATE deliveries SET quality_status = $2 \
             WHERE id_delivery = $1 AND delivery_status = $3 \
             AND (quality_status IS NULL OR {QUALITY_RANK} < $4) \
             RETURNING quality_status"
        ))
        .bind(id_delivery)
        .bind(quality.as_str())
        .bind(DeliveryStatus::InTransit.as_str())
        .bind(quality.rank())
        .fetch_optional(&self.pool)
        .await?;

        if let Some(stored) = raised {
            return stored
                .parse::<QualityStatus>()
                .map(Some)
                .map_err(StoreError::Corrupt);
        }

        // Nothing written: already at least as bad, or not in transit.
        let current = sqlx::query_as::<_, (String, Option<String>)>(
            "SELECT delivery_status, quality_status FROM deliveries WHERE id_delivery = $1",
        )
        .bind(id_delivery)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| StoreError::NotFound(format!("delivery {id_delivery}")))?;

        match current {
            (status, Some(stored)) if status == DeliveryStatus::InTransit.as_str() => stored
                .parse::<QualityStatus>()
                .map(Some)
                .map_err(StoreError::Corrupt),
            _ => Ok(None),
        }
    }

    async fn find_profile(&self, id: Uuid) -> StoreResult<Option<Profile>> {
        let row = sqlx::query_as::<_, ProfileRow>("SELECT id, name, role FROM profiles WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        row.map(Profile::try_from).transpose()
    }

    async fn list_drivers(&self) -> StoreResult<Vec<Profile>> {
        let rows = sqlx::query_as::<_, ProfileRow>(
            "SELECT id, name, role FROM profiles WHERE role = $1 ORDER BY name ASC",
        )
        .bind(Role::Driver.as_str())
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Profile::try_from).collect()
    }

    async fn insert_reading(&self, reading: &NewSensorReading) -> StoreResult<SensorReading> {
        let row = sqlx::query_as::<_, SensorRow>(
            "INSERT INTO sensor_data (recorded_at, temperature, latitude, longitude, id_delivery) \
             VALUES ($1, $2, $3, $4, $5) \
             RETURNING id, recorded_at, temperature, latitude, longitude, id_delivery",
        )
        .bind(reading.recorded_at)
        .bind(reading.temperature)
        .bind(reading.location.latitude)
        .bind(reading.location.longitude)
        .bind(reading.id_delivery)
        .fetch_one(&self.pool)
        .await?;

        Ok(row.into())
    }

    async fn latest_readings(&self, limit: u32) -> StoreResult<Vec<SensorReading>> {
        let rows = sqlx::query_as::<_, SensorRow>(
            "SELECT id, recorded_at, temperature, latitude, longitude, id_delivery \
             FROM sensor_data ORDER BY recorded_at DESC, id DESC LIMIT $1",
        )
        .bind(i64::from(limit))
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(SensorReading::from).collect())
    }
}
