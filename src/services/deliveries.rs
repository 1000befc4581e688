use chrono::Utc;
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

use crate::error::AppError;
use crate::models::delivery::{Delivery, DeliveryDetail, DeliveryStatus, StatusStamp};
use crate::models::profile::{Profile, Role};
use crate::repository::Store;

pub struct DeliveryService {
    store: Arc<dyn Store>,
}

impl DeliveryService {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    pub async fn list(&self, status: Option<DeliveryStatus>) -> Result<Vec<Delivery>, AppError> {
        Ok(self.store.list_deliveries(status).await?)
    }

    pub async fn get(&self, id_delivery: i32) -> Result<Delivery, AppError> {
        self.store
            .find_delivery(id_delivery)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Delivery {id_delivery} not found")))
    }

    pub async fn detail(&self, id_delivery: i32) -> Result<DeliveryDetail, AppError> {
        let delivery = self.get(id_delivery).await?;
        let orders = self.store.delivery_orders(id_delivery).await?;
        Ok(DeliveryDetail { delivery, orders })
    }

    /// `None` clears the assignment.
    pub async fn assign_driver(
        &self,
        id_delivery: i32,
        id_driver: Option<Uuid>,
    ) -> Result<Delivery, AppError> {
        self.get(id_delivery).await?;

        if let Some(id) = id_driver {
            match self.store.find_profile(id).await? {
                Some(profile) if profile.role == Role::Driver => {}
                Some(_) => {
                    return Err(AppError::BadRequest(format!("Profile {id} is not a driver")))
                }
                None => return Err(AppError::BadRequest(format!("Driver {id} not found"))),
            }
        }

        self.store.set_driver(id_delivery, id_driver).await?;

        info!(id_delivery, id_driver = ?id_driver, "Driver assignment updated");
        self.get(id_delivery).await
    }

    pub async fn update_status(
        &self,
        id_delivery: i32,
        next: DeliveryStatus,
    ) -> Result<Delivery, AppError> {
        let delivery = self.get(id_delivery).await?;
        let current = delivery.delivery_status;

        if current == next {
            return Ok(delivery);
        }

        if !current.can_transition_to(next) {
            return Err(AppError::Conflict(format!(
                "Cannot move delivery from {current} to {next}"
            )));
        }

        let stamp = StatusStamp::for_transition(next, Utc::now());
        self.store
            .update_status(id_delivery, current, next, stamp)
            .await?;

        info!(id_delivery, from = %current, to = %next, "Delivery status changed");
        self.get(id_delivery).await
    }

    pub async fn drivers(&self) -> Result<Vec<Profile>, AppError> {
        Ok(self.store.list_drivers().await?)
    }
}
