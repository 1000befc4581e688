use serde::{Deserialize, Serialize};

use super::delivery::NewDelivery;
use super::order::SupplierOrder;

/// Everything a plan writes, built before any row is touched.
#[derive(Clone, Debug, PartialEq)]
pub struct DeliveryPlan {
    pub id_forecast: i32,
    pub delivery: NewDelivery,
    pub orders: Vec<SupplierOrder>,
}

impl DeliveryPlan {
    pub fn line_count(&self) -> usize {
        self.orders.iter().map(|o| o.lines.len()).sum()
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct OrderReceipt {
    pub id_order: i32,
    pub id_supplier: i32,
    pub line_count: usize,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PlanReceipt {
    pub id_delivery: i32,
    pub orders: Vec<OrderReceipt>,
}
