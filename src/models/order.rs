use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct OrderLine {
    pub id_product: i32,
    pub quantity: i32,
}

/// Forecast quantities grouped under the single supplier they are ordered from.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SupplierOrder {
    pub id_supplier: i32,
    pub order_date: NaiveDate,
    pub lines: Vec<OrderLine>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct OrderProductDetail {
    pub id_product: i32,
    pub product_name: String,
    pub quantity: i32,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct OrderDetail {
    pub id_order: i32,
    pub id_supplier: i32,
    pub supplier_name: String,
    pub order_date: NaiveDate,
    pub products: Vec<OrderProductDetail>,
}
