use serde::{Deserialize, Serialize};

use super::location::Coordinates;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Product {
    pub id_product: i32,
    pub product_name: String,
    /// Highest temperature (°C) the product tolerates in transit.
    pub temperature_threshold: f64,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Supplier {
    pub id_supplier: i32,
    pub supplier_name: String,
    pub latitude: f64,
    pub longitude: f64,
}

impl Supplier {
    pub fn location(&self) -> Coordinates {
        Coordinates::new(self.latitude, self.longitude)
    }
}
