use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub latitude: f64,
    pub longitude: f64,
}

impl Coordinates {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }

    /// Rejects NaN/infinite values and points outside WGS84 bounds.
    pub fn validate(&self) -> Result<(), String> {
        if !self.latitude.is_finite() || !self.longitude.is_finite() {
            return Err("coordinates must be finite numbers".to_string());
        }
        if !(-90.0..=90.0).contains(&self.latitude) {
            return Err(format!("latitude {} out of range", self.latitude));
        }
        if !(-180.0..=180.0).contains(&self.longitude) {
            return Err(format!("longitude {} out of range", self.longitude));
        }
        Ok(())
    }
}
