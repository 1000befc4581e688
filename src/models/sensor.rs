use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::location::Coordinates;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SensorReading {
    pub id: i64,
    pub recorded_at: DateTime<Utc>,
    pub temperature: f64,
    pub latitude: f64,
    pub longitude: f64,
    pub id_delivery: Option<i32>,
}

/// Body posted by field devices.
#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct SensorPayload {
    pub temperature: f64,
    pub latitude: f64,
    pub longitude: f64,
    #[serde(default)]
    pub id_delivery: Option<i32>,
}

impl SensorPayload {
    pub fn location(&self) -> Coordinates {
        Coordinates::new(self.latitude, self.longitude)
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct NewSensorReading {
    pub recorded_at: DateTime<Utc>,
    pub temperature: f64,
    pub location: Coordinates,
    pub id_delivery: Option<i32>,
}
