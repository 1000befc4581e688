use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use super::location::Coordinates;
use super::order::OrderDetail;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeliveryStatus {
    Draft,
    Planned,
    InTransit,
    Delivered,
    Cancelled,
}

impl DeliveryStatus {
    pub const ALL: [DeliveryStatus; 5] = [
        DeliveryStatus::Draft,
        DeliveryStatus::Planned,
        DeliveryStatus::InTransit,
        DeliveryStatus::Delivered,
        DeliveryStatus::Cancelled,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            DeliveryStatus::Draft => "draft",
            DeliveryStatus::Planned => "planned",
            DeliveryStatus::InTransit => "in_transit",
            DeliveryStatus::Delivered => "delivered",
            DeliveryStatus::Cancelled => "cancelled",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, DeliveryStatus::Delivered | DeliveryStatus::Cancelled)
    }

    /// Forward-only lifecycle; any non-terminal delivery may be cancelled.
    pub fn can_transition_to(&self, next: DeliveryStatus) -> bool {
        use DeliveryStatus::*;

        match (*self, next) {
            (Draft, Planned) | (Planned, InTransit) | (InTransit, Delivered) => true,
            (current, Cancelled) => !current.is_terminal(),
            _ => false,
        }
    }
}

impl fmt::Display for DeliveryStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DeliveryStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        DeliveryStatus::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| format!("unknown delivery status '{s}'"))
    }
}

/// Ordered from best to worst so `max` yields the more severe level.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QualityStatus {
    Good,
    Warning,
    Critical,
}

impl QualityStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            QualityStatus::Good => "good",
            QualityStatus::Warning => "warning",
            QualityStatus::Critical => "critical",
        }
    }

    /// Severity order; higher is worse.
    pub fn rank(&self) -> i32 {
        match self {
            QualityStatus::Good => 0,
            QualityStatus::Warning => 1,
            QualityStatus::Critical => 2,
        }
    }

    pub fn assess(temperature: f64, threshold: f64, warning_margin: f64) -> Self {
        if temperature <= threshold {
            QualityStatus::Good
        } else if temperature <= threshold + warning_margin {
            QualityStatus::Warning
        } else {
            QualityStatus::Critical
        }
    }
}

impl FromStr for QualityStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "good" => Ok(QualityStatus::Good),
            "warning" => Ok(QualityStatus::Warning),
            "critical" => Ok(QualityStatus::Critical),
            other => Err(format!("unknown quality status '{other}'")),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DriverRef {
    pub id: Uuid,
    pub name: String,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Delivery {
    pub id_delivery: i32,
    pub delivery_status: DeliveryStatus,
    pub temperature_threshold: f64,
    pub plan_date: NaiveDate,
    pub depart_lat: f64,
    pub depart_lon: f64,
    pub arrive_lat: f64,
    pub arrive_lon: f64,
    pub id_driver: Option<Uuid>,
    pub id_container: Option<String>,
    pub quality_status: Option<QualityStatus>,
    pub plan_start_time: Option<DateTime<Utc>>,
    pub plan_end_time: Option<DateTime<Utc>>,
    pub start_time: Option<DateTime<Utc>>,
    pub end_time: Option<DateTime<Utc>>,
    pub driver: Option<DriverRef>,
}

/// Values a new delivery row is created with; everything else starts empty.
#[derive(Clone, Debug, PartialEq)]
pub struct NewDelivery {
    pub delivery_status: DeliveryStatus,
    pub temperature_threshold: f64,
    pub plan_date: NaiveDate,
    pub departure: Coordinates,
    pub arrival: Coordinates,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct DeliveryDetail {
    #[serde(flatten)]
    pub delivery: Delivery,
    pub orders: Vec<OrderDetail>,
}

/// Timestamps written alongside a status change.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct StatusStamp {
    pub start_time: Option<DateTime<Utc>>,
    pub end_time: Option<DateTime<Utc>>,
}

impl StatusStamp {
    pub fn for_transition(next: DeliveryStatus, now: DateTime<Utc>) -> Self {
        match next {
            DeliveryStatus::InTransit => Self {
                start_time: Some(now),
                end_time: None,
            },
            DeliveryStatus::Delivered => Self {
                start_time: None,
                end_time: Some(now),
            },
            _ => Self::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn forward_lifecycle_is_allowed() {
        assert!(DeliveryStatus::Draft.can_transition_to(DeliveryStatus::Planned));
        assert!(DeliveryStatus::Planned.can_transition_to(DeliveryStatus::InTransit));
        assert!(DeliveryStatus::InTransit.can_transition_to(DeliveryStatus::Delivered));
    }

    #[test]
    fn skipping_or_reversing_is_rejected() {
        assert!(!DeliveryStatus::Draft.can_transition_to(DeliveryStatus::InTransit));
        assert!(!DeliveryStatus::Delivered.can_transition_to(DeliveryStatus::InTransit));
        assert!(!DeliveryStatus::Planned.can_transition_to(DeliveryStatus::Draft));
    }

    #[test]
    fn only_open_deliveries_can_be_cancelled() {
        assert!(DeliveryStatus::InTransit.can_transition_to(DeliveryStatus::Cancelled));
        assert!(!DeliveryStatus::Delivered.can_transition_to(DeliveryStatus::Cancelled));
        assert!(!DeliveryStatus::Cancelled.can_transition_to(DeliveryStatus::Cancelled));
    }

    #[test]
    fn status_text_round_trips() {
        for status in DeliveryStatus::ALL {
            assert_eq!(status.as_str().parse::<DeliveryStatus>(), Ok(status));
        }
        assert!("shipping".parse::<DeliveryStatus>().is_err());
    }

    #[test]
    fn quality_levels() {
        assert_eq!(QualityStatus::assess(4.0, 4.0, 2.0), QualityStatus::Good);
        assert_eq!(QualityStatus::assess(5.5, 4.0, 2.0), QualityStatus::Warning);
        assert_eq!(QualityStatus::assess(6.0, 4.0, 2.0), QualityStatus::Warning);
        assert_eq!(QualityStatus::assess(6.1, 4.0, 2.0), QualityStatus::Critical);
        assert_eq!(QualityStatus::assess(-15.0, -18.0, 0.0), QualityStatus::Critical);
    }

    #[test]
    fn worst_quality_wins() {
        assert_eq!(
            QualityStatus::Warning.max(QualityStatus::Good),
            QualityStatus::Warning
        );
        assert_eq!(
            QualityStatus::Warning.max(QualityStatus::Critical),
            QualityStatus::Critical
        );
    }

    #[test]
    fn transit_and_arrival_are_stamped() {
        let now = Utc::now();
        assert_eq!(
            StatusStamp::for_transition(DeliveryStatus::InTransit, now).start_time,
            Some(now)
        );
        assert_eq!(
            StatusStamp::for_transition(DeliveryStatus::Delivered, now).end_time,
            Some(now)
        );
        assert_eq!(
            StatusStamp::for_transition(DeliveryStatus::Cancelled, now),
            StatusStamp::default()
        );
    }
}
