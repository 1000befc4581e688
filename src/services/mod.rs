pub mod deliveries;
pub mod forecast;
pub mod monitoring;
pub mod planner;

use std::sync::Arc;

use crate::config::Config;
use crate::repository::Store;

pub struct AppState {
    pub config: Config,
    pub store: Arc<dyn Store>,
    pub forecasts: forecast::ForecastService,
    pub planner: planner::PlannerService,
    pub deliveries: deliveries::DeliveryService,
    pub monitoring: monitoring::MonitoringService,
}

impl AppState {
    pub fn new(store: Arc<dyn Store>, config: Config) -> Self {
        let forecasts = forecast::ForecastService::new(store.clone());
        let planner = planner::PlannerService::new(store.clone(), config.depot());
        let deliveries = deliveries::DeliveryService::new(store.clone());
        let monitoring = monitoring::MonitoringService::new(
            store.clone(),
            config.temperature_warning_margin,
            config.sensor_feed_limit,
        );

        Self {
            config,
            store,
            forecasts,
            planner,
            deliveries,
            monitoring,
        }
    }
}
