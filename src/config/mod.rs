pub mod database;

use anyhow::{anyhow, Context};
use serde::Deserialize;

use crate::models::location::Coordinates;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    Postgres,
    Memory,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub port: u16,
    pub storage: StorageBackend,
    pub database_url: Option<String>,
    pub db_max_connections: u32,
    pub depot_lat: f64,
    pub depot_lon: f64,
    /// Degrees above a delivery's threshold still reported as `warning`.
    pub temperature_warning_margin: f64,
    pub sensor_feed_limit: u32,
    pub cors_origin: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: 8080,
            storage: StorageBackend::Postgres,
            database_url: None,
            db_max_connections: 10,
            depot_lat: -6.2,
            depot_lon: 106.8166,
            temperature_warning_margin: 2.0,
            sensor_feed_limit: 20,
            cors_origin: None,
        }
    }
}

impl Config {
    /// Loads defaults overlaid with process environment variables
    /// (`PORT`, `DATABASE_URL`, `DEPOT_LAT`, ...).
    pub fn from_env() -> anyhow::Result<Self> {
        let defaults = Config::default();

        let settings = config::Config::builder()
            .set_default("port", i64::from(defaults.port))?
            .set_default("storage", "postgres")?
            .set_default("db_max_connections", i64::from(defaults.db_max_connections))?
            .set_default("depot_lat", defaults.depot_lat)?
            .set_default("depot_lon", defaults.depot_lon)?
            .set_default("temperature_warning_margin", defaults.temperature_warning_margin)?
            .set_default("sensor_feed_limit", i64::from(defaults.sensor_feed_limit))?
            .add_source(config::Environment::default().try_parsing(true))
            .build()
            .context("failed to read configuration")?;

        let config: Config = settings
            .try_deserialize()
            .context("invalid configuration value")?;

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if self.storage == StorageBackend::Postgres && self.database_url.is_none() {
            return Err(anyhow!("DATABASE_URL must be set when STORAGE=postgres"));
        }

        self.depot()
            .validate()
            .map_err(|e| anyhow!("invalid depot location: {e}"))?;

        if !self.temperature_warning_margin.is_finite() || self.temperature_warning_margin < 0.0 {
            return Err(anyhow!(
                "TEMPERATURE_WARNING_MARGIN must be a non-negative number, got {}",
                self.temperature_warning_margin
            ));
        }

        if self.sensor_feed_limit == 0 {
            return Err(anyhow!("SENSOR_FEED_LIMIT must be at least 1"));
        }

        if self.db_max_connections == 0 {
            return Err(anyhow!("DB_MAX_CONNECTIONS must be at least 1"));
        }

        Ok(())
    }

    pub fn depot(&self) -> Coordinates {
        Coordinates::new(self.depot_lat, self.depot_lon)
    }
}
