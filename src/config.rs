use serde::Deserialize;
use std::fs;

use crate::error::{EtlError, Result};

#[derive(Debug, Deserialize)]
pub struct Config {
    pub sources: SourcesConfig,
    pub warehouse: WarehouseConfig,
}

/// Locations of the three raw feeds, handed to the extractor at
/// construction time.
#[derive(Debug, Deserialize)]
pub struct SourcesConfig {
    pub bookings_csv: String,
    pub grounds_xlsx: String,
    pub users_api_url: String,
    pub timeout_seconds: u64,
}

#[derive(Debug, Deserialize)]
pub struct WarehouseConfig {
    pub db_path: String,
}

impl Config {
    pub fn load() -> Result<Self> {
        Self::load_from("config.toml")
    }

    pub fn load_from(path: &str) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| {
            EtlError::Config(format!("Failed to read config file '{}': {}", path, e))
        })?;

        let mut config: Config = toml::from_str(&content)?;

        // Deployment override for the warehouse location (set via .env).
        if let Ok(db_path) = std::env::var("GBW_WAREHOUSE_DB") {
            if !db_path.trim().is_empty() {
                config.warehouse.db_path = db_path;
            }
        }
        Ok(config)
    }
}
