use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

fn default_country() -> String {
    "AR".to_string()
}

fn default_timezone() -> String {
    "America/Argentina/Buenos_Aires".to_string()
}

fn default_exchange_start_hour() -> u32 {
    10
}

fn default_exchange_end_hour() -> u32 {
    18
}

fn default_rental_contract_hour() -> u32 {
    10
}

fn default_consumer_price_hour() -> u32 {
    17
}

fn default_backfill_delay_secs() -> u64 {
    30
}

fn default_true() -> bool {
    true
}

fn default_exchange_rates_url() -> String {
    "https://dolarapi.com/v1".to_string()
}

fn default_rental_contract_url() -> String {
    "https://www.bcra.gob.ar/Pdfs/PublicacionesEstadisticas/diar_icl.xls".to_string()
}

fn default_consumer_price_url() -> String {
    "https://api.argentinadatos.com/v1".to_string()
}

/// Refresh schedule, expressed in local hours of `timezone`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScheduleConfig {
    pub timezone: String,

    /// Exchange rates refresh hourly in [start, end] on business days.
    pub exchange_start_hour: u32,
    pub exchange_end_hour: u32,

    /// The rental-contract index publishes each morning on business days.
    pub rental_contract_hour: u32,

    /// The consumer-price index publishes mid-month at an irregular date, so
    /// it is checked every day.
    pub consumer_price_hour: u32,

    /// One-shot historical backfill shortly after startup.
    pub backfill_on_start: bool,
    pub backfill_delay_secs: u64,
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            timezone: default_timezone(),
            exchange_start_hour: default_exchange_start_hour(),
            exchange_end_hour: default_exchange_end_hour(),
            rental_contract_hour: default_rental_contract_hour(),
            consumer_price_hour: default_consumer_price_hour(),
            backfill_on_start: default_true(),
            backfill_delay_secs: default_backfill_delay_secs(),
        }
    }
}

/// External source endpoints. Overridable for tests and mirrors.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SourcesConfig {
    pub exchange_rates_url: String,
    pub rental_contract_url: String,
    pub consumer_price_url: String,
}

impl Default for SourcesConfig {
    fn default() -> Self {
        Self {
            exchange_rates_url: default_exchange_rates_url(),
            rental_contract_url: default_rental_contract_url(),
            consumer_price_url: default_consumer_price_url(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Where index series are persisted. Defaults to the platform data dir.
    pub data_dir: Option<PathBuf>,

    /// Country whose indices the scheduled jobs refresh.
    pub country: String,

    pub schedule: ScheduleConfig,
    pub sources: SourcesConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: None,
            country: default_country(),
            schedule: ScheduleConfig::default(),
            sources: SourcesConfig::default(),
        }
    }
}

impl Config {
    /// Loads the config file, falling back to defaults when it is absent.
    pub fn load(path: &Path) -> Result<Self> {
        match std::fs::read_to_string(path) {
            Ok(contents) => toml::from_str(&contents)
                .with_context(|| format!("Failed to parse config at {}", path.display())),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
            Err(e) => {
                Err(e).with_context(|| format!("Failed to read config at {}", path.display()))
            }
        }
    }

    pub fn resolved_data_dir(&self) -> PathBuf {
        self.data_dir.clone().unwrap_or_else(default_data_dir)
    }
}

pub fn default_config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("rentindex")
        .join("config.toml")
}

pub fn default_data_dir() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("rentindex")
}
