//! Service settings loaded from config.toml
//!
//! Every section is optional; missing sections and fields fall back to the
//! production defaults (daily run at 09:00 India time, 10% commission paid out
//! three days after the estimated delivery).

use crate::config::database::{DEFAULT_DATABASE_URL, get_database_url};
use crate::errors::{Error, Result};
use serde::Deserialize;
use std::path::Path;
use tracing::{debug, info};

/// Default location of the configuration file
pub const DEFAULT_CONFIG_PATH: &str = "config.toml";

/// Environment variable overriding the configuration file path
pub const CONFIG_PATH_ENV: &str = "SETTLEMENT_CONFIG";

/// Configuration structure representing the entire config.toml file
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Database connection settings
    pub database: DatabaseSettings,
    /// When settlement passes fire
    pub schedule: ScheduleConfig,
    /// Limits applied to each pass
    pub settlement: SettlementOptions,
    /// How commissions are computed at checkout
    pub commission: CommissionPolicy,
}

/// `[database]` section
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DatabaseSettings {
    /// `SeaORM` connection URL
    pub url: String,
}

impl Default for DatabaseSettings {
    fn default() -> Self {
        Self {
            url: DEFAULT_DATABASE_URL.to_string(),
        }
    }
}

/// How the scheduler decides when to fire
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScheduleMode {
    /// Fire every `interval_secs` seconds
    Interval,
    /// Fire once a day at `execution_hour` local time
    Daily,
}

/// `[schedule]` section
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ScheduleConfig {
    /// Interval or daily firing
    pub mode: ScheduleMode,
    /// Seconds between firings in interval mode
    pub interval_secs: u64,
    /// Local hour (0-23) of the daily firing
    pub execution_hour: u32,
    /// Offset of the local timezone from UTC, in minutes (330 = Asia/Kolkata)
    pub utc_offset_minutes: i32,
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            mode: ScheduleMode::Daily,
            interval_secs: 60,
            execution_hour: 9,
            utc_offset_minutes: 330,
        }
    }
}

/// `[settlement]` section
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SettlementOptions {
    /// Pending commissions fetched per page
    pub page_size: u64,
    /// Releases after which a pass stops; the rest waits for the next firing
    pub max_releases_per_pass: usize,
}

impl Default for SettlementOptions {
    fn default() -> Self {
        Self {
            page_size: 100,
            max_releases_per_pass: 1000,
        }
    }
}

/// `[commission]` section
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CommissionPolicy {
    /// Fraction of the sale price paid to the referring seller
    pub rate: f64,
    /// Days after estimated delivery before the commission becomes payable
    pub grace_period_days: i64,
    /// Delivery estimate used when the product has none
    pub default_delivery_days: i64,
}

impl Default for CommissionPolicy {
    fn default() -> Self {
        Self {
            rate: 0.1,
            grace_period_days: 3,
            default_delivery_days: 5,
        }
    }
}

impl AppConfig {
    /// Rejects values that would make the scheduler or the pass misbehave.
    pub fn validate(&self) -> Result<()> {
        let invalid = |message: &str| {
            Err(Error::Config {
                message: message.to_string(),
            })
        };

        if self.schedule.mode == ScheduleMode::Interval && self.schedule.interval_secs == 0 {
            return invalid("schedule.interval_secs must be greater than zero");
        }
        if self.schedule.execution_hour > 23 {
            return invalid("schedule.execution_hour must be between 0 and 23");
        }
        if self.schedule.utc_offset_minutes.abs() >= 18 * 60 {
            return invalid("schedule.utc_offset_minutes must be within +/-18 hours");
        }
        if self.settlement.page_size == 0 {
            return invalid("settlement.page_size must be greater than zero");
        }
        if self.settlement.max_releases_per_pass == 0 {
            return invalid("settlement.max_releases_per_pass must be greater than zero");
        }
        let rate = self.commission.rate;
        if rate.is_nan() || rate <= 0.0 || rate > 1.0 {
            return invalid("commission.rate must be in (0, 1]");
        }
        if self.commission.grace_period_days < 0 || self.commission.default_delivery_days < 0 {
            return invalid("commission day counts cannot be negative");
        }
        Ok(())
    }
}

/// Loads and validates configuration from a TOML file
///
/// # Errors
/// Returns an error if:
/// - The file cannot be read
/// - The TOML syntax is invalid
/// - A value fails validation
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<AppConfig> {
    let path_ref = path.as_ref();
    debug!("Attempting to load configuration from: {:?}", path_ref);
    let contents = std::fs::read_to_string(path_ref).map_err(|e| Error::Config {
        message: format!("Failed to read config file {}: {e}", path_ref.display()),
    })?;

    let config: AppConfig = toml::from_str(&contents).map_err(|e| Error::Config {
        message: format!("Failed to parse {}: {e}", path_ref.display()),
    })?;
    config.validate()?;
    Ok(config)
}

/// Loads the application configuration used by the worker binary.
///
/// The file path comes from `SETTLEMENT_CONFIG` or defaults to `./config.toml`;
/// a missing file means "all defaults". `DATABASE_URL` overrides `[database].url`.
pub fn load_app_configuration() -> Result<AppConfig> {
    let path = std::env::var(CONFIG_PATH_ENV).unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());

    let mut config = if Path::new(&path).exists() {
        let config = load_config(&path)?;
        info!("Loaded configuration from {path}");
        config
    } else {
        info!("No configuration file at {path}, using defaults");
        AppConfig::default()
    };

    config.database.url = get_database_url(&config.database.url);
    Ok(config)
}
