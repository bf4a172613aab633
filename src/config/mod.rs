/// Database configuration and connection management
pub mod database;

/// Service settings loaded from config.toml
pub mod settings;

pub use settings::{
    AppConfig, CommissionPolicy, DatabaseSettings, ScheduleConfig, ScheduleMode,
    SettlementOptions, load_app_configuration, load_config,
};
