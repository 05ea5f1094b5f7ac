pub mod aggregate;
pub mod app_config;
pub mod config;
pub mod metrics;
pub mod record;

pub use aggregate::{aggregate, aggregate_range, MetricSources};
pub use app_config::{AppConfig, RowMatch};
pub use config::{load_app_config, load_app_config_from_env};
pub use metrics::{AdStats, DailyAggregate, FunnelStats, MetricField};
pub use record::{format_display_date, normalize_date, MetricRecord, DISPLAY_DATE_FORMAT};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("invalid value for {var}: {reason}")]
    InvalidEnvVar { var: String, reason: String },
}
