use crate::app_config::{AppConfig, RowMatch};
use crate::ConfigError;

pub const DEFAULT_API_BASE_URL: &str = "https://statistics-api.wildberries.ru/api/v1/supplier";

/// Load application configuration from environment variables.
///
/// Calls `dotenvy::dotenv().ok()` to load `.env` files before reading env vars.
///
/// # Errors
///
/// Returns `ConfigError` if required env vars are missing or values are invalid.
pub fn load_app_config() -> Result<AppConfig, ConfigError> {
    dotenvy::dotenv().ok();
    load_app_config_from_env()
}

/// Load application configuration from environment variables already in the process.
///
/// Unlike [`load_app_config`], this does NOT load `.env` files; useful for testing
/// or when the caller manages env setup.
///
/// # Errors
///
/// Returns `ConfigError` if required env vars are missing or values are invalid.
pub fn load_app_config_from_env() -> Result<AppConfig, ConfigError> {
    build_app_config(|key| std::env::var(key))
}

/// Build application configuration using the provided env-var lookup function.
///
/// Decoupled from the real environment so tests can pass a `HashMap` lookup.
fn build_app_config<F>(lookup: F) -> Result<AppConfig, ConfigError>
where
    F: Fn(&str) -> Result<String, std::env::VarError>,
{
    use std::path::PathBuf;

    let require = |var: &str| -> Result<String, ConfigError> {
        lookup(var)
            .ok()
            .filter(|v| !v.trim().is_empty())
            .ok_or_else(|| ConfigError::MissingEnvVar(var.to_string()))
    };

    let or_default = |var: &str, default: &str| -> String {
        lookup(var).unwrap_or_else(|_| default.to_string())
    };

    let parse_u32 = |var: &str, default: &str| -> Result<u32, ConfigError> {
        let raw = or_default(var, default);
        raw.parse::<u32>().map_err(|e| ConfigError::InvalidEnvVar {
            var: var.to_string(),
            reason: e.to_string(),
        })
    };

    let parse_u64 = |var: &str, default: &str| -> Result<u64, ConfigError> {
        let raw = or_default(var, default);
        raw.parse::<u64>().map_err(|e| ConfigError::InvalidEnvVar {
            var: var.to_string(),
            reason: e.to_string(),
        })
    };

    let api_key = require("WB_API_KEY")?;
    let api_base_url = or_default("WBREPORT_API_BASE_URL", DEFAULT_API_BASE_URL);

    let request_timeout_secs = parse_u64("WBREPORT_REQUEST_TIMEOUT_SECS", "30")?;
    let max_attempts = parse_u32("WBREPORT_MAX_ATTEMPTS", "5")?;
    if max_attempts == 0 {
        return Err(ConfigError::InvalidEnvVar {
            var: "WBREPORT_MAX_ATTEMPTS".to_string(),
            reason: "must be at least 1".to_string(),
        });
    }
    let backoff_base_secs = parse_u64("WBREPORT_BACKOFF_BASE_SECS", "5")?;
    let default_retry_after_secs = parse_u64("WBREPORT_DEFAULT_RETRY_AFTER_SECS", "60")?;

    let template_path = PathBuf::from(or_default("WBREPORT_TEMPLATE_PATH", "wb_data.xlsx"));
    let output_dir = PathBuf::from(or_default("WBREPORT_OUTPUT_DIR", "excel_files"));
    let row_match = parse_row_match(&or_default("WBREPORT_ROW_MATCH", "day-token"))?;
    let log_level = or_default("WBREPORT_LOG_LEVEL", "info");

    Ok(AppConfig {
        api_key,
        api_base_url,
        request_timeout_secs,
        max_attempts,
        backoff_base_secs,
        default_retry_after_secs,
        template_path,
        output_dir,
        row_match,
        log_level,
    })
}

/// Parse a string into a [`RowMatch`] mode.
///
/// # Errors
///
/// Returns [`ConfigError::InvalidEnvVar`] for anything other than
/// `day-token` or `exact-date`.
pub fn parse_row_match(s: &str) -> Result<RowMatch, ConfigError> {
    match s.trim() {
        "day-token" => Ok(RowMatch::DayToken),
        "exact-date" => Ok(RowMatch::ExactDate),
        other => Err(ConfigError::InvalidEnvVar {
            var: "WBREPORT_ROW_MATCH".to_string(),
            reason: format!("unknown row match mode '{other}' (expected day-token or exact-date)"),
        }),
    }
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
