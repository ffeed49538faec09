use std::collections::BTreeMap;

use crate::app_config::{AppConfig, Environment};
use crate::ConfigError;

/// Desktop browser profile; the listing endpoints answer 403 to obvious bot agents.
const DEFAULT_USER_AGENT: &str =
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36";

/// Suffixes accepted after `JOBSCAN_PATTERN_` for per-pattern overrides.
pub const PATTERN_OVERRIDE_KEYS: [&str; 8] = [
    "JOB_LINK",
    "LOGO_LINK",
    "JOB_TITLE",
    "COMPANY_RATING",
    "JOB_LOCATION",
    "POSTING_DATE",
    "EMPLOYER_NAME",
    "COMPANY_NAME_FALLBACK",
];

/// Load application configuration from environment variables.
///
/// Calls `dotenvy::dotenv().ok()` to load `.env` files before reading env vars.
///
/// # Errors
///
/// Returns `ConfigError` if a variable is set to an invalid value.
pub fn load_app_config() -> Result<AppConfig, ConfigError> {
    dotenvy::dotenv().ok();
    load_app_config_from_env()
}

/// Load application configuration from environment variables already in the process.
///
/// Unlike [`load_app_config`], this does NOT load `.env` files.
///
/// # Errors
///
/// Returns `ConfigError` if a variable is set to an invalid value.
pub fn load_app_config_from_env() -> Result<AppConfig, ConfigError> {
    build_app_config(|key| std::env::var(key))
}

/// Build application configuration using the provided env-var lookup function.
///
/// Decoupled from the process environment so tests can drive it with a `HashMap`.
fn build_app_config<F>(lookup: F) -> Result<AppConfig, ConfigError>
where
    F: Fn(&str) -> Result<String, std::env::VarError>,
{
    let or_default = |var: &str, default: &str| -> String {
        lookup(var).unwrap_or_else(|_| default.to_string())
    };

    let invalid = |var: &str, reason: String| ConfigError::InvalidEnvVar {
        var: var.to_string(),
        reason,
    };

    let parse_u32 = |var: &str, default: &str| -> Result<u32, ConfigError> {
        or_default(var, default)
            .parse::<u32>()
            .map_err(|e| invalid(var, e.to_string()))
    };

    let parse_u64 = |var: &str, default: &str| -> Result<u64, ConfigError> {
        or_default(var, default)
            .parse::<u64>()
            .map_err(|e| invalid(var, e.to_string()))
    };

    let env = parse_environment(&or_default("JOBSCAN_ENV", "development"))?;
    let log_level = or_default("JOBSCAN_LOG_LEVEL", "info");

    let site_base_url = or_default("JOBSCAN_SITE_BASE_URL", "https://www.glassdoor.co.in")
        .trim_end_matches('/')
        .to_string();
    if !(site_base_url.starts_with("https://") || site_base_url.starts_with("http://")) {
        return Err(invalid(
            "JOBSCAN_SITE_BASE_URL",
            format!("\"{site_base_url}\" must start with http:// or https://"),
        ));
    }

    let request_timeout_secs = parse_u64("JOBSCAN_REQUEST_TIMEOUT_SECS", "30")?;
    if request_timeout_secs == 0 {
        return Err(invalid(
            "JOBSCAN_REQUEST_TIMEOUT_SECS",
            "must be greater than zero".to_string(),
        ));
    }
    let user_agent = or_default("JOBSCAN_USER_AGENT", DEFAULT_USER_AGENT);
    let max_retries = parse_u32("JOBSCAN_MAX_RETRIES", "2")?;
    let retry_backoff_base_ms = parse_u64("JOBSCAN_RETRY_BACKOFF_BASE_MS", "500")?;
    let inter_request_delay_ms = parse_u64("JOBSCAN_INTER_REQUEST_DELAY_MS", "0")?;
    let dedupe_job_urls = parse_bool(
        "JOBSCAN_DEDUPE_JOB_URLS",
        &or_default("JOBSCAN_DEDUPE_JOB_URLS", "true"),
    )?;

    let mut pattern_overrides = BTreeMap::new();
    for key in PATTERN_OVERRIDE_KEYS {
        if let Ok(source) = lookup(&format!("JOBSCAN_PATTERN_{key}")) {
            pattern_overrides.insert(key.to_ascii_lowercase(), source);
        }
    }

    Ok(AppConfig {
        env,
        log_level,
        site_base_url,
        request_timeout_secs,
        user_agent,
        max_retries,
        retry_backoff_base_ms,
        inter_request_delay_ms,
        dedupe_job_urls,
        pattern_overrides,
    })
}

/// Parse a string into an `Environment` variant.
///
/// # Errors
///
/// Returns `ConfigError::InvalidEnvVar` for anything other than
/// `development`, `test`, or `production`.
fn parse_environment(s: &str) -> Result<Environment, ConfigError> {
    match s {
        "development" => Ok(Environment::Development),
        "test" => Ok(Environment::Test),
        "production" => Ok(Environment::Production),
        other => Err(ConfigError::InvalidEnvVar {
            var: "JOBSCAN_ENV".to_string(),
            reason: format!("unknown environment \"{other}\""),
        }),
    }
}

fn parse_bool(var: &str, raw: &str) -> Result<bool, ConfigError> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" => Ok(true),
        "false" | "0" | "no" => Ok(false),
        other => Err(ConfigError::InvalidEnvVar {
            var: var.to_string(),
            reason: format!("expected a boolean, got \"{other}\""),
        }),
    }
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
