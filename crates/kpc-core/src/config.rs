use crate::app_config::{AppConfig, Environment};
use crate::ConfigError;

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
/// Unlike [`load_app_config`], this does NOT load `.env` files.
///
/// # Errors
///
/// Returns `ConfigError` if required env vars are missing or values are invalid.
pub fn load_app_config_from_env() -> Result<AppConfig, ConfigError> {
    build_app_config(|key| std::env::var(key))
}

/// Build application configuration using the provided env-var lookup function.
///
/// Decoupled from the process environment so it can be tested with a plain
/// `HashMap` lookup.
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

    let parse_usize = |var: &str, default: &str| -> Result<usize, ConfigError> {
        let raw = or_default(var, default);
        raw.parse::<usize>()
            .map_err(|e| ConfigError::InvalidEnvVar {
                var: var.to_string(),
                reason: e.to_string(),
            })
    };

    let parse_bool = |var: &str, default: &str| -> Result<bool, ConfigError> {
        let raw = or_default(var, default);
        match raw.trim().to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => Ok(true),
            "0" | "false" | "no" | "off" => Ok(false),
            other => Err(ConfigError::InvalidEnvVar {
                var: var.to_string(),
                reason: format!("expected a boolean, got '{other}'"),
            }),
        }
    };

    let api_base_url = require("KPC_API_BASE_URL")?;
    if !(api_base_url.starts_with("http://") || api_base_url.starts_with("https://")) {
        return Err(ConfigError::InvalidEnvVar {
            var: "KPC_API_BASE_URL".to_string(),
            reason: format!("'{api_base_url}' is not an http(s) URL"),
        });
    }

    let env = parse_environment(&or_default("KPC_ENV", "development"))?;
    let log_level = or_default("KPC_LOG_LEVEL", env.default_log_level());

    let http_timeout_secs = parse_u64("KPC_HTTP_TIMEOUT_SECS", "30")?;
    let user_agent = or_default("KPC_USER_AGENT", "kpc/0.1 (price-compare)");
    let max_concurrent_fetches = parse_usize("KPC_MAX_CONCURRENT_FETCHES", "4")?;
    if max_concurrent_fetches == 0 {
        return Err(ConfigError::InvalidEnvVar {
            var: "KPC_MAX_CONCURRENT_FETCHES".to_string(),
            reason: "must be at least 1".to_string(),
        });
    }
    let max_retries = parse_u32("KPC_MAX_RETRIES", "3")?;
    let retry_backoff_base_ms = parse_u64("KPC_RETRY_BACKOFF_BASE_MS", "500")?;

    let fallback_path = lookup("KPC_FALLBACK_PATH")
        .ok()
        .filter(|p| !p.trim().is_empty())
        .map(PathBuf::from);
    let derive_unit_price = parse_bool("KPC_DERIVE_UNIT_PRICE", "false")?;

    Ok(AppConfig {
        api_base_url,
        env,
        log_level,
        http_timeout_secs,
        user_agent,
        max_concurrent_fetches,
        max_retries,
        retry_backoff_base_ms,
        fallback_path,
        derive_unit_price,
    })
}

/// Parse a string into an `Environment` variant.
fn parse_environment(s: &str) -> Result<Environment, ConfigError> {
    match s {
        "development" => Ok(Environment::Development),
        "test" => Ok(Environment::Test),
        "production" => Ok(Environment::Production),
        other => Err(ConfigError::InvalidEnvVar {
            var: "KPC_ENV".to_string(),
            reason: format!("unknown environment '{other}'"),
        }),
    }
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
