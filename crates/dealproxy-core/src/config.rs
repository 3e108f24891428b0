use crate::app_config::{AppConfig, Environment};
use crate::ConfigError;

const DEFAULT_DEALS_API_URL: &str = "https://www.cheapshark.com/api/1.0";
const DEFAULT_METADATA_API_URL: &str = "https://store.steampowered.com/api";

/// Load application configuration from environment variables.
///
/// Calls `dotenvy::dotenv().ok()` to load `.env` files before reading env vars.
///
/// # Errors
///
/// Returns `ConfigError` if a value is present but invalid.
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
/// Returns `ConfigError` if a value is present but invalid.
pub fn load_app_config_from_env() -> Result<AppConfig, ConfigError> {
    build_app_config(|key| std::env::var(key))
}

/// Build application configuration using the provided env-var lookup function.
///
/// Decoupled from the real environment so it can be tested with a plain
/// `HashMap` lookup.
fn build_app_config<F>(lookup: F) -> Result<AppConfig, ConfigError>
where
    F: Fn(&str) -> Result<String, std::env::VarError>,
{
    use std::net::SocketAddr;

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

    let parse_usize = |var: &str, default: &str| -> Result<usize, ConfigError> {
        or_default(var, default)
            .parse::<usize>()
            .map_err(|e| invalid(var, e.to_string()))
    };

    let env = parse_environment(&or_default("DEALPROXY_ENV", "development"))?;

    let bind_addr = or_default("DEALPROXY_BIND_ADDR", "0.0.0.0:3000")
        .parse::<SocketAddr>()
        .map_err(|e| invalid("DEALPROXY_BIND_ADDR", e.to_string()))?;
    let log_level = or_default("DEALPROXY_LOG_LEVEL", "info");
    let user_agent = or_default("DEALPROXY_USER_AGENT", "dealproxy/0.1 (deal-cache)");

    let deals_api_url = or_default("DEALPROXY_DEALS_API_URL", DEFAULT_DEALS_API_URL);
    let metadata_api_url = or_default("DEALPROXY_METADATA_API_URL", DEFAULT_METADATA_API_URL);

    let currencies = parse_currency_list(&or_default("DEALPROXY_CURRENCIES", "usd,eur,gbp"));
    if currencies.is_empty() {
        return Err(invalid(
            "DEALPROXY_CURRENCIES",
            "at least one currency code is required".to_string(),
        ));
    }
    let default_currency = match lookup("DEALPROXY_DEFAULT_CURRENCY") {
        Ok(raw) => {
            let code = raw.trim().to_lowercase();
            if !currencies.contains(&code) {
                return Err(invalid(
                    "DEALPROXY_DEFAULT_CURRENCY",
                    format!("\"{code}\" is not listed in DEALPROXY_CURRENCIES"),
                ));
            }
            code
        }
        Err(_) => currencies[0].clone(),
    };

    let secs = |var: &str, default: &str| -> Result<u64, ConfigError> {
        let value = parse_u64(var, default)?;
        if value == 0 {
            return Err(invalid(var, "must be greater than zero".to_string()));
        }
        Ok(value)
    };
    let cache_ttl_secs = secs("DEALPROXY_CACHE_TTL_SECS", "3600")?;
    let status_interval_secs = secs("DEALPROXY_STATUS_INTERVAL_SECS", "3600")?;
    let full_enrich_interval_secs = secs("DEALPROXY_FULL_ENRICH_INTERVAL_SECS", "86400")?;

    let page_size = non_zero_u32("DEALPROXY_PAGE_SIZE", parse_u32("DEALPROXY_PAGE_SIZE", "60")?)?;
    let target_unique_games = parse_usize("DEALPROXY_TARGET_UNIQUE_GAMES", "1000")?;
    let max_pages = non_zero_u32("DEALPROXY_MAX_PAGES", parse_u32("DEALPROXY_MAX_PAGES", "50")?)?;
    let request_timeout_secs = parse_u64("DEALPROXY_REQUEST_TIMEOUT_SECS", "30")?;

    let metadata_timeout_ms = parse_u64("DEALPROXY_METADATA_TIMEOUT_MS", "6000")?;
    let metadata_locale = or_default("DEALPROXY_METADATA_LOCALE", "english");
    let metadata_region = or_default("DEALPROXY_METADATA_REGION", "us");
    let metadata_max_attempts = non_zero_u32(
        "DEALPROXY_METADATA_MAX_ATTEMPTS",
        parse_u32("DEALPROXY_METADATA_MAX_ATTEMPTS", "30")?,
    )?;
    let metadata_backoff_base_ms = parse_u64("DEALPROXY_METADATA_BACKOFF_BASE_MS", "1000")?;
    let metadata_backoff_cap_ms = parse_u64("DEALPROXY_METADATA_BACKOFF_CAP_MS", "30000")?;
    let metadata_delay_ms = parse_u64("DEALPROXY_METADATA_DELAY_MS", "1000")?;

    Ok(AppConfig {
        env,
        bind_addr,
        log_level,
        user_agent,
        deals_api_url,
        metadata_api_url,
        currencies,
        default_currency,
        cache_ttl_secs,
        status_interval_secs,
        full_enrich_interval_secs,
        page_size,
        target_unique_games,
        max_pages,
        request_timeout_secs,
        metadata_timeout_ms,
        metadata_locale,
        metadata_region,
        metadata_max_attempts,
        metadata_backoff_base_ms,
        metadata_backoff_cap_ms,
        metadata_delay_ms,
    })
}

/// Parse a string into an `Environment` variant.
///
/// Returns `ConfigError::InvalidEnvVar` for unrecognized values.
fn parse_environment(s: &str) -> Result<Environment, ConfigError> {
    match s {
        "development" => Ok(Environment::Development),
        "test" => Ok(Environment::Test),
        "production" => Ok(Environment::Production),
        other => Err(ConfigError::InvalidEnvVar {
            var: "DEALPROXY_ENV".to_string(),
            reason: format!("unknown environment \"{other}\""),
        }),
    }
}

/// Splits a comma-separated currency list, lowercasing and dropping
/// blanks and repeats while keeping first-seen order.
fn parse_currency_list(raw: &str) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    for code in raw.split(',').map(str::trim).filter(|s| !s.is_empty()) {
        let code = code.to_lowercase();
        if !out.contains(&code) {
            out.push(code);
        }
    }
    out
}

fn non_zero_u32(var: &str, value: u32) -> Result<u32, ConfigError> {
    if value == 0 {
        return Err(ConfigError::InvalidEnvVar {
            var: var.to_string(),
            reason: "must be greater than zero".to_string(),
        });
    }
    Ok(value)
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
