use std::collections::HashMap;
use std::env::VarError;

use super::*;

fn lookup_from_map<'a>(
    map: &'a HashMap<&'a str, &'a str>,
) -> impl Fn(&str) -> Result<String, VarError> + 'a {
    move |key| {
        map.get(key)
            .map(|v| (*v).to_string())
            .ok_or(VarError::NotPresent)
    }
}

#[test]
fn parse_environment_known_values() {
    assert_eq!(
        parse_environment("development").unwrap(),
        Environment::Development
    );
    assert_eq!(parse_environment("test").unwrap(), Environment::Test);
    assert_eq!(
        parse_environment("production").unwrap(),
        Environment::Production
    );
}

#[test]
fn parse_environment_unknown_fails() {
    let err = parse_environment("staging").unwrap_err();
    assert!(matches!(err, ConfigError::InvalidEnvVar { ref var, .. } if var == "DEALPROXY_ENV"));
}

#[test]
fn build_app_config_defaults() {
    let map: HashMap<&str, &str> = HashMap::new();
    let cfg = build_app_config(lookup_from_map(&map)).unwrap();
    assert_eq!(cfg.env, Environment::Development);
    assert_eq!(cfg.bind_addr.to_string(), "0.0.0.0:3000");
    assert_eq!(cfg.log_level, "info");
    assert_eq!(cfg.deals_api_url, "https://www.cheapshark.com/api/1.0");
    assert_eq!(cfg.metadata_api_url, "https://store.steampowered.com/api");
    assert_eq!(cfg.currencies, vec!["usd", "eur", "gbp"]);
    assert_eq!(cfg.default_currency, "usd");
    assert_eq!(cfg.cache_ttl_secs, 3600);
    assert_eq!(cfg.status_interval_secs, 3600);
    assert_eq!(cfg.full_enrich_interval_secs, 86_400);
    assert_eq!(cfg.page_size, 60);
    assert_eq!(cfg.target_unique_games, 1000);
    assert_eq!(cfg.max_pages, 50);
    assert_eq!(cfg.metadata_timeout_ms, 6000);
    assert_eq!(cfg.metadata_locale, "english");
    assert_eq!(cfg.metadata_region, "us");
    assert_eq!(cfg.metadata_max_attempts, 30);
    assert_eq!(cfg.metadata_backoff_base_ms, 1000);
    assert_eq!(cfg.metadata_backoff_cap_ms, 30_000);
    assert_eq!(cfg.metadata_delay_ms, 1000);
}

#[test]
fn currencies_are_normalized_and_deduplicated() {
    let mut map = HashMap::new();
    map.insert("DEALPROXY_CURRENCIES", " EUR, usd,,eur ,CAD");
    let cfg = build_app_config(lookup_from_map(&map)).unwrap();
    assert_eq!(cfg.currencies, vec!["eur", "usd", "cad"]);
    assert_eq!(cfg.default_currency, "eur");
}

#[test]
fn empty_currency_list_is_rejected() {
    let mut map = HashMap::new();
    map.insert("DEALPROXY_CURRENCIES", " , ");
    let result = build_app_config(lookup_from_map(&map));
    assert!(
        matches!(result, Err(ConfigError::InvalidEnvVar { ref var, .. }) if var == "DEALPROXY_CURRENCIES"),
        "expected InvalidEnvVar(DEALPROXY_CURRENCIES), got: {result:?}"
    );
}

#[test]
fn default_currency_must_be_tracked() {
    let mut map = HashMap::new();
    map.insert("DEALPROXY_CURRENCIES", "usd,eur");
    map.insert("DEALPROXY_DEFAULT_CURRENCY", "GBP");
    let result = build_app_config(lookup_from_map(&map));
    assert!(
        matches!(result, Err(ConfigError::InvalidEnvVar { ref var, .. }) if var == "DEALPROXY_DEFAULT_CURRENCY"),
        "expected InvalidEnvVar(DEALPROXY_DEFAULT_CURRENCY), got: {result:?}"
    );
}

#[test]
fn default_currency_override() {
    let mut map = HashMap::new();
    map.insert("DEALPROXY_DEFAULT_CURRENCY", "EUR");
    let cfg = build_app_config(lookup_from_map(&map)).unwrap();
    assert_eq!(cfg.default_currency, "eur");
}

#[test]
fn invalid_bind_addr_fails() {
    let mut map = HashMap::new();
    map.insert("DEALPROXY_BIND_ADDR", "not-a-socket-addr");
    let result = build_app_config(lookup_from_map(&map));
    assert!(
        matches!(result, Err(ConfigError::InvalidEnvVar { ref var, .. }) if var == "DEALPROXY_BIND_ADDR"),
        "expected InvalidEnvVar(DEALPROXY_BIND_ADDR), got: {result:?}"
    );
}

#[test]
fn page_bounds_override() {
    let mut map = HashMap::new();
    map.insert("DEALPROXY_TARGET_UNIQUE_GAMES", "100");
    map.insert("DEALPROXY_MAX_PAGES", "10");
    let cfg = build_app_config(lookup_from_map(&map)).unwrap();
    assert_eq!(cfg.target_unique_games, 100);
    assert_eq!(cfg.max_pages, 10);
}

#[test]
fn zero_max_pages_is_rejected() {
    let mut map = HashMap::new();
    map.insert("DEALPROXY_MAX_PAGES", "0");
    let result = build_app_config(lookup_from_map(&map));
    assert!(
        matches!(result, Err(ConfigError::InvalidEnvVar { ref var, .. }) if var == "DEALPROXY_MAX_PAGES"),
        "expected InvalidEnvVar(DEALPROXY_MAX_PAGES), got: {result:?}"
    );
}

#[test]
fn zero_metadata_attempts_is_rejected() {
    let mut map = HashMap::new();
    map.insert("DEALPROXY_METADATA_MAX_ATTEMPTS", "0");
    let result = build_app_config(lookup_from_map(&map));
    assert!(matches!(
        result,
        Err(ConfigError::InvalidEnvVar { ref var, .. }) if var == "DEALPROXY_METADATA_MAX_ATTEMPTS"
    ));
}

#[test]
fn non_numeric_ttl_is_rejected() {
    let mut map = HashMap::new();
    map.insert("DEALPROXY_CACHE_TTL_SECS", "an hour");
    let result = build_app_config(lookup_from_map(&map));
    assert!(
        matches!(result, Err(ConfigError::InvalidEnvVar { ref var, .. }) if var == "DEALPROXY_CACHE_TTL_SECS"),
        "expected InvalidEnvVar(DEALPROXY_CACHE_TTL_SECS), got: {result:?}"
    );
}

#[test]
fn backoff_override() {
    let mut map = HashMap::new();
    map.insert("DEALPROXY_METADATA_BACKOFF_BASE_MS", "250");
    map.insert("DEALPROXY_METADATA_BACKOFF_CAP_MS", "4000");
    let cfg = build_app_config(lookup_from_map(&map)).unwrap();
    assert_eq!(cfg.metadata_backoff_base_ms, 250);
    assert_eq!(cfg.metadata_backoff_cap_ms, 4000);
}

#[test]
fn zero_refresh_interval_is_rejected() {
    let mut map = HashMap::new();
    map.insert("DEALPROXY_STATUS_INTERVAL_SECS", "0");
    let result = build_app_config(lookup_from_map(&map));
    assert!(matches!(
        result,
        Err(ConfigError::InvalidEnvVar { ref var, .. }) if var == "DEALPROXY_STATUS_INTERVAL_SECS"
    ));
}
