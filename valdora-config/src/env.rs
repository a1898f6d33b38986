//! Resolution of [`FeatureConfiguration`] from environment variables.
//!
//! | Variable                      | Meaning                         | Default                     |
//! |-------------------------------|---------------------------------|-----------------------------|
//! | `VALDORA_ENABLE_MOCKS`        | route to the mock provider      | `false`                     |
//! | `VALDORA_MOCK_DELAY_MS`       | mock latency in milliseconds    | `1000`                      |
//! | `VALDORA_API_BASE_URL`        | real API base URL               | `http://localhost:8000/api` |
//! | `VALDORA_API_TIMEOUT_MS`      | real API timeout                | `10000`                     |
//! | `VALDORA_CACHE_RETENTION_MS`  | unsubscribed entry retention    | `60000`                     |
//! | `VALDORA_FEATURE_<NAME>`      | one feature toggle              | `true`                      |
//! | `VALDORA_CONFIG_FILE`         | YAML file read before variables | unset                       |
//!
//! Absent variables keep the value of the layer below (YAML file, then the
//! defaults). Malformed values are logged and also fall through; resolution
//! never fails.

use std::time::Duration;

use tracing::warn;

use crate::configuration::FeatureConfiguration;
use crate::toggles::FeatureToggles;

/// Mock switch.
pub const ENABLE_MOCKS: &str = "VALDORA_ENABLE_MOCKS";
/// Mock latency in milliseconds.
pub const MOCK_DELAY_MS: &str = "VALDORA_MOCK_DELAY_MS";
/// Real API base URL.
pub const API_BASE_URL: &str = "VALDORA_API_BASE_URL";
/// Real API timeout in milliseconds.
pub const API_TIMEOUT_MS: &str = "VALDORA_API_TIMEOUT_MS";
/// Cache retention in milliseconds.
pub const CACHE_RETENTION_MS: &str = "VALDORA_CACHE_RETENTION_MS";
/// Prefix of the per-feature variables.
pub const FEATURE_PREFIX: &str = "VALDORA_FEATURE_";
/// Optional YAML configuration file.
pub const CONFIG_FILE: &str = "VALDORA_CONFIG_FILE";

/// Resolves the configuration from the process environment.
pub fn resolve() -> FeatureConfiguration {
    resolve_from(|name| std::env::var(name).ok())
}

/// Resolves the configuration from an arbitrary variable lookup, reading the
/// file named by `VALDORA_CONFIG_FILE` first when present.
pub fn resolve_from<F>(lookup: F) -> FeatureConfiguration
where
    F: Fn(&str) -> Option<String>,
{
    let base = match lookup(CONFIG_FILE) {
        Some(path) => FeatureConfiguration::from_file(path.trim()).unwrap_or_else(|error| {
            warn!(%error, "configuration file ignored, using defaults");
            FeatureConfiguration::default()
        }),
        None => FeatureConfiguration::default(),
    };
    overlay(base, lookup)
}

/// Applies environment variables on top of `base`.
///
/// ```
/// use std::collections::HashMap;
/// use valdora_config::{FeatureConfiguration, overlay};
///
/// let vars = HashMap::from([("VALDORA_ENABLE_MOCKS", "true")]);
/// let config = overlay(FeatureConfiguration::default(), |name| {
///     vars.get(name).map(|v| v.to_string())
/// });
/// assert!(config.mocks_enabled);
/// ```
pub fn overlay<F>(base: FeatureConfiguration, lookup: F) -> FeatureConfiguration
where
    F: Fn(&str) -> Option<String>,
{
    let mocks_enabled = read(&lookup, ENABLE_MOCKS, parse_bool).unwrap_or(base.mocks_enabled);
    let mock_delay = read(&lookup, MOCK_DELAY_MS, parse_millis).unwrap_or(base.mock_delay);
    let api_timeout = read(&lookup, API_TIMEOUT_MS, parse_millis).unwrap_or(base.api_timeout);
    let cache_retention =
        read(&lookup, CACHE_RETENTION_MS, parse_millis).unwrap_or(base.cache_retention);
    let api_base_url = read(&lookup, API_BASE_URL, parse_url).unwrap_or(base.api_base_url);

    let mut features = base.features;
    for name in FeatureToggles::NAMES {
        let variable = format!("{FEATURE_PREFIX}{}", name.to_ascii_uppercase());
        if let Some(enabled) = read(&lookup, &variable, parse_bool) {
            features.set(name, enabled);
        }
    }

    FeatureConfiguration {
        mocks_enabled,
        mock_delay,
        api_base_url,
        api_timeout,
        cache_retention,
        features,
    }
}

fn read<F, T>(lookup: &F, name: &str, parse: fn(&str) -> Option<T>) -> Option<T>
where
    F: Fn(&str) -> Option<String>,
{
    let raw = lookup(name)?;
    let parsed = parse(raw.trim());
    if parsed.is_none() {
        warn!(variable = name, value = %raw, "malformed configuration value, using default");
    }
    parsed
}

/// Parses `true/false`, `1/0`, `yes/no` and `on/off`, case-insensitively.
pub fn parse_bool(value: &str) -> Option<bool> {
    match value.to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" => Some(false),
        _ => None,
    }
}

fn parse_millis(value: &str) -> Option<Duration> {
    value.parse::<u64>().ok().map(Duration::from_millis)
}

fn parse_url(value: &str) -> Option<String> {
    let trimmed = value.trim_end_matches('/');
    let host = trimmed
        .strip_prefix("https://")
        .or_else(|| trimmed.strip_prefix("http://"))?;
    (!host.is_empty()).then(|| trimmed.to_owned())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_bool_spellings() {
        for value in ["true", "TRUE", "1", "yes", "On"] {
            assert_eq!(parse_bool(value), Some(true), "{value}");
        }
        for value in ["false", "0", "No", "off"] {
            assert_eq!(parse_bool(value), Some(false), "{value}");
        }
        assert_eq!(parse_bool("maybe"), None);
        assert_eq!(parse_bool(""), None);
    }

    #[test]
    fn test_parse_url_trims_trailing_slash() {
        assert_eq!(
            parse_url("https://api.example.test/"),
            Some("https://api.example.test".to_owned())
        );
        assert_eq!(parse_url("ftp://nope"), None);
        assert_eq!(parse_url("localhost:8000"), None);
    }
}
