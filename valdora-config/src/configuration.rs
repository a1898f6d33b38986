//! The immutable feature configuration record.

use std::path::Path;
use std::sync::OnceLock;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::env::resolve;
use crate::error::ConfigError;
use crate::toggles::FeatureToggles;

/// Default artificial latency of the mock provider.
pub const DEFAULT_MOCK_DELAY: Duration = Duration::from_millis(1000);
/// Default hard timeout of real API calls.
pub const DEFAULT_API_TIMEOUT: Duration = Duration::from_millis(10_000);
/// Default time an unsubscribed cache entry is retained.
pub const DEFAULT_CACHE_RETENTION: Duration = Duration::from_secs(60);
/// Default API base URL.
pub const DEFAULT_API_BASE_URL: &str = "http://localhost:8000/api";

static CURRENT: OnceLock<FeatureConfiguration> = OnceLock::new();

/// Typed feature flags and API settings.
///
/// Built once at startup and never mutated afterwards. Every other component
/// receives it by reference.
///
/// # Example
///
/// ```
/// use std::time::Duration;
/// use valdora_config::FeatureConfiguration;
///
/// let config = FeatureConfiguration::builder()
///     .mocks_enabled(true)
///     .mock_delay(Duration::ZERO)
///     .build();
///
/// assert!(config.mocks_enabled);
/// assert_eq!(config.api_timeout, Duration::from_secs(10));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FeatureConfiguration {
    /// Route requests to the in-memory mock provider.
    pub mocks_enabled: bool,
    /// Artificial latency of every mock call (e.g. "1s", "250ms").
    #[serde(with = "humantime_serde")]
    pub mock_delay: Duration,
    /// Base URL of the real API, without trailing slash.
    pub api_base_url: String,
    /// Hard cancellation bound of real API calls.
    #[serde(with = "humantime_serde")]
    pub api_timeout: Duration,
    /// How long an entry without subscribers stays in the query cache.
    #[serde(with = "humantime_serde")]
    pub cache_retention: Duration,
    /// Per-feature switches.
    pub features: FeatureToggles,
}

impl Default for FeatureConfiguration {
    fn default() -> Self {
        Self {
            mocks_enabled: false,
            mock_delay: DEFAULT_MOCK_DELAY,
            api_base_url: DEFAULT_API_BASE_URL.to_owned(),
            api_timeout: DEFAULT_API_TIMEOUT,
            cache_retention: DEFAULT_CACHE_RETENTION,
            features: FeatureToggles::default(),
        }
    }
}

impl FeatureConfiguration {
    /// Creates a builder starting from the defaults.
    pub fn builder() -> FeatureConfigurationBuilder {
        FeatureConfigurationBuilder::default()
    }

    /// Process-wide configuration, resolved from the environment on first use.
    ///
    /// Later calls return the same instance; changes to the environment after
    /// the first call are not observed.
    pub fn current() -> &'static FeatureConfiguration {
        CURRENT.get_or_init(resolve)
    }

    /// Parses a YAML document. Missing fields take their default.
    ///
    /// ```
    /// use std::time::Duration;
    /// use valdora_config::FeatureConfiguration;
    ///
    /// let config = FeatureConfiguration::from_yaml(
    ///     "mocks_enabled: true\nmock_delay: 250ms\nfeatures:\n  orders: false\n",
    /// )
    /// .unwrap();
    /// assert_eq!(config.mock_delay, Duration::from_millis(250));
    /// assert!(!config.features.orders);
    /// ```
    pub fn from_yaml(document: &str) -> Result<Self, ConfigError> {
        let mut config: Self =
            serde_saphyr::from_str(document).map_err(|e| ConfigError::Parse(e.to_string()))?;
        let trimmed = config.api_base_url.trim_end_matches('/').len();
        config.api_base_url.truncate(trimmed);
        Ok(config)
    }

    /// Reads and parses a YAML file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let document = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_yaml(&document)
    }

    /// Serializes the configuration as YAML.
    pub fn to_yaml(&self) -> Result<String, ConfigError> {
        serde_saphyr::to_string(self).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    /// Joins the base URL and a resource path.
    ///
    /// ```
    /// use valdora_config::FeatureConfiguration;
    ///
    /// let config = FeatureConfiguration::builder()
    ///     .api_base_url("https://api.example.test/v1/")
    ///     .build();
    /// assert_eq!(config.endpoint_url("/tenants/1"), "https://api.example.test/v1/tenants/1");
    /// ```
    pub fn endpoint_url(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.api_base_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }
}

/// Builder for [`FeatureConfiguration`].
#[derive(Debug, Clone, Default)]
pub struct FeatureConfigurationBuilder {
    config: FeatureConfiguration,
}

impl FeatureConfigurationBuilder {
    /// Enables or disables the mock provider.
    pub fn mocks_enabled(mut self, enabled: bool) -> Self {
        self.config.mocks_enabled = enabled;
        self
    }

    /// Sets the mock latency.
    pub fn mock_delay(mut self, delay: Duration) -> Self {
        self.config.mock_delay = delay;
        self
    }

    /// Sets the API base URL.
    pub fn api_base_url(mut self, url: impl Into<String>) -> Self {
        self.config.api_base_url = url.into();
        self
    }

    /// Sets the API timeout.
    pub fn api_timeout(mut self, timeout: Duration) -> Self {
        self.config.api_timeout = timeout;
        self
    }

    /// Sets the retention of unsubscribed cache entries.
    pub fn cache_retention(mut self, retention: Duration) -> Self {
        self.config.cache_retention = retention;
        self
    }

    /// Replaces all feature toggles.
    pub fn features(mut self, features: FeatureToggles) -> Self {
        self.config.features = features;
        self
    }

    /// Sets one toggle by name. Unknown names are ignored.
    pub fn feature(mut self, name: &str, enabled: bool) -> Self {
        self.config.features.set(name, enabled);
        self
    }

    /// Builds the configuration.
    pub fn build(self) -> FeatureConfiguration {
        self.config
    }
}
