#![warn(missing_docs)]
//! # valdora-config
//!
//! Resolves the dashboard's [`FeatureConfiguration`] once at startup.
//!
//! Values come from three layers, each overriding the one below:
//!
//! 1. built-in defaults (mocks off, 1s mock delay, 10s API timeout)
//! 2. an optional YAML file named by `VALDORA_CONFIG_FILE`
//! 3. `VALDORA_*` environment variables
//!
//! ```
//! use valdora_config::{FeatureConfiguration, resolve_from};
//!
//! let config = resolve_from(|name| match name {
//!     "VALDORA_ENABLE_MOCKS" => Some("yes".into()),
//!     "VALDORA_FEATURE_ORDERS" => Some("off".into()),
//!     _ => None,
//! });
//! assert!(config.mocks_enabled);
//! assert!(!config.features.is_enabled("orders"));
//! # let _ = FeatureConfiguration::default();
//! ```

pub mod configuration;
pub mod env;
pub mod error;
pub mod toggles;

pub use configuration::{
    DEFAULT_API_BASE_URL, DEFAULT_API_TIMEOUT, DEFAULT_CACHE_RETENTION, DEFAULT_MOCK_DELAY,
    FeatureConfiguration, FeatureConfigurationBuilder,
};
pub use env::{overlay, resolve, resolve_from};
pub use error::ConfigError;
pub use toggles::FeatureToggles;
