//! Configuration loading errors.

use std::path::PathBuf;

use thiserror::Error;

/// Errors raised while loading a configuration file.
///
/// Environment resolution never fails; only explicit file loading reports
/// these.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The file could not be read.
    #[error("can't read configuration file {path}: {source}")]
    Io {
        /// File path.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },
    /// The file is not a valid configuration document.
    #[error("invalid configuration document: {0}")]
    Parse(String),
}
