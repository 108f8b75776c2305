use std::path::PathBuf;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, ConfigError>;

/// Failures while loading a [`FieldConfig`](crate::config::FieldConfig).
///
/// Only loading can fail. Values that parse but are out of range are
/// clamped instead of rejected.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("I/O error reading {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("unsupported config format: {path} (expected .toml or .json)")]
    UnsupportedFormat { path: PathBuf },
}

impl ConfigError {
    /// Process exit code for command-line front ends.
    #[must_use]
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Io { .. } => 66,
            Self::Toml(_) | Self::Json(_) => 65,
            Self::UnsupportedFormat { .. } => 64,
        }
    }
}
