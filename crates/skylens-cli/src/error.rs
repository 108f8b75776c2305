use thiserror::Error;

use skylens_core::ConfigError;

pub type Result<T> = std::result::Result<T, CliError>;

#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML encode error: {0}")]
    TomlEncode(#[from] toml::ser::Error),

    #[error("invalid argument: {message}")]
    InvalidArgument { message: String },

    #[error("logging setup failed: {message}")]
    Logging { message: String },
}

impl CliError {
    #[must_use]
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Config(error) => error.exit_code(),
            Self::InvalidArgument { .. } => 2,
            _ => 1,
        }
    }

    #[must_use]
    pub fn invalid(message: impl Into<String>) -> Self {
        Self::InvalidArgument {
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use super::CliError;
    use skylens_core::ConfigError;

    #[test]
    fn config_errors_keep_their_exit_code() {
        let error = CliError::from(ConfigError::UnsupportedFormat {
            path: PathBuf::from("field.yaml"),
        });
        assert_eq!(error.exit_code(), 64);
        assert!(error.to_string().contains("field.yaml"));
    }

    #[test]
    fn invalid_argument_is_a_usage_error() {
        let error = CliError::invalid("ticks must be positive");
        assert_eq!(error.exit_code(), 2);
        assert_eq!(error.to_string(), "invalid argument: ticks must be positive");
    }
}
