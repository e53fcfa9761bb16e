//! CLI-specific error types and exit code mapping

use scangraph_core::error::ScangraphError;
use scangraph_sync::SyncError;
use scangraph_tenable::TenableError;

/// CLI-specific error type.
///
/// Each variant carries enough context for a user-friendly message.
/// The `exit_code()` method maps errors to process exit codes.
#[derive(Debug, thiserror::Error)]
pub enum CliError {
    /// Configuration loading or validation failure.
    #[error("configuration error: {0}")]
    Config(String),

    /// A subcommand-specific operation failed.
    #[error("{0}")]
    Command(String),

    /// The API rejected the configured credentials.
    #[error("authentication failed: {0}")]
    Authentication(String),

    /// API call, export or synchronization failure.
    #[error("sync error: {0}")]
    Sync(String),

    /// JSON serialisation failed during output rendering.
    #[error("json output error: {0}")]
    JsonSerialize(#[from] serde_json::Error),

    /// IO error (file read, stdout write, etc.).
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Wrapped domain error from scangraph-core.
    #[error("{0}")]
    Core(#[from] ScangraphError),
}

impl CliError {
    /// Map the error to a process exit code.
    ///
    /// | Code | Meaning                         |
    /// |------|---------------------------------|
    /// | 0    | Success                         |
    /// | 1    | General / command error          |
    /// | 2    | Configuration error              |
    /// | 3    | Authentication failure           |
    /// | 4    | API / export / sync failure      |
    /// | 10   | IO error                         |
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Config(_) => 2,
            Self::Authentication(_) => 3,
            Self::Sync(_) => 4,
            Self::Io(_) => 10,
            Self::Core(e) => match e {
                ScangraphError::Config(_) => 2,
                ScangraphError::Api(_) | ScangraphError::Sync(_) => 4,
                ScangraphError::Io(_) => 10,
                ScangraphError::Sink(_) => 1,
            },
            Self::JsonSerialize(_) | Self::Command(_) => 1,
        }
    }
}

impl From<SyncError> for CliError {
    fn from(e: SyncError) -> Self {
        match e {
            SyncError::Config(e) => Self::Config(e.to_string()),
            SyncError::Authentication { source } => Self::Authentication(source.to_string()),
            SyncError::Sink(e) => Self::Command(e.to_string()),
            other => Self::Sync(other.to_string()),
        }
    }
}

impl From<TenableError> for CliError {
    fn from(e: TenableError) -> Self {
        Self::Sync(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use scangraph_core::error::{ConfigError, SinkError};

    #[test]
    fn test_exit_code_config_error() {
        let err = CliError::Config("test error".to_owned());
        assert_eq!(err.exit_code(), 2, "config error should return exit code 2");
    }

    #[test]
    fn test_exit_code_io_error() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err = CliError::Io(io_err);
        assert_eq!(err.exit_code(), 10, "io error should return exit code 10");
    }

    #[test]
    fn test_exit_code_core_config_error() {
        let err: CliError = ScangraphError::Config(ConfigError::FileNotFound {
            path: "scangraph.toml".to_owned(),
        })
        .into();
        assert_eq!(err.exit_code(), 2);
    }

    #[test]
    fn test_missing_credentials_map_to_config_exit_code() {
        let err: CliError = SyncError::Config(ConfigError::MissingCredentials {
            field: "tenable.access_key".to_owned(),
        })
        .into();
        assert_eq!(err.exit_code(), 2);
        assert!(err.to_string().contains("tenable.access_key"));
    }

    #[test]
    fn test_authentication_failure_maps_to_exit_code_3() {
        let source = TenableError::from_response(401, "Unauthorized", "GET", "/session", None);
        let err: CliError = SyncError::Authentication { source }.into();
        assert_eq!(err.exit_code(), 3);
        assert!(err.to_string().contains("401"));
    }

    #[test]
    fn test_client_error_maps_to_sync_exit_code() {
        let client = TenableError::from_response(500, "Internal Server Error", "GET", "/scans", None);
        let err: CliError = SyncError::Client(client).into();
        assert_eq!(err.exit_code(), 4);
    }

    #[test]
    fn test_sink_error_is_command_error() {
        let err: CliError = SyncError::Sink(SinkError::DuplicateKey {
            key: "tenable_scan_1".to_owned(),
        })
        .into();
        assert_eq!(err.exit_code(), 1);
    }

    #[test]
    fn test_error_display_config() {
        let err = CliError::Config("invalid TOML syntax".to_owned());
        let display_str = format!("{}", err);
        assert!(display_str.contains("configuration error"));
        assert!(display_str.contains("invalid TOML syntax"));
    }
}
