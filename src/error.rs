//! Error types for awstools.
//!
//! Every fallible library operation returns [`Result`], whose error side is the
//! [`Error`] enum below. The binary wraps these in `anyhow` for reporting.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for awstools operations.
pub type Result<T> = std::result::Result<T, Error>;

/// The main error type for awstools.
#[derive(Error, Debug)]
pub enum Error {
    // ========================================================================
    // Configuration input errors
    // ========================================================================
    /// The configuration document is structurally invalid.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// A configuration file could not be read.
    #[error("Failed to read '{path}': {source}")]
    ReadFile {
        /// Path of the file
        path: PathBuf,
        /// Source error
        #[source]
        source: std::io::Error,
    },

    /// Tool settings could not be loaded.
    #[error("Settings error: {0}")]
    Settings(String),

    // ========================================================================
    // Provider errors
    // ========================================================================
    /// An AWS provider call failed.
    #[error("{provider} request failed: {message}")]
    Provider {
        /// Provider name (SSM, KMS, SECRETS_MANAGER)
        provider: &'static str,
        /// Error message
        message: String,
    },

    /// A secret did not decode into a flat string map.
    #[error("Invalid secret format for '{secret}': {message}")]
    InvalidSecretFormat {
        /// Secret identifier
        secret: String,
        /// Error message
        message: String,
    },

    /// Base64 decoding failed.
    #[error("Base64 decoding failed: {0}")]
    Decode(#[from] base64::DecodeError),

    /// Every refresh attempt failed.
    #[error("Failed to refresh config after {attempts} attempt(s)")]
    RefreshFailed {
        /// Number of attempts performed
        attempts: u32,
    },

    // ========================================================================
    // Session errors
    // ========================================================================
    /// AWS session or credential setup failed.
    #[error("Session error: {0}")]
    Session(String),

    // ========================================================================
    // Generic errors
    // ========================================================================
    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Create a provider error from any displayable SDK error.
    pub fn provider(provider: &'static str, err: impl std::error::Error) -> Self {
        Self::Provider {
            provider,
            message: aws_sdk_sts::error::DisplayErrorContext(err).to_string(),
        }
    }

    /// Create a file read error.
    pub fn read_file(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::ReadFile {
            path: path.into(),
            source,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_refresh_failed_message() {
        let err = Error::RefreshFailed { attempts: 5 };
        assert_eq!(err.to_string(), "Failed to refresh config after 5 attempt(s)");
    }

    #[test]
    fn test_read_file_message_includes_path() {
        let err = Error::read_file(
            "/tmp/missing.json",
            std::io::Error::new(std::io::ErrorKind::NotFound, "not found"),
        );
        assert!(err.to_string().contains("/tmp/missing.json"));
    }
}
