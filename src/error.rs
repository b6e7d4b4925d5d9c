/*!
 * Error types for minion-keys
 */

use std::fmt;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, SaltError>;

/// Exit code constants for structured process exit
pub const EXIT_SUCCESS: i32 = 0;
pub const EXIT_PARTIAL: i32 = 1;
pub const EXIT_FATAL: i32 = 2;

/// Errors raised while talking to the Salt API or managing key pairs
#[derive(Error, Debug)]
pub enum SaltError {
    /// Bad or missing static configuration, detected before any network call
    #[error("Configuration error: {0}")]
    Config(String),

    /// Login attempted in the wrong mode, rejected or returned no session
    #[error("Authentication error: {0}")]
    Authentication(String),

    /// Connection-level failure, including the per-request timeout
    #[error("Transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// Non-success HTTP status from a well-formed request
    #[error("Salt API returned {status} {reason}")]
    Remote { status: u16, reason: String },

    /// Wheel call accepted but reported as failed by the master
    #[error("{fun} failed on the master: {message}")]
    WheelFailed { fun: String, message: String },

    /// Create attempted against a minion id the master already knows
    #[error("The minion {minion_id} is already in use")]
    ResourceConflict { minion_id: String },

    /// Minion id is not a valid RFC1123 hostname
    #[error("minion_id must be a valid RFC1123 hostname, the value {0} is wrong")]
    InvalidMinionId(String),

    /// Response body is not the JSON shape we expected
    #[error("Failed to decode response: {0}")]
    Decode(#[from] serde_json::Error),

    /// Response decoded but is missing mandatory content
    #[error("Malformed response: {0}")]
    MalformedResponse(String),

    /// PEM key material failed validation
    #[error("Invalid key material: {0}")]
    InvalidKey(String),

    /// I/O error (config files, log files)
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl SaltError {
    /// Build a remote error from an HTTP status
    pub fn remote(status: reqwest::StatusCode) -> Self {
        SaltError::Remote {
            status: status.as_u16(),
            reason: status.canonical_reason().unwrap_or("").to_string(),
        }
    }

    /// Get the process exit code for this error
    pub fn exit_code(&self) -> i32 {
        if self.is_fatal() {
            EXIT_FATAL
        } else {
            EXIT_PARTIAL
        }
    }

    /// Errors that will not go away by running the same operation again
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            SaltError::Config(_)
                | SaltError::Authentication(_)
                | SaltError::ResourceConflict { .. }
                | SaltError::InvalidMinionId(_)
        )
    }

    /// Connection-level failures that may succeed if the caller tries later
    pub fn is_transient(&self) -> bool {
        match self {
            SaltError::Transport(e) => e.is_timeout() || e.is_connect(),
            SaltError::Remote { status, .. } => *status >= 500,
            _ => false,
        }
    }

    /// Get error category for logging and diagnostics
    pub fn category(&self) -> ErrorCategory {
        match self {
            SaltError::Config(_) | SaltError::Io(_) => ErrorCategory::Configuration,
            SaltError::Authentication(_) => ErrorCategory::Security,
            SaltError::Transport(_) => ErrorCategory::Network,
            SaltError::Remote { .. } | SaltError::WheelFailed { .. } => ErrorCategory::Remote,
            SaltError::ResourceConflict { .. } | SaltError::InvalidMinionId(_) => {
                ErrorCategory::Validation
            }
            SaltError::Decode(_) | SaltError::MalformedResponse(_) => ErrorCategory::Protocol,
            SaltError::InvalidKey(_) => ErrorCategory::Integrity,
        }
    }
}

/// Error category for classification and reporting
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Static configuration problems
    Configuration,
    /// Authentication/authorization errors
    Security,
    /// Connection and timeout errors
    Network,
    /// Non-success status or failed call reported by the Salt API
    Remote,
    /// User-facing input or state conflicts
    Validation,
    /// Unexpected response shapes
    Protocol,
    /// Key material checks
    Integrity,
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorCategory::Configuration => write!(f, "configuration"),
            ErrorCategory::Security => write!(f, "security"),
            ErrorCategory::Network => write!(f, "network"),
            ErrorCategory::Remote => write!(f, "remote"),
            ErrorCategory::Validation => write!(f, "validation"),
            ErrorCategory::Protocol => write!(f, "protocol"),
            ErrorCategory::Integrity => write!(f, "integrity"),
        }
    }
}
