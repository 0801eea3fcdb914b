//! Error types and handling for Naiad
//!
//! This module defines the error types used throughout the application,
//! providing consistent error handling and reporting.

use thiserror::Error;

/// Result type alias for Naiad operations
pub type Result<T> = std::result::Result<T, NaiadError>;

/// Main error type for Naiad
#[derive(Debug, Error)]
pub enum NaiadError {
    /// Configuration-related errors
    #[error("Configuration error: {message}")]
    Config { message: String },

    /// Authentication/authorization errors (bad portal credentials)
    #[error("Authentication error: {message}")]
    Auth { message: String },

    /// Transient portal fetch errors
    #[error("Fetch error: {message}")]
    Fetch { message: String },

    /// Unexpected payload shape (missing metric keys, wrong types)
    #[error("Data shape error: {message}")]
    DataShape { message: String },

    /// Point/statistics store errors
    #[error("Store error: {message}")]
    Store { message: String },

    /// Serialization/deserialization errors
    #[error("Serialization error: {message}")]
    Serialization { message: String },

    /// File I/O errors
    #[error("I/O error: {message}")]
    Io { message: String },

    /// Network-related errors
    #[error("Network error: {message}")]
    Network { message: String },

    /// Timeout errors
    #[error("Timeout error: {message}")]
    Timeout { message: String },

    /// Validation errors
    #[error("Validation error: {field} - {message}")]
    Validation { field: String, message: String },

    /// Generic errors with context
    #[error("Error: {message}")]
    Generic { message: String },
}

impl NaiadError {
    /// Create a new configuration error
    pub fn config<S: Into<String>>(message: S) -> Self {
        NaiadError::Config {
            message: message.into(),
        }
    }

    /// Create a new auth error
    pub fn auth<S: Into<String>>(message: S) -> Self {
        NaiadError::Auth {
            message: message.into(),
        }
    }

    /// Create a new fetch error
    pub fn fetch<S: Into<String>>(message: S) -> Self {
        NaiadError::Fetch {
            message: message.into(),
        }
    }

    /// Create a new data shape error
    pub fn data_shape<S: Into<String>>(message: S) -> Self {
        NaiadError::DataShape {
            message: message.into(),
        }
    }

    /// Create a new store error
    pub fn store<S: Into<String>>(message: S) -> Self {
        NaiadError::Store {
            message: message.into(),
        }
    }

    /// Create a new I/O error
    pub fn io<S: Into<String>>(message: S) -> Self {
        NaiadError::Io {
            message: message.into(),
        }
    }

    /// Create a new network error
    pub fn network<S: Into<String>>(message: S) -> Self {
        NaiadError::Network {
            message: message.into(),
        }
    }

    /// Create a new timeout error
    pub fn timeout<S: Into<String>>(message: S) -> Self {
        NaiadError::Timeout {
            message: message.into(),
        }
    }

    /// Create a new validation error
    pub fn validation<S: Into<String>>(field: S, message: S) -> Self {
        NaiadError::Validation {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Create a new generic error
    pub fn generic<S: Into<String>>(message: S) -> Self {
        NaiadError::Generic {
            message: message.into(),
        }
    }

    /// Whether a failed portal operation is worth retrying
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            NaiadError::Fetch { .. } | NaiadError::Network { .. } | NaiadError::Timeout { .. }
        )
    }
}

impl From<std::io::Error> for NaiadError {
    fn from(err: std::io::Error) -> Self {
        NaiadError::io(err.to_string())
    }
}

impl From<serde_yaml::Error> for NaiadError {
    fn from(err: serde_yaml::Error) -> Self {
        NaiadError::Serialization {
            message: err.to_string(),
        }
    }
}

impl From<serde_json::Error> for NaiadError {
    fn from(err: serde_json::Error) -> Self {
        NaiadError::Serialization {
            message: err.to_string(),
        }
    }
}

impl From<reqwest::Error> for NaiadError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            NaiadError::timeout(err.to_string())
        } else {
            NaiadError::network(err.to_string())
        }
    }
}

impl From<chrono::ParseError> for NaiadError {
    fn from(err: chrono::ParseError) -> Self {
        NaiadError::validation("datetime", &err.to_string())
    }
}
