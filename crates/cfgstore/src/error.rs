//! Error types for cfgstore

use std::path::PathBuf;
use thiserror::Error;

/// Result type for store operations
pub type Result<T> = std::result::Result<T, ConfigError>;

/// Store error types
#[derive(Error, Debug)]
pub enum ConfigError {
    /// A stored string is not a valid literal of the setting's type
    #[error("Cannot parse {input:?} as {target}: {message}")]
    Format {
        target: &'static str,
        input: String,
        message: String,
    },

    /// Rejected argument (empty key, self-containment, ...)
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// The target type exposes no bindable field with this name
    #[error("No field named {field} on {type_name}")]
    NoSuchField {
        type_name: &'static str,
        field: String,
    },

    /// The value handed to a field has a different type than the field
    #[error("Field {field} expects a value of type {expected}")]
    TypeMismatch {
        field: &'static str,
        expected: &'static str,
    },

    /// Write access to the field's owner could not be obtained
    #[error("Write access to field {field} denied: {message}")]
    Access { field: String, message: String },

    /// File read/write failed
    #[error("IO error on {path} ({operation}): {source}")]
    IoError {
        path: PathBuf,
        operation: IoOperation,
        source: std::io::Error,
    },

    /// Stream read/write failed
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// A value could not be encoded for the record stream
    #[error("Failed to encode value for {key}: {message}")]
    Encode { key: String, message: String },
}

/// IO operation type for error context
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IoOperation {
    Read,
    Write,
}

impl std::fmt::Display for IoOperation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            IoOperation::Read => write!(f, "read"),
            IoOperation::Write => write!(f, "write"),
        }
    }
}

impl ConfigError {
    /// Create a format error
    pub fn format(
        target: &'static str,
        input: impl Into<String>,
        message: impl std::fmt::Display,
    ) -> Self {
        ConfigError::Format {
            target,
            input: input.into(),
            message: message.to_string(),
        }
    }

    /// Create an invalid argument error
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        ConfigError::InvalidArgument(message.into())
    }

    /// Create a missing field error
    pub fn no_such_field(type_name: &'static str, field: impl Into<String>) -> Self {
        ConfigError::NoSuchField {
            type_name,
            field: field.into(),
        }
    }

    /// Create a type mismatch error
    pub fn type_mismatch(field: &'static str, expected: &'static str) -> Self {
        ConfigError::TypeMismatch { field, expected }
    }

    /// Create an access error
    pub fn access(field: impl Into<String>, message: impl Into<String>) -> Self {
        ConfigError::Access {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Create an IO error
    pub fn io_error(path: impl Into<PathBuf>, operation: IoOperation, source: std::io::Error) -> Self {
        ConfigError::IoError {
            path: path.into(),
            operation,
            source,
        }
    }

    /// Create an encode error
    pub fn encode(key: impl Into<String>, message: impl std::fmt::Display) -> Self {
        ConfigError::Encode {
            key: key.into(),
            message: message.to_string(),
        }
    }

    /// Whether this error came from the file system or a stream
    pub fn is_io(&self) -> bool {
        matches!(self, ConfigError::Io(_) | ConfigError::IoError { .. })
    }
}
