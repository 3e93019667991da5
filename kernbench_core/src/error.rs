//! Unified error handling for kernbench
//!
//! Every fallible kernel, pool and configuration operation returns
//! [`KernelResult`], so callers get one error type across the workspace.

use thiserror::Error;

/// Main error type for kernbench operations
#[derive(Debug, Error)]
pub enum KernelError {
    /// I/O related errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration parsing or validation errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Invalid input/argument errors
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Operand shapes that cannot be combined
    #[error("Shape mismatch: expected {expected}, got {actual}")]
    ShapeMismatch { expected: String, actual: String },

    /// Read outside a fixed-capacity buffer
    #[error("Index {index} out of range for buffer of length {len}")]
    IndexOutOfRange { index: usize, len: usize },

    /// Allocation failures
    #[error("Memory error: {0}")]
    Memory(String),

    /// Worker pool construction errors
    #[error("Parallel runtime error: {0}")]
    Parallel(String),

    /// Serialization/Deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Parse errors
    #[error("Parse error: {0}")]
    ParseError(String),

    /// Catch-all for other error types
    #[error("{0}")]
    Other(String),
}

/// Convenience type alias for Results using KernelError
pub type KernelResult<T> = Result<T, KernelError>;

impl From<serde_json::Error> for KernelError {
    fn from(err: serde_json::Error) -> Self {
        KernelError::Serialization(err.to_string())
    }
}

impl From<toml::de::Error> for KernelError {
    fn from(err: toml::de::Error) -> Self {
        KernelError::Config(format!("TOML parse error: {}", err))
    }
}

impl From<toml::ser::Error> for KernelError {
    fn from(err: toml::ser::Error) -> Self {
        KernelError::Serialization(format!("TOML serialization error: {}", err))
    }
}

impl From<serde_yaml::Error> for KernelError {
    fn from(err: serde_yaml::Error) -> Self {
        KernelError::Config(format!("YAML error: {}", err))
    }
}

impl From<rayon::ThreadPoolBuildError> for KernelError {
    fn from(err: rayon::ThreadPoolBuildError) -> Self {
        KernelError::Parallel(err.to_string())
    }
}

impl From<std::collections::TryReserveError> for KernelError {
    fn from(err: std::collections::TryReserveError) -> Self {
        KernelError::Memory(err.to_string())
    }
}

// Helper methods
impl KernelError {
    /// Create a configuration error with a custom message
    pub fn config<S: Into<String>>(msg: S) -> Self {
        KernelError::Config(msg.into())
    }

    /// Create an invalid input error
    pub fn invalid_input<S: Into<String>>(msg: S) -> Self {
        KernelError::InvalidInput(msg.into())
    }

    /// Create a shape mismatch error
    pub fn shape_mismatch<S: Into<String>, T: Into<String>>(expected: S, actual: T) -> Self {
        KernelError::ShapeMismatch {
            expected: expected.into(),
            actual: actual.into(),
        }
    }

    /// Check if this is an invalid input error
    pub fn is_invalid_input(&self) -> bool {
        matches!(self, KernelError::InvalidInput(_))
    }

    /// Check if this is an out-of-range read
    pub fn is_out_of_range(&self) -> bool {
        matches!(self, KernelError::IndexOutOfRange { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = KernelError::IndexOutOfRange { index: 7, len: 3 };
        assert_eq!(
            err.to_string(),
            "Index 7 out of range for buffer of length 3"
        );
        assert!(err.is_out_of_range());

        let err = KernelError::shape_mismatch("4 features", "3 features");
        assert_eq!(
            err.to_string(),
            "Shape mismatch: expected 4 features, got 3 features"
        );
    }

    #[test]
    fn test_foreign_conversions() {
        let err: KernelError = Vec::<u64>::new()
            .try_reserve_exact(usize::MAX)
            .unwrap_err()
            .into();
        assert!(matches!(err, KernelError::Memory(_)));

        let err: KernelError = toml::from_str::<toml::Value>("= broken").unwrap_err().into();
        assert!(matches!(err, KernelError::Config(_)));

        let err: KernelError = serde_json::from_str::<serde_json::Value>("{").unwrap_err().into();
        assert!(matches!(err, KernelError::Serialization(_)));
    }
}
