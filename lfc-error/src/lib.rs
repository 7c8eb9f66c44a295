//! Unified error handling for Linux Fan Control
//!
//! This crate provides the single error type used by the coupling,
//! calibration and control engine. Hardware write failures are split by
//! kind because the write layer reacts differently to each of them.

use std::io;
use std::path::PathBuf;

/// Result type alias using LfcError
pub type Result<T> = std::result::Result<T, LfcError>;

/// Unified error type for all engine operations
#[derive(thiserror::Error, Debug)]
pub enum LfcError {
    // ============================================================================
    // I/O and File System Errors
    // ============================================================================
    #[error("Failed to read file {path}: {source}")]
    FileRead {
        path: PathBuf,
        source: io::Error,
    },

    /// The hwmon tree itself cannot be reached. Fatal for a whole batch.
    #[error("Hardware monitor tree unavailable at {path}: {reason}")]
    TreeUnavailable {
        path: PathBuf,
        reason: String,
    },

    // ============================================================================
    // Hardware Access Errors
    // ============================================================================
    #[error("Failed to read PWM from {path}: {reason}")]
    PwmRead {
        path: PathBuf,
        reason: String,
    },

    /// The driver rejected the write with EOPNOTSUPP. The output is
    /// downgraded to read-only for the rest of its lifetime.
    #[error("PWM write not supported by driver: {path}")]
    WriteUnsupported {
        path: PathBuf,
    },

    /// EPERM/EACCES/EROFS. Reported, but the output stays writable.
    #[error("Permission denied writing {path}: {reason}")]
    WritePermission {
        path: PathBuf,
        reason: String,
    },

    #[error("Failed to write PWM to {path}: {reason}")]
    PwmWrite {
        path: PathBuf,
        reason: String,
    },

    #[error("Failed to write enable mode to {path}: {reason}")]
    EnableWrite {
        path: PathBuf,
        reason: String,
    },

    #[error("Output {0} is read-only")]
    ReadOnly(String),

    #[error("No spin detected on {output} (tach missing or fan stopped)")]
    NoSpinDetected {
        output: String,
    },

    // ============================================================================
    // Configuration and Validation Errors
    // ============================================================================
    #[error("Failed to parse JSON: {0}")]
    JsonParse(#[from] serde_json::Error),

    #[error("Invalid configuration value for {field}: {reason}")]
    InvalidConfig {
        field: String,
        reason: String,
    },

    #[error("Invalid percentage: {value} (must be 0.0-100.0)")]
    InvalidPercentage {
        value: f32,
    },

    #[error("Curve validation failed: {0}")]
    InvalidCurve(String),
}

impl LfcError {
    /// Create an invalid config error
    pub fn invalid_config(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidConfig {
            field: field.into(),
            reason: reason.into(),
        }
    }

    /// True for the failure that permanently downgrades an output
    pub fn is_unsupported(&self) -> bool {
        matches!(self, Self::WriteUnsupported { .. })
    }

    /// True for permission / read-only filesystem failures
    pub fn is_permission(&self) -> bool {
        matches!(self, Self::WritePermission { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_write_kind_predicates() {
        let unsupported = LfcError::WriteUnsupported { path: PathBuf::from("/x/pwm1") };
        assert!(unsupported.is_unsupported());
        assert!(!unsupported.is_permission());

        let denied = LfcError::WritePermission {
            path: PathBuf::from("/x/pwm1"),
            reason: "EACCES".into(),
        };
        assert!(denied.is_permission());
        assert!(!denied.is_unsupported());
    }

    #[test]
    fn test_display_includes_field() {
        let err = LfcError::invalid_config("step_percent", "must be > 0");
        assert_eq!(
            err.to_string(),
            "Invalid configuration value for step_percent: must be > 0"
        );
    }
}
