//! Error types for item construction, evaluation, and buffer setup.
//!
//! Generation failures have no variant here: the generation port reports
//! them as `GenerateOutcome { ok: false, .. }` and the prefetch buffer treats
//! them as "no candidate this attempt".

use thiserror::Error;

/// Errors raised by the item registry and the item types it dispatches to.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ItemError {
    /// No constructor/evaluator is registered for this type.
    #[error("unsupported practice item type \"{item_type}\" (supported: {})", format_supported(.supported))]
    UnknownType {
        item_type: String,
        supported: Vec<String>,
    },

    /// Raw data failed validation for its type.
    #[error("malformed {item_type} item: {field}: {reason}")]
    MalformedItem {
        item_type: String,
        field: String,
        reason: String,
    },

    /// The submission does not have the shape the item's type expects.
    #[error("invalid submission for {item_type}: {reason}")]
    InvalidSubmission { item_type: String, reason: String },

    /// An evaluator received an item whose payload belongs to another type.
    #[error("payload mismatch: evaluator for {expected} got a {actual} payload")]
    PayloadMismatch { expected: String, actual: String },
}

fn format_supported(supported: &[String]) -> String {
    if supported.is_empty() {
        "(none)".to_string()
    } else {
        supported.join(", ")
    }
}

impl ItemError {
    /// Create a malformed-item error citing `field`.
    pub fn malformed(
        item_type: impl Into<String>,
        field: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self::MalformedItem {
            item_type: item_type.into(),
            field: field.into(),
            reason: reason.into(),
        }
    }

    /// Create an invalid-submission error.
    pub fn invalid_submission(item_type: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidSubmission {
            item_type: item_type.into(),
            reason: reason.into(),
        }
    }

    /// The field a malformed-item error points at, if any.
    pub fn field(&self) -> Option<&str> {
        match self {
            ItemError::MalformedItem { field, .. } => Some(field),
            _ => None,
        }
    }
}

/// A specialized Result type for registry operations.
pub type Result<T> = std::result::Result<T, ItemError>;

/// Invalid prefetch buffer configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BufferConfigError {
    #[error("batch_size must be at least 1")]
    ZeroBatchSize,

    #[error("low_watermark ({low_watermark}) must be below target_level ({target_level})")]
    WatermarkNotBelowTarget {
        low_watermark: usize,
        target_level: usize,
    },

    #[error("max_attempts must be at least 1")]
    ZeroMaxAttempts,
}
