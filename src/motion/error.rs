//! Error kinds raised by the motion-parameter transforms.
//!
//! The transforms are pure: the same input always fails the same way, so
//! callers report these to the user instead of retrying.

use thiserror::Error;

/// Failure of a forward or reverse transform.
#[derive(Error, Debug)]
pub enum TransformError {
    /// A between-frame sequence does not have `frames - 1` elements
    /// (or a per-frame sequence does not have `frames` elements).
    #[error("Malformed input: `{field}` has {actual} elements, expected {expected}")]
    MalformedInput {
        field: &'static str,
        expected: usize,
        actual: usize,
    },

    /// A value lies outside the range its field allows
    #[error("Value out of range in `{field}`: {value}")]
    OutOfRange { field: &'static str, value: f64 },

    /// `Unknown` has no (stride, overlap) pair to map to
    #[error("Unsupported motion context: {0}")]
    UnsupportedMotionContext(String),

    /// A frame with zero strength carries an adjusted neighbour value
    #[error("Degenerate strength at frame {frame}: middle value is zero")]
    DegenerateStrength { frame: usize },

    /// A formatted prompt/motion string or serialized tuple list could not be parsed
    #[error("Malformed formatted string in `{field}`: {reason}")]
    MalformedFormattedString { field: String, reason: String },

    /// A value that must be numeric is not
    #[error("Type coercion error in `{field}`: {value:?} is not a number")]
    TypeCoercionError { field: String, value: String },

    /// Inference-log `input_params` is not valid JSON
    #[error("Invalid inference log: {0}")]
    InvalidLog(#[from] serde_json::Error),
}

impl TransformError {
    pub(crate) fn coercion(field: &str, value: impl ToString) -> Self {
        TransformError::TypeCoercionError {
            field: field.to_string(),
            value: value.to_string(),
        }
    }

    pub(crate) fn malformed(field: &str, reason: impl Into<String>) -> Self {
        TransformError::MalformedFormattedString {
            field: field.to_string(),
            reason: reason.into(),
        }
    }
}

pub type TransformResult<T> = Result<T, TransformError>;
