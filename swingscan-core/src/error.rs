//! Detection errors.

use thiserror::Error;

use crate::params::ParamError;

/// Per-invocation failures of the detection pipeline.
///
/// `InsufficientData` and ordering failures are scoped to one symbol;
/// `InvalidParameter` is fatal for the whole invocation.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum DetectionError {
    #[error("insufficient data: need at least {required} bars, have {available}")]
    InsufficientData { required: usize, available: usize },

    #[error("invalid parameter: {0}")]
    InvalidParameter(#[from] ParamError),

    #[error("bar timestamps not strictly increasing at index {index}")]
    Unordered { index: usize },
}
