//! Error taxonomy for the risk pipeline core.
//!
//! None of these are fatal to the process. Each variant documents how far it
//! propagates: a record, a model component, or a single entity row.

use crate::types::ModelKey;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum RiskError {
    /// Requested model key was never loaded. The component is skipped.
    #[error("model `{0}` is not loaded")]
    ModelUnavailable(ModelKey),

    /// A record lacks a field needed for grouping. The record is excluded.
    #[error("malformed record at index {index}: {reason}")]
    MalformedRecord { index: usize, reason: String },

    /// Features cannot be coerced into the predictor's input vector.
    /// Fails the entity being scored.
    #[error("input shape error for model `{model}`: {reason}")]
    InputShape { model: ModelKey, reason: String },

    /// The predictor itself failed at runtime. The component degrades.
    #[error("prediction failed for model `{model}`: {reason}")]
    Prediction { model: ModelKey, reason: String },
}

impl RiskError {
    /// Whether the error only removes one component from a verdict.
    pub fn is_component_local(&self) -> bool {
        matches!(
            self,
            RiskError::ModelUnavailable(_) | RiskError::Prediction { .. }
        )
    }
}

pub type RiskResult<T> = Result<T, RiskError>;
