//! Assessment request/response messages exchanged with the service

use crate::serde_utils::lenient_feature_map;
use crate::types::{FeatureMap, ModelFamily, RiskVerdict};
use serde::{Deserialize, Serialize};

/// Request to score one entity or application
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssessmentRequest {
    /// Caller-supplied correlation id; generated when absent
    #[serde(default)]
    pub request_id: Option<String>,

    /// Which model family to run
    pub model_type: ModelFamily,

    #[serde(default)]
    pub entity_id: Option<String>,

    /// Model input features by name
    #[serde(default, deserialize_with = "lenient_feature_map")]
    pub input_data: FeatureMap,
}

impl AssessmentRequest {
    pub fn new(model_type: ModelFamily, input_data: FeatureMap) -> Self {
        Self {
            request_id: None,
            model_type,
            entity_id: None,
            input_data,
        }
    }

    pub fn with_request_id(mut self, request_id: impl Into<String>) -> Self {
        self.request_id = Some(request_id.into());
        self
    }
}

/// Reply to an [`AssessmentRequest`]. Exactly one of `verdict` and `error`
/// is set.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssessmentResponse {
    pub request_id: String,
    /// Absent when the request itself could not be decoded
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model_type: Option<ModelFamily>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub verdict: Option<RiskVerdict>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl AssessmentResponse {
    pub fn verdict(request_id: String, model_type: ModelFamily, verdict: RiskVerdict) -> Self {
        Self {
            request_id,
            model_type: Some(model_type),
            verdict: Some(verdict),
            error: None,
        }
    }

    pub fn error(request_id: String, model_type: ModelFamily, error: impl Into<String>) -> Self {
        Self {
            request_id,
            model_type: Some(model_type),
            verdict: None,
            error: Some(error.into()),
        }
    }

    /// Reply to a payload that is not a valid request
    pub fn rejected(request_id: String, error: impl Into<String>) -> Self {
        Self {
            request_id,
            model_type: None,
            verdict: None,
            error: Some(error.into()),
        }
    }
}
