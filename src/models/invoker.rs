//! Model invocation: feature ordering, scaling and output normalization

use crate::error::{RiskError, RiskResult};
use crate::models::package::{FeatureSchema, ModelPackage};
use crate::models::registry::ModelRegistry;
use crate::types::{FeatureMap, ModelKey};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Normalized output of one predictor, before fusion
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RawScore {
    /// Classifier positive-class probability in `[0, 1]`
    Probability { probability: f64 },
    /// Regression output, clamped to be non-negative
    Value { value: f64 },
    /// Raw anomaly score and the fraud score (0-100) derived from it
    Anomaly { anomaly: f64, fraud_score: f64 },
}

/// Affine map from anomaly score to a 0-100 fraud score:
/// `clip(100 * (1 - (anomaly - center) / width), 0, 100)`.
///
/// Scores outside `[center, center + width]` saturate.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AnomalyTransform {
    pub center: f64,
    pub width: f64,
}

impl AnomalyTransform {
    pub fn fraud_score(&self, anomaly: f64) -> f64 {
        (100.0 * (1.0 - (anomaly - self.center) / self.width)).clamp(0.0, 100.0)
    }
}

impl Default for AnomalyTransform {
    fn default() -> Self {
        Self {
            center: -0.5,
            width: 0.5,
        }
    }
}

/// Runs packages against feature maps and normalizes their outputs.
#[derive(Debug, Clone, Default)]
pub struct ModelInvoker {
    transform: AnomalyTransform,
}

impl ModelInvoker {
    pub fn new(transform: AnomalyTransform) -> Self {
        Self { transform }
    }

    /// Look up `key` in the registry and score it.
    pub fn score_key(
        &self,
        registry: &ModelRegistry,
        key: ModelKey,
        features: &FeatureMap,
    ) -> RiskResult<RawScore> {
        let package = registry.get(key)?;
        self.score(key, package, features)
    }

    /// Score one package.
    ///
    /// Features missing from `features` are fed as 0.
    pub fn score(
        &self,
        key: ModelKey,
        package: &ModelPackage,
        features: &FeatureMap,
    ) -> RiskResult<RawScore> {
        let input = build_input(key, package.schema(), features)?;

        let prediction_error = |e: anyhow::Error| RiskError::Prediction {
            model: key,
            reason: format!("{:#}", e),
        };

        let score = match package {
            ModelPackage::Classifier { model, .. } => {
                let probability = finite(key, model.predict_proba(&input).map_err(prediction_error)?)?;
                RawScore::Probability {
                    probability: probability.clamp(0.0, 1.0),
                }
            }
            ModelPackage::Regressor { model, .. } => {
                let value = finite(key, model.predict(&input).map_err(prediction_error)?)?;
                // Predicted days cannot be negative
                RawScore::Value {
                    value: value.max(0.0),
                }
            }
            ModelPackage::AnomalyScorer { model, .. } => {
                let anomaly = finite(key, model.score_samples(&input).map_err(prediction_error)?)?;
                RawScore::Anomaly {
                    anomaly,
                    fraud_score: self.transform.fraud_score(anomaly),
                }
            }
        };

        debug!(model = %key, score = ?score, "Model scored");
        Ok(score)
    }
}

/// Input vector in schema order, scaled when the package carries a scaler.
fn build_input(key: ModelKey, schema: &FeatureSchema, features: &FeatureMap) -> RiskResult<Vec<f32>> {
    let mut values = Vec::with_capacity(schema.feature_names.len());

    for name in &schema.feature_names {
        let value = features.get(name).copied().unwrap_or(0.0);
        if !value.is_finite() {
            return Err(RiskError::InputShape {
                model: key,
                reason: format!("feature `{}` is not finite ({})", name, value),
            });
        }
        values.push(value);
    }

    if let Some(scaler) = &schema.scaler {
        if scaler.dimension() != values.len() || scaler.scale.len() != values.len() {
            return Err(RiskError::InputShape {
                model: key,
                reason: format!(
                    "scaler expects {} features, schema has {}",
                    scaler.dimension(),
                    values.len()
                ),
            });
        }
        scaler.transform(&mut values);
    }

    Ok(values.into_iter().map(|v| v as f32).collect())
}

fn finite(key: ModelKey, value: f64) -> RiskResult<f64> {
    if value.is_finite() {
        Ok(value)
    } else {
        Err(RiskError::Prediction {
            model: key,
            reason: format!("predictor returned {}", value),
        })
    }
}
