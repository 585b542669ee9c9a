//! Per-request risk assessment over the model registry

use crate::config::AppConfig;
use crate::error::{RiskError, RiskResult};
use crate::models::fusion::{FusionConfig, RiskFusionEngine};
use crate::models::invoker::{ModelInvoker, RawScore};
use crate::models::loader::ModelLoader;
use crate::models::package::ModelKind;
use crate::models::registry::ModelRegistry;
use crate::types::{FeatureMap, ModelFamily, ModelKey, RiskVerdict};
use anyhow::Result;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Outcome of one assessment
#[derive(Debug, Clone)]
pub enum Assessment {
    Verdict(RiskVerdict),
    /// No model of the family produced a score
    NoVerdict { family: ModelFamily, reason: String },
}

impl Assessment {
    pub fn verdict(&self) -> Option<&RiskVerdict> {
        match self {
            Assessment::Verdict(verdict) => Some(verdict),
            Assessment::NoVerdict { .. } => None,
        }
    }

    pub fn into_verdict(self) -> Option<RiskVerdict> {
        match self {
            Assessment::Verdict(verdict) => Some(verdict),
            Assessment::NoVerdict { .. } => None,
        }
    }
}

/// Input contract of one model key
#[derive(Debug, Clone, Serialize)]
pub struct ModelInfo {
    pub key: ModelKey,
    pub loaded: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kind: Option<ModelKind>,
    pub feature_names: Vec<String>,
}

/// Loaded model counts per family
#[derive(Debug, Clone, Serialize)]
pub struct HealthReport {
    pub status: &'static str,
    pub payment_models: usize,
    pub loan_models: usize,
}

/// Scores a feature map with every model of a family and fuses the results.
pub struct RiskEngine {
    registry: Arc<ModelRegistry>,
    invoker: ModelInvoker,
    fusion: RiskFusionEngine,
}

impl RiskEngine {
    pub fn new(registry: Arc<ModelRegistry>, fusion: FusionConfig) -> Self {
        Self {
            invoker: ModelInvoker::new(fusion.anomaly),
            fusion: RiskFusionEngine::new(fusion),
            registry,
        }
    }

    /// Load models from the configured directories
    pub fn from_config(config: &AppConfig) -> Result<Self> {
        let loader = ModelLoader::with_threads(config.models.onnx_threads)?;
        let registry = Arc::new(loader.load_registry(&config.models));

        info!(
            models = registry.len(),
            payment = ?registry.loaded_keys(ModelFamily::PaymentDelay),
            loan = ?registry.loaded_keys(ModelFamily::Loan),
            "Risk engine initialized"
        );

        Ok(Self::new(registry, config.fusion.clone()))
    }

    pub fn registry(&self) -> &ModelRegistry {
        &self.registry
    }

    pub fn fusion(&self) -> &RiskFusionEngine {
        &self.fusion
    }

    /// Get the number of loaded models
    pub fn model_count(&self) -> usize {
        self.registry.len()
    }

    pub fn assess(&self, family: ModelFamily, features: &FeatureMap) -> RiskResult<Assessment> {
        let scores = self.collect_scores(family, features)?;

        if scores.is_empty() {
            let reason = format!("no verdict available: no {} model produced a score", family);
            debug!(family = %family, "{}", reason);
            return Ok(Assessment::NoVerdict { family, reason });
        }

        let verdict = match family {
            ModelFamily::PaymentDelay => self.fusion.fuse_payment(&scores),
            ModelFamily::Loan => self.fusion.fuse_loan(&scores),
        };

        debug!(
            family = %family,
            components = scores.len(),
            composite_score = verdict.composite_score,
            tier = %verdict.composite_tier,
            "Assessment complete"
        );

        Ok(Assessment::Verdict(verdict))
    }

    /// Payment-delay assessment (single-signal policy)
    pub fn assess_payment(&self, features: &FeatureMap) -> RiskResult<Assessment> {
        self.assess(ModelFamily::PaymentDelay, features)
    }

    /// Loan assessment (multi-signal policy)
    pub fn assess_loan(&self, features: &FeatureMap) -> RiskResult<Assessment> {
        self.assess(ModelFamily::Loan, features)
    }

    /// Score every key of the family.
    ///
    /// Unavailable or failing models are left out; an input shape error
    /// fails the whole assessment.
    fn collect_scores(
        &self,
        family: ModelFamily,
        features: &FeatureMap,
    ) -> RiskResult<HashMap<ModelKey, RawScore>> {
        let mut scores = HashMap::new();

        for &key in family.keys() {
            match self.invoker.score_key(&self.registry, key, features) {
                Ok(score) => {
                    scores.insert(key, score);
                }
                Err(RiskError::ModelUnavailable(_)) => {
                    debug!(model = %key, "Model not loaded, skipping component");
                }
                Err(e) if e.is_component_local() => {
                    warn!(model = %key, error = %e, "Model inference failed, skipping component");
                }
                Err(e) => return Err(e),
            }
        }

        Ok(scores)
    }

    /// Required features of each model in the family
    pub fn model_info(&self, family: ModelFamily) -> Vec<ModelInfo> {
        family
            .keys()
            .iter()
            .map(|&key| match self.registry.get(key) {
                Ok(package) => ModelInfo {
                    key,
                    loaded: true,
                    kind: Some(package.kind()),
                    feature_names: package.schema().feature_names.clone(),
                },
                Err(_) => ModelInfo {
                    key,
                    loaded: false,
                    kind: None,
                    feature_names: Vec::new(),
                },
            })
            .collect()
    }

    pub fn health(&self) -> HealthReport {
        let payment_models = self.registry.loaded_keys(ModelFamily::PaymentDelay).len();
        let loan_models = self.registry.loaded_keys(ModelFamily::Loan).len();

        HealthReport {
            status: if payment_models + loan_models > 0 {
                "healthy"
            } else {
                "degraded"
            },
            payment_models,
            loan_models,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::fusion::REJECT_ACCEPTANCE;
    use crate::models::package::{FeatureSchema, ModelPackage};
    use crate::models::testing::{self, Failing, Fixed};
    use crate::types::RiskTier;

    fn schema() -> FeatureSchema {
        testing::schema(&["x"])
    }

    fn engine(registry: ModelRegistry) -> RiskEngine {
        RiskEngine::new(Arc::new(registry), FusionConfig::default())
    }

    #[test]
    fn test_payment_assessment() {
        let engine = engine(
            ModelRegistry::builder()
                .with(ModelKey::DelayProbability, ModelPackage::classifier(Fixed(0.8), schema()))
                .with(ModelKey::DelayDays, ModelPackage::regressor(Fixed(100.0), schema()))
                .build(),
        );

        let verdict = engine
            .assess_payment(&FeatureMap::new())
            .unwrap()
            .into_verdict()
            .unwrap();
        assert!((verdict.composite_score - 88.0).abs() < 1e-9);
        assert_eq!(verdict.composite_tier, RiskTier::Critical);
    }

    #[test]
    fn test_loan_assessment_with_fraud_model_missing() {
        let engine = engine(
            ModelRegistry::builder()
                .with(ModelKey::Acceptance, ModelPackage::classifier(Fixed(0.3), schema()))
                .with(ModelKey::Default, ModelPackage::classifier(Fixed(0.10), schema()))
                .with(ModelKey::Delay, ModelPackage::classifier(Fixed(0.05), schema()))
                .build(),
        );

        let verdict = engine
            .assess_loan(&FeatureMap::new())
            .unwrap()
            .into_verdict()
            .unwrap();
        assert!((verdict.composite_score - 5.5).abs() < 1e-9);
        assert_eq!(verdict.composite_tier, RiskTier::Low);
        assert_eq!(verdict.recommendation, REJECT_ACCEPTANCE);
        assert!(!verdict.components.contains_key(&ModelKey::Fraud));
    }

    #[test]
    fn test_anomaly_scorer_feeds_fraud_component() {
        let engine = engine(
            ModelRegistry::builder()
                .with(ModelKey::Fraud, ModelPackage::anomaly_scorer(Fixed(-0.5), schema()))
                .build(),
        );

        let verdict = engine
            .assess_loan(&FeatureMap::new())
            .unwrap()
            .into_verdict()
            .unwrap();
        assert!((verdict.composite_score - 30.0).abs() < 1e-9);
        assert_eq!(verdict.composite_tier, RiskTier::Medium);
    }

    #[test]
    fn test_no_models_yields_no_verdict() {
        let engine = engine(ModelRegistry::empty());

        match engine.assess_loan(&FeatureMap::new()).unwrap() {
            Assessment::NoVerdict { family, reason } => {
                assert_eq!(family, ModelFamily::Loan);
                assert!(reason.contains("no verdict available"));
            }
            other => panic!("expected no verdict, got {:?}", other),
        }
        assert_eq!(engine.health().status, "degraded");
    }

    #[test]
    fn test_failing_model_degrades_component() {
        let engine = engine(
            ModelRegistry::builder()
                .with(ModelKey::Default, ModelPackage::classifier(Failing, schema()))
                .with(ModelKey::Delay, ModelPackage::classifier(Fixed(0.5), schema()))
                .build(),
        );

        let verdict = engine
            .assess_loan(&FeatureMap::new())
            .unwrap()
            .into_verdict()
            .unwrap();
        assert!((verdict.composite_score - 15.0).abs() < 1e-9);
        assert!(!verdict.components.contains_key(&ModelKey::Default));
    }

    #[test]
    fn test_input_shape_error_fails_assessment() {
        let engine = engine(
            ModelRegistry::builder()
                .with(ModelKey::DelayProbability, ModelPackage::classifier(Fixed(0.5), schema()))
                .build(),
        );

        let features = FeatureMap::from([("x".to_string(), f64::NAN)]);
        let err = engine.assess_payment(&features).unwrap_err();
        assert!(matches!(err, RiskError::InputShape { .. }));
    }

    #[test]
    fn test_model_info_and_health() {
        let engine = engine(
            ModelRegistry::builder()
                .with(ModelKey::DelayDays, ModelPackage::regressor(Fixed(1.0), schema()))
                .build(),
        );

        let info = engine.model_info(ModelFamily::PaymentDelay);
        assert_eq!(info.len(), 2);
        assert!(!info[0].loaded);
        assert_eq!(info[1].key, ModelKey::DelayDays);
        assert_eq!(info[1].kind, Some(ModelKind::Regressor));
        assert_eq!(info[1].feature_names, vec!["x"]);

        let health = engine.health();
        assert_eq!(health.status, "healthy");
        assert_eq!(health.payment_models, 1);
        assert_eq!(health.loan_models, 0);
    }
}
