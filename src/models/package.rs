//! Model packages: an opaque predictor plus the input contract it was
//! trained with.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Binary classifier returning the positive-class probability.
pub trait Classifier: Send + Sync {
    fn predict_proba(&self, input: &[f32]) -> anyhow::Result<f64>;
}

/// Regressor returning a single real value.
pub trait Regressor: Send + Sync {
    fn predict(&self, input: &[f32]) -> anyhow::Result<f64>;
}

/// Outlier scorer. Lower scores are more anomalous.
pub trait AnomalyScorer: Send + Sync {
    fn score_samples(&self, input: &[f32]) -> anyhow::Result<f64>;
}

/// Kind of predictor inside a package
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModelKind {
    Classifier,
    Regressor,
    AnomalyScorer,
}

/// Fitted standard scaler: `(x - mean) / scale`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StandardScaler {
    pub mean: Vec<f64>,
    pub scale: Vec<f64>,
}

impl StandardScaler {
    pub fn dimension(&self) -> usize {
        self.mean.len()
    }

    /// Scale in place. Callers check the dimension first.
    pub fn transform(&self, input: &mut [f64]) {
        for ((x, mean), scale) in input.iter_mut().zip(&self.mean).zip(&self.scale) {
            // Zero-variance columns keep their centered value
            let scale = if *scale == 0.0 { 1.0 } else { *scale };
            *x = (*x - mean) / scale;
        }
    }
}

/// Ordered input features and optional scaler shared by every package kind
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureSchema {
    pub feature_names: Vec<String>,
    #[serde(default)]
    pub scaler: Option<StandardScaler>,
}

impl FeatureSchema {
    pub fn new(feature_names: Vec<String>) -> Self {
        Self {
            feature_names,
            scaler: None,
        }
    }

    pub fn with_scaler(mut self, scaler: StandardScaler) -> Self {
        self.scaler = Some(scaler);
        self
    }
}

/// A loaded model, immutable after construction.
pub enum ModelPackage {
    Classifier {
        model: Box<dyn Classifier>,
        schema: FeatureSchema,
    },
    Regressor {
        model: Box<dyn Regressor>,
        schema: FeatureSchema,
    },
    AnomalyScorer {
        model: Box<dyn AnomalyScorer>,
        schema: FeatureSchema,
    },
}

impl ModelPackage {
    pub fn classifier(model: impl Classifier + 'static, schema: FeatureSchema) -> Self {
        ModelPackage::Classifier {
            model: Box::new(model),
            schema,
        }
    }

    pub fn regressor(model: impl Regressor + 'static, schema: FeatureSchema) -> Self {
        ModelPackage::Regressor {
            model: Box::new(model),
            schema,
        }
    }

    pub fn anomaly_scorer(model: impl AnomalyScorer + 'static, schema: FeatureSchema) -> Self {
        ModelPackage::AnomalyScorer {
            model: Box::new(model),
            schema,
        }
    }

    pub fn kind(&self) -> ModelKind {
        match self {
            ModelPackage::Classifier { .. } => ModelKind::Classifier,
            ModelPackage::Regressor { .. } => ModelKind::Regressor,
            ModelPackage::AnomalyScorer { .. } => ModelKind::AnomalyScorer,
        }
    }

    pub fn schema(&self) -> &FeatureSchema {
        match self {
            ModelPackage::Classifier { schema, .. }
            | ModelPackage::Regressor { schema, .. }
            | ModelPackage::AnomalyScorer { schema, .. } => schema,
        }
    }
}

impl fmt::Debug for ModelPackage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModelPackage")
            .field("kind", &self.kind())
            .field("schema", self.schema())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Constant(f64);

    impl Classifier for Constant {
        fn predict_proba(&self, _input: &[f32]) -> anyhow::Result<f64> {
            Ok(self.0)
        }
    }

    #[test]
    fn test_scaler_transform() {
        let scaler = StandardScaler {
            mean: vec![10.0, 5.0, 1.0],
            scale: vec![2.0, 0.0, 0.5],
        };
        let mut input = vec![14.0, 7.0, 2.0];
        scaler.transform(&mut input);
        assert_eq!(input, vec![2.0, 2.0, 2.0]);
    }

    #[test]
    fn test_package_kind_and_schema() {
        let schema = FeatureSchema::new(vec!["a".to_string(), "b".to_string()]);
        let package = ModelPackage::classifier(Constant(0.3), schema.clone());
        assert_eq!(package.kind(), ModelKind::Classifier);
        assert_eq!(package.schema(), &schema);
        assert!(format!("{:?}", package).contains("Classifier"));
    }

    #[test]
    fn test_schema_manifest_format() {
        let schema: FeatureSchema = serde_json::from_str(
            r#"{"feature_names": ["dti", "int_rate"], "scaler": {"mean": [20.0, 12.0], "scale": [5.0, 3.0]}}"#,
        )
        .unwrap();
        assert_eq!(schema.feature_names.len(), 2);
        assert_eq!(schema.scaler.map(|s| s.dimension()), Some(2));
    }
}
