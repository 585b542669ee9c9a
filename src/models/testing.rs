//! Stub predictors for tests

use crate::models::package::{AnomalyScorer, Classifier, FeatureSchema, Regressor};

/// Predictor returning a constant.
pub struct Fixed(pub f64);

impl Classifier for Fixed {
    fn predict_proba(&self, _input: &[f32]) -> anyhow::Result<f64> {
        Ok(self.0)
    }
}

impl Regressor for Fixed {
    fn predict(&self, _input: &[f32]) -> anyhow::Result<f64> {
        Ok(self.0)
    }
}

impl AnomalyScorer for Fixed {
    fn score_samples(&self, _input: &[f32]) -> anyhow::Result<f64> {
        Ok(self.0)
    }
}

/// Classifier reading its probability straight from the first input.
pub struct Echo;

impl Classifier for Echo {
    fn predict_proba(&self, input: &[f32]) -> anyhow::Result<f64> {
        Ok(input.first().copied().unwrap_or(0.0) as f64)
    }
}

impl Regressor for Echo {
    fn predict(&self, input: &[f32]) -> anyhow::Result<f64> {
        Ok(input.first().copied().unwrap_or(0.0) as f64)
    }
}

pub struct Failing;

impl Classifier for Failing {
    fn predict_proba(&self, _input: &[f32]) -> anyhow::Result<f64> {
        anyhow::bail!("session unavailable")
    }
}

/// Regressor that panics when its first input exceeds the limit and
/// echoes it otherwise.
pub struct PanicsAbove(pub f32);

impl Regressor for PanicsAbove {
    fn predict(&self, input: &[f32]) -> anyhow::Result<f64> {
        let value = input.first().copied().unwrap_or(0.0);
        if value > self.0 {
            panic!("regressor blew up on input {}", value);
        }
        Ok(value as f64)
    }
}

pub fn schema(names: &[&str]) -> FeatureSchema {
    FeatureSchema::new(names.iter().map(|n| n.to_string()).collect())
}
