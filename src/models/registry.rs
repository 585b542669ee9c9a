//! Immutable model registry built once at startup

use crate::error::{RiskError, RiskResult};
use crate::models::package::ModelPackage;
use crate::types::{ModelFamily, ModelKey};
use std::collections::HashMap;

/// Loaded model packages by key.
///
/// Built once, then shared read-only (typically behind an `Arc`). There is
/// no way to insert after [`ModelRegistryBuilder::build`].
#[derive(Debug, Default)]
pub struct ModelRegistry {
    packages: HashMap<ModelKey, ModelPackage>,
}

impl ModelRegistry {
    pub fn builder() -> ModelRegistryBuilder {
        ModelRegistryBuilder::default()
    }

    /// Registry with no models; every lookup fails with `ModelUnavailable`.
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn get(&self, key: ModelKey) -> RiskResult<&ModelPackage> {
        self.packages
            .get(&key)
            .ok_or(RiskError::ModelUnavailable(key))
    }

    pub fn contains(&self, key: ModelKey) -> bool {
        self.packages.contains_key(&key)
    }

    pub fn len(&self) -> usize {
        self.packages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.packages.is_empty()
    }

    /// Loaded keys of a family, in the family's canonical order
    pub fn loaded_keys(&self, family: ModelFamily) -> Vec<ModelKey> {
        family
            .keys()
            .iter()
            .copied()
            .filter(|key| self.contains(*key))
            .collect()
    }
}

#[derive(Default)]
pub struct ModelRegistryBuilder {
    packages: HashMap<ModelKey, ModelPackage>,
}

impl ModelRegistryBuilder {
    pub fn insert(&mut self, key: ModelKey, package: ModelPackage) -> &mut Self {
        self.packages.insert(key, package);
        self
    }

    pub fn with(mut self, key: ModelKey, package: ModelPackage) -> Self {
        self.insert(key, package);
        self
    }

    pub fn build(self) -> ModelRegistry {
        ModelRegistry {
            packages: self.packages,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::package::{FeatureSchema, Regressor};

    struct Zero;

    impl Regressor for Zero {
        fn predict(&self, _input: &[f32]) -> anyhow::Result<f64> {
            Ok(0.0)
        }
    }

    #[test]
    fn test_missing_key_is_unavailable() {
        let registry = ModelRegistry::empty();
        assert!(registry.is_empty());
        assert_eq!(
            registry.get(ModelKey::Fraud).unwrap_err(),
            RiskError::ModelUnavailable(ModelKey::Fraud)
        );
    }

    #[test]
    fn test_loaded_keys_by_family() {
        let registry = ModelRegistry::builder()
            .with(
                ModelKey::DelayDays,
                ModelPackage::regressor(Zero, FeatureSchema::new(vec![])),
            )
            .build();

        assert_eq!(registry.len(), 1);
        assert_eq!(
            registry.loaded_keys(ModelFamily::PaymentDelay),
            vec![ModelKey::DelayDays]
        );
        assert!(registry.loaded_keys(ModelFamily::Loan).is_empty());
    }
}
