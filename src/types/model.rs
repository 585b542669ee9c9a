//! Model keys and the assessment families they belong to

use serde::{Deserialize, Serialize};
use std::fmt;

/// Assessment family. Each family owns a fixed set of model keys and a
/// fusion policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModelFamily {
    /// Payment-delay prediction for trading parties
    #[serde(alias = "synthetic_ai")]
    PaymentDelay,
    /// Loan application risk assessment
    #[serde(alias = "lending_club")]
    Loan,
}

impl ModelFamily {
    pub fn keys(&self) -> &'static [ModelKey] {
        match self {
            ModelFamily::PaymentDelay => &[ModelKey::DelayProbability, ModelKey::DelayDays],
            ModelFamily::Loan => &[
                ModelKey::Acceptance,
                ModelKey::Default,
                ModelKey::Delay,
                ModelKey::Fraud,
            ],
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ModelFamily::PaymentDelay => "payment_delay",
            ModelFamily::Loan => "loan",
        }
    }
}

impl fmt::Display for ModelFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Identifier of a single pre-trained model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModelKey {
    DelayProbability,
    DelayDays,
    Acceptance,
    Default,
    Delay,
    Fraud,
}

impl ModelKey {
    pub fn as_str(&self) -> &'static str {
        match self {
            ModelKey::DelayProbability => "delay_probability",
            ModelKey::DelayDays => "delay_days",
            ModelKey::Acceptance => "acceptance",
            ModelKey::Default => "default",
            ModelKey::Delay => "delay",
            ModelKey::Fraud => "fraud",
        }
    }

    pub fn family(&self) -> ModelFamily {
        match self {
            ModelKey::DelayProbability | ModelKey::DelayDays => ModelFamily::PaymentDelay,
            _ => ModelFamily::Loan,
        }
    }
}

impl fmt::Display for ModelKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_family_keys_round_trip() {
        for family in [ModelFamily::PaymentDelay, ModelFamily::Loan] {
            for key in family.keys() {
                assert_eq!(key.family(), family);
            }
        }
    }

    #[test]
    fn test_family_aliases() {
        let family: ModelFamily = serde_json::from_str("\"lending_club\"").unwrap();
        assert_eq!(family, ModelFamily::Loan);
        let family: ModelFamily = serde_json::from_str("\"synthetic_ai\"").unwrap();
        assert_eq!(family, ModelFamily::PaymentDelay);
        let family: ModelFamily = serde_json::from_str("\"payment_delay\"").unwrap();
        assert_eq!(family, ModelFamily::PaymentDelay);
    }

    #[test]
    fn test_key_serialization_matches_display() {
        let json = serde_json::to_string(&ModelKey::DelayProbability).unwrap();
        assert_eq!(json, format!("\"{}\"", ModelKey::DelayProbability));
    }
}
