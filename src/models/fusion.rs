//! Risk fusion: fixed-weight composite scoring and tiering

use crate::models::invoker::{AnomalyTransform, RawScore};
use crate::types::tier::{
    COMPOSITE_TIERS, DEFAULT_LEVELS, FRAUD_LEVELS, LOAN_DELAY_LEVELS, PAYMENT_DELAY_LEVELS,
};
use crate::types::{
    AcceptanceDecision, ComponentScore, ModelFamily, ModelKey, RiskTier, RiskVerdict,
};
use anyhow::ensure;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use tracing::warn;

/// Fraud score above which an application is flagged suspicious
pub const SUSPICIOUS_FRAUD_SCORE: f64 = 60.0;

/// Delay probability above which the payment policy reports `will_delay`
pub const WILL_DELAY_PROBABILITY: f64 = 0.5;

pub const REJECT_ACCEPTANCE: &str = "REJECT - Application does not meet acceptance criteria";
pub const REJECT_CRITICAL: &str = "REJECT - Critical risk level detected";
pub const REVIEW_HIGH: &str = "REVIEW - Consider additional verification or higher rates";
pub const APPROVE_MONITOR: &str = "APPROVE - Monitor closely during term";
pub const APPROVE_STANDARD: &str = "APPROVE - Standard terms apply";

/// Single-signal policy weights:
/// `probability_weight * p + days_weight * min(days / days_horizon, 1)`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaymentWeights {
    pub probability_weight: f64,
    pub days_weight: f64,
    pub days_horizon: f64,
}

impl Default for PaymentWeights {
    fn default() -> Self {
        Self {
            probability_weight: 60.0,
            days_weight: 40.0,
            days_horizon: 90.0,
        }
    }
}

/// Multi-signal composite weights. Never renormalized when a component is
/// missing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoanWeights {
    pub default: f64,
    pub delay: f64,
    pub fraud: f64,
}

impl Default for LoanWeights {
    fn default() -> Self {
        Self {
            default: 0.40,
            delay: 0.30,
            fraud: 0.30,
        }
    }
}

/// Fusion constants, loaded from the `[fusion]` config section
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct FusionConfig {
    #[serde(default)]
    pub payment: PaymentWeights,
    #[serde(default)]
    pub loan: LoanWeights,
    #[serde(default)]
    pub anomaly: AnomalyTransform,
}

impl FusionConfig {
    /// Reject constants that would make composite scores NaN or negative.
    pub fn validate(&self) -> anyhow::Result<()> {
        let weights = [
            ("payment.probability_weight", self.payment.probability_weight),
            ("payment.days_weight", self.payment.days_weight),
            ("loan.default", self.loan.default),
            ("loan.delay", self.loan.delay),
            ("loan.fraud", self.loan.fraud),
        ];
        for (name, weight) in weights {
            ensure!(
                weight.is_finite() && weight >= 0.0,
                "fusion weight {} must be finite and non-negative, got {}",
                name,
                weight
            );
        }

        ensure!(
            self.payment.days_horizon.is_finite() && self.payment.days_horizon > 0.0,
            "payment.days_horizon must be positive, got {}",
            self.payment.days_horizon
        );
        ensure!(
            self.anomaly.center.is_finite(),
            "anomaly.center must be finite, got {}",
            self.anomaly.center
        );
        ensure!(
            self.anomaly.width.is_finite() && self.anomaly.width > 0.0,
            "anomaly.width must be positive, got {}",
            self.anomaly.width
        );
        Ok(())
    }
}

/// Combines normalized model outputs into a verdict.
#[derive(Debug, Clone, Default)]
pub struct RiskFusionEngine {
    config: FusionConfig,
}

impl RiskFusionEngine {
    pub fn new(config: FusionConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &FusionConfig {
        &self.config
    }

    /// Fuse whatever components are present.
    ///
    /// Any loan-family score selects the loan policy, otherwise the payment
    /// policy is used. Missing components contribute 0.
    pub fn fuse(&self, scores: &HashMap<ModelKey, RawScore>) -> RiskVerdict {
        if scores.keys().any(|key| key.family() == ModelFamily::Loan) {
            self.fuse_loan(scores)
        } else {
            self.fuse_payment(scores)
        }
    }

    /// Single-signal policy (delay probability + predicted delay days)
    pub fn fuse_payment(&self, scores: &HashMap<ModelKey, RawScore>) -> RiskVerdict {
        let delay_probability = probability(scores, ModelKey::DelayProbability);
        let predicted_days = value(scores, ModelKey::DelayDays);

        let mut components = BTreeMap::new();
        if let Some(p) = delay_probability {
            components.insert(
                ModelKey::DelayProbability,
                ComponentScore::Probability {
                    probability: p,
                    level: PAYMENT_DELAY_LEVELS.classify(p),
                },
            );
        }
        if let Some(days) = predicted_days {
            components.insert(
                ModelKey::DelayDays,
                ComponentScore::DelayDays { days: round1(days) },
            );
        }

        let risk_score = self.payment_risk_score(
            delay_probability.unwrap_or(0.0),
            predicted_days.unwrap_or(0.0),
        );
        // Tier on the unrounded score; only the reported score is rounded
        let tier = COMPOSITE_TIERS.classify(risk_score);

        let verdict = RiskVerdict::new(
            ModelFamily::PaymentDelay,
            components,
            round1(risk_score),
            tier,
            payment_recommendation(tier),
        );

        match delay_probability {
            Some(p) => verdict.with_will_delay(p > WILL_DELAY_PROBABILITY),
            None => verdict,
        }
    }

    /// Multi-signal policy (acceptance, default, delay, fraud)
    pub fn fuse_loan(&self, scores: &HashMap<ModelKey, RawScore>) -> RiskVerdict {
        let acceptance = probability(scores, ModelKey::Acceptance).map(AcceptanceDecision::from_probability);
        let default_probability = probability(scores, ModelKey::Default);
        let delay_probability = probability(scores, ModelKey::Delay);
        let fraud_score = fraud(scores, ModelKey::Fraud);

        let mut components = BTreeMap::new();
        if let Some(decision) = acceptance {
            components.insert(ModelKey::Acceptance, ComponentScore::Acceptance(decision));
        }
        if let Some(p) = default_probability {
            components.insert(
                ModelKey::Default,
                ComponentScore::Probability {
                    probability: p,
                    level: DEFAULT_LEVELS.classify(p),
                },
            );
        }
        if let Some(p) = delay_probability {
            components.insert(
                ModelKey::Delay,
                ComponentScore::Probability {
                    probability: p,
                    level: LOAN_DELAY_LEVELS.classify(p),
                },
            );
        }
        if let Some(score) = fraud_score {
            components.insert(
                ModelKey::Fraud,
                ComponentScore::Fraud {
                    score,
                    level: FRAUD_LEVELS.classify(score),
                    suspicious: score > SUSPICIOUS_FRAUD_SCORE,
                },
            );
        }

        let composite = self.loan_composite_score(
            default_probability.unwrap_or(0.0),
            delay_probability.unwrap_or(0.0),
            fraud_score.unwrap_or(0.0),
        );
        let tier = COMPOSITE_TIERS.classify(composite);

        RiskVerdict::new(
            ModelFamily::Loan,
            components,
            round1(composite),
            tier,
            loan_recommendation(acceptance.as_ref(), tier),
        )
    }

    /// `60 * p + 40 * min(days / 90, 1)`, unrounded
    pub fn payment_risk_score(&self, delay_probability: f64, predicted_days: f64) -> f64 {
        let w = &self.config.payment;
        let days_factor = (predicted_days / w.days_horizon).min(1.0);
        w.probability_weight * delay_probability + w.days_weight * days_factor
    }

    /// `0.40 * default% + 0.30 * delay% + 0.30 * fraud_score`, unrounded.
    /// Probabilities are given in `[0, 1]`.
    pub fn loan_composite_score(
        &self,
        default_probability: f64,
        delay_probability: f64,
        fraud_score: f64,
    ) -> f64 {
        let w = &self.config.loan;
        w.default * default_probability * 100.0
            + w.delay * delay_probability * 100.0
            + w.fraud * fraud_score
    }
}

/// Recommendation for the payment policy
pub fn payment_recommendation(tier: RiskTier) -> &'static str {
    match tier {
        RiskTier::Critical => "HIGH RISK - Require advance payment or collateral",
        RiskTier::High => "ELEVATED RISK - Reduce credit terms, monitor closely",
        RiskTier::Medium => "MODERATE RISK - Standard terms with monitoring",
        RiskTier::Low => "LOW RISK - Proceed with normal credit terms",
    }
}

/// Recommendation for the loan policy.
///
/// Precedence: acceptance rejection, then composite tier.
pub fn loan_recommendation(acceptance: Option<&AcceptanceDecision>, tier: RiskTier) -> &'static str {
    if acceptance.is_some_and(|a| a.is_rejected()) {
        return REJECT_ACCEPTANCE;
    }

    match tier {
        RiskTier::Critical => REJECT_CRITICAL,
        RiskTier::High => REVIEW_HIGH,
        RiskTier::Medium => APPROVE_MONITOR,
        RiskTier::Low => APPROVE_STANDARD,
    }
}

fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

fn probability(scores: &HashMap<ModelKey, RawScore>, key: ModelKey) -> Option<f64> {
    match scores.get(&key)? {
        RawScore::Probability { probability } => Some(*probability),
        other => mismatched(key, other),
    }
}

fn value(scores: &HashMap<ModelKey, RawScore>, key: ModelKey) -> Option<f64> {
    match scores.get(&key)? {
        RawScore::Value { value } => Some(*value),
        other => mismatched(key, other),
    }
}

fn fraud(scores: &HashMap<ModelKey, RawScore>, key: ModelKey) -> Option<f64> {
    match scores.get(&key)? {
        RawScore::Anomaly { fraud_score, .. } => Some(*fraud_score),
        other => mismatched(key, other),
    }
}

fn mismatched(key: ModelKey, score: &RawScore) -> Option<f64> {
    warn!(model = %key, score = ?score, "Score kind does not match model key, ignoring component");
    None
}
