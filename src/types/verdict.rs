//! Risk verdict data structures

use crate::types::{ModelFamily, ModelKey, RiskTier};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Acceptance sub-decision of the loan policy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Decision {
    Accept,
    Reject,
}

/// Acceptance model outcome
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AcceptanceDecision {
    /// Approval probability (0.0 - 1.0)
    pub probability: f64,
    pub decision: Decision,
    /// Distance from the 0.5 boundary, scaled to 0-100
    pub confidence: f64,
}

impl AcceptanceDecision {
    pub fn from_probability(probability: f64) -> Self {
        let decision = if probability >= 0.5 {
            Decision::Accept
        } else {
            Decision::Reject
        };

        Self {
            probability,
            decision,
            confidence: (probability - 0.5).abs() * 200.0,
        }
    }

    pub fn is_rejected(&self) -> bool {
        self.decision == Decision::Reject
    }
}

/// One model's contribution to a verdict
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ComponentScore {
    /// Classifier probability (0.0 - 1.0) with its qualitative level
    Probability { probability: f64, level: RiskTier },
    /// Predicted days of delay (never negative)
    DelayDays { days: f64 },
    /// Fraud score (0 - 100) derived from an anomaly score
    Fraud {
        score: f64,
        level: RiskTier,
        suspicious: bool,
    },
    Acceptance(AcceptanceDecision),
}

/// Fused outcome for a single entity or application.
///
/// Created fresh per prediction and never mutated after construction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RiskVerdict {
    /// Unique verdict identifier
    pub verdict_id: String,

    /// Entity the verdict belongs to, when known
    #[serde(skip_serializing_if = "Option::is_none")]
    pub entity_id: Option<String>,

    /// Fusion policy that produced the verdict
    pub policy: ModelFamily,

    /// Per-model scores; missing models are absent
    pub components: BTreeMap<ModelKey, ComponentScore>,

    /// Weighted composite (0 - 100), rounded to one decimal
    pub composite_score: f64,

    pub composite_tier: RiskTier,

    pub recommendation: String,

    /// Payment policy only: delay probability above 0.5
    #[serde(skip_serializing_if = "Option::is_none")]
    pub will_delay: Option<bool>,

    /// Verdict generation timestamp
    pub timestamp: DateTime<Utc>,
}

impl RiskVerdict {
    pub fn new(
        policy: ModelFamily,
        components: BTreeMap<ModelKey, ComponentScore>,
        composite_score: f64,
        composite_tier: RiskTier,
        recommendation: impl Into<String>,
    ) -> Self {
        Self {
            verdict_id: uuid::Uuid::new_v4().to_string(),
            entity_id: None,
            policy,
            components,
            composite_score,
            composite_tier,
            recommendation: recommendation.into(),
            will_delay: None,
            timestamp: Utc::now(),
        }
    }

    pub fn with_entity(mut self, entity_id: impl Into<String>) -> Self {
        self.entity_id = Some(entity_id.into());
        self
    }

    pub fn with_will_delay(mut self, will_delay: bool) -> Self {
        self.will_delay = Some(will_delay);
        self
    }

    /// Probability reported by a classifier component, if present
    pub fn probability(&self, key: ModelKey) -> Option<f64> {
        match self.components.get(&key)? {
            ComponentScore::Probability { probability, .. } => Some(*probability),
            ComponentScore::Acceptance(acceptance) => Some(acceptance.probability),
            _ => None,
        }
    }

    pub fn acceptance(&self) -> Option<&AcceptanceDecision> {
        match self.components.get(&ModelKey::Acceptance)? {
            ComponentScore::Acceptance(acceptance) => Some(acceptance),
            _ => None,
        }
    }
}
