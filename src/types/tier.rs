//! Risk tiers and the threshold tables that assign them

use serde::{Deserialize, Serialize};
use std::fmt;

/// Risk tier classification
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum RiskTier {
    Low,
    Medium,
    High,
    Critical,
}

impl RiskTier {
    pub fn as_str(&self) -> &'static str {
        match self {
            RiskTier::Low => "LOW",
            RiskTier::Medium => "MEDIUM",
            RiskTier::High => "HIGH",
            RiskTier::Critical => "CRITICAL",
        }
    }

    /// HIGH or CRITICAL
    pub fn is_elevated(&self) -> bool {
        *self >= RiskTier::High
    }
}

impl fmt::Display for RiskTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How a band's threshold compares against the value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Bound {
    /// `value >= threshold`
    Inclusive,
    /// `value > threshold`
    Exclusive,
}

/// Ordered `(threshold, tier)` bands, highest threshold first.
///
/// Every tiering site in the crate goes through [`TierTable::classify`], so
/// the comparison rule cannot drift between call sites.
#[derive(Debug, Clone, Copy)]
pub struct TierTable {
    bands: &'static [(f64, RiskTier)],
    bound: Bound,
    floor: RiskTier,
}

impl TierTable {
    pub const fn new(bands: &'static [(f64, RiskTier)], bound: Bound, floor: RiskTier) -> Self {
        Self { bands, bound, floor }
    }

    /// First band whose threshold the value reaches, else the floor tier.
    /// NaN never reaches a threshold.
    pub fn classify(&self, value: f64) -> RiskTier {
        self.bands
            .iter()
            .find(|(threshold, _)| match self.bound {
                Bound::Inclusive => value >= *threshold,
                Bound::Exclusive => value > *threshold,
            })
            .map(|(_, tier)| *tier)
            .unwrap_or(self.floor)
    }
}

/// Composite and payment risk score (0-100).
pub const COMPOSITE_TIERS: TierTable = TierTable::new(
    &[
        (75.0, RiskTier::Critical),
        (50.0, RiskTier::High),
        (25.0, RiskTier::Medium),
    ],
    Bound::Inclusive,
    RiskTier::Low,
);

/// Payment delay probability (0-1), reported alongside the risk score.
pub const PAYMENT_DELAY_LEVELS: TierTable = TierTable::new(
    &[(0.7, RiskTier::High), (0.4, RiskTier::Medium)],
    Bound::Exclusive,
    RiskTier::Low,
);

/// Loan default probability (0-1).
pub const DEFAULT_LEVELS: TierTable = TierTable::new(
    &[(0.30, RiskTier::High), (0.15, RiskTier::Medium)],
    Bound::Exclusive,
    RiskTier::Low,
);

/// Loan repayment delay probability (0-1).
pub const LOAN_DELAY_LEVELS: TierTable = TierTable::new(
    &[(0.25, RiskTier::High), (0.10, RiskTier::Medium)],
    Bound::Exclusive,
    RiskTier::Low,
);

/// Fraud score (0-100).
pub const FRAUD_LEVELS: TierTable = TierTable::new(
    &[
        (75.0, RiskTier::Critical),
        (50.0, RiskTier::High),
        (25.0, RiskTier::Medium),
    ],
    Bound::Exclusive,
    RiskTier::Low,
);
