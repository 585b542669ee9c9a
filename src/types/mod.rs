//! Type definitions for the risk fusion pipeline

pub mod features;
pub mod model;
pub mod record;
pub mod request;
pub mod tier;
pub mod verdict;

pub use features::{EntityFeatureRow, FeatureMap};
pub use model::{ModelFamily, ModelKey};
pub use record::TransactionRecord;
pub use request::{AssessmentRequest, AssessmentResponse};
pub use tier::{RiskTier, TierTable};
pub use verdict::{AcceptanceDecision, ComponentScore, Decision, RiskVerdict};
