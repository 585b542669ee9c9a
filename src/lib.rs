//! Risk Fusion Pipeline Library
//!
//! Scores trade-credit counterparties and loan applications by fusing the
//! outputs of independently trained models into one tiered verdict.
//! Payment ledgers are aggregated into per-entity features and assessed in
//! bulk; single requests are served over NATS.

pub mod config;
pub mod consumer;
pub mod error;
pub mod feature_aggregator;
pub mod ingest;
pub mod metrics;
pub mod models;
pub mod producer;
pub mod runner;
pub mod serde_utils;
pub mod types;

pub use config::AppConfig;
pub use consumer::{AssessmentConsumer, AssessmentHandler};
pub use error::{RiskError, RiskResult};
pub use feature_aggregator::FeatureAggregator;
pub use models::{Assessment, RiskEngine};
pub use producer::VerdictProducer;
pub use runner::{BatchReport, BulkPredictionRunner};
pub use types::{
    AssessmentRequest, AssessmentResponse, EntityFeatureRow, ModelFamily, RiskTier, RiskVerdict,
    TransactionRecord,
};
