//! NATS message consumer for incoming assessment requests

use crate::metrics::PipelineMetrics;
use crate::models::engine::{Assessment, RiskEngine};
use crate::types::{AssessmentRequest, AssessmentResponse, ModelKey};
use anyhow::Result;
use async_nats::{Client, Subscriber};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Consumer for receiving assessment requests from NATS
pub struct AssessmentConsumer {
    client: Client,
    subject: String,
}

impl AssessmentConsumer {
    /// Create a new assessment consumer
    pub fn new(client: Client, subject: &str) -> Self {
        Self {
            client,
            subject: subject.to_string(),
        }
    }

    /// Subscribe to the request subject
    pub async fn subscribe(&self) -> Result<Subscriber> {
        let subscriber = self.client.subscribe(self.subject.clone()).await?;
        info!(subject = %self.subject, "Subscribed to assessment request subject");
        Ok(subscriber)
    }

    /// Get the subject name
    pub fn subject(&self) -> &str {
        &self.subject
    }
}

/// Turns one request payload into exactly one response.
#[derive(Clone)]
pub struct AssessmentHandler {
    engine: Arc<RiskEngine>,
    metrics: Arc<PipelineMetrics>,
}

impl AssessmentHandler {
    pub fn new(engine: Arc<RiskEngine>, metrics: Arc<PipelineMetrics>) -> Self {
        Self { engine, metrics }
    }

    /// Decode, assess and record metrics. Never fails: every problem is
    /// reported in the response's `error` field.
    pub fn handle(&self, payload: &[u8]) -> AssessmentResponse {
        let start = Instant::now();

        let request: AssessmentRequest = match serde_json::from_slice(payload) {
            Ok(request) => request,
            Err(e) => {
                warn!(error = %e, "Failed to deserialize assessment request");
                self.metrics.record_failure();
                return AssessmentResponse::rejected(
                    Uuid::new_v4().to_string(),
                    format!("invalid request: {}", e),
                );
            }
        };

        let request_id = request
            .request_id
            .clone()
            .unwrap_or_else(|| Uuid::new_v4().to_string());
        let family = request.model_type;

        match self.engine.assess(family, &request.input_data) {
            Ok(Assessment::Verdict(verdict)) => {
                let processing_time = start.elapsed();
                self.metrics
                    .record_verdict(processing_time, verdict.composite_score, verdict.composite_tier);

                let missing: Vec<ModelKey> = family
                    .keys()
                    .iter()
                    .filter(|key| !verdict.components.contains_key(*key))
                    .copied()
                    .collect();
                self.metrics.record_degraded(&missing);

                let verdict = match request.entity_id {
                    Some(entity_id) => verdict.with_entity(entity_id),
                    None => verdict,
                };

                if verdict.composite_tier.is_elevated() {
                    info!(
                        request_id = %request_id,
                        model_type = %family,
                        risk_score = verdict.composite_score,
                        tier = %verdict.composite_tier,
                        processing_time_us = processing_time.as_micros() as u64,
                        "Elevated risk verdict"
                    );
                } else {
                    debug!(
                        request_id = %request_id,
                        model_type = %family,
                        risk_score = verdict.composite_score,
                        processing_time_us = processing_time.as_micros() as u64,
                        "Request assessed"
                    );
                }

                AssessmentResponse::verdict(request_id, family, verdict)
            }
            Ok(Assessment::NoVerdict { reason, .. }) => {
                self.metrics.record_no_verdict(start.elapsed());
                warn!(request_id = %request_id, model_type = %family, "{}", reason);
                AssessmentResponse::error(request_id, family, reason)
            }
            Err(e) => {
                self.metrics.record_failure();
                warn!(request_id = %request_id, model_type = %family, error = %e, "Assessment failed");
                AssessmentResponse::error(request_id, family, e.to_string())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::fusion::{FusionConfig, REVIEW_HIGH};
    use crate::models::package::{ModelPackage, StandardScaler};
    use crate::models::registry::ModelRegistry;
    use crate::models::testing::{self, Echo, Fixed};
    use crate::types::{ModelFamily, RiskTier};
    use serde_json::json;
    use std::sync::atomic::Ordering;

    fn handler(registry: ModelRegistry) -> (AssessmentHandler, Arc<PipelineMetrics>) {
        let engine = Arc::new(RiskEngine::new(Arc::new(registry), FusionConfig::default()));
        let metrics = Arc::new(PipelineMetrics::new());
        (AssessmentHandler::new(engine, metrics.clone()), metrics)
    }

    fn loan_registry() -> ModelRegistry {
        ModelRegistry::builder()
            .with(ModelKey::Acceptance, ModelPackage::classifier(Fixed(0.9), testing::schema(&["x"])))
            .with(
                ModelKey::Default,
                ModelPackage::classifier(Echo, testing::schema(&["default_hint"])),
            )
            .with(ModelKey::Delay, ModelPackage::classifier(Fixed(0.5), testing::schema(&["x"])))
            .build()
    }

    #[test]
    fn test_loan_request_produces_verdict() {
        let (handler, metrics) = handler(loan_registry());
        let payload = json!({
            "request_id": "req-42",
            "model_type": "lending_club",
            "entity_id": "applicant-7",
            "input_data": {"default_hint": "1.0"}
        });

        let response = handler.handle(payload.to_string().as_bytes());
        assert_eq!(response.request_id, "req-42");
        assert_eq!(response.model_type, Some(ModelFamily::Loan));
        assert!(response.error.is_none());

        // 40 * 1.0 + 30 * 0.5 = 55.0, fraud model absent
        let verdict = response.verdict.unwrap();
        assert!((verdict.composite_score - 55.0).abs() < 1e-9);
        assert_eq!(verdict.composite_tier, RiskTier::High);
        assert_eq!(verdict.recommendation, REVIEW_HIGH);
        assert_eq!(verdict.entity_id.as_deref(), Some("applicant-7"));

        assert_eq!(metrics.assessments.load(Ordering::Relaxed), 1);
        assert_eq!(metrics.get_degraded_components()[&ModelKey::Fraud], 1);
    }

    #[test]
    fn test_undecodable_payload_is_rejected() {
        let (handler, metrics) = handler(loan_registry());

        let response = handler.handle(b"{not json");
        assert!(response.model_type.is_none());
        assert!(response.error.unwrap().starts_with("invalid request"));
        assert!(!response.request_id.is_empty());
        assert_eq!(metrics.failures.load(Ordering::Relaxed), 1);
    }

    #[test]
    fn test_family_without_models_reports_no_verdict() {
        let (handler, metrics) = handler(loan_registry());
        let payload = json!({"model_type": "payment_delay", "input_data": {}});

        let response = handler.handle(payload.to_string().as_bytes());
        assert!(response.verdict.is_none());
        assert!(response.error.unwrap().contains("no verdict available"));
        assert_eq!(metrics.no_verdicts.load(Ordering::Relaxed), 1);
    }

    #[test]
    fn test_input_shape_error_is_reported() {
        let mismatched = testing::schema(&["x"]).with_scaler(StandardScaler {
            mean: vec![0.0, 0.0],
            scale: vec![1.0, 1.0],
        });
        let (handler, metrics) = handler(
            ModelRegistry::builder()
                .with(ModelKey::DelayProbability, ModelPackage::classifier(Fixed(0.5), mismatched))
                .build(),
        );
        let payload = json!({"request_id": "bad-shape", "model_type": "payment_delay", "input_data": {"x": 1}});

        let response = handler.handle(payload.to_string().as_bytes());
        assert_eq!(response.request_id, "bad-shape");
        assert!(response.verdict.is_none());
        assert!(response.error.is_some());
        assert_eq!(metrics.failures.load(Ordering::Relaxed), 1);
    }
}
