//! Bulk payment-delay predictions over aggregated entity rows

use crate::models::engine::{Assessment, RiskEngine};
use crate::models::fusion::WILL_DELAY_PROBABILITY;
use crate::types::{EntityFeatureRow, ModelKey, RiskVerdict};
use serde::Serialize;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

/// A row that produced no verdict
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RowError {
    pub entity_id: String,
    pub error: String,
}

/// Aggregate view of a batch run
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct BatchSummary {
    /// Rows with a verdict
    pub total: usize,
    pub high_or_critical: usize,
    pub mean_risk_score: f64,
    /// Rows whose delay probability exceeds 50%
    pub likely_delayed: usize,
}

impl BatchSummary {
    pub fn from_verdicts(verdicts: &[RiskVerdict]) -> Self {
        if verdicts.is_empty() {
            return Self::default();
        }

        let total = verdicts.len();
        let score_sum: f64 = verdicts.iter().map(|v| v.composite_score).sum();

        Self {
            total,
            high_or_critical: verdicts
                .iter()
                .filter(|v| v.composite_tier.is_elevated())
                .count(),
            mean_risk_score: score_sum / total as f64,
            likely_delayed: verdicts
                .iter()
                .filter(|v| {
                    v.probability(ModelKey::DelayProbability)
                        .is_some_and(|p| p > WILL_DELAY_PROBABILITY)
                })
                .count(),
        }
    }
}

/// Verdict table of a batch run, in input row order
#[derive(Debug, Clone, Serialize)]
pub struct BatchReport {
    pub verdicts: Vec<RiskVerdict>,
    pub errors: Vec<RowError>,
    pub summary: BatchSummary,
}

type RowOutcome = Result<RiskVerdict, String>;

/// Runs the payment-delay assessment for every entity row.
///
/// Each row is independent: a failing row becomes a [`RowError`] and the
/// batch continues.
pub struct BulkPredictionRunner {
    engine: Arc<RiskEngine>,
    workers: usize,
}

impl BulkPredictionRunner {
    pub fn new(engine: Arc<RiskEngine>, workers: usize) -> Self {
        Self {
            engine,
            workers: workers.max(1),
        }
    }

    /// Assess rows on the blocking pool with at most `workers` in flight.
    pub async fn run(&self, rows: Vec<EntityFeatureRow>) -> BatchReport {
        let start = Instant::now();
        let entity_ids: Vec<String> = rows.iter().map(|r| r.entity_id.clone()).collect();
        let mut outcomes: Vec<Option<RowOutcome>> = vec![None; rows.len()];

        let semaphore = Arc::new(Semaphore::new(self.workers));
        let mut tasks = JoinSet::new();

        for (index, row) in rows.into_iter().enumerate() {
            let Ok(permit) = semaphore.clone().acquire_owned().await else {
                break;
            };
            let engine = self.engine.clone();

            tasks.spawn_blocking(move || {
                let outcome = assess_row(&engine, &row);
                drop(permit);
                (index, outcome)
            });
        }

        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((index, outcome)) => outcomes[index] = Some(outcome),
                Err(e) => warn!(error = %e, "Bulk prediction task failed"),
            }
        }

        let outcomes = outcomes
            .into_iter()
            .map(|o| o.unwrap_or_else(|| Err("prediction task did not complete".to_string())));
        let report = collect_report(entity_ids.into_iter().zip(outcomes));

        info!(
            rows = report.verdicts.len() + report.errors.len(),
            verdicts = report.summary.total,
            errors = report.errors.len(),
            high_or_critical = report.summary.high_or_critical,
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Bulk prediction complete"
        );

        report
    }

    /// Assess rows one after another on the calling thread.
    pub fn run_sequential(&self, rows: &[EntityFeatureRow]) -> BatchReport {
        collect_report(
            rows.iter()
                .map(|row| (row.entity_id.clone(), assess_row(&self.engine, row))),
        )
    }
}

fn assess_row(engine: &RiskEngine, row: &EntityFeatureRow) -> RowOutcome {
    match engine.assess_payment(&row.to_feature_map()) {
        Ok(Assessment::Verdict(verdict)) => {
            debug!(
                entity_id = %row.entity_id,
                risk_score = verdict.composite_score,
                tier = %verdict.composite_tier,
                "Entity assessed"
            );
            Ok(verdict.with_entity(row.entity_id.clone()))
        }
        Ok(Assessment::NoVerdict { reason, .. }) => Err(reason),
        Err(e) => {
            warn!(entity_id = %row.entity_id, error = %e, "Entity assessment failed");
            Err(e.to_string())
        }
    }
}

fn collect_report(outcomes: impl IntoIterator<Item = (String, RowOutcome)>) -> BatchReport {
    let mut verdicts = Vec::new();
    let mut errors = Vec::new();

    for (entity_id, outcome) in outcomes {
        match outcome {
            Ok(verdict) => verdicts.push(verdict),
            Err(error) => errors.push(RowError { entity_id, error }),
        }
    }

    let summary = BatchSummary::from_verdicts(&verdicts);
    BatchReport {
        verdicts,
        errors,
        summary,
    }
}
