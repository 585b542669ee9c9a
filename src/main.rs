//! Risk Fusion Pipeline - Main Entry Point
//!
//! `serve` (default) answers assessment requests from NATS.
//! `batch <records.json> [verdicts.json]` aggregates a payment ledger and
//! scores every entity with the payment-delay models.

use anyhow::{bail, Context, Result};
use futures::StreamExt;
use risk_fusion_pipeline::{
    config::{AppConfig, LoggingConfig},
    consumer::{AssessmentConsumer, AssessmentHandler},
    feature_aggregator::FeatureAggregator,
    ingest,
    metrics::{MetricsReporter, PipelineMetrics},
    models::RiskEngine,
    producer::VerdictProducer,
    runner::BulkPredictionRunner,
    types::ModelFamily,
};
use std::fs;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::Semaphore;
use tracing::{error, info};

const USAGE: &str = "usage: risk-fusion-pipeline [serve | batch <records.json> [verdicts.json]]";

#[tokio::main]
async fn main() -> Result<()> {
    let config = AppConfig::load()?;
    init_tracing(&config.logging)?;

    info!("Starting Risk Fusion Pipeline");

    let args: Vec<String> = std::env::args().collect();
    let mode = args.get(1).map(|s| s.as_str()).unwrap_or("serve");
    if !matches!(mode, "serve" | "batch") {
        bail!("unknown mode {:?}\n{}", mode, USAGE);
    }

    info!(
        payment_weights = ?config.fusion.payment,
        loan_weights = ?config.fusion.loan,
        anomaly = ?config.fusion.anomaly,
        "Configuration loaded"
    );

    let engine = Arc::new(RiskEngine::from_config(&config)?);
    log_model_contracts(&engine);

    match mode {
        "batch" => {
            let Some(input) = args.get(2) else {
                bail!("batch mode needs a records file\n{}", USAGE);
            };
            run_batch(&config, engine, input, args.get(3).map(|s| s.as_str())).await
        }
        _ => serve(config, engine).await,
    }
}

fn init_tracing(logging: &LoggingConfig) -> Result<()> {
    let filter = tracing_subscriber::EnvFilter::from_default_env()
        .add_directive(format!("risk_fusion_pipeline={}", logging.level).parse()?);

    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    if logging.format == "json" {
        builder.json().init();
    } else {
        builder.init();
    }
    Ok(())
}

fn log_model_contracts(engine: &RiskEngine) {
    let health = engine.health();
    info!(
        status = health.status,
        payment_models = health.payment_models,
        loan_models = health.loan_models,
        "Model registry health"
    );

    for family in [ModelFamily::PaymentDelay, ModelFamily::Loan] {
        for model in engine.model_info(family) {
            info!(
                family = %family,
                model = %model.key,
                loaded = model.loaded,
                features = model.feature_names.len(),
                "Model contract"
            );
        }
    }
}

async fn serve(config: AppConfig, engine: Arc<RiskEngine>) -> Result<()> {
    let metrics = Arc::new(PipelineMetrics::new());
    let handler = AssessmentHandler::new(engine, metrics.clone());

    // Connect to NATS
    let client = async_nats::connect(&config.nats.url)
        .await
        .with_context(|| format!("Failed to connect to NATS at {}", config.nats.url))?;
    info!("Connected to NATS at {}", config.nats.url);

    let consumer = AssessmentConsumer::new(client.clone(), &config.nats.request_subject);
    let producer = Arc::new(VerdictProducer::new(client, &config.nats.verdict_subject));

    let num_workers = config.pipeline.workers.max(1);
    info!(
        workers = num_workers,
        requests = %consumer.subject(),
        verdicts = %producer.subject(),
        "Starting assessment loop"
    );

    // Semaphore to limit concurrent processing
    let semaphore = Arc::new(Semaphore::new(num_workers));
    let processed_count = Arc::new(AtomicU64::new(0));

    let reporter = MetricsReporter::new(metrics.clone(), config.pipeline.metrics_interval_secs);
    tokio::spawn(reporter.start());

    let mut subscription = consumer.subscribe().await?;

    while let Some(message) = subscription.next().await {
        let permit = semaphore.clone().acquire_owned().await?;

        let handler = handler.clone();
        let producer = producer.clone();
        let metrics = metrics.clone();
        let processed_count = processed_count.clone();

        tokio::spawn(async move {
            let reply = message.reply.as_ref().map(|subject| subject.to_string());
            let payload = message.payload;

            match tokio::task::spawn_blocking(move || handler.handle(&payload)).await {
                Ok(response) => {
                    if let Err(e) = producer.publish(&response, reply.as_deref()).await {
                        error!(
                            request_id = %response.request_id,
                            error = %e,
                            "Failed to publish assessment response"
                        );
                    }
                }
                Err(e) => error!(error = %e, "Assessment task failed"),
            }

            let count = processed_count.fetch_add(1, Ordering::Relaxed) + 1;

            // Log progress every 100 requests
            if count % 100 == 0 {
                let processing_stats = metrics.get_processing_stats();
                info!(
                    processed = count,
                    throughput = format!("{:.1} req/s", metrics.get_throughput()),
                    avg_latency_us = processing_stats.mean_us,
                    "Processing milestone"
                );
            }

            drop(permit);
        });
    }

    info!("Pipeline shutting down...");
    metrics.print_summary();

    Ok(())
}

async fn run_batch(
    config: &AppConfig,
    engine: Arc<RiskEngine>,
    input: &str,
    output: Option<&str>,
) -> Result<()> {
    let ledger = ingest::load_records(input)?;
    let rows = FeatureAggregator::new().aggregate(&ledger.records);
    info!(entities = rows.len(), "Entity features aggregated");

    let runner = BulkPredictionRunner::new(engine, config.pipeline.workers);
    let report = runner.run(rows).await;

    info!(
        entities = report.summary.total,
        high_or_critical = report.summary.high_or_critical,
        mean_risk_score = format!("{:.1}", report.summary.mean_risk_score),
        likely_delayed = report.summary.likely_delayed,
        row_errors = report.errors.len(),
        "Batch summary"
    );

    let json = serde_json::to_string_pretty(&report)?;
    match output {
        Some(path) => {
            fs::write(path, json).with_context(|| format!("Failed to write verdicts to {}", path))?;
            info!(path = %path, "Verdict table written");
        }
        None => println!("{}", json),
    }

    Ok(())
}
