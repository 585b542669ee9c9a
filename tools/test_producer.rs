//! Test Assessment Request Producer
//!
//! Publishes low/medium/high risk sample requests for both model families to
//! NATS and prints the responses that come back.

use rand::Rng;
use serde::Serialize;
use std::collections::BTreeMap;
use std::time::Duration;
use tracing::{info, warn};

/// Request structure matching the pipeline's expected format
#[derive(Debug, Clone, Serialize)]
struct AssessmentRequest {
    request_id: String,
    model_type: &'static str,
    entity_id: String,
    input_data: BTreeMap<&'static str, f64>,
}

#[derive(Debug, Clone, Copy)]
enum Profile {
    Low,
    Medium,
    High,
}

impl Profile {
    fn as_str(&self) -> &'static str {
        match self {
            Profile::Low => "low",
            Profile::Medium => "medium",
            Profile::High => "high",
        }
    }
}

/// Request generator for testing
struct RequestGenerator {
    rng: rand::rngs::ThreadRng,
    request_counter: u64,
}

impl RequestGenerator {
    fn new() -> Self {
        Self {
            rng: rand::thread_rng(),
            request_counter: 0,
        }
    }

    fn next_id(&mut self) -> String {
        self.request_counter += 1;
        format!("req_{:08}", self.request_counter)
    }

    /// +/- 10% noise so repeated samples are not identical
    fn jitter(&mut self, value: f64) -> f64 {
        value * self.rng.gen_range(0.9..1.1)
    }

    /// Payment-delay request built from aggregated ledger statistics
    fn payment_delay(&mut self, profile: Profile) -> AssessmentRequest {
        let (avg_delay, max_delay, std_delay, on_time_rate) = match profile {
            Profile::Low => (2.5, 15.0, 3.2, 0.95),
            Profile::Medium => (8.5, 30.0, 6.8, 0.85),
            Profile::High => (18.5, 60.0, 12.5, 0.65),
        };
        let total_txn = self.rng.gen_range(10..60) as f64;
        let amount = self.rng.gen_range(5_000.0..50_000.0);
        let credit_days = self.random_choice(&[15.0, 30.0, 45.0, 60.0]);

        let input_data = BTreeMap::from([
            ("avg_delay_days", self.jitter(avg_delay)),
            ("max_delay_days", max_delay),
            ("std_delay_days", self.jitter(std_delay)),
            ("on_time_rate", on_time_rate),
            ("total_value", amount * total_txn),
            ("avg_credit_days", credit_days),
            ("delayed_count", (total_txn * (1.0 - on_time_rate)).round()),
            ("total_txn", total_txn),
            ("CreditDays", credit_days),
            ("Amount", amount),
            ("OutstandingAmount", 0.0),
        ]);

        AssessmentRequest {
            request_id: self.next_id(),
            model_type: "payment_delay",
            entity_id: format!("party_{}", self.rng.gen_range(1..500)),
            input_data,
        }
    }

    /// Loan application request
    fn loan(&mut self, profile: Profile) -> AssessmentRequest {
        let (loan_amnt, dti, emp_length, int_rate, annual_inc, credit_util, delinq, open_acc, pub_rec) =
            match profile {
                Profile::Low => (10_000.0, 15.0, 8.0, 7.5, 95_000.0, 20.0, 0.0, 12.0, 0.0),
                Profile::Medium => (25_000.0, 28.0, 4.0, 12.5, 55_000.0, 55.0, 1.0, 8.0, 0.0),
                Profile::High => (35_000.0, 42.0, 2.0, 18.0, 38_000.0, 85.0, 3.0, 5.0, 1.0),
            };
        let loan_amnt = self.jitter(loan_amnt);
        let annual_inc = self.jitter(annual_inc);

        let input_data = BTreeMap::from([
            ("loan_amnt", loan_amnt),
            ("dti", self.jitter(dti)),
            ("emp_length_years", emp_length),
            ("int_rate", int_rate),
            ("installment", loan_amnt / 36.0),
            ("annual_inc", annual_inc),
            ("delinq_2yrs", delinq),
            ("inq_last_6mths", 0.0),
            ("open_acc", open_acc),
            ("pub_rec", pub_rec),
            ("revol_bal", annual_inc * 0.15),
            ("total_acc", open_acc + 3.0),
            ("Credit_Utilization", credit_util),
            ("Default_Rate_By_State", 15.0),
            ("Dispute_Count", 0.0),
            ("collections_12_mths_ex_med", 0.0),
            ("pub_rec_bankruptcies", 0.0),
            ("term", 36.0),
            ("grade", 3.0),
            ("acc_now_delinq", 0.0),
            ("state_encoded", 5.0),
        ]);

        AssessmentRequest {
            request_id: self.next_id(),
            model_type: "loan",
            entity_id: format!("applicant_{}", self.rng.gen_range(1..10_000)),
            input_data,
        }
    }

    fn generate(&mut self) -> (AssessmentRequest, Profile) {
        let profile = match self.rng.gen_range(0..3) {
            0 => Profile::Low,
            1 => Profile::Medium,
            _ => Profile::High,
        };
        let request = if self.rng.gen_bool(0.5) {
            self.payment_delay(profile)
        } else {
            self.loan(profile)
        };
        (request, profile)
    }

    fn random_choice(&mut self, choices: &[f64]) -> f64 {
        choices[self.rng.gen_range(0..choices.len())]
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("test_producer=info".parse()?),
        )
        .init();

    info!("Starting Test Assessment Producer");

    // Parse arguments
    let args: Vec<String> = std::env::args().collect();
    let nats_url = args.get(1).map(|s| s.as_str()).unwrap_or("nats://localhost:4222");
    let subject = args.get(2).map(|s| s.as_str()).unwrap_or("risk.assess");
    let count: u64 = args.get(3).and_then(|s| s.parse().ok()).unwrap_or(30);
    let delay_ms: u64 = args.get(4).and_then(|s| s.parse().ok()).unwrap_or(100);

    info!(
        nats_url = %nats_url,
        subject = %subject,
        count = count,
        delay_ms = delay_ms,
        "Configuration loaded"
    );

    // Connect to NATS
    let client = match async_nats::connect(nats_url).await {
        Ok(c) => {
            info!("Connected to NATS");
            c
        }
        Err(e) => {
            warn!(error = %e, "Failed to connect to NATS. Running in dry-run mode.");
            return run_dry_mode(count, delay_ms).await;
        }
    };

    let mut generator = RequestGenerator::new();

    for i in 0..count {
        let (request, profile) = generator.generate();
        let payload = serde_json::to_vec(&request)?;

        match client.request(subject.to_string(), payload.into()).await {
            Ok(reply) => {
                let response: serde_json::Value = serde_json::from_slice(&reply.payload)?;
                info!(
                    request_id = %request.request_id,
                    model_type = request.model_type,
                    profile = profile.as_str(),
                    risk_score = %response["verdict"]["composite_score"],
                    tier = %response["verdict"]["composite_tier"],
                    error = %response["error"],
                    "Response received"
                );
            }
            Err(e) => warn!(request_id = %request.request_id, error = %e, "Request failed"),
        }

        if (i + 1) % 10 == 0 {
            info!("Sent {}/{} requests", i + 1, count);
        }

        tokio::time::sleep(Duration::from_millis(delay_ms)).await;
    }

    info!("Completed! Sent {} requests", count);

    Ok(())
}

async fn run_dry_mode(count: u64, delay_ms: u64) -> anyhow::Result<()> {
    info!("Running in dry-run mode (no NATS connection)");

    let mut generator = RequestGenerator::new();

    for i in 0..count {
        let (request, profile) = generator.generate();
        let json = serde_json::to_string_pretty(&request)?;

        if (i + 1) % 10 == 0 || i == 0 {
            info!("Sample {} request {}:\n{}", profile.as_str(), i + 1, json);
        }

        tokio::time::sleep(Duration::from_millis(delay_ms)).await;
    }

    Ok(())
}
