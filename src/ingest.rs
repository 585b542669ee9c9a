//! Ledger ingestion: JSON export to validated records

use crate::error::RiskError;
use crate::types::record::RawRecord;
use crate::types::TransactionRecord;
use anyhow::{Context, Result};
use serde_json::Value;
use std::fs;
use std::path::Path;
use tracing::{info, warn};

/// Records that passed validation plus the ones that were excluded
#[derive(Debug, Default)]
pub struct IngestReport {
    pub records: Vec<TransactionRecord>,
    pub rejected: Vec<RiskError>,
}

impl IngestReport {
    pub fn settled_count(&self) -> usize {
        self.records.iter().filter(|r| r.is_settled()).count()
    }
}

/// Parse a JSON array of ledger rows.
///
/// Only a document that is not a JSON array fails. Individual rows that
/// cannot be used are reported in [`IngestReport::rejected`].
pub fn parse_records(json: &str) -> Result<IngestReport> {
    let rows: Vec<Value> = serde_json::from_str(json).context("Ledger export is not a JSON array")?;
    let mut report = IngestReport::default();

    for (index, row) in rows.into_iter().enumerate() {
        let parsed = serde_json::from_value::<RawRecord>(row)
            .map_err(|e| RiskError::MalformedRecord {
                index,
                reason: e.to_string(),
            })
            .and_then(|raw| raw.into_record(index));

        match parsed {
            Ok(record) => report.records.push(record),
            Err(e) => {
                warn!(error = %e, "Skipping ledger record");
                report.rejected.push(e);
            }
        }
    }

    Ok(report)
}

/// Read and parse a ledger export file
pub fn load_records<P: AsRef<Path>>(path: P) -> Result<IngestReport> {
    let path = path.as_ref();
    let raw = fs::read_to_string(path).with_context(|| format!("Failed to read ledger {:?}", path))?;
    let report = parse_records(&raw).with_context(|| format!("Failed to parse ledger {:?}", path))?;

    info!(
        path = %path.display(),
        records = report.records.len(),
        settled = report.settled_count(),
        rejected = report.rejected.len(),
        "Ledger loaded"
    );

    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::feature_aggregator::FeatureAggregator;

    const LEDGER: &str = r#"[
        {"PartyName": "A", "Amount": 1000, "CreditDays": 30, "DaysInPayment": 5, "IsDelayed": false,
         "InvoiceDate": "2024-01-01", "DueDate": "2024-01-31", "PaymentDate": "2024-01-06"},
        {"PartyName": "A", "Amount": "2000", "CreditDays": "30", "DaysInPayment": 20, "IsDelayed": true,
         "InvoiceDate": "01/02/2024", "DueDate": "not-a-date", "PaymentDate": null},
        {"PartyName": "B", "Amount": 750, "CreditDays": 15, "DaysInPayment": null, "IsDelayed": false},
        {"Amount": 10, "DaysInPayment": 3},
        42
    ]"#;

    #[test]
    fn test_parse_records_keeps_good_rows() {
        let report = parse_records(LEDGER).unwrap();

        assert_eq!(report.records.len(), 3);
        assert_eq!(report.settled_count(), 2);
        assert_eq!(report.rejected.len(), 2);
        assert!(report
            .rejected
            .iter()
            .all(|e| matches!(e, RiskError::MalformedRecord { .. })));
    }

    #[test]
    fn test_bad_dates_do_not_block_aggregation() {
        let report = parse_records(LEDGER).unwrap();
        let rows = FeatureAggregator::new().aggregate(&report.records);

        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].entity_id, "A");
        assert_eq!(rows[0].avg_delay_days, 12.5);
        assert_eq!(rows[0].amount, 1500.0);
    }

    #[test]
    fn test_non_array_document_fails() {
        assert!(parse_records(r#"{"PartyName": "A"}"#).is_err());
    }

    #[test]
    fn test_missing_file_fails() {
        assert!(load_records("/nonexistent/ledger.json").is_err());
    }
}
