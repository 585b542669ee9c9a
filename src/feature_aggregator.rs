//! Per-entity feature aggregation for payment-delay model inference.
//!
//! Settled records are grouped by entity and reduced to the historical
//! payment statistics the payment-delay models were trained on.

use crate::types::{EntityFeatureRow, TransactionRecord};
use std::collections::BTreeMap;

/// Running statistics for one entity
#[derive(Debug, Default)]
struct EntityStats {
    delays: Vec<f64>,
    delayed_count: u64,
    total_value: f64,
    credit_days_sum: f64,
}

impl EntityStats {
    fn push(&mut self, record: &TransactionRecord, days_in_payment: i64) {
        self.delays.push(days_in_payment as f64);
        if record.is_delayed {
            self.delayed_count += 1;
        }
        self.total_value += record.amount;
        self.credit_days_sum += record.credit_days as f64;
    }

    fn into_row(self, entity_id: String) -> EntityFeatureRow {
        // Groups only exist once a settled record was pushed
        let total_txn = self.delays.len() as u64;
        let n = self.delays.len() as f64;

        let avg_delay_days = self.delays.iter().sum::<f64>() / n;
        let max_delay_days = self.delays.iter().copied().fold(f64::MIN, f64::max);
        let std_delay_days = sample_std(&self.delays, avg_delay_days);
        let avg_credit_days = self.credit_days_sum / n;
        let on_time_rate = 1.0 - self.delayed_count as f64 / total_txn as f64;

        EntityFeatureRow {
            entity_id,
            avg_delay_days,
            max_delay_days,
            std_delay_days,
            delayed_count: self.delayed_count,
            total_txn,
            total_value: self.total_value,
            avg_credit_days,
            on_time_rate,
            credit_days: avg_credit_days,
            amount: self.total_value / n,
            outstanding_amount: 0.0,
        }
    }
}

/// Sample standard deviation (n - 1); 0 for fewer than two values.
fn sample_std(values: &[f64], mean: f64) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    let variance = values.iter().map(|&x| (x - mean).powi(2)).sum::<f64>() / (values.len() - 1) as f64;
    variance.sqrt()
}

/// Turns raw ledger records into one feature row per entity.
///
/// Pure over its input: aggregating the same records twice yields identical
/// rows in the same order (ascending `entity_id`).
pub struct FeatureAggregator;

impl FeatureAggregator {
    pub fn new() -> Self {
        Self
    }

    /// Aggregate settled records by entity.
    ///
    /// Records without `days_in_payment` are not yet settled and are
    /// ignored. Entities with no settled record produce no row.
    pub fn aggregate(&self, records: &[TransactionRecord]) -> Vec<EntityFeatureRow> {
        let mut groups: BTreeMap<&str, EntityStats> = BTreeMap::new();

        for record in records {
            if let Some(days) = record.days_in_payment {
                groups
                    .entry(record.entity_id.as_str())
                    .or_default()
                    .push(record, days);
            }
        }

        groups
            .into_iter()
            .map(|(entity_id, stats)| stats.into_row(entity_id.to_string()))
            .collect()
    }

    /// Feature names each row exposes to the models
    pub fn feature_names(&self) -> &'static [&'static str] {
        &EntityFeatureRow::FEATURE_NAMES
    }
}

impl Default for FeatureAggregator {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scenario_records() -> Vec<TransactionRecord> {
        vec![
            TransactionRecord::settled("A", 5, false)
                .with_amount(1000.0)
                .with_credit_days(30),
            TransactionRecord::settled("A", 20, true)
                .with_amount(2000.0)
                .with_credit_days(30),
        ]
    }

    #[test]
    fn test_two_record_scenario() {
        let rows = FeatureAggregator::new().aggregate(&scenario_records());
        assert_eq!(rows.len(), 1);

        let row = &rows[0];
        assert_eq!(row.entity_id, "A");
        assert_eq!(row.avg_delay_days, 12.5);
        assert_eq!(row.max_delay_days, 20.0);
        assert_eq!(row.delayed_count, 1);
        assert_eq!(row.total_txn, 2);
        assert_eq!(row.on_time_rate, 0.5);
        assert_eq!(row.total_value, 3000.0);
        assert_eq!(row.amount, 1500.0);
        assert_eq!(row.avg_credit_days, 30.0);
        assert_eq!(row.credit_days, 30.0);
        assert_eq!(row.outstanding_amount, 0.0);
        // sqrt(((5 - 12.5)^2 + (20 - 12.5)^2) / 1)
        assert!((row.std_delay_days - 112.5_f64.sqrt()).abs() < 1e-12);
    }

    #[test]
    fn test_single_record_has_zero_std() {
        let rows = FeatureAggregator::new().aggregate(&[TransactionRecord::settled("solo", 42, true)]);
        assert_eq!(rows[0].std_delay_days, 0.0);
        assert_eq!(rows[0].total_txn, 1);
        assert_eq!(rows[0].on_time_rate, 0.0);
    }

    #[test]
    fn test_unsettled_records_are_ignored() {
        let mut records = scenario_records();
        records.push(TransactionRecord::open("A", 99_999.0));
        records.push(TransactionRecord::open("pending-only", 500.0));

        let rows = FeatureAggregator::new().aggregate(&records);
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].total_txn, 2);
        assert_eq!(rows[0].total_value, 3000.0);
    }

    #[test]
    fn test_on_time_rate_bounds() {
        let records: Vec<TransactionRecord> = (0..30)
            .map(|i| TransactionRecord::settled(format!("E{}", i % 4), i, i % 3 == 0))
            .collect();

        for row in FeatureAggregator::new().aggregate(&records) {
            assert!((0.0..=1.0).contains(&row.on_time_rate));
            assert_eq!(
                row.on_time_rate,
                1.0 - row.delayed_count as f64 / row.total_txn as f64
            );
            assert!(row.total_txn >= 1);
        }
    }

    #[test]
    fn test_aggregation_is_idempotent_and_ordered() {
        let records = vec![
            TransactionRecord::settled("zeta", 3, false),
            TransactionRecord::settled("alpha", 10, true),
            TransactionRecord::settled("mid", 0, false),
            TransactionRecord::settled("alpha", 1, false),
        ];

        let aggregator = FeatureAggregator::new();
        let first = aggregator.aggregate(&records);
        let second = aggregator.aggregate(&records);
        assert_eq!(first, second);

        let ids: Vec<&str> = first.iter().map(|r| r.entity_id.as_str()).collect();
        assert_eq!(ids, vec!["alpha", "mid", "zeta"]);
    }

    #[test]
    fn test_empty_input() {
        assert!(FeatureAggregator::new().aggregate(&[]).is_empty());
        assert_eq!(FeatureAggregator::new().feature_names().len(), 11);
    }
}
