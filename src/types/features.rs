//! Per-entity engineered feature rows

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Named feature values handed to the model invoker.
pub type FeatureMap = HashMap<String, f64>;

/// Aggregated payment behaviour of one entity over its settled records.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityFeatureRow {
    pub entity_id: String,
    pub avg_delay_days: f64,
    pub max_delay_days: f64,
    /// Sample standard deviation; 0 for a single settled record
    pub std_delay_days: f64,
    pub delayed_count: u64,
    /// Number of settled records, always at least 1
    pub total_txn: u64,
    pub total_value: f64,
    pub avg_credit_days: f64,
    /// `1 - delayed_count / total_txn`
    pub on_time_rate: f64,
    /// Current-period credit days (= `avg_credit_days`)
    pub credit_days: f64,
    /// Current-period amount (= `total_value / total_txn`)
    pub amount: f64,
    /// Always 0 for aggregated views
    pub outstanding_amount: f64,
}

impl EntityFeatureRow {
    /// Feature names in the order the payment-delay models were trained on.
    pub const FEATURE_NAMES: [&'static str; 11] = [
        "avg_delay_days",
        "max_delay_days",
        "std_delay_days",
        "on_time_rate",
        "total_value",
        "avg_credit_days",
        "delayed_count",
        "total_txn",
        "CreditDays",
        "Amount",
        "OutstandingAmount",
    ];

    /// Expose the row under the model feature names.
    pub fn to_feature_map(&self) -> FeatureMap {
        let values = [
            self.avg_delay_days,
            self.max_delay_days,
            self.std_delay_days,
            self.on_time_rate,
            self.total_value,
            self.avg_credit_days,
            self.delayed_count as f64,
            self.total_txn as f64,
            self.credit_days,
            self.amount,
            self.outstanding_amount,
        ];

        Self::FEATURE_NAMES
            .iter()
            .zip(values)
            .map(|(name, value)| (name.to_string(), value))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_feature_map_names() {
        let row = EntityFeatureRow {
            entity_id: "A".to_string(),
            avg_delay_days: 12.5,
            max_delay_days: 20.0,
            std_delay_days: 10.6,
            delayed_count: 1,
            total_txn: 2,
            total_value: 3000.0,
            avg_credit_days: 30.0,
            on_time_rate: 0.5,
            credit_days: 30.0,
            amount: 1500.0,
            outstanding_amount: 0.0,
        };

        let features = row.to_feature_map();
        assert_eq!(features.len(), EntityFeatureRow::FEATURE_NAMES.len());
        assert_eq!(features["Amount"], 1500.0);
        assert_eq!(features["CreditDays"], 30.0);
        assert_eq!(features["total_txn"], 2.0);
        assert_eq!(features["OutstandingAmount"], 0.0);
    }
}
