//! Ledger record data structures for payment-delay aggregation

use crate::error::RiskError;
use crate::serde_utils::{lenient_bool, lenient_f64, lenient_i64, lenient_string, lenient_timestamp};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A single invoice/transaction for a trading party.
///
/// Immutable once ingested. `days_in_payment` is `None` while the invoice is
/// not yet settled.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransactionRecord {
    /// Party (or loan application) the record belongs to
    pub entity_id: String,

    /// Invoice amount
    pub amount: f64,

    /// Credit days granted on the invoice
    pub credit_days: i64,

    /// Days taken to settle; `None` when not yet settled
    pub days_in_payment: Option<i64>,

    /// Whether payment arrived after the due date
    pub is_delayed: bool,

    /// Amount still open at export time
    #[serde(default)]
    pub outstanding_amount: f64,

    pub invoice_date: Option<DateTime<Utc>>,
    pub due_date: Option<DateTime<Utc>>,
    pub payment_date: Option<DateTime<Utc>>,
}

impl TransactionRecord {
    /// Create a settled record with required fields
    pub fn settled(entity_id: impl Into<String>, days_in_payment: i64, is_delayed: bool) -> Self {
        Self {
            entity_id: entity_id.into(),
            amount: 0.0,
            credit_days: 0,
            days_in_payment: Some(days_in_payment),
            is_delayed,
            outstanding_amount: 0.0,
            invoice_date: None,
            due_date: None,
            payment_date: None,
        }
    }

    /// Create an open (unsettled) record
    pub fn open(entity_id: impl Into<String>, amount: f64) -> Self {
        Self {
            amount,
            days_in_payment: None,
            ..Self::settled(entity_id, 0, false)
        }
    }

    pub fn with_amount(mut self, amount: f64) -> Self {
        self.amount = amount;
        self
    }

    pub fn with_credit_days(mut self, credit_days: i64) -> Self {
        self.credit_days = credit_days;
        self
    }

    pub fn is_settled(&self) -> bool {
        self.days_in_payment.is_some()
    }
}

/// Ledger row as exported, before validation.
///
/// Accepts both snake_case and the ledger's PascalCase column names.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawRecord {
    #[serde(default, alias = "PartyName", deserialize_with = "lenient_string")]
    pub entity_id: Option<String>,

    #[serde(default, alias = "Amount", deserialize_with = "lenient_f64")]
    pub amount: Option<f64>,

    #[serde(default, alias = "CreditDays", deserialize_with = "lenient_i64")]
    pub credit_days: Option<i64>,

    #[serde(default, alias = "DaysInPayment", deserialize_with = "lenient_i64")]
    pub days_in_payment: Option<i64>,

    #[serde(default, alias = "IsDelayed", deserialize_with = "lenient_bool")]
    pub is_delayed: Option<bool>,

    #[serde(default, alias = "OutstandingAmount", deserialize_with = "lenient_f64")]
    pub outstanding_amount: Option<f64>,

    #[serde(default, alias = "InvoiceDate", deserialize_with = "lenient_timestamp")]
    pub invoice_date: Option<DateTime<Utc>>,

    #[serde(default, alias = "DueDate", deserialize_with = "lenient_timestamp")]
    pub due_date: Option<DateTime<Utc>>,

    #[serde(
        default,
        alias = "PaymentDate",
        alias = "PaymentReceiptDate",
        deserialize_with = "lenient_timestamp"
    )]
    pub payment_date: Option<DateTime<Utc>>,
}

impl RawRecord {
    /// Validate into a [`TransactionRecord`].
    ///
    /// Only `entity_id` is required; missing numeric fields become 0.
    pub fn into_record(self, index: usize) -> Result<TransactionRecord, RiskError> {
        let entity_id = self.entity_id.ok_or_else(|| RiskError::MalformedRecord {
            index,
            reason: "missing entity_id".to_string(),
        })?;

        Ok(TransactionRecord {
            entity_id,
            amount: self.amount.unwrap_or(0.0),
            credit_days: self.credit_days.unwrap_or(0),
            days_in_payment: self.days_in_payment,
            is_delayed: self.is_delayed.unwrap_or(false),
            outstanding_amount: self.outstanding_amount.unwrap_or(0.0),
            invoice_date: self.invoice_date,
            due_date: self.due_date,
            payment_date: self.payment_date,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_raw_record_pascal_case() {
        let raw: RawRecord = serde_json::from_value(json!({
            "PartyName": "Acme Traders",
            "Amount": "1500.50",
            "CreditDays": 30,
            "DaysInPayment": 42,
            "IsDelayed": 1,
            "InvoiceDate": "2024-01-10",
            "DueDate": "garbage"
        }))
        .unwrap();

        let record = raw.into_record(0).unwrap();
        assert_eq!(record.entity_id, "Acme Traders");
        assert_eq!(record.amount, 1500.5);
        assert_eq!(record.credit_days, 30);
        assert_eq!(record.days_in_payment, Some(42));
        assert!(record.is_delayed);
        assert!(record.invoice_date.is_some());
        assert!(record.due_date.is_none());
    }

    #[test]
    fn test_missing_optional_fields_default_to_zero() {
        let raw: RawRecord = serde_json::from_value(json!({
            "entity_id": "B",
            "days_in_payment": null
        }))
        .unwrap();

        let record = raw.into_record(4).unwrap();
        assert_eq!(record.amount, 0.0);
        assert_eq!(record.credit_days, 0);
        assert!(!record.is_delayed);
        assert!(!record.is_settled());
    }

    #[test]
    fn test_fractional_days_in_payment_is_unsettled() {
        let raw: RawRecord = serde_json::from_value(json!({
            "PartyName": "C",
            "CreditDays": 30.0,
            "DaysInPayment": 12.5
        }))
        .unwrap();

        let record = raw.into_record(2).unwrap();
        assert_eq!(record.credit_days, 30);
        assert_eq!(record.days_in_payment, None);
        assert!(!record.is_settled());
    }

    #[test]
    fn test_missing_entity_is_malformed() {
        let raw: RawRecord = serde_json::from_value(json!({ "PartyName": "   ", "Amount": 10 })).unwrap();

        match raw.into_record(7) {
            Err(RiskError::MalformedRecord { index, .. }) => assert_eq!(index, 7),
            other => panic!("expected malformed record, got {:?}", other),
        }
    }
}
