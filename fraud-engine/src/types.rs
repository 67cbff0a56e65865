//! Core types for the fraud engine

use crate::classifier::Assessment;
use chrono::NaiveDateTime;
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;

/// Wire format for transaction timestamps
pub const DATE_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

/// Store-assigned transaction identifier
pub type TransactionId = u64;

/// Screening verdict, ordered by severity
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Verdict {
    /// Approved automatically
    Allowed,
    /// Needs a human reviewer
    ManualProcessing,
    /// Blocked
    Prohibited,
}

impl Verdict {
    /// All verdicts in severity order
    pub const ALL: [Verdict; 3] = [
        Verdict::Allowed,
        Verdict::ManualProcessing,
        Verdict::Prohibited,
    ];

    /// Canonical upper-case name
    pub fn as_str(&self) -> &'static str {
        match self {
            Verdict::Allowed => "ALLOWED",
            Verdict::ManualProcessing => "MANUAL_PROCESSING",
            Verdict::Prohibited => "PROHIBITED",
        }
    }

    /// Parse a canonical name, exact match only
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|v| v.as_str() == name)
    }
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// World-region code attached to every transaction
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Region {
    /// East Asia and Pacific
    Eap,
    /// Europe and Central Asia
    Eca,
    /// High-Income countries
    Hic,
    /// Latin America and the Caribbean
    Lac,
    /// Middle East and North Africa
    Mena,
    /// South Asia
    Sa,
    /// Sub-Saharan Africa
    Ssa,
}

impl Region {
    /// The closed set of accepted codes
    pub const ALL: [Region; 7] = [
        Region::Eap,
        Region::Eca,
        Region::Hic,
        Region::Lac,
        Region::Mena,
        Region::Sa,
        Region::Ssa,
    ];

    /// Region code as sent on the wire
    pub fn code(&self) -> &'static str {
        match self {
            Region::Eap => "EAP",
            Region::Eca => "ECA",
            Region::Hic => "HIC",
            Region::Lac => "LAC",
            Region::Mena => "MENA",
            Region::Sa => "SA",
            Region::Ssa => "SSA",
        }
    }

    /// Look up a code, exact match only
    pub fn from_code(code: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|r| r.code() == code)
    }
}

impl fmt::Display for Region {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// Transaction fields as submitted, before validation
///
/// Every field is optional so that a missing field surfaces as a validation
/// error naming it rather than as a deserialization failure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawTransaction {
    /// Amount; accepted as JSON string or number
    #[serde(default, deserialize_with = "string_or_number")]
    pub amount: Option<String>,
    /// Origin IPv4 address
    #[serde(default)]
    pub ip: Option<String>,
    /// Card number
    #[serde(default)]
    pub number: Option<String>,
    /// Region code
    #[serde(default)]
    pub region: Option<String>,
    /// Timestamp, `YYYY-MM-DDTHH:MM:SS`
    #[serde(default)]
    pub date: Option<String>,
}

impl RawTransaction {
    /// Build from string fields
    pub fn new(amount: &str, ip: &str, number: &str, region: &str, date: &str) -> Self {
        Self {
            amount: Some(amount.to_string()),
            ip: Some(ip.to_string()),
            number: Some(number.to_string()),
            region: Some(region.to_string()),
            date: Some(date.to_string()),
        }
    }
}

fn string_or_number<'de, D>(deserializer: D) -> std::result::Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(match value {
        None | Some(serde_json::Value::Null) => None,
        Some(serde_json::Value::String(s)) => Some(s),
        Some(other) => Some(other.to_string()),
    })
}

/// A validated transaction, immutable once built
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    /// Positive amount in currency-agnostic units
    pub amount: u64,
    /// Origin IPv4 address, dotted quad
    pub ip: String,
    /// 16-digit card number
    pub number: String,
    /// Region code
    pub region: Region,
    /// Timestamp, second precision
    pub date: NaiveDateTime,
}

/// A classified transaction as kept by the transaction store
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransactionRecord {
    /// Store-assigned id
    pub id: TransactionId,
    /// Validated fields
    pub transaction: Transaction,
    /// Verdict and reasons, fixed at evaluation time
    pub assessment: Assessment,
    /// Reviewer-confirmed outcome, set at most once
    pub feedback: Option<Verdict>,
}

impl TransactionRecord {
    /// Recorded verdict
    pub fn verdict(&self) -> Verdict {
        self.assessment.verdict
    }

    /// Presentation view of this record
    pub fn view(&self) -> TransactionView {
        TransactionView::from(self)
    }
}

/// Presentation form of a stored transaction
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionView {
    /// Transaction id
    pub transaction_id: TransactionId,
    /// Amount
    pub amount: u64,
    /// Origin IP
    pub ip: String,
    /// Card number
    pub number: String,
    /// Region code
    pub region: Region,
    /// Timestamp, `YYYY-MM-DDTHH:MM:SS`
    pub date: String,
    /// Recorded verdict
    pub result: Verdict,
    /// Confirmed outcome, empty when none was given
    pub feedback: String,
}

impl From<&TransactionRecord> for TransactionView {
    fn from(record: &TransactionRecord) -> Self {
        let tx = &record.transaction;
        Self {
            transaction_id: record.id,
            amount: tx.amount,
            ip: tx.ip.clone(),
            number: tx.number.clone(),
            region: tx.region,
            date: tx.date.format(DATE_FORMAT).to_string(),
            result: record.verdict(),
            feedback: record
                .feedback
                .map(|v| v.as_str().to_string())
                .unwrap_or_default(),
        }
    }
}
