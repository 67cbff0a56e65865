//! Risk classification
//!
//! Combines the amount-vs-limits comparison with registry hits and history
//! correlation signals. Each signal is a [`Reason`] carrying its own severity;
//! the verdict is the maximum severity seen.

use crate::limits::CardLimits;
use crate::types::{Transaction, Verdict};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Presentation text for an `ALLOWED` verdict
pub const WITHIN_LIMIT_INFO: &str = "amount within limit";

/// A single signal contributing to a verdict
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Reason {
    /// Amount above the card's allow bound
    AllowBoundExceeded,
    /// Amount above the card's manual bound
    ManualBoundExceeded,
    /// Card is registered as stolen
    StolenCard,
    /// Origin IP is registered as suspicious
    SuspiciousIp,
    /// Two regions used within the correlation window
    MultipleRegions,
    /// Three or more regions used within the correlation window
    TooManyRegions,
    /// Two IPs used within the correlation window
    MultipleIps,
    /// Three or more IPs used within the correlation window
    TooManyIps,
}

impl Reason {
    /// Verdict this reason pushes the transaction to
    pub fn severity(&self) -> Verdict {
        match self {
            Reason::AllowBoundExceeded | Reason::MultipleRegions | Reason::MultipleIps => {
                Verdict::ManualProcessing
            }
            Reason::ManualBoundExceeded
            | Reason::StolenCard
            | Reason::SuspiciousIp
            | Reason::TooManyRegions
            | Reason::TooManyIps => Verdict::Prohibited,
        }
    }

    /// Short code shown to reviewers
    pub fn code(&self) -> &'static str {
        match self {
            Reason::AllowBoundExceeded | Reason::ManualBoundExceeded => "amount",
            Reason::StolenCard => "card-number",
            Reason::SuspiciousIp => "ip",
            Reason::MultipleRegions | Reason::TooManyRegions => "region-correlation",
            Reason::MultipleIps | Reason::TooManyIps => "ip-correlation",
        }
    }
}

/// Verdict plus the reasons that justify it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Assessment {
    /// Final verdict
    pub verdict: Verdict,
    /// Reasons whose severity equals the verdict; empty for `ALLOWED`
    pub reasons: BTreeSet<Reason>,
}

impl Assessment {
    /// Distinct reason codes, sorted and comma-joined
    pub fn info(&self) -> String {
        if self.reasons.is_empty() {
            return WITHIN_LIMIT_INFO.to_string();
        }
        let codes: BTreeSet<&str> = self.reasons.iter().map(Reason::code).collect();
        codes.into_iter().collect::<Vec<_>>().join(", ")
    }
}

/// Amount-only verdict against a card's limits
pub fn amount_reason(amount: u64, limits: &CardLimits) -> Option<Reason> {
    if amount <= limits.allow_bound {
        None
    } else if amount <= limits.manual_bound {
        Some(Reason::AllowBoundExceeded)
    } else {
        Some(Reason::ManualBoundExceeded)
    }
}

/// Classify a transaction
///
/// Pure: the verdict depends only on the arguments. `signals` holds registry
/// and correlation reasons in any order, duplicates allowed.
pub fn classify(transaction: &Transaction, signals: &[Reason], limits: &CardLimits) -> Assessment {
    let mut all: BTreeSet<Reason> = signals.iter().copied().collect();
    all.extend(amount_reason(transaction.amount, limits));

    let verdict = all
        .iter()
        .map(Reason::severity)
        .max()
        .unwrap_or(Verdict::Allowed);

    let reasons = if verdict == Verdict::Allowed {
        BTreeSet::new()
    } else {
        all.into_iter().filter(|r| r.severity() == verdict).collect()
    };

    Assessment { verdict, reasons }
}
