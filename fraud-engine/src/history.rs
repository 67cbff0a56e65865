//! History correlation
//!
//! Looks at the card's transactions inside the trailing window that ends at
//! the incoming transaction and counts distinct regions and IPs, the incoming
//! transaction included.

use crate::classifier::Reason;
use crate::config::CorrelationConfig;
use crate::types::{Region, Transaction, TransactionRecord};
use crate::{Error, Result};
use async_trait::async_trait;
use chrono::{Duration, NaiveDateTime};
use std::collections::HashSet;

/// Source of prior transactions for a card
#[async_trait]
pub trait TransactionHistory: Send + Sync {
    /// Transactions for `number` with `since <= date <= before`
    async fn fetch_card_history(
        &self,
        number: &str,
        since: NaiveDateTime,
        before: NaiveDateTime,
    ) -> Result<Vec<TransactionRecord>>;
}

/// Distinct regions and IPs seen in the window
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CorrelationSignal {
    /// Unique regions, current transaction included
    pub distinct_regions: usize,
    /// Unique IPs, current transaction included
    pub distinct_ips: usize,
}

/// History correlator
pub struct HistoryCorrelator {
    config: CorrelationConfig,
}

impl HistoryCorrelator {
    /// Create a correlator
    pub fn new(config: CorrelationConfig) -> Self {
        Self { config }
    }

    /// Window length
    pub fn window(&self) -> Result<Duration> {
        Duration::try_seconds(self.config.window_seconds).ok_or_else(|| {
            Error::InvalidConfig(format!(
                "correlation window of {}s is out of range",
                self.config.window_seconds
            ))
        })
    }

    /// First instant of the window ending at `date`
    pub fn window_start(&self, date: NaiveDateTime) -> Result<NaiveDateTime> {
        let window = self.window()?;
        date.checked_sub_signed(window).ok_or_else(|| {
            Error::validation("date", format!("{} is too early to correlate", date))
        })
    }

    /// Fetch the window for `transaction` and turn it into reasons
    pub async fn correlate(
        &self,
        history: &dyn TransactionHistory,
        transaction: &Transaction,
    ) -> Result<Vec<Reason>> {
        let since = self.window_start(transaction.date)?;
        let prior = history
            .fetch_card_history(&transaction.number, since, transaction.date)
            .await?;
        let signal = self.signal(transaction, &prior);
        Ok(self.reasons(signal))
    }

    /// Count distinct regions and IPs
    ///
    /// Records outside the window or for other cards are ignored, so callers
    /// may pass a superset. A window reaching past the earliest representable
    /// date is unbounded below.
    pub fn signal(&self, transaction: &Transaction, prior: &[TransactionRecord]) -> CorrelationSignal {
        let since = self
            .window_start(transaction.date)
            .unwrap_or(NaiveDateTime::MIN);
        let mut regions: HashSet<Region> = HashSet::from([transaction.region]);
        let mut ips: HashSet<&str> = HashSet::from([transaction.ip.as_str()]);

        for record in prior {
            let tx = &record.transaction;
            if tx.number != transaction.number || tx.date < since || tx.date > transaction.date {
                continue;
            }
            regions.insert(tx.region);
            ips.insert(tx.ip.as_str());
        }

        CorrelationSignal {
            distinct_regions: regions.len(),
            distinct_ips: ips.len(),
        }
    }

    /// Apply thresholds independently to regions and IPs
    pub fn reasons(&self, signal: CorrelationSignal) -> Vec<Reason> {
        let mut reasons = Vec::new();
        if let Some(r) = self.band(
            signal.distinct_regions,
            Reason::MultipleRegions,
            Reason::TooManyRegions,
        ) {
            reasons.push(r);
        }
        if let Some(r) = self.band(signal.distinct_ips, Reason::MultipleIps, Reason::TooManyIps) {
            reasons.push(r);
        }
        reasons
    }

    fn band(&self, count: usize, review: Reason, prohibit: Reason) -> Option<Reason> {
        if count >= self.config.prohibit_threshold {
            Some(prohibit)
        } else if count >= self.config.review_threshold {
            Some(review)
        } else {
            None
        }
    }
}
