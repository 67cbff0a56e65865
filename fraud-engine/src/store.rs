//! Transaction persistence seam

use crate::classifier::Assessment;
use crate::history::TransactionHistory;
use crate::types::{Transaction, TransactionId, TransactionRecord, Verdict};
use crate::{Error, Result};
use async_trait::async_trait;
use chrono::NaiveDateTime;
use parking_lot::RwLock;
use std::collections::BTreeMap;

/// Append-mostly transaction table
#[async_trait]
pub trait TransactionStore: TransactionHistory {
    /// This store as a history source
    fn as_history(&self) -> &dyn TransactionHistory;

    /// Persist a classified transaction and assign its id
    async fn insert(&self, transaction: Transaction, assessment: Assessment) -> Result<TransactionRecord>;

    /// Look up by id
    async fn get(&self, id: TransactionId) -> Result<Option<TransactionRecord>>;

    /// Set the confirmed outcome; fails if one is already recorded
    async fn record_feedback(&self, id: TransactionId, feedback: Verdict) -> Result<TransactionRecord>;

    /// All transactions for a card, ordered by id
    async fn card_transactions(&self, number: &str) -> Result<Vec<TransactionRecord>>;

    /// Every transaction, ordered by id
    async fn all(&self) -> Result<Vec<TransactionRecord>>;
}

/// In-memory transaction table
pub struct InMemoryTransactionStore {
    // Map: id -> record
    records: RwLock<BTreeMap<TransactionId, TransactionRecord>>,
}

impl InMemoryTransactionStore {
    /// Create an empty table
    pub fn new() -> Self {
        Self {
            records: RwLock::new(BTreeMap::new()),
        }
    }

    /// Number of stored transactions
    pub fn len(&self) -> usize {
        self.records.read().len()
    }

    /// True when nothing is stored
    pub fn is_empty(&self) -> bool {
        self.records.read().is_empty()
    }
}

impl Default for InMemoryTransactionStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl TransactionHistory for InMemoryTransactionStore {
    async fn fetch_card_history(
        &self,
        number: &str,
        since: NaiveDateTime,
        before: NaiveDateTime,
    ) -> Result<Vec<TransactionRecord>> {
        Ok(self
            .records
            .read()
            .values()
            .filter(|r| {
                r.transaction.number == number
                    && r.transaction.date >= since
                    && r.transaction.date <= before
            })
            .cloned()
            .collect())
    }
}

#[async_trait]
impl TransactionStore for InMemoryTransactionStore {
    fn as_history(&self) -> &dyn TransactionHistory {
        self
    }

    async fn insert(&self, transaction: Transaction, assessment: Assessment) -> Result<TransactionRecord> {
        let mut records = self.records.write();
        let id = records.keys().next_back().map_or(1, |last| last + 1);
        let record = TransactionRecord {
            id,
            transaction,
            assessment,
            feedback: None,
        };
        records.insert(id, record.clone());
        Ok(record)
    }

    async fn get(&self, id: TransactionId) -> Result<Option<TransactionRecord>> {
        Ok(self.records.read().get(&id).cloned())
    }

    async fn record_feedback(&self, id: TransactionId, feedback: Verdict) -> Result<TransactionRecord> {
        let mut records = self.records.write();
        let record = records.get_mut(&id).ok_or(Error::TransactionNotFound(id))?;
        if record.feedback.is_some() {
            return Err(Error::FeedbackAlreadyRecorded(id));
        }
        record.feedback = Some(feedback);
        Ok(record.clone())
    }

    async fn card_transactions(&self, number: &str) -> Result<Vec<TransactionRecord>> {
        Ok(self
            .records
            .read()
            .values()
            .filter(|r| r.transaction.number == number)
            .cloned()
            .collect())
    }

    async fn all(&self) -> Result<Vec<TransactionRecord>> {
        Ok(self.records.read().values().cloned().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Region;
    use chrono::NaiveDate;
    use std::collections::BTreeSet;

    fn tx(number: &str, minute: u32) -> Transaction {
        Transaction {
            amount: 100,
            ip: "127.0.0.1".to_string(),
            number: number.to_string(),
            region: Region::Eca,
            date: NaiveDate::from_ymd_opt(2022, 10, 13)
                .unwrap()
                .and_hms_opt(12, minute, 0)
                .unwrap(),
        }
    }

    fn allowed() -> Assessment {
        Assessment {
            verdict: Verdict::Allowed,
            reasons: BTreeSet::new(),
        }
    }

    #[tokio::test]
    async fn test_ids_are_sequential() {
        let store = InMemoryTransactionStore::new();
        let a = store.insert(tx("4000008449430003", 0), allowed()).await.unwrap();
        let b = store.insert(tx("4000008449430003", 1), allowed()).await.unwrap();
        assert_eq!((a.id, b.id), (1, 2));
        assert_eq!(store.len(), 2);
    }

    #[tokio::test]
    async fn test_feedback_is_write_once() {
        let store = InMemoryTransactionStore::new();
        let record = store.insert(tx("4000008449430003", 0), allowed()).await.unwrap();

        let updated = store
            .record_feedback(record.id, Verdict::Prohibited)
            .await
            .unwrap();
        assert_eq!(updated.feedback, Some(Verdict::Prohibited));

        let second = store.record_feedback(record.id, Verdict::ManualProcessing).await;
        assert!(matches!(second, Err(Error::FeedbackAlreadyRecorded(1))));

        let missing = store.record_feedback(99, Verdict::Allowed).await;
        assert!(matches!(missing, Err(Error::TransactionNotFound(99))));
    }

    #[tokio::test]
    async fn test_history_filters_card_and_window() {
        let store = InMemoryTransactionStore::new();
        store.insert(tx("4000008449430003", 5), allowed()).await.unwrap();
        store.insert(tx("4000008449430003", 30), allowed()).await.unwrap();
        store.insert(tx("3151853279026036", 20), allowed()).await.unwrap();

        let since = tx("", 10).date;
        let before = tx("", 30).date;
        let window = store
            .fetch_card_history("4000008449430003", since, before)
            .await
            .unwrap();
        assert_eq!(window.len(), 1);
        assert_eq!(window[0].id, 2);

        assert_eq!(store.card_transactions("4000008449430003").await.unwrap().len(), 2);
    }
}
