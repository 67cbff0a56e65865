//! Evaluation and correction entry points
//!
//! [`FraudEngine::evaluate`] runs validation, the registry and history reads
//! (concurrently), classification against the card's limits snapshot, and
//! persists the result. [`FraudEngine::correct`] applies reviewer feedback
//! under the card's exclusive limits lock.

use crate::classifier::{classify, Assessment};
use crate::config::EngineConfig;
use crate::feedback::adjust_limits;
use crate::history::HistoryCorrelator;
use crate::limits::{CardLimits, LimitStore};
use crate::registry::{registry_reasons, RegistryLookup};
use crate::store::TransactionStore;
use crate::types::{RawTransaction, TransactionId, TransactionRecord, TransactionView, Verdict};
use crate::validation::{parse_verdict, validate_card_number, validate_transaction};
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Outcome of an evaluation as returned to the submitter
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Evaluation {
    /// Id under which the transaction was stored
    #[serde(rename = "transactionId")]
    pub transaction_id: TransactionId,
    /// Verdict
    pub result: Verdict,
    /// Sorted, comma-joined reason codes
    pub info: String,
}

/// Transaction risk-evaluation engine
pub struct FraudEngine {
    registry: Arc<dyn RegistryLookup>,
    store: Arc<dyn TransactionStore>,
    limits: LimitStore,
    correlator: HistoryCorrelator,
}

impl FraudEngine {
    /// Build an engine over the given collaborators
    pub fn new(
        config: EngineConfig,
        registry: Arc<dyn RegistryLookup>,
        store: Arc<dyn TransactionStore>,
    ) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            registry,
            store,
            limits: LimitStore::new(CardLimits::from(&config.limits)),
            correlator: HistoryCorrelator::new(config.correlation),
        })
    }

    /// Validate, classify and persist a submitted transaction
    pub async fn evaluate(&self, raw: &RawTransaction) -> Result<Evaluation> {
        let transaction = validate_transaction(raw).map_err(|e| {
            debug!("Rejected submission: {}", e);
            e
        })?;

        let (registry_hits, correlation) = tokio::try_join!(
            registry_reasons(self.registry.as_ref(), &transaction),
            self.correlator.correlate(self.store.as_history(), &transaction),
        )
        .map_err(|e| {
            warn!("Evaluation for card {} failed closed: {}", transaction.number, e);
            e
        })?;

        let limits = self.limits.snapshot(&transaction.number).await;
        let mut signals = registry_hits;
        signals.extend(correlation);
        let assessment = classify(&transaction, &signals, &limits);

        let record = self.store.insert(transaction, assessment).await?;
        let evaluation = Evaluation {
            transaction_id: record.id,
            result: record.verdict(),
            info: record.assessment.info(),
        };
        info!(
            "Transaction {} for card {} amount {}: {} ({})",
            record.id, record.transaction.number, record.transaction.amount, evaluation.result, evaluation.info
        );
        Ok(evaluation)
    }

    /// Apply reviewer feedback to a stored transaction
    pub async fn correct(&self, transaction_id: TransactionId, feedback: &str) -> Result<TransactionView> {
        let confirmed = parse_verdict(feedback)?;
        let number = self
            .store
            .get(transaction_id)
            .await?
            .ok_or(Error::TransactionNotFound(transaction_id))?
            .transaction
            .number;

        let mut guard = self.limits.lock(&number).await;

        // Re-read under the card lock so a concurrent correction is seen.
        let record = self
            .store
            .get(transaction_id)
            .await?
            .ok_or(Error::TransactionNotFound(transaction_id))?;
        if record.feedback.is_some() {
            return Err(Error::FeedbackAlreadyRecorded(transaction_id));
        }

        let adjusted = adjust_limits(
            transaction_id,
            record.verdict(),
            confirmed,
            record.transaction.amount,
            *guard,
        )?;
        let updated = self.store.record_feedback(transaction_id, confirmed).await?;

        info!(
            "Feedback {} on transaction {} ({}): card {} limits {}/{} -> {}/{}",
            confirmed,
            transaction_id,
            record.verdict(),
            number,
            guard.allow_bound,
            guard.manual_bound,
            adjusted.allow_bound,
            adjusted.manual_bound
        );
        *guard = adjusted;
        Ok(updated.view())
    }

    /// All transactions for a card, ordered by id
    pub async fn card_history(&self, number: &str) -> Result<Vec<TransactionView>> {
        validate_card_number(number)?;
        let records = self.store.card_transactions(number).await?;
        if records.is_empty() {
            return Err(Error::CardNotFound(number.to_string()));
        }
        Ok(records.iter().map(TransactionRecord::view).collect())
    }

    /// Every stored transaction, ordered by id
    pub async fn list_transactions(&self) -> Result<Vec<TransactionView>> {
        let records = self.store.all().await?;
        Ok(records.iter().map(TransactionRecord::view).collect())
    }

    /// Current limits for a card; defaults when the card is unseen
    pub async fn card_limits(&self, number: &str) -> Result<CardLimits> {
        validate_card_number(number)?;
        Ok(self.limits.peek(number).await)
    }

    /// Classification of a stored transaction
    pub async fn assessment(&self, transaction_id: TransactionId) -> Result<Assessment> {
        self.store
            .get(transaction_id)
            .await?
            .map(|r| r.assessment)
            .ok_or(Error::TransactionNotFound(transaction_id))
    }
}
