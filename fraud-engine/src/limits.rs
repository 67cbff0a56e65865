//! Per-card adaptive limits
//!
//! Each card gets its own `RwLock` inside a concurrent map. Classification
//! copies a snapshot under a read guard; feedback holds the write guard for
//! the whole read-modify-write so adjustments to one card are serialized
//! while other cards proceed independently.

use crate::config::LimitsConfig;
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::{OwnedRwLockWriteGuard, RwLock};
use tracing::debug;

/// Allow/manual amount bounds for one card
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CardLimits {
    /// Upper bound for automatic approval
    pub allow_bound: u64,
    /// Upper bound for manual review, always above `allow_bound`
    pub manual_bound: u64,
}

impl CardLimits {
    /// Create limits
    pub fn new(allow_bound: u64, manual_bound: u64) -> Self {
        Self {
            allow_bound,
            manual_bound,
        }
    }

    /// `allow_bound < manual_bound`
    pub fn is_consistent(&self) -> bool {
        self.allow_bound < self.manual_bound
    }
}

impl From<&LimitsConfig> for CardLimits {
    fn from(config: &LimitsConfig) -> Self {
        Self::new(config.default_allow_bound, config.default_manual_bound)
    }
}

/// Exclusive handle on one card's limits
pub type LimitsGuard = OwnedRwLockWriteGuard<CardLimits>;

/// Keyed store of per-card limits with lazy default insertion
pub struct LimitStore {
    defaults: CardLimits,
    // Map: card number -> limits
    cards: DashMap<String, Arc<RwLock<CardLimits>>>,
}

impl LimitStore {
    /// Create a store handing out `defaults` for unseen cards
    pub fn new(defaults: CardLimits) -> Self {
        Self {
            defaults,
            cards: DashMap::new(),
        }
    }

    /// Limits given to a card on first use
    pub fn defaults(&self) -> CardLimits {
        self.defaults
    }

    fn slot(&self, number: &str) -> Arc<RwLock<CardLimits>> {
        self.cards
            .entry(number.to_string())
            .or_insert_with(|| {
                debug!("Initialising limits for card {} with defaults", number);
                Arc::new(RwLock::new(self.defaults))
            })
            .value()
            .clone()
    }

    /// Current limits for a card, creating defaults on first use
    pub async fn snapshot(&self, number: &str) -> CardLimits {
        let slot = self.slot(number);
        let limits = *slot.read().await;
        limits
    }

    /// Limits for a card without creating an entry
    pub async fn peek(&self, number: &str) -> CardLimits {
        let Some(slot) = self.cards.get(number).map(|entry| entry.value().clone()) else {
            return self.defaults;
        };
        let limits = *slot.read().await;
        limits
    }

    /// Lock a card's limits for a read-modify-write
    ///
    /// Writes through the guard are visible to later snapshots once it drops.
    pub async fn lock(&self, number: &str) -> LimitsGuard {
        self.slot(number).write_owned().await
    }

    /// Number of cards with materialised limits
    pub fn tracked_cards(&self) -> usize {
        self.cards.len()
    }
}
