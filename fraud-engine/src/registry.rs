//! Stolen-card and suspicious-IP registries
//!
//! The engine only queries registries through [`RegistryLookup`]. The
//! in-memory implementation also carries the administrative add/remove/list
//! operations a hosting service needs to manage the lists.

use crate::classifier::Reason;
use crate::types::Transaction;
use crate::validation::{validate_card_number, validate_ip};
use crate::{Error, Result};
use async_trait::async_trait;
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::{debug, info};

/// Read-only view of the blocklists consulted during evaluation
#[async_trait]
pub trait RegistryLookup: Send + Sync {
    /// Whether the card number is registered as stolen
    async fn is_stolen_card(&self, number: &str) -> Result<bool>;

    /// Whether the IP is registered as suspicious
    async fn is_suspicious_ip(&self, ip: &str) -> Result<bool>;
}

/// Query both registries for a transaction
///
/// The two lookups run concurrently. A failed lookup fails the whole check.
pub async fn registry_reasons(
    registry: &dyn RegistryLookup,
    transaction: &Transaction,
) -> Result<Vec<Reason>> {
    let (stolen, suspicious) = tokio::try_join!(
        registry.is_stolen_card(&transaction.number),
        registry.is_suspicious_ip(&transaction.ip),
    )?;

    let mut reasons = Vec::new();
    if stolen {
        debug!("Card {} is registered as stolen", transaction.number);
        reasons.push(Reason::StolenCard);
    }
    if suspicious {
        debug!("IP {} is registered as suspicious", transaction.ip);
        reasons.push(Reason::SuspiciousIp);
    }
    Ok(reasons)
}

/// One registry entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistryEntry {
    /// Entry id, unique within the registry
    pub id: u64,
    /// Card number or IP
    pub value: String,
}

/// Which list an entry belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegistryKind {
    /// Stolen card numbers
    StolenCard,
    /// Suspicious IPs
    SuspiciousIp,
}

impl RegistryKind {
    fn label(&self) -> &'static str {
        match self {
            RegistryKind::StolenCard => "stolen card",
            RegistryKind::SuspiciousIp => "suspicious IP",
        }
    }

    fn validate(&self, value: &str) -> Result<()> {
        match self {
            RegistryKind::StolenCard => validate_card_number(value),
            RegistryKind::SuspiciousIp => validate_ip(value),
        }
    }
}

/// Concurrent in-memory registries
pub struct InMemoryRegistry {
    // Map: card number -> entry id
    stolen_cards: DashMap<String, u64>,
    // Map: ip -> entry id
    suspicious_ips: DashMap<String, u64>,
    next_id: AtomicU64,
}

impl InMemoryRegistry {
    /// Create empty registries
    pub fn new() -> Self {
        Self {
            stolen_cards: DashMap::new(),
            suspicious_ips: DashMap::new(),
            next_id: AtomicU64::new(1),
        }
    }

    fn list_for(&self, kind: RegistryKind) -> &DashMap<String, u64> {
        match kind {
            RegistryKind::StolenCard => &self.stolen_cards,
            RegistryKind::SuspiciousIp => &self.suspicious_ips,
        }
    }

    /// Register a value; duplicates are a conflict
    pub fn add(&self, kind: RegistryKind, value: &str) -> Result<RegistryEntry> {
        kind.validate(value)?;
        let list = self.list_for(kind);
        match list.entry(value.to_string()) {
            dashmap::mapref::entry::Entry::Occupied(_) => Err(Error::DuplicateRegistryEntry(
                format!("{} {}", kind.label(), value),
            )),
            dashmap::mapref::entry::Entry::Vacant(slot) => {
                let id = self.next_id.fetch_add(1, Ordering::Relaxed);
                slot.insert(id);
                info!("Registered {} {} (id {})", kind.label(), value, id);
                Ok(RegistryEntry {
                    id,
                    value: value.to_string(),
                })
            }
        }
    }

    /// Remove a value; unknown values are not-found
    pub fn remove(&self, kind: RegistryKind, value: &str) -> Result<RegistryEntry> {
        kind.validate(value)?;
        let (value, id) = self
            .list_for(kind)
            .remove(value)
            .ok_or_else(|| Error::RegistryEntryNotFound(format!("{} {}", kind.label(), value)))?;
        info!("Removed {} {}", kind.label(), value);
        Ok(RegistryEntry { id, value })
    }

    /// Entries ordered by id
    pub fn list(&self, kind: RegistryKind) -> Vec<RegistryEntry> {
        let mut entries: Vec<RegistryEntry> = self
            .list_for(kind)
            .iter()
            .map(|e| RegistryEntry {
                id: *e.value(),
                value: e.key().clone(),
            })
            .collect();
        entries.sort_by_key(|e| e.id);
        entries
    }

    /// Shorthand for [`InMemoryRegistry::add`] on the stolen-card list
    pub fn add_stolen_card(&self, number: &str) -> Result<RegistryEntry> {
        self.add(RegistryKind::StolenCard, number)
    }

    /// Shorthand for [`InMemoryRegistry::add`] on the suspicious-IP list
    pub fn add_suspicious_ip(&self, ip: &str) -> Result<RegistryEntry> {
        self.add(RegistryKind::SuspiciousIp, ip)
    }
}

impl Default for InMemoryRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl RegistryLookup for InMemoryRegistry {
    async fn is_stolen_card(&self, number: &str) -> Result<bool> {
        Ok(self.stolen_cards.contains_key(number))
    }

    async fn is_suspicious_ip(&self, ip: &str) -> Result<bool> {
        Ok(self.suspicious_ips.contains_key(ip))
    }
}
