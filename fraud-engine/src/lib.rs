//! Fraud screening engine for card payments
//!
//! Classifies card transactions as allowed, held for manual review, or
//! prohibited, and adapts each card's amount thresholds from reviewer
//! feedback.
//!
//! # Pipeline
//!
//! - **Validation**: amount, IP, card number (Luhn), region, timestamp
//! - **Registries**: stolen cards and suspicious IPs
//! - **Correlation**: distinct regions and IPs in the trailing hour
//! - **Classification**: maximum severity over all signals
//! - **Feedback**: confirmed outcomes move the card's limits
//!
//! # Invariants
//!
//! - `0 <= allow_bound < manual_bound` for every card, after every adjustment
//! - A stored verdict never changes; feedback is recorded once beside it
//! - Adjustments to one card are serialized

#![forbid(unsafe_code)]
#![warn(missing_docs, rust_2018_idioms)]

pub mod classifier;
pub mod config;
pub mod engine;
pub mod error;
pub mod feedback;
pub mod history;
pub mod limits;
pub mod registry;
pub mod store;
pub mod types;
pub mod validation;

pub use classifier::{classify, Assessment, Reason};
pub use config::EngineConfig;
pub use engine::{Evaluation, FraudEngine};
pub use error::{Error, ErrorKind, Result};
pub use history::{HistoryCorrelator, TransactionHistory};
pub use limits::{CardLimits, LimitStore};
pub use registry::{InMemoryRegistry, RegistryKind, RegistryLookup};
pub use store::{InMemoryTransactionStore, TransactionStore};
pub use types::*;
