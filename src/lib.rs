//! Ticket Queue Engine
//!
//! Bounded, fairness-preserving queue of customer support tickets with:
//! - FIFO processing over a fixed-capacity circular queue
//! - Keyword-driven auto-priority classification
//! - Age-based escalation with a 72-hour Critical safety net
//! - Duplicate suppression against the live queue and recent resolved history
//! - Durable CSV stores for active and resolved tickets
//!
//! Priority never affects queue position: insertion order determines
//! resolution order, and the escalation sweep supplies urgency handling
//! orthogonally. This prevents starvation of low-priority tickets.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

pub mod audit;
pub mod classify;
pub mod config;
pub mod duplicate;
pub mod engine;
pub mod escalate;
pub mod history;
pub mod queue;
pub mod record;
pub mod stats;
pub mod store;
pub mod validate;

pub use config::{EngineConfig, StorePaths};
pub use engine::Engine;
pub use queue::TicketQueue;
pub use stats::QueueStats;
pub use store::{ResolvedTicket, TicketStore};

// =============================================================================
// Core Types
// =============================================================================

/// Ticket priority, ordered Low < Medium < High < Critical.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub enum Priority {
    #[default]
    Low,
    Medium,
    High,
    Critical,
}

impl Priority {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "Low",
            Self::Medium => "Medium",
            Self::High => "High",
            Self::Critical => "Critical",
        }
    }

    /// Parse the canonical store spelling. Returns `None` for anything else;
    /// the loader auto-corrects unrecognized priorities to `Low`.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "Low" => Some(Self::Low),
            "Medium" => Some(Self::Medium),
            "High" => Some(Self::High),
            "Critical" => Some(Self::Critical),
            _ => None,
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A customer-reported issue tracked through intake, queueing, and resolution.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Ticket {
    pub ticket_id: u32,
    pub customer_name: String,
    pub email: String,
    pub product: String,
    pub purchase_date: String,
    pub issue_description: String,
    pub priority: Priority,
    pub entered_queue_at: DateTime<Utc>,
}

impl Ticket {
    /// Check every field rule. Returns the rejection reason on failure;
    /// callers attach line context when logging.
    pub fn validate(&self) -> std::result::Result<(), String> {
        if !validate::ticket_id_ok(self.ticket_id) {
            return Err(format!("invalid ticket ID {}", self.ticket_id));
        }
        if !validate::email_ok(&self.email) {
            return Err(format!("invalid email '{}'", self.email));
        }
        if !validate::bounded_ok(&self.customer_name, 2, validate::MAX_NAME_LEN) {
            return Err("invalid customer name".to_string());
        }
        if !validate::bounded_ok(&self.product, 1, validate::MAX_PRODUCT_LEN) {
            return Err("invalid product name".to_string());
        }
        if self.purchase_date.len() > validate::MAX_PURCHASE_DATE_LEN {
            return Err("purchase date too long".to_string());
        }
        if !validate::bounded_ok(&self.issue_description, 1, validate::MAX_ISSUE_LEN) {
            return Err("invalid issue description".to_string());
        }
        Ok(())
    }

    /// Hours this ticket has been waiting in the queue.
    pub fn age_hours(&self, now: DateTime<Utc>) -> f64 {
        (now - self.entered_queue_at).num_seconds() as f64 / 3600.0
    }
}

// =============================================================================
// Error Types
// =============================================================================

/// Engine error type
#[derive(Error, Debug)]
pub enum EngineError {
    /// Queue at usable capacity; the ticket is dropped and logged, not fatal
    #[error("queue full: ticket #{ticket_id} rejected")]
    QueueFull { ticket_id: u32 },

    /// Dequeue from an empty queue
    #[error("queue empty")]
    QueueEmpty,

    /// Record codec rejected a row
    #[error("malformed record: {0}")]
    MalformedRecord(String),

    /// A store row failed validation, with line context
    #[error("line {line}: {reason}")]
    InvalidRecord { line: usize, reason: String },

    /// Configuration error
    #[error("config error: {0}")]
    Config(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for the ticket engine
pub type Result<T> = std::result::Result<T, EngineError>;
