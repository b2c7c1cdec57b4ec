//! Engine configuration
//!
//! All tunables with their production defaults. The whole struct derives
//! serde so deployments can override any subset from a JSON file.

use crate::{EngineError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Engine configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Total ring size; usable capacity is one less
    pub queue_capacity: usize,
    /// Hours between single-step priority promotions
    pub escalation_cycle_hours: i64,
    /// Absolute age forcing any ticket to Critical
    pub safety_net_hours: i64,
    /// Issue-description prefix length compared for duplicates
    pub duplicate_prefix_len: usize,
    /// Days to look back in the resolved archive for duplicates
    pub duplicate_lookback_days: i64,
    /// Maximum prior tickets returned per customer
    pub max_customer_history: usize,
    /// Warn when the queue reaches this percentage of capacity
    pub capacity_warning_pct: f64,
    /// Persist the queue snapshot every N cycles
    pub persist_every_cycles: u64,
    /// Log a statistics line every N cycles
    pub stats_every_cycles: u64,
    pub paths: StorePaths,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            queue_capacity: 10_000,
            escalation_cycle_hours: 24,
            safety_net_hours: 72,
            duplicate_prefix_len: 30,
            duplicate_lookback_days: 7,
            max_customer_history: 10,
            capacity_warning_pct: 80.0,
            persist_every_cycles: 4,
            stats_every_cycles: 30,
            paths: StorePaths::default(),
        }
    }
}

impl EngineConfig {
    /// Load overrides from a JSON file; absent keys keep their defaults.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        serde_json::from_str(&content).map_err(|e| EngineError::Config(e.to_string()))
    }
}

/// Locations of the durable stores, inbound files, and event logs.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct StorePaths {
    pub active_store: PathBuf,
    pub resolved_archive: PathBuf,
    pub intake_file: PathBuf,
    pub command_file: PathBuf,
    pub overflow_log: PathBuf,
    pub error_log: PathBuf,
    pub escalation_log: PathBuf,
    pub duplicate_log: PathBuf,
}

impl Default for StorePaths {
    fn default() -> Self {
        Self {
            active_store: PathBuf::from("customer_support_tickets_updated.csv"),
            resolved_archive: PathBuf::from("resolved_tickets.csv"),
            intake_file: PathBuf::from("pending_tickets.csv"),
            command_file: PathBuf::from("admin_commands.txt"),
            overflow_log: PathBuf::from("overflow_log.txt"),
            error_log: PathBuf::from("error_log.txt"),
            escalation_log: PathBuf::from("escalation_log.txt"),
            duplicate_log: PathBuf::from("duplicate_tickets.log"),
        }
    }
}

impl StorePaths {
    /// Default file names rooted under a data directory.
    pub fn rooted(dir: impl AsRef<Path>) -> Self {
        let dir = dir.as_ref();
        let defaults = Self::default();
        Self {
            active_store: dir.join(defaults.active_store),
            resolved_archive: dir.join(defaults.resolved_archive),
            intake_file: dir.join(defaults.intake_file),
            command_file: dir.join(defaults.command_file),
            overflow_log: dir.join(defaults.overflow_log),
            error_log: dir.join(defaults.error_log),
            escalation_log: dir.join(defaults.escalation_log),
            duplicate_log: dir.join(defaults.duplicate_log),
        }
    }
}
