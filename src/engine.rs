//! Ticket Queue Engine
//!
//! Single logical thread of control: an external driver invokes
//! [`Engine::run_cycle`], which performs intake, escalation, command
//! check, and periodic persistence in that order with nothing suspending
//! mid-step. The engine is the only writer to the durable stores;
//! external producers append to the intake and command files, which are
//! consumed read-then-truncate so a writer appending mid-read loses at
//! most one message and never corrupts state.

use crate::audit::EventLogs;
use crate::classify::classify;
use crate::config::EngineConfig;
use crate::duplicate::DuplicateDetector;
use crate::escalate::EscalationPolicy;
use crate::history;
use crate::queue::TicketQueue;
use crate::record::split_record;
use crate::stats::QueueStats;
use crate::store::{ResolvedTicket, TicketStore};
use crate::{EngineError, Result, Ticket};
use chrono::Utc;
use std::fs;
use std::io::ErrorKind;
use tracing::{debug, info, warn};

pub struct Engine {
    config: EngineConfig,
    queue: TicketQueue,
    store: TicketStore,
    logs: EventLogs,
    detector: DuplicateDetector,
    escalation: EscalationPolicy,
    cycles: u64,
}

impl Engine {
    /// Build the engine and populate the queue from the active store.
    /// Rejects tunables the engine cannot run with.
    pub fn new(config: EngineConfig) -> Result<Self> {
        if config.queue_capacity < 2 {
            return Err(EngineError::Config(format!(
                "queue_capacity must be at least 2, got {}",
                config.queue_capacity
            )));
        }
        if config.persist_every_cycles == 0 {
            return Err(EngineError::Config(
                "persist_every_cycles must be nonzero".to_string(),
            ));
        }
        if config.stats_every_cycles == 0 {
            return Err(EngineError::Config(
                "stats_every_cycles must be nonzero".to_string(),
            ));
        }

        let queue = TicketQueue::new(config.queue_capacity);
        let store = TicketStore::new(&config.paths.active_store, &config.paths.resolved_archive);
        let logs = EventLogs::new(&config.paths);
        let detector = DuplicateDetector::new(
            config.duplicate_prefix_len,
            config.duplicate_lookback_days,
        );
        let escalation = EscalationPolicy {
            cycle_hours: config.escalation_cycle_hours,
            safety_net_hours: config.safety_net_hours,
        };

        let mut engine = Self {
            config,
            queue,
            store,
            logs,
            detector,
            escalation,
            cycles: 0,
        };
        let summary = engine
            .store
            .load_into(&mut engine.queue, Utc::now(), &engine.logs)?;
        info!(
            "engine ready: {} tickets loaded, {} skipped, capacity {}",
            summary.loaded,
            summary.skipped,
            engine.queue.capacity()
        );
        Ok(engine)
    }

    /// One cooperative cycle: intake, escalation, command check, then
    /// periodic persistence and statistics.
    pub fn run_cycle(&mut self) -> Result<()> {
        self.process_intake()?;
        self.escalate();
        self.check_commands()?;

        if self.cycles % self.config.persist_every_cycles == 0 {
            self.store.save(&self.queue)?;
        }
        let stats = self.stats();
        if self.cycles % self.config.stats_every_cycles == 0 {
            info!(
                "queue: {} tickets | avg wait {:.1}h | oldest {}h | critical={} high={} medium={} low={}",
                stats.total,
                stats.avg_wait_hours,
                stats.oldest_hours,
                stats.critical,
                stats.high,
                stats.medium,
                stats.low
            );
        }

        let pct = stats.utilization_pct(self.queue.capacity());
        if pct >= self.config.capacity_warning_pct {
            warn!(
                "queue at {:.1}% of capacity ({}/{})",
                pct,
                stats.total,
                self.queue.capacity()
            );
        }

        self.cycles += 1;
        Ok(())
    }

    /// Consume the intake file: duplicate checks, classification,
    /// validation, enqueue, durable append; then clear the file and
    /// re-load from the active store.
    pub fn process_intake(&mut self) -> Result<()> {
        let path = self.config.paths.intake_file.clone();
        let content = match fs::read_to_string(&path) {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(()),
            Err(e) => return Err(e.into()),
        };

        let now = Utc::now();
        let mut accepted = 0usize;
        let mut resolved: Option<Vec<ResolvedTicket>> = None;

        for (idx, line) in content.lines().enumerate() {
            let line_no = idx + 1;
            if line.trim().is_empty() {
                continue;
            }

            let fields = match split_record(line) {
                Ok(fields) if fields.len() >= 6 => fields,
                Ok(fields) => {
                    self.logs.error.append(&format!(
                        "intake line {line_no}: {} fields (expected 6) - skipping",
                        fields.len()
                    ));
                    continue;
                }
                Err(e) => {
                    self.logs
                        .error
                        .append(&format!("intake line {line_no}: {e} - skipping"));
                    continue;
                }
            };

            let ticket_id: u32 = match fields[0].trim().parse() {
                Ok(id) => id,
                Err(_) => {
                    self.logs.error.append(&format!(
                        "intake line {line_no}: unparsable ticket ID '{}' - skipping",
                        fields[0]
                    ));
                    continue;
                }
            };

            // duplicate policy, checked before anything enters the queue
            if let Some(existing) = self.detector.find_in_queue(&self.queue, &fields[2], &fields[5])
            {
                self.logs.duplicate.append(&format!(
                    "Duplicate rejected: Ticket #{ticket_id} (similar to #{existing}) - {} - {}",
                    fields[2], fields[5]
                ));
                continue;
            }
            // the resolved archive is scanned lazily, once per batch
            if resolved.is_none() {
                resolved = Some(self.store.read_resolved()?);
            }
            if self.detector.in_recent_resolved(
                resolved.as_deref().unwrap_or_default(),
                &fields[2],
                &fields[5],
                now,
            ) {
                self.logs.duplicate.append(&format!(
                    "Duplicate rejected: Ticket #{ticket_id} (recently resolved) - {} - {}",
                    fields[2], fields[5]
                ));
                continue;
            }

            let ticket = Ticket {
                ticket_id,
                customer_name: fields[1].clone(),
                email: fields[2].clone(),
                product: fields[3].clone(),
                purchase_date: fields[4].clone(),
                issue_description: fields[5].clone(),
                priority: classify(&fields[5]),
                entered_queue_at: now,
            };
            if let Err(reason) = ticket.validate() {
                self.logs
                    .error
                    .append(&format!("intake line {line_no}: {reason} - skipping"));
                continue;
            }

            match self.queue.enqueue(ticket.clone()) {
                Ok(()) => {
                    self.store.append_active(&ticket)?;
                    accepted += 1;
                }
                Err(EngineError::QueueFull { ticket_id }) => {
                    self.logs
                        .overflow
                        .append(&format!("QUEUE FULL - Ticket #{ticket_id} rejected"));
                }
                Err(e) => return Err(e),
            }
        }

        // consumed: clear so the producer can append the next batch
        fs::write(&path, "")?;

        if accepted > 0 {
            debug!("intake: accepted {accepted} tickets");
            self.reload()?;
        }
        Ok(())
    }

    /// Run the escalation sweep and record the summary event.
    pub fn escalate(&mut self) {
        let promoted = self.escalation.sweep(&mut self.queue, Utc::now());
        if promoted > 0 {
            self.logs
                .escalation
                .append(&format!("Auto-escalated {promoted} tickets"));
            info!("escalated {promoted} tickets");
        }
    }

    /// Consume the command file. `RESOLVE <ticketID> <operator>` resolves
    /// the queue head; malformed or empty content is a no-op.
    pub fn check_commands(&mut self) -> Result<()> {
        let path = self.config.paths.command_file.clone();
        let content = match fs::read_to_string(&path) {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(()),
            Err(e) => return Err(e.into()),
        };

        let first = content.lines().next().unwrap_or("").trim();
        let mut parts = first.split_whitespace();
        if parts.next() == Some("RESOLVE") {
            if parts
                .next()
                .and_then(|id| id.parse::<u32>().ok())
                .is_some()
            {
                let operator = parts.next().unwrap_or("admin").to_string();
                self.resolve_next(&operator)?;
            }
        }

        fs::write(&path, "")?;
        Ok(())
    }

    /// Dequeue the head, archive it, and re-load from the active store so
    /// the in-memory queue matches durable state.
    pub fn resolve_next(&mut self, operator: &str) -> Result<Option<u32>> {
        let Some(ticket) = self.queue.dequeue() else {
            return Ok(None);
        };
        let ticket_id = ticket.ticket_id;

        if !self
            .store
            .archive_and_remove(ticket_id, operator, Utc::now())?
        {
            warn!("ticket #{ticket_id} was not in the active store during archival");
        }
        self.reload()?;
        info!("resolved ticket #{ticket_id} by {operator}");
        Ok(Some(ticket_id))
    }

    /// Final persist and summary, invoked after the driver's last cycle.
    pub fn shutdown(&mut self) -> Result<()> {
        self.store.save(&self.queue)?;
        let stats = self.stats();
        info!(
            "shutdown: {} tickets persisted | avg wait {:.1}h | oldest {}h | critical={} high={} medium={} low={}",
            stats.total,
            stats.avg_wait_hours,
            stats.oldest_hours,
            stats.critical,
            stats.high,
            stats.medium,
            stats.low
        );
        Ok(())
    }

    fn reload(&mut self) -> Result<()> {
        let summary = self
            .store
            .load_into(&mut self.queue, Utc::now(), &self.logs)?;
        debug!("queue reloaded: {} tickets", summary.loaded);
        Ok(())
    }

    // ------------------------------------------------------------------
    // Read-only views for the presentation layer
    // ------------------------------------------------------------------

    pub fn queue(&self) -> &TicketQueue {
        &self.queue
    }

    pub fn stats(&self) -> QueueStats {
        QueueStats::collect(&self.queue, Utc::now())
    }

    /// Prior resolved tickets for a customer, newest first, capped by
    /// `max_customer_history`.
    pub fn customer_history(&self, email: &str) -> Result<Vec<ResolvedTicket>> {
        let resolved = self.store.read_resolved()?;
        Ok(
            history::customer_history(&resolved, email, self.config.max_customer_history)
                .into_iter()
                .cloned()
                .collect(),
        )
    }

    /// Total prior resolved tickets for a customer, uncapped.
    pub fn customer_history_count(&self, email: &str) -> Result<usize> {
        let resolved = self.store.read_resolved()?;
        Ok(history::history_count(&resolved, email))
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn cycles(&self) -> u64 {
        self.cycles
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::StorePaths;
    use crate::Priority;
    use tempfile::{tempdir, TempDir};

    fn engine_in(dir: &TempDir, capacity: usize) -> Engine {
        let config = EngineConfig {
            queue_capacity: capacity,
            paths: StorePaths::rooted(dir.path()),
            ..EngineConfig::default()
        };
        Engine::new(config).unwrap()
    }

    fn intake_row(id: u32, email: &str, issue: &str) -> String {
        format!("{id},Test Customer,{email},Widget,2026-01-01,{issue}\n")
    }

    #[test]
    fn test_intake_classifies_and_enqueues() {
        let dir = tempdir().unwrap();
        let mut engine = engine_in(&dir, 16);
        fs::write(
            &engine.config.paths.intake_file,
            intake_row(1, "a@example.com", "payment went missing")
                + &intake_row(2, "b@example.com", "question about colors"),
        )
        .unwrap();

        engine.run_cycle().unwrap();

        let tickets: Vec<(u32, Priority)> = engine
            .queue()
            .iter()
            .map(|t| (t.ticket_id, t.priority))
            .collect();
        assert_eq!(
            tickets,
            vec![(1, Priority::Critical), (2, Priority::Low)]
        );

        // consumed and cleared
        let intake = fs::read_to_string(&engine.config.paths.intake_file).unwrap();
        assert!(intake.is_empty());

        // durably appended
        let active = fs::read_to_string(&engine.config.paths.active_store).unwrap();
        assert!(active.contains("payment went missing"));
    }

    #[test]
    fn test_duplicate_intake_is_rejected_with_reference() {
        let dir = tempdir().unwrap();
        let mut engine = engine_in(&dir, 16);
        let issue = "the dashboard chart renders upside down somehow";
        fs::write(
            &engine.config.paths.intake_file,
            intake_row(10, "dup@example.com", issue) + &intake_row(11, "dup@example.com", issue),
        )
        .unwrap();

        engine.process_intake().unwrap();

        assert_eq!(engine.queue().len(), 1);
        assert_eq!(engine.queue().peek().unwrap().ticket_id, 10);

        let log = fs::read_to_string(&engine.config.paths.duplicate_log).unwrap();
        assert!(log.contains("Ticket #11"));
        assert!(log.contains("similar to #10"));
    }

    #[test]
    fn test_recently_resolved_duplicate_is_rejected() {
        let dir = tempdir().unwrap();
        let mut engine = engine_in(&dir, 16);
        let issue = "audio cuts out during long calls";

        // submit, then resolve via command file
        fs::write(
            &engine.config.paths.intake_file,
            intake_row(20, "c@example.com", issue),
        )
        .unwrap();
        engine.process_intake().unwrap();
        fs::write(&engine.config.paths.command_file, "RESOLVE 20 casey\n").unwrap();
        engine.check_commands().unwrap();
        assert!(engine.queue().is_empty());

        // resubmission within the lookback window is blocked
        fs::write(
            &engine.config.paths.intake_file,
            intake_row(21, "c@example.com", issue),
        )
        .unwrap();
        engine.process_intake().unwrap();
        assert!(engine.queue().is_empty());

        let log = fs::read_to_string(&engine.config.paths.duplicate_log).unwrap();
        assert!(log.contains("Ticket #21"));
        assert!(log.contains("recently resolved"));
    }

    #[test]
    fn test_resolve_command_archives_head() {
        let dir = tempdir().unwrap();
        let mut engine = engine_in(&dir, 16);
        fs::write(
            &engine.config.paths.intake_file,
            intake_row(1, "a@example.com", "first in line")
                + &intake_row(2, "b@example.com", "second in line"),
        )
        .unwrap();
        engine.process_intake().unwrap();

        fs::write(&engine.config.paths.command_file, "RESOLVE 1 casey\n").unwrap();
        engine.check_commands().unwrap();

        // head resolved, FIFO order kept for the rest
        assert_eq!(engine.queue().peek().unwrap().ticket_id, 2);

        // command file consumed
        let cmd = fs::read_to_string(&engine.config.paths.command_file).unwrap();
        assert!(cmd.is_empty());

        // archived with operator identity
        let history = engine.customer_history("a@example.com").unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].ticket_id, 1);
        assert_eq!(history[0].resolved_by, "casey");
        assert_eq!(engine.customer_history_count("a@example.com").unwrap(), 1);
        assert_eq!(engine.customer_history_count("b@example.com").unwrap(), 0);
    }

    #[test]
    fn test_unusable_tunables_are_config_errors() {
        let dir = tempdir().unwrap();
        let bad = [
            EngineConfig {
                queue_capacity: 1,
                paths: StorePaths::rooted(dir.path()),
                ..EngineConfig::default()
            },
            EngineConfig {
                persist_every_cycles: 0,
                paths: StorePaths::rooted(dir.path()),
                ..EngineConfig::default()
            },
            EngineConfig {
                stats_every_cycles: 0,
                paths: StorePaths::rooted(dir.path()),
                ..EngineConfig::default()
            },
        ];
        for config in bad {
            assert!(matches!(
                Engine::new(config),
                Err(EngineError::Config(_))
            ));
        }
    }

    #[test]
    fn test_malformed_command_is_a_noop() {
        let dir = tempdir().unwrap();
        let mut engine = engine_in(&dir, 16);
        fs::write(
            &engine.config.paths.intake_file,
            intake_row(1, "a@example.com", "still waiting"),
        )
        .unwrap();
        engine.process_intake().unwrap();

        for junk in ["", "FROBNICATE 1 casey", "RESOLVE", "RESOLVE abc casey"] {
            fs::write(&engine.config.paths.command_file, junk).unwrap();
            engine.check_commands().unwrap();
            assert_eq!(engine.queue().len(), 1);
        }
    }

    #[test]
    fn test_overflow_is_logged_and_dropped() {
        let dir = tempdir().unwrap();
        // capacity 3 -> 2 usable slots
        let mut engine = engine_in(&dir, 3);
        fs::write(
            &engine.config.paths.intake_file,
            intake_row(1, "a@example.com", "issue one here")
                + &intake_row(2, "b@example.com", "issue two here")
                + &intake_row(3, "c@example.com", "issue three here"),
        )
        .unwrap();
        engine.process_intake().unwrap();

        assert_eq!(engine.queue().len(), 2);
        let log = fs::read_to_string(&engine.config.paths.overflow_log).unwrap();
        assert!(log.contains("Ticket #3"));
    }

    #[test]
    fn test_state_survives_restart() {
        let dir = tempdir().unwrap();
        {
            let mut engine = engine_in(&dir, 16);
            fs::write(
                &engine.config.paths.intake_file,
                intake_row(1, "a@example.com", "persisted across restart"),
            )
            .unwrap();
            engine.process_intake().unwrap();
            engine.shutdown().unwrap();
        }

        let engine = engine_in(&dir, 16);
        assert_eq!(engine.queue().len(), 1);
        assert_eq!(engine.queue().peek().unwrap().ticket_id, 1);
    }

    #[test]
    fn test_escalation_event_is_recorded() {
        let dir = tempdir().unwrap();
        let mut engine = engine_in(&dir, 16);
        fs::write(
            &engine.config.paths.intake_file,
            intake_row(1, "a@example.com", "no rush at all"),
        )
        .unwrap();
        engine.process_intake().unwrap();

        // age the ticket past the safety net, then sweep
        engine
            .queue
            .for_each_mut(|t| t.entered_queue_at -= chrono::Duration::hours(80));
        engine.escalate();

        assert_eq!(engine.queue().peek().unwrap().priority, Priority::Critical);
        let log = fs::read_to_string(&engine.config.paths.escalation_log).unwrap();
        assert!(log.contains("Auto-escalated 1 tickets"));
    }

    #[test]
    fn test_validation_failure_in_intake_is_logged_not_fatal() {
        let dir = tempdir().unwrap();
        let mut engine = engine_in(&dir, 16);
        fs::write(
            &engine.config.paths.intake_file,
            intake_row(1, "not-an-email", "bad row coming through")
                + &intake_row(2, "fine@example.com", "good row right after"),
        )
        .unwrap();
        engine.process_intake().unwrap();

        assert_eq!(engine.queue().len(), 1);
        assert_eq!(engine.queue().peek().unwrap().ticket_id, 2);
        let log = fs::read_to_string(&engine.config.paths.error_log).unwrap();
        assert!(log.contains("intake line 1"));
    }
}
