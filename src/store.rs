//! Persistence Layer
//!
//! Two durable CSV stores: the active store (header + one row per queued
//! ticket) and the append-only resolved archive (same fields plus a
//! resolution timestamp and resolving operator). Store files are lazily
//! created with headers when absent. Every rewrite goes through a
//! temporary file and an atomic rename so a concurrent reader never
//! observes a half-written store.
//!
//! Load never crashes on a bad row: malformed or invalid records are
//! skipped with a line-context error event, and an unrecognized priority
//! is auto-corrected to Low instead of rejecting the record.

use crate::audit::EventLogs;
use crate::queue::TicketQueue;
use crate::record::{join_record, split_record};
use crate::{EngineError, Priority, Result, Ticket};
use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Human-readable timestamp format used in the resolved archive and logs.
pub const TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

const ACTIVE_HEADER: &str =
    "Ticket ID,Customer Name,Customer Email,Product,Purchase Date,Issue Description,Priority,Queue Entry Time";
const RESOLVED_HEADER: &str =
    "Ticket ID,Customer Name,Customer Email,Product,Purchase Date,Issue Description,Priority,Queue Entry Time,Resolved At,Resolved By";

/// A ticket in the resolved archive, the system of record for duplicate
/// history and customer history queries.
#[derive(Clone, Debug)]
pub struct ResolvedTicket {
    pub ticket_id: u32,
    pub customer_name: String,
    pub email: String,
    pub product: String,
    pub purchase_date: String,
    pub issue_description: String,
    pub priority: Priority,
    pub entered_queue_at: DateTime<Utc>,
    pub resolved_at: DateTime<Utc>,
    pub resolved_by: String,
}

/// Outcome of one load pass over the active store.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct LoadSummary {
    pub loaded: usize,
    pub skipped: usize,
}

/// The two durable stores.
pub struct TicketStore {
    active_path: PathBuf,
    resolved_path: PathBuf,
}

impl TicketStore {
    pub fn new(active_path: impl Into<PathBuf>, resolved_path: impl Into<PathBuf>) -> Self {
        Self {
            active_path: active_path.into(),
            resolved_path: resolved_path.into(),
        }
    }

    pub fn active_path(&self) -> &Path {
        &self.active_path
    }

    pub fn resolved_path(&self) -> &Path {
        &self.resolved_path
    }

    fn ensure_active(&self) -> Result<()> {
        if !self.active_path.exists() {
            fs::write(&self.active_path, format!("{ACTIVE_HEADER}\n"))?;
        }
        Ok(())
    }

    fn ensure_resolved(&self) -> Result<()> {
        if !self.resolved_path.exists() {
            fs::write(&self.resolved_path, format!("{RESOLVED_HEADER}\n"))?;
        }
        Ok(())
    }

    /// Parse the active store into the queue, replacing its contents.
    /// Rows that fail validation are skipped and logged; a missing store
    /// is created empty with its header.
    pub fn load_into(
        &self,
        queue: &mut TicketQueue,
        now: DateTime<Utc>,
        logs: &EventLogs,
    ) -> Result<LoadSummary> {
        self.ensure_active()?;
        let content = fs::read_to_string(&self.active_path)?;

        queue.clear();
        let mut summary = LoadSummary::default();

        for (idx, line) in content.lines().enumerate() {
            if idx == 0 || line.trim().is_empty() {
                continue;
            }
            let line_no = idx + 1;
            match self.parse_active_row(line, line_no, now) {
                Ok(ticket) => match queue.enqueue(ticket) {
                    Ok(()) => summary.loaded += 1,
                    Err(EngineError::QueueFull { ticket_id }) => {
                        logs.overflow
                            .append(&format!("QUEUE FULL - Ticket #{ticket_id} rejected"));
                        summary.skipped += 1;
                    }
                    Err(e) => return Err(e),
                },
                Err(e) => {
                    logs.error.append(&format!("{e} - skipping"));
                    summary.skipped += 1;
                }
            }
        }

        if summary.skipped > 0 {
            warn!(
                "active store load: {} tickets loaded, {} skipped",
                summary.loaded, summary.skipped
            );
            logs.error.append(&format!(
                "Load summary: {} valid tickets loaded, {} invalid tickets skipped",
                summary.loaded, summary.skipped
            ));
        }
        Ok(summary)
    }

    fn parse_active_row(&self, line: &str, line_no: usize, now: DateTime<Utc>) -> Result<Ticket> {
        let invalid = |reason: String| EngineError::InvalidRecord {
            line: line_no,
            reason,
        };

        let fields = split_record(line).map_err(|e| invalid(e.to_string()))?;
        if fields.len() < 8 {
            return Err(invalid(format!("{} fields (expected 8)", fields.len())));
        }

        let ticket_id: u32 = fields[0]
            .trim()
            .parse()
            .map_err(|_| invalid(format!("unparsable ticket ID '{}'", fields[0])))?;

        // invalid priority is auto-corrected, not rejected
        let priority = Priority::parse(fields[6].trim()).unwrap_or_else(|| {
            debug!(
                "line {}: invalid priority '{}' for ticket #{}, defaulting to Low",
                line_no, fields[6], ticket_id
            );
            Priority::Low
        });

        let entry_field = fields[7].trim();
        let entered_queue_at = if entry_field.is_empty() {
            now
        } else {
            entry_field
                .parse::<i64>()
                .ok()
                .and_then(|secs| Utc.timestamp_opt(secs, 0).single())
                .ok_or_else(|| invalid(format!("unparsable queue entry time '{entry_field}'")))?
        };

        let ticket = Ticket {
            ticket_id,
            customer_name: fields[1].clone(),
            email: fields[2].clone(),
            product: fields[3].clone(),
            purchase_date: fields[4].clone(),
            issue_description: fields[5].clone(),
            priority,
            entered_queue_at,
        };
        ticket
            .validate()
            .map_err(|reason| invalid(format!("{reason} for ticket #{ticket_id}")))?;
        Ok(ticket)
    }

    /// Serialize the queue in FIFO order, overwriting the active store
    /// via temp-write and atomic rename.
    pub fn save(&self, queue: &TicketQueue) -> Result<()> {
        let mut out = String::with_capacity(256 * (queue.len() + 1));
        out.push_str(ACTIVE_HEADER);
        out.push('\n');
        for ticket in queue.iter() {
            out.push_str(&active_row(ticket));
            out.push('\n');
        }

        let tmp = self.active_path.with_extension("csv.tmp");
        fs::write(&tmp, out)?;
        fs::rename(&tmp, &self.active_path)?;
        Ok(())
    }

    /// Append one intake ticket to the active store.
    pub fn append_active(&self, ticket: &Ticket) -> Result<()> {
        self.ensure_active()?;
        let mut file = OpenOptions::new().append(true).open(&self.active_path)?;
        writeln!(file, "{}", active_row(ticket))?;
        Ok(())
    }

    /// Rewrite the active store with `ticket_id` excluded and append its
    /// row, stamped with the resolution time and operator, to the
    /// resolved archive. Returns whether the ticket was found.
    pub fn archive_and_remove(
        &self,
        ticket_id: u32,
        resolved_by: &str,
        now: DateTime<Utc>,
    ) -> Result<bool> {
        self.ensure_active()?;
        self.ensure_resolved()?;

        let content = fs::read_to_string(&self.active_path)?;
        let mut kept = String::with_capacity(content.len());
        let mut archived: Option<String> = None;

        for (idx, line) in content.lines().enumerate() {
            if idx == 0 {
                kept.push_str(line);
                kept.push('\n');
                continue;
            }
            if line.trim().is_empty() {
                continue;
            }
            let row_id = split_record(line)
                .ok()
                .and_then(|fields| fields.first().and_then(|f| f.trim().parse::<u32>().ok()));
            if row_id == Some(ticket_id) && archived.is_none() {
                let stamp = now.format(TIME_FORMAT).to_string();
                archived = Some(format!("{},{}", line, join_record(&[&stamp, resolved_by])));
            } else {
                kept.push_str(line);
                kept.push('\n');
            }
        }

        let Some(row) = archived else {
            return Ok(false);
        };

        let mut archive = OpenOptions::new().append(true).open(&self.resolved_path)?;
        writeln!(archive, "{row}")?;

        let tmp = self.active_path.with_extension("csv.tmp");
        fs::write(&tmp, kept)?;
        fs::rename(&tmp, &self.active_path)?;
        Ok(true)
    }

    /// Tolerant scan of the resolved archive; malformed rows are skipped.
    pub fn read_resolved(&self) -> Result<Vec<ResolvedTicket>> {
        if !self.resolved_path.exists() {
            return Ok(Vec::new());
        }
        let content = fs::read_to_string(&self.resolved_path)?;
        let mut records = Vec::new();
        for (idx, line) in content.lines().enumerate() {
            if idx == 0 || line.trim().is_empty() {
                continue;
            }
            match parse_resolved_row(line) {
                Some(record) => records.push(record),
                None => debug!("resolved archive line {}: malformed, skipped", idx + 1),
            }
        }
        Ok(records)
    }
}

fn active_row(ticket: &Ticket) -> String {
    join_record(&[
        &ticket.ticket_id.to_string(),
        &ticket.customer_name,
        &ticket.email,
        &ticket.product,
        &ticket.purchase_date,
        &ticket.issue_description,
        ticket.priority.as_str(),
        &ticket.entered_queue_at.timestamp().to_string(),
    ])
}

fn parse_resolved_row(line: &str) -> Option<ResolvedTicket> {
    let fields = split_record(line).ok()?;
    if fields.len() < 10 {
        return None;
    }
    let entered_queue_at = fields[7]
        .trim()
        .parse::<i64>()
        .ok()
        .and_then(|secs| Utc.timestamp_opt(secs, 0).single())?;
    let resolved_at = NaiveDateTime::parse_from_str(fields[8].trim(), TIME_FORMAT)
        .ok()
        .map(|naive| Utc.from_utc_datetime(&naive))?;

    Some(ResolvedTicket {
        ticket_id: fields[0].trim().parse().ok()?,
        customer_name: fields[1].clone(),
        email: fields[2].clone(),
        product: fields[3].clone(),
        purchase_date: fields[4].clone(),
        issue_description: fields[5].clone(),
        priority: Priority::parse(fields[6].trim()).unwrap_or(Priority::Low),
        entered_queue_at,
        resolved_at,
        resolved_by: fields[9].clone(),
    })
}
