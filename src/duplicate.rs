//! Duplicate Detector
//!
//! Two checks over the same key: a case-insensitive fixed-length prefix
//! of the issue description plus an exact case-insensitive email match.
//! Exact-prefix matching is a precision/recall tradeoff: cheap and
//! deterministic, it catches impatient resubmissions that rephrase only
//! the tail of the text, and accepts false negatives beyond the prefix.

use crate::queue::TicketQueue;
use crate::store::ResolvedTicket;
use chrono::{DateTime, Duration, Utc};

pub struct DuplicateDetector {
    prefix_len: usize,
    lookback_days: i64,
}

impl DuplicateDetector {
    pub fn new(prefix_len: usize, lookback_days: i64) -> Self {
        Self {
            prefix_len,
            lookback_days,
        }
    }

    fn prefix(&self, issue: &str) -> String {
        issue
            .chars()
            .take(self.prefix_len)
            .collect::<String>()
            .to_lowercase()
    }

    /// Linear FIFO scan of the live queue; returns the first matching
    /// ticket's ID so the rejection can reference it.
    pub fn find_in_queue(&self, queue: &TicketQueue, email: &str, issue: &str) -> Option<u32> {
        let needle = self.prefix(issue);
        queue
            .iter()
            .find(|t| {
                t.email.eq_ignore_ascii_case(email) && self.prefix(&t.issue_description) == needle
            })
            .map(|t| t.ticket_id)
    }

    /// True when a matching ticket was resolved within the lookback
    /// window. Older recurrences of the same issue are legitimate and
    /// must be allowed back in.
    pub fn in_recent_resolved(
        &self,
        resolved: &[ResolvedTicket],
        email: &str,
        issue: &str,
        now: DateTime<Utc>,
    ) -> bool {
        let needle = self.prefix(issue);
        let cutoff = now - Duration::days(self.lookback_days);
        resolved.iter().any(|r| {
            r.resolved_at > cutoff
                && r.email.eq_ignore_ascii_case(email)
                && self.prefix(&r.issue_description) == needle
        })
    }
}
