//! Escalation Engine
//!
//! Periodic sweep that recomputes each queued ticket's priority purely
//! from its absolute age (`now - entered_queue_at`). No "time since last
//! promotion" state is kept: age maps to a priority floor, and a ticket
//! is promoted only when its floor exceeds its current priority. The
//! sweep is idempotent and monotone, and running it twice in succession
//! changes nothing the second time.
//!
//! Floor timeline with the default 24-hour cycle:
//! 0-24h Low, 24-48h Medium, 48-72h High, 72h+ Critical.
//! A priority assigned at classification acts as its own floor, so a
//! ticket classified High stays High until the 72-hour safety net.

use crate::queue::TicketQueue;
use crate::Priority;
use chrono::{DateTime, Utc};

/// Age thresholds for the sweep.
#[derive(Clone, Copy, Debug)]
pub struct EscalationPolicy {
    /// Hours between single-step promotions
    pub cycle_hours: i64,
    /// Absolute age at which any ticket is forced to Critical
    pub safety_net_hours: i64,
}

impl Default for EscalationPolicy {
    fn default() -> Self {
        Self {
            cycle_hours: 24,
            safety_net_hours: 72,
        }
    }
}

impl EscalationPolicy {
    /// The priority a ticket should be promoted to, or `None` when it
    /// stays put. A pure function of age and current priority: the
    /// age-derived floor is applied only when it exceeds the current
    /// priority, so re-evaluating at the same instant never promotes
    /// again.
    pub fn next_priority(&self, current: Priority, age_hours: f64) -> Option<Priority> {
        let floor = self.age_floor(age_hours);
        (floor > current).then_some(floor)
    }

    /// Minimum priority a ticket of this age may hold.
    fn age_floor(&self, age_hours: f64) -> Priority {
        let cycle = self.cycle_hours as f64;
        if age_hours >= self.safety_net_hours as f64 {
            Priority::Critical
        } else if age_hours >= 2.0 * cycle {
            Priority::High
        } else if age_hours >= cycle {
            Priority::Medium
        } else {
            Priority::Low
        }
    }

    /// Full scan over the live queue, promoting in place. Returns the
    /// number of tickets promoted; the engine appends one summary line to
    /// the escalation log when this is non-zero.
    pub fn sweep(&self, queue: &mut TicketQueue, now: DateTime<Utc>) -> usize {
        let mut promoted = 0;
        queue.for_each_mut(|ticket| {
            if let Some(next) = self.next_priority(ticket.priority, ticket.age_hours(now)) {
                ticket.priority = next;
                promoted += 1;
            }
        });
        promoted
    }
}
