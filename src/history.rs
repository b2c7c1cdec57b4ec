//! Customer History Lookup
//!
//! Read-only view over the resolved archive, used for per-ticket "prior
//! tickets" counts and duplicate-adjacent legitimacy checks.

use crate::store::ResolvedTicket;

/// Total resolved tickets for one customer, uncapped. Backs the
/// "prior tickets" figure shown alongside a ticket.
pub fn history_count(resolved: &[ResolvedTicket], email: &str) -> usize {
    resolved
        .iter()
        .filter(|r| r.email.eq_ignore_ascii_case(email))
        .count()
}

/// Resolved tickets for one customer, newest first, capped at `max`.
pub fn customer_history<'a>(
    resolved: &'a [ResolvedTicket],
    email: &str,
    max: usize,
) -> Vec<&'a ResolvedTicket> {
    let mut matches: Vec<&ResolvedTicket> = resolved
        .iter()
        .filter(|r| r.email.eq_ignore_ascii_case(email))
        .collect();
    matches.reverse();
    matches.truncate(max);
    matches
}
