//! Field validation rules
//!
//! Malformed records are rejected at the store boundary and never enter
//! the queue; these checks never panic on arbitrary input.

/// Ticket ID validation range
pub const MIN_TICKET_ID: u32 = 1;
pub const MAX_TICKET_ID: u32 = 999_999;

/// Field length limits
pub const MAX_NAME_LEN: usize = 99;
pub const MAX_EMAIL_LEN: usize = 99;
pub const MIN_EMAIL_LEN: usize = 3;
pub const MAX_PRODUCT_LEN: usize = 99;
pub const MAX_PURCHASE_DATE_LEN: usize = 49;
pub const MAX_ISSUE_LEN: usize = 199;

pub fn ticket_id_ok(id: u32) -> bool {
    (MIN_TICKET_ID..=MAX_TICKET_ID).contains(&id)
}

/// Email shape: an `@` before the final `.`, with at least one character
/// after the last dot.
pub fn email_ok(email: &str) -> bool {
    if email.len() < MIN_EMAIL_LEN || email.len() > MAX_EMAIL_LEN {
        return false;
    }
    let (at, dot) = match (email.find('@'), email.rfind('.')) {
        (Some(at), Some(dot)) => (at, dot),
        _ => return false,
    };
    dot > at && dot + 1 < email.len()
}

/// Bounded string with at least one non-whitespace character.
pub fn bounded_ok(s: &str, min_len: usize, max_len: usize) -> bool {
    s.len() >= min_len && s.len() <= max_len && !s.trim().is_empty()
}
