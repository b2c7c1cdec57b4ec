//! Auto-Priority Classifier
//!
//! Case-insensitive substring match against four ordered keyword tiers,
//! first match wins. The keyword lists are an internal classification
//! detail and are never shown to ticket submitters, to prevent priority
//! gaming.

use crate::Priority;

/// Security, financial, and data-loss terms.
const CRITICAL_KEYWORDS: &[&str] = &["hack", "security", "money", "payment", "fraud", "stolen"];

/// System failures and urgency terms.
const HIGH_KEYWORDS: &[&str] = &["urgent", "fail", "error", "crash", "broke", "not working"];

/// Defects and performance terms.
const MEDIUM_KEYWORDS: &[&str] = &["bug", "slow", "delay", "glitch", "issue"];

/// Classify an issue description. Total function: unmatched text yields
/// `Low`.
pub fn classify(issue_description: &str) -> Priority {
    let text = issue_description.to_lowercase();
    if CRITICAL_KEYWORDS.iter().any(|k| text.contains(k)) {
        return Priority::Critical;
    }
    if HIGH_KEYWORDS.iter().any(|k| text.contains(k)) {
        return Priority::High;
    }
    if MEDIUM_KEYWORDS.iter().any(|k| text.contains(k)) {
        return Priority::Medium;
    }
    Priority::Low
}
