//! Statistics Aggregator
//!
//! Single pass over the live queue. Consistency comes from the engine's
//! single-threaded ownership: nothing mutates the queue during the scan.

use crate::queue::TicketQueue;
use crate::Priority;
use chrono::{DateTime, Utc};

/// Queue-wide metrics for reporting.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct QueueStats {
    pub total: usize,
    /// Mean wait in hours, 0.0 when the queue is empty
    pub avg_wait_hours: f64,
    /// Wait of the oldest ticket, truncated to whole hours
    pub oldest_hours: i64,
    pub critical: usize,
    pub high: usize,
    pub medium: usize,
    pub low: usize,
}

impl QueueStats {
    pub fn collect(queue: &TicketQueue, now: DateTime<Utc>) -> Self {
        let mut stats = Self::default();
        let mut total_wait = 0.0;

        for ticket in queue.iter() {
            stats.total += 1;
            let hours = ticket.age_hours(now);
            total_wait += hours;
            if hours as i64 > stats.oldest_hours {
                stats.oldest_hours = hours as i64;
            }
            match ticket.priority {
                Priority::Critical => stats.critical += 1,
                Priority::High => stats.high += 1,
                Priority::Medium => stats.medium += 1,
                Priority::Low => stats.low += 1,
            }
        }

        if stats.total > 0 {
            stats.avg_wait_hours = total_wait / stats.total as f64;
        }
        stats
    }

    /// Percentage of ring capacity in use.
    pub fn utilization_pct(&self, capacity: usize) -> f64 {
        if capacity == 0 {
            0.0
        } else {
            self.total as f64 * 100.0 / capacity as f64
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Ticket;
    use chrono::Duration;

    fn aged(id: u32, priority: Priority, age_hours: i64, now: DateTime<Utc>) -> Ticket {
        Ticket {
            ticket_id: id,
            customer_name: "Test Customer".to_string(),
            email: "customer@example.com".to_string(),
            product: "Widget".to_string(),
            purchase_date: "2026-01-01".to_string(),
            issue_description: "something broke".to_string(),
            priority,
            entered_queue_at: now - Duration::hours(age_hours),
        }
    }

    #[test]
    fn test_empty_queue_is_all_zero() {
        let q = TicketQueue::new(8);
        let stats = QueueStats::collect(&q, Utc::now());
        assert_eq!(stats, QueueStats::default());
    }

    #[test]
    fn test_single_pass_metrics() {
        let now = Utc::now();
        let mut q = TicketQueue::new(16);
        q.enqueue(aged(1, Priority::Low, 10, now)).unwrap();
        q.enqueue(aged(2, Priority::High, 20, now)).unwrap();
        q.enqueue(aged(3, Priority::Critical, 60, now)).unwrap();

        let stats = QueueStats::collect(&q, now);
        assert_eq!(stats.total, 3);
        assert!((stats.avg_wait_hours - 30.0).abs() < 0.01);
        assert_eq!(stats.oldest_hours, 60);
        assert_eq!(
            (stats.critical, stats.high, stats.medium, stats.low),
            (1, 1, 0, 1)
        );
    }

    #[test]
    fn test_oldest_truncates_to_whole_hours() {
        let now = Utc::now();
        let mut q = TicketQueue::new(8);
        let mut t = aged(1, Priority::Low, 0, now);
        t.entered_queue_at = now - Duration::minutes(90);
        q.enqueue(t).unwrap();

        assert_eq!(QueueStats::collect(&q, now).oldest_hours, 1);
    }

    #[test]
    fn test_utilization() {
        let now = Utc::now();
        let mut q = TicketQueue::new(10);
        for id in 1..=8 {
            q.enqueue(aged(id, Priority::Low, 1, now)).unwrap();
        }
        let stats = QueueStats::collect(&q, now);
        assert!((stats.utilization_pct(q.capacity()) - 80.0).abs() < f64::EPSILON);
    }
}
