//! Demo schedule: three slots spread across the day

use chrono::{DateTime, Duration, Utc};

use crate::models::WebinarSlot;

/// Three demo slots relative to `now`, switching at +75m, +5h15m and +9h15m
pub fn sample_slots(now: DateTime<Utc>) -> Vec<WebinarSlot> {
    vec![
        WebinarSlot::new(
            "morning_sales_training",
            "Morning Webinar - Sales Training",
            now,
            now + Duration::minutes(75),
        )
        .with_sources(
            "https://demo.everwebinar.com/session/sales-training-12345",
            "https://zoom.us/j/123456789",
        ),
        WebinarSlot::new(
            "afternoon_product_demo",
            "Afternoon Webinar - Product Demo",
            now + Duration::hours(4),
            now + Duration::hours(5) + Duration::minutes(15),
        )
        .with_sources(
            "https://demo.everwebinar.com/session/product-demo-67890",
            "https://zoom.us/j/987654321",
        ),
        WebinarSlot::new(
            "evening_qa_session",
            "Evening Webinar - Q&A Session",
            now + Duration::hours(8),
            now + Duration::hours(9) + Duration::minutes(15),
        )
        .with_sources(
            "https://demo.everwebinar.com/session/qa-session-11111",
            "https://zoom.us/j/555666777",
        ),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::invariants::check_schedule;
    use crate::utils::{is_valid_live_url, is_valid_replay_url};

    #[test]
    fn test_sample_slots_are_valid() {
        let now = Utc::now();
        let slots = sample_slots(now);
        assert_eq!(slots.len(), 3);
        assert_eq!(slots[0].scheduled_switch_time, now + Duration::minutes(75));
        for slot in &slots {
            assert!(check_schedule(slot).is_ok());
            assert!(is_valid_replay_url(&slot.replay_url));
            assert!(is_valid_live_url(&slot.live_url));
            assert!(!slot.switch_due(now));
        }
    }
}
