//! Activity log - bounded, append-only record of notable events

use std::collections::VecDeque;

use chrono::Utc;
use uuid::Uuid;

use crate::models::{LogEntry, NewLogEntry};

/// Default number of entries retained
pub const DEFAULT_LOG_CAPACITY: usize = 100;

/// Append-only log keeping the most recent `capacity` entries
#[derive(Debug, Clone)]
pub struct ActivityLog {
    entries: VecDeque<LogEntry>,
    capacity: usize,
    /// Entries ever appended, including evicted ones
    appended: u64,
}

impl ActivityLog {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_LOG_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            entries: VecDeque::with_capacity(capacity),
            capacity,
            appended: 0,
        }
    }

    /// Store an entry, assigning an id and timestamp if absent.
    /// Evicts the oldest entry once the bound is exceeded.
    pub fn append(&mut self, new: NewLogEntry) -> &LogEntry {
        let entry = LogEntry {
            id: Uuid::new_v4(),
            slot_id: new.slot_id,
            timestamp: new.timestamp.unwrap_or_else(Utc::now),
            event: new.event,
            details: new.details,
            attendee_count: new.attendee_count,
        };

        tracing::debug!(
            slot_id = %entry.slot_id,
            event = %entry.event,
            details = %entry.details,
            "Activity logged"
        );

        if self.entries.len() >= self.capacity {
            self.entries.pop_front();
        }
        self.entries.push_back(entry);
        self.appended += 1;
        // Just pushed, so back() is present
        &self.entries[self.entries.len() - 1]
    }

    /// The `n` most recent entries, most recent first
    pub fn recent(&self, n: usize) -> Vec<LogEntry> {
        self.entries.iter().rev().take(n).cloned().collect()
    }

    /// Most recent entries for one slot, most recent first
    pub fn recent_for_slot(&self, slot_id: &str, n: usize) -> Vec<LogEntry> {
        self.entries
            .iter()
            .rev()
            .filter(|e| e.slot_id == slot_id)
            .take(n)
            .cloned()
            .collect()
    }

    /// Number of entries ever appended
    pub fn appended(&self) -> u64 {
        self.appended
    }

    /// Entries appended after the log had seen `mark` appends, oldest first.
    ///
    /// Entries evicted in the meantime are gone and not returned.
    pub fn since(&self, mark: u64) -> Vec<LogEntry> {
        let new = self.appended.saturating_sub(mark) as usize;
        let skip = self.entries.len().saturating_sub(new);
        self.entries.iter().skip(skip).cloned().collect()
    }

    /// Entries oldest first
    pub fn iter(&self) -> impl Iterator<Item = &LogEntry> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

impl Default for ActivityLog {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::LogEvent;

    fn entry(n: usize) -> NewLogEntry {
        NewLogEntry::new("slot", LogEvent::AdminAction, format!("entry {}", n))
    }

    #[test]
    fn test_append_assigns_id_and_timestamp() {
        let mut log = ActivityLog::new();
        let first = log.append(entry(1)).clone();
        let second = log.append(entry(2)).clone();

        assert_ne!(first.id, second.id);
        assert!(first.timestamp <= second.timestamp);
    }

    #[test]
    fn test_append_keeps_supplied_timestamp() {
        let mut log = ActivityLog::new();
        let at = "2026-10-19T10:15:00Z".parse().unwrap();
        let stored = log.append(entry(1).at(at));
        assert_eq!(stored.timestamp, at);
    }

    #[test]
    fn test_bound_evicts_oldest() {
        let mut log = ActivityLog::new();
        for n in 1..=101 {
            log.append(entry(n));
        }

        assert_eq!(log.len(), 100);
        assert!(log.iter().all(|e| e.details != "entry 1"));

        let recent = log.recent(100);
        assert_eq!(recent.len(), 100);
        assert_eq!(recent[0].details, "entry 101");
        assert_eq!(recent[99].details, "entry 2");
    }

    #[test]
    fn test_recent_more_than_stored() {
        let mut log = ActivityLog::new();
        log.append(entry(1));
        log.append(entry(2));

        let recent = log.recent(10);
        assert_eq!(recent.len(), 2);
        assert_eq!(recent[0].details, "entry 2");
    }

    #[test]
    fn test_since_mark() {
        let mut log = ActivityLog::with_capacity(3);
        log.append(entry(1));
        let mark = log.appended();
        log.append(entry(2));
        log.append(entry(3));

        let new: Vec<_> = log.since(mark).into_iter().map(|e| e.details).collect();
        assert_eq!(new, vec!["entry 2", "entry 3"]);
        assert!(log.since(log.appended()).is_empty());

        for n in 4..=8 {
            log.append(entry(n));
        }
        assert_eq!(log.since(mark).len(), 3);
    }

    #[test]
    fn test_recent_for_slot() {
        let mut log = ActivityLog::new();
        log.append(NewLogEntry::new("a", LogEvent::ModeSwitched, "a1"));
        log.append(NewLogEntry::new("b", LogEvent::ModeSwitched, "b1"));
        log.append(NewLogEntry::new("a", LogEvent::ModeSwitched, "a2"));

        let a = log.recent_for_slot("a", 5);
        assert_eq!(a.len(), 2);
        assert_eq!(a[0].details, "a2");
    }
}
