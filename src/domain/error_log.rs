// Error log domain model - transient, self-expiring operator messages
use serde::Serialize;
use std::collections::VecDeque;
use std::time::Duration;
use tokio::time::Instant;

pub const DEFAULT_ERROR_TTL: Duration = Duration::from_millis(7000);

/// Epoch-millisecond key of an entry. Bumped past the previous id when
/// several entries are created within the same millisecond.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct EntryId(i64);

impl EntryId {
    pub fn as_i64(self) -> i64 {
        self.0
    }
}

#[derive(Debug, Clone)]
pub struct ErrorEntry {
    pub id: EntryId,
    pub message: String,
    pub created_at: Instant,
    /// Local wall-clock time of creation, for display
    pub reported_at: String,
}

impl ErrorEntry {
    pub fn display_text(&self) -> String {
        format!("Error at {}: {}", self.reported_at, self.message)
    }
}

#[derive(Debug)]
pub struct ErrorLog {
    /// Newest first
    entries: VecDeque<ErrorEntry>,
    ttl: Duration,
    last_id: Option<i64>,
}

impl ErrorLog {
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: VecDeque::new(),
            ttl,
            last_id: None,
        }
    }

    /// Always appends; identical messages are not merged.
    pub fn report(&mut self, message: impl Into<String>, now: Instant) -> EntryId {
        self.prune(now);

        let wall_clock = chrono::Local::now();
        let millis = wall_clock.timestamp_millis();
        let id = match self.last_id {
            Some(last) if last >= millis => last + 1,
            _ => millis,
        };
        self.last_id = Some(id);

        let entry = ErrorEntry {
            id: EntryId(id),
            message: message.into(),
            created_at: now,
            reported_at: wall_clock.format("%Y-%m-%d %H:%M:%S").to_string(),
        };
        tracing::debug!(id, message = %entry.message, "error entry created");
        self.entries.push_front(entry);
        EntryId(id)
    }

    /// Remove one entry. Returns true if the log became empty as a result.
    pub fn expire(&mut self, id: EntryId) -> bool {
        let before = self.entries.len();
        self.entries.retain(|entry| entry.id != id);
        let removed = self.entries.len() != before;
        if removed {
            tracing::debug!(id = id.0, "error entry expired");
        }
        removed && self.entries.is_empty()
    }

    /// Drop every entry whose lifetime has elapsed at `now`.
    pub fn prune(&mut self, now: Instant) {
        let ttl = self.ttl;
        self.entries
            .retain(|entry| now.saturating_duration_since(entry.created_at) < ttl);
    }

    /// Live entries at `now`, newest first.
    pub fn entries(&self, now: Instant) -> impl Iterator<Item = &ErrorEntry> {
        let ttl = self.ttl;
        self.entries
            .iter()
            .filter(move |entry| now.saturating_duration_since(entry.created_at) < ttl)
    }

    /// The container is shown exactly when something is in it.
    pub fn is_visible(&self, now: Instant) -> bool {
        self.entries(now).next().is_some()
    }
}

impl Default for ErrorLog {
    fn default() -> Self {
        Self::new(DEFAULT_ERROR_TTL)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn messages(log: &ErrorLog, now: Instant) -> Vec<String> {
        log.entries(now).map(|e| e.message.clone()).collect()
    }

    #[test]
    fn test_entry_lives_exactly_seven_seconds() {
        let mut log = ErrorLog::default();
        let t = Instant::now();
        log.report("HTTP error! Status: 500 Internal Server Error", t);

        assert!(log.is_visible(t + Duration::from_millis(6900)));
        assert_eq!(log.entries(t + Duration::from_millis(6999)).count(), 1);
        assert!(!log.is_visible(t + Duration::from_millis(7000)));
        assert!(!log.is_visible(t + Duration::from_millis(7100)));
    }

    #[test]
    fn test_newer_reports_do_not_renew_older_entries() {
        let mut log = ErrorLog::default();
        let t = Instant::now();
        log.report("same", t);
        log.report("same", t + Duration::from_secs(5));

        assert_eq!(log.entries(t + Duration::from_secs(6)).count(), 2);
        assert_eq!(log.entries(t + Duration::from_millis(7100)).count(), 1);
        assert!(!log.is_visible(t + Duration::from_millis(12_100)));
    }

    #[test]
    fn test_ids_unique_within_same_instant() {
        let mut log = ErrorLog::default();
        let t = Instant::now();
        let ids: Vec<EntryId> = (0..5).map(|i| log.report(format!("e{}", i), t)).collect();

        for pair in ids.windows(2) {
            assert!(pair[1] > pair[0]);
        }
    }

    #[test]
    fn test_most_recent_first() {
        let mut log = ErrorLog::default();
        let t = Instant::now();
        log.report("first", t);
        log.report("second", t + Duration::from_millis(10));
        log.report("third", t + Duration::from_millis(20));

        assert_eq!(
            messages(&log, t + Duration::from_millis(30)),
            vec!["third", "second", "first"]
        );
    }

    #[test]
    fn test_expire_reports_transition_to_empty() {
        let mut log = ErrorLog::default();
        let t = Instant::now();
        let a = log.report("a", t);
        let b = log.report("b", t);

        assert!(!log.expire(a));
        assert!(log.is_visible(t));
        assert!(log.expire(b));
        assert!(!log.is_visible(t));
        // already gone
        assert!(!log.expire(b));
    }

    #[test]
    fn test_report_prunes_dead_entries() {
        let mut log = ErrorLog::default();
        let t = Instant::now();
        log.report("old", t);
        log.report("new", t + Duration::from_secs(8));

        assert_eq!(messages(&log, t + Duration::from_secs(8)), vec!["new"]);
        assert!(log.entries.iter().all(|e| e.message != "old"));
    }

    #[test]
    fn test_display_text() {
        let mut log = ErrorLog::default();
        let t = Instant::now();
        log.report("boom", t);
        let entry = log.entries(t).next().unwrap();
        assert!(entry.display_text().starts_with("Error at "));
        assert!(entry.display_text().ends_with(": boom"));
    }
}
