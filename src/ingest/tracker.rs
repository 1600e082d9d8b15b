//! Change detection over `Last-Modified` headers

use std::collections::HashMap;

use parking_lot::Mutex;

/// Last seen `Last-Modified` value per source URL.
///
/// New observations are staged; they only become the baseline once the
/// cycle that saw them has written its snapshot. Rolling back after a failed
/// write makes the next poll see the same change again.
#[derive(Debug, Default)]
pub struct ChangeTracker {
    committed: Mutex<HashMap<String, String>>,
    staged: Mutex<HashMap<String, String>>,
}

impl ChangeTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a HEAD result and report whether the source changed.
    ///
    /// A missing header (or a failed HEAD, passed as `None`) never counts as
    /// a change, even when a header was seen before; the baseline is kept so
    /// the source is compared against it again once the header returns. A
    /// first header or one that differs from the baseline is a change.
    pub fn observe(&self, url: &str, last_modified: Option<&str>) -> bool {
        let Some(value) = last_modified else {
            return false;
        };
        let changed = self.committed.lock().get(url).map(String::as_str) != Some(value);
        if changed {
            self.staged.lock().insert(url.to_string(), value.to_string());
        }
        changed
    }

    /// Make the staged observations the new baseline
    pub fn commit(&self) {
        let staged = std::mem::take(&mut *self.staged.lock());
        self.committed.lock().extend(staged);
    }

    /// Forget the staged observations
    pub fn rollback(&self) {
        self.staged.lock().clear();
    }

    /// Committed value for `url`
    pub fn last_seen(&self, url: &str) -> Option<String> {
        self.committed.lock().get(url).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const URL: &str = "https://example.edu/raspisanie.xls";

    #[test]
    fn test_first_header_is_a_change() {
        let tracker = ChangeTracker::new();
        assert!(tracker.observe(URL, Some("Mon, 12 Jan 2026 06:00:00 GMT")));
        tracker.commit();
        assert!(!tracker.observe(URL, Some("Mon, 12 Jan 2026 06:00:00 GMT")));
        assert!(tracker.observe(URL, Some("Tue, 13 Jan 2026 06:00:00 GMT")));
    }

    #[test]
    fn test_missing_header_is_not_a_change() {
        let tracker = ChangeTracker::new();
        assert!(!tracker.observe(URL, None));
        tracker.commit();
        assert_eq!(tracker.last_seen(URL), None);
    }

    #[test]
    fn test_header_disappearing_keeps_baseline() {
        let tracker = ChangeTracker::new();
        assert!(tracker.observe(URL, Some("v1")));
        tracker.commit();

        assert!(!tracker.observe(URL, None));
        tracker.commit();
        assert_eq!(tracker.last_seen(URL).as_deref(), Some("v1"));
        assert!(!tracker.observe(URL, Some("v1")));
        assert!(tracker.observe(URL, Some("v2")));
    }

    #[test]
    fn test_rollback_keeps_change_pending() {
        let tracker = ChangeTracker::new();
        assert!(tracker.observe(URL, Some("v1")));
        tracker.rollback();
        assert!(tracker.observe(URL, Some("v1")));
        tracker.commit();
        assert_eq!(tracker.last_seen(URL).as_deref(), Some("v1"));
        assert!(!tracker.observe(URL, Some("v1")));
    }
}
