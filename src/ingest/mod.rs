//! Ingestion cycle
//!
//! One cycle checks every source for a change, rebuilds the group map from
//! scratch when any changed, derives the free-room and teacher views and
//! writes the resulting [`Snapshot`] key by key.
//!
//! Sources and stores sit behind the [`ScheduleSource`] and
//! [`ScheduleStore`] traits; `HttpSource` (feature `http`) and
//! [`JsonDirStore`] are the production pair.

#[cfg(feature = "http")]
pub mod http;
pub mod poll;
pub mod store;
pub mod tracker;

use std::time::Instant;

use async_trait::async_trait;
use bytes::Bytes;
use chrono::NaiveDateTime;

use crate::error::Result;
use crate::schedule::{
    GroupMap, ParseReport, ScheduleAggregator, Snapshot, WeekTarget, compute_free_rooms,
    extract_teachers, format_timestamp,
};

#[cfg(feature = "http")]
pub use http::HttpSource;
pub use poll::PollSchedule;
pub use store::{JsonDirStore, MemoryStore, ScheduleStore};
pub use tracker::ChangeTracker;

/// Where schedule files come from
#[async_trait]
pub trait ScheduleSource: Send + Sync {
    /// `Last-Modified` of `url`, `None` when the source does not say
    async fn last_modified(&self, url: &str) -> Result<Option<String>>;

    /// Full content of `url`
    async fn fetch(&self, url: &str) -> Result<Bytes>;
}

/// Result of one [`IngestionCycle::run_once`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CycleOutcome {
    /// No source reported a change
    Unchanged,
    /// Sources changed but no file yielded any group; nothing was written
    NoData,
    Written {
        groups: usize,
        teachers: usize,
        target: WeekTarget,
    },
}

/// Polls a fixed list of sources and writes snapshots to a store
pub struct IngestionCycle<S, T> {
    source: S,
    store: T,
    urls: Vec<String>,
    aggregator: ScheduleAggregator,
    tracker: ChangeTracker,
}

impl<S: ScheduleSource, T: ScheduleStore> IngestionCycle<S, T> {
    pub fn new(source: S, store: T, urls: Vec<String>, aggregator: ScheduleAggregator) -> Self {
        IngestionCycle {
            source,
            store,
            urls,
            aggregator,
            tracker: ChangeTracker::new(),
        }
    }

    pub fn store(&self) -> &T {
        &self.store
    }

    pub fn tracker(&self) -> &ChangeTracker {
        &self.tracker
    }

    /// Run one cycle at local time `now`.
    ///
    /// Per-file fetch and parse failures are logged and skipped. A store
    /// failure is returned and leaves the change baseline untouched, so the
    /// next cycle retries.
    pub async fn run_once(&self, now: NaiveDateTime) -> Result<CycleOutcome> {
        if !self.any_changed().await {
            return Ok(CycleOutcome::Unchanged);
        }

        tracing::info!("starting update");
        let start = Instant::now();
        let (groups, report, parsed) = self.parse_all().await;

        if parsed == 0 || groups.is_empty() {
            tracing::warn!(parsed, "no valid data received, skipping update");
            // the change was seen; a broken file is retried on its next change
            self.tracker.commit();
            return Ok(CycleOutcome::NoData);
        }

        match self.write(groups, report, now).await {
            Ok(outcome) => {
                self.tracker.commit();
                tracing::info!(?outcome, elapsed = ?start.elapsed(), "update finished");
                Ok(outcome)
            }
            Err(err) => {
                self.tracker.rollback();
                tracing::error!(error = %err, "saving snapshot failed");
                Err(err)
            }
        }
    }

    async fn any_changed(&self) -> bool {
        let mut changed = false;
        for url in &self.urls {
            match self.source.last_modified(url).await {
                Ok(last_modified) => {
                    if self.tracker.observe(url, last_modified.as_deref()) {
                        tracing::info!(url, ?last_modified, "update detected");
                        changed = true;
                    }
                }
                Err(err) => tracing::warn!(url, error = %err, "HEAD failed"),
            }
        }
        changed
    }

    /// Fetch and parse every source into a fresh map; files are parsed one
    /// at a time into the shared map
    async fn parse_all(&self) -> (GroupMap, ParseReport, usize) {
        let mut groups = GroupMap::new();
        let mut report = ParseReport::default();
        let mut parsed = 0;

        for url in &self.urls {
            let bytes = match self.source.fetch(url).await {
                Ok(bytes) => bytes,
                Err(err) => {
                    tracing::warn!(url, error = %err, "fetch failed");
                    continue;
                }
            };
            match self.aggregator.parse_bytes(&bytes, &mut groups) {
                Ok(file_report) => {
                    report.merge(file_report);
                    parsed += 1;
                }
                Err(err) => tracing::warn!(url, error = %err, "parse failed"),
            }
        }
        (groups, report, parsed)
    }

    async fn write(
        &self,
        groups: GroupMap,
        report: ParseReport,
        now: NaiveDateTime,
    ) -> Result<CycleOutcome> {
        let updated_at = format_timestamp(now);
        let rooms = self.aggregator.lexicon().rooms();
        let (free_rooms, teachers) = rayon::join(
            || compute_free_rooms(&groups, rooms),
            || extract_teachers(&groups, &updated_at),
        );
        tracing::info!(teachers = teachers.len(), "extracted teacher schedules");

        let target = WeekTarget::from_dates(&report.dates, now.date());
        let outcome = CycleOutcome::Written {
            groups: groups.len(),
            teachers: teachers.len(),
            target,
        };

        let snapshot = Snapshot::build(groups, free_rooms, teachers, target, now)?
            .with_academic_week(report.week_number);
        for (key, value) in snapshot.entries() {
            self.store.put(key, value).await?;
        }
        Ok(outcome)
    }
}
