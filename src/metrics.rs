// ═══════════════════════════════════════════════════════════════
// RUN REPORT - What each registry gave us, and what we kept
// ═══════════════════════════════════════════════════════════════
//
// Every fetcher counts what it saw and hands the numbers back through its
// JoinHandle. The merger counts what it kept. The harvester stitches both
// into one serializable report per run. No shared counters: the fetchers
// don't touch anything but their two channels.

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use url::Url;
use uuid::Uuid;

/// How a single source's fetch ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceStatus {
    Fetched,
    Failed,
    Cancelled,
}

/// Per-source numbers, produced by the fetcher that owned the source.
#[derive(Debug, Clone, Serialize)]
pub struct SourceReport {
    pub location: Url,
    pub status: SourceStatus,
    pub attempts: u32,
    pub lines_scanned: u64,
    pub entries_emitted: u64,
    pub elapsed_ms: u64,
}

impl SourceReport {
    pub(crate) fn new(location: Url) -> Self {
        Self {
            location,
            status: SourceStatus::Failed,
            attempts: 0,
            lines_scanned: 0,
            entries_emitted: 0,
            elapsed_ms: 0,
        }
    }

    pub(crate) fn finish(mut self, status: SourceStatus, elapsed: Duration) -> Self {
        self.status = status;
        self.elapsed_ms = elapsed.as_millis() as u64;
        self
    }
}

/// Whole-run summary attached to a successful harvest.
#[derive(Debug, Clone, Serialize)]
pub struct HarvestReport {
    pub run_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub sources: Vec<SourceReport>,
    /// Entries that arrived at the merger, duplicates included.
    pub entries_received: u64,
    pub duplicates_dropped: u64,
    pub unique_entries: u64,
}

impl HarvestReport {
    pub fn elapsed(&self) -> Duration {
        (self.finished_at - self.started_at)
            .to_std()
            .unwrap_or_default()
    }

    pub fn lines_scanned(&self) -> u64 {
        self.sources.iter().map(|s| s.lines_scanned).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_source_report_finish_sets_status_and_elapsed() {
        let report = SourceReport::new(Url::parse("https://example.org/").unwrap())
            .finish(SourceStatus::Fetched, Duration::from_millis(1500));
        assert_eq!(report.status, SourceStatus::Fetched);
        assert_eq!(report.elapsed_ms, 1500);
    }

    #[test]
    fn test_status_serializes_snake_case() {
        let json = serde_json::to_string(&SourceStatus::Cancelled).unwrap();
        assert_eq!(json, "\"cancelled\"");
    }
}
