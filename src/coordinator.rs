// =============================================================================
// coordinator.rs - MISSION CONTROL
// =============================================================================
//
// The harvester launches one fetcher per source and one merger, then waits
// for two things, in this order:
//
//   1. every fetcher's JoinHandle (the join barrier)
//   2. the merger's JoinHandle (the drain)
//
// Only the second one proves the merger has swallowed everything the
// fetchers sent. Reading results after (1) alone would race the merger.
//
// Step (1) is raced against the overall deadline and the external shutdown
// signal. If either wins, the cancellation flag flips, every fetcher drops
// what it's doing, and we bail out with Timeout or Cancelled right away.
//
// If any source failed, the whole harvest fails. We do not publish a TLD list
// built from half the registries.
// =============================================================================

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use futures::future::join_all;
use rayon::prelude::*;
use tokio::sync::watch;
use tracing::{info, info_span, warn, Instrument};
use uuid::Uuid;

use crate::errors::HarvestError;
use crate::fetcher::{self, fetch_source, ContentFetcher, RetryPolicy};
use crate::merger::Merger;
use crate::metrics::{HarvestReport, SourceReport};
use crate::models::{FinalList, NormalizedEntry, Source};

/// A successful run: the list plus the numbers behind it.
#[derive(Debug, Clone)]
pub struct Harvest {
    pub list: FinalList,
    pub report: HarvestReport,
}

pub struct Harvester<F: ContentFetcher + 'static> {
    fetcher: Arc<F>,
    retry: RetryPolicy,
    deadline: Option<Duration>,
    shutdown: Option<watch::Receiver<bool>>,
}

impl<F: ContentFetcher + 'static> Harvester<F> {
    pub fn new(fetcher: F) -> Self {
        Self::from_arc(Arc::new(fetcher))
    }

    pub fn from_arc(fetcher: Arc<F>) -> Self {
        Self {
            fetcher,
            retry: RetryPolicy::default(),
            deadline: None,
            shutdown: None,
        }
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Fail with `HarvestError::Timeout` if the fetchers haven't all
    /// finished within `deadline`.
    pub fn with_deadline(mut self, deadline: Duration) -> Self {
        self.deadline = Some(deadline);
        self
    }

    /// Abort the run with `HarvestError::Cancelled` when this flips to true.
    pub fn with_shutdown(mut self, shutdown: watch::Receiver<bool>) -> Self {
        self.shutdown = Some(shutdown);
        self
    }

    /// Fetch, merge, and sort every source. All or nothing.
    pub async fn run(&self, sources: Vec<Source>) -> Result<Harvest, HarvestError> {
        if sources.is_empty() {
            return Err(HarvestError::NoSources);
        }

        let run_id = Uuid::new_v4();
        let span = info_span!("harvest", %run_id, sources = sources.len());
        self.run_inner(run_id, sources).instrument(span).await
    }

    async fn run_inner(&self, run_id: Uuid, sources: Vec<Source>) -> Result<Harvest, HarvestError> {
        let started_at = Utc::now();
        let source_locations: Vec<_> = sources.iter().map(|s| s.location().clone()).collect();

        let (entry_tx, entry_rx) = crossbeam_channel::unbounded();
        let (error_tx, error_rx) = crossbeam_channel::unbounded();
        let (cancel_tx, cancel_rx) = watch::channel(false);

        info!("🚀 Launching {} fetchers", sources.len());
        let fetchers: Vec<_> = sources
            .into_iter()
            .map(|source| {
                tokio::spawn(
                    fetch_source(
                        Arc::clone(&self.fetcher),
                        source,
                        entry_tx.clone(),
                        error_tx.clone(),
                        self.retry,
                        cancel_rx.clone(),
                    )
                    .in_current_span(),
                )
            })
            .collect();

        // From here on only the fetchers hold senders; when they're all done
        // the streams disconnect and the merger winds down.
        drop(entry_tx);
        drop(error_tx);

        let merger = Merger::new(entry_rx, error_rx);
        let merger_span = tracing::Span::current();
        let merger_handle = tokio::task::spawn_blocking(move || merger_span.in_scope(|| merger.run()));

        let reports = match self.join_fetchers(fetchers).await {
            Ok(reports) => reports,
            Err(err) => {
                let _ = cancel_tx.send(true);
                warn!(error = %err, "Harvest aborted, fetchers told to stand down");
                return Err(err);
            }
        };

        let outcome = merger_handle
            .await
            .map_err(|e| HarvestError::Worker(format!("merger: {e}")))?;

        if outcome.any_failed() {
            return Err(HarvestError::AggregateFetch {
                failures: outcome.failures,
            });
        }

        let received = outcome.received;
        let duplicates = outcome.duplicates;
        let entries = sort_entries(outcome.entries.into_par_iter().collect());
        let list = FinalList::new(entries, source_locations);

        let report = HarvestReport {
            run_id,
            started_at,
            finished_at: Utc::now(),
            sources: reports,
            entries_received: received,
            duplicates_dropped: duplicates,
            unique_entries: list.len() as u64,
        };
        info!(
            tlds = list.len(),
            duplicates = duplicates,
            elapsed_ms = report.elapsed().as_millis() as u64,
            "✅ Harvest complete"
        );

        Ok(Harvest { list, report })
    }

    /// The join barrier, raced against the deadline and external shutdown.
    async fn join_fetchers(
        &self,
        fetchers: Vec<tokio::task::JoinHandle<SourceReport>>,
    ) -> Result<Vec<SourceReport>, HarvestError> {
        let barrier = async {
            join_all(fetchers)
                .await
                .into_iter()
                .map(|joined| joined.map_err(|e| HarvestError::Worker(format!("fetcher: {e}"))))
                .collect::<Result<Vec<_>, _>>()
        };

        let deadline = async {
            match self.deadline {
                Some(limit) => {
                    tokio::time::sleep(limit).await;
                    limit
                }
                None => std::future::pending().await,
            }
        };

        let mut shutdown_rx = self.shutdown.clone();
        let shutdown = async {
            match shutdown_rx.as_mut() {
                Some(rx) => fetcher::cancelled(rx).await,
                None => std::future::pending().await,
            }
        };

        tokio::select! {
            reports = barrier => reports,
            limit = deadline => Err(HarvestError::Timeout(limit)),
            _ = shutdown => Err(HarvestError::Cancelled),
        }
    }
}

fn sort_entries(mut entries: Vec<NormalizedEntry>) -> Vec<NormalizedEntry> {
    entries.par_sort_unstable();
    entries
}
