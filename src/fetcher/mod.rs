// =============================================================================
// fetcher/mod.rs - ONE TASK PER REGISTRY
// =============================================================================
//
// Each configured source gets its own tokio task running `fetch_source`.
// The task pulls the listing (retrying if we let it), shreds it line by
// line, and pushes every accepted TLD into the entry stream. If the listing
// can't be had, it pushes exactly one FetchError into the error stream and
// quits.
//
// The task owns its two channel senders. When it returns, on any path, the
// senders drop. Once the last fetcher is gone both streams disconnect, and
// that is how the merger knows the harvest is over.
//
// The transport lives behind `ContentFetcher` so tests can swap reqwest for
// an in-memory fake and never touch the network.
// =============================================================================

pub mod http;
#[cfg(test)]
pub(crate) mod scripted;

use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use crossbeam_channel::Sender;
use tokio::sync::watch;
use tracing::{debug, info, warn};
use url::Url;

use crate::errors::{FetchCause, FetchError};
use crate::extract;
use crate::metrics::{SourceReport, SourceStatus};
use crate::models::{NormalizedEntry, Source};

pub use http::HttpFetcher;

/// Pulls the full text of one listing.
///
/// Implementations must report a 4xx/5xx answer as `FetchCause::Status`
/// without reading the body.
#[async_trait]
pub trait ContentFetcher: Send + Sync {
    async fn fetch(&self, location: &Url) -> Result<String, FetchCause>;
}

/// Bounded retries with exponential backoff. One attempt means no retries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub attempts: u32,
    pub backoff: Duration,
}

impl RetryPolicy {
    pub fn new(attempts: u32, backoff: Duration) -> Self {
        Self {
            attempts: attempts.max(1),
            backoff,
        }
    }

    pub fn no_retries() -> Self {
        Self::new(1, Duration::ZERO)
    }

    /// Delay before attempt `next_attempt` (2-based: the first retry).
    pub fn delay_before(&self, next_attempt: u32) -> Duration {
        let exponent = next_attempt.saturating_sub(2).min(16);
        self.backoff.saturating_mul(1u32 << exponent)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::no_retries()
    }
}

/// Resolves once the cancellation flag reads `true`. If the sender is gone
/// the flag can never flip, so this never resolves.
pub(crate) async fn cancelled(cancel: &mut watch::Receiver<bool>) {
    if cancel.wait_for(|flag| *flag).await.is_err() {
        std::future::pending::<()>().await;
    }
}

/// Fetch with retries, racing every attempt and every backoff sleep against
/// the cancellation signal. Returns the outcome and how many attempts ran.
async fn fetch_with_retry<F>(
    fetcher: &F,
    location: &Url,
    retry: RetryPolicy,
    cancel: &mut watch::Receiver<bool>,
) -> (Result<String, FetchCause>, u32)
where
    F: ContentFetcher + ?Sized,
{
    let mut attempt = 0;
    loop {
        attempt += 1;
        if *cancel.borrow() {
            return (Err(FetchCause::Cancelled), attempt - 1);
        }

        let outcome = tokio::select! {
            result = fetcher.fetch(location) => result,
            _ = cancelled(cancel) => Err(FetchCause::Cancelled),
        };

        match outcome {
            Ok(body) => return (Ok(body), attempt),
            Err(cause) if attempt < retry.attempts && cause.is_retryable() => {
                let delay = retry.delay_before(attempt + 1);
                warn!(
                    source = %location,
                    attempt = attempt,
                    error = %cause,
                    retry_in_ms = delay.as_millis() as u64,
                    "Fetch failed, retrying"
                );
                tokio::select! {
                    _ = tokio::time::sleep(delay) => {}
                    _ = cancelled(cancel) => return (Err(FetchCause::Cancelled), attempt),
                }
            }
            Err(cause) => return (Err(cause), attempt),
        }
    }
}

/// Run one source to completion.
///
/// Sends accepted entries to `entries`, or a single `FetchError` to `errors`
/// if the listing could not be retrieved. Cancellation abandons the source
/// without reporting an error; the harvester already knows why it stopped.
pub async fn fetch_source<F>(
    fetcher: Arc<F>,
    source: Source,
    entries: Sender<NormalizedEntry>,
    errors: Sender<FetchError>,
    retry: RetryPolicy,
    mut cancel: watch::Receiver<bool>,
) -> SourceReport
where
    F: ContentFetcher + ?Sized,
{
    let started = Instant::now();
    let location = source.location().clone();
    let mut report = SourceReport::new(location.clone());

    info!(source = %location, "Fetching {}", location);

    let (outcome, attempts) = fetch_with_retry(&*fetcher, &location, retry, &mut cancel).await;
    report.attempts = attempts;

    let body = match outcome {
        Ok(body) => body,
        Err(FetchCause::Cancelled) => {
            debug!(source = %location, "Fetch abandoned, harvest was cancelled");
            return report.finish(SourceStatus::Cancelled, started.elapsed());
        }
        Err(cause) => {
            let err = FetchError {
                location: location.clone(),
                attempts,
                cause,
            };
            if errors.send(err).is_err() {
                warn!(source = %location, "Merger is gone, dropping fetch error");
            }
            return report.finish(SourceStatus::Failed, started.elapsed());
        }
    };

    for line in extract::lines(&body) {
        report.lines_scanned += 1;
        let Some(entry) = extract::harvest_line(line, source.pattern()) else {
            continue;
        };
        if entries.send(entry).is_err() {
            warn!(source = %location, "Merger is gone, abandoning scan");
            return report.finish(SourceStatus::Cancelled, started.elapsed());
        }
        report.entries_emitted += 1;
    }

    info!(
        source = %location,
        lines = report.lines_scanned,
        entries = report.entries_emitted,
        attempts = attempts,
        "Source harvested"
    );
    report.finish(SourceStatus::Fetched, started.elapsed())
}
