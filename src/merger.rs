// =============================================================================
// merger.rs - THE ONE AND ONLY WRITER
// =============================================================================
//
// Every fetcher shouts into the same two crossbeam channels: accepted TLDs
// on one, terminal fetch errors on the other. The merger is the single
// consumer on the far end. It owns the result set and the failure list
// outright, so there is nothing to lock and nothing to race.
//
// Lifecycle:
// 1. select! across both channels, handle whichever has something first
// 2. when one channel disconnects, drain the other one to the bottom
// 3. when both are disconnected and empty, hand everything back by value
//
// A channel only disconnects after every fetcher has dropped its sender, so
// by the time `run` returns, every value any fetcher ever sent has been
// accounted for. The harvester waits on that return value before it reads
// a single TLD.
//
// `run` blocks, so the harvester parks it on tokio's blocking pool.
// =============================================================================

use std::collections::HashSet;

use crossbeam_channel::{select, Receiver};
use tracing::{debug, error, info};

use crate::errors::FetchError;
use crate::models::NormalizedEntry;

/// Everything the merger accumulated, handed over once both streams closed.
#[derive(Debug, Default)]
pub struct MergeOutcome {
    pub entries: HashSet<NormalizedEntry>,
    pub failures: Vec<FetchError>,
    /// Entries received, duplicates included.
    pub received: u64,
    pub duplicates: u64,
}

impl MergeOutcome {
    fn accept(&mut self, entry: NormalizedEntry) {
        self.received += 1;
        if !self.entries.insert(entry) {
            self.duplicates += 1;
        }
    }

    fn record(&mut self, failure: FetchError) {
        error!(
            source = %failure.location,
            attempts = failure.attempts,
            "{}", failure
        );
        self.failures.push(failure);
    }

    pub fn any_failed(&self) -> bool {
        !self.failures.is_empty()
    }
}

enum Event {
    Entry(NormalizedEntry),
    Failure(FetchError),
    EntriesClosed,
    ErrorsClosed,
}

pub struct Merger {
    entries: Receiver<NormalizedEntry>,
    errors: Receiver<FetchError>,
}

impl Merger {
    pub fn new(entries: Receiver<NormalizedEntry>, errors: Receiver<FetchError>) -> Self {
        Self { entries, errors }
    }

    /// Consume both streams until they are closed and drained.
    pub fn run(self) -> MergeOutcome {
        let mut outcome = MergeOutcome::default();
        debug!("Merger online, waiting on entry and error streams");

        loop {
            let event = select! {
                recv(self.entries) -> msg => msg.map_or(Event::EntriesClosed, Event::Entry),
                recv(self.errors) -> msg => msg.map_or(Event::ErrorsClosed, Event::Failure),
            };

            match event {
                Event::Entry(entry) => outcome.accept(entry),
                Event::Failure(failure) => outcome.record(failure),
                Event::EntriesClosed => {
                    for failure in self.errors.iter() {
                        outcome.record(failure);
                    }
                    break;
                }
                Event::ErrorsClosed => {
                    for entry in self.entries.iter() {
                        outcome.accept(entry);
                    }
                    break;
                }
            }
        }

        info!(
            received = outcome.received,
            unique = outcome.entries.len(),
            duplicates = outcome.duplicates,
            failures = outcome.failures.len(),
            "Merger drained both streams"
        );
        outcome
    }
}
