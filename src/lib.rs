// =============================================================================
// tld_harvester - the library half
// =============================================================================
//
// Fetch every configured TLD registry at once, shred the listings into
// lower-case TLDs, merge them through a single owner, and hand back one
// sorted list or one error. Nothing in between.
//
//   config     → which registries, where the output goes, how patient to be
//   fetcher    → one tokio task per registry, plus the reqwest transport
//   extract    → line splitting, pattern matching, normalization
//   merger     → the single consumer that owns the result set
//   coordinator→ launches everything, waits, decides
//   output     → renders and writes the final list
//   metrics    → per-run report
// =============================================================================

pub mod config;
pub mod coordinator;
pub mod errors;
pub mod extract;
pub mod fetcher;
pub mod merger;
pub mod metrics;
pub mod models;
pub mod output;

pub use config::Config;
pub use coordinator::{Harvest, Harvester};
pub use errors::{FetchCause, FetchError, HarvestError};
pub use fetcher::{ContentFetcher, HttpFetcher, RetryPolicy};
pub use models::{FinalList, NormalizedEntry, Source, SourceSpec};
pub use output::OutputFormat;
