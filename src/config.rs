// =============================================================================
// config.rs - THE KNOBS
// =============================================================================
//
// Everything tunable lives here, and everything can be overridden with an
// environment variable prefixed TLD_HARVEST_. A `.env` file in the working
// directory is picked up too, for people who don't like exporting things.
//
// Defaults reproduce the classic behaviour: two registries, one attempt
// each, write `tlds.rs` next to wherever you ran it.
// =============================================================================

use std::env;
use std::path::PathBuf;
use std::time::Duration;

use crate::errors::ConfigError;
use crate::fetcher::RetryPolicy;
use crate::models::{Source, SourceSpec};
use crate::output::OutputFormat;

#[derive(Debug, Clone)]
pub struct Config {
    // =========================================================================
    // SOURCES
    // =========================================================================

    /// The registries to harvest, in the order they're credited in the output.
    /// Override with a JSON array:
    /// `TLD_HARVEST_SOURCES='[{"location":"https://...","pattern":"^[^#]+$"}]'`
    pub sources: Vec<SourceSpec>,

    // =========================================================================
    // OUTPUT
    // =========================================================================

    /// Where the generated list goes. Default: tlds.rs
    pub output_path: PathBuf,

    /// `rust` for a generated const slice, `json` for everything else.
    pub output_format: OutputFormat,

    // =========================================================================
    // NETWORK
    // =========================================================================

    /// Per-request timeout. Default: 30 seconds.
    pub fetch_timeout: Duration,

    /// Deadline for the whole harvest. `None` (set 0) waits forever.
    /// Default: 120 seconds.
    pub overall_timeout: Option<Duration>,

    /// Attempts per source. 1 means no retries.
    pub fetch_attempts: u32,

    /// Wait before the first retry; doubled after each one.
    pub retry_backoff: Duration,

    pub user_agent: String,

    // =========================================================================
    // LOGGING
    // =========================================================================

    /// Emit JSON log lines instead of the human-readable format.
    pub log_json: bool,
}

impl Config {
    /// Load configuration from the process environment (and `.env`).
    pub fn from_env() -> Result<Self, ConfigError> {
        // No .env file is fine.
        let _ = dotenvy::dotenv();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build a config from any key lookup. Missing or unparsable numeric
    /// values fall back to their defaults; malformed sources or formats are
    /// errors, since guessing there would produce the wrong list.
    pub fn from_lookup<L>(lookup: L) -> Result<Self, ConfigError>
    where
        L: Fn(&str) -> Option<String>,
    {
        let get = |key: &str, default: &str| lookup(key).unwrap_or_else(|| default.to_string());

        let sources = match lookup("TLD_HARVEST_SOURCES") {
            Some(raw) if !raw.trim().is_empty() => serde_json::from_str(&raw)?,
            _ => SourceSpec::defaults(),
        };

        let overall_secs: u64 = get("TLD_HARVEST_OVERALL_TIMEOUT_SECS", "120").parse().unwrap_or(120);

        Ok(Config {
            sources,
            output_path: PathBuf::from(get("TLD_HARVEST_OUTPUT_PATH", "tlds.rs")),
            output_format: get("TLD_HARVEST_OUTPUT_FORMAT", "rust").parse()?,
            fetch_timeout: Duration::from_secs(
                get("TLD_HARVEST_FETCH_TIMEOUT_SECS", "30").parse().unwrap_or(30),
            ),
            overall_timeout: (overall_secs > 0).then(|| Duration::from_secs(overall_secs)),
            fetch_attempts: get("TLD_HARVEST_FETCH_ATTEMPTS", "1").parse::<u32>().unwrap_or(1).max(1),
            retry_backoff: Duration::from_millis(
                get("TLD_HARVEST_RETRY_BACKOFF_MS", "500").parse().unwrap_or(500),
            ),
            user_agent: get(
                "TLD_HARVEST_USER_AGENT",
                concat!("tld_harvester/", env!("CARGO_PKG_VERSION")),
            ),
            log_json: matches!(
                get("TLD_HARVEST_LOG_JSON", "false").to_ascii_lowercase().as_str(),
                "1" | "true" | "yes"
            ),
        })
    }

    /// Validate and compile every configured source.
    pub fn compile_sources(&self) -> Result<Vec<Source>, ConfigError> {
        self.sources.iter().map(SourceSpec::compile).collect()
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(self.fetch_attempts, self.retry_backoff)
    }
}
