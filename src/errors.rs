// =============================================================================
// errors.rs - EVERY WAY A HARVEST CAN GO WRONG
// =============================================================================
//
// A registry can be unreachable, a registry can answer with a 503, the whole
// run can blow its deadline, or somebody can hit Ctrl-C. Each of those gets a
// name here so the caller can decide how loudly to complain.
//
// One rule matters more than the rest: a single failed source fails the
// whole harvest. A half-merged TLD list that looks complete is worse than no
// list at all.
// =============================================================================

use std::fmt;
use std::path::PathBuf;

use thiserror::Error;
use url::Url;

/// Why one fetch attempt against one source did not produce a body.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetchCause {
    /// The request never got a usable answer: DNS, TLS, connect, timeout,
    /// or the body stream died halfway through.
    #[error("{0}")]
    Transport(String),

    /// The server answered, but with a 4xx/5xx status.
    #[error("{code} {reason}")]
    Status { code: u16, reason: String },

    /// The shared cancellation signal fired while we were waiting.
    #[error("cancelled")]
    Cancelled,
}

impl FetchCause {
    /// Transport failures and server-side errors may go away on their own;
    /// a 404 will still be a 404 in half a second.
    pub fn is_retryable(&self) -> bool {
        match self {
            FetchCause::Transport(_) => true,
            FetchCause::Status { code, .. } => *code >= 500,
            FetchCause::Cancelled => false,
        }
    }
}

impl From<reqwest::Error> for FetchCause {
    fn from(err: reqwest::Error) -> Self {
        match err.status() {
            Some(status) => FetchCause::Status {
                code: status.as_u16(),
                reason: status.canonical_reason().unwrap_or("").to_string(),
            },
            None => FetchCause::Transport(err.to_string()),
        }
    }
}

/// A terminal failure for one source, after every allowed attempt.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("could not fetch {location}: {cause}")]
pub struct FetchError {
    pub location: Url,
    pub attempts: u32,
    #[source]
    pub cause: FetchCause,
}

/// Terminal errors surfaced by the harvester to its caller.
#[derive(Debug, Error)]
pub enum HarvestError {
    #[error("no sources configured")]
    NoSources,

    /// At least one source could not be retrieved. Nothing partial is
    /// returned alongside this.
    #[error("there were some errors while fetching the TLDs: {}", FailureList(.failures))]
    AggregateFetch { failures: Vec<FetchError> },

    #[error("harvest did not finish within {0:?}")]
    Timeout(std::time::Duration),

    #[error("harvest cancelled by shutdown signal")]
    Cancelled,

    /// A pipeline task panicked or was aborted underneath us.
    #[error("pipeline task failed: {0}")]
    Worker(String),
}

/// Renders `a; b; c` for the aggregate message.
struct FailureList<'a>(&'a [FetchError]);

impl fmt::Display for FailureList<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, failure) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str("; ")?;
            }
            write!(f, "{}", failure)?;
        }
        Ok(())
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid source location {location:?}: {reason}")]
    InvalidLocation { location: String, reason: String },

    #[error("invalid pattern {pattern:?} for {location}: {source}")]
    InvalidPattern {
        location: String,
        pattern: String,
        #[source]
        source: regex::Error,
    },

    #[error("could not parse TLD_HARVEST_SOURCES: {0}")]
    SourceList(#[from] serde_json::Error),

    #[error("unknown output format {0:?} (expected \"rust\" or \"json\")")]
    OutputFormat(String),
}

#[derive(Debug, Error)]
pub enum OutputError {
    #[error("could not write {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("could not serialize TLD list: {0}")]
    Json(#[from] serde_json::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    fn failure(url: &str, cause: FetchCause) -> FetchError {
        FetchError {
            location: Url::parse(url).unwrap(),
            attempts: 1,
            cause,
        }
    }

    #[test]
    fn test_fetch_error_names_location_and_cause() {
        let err = failure(
            "https://example.org/list.txt",
            FetchCause::Status { code: 503, reason: "Service Unavailable".into() },
        );
        assert_eq!(
            err.to_string(),
            "could not fetch https://example.org/list.txt: 503 Service Unavailable"
        );
    }

    #[test]
    fn test_aggregate_lists_every_failure() {
        let err = HarvestError::AggregateFetch {
            failures: vec![
                failure("https://a.example/", FetchCause::Transport("connection refused".into())),
                failure("https://b.example/", FetchCause::Status { code: 404, reason: "Not Found".into() }),
            ],
        };
        let msg = err.to_string();
        assert!(msg.contains("https://a.example/: connection refused"));
        assert!(msg.contains("; could not fetch https://b.example/: 404 Not Found"));
    }

    #[test]
    fn test_retryable_causes() {
        assert!(FetchCause::Transport("reset".into()).is_retryable());
        assert!(FetchCause::Status { code: 502, reason: String::new() }.is_retryable());
        assert!(!FetchCause::Status { code: 404, reason: String::new() }.is_retryable());
        assert!(!FetchCause::Cancelled.is_retryable());
    }
}
