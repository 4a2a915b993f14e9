// =============================================================================
// models.rs - THE NOUNS OF THE HARVEST
// =============================================================================
//
// A Source is where we look. A NormalizedEntry is what we keep. A FinalList
// is what we hand to the writer once every registry has been heard from.
// That's the whole vocabulary.
// =============================================================================

use std::fmt;

use regex::Regex;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::errors::ConfigError;

/// IANA's authoritative root zone listing. One TLD per line, upper-case,
/// with a `#` version comment on top.
pub const IANA_TLDS_URL: &str = "https://data.iana.org/TLD/tlds-alpha-by-domain.txt";
/// Anything that isn't a comment line.
pub const IANA_TLDS_PATTERN: &str = r"^[^#]+$";

/// The Public Suffix List. Comments start with `//`; we only want the
/// single-label rules, i.e. lines with no dot and no slash.
pub const PUBLIC_SUFFIX_URL: &str = "https://publicsuffix.org/list/effective_tld_names.dat";
pub const PUBLIC_SUFFIX_PATTERN: &str = r"^[^/.]+$";

/// Serialized form of a source, as it appears in `TLD_HARVEST_SOURCES`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceSpec {
    pub location: String,
    pub pattern: String,
}

impl SourceSpec {
    pub fn new(location: impl Into<String>, pattern: impl Into<String>) -> Self {
        Self {
            location: location.into(),
            pattern: pattern.into(),
        }
    }

    /// The two registries we trust out of the box.
    pub fn defaults() -> Vec<SourceSpec> {
        vec![
            SourceSpec::new(IANA_TLDS_URL, IANA_TLDS_PATTERN),
            SourceSpec::new(PUBLIC_SUFFIX_URL, PUBLIC_SUFFIX_PATTERN),
        ]
    }

    /// Validate the location and compile the pattern.
    pub fn compile(&self) -> Result<Source, ConfigError> {
        Source::new(&self.location, &self.pattern)
    }
}

/// One remote listing plus the rule that pulls a candidate token out of
/// each of its lines. Immutable after construction.
#[derive(Debug, Clone)]
pub struct Source {
    location: Url,
    pattern: Regex,
}

impl Source {
    pub fn new(location: &str, pattern: &str) -> Result<Self, ConfigError> {
        let location_url = Url::parse(location).map_err(|e| ConfigError::InvalidLocation {
            location: location.to_string(),
            reason: e.to_string(),
        })?;
        if !matches!(location_url.scheme(), "http" | "https") {
            return Err(ConfigError::InvalidLocation {
                location: location.to_string(),
                reason: format!("unsupported scheme {:?}", location_url.scheme()),
            });
        }
        let compiled = Regex::new(pattern).map_err(|e| ConfigError::InvalidPattern {
            location: location.to_string(),
            pattern: pattern.to_string(),
            source: e,
        })?;
        Ok(Self {
            location: location_url,
            pattern: compiled,
        })
    }

    pub fn location(&self) -> &Url {
        &self.location
    }

    pub fn pattern(&self) -> &Regex {
        &self.pattern
    }
}

/// A canonical, lower-case TLD that made it past the normalizer.
///
/// Only `extract::normalize` builds these, so holding one means the string
/// is non-empty, lower-case and not an `xn--` encoded label.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct NormalizedEntry(String);

impl NormalizedEntry {
    pub(crate) fn new_unchecked(value: String) -> Self {
        Self(value)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

}

impl fmt::Display for NormalizedEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// The finished product: every TLD, deduplicated, sorted ascending, plus the
/// locations it was built from (in the order they were configured).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FinalList {
    #[serde(rename = "tlds")]
    entries: Vec<NormalizedEntry>,
    #[serde(rename = "sources")]
    source_locations: Vec<Url>,
}

impl FinalList {
    /// `entries` must already be sorted and unique; the harvester is the
    /// only caller and guarantees both.
    pub(crate) fn new(entries: Vec<NormalizedEntry>, source_locations: Vec<Url>) -> Self {
        debug_assert!(entries.windows(2).all(|w| w[0] < w[1]));
        Self {
            entries,
            source_locations,
        }
    }

    pub fn entries(&self) -> &[NormalizedEntry] {
        &self.entries
    }

    pub fn source_locations(&self) -> &[Url] {
        &self.source_locations
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Convenience for callers (and tests) that just want the strings.
    pub fn as_strs(&self) -> Vec<&str> {
        self.entries.iter().map(NormalizedEntry::as_str).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_sources_compile() {
        let sources: Vec<Source> = SourceSpec::defaults()
            .iter()
            .map(|spec| spec.compile().unwrap())
            .collect();
        assert_eq!(sources.len(), 2);
        assert_eq!(sources[0].location().as_str(), IANA_TLDS_URL);
        assert_eq!(sources[1].location().as_str(), PUBLIC_SUFFIX_URL);
    }

    #[test]
    fn test_rejects_bad_location() {
        assert!(matches!(
            Source::new("not a url", ".*"),
            Err(ConfigError::InvalidLocation { .. })
        ));
        assert!(matches!(
            Source::new("ftp://example.org/tlds.txt", ".*"),
            Err(ConfigError::InvalidLocation { .. })
        ));
    }

    #[test]
    fn test_rejects_bad_pattern() {
        assert!(matches!(
            Source::new("https://example.org/tlds.txt", "(unclosed"),
            Err(ConfigError::InvalidPattern { .. })
        ));
    }

    #[test]
    fn test_final_list_serializes_with_provenance() {
        let list = FinalList::new(
            vec![
                NormalizedEntry::new_unchecked("com".into()),
                NormalizedEntry::new_unchecked("org".into()),
            ],
            vec![Url::parse("https://example.org/a").unwrap()],
        );
        let json = serde_json::to_value(&list).unwrap();
        assert_eq!(json["tlds"], serde_json::json!(["com", "org"]));
        assert_eq!(json["sources"], serde_json::json!(["https://example.org/a"]));
    }
}
