// =============================================================================
// extract.rs - THE LINE SHREDDER
// =============================================================================
//
// Registry listings are plain text. One candidate per line, surrounded by
// comments, blank lines, wildcard rules and whatever else the maintainers
// felt like adding this week. This module turns that into TLDs:
//
// 1. `lines` splits a body on '\n' using memchr, which walks the buffer with
//    SIMD instead of one byte at a time.
// 2. `extract` runs the source's regex over one line and hands back the
//    leftmost match, or nothing.
// 3. `normalize` lower-cases the match and throws away `xn--` labels, since
//    the decoded Unicode form of the same TLD is already in the list.
//
// None of these can fail. A line that doesn't match is just a line we don't
// care about.
// =============================================================================

use regex::Regex;

use crate::models::NormalizedEntry;

/// The IDNA ASCII-compatible encoding marker.
pub const ENCODED_PREFIX: &str = "xn--";

/// Iterate over the lines of `body`. A line is any maximal run of bytes
/// without `\n`; a trailing `\r` is dropped so CRLF listings behave. A body
/// ending in `\n` does not produce a trailing empty line.
pub fn lines(body: &str) -> Lines<'_> {
    Lines { rest: body }
}

pub struct Lines<'a> {
    rest: &'a str,
}

impl<'a> Iterator for Lines<'a> {
    type Item = &'a str;

    fn next(&mut self) -> Option<&'a str> {
        if self.rest.is_empty() {
            return None;
        }
        let line = match memchr::memchr(b'\n', self.rest.as_bytes()) {
            Some(idx) => {
                let (line, rest) = self.rest.split_at(idx);
                self.rest = &rest[1..];
                line
            }
            None => std::mem::take(&mut self.rest),
        };
        Some(line.strip_suffix('\r').unwrap_or(line))
    }
}

/// Leftmost match of `pattern` in `line`. Empty matches count as no match.
pub fn extract<'a>(line: &'a str, pattern: &Regex) -> Option<&'a str> {
    pattern
        .find(line)
        .map(|m| m.as_str())
        .filter(|token| !token.is_empty())
}

/// Canonicalize a candidate token, or reject it.
pub fn normalize(token: &str) -> Option<NormalizedEntry> {
    let lowered = token.to_lowercase();
    if lowered.is_empty() || lowered.starts_with(ENCODED_PREFIX) {
        return None;
    }
    Some(NormalizedEntry::new_unchecked(lowered))
}

/// Extractor and normalizer back to back, the way a fetcher applies them.
pub fn harvest_line(line: &str, pattern: &Regex) -> Option<NormalizedEntry> {
    extract(line, pattern).and_then(normalize)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{IANA_TLDS_PATTERN, PUBLIC_SUFFIX_PATTERN};

    #[test]
    fn test_lines_handles_crlf_and_missing_final_newline() {
        let collected: Vec<&str> = lines("AAA\r\nCOM\n\nORG").collect();
        assert_eq!(collected, vec!["AAA", "COM", "", "ORG"]);
    }

    #[test]
    fn test_lines_on_empty_body() {
        assert_eq!(lines("").count(), 0);
        assert_eq!(lines("com\n").collect::<Vec<_>>(), vec!["com"]);
    }

    #[test]
    fn test_iana_pattern_skips_comments() {
        let re = Regex::new(IANA_TLDS_PATTERN).unwrap();
        assert_eq!(extract("# Version 2024010100", &re), None);
        assert_eq!(extract("COM", &re), Some("COM"));
        assert_eq!(extract("", &re), None);
    }

    #[test]
    fn test_public_suffix_pattern_keeps_single_labels() {
        let re = Regex::new(PUBLIC_SUFFIX_PATTERN).unwrap();
        assert_eq!(extract("// ===BEGIN ICANN DOMAINS===", &re), None);
        assert_eq!(extract("co.uk", &re), None);
        assert_eq!(extract("*.ck", &re), None);
        assert_eq!(extract("uk", &re), Some("uk"));
        assert_eq!(extract("香港", &re), Some("香港"));
    }

    #[test]
    fn test_normalize_lowercases() {
        assert_eq!(normalize("COM").unwrap().as_str(), "com");
        assert_eq!(normalize("ÉDU").unwrap().as_str(), "édu");
    }

    #[test]
    fn test_normalize_rejects_encoded_prefix_in_any_case() {
        for token in ["xn--p1ai", "XN--P1AI", "Xn--abc", "xN--"] {
            assert_eq!(normalize(token), None, "{token} should be rejected");
        }
        assert!(normalize("xn-not-encoded").is_some());
    }

    #[test]
    fn test_normalize_rejects_empty() {
        assert_eq!(normalize(""), None);
    }

    #[test]
    fn test_harvest_line_chains_both_steps() {
        let re = Regex::new(IANA_TLDS_PATTERN).unwrap();
        assert_eq!(harvest_line("NET", &re).unwrap().as_str(), "net");
        assert_eq!(harvest_line("XN--ABC", &re), None);
        assert_eq!(harvest_line("# comment", &re), None);
    }
}
