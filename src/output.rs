// =============================================================================
// output.rs - THE PRINTING PRESS
// =============================================================================
//
// Takes a finished FinalList and puts it on disk, either as a generated Rust
// module (a `TLDS` const slice other crates can `include!`) or as plain JSON
// for everyone else.
//
// The output carries no timestamps and no run ids. Same list in, same bytes
// out, so regenerating against unchanged registries leaves a clean diff.
//
// Files are written to a sibling `.tmp` and renamed into place, so a crash
// mid-write never leaves a half-written list where the old one used to be.
// =============================================================================

use std::fmt::Write as _;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use tracing::info;

use crate::errors::{ConfigError, OutputError};
use crate::models::FinalList;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Rust,
    Json,
}

impl FromStr for OutputFormat {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "rust" | "rs" => Ok(OutputFormat::Rust),
            "json" => Ok(OutputFormat::Json),
            _ => Err(ConfigError::OutputFormat(s.to_string())),
        }
    }
}

/// Render the list in the requested format.
pub fn render(list: &FinalList, format: OutputFormat) -> Result<String, OutputError> {
    match format {
        OutputFormat::Rust => Ok(render_rust(list)),
        OutputFormat::Json => {
            let mut json = serde_json::to_string_pretty(list)?;
            json.push('\n');
            Ok(json)
        }
    }
}

fn render_rust(list: &FinalList) -> String {
    let mut out = String::with_capacity(64 + list.len() * 16);
    // Writing into a String can't fail.
    let _ = writeln!(out, "// Generated by tld_harvester. DO NOT EDIT.");
    let _ = writeln!(out);
    let _ = writeln!(out, "/// Sorted list of all public top-level domains.");
    let _ = writeln!(out, "///");
    let _ = writeln!(out, "/// Sources:");
    for location in list.source_locations() {
        let _ = writeln!(out, "///  * {}", location);
    }
    let _ = writeln!(out, "pub const TLDS: &[&str] = &[");
    for entry in list.entries() {
        let _ = writeln!(out, "    {:?},", entry.as_str());
    }
    let _ = writeln!(out, "];");
    out
}

/// Render and write the list to `path`, replacing whatever was there.
pub fn write_list(path: &Path, list: &FinalList, format: OutputFormat) -> Result<(), OutputError> {
    let rendered = render(list, format)?;
    let tmp = tmp_path(path);

    fs::write(&tmp, rendered.as_bytes()).map_err(|source| OutputError::Io {
        path: tmp.clone(),
        source,
    })?;
    fs::rename(&tmp, path).map_err(|source| OutputError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    info!(
        path = %path.display(),
        tlds = list.len(),
        bytes = rendered.len(),
        "TLD list written"
    );
    Ok(())
}

fn tmp_path(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_else(|| "tlds".into());
    name.push(".tmp");
    path.with_file_name(name)
}
