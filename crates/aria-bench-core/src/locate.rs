//! Executable path extraction from cargo's build report.
//!
//! `cargo bench --no-run` reports each compiled benchmark binary on a line
//! of the form:
//!
//! ```text
//!   Executable benches/sort.rs (target/release/deps/sort-abcd1234)
//! ```
//!
//! That format is human-readable output, not a stable contract, so the
//! scraping lives behind this one narrow interface. Swapping the strategy
//! (say, for `--message-format=json`) touches nothing but this module.

use std::path::PathBuf;

use crate::error::BenchError;

/// First token of a build-report line that names a compiled artifact.
pub const EXECUTABLE_MARKER: &str = "Executable";

/// A resolved benchmark binary together with the report it came from.
#[derive(Debug, Clone)]
pub struct BuildArtifact {
    /// Filesystem path of the compiled benchmark executable.
    pub path: PathBuf,
    /// The raw build-tool output the path was extracted from.
    pub report: String,
}

/// Scans `report` for artifact lines and returns the path from the last
/// one, or `None` when no line matches.
///
/// The last match wins: a single invocation can compile several benchmark
/// binaries, and the most recent build step is the one the caller filtered
/// for. The path is the final whitespace-delimited token with one pair of
/// enclosing parentheses stripped.
pub fn parse_artifact_path(report: &str) -> Option<PathBuf> {
    let line = report
        .lines()
        .filter(|line| line.split_whitespace().next() == Some(EXECUTABLE_MARKER))
        .next_back()?;
    // Drop the marker before taking the final token, so a line that is
    // nothing but the marker cannot resolve to the marker itself.
    let mut tokens = line.split_whitespace();
    let _ = tokens.next();
    let token = tokens.next_back()?;
    let path = token
        .strip_prefix('(')
        .and_then(|inner| inner.strip_suffix(')'))
        .unwrap_or(token);
    if path.is_empty() {
        return None;
    }
    Some(PathBuf::from(path))
}

/// Converts a captured build report into a [`BuildArtifact`], failing with
/// [`BenchError::ArtifactResolution`] when no path can be extracted.
pub fn resolve_artifact(report: String) -> Result<BuildArtifact, BenchError> {
    match parse_artifact_path(&report) {
        Some(path) => Ok(BuildArtifact { path, report }),
        None => Err(BenchError::ArtifactResolution),
    }
}
