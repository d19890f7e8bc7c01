use serde::Serialize;

use crate::error::{AccuRevError, Result};

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Leading character that marks a path segment as a stream name.
pub const STREAM_MARKER: char = ':';

/// Separator used when handing depot-relative paths to accurev.
pub const DIRECTORY_SEPARATOR: char = '\\';

/// Prefix of every depot-relative element path (`\.\`).
pub const ROOT_PATH_PREFIX: &str = "\\.\\";

// ---------------------------------------------------------------------------
// ParsedPath
// ---------------------------------------------------------------------------

/// A logical path split at its stream segment.
///
/// `Depot/:main/:dev/src/lib` resolves to the marker `:dev` and the
/// remainder `["src", "lib"]`. Segments are scanned from the end, so when
/// several carry the marker the last one wins.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ParsedPath {
    marker_segment: String,
    remainder: Vec<String>,
}

impl ParsedPath {
    /// Split `path` on `/` and `\` and locate its stream segment.
    ///
    /// Empty segments after the marker (doubled or trailing separators) are
    /// dropped. Fails with [`AccuRevError::InvalidPath`] when no segment
    /// starts with [`STREAM_MARKER`], or when a segment after it is `.` or
    /// `..`.
    pub fn resolve(path: &str) -> Result<Self> {
        let segments: Vec<&str> = path.split(['/', '\\']).collect();
        let marker_index = segments
            .iter()
            .rposition(|s| s.starts_with(STREAM_MARKER))
            .ok_or_else(|| AccuRevError::invalid_path(path, "stream not specified"))?;

        let remainder: Vec<String> = segments[marker_index + 1..]
            .iter()
            .filter(|s| !s.is_empty())
            .map(|s| s.to_string())
            .collect();
        if remainder.iter().any(|s| s == "." || s == "..") {
            return Err(AccuRevError::invalid_path(
                path,
                "relative segments ('.' or '..') are not allowed",
            ));
        }

        Ok(Self {
            marker_segment: segments[marker_index].to_string(),
            remainder,
        })
    }

    /// The marker segment as written, e.g. `:main`.
    pub fn marker_segment(&self) -> &str {
        &self.marker_segment
    }

    /// The stream name with the marker stripped, e.g. `main`.
    pub fn stream_name(&self) -> &str {
        self.marker_segment.trim_start_matches(STREAM_MARKER)
    }

    pub fn remainder(&self) -> &[String] {
        &self.remainder
    }

    /// Remainder joined with [`DIRECTORY_SEPARATOR`] (`src\lib`).
    pub fn relative_path(&self) -> String {
        self.remainder.join(&DIRECTORY_SEPARATOR.to_string())
    }

    /// Remainder as accurev addresses it (`\.\src\lib`, or `\.\` for the
    /// stream root).
    pub fn depot_path(&self) -> String {
        depot_path(&self.relative_path())
    }
}

/// Prefix a stream-relative path with [`ROOT_PATH_PREFIX`].
pub fn depot_path(relative: &str) -> String {
    format!("{ROOT_PATH_PREFIX}{relative}")
}

/// Last segment of a `/`- or `\`-delimited location.
pub fn last_segment(location: &str) -> &str {
    location
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or(location)
}
