//! Path exclusion before any file reaches the model.
//!
//! Patterns use minimatch-like rules: `*` stays within one path segment,
//! `**` crosses segments, and wildcards never match a leading dot.

use critic_core::ReviewConfig;
use glob::{MatchOptions, Pattern};

use crate::parser::FileDiff;

const MATCH_OPTIONS: MatchOptions = MatchOptions {
    case_sensitive: true,
    require_literal_separator: true,
    require_literal_leading_dot: true,
};

/// Excludes files whose path matches any configured glob.
///
/// # Examples
///
/// ```
/// use critic_difflens::filter::PathFilter;
///
/// let filter = PathFilter::new(["**/*.lock", "docs/**"]);
/// assert!(filter.should_skip("deps/Cargo.lock"));
/// assert!(filter.should_skip("docs/guide/intro.md"));
/// assert!(!filter.should_skip("src/main.rs"));
/// ```
#[derive(Debug, Clone, Default)]
pub struct PathFilter {
    patterns: Vec<Pattern>,
}

impl PathFilter {
    /// Compile `patterns`, trimming each and ignoring empty entries.
    ///
    /// A malformed pattern is logged and dropped, so it matches nothing.
    pub fn new<I, S>(patterns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut compiled = Vec::new();
        for raw in patterns {
            let raw = raw.as_ref().trim();
            if raw.is_empty() {
                continue;
            }
            match Pattern::new(raw) {
                Ok(p) => compiled.push(p),
                Err(e) => tracing::warn!(pattern = raw, "ignoring invalid exclude pattern: {e}"),
            }
        }
        Self { patterns: compiled }
    }

    /// Create a filter from review configuration.
    ///
    /// # Examples
    ///
    /// ```
    /// use critic_core::ReviewConfig;
    /// use critic_difflens::filter::PathFilter;
    ///
    /// let config = ReviewConfig {
    ///     exclude: vec!["*.md".into()],
    ///     ..ReviewConfig::default()
    /// };
    /// let filter = PathFilter::from_config(&config);
    /// assert!(filter.should_skip("README.md"));
    /// ```
    pub fn from_config(config: &ReviewConfig) -> Self {
        Self::new(&config.exclude)
    }

    /// Number of usable patterns.
    pub fn len(&self) -> usize {
        self.patterns.len()
    }

    /// Whether no usable pattern was configured.
    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }

    /// Return the first pattern matching `path`, if any.
    pub fn matching_pattern(&self, path: &str) -> Option<&Pattern> {
        self.patterns
            .iter()
            .find(|p| p.matches_with(path, MATCH_OPTIONS))
    }

    /// Whether any exclude pattern matches `path`.
    pub fn should_skip(&self, path: &str) -> bool {
        self.matching_pattern(path).is_some()
    }

    /// Split `diffs` into kept and skipped files, preserving order.
    ///
    /// Files without a usable path are kept; deleted files are dropped
    /// later by the pipeline, not here.
    ///
    /// # Examples
    ///
    /// ```
    /// use critic_difflens::filter::PathFilter;
    /// use critic_difflens::parser::parse_unified_diff;
    ///
    /// let diff = "--- a/README.md\n+++ b/README.md\n@@ -1 +1 @@\n-old\n+new\n\
    ///             --- a/src/lib.rs\n+++ b/src/lib.rs\n@@ -1 +1 @@\n-a\n+b\n";
    /// let split = PathFilter::new(["*.md"]).filter(parse_unified_diff(diff).unwrap());
    /// assert_eq!(split.kept[0].path(), Some("src/lib.rs"));
    /// assert_eq!(split.skipped[0].pattern, "*.md");
    /// ```
    pub fn filter(&self, files: Vec<FileDiff>) -> FilterResult {
        let (kept, excluded): (Vec<_>, Vec<_>) = files
            .into_iter()
            .map(|file| {
                let pattern = file.path().and_then(|path| self.matching_pattern(path));
                let pattern = pattern.map(|p| p.as_str().to_string());
                (file, pattern)
            })
            .partition(|(_, pattern)| pattern.is_none());

        let skipped = excluded
            .into_iter()
            .filter_map(|(file, pattern)| {
                let path = file.path()?.to_string();
                let pattern = pattern?;
                tracing::debug!(%path, %pattern, "excluding file");
                Some(SkippedFile { path, pattern })
            })
            .collect();

        FilterResult {
            kept: kept.into_iter().map(|(file, _)| file).collect(),
            skipped,
        }
    }
}

/// Files split by [`PathFilter::filter`].
#[derive(Debug, Default)]
pub struct FilterResult {
    /// Files to review, in diff order.
    pub kept: Vec<FileDiff>,
    /// Files that were excluded, with the pattern responsible.
    pub skipped: Vec<SkippedFile>,
}

/// A file that was excluded by a pattern.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedFile {
    /// New-side path of the excluded file.
    pub path: String,
    /// The pattern that matched it.
    pub pattern: String,
}
