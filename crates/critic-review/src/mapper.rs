//! Turn model findings into position-addressed review comments.

use std::fmt;
use std::str::FromStr;

use critic_core::ReviewComment;
use critic_difflens::parser::{DiffChunk, FileDiff};

use crate::extract::ReviewFinding;

/// How urgently a finding should be addressed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Priority {
    /// Could fix.
    Low,
    /// Should fix.
    Medium,
    /// Must fix.
    High,
}

impl FromStr for Priority {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "low" => Ok(Self::Low),
            "medium" => Ok(Self::Medium),
            "high" => Ok(Self::High),
            other => Err(format!("unknown priority: {other}")),
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Low => "Low",
            Self::Medium => "Medium",
            Self::High => "High",
        };
        f.write_str(s)
    }
}

/// What kind of concern a finding raises.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Category {
    Readability,
    Maintainability,
    Correctness,
    Performance,
    Security,
    Style,
    Design,
}

impl FromStr for Category {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "readability" => Ok(Self::Readability),
            "maintainability" => Ok(Self::Maintainability),
            "correctness" => Ok(Self::Correctness),
            "performance" => Ok(Self::Performance),
            "security" => Ok(Self::Security),
            "style" => Ok(Self::Style),
            "design" => Ok(Self::Design),
            other => Err(format!("unknown category: {other}")),
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Readability => "readability",
            Self::Maintainability => "maintainability",
            Self::Correctness => "correctness",
            Self::Performance => "performance",
            Self::Security => "security",
            Self::Style => "style",
            Self::Design => "design",
        };
        f.write_str(s)
    }
}

/// Map the findings for one chunk of `file` onto review comments.
///
/// `lineNumber` is taken as the diff position as-is; whether it lands on a
/// line of `chunk` is checked later by [`validate_positions`]. A file
/// without a usable path yields no comments.
///
/// # Examples
///
/// ```
/// use critic_difflens::parser::parse_unified_diff;
/// use critic_review::extract::ReviewFinding;
/// use critic_review::mapper::map_findings;
///
/// let files = parse_unified_diff("--- a/a.rs\n+++ b/a.rs\n@@ -1 +1,2 @@\n a\n+b\n").unwrap();
/// let findings = vec![ReviewFinding {
///     line_number: "2".into(),
///     review_comment: "Rename b.".into(),
///     category: None,
///     priority: None,
/// }];
/// let comments = map_findings(&files[0], &files[0].chunks[0], &findings);
/// assert_eq!(comments[0].position, 2);
/// assert_eq!(comments[0].path, "a.rs");
/// ```
pub fn map_findings(
    file: &FileDiff,
    chunk: &DiffChunk,
    findings: &[ReviewFinding],
) -> Vec<ReviewComment> {
    let Some(path) = file.path() else {
        return Vec::new();
    };

    findings
        .iter()
        .filter_map(|finding| {
            let Some(position) = coerce_position(&finding.line_number) else {
                tracing::warn!(
                    path,
                    hunk = %chunk.header,
                    line_number = %finding.line_number,
                    "dropping finding with unusable line number"
                );
                return None;
            };
            Some(ReviewComment {
                path: path.to_string(),
                position,
                body: comment_body(finding),
            })
        })
        .collect()
}

/// Numeric coercion of a model-supplied line reference.
///
/// Accepts surrounding whitespace and integral float forms such as `5.0`.
fn coerce_position(raw: &str) -> Option<u32> {
    let value: f64 = raw.trim().parse().ok()?;
    if !value.is_finite() || value.fract() != 0.0 || value < 0.0 || value > f64::from(u32::MAX)
    {
        return None;
    }
    Some(value as u32)
}

/// The comment text, labelled when both tags are recognised.
fn comment_body(finding: &ReviewFinding) -> String {
    let priority = finding.priority.as_deref().and_then(|p| p.parse::<Priority>().ok());
    let category = finding.category.as_deref().and_then(|c| c.parse::<Category>().ok());
    match (priority, category) {
        (Some(priority), Some(category)) => {
            format!("**[{priority}] {category}**\n\n{}", finding.review_comment)
        }
        _ => finding.review_comment.clone(),
    }
}

/// Split `comments` made for `chunk` into those addressing one of its lines
/// and the rest.
///
/// A position elsewhere in the file is still rejected: it would attach the
/// comment to a hunk the model never saw. Every rejection is logged.
///
/// # Examples
///
/// ```
/// use critic_core::ReviewComment;
/// use critic_difflens::parser::parse_unified_diff;
/// use critic_review::mapper::validate_positions;
///
/// let diff = "--- a/a.rs\n+++ b/a.rs\n@@ -1 +1,2 @@\n a\n+b\n@@ -9 +10 @@\n z\n";
/// let file = &parse_unified_diff(diff).unwrap()[0];
/// let at = |position| ReviewComment { path: "a.rs".into(), position, body: "x".into() };
/// let (kept, rejected) = validate_positions(vec![at(2), at(4)], &file.chunks[0]);
/// assert_eq!(kept, vec![at(2)]);
/// assert_eq!(rejected, vec![at(4)]);
/// ```
pub fn validate_positions(
    comments: Vec<ReviewComment>,
    chunk: &DiffChunk,
) -> (Vec<ReviewComment>, Vec<ReviewComment>) {
    let (kept, rejected): (Vec<_>, Vec<_>) = comments
        .into_iter()
        .partition(|comment| chunk.has_position(comment.position));

    for comment in &rejected {
        let range = chunk
            .position_range()
            .map(|(first, last)| format!("{first}..={last}"))
            .unwrap_or_default();
        tracing::warn!(%comment, hunk = %chunk.header, %range, "rejecting comment outside its hunk");
    }
    (kept, rejected)
}
