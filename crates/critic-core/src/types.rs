use std::fmt;

use serde::{Deserialize, Serialize};

/// Pull request metadata used as prompt context.
///
/// Fetched once per run and never mutated afterwards.
///
/// # Examples
///
/// ```
/// use critic_core::PullRequestContext;
///
/// let pr = PullRequestContext {
///     owner: "octocat".into(),
///     repo: "hello-world".into(),
///     pull_number: 42,
///     title: "Add greeting".into(),
///     description: String::new(),
/// };
/// assert_eq!(pr.to_string(), "octocat/hello-world#42");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PullRequestContext {
    /// Repository owner login.
    pub owner: String,
    /// Repository name.
    pub repo: String,
    /// Pull request number.
    pub pull_number: u64,
    /// Pull request title (empty when unset).
    pub title: String,
    /// Pull request body (empty when unset).
    pub description: String,
}

impl fmt::Display for PullRequestContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}#{}", self.owner, self.repo, self.pull_number)
    }
}

/// An inline review comment addressed by diff position.
///
/// `position` is GitHub's diff coordinate: the number of lines below the
/// file's first hunk header, not a line number in the file.
///
/// # Examples
///
/// ```
/// use critic_core::ReviewComment;
///
/// let comment = ReviewComment {
///     path: "src/lib.rs".into(),
///     position: 5,
///     body: "Avoid mutable global state here.".into(),
/// };
/// let json = serde_json::to_value(&comment).unwrap();
/// assert_eq!(json["position"], 5);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReviewComment {
    /// Path of the file in the new revision.
    pub path: String,
    /// Diff position within that file's patch.
    pub position: u32,
    /// Markdown comment body.
    pub body: String,
}

impl fmt::Display for ReviewComment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} @ position {}", self.path, self.position)
    }
}
