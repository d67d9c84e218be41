//! Pull request webhook payload as delivered to the runner.

use std::fmt;
use std::path::Path;

use critic_core::CriticError;
use serde::Deserialize;

/// What happened to the pull request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventAction {
    /// The pull request was created.
    Opened,
    /// New commits were pushed to the head branch.
    Synchronize,
    /// Anything else (`closed`, `labeled`, ...). Not reviewed.
    Other(String),
}

impl From<&str> for EventAction {
    fn from(s: &str) -> Self {
        match s {
            "opened" => Self::Opened,
            "synchronize" => Self::Synchronize,
            other => Self::Other(other.to_string()),
        }
    }
}

impl fmt::Display for EventAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Opened => f.write_str("opened"),
            Self::Synchronize => f.write_str("synchronize"),
            Self::Other(s) => f.write_str(s),
        }
    }
}

/// Which diff a supported event should review.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DiffSource {
    /// The whole pull request against its base.
    PullRequest,
    /// Only the commits between two SHAs.
    Compare {
        /// Head SHA before the push.
        base: String,
        /// Head SHA after the push.
        head: String,
    },
}

/// The parts of a `pull_request` event the reviewer needs.
///
/// # Examples
///
/// ```
/// use critic_review::event::{DiffSource, EventAction, PullRequestEvent};
///
/// let event = PullRequestEvent::from_json(r#"{
///     "action": "opened",
///     "number": 7,
///     "repository": {"name": "widgets", "owner": {"login": "acme"}}
/// }"#).unwrap();
/// assert_eq!(event.action, EventAction::Opened);
/// assert_eq!(event.diff_source(), Some(DiffSource::PullRequest));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PullRequestEvent {
    /// The triggering action.
    pub action: EventAction,
    /// Repository owner login.
    pub owner: String,
    /// Repository name.
    pub repo: String,
    /// Pull request number.
    pub number: u64,
    /// Previous head SHA (synchronize only).
    pub before: Option<String>,
    /// New head SHA (synchronize only).
    pub after: Option<String>,
}

#[derive(Deserialize)]
struct RawEvent {
    action: String,
    number: Option<u64>,
    before: Option<String>,
    after: Option<String>,
    repository: RawRepository,
    pull_request: Option<RawPullRequest>,
}

#[derive(Deserialize)]
struct RawRepository {
    name: String,
    owner: RawOwner,
}

#[derive(Deserialize)]
struct RawOwner {
    login: String,
}

#[derive(Deserialize)]
struct RawPullRequest {
    number: u64,
}

impl PullRequestEvent {
    /// Read and parse the event payload at `path`.
    ///
    /// # Errors
    ///
    /// Returns [`CriticError::FileNotFound`] if the file does not exist,
    /// [`CriticError::Io`] if it cannot be read, or [`CriticError::Event`]
    /// if the payload is not a pull request event.
    pub fn load(path: &Path) -> Result<Self, CriticError> {
        if !path.exists() {
            return Err(CriticError::FileNotFound(path.to_path_buf()));
        }
        let content = std::fs::read_to_string(path)?;
        Self::from_json(&content)
    }

    /// Parse an event payload from JSON text.
    ///
    /// The pull request number is taken from the top-level `number`, falling
    /// back to `pull_request.number`.
    ///
    /// # Errors
    ///
    /// Returns [`CriticError::Event`] on malformed JSON or missing fields.
    pub fn from_json(content: &str) -> Result<Self, CriticError> {
        let raw: RawEvent = serde_json::from_str(content)
            .map_err(|e| CriticError::Event(e.to_string()))?;

        let number = raw
            .number
            .or(raw.pull_request.map(|pr| pr.number))
            .ok_or_else(|| CriticError::Event("no pull request number".into()))?;

        Ok(Self {
            action: EventAction::from(raw.action.as_str()),
            owner: raw.repository.owner.login,
            repo: raw.repository.name,
            number,
            before: raw.before.filter(|s| !s.is_empty()),
            after: raw.after.filter(|s| !s.is_empty()),
        })
    }

    /// Whether this event triggers a review at all.
    ///
    /// Decided from the action alone; the diff source is chosen in
    /// [`diff_source`](Self::diff_source).
    pub fn is_supported(&self) -> bool {
        matches!(self.action, EventAction::Opened | EventAction::Synchronize)
    }

    /// The diff to review, or `None` for unsupported actions.
    ///
    /// A `synchronize` event without both SHAs falls back to the full
    /// pull request diff.
    pub fn diff_source(&self) -> Option<DiffSource> {
        match &self.action {
            EventAction::Opened => Some(DiffSource::PullRequest),
            EventAction::Synchronize => match (&self.before, &self.after) {
                (Some(base), Some(head)) => Some(DiffSource::Compare {
                    base: base.clone(),
                    head: head.clone(),
                }),
                _ => {
                    tracing::warn!("synchronize event without before/after, reviewing full diff");
                    Some(DiffSource::PullRequest)
                }
            },
            EventAction::Other(_) => None,
        }
    }
}

impl fmt::Display for PullRequestEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}/{}#{}", self.action, self.owner, self.repo, self.number)
    }
}
