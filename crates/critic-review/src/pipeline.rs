use std::collections::VecDeque;
use std::fmt;

use critic_core::{CriticConfig, CriticError, PromptStyle, PullRequestContext, ReviewComment};
use critic_difflens::filter::{FilterResult, PathFilter};
use critic_difflens::parser::{parse_unified_diff, DiffChunk, FileDiff};
use serde::Serialize;

use crate::event::{DiffSource, PullRequestEvent};
use crate::extract::{extract_reviews, ReviewFinding};
use crate::github::PullRequestHost;
use crate::llm::CompletionService;
use crate::mapper::{map_findings, validate_positions};
use crate::prompt::build_prompt;

/// Result of reviewing a set of files.
///
/// # Examples
///
/// ```
/// use critic_review::pipeline::{ReviewResult, ReviewStats};
///
/// let result = ReviewResult {
///     comments: vec![],
///     rejected: vec![],
///     stats: ReviewStats::default(),
/// };
/// assert!(result.comments.is_empty());
/// ```
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewResult {
    /// Comments that address real diff lines, ready to submit.
    pub comments: Vec<ReviewComment>,
    /// Comments dropped because their position is outside the hunk they
    /// were written for.
    pub rejected: Vec<ReviewComment>,
    /// Statistics about the review run.
    pub stats: ReviewStats,
}

/// Counters for the run summary.
///
/// # Examples
///
/// ```
/// use critic_review::pipeline::ReviewStats;
///
/// let stats = ReviewStats {
///     chunks_reviewed: 4,
///     chunks_failed: 1,
///     ..ReviewStats::default()
/// };
/// assert_eq!(stats.chunks_reviewed - stats.chunks_failed, 3);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewStats {
    /// Files whose chunks were sent to the model.
    pub files_reviewed: usize,
    /// Files excluded by pattern or deleted in the new revision.
    pub files_skipped: usize,
    /// Chunks sent to the model.
    pub chunks_reviewed: usize,
    /// Chunks with no reply or an unusable reply.
    pub chunks_failed: usize,
    /// Findings extracted from model replies.
    pub findings: usize,
    /// Comments dropped by position validation.
    pub comments_rejected: usize,
}

impl fmt::Display for ReviewStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "files: {} reviewed, {} skipped | chunks: {} reviewed, {} failed | findings: {} ({} rejected)",
            self.files_reviewed,
            self.files_skipped,
            self.chunks_reviewed,
            self.chunks_failed,
            self.findings,
            self.comments_rejected,
        )
    }
}

/// What a single chunk review produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChunkOutcome {
    /// The model replied with a usable (possibly empty) list.
    Findings(Vec<ReviewFinding>),
    /// The completion call failed.
    NoResponse,
    /// The reply carried no valid review JSON.
    Unparsable,
}

/// How a whole run ended.
#[derive(Debug, Clone)]
pub enum RunOutcome {
    /// The event action is not reviewed; nothing was fetched.
    Unsupported(String),
    /// The pull request has no diff to review.
    NoDiff,
    /// Review finished without any comment to post.
    NothingToSubmit(ReviewResult),
    /// One review with these comments was posted.
    Submitted(ReviewResult),
}

struct ReviewTask<'a> {
    file: &'a FileDiff,
    chunk: &'a DiffChunk,
}

/// Sequential chunk-by-chunk reviewer.
///
/// Each chunk becomes one prompt and one completion call; failures on a
/// chunk never abort the others.
pub struct ReviewPipeline<'a> {
    completion: &'a dyn CompletionService,
    style: PromptStyle,
}

impl<'a> ReviewPipeline<'a> {
    /// Create a pipeline over a completion service.
    pub fn new(completion: &'a dyn CompletionService, style: PromptStyle) -> Self {
        Self { completion, style }
    }

    /// Review every chunk of every non-deleted file and validate the result.
    pub async fn review(&self, files: &[FileDiff], pr: &PullRequestContext) -> ReviewResult {
        let mut stats = ReviewStats::default();
        let mut queue = VecDeque::new();

        for file in files {
            if file.is_deleted() {
                tracing::debug!(%file, "skipping deleted file");
                stats.files_skipped += 1;
                continue;
            }
            if !file.chunks.is_empty() {
                stats.files_reviewed += 1;
            }
            queue.extend(file.chunks.iter().map(|chunk| ReviewTask { file, chunk }));
        }

        let mut comments = Vec::new();
        let mut rejected = Vec::new();
        let mut current_path = None;
        while let Some(task) = queue.pop_front() {
            let path = task.file.path().unwrap_or_default();
            if current_path != Some(path) {
                tracing::info!(path, chunks = task.file.chunks.len(), "reviewing file");
                current_path = Some(path);
            }

            stats.chunks_reviewed += 1;
            match self.review_chunk(&task, pr).await {
                ChunkOutcome::Findings(findings) => {
                    stats.findings += findings.len();
                    let mapped = map_findings(task.file, task.chunk, &findings);
                    let (ok, outside) = validate_positions(mapped, task.chunk);
                    comments.extend(ok);
                    rejected.extend(outside);
                }
                ChunkOutcome::NoResponse => {
                    tracing::warn!(path, hunk = %task.chunk.header, "no model response for chunk");
                    stats.chunks_failed += 1;
                }
                ChunkOutcome::Unparsable => {
                    tracing::warn!(path, hunk = %task.chunk.header, "unusable model response for chunk");
                    stats.chunks_failed += 1;
                }
            }
        }

        stats.comments_rejected = rejected.len();

        ReviewResult {
            comments,
            rejected,
            stats,
        }
    }

    async fn review_chunk(&self, task: &ReviewTask<'_>, pr: &PullRequestContext) -> ChunkOutcome {
        let prompt = build_prompt(task.file, task.chunk, pr, self.style);
        let Some(reply) = self.completion.complete(&prompt).await else {
            return ChunkOutcome::NoResponse;
        };
        tracing::debug!(path = task.file.path().unwrap_or_default(), %reply, "model reply");

        match extract_reviews(&reply) {
            Some(findings) => ChunkOutcome::Findings(findings),
            None => ChunkOutcome::Unparsable,
        }
    }
}

/// Review the pull request named by `event` and post the result.
///
/// Unsupported actions return before any request is made. At most one
/// review is submitted, and only when at least one comment survives
/// validation.
///
/// # Errors
///
/// Returns an error when the pull request or its diff cannot be fetched,
/// the diff cannot be parsed, or the review cannot be submitted.
pub async fn run(
    event: &PullRequestEvent,
    host: &dyn PullRequestHost,
    completion: &dyn CompletionService,
    config: &CriticConfig,
) -> Result<RunOutcome, CriticError> {
    let Some(source) = event.diff_source() else {
        tracing::info!(action = %event.action, "unsupported event action, nothing to review");
        return Ok(RunOutcome::Unsupported(event.action.to_string()));
    };

    let pr = host.pull_request(&event.owner, &event.repo, event.number).await?;
    let diff = match &source {
        DiffSource::PullRequest => {
            host.pull_request_diff(&event.owner, &event.repo, event.number)
                .await?
        }
        DiffSource::Compare { base, head } => {
            host.compare_diff(&event.owner, &event.repo, base, head)
                .await?
        }
    };

    if diff.trim().is_empty() {
        tracing::info!(%pr, "no diff found");
        return Ok(RunOutcome::NoDiff);
    }

    let files = parse_unified_diff(&diff)?;
    let FilterResult { kept, skipped } = PathFilter::from_config(&config.review).filter(files);
    for file in &skipped {
        tracing::info!(path = %file.path, pattern = %file.pattern, "excluded from review");
    }

    let pipeline = ReviewPipeline::new(completion, config.review.prompt_style);
    let mut result = pipeline.review(&kept, &pr).await;
    result.stats.files_skipped += skipped.len();
    tracing::info!(%pr, "review finished: {}", result.stats);

    if result.comments.is_empty() {
        return Ok(RunOutcome::NothingToSubmit(result));
    }

    host.submit_review(&event.owner, &event.repo, event.number, &result.comments)
        .await?;
    tracing::info!(%pr, comments = result.comments.len(), "review submitted");
    Ok(RunOutcome::Submitted(result))
}
