use std::fmt::Write;

use critic_core::{PromptStyle, PullRequestContext};
use critic_difflens::parser::{DiffChunk, FileDiff};

const STANDARD_INSTRUCTIONS: &str = "\
Your task is to review pull requests. Instructions:
- IMPORTANT: Provide the response in the following JSON format: \
{\"reviews\": [{\"lineNumber\": <line_number>, \"reviewComment\": \"<review comment>\"}]}
- Do not give positive comments or compliments.
- Provide comments and suggestions ONLY if there is something to improve, \
otherwise \"reviews\" should be an empty array.
- Write the comment in GitHub Markdown format.
- Use the given description only for the overall context and only comment the code.
- IMPORTANT: NEVER suggest adding comments to the code.
- Each diff line below is prefixed with its line number; use that number as \"lineNumber\".";

const SENIOR_INSTRUCTIONS: &str = "\
You are a senior software engineer performing a pull request code review on GitHub.

Analyze only the changed lines in the diff and comment only when there is a \
substantial reason to: correctness, security, performance, maintainability or clarity.

# Rules

- Only raise issues that are non-trivial, clearly actionable and traceable to the diff.
- DO NOT praise the code or give compliments.
- DO NOT suggest adding comments to the code.
- DO NOT suggest stylistic changes unless they affect clarity or correctness.
- DO NOT comment on removed lines or unchanged context lines.
- Each diff line below is prefixed with its line number; use that number as \"lineNumber\".

# Tagging

Assign every comment:
- a category: readability | maintainability | correctness | performance | security | style | design
- a priority: high (must fix) | medium (should fix) | low (could fix)

# Output format

Respond only with this JSON inside a ```json fence:

```json
{
  \"reviews\": [
    {
      \"lineNumber\": <number>,
      \"reviewComment\": \"<GitHub Markdown comment>\",
      \"category\": \"<category>\",
      \"priority\": \"<priority>\"
    }
  ]
}
```

If there is nothing to flag, return { \"reviews\": [] }.";

/// Build the review prompt for one hunk of one file.
///
/// The output depends only on its arguments, so identical inputs always
/// produce byte-identical prompts.
///
/// # Examples
///
/// ```
/// use critic_core::{PromptStyle, PullRequestContext};
/// use critic_difflens::parser::parse_unified_diff;
/// use critic_review::prompt::build_prompt;
///
/// let files = parse_unified_diff("--- a/a.rs\n+++ b/a.rs\n@@ -1 +1,2 @@\n a\n+b\n").unwrap();
/// let pr = PullRequestContext {
///     owner: "o".into(),
///     repo: "r".into(),
///     pull_number: 1,
///     title: "Add b".into(),
///     description: String::new(),
/// };
/// let prompt = build_prompt(&files[0], &files[0].chunks[0], &pr, PromptStyle::Standard);
/// assert!(prompt.contains("2 +b"));
/// ```
pub fn build_prompt(
    file: &FileDiff,
    chunk: &DiffChunk,
    pr: &PullRequestContext,
    style: PromptStyle,
) -> String {
    let path = file.path().unwrap_or_default();
    let diff = numbered_chunk(chunk);
    match style {
        PromptStyle::Standard => format!(
            "{STANDARD_INSTRUCTIONS}\n\n\
             Review the following code diff in the file \"{path}\" and take the pull request \
             title and description into account when writing the response.\n\n\
             Pull request title: {title}\n\
             Pull request description:\n\n\
             ---\n{description}\n---\n\n\
             Git diff to review:\n\n\
             ```diff\n{diff}```\n",
            title = pr.title,
            description = pr.description,
        ),
        PromptStyle::Senior => {
            let fence = fence_for(&pr.description);
            format!(
                "{SENIOR_INSTRUCTIONS}\n\n\
                 # Context\n\n\
                 File path: `{path}`\n\n\
                 Pull request title:\n`{title}`\n\n\
                 Pull request description (context only, not code to review):\n\
                 {fence}\n{description}\n{fence}\n\n\
                 Diff (unified format, lines prefixed with line numbers):\n\
                 ```diff\n{diff}```\n",
                title = pr.title,
                description = pr.description,
            )
        }
    }
}

/// A backtick fence longer than any backtick run in `text`, at least three.
fn fence_for(text: &str) -> String {
    let longest = text
        .split(|c| c != '`')
        .map(str::len)
        .max()
        .unwrap_or(0);
    "`".repeat(longest.max(2) + 1)
}

/// The hunk header followed by every line as `"<number> <marker><content>"`.
///
/// The number is the new-file line when present, otherwise the old-file line.
fn numbered_chunk(chunk: &DiffChunk) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{}", chunk.header);
    for line in &chunk.lines {
        let number = line
            .line_number()
            .map(|n| n.to_string())
            .unwrap_or_default();
        let _ = writeln!(out, "{number} {}{}", line.kind.marker(), line.content);
    }
    out
}
