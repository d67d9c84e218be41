//! Pull the `reviews` list out of free-form model text.
//!
//! Models wrap their JSON in prose and Markdown fences with varying
//! discipline, so several candidate spans are tried in order and the first
//! one that satisfies the schema wins.

use serde::{Deserialize, Deserializer};

/// One critique reported by the model for a hunk.
///
/// `line_number` is kept as text: models send both `5` and `"5"`.
///
/// # Examples
///
/// ```
/// use critic_review::extract::ReviewFinding;
///
/// let f: ReviewFinding =
///     serde_json::from_str(r#"{"lineNumber": 5, "reviewComment": "x"}"#).unwrap();
/// assert_eq!(f.line_number, "5");
/// assert!(f.category.is_none());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewFinding {
    /// Line reference as reported by the model.
    #[serde(deserialize_with = "string_or_number")]
    pub line_number: String,
    /// Markdown comment text.
    pub review_comment: String,
    /// Category tag (senior prompt only).
    #[serde(default)]
    pub category: Option<String>,
    /// Priority tag (senior prompt only).
    #[serde(default)]
    pub priority: Option<String>,
}

#[derive(Deserialize)]
struct ReviewEnvelope {
    reviews: Vec<ReviewFinding>,
}

fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Text(String),
        Number(serde_json::Number),
    }

    Ok(match Raw::deserialize(deserializer)? {
        Raw::Text(s) => s,
        Raw::Number(n) => n.to_string(),
    })
}

/// Locate and validate the `{"reviews": [...]}` object in `text`.
///
/// Returns `None` (after logging) when no candidate span parses or none
/// matches the schema. Never panics.
///
/// # Examples
///
/// ```
/// use critic_review::extract::extract_reviews;
///
/// let reply = "Sure!\n```json\n{\"reviews\": [{\"lineNumber\": \"3\", \"reviewComment\": \"Leak.\"}]}\n```\nDone.";
/// let reviews = extract_reviews(reply).unwrap();
/// assert_eq!(reviews[0].line_number, "3");
///
/// assert!(extract_reviews("no json here").is_none());
/// ```
pub fn extract_reviews(text: &str) -> Option<Vec<ReviewFinding>> {
    let candidates = candidate_spans(text);
    if candidates.is_empty() {
        tracing::warn!("model reply contains no JSON block");
        return None;
    }

    let mut last_error = None;
    for candidate in candidates {
        match serde_json::from_str::<ReviewEnvelope>(candidate) {
            Ok(envelope) => return Some(envelope.reviews),
            Err(e) => last_error = Some(e),
        }
    }

    if let Some(e) = last_error {
        tracing::warn!("failed to extract reviews from model reply: {e}");
    }
    None
}

/// Candidate JSON spans, most specific first.
fn candidate_spans(text: &str) -> Vec<&str> {
    let mut spans = Vec::new();

    for opener in ["```json", "```"] {
        let Some(start) = text.find(opener) else {
            continue;
        };
        let body = skip_info_string(&text[start + opener.len()..]);
        // The last fence survives code blocks nested inside comments; the
        // first one survives trailing prose with its own fences.
        if let Some(end) = body.rfind("```") {
            spans.push(body[..end].trim());
        }
        match body.find("```") {
            Some(end) => spans.push(body[..end].trim()),
            None => spans.push(body.trim()),
        }
    }

    if let (Some(start), Some(end)) = (text.find('{'), text.rfind('}')) {
        if start < end {
            spans.push(&text[start..=end]);
        }
    }

    spans
}

/// Drop a fence's info string (`json`, `jsonc`, ...) up to the first newline.
fn skip_info_string(body: &str) -> &str {
    match body.split_once('\n') {
        Some((first, rest)) if !first.contains('{') => rest,
        _ => body,
    }
}
