use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;
use critic_core::{CriticConfig, CriticError, PullRequestContext, ReviewComment};
use critic_review::event::PullRequestEvent;
use critic_review::github::PullRequestHost;
use critic_review::llm::CompletionService;
use critic_review::pipeline::{run, ReviewResult, RunOutcome};

#[derive(Default)]
struct FakeHost {
    diff: String,
    compare: String,
    fail_submit: bool,
    calls: Mutex<Vec<String>>,
    submitted: Mutex<Vec<Vec<ReviewComment>>>,
}

impl FakeHost {
    fn with_diff(diff: &str) -> Self {
        Self {
            diff: diff.to_string(),
            ..Self::default()
        }
    }

    fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    fn submitted(&self) -> Vec<Vec<ReviewComment>> {
        self.submitted.lock().unwrap().clone()
    }
}

#[async_trait]
impl PullRequestHost for FakeHost {
    async fn pull_request(
        &self,
        owner: &str,
        repo: &str,
        number: u64,
    ) -> Result<PullRequestContext, CriticError> {
        self.calls.lock().unwrap().push("pull_request".into());
        Ok(PullRequestContext {
            owner: owner.into(),
            repo: repo.into(),
            pull_number: number,
            title: "Add counter".into(),
            description: "Tracks calls.".into(),
        })
    }

    async fn pull_request_diff(
        &self,
        _owner: &str,
        _repo: &str,
        _number: u64,
    ) -> Result<String, CriticError> {
        self.calls.lock().unwrap().push("pull_request_diff".into());
        Ok(self.diff.clone())
    }

    async fn compare_diff(
        &self,
        _owner: &str,
        _repo: &str,
        base: &str,
        head: &str,
    ) -> Result<String, CriticError> {
        self.calls
            .lock()
            .unwrap()
            .push(format!("compare_diff {base}...{head}"));
        Ok(self.compare.clone())
    }

    async fn submit_review(
        &self,
        _owner: &str,
        _repo: &str,
        _number: u64,
        comments: &[ReviewComment],
    ) -> Result<(), CriticError> {
        self.calls.lock().unwrap().push("submit_review".into());
        if self.fail_submit {
            return Err(CriticError::GitHub("422 Unprocessable Entity".into()));
        }
        self.submitted.lock().unwrap().push(comments.to_vec());
        Ok(())
    }
}

/// Replies are handed out in order; `None` simulates a failed call.
struct FakeCompletion {
    replies: Mutex<VecDeque<Option<String>>>,
    prompts: Mutex<Vec<String>>,
}

impl FakeCompletion {
    fn new<I>(replies: I) -> Self
    where
        I: IntoIterator<Item = Option<&'static str>>,
    {
        Self {
            replies: Mutex::new(replies.into_iter().map(|r| r.map(String::from)).collect()),
            prompts: Mutex::new(Vec::new()),
        }
    }

    fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }
}

#[async_trait]
impl CompletionService for FakeCompletion {
    async fn complete(&self, prompt: &str) -> Option<String> {
        self.prompts.lock().unwrap().push(prompt.to_string());
        self.replies.lock().unwrap().pop_front().flatten()
    }
}

fn event(action: &str) -> PullRequestEvent {
    PullRequestEvent::from_json(&format!(
        r#"{{"action": "{action}", "number": 7, "before": "aaa111", "after": "bbb222",
            "repository": {{"name": "widgets", "owner": {{"login": "acme"}}}}}}"#
    ))
    .unwrap()
}

fn nothing_submitted(outcome: RunOutcome) -> ReviewResult {
    match outcome {
        RunOutcome::NothingToSubmit(result) => result,
        other => panic!("expected NothingToSubmit, got {other:?}"),
    }
}

fn submitted(outcome: RunOutcome) -> ReviewResult {
    match outcome {
        RunOutcome::Submitted(result) => result,
        other => panic!("expected Submitted, got {other:?}"),
    }
}

const ADDED_FILE: &str = "\
diff --git a/src/counter.rs b/src/counter.rs
new file mode 100644
--- /dev/null
+++ b/src/counter.rs
@@ -0,0 +1,10 @@
+use std::sync::atomic::AtomicU32;
+
+static mut COUNTER: u32 = 0;
+
+pub fn bump() -> u32 {
+    unsafe {
+        COUNTER += 1;
+        COUNTER
+    }
+}
";

const TWO_FILES: &str = "\
diff --git a/src/a.rs b/src/a.rs
--- a/src/a.rs
+++ b/src/a.rs
@@ -1,2 +1,2 @@
 fn a() {
-    1
+    2
diff --git a/src/b.rs b/src/b.rs
--- a/src/b.rs
+++ b/src/b.rs
@@ -4,2 +4,3 @@
 fn b() {
+    let _ = std::fs::read(\"x\").unwrap();
 }
";

#[tokio::test]
async fn empty_reviews_submit_nothing() {
    let host = FakeHost::with_diff(ADDED_FILE);
    let completion = FakeCompletion::new([Some(r#"{"reviews": []}"#)]);

    let outcome = run(&event("opened"), &host, &completion, &CriticConfig::default())
        .await
        .unwrap();

    let result = nothing_submitted(outcome);
    assert!(result.comments.is_empty());
    assert_eq!(result.stats.chunks_reviewed, 1);
    assert_eq!(completion.prompts().len(), 1);
    assert!(host.submitted().is_empty());
    assert!(!host.calls().contains(&"submit_review".to_string()));
}

#[tokio::test]
async fn single_finding_is_submitted_once() {
    let host = FakeHost::with_diff(ADDED_FILE);
    let completion = FakeCompletion::new([Some(
        "```json\n{\"reviews\":[{\"lineNumber\":\"5\",\"reviewComment\":\"Avoid mutable global state here.\"}]}\n```",
    )]);

    let outcome = run(&event("opened"), &host, &completion, &CriticConfig::default())
        .await
        .unwrap();

    assert!(matches!(outcome, RunOutcome::Submitted(_)));
    assert_eq!(
        host.submitted(),
        vec![vec![ReviewComment {
            path: "src/counter.rs".into(),
            position: 5,
            body: "Avoid mutable global state here.".into(),
        }]]
    );
    assert_eq!(
        host.calls(),
        vec!["pull_request", "pull_request_diff", "submit_review"]
    );
    let prompt = &completion.prompts()[0];
    assert!(prompt.contains("src/counter.rs"));
    assert!(prompt.contains("Pull request title: Add counter"));
}

#[tokio::test]
async fn unsupported_action_fetches_nothing() {
    let host = FakeHost::with_diff(ADDED_FILE);
    let completion = FakeCompletion::new([]);

    let outcome = run(&event("closed"), &host, &completion, &CriticConfig::default())
        .await
        .unwrap();

    assert!(matches!(outcome, RunOutcome::Unsupported(ref action) if action == "closed"));
    assert!(host.calls().is_empty());
    assert!(completion.prompts().is_empty());
}

#[tokio::test]
async fn failed_chunk_does_not_block_others() {
    let host = FakeHost::with_diff(TWO_FILES);
    let completion = FakeCompletion::new([
        None,
        Some(r#"{"reviews": [{"lineNumber": 2, "reviewComment": "Propagate the error."}]}"#),
    ]);

    let outcome = run(&event("opened"), &host, &completion, &CriticConfig::default())
        .await
        .unwrap();

    let result = submitted(outcome);
    assert_eq!(result.stats.chunks_reviewed, 2);
    assert_eq!(result.stats.chunks_failed, 1);
    assert_eq!(
        host.submitted(),
        vec![vec![ReviewComment {
            path: "src/b.rs".into(),
            position: 2,
            body: "Propagate the error.".into(),
        }]]
    );
}

#[tokio::test]
async fn unparsable_reply_counts_as_failed_chunk() {
    let host = FakeHost::with_diff(ADDED_FILE);
    let completion = FakeCompletion::new([Some("Looks good to me!")]);

    let outcome = run(&event("opened"), &host, &completion, &CriticConfig::default())
        .await
        .unwrap();

    let result = nothing_submitted(outcome);
    assert_eq!(result.stats.chunks_failed, 1);
}

#[tokio::test]
async fn deleted_files_are_never_prompted() {
    let diff = "\
diff --git a/src/legacy.rs b/src/legacy.rs
deleted file mode 100644
--- a/src/legacy.rs
+++ /dev/null
@@ -1,2 +0,0 @@
-fn legacy() {}
-fn older() {}
"
    .to_string()
        + TWO_FILES;
    let host = FakeHost::with_diff(&diff);
    let completion = FakeCompletion::new([Some("{\"reviews\": []}"), Some("{\"reviews\": []}")]);

    let outcome = run(&event("opened"), &host, &completion, &CriticConfig::default())
        .await
        .unwrap();

    let prompts = completion.prompts();
    assert_eq!(prompts.len(), 2);
    assert!(prompts.iter().all(|p| !p.contains("legacy")));
    let result = nothing_submitted(outcome);
    assert_eq!(result.stats.files_reviewed, 2);
    assert_eq!(result.stats.files_skipped, 1);
}

#[tokio::test]
async fn excluded_files_are_never_prompted() {
    let host = FakeHost::with_diff(TWO_FILES);
    let completion = FakeCompletion::new([Some("{\"reviews\": []}")]);
    let mut config = CriticConfig::default();
    config.review.exclude = vec!["src/a.rs".into()];

    let outcome = run(&event("opened"), &host, &completion, &config)
        .await
        .unwrap();

    let prompts = completion.prompts();
    assert_eq!(prompts.len(), 1);
    assert!(prompts[0].contains("src/b.rs"));
    let result = nothing_submitted(outcome);
    assert_eq!(result.stats.files_skipped, 1);
}

#[tokio::test]
async fn synchronize_reviews_compare_diff() {
    let host = FakeHost {
        compare: TWO_FILES.into(),
        ..FakeHost::default()
    };
    let completion = FakeCompletion::new([Some("{\"reviews\": []}"), Some("{\"reviews\": []}")]);

    run(&event("synchronize"), &host, &completion, &CriticConfig::default())
        .await
        .unwrap();

    assert_eq!(
        host.calls(),
        vec!["pull_request", "compare_diff aaa111...bbb222"]
    );
    assert_eq!(completion.prompts().len(), 2);
}

#[tokio::test]
async fn out_of_range_positions_never_reach_the_host() {
    let host = FakeHost::with_diff(ADDED_FILE);
    let completion = FakeCompletion::new([Some(
        r#"{"reviews": [{"lineNumber": "42", "reviewComment": "Hallucinated line."}]}"#,
    )]);

    let outcome = run(&event("opened"), &host, &completion, &CriticConfig::default())
        .await
        .unwrap();

    let result = nothing_submitted(outcome);
    assert_eq!(result.rejected.len(), 1);
    assert_eq!(result.stats.comments_rejected, 1);
    assert!(host.submitted().is_empty());
}

#[tokio::test]
async fn empty_diff_ends_the_run() {
    let host = FakeHost::with_diff("  \n");
    let completion = FakeCompletion::new([]);

    let outcome = run(&event("opened"), &host, &completion, &CriticConfig::default())
        .await
        .unwrap();

    assert!(matches!(outcome, RunOutcome::NoDiff));
    assert!(completion.prompts().is_empty());
}

#[tokio::test]
async fn submission_failure_is_fatal() {
    let host = FakeHost {
        diff: ADDED_FILE.into(),
        fail_submit: true,
        ..FakeHost::default()
    };
    let completion = FakeCompletion::new([Some(
        r#"{"reviews": [{"lineNumber": 3, "reviewComment": "Use an atomic."}]}"#,
    )]);

    let err = run(&event("opened"), &host, &completion, &CriticConfig::default())
        .await
        .unwrap_err();
    assert!(matches!(err, CriticError::GitHub(_)));
}

#[tokio::test]
async fn malformed_diff_is_fatal() {
    let host = FakeHost::with_diff("--- a/x.rs\n+++ b/x.rs\n@@ nonsense @@\n+x\n");
    let completion = FakeCompletion::new([]);

    let err = run(&event("opened"), &host, &completion, &CriticConfig::default())
        .await
        .unwrap_err();
    assert!(matches!(err, CriticError::Parse(_)));
}

#[tokio::test]
async fn failed_chunk_keeps_sibling_chunk_of_same_file() {
    let diff = "\
diff --git a/src/lib.rs b/src/lib.rs
--- a/src/lib.rs
+++ b/src/lib.rs
@@ -1,2 +1,2 @@
 fn a() {
-    1
+    2
@@ -10,2 +10,3 @@
 fn b() {
+    todo!()
 }
";
    let host = FakeHost::with_diff(diff);
    let completion = FakeCompletion::new([
        None,
        Some(r#"{"reviews": [{"lineNumber": "6", "reviewComment": "Unfinished function."}]}"#),
    ]);

    let outcome = run(&event("opened"), &host, &completion, &CriticConfig::default())
        .await
        .unwrap();

    assert!(matches!(outcome, RunOutcome::Submitted(_)));
    assert_eq!(completion.prompts().len(), 2);
    assert_eq!(
        host.submitted(),
        vec![vec![ReviewComment {
            path: "src/lib.rs".into(),
            position: 6,
            body: "Unfinished function.".into(),
        }]]
    );
}

#[tokio::test]
async fn finding_pointing_into_another_hunk_is_rejected() {
    // First hunk covers positions 1-3, the second header is 4, second hunk 5-7.
    let diff = "\
diff --git a/src/lib.rs b/src/lib.rs
--- a/src/lib.rs
+++ b/src/lib.rs
@@ -1,2 +1,2 @@
 fn a() {
-    1
+    2
@@ -10,2 +10,3 @@
 fn b() {
+    todo!()
 }
";
    let host = FakeHost::with_diff(diff);
    let completion = FakeCompletion::new([
        Some(r#"{"reviews": [{"lineNumber": "6", "reviewComment": "About chunk one."}]}"#),
        Some(r#"{"reviews": [{"lineNumber": "6", "reviewComment": "Unfinished function."}]}"#),
    ]);

    let outcome = run(&event("opened"), &host, &completion, &CriticConfig::default())
        .await
        .unwrap();

    let result = submitted(outcome);
    assert_eq!(result.stats.comments_rejected, 1);
    assert_eq!(result.rejected[0].body, "About chunk one.");
    assert_eq!(
        host.submitted(),
        vec![vec![ReviewComment {
            path: "src/lib.rs".into(),
            position: 6,
            body: "Unfinished function.".into(),
        }]]
    );
}
