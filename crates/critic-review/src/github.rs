use async_trait::async_trait;
use critic_core::{CriticError, GitHubConfig, PullRequestContext, ReviewComment};
use serde::Deserialize;

const DIFF_MEDIA_TYPE: &str = "application/vnd.github.v3.diff";

/// The hosting platform a review is read from and written back to.
///
/// Every failure here is fatal for the run, so methods return
/// [`CriticError`] rather than degrading.
#[async_trait]
pub trait PullRequestHost: Send + Sync {
    /// Fetch title and description of a pull request.
    async fn pull_request(
        &self,
        owner: &str,
        repo: &str,
        number: u64,
    ) -> Result<PullRequestContext, CriticError>;

    /// Fetch the full unified diff of a pull request.
    async fn pull_request_diff(
        &self,
        owner: &str,
        repo: &str,
        number: u64,
    ) -> Result<String, CriticError>;

    /// Fetch the unified diff between two commits.
    async fn compare_diff(
        &self,
        owner: &str,
        repo: &str,
        base: &str,
        head: &str,
    ) -> Result<String, CriticError>;

    /// Post all `comments` as a single `COMMENT` review.
    async fn submit_review(
        &self,
        owner: &str,
        repo: &str,
        number: u64,
        comments: &[ReviewComment],
    ) -> Result<(), CriticError>;
}

#[derive(Deserialize)]
struct PullRequestMeta {
    title: Option<String>,
    body: Option<String>,
}

/// GitHub REST client for fetching pull requests and posting reviews.
///
/// JSON routes go through octocrab; diff media types are fetched with a
/// plain reqwest client because octocrab deserializes every body.
pub struct GitHubClient {
    octocrab: octocrab::Octocrab,
    http: reqwest::Client,
    token: String,
    api_base: String,
}

impl GitHubClient {
    /// Create a client from configuration.
    ///
    /// Must be called inside a tokio runtime.
    ///
    /// # Errors
    ///
    /// Returns [`CriticError::Config`] if no token is configured, or
    /// [`CriticError::GitHub`] if the client cannot be built.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use critic_core::GitHubConfig;
    /// use critic_review::github::GitHubClient;
    ///
    /// # async fn demo() {
    /// let config = GitHubConfig {
    ///     token: Some("ghp_xxxx".into()),
    ///     ..GitHubConfig::default()
    /// };
    /// let client = GitHubClient::new(&config).unwrap();
    /// # }
    /// ```
    pub fn new(config: &GitHubConfig) -> Result<Self, CriticError> {
        let token = config.token.clone().filter(|t| !t.is_empty()).ok_or_else(|| {
            CriticError::Config(
                "GitHub token not set. Pass --github-token or set INPUT_GITHUB_TOKEN".into(),
            )
        })?;
        let api_base = config.api_base.trim_end_matches('/').to_string();

        let octocrab = octocrab::Octocrab::builder()
            .personal_token(token.clone())
            .base_uri(api_base.as_str())
            .map_err(|e| CriticError::GitHub(format!("invalid API base '{api_base}': {e}")))?
            .build()
            .map_err(|e| CriticError::GitHub(format!("failed to create GitHub client: {e}")))?;

        let http = reqwest::Client::new();

        Ok(Self {
            octocrab,
            http,
            token,
            api_base,
        })
    }

    async fn fetch_diff(&self, route: &str) -> Result<String, CriticError> {
        let url = format!("{}{route}", self.api_base);
        let response = self
            .http
            .get(&url)
            .header("Accept", DIFF_MEDIA_TYPE)
            .header("Authorization", format!("Bearer {}", self.token))
            .header("User-Agent", "critic")
            .send()
            .await
            .map_err(|e| CriticError::GitHub(format!("failed to fetch diff: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(CriticError::GitHub(format!(
                "GitHub API error {status}: {body}"
            )));
        }

        response
            .text()
            .await
            .map_err(|e| CriticError::GitHub(format!("failed to read diff response: {e}")))
    }
}

#[async_trait]
impl PullRequestHost for GitHubClient {
    async fn pull_request(
        &self,
        owner: &str,
        repo: &str,
        number: u64,
    ) -> Result<PullRequestContext, CriticError> {
        let route = format!("/repos/{owner}/{repo}/pulls/{number}");
        let meta: PullRequestMeta = self
            .octocrab
            .get(route, None::<&()>)
            .await
            .map_err(|e| CriticError::GitHub(format!("failed to fetch pull request: {e}")))?;

        Ok(PullRequestContext {
            owner: owner.to_string(),
            repo: repo.to_string(),
            pull_number: number,
            title: meta.title.unwrap_or_default(),
            description: meta.body.unwrap_or_default(),
        })
    }

    async fn pull_request_diff(
        &self,
        owner: &str,
        repo: &str,
        number: u64,
    ) -> Result<String, CriticError> {
        self.fetch_diff(&format!("/repos/{owner}/{repo}/pulls/{number}"))
            .await
    }

    async fn compare_diff(
        &self,
        owner: &str,
        repo: &str,
        base: &str,
        head: &str,
    ) -> Result<String, CriticError> {
        self.fetch_diff(&format!("/repos/{owner}/{repo}/compare/{base}...{head}"))
            .await
    }

    async fn submit_review(
        &self,
        owner: &str,
        repo: &str,
        number: u64,
        comments: &[ReviewComment],
    ) -> Result<(), CriticError> {
        let route = format!("/repos/{owner}/{repo}/pulls/{number}/reviews");
        let body = serde_json::json!({
            "event": "COMMENT",
            "comments": comments,
        });

        let _response: serde_json::Value = self
            .octocrab
            .post(route, Some(&body))
            .await
            .map_err(|e| CriticError::GitHub(format!("failed to post review: {e}")))?;

        Ok(())
    }
}
