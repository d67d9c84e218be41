use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::CriticError;

/// Top-level configuration, built once at the entry point and passed down.
///
/// Supports layered resolution: CLI flags > env vars > `.critic.toml` > defaults.
/// Library code never reads the environment itself; everything it needs
/// arrives through this struct.
///
/// # Examples
///
/// ```
/// use critic_core::CriticConfig;
///
/// let config = CriticConfig::default();
/// assert_eq!(config.github.api_base, "https://api.github.com");
/// assert!(config.review.exclude.is_empty());
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CriticConfig {
    /// Hosting platform settings.
    #[serde(default)]
    pub github: GitHubConfig,
    /// Completion service settings.
    #[serde(default)]
    pub llm: LlmConfig,
    /// Review behavior settings.
    #[serde(default)]
    pub review: ReviewConfig,
}

impl CriticConfig {
    /// Load configuration from a TOML file at `path`.
    ///
    /// # Errors
    ///
    /// Returns [`CriticError::Io`] if the file cannot be read, or
    /// [`CriticError::Toml`] if the content is not valid TOML.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use critic_core::CriticConfig;
    /// use std::path::Path;
    ///
    /// let config = CriticConfig::from_file(Path::new(".critic.toml")).unwrap();
    /// ```
    pub fn from_file(path: &Path) -> Result<Self, CriticError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    /// Parse configuration from a TOML string.
    ///
    /// # Errors
    ///
    /// Returns [`CriticError::Toml`] if parsing fails.
    ///
    /// # Examples
    ///
    /// ```
    /// use critic_core::CriticConfig;
    ///
    /// let toml = r#"
    /// [review]
    /// exclude = ["*.md"]
    /// "#;
    /// let config = CriticConfig::from_toml(toml).unwrap();
    /// assert_eq!(config.review.exclude, vec!["*.md"]);
    /// ```
    pub fn from_toml(content: &str) -> Result<Self, CriticError> {
        let config: Self = toml::from_str(content)?;
        Ok(config)
    }
}

/// GitHub connection settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GitHubConfig {
    /// Token used for every GitHub API call.
    pub token: Option<String>,
    /// REST API root. Override for GitHub Enterprise.
    #[serde(default = "default_api_base")]
    pub api_base: String,
}

fn default_api_base() -> String {
    "https://api.github.com".into()
}

impl Default for GitHubConfig {
    fn default() -> Self {
        Self {
            token: None,
            api_base: default_api_base(),
        }
    }
}

/// Completion service configuration.
///
/// # Examples
///
/// ```
/// use critic_core::LlmConfig;
///
/// let config = LlmConfig::default();
/// assert_eq!(config.model, "gpt-4o");
/// assert_eq!(config.sampling.max_output_tokens, 700);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    /// Model identifier forwarded as `model_name`.
    #[serde(default = "default_model")]
    pub model: String,
    /// API key for the completion service.
    pub api_key: Option<String>,
    /// Full URL of the completion query endpoint.
    #[serde(default = "default_endpoint")]
    pub endpoint: String,
    /// Sampling parameters sent with every request.
    #[serde(default)]
    pub sampling: SamplingParams,
}

fn default_model() -> String {
    "gpt-4o".into()
}

fn default_endpoint() -> String {
    "https://api.lab45.ai/v1.1/skills/completion/query".into()
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            model: default_model(),
            api_key: None,
            endpoint: default_endpoint(),
            sampling: SamplingParams::default(),
        }
    }
}

/// Fixed sampling parameters for the completion call.
///
/// These are configuration constants for a whole run; nothing adjusts them
/// per request.
///
/// # Examples
///
/// ```
/// use critic_core::SamplingParams;
///
/// let params = SamplingParams::default();
/// assert_eq!(params.temperature, 0.2);
/// assert_eq!(params.top_p, 1.0);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SamplingParams {
    pub temperature: f64,
    pub max_output_tokens: u32,
    pub top_p: f64,
    pub frequency_penalty: f64,
    pub presence_penalty: f64,
}

impl Default for SamplingParams {
    fn default() -> Self {
        Self {
            temperature: 0.2,
            max_output_tokens: 700,
            top_p: 1.0,
            frequency_penalty: 0.0,
            presence_penalty: 0.0,
        }
    }
}

/// Review behavior configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ReviewConfig {
    /// Glob patterns for paths that are never reviewed.
    #[serde(default)]
    pub exclude: Vec<String>,
    /// Which prompt template to render.
    #[serde(default)]
    pub prompt_style: PromptStyle,
}

/// Prompt template variant.
///
/// # Examples
///
/// ```
/// use critic_core::PromptStyle;
///
/// let s: PromptStyle = serde_json::from_str("\"senior\"").unwrap();
/// assert_eq!(s, PromptStyle::Senior);
/// assert_eq!(PromptStyle::default(), PromptStyle::Standard);
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PromptStyle {
    /// Compact instructions asking for `lineNumber` + `reviewComment`.
    #[default]
    Standard,
    /// Senior-reviewer instructions that also ask for `category` and `priority`.
    Senior,
}

/// Split a comma-separated pattern list into trimmed, non-empty entries.
///
/// # Examples
///
/// ```
/// use critic_core::split_patterns;
///
/// assert_eq!(split_patterns(" *.md, docs/** ,,"), vec!["*.md", "docs/**"]);
/// assert!(split_patterns("").is_empty());
/// ```
pub fn split_patterns(input: &str) -> Vec<String> {
    input
        .split(',')
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .map(String::from)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_has_expected_values() {
        let config = CriticConfig::default();
        assert!(config.github.token.is_none());
        assert_eq!(config.github.api_base, "https://api.github.com");
        assert_eq!(config.llm.model, "gpt-4o");
        assert!(config.llm.api_key.is_none());
        assert!(config.llm.endpoint.ends_with("/skills/completion/query"));
        assert_eq!(config.llm.sampling, SamplingParams::default());
        assert!(config.review.exclude.is_empty());
        assert_eq!(config.review.prompt_style, PromptStyle::Standard);
    }

    #[test]
    fn parse_full_toml() {
        let toml = r#"
[github]
api_base = "https://github.example.com/api/v3"

[llm]
model = "gpt-4o-mini"
endpoint = "http://localhost:9000/query"

[llm.sampling]
temperature = 0.0
max_output_tokens = 1200

[review]
exclude = ["**/*.lock", "vendor/**"]
prompt_style = "senior"
"#;
        let config = CriticConfig::from_toml(toml).unwrap();
        assert_eq!(config.github.api_base, "https://github.example.com/api/v3");
        assert_eq!(config.llm.model, "gpt-4o-mini");
        assert_eq!(config.llm.endpoint, "http://localhost:9000/query");
        assert_eq!(config.llm.sampling.temperature, 0.0);
        assert_eq!(config.llm.sampling.max_output_tokens, 1200);
        // Unset sampling fields keep their defaults.
        assert_eq!(config.llm.sampling.top_p, 1.0);
        assert_eq!(config.review.exclude, vec!["**/*.lock", "vendor/**"]);
        assert_eq!(config.review.prompt_style, PromptStyle::Senior);
    }

    #[test]
    fn empty_toml_gives_defaults() {
        let config = CriticConfig::from_toml("").unwrap();
        assert_eq!(config.llm.model, "gpt-4o");
        assert_eq!(config.llm.sampling.max_output_tokens, 700);
    }

    #[test]
    fn invalid_toml_returns_error() {
        let result = CriticConfig::from_toml("{{invalid}}");
        assert!(matches!(result, Err(CriticError::Toml(_))));
    }

    #[test]
    fn unknown_prompt_style_is_rejected() {
        let result = CriticConfig::from_toml("[review]\nprompt_style = \"poetic\"\n");
        assert!(result.is_err());
    }

    #[test]
    fn split_patterns_trims_and_drops_empties() {
        assert_eq!(
            split_patterns("**/*.json,  *.md ,"),
            vec!["**/*.json", "*.md"]
        );
        assert!(split_patterns(" , ").is_empty());
    }
}
