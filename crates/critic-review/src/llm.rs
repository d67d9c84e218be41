use async_trait::async_trait;
use critic_core::{CriticError, LlmConfig, SamplingParams};
use serde::{Deserialize, Serialize};

/// One chat turn sent to the completion endpoint.
///
/// # Examples
///
/// ```
/// use critic_review::llm::ChatMessage;
///
/// let msg = ChatMessage::user("review this hunk");
/// let json = serde_json::to_value(&msg).unwrap();
/// assert_eq!(json["role"], "user");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChatMessage<'a> {
    pub role: &'static str,
    pub content: &'a str,
}

impl<'a> ChatMessage<'a> {
    pub fn user(content: &'a str) -> Self {
        Self {
            role: "user",
            content,
        }
    }
}

#[derive(Serialize)]
struct CompletionRequest<'a> {
    messages: [ChatMessage<'a>; 1],
    skill_parameters: SkillParameters<'a>,
    stream_response: bool,
}

#[derive(Serialize)]
struct SkillParameters<'a> {
    model_name: &'a str,
    temperature: f64,
    max_output_tokens: u32,
    top_p: f64,
    frequency_penalty: f64,
    presence_penalty: f64,
}

/// `{"data": {"content": "..."}}`; anything else is an error.
#[derive(Deserialize)]
struct CompletionResponse {
    data: CompletionData,
}

#[derive(Deserialize)]
struct CompletionData {
    content: String,
}

impl<'a> SkillParameters<'a> {
    fn new(model_name: &'a str, sampling: SamplingParams) -> Self {
        Self {
            model_name,
            temperature: sampling.temperature,
            max_output_tokens: sampling.max_output_tokens,
            top_p: sampling.top_p,
            frequency_penalty: sampling.frequency_penalty,
            presence_penalty: sampling.presence_penalty,
        }
    }
}

/// Something that turns a prompt into raw model text.
///
/// Implementations must not fail past this boundary: every failure is
/// reported (logged) and surfaced as `None`, which callers treat as
/// "no findings".
#[async_trait]
pub trait CompletionService: Send + Sync {
    /// Send one prompt and return the model's raw reply.
    async fn complete(&self, prompt: &str) -> Option<String>;
}

/// Client for the skills completion query endpoint.
///
/// Issues exactly one request per call with the configured sampling
/// parameters. There is no retry and no explicit timeout.
///
/// # Examples
///
/// ```
/// use critic_core::LlmConfig;
/// use critic_review::llm::LlmClient;
///
/// let config = LlmConfig {
///     api_key: Some("test-key".into()),
///     ..LlmConfig::default()
/// };
/// let client = LlmClient::new(&config).unwrap();
/// assert_eq!(client.model(), "gpt-4o");
/// ```
pub struct LlmClient {
    client: reqwest::Client,
    config: LlmConfig,
}

impl LlmClient {
    /// Create a new client from configuration.
    ///
    /// # Errors
    ///
    /// Returns [`CriticError::Llm`] if the HTTP client cannot be built.
    pub fn new(config: &LlmConfig) -> Result<Self, CriticError> {
        let client = reqwest::Client::builder()
            .build()
            .map_err(|e| CriticError::Llm(format!("failed to create HTTP client: {e}")))?;
        Ok(Self {
            client,
            config: config.clone(),
        })
    }

    /// The configured model name.
    pub fn model(&self) -> &str {
        &self.config.model
    }

    /// Send `prompt` as a single user message and return the trimmed reply.
    ///
    /// An empty reply is returned as `"{}"`.
    ///
    /// # Errors
    ///
    /// Returns [`CriticError::Llm`] on transport errors, non-2xx statuses or
    /// a body without `data.content`.
    pub async fn query(&self, prompt: &str) -> Result<String, CriticError> {
        let body = CompletionRequest {
            messages: [ChatMessage::user(prompt)],
            skill_parameters: SkillParameters::new(&self.config.model, self.config.sampling),
            stream_response: false,
        };

        let mut request = self.client.post(&self.config.endpoint).json(&body);
        if let Some(key) = self.config.api_key.as_deref() {
            request = request.bearer_auth(key);
        }

        let response = request
            .send()
            .await
            .map_err(|e| CriticError::Llm(format!("{}: {e}", self.config.endpoint)))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| CriticError::Llm(format!("reading reply body: {e}")))?;
        if !status.is_success() {
            return Err(CriticError::Llm(format!("{status}: {text}")));
        }

        let reply: CompletionResponse = serde_json::from_str(&text)
            .map_err(|e| CriticError::Llm(format!("reply has no data.content ({e}): {text}")))?;

        Ok(match reply.data.content.trim() {
            "" => "{}".to_string(),
            content => content.to_string(),
        })
    }
}

#[async_trait]
impl CompletionService for LlmClient {
    async fn complete(&self, prompt: &str) -> Option<String> {
        match self.query(prompt).await {
            Ok(text) => Some(text),
            Err(e) => {
                tracing::error!(model = %self.config.model, "completion failed: {e}");
                None
            }
        }
    }
}
