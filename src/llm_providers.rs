use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, error, info};

/// Common message structure for LLM requests
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct LLMMessage {
    pub role: String,
    pub content: String,
}

impl LLMMessage {
    pub fn system(content: &str) -> Self {
        Self {
            role: "system".to_string(),
            content: content.to_string(),
        }
    }

    pub fn user(content: &str) -> Self {
        Self {
            role: "user".to_string(),
            content: content.to_string(),
        }
    }
}

/// Failure of a single call against a single model
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AttemptError {
    #[error("rate limited by endpoint")]
    RateLimited,

    #[error("request timed out")]
    Timeout,

    #[error("endpoint returned status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("network error: {0}")]
    Network(String),

    #[error("could not decode response: {0}")]
    Decode(String),
}

impl AttemptError {
    fn from_reqwest(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            AttemptError::Timeout
        } else if err.is_decode() {
            AttemptError::Decode(err.to_string())
        } else {
            AttemptError::Network(err.to_string())
        }
    }
}

/// One chat call against a named model. The seam the model client is generic over.
#[async_trait]
pub trait ChatTransport: Send + Sync {
    async fn send_chat(&self, model: &str, messages: &[LLMMessage]) -> Result<String, AttemptError>;

    fn provider_name(&self) -> &'static str;
}

/// Request body shared by both endpoint variants
#[derive(Debug, Clone, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: &'a [LLMMessage],
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
}

#[derive(Debug, Clone, Deserialize)]
struct OpenAIResponse {
    choices: Vec<OpenAIChoice>,
}

#[derive(Debug, Clone, Deserialize)]
struct OpenAIChoice {
    message: OpenAIResponseMessage,
}

#[derive(Debug, Clone, Deserialize)]
struct OpenAIResponseMessage {
    content: Option<String>,
}

/// Shared HTTP plumbing for both endpoint variants
#[derive(Debug, Clone)]
struct HttpEndpoint {
    client: Client,
    api_key: Option<String>,
    url: String,
    max_tokens: Option<u32>,
}

impl HttpEndpoint {
    fn new(url: String, api_key: Option<String>, timeout: Duration, max_tokens: Option<u32>) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            client,
            api_key: api_key.filter(|k| !k.trim().is_empty()),
            url,
            max_tokens,
        })
    }

    fn authorization(&self) -> Option<String> {
        self.api_key.as_ref().map(|key| format!("Bearer {}", key))
    }

    async fn post(
        &self,
        provider: &'static str,
        model: &str,
        messages: &[LLMMessage],
    ) -> Result<reqwest::Response, AttemptError> {
        let body = ChatRequest {
            model,
            messages,
            max_tokens: self.max_tokens,
        };

        info!(
            provider = provider,
            model = %model,
            url = %self.url,
            message_count = messages.len(),
            "Making LLM request"
        );

        let mut request = self
            .client
            .post(&self.url)
            .header("Content-Type", "application/json")
            .json(&body);
        if let Some(authorization) = self.authorization() {
            request = request.header("Authorization", authorization);
        }

        let response = request.send().await.map_err(AttemptError::from_reqwest)?;
        let status = response.status();

        if status == StatusCode::TOO_MANY_REQUESTS {
            error!(provider = provider, model = %model, status = %status, "LLM endpoint rate limited request");
            return Err(AttemptError::RateLimited);
        }

        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_else(|_| "Unknown error".to_string());
            error!(
                provider = provider,
                model = %model,
                status = %status,
                error = %error_text,
                "LLM API request failed"
            );
            return Err(AttemptError::Status {
                status: status.as_u16(),
                body: error_text,
            });
        }

        Ok(response)
    }
}

/// Chat-completions endpoint answering with a JSON envelope
#[derive(Debug, Clone)]
pub struct OpenAIProvider {
    endpoint: HttpEndpoint,
}

pub const OPENAI_DEFAULT_BASE_URL: &str = "https://gen.pollinations.ai/v1";

impl OpenAIProvider {
    pub fn new(
        api_key: Option<String>,
        base_url: Option<String>,
        timeout: Duration,
        max_tokens: Option<u32>,
    ) -> Result<Self> {
        let base_url = base_url.unwrap_or_else(|| OPENAI_DEFAULT_BASE_URL.to_string());
        let url = format!("{}/chat/completions", base_url.trim_end_matches('/'));
        Ok(Self {
            endpoint: HttpEndpoint::new(url, api_key, timeout, max_tokens)?,
        })
    }

    pub async fn make_request(&self, model: &str, messages: &[LLMMessage]) -> Result<String, AttemptError> {
        let response = self.endpoint.post(self.provider_name(), model, messages).await?;

        let openai_response: OpenAIResponse = response.json().await.map_err(AttemptError::from_reqwest)?;

        let response_content = openai_response
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| AttemptError::Decode("No choices with content in response".to_string()))?;

        info!(
            provider = self.provider_name(),
            model = %model,
            response_length = response_content.len(),
            "Successfully received LLM response"
        );

        Ok(response_content)
    }

    pub fn provider_name(&self) -> &'static str {
        "OpenAI"
    }

    pub fn url(&self) -> &str {
        &self.endpoint.url
    }
}

/// Text endpoint that answers with the completion as the raw body
#[derive(Debug, Clone)]
pub struct PollinationsProvider {
    endpoint: HttpEndpoint,
}

pub const POLLINATIONS_DEFAULT_BASE_URL: &str = "https://text.pollinations.ai";

impl PollinationsProvider {
    pub fn new(
        api_key: Option<String>,
        base_url: Option<String>,
        timeout: Duration,
        max_tokens: Option<u32>,
    ) -> Result<Self> {
        let url = base_url.unwrap_or_else(|| POLLINATIONS_DEFAULT_BASE_URL.to_string());
        Ok(Self {
            endpoint: HttpEndpoint::new(url, api_key, timeout, max_tokens)?,
        })
    }

    pub async fn make_request(&self, model: &str, messages: &[LLMMessage]) -> Result<String, AttemptError> {
        let response = self.endpoint.post(self.provider_name(), model, messages).await?;
        let response_content = response.text().await.map_err(AttemptError::from_reqwest)?;

        info!(
            provider = self.provider_name(),
            model = %model,
            response_length = response_content.len(),
            "Successfully received LLM response"
        );

        Ok(response_content)
    }

    pub fn provider_name(&self) -> &'static str {
        "Pollinations"
    }

    pub fn url(&self) -> &str {
        &self.endpoint.url
    }
}

/// Enum-based provider so the concrete endpoint can be chosen from configuration
#[derive(Debug, Clone)]
pub enum LLMProvider {
    OpenAI(OpenAIProvider),
    Pollinations(PollinationsProvider),
}

#[async_trait]
impl ChatTransport for LLMProvider {
    async fn send_chat(&self, model: &str, messages: &[LLMMessage]) -> Result<String, AttemptError> {
        match self {
            LLMProvider::OpenAI(provider) => provider.make_request(model, messages).await,
            LLMProvider::Pollinations(provider) => provider.make_request(model, messages).await,
        }
    }

    fn provider_name(&self) -> &'static str {
        match self {
            LLMProvider::OpenAI(provider) => provider.provider_name(),
            LLMProvider::Pollinations(provider) => provider.provider_name(),
        }
    }
}

impl LLMProvider {
    pub fn url(&self) -> &str {
        match self {
            LLMProvider::OpenAI(provider) => provider.url(),
            LLMProvider::Pollinations(provider) => provider.url(),
        }
    }

    /// Value of the Authorization header sent with each request, if any
    pub fn authorization(&self) -> Option<String> {
        match self {
            LLMProvider::OpenAI(provider) => provider.endpoint.authorization(),
            LLMProvider::Pollinations(provider) => provider.endpoint.authorization(),
        }
    }
}

/// Strips markdown code fences and surrounding prose from model output
#[derive(Clone, Debug, Default)]
pub struct JsonResponseParser;

impl JsonResponseParser {
    /// Remove a leading ``` / ```json line and a trailing ``` line when present
    pub fn strip_code_fences(content: &str) -> &str {
        let trimmed = content.trim();
        let Some(rest) = trimmed.strip_prefix("```") else {
            return trimmed;
        };
        let rest = match rest.find('\n') {
            Some(newline) if rest[..newline].trim().chars().all(|c| c.is_ascii_alphanumeric()) => {
                &rest[newline + 1..]
            }
            _ => rest.trim_start_matches("json"),
        };
        rest.trim_end().trim_end_matches("```").trim()
    }

    /// Extract JSON from LLM responses that might be wrapped in markdown or other formatting
    pub fn extract_json_from_response(content: &str) -> String {
        let unfenced = Self::strip_code_fences(content);
        if unfenced.starts_with('{') || unfenced.starts_with('[') {
            return unfenced.to_string();
        }

        // Fenced block somewhere after leading prose
        if let Some(start) = content.find("```") {
            let inner = Self::strip_code_fences(&content[start..]);
            if let Some(end) = inner.find("```") {
                let candidate = inner[..end].trim();
                if candidate.starts_with('{') || candidate.starts_with('[') {
                    return candidate.to_string();
                }
            } else if inner.starts_with('{') || inner.starts_with('[') {
                return inner.to_string();
            }
        }

        let object = content.find('{').zip(content.rfind('}')).filter(|(s, e)| e > s);
        let array = content.find('[').zip(content.rfind(']')).filter(|(s, e)| e > s);
        let span = match (object, array) {
            (Some(o), Some(a)) => Some(if a.0 < o.0 { a } else { o }),
            (o, a) => o.or(a),
        };
        if let Some((start, end)) = span {
            return content[start..=end].to_string();
        }

        unfenced.to_string()
    }

    /// Parse JSON response into a specific type with error handling
    pub fn parse_json_response<T>(&self, content: &str) -> Result<T, serde_json::Error>
    where
        T: serde::de::DeserializeOwned,
    {
        let json_content = Self::extract_json_from_response(content);
        debug!(extracted_length = json_content.len(), "Extracted JSON from LLM response");
        serde_json::from_str::<T>(&json_content)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum LLMProviderType {
    OpenAI,
    Pollinations,
}

impl LLMProviderType {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().as_str() {
            "openai" | "chatgpt" | "gpt" | "chat" => Some(LLMProviderType::OpenAI),
            "pollinations" | "text" | "raw" => Some(LLMProviderType::Pollinations),
            _ => None,
        }
    }
}

/// Factory for creating LLM providers based on provider type
pub struct LLMProviderFactory;

impl LLMProviderFactory {
    pub fn create_provider(
        provider_type: LLMProviderType,
        api_key: Option<String>,
        base_url: Option<String>,
        timeout: Duration,
        max_tokens: Option<u32>,
    ) -> Result<LLMProvider> {
        Ok(match provider_type {
            LLMProviderType::OpenAI => {
                LLMProvider::OpenAI(OpenAIProvider::new(api_key, base_url, timeout, max_tokens)?)
            }
            LLMProviderType::Pollinations => {
                LLMProvider::Pollinations(PollinationsProvider::new(api_key, base_url, timeout, max_tokens)?)
            }
        })
    }
}
