use std::time::Duration;
use async_trait::async_trait;
use serde::{Serialize, Deserialize};
use reqwest::{Client, StatusCode};
use log::{debug, error};

use crate::errors::ProviderError;
use super::{GenerationOptions, Provider};

/// Environment variable holding the Anthropic API key
pub const API_KEY_ENV: &str = "CLAUDE_API_KEY";

const ANTHROPIC_VERSION: &str = "2023-06-01";

/// Anthropic client for interacting with Anthropic API
pub struct Anthropic {
    /// HTTP client for API requests
    client: Client,
    /// API key for authentication
    api_key: String,
    /// API endpoint URL (optional, defaults to public API)
    endpoint: String,
}

impl std::fmt::Debug for Anthropic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Anthropic")
            .field("endpoint", &self.endpoint)
            .field("api_key", &"<redacted>")
            .finish()
    }
}

/// Anthropic message request
#[derive(Debug, Clone, Serialize)]
pub struct AnthropicRequest {
    /// The model to use
    model: String,

    /// The messages for the conversation
    messages: Vec<AnthropicMessage>,

    /// System prompt to guide the AI
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<String>,

    /// Temperature for generation
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,

    /// Maximum number of tokens to generate
    max_tokens: u32,
}

/// Anthropic message format
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnthropicMessage {
    /// Role of the message sender (user, assistant)
    pub role: String,

    /// Content of the message
    pub content: String,
}

/// Token usage information
#[derive(Debug, Default, Deserialize)]
pub struct TokenUsage {
    /// Number of input tokens
    #[serde(default)]
    pub input_tokens: u32,
    /// Number of output tokens
    #[serde(default)]
    pub output_tokens: u32,
}

/// Anthropic response
#[derive(Debug, Deserialize)]
pub struct AnthropicResponse {
    /// The content of the response
    pub content: Vec<AnthropicContent>,
    /// Why generation stopped (`end_turn`, `max_tokens`, ...)
    #[serde(default)]
    pub stop_reason: Option<String>,
    /// Token usage information
    #[serde(default)]
    pub usage: TokenUsage,
}

/// Individual content block in an Anthropic response
#[derive(Debug, Deserialize)]
pub struct AnthropicContent {
    /// The type of content
    #[serde(rename = "type")]
    pub content_type: String,

    /// The actual text content
    #[serde(default)]
    pub text: String,
}

impl AnthropicRequest {
    /// Create a new Anthropic request
    pub fn new(model: impl Into<String>, max_tokens: u32) -> Self {
        Self {
            model: model.into(),
            messages: Vec::new(),
            system: None,
            temperature: None,
            max_tokens,
        }
    }

    /// Add a message to the request
    pub fn add_message(mut self, role: impl Into<String>, content: impl Into<String>) -> Self {
        self.messages.push(AnthropicMessage {
            role: role.into(),
            content: content.into(),
        });
        self
    }

    /// Set the system prompt
    pub fn system(mut self, system: impl Into<String>) -> Self {
        self.system = Some(system.into());
        self
    }

    /// Set the temperature
    pub fn temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }
}

impl Anthropic {
    /// Create a new Anthropic client
    pub fn new(api_key: impl Into<String>, endpoint: impl Into<String>, timeout_secs: u64) -> Self {
        Self {
            client: Client::builder()
                .timeout(Duration::from_secs(timeout_secs))
                .build()
                .unwrap_or_default(),
            api_key: api_key.into(),
            endpoint: endpoint.into(),
        }
    }

    fn messages_url(&self) -> String {
        if self.endpoint.is_empty() {
            "https://api.anthropic.com/v1/messages".to_string()
        } else {
            format!("{}/v1/messages", self.endpoint.trim_end_matches('/'))
        }
    }

    /// Message from an error body (`{"error": {"message": ...}}`), or the raw body
    pub fn error_message(body: &str) -> String {
        serde_json::from_str::<serde_json::Value>(body)
            .ok()
            .and_then(|v| v.pointer("/error/message").and_then(|m| m.as_str()).map(str::to_string))
            .unwrap_or_else(|| body.trim().to_string())
    }

    /// Map a non-success HTTP status to a provider error
    pub fn error_for_status(status: StatusCode, message: String, retry_after_secs: Option<u64>) -> ProviderError {
        match status {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => ProviderError::AuthenticationError(message),
            StatusCode::TOO_MANY_REQUESTS => ProviderError::RateLimitExceeded { message, retry_after_secs },
            _ => ProviderError::ApiError {
                status_code: status.as_u16(),
                message,
            },
        }
    }
}

#[async_trait]
impl Provider for Anthropic {
    type Request = AnthropicRequest;
    type Response = AnthropicResponse;

    fn build_request(&self, system: &str, user: &str, options: &GenerationOptions) -> AnthropicRequest {
        AnthropicRequest::new(options.model.clone(), options.max_tokens)
            .system(system)
            .temperature(options.temperature)
            .add_message("user", user)
    }

    /// Complete a messages request
    async fn complete(&self, request: AnthropicRequest) -> Result<AnthropicResponse, ProviderError> {
        let api_url = self.messages_url();

        let response = self.client.post(&api_url)
            .header("Content-Type", "application/json")
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    ProviderError::ConnectionError(format!("Request to Anthropic API timed out: {}", e))
                } else {
                    ProviderError::ConnectionError(format!("Failed to send request to Anthropic API: {}", e))
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let retry_after_secs = response.headers()
                .get("retry-after")
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.trim().parse::<u64>().ok());
            let error_text = response.text().await
                .unwrap_or_else(|_| "Failed to get error response text".to_string());
            error!("Anthropic API error ({}): {}", status, error_text);
            return Err(Self::error_for_status(status, Self::error_message(&error_text), retry_after_secs));
        }

        let anthropic_response = response.json::<AnthropicResponse>().await
            .map_err(|e| ProviderError::ParseError(format!("Failed to parse Anthropic API response: {}", e)))?;

        debug!(
            "Anthropic response: {} input tokens, {} output tokens, stop reason {:?}",
            anthropic_response.usage.input_tokens,
            anthropic_response.usage.output_tokens,
            anthropic_response.stop_reason
        );

        Ok(anthropic_response)
    }

    /// Test the connection to the Anthropic API
    async fn test_connection(&self, options: &GenerationOptions) -> Result<(), ProviderError> {
        let request = AnthropicRequest::new(options.model.clone(), 10)
            .add_message("user", "Hello");

        self.complete(request).await?;
        Ok(())
    }

    /// Extract text from Anthropic response
    fn extract_text(response: &AnthropicResponse) -> String {
        response.content.iter()
            .filter(|c| c.content_type == "text")
            .map(|c| c.text.as_str())
            .collect()
    }

    fn is_truncated(response: &AnthropicResponse) -> bool {
        response.stop_reason.as_deref() == Some("max_tokens")
    }

    fn token_usage(response: &AnthropicResponse) -> Option<(u64, u64)> {
        Some((response.usage.input_tokens as u64, response.usage.output_tokens as u64))
    }
}
