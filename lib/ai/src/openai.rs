//! OpenAI-compatible chat completion backend.
//!
//! Works against any endpoint speaking the `/v1/chat/completions` wire format,
//! OpenRouter included.

use crate::backend::{LlmBackend, LlmRequest, LlmResponse, MessageRole, TokenUsage};
use crate::error::LlmError;
use async_trait::async_trait;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, instrument, warn};

/// Default endpoint (OpenRouter).
pub const DEFAULT_API_URL: &str = "https://openrouter.ai/api/v1/chat/completions";

/// Configuration for an OpenAI-compatible backend.
#[derive(Debug, Clone)]
pub struct OpenAiConfig {
    /// Full chat-completions URL.
    pub api_url: String,
    /// Bearer token.
    pub api_key: String,
    /// Model identifier.
    pub model: String,
    /// Per-request timeout.
    pub timeout: Duration,
    /// Value for the `X-Title` attribution header.
    pub app_title: Option<String>,
    /// Value for the `HTTP-Referer` attribution header.
    pub referer: Option<String>,
}

impl OpenAiConfig {
    /// Creates a configuration with the default endpoint and a 30 second timeout.
    #[must_use]
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            api_key: api_key.into(),
            model: model.into(),
            timeout: Duration::from_secs(30),
            app_title: None,
            referer: None,
        }
    }

    /// Overrides the endpoint URL.
    #[must_use]
    pub fn with_api_url(mut self, api_url: impl Into<String>) -> Self {
        self.api_url = api_url.into();
        self
    }

    /// Overrides the request timeout.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Sets the attribution title header.
    #[must_use]
    pub fn with_app_title(mut self, title: impl Into<String>) -> Self {
        self.app_title = Some(title.into());
        self
    }
}

/// LLM backend for OpenAI-compatible chat completion endpoints.
#[derive(Debug, Clone)]
pub struct OpenAiCompatibleBackend {
    client: reqwest::Client,
    config: OpenAiConfig,
}

impl OpenAiCompatibleBackend {
    /// Creates a backend with its own HTTP client.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is unusable or the HTTP client
    /// cannot be built.
    pub fn new(config: OpenAiConfig) -> Result<Self, LlmError> {
        if config.api_key.trim().is_empty() {
            return Err(LlmError::InvalidConfig {
                reason: "API key is empty".to_string(),
            });
        }

        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| LlmError::InvalidConfig {
                reason: format!("HTTP client error: {e}"),
            })?;

        Ok(Self { client, config })
    }

    fn build_body<'a>(&'a self, request: &'a LlmRequest) -> ChatCompletionRequest<'a> {
        let mut messages = Vec::with_capacity(request.messages.len() + 1);
        if let Some(system) = &request.system {
            messages.push(WireMessage {
                role: MessageRole::System,
                content: system,
            });
        }
        messages.extend(request.messages.iter().map(|m| WireMessage {
            role: m.role,
            content: &m.content,
        }));

        ChatCompletionRequest {
            model: &self.config.model,
            messages,
            temperature: request.temperature,
            response_format: request.json_output.then_some(ResponseFormat {
                kind: "json_object",
            }),
        }
    }
}

#[derive(Debug, Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: Vec<WireMessage<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_format: Option<ResponseFormat>,
}

#[derive(Debug, Serialize)]
struct WireMessage<'a> {
    role: MessageRole,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    kind: &'static str,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    #[serde(default)]
    model: Option<String>,
    #[serde(default)]
    choices: Vec<Choice>,
    #[serde(default)]
    usage: Option<WireUsage>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct WireUsage {
    #[serde(default)]
    prompt_tokens: u32,
    #[serde(default)]
    completion_tokens: u32,
}

/// Parses a chat completion body into an [`LlmResponse`].
fn parse_completion(body: &str, fallback_model: &str) -> Result<LlmResponse, LlmError> {
    let parsed: ChatCompletionResponse =
        serde_json::from_str(body).map_err(|e| LlmError::ResponseParseFailed {
            reason: e.to_string(),
        })?;

    let content = parsed
        .choices
        .into_iter()
        .next()
        .and_then(|choice| choice.message.content)
        .filter(|content| !content.trim().is_empty())
        .ok_or(LlmError::EmptyResponse)?;

    let usage = parsed
        .usage
        .map(|u| TokenUsage {
            input_tokens: u.prompt_tokens,
            output_tokens: u.completion_tokens,
        })
        .unwrap_or_default();

    Ok(LlmResponse {
        content,
        usage,
        model: parsed.model.unwrap_or_else(|| fallback_model.to_string()),
    })
}

#[async_trait]
impl LlmBackend for OpenAiCompatibleBackend {
    #[instrument(skip(self, request), fields(model = %self.config.model))]
    async fn generate(&self, request: &LlmRequest) -> Result<LlmResponse, LlmError> {
        let body = self.build_body(request);

        let mut http_request = self
            .client
            .post(&self.config.api_url)
            .bearer_auth(&self.config.api_key)
            .json(&body);
        if let Some(title) = &self.config.app_title {
            http_request = http_request.header("X-Title", title);
        }
        if let Some(referer) = &self.config.referer {
            http_request = http_request.header("HTTP-Referer", referer);
        }

        let response = http_request.send().await.map_err(|e| {
            if e.is_timeout() {
                LlmError::Timeout
            } else {
                LlmError::RequestFailed {
                    reason: e.to_string(),
                }
            }
        })?;

        let status = response.status();
        if status == StatusCode::TOO_MANY_REQUESTS {
            let retry_after_secs = response
                .headers()
                .get(reqwest::header::RETRY_AFTER)
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.parse().ok());
            return Err(LlmError::RateLimited { retry_after_secs });
        }

        let text = response.text().await.map_err(|e| {
            if e.is_timeout() {
                LlmError::Timeout
            } else {
                LlmError::RequestFailed {
                    reason: e.to_string(),
                }
            }
        })?;

        if !status.is_success() {
            warn!(status = %status, body = %text, "completion endpoint returned error");
            return Err(LlmError::BadStatus {
                status: status.as_u16(),
                body: text,
            });
        }

        let completion = parse_completion(&text, &self.config.model)?;
        debug!(
            tokens = completion.usage.total(),
            model = %completion.model,
            "completion received"
        );
        Ok(completion)
    }

    fn model(&self) -> &str {
        &self.config.model
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::LlmMessage;
    use serde_json::json;

    fn backend() -> OpenAiCompatibleBackend {
        OpenAiCompatibleBackend::new(OpenAiConfig::new("sk-test", "mistralai/mistral-7b-instruct"))
            .expect("valid backend")
    }

    #[test]
    fn empty_api_key_is_rejected() {
        let err = OpenAiCompatibleBackend::new(OpenAiConfig::new("  ", "m")).unwrap_err();
        assert!(matches!(err, LlmError::InvalidConfig { .. }));
    }

    #[test]
    fn body_puts_system_first_and_requests_json() {
        let backend = backend();
        let request = LlmRequest::from_messages(vec![
            LlmMessage::user("пример"),
            LlmMessage::assistant("{\"intent\":\"list\"}"),
            LlmMessage::user("покажи события"),
        ])
        .with_system("system prompt")
        .with_temperature(0.3)
        .with_json_output();

        let body = serde_json::to_value(backend.build_body(&request)).expect("serialize");

        assert_eq!(body["model"], "mistralai/mistral-7b-instruct");
        assert_eq!(body["messages"][0], json!({"role": "system", "content": "system prompt"}));
        assert_eq!(body["messages"][3]["content"], "покажи события");
        assert_eq!(body["response_format"], json!({"type": "json_object"}));
    }

    #[test]
    fn body_omits_response_format_when_not_requested() {
        let backend = backend();
        let request = LlmRequest::new("hello");
        let body = serde_json::to_value(backend.build_body(&request)).expect("serialize");
        assert!(body.get("response_format").is_none());
        assert_eq!(body["messages"].as_array().map(Vec::len), Some(1));
    }

    #[test]
    fn parses_completion_with_usage() {
        let body = json!({
            "model": "served-model",
            "choices": [{"message": {"role": "assistant", "content": "{\"intent\":\"list\"}"}}],
            "usage": {"prompt_tokens": 120, "completion_tokens": 30}
        })
        .to_string();

        let response = parse_completion(&body, "requested").expect("valid completion");
        assert_eq!(response.content, "{\"intent\":\"list\"}");
        assert_eq!(response.model, "served-model");
        assert_eq!(response.usage.total(), 150);
    }

    #[test]
    fn empty_choices_are_an_empty_response() {
        let body = json!({"choices": []}).to_string();
        assert_eq!(
            parse_completion(&body, "m").unwrap_err(),
            LlmError::EmptyResponse
        );

        let blank = json!({"choices": [{"message": {"content": "  "}}]}).to_string();
        assert_eq!(
            parse_completion(&blank, "m").unwrap_err(),
            LlmError::EmptyResponse
        );
    }

    #[test]
    fn garbage_body_fails_to_parse() {
        let err = parse_completion("<html>bad gateway</html>", "m").unwrap_err();
        assert!(matches!(err, LlmError::ResponseParseFailed { .. }));
    }
}
