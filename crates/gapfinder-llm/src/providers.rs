//! External LLM provider implementations.
//!
//! Each call is a single non-streaming completion. OpenAI and Groq share the
//! chat-completions format; Gemini and Anthropic each have their own.

use std::future::Future;

use reqwest::{Client, RequestBuilder, StatusCode};
use serde_json::{json, Value};
use tracing::{debug, error};

use crate::config::LLMConfig;
use crate::error::LlmError;
use crate::types::{GenerationRequest, LLMProvider};

const GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta/models";
const OPENAI_URL: &str = "https://api.openai.com/v1/chat/completions";
const GROQ_URL: &str = "https://api.groq.com/openai/v1/chat/completions";
const ANTHROPIC_URL: &str = "https://api.anthropic.com/v1/messages";
const MAX_OUTPUT_TOKENS: usize = 4096;

/// Anything that can turn a prompt into text.
pub trait LlmClient: Send + Sync {
    fn generate(
        &self,
        request: &GenerationRequest,
    ) -> impl Future<Output = Result<String, LlmError>> + Send;
}

/// HTTP client bound to one provider, model and key.
#[derive(Debug, Clone)]
pub struct HttpLlmClient {
    client: Client,
    provider: LLMProvider,
    model: String,
    api_key: String,
}

impl HttpLlmClient {
    pub fn new(provider: LLMProvider, model: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            provider,
            model: model.into(),
            api_key: api_key.into(),
        }
    }

    /// Build a client for whichever provider the config resolves to.
    pub fn from_config(config: &LLMConfig) -> Result<Self, LlmError> {
        let (provider, model, api_key) = config.resolve_provider().ok_or(LlmError::NotConfigured)?;
        debug!("Using {} with model {}", provider, model);
        Ok(Self::new(provider, model, api_key))
    }

    pub fn provider(&self) -> LLMProvider {
        self.provider
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// Gemini `generateContent`.
    async fn generate_gemini(&self, request: &GenerationRequest) -> Result<String, LlmError> {
        let url = format!("{}/{}:generateContent", GEMINI_BASE_URL, self.model);
        let mut generation_config = json!({ "temperature": request.temperature });
        if request.json {
            generation_config["responseMimeType"] = json!("application/json");
        }
        let body = json!({
            "systemInstruction": { "parts": [{ "text": request.system }] },
            "contents": [{ "role": "user", "parts": [{ "text": request.prompt }] }],
            "generationConfig": generation_config,
        });

        let builder = self
            .client
            .post(&url)
            .header("x-goog-api-key", &self.api_key)
            .header("Content-Type", "application/json");
        let parsed = send_json(builder, &body).await?;

        let parts = parsed["candidates"][0]["content"]["parts"]
            .as_array()
            .ok_or_else(|| LlmError::Parse("Gemini response has no candidates".into()))?;
        Ok(parts
            .iter()
            .filter_map(|p| p["text"].as_str())
            .collect::<Vec<_>>()
            .join(""))
    }

    /// OpenAI-compatible chat completions (OpenAI, Groq).
    async fn generate_openai_compat(
        &self,
        url: &str,
        request: &GenerationRequest,
    ) -> Result<String, LlmError> {
        let body = json!({
            "model": self.model,
            "messages": [
                { "role": "system", "content": request.system },
                { "role": "user", "content": request.prompt },
            ],
            "temperature": request.temperature,
            "max_tokens": MAX_OUTPUT_TOKENS,
        });

        let builder = self
            .client
            .post(url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json");
        let parsed = send_json(builder, &body).await?;

        parsed["choices"][0]["message"]["content"]
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| LlmError::Parse("completion has no message content".into()))
    }

    /// Anthropic Messages API.
    async fn generate_anthropic(&self, request: &GenerationRequest) -> Result<String, LlmError> {
        let body = json!({
            "model": self.model,
            "system": request.system,
            "messages": [{ "role": "user", "content": request.prompt }],
            "temperature": request.temperature,
            "max_tokens": MAX_OUTPUT_TOKENS,
        });

        let builder = self
            .client
            .post(ANTHROPIC_URL)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", "2023-06-01")
            .header("Content-Type", "application/json");
        let parsed = send_json(builder, &body).await?;

        if parsed["type"].as_str() == Some("error") {
            let msg = parsed["error"]["message"].as_str().unwrap_or("Unknown error");
            error!("Anthropic error: {}", msg);
            return Err(LlmError::Parse(msg.to_string()));
        }
        let blocks = parsed["content"]
            .as_array()
            .ok_or_else(|| LlmError::Parse("message has no content blocks".into()))?;
        Ok(blocks
            .iter()
            .filter(|b| b["type"].as_str() == Some("text"))
            .filter_map(|b| b["text"].as_str())
            .collect::<Vec<_>>()
            .join(""))
    }
}

impl LlmClient for HttpLlmClient {
    async fn generate(&self, request: &GenerationRequest) -> Result<String, LlmError> {
        debug!("Requesting completion from {} ({})", self.provider, self.model);
        match self.provider {
            LLMProvider::Gemini => self.generate_gemini(request).await,
            LLMProvider::OpenAI => self.generate_openai_compat(OPENAI_URL, request).await,
            LLMProvider::Groq => self.generate_openai_compat(GROQ_URL, request).await,
            LLMProvider::Anthropic => self.generate_anthropic(request).await,
        }
    }
}

/// POST a JSON body and classify the response.
async fn send_json(builder: RequestBuilder, body: &Value) -> Result<Value, LlmError> {
    let response = builder.json(body).send().await?;
    let status = response.status();

    if !status.is_success() {
        let retry_after = response
            .headers()
            .get(reqwest::header::RETRY_AFTER)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let text = response.text().await.unwrap_or_default();
        return Err(classify_failure(status, retry_after.as_deref(), text));
    }

    response
        .json::<Value>()
        .await
        .map_err(|e| LlmError::Parse(e.to_string()))
}

fn classify_failure(status: StatusCode, retry_after: Option<&str>, body: String) -> LlmError {
    let exhausted = body.contains("RESOURCE_EXHAUSTED");
    if status == StatusCode::TOO_MANY_REQUESTS || exhausted {
        let detail = match retry_after {
            Some(secs) => format!("{} (retry in {}s)", body, secs.trim()),
            None => body,
        };
        return LlmError::RateLimited { detail };
    }
    LlmError::Api {
        status: status.as_u16(),
        body,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_429_is_rate_limited_with_header_delay() {
        let err = classify_failure(StatusCode::TOO_MANY_REQUESTS, Some("12"), "quota".into());
        match err {
            LlmError::RateLimited { detail } => assert!(detail.contains("retry in 12s")),
            other => panic!("expected rate limit, got {other:?}"),
        }
    }

    #[test]
    fn test_resource_exhausted_body_is_rate_limited() {
        let body = r#"{"error":{"status":"RESOURCE_EXHAUSTED","message":"Please retry in 7s"}}"#;
        let err = classify_failure(StatusCode::BAD_REQUEST, None, body.into());
        assert!(matches!(err, LlmError::RateLimited { .. }));
    }

    #[test]
    fn test_other_status_is_api_error() {
        let err = classify_failure(StatusCode::UNAUTHORIZED, None, "bad key".into());
        assert!(matches!(err, LlmError::Api { status: 401, .. }));
    }

    #[test]
    fn test_from_config_requires_key() {
        assert!(matches!(
            HttpLlmClient::from_config(&LLMConfig::default()),
            Err(LlmError::NotConfigured)
        ));
    }
}
