//! GeminiGateway - REST client for the Gemini `generateContent` endpoint.
//!
//! Owns the API credential. Each call issues at most one HTTP request and
//! never retries; failures are classified into `ScribeError` variants.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tubescribe_core::config::GatewayConfig;
use tubescribe_core::gateway::{AiGateway, AiRequest, AiResponse};
use tubescribe_core::key_store::redact;
use tubescribe_core::{Result, ScribeError};

use crate::supported_models::normalize_model;

const HARM_CATEGORIES: [&str; 4] = [
    "HARM_CATEGORY_HARASSMENT",
    "HARM_CATEGORY_HATE_SPEECH",
    "HARM_CATEGORY_SEXUALLY_EXPLICIT",
    "HARM_CATEGORY_DANGEROUS_CONTENT",
];
const SAFETY_THRESHOLD: &str = "BLOCK_MEDIUM_AND_ABOVE";

const VALIDATION_PROMPT: &str = "Respond with 'API key is valid' if you can read this message.";
const VALIDATION_MAX_TOKENS: u32 = 20;
const VALIDATION_TEMPERATURE: f32 = 0.1;
pub const VALIDATION_SUCCESS: &str = "API key is valid! Connection to Google AI API successful.";

/// Gateway to the Gemini HTTP API.
#[derive(Clone)]
pub struct GeminiGateway {
    client: Client,
    config: GatewayConfig,
    credential: Arc<RwLock<Option<String>>>,
}

impl GeminiGateway {
    pub fn new(config: GatewayConfig) -> Self {
        Self {
            client: Client::new(),
            config,
            credential: Arc::new(RwLock::new(None)),
        }
    }

    /// Points the gateway at another server (used by tests).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.config.base_url = base_url.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.config.timeout_secs = timeout.as_secs().max(1);
        self
    }

    pub fn config(&self) -> &GatewayConfig {
        &self.config
    }

    fn endpoint(&self, model: &str, api_key: &str) -> String {
        format!(
            "{}/{model}:generateContent?key={api_key}",
            self.config.base_url.trim_end_matches('/'),
        )
    }

    fn build_request(
        &self,
        prompt: &str,
        max_output_tokens: u32,
        temperature: f32,
    ) -> GenerateContentRequest {
        GenerateContentRequest {
            contents: vec![Content {
                parts: vec![Part {
                    text: prompt.to_string(),
                }],
            }],
            generation_config: GenerationConfig {
                max_output_tokens,
                temperature,
            },
            safety_settings: HARM_CATEGORIES
                .iter()
                .map(|category| SafetySetting {
                    category: category.to_string(),
                    threshold: SAFETY_THRESHOLD.to_string(),
                })
                .collect(),
        }
    }

    /// Sends one request under the configured wall-clock budget.
    async fn send_request(
        &self,
        model: &str,
        api_key: &str,
        body: &GenerateContentRequest,
    ) -> Result<String> {
        let timeout = self.config.timeout();
        match tokio::time::timeout(timeout, self.exchange(model, api_key, body)).await {
            Ok(result) => result,
            Err(_) => {
                tracing::warn!("[Gateway] Request to {} timed out after {:?}", model, timeout);
                Err(ScribeError::Timeout {
                    seconds: timeout.as_secs(),
                })
            }
        }
    }

    async fn exchange(
        &self,
        model: &str,
        api_key: &str,
        body: &GenerateContentRequest,
    ) -> Result<String> {
        let response = self
            .client
            .post(self.endpoint(model, api_key))
            .json(body)
            .send()
            .await
            .map_err(|err| self.map_transport_error(err))?;

        let status = response.status();
        if !status.is_success() {
            let body_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Failed to read Gemini error body".to_string());
            return Err(map_http_error(status, &body_text));
        }

        let parsed: GenerateContentResponse = response.json().await.map_err(|err| {
            if err.is_timeout() {
                self.map_transport_error(err)
            } else {
                ScribeError::upstream(
                    status.as_u16(),
                    format!("Failed to parse Gemini response: {err}"),
                )
            }
        })?;

        extract_text_response(parsed)
            .ok_or_else(|| ScribeError::upstream(status.as_u16(), "no text in response"))
    }

    fn map_transport_error(&self, err: reqwest::Error) -> ScribeError {
        if err.is_timeout() {
            ScribeError::Timeout {
                seconds: self.config.timeout_secs,
            }
        } else {
            ScribeError::upstream(
                err.status().map(|s| s.as_u16()).unwrap_or_default(),
                format!("Gemini API request failed: {err}"),
            )
        }
    }
}

#[async_trait]
impl AiGateway for GeminiGateway {
    async fn set_credential(&self, api_key: Option<String>) {
        let api_key = api_key.filter(|key| !key.trim().is_empty());
        match &api_key {
            Some(key) => tracing::info!("[Gateway] Credential set ({})", redact(key)),
            None => tracing::info!("[Gateway] Credential cleared"),
        }
        *self.credential.write().await = api_key;
    }

    async fn credential(&self) -> Option<String> {
        self.credential.read().await.clone()
    }

    async fn generate(&self, request: AiRequest) -> Result<AiResponse> {
        let api_key = self
            .credential()
            .await
            .ok_or(ScribeError::MissingCredential)?;

        let model = normalize_model(request.model.as_deref(), &self.config.default_model);
        tracing::info!(
            "[Gateway] {} with {} ({} chars)",
            request.action,
            model,
            request.prompt.chars().count()
        );

        let body = self.build_request(
            &request.prompt,
            self.config.max_output_tokens,
            self.config.temperature,
        );
        let text = self.send_request(&model, &api_key, &body).await?;

        Ok(AiResponse { text, model })
    }

    async fn validate_credential(&self, api_key: &str) -> Result<String> {
        let api_key = api_key.trim();
        if api_key.is_empty() {
            return Err(ScribeError::MissingCredential);
        }
        tracing::info!("[Gateway] Validating credential {}", redact(api_key));

        let model = normalize_model(
            Some(self.config.validation_model.as_str()),
            &self.config.default_model,
        );
        let body = self.build_request(
            VALIDATION_PROMPT,
            VALIDATION_MAX_TOKENS,
            VALIDATION_TEMPERATURE,
        );

        match self.send_request(&model, api_key, &body).await {
            Ok(_) => Ok(VALIDATION_SUCCESS.to_string()),
            Err(ScribeError::UpstreamError { status, message }) if status / 100 == 2 => {
                tracing::warn!("[Gateway] Validation response without text: {}", message);
                Err(ScribeError::upstream(
                    status,
                    "Received a response but couldn't verify API key validity.",
                ))
            }
            Err(err) => Err(err),
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest {
    contents: Vec<Content>,
    generation_config: GenerationConfig,
    safety_settings: Vec<SafetySetting>,
}

#[derive(Serialize)]
struct Content {
    parts: Vec<Part>,
}

#[derive(Serialize)]
struct Part {
    text: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    max_output_tokens: u32,
    temperature: f32,
}

#[derive(Serialize)]
struct SafetySetting {
    category: String,
    threshold: String,
}

#[derive(Deserialize)]
struct GenerateContentResponse {
    candidates: Option<Vec<Candidate>>,
}

#[derive(Deserialize)]
struct Candidate {
    content: Option<ContentResponse>,
}

#[derive(Deserialize)]
struct ContentResponse {
    #[serde(default)]
    parts: Vec<PartResponse>,
}

#[derive(Deserialize)]
struct PartResponse {
    text: Option<String>,
}

#[derive(Deserialize)]
struct ErrorWrapper {
    error: ErrorBody,
}

#[derive(Deserialize)]
struct ErrorBody {
    message: Option<String>,
    status: Option<String>,
}

/// Text of the first part of the first candidate.
fn extract_text_response(response: GenerateContentResponse) -> Option<String> {
    response
        .candidates?
        .into_iter()
        .next()?
        .content?
        .parts
        .into_iter()
        .next()?
        .text
        .filter(|text| !text.is_empty())
}

fn map_http_error(status: StatusCode, body: &str) -> ScribeError {
    let message = serde_json::from_str::<ErrorWrapper>(body)
        .map(|wrapper| {
            let status_text = wrapper.error.status.unwrap_or_default();
            let msg = wrapper.error.message.unwrap_or_else(|| body.to_string());
            if status_text.is_empty() {
                msg
            } else {
                format!("{status_text}: {msg}")
            }
        })
        .unwrap_or_else(|_| body.to_string());

    tracing::warn!("[Gateway] HTTP {}: {}", status.as_u16(), message);

    match status {
        StatusCode::BAD_REQUEST => ScribeError::InvalidRequest { message },
        StatusCode::UNAUTHORIZED => ScribeError::InvalidCredential { message },
        StatusCode::FORBIDDEN => ScribeError::Forbidden { message },
        StatusCode::TOO_MANY_REQUESTS => ScribeError::RateLimited { message },
        other => ScribeError::upstream(other.as_u16(), message),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_body_shape() {
        let gateway = GeminiGateway::new(GatewayConfig::default());
        let body = serde_json::to_value(gateway.build_request("hello", 2048, 0.7)).unwrap();

        assert_eq!(body["contents"][0]["parts"][0]["text"], "hello");
        assert_eq!(body["generationConfig"]["maxOutputTokens"], 2048);
        assert_eq!(body["safetySettings"].as_array().unwrap().len(), 4);
        assert_eq!(body["safetySettings"][0]["threshold"], "BLOCK_MEDIUM_AND_ABOVE");
    }

    #[test]
    fn test_status_mapping() {
        let body =
            r#"{"error":{"code":429,"message":"Quota exceeded","status":"RESOURCE_EXHAUSTED"}}"#;
        assert_eq!(
            map_http_error(StatusCode::TOO_MANY_REQUESTS, body),
            ScribeError::RateLimited {
                message: "RESOURCE_EXHAUSTED: Quota exceeded".into()
            }
        );
        assert!(matches!(
            map_http_error(StatusCode::BAD_REQUEST, "{}"),
            ScribeError::InvalidRequest { .. }
        ));
        assert!(matches!(
            map_http_error(StatusCode::UNAUTHORIZED, "nope"),
            ScribeError::InvalidCredential { .. }
        ));
        assert!(matches!(
            map_http_error(StatusCode::FORBIDDEN, "nope"),
            ScribeError::Forbidden { .. }
        ));
        assert_eq!(
            map_http_error(StatusCode::SERVICE_UNAVAILABLE, "down"),
            ScribeError::upstream(503, "down")
        );
    }

    #[test]
    fn test_extracts_first_candidate_text() {
        let parsed: GenerateContentResponse = serde_json::from_str(
            r#"{"candidates":[
                {"content":{"parts":[{"text":"first"},{"text":"second"}]}},
                {"content":{"parts":[{"text":"other"}]}}
            ]}"#,
        )
        .unwrap();
        assert_eq!(extract_text_response(parsed).as_deref(), Some("first"));

        let empty: GenerateContentResponse = serde_json::from_str(r#"{"candidates":[]}"#).unwrap();
        assert_eq!(extract_text_response(empty), None);
    }
}
