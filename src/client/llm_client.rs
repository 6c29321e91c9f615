//! Generic LLM client for OpenAI-compatible endpoints.
//!
//! Epistemic foundation:
//! - K_i: OpenAI chat-completions schema is the de facto standard
//! - K_i: Structured output is requested with a strict JSON schema
//! - B_i: API will respond within timeout (might fail)
//! - B_i: Response will match the schema (might fail → SchemaViolation)
//! - I^B: Network availability unknowable → retry with backoff

use crate::models::{ClaimCheckError, LlmApiError, LlmConfig, Result};
use async_trait::async_trait;
use regex::Regex;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, HeaderMap, HeaderValue};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;
use std::time::{Duration, Instant};
use tracing::debug;

/// Upper bound on a server-requested retry delay.
const MAX_RETRY_AFTER: Duration = Duration::from_secs(60);

/// Message in a chat completion request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub role: String,
    pub content: String,
}

impl Message {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system".to_string(),
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }
}

/// JSON schema the model's reply must satisfy.
#[derive(Debug, Clone)]
pub struct OutputSchema {
    pub name: &'static str,
    pub schema: serde_json::Value,
}

/// A structured-output completion request.
#[derive(Debug, Clone)]
pub struct StructuredRequest {
    pub system_prompt: String,
    pub user_prompt: String,
    pub schema: OutputSchema,
    pub temperature: Option<f64>,
}

/// Chat completion request payload.
#[derive(Debug, Serialize)]
struct ChatCompletionRequest {
    model: String,
    messages: Vec<Message>,
    max_tokens: u32,
    /// Omitted when the caller sets none; the endpoint default applies
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f64>,
    response_format: ResponseFormat,
}

#[derive(Debug, Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    format_type: &'static str,
    json_schema: JsonSchemaFormat,
}

#[derive(Debug, Serialize)]
struct JsonSchemaFormat {
    name: &'static str,
    strict: bool,
    schema: serde_json::Value,
}

/// Chat completion response.
#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<ChatChoice>,
    usage: Option<ChatUsage>,
    model: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Debug, Deserialize)]
struct ChatMessage {
    content: Option<String>,
    #[serde(default)]
    refusal: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChatUsage {
    prompt_tokens: u32,
    completion_tokens: u32,
}

/// API error response (OpenAI-compatible).
#[derive(Debug, Deserialize)]
struct ApiErrorResponse {
    error: ApiErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ApiErrorDetail {
    message: String,
}

/// Response from a completion request.
#[derive(Debug, Clone)]
pub struct CompletionResponse {
    /// Generated content (expected to be JSON)
    pub content: String,
    /// Model used (may differ from requested)
    pub model: String,
    /// Input tokens
    pub input_tokens: u32,
    /// Output tokens
    pub output_tokens: u32,
    /// Request duration
    pub duration: Duration,
}

/// Language-model collaborator used by the planner and the reasoner.
#[async_trait]
pub trait ChatModel: Send + Sync {
    /// Model identifier requested from the endpoint.
    fn model_id(&self) -> &str;

    /// Run a completion whose reply must match `request.schema`.
    ///
    /// Fails with `ClaimCheckError::MissingCredential` before any I/O when no
    /// API key is configured.
    async fn complete_structured(&self, request: StructuredRequest) -> Result<CompletionResponse>;
}

/// LLM client for any OpenAI-compatible endpoint.
///
/// Features:
/// - Strict JSON-schema structured output
/// - Retry with exponential backoff (network errors, 429, 5xx)
/// - No retry on authentication or model-not-found errors
pub struct LlmClient {
    client: reqwest::Client,
    /// API key (None when not configured; calls fail fast)
    api_key: Option<String>,
    /// Base URL for the API
    base_url: String,
    /// Model requested on every call
    model: String,
    max_tokens: u32,
    /// Request timeout
    timeout: Duration,
    /// Maximum attempts per completion
    max_retries: u32,
    /// Environment variable the key was expected in (for error messages)
    api_key_env: String,
}

impl LlmClient {
    /// Create a new LLM client.
    pub fn new(config: &LlmConfig, api_key: Option<String>) -> Result<Self> {
        let timeout = Duration::from_secs(config.timeout_secs);

        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(ClaimCheckError::Network)?;

        Ok(Self {
            client,
            api_key,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            model: config.model.clone(),
            max_tokens: config.max_tokens,
            timeout,
            max_retries: config.max_retries.max(1),
            api_key_env: config.api_key_env.clone(),
        })
    }

    /// Whether an API key was resolved.
    pub fn has_credentials(&self) -> bool {
        self.api_key.is_some()
    }

    /// Get the base URL.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn require_key(&self) -> Result<&str> {
        self.api_key
            .as_deref()
            .ok_or_else(|| ClaimCheckError::MissingCredential {
                service: "language model".to_string(),
                env_var: self.api_key_env.clone(),
            })
    }

    /// Build headers for a request.
    fn headers(&self, api_key: &str) -> Result<HeaderMap> {
        let mut headers = HeaderMap::new();
        let bearer = HeaderValue::from_str(&format!("Bearer {api_key}")).map_err(|_| {
            ClaimCheckError::InvalidInput("API key contains invalid header characters".into())
        })?;
        headers.insert(AUTHORIZATION, bearer);
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        Ok(headers)
    }

    fn backoff(attempt: u32) -> Duration {
        Duration::from_secs(2u64.pow(attempt))
    }

    /// Delay before retrying a 429.
    ///
    /// Honours a finite, non-negative `retry-after` capped at `MAX_RETRY_AFTER`;
    /// anything else uses the exponential backoff.
    fn retry_after_delay(retry_after: Option<f64>, attempt: u32) -> Duration {
        match retry_after {
            Some(secs) if secs.is_finite() && secs >= 0.0 => {
                Duration::from_secs_f64(secs.min(MAX_RETRY_AFTER.as_secs_f64()))
            }
            _ => Self::backoff(attempt),
        }
    }

    fn build_request(
        &self,
        messages: Vec<Message>,
        schema: OutputSchema,
        temperature: Option<f64>,
    ) -> ChatCompletionRequest {
        ChatCompletionRequest {
            model: self.model.clone(),
            messages,
            max_tokens: self.max_tokens,
            temperature,
            response_format: ResponseFormat {
                format_type: "json_schema",
                json_schema: JsonSchemaFormat {
                    name: schema.name,
                    strict: true,
                    schema: schema.schema,
                },
            },
        }
    }

    /// Complete a chat request with structured output.
    ///
    /// B_i(API available) → Result
    /// B_i(valid response) → Result
    /// I^B(rate limits) → backoff
    pub async fn complete(
        &self,
        messages: Vec<Message>,
        schema: OutputSchema,
        temperature: Option<f64>,
    ) -> Result<CompletionResponse> {
        let api_key = self.require_key()?;
        let headers = self.headers(api_key)?;
        let start = Instant::now();

        let request = self.build_request(messages, schema, temperature);

        let url = format!("{}/chat/completions", self.base_url);
        let mut last_error: Option<ClaimCheckError> = None;

        for attempt in 0..self.max_retries {
            let is_last = attempt + 1 >= self.max_retries;

            let response = self
                .client
                .post(&url)
                .headers(headers.clone())
                .json(&request)
                .send()
                .await;

            let response = match response {
                Ok(r) => r,
                Err(e) => {
                    if e.is_timeout() {
                        last_error = Some(ClaimCheckError::Timeout(self.timeout));
                    } else {
                        last_error = Some(ClaimCheckError::Network(e));
                    }
                    if !is_last {
                        let backoff = Self::backoff(attempt);
                        debug!(
                            attempt = attempt,
                            backoff_secs = backoff.as_secs(),
                            "Retrying after network error"
                        );
                        tokio::time::sleep(backoff).await;
                    }
                    continue;
                }
            };

            let status = response.status().as_u16();

            // Handle rate limiting
            if status == 429 {
                let retry_after = response
                    .headers()
                    .get("retry-after")
                    .and_then(|v| v.to_str().ok())
                    .and_then(|s| s.trim().parse::<f64>().ok());
                let delay = Self::retry_after_delay(retry_after, attempt);

                last_error = Some(ClaimCheckError::RateLimited {
                    retry_after_secs: delay.as_secs_f64(),
                });

                if !is_last {
                    debug!(
                        attempt = attempt,
                        retry_after_secs = delay.as_secs_f64(),
                        "Rate limited, waiting"
                    );
                    tokio::time::sleep(delay).await;
                }
                continue;
            }

            // Handle other errors
            if !response.status().is_success() {
                let error_body = response.text().await.unwrap_or_default();
                let error = match status {
                    401 => LlmApiError::AuthenticationFailed,
                    404 => LlmApiError::ModelNotFound(self.model.clone()),
                    _ => {
                        let message = serde_json::from_str::<ApiErrorResponse>(&error_body)
                            .map(|e| e.error.message)
                            .unwrap_or(error_body);
                        LlmApiError::ApiError { status, message }
                    }
                };

                last_error = Some(ClaimCheckError::LlmApi(error));

                // Don't retry auth errors or not found
                if status == 401 || status == 404 {
                    break;
                }

                if !is_last {
                    tokio::time::sleep(Self::backoff(attempt)).await;
                }
                continue;
            }

            // Parse successful response
            let body: ChatCompletionResponse = response.json().await.map_err(|e| {
                ClaimCheckError::ParseError(format!("Failed to parse response: {e}"))
            })?;

            let message = body
                .choices
                .into_iter()
                .next()
                .map(|c| c.message)
                .ok_or_else(|| ClaimCheckError::ParseError("No choices in response".to_string()))?;

            if let Some(refusal) = message.refusal {
                return Err(LlmApiError::InvalidResponse(format!("model refused: {refusal}")).into());
            }

            let content = message
                .content
                .filter(|c| !c.trim().is_empty())
                .ok_or_else(|| LlmApiError::InvalidResponse("empty message content".to_string()))?;

            let (input_tokens, output_tokens) = body
                .usage
                .map(|u| (u.prompt_tokens, u.completion_tokens))
                .unwrap_or((0, 0));

            debug!(
                model = %self.model,
                input_tokens,
                output_tokens,
                elapsed_ms = start.elapsed().as_millis() as u64,
                "Completion received"
            );

            return Ok(CompletionResponse {
                content,
                model: body.model.unwrap_or_else(|| self.model.clone()),
                input_tokens,
                output_tokens,
                duration: start.elapsed(),
            });
        }

        // All retries exhausted
        Err(last_error.unwrap_or_else(|| {
            ClaimCheckError::LlmApi(LlmApiError::MaxRetriesExceeded {
                attempts: self.max_retries,
                last_error: "Unknown error".to_string(),
            })
        }))
    }

    /// Health check: ping the /models endpoint.
    ///
    /// K_i: endpoint is reachable and responding
    /// B_i: endpoint is healthy if /models returns 200
    pub async fn health_check(&self) -> HealthCheckResult {
        let start = Instant::now();
        let url = format!("{}/models", self.base_url);

        let mut request = self.client.get(&url).timeout(Duration::from_secs(10));
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        match request.send().await {
            Ok(response) => {
                let latency_ms = start.elapsed().as_millis() as u64;
                if response.status().is_success() {
                    HealthCheckResult {
                        status: HealthStatus::Healthy,
                        latency_ms: Some(latency_ms),
                        error: None,
                    }
                } else {
                    HealthCheckResult {
                        status: HealthStatus::Unhealthy,
                        latency_ms: Some(latency_ms),
                        error: Some(format!("HTTP {}", response.status().as_u16())),
                    }
                }
            }
            Err(e) => HealthCheckResult {
                status: HealthStatus::Unreachable,
                latency_ms: None,
                error: Some(e.to_string()),
            },
        }
    }
}

#[async_trait]
impl ChatModel for LlmClient {
    fn model_id(&self) -> &str {
        &self.model
    }

    async fn complete_structured(&self, request: StructuredRequest) -> Result<CompletionResponse> {
        let messages = vec![
            Message::system(request.system_prompt),
            Message::user(request.user_prompt),
        ];
        self.complete(messages, request.schema, request.temperature)
            .await
    }
}

static CODE_FENCE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)^\s*```(?:json|JSON)?\s*(.*?)\s*```\s*$").expect("code fence pattern is valid")
});

/// Decode a structured model reply into `T`.
///
/// Tolerates a Markdown code fence around the JSON; anything that does not
/// decode into `T` is a schema violation.
pub fn parse_structured<T: DeserializeOwned>(content: &str) -> Result<T> {
    let json = CODE_FENCE
        .captures(content)
        .and_then(|c| c.get(1))
        .map_or(content.trim(), |m| m.as_str());

    serde_json::from_str(json).map_err(|e| ClaimCheckError::SchemaViolation(e.to_string()))
}

/// Health check result.
#[derive(Debug, Clone)]
pub struct HealthCheckResult {
    /// Health status
    pub status: HealthStatus,
    /// Latency in milliseconds (if reachable)
    pub latency_ms: Option<u64>,
    /// Error message (if unhealthy or unreachable)
    pub error: Option<String>,
}

/// Health status of an endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HealthStatus {
    /// Endpoint is responding normally
    Healthy,
    /// Endpoint is responding but with errors
    Unhealthy,
    /// Endpoint is not reachable
    Unreachable,
}

impl std::fmt::Display for HealthStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            HealthStatus::Healthy => write!(f, "healthy"),
            HealthStatus::Unhealthy => write!(f, "unhealthy"),
            HealthStatus::Unreachable => write!(f, "unreachable"),
        }
    }
}
