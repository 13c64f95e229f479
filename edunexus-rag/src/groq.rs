//! Groq chat-completions client.
//!
//! Groq exposes an OpenAI-compatible `/chat/completions` endpoint. Each
//! prompt is sent as a single user message; the first choice's content is
//! returned. Transport errors, HTTP 429 and 5xx responses are retried up to
//! `max_retries` times with exponential backoff; every other failure is
//! returned immediately.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, warn};

use crate::error::{RagError, Result};
use crate::llm::{Completion, LanguageModel};

/// Groq's OpenAI-compatible API base.
pub const GROQ_API_BASE: &str = "https://api.groq.com/openai/v1";

/// Default chat model.
pub const DEFAULT_CHAT_MODEL: &str = "llama3-8b-8192";

const PROVIDER: &str = "Groq";

/// Configuration for [`GroqClient`].
#[derive(Debug, Clone, PartialEq)]
pub struct GroqConfig {
    /// API key (`gsk_...`).
    pub api_key: String,
    /// Chat model name.
    pub model: String,
    /// API base URL.
    pub base_url: String,
    /// Sampling temperature.
    pub temperature: f32,
    /// Maximum tokens in the completion.
    pub max_tokens: u32,
    /// Per-request timeout.
    pub request_timeout: Duration,
    /// Additional attempts after a transient failure.
    pub max_retries: u32,
    /// Delay before the first retry; doubled on every further attempt.
    pub retry_backoff: Duration,
}

impl GroqConfig {
    /// Defaults used by the assistant: temperature 0.5, 1024 tokens,
    /// 30 second timeout, 3 retries.
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            model: DEFAULT_CHAT_MODEL.to_string(),
            base_url: GROQ_API_BASE.to_string(),
            temperature: 0.5,
            max_tokens: 1024,
            request_timeout: Duration::from_secs(30),
            max_retries: 3,
            retry_backoff: Duration::from_millis(500),
        }
    }

    /// Set the chat model.
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Set the API base URL.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Set the sampling temperature.
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    /// Set the completion token limit.
    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    /// Set the per-request timeout.
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Set how many times a transient failure is retried.
    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    /// Set the initial retry delay.
    pub fn with_retry_backoff(mut self, backoff: Duration) -> Self {
        self.retry_backoff = backoff;
        self
    }

    fn endpoint(&self) -> String {
        format!("{}/chat/completions", self.base_url.trim_end_matches('/'))
    }
}

/// A [`LanguageModel`] backed by Groq.
///
/// # Example
///
/// ```rust,ignore
/// use edunexus_rag::groq::{GroqClient, GroqConfig};
///
/// let model = GroqClient::new(GroqConfig::new(api_key))?;
/// let completion = model.invoke("Why is the sky blue?").await?;
/// ```
pub struct GroqClient {
    client: reqwest::Client,
    config: GroqConfig,
}

impl GroqClient {
    /// Create a new client.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::GenerationError`] if the HTTP client cannot be built.
    pub fn new(config: GroqConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| RagError::GenerationError {
                provider: PROVIDER.into(),
                message: format!("failed to build HTTP client: {e}"),
                transient: false,
            })?;
        Ok(Self { client, config })
    }

    /// The client configuration.
    pub fn config(&self) -> &GroqConfig {
        &self.config
    }

    async fn send_once(&self, body: &ChatRequest<'_>) -> Result<Completion> {
        let response = self
            .client
            .post(self.config.endpoint())
            .bearer_auth(&self.config.api_key)
            .json(body)
            .send()
            .await
            .map_err(|e| RagError::GenerationError {
                provider: PROVIDER.into(),
                message: format!("request failed: {e}"),
                transient: true,
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let detail = serde_json::from_str::<ErrorResponse>(&body)
                .map(|e| e.error.message)
                .unwrap_or(body);
            return Err(RagError::GenerationError {
                provider: PROVIDER.into(),
                message: format!("API returned {status}: {detail}"),
                transient: is_retryable(status),
            });
        }

        let chat: ChatResponse = response.json().await.map_err(|e| RagError::GenerationError {
            provider: PROVIDER.into(),
            message: format!("failed to parse response: {e}"),
            transient: false,
        })?;

        chat.choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .map(|content| Completion { content })
            .ok_or_else(|| RagError::GenerationError {
                provider: PROVIDER.into(),
                message: "response contained no message content".into(),
                transient: false,
            })
    }
}

fn is_retryable(status: StatusCode) -> bool {
    status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error()
}

/// Delay before retry number `attempt` (0-based).
fn backoff_delay(base: Duration, attempt: u32) -> Duration {
    base.saturating_mul(2u32.saturating_pow(attempt))
}

// ── Chat completions request/response types ────────────────────────

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
    max_tokens: u32,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Deserialize)]
struct ChatChoiceMessage {
    content: Option<String>,
}

#[derive(Deserialize)]
struct ErrorResponse {
    error: ErrorDetail,
}

#[derive(Deserialize)]
struct ErrorDetail {
    message: String,
}

#[async_trait]
impl LanguageModel for GroqClient {
    fn name(&self) -> &str {
        &self.config.model
    }

    async fn invoke(&self, prompt: &str) -> Result<Completion> {
        let body = ChatRequest {
            model: &self.config.model,
            messages: vec![ChatMessage { role: "user", content: prompt }],
            temperature: self.config.temperature,
            max_tokens: self.config.max_tokens,
        };

        let mut attempt = 0;
        loop {
            debug!(provider = PROVIDER, model = %self.config.model, attempt, prompt_len = prompt.len(), "sending chat completion");
            match self.send_once(&body).await {
                Ok(completion) => return Ok(completion),
                Err(e) if e.is_transient() && attempt < self.config.max_retries => {
                    let delay = backoff_delay(self.config.retry_backoff, attempt);
                    warn!(provider = PROVIDER, attempt, delay_ms = delay.as_millis() as u64, error = %e, "retrying chat completion");
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(e) => {
                    error!(provider = PROVIDER, attempt, error = %e, "chat completion failed");
                    return Err(e);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::{TcpListener, TcpStream};

    use super::*;

    /// Answer every request with the same canned response. Returns the base
    /// URL and a count of accepted connections.
    async fn serve(status: &'static str, body: &'static str) -> (String, Arc<AtomicUsize>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let hits = Arc::new(AtomicUsize::new(0));
        let counter = hits.clone();
        tokio::spawn(async move {
            while let Ok((mut socket, _)) = listener.accept().await {
                counter.fetch_add(1, Ordering::SeqCst);
                tokio::spawn(async move {
                    read_request(&mut socket).await;
                    let response = format!(
                        "HTTP/1.1 {status}\r\ncontent-type: application/json\r\n\
                         content-length: {}\r\nconnection: close\r\n\r\n{body}",
                        body.len()
                    );
                    let _ = socket.write_all(response.as_bytes()).await;
                    let _ = socket.shutdown().await;
                });
            }
        });
        (format!("http://{addr}"), hits)
    }

    async fn read_request(socket: &mut TcpStream) {
        let mut buf = Vec::new();
        let mut chunk = [0u8; 1024];
        loop {
            let n = socket.read(&mut chunk).await.unwrap_or(0);
            if n == 0 {
                return;
            }
            buf.extend_from_slice(&chunk[..n]);
            if let Some(end) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
                let head = String::from_utf8_lossy(&buf[..end]).to_ascii_lowercase();
                let length = head
                    .lines()
                    .find_map(|line| line.strip_prefix("content-length:"))
                    .and_then(|v| v.trim().parse::<usize>().ok())
                    .unwrap_or(0);
                if buf.len() >= end + 4 + length {
                    return;
                }
            }
        }
    }

    fn client(base_url: String, max_retries: u32) -> GroqClient {
        GroqClient::new(
            GroqConfig::new("gsk_test")
                .with_base_url(base_url)
                .with_max_retries(max_retries)
                .with_retry_backoff(Duration::ZERO),
        )
        .unwrap()
    }

    #[tokio::test]
    async fn server_errors_are_retried_up_to_the_limit() {
        let (url, hits) =
            serve("503 Service Unavailable", r#"{"error":{"message":"over capacity"}}"#).await;

        let err = client(url, 2).invoke("What is an atom?").await.unwrap_err();

        assert!(err.is_transient());
        assert!(err.to_string().contains("over capacity"), "{err}");
        assert_eq!(hits.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn rejected_key_is_not_retried() {
        let (url, hits) =
            serve("401 Unauthorized", r#"{"error":{"message":"Invalid API Key"}}"#).await;

        let err = client(url, 3).invoke("What is an atom?").await.unwrap_err();

        assert!(!err.is_transient());
        assert!(err.to_string().contains("Invalid API Key"), "{err}");
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn successful_reply_is_returned() {
        let (url, hits) = serve(
            "200 OK",
            r#"{"choices":[{"index":0,"message":{"role":"assistant","content":"Atoms are tiny."}}]}"#,
        )
        .await;

        let completion = client(url, 3).invoke("What is an atom?").await.unwrap();

        assert_eq!(completion.content, "Atoms are tiny.");
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn defaults_match_assistant_settings() {
        let config = GroqConfig::new("gsk_test");
        assert_eq!(config.model, "llama3-8b-8192");
        assert_eq!(config.temperature, 0.5);
        assert_eq!(config.max_tokens, 1024);
        assert_eq!(config.request_timeout, Duration::from_secs(30));
        assert_eq!(config.max_retries, 3);
        assert_eq!(config.endpoint(), "https://api.groq.com/openai/v1/chat/completions");
    }

    #[test]
    fn only_rate_limits_and_server_errors_are_retried() {
        assert!(is_retryable(StatusCode::TOO_MANY_REQUESTS));
        assert!(is_retryable(StatusCode::BAD_GATEWAY));
        assert!(!is_retryable(StatusCode::UNAUTHORIZED));
        assert!(!is_retryable(StatusCode::BAD_REQUEST));
    }

    #[test]
    fn backoff_doubles() {
        let base = Duration::from_millis(100);
        assert_eq!(backoff_delay(base, 0), Duration::from_millis(100));
        assert_eq!(backoff_delay(base, 1), Duration::from_millis(200));
        assert_eq!(backoff_delay(base, 3), Duration::from_millis(800));
    }

    #[test]
    fn request_body_is_openai_compatible() {
        let body = ChatRequest {
            model: "llama3-8b-8192",
            messages: vec![ChatMessage { role: "user", content: "hi" }],
            temperature: 0.5,
            max_tokens: 1024,
        };
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["messages"][0]["role"], "user");
        assert_eq!(json["messages"][0]["content"], "hi");
        assert_eq!(json["max_tokens"], 1024);
    }

    #[test]
    fn response_content_is_extracted() {
        let raw = r#"{"choices":[{"index":0,"message":{"role":"assistant","content":"Paris."}}]}"#;
        let parsed: ChatResponse = serde_json::from_str(raw).unwrap();
        assert_eq!(parsed.choices[0].message.content.as_deref(), Some("Paris."));
    }
}
