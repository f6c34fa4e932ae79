use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::CompletionError;
use crate::config;

// ═══════════════════════════════════════════════════════════
// Request types
// ═══════════════════════════════════════════════════════════

/// One message of a chat-style completion request.
#[derive(Debug, Clone, Serialize)]
pub struct ChatMessage {
    pub role: &'static str,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system",
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user",
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: "assistant",
            content: content.into(),
        }
    }
}

/// A chat-style completion request.
#[derive(Debug, Clone)]
pub struct CompletionRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
    pub temperature: f32,
    /// Ask the endpoint to force a JSON object response.
    pub json_mode: bool,
}

impl CompletionRequest {
    pub fn new(model: impl Into<String>, messages: Vec<ChatMessage>) -> Self {
        Self {
            model: model.into(),
            messages,
            temperature: config::TEMPERATURE,
            json_mode: false,
        }
    }

    pub fn with_json_mode(mut self) -> Self {
        self.json_mode = true;
        self
    }
}

// ═══════════════════════════════════════════════════════════
// Trait
// ═══════════════════════════════════════════════════════════

/// Trait for chat-style completion within the reasoning engine.
pub trait CompletionClient {
    /// Issue one completion call and return the raw content string.
    fn complete(&self, request: &CompletionRequest) -> Result<String, CompletionError>;

    /// List models available on the endpoint.
    fn list_models(&self) -> Result<Vec<String>, CompletionError>;

    /// Lightweight availability probe with a short timeout.
    /// A timeout counts as a failed probe, not a fatal error.
    fn probe(&self) -> Result<(), CompletionError> {
        self.list_models().map(|_| ())
    }

    /// Resolve the model to run with: the configured model when the
    /// endpoint serves it, otherwise the first available preferred model.
    fn resolve_model(&self, configured: &str) -> Result<String, CompletionError> {
        let available = self.list_models()?;
        if available.iter().any(|m| m.starts_with(configured)) {
            return Ok(configured.to_string());
        }
        for preferred in config::PREFERRED_MODELS {
            if available.iter().any(|m| m.starts_with(preferred)) {
                return Ok(preferred.to_string());
            }
        }
        Err(CompletionError::NoModelAvailable)
    }
}

// ═══════════════════════════════════════════════════════════
// Wire types (OpenAI-compatible chat-completion convention)
// ═══════════════════════════════════════════════════════════

#[derive(Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    kind: &'static str,
}

#[derive(Serialize)]
struct WireRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    temperature: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_format: Option<ResponseFormat>,
}

#[derive(Deserialize)]
struct WireResponse {
    choices: Vec<WireChoice>,
}

#[derive(Deserialize)]
struct WireChoice {
    message: WireMessage,
}

#[derive(Deserialize)]
struct WireMessage {
    content: String,
}

#[derive(Deserialize)]
struct ModelsResponse {
    data: Vec<ModelEntry>,
}

#[derive(Deserialize)]
struct ModelEntry {
    id: String,
}

// ═══════════════════════════════════════════════════════════
// HTTP client
// ═══════════════════════════════════════════════════════════

/// HTTP client for an OpenAI-compatible chat-completion endpoint
/// (a local Ollama instance serves this convention under /v1).
pub struct HttpCompletionClient {
    base_url: String,
    client: reqwest::blocking::Client,
    timeout_secs: u64,
}

impl HttpCompletionClient {
    /// Create a client pointing at an explicit endpoint.
    pub fn new(base_url: &str, timeout_secs: u64) -> Result<Self, CompletionError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| CompletionError::ResponseParsing(e.to_string()))?;

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
            timeout_secs,
        })
    }

    /// Default local endpoint with the standard request timeout.
    pub fn default_local() -> Result<Self, CompletionError> {
        Self::new(config::DEFAULT_LLM_URL, config::REQUEST_TIMEOUT_SECS)
    }

    /// Construct from MENTARA_LLM_URL / MENTARA_LLM_TIMEOUT_SECS,
    /// falling back to the local defaults.
    pub fn from_env() -> Result<Self, CompletionError> {
        let base_url = std::env::var("MENTARA_LLM_URL")
            .unwrap_or_else(|_| config::DEFAULT_LLM_URL.to_string());
        let timeout = std::env::var("MENTARA_LLM_TIMEOUT_SECS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(config::REQUEST_TIMEOUT_SECS);
        Self::new(&base_url, timeout)
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn map_send_error(&self, e: reqwest::Error) -> CompletionError {
        if e.is_connect() {
            CompletionError::Connection(self.base_url.clone())
        } else if e.is_timeout() {
            CompletionError::Timeout(self.timeout_secs)
        } else {
            CompletionError::ResponseParsing(e.to_string())
        }
    }
}

impl CompletionClient for HttpCompletionClient {
    fn complete(&self, request: &CompletionRequest) -> Result<String, CompletionError> {
        let url = format!("{}/chat/completions", self.base_url);
        let body = WireRequest {
            model: &request.model,
            messages: &request.messages,
            temperature: request.temperature,
            response_format: request
                .json_mode
                .then_some(ResponseFormat { kind: "json_object" }),
        };

        let response = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .map_err(|e| self.map_send_error(e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(CompletionError::Endpoint {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: WireResponse = response
            .json()
            .map_err(|e| CompletionError::ResponseParsing(e.to_string()))?;

        parsed
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .ok_or(CompletionError::EmptyResponse)
    }

    fn list_models(&self) -> Result<Vec<String>, CompletionError> {
        let url = format!("{}/models", self.base_url);

        let response = self
            .client
            .get(&url)
            .timeout(Duration::from_secs(config::PROBE_TIMEOUT_SECS))
            .send()
            .map_err(|e| {
                if e.is_timeout() {
                    CompletionError::Timeout(config::PROBE_TIMEOUT_SECS)
                } else {
                    self.map_send_error(e)
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(CompletionError::Endpoint {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: ModelsResponse = response
            .json()
            .map_err(|e| CompletionError::ResponseParsing(e.to_string()))?;

        Ok(parsed.data.into_iter().map(|m| m.id).collect())
    }
}

// ═══════════════════════════════════════════════════════════
// Mock client
// ═══════════════════════════════════════════════════════════

/// Mock completion client for tests. Serves scripted results in
/// order and counts the calls it receives.
pub struct MockCompletionClient {
    script: Mutex<VecDeque<Result<String, CompletionError>>>,
    calls: AtomicUsize,
    available_models: Vec<String>,
    probe_ok: bool,
}

impl MockCompletionClient {
    /// Client that answers each call with the next scripted response.
    pub fn new(responses: Vec<&str>) -> Self {
        Self {
            script: Mutex::new(responses.into_iter().map(|r| Ok(r.to_string())).collect()),
            calls: AtomicUsize::new(0),
            available_models: vec!["medgemma:4b".to_string()],
            probe_ok: true,
        }
    }

    /// Client whose every call fails with a connection error.
    pub fn failing() -> Self {
        Self {
            script: Mutex::new(VecDeque::new()),
            calls: AtomicUsize::new(0),
            available_models: vec![],
            probe_ok: false,
        }
    }

    /// Script an explicit per-call result sequence.
    pub fn scripted(script: Vec<Result<String, CompletionError>>) -> Self {
        Self {
            script: Mutex::new(script.into()),
            calls: AtomicUsize::new(0),
            available_models: vec!["medgemma:4b".to_string()],
            probe_ok: true,
        }
    }

    /// Keep completions scripted but make the probe fail.
    pub fn with_probe_failure(mut self) -> Self {
        self.probe_ok = false;
        self
    }

    pub fn with_models(mut self, models: Vec<String>) -> Self {
        self.available_models = models;
        self
    }

    /// How many completion calls were issued.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl CompletionClient for MockCompletionClient {
    fn complete(&self, _request: &CompletionRequest) -> Result<String, CompletionError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let mut script = self.script.lock().unwrap();
        script
            .pop_front()
            .unwrap_or(Err(CompletionError::Connection("mock".into())))
    }

    fn list_models(&self) -> Result<Vec<String>, CompletionError> {
        if self.probe_ok {
            Ok(self.available_models.clone())
        } else {
            Err(CompletionError::Connection("mock".into()))
        }
    }
}

// ═══════════════════════════════════════════════════════════
// Tests
// ═══════════════════════════════════════════════════════════
