//! Natural-language tree generation.
//!
//! Free text that is not a built-in command is handed to a [`TreeGenerator`]
//! together with the current tree.  The generator answers with a JSON object
//! whose `structure` field holds a tree in the import vocabulary of
//! [`crate::codec`], or with nothing at all (a no-op).
//!
//! [`LlmTreeGenerator`] talks to any OpenAI-compatible `/v1/chat/completions`
//! endpoint, such as [Ollama](https://ollama.com) on `http://localhost:11434`.
//! [`NullGenerator`] never produces a tree and is the default when no model
//! is configured.
//!
//! # Example
//!
//! ```rust,no_run
//! use tabby_runtime::generator::{LlmTreeGenerator, TreeGenerator};
//!
//! # async fn demo() -> Result<(), tabby_runtime::generator::GeneratorError> {
//! let generator = LlmTreeGenerator::new("http://localhost:11434", "llama3");
//! let current = serde_json::json!({"name": "Sequence", "type": "Sequence"});
//! // Requires a running model server.
//! let reply = generator.generate("nap whenever tired", &current).await?;
//! # Ok(())
//! # }
//! ```

use std::time::Duration;

use async_trait::async_trait;
use schemars::{JsonSchema, schema_for};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tabby_types::NodeRecord;
use thiserror::Error;
use tracing::{debug, info, warn};

/// `CustomAction` names the model may use.
pub const ALLOWED_CUSTOM_ACTIONS: &[&str] = &[
    "AgentPatrol",
    "AgentDestination",
    "Eat",
    "Sleep",
    "Play",
    "Talk",
    "Work",
    "SelectAction",
];

/// `CustomCondition` names the model may use.
pub const ALLOWED_CUSTOM_CONDITIONS: &[&str] =
    &["IsTired", "IsHungry", "IsBored", "IsLonely", "HaveNextAction"];

// ─────────────────────────────────────────────────────────────────────────────
// Error type
// ─────────────────────────────────────────────────────────────────────────────

/// Errors that can arise while generating a tree.
#[derive(Error, Debug)]
pub enum GeneratorError {
    /// The HTTP request to the model server failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    /// The reply could not be understood as a tree.
    #[error("Unexpected response format: {0}")]
    BadResponse(String),
}

// ─────────────────────────────────────────────────────────────────────────────
// Port
// ─────────────────────────────────────────────────────────────────────────────

/// Turns an instruction plus the current tree into a replacement tree.
#[async_trait]
pub trait TreeGenerator: Send + Sync {
    /// Returns `Ok(Some(v))` with `v["structure"]` holding the new tree, or
    /// `Ok(None)` when there is nothing to apply.
    async fn generate(
        &self,
        instruction: &str,
        current_tree: &Value,
    ) -> Result<Option<Value>, GeneratorError>;
}

/// A generator that never produces anything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullGenerator;

#[async_trait]
impl TreeGenerator for NullGenerator {
    async fn generate(
        &self,
        instruction: &str,
        _current_tree: &Value,
    ) -> Result<Option<Value>, GeneratorError> {
        debug!(instruction, "no tree generator configured");
        Ok(None)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Message types (OpenAI-compatible)
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

/// Shape the model is asked to produce.
#[derive(Debug, Deserialize, JsonSchema)]
pub struct GeneratedTree {
    /// The full behavior tree, optionally wrapped in a `Root` node.
    pub structure: NodeRecord,
}

#[derive(Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    kind: &'static str,
    json_schema: Value,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    stream: bool,
    response_format: ResponseFormat,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ChatMessage,
}

// ─────────────────────────────────────────────────────────────────────────────
// LlmTreeGenerator
// ─────────────────────────────────────────────────────────────────────────────

/// An async client for an OpenAI-compatible chat-completions endpoint.
pub struct LlmTreeGenerator {
    base_url: String,
    model: String,
    api_key: Option<String>,
    client: reqwest::Client,
}

impl LlmTreeGenerator {
    pub const DEFAULT_URL: &'static str = "http://localhost:11434";
    pub const DEFAULT_MODEL: &'static str = "llama3";
    /// Upper bound on one chat-completions round trip.
    pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

    /// Create a generator pointing at `base_url` and using `model`.
    pub fn new(base_url: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            model: model.into(),
            api_key: None,
            client: Self::client_with_timeout(Self::DEFAULT_TIMEOUT),
        }
    }

    /// Give up on a request after `timeout`; the failure surfaces as
    /// [`GeneratorError::Http`].
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.client = Self::client_with_timeout(timeout);
        self
    }

    fn client_with_timeout(timeout: Duration) -> reqwest::Client {
        reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .unwrap_or_else(|e| {
                warn!(error = %e, "HTTP client builder failed; requests have no timeout");
                reqwest::Client::new()
            })
    }

    /// Send `key` as a bearer token on every request.
    pub fn with_api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// The prompt for `instruction` against `current_tree`.
    pub fn build_messages(instruction: &str, current_tree: &Value) -> Vec<ChatMessage> {
        let system = format!(
            "You rewrite behavior trees for a small ASCII cat.\n\
             Reply with a single JSON object of the form {{\"structure\": <tree>}}.\n\
             Every node is {{\"name\", \"type\", \"children\"?, \"params\"?}}.\n\
             Allowed types: Root, Sequence, Selector, WaitTime, CustomAction, CustomCondition.\n\
             Only use these CustomAction names: {}.\n\
             Only use these CustomCondition names: {}.",
            ALLOWED_CUSTOM_ACTIONS.join(", "),
            ALLOWED_CUSTOM_CONDITIONS.join(", "),
        );
        let user = format!(
            "Based on this instruction, modify the behavior tree: {instruction}\n\
             Previous behavior tree JSON: {current_tree}"
        );
        vec![
            ChatMessage {
                role: Role::System,
                content: system,
            },
            ChatMessage {
                role: Role::User,
                content: user,
            },
        ]
    }

    /// Send `messages` and return the assistant's reply text.
    ///
    /// # Errors
    ///
    /// [`GeneratorError::Http`] if the request fails, or
    /// [`GeneratorError::BadResponse`] if the reply has no choices.
    pub async fn complete(&self, messages: &[ChatMessage]) -> Result<String, GeneratorError> {
        let url = format!("{}/v1/chat/completions", self.base_url);
        let schema = serde_json::to_value(schema_for!(GeneratedTree))
            .map_err(|e| GeneratorError::BadResponse(e.to_string()))?;
        let body = ChatRequest {
            model: &self.model,
            messages,
            stream: false,
            response_format: ResponseFormat {
                kind: "json_schema",
                json_schema: json!({ "name": "behavior_tree", "schema": schema }),
            },
        };

        let mut request = self.client.post(&url).json(&body);
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }
        let response: ChatResponse = request
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        response
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .ok_or_else(|| GeneratorError::BadResponse("empty choices array".into()))
    }
}

#[async_trait]
impl TreeGenerator for LlmTreeGenerator {
    async fn generate(
        &self,
        instruction: &str,
        current_tree: &Value,
    ) -> Result<Option<Value>, GeneratorError> {
        info!(model = %self.model, instruction, "requesting generated tree");
        let messages = Self::build_messages(instruction, current_tree);
        let reply = self.complete(&messages).await?;
        debug!(chars = reply.len(), "model replied");
        parse_reply(&reply)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Reply parsing
// ─────────────────────────────────────────────────────────────────────────────

/// Interpret model output.
///
/// Accepts `{"structure": ...}`, a bare tree object (which is wrapped), either
/// of them inside a fenced code block, or an empty reply (`None`).
pub fn parse_reply(reply: &str) -> Result<Option<Value>, GeneratorError> {
    let body = strip_code_fence(reply.trim());
    if body.is_empty() {
        return Ok(None);
    }
    let value: Value = serde_json::from_str(body)
        .map_err(|e| GeneratorError::BadResponse(format!("reply is not JSON: {e}")))?;

    if value.is_null() {
        return Ok(None);
    }
    match value.get("structure").map(|s| !s.is_null()) {
        Some(true) => Ok(Some(value)),
        Some(false) => Ok(None),
        None if value.get("type").is_some() => Ok(Some(json!({ "structure": value }))),
        None => Err(GeneratorError::BadResponse(format!(
            "expected a tree object, got: {value}"
        ))),
    }
}

fn strip_code_fence(text: &str) -> &str {
    let Some(start) = text.find("```") else {
        return text;
    };
    let after = &text[start + 3..];
    // Skip the language tag line, if any.
    let after = match after.find('\n') {
        Some(nl) if !after[..nl].trim_start().starts_with('{') => &after[nl + 1..],
        _ => after,
    };
    match after.find("```") {
        Some(end) => after[..end].trim(),
        None => after.trim(),
    }
}
