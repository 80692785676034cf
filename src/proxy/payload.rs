//! Request and payload types for the chat proxy
//!
//! A browser [`ChatRequest`] selects a [`Mode`], which decides the upstream
//! endpoint, the payload shape sent there and how the reply text is pulled
//! out of the upstream response.

use serde::{Deserialize, Serialize};
use serde_json::Value;

pub const CHAT_MODEL: &str = "command-a-03-2025";
pub const GENERATE_MODEL: &str = "command";

/// Prepended to every chat prompt, separated by a blank line
pub const SYSTEM_PREAMBLE: &str = "You are Cascade, a helpful AI coding assistant. \
Respond to the following in a helpful, concise manner:";
pub const GENERATE_PREFIX: &str = "Generate content about: ";

pub const NO_CONTENT_GENERATED: &str = "No content generated";
pub const NO_RESPONSE_FROM_AI: &str = "No response from AI";

/// JSON body accepted on `POST /api/chat`
#[derive(Debug, Default, Deserialize)]
pub struct ChatRequest {
    #[serde(default)]
    pub prompt: Option<Value>,
    #[serde(rename = "isGenerate", default)]
    pub is_generate: Option<bool>,
}

impl ChatRequest {
    /// The prompt, if it is a non-empty string
    pub fn prompt(&self) -> Option<&str> {
        match &self.prompt {
            Some(Value::String(s)) if !s.is_empty() => Some(s),
            _ => None,
        }
    }

    pub fn mode(&self) -> Mode {
        Mode::from_flag(self.is_generate.unwrap_or(false))
    }
}

/// JSON body returned to the browser on success
#[derive(Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct ChatResponse {
    pub response: String,
}

/// Which upstream endpoint a request goes to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Chat,
    Generate,
}

impl Mode {
    pub const fn from_flag(is_generate: bool) -> Self {
        if is_generate {
            Self::Generate
        } else {
            Self::Chat
        }
    }

    /// Path segment appended to the upstream base URL
    pub const fn endpoint(self) -> &'static str {
        match self {
            Self::Chat => "chat",
            Self::Generate => "generate",
        }
    }

    /// Text returned when the upstream reply has nothing usable
    pub const fn fallback(self) -> &'static str {
        match self {
            Self::Chat => NO_RESPONSE_FROM_AI,
            Self::Generate => NO_CONTENT_GENERATED,
        }
    }

    pub fn payload(self, prompt: &str) -> UpstreamPayload {
        match self {
            Self::Chat => UpstreamPayload::Chat(ChatPayload {
                model: CHAT_MODEL,
                message: format!("{SYSTEM_PREAMBLE}\n\n{prompt}"),
                sampling: Sampling::with_max_tokens(500),
            }),
            Self::Generate => UpstreamPayload::Generate(GeneratePayload {
                model: GENERATE_MODEL,
                prompt: format!("{GENERATE_PREFIX}{prompt}"),
                sampling: Sampling::with_max_tokens(1000),
            }),
        }
    }

    /// Pull the reply text out of a successful upstream body.
    ///
    /// Generate reads `generations[0].text`; chat reads `text`, then `message`.
    /// Missing, empty or non-string fields fall through to [`Mode::fallback`].
    pub fn extract_response(self, body: &Value) -> String {
        let found = match self {
            Self::Chat => non_empty_str(body.get("text"))
                .or_else(|| non_empty_str(body.get("message"))),
            Self::Generate => non_empty_str(
                body.get("generations")
                    .and_then(|g| g.get(0))
                    .and_then(|g| g.get("text")),
            ),
        };
        found.unwrap_or_else(|| self.fallback()).to_string()
    }
}

fn non_empty_str(value: Option<&Value>) -> Option<&str> {
    value.and_then(Value::as_str).filter(|s| !s.is_empty())
}

/// Body sent upstream, serialized without a tag
#[derive(Debug, Serialize, PartialEq)]
#[serde(untagged)]
pub enum UpstreamPayload {
    Chat(ChatPayload),
    Generate(GeneratePayload),
}

#[derive(Debug, Serialize, PartialEq)]
pub struct ChatPayload {
    pub model: &'static str,
    pub message: String,
    #[serde(flatten)]
    pub sampling: Sampling,
}

#[derive(Debug, Serialize, PartialEq)]
pub struct GeneratePayload {
    pub model: &'static str,
    pub prompt: String,
    #[serde(flatten)]
    pub sampling: Sampling,
}

/// Sampling parameters shared by both payload shapes
#[derive(Debug, Serialize, PartialEq)]
pub struct Sampling {
    pub max_tokens: u32,
    pub temperature: f64,
    pub k: u32,
    pub p: f64,
    pub frequency_penalty: f64,
    pub presence_penalty: f64,
    pub stop_sequences: Vec<String>,
}

impl Sampling {
    const fn with_max_tokens(max_tokens: u32) -> Self {
        Self {
            max_tokens,
            temperature: 0.7,
            k: 0,
            p: 1.0,
            frequency_penalty: 0.0,
            presence_penalty: 0.0,
            stop_sequences: Vec::new(),
        }
    }
}
