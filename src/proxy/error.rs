// Proxy error module
// One error type for every way a chat request can fail, with the status and
// client-facing message each maps to

use hyper::StatusCode;
use thiserror::Error;

pub const MSG_PROMPT_REQUIRED: &str = "Prompt is required";
pub const MSG_UPSTREAM_ERROR: &str = "Error from API";
pub const MSG_INTERNAL_ERROR: &str = "Internal server error";
pub const MSG_PAYLOAD_TOO_LARGE: &str = "Payload too large";

#[derive(Debug, Error)]
pub enum ProxyError {
    #[error("prompt is missing or empty")]
    MissingPrompt,

    #[error("request body exceeds {limit} bytes")]
    BodyTooLarge { limit: u64 },

    #[error("failed to read request body: {0}")]
    RequestBody(String),

    #[error("request body is not valid JSON: {0}")]
    InvalidJson(#[from] serde_json::Error),

    #[error("upstream request failed: {0}")]
    Transport(#[source] reqwest::Error),

    #[error("upstream returned {status}: {body}")]
    Upstream { status: StatusCode, body: String },

    #[error("upstream response could not be decoded: {0}")]
    UpstreamBody(#[source] reqwest::Error),
}

impl ProxyError {
    /// Status code sent to the browser
    pub const fn status(&self) -> StatusCode {
        match self {
            Self::MissingPrompt => StatusCode::BAD_REQUEST,
            Self::BodyTooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
            Self::Upstream { status, .. } => *status,
            Self::RequestBody(_)
            | Self::InvalidJson(_)
            | Self::Transport(_)
            | Self::UpstreamBody(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Message sent to the browser. Upstream detail never appears here.
    pub const fn client_message(&self) -> &'static str {
        match self {
            Self::MissingPrompt => MSG_PROMPT_REQUIRED,
            Self::BodyTooLarge { .. } => MSG_PAYLOAD_TOO_LARGE,
            Self::Upstream { .. } => MSG_UPSTREAM_ERROR,
            Self::RequestBody(_)
            | Self::InvalidJson(_)
            | Self::Transport(_)
            | Self::UpstreamBody(_) => MSG_INTERNAL_ERROR,
        }
    }
}
