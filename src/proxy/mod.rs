//! Chat proxy module
//!
//! Translates browser chat requests into upstream LLM API calls and
//! normalizes the reply. HTTP plumbing lives in `handler::chat`.

mod client;
mod error;
mod payload;

pub use client::UpstreamClient;
pub use error::ProxyError;
pub use payload::{ChatRequest, ChatResponse};

#[cfg(test)]
pub use payload::{GENERATE_PREFIX, SYSTEM_PREAMBLE};
