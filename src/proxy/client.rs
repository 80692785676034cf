// Upstream client module
// Sends one payload to the LLM API with the server-held credential

use hyper::header::{ACCEPT, CONTENT_TYPE};
use serde_json::Value;
use std::time::Duration;

use super::error::ProxyError;
use super::payload::{Mode, UpstreamPayload};
use crate::config::Config;

/// HTTP client for the upstream LLM API.
///
/// Built once at startup; the inner `reqwest::Client` pools connections.
pub struct UpstreamClient {
    http: reqwest::Client,
    chat_url: String,
    generate_url: String,
    api_key: String,
}

impl UpstreamClient {
    pub fn new(config: &Config) -> Result<Self, reqwest::Error> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.upstream.timeout_secs))
            .connect_timeout(Duration::from_secs(config.upstream.connect_timeout_secs))
            .build()?;

        Ok(Self {
            http,
            chat_url: config.upstream_url(Mode::Chat.endpoint()),
            generate_url: config.upstream_url(Mode::Generate.endpoint()),
            api_key: config.upstream.api_key.clone(),
        })
    }

    pub fn url(&self, mode: Mode) -> &str {
        match mode {
            Mode::Chat => &self.chat_url,
            Mode::Generate => &self.generate_url,
        }
    }

    /// POST `payload` to the endpoint for `mode` and decode the JSON reply.
    ///
    /// A non-2xx reply becomes [`ProxyError::Upstream`] carrying the raw body
    /// for the server log.
    pub async fn send(&self, mode: Mode, payload: &UpstreamPayload) -> Result<Value, ProxyError> {
        let response = self
            .http
            .post(self.url(mode))
            .header(CONTENT_TYPE, "application/json")
            .header(ACCEPT, "application/json")
            .bearer_auth(&self.api_key)
            .json(payload)
            .send()
            .await
            .map_err(ProxyError::Transport)?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|e| format!("<unreadable body: {e}>"));
            return Err(ProxyError::Upstream { status, body });
        }

        response.json().await.map_err(ProxyError::UpstreamBody)
    }
}
