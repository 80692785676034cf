// Application state module
// Immutable per-process state shared by every request

use super::types::Config;
use crate::proxy::UpstreamClient;

/// Application state
pub struct AppState {
    pub config: Config,
    pub upstream: UpstreamClient,
}

impl AppState {
    /// Build state from the loaded configuration.
    /// Fails only if the HTTP client cannot be constructed.
    pub fn new(config: Config) -> Result<Self, reqwest::Error> {
        let upstream = UpstreamClient::new(&config)?;
        Ok(Self { config, upstream })
    }
}
