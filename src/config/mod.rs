// Configuration module entry point
// Loads the immutable startup configuration and builds the shared app state

mod state;
mod types;

use std::collections::HashMap;
use std::net::SocketAddr;

pub use state::AppState;
pub use types::{Config, HttpConfig, StaticConfig};

use types::{
    DEFAULT_ENTRY_DOCUMENT, DEFAULT_FALLBACK_EXTENSIONS, DEFAULT_HOST, DEFAULT_MAX_BODY_SIZE,
    DEFAULT_PORT, DEFAULT_UPSTREAM_BASE_URL,
};

/// Environment variable naming the config file (without extension)
pub const CONFIG_PATH_ENV: &str = "CASCADE_CONFIG";
/// Listening port, as set by most hosting platforms
pub const PORT_ENV: &str = "PORT";
/// Upstream API credential
pub const API_KEY_ENV: &str = "COHERE_API_KEY";

impl Config {
    /// Load configuration from the process environment.
    /// The config file defaults to "config.toml" unless `CASCADE_CONFIG` names another.
    pub fn load() -> Result<Self, config::ConfigError> {
        let env: HashMap<String, String> = std::env::vars().collect();
        let path = env
            .get(CONFIG_PATH_ENV)
            .cloned()
            .unwrap_or_else(|| "config".to_string());
        Self::load_with_env(&path, &env)
    }

    /// Load configuration from a file path (without extension) and an explicit environment map
    pub fn load_with_env(
        config_path: &str,
        env: &HashMap<String, String>,
    ) -> Result<Self, config::ConfigError> {
        let settings = config::Config::builder()
            .add_source(config::File::with_name(config_path).required(false))
            .add_source(
                config::Environment::with_prefix("CASCADE")
                    .prefix_separator("_")
                    .separator("__")
                    .source(Some(env.clone().into_iter().collect())),
            )
            .set_default("server.host", DEFAULT_HOST)?
            .set_default("server.port", i64::from(DEFAULT_PORT))?
            .set_default("static.root", ".")?
            .set_default("static.entry_document", DEFAULT_ENTRY_DOCUMENT)?
            .set_default("static.index_files", vec!["index.html", "index.htm"])?
            .set_default("static.fallback_extensions", DEFAULT_FALLBACK_EXTENSIONS.to_vec())?
            .set_default("upstream.base_url", DEFAULT_UPSTREAM_BASE_URL)?
            .set_default("upstream.api_key", "")?
            .set_default("upstream.timeout_secs", 30)?
            .set_default("upstream.connect_timeout_secs", 10)?
            .set_default("logging.level", "info")?
            .set_default("logging.access_log", true)?
            .set_default("logging.access_log_format", "simple")?
            .set_default("performance.keep_alive", true)?
            .set_default("performance.read_timeout", 60)?
            .set_default("performance.write_timeout", 60)?
            .set_default("performance.shutdown_timeout", 10)?
            .set_default("http.server_name", "cascade-server")?
            .set_default("http.enable_cors", true)?
            .set_default("http.max_body_size", i64::try_from(DEFAULT_MAX_BODY_SIZE).unwrap_or(i64::MAX))?
            .set_override_option("server.port", env.get(PORT_ENV).cloned())?
            .set_override_option("upstream.api_key", env.get(API_KEY_ENV).cloned())?
            .build()?;

        settings.try_deserialize()
    }

    pub fn get_socket_addr(&self) -> Result<SocketAddr, String> {
        format!("{}:{}", self.server.host, self.server.port)
            .parse()
            .map_err(|e| format!("Invalid address: {e}"))
    }

    /// Upstream endpoint URL for a path segment such as `chat`
    pub fn upstream_url(&self, endpoint: &str) -> String {
        format!("{}/{endpoint}", self.upstream.base_url.trim_end_matches('/'))
    }
}
