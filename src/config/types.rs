// Configuration types module
// Defines all configuration-related data structures

use serde::{Deserialize, Serialize};
use std::fmt;

pub const DEFAULT_HOST: &str = "0.0.0.0";
pub const DEFAULT_PORT: u16 = 10000;
pub const DEFAULT_UPSTREAM_BASE_URL: &str = "https://api.cohere.ai/v1";
pub const DEFAULT_ENTRY_DOCUMENT: &str = "index.html";
pub const DEFAULT_MAX_BODY_SIZE: u64 = 10_485_760; // 10MB

/// Extensions tried, in order, when a request path has no matching file
pub const DEFAULT_FALLBACK_EXTENSIONS: [&str; 10] = [
    "html", "htm", "js", "css", "json", "png", "jpg", "jpeg", "gif", "svg",
];

/// Main configuration structure
#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub server: ServerConfig,
    #[serde(rename = "static")]
    pub static_files: StaticConfig,
    pub upstream: UpstreamConfig,
    pub logging: LoggingConfig,
    pub performance: PerformanceConfig,
    pub http: HttpConfig,
}

/// Server configuration
#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub workers: Option<usize>,
}

/// Static asset configuration
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct StaticConfig {
    /// Directory files are resolved against
    pub root: String,
    /// Document returned for every unmatched route
    pub entry_document: String,
    /// Index files tried when a directory is requested
    pub index_files: Vec<String>,
    pub fallback_extensions: Vec<String>,
}

/// Upstream LLM API configuration
#[derive(Deserialize, Clone)]
pub struct UpstreamConfig {
    /// Base URL; `/chat` and `/generate` are appended
    pub base_url: String,
    /// Bearer credential. Empty when unset, which the upstream rejects on first use.
    #[serde(default)]
    pub api_key: String,
    pub timeout_secs: u64,
    pub connect_timeout_secs: u64,
}

impl UpstreamConfig {
    pub fn has_api_key(&self) -> bool {
        !self.api_key.is_empty()
    }

    pub fn masked_api_key(&self) -> &'static str {
        if self.has_api_key() {
            "***"
        } else {
            "Not set"
        }
    }
}

// Never print the credential
impl fmt::Debug for UpstreamConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UpstreamConfig")
            .field("base_url", &self.base_url)
            .field("api_key", &self.masked_api_key())
            .field("timeout_secs", &self.timeout_secs)
            .field("connect_timeout_secs", &self.connect_timeout_secs)
            .finish()
    }
}

/// Logging configuration
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct LoggingConfig {
    pub level: String,
    pub access_log: bool,
    /// Access log format (simple, common, combined or json)
    pub access_log_format: String,
    /// Access log file path (optional, stdout if not set)
    #[serde(default)]
    pub access_log_file: Option<String>,
    /// Error log file path (optional, stderr if not set)
    #[serde(default)]
    pub error_log_file: Option<String>,
}

/// Performance configuration
#[derive(Debug, Deserialize, Clone)]
pub struct PerformanceConfig {
    pub keep_alive: bool,
    pub read_timeout: u64,
    pub write_timeout: u64,
    pub max_connections: Option<u64>,
    /// Seconds to wait for open connections on shutdown
    pub shutdown_timeout: u64,
}

/// HTTP configuration
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct HttpConfig {
    pub server_name: String,
    pub enable_cors: bool,
    pub max_body_size: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server: ServerConfig {
                host: DEFAULT_HOST.to_string(),
                port: DEFAULT_PORT,
                workers: None,
            },
            static_files: StaticConfig::default(),
            upstream: UpstreamConfig {
                base_url: DEFAULT_UPSTREAM_BASE_URL.to_string(),
                api_key: String::new(),
                timeout_secs: 30,
                connect_timeout_secs: 10,
            },
            logging: LoggingConfig {
                level: "info".to_string(),
                access_log: true,
                access_log_format: "simple".to_string(),
                access_log_file: None,
                error_log_file: None,
            },
            performance: PerformanceConfig {
                keep_alive: true,
                read_timeout: 60,
                write_timeout: 60,
                max_connections: None,
                shutdown_timeout: 10,
            },
            http: HttpConfig {
                server_name: "cascade-server".to_string(),
                enable_cors: true,
                max_body_size: DEFAULT_MAX_BODY_SIZE,
            },
        }
    }
}

impl Default for StaticConfig {
    fn default() -> Self {
        Self {
            root: ".".to_string(),
            entry_document: DEFAULT_ENTRY_DOCUMENT.to_string(),
            index_files: vec!["index.html".to_string(), "index.htm".to_string()],
            fallback_extensions: DEFAULT_FALLBACK_EXTENSIONS
                .iter()
                .map(ToString::to_string)
                .collect(),
        }
    }
}
