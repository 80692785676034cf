//! Access log format module
//!
//! Supported formats:
//! - `simple`: `[<rfc3339>] METHOD /uri STATUS <ms>ms`
//! - `common`: Common Log Format (CLF)
//! - `combined`: CLF plus referer and user agent
//! - `json`: one JSON object per line

use chrono::{DateTime, Local};
use serde::Serialize;

/// One handled request, as written to the access log
#[derive(Debug, Clone, Serialize)]
pub struct AccessLogEntry {
    pub remote_addr: String,
    pub time: DateTime<Local>,
    pub method: String,
    pub path: String,
    pub query: Option<String>,
    pub http_version: String,
    pub status: u16,
    pub body_bytes: u64,
    pub referer: Option<String>,
    pub user_agent: Option<String>,
    /// Processing time in microseconds
    pub request_time_us: u64,
}

impl AccessLogEntry {
    /// Create an entry stamped with the current time
    pub fn new(remote_addr: String, method: String, path: String) -> Self {
        Self {
            remote_addr,
            time: Local::now(),
            method,
            path,
            query: None,
            http_version: "1.1".to_string(),
            status: 200,
            body_bytes: 0,
            referer: None,
            user_agent: None,
            request_time_us: 0,
        }
    }

    /// Format according to `format`; unknown names fall back to `simple`
    pub fn format(&self, format: &str) -> String {
        match format {
            "common" => self.format_common(),
            "combined" => format!(
                "{} \"{}\" \"{}\"",
                self.format_common(),
                self.referer.as_deref().unwrap_or("-"),
                self.user_agent.as_deref().unwrap_or("-"),
            ),
            "json" => serde_json::to_string(self).unwrap_or_else(|_| self.format_simple()),
            _ => self.format_simple(),
        }
    }

    fn request_uri(&self) -> String {
        match &self.query {
            Some(q) => format!("{}?{q}", self.path),
            None => self.path.clone(),
        }
    }

    fn format_simple(&self) -> String {
        format!(
            "[{}] {} {} {} {:.1}ms",
            self.time.to_rfc3339(),
            self.method,
            self.request_uri(),
            self.status,
            self.millis(),
        )
    }

    fn format_common(&self) -> String {
        format!(
            "{} - - [{}] \"{} {} HTTP/{}\" {} {}",
            self.remote_addr,
            self.time.format("%d/%b/%Y:%H:%M:%S %z"),
            self.method,
            self.request_uri(),
            self.http_version,
            self.status,
            self.body_bytes,
        )
    }

    #[allow(clippy::cast_precision_loss)]
    fn millis(&self) -> f64 {
        self.request_time_us as f64 / 1000.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_test_entry() -> AccessLogEntry {
        let mut entry = AccessLogEntry::new(
            "10.0.0.7".to_string(),
            "POST".to_string(),
            "/api/chat".to_string(),
        );
        entry.query = Some("v=2".to_string());
        entry.status = 502;
        entry.body_bytes = 26;
        entry.referer = Some("http://localhost:10000/".to_string());
        entry.user_agent = Some("Mozilla/5.0".to_string());
        entry.request_time_us = 2500;
        entry
    }

    #[test]
    fn test_format_simple() {
        let log = create_test_entry().format("simple");
        assert!(log.starts_with('['));
        assert!(log.contains("] POST /api/chat?v=2 502 2.5ms"));
    }

    #[test]
    fn test_format_common_and_combined() {
        let entry = create_test_entry();
        let common = entry.format("common");
        assert!(common.starts_with("10.0.0.7 - - ["));
        assert!(common.contains("\"POST /api/chat?v=2 HTTP/1.1\" 502 26"));
        assert!(!common.contains("Mozilla"));

        let combined = entry.format("combined");
        assert!(combined.ends_with("\"http://localhost:10000/\" \"Mozilla/5.0\""));
    }

    #[test]
    fn test_format_json() {
        let log = create_test_entry().format("json");
        let value: serde_json::Value = serde_json::from_str(&log).unwrap();
        assert_eq!(value["method"], "POST");
        assert_eq!(value["status"], 502);
        assert_eq!(value["body_bytes"], 26);
        assert_eq!(value["query"], "v=2");
    }

    #[test]
    fn test_unknown_format_falls_back() {
        let entry = create_test_entry();
        assert_eq!(entry.format("nope"), entry.format("simple"));
    }
}
