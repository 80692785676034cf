//! Logger module
//!
//! Logging helpers for the server:
//! - Startup banner
//! - Access logging in several formats
//! - Error, warning and upstream failure logging
//! - Optional file targets

mod format;
pub mod writer;

pub use format::AccessLogEntry;

use crate::config::Config;
use std::net::SocketAddr;

/// Initialize the logger with configuration
pub fn init(config: &Config) -> std::io::Result<()> {
    writer::init(
        config.logging.access_log_file.as_deref(),
        config.logging.error_log_file.as_deref(),
    )
}

fn write_info(message: &str) {
    match writer::get() {
        Some(w) => w.write_info(message),
        None => println!("{message}"),
    }
}

fn write_error(message: &str) {
    match writer::get() {
        Some(w) => w.write_error(message),
        None => eprintln!("{message}"),
    }
}

pub fn log_server_start(addr: &SocketAddr, config: &Config) {
    write_info("======================================");
    write_info("Server is running");
    write_info(&format!("  Local:   http://localhost:{}", addr.port()));
    write_info(&format!("  Bound:   http://{addr}"));
    write_info(&format!("Static root: {}", config.static_files.root));
    write_info(&format!("Entry document: {}", config.static_files.entry_document));
    write_info(&format!("Upstream: {}", config.upstream.base_url));
    write_info(&format!("COHERE_API_KEY: {}", config.upstream.masked_api_key()));
    write_info(&format!("Log level: {}", config.logging.level));
    if let Some(workers) = config.server.workers {
        write_info(&format!("Worker threads: {workers}"));
    }
    if let Some(ref path) = config.logging.access_log_file {
        write_info(&format!("Access log: {path}"));
    }
    if let Some(ref path) = config.logging.error_log_file {
        write_info(&format!("Error log: {path}"));
    }
    write_info("Press Ctrl+C to stop the server");
    write_info("======================================\n");
}

pub fn log_info(message: &str) {
    write_info(&format!("[INFO] {message}"));
}

pub fn log_connection_accepted(peer_addr: &SocketAddr) {
    write_info(&format!("[Connection] Accepted from: {peer_addr}"));
}

pub fn log_connection_error(err: &impl std::fmt::Debug) {
    write_error(&format!("[ERROR] Failed to serve connection: {err:?}"));
}

pub fn log_error(message: &str) {
    write_error(&format!("[ERROR] {message}"));
}

pub fn log_warning(message: &str) {
    write_error(&format!("[WARN] {message}"));
}

/// Full upstream error detail. This is the only place it is recorded.
pub fn log_upstream_error(status: u16, body: &str) {
    write_error(&format!("[UPSTREAM] API error {status}: {body}"));
}

pub fn log_access(entry: &AccessLogEntry, format: &str) {
    write_info(&entry.format(format));
}

pub fn log_shutdown(active: usize) {
    write_info(&format!(
        "\n[Shutdown] Stopped accepting connections, {active} still open"
    ));
}
