//! MIME type detection module
//!
//! Maps a file path to the Content-Type browsers need to accept it. Module
//! scripts and stylesheets are rejected by browsers under the wrong type.

use std::path::Path;

pub const OCTET_STREAM: &str = "application/octet-stream";

/// Content-Type for a path, decided by its (case-insensitive) extension
pub fn content_type_for(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase);
    get_content_type(ext.as_deref())
}

/// Content-Type for a lowercase extension
pub fn get_content_type(extension: Option<&str>) -> &'static str {
    match extension {
        Some("html" | "htm") => "text/html; charset=utf-8",
        Some("js" | "mjs") => "application/javascript",
        Some("css") => "text/css",
        Some("json" | "map") => "application/json",
        Some("webmanifest") => "application/manifest+json",
        Some("txt") => "text/plain; charset=utf-8",
        Some("xml") => "application/xml",
        Some("wasm") => "application/wasm",

        Some("png") => "image/png",
        Some("jpg" | "jpeg") => "image/jpeg",
        Some("gif") => "image/gif",
        Some("svg") => "image/svg+xml",
        Some("ico") => "image/x-icon",
        Some("webp") => "image/webp",

        Some("mp3") => "audio/mpeg",
        Some("mp4") => "video/mp4",
        Some("pdf") => "application/pdf",

        Some("woff") => "font/woff",
        Some("woff2") => "font/woff2",
        Some("ttf") => "font/ttf",

        _ => OCTET_STREAM,
    }
}
