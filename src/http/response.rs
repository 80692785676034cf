//! HTTP response building module
//!
//! Builders for every response the server sends. A builder failure is logged
//! and degrades to an empty response instead of panicking.

use http_body_util::Full;
use hyper::body::Bytes;
use hyper::header::{HeaderValue, ACCESS_CONTROL_ALLOW_ORIGIN, LOCATION, SERVER};
use hyper::{Response, StatusCode};
use serde::Serialize;

use super::cache::CachePolicy;
use crate::config::HttpConfig;
use crate::logger;

pub const ALLOWED_METHODS: &str = "GET, HEAD, POST, OPTIONS";

/// Build 304 Not Modified response
pub fn build_304_response(etag: &str, policy: CachePolicy) -> Response<Full<Bytes>> {
    Response::builder()
        .status(StatusCode::NOT_MODIFIED)
        .header("ETag", etag)
        .header("Cache-Control", policy.to_header_value())
        .body(Full::new(Bytes::new()))
        .unwrap_or_else(|e| fallback("304", &e))
}

/// Build 200 response for file content. HEAD keeps the headers and drops the body.
pub fn build_file_response(
    data: Bytes,
    content_type: &str,
    etag: &str,
    policy: CachePolicy,
    is_head: bool,
) -> Response<Full<Bytes>> {
    let content_length = data.len();
    let body = if is_head { Bytes::new() } else { data };

    Response::builder()
        .status(StatusCode::OK)
        .header("Content-Type", content_type)
        .header("Content-Length", content_length)
        .header("ETag", etag)
        .header("Cache-Control", policy.to_header_value())
        .body(Full::new(body))
        .unwrap_or_else(|e| fallback("200", &e))
}

/// Build plain text response
pub fn build_text_response(status: StatusCode, message: &'static str) -> Response<Full<Bytes>> {
    Response::builder()
        .status(status)
        .header("Content-Type", "text/plain; charset=utf-8")
        .body(Full::new(Bytes::from_static(message.as_bytes())))
        .unwrap_or_else(|e| fallback(status.as_str(), &e))
}

/// Build JSON response
pub fn build_json_response<T: Serialize>(status: StatusCode, body: &T) -> Response<Full<Bytes>> {
    let json = match serde_json::to_vec(body) {
        Ok(j) => j,
        Err(e) => {
            logger::log_error(&format!("Failed to serialize response: {e}"));
            return build_json_error(StatusCode::INTERNAL_SERVER_ERROR, "Internal server error");
        }
    };

    Response::builder()
        .status(status)
        .header("Content-Type", "application/json; charset=utf-8")
        .body(Full::new(Bytes::from(json)))
        .unwrap_or_else(|e| fallback(status.as_str(), &e))
}

/// Build `{"error": message}` response
pub fn build_json_error(status: StatusCode, message: &str) -> Response<Full<Bytes>> {
    let body = serde_json::json!({ "error": message });
    Response::builder()
        .status(status)
        .header("Content-Type", "application/json; charset=utf-8")
        .body(Full::new(Bytes::from(body.to_string())))
        .unwrap_or_else(|e| fallback(status.as_str(), &e))
}

/// Build 301 redirect, used to add the trailing slash to directory URLs
pub fn build_redirect_response(location: &str) -> Response<Full<Bytes>> {
    Response::builder()
        .status(StatusCode::MOVED_PERMANENTLY)
        .header(LOCATION, location)
        .header("Content-Type", "text/plain; charset=utf-8")
        .body(Full::new(Bytes::from(format!("Redirecting to {location}"))))
        .unwrap_or_else(|e| fallback("301", &e))
}

/// Build 405 Method Not Allowed response
pub fn build_405_response() -> Response<Full<Bytes>> {
    Response::builder()
        .status(StatusCode::METHOD_NOT_ALLOWED)
        .header("Content-Type", "text/plain; charset=utf-8")
        .header("Allow", ALLOWED_METHODS)
        .body(Full::new(Bytes::from("405 Method Not Allowed")))
        .unwrap_or_else(|e| fallback("405", &e))
}

/// Build OPTIONS response (preflight request)
pub fn build_options_response(enable_cors: bool) -> Response<Full<Bytes>> {
    let mut builder = Response::builder()
        .status(StatusCode::NO_CONTENT)
        .header("Allow", ALLOWED_METHODS);

    if enable_cors {
        builder = builder
            .header("Access-Control-Allow-Methods", ALLOWED_METHODS)
            .header("Access-Control-Allow-Headers", "Content-Type")
            .header("Access-Control-Max-Age", "86400");
    }

    builder
        .body(Full::new(Bytes::new()))
        .unwrap_or_else(|e| fallback("OPTIONS", &e))
}

/// Add the headers every response carries: `Server`, and the CORS origin when enabled
pub fn apply_common_headers(response: &mut Response<Full<Bytes>>, http: &HttpConfig) {
    let headers = response.headers_mut();
    match HeaderValue::from_str(&http.server_name) {
        Ok(value) => {
            headers.insert(SERVER, value);
        }
        Err(_) => logger::log_warning(&format!(
            "Invalid server_name '{}', Server header omitted",
            http.server_name
        )),
    }
    if http.enable_cors {
        headers.insert(ACCESS_CONTROL_ALLOW_ORIGIN, HeaderValue::from_static("*"));
    }
}

fn fallback(status: &str, error: &hyper::http::Error) -> Response<Full<Bytes>> {
    logger::log_error(&format!("Failed to build {status} response: {error}"));
    Response::new(Full::new(Bytes::new()))
}
