//! Request routing dispatch module
//!
//! Entry point for HTTP request processing: method dispatch, common headers
//! and access logging.

use http_body_util::Full;
use hyper::body::{Body, Bytes};
use hyper::http::request::Parts;
use hyper::{Method, Request, Response, StatusCode, Version};
use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;

use super::chat::{self, CHAT_PATH};
use super::static_files::{self, StaticRequest};
use crate::config::AppState;
use crate::http;
use crate::logger::{self, AccessLogEntry};

/// Main entry point for HTTP request handling
pub async fn handle_request<B>(
    req: Request<B>,
    state: Arc<AppState>,
    remote_addr: SocketAddr,
) -> Result<Response<Full<Bytes>>, Infallible>
where
    B: Body<Data = Bytes>,
    B::Error: Into<Box<dyn std::error::Error + Send + Sync>>,
{
    let started = Instant::now();
    let (parts, body) = req.into_parts();

    let mut response = route_request(&parts, body, &state).await;
    http::apply_common_headers(&mut response, &state.config.http);

    if state.config.logging.access_log {
        log_access(&parts, &response, remote_addr, started, &state);
    }
    Ok(response)
}

async fn route_request<B>(parts: &Parts, body: B, state: &AppState) -> Response<Full<Bytes>>
where
    B: Body<Data = Bytes>,
    B::Error: Into<Box<dyn std::error::Error + Send + Sync>>,
{
    let path = parts.uri.path();
    match &parts.method {
        &Method::POST if path == CHAT_PATH => chat::handle_chat(&parts.headers, body, state).await,
        &Method::GET | &Method::HEAD => {
            let req = StaticRequest {
                path,
                is_head: parts.method == Method::HEAD,
                if_none_match: parts
                    .headers
                    .get("if-none-match")
                    .and_then(|v| v.to_str().ok()),
            };
            static_files::serve(&req, &state.config.static_files).await
        }
        &Method::OPTIONS => http::build_options_response(state.config.http.enable_cors),
        &Method::POST => http::build_json_error(StatusCode::NOT_FOUND, "Not Found"),
        method => {
            logger::log_warning(&format!("Method not allowed: {method} {path}"));
            http::build_405_response()
        }
    }
}

fn log_access(
    parts: &Parts,
    response: &Response<Full<Bytes>>,
    remote_addr: SocketAddr,
    started: Instant,
    state: &AppState,
) {
    let header = |name: &str| {
        parts
            .headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(ToString::to_string)
    };

    let mut entry = AccessLogEntry::new(
        remote_addr.ip().to_string(),
        parts.method.to_string(),
        parts.uri.path().to_string(),
    );
    entry.query = parts.uri.query().map(ToString::to_string);
    entry.http_version = version_label(parts.version).to_string();
    entry.status = response.status().as_u16();
    entry.body_bytes = response.body().size_hint().exact().unwrap_or(0);
    entry.referer = header("referer");
    entry.user_agent = header("user-agent");
    entry.request_time_us = u64::try_from(started.elapsed().as_micros()).unwrap_or(u64::MAX);

    logger::log_access(&entry, &state.config.logging.access_log_format);
}

fn version_label(version: Version) -> &'static str {
    match version {
        Version::HTTP_09 => "0.9",
        Version::HTTP_10 => "1.0",
        Version::HTTP_2 => "2",
        Version::HTTP_3 => "3",
        _ => "1.1",
    }
}
