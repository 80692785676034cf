//! Chat proxy endpoint
//!
//! `POST /api/chat`: reads the browser's JSON, forwards it upstream through
//! [`UpstreamClient`](crate::proxy::UpstreamClient) and answers with
//! `{"response": ...}` or `{"error": ...}`.

use http_body_util::{BodyExt, Full, LengthLimitError, Limited};
use hyper::body::{Body, Bytes};
use hyper::header::CONTENT_LENGTH;
use hyper::{HeaderMap, Response, StatusCode};
use serde_json::Value;

use crate::config::AppState;
use crate::http;
use crate::logger;
use crate::proxy::{ChatRequest, ChatResponse, ProxyError};

pub const CHAT_PATH: &str = "/api/chat";

/// Handle one chat request. Every failure becomes a JSON error response.
pub async fn handle_chat<B>(headers: &HeaderMap, body: B, state: &AppState) -> Response<Full<Bytes>>
where
    B: Body<Data = Bytes>,
    B::Error: Into<Box<dyn std::error::Error + Send + Sync>>,
{
    match relay(headers, body, state).await {
        Ok(text) => http::build_json_response(StatusCode::OK, &ChatResponse { response: text }),
        Err(err) => {
            log_failure(&err);
            http::build_json_error(err.status(), err.client_message())
        }
    }
}

async fn relay<B>(headers: &HeaderMap, body: B, state: &AppState) -> Result<String, ProxyError>
where
    B: Body<Data = Bytes>,
    B::Error: Into<Box<dyn std::error::Error + Send + Sync>>,
{
    let limit = state.config.http.max_body_size;
    check_content_length(headers, limit)?;
    let bytes = read_body(body, limit).await?;

    let request = parse_request(&bytes)?;
    let prompt = request.prompt().ok_or(ProxyError::MissingPrompt)?;
    let mode = request.mode();

    let data = state.upstream.send(mode, &mode.payload(prompt)).await?;
    Ok(mode.extract_response(&data))
}

/// Refuse early when the declared Content-Length is over the limit
fn check_content_length(headers: &HeaderMap, limit: u64) -> Result<(), ProxyError> {
    let declared = headers
        .get(CONTENT_LENGTH)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse::<u64>().ok());
    match declared {
        Some(size) if size > limit => Err(ProxyError::BodyTooLarge { limit }),
        _ => Ok(()),
    }
}

async fn read_body<B>(body: B, limit: u64) -> Result<Bytes, ProxyError>
where
    B: Body<Data = Bytes>,
    B::Error: Into<Box<dyn std::error::Error + Send + Sync>>,
{
    let max = usize::try_from(limit).unwrap_or(usize::MAX);
    match Limited::new(body, max).collect().await {
        Ok(collected) => Ok(collected.to_bytes()),
        Err(e) if e.downcast_ref::<LengthLimitError>().is_some() => {
            Err(ProxyError::BodyTooLarge { limit })
        }
        Err(e) => Err(ProxyError::RequestBody(e.to_string())),
    }
}

/// An empty body reads as `{}` and an array has no fields, so both fail on the
/// missing prompt. Scalars and unparseable bodies are invalid JSON.
fn parse_request(bytes: &[u8]) -> Result<ChatRequest, ProxyError> {
    if bytes.is_empty() {
        return Ok(ChatRequest::default());
    }
    match serde_json::from_slice::<Value>(bytes)? {
        Value::Array(_) => Ok(ChatRequest::default()),
        value => Ok(serde_json::from_value(value)?),
    }
}

fn log_failure(err: &ProxyError) {
    match err {
        ProxyError::Upstream { status, body } => {
            logger::log_upstream_error(status.as_u16(), body);
        }
        ProxyError::MissingPrompt | ProxyError::BodyTooLarge { .. } => {
            logger::log_warning(&format!("Rejected chat request: {err}"));
        }
        _ => logger::log_error(&format!("Chat proxy error: {err}")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::proxy::{GENERATE_PREFIX, SYSTEM_PREAMBLE};
    use hyper::body::Incoming;
    use hyper::server::conn::http1;
    use hyper::service::service_fn;
    use hyper::Request;
    use hyper_util::rt::TokioIo;
    use serde_json::json;
    use std::convert::Infallible;
    use std::sync::{Arc, Mutex};
    use tokio::net::TcpListener;

    /// One request as seen by the fake upstream
    struct Captured {
        path: String,
        headers: HeaderMap,
        body: Value,
    }

    type Log = Arc<Mutex<Vec<Captured>>>;

    /// Start a fake upstream that records requests and always answers `status` / `reply`.
    /// Returns its base URL.
    async fn spawn_upstream(status: u16, reply: &'static str) -> (String, Log) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let log: Log = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&log);

        tokio::spawn(async move {
            while let Ok((stream, _)) = listener.accept().await {
                let sink = Arc::clone(&sink);
                tokio::spawn(async move {
                    let service = service_fn(move |req: Request<Incoming>| {
                        let sink = Arc::clone(&sink);
                        async move {
                            let (parts, body) = req.into_parts();
                            let bytes = body.collect().await.unwrap().to_bytes();
                            sink.lock().unwrap().push(Captured {
                                path: parts.uri.path().to_string(),
                                headers: parts.headers,
                                body: serde_json::from_slice(&bytes).unwrap_or(Value::Null),
                            });
                            Ok::<_, Infallible>(
                                Response::builder()
                                    .status(status)
                                    .header("Content-Type", "application/json")
                                    .body(Full::new(Bytes::from_static(reply.as_bytes())))
                                    .unwrap(),
                            )
                        }
                    });
                    let _ = http1::Builder::new()
                        .serve_connection(TokioIo::new(stream), service)
                        .await;
                });
            }
        });

        (format!("http://{addr}/v1"), log)
    }

    fn state_for(base_url: &str) -> AppState {
        let mut cfg = Config::default();
        cfg.upstream.base_url = base_url.to_string();
        cfg.upstream.api_key = "test-key".to_string();
        AppState::new(cfg).unwrap()
    }

    async fn post(state: &AppState, body: &str) -> (StatusCode, Value) {
        let resp = handle_chat(&HeaderMap::new(), Full::new(Bytes::from(body.to_string())), state).await;
        let status = resp.status();
        let bytes = resp.into_body().collect().await.unwrap().to_bytes();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn test_missing_prompt_is_rejected_without_upstream_call() {
        let (url, log) = spawn_upstream(200, r#"{"text":"unused"}"#).await;
        let state = state_for(&url);

        for body in [
            "",
            "{}",
            "[]",
            r#"["hello"]"#,
            r#"[{"prompt":"hello"}]"#,
            r#"{"prompt":""}"#,
            r#"{"prompt":null}"#,
            r#"{"prompt":42}"#,
            r#"{"prompt":["hello"]}"#,
            r#"{"prompt":{"text":"hello"}}"#,
            r#"{"isGenerate":true}"#,
        ] {
            let (status, json) = post(&state, body).await;
            assert_eq!(status, StatusCode::BAD_REQUEST, "body: {body}");
            assert_eq!(json, json!({"error": "Prompt is required"}));
        }
        assert!(log.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_chat_round_trip() {
        let (url, log) = spawn_upstream(200, r#"{"text":"hi there"}"#).await;
        let state = state_for(&url);

        let (status, json) = post(&state, r#"{"prompt":"hello"}"#).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json, json!({"response": "hi there"}));

        let log = log.lock().unwrap();
        assert_eq!(log.len(), 1);
        let sent = &log[0];
        assert_eq!(sent.path, "/v1/chat");
        assert_eq!(sent.headers["authorization"], "Bearer test-key");
        assert_eq!(sent.headers["accept"], "application/json");
        assert_eq!(sent.headers["content-type"], "application/json");
        assert_eq!(sent.body["model"], "command-a-03-2025");
        assert_eq!(sent.body["message"], format!("{SYSTEM_PREAMBLE}\n\nhello"));
        assert_eq!(sent.body["max_tokens"], 500);
    }

    #[tokio::test]
    async fn test_generate_round_trip() {
        let (url, log) = spawn_upstream(200, r#"{"generations":[{"text":"a poem"}]}"#).await;
        let state = state_for(&url);

        let (status, json) = post(&state, r#"{"prompt":"autumn","isGenerate":true}"#).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["response"], "a poem");

        let log = log.lock().unwrap();
        assert_eq!(log[0].path, "/v1/generate");
        assert_eq!(log[0].body["model"], "command");
        assert_eq!(log[0].body["prompt"], format!("{GENERATE_PREFIX}autumn"));
        assert_eq!(log[0].body["max_tokens"], 1000);
    }

    #[tokio::test]
    async fn test_fallback_texts() {
        let (url, _log) = spawn_upstream(200, r#"{"id":"abc"}"#).await;
        let state = state_for(&url);

        let (_, json) = post(&state, r#"{"prompt":"hello"}"#).await;
        assert_eq!(json["response"], "No response from AI");

        let (_, json) = post(&state, r#"{"prompt":"hello","isGenerate":true}"#).await;
        assert_eq!(json["response"], "No content generated");
    }

    #[tokio::test]
    async fn test_chat_message_field_used_when_text_missing() {
        let (url, _log) = spawn_upstream(200, r#"{"message":"from message"}"#).await;
        let (_, json) = post(&state_for(&url), r#"{"prompt":"hello"}"#).await;
        assert_eq!(json["response"], "from message");
    }

    #[tokio::test]
    async fn test_upstream_error_keeps_status_hides_detail() {
        let (url, _log) =
            spawn_upstream(401, r#"{"message":"invalid api token: test-key"}"#).await;
        let state = state_for(&url);

        let (status, json) = post(&state, r#"{"prompt":"hello"}"#).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(json, json!({"error": "Error from API"}));
    }

    #[tokio::test]
    async fn test_null_is_generate_means_chat() {
        let (url, log) = spawn_upstream(200, r#"{"text":"chatted"}"#).await;
        let state = state_for(&url);

        let (status, json) = post(&state, r#"{"prompt":"hello","isGenerate":null}"#).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["response"], "chatted");

        let (status, _) = post(&state, r#"{"prompt":"hello","isGenerate":false}"#).await;
        assert_eq!(status, StatusCode::OK);

        let log = log.lock().unwrap();
        assert_eq!(log.len(), 2);
        assert!(log.iter().all(|sent| sent.path == "/v1/chat"));
    }

    #[tokio::test]
    async fn test_non_boolean_is_generate_is_internal_error() {
        let (url, log) = spawn_upstream(200, r#"{"text":"unused"}"#).await;
        let state = state_for(&url);

        for body in [
            r#"{"prompt":"hello","isGenerate":"yes"}"#,
            r#"{"prompt":"hello","isGenerate":1}"#,
        ] {
            let (status, json) = post(&state, body).await;
            assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR, "body: {body}");
            assert_eq!(json, json!({"error": "Internal server error"}));
        }
        assert!(log.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_malformed_json_is_internal_error() {
        let (url, log) = spawn_upstream(200, r#"{"text":"unused"}"#).await;
        let state = state_for(&url);

        for body in [r#"{"prompt":"#, "   ", "\n", r#""hello""#, "42", "null"] {
            let (status, json) = post(&state, body).await;
            assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR, "body: {body:?}");
            assert_eq!(json, json!({"error": "Internal server error"}));
        }
        assert!(log.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_non_json_upstream_body_is_internal_error() {
        let (url, _log) = spawn_upstream(200, "<html>gateway</html>").await;
        let (status, json) = post(&state_for(&url), r#"{"prompt":"hello"}"#).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(json["error"], "Internal server error");
    }

    #[tokio::test]
    async fn test_unreachable_upstream_is_internal_error() {
        let closed = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = closed.local_addr().unwrap();
        drop(closed);

        let state = state_for(&format!("http://{addr}/v1"));
        let (status, json) = post(&state, r#"{"prompt":"hello"}"#).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(json["error"], "Internal server error");
    }

    #[tokio::test]
    async fn test_body_over_limit_is_413() {
        let (url, log) = spawn_upstream(200, r#"{"text":"unused"}"#).await;
        let mut cfg = Config::default();
        cfg.upstream.base_url = url;
        cfg.http.max_body_size = 16;
        let state = AppState::new(cfg).unwrap();

        let (status, _) = post(&state, r#"{"prompt":"this is far too long"}"#).await;
        assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);

        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_LENGTH, "1000".parse().unwrap());
        let resp = handle_chat(&headers, Full::new(Bytes::from_static(b"{}")), &state).await;
        assert_eq!(resp.status(), StatusCode::PAYLOAD_TOO_LARGE);
        assert!(log.lock().unwrap().is_empty());
    }
}
