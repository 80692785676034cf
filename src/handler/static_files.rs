//! Static file serving module
//!
//! Resolves request paths under the static root and falls back to the entry
//! document for anything that does not resolve, so client-side routing can
//! take over.

use http_body_util::Full;
use hyper::body::Bytes;
use hyper::{Response, StatusCode};
use percent_encoding::percent_decode_str;
use std::path::{Path, PathBuf};
use tokio::fs;

use crate::config::StaticConfig;
use crate::http::cache::{self, CachePolicy};
use crate::http::{self, mime};
use crate::logger;

pub const ENTRY_LOAD_ERROR: &str = "Error loading the application";

/// The parts of a GET/HEAD request static serving looks at
pub struct StaticRequest<'a> {
    pub path: &'a str,
    pub is_head: bool,
    pub if_none_match: Option<&'a str>,
}

/// Serve the file a request names, or the entry document when there is none
pub async fn serve(req: &StaticRequest<'_>, cfg: &StaticConfig) -> Response<Full<Bytes>> {
    match resolve(Path::new(&cfg.root), req.path, cfg).await {
        Some(Resolved::File(file)) => match fs::read(&file).await {
            Ok(data) => {
                return file_response(data, mime::content_type_for(&file), CachePolicy::default(), req);
            }
            Err(e) => logger::log_warning(&format!(
                "Failed to read '{}': {e}, serving entry document",
                file.display()
            )),
        },
        Some(Resolved::Redirect(location)) => return http::build_redirect_response(&location),
        None => {}
    }

    serve_entry_document(req, cfg).await
}

/// Serve the single-page entry document, or 500 if it cannot be read
pub async fn serve_entry_document(
    req: &StaticRequest<'_>,
    cfg: &StaticConfig,
) -> Response<Full<Bytes>> {
    let path = Path::new(&cfg.root).join(&cfg.entry_document);
    match fs::read(&path).await {
        Ok(data) => file_response(data, mime::content_type_for(&path), CachePolicy::NoCache, req),
        Err(e) => {
            logger::log_error(&format!(
                "Error sending entry document '{}': {e}",
                path.display()
            ));
            http::build_text_response(StatusCode::INTERNAL_SERVER_ERROR, ENTRY_LOAD_ERROR)
        }
    }
}

fn file_response(
    data: Vec<u8>,
    content_type: &str,
    policy: CachePolicy,
    req: &StaticRequest<'_>,
) -> Response<Full<Bytes>> {
    let etag = cache::generate_etag(&data);
    if cache::check_etag_match(req.if_none_match, &etag) {
        return http::build_304_response(&etag, policy);
    }
    http::build_file_response(Bytes::from(data), content_type, &etag, policy, req.is_head)
}

/// Outcome of resolving a request path under the static root
#[derive(Debug, PartialEq, Eq)]
pub enum Resolved {
    File(PathBuf),
    /// A directory named without its trailing slash; holds the slash form
    Redirect(String),
}

/// Resolve a request path to a file under `root`.
///
/// Segments are percent-decoded first. Returns `None` for dotfiles, anything
/// outside the root (after following symlinks) and paths with no matching
/// file, index file or extension fallback.
pub async fn resolve(root: &Path, request_path: &str, cfg: &StaticConfig) -> Option<Resolved> {
    let segments = decode_segments(request_path)?;

    let root_canonical = match fs::canonicalize(root).await {
        Ok(p) => p,
        Err(e) => {
            logger::log_warning(&format!(
                "Static root not found or inaccessible '{}': {e}",
                root.display()
            ));
            return None;
        }
    };

    let candidate = segments
        .iter()
        .fold(root_canonical.clone(), |path, segment| path.join(segment));
    let trailing_slash = request_path.ends_with('/');

    let is_dir = fs::metadata(&candidate).await.is_ok_and(|m| m.is_dir());
    if is_dir && !trailing_slash && !segments.is_empty() {
        confine(&root_canonical, &candidate, request_path).await?;
        return Some(Resolved::Redirect(format!("{request_path}/")));
    }

    let found = find_file(&candidate, trailing_slash, cfg).await?;
    confine(&root_canonical, &found, request_path).await.map(Resolved::File)
}

/// Split and percent-decode a request path.
/// `None` if any segment fails to decode or is hidden, relative or carries a separator.
fn decode_segments(request_path: &str) -> Option<Vec<String>> {
    request_path
        .split('/')
        .filter(|s| !s.is_empty())
        .map(|raw| {
            let segment = percent_decode_str(raw).decode_utf8().ok()?;
            // Covers ".", ".." and hidden files such as .env
            if segment.starts_with('.') || segment.contains(['/', '\\', '\0']) {
                return None;
            }
            Some(segment.into_owned())
        })
        .collect()
}

/// Canonicalize `path` and require it to stay under `root_canonical`
async fn confine(root_canonical: &Path, path: &Path, request_path: &str) -> Option<PathBuf> {
    let canonical = fs::canonicalize(path).await.ok()?;
    if !canonical.starts_with(root_canonical) {
        logger::log_warning(&format!(
            "Path traversal attempt blocked: {request_path} -> {}",
            canonical.display()
        ));
        return None;
    }
    Some(canonical)
}

async fn find_file(candidate: &Path, trailing_slash: bool, cfg: &StaticConfig) -> Option<PathBuf> {
    match fs::metadata(candidate).await {
        Ok(meta) if meta.is_file() => (!trailing_slash).then(|| candidate.to_path_buf()),
        Ok(meta) if meta.is_dir() => first_file(cfg.index_files.iter().map(|f| candidate.join(f))).await,
        _ => {
            // Extension fallback only applies to extensionless paths: /about -> about.html
            if trailing_slash || candidate.extension().is_some() {
                return None;
            }
            let name = candidate.file_name()?;
            first_file(cfg.fallback_extensions.iter().map(|ext| {
                let mut with_ext = name.to_os_string();
                with_ext.push(".");
                with_ext.push(ext);
                candidate.with_file_name(with_ext)
            }))
            .await
        }
    }
}

async fn first_file(candidates: impl Iterator<Item = PathBuf>) -> Option<PathBuf> {
    for path in candidates {
        if fs::metadata(&path).await.is_ok_and(|m| m.is_file()) {
            return Some(path);
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use http_body_util::BodyExt;

    const INDEX: &str = "<!doctype html><div id=\"app\"></div>";

    fn site() -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        std::fs::write(root.join("index.html"), INDEX).unwrap();
        std::fs::write(root.join("app.js"), "import './chat.js';").unwrap();
        std::fs::write(root.join("styles.css"), "body { margin: 0 }").unwrap();
        std::fs::write(root.join("about.html"), "<h1>About</h1>").unwrap();
        std::fs::write(root.join(".env"), "COHERE_API_KEY=secret").unwrap();
        std::fs::create_dir(root.join("docs")).unwrap();
        std::fs::write(root.join("docs/index.html"), "<h1>Docs</h1>").unwrap();
        std::fs::write(root.join("my app.js"), "console.log('spaced');").unwrap();
        std::fs::write(root.join("caf\u{e9}.css"), "p { color: brown }").unwrap();
        dir
    }

    fn config_for(dir: &tempfile::TempDir) -> StaticConfig {
        StaticConfig {
            root: dir.path().to_string_lossy().into_owned(),
            ..StaticConfig::default()
        }
    }

    fn get(path: &str) -> StaticRequest<'_> {
        StaticRequest {
            path,
            is_head: false,
            if_none_match: None,
        }
    }

    async fn body_string(response: Response<Full<Bytes>>) -> String {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    #[tokio::test]
    async fn test_serves_assets_with_mime_types() {
        let dir = site();
        let cfg = config_for(&dir);

        let resp = serve(&get("/app.js"), &cfg).await;
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(resp.headers()["Content-Type"], "application/javascript");
        assert_eq!(body_string(resp).await, "import './chat.js';");

        let resp = serve(&get("/styles.css"), &cfg).await;
        assert_eq!(resp.headers()["Content-Type"], "text/css");
    }

    #[tokio::test]
    async fn test_unknown_path_gets_entry_document() {
        let dir = site();
        let cfg = config_for(&dir);

        for path in ["/", "/chat/42", "/settings/profile", "/missing.js"] {
            let resp = serve(&get(path), &cfg).await;
            assert_eq!(resp.status(), StatusCode::OK, "path: {path}");
            assert_eq!(body_string(resp).await, INDEX, "path: {path}");
        }
    }

    #[tokio::test]
    async fn test_dotfiles_and_traversal_are_not_served() {
        let dir = site();
        let cfg = config_for(&dir);

        for path in [
            "/.env",
            "/../.env",
            "/docs/../.env",
            "/%2e%2e/etc/passwd",
            "/%2E%2E/%2e%2e/etc/passwd",
            "/%2eenv",
            "/docs/%2e%2e/.env",
            "/docs%2f..%2f.env",
            "/..%5c.env",
            "/%ff%fe",
        ] {
            let resp = serve(&get(path), &cfg).await;
            let body = body_string(resp).await;
            assert_eq!(body, INDEX, "path: {path}");
            assert!(!body.contains("secret"));
        }
    }

    #[tokio::test]
    async fn test_directory_index_and_extension_fallback() {
        let dir = site();
        let cfg = config_for(&dir);

        assert_eq!(body_string(serve(&get("/docs/"), &cfg).await).await, "<h1>Docs</h1>");
        assert_eq!(body_string(serve(&get("/about"), &cfg).await).await, "<h1>About</h1>");
    }

    #[tokio::test]
    async fn test_directory_without_slash_redirects() {
        let dir = site();
        let cfg = config_for(&dir);

        let resp = serve(&get("/docs"), &cfg).await;
        assert_eq!(resp.status(), StatusCode::MOVED_PERMANENTLY);
        assert_eq!(resp.headers()["Location"], "/docs/");

        // Root stays a plain index lookup
        let resp = serve(&get("/"), &cfg).await;
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(body_string(resp).await, INDEX);
    }

    #[tokio::test]
    async fn test_percent_encoded_names_are_decoded() {
        let dir = site();
        let cfg = config_for(&dir);

        let resp = serve(&get("/my%20app.js"), &cfg).await;
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(resp.headers()["Content-Type"], "application/javascript");
        assert_eq!(body_string(resp).await, "console.log('spaced');");

        let resp = serve(&get("/caf%C3%A9.css"), &cfg).await;
        assert_eq!(resp.headers()["Content-Type"], "text/css");
        assert_eq!(body_string(resp).await, "p { color: brown }");
    }

    #[tokio::test]
    async fn test_head_and_conditional_get() {
        let dir = site();
        let cfg = config_for(&dir);

        let head = StaticRequest {
            path: "/styles.css",
            is_head: true,
            if_none_match: None,
        };
        let resp = serve(&head, &cfg).await;
        let etag = resp.headers()["ETag"].to_str().unwrap().to_string();
        assert_eq!(resp.headers()["Content-Length"], "18");
        assert_eq!(body_string(resp).await, "");

        let conditional = StaticRequest {
            path: "/styles.css",
            is_head: false,
            if_none_match: Some(&etag),
        };
        let resp = serve(&conditional, &cfg).await;
        assert_eq!(resp.status(), StatusCode::NOT_MODIFIED);
    }

    #[tokio::test]
    async fn test_entry_document_is_not_cached() {
        let dir = site();
        let resp = serve(&get("/anything"), &config_for(&dir)).await;
        assert_eq!(resp.headers()["Cache-Control"], "no-cache");
    }

    #[tokio::test]
    async fn test_missing_entry_document_is_500() {
        let dir = site();
        std::fs::remove_file(dir.path().join("index.html")).unwrap();
        let cfg = config_for(&dir);

        let resp = serve(&get("/some/route"), &cfg).await;
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(resp.headers()["Content-Type"], "text/plain; charset=utf-8");
        assert_eq!(body_string(resp).await, ENTRY_LOAD_ERROR);
    }
}
