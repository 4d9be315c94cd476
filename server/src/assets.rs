//! Static files for the map client

use hyper::{header, Body, Response, StatusCode};
use log::debug;
use std::path::{Component, Path, PathBuf};

pub const INDEX_FILENAME: &str = "index.html";

/// Maps a request path onto a file below `root`, or `None` if it would leave `root`.
pub fn resolve(root: &Path, request_path: &str) -> Option<PathBuf> {
    let relative = Path::new(request_path.trim_start_matches('/'));
    let mut path = root.to_path_buf();

    for component in relative.components() {
        match component {
            Component::Normal(part) => path.push(part),
            Component::CurDir => {}
            _ => return None,
        }
    }

    if path == root {
        path.push(INDEX_FILENAME);
    }

    Some(path)
}

pub fn content_type(path: &Path) -> &'static str {
    match path.extension().and_then(|e| e.to_str()) {
        Some("html") | Some("htm") => "text/html; charset=utf-8",
        Some("js") | Some("mjs") => "text/javascript; charset=utf-8",
        Some("css") => "text/css; charset=utf-8",
        Some("json") => "application/json",
        Some("svg") => "image/svg+xml",
        Some("png") => "image/png",
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("ico") => "image/x-icon",
        Some("wasm") => "application/wasm",
        Some("txt") | Some("map") => "text/plain; charset=utf-8",
        _ => "application/octet-stream",
    }
}

pub async fn serve(root: &Path, request_path: &str) -> Response<Body> {
    let mut path = match resolve(root, request_path) {
        Some(path) => path,
        None => return status(StatusCode::NOT_FOUND),
    };

    if tokio::fs::metadata(&path)
        .await
        .map(|m| m.is_dir())
        .unwrap_or(false)
    {
        path.push(INDEX_FILENAME);
    }

    match tokio::fs::read(&path).await {
        Ok(content) => Response::builder()
            .header(header::CONTENT_TYPE, content_type(&path))
            .body(Body::from(content))
            .unwrap_or_else(|_| status(StatusCode::INTERNAL_SERVER_ERROR)),
        Err(e) => {
            debug!("No asset at {:?}: {}", path, e);
            status(StatusCode::NOT_FOUND)
        }
    }
}

pub fn status(code: StatusCode) -> Response<Body> {
    let mut response = Response::new(Body::from(code.canonical_reason().unwrap_or_default()));
    *response.status_mut() = code;
    response
}
