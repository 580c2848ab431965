//! Serving the browser front end from a directory.
//!
//! Only `index.html` and a short list of asset extensions are served. Anything
//! else, including paths that try to leave the directory, is a 404.

use std::path::Component;

use axum::{
    extract::{Path as UrlPath, State},
    http::{StatusCode, header::CONTENT_TYPE},
    response::{IntoResponse, Response},
};

use crate::prelude::*;

use super::AppState;

/// Extensions we're willing to serve.
const SERVED_EXTENSIONS: &[&str] = &["js", "css", "pdf"];

/// `GET /`
pub async fn serve_index(State(state): State<AppState>) -> Response {
    info!("Serving index.html");
    serve_file(&state.static_dir, Path::new("index.html")).await
}

/// `GET /{*path}`
pub async fn serve_static(
    State(state): State<AppState>,
    UrlPath(path): UrlPath<String>,
) -> Response {
    let rel = Path::new(&path);
    let allowed_ext = rel
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| SERVED_EXTENSIONS.contains(&ext));
    let stays_inside = rel
        .components()
        .all(|component| matches!(component, Component::Normal(_)));
    if !allowed_ext || !stays_inside {
        warn!(%path, "Attempt to access disallowed file");
        return not_found();
    }
    serve_file(&state.static_dir, rel).await
}

async fn serve_file(dir: &Path, rel: &Path) -> Response {
    let path = dir.join(rel);
    match tokio::fs::read(&path).await {
        Ok(bytes) => {
            let mime = mime_guess::from_path(rel).first_or_octet_stream();
            ([(CONTENT_TYPE, mime.essence_str().to_owned())], bytes).into_response()
        }
        Err(err) => {
            debug!(path = %path.display(), "Cannot serve file: {err}");
            not_found()
        }
    }
}

fn not_found() -> Response {
    (StatusCode::NOT_FOUND, "File not found").into_response()
}
