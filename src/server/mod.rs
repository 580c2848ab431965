//! HTTP front ends for document analysis.
//!
//! There are two variants, because there are two kinds of clients:
//!
//! - [`ServerVariant::Coords`] is a small JSON API. It takes a PDF as `file`,
//!   runs the layout model, and returns words and lines with coordinates.
//! - [`ServerVariant::Fields`] backs the browser front end. It serves the
//!   front end's static files, takes a document as `document`, runs a
//!   field-extraction model, and returns the full normalized result.
//!
//! Each request is independent. The only shared state is the analyzer.

use std::{io::Write as _, net::SocketAddr, sync::Arc};

use axum::{
    Json, Router,
    body::Bytes,
    extract::{
        DefaultBodyLimit, Multipart, Query, State, multipart::MultipartRejection,
        rejection::QueryRejection,
    },
    routing::{get, post},
};
use clap::ValueEnum;
use tempfile::NamedTempFile;
use tokio::net::TcpListener;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::{
    analysis::{AnalysisRequest, DocumentAnalyzer, DocumentSource},
    models::ModelId,
    normalize::{CoordsOutput, FullOutput, coords_output, full_output},
    prelude::*,
};

use self::{
    error::ApiError,
    static_files::{serve_index, serve_static},
};

pub mod error;
mod static_files;

/// Default upload size limit, in bytes.
pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 50 * 1024 * 1024;

/// Which server to run.
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum ServerVariant {
    /// `POST /analyze-pdf` returning words and lines with coordinates.
    Coords,

    /// `POST /analyze` returning document fields, plus the static front end.
    Fields,
}

impl ServerVariant {
    /// The port this variant listens on unless told otherwise.
    pub fn default_port(self) -> u16 {
        match self {
            ServerVariant::Coords => 8000,
            ServerVariant::Fields => 5000,
        }
    }
}

/// State shared by all handlers.
#[derive(Clone)]
pub struct AppState {
    /// The remote analysis service.
    pub analyzer: Arc<dyn DocumentAnalyzer>,

    /// Directory containing `index.html` and its assets.
    pub static_dir: PathBuf,

    /// Where to put temporary copies of uploads. Defaults to the system
    /// temporary directory.
    pub upload_dir: Option<PathBuf>,

    /// Largest request body we'll accept.
    pub max_upload_bytes: usize,
}

impl AppState {
    /// Create state with default settings.
    pub fn new(analyzer: Arc<dyn DocumentAnalyzer>) -> Self {
        Self {
            analyzer,
            static_dir: PathBuf::from("."),
            upload_dir: None,
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
        }
    }
}

/// Build the router for a server variant.
pub fn router(variant: ServerVariant, state: AppState) -> Router {
    let routes = match variant {
        ServerVariant::Coords => Router::new()
            .route("/", get(welcome))
            .route("/analyze-pdf", post(analyze_pdf)),
        ServerVariant::Fields => Router::new()
            .route("/", get(serve_index))
            .route("/analyze", post(analyze_document))
            .route("/{*path}", get(serve_static)),
    };
    let max_upload_bytes = state.max_upload_bytes;
    routes
        .layer(DefaultBodyLimit::max(max_upload_bytes))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Run a server until Ctrl-C.
#[instrument(level = "debug", skip(state))]
pub async fn serve(addr: SocketAddr, variant: ServerVariant, state: AppState) -> Result<()> {
    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to listen on {addr}"))?;
    info!(%addr, ?variant, "Listening");
    axum::serve(listener, router(variant, state))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server failed")
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for Ctrl-C: {err}");
    }
    info!("Shutting down");
}

/// `GET /` for the coords variant.
async fn welcome() -> Json<Value> {
    Json(json!({ "message": "Welcome to Document Intelligence API" }))
}

/// `POST /analyze-pdf`
///
/// The layout model wants a file, so the upload goes through a temporary file.
#[instrument(level = "info", skip_all)]
async fn analyze_pdf(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<CoordsOutput>, ApiError> {
    let mut multipart = multipart?;
    let upload = read_upload(&mut multipart, "file").await?;
    if !upload.file_name.to_lowercase().ends_with(".pdf") {
        return Err(ApiError::bad_request("Only PDF files are supported"));
    }
    info!(file_name = %upload.file_name, len = upload.bytes.len(), "Received PDF");

    // Deleted when dropped, whichever way we leave this function.
    let temp_file = write_temp_pdf(state.upload_dir.clone(), upload.bytes).await?;
    let result = state
        .analyzer
        .analyze(AnalysisRequest {
            model: ModelId::Layout,
            document: DocumentSource::Path(temp_file.path().to_owned()),
        })
        .await?;
    Ok(Json(coords_output(&result)))
}

/// Query parameters for `POST /analyze`.
#[derive(Debug, Deserialize)]
struct AnalyzeQuery {
    #[serde(default = "default_fields_model")]
    model: ModelId,
}

fn default_fields_model() -> ModelId {
    ModelId::Invoice
}

/// `POST /analyze[?model=<model>]`
#[instrument(level = "info", skip_all)]
async fn analyze_document(
    State(state): State<AppState>,
    query: Result<Query<AnalyzeQuery>, QueryRejection>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<FullOutput>, ApiError> {
    let Query(query) = query?;
    let mut multipart = multipart?;
    let upload = read_upload(&mut multipart, "document").await?;
    info!(
        file_name = %upload.file_name,
        len = upload.bytes.len(),
        model = %query.model,
        "Received document"
    );
    let result = state
        .analyzer
        .analyze(AnalysisRequest {
            model: query.model,
            document: DocumentSource::Bytes(upload.bytes.to_vec()),
        })
        .await?;
    Ok(Json(full_output(&result)))
}

/// An uploaded file.
struct Upload {
    file_name: String,
    bytes: Bytes,
}

/// Find the file part named `field_name`.
async fn read_upload(multipart: &mut Multipart, field_name: &str) -> Result<Upload, ApiError> {
    while let Some(field) = multipart.next_field().await? {
        if field.name() != Some(field_name) {
            continue;
        }
        let file_name = field.file_name().unwrap_or_default().to_owned();
        if file_name.is_empty() {
            return Err(ApiError::bad_request("No selected file"));
        }
        let bytes = field.bytes().await?;
        return Ok(Upload { file_name, bytes });
    }
    Err(ApiError::bad_request(format!(
        "No file part named '{field_name}' found"
    )))
}

/// Copy an upload into a new temporary `.pdf` file.
async fn write_temp_pdf(dir: Option<PathBuf>, bytes: Bytes) -> Result<NamedTempFile> {
    tokio::task::spawn_blocking(move || -> Result<NamedTempFile> {
        let mut builder = tempfile::Builder::new();
        builder.prefix("upload-").suffix(".pdf");
        let mut file = match &dir {
            Some(dir) => builder.tempfile_in(dir),
            None => builder.tempfile(),
        }
        .context("Failed to create temporary file")?;
        file.write_all(&bytes)
            .context("Failed to write temporary file")?;
        file.flush().context("Failed to flush temporary file")?;
        Ok(file)
    })
    .await
    .context("Temporary file task failed")?
}
