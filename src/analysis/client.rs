//! Client for the remote Document Intelligence analyze operation.
//!
//! Analysis is a long-running operation: we submit the document, get back an
//! `Operation-Location` URL, and poll it until the job succeeds or fails.
//! Callers only see a single [`DocumentAnalyzer::analyze`] call.

use std::{error, fmt, time::Duration};

use reqwest::{
    StatusCode,
    header::{CONTENT_TYPE, HeaderMap, RETRY_AFTER},
};
use tokio::time;

use crate::{
    config::{AzureCredentials, CredentialsError},
    models::ModelId,
    prelude::*,
};

use super::AnalyzeResult;

/// Header used to pass our access key.
const KEY_HEADER: &str = "Ocp-Apim-Subscription-Key";

/// Header containing the URL of a submitted operation.
const OPERATION_LOCATION_HEADER: &str = "operation-location";

/// Default delay between status polls, when the service doesn't suggest one.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(1);

/// Where to find the document to analyze.
#[derive(Debug)]
pub enum DocumentSource {
    /// Document bytes already in memory.
    Bytes(Vec<u8>),

    /// A document on disk.
    Path(PathBuf),
}

impl DocumentSource {
    /// Get the document's bytes.
    async fn into_bytes(self) -> Result<Vec<u8>> {
        match self {
            DocumentSource::Bytes(bytes) => Ok(bytes),
            DocumentSource::Path(path) => tokio::fs::read(&path)
                .await
                .with_context(|| format!("Failed to read document at path: {:?}", path)),
        }
    }
}

/// A single analysis request.
#[derive(Debug)]
pub struct AnalysisRequest {
    /// Which remote model to run.
    pub model: ModelId,

    /// The document to analyze.
    pub document: DocumentSource,
}

/// Interface to a document analysis service.
#[async_trait]
pub trait DocumentAnalyzer: Send + Sync + 'static {
    /// Analyze a document, waiting until the remote job completes.
    ///
    /// If the service isn't configured, the returned error will contain a
    /// [`CredentialsError`].
    async fn analyze(&self, request: AnalysisRequest) -> Result<AnalyzeResult>;
}

/// [`DocumentAnalyzer`] backed by the Azure Document Intelligence REST API.
pub struct AzureDocumentAnalyzer {
    /// Shared HTTP client.
    http: reqwest::Client,

    /// Our credentials, or the reason we don't have any. We keep the error
    /// around so a server can start up and report it on each request.
    credentials: Result<AzureCredentials, CredentialsError>,

    /// Fallback delay between polls.
    poll_interval: Duration,
}

impl AzureDocumentAnalyzer {
    /// Create a new analyzer.
    pub fn new(
        credentials: Result<AzureCredentials, CredentialsError>,
        poll_interval: Duration,
    ) -> Self {
        Self {
            http: reqwest::Client::new(),
            credentials,
            poll_interval,
        }
    }

    /// Create a new analyzer using credentials from the environment. Missing
    /// credentials are logged here, and reported again by every call to
    /// [`DocumentAnalyzer::analyze`].
    pub fn from_env(poll_interval: Duration) -> Self {
        let credentials = AzureCredentials::from_env();
        match &credentials {
            Ok(creds) => info!(endpoint = %creds.endpoint, "Using Document Intelligence"),
            Err(err) => error!("{err}"),
        }
        Self::new(credentials, poll_interval)
    }

    /// Poll an operation until it reaches a terminal state.
    async fn wait_for_operation(
        &self,
        creds: &AzureCredentials,
        operation_url: &str,
    ) -> Result<AnalyzeResult> {
        let mut polls = 0usize;
        loop {
            polls += 1;
            let response = self
                .http
                .get(operation_url)
                .header(KEY_HEADER, &creds.key)
                .send()
                .await
                .context("Failed to poll analyze operation")?;
            if !response.status().is_success() {
                return Err(RemoteError::from_response(response).await.into());
            }
            let delay = retry_after(response.headers()).unwrap_or(self.poll_interval);
            let operation = response
                .json::<AnalyzeOperation>()
                .await
                .context("Failed to parse analyze operation status")?;

            match operation.status {
                OperationStatus::Succeeded => {
                    debug!(polls, "Analyze operation succeeded");
                    return operation.analyze_result.ok_or_else(|| {
                        anyhow!("Analyze operation succeeded without a result")
                    });
                }
                OperationStatus::Failed | OperationStatus::Canceled => {
                    let detail = operation.error.unwrap_or_else(|| ErrorDetail {
                        code: format!("{:?}", operation.status),
                        message: "analyze operation did not complete".to_owned(),
                    });
                    return Err(RemoteError {
                        status: None,
                        code: detail.code,
                        message: detail.message,
                    }
                    .into());
                }
                OperationStatus::NotStarted | OperationStatus::Running => {
                    trace!(polls, ?delay, status = ?operation.status, "Waiting");
                    time::sleep(delay).await;
                }
            }
        }
    }
}

#[async_trait]
impl DocumentAnalyzer for AzureDocumentAnalyzer {
    #[instrument(level = "debug", skip_all, fields(model = %request.model))]
    async fn analyze(&self, request: AnalysisRequest) -> Result<AnalyzeResult> {
        let creds = self.credentials.as_ref().map_err(|err| err.clone())?;
        let bytes = request.document.into_bytes().await?;

        // The service sniffs the type too, but wants a real one for images.
        let content_type = infer::get(&bytes)
            .map(|kind| kind.mime_type())
            .unwrap_or("application/octet-stream");
        debug!(len = bytes.len(), %content_type, "Submitting document");

        let url = format!(
            "{}/documentintelligence/documentModels/{}:analyze",
            creds.endpoint,
            request.model.service_model()
        );
        let mut query = vec![("api-version", creds.api_version.clone())];
        let features = request.model.features();
        if !features.is_empty() {
            query.push(("features", features.join(",")));
        }
        let response = self
            .http
            .post(&url)
            .query(&query)
            .header(KEY_HEADER, &creds.key)
            .header(CONTENT_TYPE, content_type)
            .body(bytes)
            .send()
            .await
            .context("Failed to submit document for analysis")?;
        if !response.status().is_success() {
            return Err(RemoteError::from_response(response).await.into());
        }

        let operation_url = response
            .headers()
            .get(OPERATION_LOCATION_HEADER)
            .and_then(|value| value.to_str().ok())
            .ok_or_else(|| anyhow!("Analyze response had no Operation-Location header"))?
            .to_owned();
        debug!(%operation_url, "Analyze operation accepted");

        self.wait_for_operation(creds, &operation_url).await
    }
}

/// Parse a `retry-after` header given in seconds.
fn retry_after(headers: &HeaderMap) -> Option<Duration> {
    let secs = headers.get(RETRY_AFTER)?.to_str().ok()?.trim().parse().ok()?;
    Some(Duration::from_secs(secs))
}

/// Status of a long-running analyze operation.
#[derive(Clone, Copy, Debug, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
enum OperationStatus {
    NotStarted,
    Running,
    Succeeded,
    Failed,
    Canceled,
}

/// Body returned when polling an operation.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AnalyzeOperation {
    status: OperationStatus,
    #[serde(default)]
    error: Option<ErrorDetail>,
    #[serde(default)]
    analyze_result: Option<AnalyzeResult>,
}

/// Error body returned by the service.
#[derive(Debug, Deserialize)]
struct ErrorResponse {
    error: ErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ErrorDetail {
    #[serde(default)]
    code: String,
    #[serde(default)]
    message: String,
}

/// The remote service rejected a request or a job failed.
#[derive(Debug)]
pub struct RemoteError {
    /// HTTP status, if the failure was an HTTP error rather than a failed job.
    pub status: Option<StatusCode>,

    /// Service error code, such as `InvalidRequest`.
    pub code: String,

    /// Human-readable message from the service.
    pub message: String,
}

impl RemoteError {
    /// Build an error from a non-success HTTP response.
    async fn from_response(response: reqwest::Response) -> Self {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        match serde_json::from_str::<ErrorResponse>(&body) {
            Ok(ErrorResponse { error }) => Self {
                status: Some(status),
                code: error.code,
                message: error.message,
            },
            Err(_) => Self {
                status: Some(status),
                code: status.as_str().to_owned(),
                message: body.chars().take(500).collect(),
            },
        }
    }
}

impl fmt::Display for RemoteError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.status {
            Some(status) => write!(
                f,
                "Document Intelligence error (status {status}) {}: {}",
                self.code, self.message
            ),
            None => write!(
                f,
                "Document Intelligence operation failed {}: {}",
                self.code, self.message
            ),
        }
    }
}

impl error::Error for RemoteError {}
