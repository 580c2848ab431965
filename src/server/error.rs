//! Mapping our errors to HTTP responses.

use axum::{
    Json,
    extract::{
        multipart::{MultipartError, MultipartRejection},
        rejection::QueryRejection,
    },
    http::StatusCode,
    response::{IntoResponse, Response},
};
use schemars::JsonSchema;

use crate::{config::CredentialsError, prelude::*};

/// Message returned for failures whose details we only log.
pub const GENERIC_ERROR_MESSAGE: &str =
    "An internal server error occurred during analysis.";

/// Body of every error response.
#[derive(Debug, Deserialize, JsonSchema, Serialize)]
pub struct ErrorResponse {
    /// Human-readable error message.
    pub error: String,
}

/// Errors returned by our handlers.
#[derive(Debug)]
pub enum ApiError {
    /// Bad or missing upload. The message is shown to the caller.
    BadRequest(String),

    /// The multipart body itself couldn't be read (malformed, too large).
    Multipart(MultipartError),

    /// Analysis failed. Only configuration problems are described to the
    /// caller; everything else is logged and replaced with
    /// [`GENERIC_ERROR_MESSAGE`].
    Analysis(anyhow::Error),
}

impl ApiError {
    pub fn bad_request(msg: impl Into<String>) -> Self {
        ApiError::BadRequest(msg.into())
    }
}

impl From<anyhow::Error> for ApiError {
    fn from(err: anyhow::Error) -> Self {
        ApiError::Analysis(err)
    }
}

// Extractor rejections happen before our handlers run, so we take them as
// `Result`s and convert them here to keep every error body JSON.
impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

impl From<MultipartRejection> for ApiError {
    fn from(rejection: MultipartRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

impl From<MultipartError> for ApiError {
    fn from(err: MultipartError) -> Self {
        ApiError::Multipart(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error) = match self {
            ApiError::BadRequest(msg) => {
                warn!("Rejected upload: {msg}");
                (StatusCode::BAD_REQUEST, msg)
            }
            ApiError::Multipart(err) => {
                warn!("Could not read multipart body: {err}");
                (err.status(), err.body_text())
            }
            ApiError::Analysis(err) => {
                if let Some(creds_err) = err.downcast_ref::<CredentialsError>() {
                    error!("Configuration error: {creds_err}");
                    (StatusCode::INTERNAL_SERVER_ERROR, creds_err.to_string())
                } else {
                    error!("An error occurred during analysis: {err:?}");
                    (
                        StatusCode::INTERNAL_SERVER_ERROR,
                        GENERIC_ERROR_MESSAGE.to_owned(),
                    )
                }
            }
        };
        (status, Json(ErrorResponse { error })).into_response()
    }
}
