use axum::{
    Json,
    body::Bytes,
    extract::{Multipart, State, multipart::MultipartRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use log::{debug, error, warn};
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;

use crate::app_controller::{ParseResponse, TranslateResponse};
use crate::errors::{AppError, EntryFailure, ErrorKind, ValidationError};

use super::AppState;

/// Multipart field carrying the uploaded subtitle file
pub const FILE_FIELD: &str = "subtitleFile";

/// Structured error body
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: String,
    pub kind: ErrorKind,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub failures: Vec<EntryFailure>,
}

/// HTTP error type
#[derive(Debug)]
pub struct HttpError {
    status: StatusCode,
    body: ErrorBody,
}

impl HttpError {
    pub fn new(status: StatusCode, kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            status,
            body: ErrorBody {
                error: message.into(),
                kind,
                failures: Vec::new(),
            },
        }
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }
}

/// Status code for an application error
pub fn status_for(error: &AppError) -> StatusCode {
    match error.kind() {
        ErrorKind::MissingInput | ErrorKind::Parse | ErrorKind::Validation => StatusCode::BAD_REQUEST,
        ErrorKind::TranslationProvider => {
            let failures = error.failures();
            if !failures.is_empty() && failures.iter().all(|f| f.kind == "RateLimited") {
                StatusCode::SERVICE_UNAVAILABLE
            } else {
                StatusCode::BAD_GATEWAY
            }
        }
        ErrorKind::Internal => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl From<AppError> for HttpError {
    fn from(err: AppError) -> Self {
        let status = status_for(&err);
        if status.is_server_error() {
            error!("Request failed: {}", err);
        } else {
            debug!("Rejected request: {}", err);
        }

        Self {
            status,
            body: ErrorBody {
                error: err.to_string(),
                kind: err.kind(),
                failures: err.failures().to_vec(),
            },
        }
    }
}

impl IntoResponse for HttpError {
    fn into_response(self) -> Response {
        (self.status, Json(self.body)).into_response()
    }
}

/// Health check endpoint
pub async fn health_check() -> &'static str {
    "OK"
}

/// Parse an uploaded subtitle file
pub async fn parse_subtitle(
    State(state): State<Arc<AppState>>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<ParseResponse>, HttpError> {
    let payload = match multipart {
        Ok(multipart) => read_file_field(multipart).await?,
        Err(rejection) => {
            debug!("Upload is not multipart: {}", rejection);
            None
        }
    };

    let response = state.controller.parse_subtitles(payload.as_deref())?;
    Ok(Json(response))
}

/// Collect the bytes of the file field, `None` when the form has no such field
async fn read_file_field(mut multipart: Multipart) -> Result<Option<Vec<u8>>, HttpError> {
    loop {
        let field = match multipart.next_field().await {
            Ok(Some(field)) => field,
            Ok(None) => return Ok(None),
            Err(e) => {
                warn!("Failed to read upload: {}", e);
                return Err(HttpError::new(e.status(), ErrorKind::Validation, e.body_text()));
            }
        };

        if field.name() != Some(FILE_FIELD) {
            continue;
        }

        debug!("Receiving upload {:?}", field.file_name());
        let bytes = field
            .bytes()
            .await
            .map_err(|e| HttpError::new(e.status(), ErrorKind::Validation, e.body_text()))?;
        return Ok(Some(bytes.to_vec()));
    }
}

/// Translate a batch of subtitle entries
pub async fn translate_subtitles(
    State(state): State<Arc<AppState>>,
    body: Bytes,
) -> Result<Json<TranslateResponse>, HttpError> {
    let value: Value = serde_json::from_slice(&body).map_err(|e| {
        AppError::from(ValidationError::new(format!("Missing or invalid parameters: {}", e)))
    })?;

    let response = state.controller.translate_subtitles(&value).await?;
    Ok(Json(response))
}
