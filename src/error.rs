// HTTP API Error Types
use axum::{
    extract::rejection::{JsonRejection, PathRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};

/// Client-facing error payload: `{statusCode, message, details}`
///
/// Built once per failure, either by the exception boundary on the server or
/// by the client when it receives a non-success response. Decoding goes
/// through the same checks as [`ApiError::new`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", try_from = "RawApiError")]
pub struct ApiError {
    pub status_code: u16,
    pub message: String,
    pub details: Option<String>,
}

/// Wire shape before validation
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawApiError {
    status_code: u16,
    #[serde(default)]
    message: String,
    #[serde(default)]
    details: Option<String>,
}

#[derive(Debug, thiserror::Error)]
#[error("statusCode {0} is not an HTTP status")]
pub struct InvalidStatusCode(u16);

impl TryFrom<RawApiError> for ApiError {
    type Error = InvalidStatusCode;

    fn try_from(raw: RawApiError) -> Result<Self, Self::Error> {
        let status = StatusCode::from_u16(raw.status_code)
            .ok()
            .filter(|status| status.as_u16() <= 599)
            .ok_or(InvalidStatusCode(raw.status_code))?;
        Ok(ApiError::new(status, raw.message, raw.details))
    }
}

impl ApiError {
    /// An empty message falls back to the status' canonical reason phrase.
    pub fn new(status: StatusCode, message: impl Into<String>, details: Option<String>) -> Self {
        let message = message.into();
        let message = if message.trim().is_empty() {
            reason_phrase(status).to_string()
        } else {
            message
        };

        Self {
            status_code: status.as_u16(),
            message,
            details,
        }
    }

    /// Error for a response whose body carried no ApiError (bare 401, proxies, ...)
    pub fn from_status(status: StatusCode) -> Self {
        Self::new(status, reason_phrase(status), None)
    }

    pub fn status(&self) -> StatusCode {
        StatusCode::from_u16(self.status_code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
    }
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {}", self.status_code, self.message)
    }
}

impl std::error::Error for ApiError {}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status(), Json(self)).into_response()
    }
}

pub fn reason_phrase(status: StatusCode) -> &'static str {
    status.canonical_reason().unwrap_or("Unknown Error")
}

/// Application failures raised by handlers.
///
/// Handlers return `Result<_, AppError>`; the exception boundary turns these
/// into [`ApiError`] bodies, so nothing below it formats client errors itself.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    // 400 Bad Request
    #[error("{message}")]
    BadRequest {
        message: String,
        details: Option<String>,
    },

    // 401 Unauthorized
    #[error("{0}")]
    Unauthorized(String),

    // 403 Forbidden
    #[error("{0}")]
    Forbidden(String),

    // 404 Not Found
    #[error("{0}")]
    NotFound(String),

    // 409 Conflict
    #[error("{0}")]
    Conflict(String),

    // 500 Internal Server Error
    #[error("{0:#}")]
    Internal(#[from] anyhow::Error),

    #[error("Database error: {0}")]
    Database(#[source] sqlx::Error),

    // 503 Service Unavailable
    #[error("{0}")]
    ServiceUnavailable(String),
}

impl AppError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        AppError::BadRequest {
            message: message.into(),
            details: None,
        }
    }

    pub fn validation(message: impl Into<String>, details: impl Into<String>) -> Self {
        AppError::BadRequest {
            message: message.into(),
            details: Some(details.into()),
        }
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        AppError::Unauthorized(message.into())
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        AppError::Forbidden(message.into())
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        AppError::NotFound(message.into())
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        AppError::Conflict(message.into())
    }

    pub fn service_unavailable(message: impl Into<String>) -> Self {
        AppError::ServiceUnavailable(message.into())
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::BadRequest { .. } => StatusCode::BAD_REQUEST,
            AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AppError::Forbidden(_) => StatusCode::FORBIDDEN,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::Database(sqlx::Error::RowNotFound) => StatusCode::NOT_FOUND,
            AppError::Internal(_) | AppError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::ServiceUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
        }
    }

    /// Diagnostic text for non-production responses.
    pub fn details(&self) -> Option<String> {
        match self {
            AppError::BadRequest { details, .. } => details.clone(),
            AppError::Internal(err) => Some(format!("{err:?}")),
            AppError::Database(err) => Some(format!("{err:?}")),
            _ => None,
        }
    }

    pub fn into_fault(self) -> Fault {
        Fault {
            status: self.status_code(),
            message: self.to_string(),
            details: self.details(),
        }
    }
}

/// A caught failure, before it is rendered for a particular environment.
///
/// `AppError` responses carry one in their extensions so the exception
/// boundary can re-render them with or without details.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fault {
    pub status: StatusCode,
    pub message: String,
    pub details: Option<String>,
}

impl Fault {
    pub fn from_panic(payload: &(dyn std::any::Any + Send)) -> Self {
        let message = if let Some(s) = payload.downcast_ref::<&str>() {
            (*s).to_string()
        } else if let Some(s) = payload.downcast_ref::<String>() {
            s.clone()
        } else {
            "handler panicked".to_string()
        };

        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            details: Some(format!("panic: {message}")),
            message,
        }
    }

    /// Production hides details always, and the message of server-side faults.
    pub fn to_api_error(&self, production: bool) -> ApiError {
        if production {
            let message = if self.status.is_server_error() {
                reason_phrase(self.status).to_string()
            } else {
                self.message.clone()
            };
            ApiError::new(self.status, message, None)
        } else {
            ApiError::new(self.status, self.message.clone(), self.details.clone())
        }
    }
}

// Unique-constraint failures are a conflict with existing data, not a server fault
impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        match err.as_database_error() {
            Some(db) if db.is_unique_violation() => {
                AppError::Conflict("Resource already exists".to_string())
            }
            _ => AppError::Database(err),
        }
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::validation("Invalid request body", rejection.body_text())
    }
}

impl From<PathRejection> for AppError {
    fn from(rejection: PathRejection) -> Self {
        AppError::validation("Invalid route parameter", rejection.body_text())
    }
}

// Automatic HTTP response conversion for Axum. The body is production-safe on
// its own; the boundary replaces it when it sees the fault extension.
impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let fault = self.into_fault();
        let mut response = fault.to_api_error(true).into_response();
        response.extensions_mut().insert(fault);
        response
    }
}
