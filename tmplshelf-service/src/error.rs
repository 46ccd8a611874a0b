use axum::extract::rejection::{PathRejection, QueryRejection};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use serde_json::{json, Value};
use tmplshelf_core::TemplateError;

#[derive(Debug, Serialize)]
pub struct ErrorEnvelope {
    pub error: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Value>,
}

impl ErrorEnvelope {
    pub fn new(error: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            message: message.into(),
            details: None,
        }
    }

    pub fn with_details(mut self, details: Value) -> Self {
        self.details = Some(details);
        self
    }
}

#[derive(Debug)]
pub struct AppError {
    pub status: StatusCode,
    pub body: ErrorEnvelope,
}

impl AppError {
    pub fn new(status: StatusCode, code: &str, message: impl Into<String>) -> Self {
        Self {
            status,
            body: ErrorEnvelope::new(code, message),
        }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, "not_found", message)
    }

    pub fn method_not_allowed(message: impl Into<String>) -> Self {
        Self::new(StatusCode::METHOD_NOT_ALLOWED, "method_not_allowed", message)
    }

    /// Lazy build on a read request failed.
    pub fn index_build(err: TemplateError) -> Self {
        Self::new(
            StatusCode::INTERNAL_SERVER_ERROR,
            "index_build_failed",
            err.to_string(),
        )
    }

    /// Explicit POST /refresh failed; the previous index stays published.
    pub fn refresh(err: TemplateError) -> Self {
        Self::new(
            StatusCode::INTERNAL_SERVER_ERROR,
            "refresh_failed",
            err.to_string(),
        )
    }

    pub fn list(msg: impl std::fmt::Display) -> Self {
        Self::new(
            StatusCode::INTERNAL_SERVER_ERROR,
            "list_failed",
            msg.to_string(),
        )
    }

    pub fn read(msg: impl std::fmt::Display) -> Self {
        Self::new(
            StatusCode::INTERNAL_SERVER_ERROR,
            "read_failed",
            msg.to_string(),
        )
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        if self.status.is_server_error() {
            tracing::warn!(code = %self.body.error, message = %self.body.message, "request failed");
        }
        (self.status, axum::Json(self.body)).into_response()
    }
}

impl From<TemplateError> for AppError {
    fn from(err: TemplateError) -> Self {
        let status = match &err {
            TemplateError::InvalidId(_)
            | TemplateError::InvalidPath(_)
            | TemplateError::MissingIdentifier
            | TemplateError::Ambiguous { .. } => StatusCode::BAD_REQUEST,
            TemplateError::NotFound(_) => StatusCode::NOT_FOUND,
            TemplateError::IndexBuild { .. }
            | TemplateError::Io(_)
            | TemplateError::ConfigParse(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let mut body = ErrorEnvelope::new(err.code(), err.to_string());
        if let TemplateError::Ambiguous { matches, .. } = &err {
            body = body.with_details(json!({ "matches": matches }));
        }

        Self { status, body }
    }
}

// Extractor failures (duplicate keys, bad percent-encoding) keep the JSON envelope.
impl From<QueryRejection> for AppError {
    fn from(rejection: QueryRejection) -> Self {
        Self::new(rejection.status(), "invalid_request", rejection.body_text())
    }
}

impl From<PathRejection> for AppError {
    fn from(rejection: PathRejection) -> Self {
        Self::new(rejection.status(), "invalid_request", rejection.body_text())
    }
}
