//! Translation of failures into HTTP responses.
//!
//! Every error body has the same shape:
//! `{"status": <code>, "code": "...", "description": "...", "errors": [...]}`.

use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

use crate::db::{DbError, DbErrorKind};

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error(transparent)]
    Db(#[from] DbError),
    /// The request itself is unusable (ill-formed id, unparseable date).
    #[error("{0}")]
    BadRequest(String),
    #[error("{0}")]
    NotFound(String),
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

pub fn status_for(kind: DbErrorKind) -> StatusCode {
    match kind {
        DbErrorKind::NotFound => StatusCode::NOT_FOUND,
        DbErrorKind::Validation => StatusCode::BAD_REQUEST,
        DbErrorKind::PermissionDenied => StatusCode::FORBIDDEN,
        DbErrorKind::Transient => StatusCode::SERVICE_UNAVAILABLE,
        DbErrorKind::Unknown => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Db(e) => status_for(e.kind),
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = match self {
            ApiError::Db(e) => {
                match e.kind {
                    DbErrorKind::Unknown => tracing::error!("Database error: {}", e),
                    _ => tracing::warn!("Database error ({}): {}", status, e),
                }
                json!({
                    "status": status.as_u16(),
                    "code": e.code,
                    "description": e.description,
                    "errors": e.errors,
                })
            }
            ApiError::BadRequest(description) => json!({
                "status": status.as_u16(),
                "code": "invalid argument",
                "description": description,
                "errors": [],
            }),
            ApiError::NotFound(description) => json!({
                "status": status.as_u16(),
                "code": "not found",
                "description": description,
                "errors": [],
            }),
        };
        (status, Json(body)).into_response()
    }
}
