//! Typed errors and HTTP mapping.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("missing reference: {kind} '{id}'")]
    MissingReference { kind: &'static str, id: String },
    #[error("unknown column: table {table_id} column {column}")]
    UnknownColumn { table_id: String, column: String },
    #[error("invalid include '{token}' on resource {resource}: {reason}")]
    InvalidIncludePath {
        resource: String,
        token: String,
        reason: String,
    },
    #[error("duplicate {kind}: {id}")]
    Duplicate { kind: &'static str, id: String },
    #[error("unsafe identifier: {0}")]
    UnsafeIdentifier(String),
    #[error("config load: {0}")]
    Load(String),
    #[error("validation: {0}")]
    Validation(String),
}

#[derive(Error, Debug)]
pub enum AppError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("invalid include for {resource}: '{token}'")]
    InvalidInclude { resource: String, token: String },
    #[error("pagination out of range: {0}")]
    PaginationRange(String),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("multiple results for lookup: {0}")]
    MultipleResults(String),
    #[error("bad request: {0}")]
    BadRequest(String),
    #[error("database: {0}")]
    Db(#[from] sqlx::Error),
}

impl AppError {
    /// Client errors are the caller's fault and are never retried server side.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            AppError::InvalidInclude { .. }
                | AppError::PaginationRange(_)
                | AppError::NotFound(_)
                | AppError::BadRequest(_)
        )
    }
}

#[derive(Serialize)]
pub struct ErrorBody {
    pub error: ErrorDetail,
}

#[derive(Serialize)]
pub struct ErrorDetail {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code) = match &self {
            AppError::Config(_) => (StatusCode::INTERNAL_SERVER_ERROR, "config_error"),
            AppError::InvalidInclude { .. } => (StatusCode::BAD_REQUEST, "invalid_include"),
            AppError::PaginationRange(_) => (StatusCode::BAD_REQUEST, "pagination_range"),
            AppError::NotFound(_) => (StatusCode::NOT_FOUND, "not_found"),
            AppError::MultipleResults(_) => (StatusCode::INTERNAL_SERVER_ERROR, "multiple_results"),
            AppError::BadRequest(_) => (StatusCode::BAD_REQUEST, "bad_request"),
            AppError::Db(e) => {
                if let sqlx::Error::RowNotFound = e {
                    (StatusCode::NOT_FOUND, "not_found")
                } else {
                    (StatusCode::INTERNAL_SERVER_ERROR, "database_error")
                }
            }
        };
        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
        }
        let details = match &self {
            AppError::InvalidInclude { token, .. } => Some(serde_json::json!({ "include": token })),
            _ => None,
        };
        let body = ErrorBody {
            error: ErrorDetail {
                code: code.to_string(),
                message: self.to_string(),
                details,
            },
        };
        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_include_names_token() {
        let e = AppError::InvalidInclude {
            resource: "bills".into(),
            token: "bogus".into(),
        };
        assert!(e.to_string().contains("'bogus'"));
        assert!(e.is_client_error());
        assert_eq!(e.into_response().status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn store_failures_are_server_errors() {
        let e = AppError::Db(sqlx::Error::PoolTimedOut);
        assert!(!e.is_client_error());
        assert_eq!(e.into_response().status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn not_found_maps_to_404() {
        let e = AppError::NotFound("ocd-bill/x".into());
        assert_eq!(e.into_response().status(), StatusCode::NOT_FOUND);
    }
}
