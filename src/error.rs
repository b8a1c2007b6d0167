use std::error::Error as StdError;

use axum::response::IntoResponse;
use axum::Json;
use hyper::StatusCode;
use serde::Serialize;
use tracing::error;

/// The closed set of error codes the HTTP surface promises.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ErrorCode {
    ValidationError,
    InvalidJson,
    InvalidUlid,
    PageSizeExceeded,
    CollectionNotFound,
    RecordNotFound,
    DuplicateCollection,
    MaxCollectionsReached,
    MaxColumnsReached,
    InternalError,
}

impl ErrorCode {
    fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::ValidationError => "VALIDATION_ERROR",
            ErrorCode::InvalidJson => "INVALID_JSON",
            ErrorCode::InvalidUlid => "INVALID_ULID",
            ErrorCode::PageSizeExceeded => "PAGE_SIZE_EXCEEDED",
            ErrorCode::CollectionNotFound => "COLLECTION_NOT_FOUND",
            ErrorCode::RecordNotFound => "RECORD_NOT_FOUND",
            ErrorCode::DuplicateCollection => "DUPLICATE_COLLECTION",
            ErrorCode::MaxCollectionsReached => "MAX_COLLECTIONS_REACHED",
            ErrorCode::MaxColumnsReached => "MAX_COLUMNS_REACHED",
            ErrorCode::InternalError => "INTERNAL_ERROR",
        }
    }
}

impl Serialize for &ErrorCode {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(self.as_str())
    }
}

#[derive(Debug, Serialize)]
struct ErrorEnvelope {
    error: String,
    code: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<serde_json::Value>,
}

/// Application errors that can be automatically turned into an appropriate
/// HTTP response: a four-kind taxonomy
/// (validation / not-found / conflict / internal),
/// each carrying the stable `code` the error envelope requires.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("{message}")]
    Validation {
        field: Option<String>,
        message: String,
    },

    #[error("{message}")]
    NotFound { code: ErrorCodeKind, message: String },

    #[error("{message}")]
    Conflict { code: ErrorCodeKind, message: String },

    #[error("database error")]
    Database(#[from] sqlx::Error),

    #[error("json serialization error")]
    Serde(#[from] serde_json::Error),

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

/// Distinguishes which specific code a not-found/conflict error maps to,
/// since both kinds cover more than one `ErrorCode`.
#[derive(Debug, Clone, Copy)]
pub enum ErrorCodeKind {
    CollectionNotFound,
    RecordNotFound,
    InvalidUlid,
    DuplicateCollection,
    MaxCollectionsReached,
    MaxColumnsReached,
}

impl AppError {
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        AppError::Validation {
            field: Some(field.into()),
            message: message.into(),
        }
    }

    pub fn validation_generic(message: impl Into<String>) -> Self {
        AppError::Validation {
            field: None,
            message: message.into(),
        }
    }

    pub fn invalid_json(message: impl Into<String>) -> Self {
        AppError::Validation {
            field: None,
            message: message.into(),
        }
    }

    pub fn invalid_ulid(value: impl std::fmt::Display) -> Self {
        AppError::NotFound {
            code: ErrorCodeKind::InvalidUlid,
            message: format!("'{value}' is not a valid ULID"),
        }
    }

    pub fn page_size_exceeded(limit: u32, max: u32) -> Self {
        AppError::Validation {
            field: Some("limit".into()),
            message: format!("limit {limit} exceeds max_page_size {max}"),
        }
    }

    pub fn collection_not_found(name: impl std::fmt::Display) -> Self {
        AppError::NotFound {
            code: ErrorCodeKind::CollectionNotFound,
            message: format!("collection '{name}' does not exist"),
        }
    }

    pub fn record_not_found(id: impl std::fmt::Display) -> Self {
        AppError::NotFound {
            code: ErrorCodeKind::RecordNotFound,
            message: format!("record '{id}' does not exist"),
        }
    }

    pub fn duplicate_collection(name: impl std::fmt::Display) -> Self {
        AppError::Conflict {
            code: ErrorCodeKind::DuplicateCollection,
            message: format!("collection '{name}' already exists"),
        }
    }

    pub fn max_collections_reached(max: usize) -> Self {
        AppError::Conflict {
            code: ErrorCodeKind::MaxCollectionsReached,
            message: format!("the maximum of {max} collections has been reached"),
        }
    }

    pub fn max_columns_reached(max: usize) -> Self {
        AppError::Conflict {
            code: ErrorCodeKind::MaxColumnsReached,
            message: format!("the maximum of {max} columns per collection has been reached"),
        }
    }

    fn code(&self) -> ErrorCode {
        match self {
            AppError::Validation { .. } => ErrorCode::ValidationError,
            AppError::NotFound { code, .. } => match code {
                ErrorCodeKind::CollectionNotFound => ErrorCode::CollectionNotFound,
                ErrorCodeKind::RecordNotFound => ErrorCode::RecordNotFound,
                ErrorCodeKind::InvalidUlid => ErrorCode::InvalidUlid,
                _ => ErrorCode::InternalError,
            },
            AppError::Conflict { code, .. } => match code {
                ErrorCodeKind::DuplicateCollection => ErrorCode::DuplicateCollection,
                ErrorCodeKind::MaxCollectionsReached => ErrorCode::MaxCollectionsReached,
                ErrorCodeKind::MaxColumnsReached => ErrorCode::MaxColumnsReached,
                _ => ErrorCode::InternalError,
            },
            AppError::Database(sqlx::Error::RowNotFound) => ErrorCode::RecordNotFound,
            AppError::Database(_) | AppError::Serde(_) | AppError::Internal(_) => {
                ErrorCode::InternalError
            }
        }
    }

    fn status(&self) -> StatusCode {
        match self {
            AppError::Validation { .. } => StatusCode::BAD_REQUEST,
            AppError::NotFound {
                code: ErrorCodeKind::InvalidUlid,
                ..
            } => StatusCode::BAD_REQUEST,
            AppError::NotFound { .. } => StatusCode::NOT_FOUND,
            AppError::Conflict { .. } => StatusCode::CONFLICT,
            AppError::Database(sqlx::Error::RowNotFound) => StatusCode::NOT_FOUND,
            AppError::Database(sqlx::Error::Database(e)) if e.code().is_some() => {
                StatusCode::CONFLICT
            }
            AppError::Database(_) | AppError::Serde(_) | AppError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    fn details(&self) -> Option<serde_json::Value> {
        match self {
            AppError::Validation {
                field: Some(field), ..
            } => Some(serde_json::json!({ "field": field })),
            _ => None,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        let status = self.status();
        let code = self.code();
        let details = self.details();

        if status.is_server_error() {
            error!(status = ?status, code = code.as_str(), message = %self, details = ?self.source());
        }

        let body = Json(ErrorEnvelope {
            error: self.to_string(),
            code: code.as_str(),
            details,
        });

        (status, body).into_response()
    }
}
