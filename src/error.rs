// Condo Expenses - Error Types
// Data-access code returns anyhow::Result; anything that reaches a client
// goes through AppError, which maps onto an HTTP status and a JSON body

use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;
use thiserror::Error;

/// Field-level validation messages, keyed by field name
///
/// Serializes as `{"amount": ["..."], "date": ["..."]}`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct FieldErrors(BTreeMap<String, Vec<String>>);

impl FieldErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, field: &str, message: impl Into<String>) {
        self.0
            .entry(field.to_string())
            .or_default()
            .push(message.into());
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn contains(&self, field: &str) -> bool {
        self.0.contains_key(field)
    }

    pub fn messages(&self, field: &str) -> &[String] {
        self.0.get(field).map(Vec::as_slice).unwrap_or(&[])
    }

    /// `Ok(value)` when no error was recorded
    pub fn into_result<T>(self, value: T) -> Result<T, AppError> {
        if self.is_empty() {
            Ok(value)
        } else {
            Err(AppError::Validation(self))
        }
    }
}

impl fmt::Display for FieldErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for (field, messages) in &self.0 {
            for message in messages {
                if !first {
                    write!(f, "; ")?;
                }
                write!(f, "{}: {}", field, message)?;
                first = false;
            }
        }
        Ok(())
    }
}

/// The main error type for request handling
#[derive(Error, Debug)]
pub enum AppError {
    /// One or more fields failed validation
    #[error("Validation error: {0}")]
    Validation(FieldErrors),

    /// Unknown id on retrieve/update/delete
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    /// Page number past the end of the listing (or not addressable)
    #[error("Invalid page: {0}")]
    InvalidPage(String),

    /// Unparseable request (malformed JSON, bad query string)
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Database or other unexpected failure
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    pub fn expense_not_found(id: impl fmt::Display) -> Self {
        Self::NotFound {
            entity: "Expense",
            id: id.to_string(),
        }
    }

    pub fn category_not_found(id: impl fmt::Display) -> Self {
        Self::NotFound {
            entity: "Category",
            id: id.to_string(),
        }
    }

    pub fn invalid_page(page: impl fmt::Display) -> Self {
        Self::InvalidPage(page.to_string())
    }
}

pub type AppResult<T> = Result<T, AppError>;

#[cfg(feature = "server")]
mod response {
    use super::AppError;
    use axum::http::StatusCode;
    use axum::response::{IntoResponse, Response};
    use axum::Json;
    use serde_json::json;

    impl IntoResponse for AppError {
        fn into_response(self) -> Response {
            match self {
                AppError::Validation(errors) => {
                    tracing::warn!(%errors, "request rejected by validation");
                    (StatusCode::BAD_REQUEST, Json(errors)).into_response()
                }
                AppError::NotFound { entity, id } => {
                    tracing::debug!(entity, id = %id, "not found");
                    (StatusCode::NOT_FOUND, Json(json!({ "detail": "Not found." }))).into_response()
                }
                AppError::InvalidPage(page) => {
                    tracing::debug!(page = %page, "page out of range");
                    (StatusCode::NOT_FOUND, Json(json!({ "detail": "Invalid page." }))).into_response()
                }
                AppError::BadRequest(message) => {
                    tracing::warn!(%message, "bad request");
                    (StatusCode::BAD_REQUEST, Json(json!({ "detail": message }))).into_response()
                }
                AppError::Internal(err) => {
                    tracing::error!(error = ?err, "internal server error");
                    (
                        StatusCode::INTERNAL_SERVER_ERROR,
                        Json(json!({ "detail": "Internal server error." })),
                    )
                        .into_response()
                }
            }
        }
    }
}
