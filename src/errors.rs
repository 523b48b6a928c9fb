use std::fmt;

use actix_web::{
    error::ResponseError,
    http::{header::ContentType, StatusCode},
    HttpResponse
};
use derive_more::Display;
use serde::Serialize;
use uuid::Uuid;
use validator::ValidationErrors;

#[derive(Debug, Clone, PartialEq)]
pub enum AppError {
    ValidationError(Vec<FieldError>),
    NotFound(String),
    Conflict(String),
    InvalidInput(String),
    InternalError(String),
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::ValidationError(errors) => {
                let messages = errors.iter()
                    .map(|e| format!("{}:{}", e.field, e.message))
                    .collect::<Vec<_>>()
                    .join(", ");
                write!(f, "validation error: {}", messages)
            }
            AppError::NotFound(msg) => write!(f, "Not found: {}", msg),
            AppError::Conflict(msg) => write!(f, "Conflict: {}", msg),
            AppError::InvalidInput(msg) => write!(f, "Invalid input: {}", msg),
            AppError::InternalError(msg) => write!(f, "Internal server error: {}", msg)
        }
    }
}

impl std::error::Error for AppError {}

impl ResponseError for AppError {
    fn error_response(&self) -> HttpResponse {
        let body = match self {
            AppError::ValidationError(errors) => {
                serde_json::json!({
                    "error": "Validation failed",
                    "details": errors
                })
            }
            _ => {
                serde_json::json!({"error": self.to_string()})
            }
        };
        HttpResponse::build(self.status_code())
            .insert_header(ContentType::json())
            .json(body)
    }

    fn status_code(&self) -> StatusCode {
        match self {
            AppError::ValidationError(_) => StatusCode::BAD_REQUEST,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::InvalidInput(_) => StatusCode::BAD_REQUEST,
            AppError::InternalError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<ValidationErrors> for AppError {
    fn from(errors: ValidationErrors) -> Self {
        let field_errors = errors
            .field_errors()
            .iter()
            .flat_map(|(field, errors)| {
                errors.iter().map(|e| FieldError {
                    field: field.to_string(),
                    message: e
                        .message
                        .as_ref()
                        .map(|s| s.to_string())
                        .unwrap_or_else(|| "Invalid value".to_string()),
                })
            })
            .collect();

        AppError::ValidationError(field_errors)
    }
}

impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => AppError::NotFound("Record not found".into()),
            sqlx::Error::Database(e) if e.is_unique_violation() => {
                AppError::Conflict("Database conflict occurred".into())
            }
            sqlx::Error::Database(e) if e.is_foreign_key_violation() => {
                AppError::NotFound("Owning location not found".into())
            }
            _ => AppError::InternalError(format!("Database error: {}", err))
        }
    }
}

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        AppError::InternalError(err.to_string())
    }
}

/// Failures of the remote photo search.
#[derive(Debug, Clone, PartialEq, Display)]
pub enum SearchError {
    #[display("Search request failed: {_0}")]
    Transport(String),

    #[display("Search returned HTTP status {_0}")]
    HttpStatus(u16),

    #[display("Malformed search response: {_0}")]
    MalformedResponse(String),

    #[display("Search rejected by API (code {code:?}): {message}")]
    ApiRejected {
        code: Option<i64>,
        message: String,
    },
}

impl std::error::Error for SearchError {}

impl From<reqwest::Error> for SearchError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            SearchError::MalformedResponse(err.to_string())
        } else if let Some(status) = err.status() {
            SearchError::HttpStatus(status.as_u16())
        } else {
            SearchError::Transport(err.to_string())
        }
    }
}

/// Failures while downloading image bytes.
#[derive(Debug, Clone, PartialEq, Display)]
pub enum FetchError {
    #[display("Image download failed: {_0}")]
    Transport(String),

    #[display("Image download returned HTTP status {_0}")]
    HttpStatus(u16),
}

impl std::error::Error for FetchError {}

impl From<reqwest::Error> for FetchError {
    fn from(err: reqwest::Error) -> Self {
        match err.status() {
            Some(status) => FetchError::HttpStatus(status.as_u16()),
            None => FetchError::Transport(err.to_string()),
        }
    }
}

/// Outcome errors of the photo album operations.
#[derive(Debug, Clone, PartialEq, Display)]
pub enum PhotoSetError {
    #[display("{_0}")]
    Search(SearchError),

    #[display("{_0}")]
    Fetch(FetchError),

    #[display("{_0}")]
    Store(AppError),

    #[display("Album for location {_0} has not been opened")]
    NotOpened(Uuid),

    #[display("Album for location {_0} is busy with another request")]
    Busy(Uuid),

    #[display("Album for location {_0} was closed before the search completed")]
    Superseded(Uuid),
}

impl std::error::Error for PhotoSetError {}

impl PhotoSetError {
    /// Whether repeating the same request may succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            PhotoSetError::Search(SearchError::ApiRejected { .. }) => false,
            PhotoSetError::Search(_) | PhotoSetError::Fetch(_) => true,
            PhotoSetError::Busy(_) | PhotoSetError::Superseded(_) => true,
            PhotoSetError::Store(AppError::InternalError(_)) => true,
            PhotoSetError::Store(_) | PhotoSetError::NotOpened(_) => false,
        }
    }

    fn kind(&self) -> &'static str {
        match self {
            PhotoSetError::Search(SearchError::Transport(_)) => "search_transport",
            PhotoSetError::Search(SearchError::HttpStatus(_)) => "search_http_status",
            PhotoSetError::Search(SearchError::MalformedResponse(_)) => "search_malformed_response",
            PhotoSetError::Search(SearchError::ApiRejected { .. }) => "search_api_rejected",
            PhotoSetError::Fetch(FetchError::Transport(_)) => "fetch_transport",
            PhotoSetError::Fetch(FetchError::HttpStatus(_)) => "fetch_http_status",
            PhotoSetError::Store(_) => "store",
            PhotoSetError::NotOpened(_) => "not_opened",
            PhotoSetError::Busy(_) => "busy",
            PhotoSetError::Superseded(_) => "superseded",
        }
    }
}

impl From<SearchError> for PhotoSetError {
    fn from(err: SearchError) -> Self {
        PhotoSetError::Search(err)
    }
}

impl From<FetchError> for PhotoSetError {
    fn from(err: FetchError) -> Self {
        PhotoSetError::Fetch(err)
    }
}

impl From<AppError> for PhotoSetError {
    fn from(err: AppError) -> Self {
        PhotoSetError::Store(err)
    }
}

impl ResponseError for PhotoSetError {
    fn error_response(&self) -> HttpResponse {
        if let PhotoSetError::Store(err) = self {
            return err.error_response();
        }
        HttpResponse::build(self.status_code())
            .json(serde_json::json!({
                "error": self.kind(),
                "message": self.to_string(),
                "retryable": self.is_retryable(),
            }))
    }

    fn status_code(&self) -> StatusCode {
        match self {
            PhotoSetError::Search(_) | PhotoSetError::Fetch(_) => StatusCode::BAD_GATEWAY,
            PhotoSetError::Store(err) => err.status_code(),
            PhotoSetError::NotOpened(_) => StatusCode::CONFLICT,
            PhotoSetError::Busy(_) => StatusCode::CONFLICT,
            PhotoSetError::Superseded(_) => StatusCode::CONFLICT,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}
