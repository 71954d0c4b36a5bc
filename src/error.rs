//! Error type shared by storage, the post manager and the HTTP layer.

use std::path::PathBuf;

use actix_web::{http::StatusCode, HttpResponse, ResponseError};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// JSON body returned for every failed request.
#[derive(Debug, Deserialize, Serialize)]
pub struct ApiError {
    pub error: String,
}

#[derive(Error, Debug)]
pub enum Error {
    /// Reading or writing the posts file failed.
    #[error("failed to access {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Missing fields: {}", .0.join(", "))]
    MissingFields(Vec<&'static str>),

    #[error("Invalid JSON format")]
    InvalidJson,

    #[error("Content-Type must be application/json")]
    ContentType,

    #[error("Invalid query string: {0}")]
    InvalidQuery(String),

    #[error("Invalid sort field '{0}'. Valid fields: title, content, author, created_at")]
    InvalidSort(String),

    #[error("Invalid sort direction '{0}'. Use 'asc' or 'desc'")]
    InvalidDirection(String),

    #[error("There is no post with id {id}.")]
    NotFound { id: u64 },

    #[error("failed to render page: {0}")]
    Render(#[from] askama::Error),

    #[error("internal error: {0}")]
    Internal(String),
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    /// Whether the caller can fix this by changing the request.
    #[must_use]
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            Self::MissingFields(_)
                | Self::InvalidJson
                | Self::ContentType
                | Self::InvalidQuery(_)
                | Self::InvalidSort(_)
                | Self::InvalidDirection(_)
                | Self::NotFound { .. }
        )
    }
}

impl ResponseError for Error {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::MissingFields(_)
            | Self::InvalidJson
            | Self::InvalidQuery(_)
            | Self::InvalidSort(_)
            | Self::InvalidDirection(_) => StatusCode::BAD_REQUEST,
            Self::ContentType => StatusCode::UNSUPPORTED_MEDIA_TYPE,
            Self::NotFound { .. } => StatusCode::NOT_FOUND,
            Self::Io { .. } | Self::Json(_) | Self::Render(_) | Self::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    fn error_response(&self) -> HttpResponse {
        let error = if self.is_client_error() {
            self.to_string()
        } else {
            tracing::error!(error = %self, "request failed");
            String::from("Internal server error")
        };
        HttpResponse::build(self.status_code()).json(ApiError { error })
    }
}
