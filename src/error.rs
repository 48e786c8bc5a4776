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
    #[error("invalid identifier: {kind} '{name}'")]
    InvalidIdentifier { kind: &'static str, name: String },
    #[error("invalid setting {name}: {value}")]
    InvalidSetting { name: &'static str, value: String },
    #[error("validation: {0}")]
    Validation(String),
}

#[derive(Error, Debug)]
pub enum AppError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("database: {0}")]
    Db(#[from] sqlx::Error),
    #[error("bad request: {0}")]
    BadRequest(String),
    /// Unrecoverable routing failure: the resolved controller cannot run the action.
    #[error("dispatch: controller '{controller}' has no action '{action}'")]
    MissingAction { controller: String, action: String },
    #[error("dispatch: no controller registered as '{0}'")]
    MissingController(String),
    #[error("query: {0}")]
    Query(String),
    #[error("io: {0}")]
    Io(#[from] std::io::Error),
    #[error("password hash: {0}")]
    Password(#[from] bcrypt::BcryptError),
    #[error("background task: {0}")]
    Task(#[from] tokio::task::JoinError),
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
            AppError::Db(e) => {
                if let sqlx::Error::RowNotFound = e {
                    (StatusCode::NOT_FOUND, "not_found")
                } else {
                    (StatusCode::INTERNAL_SERVER_ERROR, "database_error")
                }
            }
            AppError::BadRequest(_) => (StatusCode::BAD_REQUEST, "bad_request"),
            AppError::MissingAction { .. } | AppError::MissingController(_) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "dispatch_error")
            }
            AppError::Query(_) => (StatusCode::INTERNAL_SERVER_ERROR, "query_error"),
            AppError::Io(_) => (StatusCode::INTERNAL_SERVER_ERROR, "io_error"),
            AppError::Password(_) => (StatusCode::INTERNAL_SERVER_ERROR, "password_error"),
            AppError::Task(_) => (StatusCode::INTERNAL_SERVER_ERROR, "task_error"),
        };
        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
        }
        let body = ErrorBody {
            error: ErrorDetail {
                code: code.to_string(),
                message: self.to_string(),
                details: None,
            },
        };
        (status, Json(body)).into_response()
    }
}
