// src/error.rs

use actix_web::{http::StatusCode, HttpResponse, ResponseError};
use log::error;
use serde_json::json;
use thiserror::Error;

use crate::repository::RepoError;

/// Every failure a handler can surface to the caller.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Missing or malformed input, including enum violations.
    #[error("{0}")]
    Validation(String),

    #[error("Invalid login credentials")]
    InvalidCredentials,

    #[error("Please authenticate")]
    Unauthenticated,

    /// Absent, or owned by another user.
    #[error("Not found")]
    NotFound,

    #[error("{0}")]
    Internal(String),
}

impl ApiError {
    pub fn validation(msg: impl Into<String>) -> Self {
        ApiError::Validation(msg.into())
    }
}

impl ResponseError for ApiError {
    fn status_code(&self) -> StatusCode {
        match self {
            ApiError::Validation(_) | ApiError::InvalidCredentials => StatusCode::BAD_REQUEST,
            ApiError::Unauthenticated => StatusCode::UNAUTHORIZED,
            ApiError::NotFound => StatusCode::NOT_FOUND,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        match self {
            ApiError::NotFound => HttpResponse::NotFound().finish(),
            ApiError::Internal(detail) => {
                error!("Internal error: {}", detail);
                HttpResponse::InternalServerError().json(json!({ "error": detail }))
            }
            other => HttpResponse::build(other.status_code())
                .json(json!({ "error": other.to_string() })),
        }
    }
}

impl From<RepoError> for ApiError {
    fn from(err: RepoError) -> Self {
        match err {
            RepoError::Duplicate(_) => ApiError::validation("Email is already registered"),
            RepoError::Backend(msg) => ApiError::Internal(msg),
        }
    }
}

pub type ApiResult<T> = Result<T, ApiError>;
