//! Application error type for the HTTP surface.
//!
//! Every error renders as `{"error": CODE, "message": ...}` with the proper
//! status code. Engine errors never reach this type: rooms convert them into
//! INVALID_ACTION events and per-connection replies instead.

use actix_web::error::ResponseError;
use actix_web::http::StatusCode;
use actix_web::HttpResponse;
use serde::Serialize;
use thiserror::Error;
use tracing::error;

use crate::errors::ErrorCode;

#[derive(Serialize)]
struct ErrorBody {
    error: &'static str,
    message: String,
}

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Invalid JSON: {detail}")]
    InvalidJson { detail: String },
    #[error("Validation error: {detail}")]
    Validation { detail: String },
    #[error("Unauthorized: {detail}")]
    Unauthorized { detail: String },
    #[error("Room not found: {detail}")]
    RoomNotFound { detail: String },
    #[error("Room full: {detail}")]
    RoomFull { detail: String },
    #[error("Player not found: {detail}")]
    PlayerNotFound { detail: String },
    #[error("Database not ready: {detail}")]
    DbNotReady { detail: String },
    #[error("Internal error: {detail}")]
    Internal { detail: String },
}

impl AppError {
    pub fn invalid_json(detail: impl Into<String>) -> Self {
        Self::InvalidJson {
            detail: detail.into(),
        }
    }

    pub fn validation(detail: impl Into<String>) -> Self {
        Self::Validation {
            detail: detail.into(),
        }
    }

    pub fn unauthorized(detail: impl Into<String>) -> Self {
        Self::Unauthorized {
            detail: detail.into(),
        }
    }

    pub fn room_not_found(detail: impl Into<String>) -> Self {
        Self::RoomNotFound {
            detail: detail.into(),
        }
    }

    pub fn room_full(detail: impl Into<String>) -> Self {
        Self::RoomFull {
            detail: detail.into(),
        }
    }

    pub fn player_not_found(detail: impl Into<String>) -> Self {
        Self::PlayerNotFound {
            detail: detail.into(),
        }
    }

    pub fn db_not_ready(detail: impl Into<String>) -> Self {
        Self::DbNotReady {
            detail: detail.into(),
        }
    }

    pub fn internal(detail: impl Into<String>) -> Self {
        Self::Internal {
            detail: detail.into(),
        }
    }

    pub fn code(&self) -> ErrorCode {
        match self {
            AppError::InvalidJson { .. } => ErrorCode::InvalidJson,
            AppError::Validation { .. } => ErrorCode::InvalidInput,
            AppError::Unauthorized { .. } => ErrorCode::Unauthorized,
            AppError::RoomNotFound { .. } => ErrorCode::RoomNotFound,
            AppError::RoomFull { .. } => ErrorCode::RoomFull,
            AppError::PlayerNotFound { .. } => ErrorCode::PlayerNotFound,
            AppError::DbNotReady { .. } => ErrorCode::DbNotReady,
            AppError::Internal { .. } => ErrorCode::InternalError,
        }
    }

    fn detail(&self) -> String {
        match self {
            AppError::InvalidJson { detail }
            | AppError::Validation { detail }
            | AppError::Unauthorized { detail }
            | AppError::RoomNotFound { detail }
            | AppError::RoomFull { detail }
            | AppError::PlayerNotFound { detail }
            | AppError::DbNotReady { detail }
            | AppError::Internal { detail } => detail.clone(),
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            AppError::InvalidJson { .. } | AppError::Validation { .. } => StatusCode::BAD_REQUEST,
            AppError::Unauthorized { .. } => StatusCode::UNAUTHORIZED,
            AppError::RoomNotFound { .. } | AppError::PlayerNotFound { .. } => {
                StatusCode::NOT_FOUND
            }
            AppError::RoomFull { .. } => StatusCode::CONFLICT,
            AppError::DbNotReady { .. } | AppError::Internal { .. } => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl ResponseError for AppError {
    fn status_code(&self) -> StatusCode {
        self.status()
    }

    fn error_response(&self) -> HttpResponse {
        if self.status().is_server_error() {
            error!(code = %self.code(), detail = %self.detail(), "request failed");
        }
        HttpResponse::build(self.status()).json(ErrorBody {
            error: self.code().as_str(),
            message: self.detail(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn statuses_match_the_contract() {
        assert_eq!(AppError::invalid_json("x").status(), StatusCode::BAD_REQUEST);
        assert_eq!(AppError::validation("x").status(), StatusCode::BAD_REQUEST);
        assert_eq!(AppError::room_not_found("x").status(), StatusCode::NOT_FOUND);
        assert_eq!(AppError::room_full("x").status(), StatusCode::CONFLICT);
        assert_eq!(
            AppError::internal("x").status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn body_has_the_error_shape() {
        let response = AppError::room_full("all seats taken").error_response();
        assert_eq!(response.status(), StatusCode::CONFLICT);
    }
}
