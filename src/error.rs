use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use sea_orm::DbErr;
use serde_json::json;
use thiserror::Error;

use crate::booking::{BookingError, TicketViolation};

pub type AppResult<T> = Result<T, AppError>;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    BadRequest(String),

    #[error("order validation failed")]
    OrderValidation(Vec<TicketViolation>),

    #[error("{0}")]
    Unauthorized(String),

    #[error("{0}")]
    Forbidden(String),

    #[error("{0}")]
    Conflict(String),

    #[error("{0}")]
    Timeout(String),

    #[error("database error: {0}")]
    Database(#[from] DbErr),

    #[error("{0}")]
    Internal(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, body) = match self {
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, json!({ "error": msg })),
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, json!({ "error": msg })),
            AppError::OrderValidation(violations) => (
                StatusCode::BAD_REQUEST,
                json!({ "error": "Order validation failed", "violations": violations }),
            ),
            AppError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, json!({ "error": msg })),
            AppError::Forbidden(msg) => (StatusCode::FORBIDDEN, json!({ "error": msg })),
            AppError::Conflict(msg) => (StatusCode::CONFLICT, json!({ "error": msg })),
            AppError::Timeout(msg) => (StatusCode::SERVICE_UNAVAILABLE, json!({ "error": msg })),
            AppError::Database(err) => {
                tracing::error!("Database error: {}", err);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    json!({ "error": "Internal server error" }),
                )
            }
            AppError::Internal(msg) => {
                tracing::error!("Internal error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    json!({ "error": "Internal server error" }),
                )
            }
        };

        (status, Json(body)).into_response()
    }
}

impl From<BookingError> for AppError {
    fn from(err: BookingError) -> Self {
        match err {
            BookingError::EmptyOrder => {
                AppError::BadRequest("Order must contain at least one ticket".to_string())
            }
            BookingError::Invalid(violations) => AppError::OrderValidation(violations),
            BookingError::SeatTaken {
                journey,
                cargo,
                seat,
                ..
            } => AppError::Conflict(format!(
                "Seat {} in cargo {} on journey {} has just been taken",
                seat, cargo, journey
            )),
            BookingError::Database(err) => AppError::Database(err),
        }
    }
}
