// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Application error types with consistent API responses.
//!
//! Every error response carries a stable machine-readable kind in `error`
//! plus a human-readable `message`. Internal detail (database, processor)
//! is logged server-side and never sent to the client.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

/// Application error type that converts to HTTP responses.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("You do not have access to perform this action")]
    Forbidden,

    #[error("A verified identity is required to perform this action")]
    RequesterUnknown,

    #[error("The requested slot is already booked")]
    SlotTaken,

    #[error("Invalid slot: {0}")]
    InvalidSlot(String),

    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("A different payment is already attached to this appointment")]
    AlreadyPaid,

    #[error("Payment processor error: {0}")]
    ProcessorUnavailable(String),

    #[error("Invalid amount: {0}")]
    InvalidAmount(String),

    #[error("Missing required field: {0}")]
    MissingField(&'static str),

    #[error("Invalid request: {0}")]
    BadRequest(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Internal server error: {0}")]
    Internal(#[from] anyhow::Error),
}

/// JSON error response body
#[derive(Serialize)]
struct ErrorResponse {
    error: String,
    message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error, message) = match &self {
            AppError::Forbidden => (StatusCode::FORBIDDEN, "forbidden", self.to_string()),
            AppError::RequesterUnknown => {
                (StatusCode::FORBIDDEN, "requester_unknown", self.to_string())
            }
            AppError::SlotTaken => (StatusCode::CONFLICT, "slot_taken", self.to_string()),
            AppError::InvalidSlot(msg) => (StatusCode::BAD_REQUEST, "invalid_slot", msg.clone()),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, "not_found", msg.clone()),
            AppError::AlreadyPaid => (StatusCode::CONFLICT, "already_paid", self.to_string()),
            AppError::ProcessorUnavailable(msg) => {
                tracing::error!(error = %msg, "Payment processor unavailable");
                (
                    StatusCode::BAD_GATEWAY,
                    "processor_unavailable",
                    "The payment processor is currently unavailable".to_string(),
                )
            }
            AppError::InvalidAmount(msg) => {
                (StatusCode::BAD_REQUEST, "invalid_amount", msg.clone())
            }
            AppError::MissingField(_) => {
                (StatusCode::BAD_REQUEST, "missing_field", self.to_string())
            }
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "bad_request", msg.clone()),
            AppError::Database(msg) => {
                tracing::error!(error = %msg, "Database error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "database_error",
                    "An internal error occurred".to_string(),
                )
            }
            AppError::Internal(err) => {
                tracing::error!(error = %err, "Internal server error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal_error",
                    "An internal error occurred".to_string(),
                )
            }
        };

        let body = ErrorResponse {
            error: error.to_string(),
            message,
        };

        (status, Json(body)).into_response()
    }
}

/// Result type alias for handlers
pub type Result<T> = std::result::Result<T, AppError>;
