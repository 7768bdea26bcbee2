use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use thiserror::Error;
use uuid::Uuid;

use crate::models::actor::Role;
use crate::models::order::OrderStatus;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("order {0} not found")]
    OrderNotFound(Uuid),

    #[error("courier {0} not found")]
    CourierNotFound(Uuid),

    #[error("invalid transition from {from} to {to} as {role}")]
    InvalidTransition {
        from: OrderStatus,
        to: OrderStatus,
        role: Role,
    },

    #[error("unauthorized: {0}")]
    Unauthorized(String),

    #[error("invalid package size: {0}")]
    InvalidPackageSize(String),

    #[error("invalid distance: {0}")]
    InvalidDistance(f64),

    #[error("no couriers available")]
    NoCourierAvailable,

    #[error("invalid request: {0}")]
    Validation(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = match &self {
            AppError::OrderNotFound(_) | AppError::CourierNotFound(_) => StatusCode::NOT_FOUND,
            AppError::InvalidTransition { .. } => StatusCode::CONFLICT,
            AppError::Unauthorized(_) => StatusCode::FORBIDDEN,
            AppError::InvalidPackageSize(_)
            | AppError::InvalidDistance(_)
            | AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::NoCourierAvailable => StatusCode::SERVICE_UNAVAILABLE,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let body = Json(json!({
            "error": self.to_string()
        }));

        (status, body).into_response()
    }
}
