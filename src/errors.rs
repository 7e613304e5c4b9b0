use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::error::DbErr;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Domain-level failures of the coupon engine, mirrored one-to-one onto the
/// conditions checkout has to distinguish.
#[derive(Debug, Clone, PartialEq, thiserror::Error, Serialize)]
pub enum CouponError {
    #[error("Coupon not found")]
    NotFound,

    #[error("Coupon is not active")]
    Inactive,

    #[error("Coupon is not active yet")]
    NotYetStarted,

    #[error("Coupon has expired")]
    Expired,

    #[error("This coupon just reached its usage limit")]
    LimitReached,

    #[error("You have already used this coupon the maximum number of times")]
    PerUserLimitReached,

    #[error("Order total is {shortfall} below the coupon minimum purchase")]
    BelowMinimumPurchase { shortfall: Decimal },

    #[error("Order is not eligible for this coupon: {0}")]
    IneligibleOrder(String),

    #[error("Vendors may only manage their own coupons")]
    OwnershipViolation,

    #[error("This coupon just reached its usage limit")]
    ConcurrentLimitRace,
}

impl CouponError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::NotFound => StatusCode::NOT_FOUND,
            Self::OwnershipViolation => StatusCode::FORBIDDEN,
            // A lost atomic-update race is presented exactly like a limit
            // discovered at validation time, never as a server error.
            Self::LimitReached | Self::ConcurrentLimitRace | Self::PerUserLimitReached => {
                StatusCode::CONFLICT
            }
            Self::Inactive
            | Self::NotYetStarted
            | Self::Expired
            | Self::BelowMinimumPurchase { .. }
            | Self::IneligibleOrder(_) => StatusCode::UNPROCESSABLE_ENTITY,
        }
    }
}

#[derive(Debug, thiserror::Error, Serialize)]
pub enum ServiceError {
    #[error("Database error: {0}")]
    DatabaseError(
        #[from]
        #[serde(skip)]
        DbErr,
    ),

    #[error(transparent)]
    Coupon(#[from] CouponError),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Invalid operation: {0}")]
    InvalidOperation(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Event error: {0}")]
    EventError(String),

    #[error("Internal error: {0}")]
    InternalError(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Other error: {0}")]
    Other(
        #[from]
        #[serde(skip)]
        anyhow::Error,
    ),
}

impl From<validator::ValidationErrors> for ServiceError {
    fn from(err: validator::ValidationErrors) -> Self {
        ServiceError::ValidationError(err.to_string())
    }
}

impl ServiceError {
    /// Returns the HTTP status code for this error.
    /// This is the single source of truth for error-to-status mapping.
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::DatabaseError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Coupon(inner) => inner.status_code(),
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::ValidationError(_)
            | Self::InvalidOperation(_)
            | Self::InvalidInput(_)
            | Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Forbidden(_) => StatusCode::FORBIDDEN,
            Self::Conflict(_) => StatusCode::CONFLICT,
            Self::EventError(_) | Self::InternalError(_) | Self::Other(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// Returns the error message suitable for HTTP responses.
    /// Internal errors return generic messages to avoid leaking implementation details.
    pub fn response_message(&self) -> String {
        match self {
            Self::DatabaseError(_) => "Database error".to_string(),
            Self::EventError(_) | Self::InternalError(_) | Self::Other(_) => {
                "Internal server error".to_string()
            }
            _ => self.to_string(),
        }
    }
}

/// Error payload returned by every endpoint on failure.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ErrorResponse {
    /// HTTP status category (e.g., "Not Found", "Conflict")
    pub error: String,
    /// Human-readable error description
    pub message: String,
    /// ISO 8601 timestamp when the error occurred
    pub timestamp: String,
}

impl IntoResponse for ServiceError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = ErrorResponse {
            error: status
                .canonical_reason()
                .unwrap_or("Unknown Error")
                .to_string(),
            message: self.response_message(),
            timestamp: Utc::now().to_rfc3339(),
        };

        if status.is_server_error() {
            tracing::error!(status = status.as_u16(), error = %self, "request failed");
        } else {
            tracing::debug!(status = status.as_u16(), error = %self, "request rejected");
        }

        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn race_and_limit_map_to_same_status() {
        assert_eq!(
            ServiceError::from(CouponError::ConcurrentLimitRace).status_code(),
            ServiceError::from(CouponError::LimitReached).status_code(),
        );
    }

    #[test]
    fn race_message_names_the_limit_not_a_server_error() {
        let err = ServiceError::from(CouponError::ConcurrentLimitRace);
        assert!(err.response_message().contains("usage limit"));
        assert!(!err.status_code().is_server_error());
    }

    #[test]
    fn ownership_violation_is_forbidden() {
        assert_eq!(
            ServiceError::from(CouponError::OwnershipViolation).status_code(),
            StatusCode::FORBIDDEN
        );
    }
}
