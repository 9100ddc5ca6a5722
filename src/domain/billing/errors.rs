//! Billing error types with HTTP status mapping.

use axum::http::StatusCode;
use thiserror::Error;

use crate::domain::foundation::{DomainError, ErrorCode};

/// Errors surfaced by billing commands and queries.
///
/// The edge layer maps these onto transport status codes; the mapping is
/// part of the boundary contract.
#[derive(Debug, Error)]
pub enum BillingError {
    /// Bad or missing input (400).
    #[error("{0}")]
    Validation(String),

    /// No authenticated user on the request (401).
    #[error("Authentication required")]
    Unauthenticated,

    /// Referenced entity is absent (404).
    #[error("{0} not found")]
    NotFound(&'static str),

    /// Coupon failed validation; carries the user-facing reason (400).
    #[error("{0}")]
    CouponRejected(String),

    /// Product or user lacks the configuration this rail needs (400).
    #[error("{0}")]
    Misconfigured(String),

    /// Upstream rail failure; the provider message is preserved for
    /// operator diagnosis (500).
    #[error("Payment provider error: {0}")]
    Provider(String),

    /// Unexpected internal failure (500).
    #[error("Internal error: {0}")]
    Internal(String),
}

impl BillingError {
    /// Maps the error to the transport status code callers must return.
    pub fn status_code(&self) -> StatusCode {
        match self {
            BillingError::Validation(_)
            | BillingError::CouponRejected(_)
            | BillingError::Misconfigured(_) => StatusCode::BAD_REQUEST,
            BillingError::Unauthenticated => StatusCode::UNAUTHORIZED,
            BillingError::NotFound(_) => StatusCode::NOT_FOUND,
            BillingError::Provider(_) | BillingError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// Stable machine-readable code for the response body.
    pub fn code(&self) -> &'static str {
        match self {
            BillingError::Validation(_) => "VALIDATION_FAILED",
            BillingError::Unauthenticated => "AUTHENTICATION_REQUIRED",
            BillingError::NotFound(_) => "NOT_FOUND",
            BillingError::CouponRejected(_) => "COUPON_REJECTED",
            BillingError::Misconfigured(_) => "MISCONFIGURED",
            BillingError::Provider(_) => "PROVIDER_ERROR",
            BillingError::Internal(_) => "INTERNAL_ERROR",
        }
    }
}

impl From<DomainError> for BillingError {
    fn from(err: DomainError) -> Self {
        match err.code {
            ErrorCode::ProductNotFound => BillingError::NotFound("Product"),
            ErrorCode::CouponNotFound => BillingError::NotFound("Coupon"),
            ErrorCode::SubscriptionNotFound => BillingError::NotFound("Subscription"),
            ErrorCode::PaymentNotFound => BillingError::NotFound("Payment"),
            ErrorCode::UserNotFound => BillingError::NotFound("User"),
            ErrorCode::Unauthorized => BillingError::Unauthenticated,
            ErrorCode::ValidationFailed
            | ErrorCode::EmptyField
            | ErrorCode::OutOfRange
            | ErrorCode::InvalidFormat => BillingError::Validation(err.message),
            ErrorCode::RailMisconfigured => BillingError::Misconfigured(err.message),
            ErrorCode::RailError => BillingError::Provider(err.message),
            _ => BillingError::Internal(err.message),
        }
    }
}

/// Errors that occur during webhook processing.
///
/// Status codes drive provider retry behavior: signature failures and bad
/// payloads reject without retry; unknown referenced entities are dropped
/// with success so the provider stops retrying; only infrastructure
/// failures return 5xx.
#[derive(Debug, Error)]
pub enum WebhookError {
    /// Webhook signature verification failed.
    #[error("Invalid signature")]
    InvalidSignature,

    /// Webhook timestamp is outside the acceptable window.
    #[error("Timestamp out of range")]
    TimestampOutOfRange,

    /// Event timestamp is in the future beyond clock skew tolerance.
    #[error("Invalid timestamp")]
    InvalidTimestamp,

    /// Failed to parse payload or signature header.
    #[error("Parse error: {0}")]
    ParseError(String),

    /// Referenced payment intent could not be found; there is nothing to
    /// reconcile against.
    #[error("Payment not found")]
    PaymentNotFound,

    /// Event was intentionally dropped (not an error condition).
    #[error("Event ignored: {0}")]
    Ignored(String),

    /// Document store operation failed.
    #[error("Storage error: {0}")]
    Storage(String),
}

impl WebhookError {
    /// Maps the error to the status code returned to the provider.
    pub fn status_code(&self) -> StatusCode {
        match self {
            WebhookError::InvalidSignature
            | WebhookError::TimestampOutOfRange
            | WebhookError::InvalidTimestamp
            | WebhookError::ParseError(_) => StatusCode::BAD_REQUEST,
            WebhookError::PaymentNotFound => StatusCode::NOT_FOUND,
            WebhookError::Ignored(_) => StatusCode::OK,
            WebhookError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<DomainError> for WebhookError {
    fn from(err: DomainError) -> Self {
        WebhookError::Storage(err.to_string())
    }
}
