//! Error types for the relay service.
//!
//! This module defines the central `Error` enum, which captures every
//! reportable failure in the relay system. It implements [`IntoResponse`] so
//! handlers can return `Result<_, Error>` directly and have the failure
//! surfaced to the client with an appropriate status code and message.
//!
//! ## Error Cases
//! - `BadRequest`: The submitted form could not be decoded.
//! - `HandoffClosed`: The rendezvous channel lost its other side.
//! - `ServiceShutdown`: A request arrived while the service was shutting down.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};

pub type Result<T> = core::result::Result<T, Error>;

/// Unified error type for the relay service.
#[derive(Clone, thiserror::Error, Debug, PartialEq, Eq)]
pub enum Error {
    /// The client request was malformed.
    #[error("Bad request: {reason}")]
    BadRequest { reason: String },

    /// The handoff channel has no counterpart left to pair with.
    #[error("Handoff channel closed")]
    HandoffClosed,

    /// The service is in the process of shutting down.
    #[error("Service is shutting down")]
    ServiceShutdown,
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        match self {
            Error::BadRequest { reason } => (StatusCode::BAD_REQUEST, reason).into_response(),
            Error::HandoffClosed => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Handoff channel closed".to_string(),
            )
                .into_response(),
            Error::ServiceShutdown => (
                StatusCode::SERVICE_UNAVAILABLE,
                "Service is shutting down".to_string(),
            )
                .into_response(),
        }
    }
}
