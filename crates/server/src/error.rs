//! Structured errors for the larder gateway surface.
//!
//! These map gateway failure modes onto the HTTP statuses the client
//! runtime sees.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use larder_core::Error;

/// Structured errors for the gateway surface.
#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    /// Only GET and HEAD cross the interception boundary.
    #[error("METHOD_NOT_ALLOWED")]
    MethodNotAllowed,

    /// The manager has not reached its active state yet.
    #[error("NOT_ACTIVE: cache manager is not serving")]
    NotActive,

    /// The request target could not be resolved against the upstream.
    #[error("BAD_TARGET: {0}")]
    BadTarget(String),

    /// The target's origin is not allowed through the gateway.
    #[error("ORIGIN_DENIED: {0}")]
    OriginDenied(String),

    /// Cache miss and the network fetch failed.
    #[error("UPSTREAM_UNAVAILABLE: {0}")]
    UpstreamUnavailable(String),

    /// Cache store failure while serving.
    #[error(transparent)]
    Cache(#[from] Error),

    /// Response could not be assembled.
    #[error("INTERNAL: {0}")]
    Internal(String),
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        let status = match &self {
            GatewayError::MethodNotAllowed => StatusCode::METHOD_NOT_ALLOWED,
            GatewayError::NotActive => StatusCode::SERVICE_UNAVAILABLE,
            GatewayError::BadTarget(_) => StatusCode::BAD_REQUEST,
            GatewayError::OriginDenied(_) => StatusCode::FORBIDDEN,
            GatewayError::UpstreamUnavailable(_) => StatusCode::BAD_GATEWAY,
            GatewayError::Cache(_) | GatewayError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        (status, self.to_string()).into_response()
    }
}
