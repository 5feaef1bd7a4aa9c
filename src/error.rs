//! Error types for remote calls and provisioning flows

use axum::{http::StatusCode, response::IntoResponse, Json};
use serde::Serialize;
use thiserror::Error;

/// Failure of a single call against the remote account
#[derive(Error, Debug)]
pub enum RemoteError {
    /// Network, TLS or timeout failure before a status was received
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// Remote answered with a status the operation does not accept
    #[error("{operation} returned HTTP {status}")]
    Status { operation: &'static str, status: u16 },

    /// Reply body was not the expected JSON shape
    #[error("{operation} returned an unreadable body: {message}")]
    Decode { operation: &'static str, message: String },
}

pub type RemoteResult<T> = Result<T, RemoteError>;

/// Failure of a provisioning flow, surfaced to the caller as a JSON envelope
#[derive(Error, Debug)]
pub enum ProvisionError {
    #[error(transparent)]
    Remote(#[from] RemoteError),

    /// Every generated name was refused by the remote create call
    #[error("no namespace could be created after {attempts} attempts")]
    NamesExhausted { attempts: u32 },

    /// The key was minted but could not be granted access to its namespace
    #[error("permission grant on {database} failed: {reason}")]
    PermissionGrant { database: String, reason: String },
}

pub type ProvisionResult<T> = Result<T, ProvisionError>;

#[derive(Debug, Serialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    code: &'static str,
    message: String,
}

impl ProvisionError {
    fn status_and_code(&self) -> (StatusCode, &'static str) {
        match self {
            ProvisionError::Remote(_) => (StatusCode::BAD_GATEWAY, "remote_error"),
            ProvisionError::NamesExhausted { .. } => {
                (StatusCode::SERVICE_UNAVAILABLE, "names_exhausted")
            }
            ProvisionError::PermissionGrant { .. } => {
                (StatusCode::BAD_GATEWAY, "permission_grant_failed")
            }
        }
    }
}

impl IntoResponse for ProvisionError {
    fn into_response(self) -> axum::response::Response {
        let (status, code) = self.status_and_code();
        tracing::error!(code, error = %self, "provisioning request failed");
        let body = ErrorEnvelope {
            error: ErrorBody {
                code,
                message: self.to_string(),
            },
        };
        (status, Json(body)).into_response()
    }
}
