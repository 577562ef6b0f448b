// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Error taxonomy for the wallet backend.
//!
//! Every rejection that can reach an external caller carries a stable string
//! code (`ERR_*`). The RPC layer echoes the code verbatim in the response
//! envelope so web-origin callers can branch on it; the UI surface maps the
//! same errors onto HTTP status codes.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

/// All failure modes surfaced by the backend.
#[derive(Debug, Clone, Error)]
pub enum WalletError {
    /// Vault is locked; the operation needs decrypted state.
    #[error("plugin is locked")]
    PluginLocked,

    /// Password-derived key failed to open a sealed blob.
    #[error("wrong password")]
    WrongPassword,

    /// Mnemonic phrase failed BIP39 checksum validation.
    #[error("invalid mnemonic phrase")]
    InvalidMnemonic,

    /// No vault has been created yet.
    #[error("vault is empty")]
    VaultEmpty,

    /// Fewer parameters supplied than the method requires.
    #[error("wrong parameters")]
    WrongParams,

    /// Access level insufficient and the request was not queued.
    #[error("no permission")]
    NoPermission,

    /// Key collision in an asset store.
    #[error("{0} already exists")]
    AlreadyExists(String),

    /// Asset store miss.
    #[error("{0} not found")]
    NotFound(String),

    /// A connection for this origin already exists.
    #[error("{0} is already connected")]
    AlreadyConnected(String),

    /// No connection exists for this origin.
    #[error("{0} is not connected")]
    NotConnected(String),

    /// The user declined or cancelled a pending request.
    #[error("request rejected by user")]
    UserRejected,

    /// External session handshake failed.
    #[error("session init failed: {0}")]
    SessionInitFailed(String),

    /// Persistence I/O failure. Never retried internally.
    #[error("storage unavailable: {0}")]
    StorageUnavailable(String),

    /// Non-2xx answer from the remote identity service.
    #[error("remote identity API error (status {status})")]
    RemoteApi {
        status: u16,
        message: Option<String>,
    },

    /// Method name not present in the catalog.
    #[error("unknown method: {0}")]
    UnknownMethod(String),
}

impl WalletError {
    /// Stable error code for the RPC envelope.
    pub fn code(&self) -> &'static str {
        match self {
            Self::PluginLocked => "ERR_PLUGIN_LOCKED",
            Self::WrongPassword => "ERR_WRONG_PASSWORD",
            Self::InvalidMnemonic => "ERR_INVALID_MNEMONIC",
            Self::VaultEmpty => "ERR_VAULT_EMPTY",
            Self::WrongParams => "WRONG_PARAMS",
            Self::NoPermission => "ERR_NO_PERMISSION",
            Self::AlreadyExists(_) => "ERR_ALREADY_EXISTS",
            Self::NotFound(_) => "ERR_NOT_FOUND",
            Self::AlreadyConnected(_) => "ERR_ALREADY_CONNECTED",
            Self::NotConnected(_) => "ERR_NOT_CONNECTED",
            Self::UserRejected => "ERR_USER_REJECTED",
            Self::SessionInitFailed(_) => "ERR_SESSION_INIT_FAILED",
            Self::StorageUnavailable(_) => "ERR_STORAGE_UNAVAILABLE",
            Self::RemoteApi { .. } => "ERR_WALLID_API",
            Self::UnknownMethod(_) => "ERR_UNKNOWN_METHOD",
        }
    }

    fn status(&self) -> StatusCode {
        match self {
            Self::PluginLocked | Self::NoPermission | Self::UserRejected => StatusCode::FORBIDDEN,
            Self::WrongPassword => StatusCode::UNAUTHORIZED,
            Self::InvalidMnemonic | Self::WrongParams => StatusCode::BAD_REQUEST,
            Self::NotFound(_) | Self::NotConnected(_) | Self::UnknownMethod(_) => {
                StatusCode::NOT_FOUND
            }
            Self::AlreadyExists(_) | Self::AlreadyConnected(_) => StatusCode::CONFLICT,
            Self::VaultEmpty | Self::SessionInitFailed(_) => StatusCode::UNPROCESSABLE_ENTITY,
            Self::StorageUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            Self::RemoteApi { .. } => StatusCode::BAD_GATEWAY,
        }
    }
}

#[derive(Serialize)]
struct ErrorBody {
    error: &'static str,
    message: String,
}

impl IntoResponse for WalletError {
    fn into_response(self) -> Response {
        let body = Json(ErrorBody {
            error: self.code(),
            message: self.to_string(),
        });
        (self.status(), body).into_response()
    }
}

/// Result alias used throughout the crate.
pub type WalletResult<T> = Result<T, WalletError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_are_stable() {
        assert_eq!(WalletError::PluginLocked.code(), "ERR_PLUGIN_LOCKED");
        assert_eq!(WalletError::WrongParams.code(), "WRONG_PARAMS");
        assert_eq!(WalletError::UserRejected.code(), "ERR_USER_REJECTED");
        assert_eq!(
            WalletError::RemoteApi {
                status: 500,
                message: None
            }
            .code(),
            "ERR_WALLID_API"
        );
    }

    #[test]
    fn status_mapping() {
        assert_eq!(WalletError::PluginLocked.status(), StatusCode::FORBIDDEN);
        assert_eq!(WalletError::WrongPassword.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(
            WalletError::AlreadyExists("credential c1".into()).status(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            WalletError::StorageUnavailable("disk".into()).status(),
            StatusCode::SERVICE_UNAVAILABLE
        );
    }

    #[tokio::test]
    async fn into_response_carries_code() {
        use axum::body::to_bytes;

        let response = WalletError::PluginLocked.into_response();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);

        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["error"], "ERR_PLUGIN_LOCKED");
    }
}
