// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Remote identity API client.
//!
//! Two-step token flow against the identity provider:
//!
//! 1. `POST {base}/auth` with `{wallet, idt, operation}` returns a
//!    challenge string.
//! 2. The wallet signs the challenge; the authorization token is
//!    `base64(challenge + ":" + signature)` and travels in the
//!    `WalliD-Authorization` header of `GET {base}/extract`.
//!
//! The provider answers the extract call with `202 Accepted` while the
//! identity operation is still processing on its side; that is a distinct
//! non-error outcome, not data and not failure.

use base64ct::{Base64, Encoding};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{WalletError, WalletResult};

/// Header carrying the authorization token.
pub const AUTHORIZATION_HEADER: &str = "WalliD-Authorization";

/// Outcome of an extract call.
#[derive(Debug, Clone, PartialEq)]
pub enum ExtractOutcome {
    /// Extraction finished; the identity payload.
    Data(Value),
    /// Provider accepted the request but is still processing (HTTP 202).
    Pending,
}

#[derive(Debug, Serialize)]
struct AuthRequest<'a> {
    wallet: &'a str,
    idt: &'a str,
    operation: &'a str,
}

#[derive(Debug, Deserialize)]
struct AuthResponse {
    #[serde(default)]
    challenge: Option<String>,
    #[serde(default)]
    message: Option<String>,
}

/// Thin reqwest wrapper around the identity provider endpoints.
#[derive(Debug, Clone)]
pub struct IdentityApiClient {
    http: reqwest::Client,
    base_url: String,
}

impl IdentityApiClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.into(),
        }
    }

    /// Request an authentication challenge for `(wallet, idt, operation)`.
    pub async fn request_challenge(
        &self,
        wallet: &str,
        idt: &str,
        operation: &str,
    ) -> WalletResult<String> {
        let url = format!("{}/auth", self.base_url);
        let response = self
            .http
            .post(&url)
            .json(&AuthRequest {
                wallet,
                idt,
                operation,
            })
            .send()
            .await
            .map_err(transport_error)?;

        let status = response.status().as_u16();
        let body: AuthResponse = response.json().await.map_err(transport_error)?;
        if !(200..300).contains(&status) {
            return Err(WalletError::RemoteApi {
                status,
                message: body.message,
            });
        }
        body.challenge.ok_or(WalletError::RemoteApi {
            status,
            message: Some("missing challenge".into()),
        })
    }

    /// Fetch identity data with a previously built authorization token.
    pub async fn extract_identity(&self, auth_token: &str) -> WalletResult<ExtractOutcome> {
        let url = format!("{}/extract", self.base_url);
        let response = self
            .http
            .get(&url)
            .header(AUTHORIZATION_HEADER, auth_token)
            .send()
            .await
            .map_err(transport_error)?;

        let status = response.status().as_u16();
        if status == 202 {
            return Ok(ExtractOutcome::Pending);
        }
        if !(200..300).contains(&status) {
            let message = response.text().await.ok().filter(|t| !t.is_empty());
            return Err(WalletError::RemoteApi { status, message });
        }
        let data: Value = response.json().await.map_err(transport_error)?;
        Ok(ExtractOutcome::Data(data))
    }
}

/// `base64(challenge + ":" + signature)`, the provider's token format.
pub fn build_authorization_token(challenge: &str, signature: &str) -> String {
    Base64::encode_string(format!("{challenge}:{signature}").as_bytes())
}

fn transport_error(err: reqwest::Error) -> WalletError {
    WalletError::RemoteApi {
        status: err.status().map(|s| s.as_u16()).unwrap_or(0),
        message: Some(err.to_string()),
    }
}
