// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Wire envelope for the external RPC surface.
//!
//! Requests carry a correlation `nonce` chosen by the caller; the response
//! echoes it unchanged so answers can be matched even when they arrive out
//! of order. Errors travel as stable string codes, never as HTTP statuses —
//! the RPC endpoint always answers 200 with an envelope.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Inbound call from a web origin.
#[derive(Debug, Clone, Deserialize)]
pub struct RpcRequest {
    pub method: String,
    #[serde(default)]
    pub params: Vec<Value>,
    pub origin: String,
    /// Opaque correlation token, echoed verbatim.
    #[serde(default)]
    pub nonce: Value,
}

/// Response envelope. Exactly one of `data`/`error` is set.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RpcResponse {
    pub data: Option<Value>,
    pub error: Option<String>,
    pub nonce: Value,
}

impl RpcResponse {
    pub fn ok(data: Value, nonce: Value) -> Self {
        Self {
            data: Some(data),
            error: None,
            nonce,
        }
    }

    pub fn err(code: &str, nonce: Value) -> Self {
        Self {
            data: None,
            error: Some(code.to_string()),
            nonce,
        }
    }
}
