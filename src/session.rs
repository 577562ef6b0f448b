// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! External session bridge.
//!
//! Pairs the wallet with an external dapp session from a handshake URI of
//! the shape `wc:{topic}@{version}?bridge={url}&key={hex}`. The flow is
//! single-shot: a failed init or approval propagates `SessionInitFailed`
//! and leaves no half-open session behind; the caller starts over with a
//! fresh URI.
//!
//! The bridge only manages proposal/approval bookkeeping. Granting the
//! session's origin an access level is the controller's job.

use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::{WalletError, WalletResult};

/// Access level auto-granted to an approved session's origin.
pub const SESSION_GRANT_LEVEL: i32 = 0;

/// A parsed, not-yet-approved handshake.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionProposal {
    pub topic: String,
    pub version: u32,
    /// Relay the peer reaches us through; doubles as the originating URL
    /// until peer metadata arrives at approval time.
    pub bridge: Url,
    /// Symmetric key material for the session transport, hex.
    pub key: String,
}

/// Peer-supplied metadata, delivered with the approval.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionMetadata {
    pub url: String,
    pub name: String,
    #[serde(default)]
    pub icon: Option<String>,
}

/// An approved, active session.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ApprovedSession {
    pub topic: String,
    pub metadata: SessionMetadata,
}

/// Proposal/approval state machine. At most one session at a time.
#[derive(Debug, Default)]
pub struct SessionBridge {
    proposal: Option<SessionProposal>,
    active: Option<ApprovedSession>,
}

impl SessionBridge {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse and stage a handshake URI. Replaces any previous unapproved
    /// proposal; malformed URIs reject `SessionInitFailed`.
    pub fn init_from_uri(&mut self, uri: &str) -> WalletResult<&SessionProposal> {
        let proposal = parse_session_uri(uri)?;
        self.proposal = Some(proposal);
        Ok(self.proposal.as_ref().expect("just set"))
    }

    /// Complete the handshake for the staged proposal using the peer's
    /// metadata. Consumes the proposal.
    pub fn approve_session(&mut self, metadata: SessionMetadata) -> WalletResult<&ApprovedSession> {
        let proposal = self
            .proposal
            .take()
            .ok_or_else(|| WalletError::SessionInitFailed("no pending proposal".into()))?;
        self.active = Some(ApprovedSession {
            topic: proposal.topic,
            metadata,
        });
        Ok(self.active.as_ref().expect("just set"))
    }

    pub fn pending_proposal(&self) -> Option<&SessionProposal> {
        self.proposal.as_ref()
    }

    pub fn active_session(&self) -> Option<&ApprovedSession> {
        self.active.as_ref()
    }

    /// Drop all session state. Called when the vault locks.
    pub fn clear(&mut self) {
        self.proposal = None;
        self.active = None;
    }
}

fn parse_session_uri(uri: &str) -> WalletResult<SessionProposal> {
    let parsed = Url::parse(uri)
        .map_err(|e| WalletError::SessionInitFailed(format!("malformed uri: {e}")))?;
    if parsed.scheme() != "wc" {
        return Err(WalletError::SessionInitFailed(format!(
            "unsupported scheme {}",
            parsed.scheme()
        )));
    }

    let handshake = parsed.path();
    let (topic, version) = handshake
        .split_once('@')
        .ok_or_else(|| WalletError::SessionInitFailed("missing version tag".into()))?;
    if topic.is_empty() {
        return Err(WalletError::SessionInitFailed("empty topic".into()));
    }
    let version: u32 = version
        .parse()
        .map_err(|_| WalletError::SessionInitFailed(format!("bad version {version:?}")))?;

    let mut bridge = None;
    let mut key = None;
    for (name, value) in parsed.query_pairs() {
        match name.as_ref() {
            "bridge" => {
                bridge = Some(Url::parse(&value).map_err(|e| {
                    WalletError::SessionInitFailed(format!("bad bridge url: {e}"))
                })?)
            }
            "key" => key = Some(value.into_owned()),
            _ => {}
        }
    }
    let bridge =
        bridge.ok_or_else(|| WalletError::SessionInitFailed("missing bridge".into()))?;
    let key = key
        .filter(|k| !k.is_empty() && k.bytes().all(|b| b.is_ascii_hexdigit()))
        .ok_or_else(|| WalletError::SessionInitFailed("missing or non-hex key".into()))?;

    Ok(SessionProposal {
        topic: topic.to_string(),
        version,
        bridge,
        key,
    })
}
