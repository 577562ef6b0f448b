// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Pending-request queue and active-popup registry.
//!
//! A request lands here when its caller's access grant is insufficient (or
//! the method always demands per-call confirmation). The caller's future
//! waits on a one-shot channel; the UI pops requests in FIFO order and
//! settles each by id. The one-shot channel enforces resolve-exactly-once:
//! a settled request cannot be settled again.
//!
//! The core never sees popup content — it tracks only the window ids the
//! host hands back from the launch call.

use std::collections::{HashMap, VecDeque};

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;
use tokio::sync::oneshot;
use uuid::Uuid;

use crate::error::{WalletError, WalletResult};

/// Per-origin cap. A caller whose grant is insufficient gets `NoPermission`
/// instead of a queue slot once this many of its requests are outstanding.
pub const MAX_PENDING_REQUESTS: usize = 16;

type Responder = oneshot::Sender<WalletResult<Value>>;

/// A gated call awaiting out-of-band user approval.
struct PendingRequest {
    id: Uuid,
    origin: String,
    method: String,
    params: Vec<Value>,
    level: i32,
    created_at: DateTime<Utc>,
    responder: Responder,
}

impl PendingRequest {
    fn view(&self) -> PendingRequestView {
        PendingRequestView {
            id: self.id,
            origin: self.origin.clone(),
            method: self.method.clone(),
            params: self.params.clone(),
            level: self.level,
            created_at: self.created_at,
        }
    }
}

/// What the UI sees when it pops a request.
#[derive(Debug, Clone, Serialize)]
pub struct PendingRequestView {
    pub id: Uuid,
    pub origin: String,
    pub method: String,
    pub params: Vec<Value>,
    pub level: i32,
    pub created_at: DateTime<Utc>,
}

/// FIFO queue of pending requests plus the popped-but-unsettled set.
#[derive(Default)]
pub struct PendingRequestQueue {
    queue: VecDeque<PendingRequest>,
    in_flight: HashMap<Uuid, PendingRequest>,
}

impl PendingRequestQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Enqueue a request, returning its id and the receiver the arbiter
    /// awaits. Fails with `NoPermission` when the origin's cap is hit.
    pub fn push(
        &mut self,
        origin: &str,
        method: &str,
        params: Vec<Value>,
        level: i32,
    ) -> WalletResult<(Uuid, oneshot::Receiver<WalletResult<Value>>)> {
        self.prune_abandoned();
        let outstanding = self
            .queue
            .iter()
            .chain(self.in_flight.values())
            .filter(|r| r.origin == origin)
            .count();
        if outstanding >= MAX_PENDING_REQUESTS {
            return Err(WalletError::NoPermission);
        }

        let (tx, rx) = oneshot::channel();
        let id = Uuid::new_v4();
        self.queue.push_back(PendingRequest {
            id,
            origin: origin.to_string(),
            method: method.to_string(),
            params,
            level,
            created_at: Utc::now(),
            responder: tx,
        });
        Ok((id, rx))
    }

    /// Pop the head request for UI display. The request moves to the
    /// in-flight set until the UI settles it by id.
    pub fn get_next_request(&mut self) -> Option<PendingRequestView> {
        self.prune_abandoned();
        let request = self.queue.pop_front()?;
        let view = request.view();
        self.in_flight.insert(request.id, request);
        Some(view)
    }

    /// Call details of a popped request still awaiting settlement.
    pub fn in_flight_view(&self, id: Uuid) -> Option<PendingRequestView> {
        self.in_flight.get(&id).map(PendingRequest::view)
    }

    /// Settle a request with the UI-provided outcome.
    ///
    /// Works for both popped and still-queued requests, so an explicit
    /// cancel does not require a pop first. Unknown ids reject `NotFound`;
    /// a request whose caller already timed out settles as a no-op.
    pub fn resolve(&mut self, id: Uuid, outcome: WalletResult<Value>) -> WalletResult<()> {
        let request = match self.in_flight.remove(&id) {
            Some(request) => request,
            None => {
                let index = self
                    .queue
                    .iter()
                    .position(|r| r.id == id)
                    .ok_or_else(|| WalletError::NotFound(format!("pending request {id}")))?;
                self.queue.remove(index).expect("index valid")
            }
        };
        // The caller may have timed out and dropped its receiver.
        let _ = request.responder.send(outcome);
        Ok(())
    }

    /// Cancel a request: always settles its caller with `UserRejected`.
    pub fn cancel(&mut self, id: Uuid) -> WalletResult<()> {
        self.resolve(id, Err(WalletError::UserRejected))
    }

    /// Drain everything, settling each caller with the supplied error.
    /// Used when the vault locks while requests are outstanding.
    pub fn drain_all(&mut self, error: fn() -> WalletError) {
        for request in self.queue.drain(..) {
            let _ = request.responder.send(Err(error()));
        }
        for (_, request) in self.in_flight.drain() {
            let _ = request.responder.send(Err(error()));
        }
    }

    /// Number of requests still awaiting a pop.
    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    /// Drop entries whose caller abandoned the wait (receiver closed).
    fn prune_abandoned(&mut self) {
        self.queue.retain(|r| !r.responder.is_closed());
        self.in_flight.retain(|_, r| !r.responder.is_closed());
    }
}

/// Ids of popup windows the host opened on our behalf.
#[derive(Debug, Default)]
pub struct PopupRegistry {
    popups: Vec<u64>,
}

impl PopupRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Track a newly opened popup window, or forget one on `remove`.
    pub fn update_active_popups(&mut self, id: u64, remove: bool) {
        if remove {
            self.popups.retain(|&p| p != id);
        } else {
            self.popups.push(id);
        }
    }

    pub fn get_active_popups(&self) -> &[u64] {
        &self.popups
    }
}
