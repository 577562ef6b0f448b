// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Shared application state for the HTTP layer.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::controller::AppController;

/// Handle shared across request handlers. All controller access goes
/// through the single `RwLock`; mutating operations take the write guard,
/// so read-modify-persist sequences never interleave.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<RwLock<AppController>>,
    pending_request_ttl: Duration,
}

impl AppState {
    pub fn new(controller: AppController) -> Self {
        let pending_request_ttl = controller.config().pending_request_ttl;
        Self {
            inner: Arc::new(RwLock::new(controller)),
            pending_request_ttl,
        }
    }

    pub async fn read(&self) -> RwLockReadGuard<'_, AppController> {
        self.inner.read().await
    }

    pub async fn write(&self) -> RwLockWriteGuard<'_, AppController> {
        self.inner.write().await
    }

    /// How long a queued request waits for user action before it settles
    /// as rejected.
    pub fn pending_request_ttl(&self) -> Duration {
        self.pending_request_ttl
    }
}
