// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Wallet event broadcast.
//!
//! State transitions are announced on a `tokio::sync::broadcast` channel so
//! the UI can refresh without polling. Events carry no secret material and
//! delivery is best-effort: a subscriber that lags simply misses events.

use serde::Serialize;
use tokio::sync::broadcast;
use uuid::Uuid;

const EVENT_CHANNEL_CAPACITY: usize = 64;

/// A state transition worth announcing to subscribers.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum WalletEvent {
    /// A vault now exists on disk.
    WalletCreated { address: String },
    /// The vault unlocked and the runtime state was rebuilt.
    WalletUnlocked { address: String },
    /// The vault locked; runtime state was discarded.
    WalletLocked,
    /// The vault was wiped from disk.
    WalletReset,
    /// An origin was granted (or upgraded to) an access level.
    OriginConnected { origin: String, level: i32 },
    /// An origin's grant was revoked.
    OriginDisconnected { origin: String },
    /// A gated request joined the pending queue and wants a popup.
    PopupRequested { request_id: Uuid },
    /// A session proposal arrived and awaits approval.
    SessionProposed { topic: String },
    /// A session proposal was approved.
    SessionApproved { topic: String },
}

/// Fan-out handle, cheap to clone.
#[derive(Debug, Clone)]
pub struct EventBus {
    sender: broadcast::Sender<WalletEvent>,
}

impl EventBus {
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self { sender }
    }

    /// Publish an event. Dropped silently when nobody is subscribed.
    pub fn publish(&self, event: WalletEvent) {
        let _ = self.sender.send(event);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<WalletEvent> {
        self.sender.subscribe()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn subscriber_receives_published_events() {
        let bus = EventBus::new();
        let mut rx = bus.subscribe();

        bus.publish(WalletEvent::WalletLocked);
        bus.publish(WalletEvent::OriginConnected {
            origin: "https://dapp.example".into(),
            level: 1,
        });

        assert!(matches!(rx.recv().await.unwrap(), WalletEvent::WalletLocked));
        match rx.recv().await.unwrap() {
            WalletEvent::OriginConnected { origin, level } => {
                assert_eq!(origin, "https://dapp.example");
                assert_eq!(level, 1);
            }
            other => panic!("unexpected event: {other:?}"),
        }
    }

    #[test]
    fn publish_without_subscribers_is_fine() {
        let bus = EventBus::new();
        bus.publish(WalletEvent::WalletReset);
    }

    #[test]
    fn events_serialize_with_tag() {
        let event = WalletEvent::WalletUnlocked {
            address: "0xabc".into(),
        };
        let doc = serde_json::to_value(&event).unwrap();
        assert_eq!(doc["event"], "wallet_unlocked");
        assert_eq!(doc["address"], "0xabc");
    }
}
