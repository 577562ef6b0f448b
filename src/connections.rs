// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Per-origin access grants (the connection registry).
//!
//! Every gated operation consults this registry: an origin's stored access
//! level is compared against the level the method catalog demands. Unknown
//! origins report level `-1`, below every valid grant.

use serde::{Deserialize, Serialize};

use crate::error::{WalletError, WalletResult};

/// Access level reported for origins with no connection entry.
pub const UNKNOWN_ORIGIN_LEVEL: i32 = -1;

/// A granted connection for one web origin.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Connection {
    /// Web origin, unique key within the registry.
    pub origin: String,
    /// Site icon shown in the UI.
    pub icon: Option<String>,
    /// Human-readable site name.
    pub name: String,
    /// Granted access level (>= 0).
    pub level: i32,
}

/// Ordered registry of connection grants, persisted through the vault.
#[derive(Debug, Default)]
pub struct ConnectionRegistry {
    connections: Vec<Connection>,
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a grant. Rejects when the origin already has one.
    pub fn add_connected(
        &mut self,
        origin: &str,
        icon: Option<String>,
        name: &str,
        level: i32,
    ) -> WalletResult<()> {
        if self.find(origin).is_some() {
            return Err(WalletError::AlreadyConnected(origin.to_string()));
        }
        self.connections.push(Connection {
            origin: origin.to_string(),
            icon,
            name: name.to_string(),
            level,
        });
        Ok(())
    }

    /// Re-approval path: upsert in place when the new level is strictly
    /// higher than the stored one, reject otherwise.
    pub fn upgrade_connected(
        &mut self,
        origin: &str,
        icon: Option<String>,
        name: &str,
        level: i32,
    ) -> WalletResult<()> {
        match self.find_mut(origin) {
            None => self.add_connected(origin, icon, name, level),
            Some(existing) if level > existing.level => {
                existing.icon = icon;
                existing.name = name.to_string();
                existing.level = level;
                Ok(())
            }
            Some(_) => Err(WalletError::AlreadyConnected(origin.to_string())),
        }
    }

    /// Remove a grant. Rejects when the origin has none.
    pub fn remove_connected(&mut self, origin: &str) -> WalletResult<()> {
        let index = self
            .connections
            .iter()
            .position(|c| c.origin == origin)
            .ok_or_else(|| WalletError::NotConnected(origin.to_string()))?;
        self.connections.remove(index);
        Ok(())
    }

    /// Stored level for `origin`, or [`UNKNOWN_ORIGIN_LEVEL`].
    pub fn get_connection_access_level(&self, origin: &str) -> i32 {
        self.find(origin)
            .map_or(UNKNOWN_ORIGIN_LEVEL, |c| c.level)
    }

    /// All grants in insertion order, for UI display.
    pub fn get_all_connections(&self) -> &[Connection] {
        &self.connections
    }

    /// Serialize to the JSON document persisted through the vault.
    pub fn serialize(&self) -> WalletResult<String> {
        serde_json::to_string(&self.connections)
            .map_err(|e| WalletError::StorageUnavailable(e.to_string()))
    }

    /// Rebuild from a persisted document. Empty input yields an empty
    /// registry rather than an error.
    pub fn deserialize(serialized: &str) -> WalletResult<Self> {
        if serialized.trim().is_empty() {
            return Ok(Self::new());
        }
        let connections: Vec<Connection> = serde_json::from_str(serialized)
            .map_err(|e| WalletError::StorageUnavailable(format!("corrupt connections: {e}")))?;
        Ok(Self { connections })
    }

    fn find(&self, origin: &str) -> Option<&Connection> {
        self.connections.iter().find(|c| c.origin == origin)
    }

    fn find_mut(&mut self, origin: &str) -> Option<&mut Connection> {
        self.connections.iter_mut().find(|c| c.origin == origin)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn add_and_query_level() {
        let mut registry = ConnectionRegistry::new();
        registry
            .add_connected("https://x.com", None, "X", 2)
            .unwrap();
        assert_eq!(registry.get_connection_access_level("https://x.com"), 2);
        assert_eq!(registry.get_connection_access_level("https://y.com"), -1);
    }

    #[test]
    fn duplicate_origin_rejected() {
        let mut registry = ConnectionRegistry::new();
        registry
            .add_connected("https://x.com", None, "X", 1)
            .unwrap();
        let err = registry
            .add_connected("https://x.com", None, "X again", 2)
            .unwrap_err();
        assert!(matches!(err, WalletError::AlreadyConnected(_)));
        assert_eq!(registry.get_all_connections().len(), 1);
    }

    #[test]
    fn upgrade_requires_strictly_higher_level() {
        let mut registry = ConnectionRegistry::new();
        registry
            .add_connected("https://x.com", None, "X", 1)
            .unwrap();

        // Same level: rejected, entry untouched.
        assert!(matches!(
            registry.upgrade_connected("https://x.com", None, "X", 1),
            Err(WalletError::AlreadyConnected(_))
        ));

        // Higher level: upserts in place, order preserved.
        registry
            .add_connected("https://y.com", None, "Y", 0)
            .unwrap();
        registry
            .upgrade_connected("https://x.com", Some("icon.png".into()), "X", 3)
            .unwrap();
        assert_eq!(registry.get_connection_access_level("https://x.com"), 3);
        assert_eq!(registry.get_all_connections()[0].origin, "https://x.com");
    }

    #[test]
    fn upgrade_unknown_origin_adds() {
        let mut registry = ConnectionRegistry::new();
        registry
            .upgrade_connected("https://x.com", None, "X", 0)
            .unwrap();
        assert_eq!(registry.get_connection_access_level("https://x.com"), 0);
    }

    #[test]
    fn remove_unknown_origin_rejected_registry_unchanged() {
        let mut registry = ConnectionRegistry::new();
        registry
            .add_connected("https://x.com", None, "X", 1)
            .unwrap();

        let err = registry.remove_connected("unknown-origin").unwrap_err();
        assert!(matches!(err, WalletError::NotConnected(_)));
        assert_eq!(registry.get_all_connections().len(), 1);

        registry.remove_connected("https://x.com").unwrap();
        assert!(registry.get_all_connections().is_empty());
    }

    #[test]
    fn serialize_round_trip_preserves_order() {
        let mut registry = ConnectionRegistry::new();
        registry
            .add_connected("https://a.com", Some("a.png".into()), "A", 1)
            .unwrap();
        registry
            .add_connected("https://b.com", None, "B", 2)
            .unwrap();

        let doc = registry.serialize().unwrap();
        let restored = ConnectionRegistry::deserialize(&doc).unwrap();
        assert_eq!(
            restored.get_all_connections(),
            registry.get_all_connections()
        );
    }

    #[test]
    fn empty_round_trip() {
        let registry = ConnectionRegistry::new();
        let doc = registry.serialize().unwrap();
        assert_eq!(doc, "[]");
        let restored = ConnectionRegistry::deserialize(&doc).unwrap();
        assert!(restored.get_all_connections().is_empty());

        // Blank input also deserializes to empty.
        assert!(ConnectionRegistry::deserialize("")
            .unwrap()
            .get_all_connections()
            .is_empty());
    }
}
