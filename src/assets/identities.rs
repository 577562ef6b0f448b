// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Identity asset store.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{WalletError, WalletResult};

/// An imported identity, keyed by its identity type tag.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct IdentityRecord {
    /// Identity type tag, unique key within the store.
    pub idt: String,
    /// Encrypted identity payload, opaque to the backend.
    pub data: Value,
    /// Display name chosen at import time.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub idt_name: Option<String>,
    /// Expiry date, when the issuer set one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exp_date: Option<DateTime<Utc>>,
}

/// Summary row for UI lists.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct IdentitySummary {
    pub idt: String,
    pub idt_name: Option<String>,
    pub exp_date: Option<DateTime<Utc>>,
}

/// Ordered identity collection, persisted through the vault.
#[derive(Debug, Default)]
pub struct IdentityStore {
    identities: Vec<IdentityRecord>,
}

impl IdentityStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Import an identity. Duplicate `idt` rejects unless `overwrite`.
    pub fn add_identity(
        &mut self,
        idt: &str,
        data: Value,
        overwrite: bool,
        exp_date: Option<DateTime<Utc>>,
        idt_name: Option<String>,
    ) -> WalletResult<()> {
        if let Some(index) = self.position(idt) {
            if !overwrite {
                return Err(WalletError::AlreadyExists(format!("identity {idt}")));
            }
            self.identities.remove(index);
        }
        self.identities.push(IdentityRecord {
            idt: idt.to_string(),
            data,
            idt_name,
            exp_date,
        });
        Ok(())
    }

    /// Delete an identity; rejects `NotFound` when absent.
    pub fn delete_identity(&mut self, idt: &str) -> WalletResult<()> {
        let index = self
            .position(idt)
            .ok_or_else(|| WalletError::NotFound(format!("identity {idt}")))?;
        self.identities.remove(index);
        Ok(())
    }

    /// Full record for export / data extraction.
    pub fn get(&self, idt: &str) -> WalletResult<&IdentityRecord> {
        self.position(idt)
            .map(|i| &self.identities[i])
            .ok_or_else(|| WalletError::NotFound(format!("identity {idt}")))
    }

    /// Summary rows in insertion order.
    pub fn get_list(&self) -> Vec<IdentitySummary> {
        self.identities
            .iter()
            .map(|record| IdentitySummary {
                idt: record.idt.clone(),
                idt_name: record.idt_name.clone(),
                exp_date: record.exp_date,
            })
            .collect()
    }

    /// All records, for the UI state snapshot.
    pub fn records(&self) -> &[IdentityRecord] {
        &self.identities
    }

    pub fn serialize(&self) -> WalletResult<String> {
        serde_json::to_string(&self.identities)
            .map_err(|e| WalletError::StorageUnavailable(e.to_string()))
    }

    pub fn deserialize(serialized: &str) -> WalletResult<Self> {
        if serialized.trim().is_empty() {
            return Ok(Self::new());
        }
        let identities: Vec<IdentityRecord> = serde_json::from_str(serialized)
            .map_err(|e| WalletError::StorageUnavailable(format!("corrupt identities: {e}")))?;
        Ok(Self { identities })
    }

    fn position(&self, idt: &str) -> Option<usize> {
        self.identities.iter().position(|record| record.idt == idt)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn add_get_delete() {
        let mut store = IdentityStore::new();
        store
            .add_identity("cc", json!({"cipher": "aabb"}), false, None, Some("Card".into()))
            .unwrap();

        let record = store.get("cc").unwrap();
        assert_eq!(record.idt_name.as_deref(), Some("Card"));

        store.delete_identity("cc").unwrap();
        assert!(matches!(store.get("cc"), Err(WalletError::NotFound(_))));
    }

    #[test]
    fn duplicate_requires_overwrite() {
        let mut store = IdentityStore::new();
        store
            .add_identity("cc", json!("v1"), false, None, None)
            .unwrap();

        let err = store
            .add_identity("cc", json!("v2"), false, None, None)
            .unwrap_err();
        assert!(matches!(err, WalletError::AlreadyExists(_)));
        assert_eq!(store.get("cc").unwrap().data, json!("v1"));

        store
            .add_identity("cc", json!("v2"), true, None, None)
            .unwrap();
        assert_eq!(store.get("cc").unwrap().data, json!("v2"));
        assert_eq!(store.records().len(), 1);
    }

    #[test]
    fn delete_missing_rejected() {
        let mut store = IdentityStore::new();
        assert!(matches!(
            store.delete_identity("ghost"),
            Err(WalletError::NotFound(_))
        ));
    }

    #[test]
    fn serialize_round_trip_preserves_order() {
        let mut store = IdentityStore::new();
        store
            .add_identity("a", json!(1), false, None, None)
            .unwrap();
        store
            .add_identity("b", json!(2), false, None, None)
            .unwrap();

        let doc = store.serialize().unwrap();
        let restored = IdentityStore::deserialize(&doc).unwrap();
        assert_eq!(restored.records(), store.records());
    }

    #[test]
    fn empty_round_trip() {
        let store = IdentityStore::new();
        let doc = store.serialize().unwrap();
        assert_eq!(doc, "[]");
        assert!(IdentityStore::deserialize(&doc)
            .unwrap()
            .records()
            .is_empty());
        assert!(IdentityStore::deserialize("").unwrap().records().is_empty());
    }
}
