// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Social profile asset store.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{WalletError, WalletResult};

/// A linked social profile, keyed by id (social network + username tag).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ProfileRecord {
    /// Profile id, unique key within the store.
    pub id: String,
    /// Profile payload, opaque to the backend.
    pub profile_data: Value,
    /// Username on the social network.
    pub username: String,
    /// Social network name.
    pub social_name: String,
}

/// Summary row for UI lists.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ProfileSummary {
    pub id: String,
    pub social_name: String,
    pub username: String,
}

/// Ordered profile collection, persisted through the vault.
#[derive(Debug, Default)]
pub struct ProfileStore {
    profiles: Vec<ProfileRecord>,
}

impl ProfileStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Link a profile. Duplicate `id` rejects unless `overwrite`.
    pub fn add_profile(
        &mut self,
        id: &str,
        profile_data: Value,
        username: &str,
        social_name: &str,
        overwrite: bool,
    ) -> WalletResult<()> {
        if let Some(index) = self.position(id) {
            if !overwrite {
                return Err(WalletError::AlreadyExists(format!("profile {id}")));
            }
            self.profiles.remove(index);
        }
        self.profiles.push(ProfileRecord {
            id: id.to_string(),
            profile_data,
            username: username.to_string(),
            social_name: social_name.to_string(),
        });
        Ok(())
    }

    /// Delete a profile; rejects `NotFound` when absent.
    pub fn delete_profile(&mut self, id: &str) -> WalletResult<()> {
        let index = self
            .position(id)
            .ok_or_else(|| WalletError::NotFound(format!("profile {id}")))?;
        self.profiles.remove(index);
        Ok(())
    }

    /// Full record for export.
    pub fn get(&self, id: &str) -> WalletResult<&ProfileRecord> {
        self.position(id)
            .map(|i| &self.profiles[i])
            .ok_or_else(|| WalletError::NotFound(format!("profile {id}")))
    }

    /// Summary rows in insertion order.
    pub fn get_list(&self) -> Vec<ProfileSummary> {
        self.profiles
            .iter()
            .map(|record| ProfileSummary {
                id: record.id.clone(),
                social_name: record.social_name.clone(),
                username: record.username.clone(),
            })
            .collect()
    }

    /// All records, for the UI state snapshot.
    pub fn records(&self) -> &[ProfileRecord] {
        &self.profiles
    }

    pub fn serialize(&self) -> WalletResult<String> {
        serde_json::to_string(&self.profiles)
            .map_err(|e| WalletError::StorageUnavailable(e.to_string()))
    }

    pub fn deserialize(serialized: &str) -> WalletResult<Self> {
        if serialized.trim().is_empty() {
            return Ok(Self::new());
        }
        let profiles: Vec<ProfileRecord> = serde_json::from_str(serialized)
            .map_err(|e| WalletError::StorageUnavailable(format!("corrupt profiles: {e}")))?;
        Ok(Self { profiles })
    }

    fn position(&self, id: &str) -> Option<usize> {
        self.profiles.iter().position(|record| record.id == id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn add_get_delete() {
        let mut store = ProfileStore::new();
        store
            .add_profile("tw:alice", json!({"bio": "x"}), "alice", "twitter", false)
            .unwrap();

        assert_eq!(store.get("tw:alice").unwrap().username, "alice");

        store.delete_profile("tw:alice").unwrap();
        assert!(matches!(
            store.get("tw:alice"),
            Err(WalletError::NotFound(_))
        ));
    }

    #[test]
    fn duplicate_requires_overwrite() {
        let mut store = ProfileStore::new();
        store
            .add_profile("tw:alice", json!(1), "alice", "twitter", false)
            .unwrap();

        assert!(matches!(
            store.add_profile("tw:alice", json!(2), "alice", "twitter", false),
            Err(WalletError::AlreadyExists(_))
        ));

        store
            .add_profile("tw:alice", json!(2), "alice", "twitter", true)
            .unwrap();
        assert_eq!(store.get("tw:alice").unwrap().profile_data, json!(2));
    }

    #[test]
    fn delete_missing_rejected() {
        let mut store = ProfileStore::new();
        assert!(matches!(
            store.delete_profile("ghost"),
            Err(WalletError::NotFound(_))
        ));
    }

    #[test]
    fn list_summaries() {
        let mut store = ProfileStore::new();
        store
            .add_profile("tw:alice", json!({}), "alice", "twitter", false)
            .unwrap();
        store
            .add_profile("gh:alice", json!({}), "alice", "github", false)
            .unwrap();

        let list = store.get_list();
        assert_eq!(list.len(), 2);
        assert_eq!(list[0].social_name, "twitter");
        assert_eq!(list[1].social_name, "github");
    }

    #[test]
    fn empty_round_trip() {
        let store = ProfileStore::new();
        let doc = store.serialize().unwrap();
        assert_eq!(doc, "[]");
        assert!(ProfileStore::deserialize(&doc)
            .unwrap()
            .records()
            .is_empty());
    }
}
