// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Credential asset store.
//!
//! Credentials are imported in `PendingApproval` status and transition to
//! `Active` when the issuing authority's signature pair is attached via
//! [`CredentialStore::add_credential_sign`].

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{WalletError, WalletResult};

/// Lifecycle status of a credential.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CredentialStatus {
    /// Imported, awaiting the issuer's signature.
    PendingApproval,
    /// Signature pair attached; usable.
    Active,
}

/// A stored credential, keyed by id.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CredentialRecord {
    /// Credential id, unique key within the store.
    pub id: String,
    /// Credential display name.
    pub cred_name: String,
    /// Issuing certificate authority's name.
    pub ca_name: String,
    /// Issuer logo shown in the UI.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub photo_url: Option<String>,
    /// Encrypted holder data, opaque to the backend.
    pub user_data: Value,
    /// Current lifecycle status.
    pub status: CredentialStatus,
    /// Expiry date, when the issuer set one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exp_date: Option<DateTime<Utc>>,
    /// Issuer signature, attached on approval.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sig: Option<String>,
    /// Counter-signature for verification, attached on approval.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub verify_sig: Option<String>,
}

/// Summary row for UI lists.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CredentialSummary {
    pub id: String,
    pub cred_name: String,
    pub ca_name: String,
    pub status: CredentialStatus,
    pub exp_date: Option<DateTime<Utc>>,
}

/// Ordered credential collection, persisted through the vault.
#[derive(Debug, Default)]
pub struct CredentialStore {
    credentials: Vec<CredentialRecord>,
}

impl CredentialStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Import a credential. Duplicate `id` rejects unless `overwrite`.
    #[allow(clippy::too_many_arguments)]
    pub fn add_credential(
        &mut self,
        id: &str,
        cred_name: &str,
        ca_name: &str,
        photo_url: Option<String>,
        user_data: Value,
        status: CredentialStatus,
        overwrite: bool,
        exp_date: Option<DateTime<Utc>>,
    ) -> WalletResult<()> {
        if let Some(index) = self.position(id) {
            if !overwrite {
                return Err(WalletError::AlreadyExists(format!("credential {id}")));
            }
            self.credentials.remove(index);
        }
        self.credentials.push(CredentialRecord {
            id: id.to_string(),
            cred_name: cred_name.to_string(),
            ca_name: ca_name.to_string(),
            photo_url,
            user_data,
            status,
            exp_date,
            sig: None,
            verify_sig: None,
        });
        Ok(())
    }

    /// Attach the issuer's signature pair to an existing credential and
    /// activate it. Rejects `NotFound` when the id is unknown.
    pub fn add_credential_sign(
        &mut self,
        id: &str,
        sig: &str,
        verify_sig: &str,
    ) -> WalletResult<()> {
        let index = self
            .position(id)
            .ok_or_else(|| WalletError::NotFound(format!("credential {id}")))?;
        let record = &mut self.credentials[index];
        record.sig = Some(sig.to_string());
        record.verify_sig = Some(verify_sig.to_string());
        record.status = CredentialStatus::Active;
        Ok(())
    }

    /// Delete a credential; rejects `NotFound` when absent.
    pub fn delete_credential(&mut self, id: &str) -> WalletResult<()> {
        let index = self
            .position(id)
            .ok_or_else(|| WalletError::NotFound(format!("credential {id}")))?;
        self.credentials.remove(index);
        Ok(())
    }

    /// Full record for export.
    pub fn get(&self, id: &str) -> WalletResult<&CredentialRecord> {
        self.position(id)
            .map(|i| &self.credentials[i])
            .ok_or_else(|| WalletError::NotFound(format!("credential {id}")))
    }

    /// Summary rows in insertion order.
    pub fn get_list(&self) -> Vec<CredentialSummary> {
        self.credentials
            .iter()
            .map(|record| CredentialSummary {
                id: record.id.clone(),
                cred_name: record.cred_name.clone(),
                ca_name: record.ca_name.clone(),
                status: record.status,
                exp_date: record.exp_date,
            })
            .collect()
    }

    /// All records, for the UI state snapshot.
    pub fn records(&self) -> &[CredentialRecord] {
        &self.credentials
    }

    pub fn serialize(&self) -> WalletResult<String> {
        serde_json::to_string(&self.credentials)
            .map_err(|e| WalletError::StorageUnavailable(e.to_string()))
    }

    pub fn deserialize(serialized: &str) -> WalletResult<Self> {
        if serialized.trim().is_empty() {
            return Ok(Self::new());
        }
        let credentials: Vec<CredentialRecord> = serde_json::from_str(serialized)
            .map_err(|e| WalletError::StorageUnavailable(format!("corrupt credentials: {e}")))?;
        Ok(Self { credentials })
    }

    fn position(&self, id: &str) -> Option<usize> {
        self.credentials.iter().position(|record| record.id == id)
    }
}
