// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Vault
//!
//! Owns the encrypted key material and the locked/unlocked state machine.
//! All other components see decrypted sub-state only through the
//! application layer after a successful unlock.
//!
//! ## State machine
//!
//! ```text
//! Empty --create_new_and_persist--> Locked
//! Locked --unlock(password)-------> Unlocked   (WrongPassword keeps Locked)
//! Unlocked --lock()---------------> Locked     (idempotent)
//! Unlocked --full_reset(password)-> Empty      (irreversible)
//! ```
//!
//! Invariant: the derived key is cached iff the vault is unlocked. No
//! operation on protected state runs while locked.

pub mod cipher;
pub mod storage;

use serde::{Deserialize, Serialize};

use crate::error::{WalletError, WalletResult};

use cipher::{DerivedKey, SealedBlob};
use storage::{BlobKind, BlobStorage};

/// Plaintext of the root blob.
#[derive(Debug, Serialize, Deserialize)]
struct RootPayload {
    mnemonic: String,
}

/// Decrypted sub-state handed to the application layer on unlock.
///
/// Asset stores and connections are serialized JSON documents; the
/// controllers deserialize them into their runtime shapes.
#[derive(Debug)]
pub struct DecryptedState {
    pub mnemonic: String,
    pub connections: String,
    pub identities: String,
    pub credentials: String,
    pub profiles: String,
}

/// Encrypted-at-rest container gated by a password-derived key.
pub struct Vault {
    storage: BlobStorage,
    /// Present iff unlocked. Zeroized on drop.
    key: Option<DerivedKey>,
    /// KDF salt of the current vault generation. Present iff unlocked.
    salt: Option<Vec<u8>>,
}

impl Vault {
    /// Create a locked vault over `storage`. Reads nothing eagerly.
    pub fn new(storage: BlobStorage) -> Self {
        Self {
            storage,
            key: None,
            salt: None,
        }
    }

    /// True when no vault blob has ever been persisted (or it was reset).
    pub fn is_empty(&self) -> bool {
        !self.storage.exists(BlobKind::VaultRoot)
    }

    /// True when the derived key is cached in memory.
    pub fn is_unlocked(&self) -> bool {
        self.key.is_some()
    }

    /// Storage handle, for the health probe.
    pub fn storage(&self) -> &BlobStorage {
        &self.storage
    }

    /// Create a brand new vault from `mnemonic` + `password`, overwriting
    /// any existing blobs and persisting immediately. The vault stays
    /// locked; callers unlock with the same password to load sub-state.
    pub fn create_new_and_persist(&mut self, mnemonic: &str, password: &str) -> WalletResult<()> {
        crate::mnemonic::parse(mnemonic)?;

        let salt = cipher::generate_salt();
        let key = cipher::derive_key(password, &salt)?;

        let root = serde_json::to_vec(&RootPayload {
            mnemonic: mnemonic.to_string(),
        })
        .map_err(|e| WalletError::StorageUnavailable(e.to_string()))?;

        self.storage
            .write(BlobKind::VaultRoot, &cipher::seal(&key, &salt, &root)?)?;

        // Empty sub-state blobs; each store deserializes "[]" to empty.
        for kind in [
            BlobKind::Connections,
            BlobKind::Identities,
            BlobKind::Credentials,
            BlobKind::Profiles,
        ] {
            self.storage
                .write(kind, &cipher::seal(&key, &salt, b"[]")?)?;
        }

        // A create over an unlocked vault invalidates the old key.
        self.key = None;
        self.salt = None;
        Ok(())
    }

    /// Unlock with `password`, returning the decrypted sub-state.
    ///
    /// A failed attempt leaves the lock state untouched.
    pub fn unlock(&mut self, password: &str) -> WalletResult<DecryptedState> {
        if self.is_empty() {
            return Err(WalletError::VaultEmpty);
        }

        let root_blob: SealedBlob = self.storage.read(BlobKind::VaultRoot)?;
        let salt = cipher::blob_salt(&root_blob)?;
        let key = cipher::derive_key(password, &salt)?;

        let root_plain = cipher::open(&key, &root_blob)?;
        let root: RootPayload = serde_json::from_slice(&root_plain)
            .map_err(|_| WalletError::WrongPassword)?;

        let connections = self.open_substate(&key, BlobKind::Connections)?;
        let identities = self.open_substate(&key, BlobKind::Identities)?;
        let credentials = self.open_substate(&key, BlobKind::Credentials)?;
        let profiles = self.open_substate(&key, BlobKind::Profiles)?;

        self.key = Some(key);
        self.salt = Some(salt);

        Ok(DecryptedState {
            mnemonic: root.mnemonic,
            connections,
            identities,
            credentials,
            profiles,
        })
    }

    /// Discard the derived key. Succeeds whether or not already locked.
    pub fn lock(&mut self) {
        self.key = None;
        self.salt = None;
    }

    /// Verify `password` without mutating lock state.
    pub fn submit_password(&self, password: &str) -> WalletResult<()> {
        if self.is_empty() {
            return Err(WalletError::VaultEmpty);
        }
        let root_blob: SealedBlob = self.storage.read(BlobKind::VaultRoot)?;
        let salt = cipher::blob_salt(&root_blob)?;
        let key = cipher::derive_key(password, &salt)?;
        cipher::open(&key, &root_blob).map(|_| ())
    }

    /// Erase all persisted blobs and in-memory key material irreversibly.
    ///
    /// Requires the vault to be unlocked, and the password is re-validated
    /// against the root blob before anything is wiped, guarding against
    /// stale or forged calls just like `put_substate`.
    pub fn full_reset(&mut self, password: &str) -> WalletResult<()> {
        if !self.is_unlocked() {
            return Err(WalletError::PluginLocked);
        }
        self.submit_password(password)?;
        self.storage.wipe()?;
        self.lock();
        Ok(())
    }

    /// Re-encrypt and persist one sub-state blob.
    ///
    /// The password is re-validated against the root blob before anything
    /// is written, guarding against stale or forged calls.
    pub fn put_substate(
        &self,
        kind: BlobKind,
        serialized: &str,
        password: &str,
    ) -> WalletResult<()> {
        let (key, salt) = match (&self.key, &self.salt) {
            (Some(key), Some(salt)) => (key, salt),
            _ => return Err(WalletError::PluginLocked),
        };
        self.submit_password(password)?;

        let blob = cipher::seal(key, salt, serialized.as_bytes())?;
        self.storage.write(kind, &blob)
    }

    fn open_substate(&self, key: &DerivedKey, kind: BlobKind) -> WalletResult<String> {
        if !self.storage.exists(kind) {
            // Tolerate a missing sub-state file: treat as empty store.
            return Ok("[]".to_string());
        }
        let blob: SealedBlob = self.storage.read(kind)?;
        let plain = cipher::open(key, &blob)?;
        String::from_utf8(plain).map_err(|_| WalletError::WrongPassword)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const MNEMONIC: &str =
        "abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon about";

    fn test_vault() -> (TempDir, Vault) {
        let dir = TempDir::new().expect("temp dir");
        let storage = BlobStorage::new(dir.path()).expect("storage init");
        (dir, Vault::new(storage))
    }

    #[test]
    fn fresh_vault_is_empty_and_locked() {
        let (_dir, vault) = test_vault();
        assert!(vault.is_empty());
        assert!(!vault.is_unlocked());
    }

    #[test]
    fn create_then_unlock_round_trip() {
        let (_dir, mut vault) = test_vault();
        vault.create_new_and_persist(MNEMONIC, "pw1").unwrap();
        assert!(!vault.is_empty());
        assert!(!vault.is_unlocked());

        let state = vault.unlock("pw1").unwrap();
        assert!(vault.is_unlocked());
        assert_eq!(state.mnemonic, MNEMONIC);
        assert_eq!(state.connections, "[]");
        assert_eq!(state.credentials, "[]");
    }

    #[test]
    fn create_rejects_invalid_mnemonic() {
        let (_dir, mut vault) = test_vault();
        let err = vault
            .create_new_and_persist("not a mnemonic", "pw1")
            .unwrap_err();
        assert!(matches!(err, WalletError::InvalidMnemonic));
        assert!(vault.is_empty());
    }

    #[test]
    fn wrong_password_rejected_without_state_change() {
        let (_dir, mut vault) = test_vault();
        vault.create_new_and_persist(MNEMONIC, "pw1").unwrap();

        let err = vault.unlock("pw2").unwrap_err();
        assert!(matches!(err, WalletError::WrongPassword));
        assert!(!vault.is_unlocked());

        // Still unlockable with the right password afterwards.
        vault.unlock("pw1").unwrap();
    }

    #[test]
    fn unlock_empty_vault_rejected() {
        let (_dir, mut vault) = test_vault();
        assert!(matches!(vault.unlock("pw"), Err(WalletError::VaultEmpty)));
    }

    #[test]
    fn lock_is_idempotent() {
        let (_dir, mut vault) = test_vault();
        vault.create_new_and_persist(MNEMONIC, "pw1").unwrap();
        vault.unlock("pw1").unwrap();

        vault.lock();
        assert!(!vault.is_unlocked());
        vault.lock();
        assert!(!vault.is_unlocked());
    }

    #[test]
    fn submit_password_does_not_mutate_lock_state() {
        let (_dir, mut vault) = test_vault();
        vault.create_new_and_persist(MNEMONIC, "pw1").unwrap();

        vault.submit_password("pw1").unwrap();
        assert!(!vault.is_unlocked());

        assert!(matches!(
            vault.submit_password("nope"),
            Err(WalletError::WrongPassword)
        ));
    }

    #[test]
    fn put_substate_persists_across_relock() {
        let (_dir, mut vault) = test_vault();
        vault.create_new_and_persist(MNEMONIC, "pw1").unwrap();
        vault.unlock("pw1").unwrap();

        vault
            .put_substate(BlobKind::Credentials, r#"[{"id":"c1"}]"#, "pw1")
            .unwrap();

        vault.lock();
        let state = vault.unlock("pw1").unwrap();
        assert_eq!(state.credentials, r#"[{"id":"c1"}]"#);
    }

    #[test]
    fn put_substate_revalidates_password() {
        let (_dir, mut vault) = test_vault();
        vault.create_new_and_persist(MNEMONIC, "pw1").unwrap();
        vault.unlock("pw1").unwrap();

        let err = vault
            .put_substate(BlobKind::Credentials, "[]", "forged")
            .unwrap_err();
        assert!(matches!(err, WalletError::WrongPassword));
    }

    #[test]
    fn put_substate_requires_unlock() {
        let (_dir, mut vault) = test_vault();
        vault.create_new_and_persist(MNEMONIC, "pw1").unwrap();
        assert!(matches!(
            vault.put_substate(BlobKind::Profiles, "[]", "pw1"),
            Err(WalletError::PluginLocked)
        ));
    }

    #[test]
    fn full_reset_requires_unlock_and_wipes() {
        let (_dir, mut vault) = test_vault();
        vault.create_new_and_persist(MNEMONIC, "pw1").unwrap();

        assert!(matches!(
            vault.full_reset("pw1"),
            Err(WalletError::PluginLocked)
        ));

        vault.unlock("pw1").unwrap();
        vault.full_reset("pw1").unwrap();
        assert!(vault.is_empty());
        assert!(!vault.is_unlocked());
    }

    #[test]
    fn full_reset_revalidates_password() {
        let (_dir, mut vault) = test_vault();
        vault.create_new_and_persist(MNEMONIC, "pw1").unwrap();
        vault.unlock("pw1").unwrap();

        assert!(matches!(
            vault.full_reset("forged"),
            Err(WalletError::WrongPassword)
        ));
        // Nothing wiped, still unlocked.
        assert!(!vault.is_empty());
        assert!(vault.is_unlocked());

        vault.full_reset("pw1").unwrap();
        assert!(vault.is_empty());
    }

    #[test]
    fn create_overwrites_existing_vault() {
        let (_dir, mut vault) = test_vault();
        vault.create_new_and_persist(MNEMONIC, "pw1").unwrap();
        vault.create_new_and_persist(MNEMONIC, "pw2").unwrap();

        assert!(matches!(
            vault.unlock("pw1"),
            Err(WalletError::WrongPassword)
        ));
        vault.unlock("pw2").unwrap();
    }
}
