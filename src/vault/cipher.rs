// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Password-based sealing for vault blobs.
//!
//! Keys are derived from the user password with Argon2id and a per-vault
//! salt; blobs are sealed with AES-256-GCM under a fresh nonce per write.
//! Any KDF or AEAD failure on open surfaces as `WrongPassword` — callers
//! cannot distinguish a bad password from a tampered blob, by construction
//! of the AEAD.

use aes_gcm::{aead::Aead, Aes256Gcm, KeyInit, Nonce};
use argon2::Argon2;
use rand::RngCore;
use serde::{Deserialize, Serialize};
use zeroize::{Zeroize, Zeroizing};

use crate::error::{WalletError, WalletResult};

/// Argon2id salt length in bytes.
pub const SALT_LEN: usize = 32;

/// AES-GCM nonce length in bytes.
const NONCE_LEN: usize = 12;

/// Derived symmetric key, zeroized on drop.
pub type DerivedKey = Zeroizing<[u8; 32]>;

/// A sealed blob as persisted to disk. The salt is stored alongside so each
/// logical sub-state file can be re-encrypted independently.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SealedBlob {
    /// Argon2id salt, hex-encoded.
    pub kdf_salt: String,
    /// AES-GCM nonce, hex-encoded. Fresh for every seal.
    pub nonce: String,
    /// AES-256-GCM ciphertext, hex-encoded.
    pub ciphertext: String,
}

/// Generate a fresh KDF salt.
pub fn generate_salt() -> [u8; SALT_LEN] {
    let mut salt = [0u8; SALT_LEN];
    rand::rngs::OsRng.fill_bytes(&mut salt);
    salt
}

/// Derive a 32-byte key from `password` and `salt` with Argon2id.
///
/// The password is NFKD-normalized first so that visually identical inputs
/// from different keyboards derive the same key.
pub fn derive_key(password: &str, salt: &[u8]) -> WalletResult<DerivedKey> {
    use unicode_normalization::UnicodeNormalization;

    let mut normalized: String = password.nfkd().collect();
    let mut key = Zeroizing::new([0u8; 32]);
    let result = Argon2::default().hash_password_into(normalized.as_bytes(), salt, key.as_mut());
    normalized.zeroize();
    result.map_err(|_| WalletError::WrongPassword)?;
    Ok(key)
}

/// Seal `plaintext` under `key`, recording `salt` in the blob header.
pub fn seal(key: &DerivedKey, salt: &[u8], plaintext: &[u8]) -> WalletResult<SealedBlob> {
    let cipher =
        Aes256Gcm::new_from_slice(key.as_ref()).map_err(|_| WalletError::WrongPassword)?;

    let mut nonce_bytes = [0u8; NONCE_LEN];
    rand::rngs::OsRng.fill_bytes(&mut nonce_bytes);
    let nonce = Nonce::from_slice(&nonce_bytes);

    let ciphertext = cipher
        .encrypt(nonce, plaintext)
        .map_err(|_| WalletError::WrongPassword)?;

    Ok(SealedBlob {
        kdf_salt: hex::encode(salt),
        nonce: hex::encode(nonce_bytes),
        ciphertext: hex::encode(ciphertext),
    })
}

/// Open a sealed blob with `key`. Fails with `WrongPassword` on any
/// decode or authentication failure.
pub fn open(key: &DerivedKey, blob: &SealedBlob) -> WalletResult<Vec<u8>> {
    let nonce_bytes = hex::decode(&blob.nonce).map_err(|_| WalletError::WrongPassword)?;
    let ciphertext = hex::decode(&blob.ciphertext).map_err(|_| WalletError::WrongPassword)?;
    if nonce_bytes.len() != NONCE_LEN {
        return Err(WalletError::WrongPassword);
    }

    let cipher =
        Aes256Gcm::new_from_slice(key.as_ref()).map_err(|_| WalletError::WrongPassword)?;
    cipher
        .decrypt(Nonce::from_slice(&nonce_bytes), ciphertext.as_ref())
        .map_err(|_| WalletError::WrongPassword)
}

/// Decode the salt stored in a blob header.
pub fn blob_salt(blob: &SealedBlob) -> WalletResult<Vec<u8>> {
    hex::decode(&blob.kdf_salt).map_err(|_| WalletError::WrongPassword)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seal_open_round_trip() {
        let salt = generate_salt();
        let key = derive_key("hunter2", &salt).unwrap();
        let blob = seal(&key, &salt, b"vault contents").unwrap();
        let opened = open(&key, &blob).unwrap();
        assert_eq!(opened, b"vault contents");
    }

    #[test]
    fn wrong_password_fails_to_open() {
        let salt = generate_salt();
        let key = derive_key("hunter2", &salt).unwrap();
        let blob = seal(&key, &salt, b"vault contents").unwrap();

        let wrong = derive_key("hunter3", &salt).unwrap();
        assert!(matches!(
            open(&wrong, &blob),
            Err(WalletError::WrongPassword)
        ));
    }

    #[test]
    fn tampered_ciphertext_fails_to_open() {
        let salt = generate_salt();
        let key = derive_key("hunter2", &salt).unwrap();
        let mut blob = seal(&key, &salt, b"vault contents").unwrap();

        // Flip one hex digit of the ciphertext.
        let mut chars: Vec<char> = blob.ciphertext.chars().collect();
        chars[0] = if chars[0] == '0' { '1' } else { '0' };
        blob.ciphertext = chars.into_iter().collect();

        assert!(matches!(open(&key, &blob), Err(WalletError::WrongPassword)));
    }

    #[test]
    fn normalized_passwords_derive_same_key() {
        let salt = generate_salt();
        // "é" precomposed vs combining-accent form.
        let a = derive_key("caf\u{00e9}", &salt).unwrap();
        let b = derive_key("cafe\u{0301}", &salt).unwrap();
        assert_eq!(a.as_ref(), b.as_ref());
    }

    #[test]
    fn fresh_nonce_per_seal() {
        let salt = generate_salt();
        let key = derive_key("hunter2", &salt).unwrap();
        let a = seal(&key, &salt, b"same").unwrap();
        let b = seal(&key, &salt, b"same").unwrap();
        assert_ne!(a.nonce, b.nonce);
    }
}
