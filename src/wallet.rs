// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Wallet capability backed by the vault's seed.
//!
//! The four operations web applications ultimately care about — address,
//! message signing, encryption, decryption — all live here. The rest of the
//! backend never touches raw key material; it holds a `Wallet` only while
//! the vault is unlocked and drops it on lock.
//!
//! Keys are derived from the BIP39 seed with HKDF-SHA256: one secp256k1
//! signing key and one AES-256-GCM key under separate info labels.

use aes_gcm::{aead::Aead, Aes256Gcm, KeyInit, Nonce};
use hkdf::Hkdf;
use k256::ecdsa::{signature::Signer, Signature, SigningKey, VerifyingKey};
use rand::RngCore;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use zeroize::Zeroizing;

use crate::error::{WalletError, WalletResult};

const SIGNING_KEY_INFO: &[u8] = b"wallid/signing-key/v1";
const ENCRYPTION_KEY_INFO: &[u8] = b"wallid/encryption-key/v1";

/// Ciphertext envelope returned by [`Wallet::encrypt`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CipherEnvelope {
    pub version: u32,
    pub nonce: String,
    pub ciphertext: String,
}

/// In-memory wallet derived from an unlocked vault's mnemonic.
pub struct Wallet {
    signing_key: SigningKey,
    encryption_key: Zeroizing<[u8; 32]>,
    address: String,
}

impl Wallet {
    /// Derive a wallet from a mnemonic phrase.
    pub fn from_mnemonic(phrase: &str) -> WalletResult<Self> {
        let seed = Zeroizing::new(crate::mnemonic::to_seed(phrase)?);
        let hk = Hkdf::<Sha256>::new(None, seed.as_ref());

        let mut signing_bytes = Zeroizing::new([0u8; 32]);
        hk.expand(SIGNING_KEY_INFO, signing_bytes.as_mut())
            .map_err(|_| WalletError::WrongPassword)?;
        let signing_key = SigningKey::from_bytes(signing_bytes.as_ref().into())
            .map_err(|_| WalletError::WrongPassword)?;

        let mut encryption_key = Zeroizing::new([0u8; 32]);
        hk.expand(ENCRYPTION_KEY_INFO, encryption_key.as_mut())
            .map_err(|_| WalletError::WrongPassword)?;

        let address = derive_address(signing_key.verifying_key());

        Ok(Self {
            signing_key,
            encryption_key,
            address,
        })
    }

    /// Public wallet address (`0x`-prefixed hex).
    pub fn address(&self) -> &str {
        &self.address
    }

    /// Verifying key matching the signing key.
    pub fn verifying_key(&self) -> &VerifyingKey {
        self.signing_key.verifying_key()
    }

    /// Sign an arbitrary message, returning a hex-encoded ECDSA signature.
    pub fn sign_message(&self, message: &[u8]) -> String {
        let signature: Signature = self.signing_key.sign(message);
        hex::encode(signature.to_der())
    }

    /// Encrypt a JSON-serializable value under the wallet's symmetric key.
    pub fn encrypt(&self, data: &serde_json::Value) -> WalletResult<CipherEnvelope> {
        let plaintext = serde_json::to_vec(data)
            .map_err(|e| WalletError::StorageUnavailable(e.to_string()))?;

        let cipher = Aes256Gcm::new_from_slice(self.encryption_key.as_ref())
            .map_err(|_| WalletError::WrongPassword)?;
        let mut nonce_bytes = [0u8; 12];
        rand::rngs::OsRng.fill_bytes(&mut nonce_bytes);

        let ciphertext = cipher
            .encrypt(Nonce::from_slice(&nonce_bytes), plaintext.as_ref())
            .map_err(|_| WalletError::WrongPassword)?;

        Ok(CipherEnvelope {
            version: 1,
            nonce: hex::encode(nonce_bytes),
            ciphertext: hex::encode(ciphertext),
        })
    }

    /// Decrypt an envelope produced by [`Wallet::encrypt`].
    pub fn decrypt(&self, envelope: &CipherEnvelope) -> WalletResult<serde_json::Value> {
        let nonce_bytes =
            hex::decode(&envelope.nonce).map_err(|_| WalletError::WrongPassword)?;
        let ciphertext =
            hex::decode(&envelope.ciphertext).map_err(|_| WalletError::WrongPassword)?;
        if nonce_bytes.len() != 12 {
            return Err(WalletError::WrongPassword);
        }

        let cipher = Aes256Gcm::new_from_slice(self.encryption_key.as_ref())
            .map_err(|_| WalletError::WrongPassword)?;
        let plaintext = cipher
            .decrypt(Nonce::from_slice(&nonce_bytes), ciphertext.as_ref())
            .map_err(|_| WalletError::WrongPassword)?;

        serde_json::from_slice(&plaintext).map_err(|_| WalletError::WrongPassword)
    }
}

/// Address = last 20 bytes of SHA-256 over the uncompressed public key.
fn derive_address(key: &VerifyingKey) -> String {
    let encoded = key.to_encoded_point(false);
    let digest = Sha256::digest(encoded.as_bytes());
    format!("0x{}", hex::encode(&digest[12..]))
}

#[cfg(test)]
mod tests {
    use super::*;
    use k256::ecdsa::signature::Verifier;

    const MNEMONIC: &str =
        "abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon about";

    #[test]
    fn wallet_derivation_is_deterministic() {
        let a = Wallet::from_mnemonic(MNEMONIC).unwrap();
        let b = Wallet::from_mnemonic(MNEMONIC).unwrap();
        assert_eq!(a.address(), b.address());
        assert!(a.address().starts_with("0x"));
        assert_eq!(a.address().len(), 42);
    }

    #[test]
    fn invalid_mnemonic_rejected() {
        assert!(matches!(
            Wallet::from_mnemonic("nope"),
            Err(WalletError::InvalidMnemonic)
        ));
    }

    #[test]
    fn signature_verifies_against_public_key() {
        let wallet = Wallet::from_mnemonic(MNEMONIC).unwrap();
        let sig_hex = wallet.sign_message(b"challenge-bytes");

        let der = hex::decode(sig_hex).unwrap();
        let signature = Signature::from_der(&der).unwrap();
        wallet
            .verifying_key()
            .verify(b"challenge-bytes", &signature)
            .expect("signature verifies");
    }

    #[test]
    fn encrypt_decrypt_round_trip() {
        let wallet = Wallet::from_mnemonic(MNEMONIC).unwrap();
        let data = serde_json::json!({ "idt": "cc", "fields": [1, 2, 3] });

        let envelope = wallet.encrypt(&data).unwrap();
        assert_eq!(envelope.version, 1);

        let decrypted = wallet.decrypt(&envelope).unwrap();
        assert_eq!(decrypted, data);
    }

    #[test]
    fn decrypt_with_other_wallet_fails() {
        let a = Wallet::from_mnemonic(MNEMONIC).unwrap();
        let b = Wallet::from_mnemonic(
            "legal winner thank year wave sausage worth useful legal winner thank yellow",
        )
        .unwrap();

        let envelope = a.encrypt(&serde_json::json!("secret")).unwrap();
        assert!(matches!(
            b.decrypt(&envelope),
            Err(WalletError::WrongPassword)
        ));
    }
}
