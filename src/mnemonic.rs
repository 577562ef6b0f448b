// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! BIP39 seed phrase helpers.
//!
//! Generation and checksum validation of the 12-word mnemonic that seeds a
//! new vault. Word lists and checksum rules come from the `bip39` crate;
//! nothing here touches key material.

use bip39::{Language, Mnemonic};

use crate::error::{WalletError, WalletResult};

/// Number of words in a generated seed phrase.
const WORD_COUNT: usize = 12;

/// Generate a random 12-word English mnemonic.
pub fn generate() -> String {
    // 12 words cannot fail for a supported word count.
    Mnemonic::generate_in(Language::English, WORD_COUNT)
        .expect("12-word mnemonic generation")
        .to_string()
}

/// Check a phrase against the BIP39 word list and checksum.
pub fn validate(phrase: &str) -> bool {
    Mnemonic::parse_in_normalized(Language::English, phrase).is_ok()
}

/// Parse a phrase, rejecting with `InvalidMnemonic` on checksum failure.
pub fn parse(phrase: &str) -> WalletResult<Mnemonic> {
    Mnemonic::parse_in_normalized(Language::English, phrase)
        .map_err(|_| WalletError::InvalidMnemonic)
}

/// Derive the 64-byte BIP39 seed from a validated phrase.
pub fn to_seed(phrase: &str) -> WalletResult<[u8; 64]> {
    Ok(parse(phrase)?.to_seed(""))
}
