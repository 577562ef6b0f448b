// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Asset Stores
//!
//! Keyed, ordered collections of user assets, each persisted through the
//! vault as its own sealed blob:
//!
//! - `identities` — imported identity documents, keyed by identity type tag
//! - `credentials` — verifiable credentials, keyed by credential id, with a
//!   signature-attachment flow that activates a pending record
//! - `profiles` — linked social profiles, keyed by profile id
//!
//! ## Shared semantics
//!
//! - duplicate insert without the overwrite flag rejects `AlreadyExists`;
//!   with it, the old record is removed and the new one appended
//! - delete of a missing key rejects `NotFound` (uniform across stores)
//! - `serialize()`/`deserialize()` round-trip the ordered record set,
//!   including the empty store

pub mod credentials;
pub mod identities;
pub mod profiles;

pub use credentials::{CredentialRecord, CredentialStatus, CredentialStore};
pub use identities::{IdentityRecord, IdentityStore};
pub use profiles::{ProfileRecord, ProfileStore};
