// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Externally invokable method catalog.
//!
//! One static descriptor per method a web origin may call, built once and
//! read-only at runtime. The descriptor carries everything the arbiter
//! needs to decide a call's fate — no string-based reflection, dispatch
//! goes through the typed [`Operation`] enum.
//!
//! This table is the authoritative access-control policy:
//!
//! | method                    | kind              | level | min args |
//! |---------------------------|-------------------|-------|----------|
//! | `generate_seed_phrase`    | lifecycle         | —     | 0        |
//! | `validate_seed_phrase`    | lifecycle         | —     | 1        |
//! | `create_new_vault`        | lifecycle         | —     | 2        |
//! | `request_connection`      | direct            | 1     | 0        |
//! | `get_address`             | direct            | 0     | 0        |
//! | `get_identity_list`       | direct            | 1     | 0        |
//! | `get_credential_list`     | direct            | 1     | 0        |
//! | `get_profile_list`        | direct            | 1     | 0        |
//! | `extract_identity_data`   | direct            | 1     | 1        |
//! | `get_authorization_token` | direct            | 1     | 2        |
//! | `encrypt_data`            | direct            | 2     | 1        |
//! | `delete_identity`         | direct            | 2     | 1        |
//! | `delete_credential`       | direct            | 2     | 1        |
//! | `delete_profile`          | direct            | 2     | 1        |
//! | `import_identity`         | popup-forced      | 2     | 2        |
//! | `import_credential`       | popup-forced      | 2     | 4        |
//! | `import_credential_sign`  | popup-forced      | 2     | 3        |
//! | `export_credential`       | popup-forced      | 2     | 1        |
//! | `import_social_profile`   | popup-forced      | 2     | 4        |
//! | `sign_erc191`             | popup-forced      | 2     | 1        |
//! | `decrypt_data`            | popup-forced      | 2     | 1        |

/// Typed target of a catalog entry. Each variant is handled by exactly one
/// controller operation in the arbiter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    GenerateSeedPhrase,
    ValidateSeedPhrase,
    CreateNewVault,
    RequestConnection,
    GetAddress,
    GetIdentityList,
    GetCredentialList,
    GetProfileList,
    ExtractIdentityData,
    GetAuthorizationToken,
    EncryptData,
    DecryptData,
    SignErc191,
    ImportIdentity,
    DeleteIdentity,
    ImportCredential,
    ImportCredentialSign,
    ExportCredential,
    DeleteCredential,
    ImportSocialProfile,
    DeleteProfile,
}

/// How a method is gated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchKind {
    /// Vault-creation path: runs before any grant exists and bypasses both
    /// the lock check and the access check.
    Lifecycle,
    /// Runs immediately when the caller's grant reaches `level`; queued for
    /// user approval otherwise.
    Direct { level: i32 },
    /// Always queued for per-call user confirmation, even with a
    /// sufficient grant. `level` is what the approval popup displays.
    PopupForced { level: i32 },
}

impl DispatchKind {
    /// The grant level the popup shows for a queued request.
    pub fn level(&self) -> i32 {
        match self {
            DispatchKind::Lifecycle => 0,
            DispatchKind::Direct { level } | DispatchKind::PopupForced { level } => *level,
        }
    }
}

/// A single catalog entry.
#[derive(Debug, Clone, Copy)]
pub struct MethodDescriptor {
    pub name: &'static str,
    pub operation: Operation,
    pub kind: DispatchKind,
    pub min_args: usize,
}

const fn lifecycle(name: &'static str, operation: Operation, min_args: usize) -> MethodDescriptor {
    MethodDescriptor {
        name,
        operation,
        kind: DispatchKind::Lifecycle,
        min_args,
    }
}

const fn direct(
    name: &'static str,
    operation: Operation,
    level: i32,
    min_args: usize,
) -> MethodDescriptor {
    MethodDescriptor {
        name,
        operation,
        kind: DispatchKind::Direct { level },
        min_args,
    }
}

const fn popup(
    name: &'static str,
    operation: Operation,
    level: i32,
    min_args: usize,
) -> MethodDescriptor {
    MethodDescriptor {
        name,
        operation,
        kind: DispatchKind::PopupForced { level },
        min_args,
    }
}

/// The full catalog. Order is insignificant; names are unique.
pub const METHOD_CATALOG: &[MethodDescriptor] = &[
    lifecycle("generate_seed_phrase", Operation::GenerateSeedPhrase, 0),
    lifecycle("validate_seed_phrase", Operation::ValidateSeedPhrase, 1),
    lifecycle("create_new_vault", Operation::CreateNewVault, 2),
    direct("request_connection", Operation::RequestConnection, 1, 0),
    direct("get_address", Operation::GetAddress, 0, 0),
    direct("get_identity_list", Operation::GetIdentityList, 1, 0),
    direct("get_credential_list", Operation::GetCredentialList, 1, 0),
    direct("get_profile_list", Operation::GetProfileList, 1, 0),
    direct("extract_identity_data", Operation::ExtractIdentityData, 1, 1),
    direct(
        "get_authorization_token",
        Operation::GetAuthorizationToken,
        1,
        2,
    ),
    direct("encrypt_data", Operation::EncryptData, 2, 1),
    direct("delete_identity", Operation::DeleteIdentity, 2, 1),
    direct("delete_credential", Operation::DeleteCredential, 2, 1),
    direct("delete_profile", Operation::DeleteProfile, 2, 1),
    popup("import_identity", Operation::ImportIdentity, 2, 2),
    popup("import_credential", Operation::ImportCredential, 2, 4),
    popup("import_credential_sign", Operation::ImportCredentialSign, 2, 3),
    popup("export_credential", Operation::ExportCredential, 2, 1),
    popup("import_social_profile", Operation::ImportSocialProfile, 2, 4),
    popup("sign_erc191", Operation::SignErc191, 2, 1),
    popup("decrypt_data", Operation::DecryptData, 2, 1),
];

/// Resolve a method name to its descriptor.
pub fn lookup(method: &str) -> Option<&'static MethodDescriptor> {
    METHOD_CATALOG.iter().find(|d| d.name == method)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn names_are_unique() {
        let mut seen = HashSet::new();
        for descriptor in METHOD_CATALOG {
            assert!(seen.insert(descriptor.name), "duplicate {}", descriptor.name);
        }
    }

    #[test]
    fn lookup_known_and_unknown() {
        let descriptor = lookup("sign_erc191").unwrap();
        assert_eq!(descriptor.operation, Operation::SignErc191);
        assert!(matches!(descriptor.kind, DispatchKind::PopupForced { level: 2 }));

        assert!(lookup("eth_sendTransaction").is_none());
    }

    #[test]
    fn lifecycle_methods_cover_onboarding() {
        for name in ["generate_seed_phrase", "validate_seed_phrase", "create_new_vault"] {
            assert!(matches!(
                lookup(name).unwrap().kind,
                DispatchKind::Lifecycle
            ));
        }
    }

    #[test]
    fn popup_forced_levels_are_displayable() {
        for descriptor in METHOD_CATALOG {
            if let DispatchKind::PopupForced { level } = descriptor.kind {
                assert!(level >= 0);
                assert_eq!(descriptor.kind.level(), level);
            }
        }
    }
}
