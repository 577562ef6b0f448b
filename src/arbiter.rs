// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Per-call arbitration for externally invoked methods.
//!
//! [`dispatch`] applies the decision procedure to one inbound call:
//!
//! 1. unknown method name rejects `UnknownMethod`
//! 2. fewer params than the descriptor's minimum rejects `WrongParams`
//! 3. lifecycle methods run immediately, bypassing lock and access checks
//! 4. everything else needs an unlocked vault, `PluginLocked` otherwise
//! 5. popup-forced methods always queue for per-call confirmation
//! 6. a grant at or above the required level executes immediately
//! 7. an insufficient grant queues the call and awaits the user's verdict
//!
//! Queued calls hold no lock while waiting: the write guard is dropped
//! before awaiting the one-shot, so the approval UI can settle the request
//! through the same state handle. A wait is bounded by the configured TTL
//! and expires as `UserRejected`.
//!
//! [`approve`] is the UI-side counterpart: it executes a popped request's
//! operation with the user's blessing and settles the waiting caller with
//! the same outcome.

use chrono::{DateTime, Utc};
use serde_json::{json, Value};
use tokio::time::timeout;
use tracing::debug;
use uuid::Uuid;

use crate::catalog::{self, DispatchKind, Operation};
use crate::controller::AppController;
use crate::error::{WalletError, WalletResult};
use crate::state::AppState;
use crate::wallet::CipherEnvelope;

/// Arbitrate and execute one inbound method call.
pub async fn dispatch(
    state: &AppState,
    origin: &str,
    method: &str,
    params: &[Value],
) -> WalletResult<Value> {
    let descriptor = catalog::lookup(method)
        .ok_or_else(|| WalletError::UnknownMethod(method.to_string()))?;
    if params.len() < descriptor.min_args {
        return Err(WalletError::WrongParams);
    }

    let rx = {
        let mut app = state.write().await;
        match descriptor.kind {
            DispatchKind::Lifecycle => {
                debug!(%origin, %method, "lifecycle dispatch");
                return invoke(&mut app, descriptor.operation, params).await;
            }
            DispatchKind::Direct { level } | DispatchKind::PopupForced { level } => {
                if !app.is_unlocked() {
                    return Err(WalletError::PluginLocked);
                }
                let granted = app.connection_access_level(origin)?;
                let forced = matches!(descriptor.kind, DispatchKind::PopupForced { .. });
                if !forced && granted >= level {
                    debug!(%origin, %method, granted, "direct dispatch");
                    return invoke(&mut app, descriptor.operation, params).await;
                }
                debug!(%origin, %method, granted, required = level, forced, "queueing");
                let (_id, rx) =
                    app.update_pending_requests(origin, method, params.to_vec(), level)?;
                rx
            }
        }
        // Write guard drops here; the UI can now reach the queue.
    };

    match timeout(state.pending_request_ttl(), rx).await {
        Ok(Ok(outcome)) => outcome,
        // Sender dropped or TTL expired: treat as a rejection.
        Ok(Err(_)) | Err(_) => Err(WalletError::UserRejected),
    }
}

/// Execute a popped pending request on the user's approval and settle the
/// waiting caller with the outcome. Returns the same outcome to the UI.
pub async fn approve(state: &AppState, id: Uuid) -> WalletResult<Value> {
    let mut app = state.write().await;
    let view = app
        .in_flight_request(id)
        .ok_or_else(|| WalletError::NotFound(format!("pending request {id}")))?;
    let descriptor = catalog::lookup(&view.method)
        .ok_or_else(|| WalletError::UnknownMethod(view.method.clone()))?;

    let outcome = invoke(&mut app, descriptor.operation, &view.params).await;
    app.settle_request(id, outcome.clone())?;
    outcome
}

/// Invoke one catalog operation with positional JSON params.
///
/// Parameter layout per operation (trailing optionals may be omitted or
/// `null`):
///
/// | operation                 | params |
/// |---------------------------|--------|
/// | `generate_seed_phrase`    | — |
/// | `validate_seed_phrase`    | `[phrase]` |
/// | `create_new_vault`        | `[phrase, password]` |
/// | `request_connection`      | — |
/// | `get_address`             | — |
/// | `get_*_list`              | — |
/// | `extract_identity_data`   | `[idt]` |
/// | `get_authorization_token` | `[idt, operation]` |
/// | `encrypt_data`            | `[data]` |
/// | `decrypt_data`            | `[envelope]` |
/// | `sign_erc191`             | `[message]` |
/// | `import_identity`         | `[idt, data, overwrite?, idt_name?, exp_date?]` |
/// | `delete_identity`         | `[idt]` |
/// | `import_credential`       | `[id, cred_name, ca_name, user_data, photo_url?, overwrite?, exp_date?]` |
/// | `import_credential_sign`  | `[id, sig, verify_sig]` |
/// | `export_credential`       | `[id]` |
/// | `delete_credential`       | `[id]` |
/// | `import_social_profile`   | `[id, profile_data, username, social_name, overwrite?]` |
/// | `delete_profile`          | `[id]` |
async fn invoke(
    app: &mut AppController,
    operation: Operation,
    params: &[Value],
) -> WalletResult<Value> {
    match operation {
        Operation::GenerateSeedPhrase => Ok(json!(app.generate_seed_phrase())),
        Operation::ValidateSeedPhrase => {
            Ok(json!(app.validate_seed_phrase(require_str(params, 0)?)))
        }
        Operation::CreateNewVault => {
            app.create_new_vault(require_str(params, 0)?, require_str(params, 1)?)?;
            Ok(Value::Null)
        }
        Operation::RequestConnection => {
            let address = app.address().ok_or(WalletError::PluginLocked)?.to_string();
            Ok(json!({ "address": address }))
        }
        Operation::GetAddress => {
            let address = app.address().ok_or(WalletError::PluginLocked)?;
            Ok(json!(address))
        }
        Operation::GetIdentityList => to_json(app.get_identity_list()?),
        Operation::GetCredentialList => to_json(app.get_credential_list()?),
        Operation::GetProfileList => to_json(app.get_profile_list()?),
        Operation::ExtractIdentityData => app.extract_identity_data(require_str(params, 0)?),
        Operation::GetAuthorizationToken => {
            let token = app
                .get_authorization_token(require_str(params, 0)?, require_str(params, 1)?)
                .await?;
            Ok(json!(token))
        }
        Operation::EncryptData => to_json(app.encrypt_data(require_value(params, 0)?)?),
        Operation::DecryptData => {
            let envelope: CipherEnvelope =
                serde_json::from_value(require_value(params, 0)?.clone())
                    .map_err(|_| WalletError::WrongParams)?;
            app.decrypt_data(&envelope)
        }
        Operation::SignErc191 => {
            let message = require_str(params, 0)?;
            Ok(json!(app.generate_ec_signature(message.as_bytes())?))
        }
        Operation::ImportIdentity => {
            app.import_identity(
                require_str(params, 0)?,
                require_value(params, 1)?.clone(),
                opt_bool(params, 2)?,
                opt_date(params, 4)?,
                opt_str(params, 3)?,
            )?;
            Ok(Value::Null)
        }
        Operation::DeleteIdentity => {
            app.delete_identity(require_str(params, 0)?)?;
            Ok(Value::Null)
        }
        Operation::ImportCredential => {
            app.import_credential(
                require_str(params, 0)?,
                require_str(params, 1)?,
                require_str(params, 2)?,
                opt_str(params, 4)?,
                require_value(params, 3)?.clone(),
                opt_bool(params, 5)?,
                opt_date(params, 6)?,
            )?;
            Ok(Value::Null)
        }
        Operation::ImportCredentialSign => {
            app.import_credential_sign(
                require_str(params, 0)?,
                require_str(params, 1)?,
                require_str(params, 2)?,
            )?;
            Ok(Value::Null)
        }
        Operation::ExportCredential => app.export_credential(require_str(params, 0)?),
        Operation::DeleteCredential => {
            app.delete_credential(require_str(params, 0)?)?;
            Ok(Value::Null)
        }
        Operation::ImportSocialProfile => {
            app.import_social_profile(
                require_str(params, 0)?,
                require_value(params, 1)?.clone(),
                require_str(params, 2)?,
                require_str(params, 3)?,
                opt_bool(params, 4)?,
            )?;
            Ok(Value::Null)
        }
        Operation::DeleteProfile => {
            app.delete_profile(require_str(params, 0)?)?;
            Ok(Value::Null)
        }
    }
}

fn to_json<T: serde::Serialize>(value: T) -> WalletResult<Value> {
    serde_json::to_value(value).map_err(|e| WalletError::StorageUnavailable(e.to_string()))
}

fn require_value(params: &[Value], index: usize) -> WalletResult<&Value> {
    params.get(index).ok_or(WalletError::WrongParams)
}

fn require_str(params: &[Value], index: usize) -> WalletResult<&str> {
    require_value(params, index)?
        .as_str()
        .ok_or(WalletError::WrongParams)
}

/// Optional string param: absent or `null` is `None`, wrong type rejects.
fn opt_str(params: &[Value], index: usize) -> WalletResult<Option<String>> {
    match params.get(index) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(s.clone())),
        Some(_) => Err(WalletError::WrongParams),
    }
}

/// Optional bool param, defaulting to `false`.
fn opt_bool(params: &[Value], index: usize) -> WalletResult<bool> {
    match params.get(index) {
        None | Some(Value::Null) => Ok(false),
        Some(Value::Bool(b)) => Ok(*b),
        Some(_) => Err(WalletError::WrongParams),
    }
}

/// Optional RFC 3339 date param.
fn opt_date(params: &[Value], index: usize) -> WalletResult<Option<DateTime<Utc>>> {
    match opt_str(params, index)? {
        None => Ok(None),
        Some(raw) => DateTime::parse_from_rfc3339(&raw)
            .map(|d| Some(d.with_timezone(&Utc)))
            .map_err(|_| WalletError::WrongParams),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::pending::PendingRequestView;
    use std::time::Duration;
    use tempfile::TempDir;

    const MNEMONIC: &str =
        "abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon about";
    const ORIGIN: &str = "https://dapp.example";

    fn test_state(ttl: Duration) -> (TempDir, AppState) {
        let dir = TempDir::new().expect("temp dir");
        let config = Config {
            data_dir: dir.path().to_path_buf(),
            pending_request_ttl: ttl,
            ..Config::default()
        };
        let controller = AppController::new(config).expect("controller");
        (dir, AppState::new(controller))
    }

    async fn unlocked_state() -> (TempDir, AppState) {
        let (dir, state) = test_state(Duration::from_secs(5));
        {
            let mut app = state.write().await;
            app.create_new_vault(MNEMONIC, "pw1").unwrap();
            app.unlock_app("pw1").unwrap();
        }
        (dir, state)
    }

    async fn grant(state: &AppState, origin: &str, level: i32) {
        state
            .write()
            .await
            .approve_connection(origin, None, "Test", level)
            .unwrap();
    }

    async fn wait_for_next_request(state: &AppState) -> PendingRequestView {
        for _ in 0..200 {
            if let Some(view) = state.write().await.get_next_request() {
                return view;
            }
            tokio::time::sleep(Duration::from_millis(2)).await;
        }
        panic!("no pending request showed up");
    }

    #[tokio::test]
    async fn unknown_method_rejected() {
        let (_dir, state) = unlocked_state().await;
        assert!(matches!(
            dispatch(&state, ORIGIN, "eth_sendTransaction", &[]).await,
            Err(WalletError::UnknownMethod(_))
        ));
    }

    #[tokio::test]
    async fn arity_checked_before_anything_else() {
        let (_dir, state) = test_state(Duration::from_secs(5));
        // Locked vault, but arity rejection comes first.
        assert!(matches!(
            dispatch(&state, ORIGIN, "create_new_vault", &[json!(MNEMONIC)]).await,
            Err(WalletError::WrongParams)
        ));
    }

    #[tokio::test]
    async fn lifecycle_bypasses_lock_and_grants() {
        let (_dir, state) = test_state(Duration::from_secs(5));

        let phrase = dispatch(&state, ORIGIN, "generate_seed_phrase", &[])
            .await
            .unwrap();
        let phrase = phrase.as_str().unwrap().to_string();

        let valid = dispatch(&state, ORIGIN, "validate_seed_phrase", &[json!(phrase)])
            .await
            .unwrap();
        assert_eq!(valid, json!(true));

        dispatch(
            &state,
            ORIGIN,
            "create_new_vault",
            &[json!(phrase), json!("pw1")],
        )
        .await
        .unwrap();
        assert!(state.read().await.is_onboarding_complete());
        assert!(!state.read().await.is_unlocked());
    }

    #[tokio::test]
    async fn locked_vault_fails_fast_for_gated_methods() {
        let (_dir, state) = test_state(Duration::from_secs(5));
        state
            .write()
            .await
            .create_new_vault(MNEMONIC, "pw1")
            .unwrap();

        assert!(matches!(
            dispatch(&state, ORIGIN, "get_address", &[]).await,
            Err(WalletError::PluginLocked)
        ));
        assert_eq!(state.read().await.pending_request_count(), 0);
    }

    #[tokio::test]
    async fn sufficient_grant_executes_immediately() {
        let (_dir, state) = unlocked_state().await;
        grant(&state, ORIGIN, 2).await;

        let list = dispatch(&state, ORIGIN, "get_identity_list", &[])
            .await
            .unwrap();
        assert_eq!(list, json!([]));
        // Nothing queued.
        assert_eq!(state.read().await.pending_request_count(), 0);
    }

    #[tokio::test]
    async fn insufficient_grant_queues_and_resolves_with_ui_value() {
        let (_dir, state) = unlocked_state().await;

        let task_state = state.clone();
        let caller = tokio::spawn(async move {
            dispatch(&task_state, "https://x.com", "delete_identity", &[json!("cc")]).await
        });

        let view = wait_for_next_request(&state).await;
        assert_eq!(view.origin, "https://x.com");
        assert_eq!(view.method, "delete_identity");
        assert_eq!(view.level, 2);

        state
            .write()
            .await
            .resolve_request(view.id, json!("ok"))
            .unwrap();

        assert_eq!(caller.await.unwrap().unwrap(), json!("ok"));
    }

    #[tokio::test]
    async fn popup_forced_queues_even_with_sufficient_grant() {
        let (_dir, state) = unlocked_state().await;
        grant(&state, ORIGIN, 3).await;

        let task_state = state.clone();
        let caller = tokio::spawn(async move {
            dispatch(&task_state, ORIGIN, "sign_erc191", &[json!("message")]).await
        });

        let view = wait_for_next_request(&state).await;
        state.write().await.cancel_request(view.id).unwrap();

        assert!(matches!(
            caller.await.unwrap(),
            Err(WalletError::UserRejected)
        ));
    }

    #[tokio::test]
    async fn approval_executes_operation_and_settles_caller() {
        let (_dir, state) = unlocked_state().await;

        let task_state = state.clone();
        let caller = tokio::spawn(async move {
            dispatch(
                &task_state,
                ORIGIN,
                "import_identity",
                &[json!("cc"), json!({"n": 1})],
            )
            .await
        });

        let view = wait_for_next_request(&state).await;
        approve(&state, view.id).await.unwrap();

        assert!(caller.await.unwrap().is_ok());
        let list = state.read().await.get_identity_list().unwrap();
        assert_eq!(list.len(), 1);
        assert_eq!(list[0].idt, "cc");
    }

    #[tokio::test]
    async fn approval_of_failing_operation_settles_caller_with_same_error() {
        let (_dir, state) = unlocked_state().await;

        let task_state = state.clone();
        let caller = tokio::spawn(async move {
            dispatch(&task_state, ORIGIN, "delete_identity", &[json!("ghost")]).await
        });

        let view = wait_for_next_request(&state).await;
        assert!(matches!(
            approve(&state, view.id).await,
            Err(WalletError::NotFound(_))
        ));
        assert!(matches!(
            caller.await.unwrap(),
            Err(WalletError::NotFound(_))
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn queued_wait_expires_as_user_rejected() {
        let (_dir, state) = test_state(Duration::from_millis(100));
        {
            let mut app = state.write().await;
            app.create_new_vault(MNEMONIC, "pw1").unwrap();
            app.unlock_app("pw1").unwrap();
        }

        // Nobody ever answers; the paused clock auto-advances past the TTL.
        let outcome = dispatch(&state, ORIGIN, "get_address", &[]).await;
        assert!(matches!(outcome, Err(WalletError::UserRejected)));
    }

    #[tokio::test]
    async fn fifo_across_multiple_origins() {
        let (_dir, state) = unlocked_state().await;

        for origin in ["https://a.com", "https://b.com", "https://c.com"] {
            let task_state = state.clone();
            let origin = origin.to_string();
            let task_origin = origin.clone();
            tokio::spawn(async move {
                let _ = dispatch(&task_state, &task_origin, "get_address", &[]).await;
            });
            // Serialize the pushes so insertion order is deterministic.
            while state.read().await.pending_request_count()
                < match origin.as_str() {
                    "https://a.com" => 1,
                    "https://b.com" => 2,
                    _ => 3,
                }
            {
                tokio::time::sleep(Duration::from_millis(2)).await;
            }
        }

        let first = wait_for_next_request(&state).await;
        let second = wait_for_next_request(&state).await;
        let third = wait_for_next_request(&state).await;
        assert_eq!(first.origin, "https://a.com");
        assert_eq!(second.origin, "https://b.com");
        assert_eq!(third.origin, "https://c.com");
    }
}
