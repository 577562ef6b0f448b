// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! HTTP surface.
//!
//! Three endpoints:
//!
//! - `POST /rpc` — external calls from web origins. Always answers 200
//!   with an [`RpcResponse`] envelope; failures travel as error codes in
//!   the envelope, and the caller's nonce is echoed back for correlation.
//! - `POST /api` — the trusted UI channel (popup/settings pages). Typed
//!   [`UiRequest`] operations dispatched straight to the controller;
//!   failures map onto HTTP statuses.
//! - `GET /events` — server-sent events relaying wallet state transitions.
//! - `GET /healthz` — storage probe.
//!
//! The RPC surface is arbitered: every call goes through the method
//! catalog's decision procedure. The UI surface is not, by design — it is
//! the approval side of that procedure.

use axum::{
    extract::State,
    response::sse::{Event, KeepAlive, Sse},
    routing::{get, post},
    Json, Router,
};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::{json, Value};
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::StreamExt;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::warn;
use uuid::Uuid;

use crate::arbiter;
use crate::error::{WalletError, WalletResult};
use crate::identity_api::ExtractOutcome;
use crate::rpc::{RpcRequest, RpcResponse};
use crate::session::SessionMetadata;
use crate::state::AppState;
use crate::wallet::CipherEnvelope;

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/rpc", post(rpc_handler))
        .route("/api", post(ui_handler))
        .route("/events", get(events_handler))
        .route("/healthz", get(health_handler))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Operations available to the trusted UI pages.
#[derive(Debug, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum UiRequest {
    GetState,
    GenerateSeedPhrase,
    ValidateSeedPhrase {
        phrase: String,
    },
    CreateNewVault {
        phrase: String,
        password: String,
    },
    ResetVault,
    UnlockApp {
        password: String,
    },
    LockApp,
    VerifyPassword {
        password: String,
    },
    ApproveConnection {
        origin: String,
        #[serde(default)]
        icon: Option<String>,
        name: String,
        level: i32,
    },
    RemoveConnected {
        origin: String,
    },
    AccessControl {
        origin: String,
        level: i32,
    },
    SignMessage {
        message: String,
    },
    SignPrivateKey {
        data: Value,
    },
    EncryptData {
        data: Value,
    },
    DecryptData {
        envelope: CipherEnvelope,
    },
    ImportIdentity {
        idt: String,
        data: Value,
        #[serde(default)]
        overwrite: bool,
        #[serde(default)]
        idt_name: Option<String>,
        #[serde(default)]
        exp_date: Option<DateTime<Utc>>,
    },
    ExtractIdentityData {
        idt: String,
    },
    DeleteIdentity {
        idt: String,
    },
    ImportCredential {
        id: String,
        cred_name: String,
        ca_name: String,
        #[serde(default)]
        photo_url: Option<String>,
        user_data: Value,
        #[serde(default)]
        overwrite: bool,
        #[serde(default)]
        exp_date: Option<DateTime<Utc>>,
    },
    ImportCredentialSign {
        id: String,
        sig: String,
        verify_sig: String,
    },
    ExportCredential {
        id: String,
    },
    DeleteCredential {
        id: String,
    },
    ImportSocialProfile {
        id: String,
        profile_data: Value,
        username: String,
        social_name: String,
        #[serde(default)]
        overwrite: bool,
    },
    ExportSocialProfile {
        id: String,
    },
    DeleteProfile {
        id: String,
    },
    GetList {
        list_type: String,
    },
    ExportAsset {
        asset_type: String,
        id: String,
    },
    GetAuthorizationToken {
        idt: String,
        operation: String,
    },
    ExtractRemoteIdentity {
        auth_token: String,
    },
    GetNextRequest,
    /// Execute the popped request server-side and settle its caller.
    ApproveRequest {
        id: Uuid,
    },
    /// Settle a request with a UI-produced value (the passthrough path).
    ResolveRequest {
        id: Uuid,
        result: Value,
    },
    CancelRequest {
        id: Uuid,
    },
    UpdateActivePopups {
        id: u64,
        #[serde(default)]
        remove: bool,
    },
    GetActivePopups,
    InitSession {
        uri: String,
    },
    ApproveSession {
        metadata: SessionMetadata,
    },
}

/// External RPC endpoint. Never fails at the HTTP level.
async fn rpc_handler(
    State(state): State<AppState>,
    Json(request): Json<RpcRequest>,
) -> Json<RpcResponse> {
    let RpcRequest {
        method,
        params,
        origin,
        nonce,
    } = request;

    match arbiter::dispatch(&state, &origin, &method, &params).await {
        Ok(data) => Json(RpcResponse::ok(data, nonce)),
        Err(error) => {
            warn!(%origin, %method, code = error.code(), "rpc call rejected");
            Json(RpcResponse::err(error.code(), nonce))
        }
    }
}

/// Trusted UI endpoint.
async fn ui_handler(
    State(state): State<AppState>,
    Json(request): Json<UiRequest>,
) -> WalletResult<Json<Value>> {
    let response = match request {
        UiRequest::GetState => {
            let app = state.read().await;
            serde_json::to_value(app.get_state())
                .map_err(|e| WalletError::StorageUnavailable(e.to_string()))?
        }
        UiRequest::GenerateSeedPhrase => json!(state.read().await.generate_seed_phrase()),
        UiRequest::ValidateSeedPhrase { phrase } => {
            json!(state.read().await.validate_seed_phrase(&phrase))
        }
        UiRequest::CreateNewVault { phrase, password } => {
            state.write().await.create_new_vault(&phrase, &password)?;
            Value::Null
        }
        UiRequest::ResetVault => {
            state.write().await.reset_vault()?;
            Value::Null
        }
        UiRequest::UnlockApp { password } => {
            state.write().await.unlock_app(&password)?;
            Value::Null
        }
        UiRequest::LockApp => {
            state.write().await.lock_app();
            Value::Null
        }
        UiRequest::VerifyPassword { password } => {
            json!(state.read().await.verify_password(&password))
        }
        UiRequest::ApproveConnection {
            origin,
            icon,
            name,
            level,
        } => {
            state
                .write()
                .await
                .approve_connection(&origin, icon, &name, level)?;
            Value::Null
        }
        UiRequest::RemoveConnected { origin } => {
            state.write().await.remove_connected(&origin)?;
            Value::Null
        }
        UiRequest::AccessControl { origin, level } => {
            json!(state.read().await.access_control(&origin, level)?)
        }
        UiRequest::SignMessage { message } => {
            json!(state.read().await.generate_ec_signature(message.as_bytes())?)
        }
        UiRequest::SignPrivateKey { data } => {
            json!(state.read().await.sign_private_key(&data)?)
        }
        UiRequest::EncryptData { data } => {
            serde_json::to_value(state.read().await.encrypt_data(&data)?)
                .map_err(|e| WalletError::StorageUnavailable(e.to_string()))?
        }
        UiRequest::DecryptData { envelope } => state.read().await.decrypt_data(&envelope)?,
        UiRequest::ImportIdentity {
            idt,
            data,
            overwrite,
            idt_name,
            exp_date,
        } => {
            state
                .write()
                .await
                .import_identity(&idt, data, overwrite, exp_date, idt_name)?;
            Value::Null
        }
        UiRequest::ExtractIdentityData { idt } => {
            state.read().await.extract_identity_data(&idt)?
        }
        UiRequest::DeleteIdentity { idt } => {
            state.write().await.delete_identity(&idt)?;
            Value::Null
        }
        UiRequest::ImportCredential {
            id,
            cred_name,
            ca_name,
            photo_url,
            user_data,
            overwrite,
            exp_date,
        } => {
            state.write().await.import_credential(
                &id, &cred_name, &ca_name, photo_url, user_data, overwrite, exp_date,
            )?;
            Value::Null
        }
        UiRequest::ImportCredentialSign { id, sig, verify_sig } => {
            state
                .write()
                .await
                .import_credential_sign(&id, &sig, &verify_sig)?;
            Value::Null
        }
        UiRequest::ExportCredential { id } => state.read().await.export_credential(&id)?,
        UiRequest::DeleteCredential { id } => {
            state.write().await.delete_credential(&id)?;
            Value::Null
        }
        UiRequest::ImportSocialProfile {
            id,
            profile_data,
            username,
            social_name,
            overwrite,
        } => {
            state.write().await.import_social_profile(
                &id,
                profile_data,
                &username,
                &social_name,
                overwrite,
            )?;
            Value::Null
        }
        UiRequest::ExportSocialProfile { id } => {
            state.read().await.export_social_profile(&id)?
        }
        UiRequest::DeleteProfile { id } => {
            state.write().await.delete_profile(&id)?;
            Value::Null
        }
        UiRequest::GetList { list_type } => state.read().await.get_asset_list(&list_type)?,
        UiRequest::ExportAsset { asset_type, id } => {
            state.read().await.export_asset(&asset_type, &id)?
        }
        UiRequest::GetAuthorizationToken { idt, operation } => {
            json!(
                state
                    .read()
                    .await
                    .get_authorization_token(&idt, &operation)
                    .await?
            )
        }
        UiRequest::ExtractRemoteIdentity { auth_token } => {
            match state.read().await.extract_remote_identity(&auth_token).await? {
                ExtractOutcome::Pending => json!({ "status": "pending" }),
                ExtractOutcome::Data(data) => json!({ "status": "ok", "data": data }),
            }
        }
        UiRequest::GetNextRequest => {
            serde_json::to_value(state.write().await.get_next_request())
                .map_err(|e| WalletError::StorageUnavailable(e.to_string()))?
        }
        UiRequest::ApproveRequest { id } => arbiter::approve(&state, id).await?,
        UiRequest::ResolveRequest { id, result } => {
            state.write().await.resolve_request(id, result)?;
            Value::Null
        }
        UiRequest::CancelRequest { id } => {
            state.write().await.cancel_request(id)?;
            Value::Null
        }
        UiRequest::UpdateActivePopups { id, remove } => {
            state.write().await.update_active_popups(id, remove);
            Value::Null
        }
        UiRequest::GetActivePopups => json!(state.read().await.get_active_popups()),
        UiRequest::InitSession { uri } => json!(state.write().await.init_session(&uri)?),
        UiRequest::ApproveSession { metadata } => {
            json!(state.write().await.approve_session(metadata)?)
        }
    };
    Ok(Json(response))
}

/// Wallet event relay as server-sent events.
async fn events_handler(
    State(state): State<AppState>,
) -> Sse<impl tokio_stream::Stream<Item = Result<Event, axum::Error>>> {
    let receiver = state.read().await.events().subscribe();
    let stream = BroadcastStream::new(receiver).filter_map(|event| match event {
        Ok(event) => match Event::default().json_data(&event) {
            Ok(sse_event) => Some(Ok(sse_event)),
            Err(e) => Some(Err(axum::Error::new(e))),
        },
        // Lagged subscriber: skip, the UI refreshes from get_state anyway.
        Err(_) => None,
    });
    Sse::new(stream).keep_alive(KeepAlive::default())
}

async fn health_handler(State(state): State<AppState>) -> WalletResult<Json<Value>> {
    state.read().await.health_check()?;
    Ok(Json(json!({ "status": "ok" })))
}
