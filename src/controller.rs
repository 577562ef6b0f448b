// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Application layer tying the vault, wallet, registries and queues
//! together.
//!
//! One [`AppController`] instance owns all mutable wallet state. The HTTP
//! layer wraps it in a single `RwLock`; every operation here runs with the
//! lock held, so read-modify-persist sequences are never interleaved.
//!
//! ## Runtime state
//!
//! Decrypted state exists only between `unlock_app` and `lock_app`, bundled
//! in the private `Runtime` struct. Locking drops it wholesale: wallet
//! keys, deserialized stores, the session bridge, and the unlock password
//! all go at once, and every queued request is settled as locked.
//!
//! Asset mutations persist their store's sealed blob before returning, so
//! a crash never loses an acknowledged write.

use chrono::{DateTime, Utc};
use secrecy::{ExposeSecret, SecretString};
use serde::Serialize;
use serde_json::{json, Value};
use tracing::info;
use uuid::Uuid;

use crate::assets::credentials::CredentialSummary;
use crate::assets::identities::IdentitySummary;
use crate::assets::profiles::ProfileSummary;
use crate::assets::{CredentialStatus, CredentialStore, IdentityStore, ProfileStore};
use crate::config::Config;
use crate::connections::{Connection, ConnectionRegistry};
use crate::error::{WalletError, WalletResult};
use crate::events::{EventBus, WalletEvent};
use crate::identity_api::{self, ExtractOutcome, IdentityApiClient};
use crate::mnemonic;
use crate::pending::{PendingRequestQueue, PendingRequestView, PopupRegistry};
use crate::session::{SessionBridge, SessionMetadata, SESSION_GRANT_LEVEL};
use crate::vault::storage::{BlobKind, BlobStorage};
use crate::vault::Vault;
use crate::wallet::{CipherEnvelope, Wallet};

/// Decrypted working state, present only while unlocked.
struct Runtime {
    wallet: Wallet,
    /// Kept for re-sealing blobs on writes; zeroized on drop.
    password: SecretString,
    connections: ConnectionRegistry,
    identities: IdentityStore,
    credentials: CredentialStore,
    profiles: ProfileStore,
    session: SessionBridge,
}

/// Snapshot handed to the UI on request.
#[derive(Debug, Serialize)]
pub struct UiState {
    /// A vault exists on disk.
    pub initialized: bool,
    pub unlocked: bool,
    pub address: Option<String>,
    pub connections: Option<Vec<Connection>>,
    pub identities: Option<Vec<IdentitySummary>>,
    pub credentials: Option<Vec<CredentialSummary>>,
    pub profiles: Option<Vec<ProfileSummary>>,
    pub pending_requests: usize,
    pub active_popups: Vec<u64>,
}

/// Central application state and operation surface.
pub struct AppController {
    config: Config,
    vault: Vault,
    runtime: Option<Runtime>,
    pending: PendingRequestQueue,
    popups: PopupRegistry,
    events: EventBus,
    identity_api: IdentityApiClient,
}

impl AppController {
    pub fn new(config: Config) -> WalletResult<Self> {
        let storage = BlobStorage::new(&config.data_dir)?;
        let identity_api = IdentityApiClient::new(config.identity_api_url.clone());
        Ok(Self {
            config,
            vault: Vault::new(storage),
            runtime: None,
            pending: PendingRequestQueue::new(),
            popups: PopupRegistry::new(),
            events: EventBus::new(),
            identity_api,
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn events(&self) -> &EventBus {
        &self.events
    }

    /// Probe blob storage end to end.
    pub fn health_check(&self) -> WalletResult<()> {
        self.vault.storage().health_check()
    }

    // ------------------------------------------------------------------
    // Onboarding and lock lifecycle
    // ------------------------------------------------------------------

    pub fn generate_seed_phrase(&self) -> String {
        mnemonic::generate()
    }

    /// Checksum-validate a phrase; while unlocked it must also match the
    /// vault's own mnemonic (the UI's "confirm your seed phrase" flow).
    pub fn validate_seed_phrase(&self, phrase: &str) -> bool {
        if !mnemonic::validate(phrase) {
            return false;
        }
        match &self.runtime {
            Some(rt) => {
                Wallet::from_mnemonic(phrase).is_ok_and(|w| w.address() == rt.wallet.address())
            }
            None => true,
        }
    }

    /// A vault blob exists on disk.
    pub fn is_onboarding_complete(&self) -> bool {
        !self.vault.is_empty()
    }

    pub fn is_unlocked(&self) -> bool {
        self.runtime.is_some()
    }

    /// Create (or overwrite) the vault. The vault stays locked afterwards;
    /// the caller unlocks with the same password.
    pub fn create_new_vault(&mut self, phrase: &str, password: &str) -> WalletResult<()> {
        let address = Wallet::from_mnemonic(phrase)?.address().to_string();
        self.vault.create_new_and_persist(phrase, password)?;
        self.discard_runtime();
        info!(%address, "vault created");
        self.events.publish(WalletEvent::WalletCreated { address });
        Ok(())
    }

    /// Wipe the vault irreversibly. Requires an unlocked vault; the
    /// retained unlock password is re-verified before the wipe.
    pub fn reset_vault(&mut self) -> WalletResult<()> {
        let rt = self.runtime.as_ref().ok_or(WalletError::PluginLocked)?;
        self.vault.full_reset(rt.password.expose_secret())?;
        self.discard_runtime();
        info!("vault reset");
        self.events.publish(WalletEvent::WalletReset);
        Ok(())
    }

    pub fn unlock_app(&mut self, password: &str) -> WalletResult<()> {
        let state = self.vault.unlock(password)?;
        let wallet = Wallet::from_mnemonic(&state.mnemonic)?;
        let address = wallet.address().to_string();

        self.runtime = Some(Runtime {
            wallet,
            password: SecretString::from(password.to_string()),
            connections: ConnectionRegistry::deserialize(&state.connections)?,
            identities: IdentityStore::deserialize(&state.identities)?,
            credentials: CredentialStore::deserialize(&state.credentials)?,
            profiles: ProfileStore::deserialize(&state.profiles)?,
            session: SessionBridge::new(),
        });
        info!(%address, "vault unlocked");
        self.events.publish(WalletEvent::WalletUnlocked { address });
        Ok(())
    }

    /// Lock: drop decrypted state and settle every queued request as
    /// locked. Idempotent.
    pub fn lock_app(&mut self) {
        self.vault.lock();
        let was_unlocked = self.runtime.is_some();
        self.discard_runtime();
        if was_unlocked {
            info!("vault locked");
            self.events.publish(WalletEvent::WalletLocked);
        }
    }

    /// Check a password without touching lock state.
    pub fn verify_password(&self, password: &str) -> bool {
        self.vault.submit_password(password).is_ok()
    }

    pub fn address(&self) -> Option<&str> {
        self.runtime.as_ref().map(|rt| rt.wallet.address())
    }

    // ------------------------------------------------------------------
    // Connections
    // ------------------------------------------------------------------

    /// Grant (or upgrade) an origin's access level and persist.
    pub fn approve_connection(
        &mut self,
        origin: &str,
        icon: Option<String>,
        name: &str,
        level: i32,
    ) -> WalletResult<()> {
        let rt = self.runtime_mut()?;
        rt.connections.upgrade_connected(origin, icon, name, level)?;
        self.persist_connections()?;
        info!(%origin, level, "connection approved");
        self.events.publish(WalletEvent::OriginConnected {
            origin: origin.to_string(),
            level,
        });
        Ok(())
    }

    pub fn remove_connected(&mut self, origin: &str) -> WalletResult<()> {
        let rt = self.runtime_mut()?;
        rt.connections.remove_connected(origin)?;
        self.persist_connections()?;
        info!(%origin, "connection removed");
        self.events.publish(WalletEvent::OriginDisconnected {
            origin: origin.to_string(),
        });
        Ok(())
    }

    /// True when `origin` holds a grant at or above `level`.
    pub fn access_control(&self, origin: &str, level: i32) -> WalletResult<bool> {
        Ok(self.connection_access_level(origin)? >= level)
    }

    /// Stored grant level for `origin`, `-1` when unknown.
    pub fn connection_access_level(&self, origin: &str) -> WalletResult<i32> {
        Ok(self
            .runtime()?
            .connections
            .get_connection_access_level(origin))
    }

    pub fn get_all_connections(&self) -> WalletResult<Vec<Connection>> {
        Ok(self.runtime()?.connections.get_all_connections().to_vec())
    }

    // ------------------------------------------------------------------
    // Wallet capability
    // ------------------------------------------------------------------

    /// ECDSA-sign arbitrary bytes, hex DER output.
    pub fn generate_ec_signature(&self, message: &[u8]) -> WalletResult<String> {
        Ok(self.runtime()?.wallet.sign_message(message))
    }

    /// Sign a JSON value with the wallet key. The value is serialized to
    /// its compact JSON text first, so structurally equal values sign the
    /// same.
    pub fn sign_private_key(&self, data: &Value) -> WalletResult<String> {
        let rt = self.runtime()?;
        let serialized = serde_json::to_string(data)
            .map_err(|e| WalletError::StorageUnavailable(e.to_string()))?;
        Ok(rt.wallet.sign_message(serialized.as_bytes()))
    }

    pub fn encrypt_data(&self, data: &Value) -> WalletResult<CipherEnvelope> {
        self.runtime()?.wallet.encrypt(data)
    }

    pub fn decrypt_data(&self, envelope: &CipherEnvelope) -> WalletResult<Value> {
        self.runtime()?.wallet.decrypt(envelope)
    }

    // ------------------------------------------------------------------
    // Identities
    // ------------------------------------------------------------------

    pub fn import_identity(
        &mut self,
        idt: &str,
        data: Value,
        overwrite: bool,
        exp_date: Option<DateTime<Utc>>,
        idt_name: Option<String>,
    ) -> WalletResult<()> {
        let rt = self.runtime_mut()?;
        rt.identities
            .add_identity(idt, data, overwrite, exp_date, idt_name)?;
        self.persist_identities()
    }

    /// Identity payload, decrypted when it is a wallet cipher envelope.
    pub fn extract_identity_data(&self, idt: &str) -> WalletResult<Value> {
        let rt = self.runtime()?;
        let record = rt.identities.get(idt)?;
        match serde_json::from_value::<CipherEnvelope>(record.data.clone()) {
            Ok(envelope) => rt.wallet.decrypt(&envelope),
            Err(_) => Ok(record.data.clone()),
        }
    }

    pub fn delete_identity(&mut self, idt: &str) -> WalletResult<()> {
        self.runtime_mut()?.identities.delete_identity(idt)?;
        self.persist_identities()
    }

    pub fn get_identity_list(&self) -> WalletResult<Vec<IdentitySummary>> {
        Ok(self.runtime()?.identities.get_list())
    }

    // ------------------------------------------------------------------
    // Credentials
    // ------------------------------------------------------------------

    #[allow(clippy::too_many_arguments)]
    pub fn import_credential(
        &mut self,
        id: &str,
        cred_name: &str,
        ca_name: &str,
        photo_url: Option<String>,
        user_data: Value,
        overwrite: bool,
        exp_date: Option<DateTime<Utc>>,
    ) -> WalletResult<()> {
        let rt = self.runtime_mut()?;
        rt.credentials.add_credential(
            id,
            cred_name,
            ca_name,
            photo_url,
            user_data,
            CredentialStatus::PendingApproval,
            overwrite,
            exp_date,
        )?;
        self.persist_credentials()
    }

    /// Attach the issuer's signature pair, activating the credential.
    pub fn import_credential_sign(
        &mut self,
        id: &str,
        sig: &str,
        verify_sig: &str,
    ) -> WalletResult<()> {
        self.runtime_mut()?
            .credentials
            .add_credential_sign(id, sig, verify_sig)?;
        self.persist_credentials()
    }

    pub fn export_credential(&self, id: &str) -> WalletResult<Value> {
        let record = self.runtime()?.credentials.get(id)?;
        serde_json::to_value(record).map_err(|e| WalletError::StorageUnavailable(e.to_string()))
    }

    pub fn delete_credential(&mut self, id: &str) -> WalletResult<()> {
        self.runtime_mut()?.credentials.delete_credential(id)?;
        self.persist_credentials()
    }

    pub fn get_credential_list(&self) -> WalletResult<Vec<CredentialSummary>> {
        Ok(self.runtime()?.credentials.get_list())
    }

    // ------------------------------------------------------------------
    // Social profiles
    // ------------------------------------------------------------------

    pub fn import_social_profile(
        &mut self,
        id: &str,
        profile_data: Value,
        username: &str,
        social_name: &str,
        overwrite: bool,
    ) -> WalletResult<()> {
        let rt = self.runtime_mut()?;
        rt.profiles
            .add_profile(id, profile_data, username, social_name, overwrite)?;
        self.persist_profiles()
    }

    pub fn export_social_profile(&self, id: &str) -> WalletResult<Value> {
        let record = self.runtime()?.profiles.get(id)?;
        serde_json::to_value(record).map_err(|e| WalletError::StorageUnavailable(e.to_string()))
    }

    pub fn delete_profile(&mut self, id: &str) -> WalletResult<()> {
        self.runtime_mut()?.profiles.delete_profile(id)?;
        self.persist_profiles()
    }

    pub fn get_profile_list(&self) -> WalletResult<Vec<ProfileSummary>> {
        Ok(self.runtime()?.profiles.get_list())
    }

    // ------------------------------------------------------------------
    // Cross-store asset access
    // ------------------------------------------------------------------

    /// Summary listing keyed by store type. `assets` aggregates all three
    /// stores into one object.
    pub fn get_asset_list(&self, list_type: &str) -> WalletResult<Value> {
        let rt = self.runtime()?;
        match list_type {
            "identities" => Ok(json!({ "identities": rt.identities.get_list() })),
            "credentials" => Ok(json!({ "credentials": rt.credentials.get_list() })),
            "profiles" => Ok(json!({ "profiles": rt.profiles.get_list() })),
            "assets" => Ok(json!({
                "identities": rt.identities.get_list(),
                "credentials": rt.credentials.get_list(),
                "profiles": rt.profiles.get_list(),
            })),
            other => Err(WalletError::NotFound(format!("asset store {other}"))),
        }
    }

    /// Export one full asset record from the named store.
    pub fn export_asset(&self, asset_type: &str, id: &str) -> WalletResult<Value> {
        let rt = self.runtime()?;
        let record = match asset_type {
            "identities" => serde_json::to_value(rt.identities.get(id)?),
            "credentials" => serde_json::to_value(rt.credentials.get(id)?),
            "profiles" => serde_json::to_value(rt.profiles.get(id)?),
            other => return Err(WalletError::NotFound(format!("asset store {other}"))),
        };
        record.map_err(|e| WalletError::StorageUnavailable(e.to_string()))
    }

    // ------------------------------------------------------------------
    // Remote identity API
    // ------------------------------------------------------------------

    /// Run the challenge-sign-encode token flow against the remote
    /// identity provider.
    pub async fn get_authorization_token(
        &self,
        idt: &str,
        operation: &str,
    ) -> WalletResult<String> {
        let rt = self.runtime()?;
        let challenge = self
            .identity_api
            .request_challenge(rt.wallet.address(), idt, operation)
            .await?;
        let signature = rt.wallet.sign_message(challenge.as_bytes());
        Ok(identity_api::build_authorization_token(
            &challenge, &signature,
        ))
    }

    /// Fetch identity data from the provider. A 202 answer surfaces as
    /// [`ExtractOutcome::Pending`], not an error.
    pub async fn extract_remote_identity(
        &self,
        auth_token: &str,
    ) -> WalletResult<ExtractOutcome> {
        self.identity_api.extract_identity(auth_token).await
    }

    // ------------------------------------------------------------------
    // Pending requests and popups
    // ------------------------------------------------------------------

    /// Queue a gated call for user approval. Returns the receiver the
    /// arbiter awaits, and announces the popup request.
    pub fn update_pending_requests(
        &mut self,
        origin: &str,
        method: &str,
        params: Vec<Value>,
        level: i32,
    ) -> WalletResult<(
        Uuid,
        tokio::sync::oneshot::Receiver<WalletResult<Value>>,
    )> {
        let (id, rx) = self.pending.push(origin, method, params, level)?;
        self.events
            .publish(WalletEvent::PopupRequested { request_id: id });
        Ok((id, rx))
    }

    pub fn get_next_request(&mut self) -> Option<PendingRequestView> {
        self.pending.get_next_request()
    }

    /// Call details of a popped-but-unsettled request.
    pub fn in_flight_request(&self, id: Uuid) -> Option<PendingRequestView> {
        self.pending.in_flight_view(id)
    }

    /// Settle a pending request with the outcome the approval UI produced.
    pub fn resolve_request(&mut self, id: Uuid, result: Value) -> WalletResult<()> {
        self.pending.resolve(id, Ok(result))
    }

    /// Settle a pending request with an arbitrary outcome, including an
    /// error from executing the approved operation.
    pub fn settle_request(&mut self, id: Uuid, outcome: WalletResult<Value>) -> WalletResult<()> {
        self.pending.resolve(id, outcome)
    }

    pub fn cancel_request(&mut self, id: Uuid) -> WalletResult<()> {
        self.pending.cancel(id)
    }

    pub fn pending_request_count(&self) -> usize {
        self.pending.len()
    }

    pub fn update_active_popups(&mut self, id: u64, remove: bool) {
        self.popups.update_active_popups(id, remove);
    }

    pub fn get_active_popups(&self) -> Vec<u64> {
        self.popups.get_active_popups().to_vec()
    }

    // ------------------------------------------------------------------
    // Sessions
    // ------------------------------------------------------------------

    /// Stage an external session from its handshake URI and grant the
    /// bridge origin the default session level.
    pub fn init_session(&mut self, uri: &str) -> WalletResult<String> {
        let rt = self.runtime_mut()?;
        let proposal = rt.session.init_from_uri(uri)?;
        let topic = proposal.topic.clone();
        let origin = proposal.bridge.origin().ascii_serialization();

        self.grant_session_origin(&origin, None, &origin)?;
        info!(%topic, "session proposed");
        self.events.publish(WalletEvent::SessionProposed { topic });
        Ok(self.runtime()?.wallet.address().to_string())
    }

    /// Approve the staged session with the peer's metadata, granting its
    /// URL the default session level.
    pub fn approve_session(&mut self, metadata: SessionMetadata) -> WalletResult<String> {
        let rt = self.runtime_mut()?;
        let session = rt.session.approve_session(metadata)?;
        let topic = session.topic.clone();
        let url = session.metadata.url.clone();
        let icon = session.metadata.icon.clone();
        let name = session.metadata.name.clone();

        self.grant_session_origin(&url, icon, &name)?;
        info!(%topic, %url, "session approved");
        self.events.publish(WalletEvent::SessionApproved { topic });
        Ok(self.runtime()?.wallet.address().to_string())
    }

    /// UI snapshot. Protected fields are `None` while locked.
    pub fn get_state(&self) -> UiState {
        let rt = self.runtime.as_ref();
        UiState {
            initialized: self.is_onboarding_complete(),
            unlocked: rt.is_some(),
            address: rt.map(|rt| rt.wallet.address().to_string()),
            connections: rt.map(|rt| rt.connections.get_all_connections().to_vec()),
            identities: rt.map(|rt| rt.identities.get_list()),
            credentials: rt.map(|rt| rt.credentials.get_list()),
            profiles: rt.map(|rt| rt.profiles.get_list()),
            pending_requests: self.pending.len(),
            active_popups: self.popups.get_active_popups().to_vec(),
        }
    }

    // ------------------------------------------------------------------
    // Internals
    // ------------------------------------------------------------------

    fn runtime(&self) -> WalletResult<&Runtime> {
        self.runtime.as_ref().ok_or(WalletError::PluginLocked)
    }

    fn runtime_mut(&mut self) -> WalletResult<&mut Runtime> {
        self.runtime.as_mut().ok_or(WalletError::PluginLocked)
    }

    fn discard_runtime(&mut self) {
        if let Some(rt) = &mut self.runtime {
            rt.session.clear();
        }
        self.runtime = None;
        self.pending.drain_all(|| WalletError::PluginLocked);
    }

    /// Session auto-grant: an existing equal-or-higher grant is kept as is.
    fn grant_session_origin(
        &mut self,
        origin: &str,
        icon: Option<String>,
        name: &str,
    ) -> WalletResult<()> {
        let rt = self.runtime_mut()?;
        match rt
            .connections
            .upgrade_connected(origin, icon, name, SESSION_GRANT_LEVEL)
        {
            Ok(()) => {
                self.persist_connections()?;
                self.events.publish(WalletEvent::OriginConnected {
                    origin: origin.to_string(),
                    level: SESSION_GRANT_LEVEL,
                });
                Ok(())
            }
            Err(WalletError::AlreadyConnected(_)) => Ok(()),
            Err(e) => Err(e),
        }
    }

    fn persist_connections(&self) -> WalletResult<()> {
        let rt = self.runtime()?;
        self.vault.put_substate(
            BlobKind::Connections,
            &rt.connections.serialize()?,
            rt.password.expose_secret(),
        )
    }

    fn persist_identities(&self) -> WalletResult<()> {
        let rt = self.runtime()?;
        self.vault.put_substate(
            BlobKind::Identities,
            &rt.identities.serialize()?,
            rt.password.expose_secret(),
        )
    }

    fn persist_credentials(&self) -> WalletResult<()> {
        let rt = self.runtime()?;
        self.vault.put_substate(
            BlobKind::Credentials,
            &rt.credentials.serialize()?,
            rt.password.expose_secret(),
        )
    }

    fn persist_profiles(&self) -> WalletResult<()> {
        let rt = self.runtime()?;
        self.vault.put_substate(
            BlobKind::Profiles,
            &rt.profiles.serialize()?,
            rt.password.expose_secret(),
        )
    }
}
