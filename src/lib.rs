// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! WalliD Backend - Extension Wallet Vault & Access-Control Service
//!
//! This crate provides the backend of a browser-extension identity wallet:
//! an encrypted vault for the seed phrase and user assets, per-origin
//! access grants, and user-approval arbitration for operations requested
//! by untrusted web origins.
//!
//! ## Modules
//!
//! - `api` - HTTP surface: external RPC, trusted UI channel, events (Axum)
//! - `arbiter` - per-call decision procedure over the method catalog
//! - `catalog` - static descriptor table for externally invokable methods
//! - `controller` - application layer tying vault, wallet and stores together
//! - `vault` - encrypted-at-rest storage and the lock/unlock state machine
//! - `wallet` - signing and encryption capability derived from the seed
//! - `assets` - identity / credential / social-profile stores
//! - `connections` - per-origin access-level registry
//! - `pending` - queue of requests awaiting user approval
//! - `session` - external session handshake bridge
//! - `identity_api` - remote identity provider client

pub mod api;
pub mod arbiter;
pub mod assets;
pub mod catalog;
pub mod config;
pub mod connections;
pub mod controller;
pub mod error;
pub mod events;
pub mod identity_api;
pub mod mnemonic;
pub mod pending;
pub mod rpc;
pub mod session;
pub mod state;
pub mod vault;
pub mod wallet;
