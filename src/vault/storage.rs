// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Durable storage for sealed vault blobs.
//!
//! ## Storage Layout
//!
//! One file per logical sub-state, each independently re-encryptable:
//!
//! ```text
//! {DATA_DIR}/
//!   vault.json        # root blob (mnemonic)
//!   connections.json  # per-origin access grants
//!   identities.json   # identity asset store
//!   credentials.json  # credential asset store
//!   profiles.json     # social profile asset store
//! ```
//!
//! Writes go to a temp file and are renamed into place, so a crash cannot
//! leave a half-written blob. I/O failures surface as `StorageUnavailable`
//! and are never retried here — the caller decides whether to retry.

use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use serde::{de::DeserializeOwned, Serialize};

use crate::error::{WalletError, WalletResult};

/// The logical sub-states persisted through the vault.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlobKind {
    /// Root blob: the sealed mnemonic.
    VaultRoot,
    /// Per-origin access grants.
    Connections,
    /// Identity asset store.
    Identities,
    /// Credential asset store.
    Credentials,
    /// Social profile asset store.
    Profiles,
}

impl BlobKind {
    /// All sub-state kinds, in persistence order.
    pub const ALL: [BlobKind; 5] = [
        BlobKind::VaultRoot,
        BlobKind::Connections,
        BlobKind::Identities,
        BlobKind::Credentials,
        BlobKind::Profiles,
    ];

    fn file_name(self) -> &'static str {
        match self {
            BlobKind::VaultRoot => "vault.json",
            BlobKind::Connections => "connections.json",
            BlobKind::Identities => "identities.json",
            BlobKind::Credentials => "credentials.json",
            BlobKind::Profiles => "profiles.json",
        }
    }
}

/// Filesystem-backed blob storage rooted at a data directory.
#[derive(Debug, Clone)]
pub struct BlobStorage {
    root: PathBuf,
}

impl BlobStorage {
    /// Create storage rooted at `root`, creating the directory if needed.
    pub fn new(root: impl AsRef<Path>) -> WalletResult<Self> {
        let root = root.as_ref().to_path_buf();
        fs::create_dir_all(&root).map_err(io_err)?;
        Ok(Self { root })
    }

    /// Root directory for all sealed data.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Path of a sub-state blob file.
    pub fn blob_path(&self, kind: BlobKind) -> PathBuf {
        self.root.join(kind.file_name())
    }

    /// Check whether a blob file exists on disk.
    pub fn exists(&self, kind: BlobKind) -> bool {
        // File::open rather than Path::exists: an unreadable file is as
        // good as absent for our purposes.
        File::open(self.blob_path(kind)).is_ok()
    }

    /// Read and deserialize a blob file.
    pub fn read<T: DeserializeOwned>(&self, kind: BlobKind) -> WalletResult<T> {
        let file = File::open(self.blob_path(kind)).map_err(io_err)?;
        let reader = BufReader::new(file);
        serde_json::from_reader(reader)
            .map_err(|e| WalletError::StorageUnavailable(format!("corrupt blob file: {e}")))
    }

    /// Serialize and write a blob file (atomic via temp-file rename).
    pub fn write<T: Serialize>(&self, kind: BlobKind, value: &T) -> WalletResult<()> {
        let path = self.blob_path(kind);
        let temp_path = path.with_extension("tmp");
        {
            let file = File::create(&temp_path).map_err(io_err)?;
            let mut writer = BufWriter::new(file);
            serde_json::to_writer(&mut writer, value)
                .map_err(|e| WalletError::StorageUnavailable(e.to_string()))?;
            writer.flush().map_err(io_err)?;
        }
        fs::rename(&temp_path, &path).map_err(io_err)
    }

    /// Delete every blob file. Missing files are ignored.
    pub fn wipe(&self) -> WalletResult<()> {
        for kind in BlobKind::ALL {
            match fs::remove_file(self.blob_path(kind)) {
                Ok(()) => {}
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => return Err(io_err(e)),
            }
        }
        Ok(())
    }

    /// Write-read-delete probe used by the health endpoint.
    pub fn health_check(&self) -> WalletResult<()> {
        let probe = self.root.join(".health_check");
        fs::write(&probe, b"health_check_data").map_err(io_err)?;
        let read = fs::read(&probe).map_err(io_err)?;
        fs::remove_file(&probe).map_err(io_err)?;
        if read != b"health_check_data" {
            return Err(WalletError::StorageUnavailable(
                "health check data mismatch".to_string(),
            ));
        }
        Ok(())
    }
}

fn io_err(e: std::io::Error) -> WalletError {
    WalletError::StorageUnavailable(e.to_string())
}
