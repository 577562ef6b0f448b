// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Runtime Configuration
//!
//! Environment variable names and defaults used throughout the backend.
//! Configuration is loaded from the environment once at startup.
//!
//! ## Environment Variables
//!
//! | Variable | Description | Default |
//! |----------|-------------|---------|
//! | `DATA_DIR` | Root directory for sealed vault blobs | `/data` |
//! | `HOST` | Server bind address | `127.0.0.1` |
//! | `PORT` | Server bind port | `8080` |
//! | `IDENTITY_API_URL` | Base URL of the remote identity API | `https://api.wallid.io/api/v1` |
//! | `PENDING_REQUEST_TTL_SECS` | Seconds before a queued request expires | `300` |
//! | `LOG_FORMAT` | Logging format (`json` or `pretty`) | `pretty` |
//! | `RUST_LOG` | Log level filter | `info,tower_http=debug` |

use std::env;
use std::path::PathBuf;
use std::time::Duration;

/// Environment variable name for the sealed data directory path.
pub const DATA_DIR_ENV: &str = "DATA_DIR";

/// Environment variable name for the server bind address.
pub const HOST_ENV: &str = "HOST";

/// Environment variable name for the server bind port.
pub const PORT_ENV: &str = "PORT";

/// Environment variable name for the remote identity API base URL.
pub const IDENTITY_API_URL_ENV: &str = "IDENTITY_API_URL";

/// Environment variable name for the pending-request expiry.
pub const PENDING_REQUEST_TTL_ENV: &str = "PENDING_REQUEST_TTL_SECS";

/// Default root for sealed vault blobs.
pub const DEFAULT_DATA_DIR: &str = "/data";

/// Default server bind address.
pub const DEFAULT_HOST: &str = "127.0.0.1";

/// Default server bind port.
pub const DEFAULT_PORT: u16 = 8080;

/// Default base URL of the remote identity API.
pub const DEFAULT_IDENTITY_API_URL: &str = "https://api.wallid.io/api/v1";

/// Default time a queued request waits for user action before it is
/// cancelled as rejected.
pub const DEFAULT_PENDING_REQUEST_TTL: Duration = Duration::from_secs(300);

/// Resolved runtime configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Root directory for sealed vault blobs.
    pub data_dir: PathBuf,
    /// Server bind address.
    pub host: String,
    /// Server bind port.
    pub port: u16,
    /// Base URL of the remote identity API.
    pub identity_api_url: String,
    /// How long a queued request waits for user action.
    pub pending_request_ttl: Duration,
}

impl Config {
    /// Load configuration from the environment, falling back to defaults.
    pub fn from_env() -> Self {
        let data_dir = env::var(DATA_DIR_ENV)
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from(DEFAULT_DATA_DIR));

        let host = env::var(HOST_ENV).unwrap_or_else(|_| DEFAULT_HOST.to_string());
        let port = env::var(PORT_ENV)
            .ok()
            .and_then(|v| v.parse::<u16>().ok())
            .unwrap_or(DEFAULT_PORT);

        let identity_api_url = env::var(IDENTITY_API_URL_ENV)
            .unwrap_or_else(|_| DEFAULT_IDENTITY_API_URL.to_string());

        let pending_request_ttl = env::var(PENDING_REQUEST_TTL_ENV)
            .ok()
            .and_then(|v| v.parse::<u64>().ok())
            .map(Duration::from_secs)
            .unwrap_or(DEFAULT_PENDING_REQUEST_TTL);

        Self {
            data_dir,
            host,
            port,
            identity_api_url,
            pending_request_ttl,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from(DEFAULT_DATA_DIR),
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            identity_api_url: DEFAULT_IDENTITY_API_URL.to_string(),
            pending_request_ttl: DEFAULT_PENDING_REQUEST_TTL,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_values() {
        let config = Config::default();
        assert_eq!(config.data_dir, PathBuf::from("/data"));
        assert_eq!(config.host, "127.0.0.1");
        assert_eq!(config.port, 8080);
        assert_eq!(config.identity_api_url, DEFAULT_IDENTITY_API_URL);
        assert_eq!(config.pending_request_ttl, Duration::from_secs(300));
    }
}
