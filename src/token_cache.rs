//! Persistent per-backend store of signed-in accounts.
//!
//! The cache is a JSON document keyed by `<client id>@<authority>`. It is written atomically
//! and readable by the owner only. It is not encrypted.

use crate::checkpoint::write_private;
use crate::error::WellboreError;

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

/// A signed-in account and its most recent tokens.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct CachedAccount {
    pub client_id: String,
    pub authority: String,
    pub refresh_token: String,
    #[serde(default)]
    pub access_token: Option<String>,
    /// Expiry of the access token in seconds since the Unix epoch
    #[serde(default)]
    pub expires_at: Option<u64>,
}

/// Seconds since the Unix epoch.
pub fn now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

#[derive(Debug, Default, Deserialize, Serialize)]
struct CacheFile {
    #[serde(default)]
    accounts: BTreeMap<String, CachedAccount>,
}

/// Token cache backed by a file.
#[derive(Debug)]
pub struct TokenCache {
    path: PathBuf,
    file: CacheFile,
}

fn key(client_id: &str, authority: &str) -> String {
    format!("{}@{}", client_id, authority)
}

impl TokenCache {
    /// Load the cache. A missing file yields an empty cache and an unreadable one is discarded.
    pub fn load(path: &Path) -> Result<Self, WellboreError> {
        let file = match std::fs::read(path) {
            Ok(bytes) => serde_json::from_slice(&bytes).unwrap_or_else(|err| {
                tracing::warn!("Discarding unreadable token cache {:?}: {}", path, err);
                CacheFile::default()
            }),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => CacheFile::default(),
            Err(err) => {
                return Err(WellboreError::CacheError {
                    error: format!("failed to read {:?}: {}", path, err),
                })
            }
        };
        Ok(Self {
            path: path.to_path_buf(),
            file,
        })
    }

    /// Cached account for a client and authority.
    pub fn account(&self, client_id: &str, authority: &str) -> Option<&CachedAccount> {
        self.file.accounts.get(&key(client_id, authority))
    }

    /// Store an account, replacing any earlier one for the same client and authority, and
    /// persist the cache.
    pub fn store(&mut self, account: CachedAccount) -> Result<(), WellboreError> {
        self.file
            .accounts
            .insert(key(&account.client_id, &account.authority), account);
        self.save()
    }

    /// Remove an account and persist the cache.
    pub fn remove(&mut self, client_id: &str, authority: &str) -> Result<(), WellboreError> {
        if self.file.accounts.remove(&key(client_id, authority)).is_some() {
            self.save()?;
        }
        Ok(())
    }

    fn save(&self) -> Result<(), WellboreError> {
        let bytes = serde_json::to_vec_pretty(&self.file)?;
        write_private(&self.path, &bytes).map_err(|err| WellboreError::CacheError {
            error: format!("failed to write {:?}: {}", self.path, err),
        })
    }
}
