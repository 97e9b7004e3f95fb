//! Disk-backed key-value store: one file per key under a root directory,
//! `{"value": <raw-json>, "expires_at": <RFC3339>}`. Writes are atomic
//! (write to a temp file, then rename).

use std::path::PathBuf;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug)]
pub enum DiskStoreError {
    Io(std::io::Error),
    Corrupt(serde_json::Error),
}

impl std::fmt::Display for DiskStoreError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DiskStoreError::Io(err) => write!(f, "disk store io error: {err}"),
            DiskStoreError::Corrupt(err) => write!(f, "disk store entry is not valid json: {err}"),
        }
    }
}

impl std::error::Error for DiskStoreError {}

impl From<std::io::Error> for DiskStoreError {
    fn from(err: std::io::Error) -> Self {
        DiskStoreError::Io(err)
    }
}

#[derive(Serialize, Deserialize)]
struct Entry {
    value: Value,
    expires_at: DateTime<Utc>,
}

pub struct DiskStore {
    root: PathBuf,
}

impl DiskStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.root.join(key)
    }

    /// Marshals `{value, expires_at}` and replaces any previous file for
    /// `key` atomically: write to a sibling temp file, then rename.
    pub async fn set(&self, key: &str, value: Value, ttl: Duration) -> Result<(), DiskStoreError> {
        tokio::fs::create_dir_all(&self.root).await?;
        let entry = Entry { value, expires_at: Utc::now() + ttl };
        let payload = serde_json::to_vec_pretty(&entry).expect("cache entry always serializes");

        let temp_path = self.path_for(&format!("{key}.tmp-{}", std::process::id()));
        tokio::fs::write(&temp_path, &payload).await?;
        tokio::fs::rename(&temp_path, self.path_for(key)).await?;
        Ok(())
    }

    /// Not-found is a distinguished miss (`Ok(None)`); a corrupt entry
    /// surfaces as an error rather than a silent miss. An expired entry is
    /// deleted and reported as a miss.
    pub async fn get(&self, key: &str) -> Result<Option<Value>, DiskStoreError> {
        match self.read_entry(key).await? {
            None => Ok(None),
            Some(entry) if entry.expires_at <= Utc::now() => {
                let _ = self.delete(key).await;
                Ok(None)
            }
            Some(entry) => Ok(Some(entry.value)),
        }
    }

    /// Residual time-to-expiry, if the key exists and has not expired.
    pub async fn get_with_ttl(&self, key: &str) -> Result<Option<Duration>, DiskStoreError> {
        match self.read_entry(key).await? {
            None => Ok(None),
            Some(entry) => {
                let remaining = entry.expires_at - Utc::now();
                Ok(remaining.to_std().ok())
            }
        }
    }

    pub async fn delete(&self, key: &str) -> Result<(), DiskStoreError> {
        match tokio::fs::remove_file(self.path_for(key)).await {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(err.into()),
        }
    }

    /// Removes every entry under the root directory.
    pub async fn clear(&self) -> Result<(), DiskStoreError> {
        match tokio::fs::remove_dir_all(&self.root).await {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(err.into()),
        }
    }

    async fn read_entry(&self, key: &str) -> Result<Option<Entry>, DiskStoreError> {
        let path = self.path_for(key);
        let bytes = match tokio::fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(err) => return Err(err.into()),
        };
        serde_json::from_slice(&bytes).map(Some).map_err(DiskStoreError::Corrupt)
    }
}
