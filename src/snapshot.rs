//! Snapshot persistence

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use tokio::fs::{self, File};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::sync::Mutex;

/// Snapshot file header
const SNAPSHOT_MAGIC: &[u8] = b"ZENCACHE";
const SNAPSHOT_VERSION: u8 = 1;

/// One persisted key-value pair.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SnapshotEntry {
  pub key: String,
  pub value: String,
}

/// Writes and restores the store's contents to a single binary file.
///
/// Save and load serialise on a dedicated lock so two snapshot operations
/// never interleave file I/O.
pub struct SnapshotStore {
  path: String,
  lock: Mutex<()>,
}

impl SnapshotStore {
  pub fn new(path: &str) -> Self {
    Self {
      path: path.to_string(),
      lock: Mutex::new(()),
    }
  }

  pub fn file_path(&self) -> &str {
    &self.path
  }

  /// Save the given entries, replacing any prior file content. The data is
  /// written to a temporary path and renamed into place so a crash mid-write
  /// never leaves a corrupt snapshot behind.
  pub async fn save(&self, data: &HashMap<String, String>) -> Result<usize, SnapshotError> {
    let _guard = self.lock.lock().await;

    let entries: Vec<SnapshotEntry> = data
      .iter()
      .map(|(key, value)| SnapshotEntry {
        key: key.clone(),
        value: value.clone(),
      })
      .collect();
    let count = entries.len();

    if let Some(parent) = Path::new(&self.path).parent() {
      if !parent.as_os_str().is_empty() {
        fs::create_dir_all(parent).await.map_err(SnapshotError::Io)?;
      }
    }

    // Write to temp file first
    let temp_path = format!("{}.tmp", self.path);
    let mut file = File::create(&temp_path).await.map_err(SnapshotError::Io)?;

    file.write_all(SNAPSHOT_MAGIC).await.map_err(SnapshotError::Io)?;
    file.write_all(&[SNAPSHOT_VERSION]).await.map_err(SnapshotError::Io)?;

    let count_bytes = (count as u64).to_le_bytes();
    file.write_all(&count_bytes).await.map_err(SnapshotError::Io)?;

    let payload = serde_json::to_vec(&entries).map_err(SnapshotError::Serialize)?;
    let payload_len = (payload.len() as u64).to_le_bytes();
    file.write_all(&payload_len).await.map_err(SnapshotError::Io)?;
    file.write_all(&payload).await.map_err(SnapshotError::Io)?;

    file.sync_all().await.map_err(SnapshotError::Io)?;
    drop(file);

    // Atomic rename
    fs::rename(&temp_path, &self.path).await.map_err(SnapshotError::Io)?;

    tracing::info!("Snapshot saved: {} entries to {}", count, self.path);
    Ok(count)
  }

  /// Load the persisted entries. A missing file is an error, not an empty
  /// result; callers decide whether that is fatal.
  pub async fn load(&self) -> Result<HashMap<String, String>, SnapshotError> {
    let _guard = self.lock.lock().await;

    let mut file = File::open(&self.path).await.map_err(SnapshotError::Io)?;

    let mut magic = [0u8; 8];
    file.read_exact(&mut magic).await.map_err(SnapshotError::Io)?;
    if magic != SNAPSHOT_MAGIC {
      return Err(SnapshotError::InvalidFormat("invalid magic header".to_string()));
    }

    let mut version = [0u8; 1];
    file.read_exact(&mut version).await.map_err(SnapshotError::Io)?;
    if version[0] != SNAPSHOT_VERSION {
      return Err(SnapshotError::InvalidFormat(format!(
        "unsupported version: {}",
        version[0]
      )));
    }

    let mut count_bytes = [0u8; 8];
    file.read_exact(&mut count_bytes).await.map_err(SnapshotError::Io)?;
    let expected = u64::from_le_bytes(count_bytes) as usize;

    let mut payload_len_bytes = [0u8; 8];
    file
      .read_exact(&mut payload_len_bytes)
      .await
      .map_err(SnapshotError::Io)?;
    let payload_len = u64::from_le_bytes(payload_len_bytes) as usize;

    let mut payload = vec![0u8; payload_len];
    file.read_exact(&mut payload).await.map_err(SnapshotError::Io)?;

    let entries: Vec<SnapshotEntry> =
      serde_json::from_slice(&payload).map_err(SnapshotError::Deserialize)?;
    if entries.len() != expected {
      return Err(SnapshotError::InvalidFormat(format!(
        "entry count mismatch: header says {}, payload has {}",
        expected,
        entries.len()
      )));
    }

    tracing::info!("Snapshot loaded: {} entries from {}", entries.len(), self.path);
    Ok(
      entries
        .into_iter()
        .map(|entry| (entry.key, entry.value))
        .collect(),
    )
  }

  /// Delete the snapshot file if present.
  pub async fn delete(&self) -> Result<(), SnapshotError> {
    let _guard = self.lock.lock().await;
    if Path::new(&self.path).exists() {
      fs::remove_file(&self.path).await.map_err(SnapshotError::Io)?;
    }
    Ok(())
  }

  /// Size of the snapshot file in bytes, if it exists.
  pub async fn size(&self) -> Option<u64> {
    fs::metadata(&self.path).await.ok().map(|m| m.len())
  }
}

/// Snapshot errors
#[derive(Debug)]
pub enum SnapshotError {
  Io(std::io::Error),
  Serialize(serde_json::Error),
  Deserialize(serde_json::Error),
  InvalidFormat(String),
}

impl std::fmt::Display for SnapshotError {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    match self {
      SnapshotError::Io(e) => write!(f, "IO error: {}", e),
      SnapshotError::Serialize(e) => write!(f, "Serialization error: {}", e),
      SnapshotError::Deserialize(e) => write!(f, "Deserialization error: {}", e),
      SnapshotError::InvalidFormat(msg) => write!(f, "Invalid snapshot format: {}", msg),
    }
  }
}

impl std::error::Error for SnapshotError {}
