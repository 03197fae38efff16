//! Server configuration

use serde::{Deserialize, Serialize};

/// Runtime configuration for a cache node.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
  /// TCP port for the line protocol (default: 6379)
  #[serde(default = "default_port")]
  pub port: u16,

  /// Maximum number of entries before LRU eviction
  #[serde(default = "default_capacity")]
  pub capacity: usize,

  /// Path to the snapshot file
  #[serde(default = "default_snapshot_path")]
  pub snapshot_path: String,
}

fn default_port() -> u16 {
  6379
}

fn default_capacity() -> usize {
  10_000
}

fn default_snapshot_path() -> String {
  "zencache.rdb".to_string()
}

impl Default for ServerConfig {
  fn default() -> Self {
    Self {
      port: default_port(),
      capacity: default_capacity(),
      snapshot_path: default_snapshot_path(),
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_config_defaults() {
    let config = ServerConfig::default();
    assert_eq!(config.port, 6379);
    assert_eq!(config.capacity, 10_000);
    assert_eq!(config.snapshot_path, "zencache.rdb");
  }

  #[test]
  fn test_config_deserialize_partial() {
    let config: ServerConfig = serde_json::from_str(r#"{"port": 7000}"#).unwrap();
    assert_eq!(config.port, 7000);
    assert_eq!(config.capacity, 10_000);
  }
}
