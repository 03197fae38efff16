//! ZenCache: a bounded in-memory key-value cache server
//!
//! Provides a line-protocol TCP server composing:
//! - An LRU store with fixed capacity and O(1) operations
//! - A publish/subscribe broker with bounded per-subscriber queues
//! - Point-in-time snapshot persistence to a single file
//! - Single-master asynchronous replication

mod commands;
pub mod config;
pub mod protocol;
pub mod pubsub;
pub mod repl;
pub mod server;
pub mod snapshot;
pub mod store;

pub use config::ServerConfig;
pub use protocol::{Command, CommandError, Reply};
pub use pubsub::PubSub;
pub use repl::{ReplicationManager, Role};
pub use server::Server;
pub use snapshot::{SnapshotError, SnapshotStore};
pub use store::LruStore;
