//! Master/replica replication

use parking_lot::RwLock;
use std::fmt;
use std::io;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::tcp::OwnedWriteHalf;
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::timeout;

/// Dial timeout for connecting to a master.
const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

/// Replication role. Every node starts as master; the role flips to replica
/// on REPLICAOF and is sticky from then on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
  Master,
  Replica,
}

impl fmt::Display for Role {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Role::Master => write!(f, "master"),
      Role::Replica => write!(f, "replica"),
    }
  }
}

struct ReplicaLink {
  client_id: u64,
  sender: mpsc::UnboundedSender<String>,
}

/// Tracks the node's role, the outbound replica links, and the inbound
/// master link.
///
/// An outbound replica is addressed through the unbounded channel feeding
/// that connection's writer task, so propagation never blocks the caller
/// and stays FIFO per replica.
pub struct ReplicationManager {
  role: RwLock<Role>,
  replicas: RwLock<Vec<ReplicaLink>>,
  master_writer: RwLock<Option<OwnedWriteHalf>>,
  master_task: RwLock<Option<JoinHandle<()>>>,
}

impl Default for ReplicationManager {
  fn default() -> Self {
    Self::new()
  }
}

impl ReplicationManager {
  pub fn new() -> Self {
    Self {
      role: RwLock::new(Role::Master),
      replicas: RwLock::new(Vec::new()),
      master_writer: RwLock::new(None),
      master_task: RwLock::new(None),
    }
  }

  pub fn role(&self) -> Role {
    *self.role.read()
  }

  pub fn is_master(&self) -> bool {
    self.role() == Role::Master
  }

  /// Register an outbound replica connection by client id and the sender
  /// feeding its writer task.
  pub fn add_replica(&self, client_id: u64, sender: mpsc::UnboundedSender<String>) {
    let mut replicas = self.replicas.write();
    if replicas.iter().any(|link| link.client_id == client_id) {
      return;
    }
    replicas.push(ReplicaLink { client_id, sender });
    tracing::info!("Replica attached: client-{}", client_id);
  }

  /// Drop the replica registered under this client id, if any.
  pub fn remove_replica(&self, client_id: u64) {
    let mut replicas = self.replicas.write();
    let before = replicas.len();
    replicas.retain(|link| link.client_id != client_id);
    if replicas.len() != before {
      tracing::info!("Replica detached: client-{}", client_id);
    }
  }

  pub fn replica_count(&self) -> usize {
    self.replicas.read().len()
  }

  /// Queue a command line on every replica link. Fire-and-forget: failures
  /// are dropped here and the dead link is reaped by its own connection
  /// handler.
  pub fn propagate_command(&self, line: &str) {
    let replicas = self.replicas.read();
    for link in replicas.iter() {
      let _ = link.sender.send(format!("{}\n", line));
    }
  }

  /// Become a replica of the given master. Dials with a bounded timeout,
  /// sends the REPLCONF handshake, then spawns a receive loop that feeds
  /// every command line from the master into `apply`. Returns once the
  /// link is established; the receive loop runs until the link drops.
  pub async fn connect_to_master<F>(&self, host: &str, port: u16, apply: F) -> io::Result<()>
  where
    F: Fn(&str) + Send + Sync + 'static,
  {
    *self.role.write() = Role::Replica;

    let addr = format!("{}:{}", host, port);
    let stream = match timeout(CONNECT_TIMEOUT, TcpStream::connect((host, port))).await {
      Ok(result) => result?,
      Err(_) => {
        return Err(io::Error::new(
          io::ErrorKind::TimedOut,
          format!("connect to {} timed out", addr),
        ));
      }
    };

    let (read_half, mut write_half) = stream.into_split();
    write_half.write_all(b"REPLCONF listening-port\n").await?;
    *self.master_writer.write() = Some(write_half);

    let task = tokio::spawn(async move {
      let mut lines = BufReader::new(read_half).lines();
      while let Ok(Some(line)) = lines.next_line().await {
        let line = line.trim();
        if !line.is_empty() {
          apply(line);
        }
      }
      tracing::warn!("Master link dropped");
    });
    *self.master_task.write() = Some(task);

    tracing::info!("Replicating from {}", addr);
    Ok(())
  }

  /// Close every outbound replica link and the inbound master link.
  pub fn close(&self) {
    self.replicas.write().clear();
    if let Some(task) = self.master_task.write().take() {
      task.abort();
    }
    *self.master_writer.write() = None;
  }
}
