//! TCP listener and per-connection dispatcher

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;

use crate::commands::execute_command;
use crate::config::ServerConfig;
use crate::protocol::{Command, Reply};
use crate::pubsub::PubSub;
use crate::repl::ReplicationManager;
use crate::snapshot::SnapshotStore;
use crate::store::LruStore;

/// The cache server: owns the store, broker, snapshot store, and
/// replication manager, and drives one dispatcher task per connection.
pub struct Server {
  config: ServerConfig,
  pub(crate) store: LruStore,
  pub(crate) pubsub: PubSub,
  pub(crate) snapshot: SnapshotStore,
  pub(crate) repl: ReplicationManager,
  next_client_id: AtomicU64,
}

/// Per-connection dispatcher state.
pub(crate) struct ClientState {
  pub client_id: u64,
  pub subscriber_id: String,
  pub out_tx: mpsc::UnboundedSender<String>,
  pub is_replica: bool,
}

impl Server {
  pub fn new(config: ServerConfig) -> Self {
    let store = LruStore::new(config.capacity);
    let snapshot = SnapshotStore::new(&config.snapshot_path);
    Self {
      config,
      store,
      pubsub: PubSub::new(),
      snapshot,
      repl: ReplicationManager::new(),
      next_client_id: AtomicU64::new(0),
    }
  }

  pub fn store(&self) -> &LruStore {
    &self.store
  }

  pub fn replication(&self) -> &ReplicationManager {
    &self.repl
  }

  /// Bind the configured port and serve until the process exits.
  pub async fn run(self: Arc<Self>) -> Result<(), anyhow::Error> {
    let addr = format!("0.0.0.0:{}", self.config.port);
    let listener = TcpListener::bind(&addr).await?;
    self.serve(listener).await
  }

  /// Serve connections on an already-bound listener. Attempts to restore
  /// the snapshot before accepting the first client; a load failure is
  /// logged and the server starts empty.
  pub async fn serve(self: Arc<Self>, listener: TcpListener) -> Result<(), anyhow::Error> {
    match self.snapshot.load().await {
      Ok(data) => self.store.load(data),
      Err(e) => {
        tracing::warn!(
          "No snapshot restored from {}: {}",
          self.snapshot.file_path(),
          e
        );
      }
    }

    if let Ok(addr) = listener.local_addr() {
      tracing::info!("Listening on {}", addr);
    }

    loop {
      match listener.accept().await {
        Ok((socket, _)) => {
          let client_id = self.next_client_id.fetch_add(1, Ordering::Relaxed) + 1;
          let server = self.clone();
          tokio::spawn(async move {
            server.handle_connection(socket, client_id).await;
          });
        }
        Err(e) => {
          tracing::error!("Error accepting connection: {}", e);
        }
      }
    }
  }

  /// Apply a command line replayed from the master: mutation only, no
  /// reply, no re-propagation.
  pub fn apply_replicated(&self, line: &str) {
    match Command::parse(line) {
      Ok(Command::Set { key, value }) => {
        self.store.set(&key, &value);
      }
      Ok(Command::Del { key }) => {
        self.store.del(&key);
      }
      _ => {}
    }
  }

  async fn handle_connection(self: Arc<Self>, socket: TcpStream, client_id: u64) {
    let peer = socket
      .peer_addr()
      .map(|addr| addr.to_string())
      .unwrap_or_default();
    tracing::debug!("Client client-{} connected from {}", client_id, peer);

    let (read_half, mut write_half) = socket.into_split();
    let (out_tx, mut out_rx) = mpsc::unbounded_channel::<String>();

    // Single writer per socket: responses, pub/sub deliveries, and
    // replicated commands all funnel through this channel, which keeps
    // writes ordered without holding any lock across socket I/O.
    tokio::spawn(async move {
      while let Some(chunk) = out_rx.recv().await {
        if write_half.write_all(chunk.as_bytes()).await.is_err() {
          break;
        }
      }
    });

    let mut client = ClientState {
      client_id,
      subscriber_id: format!("client-{}", client_id),
      out_tx,
      is_replica: false,
    };

    let mut lines = BufReader::new(read_half).lines();
    loop {
      let line = match lines.next_line().await {
        Ok(Some(line)) => line,
        Ok(None) | Err(_) => break,
      };
      let line = line.trim();
      if line.is_empty() {
        continue;
      }

      let reply = match Command::parse(line) {
        Ok(Command::Quit) => break,
        Ok(cmd) => execute_command(&self, &mut client, cmd, line).await,
        Err(e) => Reply::Error(e.to_string()),
      };

      if client.out_tx.send(reply.encode()).is_err() {
        break;
      }
    }

    // Closing every subscriber queue here ends the delivery tasks before
    // the connection state is released.
    self.pubsub.unsubscribe_all(&client.subscriber_id);
    if client.is_replica {
      self.repl.remove_replica(client.client_id);
    }
    tracing::debug!("Client client-{} disconnected", client_id);
  }
}
