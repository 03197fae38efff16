//! Command execution against the server's shared components

use std::sync::Arc;

use crate::protocol::{Command, Reply};
use crate::server::{ClientState, Server};

/// Execute one parsed command for a connected client. `raw` is the trimmed
/// request line, forwarded verbatim to replicas for mutating commands.
pub(crate) async fn execute_command(
  server: &Arc<Server>,
  client: &mut ClientState,
  cmd: Command,
  raw: &str,
) -> Reply {
  match cmd {
    Command::Ping => Reply::Pong,

    Command::Set { key, value } => {
      if let Some(evicted) = server.store.set(&key, &value) {
        tracing::debug!("Evicted '{}' to make room for '{}'", evicted, key);
      }
      if server.repl.is_master() {
        server.repl.propagate_command(raw);
      }
      Reply::Ok
    }

    Command::Get { key } => match server.store.get(&key) {
      Some(value) => Reply::Value(value),
      None => Reply::Nil,
    },

    Command::Del { key } => {
      let deleted = server.store.del(&key);
      if deleted && server.repl.is_master() {
        server.repl.propagate_command(raw);
      }
      Reply::Integer(if deleted { 1 } else { 0 })
    }

    Command::Subscribe { channel } => {
      let mut queue = server.pubsub.subscribe(&channel, &client.subscriber_id);
      let out = client.out_tx.clone();
      let delivery_channel = channel.clone();
      // Delivery task: drains the subscriber queue until it closes on
      // unsubscribe or disconnect.
      tokio::spawn(async move {
        while let Some(payload) = queue.recv().await {
          let line = Reply::Message {
            channel: delivery_channel.clone(),
            payload,
          }
          .encode();
          if out.send(line).is_err() {
            break;
          }
        }
      });
      Reply::Subscribed(channel)
    }

    Command::Unsubscribe { channel } => {
      server.pubsub.unsubscribe(&channel, &client.subscriber_id);
      Reply::Unsubscribed(channel)
    }

    Command::Publish { channel, message } => {
      let delivered = server.pubsub.publish(&channel, &message);
      Reply::Integer(delivered as i64)
    }

    Command::Save => match server.snapshot.save(&server.store.all_entries()).await {
      Ok(_) => Reply::Ok,
      Err(e) => Reply::Error(e.to_string()),
    },

    Command::ReplicaOf { host, port } => {
      let applier = server.clone();
      match server
        .repl
        .connect_to_master(&host, port, move |line| applier.apply_replicated(line))
        .await
      {
        Ok(()) => Reply::Ok,
        Err(e) => Reply::Error(e.to_string()),
      }
    }

    Command::ReplConf => {
      client.is_replica = true;
      server.repl.add_replica(client.client_id, client.out_tx.clone());
      Reply::Ok
    }

    Command::Info => Reply::Info {
      role: server.repl.role().to_string(),
      replicas: server.repl.replica_count(),
    },

    // QUIT never reaches dispatch; the connection loop closes first.
    Command::Quit => Reply::Ok,
  }
}
