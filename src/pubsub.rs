//! Channel-based publish/subscribe broker

use parking_lot::RwLock;
use std::collections::HashMap;
use tokio::sync::mpsc;

/// Depth of each subscriber queue. A full queue drops messages for that
/// subscriber rather than blocking the publisher.
pub const QUEUE_DEPTH: usize = 100;

/// Routes published messages to per-channel subscriber queues.
///
/// The broker owns the send end of every queue; the subscriber's delivery
/// task owns the receive end. Dropping the send end closes the queue, which
/// is how unsubscription terminates delivery.
pub struct PubSub {
  channels: RwLock<HashMap<String, HashMap<String, mpsc::Sender<String>>>>,
}

impl Default for PubSub {
  fn default() -> Self {
    Self::new()
  }
}

impl PubSub {
  pub fn new() -> Self {
    Self {
      channels: RwLock::new(HashMap::new()),
    }
  }

  /// Register a subscriber on a channel and hand back the receive end of a
  /// fresh queue. Re-subscribing the same pair replaces the prior record,
  /// closing its queue.
  pub fn subscribe(&self, channel: &str, subscriber_id: &str) -> mpsc::Receiver<String> {
    let (tx, rx) = mpsc::channel(QUEUE_DEPTH);
    let mut channels = self.channels.write();
    channels
      .entry(channel.to_string())
      .or_default()
      .insert(subscriber_id.to_string(), tx);
    rx
  }

  /// Remove a subscriber from a channel. Channels with no subscribers left
  /// are collected.
  pub fn unsubscribe(&self, channel: &str, subscriber_id: &str) {
    let mut channels = self.channels.write();
    if let Some(subs) = channels.get_mut(channel) {
      subs.remove(subscriber_id);
      if subs.is_empty() {
        channels.remove(channel);
      }
    }
  }

  /// Remove a subscriber from every channel it appears in.
  pub fn unsubscribe_all(&self, subscriber_id: &str) {
    let mut channels = self.channels.write();
    channels.retain(|_, subs| {
      subs.remove(subscriber_id);
      !subs.is_empty()
    });
  }

  /// Fan a message out to every subscriber on a channel with a non-blocking
  /// enqueue. Returns how many queues accepted it; full queues drop it.
  pub fn publish(&self, channel: &str, message: &str) -> usize {
    let channels = self.channels.read();
    let Some(subs) = channels.get(channel) else {
      return 0;
    };

    let mut delivered = 0;
    for tx in subs.values() {
      if tx.try_send(message.to_string()).is_ok() {
        delivered += 1;
      }
    }
    delivered
  }

  pub fn subscriber_count(&self, channel: &str) -> usize {
    let channels = self.channels.read();
    channels.get(channel).map(|subs| subs.len()).unwrap_or(0)
  }
}
