//! Pub/sub broker tests

use zencache::pubsub::{PubSub, QUEUE_DEPTH};

#[tokio::test]
async fn test_publish_counts_deliveries() {
  let broker = PubSub::new();

  let mut rx1 = broker.subscribe("news", "client-1");
  let mut rx2 = broker.subscribe("news", "client-2");

  assert_eq!(broker.publish("news", "hello"), 2);
  assert_eq!(rx1.recv().await.as_deref(), Some("hello"));
  assert_eq!(rx2.recv().await.as_deref(), Some("hello"));
}

#[tokio::test]
async fn test_publish_without_subscribers() {
  let broker = PubSub::new();
  assert_eq!(broker.publish("nobody", "hi"), 0);
}

#[tokio::test]
async fn test_per_channel_ordering() {
  let broker = PubSub::new();
  let mut rx = broker.subscribe("feed", "client-1");

  broker.publish("feed", "first");
  broker.publish("feed", "second");
  broker.publish("feed", "third");

  assert_eq!(rx.recv().await.as_deref(), Some("first"));
  assert_eq!(rx.recv().await.as_deref(), Some("second"));
  assert_eq!(rx.recv().await.as_deref(), Some("third"));
}

#[tokio::test]
async fn test_full_queue_drops_without_blocking() {
  let broker = PubSub::new();
  let mut rx = broker.subscribe("firehose", "client-1");

  for i in 0..QUEUE_DEPTH {
    assert_eq!(broker.publish("firehose", &format!("msg{}", i)), 1);
  }

  // The queue is full: the publisher is not blocked and the subscriber is
  // simply skipped.
  assert_eq!(broker.publish("firehose", "overflow"), 0);

  // The backlog is intact and in order.
  for i in 0..QUEUE_DEPTH {
    assert_eq!(rx.recv().await, Some(format!("msg{}", i)));
  }
}

#[tokio::test]
async fn test_channels_are_independent() {
  let broker = PubSub::new();

  let mut news = broker.subscribe("news", "client-1");
  let _sports = broker.subscribe("sports", "client-2");

  assert_eq!(broker.publish("news", "headline"), 1);
  assert_eq!(news.recv().await.as_deref(), Some("headline"));
  assert_eq!(broker.subscriber_count("news"), 1);
  assert_eq!(broker.subscriber_count("sports"), 1);
}

#[tokio::test]
async fn test_unsubscribe_all_clears_every_channel() {
  let broker = PubSub::new();

  let mut rx1 = broker.subscribe("news", "client-1");
  let mut rx2 = broker.subscribe("sports", "client-1");
  broker.subscribe("news", "client-2");

  broker.unsubscribe_all("client-1");

  assert_eq!(broker.subscriber_count("news"), 1);
  assert_eq!(broker.subscriber_count("sports"), 0);
  assert_eq!(rx1.recv().await, None);
  assert_eq!(rx2.recv().await, None);
}

#[tokio::test]
async fn test_unsubscribe_collects_empty_channels() {
  let broker = PubSub::new();

  broker.subscribe("solo", "client-1");
  broker.unsubscribe("solo", "client-1");

  assert_eq!(broker.subscriber_count("solo"), 0);
  assert_eq!(broker.publish("solo", "anyone"), 0);
}
