//! LRU store tests

use zencache::store::LruStore;

#[test]
fn test_basic_operations() {
  let store = LruStore::new(3);

  assert_eq!(store.set("a", "1"), None);
  assert_eq!(store.set("b", "2"), None);
  assert_eq!(store.get("a").as_deref(), Some("1"));
  assert_eq!(store.get("b").as_deref(), Some("2"));
  assert_eq!(store.get("missing"), None);
  assert_eq!(store.len(), 2);
}

#[test]
fn test_eviction_picks_least_recent() {
  let store = LruStore::new(3);

  store.set("a", "1");
  store.set("b", "2");
  store.set("c", "3");

  // Touch 'a' so 'b' becomes the tail.
  store.get("a");

  let evicted = store.set("d", "4");
  assert_eq!(evicted.as_deref(), Some("b"));

  assert_eq!(store.get("b"), None);
  assert_eq!(store.get("a").as_deref(), Some("1"));
  assert_eq!(store.get("c").as_deref(), Some("3"));
  assert_eq!(store.get("d").as_deref(), Some("4"));
}

#[test]
fn test_update_never_evicts() {
  let store = LruStore::new(3);

  store.set("a", "1");
  store.set("b", "2");
  store.set("c", "3");

  // Replacing a value at capacity must not evict or change the count.
  assert_eq!(store.set("a", "100"), None);
  assert_eq!(store.len(), 3);
  assert_eq!(store.get("a").as_deref(), Some("100"));

  // The update raised 'a', so 'b' is now the eviction victim.
  assert_eq!(store.set("d", "4").as_deref(), Some("b"));
}

#[test]
fn test_get_miss_leaves_order_unchanged() {
  let store = LruStore::new(2);

  store.set("a", "1");
  store.set("b", "2");
  store.get("nope");

  assert_eq!(store.set("c", "3").as_deref(), Some("a"));
}

#[test]
fn test_len_never_exceeds_capacity() {
  let store = LruStore::new(10);

  for i in 0..100 {
    store.set(&format!("key{}", i), "v");
    assert!(store.len() <= store.capacity());
  }
  assert_eq!(store.len(), store.capacity());
}

#[test]
fn test_keys_most_recent_first() {
  let store = LruStore::new(4);

  store.set("a", "1");
  store.set("b", "2");
  store.set("c", "3");
  store.get("a");

  assert_eq!(store.keys(), vec!["a", "c", "b"]);
}

#[test]
fn test_del() {
  let store = LruStore::new(3);

  store.set("a", "1");
  store.set("b", "2");

  assert!(store.del("a"));
  assert_eq!(store.get("a"), None);
  assert_eq!(store.len(), 1);
  assert!(!store.del("nonexistent"));
}

#[test]
fn test_all_entries_copies_everything() {
  let store = LruStore::new(5);

  store.set("a", "1");
  store.set("b", "2");
  store.set("c", "3");

  let entries = store.all_entries();
  assert_eq!(entries.len(), 3);
  assert_eq!(entries.get("a").map(String::as_str), Some("1"));
  assert_eq!(entries.get("b").map(String::as_str), Some("2"));
  assert_eq!(entries.get("c").map(String::as_str), Some("3"));
}

#[test]
fn test_load_stops_at_capacity() {
  let store = LruStore::new(2);

  let entries = (0..5)
    .map(|i| (format!("key{}", i), format!("{}", i)))
    .collect();
  store.load(entries);

  assert_eq!(store.len(), 2);
}

#[test]
fn test_loaded_entries_evict_before_new_sets() {
  let store = LruStore::new(2);

  store.load([("old".to_string(), "1".to_string())].into_iter().collect());
  store.set("new1", "2");

  // The loaded entry ranks least-recent, so it goes first.
  assert_eq!(store.set("new2", "3").as_deref(), Some("old"));
}
