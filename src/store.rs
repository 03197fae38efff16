//! Bounded LRU key-value store

use parking_lot::RwLock;
use std::collections::HashMap;

/// Sentinel index for "no node".
const NIL: usize = usize::MAX;

struct Node {
  key: String,
  value: String,
  prev: usize,
  next: usize,
}

/// Recency list plus key index, guarded as one unit so no partial state
/// is ever observable.
struct LruInner {
  nodes: Vec<Node>,
  free: Vec<usize>,
  index: HashMap<String, usize>,
  head: usize,
  tail: usize,
}

impl LruInner {
  fn new() -> Self {
    Self {
      nodes: Vec::new(),
      free: Vec::new(),
      index: HashMap::new(),
      head: NIL,
      tail: NIL,
    }
  }

  fn alloc(&mut self, key: String, value: String) -> usize {
    let node = Node {
      key,
      value,
      prev: NIL,
      next: NIL,
    };
    if let Some(idx) = self.free.pop() {
      self.nodes[idx] = node;
      idx
    } else {
      self.nodes.push(node);
      self.nodes.len() - 1
    }
  }

  fn unlink(&mut self, idx: usize) {
    let prev = self.nodes[idx].prev;
    let next = self.nodes[idx].next;
    if prev == NIL {
      self.head = next;
    } else {
      self.nodes[prev].next = next;
    }
    if next == NIL {
      self.tail = prev;
    } else {
      self.nodes[next].prev = prev;
    }
    self.nodes[idx].prev = NIL;
    self.nodes[idx].next = NIL;
  }

  fn push_front(&mut self, idx: usize) {
    self.nodes[idx].prev = NIL;
    self.nodes[idx].next = self.head;
    if self.head != NIL {
      self.nodes[self.head].prev = idx;
    }
    self.head = idx;
    if self.tail == NIL {
      self.tail = idx;
    }
  }

  fn push_back(&mut self, idx: usize) {
    self.nodes[idx].next = NIL;
    self.nodes[idx].prev = self.tail;
    if self.tail != NIL {
      self.nodes[self.tail].next = idx;
    }
    self.tail = idx;
    if self.head == NIL {
      self.head = idx;
    }
  }

  fn release(&mut self, idx: usize) {
    self.nodes[idx].key = String::new();
    self.nodes[idx].value = String::new();
    self.free.push(idx);
  }

  /// Remove the least-recent entry and return its key.
  fn pop_tail(&mut self) -> Option<String> {
    if self.tail == NIL {
      return None;
    }
    let idx = self.tail;
    self.unlink(idx);
    let key = std::mem::take(&mut self.nodes[idx].key);
    self.index.remove(&key);
    self.release(idx);
    Some(key)
  }
}

/// Thread-safe LRU cache with a fixed capacity.
///
/// Recency is tracked with an arena-backed doubly linked list (head is the
/// most recently used entry, tail the least) and a map from key to arena
/// slot, so set/get/del are O(1).
pub struct LruStore {
  capacity: usize,
  inner: RwLock<LruInner>,
}

impl LruStore {
  pub fn new(capacity: usize) -> Self {
    Self {
      capacity,
      inner: RwLock::new(LruInner::new()),
    }
  }

  pub fn capacity(&self) -> usize {
    self.capacity
  }

  /// Add or update a key-value pair. Returns the evicted key if the insert
  /// pushed an entry out.
  ///
  /// Updating an existing key replaces its value and raises it to
  /// most-recent; it never evicts and never changes the entry count.
  pub fn set(&self, key: &str, value: &str) -> Option<String> {
    let mut inner = self.inner.write();

    if let Some(idx) = inner.index.get(key).copied() {
      inner.nodes[idx].value = value.to_string();
      inner.unlink(idx);
      inner.push_front(idx);
      return None;
    }

    let evicted = if inner.index.len() >= self.capacity {
      inner.pop_tail()
    } else {
      None
    };

    let idx = inner.alloc(key.to_string(), value.to_string());
    inner.push_front(idx);
    inner.index.insert(key.to_string(), idx);
    evicted
  }

  /// Retrieve a value and mark it as most recently used.
  pub fn get(&self, key: &str) -> Option<String> {
    let mut inner = self.inner.write();
    let idx = inner.index.get(key).copied()?;
    inner.unlink(idx);
    inner.push_front(idx);
    Some(inner.nodes[idx].value.clone())
  }

  /// Remove a key. Returns whether an entry was removed.
  pub fn del(&self, key: &str) -> bool {
    let mut inner = self.inner.write();
    let Some(idx) = inner.index.remove(key) else {
      return false;
    };
    inner.unlink(idx);
    inner.release(idx);
    true
  }

  pub fn len(&self) -> usize {
    self.inner.read().index.len()
  }

  pub fn is_empty(&self) -> bool {
    self.inner.read().index.is_empty()
  }

  /// All keys ordered from most to least recently used. Snapshot view;
  /// concurrent mutation is not reflected.
  pub fn keys(&self) -> Vec<String> {
    let inner = self.inner.read();
    let mut keys = Vec::with_capacity(inner.index.len());
    let mut idx = inner.head;
    while idx != NIL {
      keys.push(inner.nodes[idx].key.clone());
      idx = inner.nodes[idx].next;
    }
    keys
  }

  /// Copy of every entry, for snapshot persistence. Recency order is not
  /// carried over.
  pub fn all_entries(&self) -> HashMap<String, String> {
    let inner = self.inner.read();
    inner
      .index
      .iter()
      .map(|(key, &idx)| (key.clone(), inner.nodes[idx].value.clone()))
      .collect()
  }

  /// Bulk insert used when restoring a snapshot at startup. Entries beyond
  /// capacity are silently dropped; loaded entries rank least-recent.
  pub fn load(&self, entries: HashMap<String, String>) {
    let mut inner = self.inner.write();
    for (key, value) in entries {
      if inner.index.len() >= self.capacity {
        break;
      }
      if inner.index.contains_key(&key) {
        continue;
      }
      let idx = inner.alloc(key.clone(), value);
      inner.push_back(idx);
      inner.index.insert(key, idx);
    }
  }
}
