// src/policy.rs

//! The defaults store: (target type, policy type) -> policy object.
//!
//! One store is owned by the root container; child scopes hold a
//! back-reference to it rather than reaching for ambient static state. It
//! backs both global defaults (`target == None`) and per-type overrides
//! (`target == Some(type_id)`), and notifies subscribers on every write so
//! the container can invalidate cached pipelines when a chain-altering
//! policy changes.
//!
//! Storage is a small open-addressed table with linear probing. Policies are
//! read on every resolve and written a handful of times at startup, so the
//! table optimizes for cheap probes under a read lock.

use std::any::{Any, TypeId};
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};

type PolicyKey = (Option<TypeId>, TypeId);
type PolicyValue = Arc<dyn Any + Send + Sync>;
type Listener = Box<dyn Fn(&PolicyChange) + Send + Sync>;

/// Describes a single mutation of the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PolicyChange {
  /// The type the policy applies to, or `None` for a global default.
  pub target: Option<TypeId>,
  /// The policy object's own type.
  pub policy: TypeId,
}

enum Bucket {
  Empty,
  Tombstone,
  Occupied { key: PolicyKey, value: PolicyValue },
}

struct Table {
  buckets: Box<[Bucket]>,
  live: usize,
}

impl Table {
  fn with_capacity(capacity: usize) -> Self {
    let mut buckets = Vec::with_capacity(capacity);
    buckets.resize_with(capacity, || Bucket::Empty);
    Self {
      buckets: buckets.into_boxed_slice(),
      live: 0,
    }
  }

  fn mask(&self) -> usize {
    self.buckets.len() - 1
  }

  fn find(&self, key: &PolicyKey) -> Option<usize> {
    let mut index = hash_key(key) as usize & self.mask();
    loop {
      match &self.buckets[index] {
        Bucket::Empty => return None,
        Bucket::Occupied { key: existing, .. } if existing == key => return Some(index),
        _ => index = (index + 1) & self.mask(),
      }
    }
  }

  fn insert(&mut self, key: PolicyKey, value: PolicyValue) {
    let mut index = hash_key(&key) as usize & self.mask();
    let mut first_free: Option<usize> = None;
    loop {
      match &self.buckets[index] {
        Bucket::Empty => {
          let slot = first_free.unwrap_or(index);
          self.buckets[slot] = Bucket::Occupied { key, value };
          self.live += 1;
          return;
        }
        Bucket::Tombstone => {
          if first_free.is_none() {
            first_free = Some(index);
          }
          index = (index + 1) & self.mask();
        }
        Bucket::Occupied { key: existing, .. } => {
          if existing == &key {
            self.buckets[index] = Bucket::Occupied { key, value };
            return;
          }
          index = (index + 1) & self.mask();
        }
      }
    }
  }

  fn grow(&mut self) {
    let doubled = Table::with_capacity(self.buckets.len() * 2);
    let old = std::mem::replace(self, doubled);
    for bucket in old.buckets.into_vec() {
      if let Bucket::Occupied { key, value } = bucket {
        self.insert(key, value);
      }
    }
  }
}

fn hash_key(key: &PolicyKey) -> u64 {
  let mut hasher = DefaultHasher::new();
  key.hash(&mut hasher);
  hasher.finish()
}

/// Concurrent policy/defaults store with change notification.
pub struct PolicyStore {
  table: RwLock<Table>,
  listeners: Mutex<Vec<Listener>>,
}

impl PolicyStore {
  pub fn new() -> Self {
    Self {
      table: RwLock::new(Table::with_capacity(16)),
      listeners: Mutex::new(Vec::new()),
    }
  }

  /// Stores `value` for (`target`, `P`), replacing any previous policy, and
  /// notifies subscribers.
  pub fn set<P: Any + Send + Sync>(&self, target: Option<TypeId>, value: Arc<P>) {
    let key = (target, TypeId::of::<P>());
    {
      let mut table = self.table.write();
      // Grow at 3/4 occupancy so probe runs stay short.
      if (table.live + 1) * 4 > table.buckets.len() * 3 {
        table.grow();
      }
      table.insert(key, value as PolicyValue);
    }
    self.notify(&PolicyChange {
      target,
      policy: TypeId::of::<P>(),
    });
  }

  /// Looks up the policy of type `P` for `target`.
  pub fn get<P: Any + Send + Sync>(&self, target: Option<TypeId>) -> Option<Arc<P>> {
    let key = (target, TypeId::of::<P>());
    let table = self.table.read();
    let index = table.find(&key)?;
    match &table.buckets[index] {
      Bucket::Occupied { value, .. } => value.clone().downcast::<P>().ok(),
      _ => None,
    }
  }

  /// Looks up the policy of type `P` for `target`, falling back to the
  /// global default when no per-target entry exists.
  pub fn get_or_default<P: Any + Send + Sync>(&self, target: Option<TypeId>) -> Option<Arc<P>> {
    match self.get::<P>(target) {
      Some(found) => Some(found),
      None if target.is_some() => self.get::<P>(None),
      None => None,
    }
  }

  /// Removes the policy of type `P` for `target`. Subscribers are notified
  /// as for a write.
  pub fn clear<P: Any + Send + Sync>(&self, target: Option<TypeId>) {
    let key = (target, TypeId::of::<P>());
    let removed = {
      let mut table = self.table.write();
      match table.find(&key) {
        Some(index) => {
          table.buckets[index] = Bucket::Tombstone;
          table.live -= 1;
          true
        }
        None => false,
      }
    };
    if removed {
      self.notify(&PolicyChange {
        target,
        policy: TypeId::of::<P>(),
      });
    }
  }

  /// Registers a callback invoked on every policy write or removal.
  pub fn subscribe(&self, listener: impl Fn(&PolicyChange) + Send + Sync + 'static) {
    self.listeners.lock().push(Box::new(listener));
  }

  fn notify(&self, change: &PolicyChange) {
    for listener in self.listeners.lock().iter() {
      listener(change);
    }
  }
}

impl Default for PolicyStore {
  fn default() -> Self {
    Self::new()
  }
}
