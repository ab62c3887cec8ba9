// src/registry.rs

//! Per-scope registration storage.
//!
//! A hand-rolled open hash table: an ordered entry vector plus a bucket
//! index whose capacity is always prime, with explicit `next` indices for
//! collision chains. Growth rehashes every entry. Entries keep insertion
//! order so enumeration reflects registration order.

use parking_lot::RwLock;
use std::sync::Arc;

use crate::contract::Contract;
use crate::registration::Registration;

/// Prime capacities for the bucket index. Each step roughly doubles.
const PRIMES: &[usize] = &[
  17, 37, 79, 163, 331, 673, 1361, 2729, 5471, 10949, 21911, 43853, 87719, 175447, 350899,
];

fn next_prime(at_least: usize) -> usize {
  for &p in PRIMES {
    if p >= at_least {
      return p;
    }
  }
  // Past the table we stop being clever; an odd capacity keeps the chains
  // reasonable.
  (at_least * 2) | 1
}

const NO_ENTRY: i32 = -1;

struct Entry {
  hash: u64,
  contract: Contract,
  registration: Arc<Registration>,
  next: i32,
}

struct Table {
  buckets: Box<[i32]>,
  entries: Vec<Entry>,
}

impl Table {
  fn with_capacity(capacity: usize) -> Self {
    let prime = next_prime(capacity);
    Self {
      buckets: vec![NO_ENTRY; prime].into_boxed_slice(),
      entries: Vec::with_capacity(capacity),
    }
  }

  fn bucket_of(&self, hash: u64) -> usize {
    (hash % self.buckets.len() as u64) as usize
  }

  fn find(&self, contract: &Contract) -> Option<usize> {
    let hash = contract.hash_value();
    let mut slot = self.buckets[self.bucket_of(hash)];
    while slot != NO_ENTRY {
      let entry = &self.entries[slot as usize];
      if entry.hash == hash && entry.contract == *contract {
        return Some(slot as usize);
      }
      slot = entry.next;
    }
    None
  }

  fn insert(&mut self, contract: Contract, registration: Arc<Registration>) -> Option<Arc<Registration>> {
    if let Some(index) = self.find(&contract) {
      let old = std::mem::replace(&mut self.entries[index].registration, registration);
      return Some(old);
    }

    if self.entries.len() >= self.buckets.len() {
      self.grow();
    }

    let hash = contract.hash_value();
    let bucket = self.bucket_of(hash);
    let index = self.entries.len() as i32;
    self.entries.push(Entry {
      hash,
      contract,
      registration,
      next: self.buckets[bucket],
    });
    self.buckets[bucket] = index;
    None
  }

  fn grow(&mut self) {
    let prime = next_prime(self.buckets.len() + 1);
    self.buckets = vec![NO_ENTRY; prime].into_boxed_slice();
    // Relink every chain against the new bucket count.
    for index in 0..self.entries.len() {
      let bucket = (self.entries[index].hash % self.buckets.len() as u64) as usize;
      self.entries[index].next = self.buckets[bucket];
      self.buckets[bucket] = index as i32;
    }
  }
}

/// Contract -> registration storage for one container scope.
///
/// Mutations take the write lock; lookups walk a bucket chain under the read
/// lock, so resolutions of different contracts never contend once
/// registration has settled.
pub(crate) struct Registry {
  table: RwLock<Table>,
}

impl Registry {
  pub(crate) fn new() -> Self {
    Self {
      table: RwLock::new(Table::with_capacity(8)),
    }
  }

  pub(crate) fn get(&self, contract: &Contract) -> Option<Arc<Registration>> {
    let table = self.table.read();
    table
      .find(contract)
      .map(|index| table.entries[index].registration.clone())
  }

  pub(crate) fn contains(&self, contract: &Contract) -> bool {
    self.table.read().find(contract).is_some()
  }

  /// Stores `registration` under `contract`, returning the replaced
  /// registration if one existed. The caller drops the old value outside the
  /// lock.
  pub(crate) fn set(
    &self,
    contract: Contract,
    registration: Arc<Registration>,
  ) -> Option<Arc<Registration>> {
    self.table.write().insert(contract, registration)
  }

  /// Snapshot of all entries in registration order.
  pub(crate) fn snapshot(&self) -> Vec<(Contract, Arc<Registration>)> {
    self
      .table
      .read()
      .entries
      .iter()
      .map(|entry| (entry.contract.clone(), entry.registration.clone()))
      .collect()
  }

  pub(crate) fn len(&self) -> usize {
    self.table.read().entries.len()
  }

  /// Drops every registration, releasing the lifetime managers (and with
  /// them any cached instances) they own.
  pub(crate) fn clear(&self) -> Vec<Arc<Registration>> {
    let mut table = self.table.write();
    let drained: Vec<_> = table
      .entries
      .drain(..)
      .map(|entry| entry.registration)
      .collect();
    for bucket in table.buckets.iter_mut() {
      *bucket = NO_ENTRY;
    }
    drained
  }
}
