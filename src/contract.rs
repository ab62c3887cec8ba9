// src/contract.rs

//! The (type, name) identity key under which everything is registered.

use std::any::TypeId;
use std::cmp::Ordering;
use std::collections::hash_map::DefaultHasher;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

/// Fixed mixing constant for combining the type and name hashes.
/// Keeps default and named registrations of the same type from clustering
/// into the same buckets.
const NAME_MIX: u64 = 37;

/// Identity key for a registration: a type plus an optional name.
///
/// `name == None` denotes the *default* registration for the type. Equality
/// is structural, and the hash is computed once at construction so registry
/// probes never re-hash the name string.
#[derive(Clone)]
pub struct Contract {
  type_id: TypeId,
  type_name: &'static str,
  name: Option<Arc<str>>,
  hash: u64,
}

impl Contract {
  /// The default (unnamed) contract for `T`.
  ///
  /// `T` may be unsized, so `Contract::of::<dyn Greeter>()` is a distinct
  /// contract from any of its implementations.
  pub fn of<T: ?Sized + 'static>() -> Self {
    Self::build(TypeId::of::<T>(), std::any::type_name::<T>(), None)
  }

  /// The named contract for `T`.
  pub fn of_named<T: ?Sized + 'static>(name: &str) -> Self {
    Self::build(
      TypeId::of::<T>(),
      std::any::type_name::<T>(),
      Some(Arc::from(name)),
    )
  }

  /// Returns this contract rebound to `name`, keeping the type.
  pub fn with_name(&self, name: &str) -> Self {
    Self::build(self.type_id, self.type_name, Some(Arc::from(name)))
  }

  fn build(type_id: TypeId, type_name: &'static str, name: Option<Arc<str>>) -> Self {
    let mut hasher = DefaultHasher::new();
    type_id.hash(&mut hasher);
    let type_hash = hasher.finish();

    let name_hash = match &name {
      Some(n) => {
        let mut hasher = DefaultHasher::new();
        n.hash(&mut hasher);
        hasher.finish()
      }
      None => 0,
    };

    Self {
      type_id,
      type_name,
      name,
      hash: type_hash.wrapping_mul(NAME_MIX).wrapping_add(name_hash),
    }
  }

  pub fn type_id(&self) -> TypeId {
    self.type_id
  }

  pub fn type_name(&self) -> &'static str {
    self.type_name
  }

  pub fn name(&self) -> Option<&str> {
    self.name.as_deref()
  }

  /// The precomputed hash. Also what the `Hash` impl feeds to hashers.
  pub fn hash_value(&self) -> u64 {
    self.hash
  }
}

impl PartialEq for Contract {
  fn eq(&self, other: &Self) -> bool {
    self.type_id == other.type_id && self.name == other.name
  }
}

impl Eq for Contract {}

impl Hash for Contract {
  fn hash<H: Hasher>(&self, state: &mut H) {
    state.write_u64(self.hash);
  }
}

impl PartialOrd for Contract {
  fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
    Some(self.cmp(other))
  }
}

impl Ord for Contract {
  fn cmp(&self, other: &Self) -> Ordering {
    self
      .type_id
      .cmp(&other.type_id)
      .then_with(|| self.name.as_deref().cmp(&other.name.as_deref()))
  }
}

impl fmt::Display for Contract {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match &self.name {
      Some(name) => write!(f, "{}[\"{}\"]", self.type_name, name),
      None => f.write_str(self.type_name),
    }
  }
}

impl fmt::Debug for Contract {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match &self.name {
      Some(name) => write!(f, "Contract({}, Name({}))", self.type_name, name),
      None => write!(f, "Contract({})", self.type_name),
    }
  }
}
