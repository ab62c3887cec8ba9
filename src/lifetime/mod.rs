// src/lifetime/mod.rs

//! Lifetime managers: strategies controlling where a built instance is
//! cached, who shares it, and when it is released.
//!
//! A manager moves by value into exactly one registration, so a single
//! physical manager can never back two registrations. Its state machine is
//! Unset -> Set -> Unset: `get` returns `None` while unset ("not yet built,
//! build, then `set`"), `set` publishes, and `remove` (or dropping the
//! registration) releases the stored handle.
//!
//! Managers that guard a build-then-publish sequence expose a per-manager
//! lock through [`LifetimeManager::sync_lock`]; the engine holds it across
//! the pipeline so concurrent resolutions of one contract block until the
//! winner publishes. The lock is a `parking_lot` mutex, so a build failure
//! releases it with the manager still Unset and a later resolve retries.

mod managers;

pub use managers::{
  ContainerControlled, ExternallyControlled, Hierarchical, PerResolve, PerThread, Singleton,
  Transient,
};

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;

use crate::container::Container;
use crate::instance::Instance;
use crate::pipeline::context::Request;

/// Ambient state handed to a manager on `get`/`set`: the scope performing
/// the resolution, the scope owning the registration, and the per-call
/// request (per-resolve scratch values live there).
pub struct LifetimeEnv<'a, 'ov> {
  pub(crate) resolving: &'a Container,
  pub(crate) owner: &'a Container,
  pub(crate) request: &'a mut Request<'ov>,
}

impl<'a, 'ov> LifetimeEnv<'a, 'ov> {
  /// The container the resolve call was made on.
  pub fn resolving(&self) -> &Container {
    self.resolving
  }

  /// The container whose scope owns the registration.
  pub fn owner(&self) -> &Container {
    self.owner
  }
}

/// Caching/sharing/disposal strategy for one registration's instances.
pub trait LifetimeManager: Send + Sync {
  /// Short strategy name, used for introspection and log events.
  fn name(&self) -> &'static str;

  /// The cached value, or `None` when the caller must build and publish.
  fn get(&self, env: &mut LifetimeEnv<'_, '_>) -> Option<Instance>;

  /// Publishes a freshly built value.
  fn set(&self, value: Instance, env: &mut LifetimeEnv<'_, '_>);

  /// Releases the stored value, returning the manager to Unset.
  fn remove(&self);

  /// Stores a caller-provided instance at registration time. Strategies
  /// that never hold a value reject this.
  fn seed(&self, value: Instance, owner: &Container) -> Result<(), &'static str> {
    let _ = (value, owner);
    Err("this lifetime cannot hold a pre-built instance")
  }

  /// The per-manager publish lock, for strategies where at most one thread
  /// may run the build pipeline at a time.
  fn sync_lock(&self) -> Option<&Mutex<()>> {
    None
  }

  /// For strategies that cache per resolving scope: a fresh manager to be
  /// owned by one descendant container.
  fn scope_local(&self) -> Option<Box<dyn LifetimeManager>> {
    None
  }
}

/// Root-container policy choosing the lifetime for implicit (unregistered
/// type) registrations. Defaults to transient when absent.
pub struct DefaultLifetime(pub Arc<dyn Fn() -> Box<dyn LifetimeManager> + Send + Sync>);

static NEXT_MANAGER_ID: AtomicU64 = AtomicU64::new(1);

pub(crate) fn next_manager_id() -> u64 {
  NEXT_MANAGER_ID.fetch_add(1, Ordering::Relaxed)
}

/// New instance per resolution; nothing is cached.
pub fn transient() -> Box<dyn LifetimeManager> {
  Box::new(Transient::new())
}

/// One instance cached in the registering container.
pub fn container_controlled() -> Box<dyn LifetimeManager> {
  Box::new(ContainerControlled::new())
}

/// One instance cached in the manager and pinned by the root container, so
/// it outlives the registering scope.
pub fn singleton() -> Box<dyn LifetimeManager> {
  Box::new(Singleton::new())
}

/// One instance per resolving container: each child scope caches its own.
pub fn hierarchical() -> Box<dyn LifetimeManager> {
  Box::new(Hierarchical::new())
}

/// One instance shared within a single resolve call graph, then discarded.
pub fn per_resolve() -> Box<dyn LifetimeManager> {
  Box::new(PerResolve::new())
}

/// One instance per thread.
pub fn per_thread() -> Box<dyn LifetimeManager> {
  Box::new(PerThread::new())
}

/// The container holds only a weak reference; the instance lives exactly as
/// long as external code keeps it alive.
pub fn externally_controlled() -> Box<dyn LifetimeManager> {
  Box::new(ExternallyControlled::new())
}
