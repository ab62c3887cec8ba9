// src/lifetime/managers.rs

use std::thread::{self, ThreadId};

use dashmap::DashMap;
use parking_lot::Mutex;

use super::{next_manager_id, LifetimeEnv, LifetimeManager};
use crate::container::Container;
use crate::instance::{Instance, WeakInstance};

/// No caching at all: every resolution runs the pipeline.
pub struct Transient {
  _priv: (),
}

impl Transient {
  pub fn new() -> Self {
    Self { _priv: () }
  }
}

impl Default for Transient {
  fn default() -> Self {
    Self::new()
  }
}

impl LifetimeManager for Transient {
  fn name(&self) -> &'static str {
    "transient"
  }

  fn get(&self, _env: &mut LifetimeEnv<'_, '_>) -> Option<Instance> {
    None
  }

  fn set(&self, _value: Instance, _env: &mut LifetimeEnv<'_, '_>) {}

  fn remove(&self) {}
}

/// One instance, cached in the manager itself and therefore owned by the
/// registering scope. Publishes under a per-manager lock.
pub struct ContainerControlled {
  cell: Mutex<Option<Instance>>,
  lock: Mutex<()>,
}

impl ContainerControlled {
  pub fn new() -> Self {
    Self {
      cell: Mutex::new(None),
      lock: Mutex::new(()),
    }
  }
}

impl Default for ContainerControlled {
  fn default() -> Self {
    Self::new()
  }
}

impl LifetimeManager for ContainerControlled {
  fn name(&self) -> &'static str {
    "container-controlled"
  }

  fn get(&self, _env: &mut LifetimeEnv<'_, '_>) -> Option<Instance> {
    self.cell.lock().clone()
  }

  fn set(&self, value: Instance, _env: &mut LifetimeEnv<'_, '_>) {
    *self.cell.lock() = Some(value);
  }

  fn remove(&self) {
    self.cell.lock().take();
  }

  fn seed(&self, value: Instance, _owner: &Container) -> Result<(), &'static str> {
    *self.cell.lock() = Some(value);
    Ok(())
  }

  fn sync_lock(&self) -> Option<&Mutex<()>> {
    Some(&self.lock)
  }
}

/// Like [`ContainerControlled`], but the value is additionally pinned by the
/// root container: a singleton registered in a child scope stays alive until
/// the root is disposed, even if the child goes away first.
pub struct Singleton {
  cell: Mutex<Option<Instance>>,
  lock: Mutex<()>,
}

impl Singleton {
  pub fn new() -> Self {
    Self {
      cell: Mutex::new(None),
      lock: Mutex::new(()),
    }
  }
}

impl Default for Singleton {
  fn default() -> Self {
    Self::new()
  }
}

impl LifetimeManager for Singleton {
  fn name(&self) -> &'static str {
    "singleton"
  }

  fn get(&self, _env: &mut LifetimeEnv<'_, '_>) -> Option<Instance> {
    self.cell.lock().clone()
  }

  fn set(&self, value: Instance, env: &mut LifetimeEnv<'_, '_>) {
    env.owner.root().pin(value.clone());
    *self.cell.lock() = Some(value);
  }

  fn remove(&self) {
    self.cell.lock().take();
  }

  fn seed(&self, value: Instance, owner: &Container) -> Result<(), &'static str> {
    owner.root().pin(value.clone());
    *self.cell.lock() = Some(value);
    Ok(())
  }

  fn sync_lock(&self) -> Option<&Mutex<()>> {
    Some(&self.lock)
  }
}

/// One instance per resolving container. The registration's own manager is a
/// prototype: each scope that resolves the contract gets a private clone via
/// [`LifetimeManager::scope_local`], so descendants cache independent
/// instances that die with their scope.
pub struct Hierarchical {
  cell: Mutex<Option<Instance>>,
  lock: Mutex<()>,
}

impl Hierarchical {
  pub fn new() -> Self {
    Self {
      cell: Mutex::new(None),
      lock: Mutex::new(()),
    }
  }
}

impl Default for Hierarchical {
  fn default() -> Self {
    Self::new()
  }
}

impl LifetimeManager for Hierarchical {
  fn name(&self) -> &'static str {
    "hierarchical"
  }

  fn get(&self, _env: &mut LifetimeEnv<'_, '_>) -> Option<Instance> {
    self.cell.lock().clone()
  }

  fn set(&self, value: Instance, _env: &mut LifetimeEnv<'_, '_>) {
    *self.cell.lock() = Some(value);
  }

  fn remove(&self) {
    self.cell.lock().take();
  }

  fn sync_lock(&self) -> Option<&Mutex<()>> {
    Some(&self.lock)
  }

  fn scope_local(&self) -> Option<Box<dyn LifetimeManager>> {
    Some(Box::new(Hierarchical::new()))
  }
}

/// Shares one instance within a single resolve/build-up call graph. The
/// value lives in the request's scratch map, keyed by this manager's id, and
/// is discarded when the call returns, so a diamond-shaped graph sees one
/// shared sub-object, while the next resolve builds a fresh one.
pub struct PerResolve {
  id: u64,
}

impl PerResolve {
  pub fn new() -> Self {
    Self {
      id: next_manager_id(),
    }
  }
}

impl Default for PerResolve {
  fn default() -> Self {
    Self::new()
  }
}

impl LifetimeManager for PerResolve {
  fn name(&self) -> &'static str {
    "per-resolve"
  }

  fn get(&self, env: &mut LifetimeEnv<'_, '_>) -> Option<Instance> {
    env.request.per_resolve_get(self.id)
  }

  fn set(&self, value: Instance, env: &mut LifetimeEnv<'_, '_>) {
    env.request.per_resolve_set(self.id, value);
  }

  fn remove(&self) {}
}

/// One instance per thread.
pub struct PerThread {
  values: DashMap<ThreadId, Instance>,
}

impl PerThread {
  pub fn new() -> Self {
    Self {
      values: DashMap::new(),
    }
  }
}

impl Default for PerThread {
  fn default() -> Self {
    Self::new()
  }
}

impl LifetimeManager for PerThread {
  fn name(&self) -> &'static str {
    "per-thread"
  }

  fn get(&self, _env: &mut LifetimeEnv<'_, '_>) -> Option<Instance> {
    self
      .values
      .get(&thread::current().id())
      .map(|entry| entry.value().clone())
  }

  fn set(&self, value: Instance, _env: &mut LifetimeEnv<'_, '_>) {
    self.values.insert(thread::current().id(), value);
  }

  fn remove(&self) {
    self.values.clear();
  }
}

/// The container observes the instance through a weak reference and never
/// keeps it alive. While external code holds the value, repeated resolves
/// return it; once the last external handle drops, the next resolve builds
/// anew.
pub struct ExternallyControlled {
  cell: Mutex<Option<WeakInstance>>,
}

impl ExternallyControlled {
  pub fn new() -> Self {
    Self {
      cell: Mutex::new(None),
    }
  }
}

impl Default for ExternallyControlled {
  fn default() -> Self {
    Self::new()
  }
}

impl LifetimeManager for ExternallyControlled {
  fn name(&self) -> &'static str {
    "externally-controlled"
  }

  fn get(&self, _env: &mut LifetimeEnv<'_, '_>) -> Option<Instance> {
    self
      .cell
      .lock()
      .as_ref()
      .and_then(WeakInstance::upgrade)
  }

  fn set(&self, value: Instance, _env: &mut LifetimeEnv<'_, '_>) {
    *self.cell.lock() = Some(value.downgrade());
  }

  fn remove(&self) {
    self.cell.lock().take();
  }

  fn seed(&self, value: Instance, _owner: &Container) -> Result<(), &'static str> {
    *self.cell.lock() = Some(value.downgrade());
    Ok(())
  }
}
