// src/container.rs

//! The container: a node in the scope tree, the registration API, and the
//! resolution engine that ties registry, pipelines, and lifetimes together.

use std::any::TypeId;
use std::collections::HashSet;
use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use dashmap::DashMap;
use parking_lot::{Mutex, RwLock};
use tracing::{debug, trace};

use crate::contract::Contract;
use crate::error::{IocError, IocResult};
use crate::inject::{Blueprint, Injectable, InjectionMember, Seal};
use crate::instance::Instance;
use crate::lifetime::{self, DefaultLifetime, LifetimeEnv, LifetimeManager};
use crate::overrides::Override;
use crate::pipeline::context::{Request, ResolveContext, Resolver, Target};
use crate::pipeline::{build_pipeline, BuildPlan, Processor, StagedChain};
use crate::policy::{PolicyChange, PolicyStore};
use crate::registration::{Category, FactoryFn, Registration};
use crate::registry::Registry;

static NEXT_SCOPE_ID: AtomicU64 = AtomicU64::new(1);

type ProviderFn = Arc<dyn Fn(&Contract) -> Option<ProvidedRegistration> + Send + Sync>;

struct ScopeNode {
  id: u64,
  parent: Option<Arc<ScopeNode>>,
  registry: Registry,
  providers: RwLock<Vec<ProviderFn>>,
  /// Root-owned defaults; child nodes hold a back-reference.
  defaults: Arc<PolicyStore>,
  /// Bumped whenever the processor chain policy changes; cached pipelines
  /// tagged with an older version lazily rebuild.
  chain_version: Arc<AtomicU64>,
  /// Synthetic registrations for unregistered-type resolution (root only).
  implicit: DashMap<Contract, Arc<Registration>>,
  /// Scope-local lifetime managers for hierarchical registrations resolved
  /// through this scope, keyed by registration id.
  scope_locals: DashMap<u64, Arc<dyn LifetimeManager>>,
  /// Strong handles pinned by singleton lifetimes (root only).
  pinned: Mutex<Vec<Instance>>,
  disposed: AtomicBool,
}

/// One row of [`Container::registrations`].
#[derive(Clone, Debug)]
pub struct RegistrationInfo {
  /// The registered contract.
  pub contract: Contract,
  /// The implementation type the contract maps to.
  pub mapped_type: &'static str,
  /// The lifetime strategy's name.
  pub lifetime: &'static str,
}

/// A registration synthesized by a contract provider, the fallback
/// consulted when no exact registration exists.
pub struct ProvidedRegistration {
  category: Category,
  lifetime: Box<dyn LifetimeManager>,
  members: Vec<InjectionMember>,
  mapped_type: &'static str,
}

impl ProvidedRegistration {
  /// Serve the contract by building `T` from its blueprint.
  pub fn for_type<T: Injectable>(
    lifetime: Box<dyn LifetimeManager>,
    members: Vec<InjectionMember>,
  ) -> Self {
    let blueprint = Arc::new(T::blueprint());
    let seal = blueprint.seal.clone();
    Self {
      category: Category::Type { blueprint, seal },
      lifetime,
      members,
      mapped_type: std::any::type_name::<T>(),
    }
  }

  /// Serve the contract from a factory closure.
  pub fn for_factory<I, F>(lifetime: Box<dyn LifetimeManager>, factory: F) -> Self
  where
    I: ?Sized + Send + Sync + 'static,
    F: Fn(&mut Resolver<'_, '_>) -> IocResult<Arc<I>> + Send + Sync + 'static,
  {
    let produce: FactoryFn = Arc::new(move |resolver| factory(resolver).map(Instance::new));
    Self {
      category: Category::Factory { produce },
      lifetime,
      members: Vec::new(),
      mapped_type: std::any::type_name::<I>(),
    }
  }

  fn into_registration(self) -> Registration {
    Registration::new(self.category, self.lifetime, self.members, self.mapped_type)
  }
}

/// A handle to one scope in the container tree. Cloning yields another
/// handle to the same scope; [`Container::child`] creates a descendant
/// scope that falls back to this one for lookups.
pub struct Container {
  inner: Arc<ScopeNode>,
}

impl Container {
  /// Creates a new root container with the standard processor chain.
  pub fn new() -> Self {
    let defaults = Arc::new(PolicyStore::new());
    defaults.set::<StagedChain>(None, Arc::new(StagedChain::standard()));

    let chain_version = Arc::new(AtomicU64::new(0));
    let bump = chain_version.clone();
    defaults.subscribe(move |change| {
      if change.policy == TypeId::of::<StagedChain>() {
        bump.fetch_add(1, Ordering::Release);
      }
    });

    let id = NEXT_SCOPE_ID.fetch_add(1, Ordering::Relaxed);
    debug!(target: "weft_ioc", scope = id, "created root scope");
    Self {
      inner: Arc::new(ScopeNode {
        id,
        parent: None,
        registry: Registry::new(),
        providers: RwLock::new(Vec::new()),
        defaults,
        chain_version,
        implicit: DashMap::new(),
        scope_locals: DashMap::new(),
        pinned: Mutex::new(Vec::new()),
        disposed: AtomicBool::new(false),
      }),
    }
  }

  /// Creates a child scope. Lookups that miss here continue in this
  /// container, then its ancestors.
  pub fn child(&self) -> Container {
    let id = NEXT_SCOPE_ID.fetch_add(1, Ordering::Relaxed);
    debug!(target: "weft_ioc", scope = id, parent = self.inner.id, "created child scope");
    Container {
      inner: Arc::new(ScopeNode {
        id,
        parent: Some(self.inner.clone()),
        registry: Registry::new(),
        providers: RwLock::new(Vec::new()),
        defaults: self.inner.defaults.clone(),
        chain_version: self.inner.chain_version.clone(),
        implicit: DashMap::new(),
        scope_locals: DashMap::new(),
        pinned: Mutex::new(Vec::new()),
        disposed: AtomicBool::new(false),
      }),
    }
  }

  /// The parent scope, if this is not the root.
  pub fn parent(&self) -> Option<Container> {
    self.inner.parent.clone().map(|inner| Container { inner })
  }

  pub(crate) fn root(&self) -> Container {
    let mut node = self.inner.clone();
    while let Some(parent) = node.parent.clone() {
      node = parent;
    }
    Container { inner: node }
  }

  pub(crate) fn pin(&self, value: Instance) {
    self.inner.pinned.lock().push(value);
  }

  fn ensure_alive(&self) -> IocResult<()> {
    if self.inner.disposed.load(Ordering::Acquire) {
      Err(IocError::Disposed)
    } else {
      Ok(())
    }
  }

  // --- Registration ---

  /// Registers `T` under its own contract.
  pub fn register_type<T: Injectable>(
    &self,
    name: Option<&str>,
    lifetime: Box<dyn LifetimeManager>,
    members: Vec<InjectionMember>,
  ) -> IocResult<()> {
    self.register_type_as::<T, T, _>(name, lifetime, members, |value| value)
  }

  /// Registers `T` as the implementation of contract `I`. `cast` performs
  /// the coercion, typically `|t| t as Arc<dyn Trait>`.
  pub fn register_type_as<I, T, F>(
    &self,
    name: Option<&str>,
    lifetime: Box<dyn LifetimeManager>,
    members: Vec<InjectionMember>,
    cast: F,
  ) -> IocResult<()>
  where
    I: ?Sized + Send + Sync + 'static,
    T: Injectable,
    F: Fn(Arc<T>) -> Arc<I> + Send + Sync + 'static,
  {
    self.ensure_alive()?;
    let blueprint = Arc::new(T::blueprint());

    // File the blueprint with the root defaults so `T` itself participates
    // in unregistered-type resolution, the way any constructible type does.
    let root = self.root();
    if root
      .inner
      .defaults
      .get::<Blueprint>(Some(TypeId::of::<T>()))
      .is_none()
    {
      root
        .inner
        .defaults
        .set(Some(TypeId::of::<T>()), blueprint.clone());
    }

    let seal: Seal = Arc::new(move |built| {
      let value = built.downcast::<T>().map_err(|_| IocError::InvalidRegistration {
        contract: String::from(std::any::type_name::<T>()),
        reason: String::from("build target is not of the registered implementation type"),
      })?;
      Ok(Instance::new::<I>(cast(Arc::from(value))))
    });

    let contract = self.contract_for::<I>(name);
    let registration = Arc::new(Registration::new(
      Category::Type { blueprint, seal },
      lifetime,
      members,
      std::any::type_name::<T>(),
    ));
    debug!(
      target: "weft_ioc",
      contract = %contract,
      implementation = registration.mapped_type,
      lifetime = registration.lifetime.name(),
      "registered type"
    );
    self.insert_registration(contract, registration);
    Ok(())
  }

  /// Registers a factory producing `Arc<I>` for the contract.
  pub fn register_factory<I, F>(
    &self,
    name: Option<&str>,
    lifetime: Box<dyn LifetimeManager>,
    factory: F,
  ) -> IocResult<()>
  where
    I: ?Sized + Send + Sync + 'static,
    F: Fn(&mut Resolver<'_, '_>) -> IocResult<Arc<I>> + Send + Sync + 'static,
  {
    self.ensure_alive()?;
    let produce: FactoryFn = Arc::new(move |resolver| factory(resolver).map(Instance::new));
    let contract = self.contract_for::<I>(name);
    let registration = Arc::new(Registration::new(
      Category::Factory { produce },
      lifetime,
      Vec::new(),
      std::any::type_name::<I>(),
    ));
    debug!(target: "weft_ioc", contract = %contract, lifetime = registration.lifetime.name(), "registered factory");
    self.insert_registration(contract, registration);
    Ok(())
  }

  /// Registers a pre-built instance, container-controlled: the container
  /// keeps it alive and hands out the same handle until re-registration or
  /// disposal.
  pub fn register_instance<I: ?Sized + Send + Sync + 'static>(
    &self,
    name: Option<&str>,
    value: Arc<I>,
  ) -> IocResult<()> {
    self.register_instance_with(name, value, lifetime::container_controlled())
  }

  /// Registers a pre-built instance under an explicit lifetime. An
  /// externally-controlled lifetime makes the container hold only a weak
  /// reference to `value`.
  pub fn register_instance_with<I: ?Sized + Send + Sync + 'static>(
    &self,
    name: Option<&str>,
    value: Arc<I>,
    lifetime: Box<dyn LifetimeManager>,
  ) -> IocResult<()> {
    self.ensure_alive()?;
    let contract = self.contract_for::<I>(name);
    lifetime
      .seed(Instance::new(value), self)
      .map_err(|reason| IocError::invalid(&contract, reason))?;
    let registration = Arc::new(Registration::new(
      Category::Instance,
      lifetime,
      Vec::new(),
      std::any::type_name::<I>(),
    ));
    debug!(target: "weft_ioc", contract = %contract, lifetime = registration.lifetime.name(), "registered instance");
    self.insert_registration(contract, registration);
    Ok(())
  }

  /// Registers a contract provider on this scope: a fallback consulted when
  /// no exact registration exists, serving whole families of contracts. A
  /// match is cached in this scope under the exact contract.
  pub fn register_provider<F>(&self, provider: F) -> IocResult<()>
  where
    F: Fn(&Contract) -> Option<ProvidedRegistration> + Send + Sync + 'static,
  {
    self.ensure_alive()?;
    self.inner.providers.write().push(Arc::new(provider));
    debug!(target: "weft_ioc", scope = self.inner.id, "registered contract provider");
    Ok(())
  }

  /// Files `T`'s blueprint with the root defaults, making `T` resolvable
  /// without an explicit registration.
  pub fn declare<T: Injectable>(&self) -> IocResult<()> {
    self.ensure_alive()?;
    let root = self.root();
    root
      .inner
      .defaults
      .set(Some(TypeId::of::<T>()), Arc::new(T::blueprint()));
    Ok(())
  }

  /// Sets the lifetime used for implicit (unregistered type) registrations.
  /// Absent this policy they are transient.
  pub fn set_default_lifetime<F>(&self, factory: F)
  where
    F: Fn() -> Box<dyn LifetimeManager> + Send + Sync + 'static,
  {
    self
      .root()
      .inner
      .defaults
      .set(None, Arc::new(DefaultLifetime(Arc::new(factory))));
  }

  fn insert_registration(&self, contract: Contract, registration: Arc<Registration>) {
    let replaced = self.inner.registry.set(contract.clone(), registration);
    if let Some(old) = replaced {
      // Dropping the old registration releases its lifetime manager and any
      // instance it held.
      debug!(target: "weft_ioc", contract = %contract, "replaced existing registration");
      drop(old);
    }
  }

  fn contract_for<I: ?Sized + 'static>(&self, name: Option<&str>) -> Contract {
    match name {
      Some(name) => Contract::of_named::<I>(name),
      None => Contract::of::<I>(),
    }
  }

  // --- Introspection ---

  /// Whether an explicit registration for the contract exists anywhere on
  /// the scope chain.
  pub fn is_registered<T: ?Sized + 'static>(&self, name: Option<&str>) -> bool {
    let contract = self.contract_for::<T>(name);
    let mut node = Some(self.inner.clone());
    while let Some(current) = node {
      if current.registry.contains(&contract) {
        return true;
      }
      node = current.parent.clone();
    }
    false
  }

  /// All visible registrations, deduplicated by contract with child scopes
  /// shadowing their ancestors. Order is unspecified.
  pub fn registrations(&self) -> Vec<RegistrationInfo> {
    let mut seen: HashSet<Contract> = HashSet::new();
    let mut out = Vec::new();
    let mut node = Some(self.inner.clone());
    while let Some(current) = node {
      for (contract, registration) in current.registry.snapshot() {
        if seen.insert(contract.clone()) {
          out.push(RegistrationInfo {
            contract,
            mapped_type: registration.mapped_type,
            lifetime: registration.lifetime.name(),
          });
        }
      }
      node = current.parent.clone();
    }
    out
  }

  // --- Resolution ---

  /// Resolves the contract `(T, name)`.
  pub fn resolve<T: ?Sized + Send + Sync + 'static>(
    &self,
    name: Option<&str>,
  ) -> IocResult<Arc<T>> {
    self.resolve_with(name, &[])
  }

  /// Resolves with caller-supplied overrides, which apply to every
  /// dependency site in the object graph built by this call.
  pub fn resolve_with<T: ?Sized + Send + Sync + 'static>(
    &self,
    name: Option<&str>,
    overrides: &[Override],
  ) -> IocResult<Arc<T>> {
    let contract = self.contract_for::<T>(name);
    let mut request = Request::new(overrides);
    let instance = self.resolve_in_request(contract.clone(), &mut request)?;
    instance.downcast::<T>().ok_or_else(|| {
      IocError::failed(
        &contract,
        "resolved payload does not match the requested type",
        Vec::new(),
      )
    })
  }

  /// Resolves every registration of element type `T` across the scope
  /// chain, one instance per contract, child registrations shadowing parent
  /// ones. No registrations means an empty vector, never a fault.
  pub fn resolve_all<T: ?Sized + Send + Sync + 'static>(&self) -> IocResult<Vec<Arc<T>>> {
    self.ensure_alive()?;
    let element = TypeId::of::<T>();
    let mut seen: HashSet<Contract> = HashSet::new();
    let mut matching: Vec<Contract> = Vec::new();
    let mut node = Some(self.inner.clone());
    while let Some(current) = node {
      for (contract, _) in current.registry.snapshot() {
        if seen.insert(contract.clone()) && contract.type_id() == element {
          matching.push(contract);
        }
      }
      node = current.parent.clone();
    }

    let mut out = Vec::with_capacity(matching.len());
    for contract in matching {
      let mut request = Request::new(&[]);
      let instance = self.resolve_in_request(contract.clone(), &mut request)?;
      out.push(instance.downcast::<T>().ok_or_else(|| {
        IocError::failed(
          &contract,
          "resolved payload does not match the requested element type",
          Vec::new(),
        )
      })?);
    }
    Ok(out)
  }

  /// Injects `target`'s configured members in place, without constructing
  /// anything. The value itself is never replaced.
  pub fn build_up<T: Injectable>(
    &self,
    target: &mut T,
    name: Option<&str>,
    overrides: &[Override],
  ) -> IocResult<()> {
    self.ensure_alive()?;
    let contract = self.contract_for::<T>(name);

    let (owner, registration) = match self.lookup_chain(&contract) {
      Some(found) => found,
      None => {
        let root = self.root();
        if root
          .inner
          .defaults
          .get::<Blueprint>(Some(TypeId::of::<T>()))
          .is_none()
        {
          root
            .inner
            .defaults
            .set(Some(TypeId::of::<T>()), Arc::new(T::blueprint()));
        }
        let registration = self
          .implicit_registration(&contract)
          .expect("blueprint was just filed");
        (root, registration)
      }
    };

    let blueprint: Arc<Blueprint> = match &registration.category {
      Category::Type { blueprint, .. } => blueprint.clone(),
      _ => Arc::new(T::blueprint()),
    };

    let version = self.inner.chain_version.load(Ordering::Acquire);
    let chain = self.chain(&contract)?;
    let plan = BuildPlan {
      contract: &contract,
      category: &registration.category,
      members: &registration.members,
      blueprint: Some(&blueprint),
      build_up: true,
    };
    let pipeline = registration
      .build_up_slot
      .get_or_build(version, || build_pipeline(&chain, &plan))?;

    let mut request = Request::new(overrides);
    request.enter(&contract)?;
    let mut ctx = ResolveContext {
      container: self,
      owner: &owner,
      contract: &contract,
      manager: &registration.lifetime,
      request: &mut request,
      target: Target::Borrowed(target),
      result: None,
      fault: None,
      from_cache: false,
    };
    let outcome = pipeline.run(&mut ctx);
    request.exit();
    outcome.map(|_| ())
  }

  /// Offloads the synchronous resolution algorithm onto a blocking task.
  #[cfg(feature = "async")]
  pub async fn resolve_async<T: ?Sized + Send + Sync + 'static>(
    &self,
    name: Option<&str>,
  ) -> IocResult<Arc<T>> {
    let container = self.clone();
    let name = name.map(str::to_owned);
    match tokio::task::spawn_blocking(move || container.resolve::<T>(name.as_deref())).await {
      Ok(result) => result,
      Err(_) => Err(IocError::ResolutionFailed {
        contract: String::from(std::any::type_name::<T>()),
        reason: String::from("background resolution task failed"),
        path: Vec::new(),
        source: None,
      }),
    }
  }

  // --- Engine ---

  pub(crate) fn resolve_in_request(
    &self,
    contract: Contract,
    request: &mut Request<'_>,
  ) -> IocResult<Instance> {
    self.ensure_alive()?;
    request.enter(&contract)?;
    let outcome = self.resolve_body(&contract, request);
    request.exit();
    outcome
  }

  fn resolve_body(&self, contract: &Contract, request: &mut Request<'_>) -> IocResult<Instance> {
    trace!(target: "weft_ioc", contract = %contract, scope = self.inner.id, "resolving");

    if let Some((owner, registration)) = self.lookup_chain(contract) {
      return self.resolve_registration(&owner, &registration, contract, request);
    }

    if let Some((owner, registration)) = self.match_provider(contract) {
      return self.resolve_registration(&owner, &registration, contract, request);
    }

    if let Some(registration) = self.implicit_registration(contract) {
      let root = self.root();
      return self.resolve_registration(&root, &registration, contract, request);
    }

    Err(IocError::failed(
      contract,
      "no registration, provider, or blueprint for this contract",
      request.path(),
    ))
  }

  fn lookup_chain(&self, contract: &Contract) -> Option<(Container, Arc<Registration>)> {
    let mut node = self.inner.clone();
    loop {
      if let Some(registration) = node.registry.get(contract) {
        return Some((Container { inner: node }, registration));
      }
      match node.parent.clone() {
        Some(parent) => node = parent,
        None => return None,
      }
    }
  }

  fn match_provider(&self, contract: &Contract) -> Option<(Container, Arc<Registration>)> {
    let mut node = self.inner.clone();
    loop {
      // Snapshot the provider list so a provider is never invoked while the
      // lock is held.
      let providers: Vec<ProviderFn> = node.providers.read().clone();
      let provided = providers.iter().find_map(|provider| provider(contract));
      if let Some(provided) = provided {
        let owner = Container { inner: node };
        // Cache under the exact contract so future lookups skip the
        // providers; a racer may have published first, in which case its
        // registration wins.
        if let Some(existing) = owner.inner.registry.get(contract) {
          return Some((owner, existing));
        }
        let registration = Arc::new(provided.into_registration());
        owner
          .inner
          .registry
          .set(contract.clone(), registration.clone());
        debug!(target: "weft_ioc", contract = %contract, scope = owner.inner.id, "cached provider registration");
        return Some((owner, registration));
      }
      match node.parent.clone() {
        Some(parent) => node = parent,
        None => return None,
      }
    }
  }

  fn implicit_registration(&self, contract: &Contract) -> Option<Arc<Registration>> {
    let root = self.root();
    let blueprint = root
      .inner
      .defaults
      .get::<Blueprint>(Some(contract.type_id()))?;
    let registration = root
      .inner
      .implicit
      .entry(contract.clone())
      .or_insert_with(|| {
        let lifetime = root
          .inner
          .defaults
          .get_or_default::<DefaultLifetime>(Some(contract.type_id()))
          .map(|policy| (policy.0)())
          .unwrap_or_else(lifetime::transient);
        trace!(target: "weft_ioc", contract = %contract, "created implicit registration");
        Arc::new(Registration::new(
          Category::Type {
            seal: blueprint.seal.clone(),
            blueprint: blueprint.clone(),
          },
          lifetime,
          Vec::new(),
          blueprint.type_name(),
        ))
      })
      .clone();
    Some(registration)
  }

  fn chain(&self, contract: &Contract) -> IocResult<Arc<StagedChain>> {
    self
      .root()
      .inner
      .defaults
      .get::<StagedChain>(None)
      .ok_or_else(|| IocError::invalid(contract, "the processor chain policy has been removed"))
  }

  fn resolve_registration(
    &self,
    owner: &Container,
    registration: &Arc<Registration>,
    contract: &Contract,
    request: &mut Request<'_>,
  ) -> IocResult<Instance> {
    // Hierarchical lifetimes cache per resolving scope: the registration's
    // manager is a prototype, and each scope lazily clones its own.
    let manager: Arc<dyn LifetimeManager> = match registration.lifetime.scope_local() {
      Some(fresh) => self
        .inner
        .scope_locals
        .entry(registration.id)
        .or_insert_with(|| Arc::from(fresh))
        .clone(),
      None => registration.lifetime.clone(),
    };

    {
      let mut env = LifetimeEnv {
        resolving: self,
        owner,
        request: &mut *request,
      };
      if let Some(value) = manager.get(&mut env) {
        trace!(target: "weft_ioc", contract = %contract, "lifetime cache hit");
        return Ok(value);
      }
    }

    let version = self.inner.chain_version.load(Ordering::Acquire);
    let chain = self.chain(contract)?;
    let plan = BuildPlan {
      contract,
      category: &registration.category,
      members: &registration.members,
      blueprint: match &registration.category {
        Category::Type { blueprint, .. } => Some(blueprint),
        _ => None,
      },
      build_up: false,
    };
    let pipeline = registration.resolve_slot.get_or_build(version, || {
      debug!(target: "weft_ioc", contract = %contract, "composing pipeline");
      build_pipeline(&chain, &plan)
    })?;

    // Synchronized lifetimes serialize build-then-publish per manager; the
    // lifetime stage re-checks the cache under this lock, so losers of the
    // race observe the winner's value instead of rebuilding.
    let _publish_guard = manager.sync_lock().map(|lock| lock.lock());

    let mut ctx = ResolveContext {
      container: self,
      owner,
      contract,
      manager: &manager,
      request: &mut *request,
      target: Target::None,
      result: None,
      fault: None,
      from_cache: false,
    };
    let produced = pipeline.run(&mut ctx)?;
    produced.ok_or_else(|| {
      IocError::failed(
        contract,
        "pipeline completed without producing a value",
        request.path(),
      )
    })
  }

  // --- Extension hooks ---

  /// Appends a processor to its stage of the chain. Cached pipelines are
  /// invalidated and recomposed on next use.
  pub fn add_processor(&self, processor: Arc<dyn Processor>) {
    let defaults = self.root().inner.defaults.clone();
    let mut chain = defaults
      .get::<StagedChain>(None)
      .map(|chain| (*chain).clone())
      .unwrap_or_else(StagedChain::standard);
    chain.insert(processor);
    defaults.set(None, Arc::new(chain));
    debug!(target: "weft_ioc", "processor chain updated");
  }

  /// Subscribes to changes of the root defaults store.
  pub fn on_policy_change(&self, listener: impl Fn(&PolicyChange) + Send + Sync + 'static) {
    self.root().inner.defaults.subscribe(listener);
  }

  // --- Teardown ---

  /// Tears this scope down: every registration, cached instance, provider
  /// and scope-local value is released. Later operations on this handle
  /// fault with [`IocError::Disposed`].
  pub fn dispose(&self) {
    if self.inner.disposed.swap(true, Ordering::AcqRel) {
      return;
    }
    let dropped = self.inner.registry.clear();
    self.inner.scope_locals.clear();
    self.inner.implicit.clear();
    self.inner.pinned.lock().clear();
    self.inner.providers.write().clear();
    debug!(
      target: "weft_ioc",
      scope = self.inner.id,
      registrations = dropped.len(),
      "disposed scope"
    );
    drop(dropped);
  }
}

impl Default for Container {
  fn default() -> Self {
    Self::new()
  }
}

impl Clone for Container {
  fn clone(&self) -> Self {
    Self {
      inner: self.inner.clone(),
    }
  }
}

impl fmt::Debug for Container {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("Container")
      .field("scope", &self.inner.id)
      .field("registrations", &self.inner.registry.len())
      .field("root", &self.inner.parent.is_none())
      .finish()
  }
}
