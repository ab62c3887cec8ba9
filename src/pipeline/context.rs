// src/pipeline/context.rs

//! Per-call resolution state.
//!
//! A [`Request`] lives for one `resolve`/`build_up` call and is threaded by
//! `&mut` through every nested resolution: it carries the caller's
//! overrides, the contract path (for cycle detection and error
//! breadcrumbs), and the per-resolve scratch values. A [`ResolveContext`]
//! wraps one pipeline invocation within a request. Neither is ever
//! persisted.

use std::any::Any;
use std::collections::HashMap;
use std::sync::Arc;

use crate::container::Container;
use crate::contract::Contract;
use crate::error::{IocError, IocResult};
use crate::inject::MemberValue;
use crate::instance::Instance;
use crate::lifetime::LifetimeManager;
use crate::overrides::{self, DependencySite, Override};

/// State for one top-level resolve/build-up call.
pub struct Request<'ov> {
  overrides: &'ov [Override],
  visiting: Vec<Contract>,
  per_resolve: HashMap<u64, Instance>,
}

impl<'ov> Request<'ov> {
  pub(crate) fn new(overrides: &'ov [Override]) -> Self {
    Self {
      overrides,
      visiting: Vec::new(),
      per_resolve: HashMap::new(),
    }
  }

  /// Pushes `contract` onto the path, faulting if it is already being
  /// resolved somewhere on this call graph.
  pub(crate) fn enter(&mut self, contract: &Contract) -> IocResult<()> {
    if self.visiting.iter().any(|visited| visited == contract) {
      let mut path = self.path();
      path.push(contract.to_string());
      return Err(IocError::CircularDependency {
        contract: contract.to_string(),
        path,
      });
    }
    self.visiting.push(contract.clone());
    Ok(())
  }

  pub(crate) fn exit(&mut self) {
    self.visiting.pop();
  }

  /// The contract path so far, outermost first.
  pub(crate) fn path(&self) -> Vec<String> {
    self.visiting.iter().map(Contract::to_string).collect()
  }

  pub(crate) fn overrides(&self) -> &'ov [Override] {
    self.overrides
  }

  pub(crate) fn per_resolve_get(&self, key: u64) -> Option<Instance> {
    self.per_resolve.get(&key).cloned()
  }

  pub(crate) fn per_resolve_set(&mut self, key: u64, value: Instance) {
    self.per_resolve.insert(key, value);
  }
}

/// Resolution handle passed to factories and override closures. Resolving
/// through it keeps the current request alive, so cycle detection and
/// breadcrumbs see straight through factory indirection.
pub struct Resolver<'a, 'ov> {
  pub(crate) container: &'a Container,
  pub(crate) request: &'a mut Request<'ov>,
}

impl<'a, 'ov> Resolver<'a, 'ov> {
  /// Resolves a dependency within the current request.
  pub fn resolve<T: ?Sized + Send + Sync + 'static>(
    &mut self,
    name: Option<&str>,
  ) -> IocResult<Arc<T>> {
    let contract = match name {
      Some(name) => Contract::of_named::<T>(name),
      None => Contract::of::<T>(),
    };
    let instance = self
      .container
      .resolve_in_request(contract.clone(), self.request)?;
    instance.downcast::<T>().ok_or_else(|| {
      IocError::failed(
        &contract,
        "resolved payload does not match the requested type",
        self.request.path(),
      )
    })
  }

  /// The container this resolution is running against.
  pub fn container(&self) -> &Container {
    self.container
  }
}

/// The build target under construction.
pub(crate) enum Target<'a> {
  /// Nothing to inject into (factory- or cache-produced values).
  None,
  /// A value the creation stage produced; sealed into an `Instance` when
  /// the pipeline unwinds.
  Owned(Box<dyn Any + Send + Sync>),
  /// A caller-provided value being built up in place.
  Borrowed(&'a mut (dyn Any + Send + Sync)),
}

/// One pipeline invocation's state, threaded by `&mut` through every step.
pub struct ResolveContext<'a, 'ov> {
  pub(crate) container: &'a Container,
  pub(crate) owner: &'a Container,
  pub(crate) contract: &'a Contract,
  pub(crate) manager: &'a Arc<dyn LifetimeManager>,
  pub(crate) request: &'a mut Request<'ov>,
  pub(crate) target: Target<'a>,
  pub(crate) result: Option<Instance>,
  pub(crate) fault: Option<IocError>,
  pub(crate) from_cache: bool,
}

impl<'a, 'ov> ResolveContext<'a, 'ov> {
  /// The contract being built.
  pub fn contract(&self) -> &Contract {
    self.contract
  }

  /// The produced value, once a step has published one.
  pub fn result(&self) -> Option<&Instance> {
    self.result.as_ref()
  }

  /// Publishes the produced value. Later stages (and the lifetime
  /// post-step) observe it.
  pub fn set_result(&mut self, value: Instance) {
    self.result = Some(value);
  }

  /// Mutable access to the build target, if this invocation has one.
  pub(crate) fn target_any_mut(&mut self) -> Option<&mut dyn Any> {
    match &mut self.target {
      Target::None => None,
      Target::Owned(boxed) => Some(&mut **boxed),
      Target::Borrowed(borrowed) => Some(&mut **borrowed),
    }
  }

  /// Resolves one dependency site: caller overrides first, then the
  /// registration's configured member value, then container resolution.
  /// Optional sites swallow resolution failures and yield `None`.
  pub(crate) fn resolve_site(
    &mut self,
    site: &DependencySite<'_>,
    configured: Option<&MemberValue>,
    optional: bool,
  ) -> IocResult<Option<Instance>> {
    let overrides = self.request.overrides();
    if let Some(winner) = overrides::select(overrides, site) {
      let mut resolver = Resolver {
        container: self.container,
        request: &mut *self.request,
      };
      return winner.produce(&mut resolver).map(Some);
    }

    if let Some(configured) = configured {
      match configured {
        MemberValue::Value(instance) => return Ok(Some(instance.clone())),
        MemberValue::Contract(redirected) => {
          return match self
            .container
            .resolve_in_request(redirected.clone(), self.request)
          {
            Ok(value) => Ok(Some(value)),
            Err(_) if optional => Ok(None),
            Err(cause) => Err(IocError::failed_with(
              redirected,
              format!("configured value for `{}` could not be resolved", site.member),
              self.request.path(),
              cause,
            )),
          };
        }
      }
    }

    match self
      .container
      .resolve_in_request(site.contract.clone(), self.request)
    {
      Ok(value) => Ok(Some(value)),
      Err(_) if optional => Ok(None),
      Err(cause) => Err(IocError::failed_with(
        site.contract,
        format!("dependency `{}` could not be satisfied", site.member),
        self.request.path(),
        cause,
      )),
    }
  }
}
