// src/overrides.rs

//! Caller-supplied overrides: rules that take precedence over normal
//! dependency resolution for the duration of one resolve/build-up call.
//!
//! An override targets either a specific dependency site (a constructor or
//! method parameter, a field) or a contract pattern. Matching a site yields
//! a rank (`NoMatch < Compatible < Exact`), and candidates are scanned in
//! reverse registration order: the last-registered override wins ties, an
//! exact match short-circuits, and a compatible match applies only when no
//! exact match exists and the override does not demand exact matching.

use std::any::TypeId;
use std::sync::Arc;

use crate::contract::Contract;
use crate::error::IocResult;
use crate::instance::Instance;
use crate::pipeline::context::Resolver;

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub(crate) enum SiteKind {
  Parameter,
  Field,
}

/// The dependency slot an override is matched against.
pub(crate) struct DependencySite<'a> {
  pub(crate) kind: SiteKind,
  pub(crate) member: &'a str,
  pub(crate) declarer: TypeId,
  pub(crate) contract: &'a Contract,
}

#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Debug)]
pub(crate) enum MatchRank {
  NoMatch,
  Compatible,
  Exact,
}

enum Target {
  Parameter(&'static str),
  Field(&'static str),
  Contract(Contract),
}

type OverrideFactory = Arc<dyn Fn(&mut Resolver<'_, '_>) -> IocResult<Instance> + Send + Sync>;

enum Payload {
  Value(Instance),
  Factory(OverrideFactory),
}

/// One override rule. Construct with the associated functions, then refine
/// with [`on_type`](Override::on_type) / [`exact_only`](Override::exact_only).
pub struct Override {
  target: Target,
  payload: Payload,
  on_type: Option<TypeId>,
  exact_only: bool,
}

impl Override {
  /// Overrides the constructor/method parameter named `name`.
  pub fn parameter<C: ?Sized + Send + Sync + 'static>(name: &'static str, value: Arc<C>) -> Self {
    Self {
      target: Target::Parameter(name),
      payload: Payload::Value(Instance::new(value)),
      on_type: None,
      exact_only: false,
    }
  }

  /// Overrides the injected field named `name`.
  pub fn field<C: ?Sized + Send + Sync + 'static>(name: &'static str, value: Arc<C>) -> Self {
    Self {
      target: Target::Field(name),
      payload: Payload::Value(Instance::new(value)),
      on_type: None,
      exact_only: false,
    }
  }

  /// Overrides every dependency on `C`, whatever site requests it. Matches
  /// the default contract exactly and named contracts of `C` compatibly.
  pub fn dependency<C: ?Sized + Send + Sync + 'static>(value: Arc<C>) -> Self {
    Self {
      target: Target::Contract(Contract::of::<C>()),
      payload: Payload::Value(Instance::new(value)),
      on_type: None,
      exact_only: false,
    }
  }

  /// Overrides dependencies on the named contract of `C`.
  pub fn dependency_named<C: ?Sized + Send + Sync + 'static>(name: &str, value: Arc<C>) -> Self {
    Self {
      target: Target::Contract(Contract::of_named::<C>(name)),
      payload: Payload::Value(Instance::new(value)),
      on_type: None,
      exact_only: false,
    }
  }

  /// Like [`parameter`](Override::parameter), but the value is produced on
  /// demand by a resolver closure.
  pub fn parameter_with<C, F>(name: &'static str, produce: F) -> Self
  where
    C: ?Sized + Send + Sync + 'static,
    F: Fn(&mut Resolver<'_, '_>) -> IocResult<Arc<C>> + Send + Sync + 'static,
  {
    Self {
      target: Target::Parameter(name),
      payload: Payload::Factory(Arc::new(move |resolver| {
        produce(resolver).map(Instance::new)
      })),
      on_type: None,
      exact_only: false,
    }
  }

  /// Constrains the override to dependency sites declared by `T`.
  pub fn on_type<T: ?Sized + 'static>(mut self) -> Self {
    self.on_type = Some(TypeId::of::<T>());
    self
  }

  /// Refuses compatible matches: this override applies only where it
  /// matches exactly.
  pub fn exact_only(mut self) -> Self {
    self.exact_only = true;
    self
  }

  pub(crate) fn rank(&self, site: &DependencySite<'_>) -> MatchRank {
    if let Some(declarer) = self.on_type {
      if declarer != site.declarer {
        return MatchRank::NoMatch;
      }
    }
    match &self.target {
      Target::Parameter(name) => {
        if site.kind == SiteKind::Parameter && *name == site.member {
          MatchRank::Exact
        } else {
          MatchRank::NoMatch
        }
      }
      Target::Field(name) => {
        if site.kind == SiteKind::Field && *name == site.member {
          MatchRank::Exact
        } else {
          MatchRank::NoMatch
        }
      }
      Target::Contract(contract) => {
        if contract.type_id() != site.contract.type_id() {
          MatchRank::NoMatch
        } else if contract.name() == site.contract.name() {
          MatchRank::Exact
        } else if contract.name().is_none() {
          MatchRank::Compatible
        } else {
          MatchRank::NoMatch
        }
      }
    }
  }

  pub(crate) fn produce(&self, resolver: &mut Resolver<'_, '_>) -> IocResult<Instance> {
    match &self.payload {
      Payload::Value(instance) => Ok(instance.clone()),
      Payload::Factory(factory) => factory(resolver),
    }
  }
}

/// Scans `overrides` in reverse registration order and returns the winning
/// candidate for `site`, if any.
pub(crate) fn select<'o>(
  overrides: &'o [Override],
  site: &DependencySite<'_>,
) -> Option<&'o Override> {
  let mut compatible: Option<&Override> = None;
  for candidate in overrides.iter().rev() {
    match candidate.rank(site) {
      MatchRank::Exact => return Some(candidate),
      MatchRank::Compatible if !candidate.exact_only && compatible.is_none() => {
        compatible = Some(candidate);
      }
      _ => {}
    }
  }
  compatible
}
