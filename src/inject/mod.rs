// src/inject/mod.rs

//! Injection metadata: how a type describes its constructors and members,
//! and how a registration configures which of them participate.
//!
//! There is no reflection to discover constructors or annotated members, so
//! types carry a [`Blueprint`]: declared constructors and injectable members
//! as data plus monomorphized closures. The pipeline's selection algorithms
//! operate on that data exactly as they would on reflected metadata.

mod args;
mod blueprint;

pub use args::ResolvedArgs;
pub use blueprint::{Blueprint, BlueprintBuilder, Injectable};
pub(crate) use blueprint::{ConstructorSpec, Seal};

use crate::contract::Contract;
use crate::instance::Instance;
use std::sync::Arc;

/// One dependency slot: the parameter (or member) name, the contract it
/// wants, and whether it is optional.
#[derive(Clone)]
pub struct Param {
  pub(crate) name: &'static str,
  pub(crate) contract: Contract,
  pub(crate) optional: bool,
}

impl Param {
  /// Redirects the dependency to the named registration of its type.
  pub fn named(mut self, contract_name: &str) -> Self {
    self.contract = self.contract.with_name(contract_name);
    self
  }

  /// Marks the dependency optional: an unresolved contract yields `None`
  /// instead of a fault.
  pub fn optional(mut self) -> Self {
    self.optional = true;
    self
  }
}

/// A dependency on the default contract of `C`.
pub fn param<C: ?Sized + Send + Sync + 'static>(name: &'static str) -> Param {
  Param {
    name,
    contract: Contract::of::<C>(),
    optional: false,
  }
}

/// A value explicitly configured for one injected member.
#[derive(Clone)]
pub enum MemberValue {
  /// A fixed, pre-built value.
  Value(Instance),
  /// Resolve this contract instead of the member's declared one.
  Contract(Contract),
}

/// Per-registration injection configuration, matched against the blueprint
/// when the pipeline is built. Unknown member names and duplicate claims are
/// rejected at that point as invalid registrations.
#[derive(Clone)]
pub enum InjectionMember {
  /// Selects the constructor whose parameter types match `signature`.
  Constructor { signature: Vec<Contract> },
  /// Forces injection of a declared field, optionally with a fixed value or
  /// a redirected contract.
  Field {
    name: &'static str,
    value: Option<MemberValue>,
  },
  /// Forces invocation of a declared injection method.
  Method { name: &'static str },
}

impl InjectionMember {
  pub fn constructor(signature: Vec<Contract>) -> Self {
    InjectionMember::Constructor { signature }
  }

  pub fn field(name: &'static str) -> Self {
    InjectionMember::Field { name, value: None }
  }

  /// Injects `value` into the field instead of resolving its contract.
  pub fn field_value<C: ?Sized + Send + Sync + 'static>(
    name: &'static str,
    value: Arc<C>,
  ) -> Self {
    InjectionMember::Field {
      name,
      value: Some(MemberValue::Value(Instance::new(value))),
    }
  }

  /// Injects the named registration of `C` into the field.
  pub fn field_contract<C: ?Sized + Send + Sync + 'static>(
    name: &'static str,
    contract_name: &str,
  ) -> Self {
    InjectionMember::Field {
      name,
      value: Some(MemberValue::Contract(Contract::of_named::<C>(contract_name))),
    }
  }

  pub fn method(name: &'static str) -> Self {
    InjectionMember::Method { name }
  }
}
