// src/inject/blueprint.rs

//! Blueprints: a type's declared constructors and injectable members.

use std::any::{Any, TypeId};
use std::marker::PhantomData;
use std::sync::Arc;

use super::{param, Param, ResolvedArgs};
use crate::error::{IocError, IocResult};
use crate::instance::Instance;

pub(crate) type Produce =
  Arc<dyn Fn(&mut ResolvedArgs) -> IocResult<Box<dyn Any + Send + Sync>> + Send + Sync>;
pub(crate) type Seal = Arc<dyn Fn(Box<dyn Any + Send + Sync>) -> IocResult<Instance> + Send + Sync>;
type ApplyField = Arc<dyn Fn(&mut dyn Any, Option<Instance>) -> IocResult<()> + Send + Sync>;
type InvokeMethod = Arc<dyn Fn(&mut dyn Any, &mut ResolvedArgs) -> IocResult<()> + Send + Sync>;

/// A type that can be built and injected by the container.
///
/// The blueprint is the construction recipe: every declared constructor, the
/// fields that can receive dependencies, and the injection methods. The
/// container's pipeline selects among them; the closures only move values.
///
/// ```
/// use std::sync::Arc;
/// use weft_ioc::{param, Blueprint, Injectable};
///
/// struct Database;
///
/// struct UserService {
///   db: Arc<Database>,
/// }
///
/// impl Injectable for UserService {
///   fn blueprint() -> Blueprint {
///     Blueprint::of::<Self>()
///       .constructor(vec![param::<Database>("db")], |args| {
///         Ok(Self { db: args.next()? })
///       })
///       .build()
///   }
/// }
/// ```
pub trait Injectable: Sized + Send + Sync + 'static {
  fn blueprint() -> Blueprint;
}

pub(crate) struct ConstructorSpec {
  pub(crate) params: Vec<Param>,
  pub(crate) designated: bool,
  pub(crate) produce: Produce,
}

pub(crate) struct FieldSpec {
  pub(crate) name: &'static str,
  pub(crate) param: Param,
  pub(crate) annotated: bool,
  pub(crate) apply: ApplyField,
}

pub(crate) struct MethodSpec {
  pub(crate) name: &'static str,
  pub(crate) params: Vec<Param>,
  pub(crate) annotated: bool,
  pub(crate) invoke: InvokeMethod,
}

/// Construction metadata for one type. Created through [`Blueprint::of`].
pub struct Blueprint {
  pub(crate) type_id: TypeId,
  pub(crate) type_name: &'static str,
  pub(crate) seal: Seal,
  pub(crate) constructors: Vec<ConstructorSpec>,
  pub(crate) fields: Vec<FieldSpec>,
  pub(crate) methods: Vec<MethodSpec>,
}

impl Blueprint {
  /// Starts a blueprint for `T`.
  pub fn of<T: Send + Sync + 'static>() -> BlueprintBuilder<T> {
    let seal: Seal = Arc::new(|built| {
      let value = built
        .downcast::<T>()
        .map_err(|_| internal_target_error::<T>("seal"))?;
      Ok(Instance::new::<T>(Arc::from(value)))
    });
    BlueprintBuilder {
      blueprint: Blueprint {
        type_id: TypeId::of::<T>(),
        type_name: std::any::type_name::<T>(),
        seal,
        constructors: Vec::new(),
        fields: Vec::new(),
        methods: Vec::new(),
      },
      _type: PhantomData,
    }
  }

  pub fn type_id(&self) -> TypeId {
    self.type_id
  }

  pub fn type_name(&self) -> &'static str {
    self.type_name
  }
}

fn internal_target_error<T>(stage: &str) -> IocError {
  IocError::InvalidRegistration {
    contract: String::from(std::any::type_name::<T>()),
    reason: format!("build target is not of the blueprint's type (at {stage})"),
  }
}

/// Typed builder for a [`Blueprint`].
pub struct BlueprintBuilder<T> {
  blueprint: Blueprint,
  _type: PhantomData<fn() -> T>,
}

impl<T: Send + Sync + 'static> BlueprintBuilder<T> {
  fn push_constructor<F>(mut self, params: Vec<Param>, designated: bool, produce: F) -> Self
  where
    F: Fn(&mut ResolvedArgs) -> IocResult<T> + Send + Sync + 'static,
  {
    let produce: Produce =
      Arc::new(move |args| produce(args).map(|value| Box::new(value) as Box<dyn Any + Send + Sync>));
    self.blueprint.constructors.push(ConstructorSpec {
      params,
      designated,
      produce,
    });
    self
  }

  /// Declares a constructor. The closure pulls its arguments from `args` in
  /// the same order as `params`.
  pub fn constructor<F>(self, params: Vec<Param>, produce: F) -> Self
  where
    F: Fn(&mut ResolvedArgs) -> IocResult<T> + Send + Sync + 'static,
  {
    self.push_constructor(params, false, produce)
  }

  /// Declares the designated injection constructor, preferred over the
  /// parameter-count heuristic when several constructors exist.
  pub fn inject_constructor<F>(self, params: Vec<Param>, produce: F) -> Self
  where
    F: Fn(&mut ResolvedArgs) -> IocResult<T> + Send + Sync + 'static,
  {
    self.push_constructor(params, true, produce)
  }

  fn push_field<C, F>(mut self, spec_param: Param, annotated: bool, set: F) -> Self
  where
    C: ?Sized + Send + Sync + 'static,
    F: Fn(&mut T, Arc<C>) + Send + Sync + 'static,
  {
    let name = spec_param.name;
    let apply: ApplyField = Arc::new(move |target, value| {
      let target = target
        .downcast_mut::<T>()
        .ok_or_else(|| internal_target_error::<T>("field injection"))?;
      let value = value.ok_or_else(|| IocError::InvalidRegistration {
        contract: String::from(name),
        reason: String::from("required field received no value"),
      })?;
      let value = value.downcast::<C>().ok_or_else(|| IocError::InvalidRegistration {
        contract: String::from(name),
        reason: format!(
          "field value type mismatch: setter expects `{}`",
          std::any::type_name::<C>()
        ),
      })?;
      set(target, value);
      Ok(())
    });
    self.blueprint.fields.push(FieldSpec {
      name,
      param: spec_param,
      annotated,
      apply,
    });
    self
  }

  /// Declares a field that *can* be injected when a registration claims it
  /// with an explicit injection member.
  pub fn field<C, F>(self, name: &'static str, set: F) -> Self
  where
    C: ?Sized + Send + Sync + 'static,
    F: Fn(&mut T, Arc<C>) + Send + Sync + 'static,
  {
    self.push_field(param::<C>(name), false, set)
  }

  /// Declares a field injected on every build of this type.
  pub fn inject_field<C, F>(self, name: &'static str, set: F) -> Self
  where
    C: ?Sized + Send + Sync + 'static,
    F: Fn(&mut T, Arc<C>) + Send + Sync + 'static,
  {
    self.push_field(param::<C>(name), true, set)
  }

  /// Declares an always-injected optional field: the setter receives `None`
  /// when the dependency's contract cannot be resolved.
  pub fn inject_field_opt<C, F>(mut self, name: &'static str, set: F) -> Self
  where
    C: ?Sized + Send + Sync + 'static,
    F: Fn(&mut T, Option<Arc<C>>) + Send + Sync + 'static,
  {
    let spec_param = param::<C>(name).optional();
    let apply: ApplyField = Arc::new(move |target, value| {
      let target = target
        .downcast_mut::<T>()
        .ok_or_else(|| internal_target_error::<T>("field injection"))?;
      let value = match value {
        None => None,
        Some(instance) => Some(instance.downcast::<C>().ok_or_else(|| {
          IocError::InvalidRegistration {
            contract: String::from(name),
            reason: format!(
              "field value type mismatch: setter expects `{}`",
              std::any::type_name::<C>()
            ),
          }
        })?),
      };
      set(target, value);
      Ok(())
    });
    self.blueprint.fields.push(FieldSpec {
      name,
      param: spec_param,
      annotated: true,
      apply,
    });
    self
  }

  fn push_method<F>(mut self, name: &'static str, params: Vec<Param>, annotated: bool, invoke: F) -> Self
  where
    F: Fn(&mut T, &mut ResolvedArgs) -> IocResult<()> + Send + Sync + 'static,
  {
    let invoke: InvokeMethod = Arc::new(move |target, args| {
      let target = target
        .downcast_mut::<T>()
        .ok_or_else(|| internal_target_error::<T>("method injection"))?;
      invoke(target, args)
    });
    self.blueprint.methods.push(MethodSpec {
      name,
      params,
      annotated,
      invoke,
    });
    self
  }

  /// Declares a method invocable when a registration claims it with an
  /// explicit injection member.
  pub fn method<F>(self, name: &'static str, params: Vec<Param>, invoke: F) -> Self
  where
    F: Fn(&mut T, &mut ResolvedArgs) -> IocResult<()> + Send + Sync + 'static,
  {
    self.push_method(name, params, false, invoke)
  }

  /// Declares a method invoked on every build of this type.
  pub fn inject_method<F>(self, name: &'static str, params: Vec<Param>, invoke: F) -> Self
  where
    F: Fn(&mut T, &mut ResolvedArgs) -> IocResult<()> + Send + Sync + 'static,
  {
    self.push_method(name, params, true, invoke)
  }

  pub fn build(self) -> Blueprint {
    self.blueprint
  }
}
