// src/pipeline/processors.rs

//! The standard processors, one per built-in stage.

use std::any::TypeId;

use super::context::{ResolveContext, Resolver, Target};
use super::{BuildPlan, Flow, Processor, Stage, StepPair};
use crate::contract::Contract;
use crate::error::{IocError, IocResult};
use crate::inject::{Blueprint, ConstructorSpec, InjectionMember, MemberValue, Param, ResolvedArgs};
use crate::lifetime::LifetimeEnv;
use crate::overrides::{DependencySite, SiteKind};

/// Checks the lifetime manager before building, publishes after.
pub(crate) struct LifetimeProcessor;

impl Processor for LifetimeProcessor {
  fn stage(&self) -> Stage {
    Stage::Lifetime
  }

  fn compile(&self, plan: &BuildPlan<'_>) -> IocResult<Option<StepPair>> {
    if plan.build_up {
      return Ok(None);
    }
    Ok(Some(
      StepPair::new(|ctx| {
        let cached = {
          let mut env = LifetimeEnv {
            resolving: ctx.container,
            owner: ctx.owner,
            request: &mut *ctx.request,
          };
          ctx.manager.get(&mut env)
        };
        if let Some(value) = cached {
          ctx.result = Some(value);
          ctx.from_cache = true;
          return Ok(Flow::Done);
        }
        Ok(Flow::Continue)
      })
      .with_post(|ctx| {
        // Publish only a value this invocation actually built; a fault
        // leaves the manager Unset so the next resolve retries.
        if ctx.fault.is_none() && !ctx.from_cache {
          if let Some(value) = ctx.result.clone() {
            let mut env = LifetimeEnv {
              resolving: ctx.container,
              owner: ctx.owner,
              request: &mut *ctx.request,
            };
            ctx.manager.set(value, &mut env);
          }
        }
      }),
    ))
  }
}

/// Runs the registration's construction strategy: selects and invokes a
/// constructor, calls the factory, or faults for a dead external instance.
pub(crate) struct CreationProcessor;

impl Processor for CreationProcessor {
  fn stage(&self) -> Stage {
    Stage::Creation
  }

  fn compile(&self, plan: &BuildPlan<'_>) -> IocResult<Option<StepPair>> {
    use crate::registration::Category;

    if plan.build_up {
      return Ok(None);
    }
    match plan.category {
      Category::Uninitialized => Err(IocError::invalid(
        plan.contract,
        "registration has no construction strategy",
      )),
      // Instance registrations live entirely in their lifetime manager;
      // reaching the creation stage means the value has gone away.
      Category::Instance => Ok(Some(StepPair::new(|ctx| {
        Err(IocError::failed(
          ctx.contract,
          "the registered instance is no longer alive",
          ctx.request.path(),
        ))
      }))),
      Category::Factory { produce } => {
        let produce = produce.clone();
        Ok(Some(StepPair::new(move |ctx| {
          let mut resolver = Resolver {
            container: ctx.container,
            request: &mut *ctx.request,
          };
          let value = produce(&mut resolver)?;
          ctx.result = Some(value);
          Ok(Flow::Continue)
        })))
      }
      Category::Type { blueprint, seal } => {
        let constructor = select_constructor(plan.contract, blueprint, plan.members)?;
        let params = constructor.params.clone();
        let produce = constructor.produce.clone();
        let declarer = blueprint.type_id;
        let seal = seal.clone();
        Ok(Some(
          StepPair::new(move |ctx| {
            let mut args = resolve_params(ctx, declarer, &params)?;
            let built = produce(&mut args)?;
            ctx.target = Target::Owned(built);
            Ok(Flow::Continue)
          })
          .with_post(move |ctx| {
            // Seal the finished target into a shareable instance. Runs
            // after the injection stages' pre-steps, before the lifetime
            // publish; skipped on fault.
            if ctx.fault.is_some() || ctx.result.is_some() {
              return;
            }
            if let Target::Owned(built) = std::mem::replace(&mut ctx.target, Target::None) {
              match seal(built) {
                Ok(instance) => ctx.result = Some(instance),
                Err(fault) => ctx.fault = Some(fault),
              }
            }
          }),
        ))
      }
    }
  }
}

/// Applies single-value member setters.
pub(crate) struct FieldsProcessor;

impl Processor for FieldsProcessor {
  fn stage(&self) -> Stage {
    Stage::Fields
  }

  fn compile(&self, plan: &BuildPlan<'_>) -> IocResult<Option<StepPair>> {
    let blueprint = match plan.blueprint {
      Some(blueprint) => blueprint.clone(),
      None => return Ok(None),
    };
    let selected = select_fields(plan.contract, &blueprint, plan.members)?;
    if selected.is_empty() {
      return Ok(None);
    }
    Ok(Some(StepPair::new(move |ctx| {
      if matches!(ctx.target, Target::None) {
        return Ok(Flow::Continue);
      }
      for (index, configured) in &selected {
        let field = &blueprint.fields[*index];
        let site = DependencySite {
          kind: SiteKind::Field,
          member: field.name,
          declarer: blueprint.type_id,
          contract: &field.param.contract,
        };
        let value = ctx.resolve_site(&site, configured.as_ref(), field.param.optional)?;
        let target = match ctx.target_any_mut() {
          Some(target) => target,
          None => return Ok(Flow::Continue),
        };
        (field.apply)(target, value)?;
      }
      Ok(Flow::Continue)
    })))
  }
}

/// Invokes multi-parameter injection methods.
pub(crate) struct MethodsProcessor;

impl Processor for MethodsProcessor {
  fn stage(&self) -> Stage {
    Stage::Methods
  }

  fn compile(&self, plan: &BuildPlan<'_>) -> IocResult<Option<StepPair>> {
    let blueprint = match plan.blueprint {
      Some(blueprint) => blueprint.clone(),
      None => return Ok(None),
    };
    let selected = select_methods(plan.contract, &blueprint, plan.members)?;
    if selected.is_empty() {
      return Ok(None);
    }
    Ok(Some(StepPair::new(move |ctx| {
      if matches!(ctx.target, Target::None) {
        return Ok(Flow::Continue);
      }
      for index in &selected {
        let method = &blueprint.methods[*index];
        let mut args = resolve_params(ctx, blueprint.type_id, &method.params)?;
        let target = match ctx.target_any_mut() {
          Some(target) => target,
          None => return Ok(Flow::Continue),
        };
        (method.invoke)(target, &mut args)?;
      }
      Ok(Flow::Continue)
    })))
  }
}

/// Deterministic constructor selection, §-order: explicit configuration,
/// single declared, designated, then the most-parameters heuristic with an
/// ambiguity fault on ties.
fn select_constructor<'b>(
  contract: &Contract,
  blueprint: &'b Blueprint,
  members: &[InjectionMember],
) -> IocResult<&'b ConstructorSpec> {
  let mut signatures = members.iter().filter_map(|member| match member {
    InjectionMember::Constructor { signature } => Some(signature),
    _ => None,
  });
  let explicit = signatures.next();
  if signatures.next().is_some() {
    return Err(IocError::invalid(
      contract,
      "more than one constructor configuration on a single registration",
    ));
  }

  if let Some(signature) = explicit {
    return blueprint
      .constructors
      .iter()
      .find(|candidate| {
        candidate.params.len() == signature.len()
          && candidate
            .params
            .iter()
            .zip(signature.iter())
            .all(|(param, wanted)| param.contract.type_id() == wanted.type_id())
      })
      .ok_or_else(|| {
        IocError::invalid(
          contract,
          format!(
            "the configured constructor does not match any constructor declared on `{}`",
            blueprint.type_name
          ),
        )
      });
  }

  match blueprint.constructors.len() {
    0 => Err(IocError::invalid(
      contract,
      format!("`{}` declares no constructors", blueprint.type_name),
    )),
    1 => Ok(&blueprint.constructors[0]),
    _ => {
      if let Some(designated) = blueprint.constructors.iter().find(|c| c.designated) {
        return Ok(designated);
      }
      let most = blueprint
        .constructors
        .iter()
        .map(|c| c.params.len())
        .max()
        .expect("at least two constructors");
      let mut top = blueprint.constructors.iter().filter(|c| c.params.len() == most);
      let winner = top.next().expect("max came from this iterator");
      if top.next().is_some() {
        return Err(IocError::invalid(
          contract,
          format!(
            "ambiguous constructor selection on `{}`: more than one constructor takes {} parameters",
            blueprint.type_name, most
          ),
        ));
      }
      Ok(winner)
    }
  }
}

/// Union of explicitly claimed fields and annotated fields, with unknown
/// names and duplicate claims rejected. Returns blueprint indices paired
/// with any configured member value.
fn select_fields(
  contract: &Contract,
  blueprint: &Blueprint,
  members: &[InjectionMember],
) -> IocResult<Vec<(usize, Option<MemberValue>)>> {
  let mut selected: Vec<(usize, Option<MemberValue>)> = Vec::new();
  let mut claimed: Vec<&'static str> = Vec::new();

  for member in members {
    if let InjectionMember::Field { name, value } = member {
      if claimed.contains(name) {
        return Err(IocError::invalid(
          contract,
          format!("field `{name}` is claimed by more than one injection member"),
        ));
      }
      let index = blueprint
        .fields
        .iter()
        .position(|field| field.name == *name)
        .ok_or_else(|| {
          IocError::invalid(
            contract,
            format!(
              "injected field `{}` is not declared on `{}`",
              name, blueprint.type_name
            ),
          )
        })?;
      claimed.push(name);
      selected.push((index, value.clone()));
    }
  }

  for (index, field) in blueprint.fields.iter().enumerate() {
    if field.annotated && !claimed.contains(&field.name) {
      selected.push((index, None));
    }
  }

  Ok(selected)
}

/// Union of explicitly claimed methods and annotated methods; same
/// rejection rules as fields.
fn select_methods(
  contract: &Contract,
  blueprint: &Blueprint,
  members: &[InjectionMember],
) -> IocResult<Vec<usize>> {
  let mut selected: Vec<usize> = Vec::new();
  let mut claimed: Vec<&'static str> = Vec::new();

  for member in members {
    if let InjectionMember::Method { name } = member {
      if claimed.contains(name) {
        return Err(IocError::invalid(
          contract,
          format!("method `{name}` is claimed by more than one injection member"),
        ));
      }
      let index = blueprint
        .methods
        .iter()
        .position(|method| method.name == *name)
        .ok_or_else(|| {
          IocError::invalid(
            contract,
            format!(
              "injected method `{}` is not declared on `{}`",
              name, blueprint.type_name
            ),
          )
        })?;
      claimed.push(name);
      selected.push(index);
    }
  }

  for (index, method) in blueprint.methods.iter().enumerate() {
    if method.annotated && !claimed.contains(&method.name) {
      selected.push(index);
    }
  }

  Ok(selected)
}

/// Resolves a parameter list into an argument cursor for a constructor or
/// method closure.
fn resolve_params(
  ctx: &mut ResolveContext<'_, '_>,
  declarer: TypeId,
  params: &[Param],
) -> IocResult<ResolvedArgs> {
  let mut values = Vec::with_capacity(params.len());
  let mut names = Vec::with_capacity(params.len());
  for param in params {
    let site = DependencySite {
      kind: SiteKind::Parameter,
      member: param.name,
      declarer,
      contract: &param.contract,
    };
    let value = ctx.resolve_site(&site, None, param.optional)?;
    values.push(value);
    names.push(param.name);
  }
  Ok(ResolvedArgs::new(values, names))
}
