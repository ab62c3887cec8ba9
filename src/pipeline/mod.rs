// src/pipeline/mod.rs

//! The staged build pipeline.
//!
//! A pipeline is an ordered array of step closures, composed once per
//! contract and cached on the registration. Processors are registered at a
//! fixed stage ordering and each contributes a `pre`/`post` pair at
//! compile time, onion-style: pre-steps run in stage order, post-steps
//! unwind in reverse. A fault aborts the remaining pre-steps but entered
//! post-steps still run their cleanup; a lifetime cache hit short-circuits
//! the same way without fault.

pub mod context;
mod processors;

use std::sync::Arc;

use crate::contract::Contract;
use crate::error::{IocError, IocResult};
use crate::inject::{Blueprint, InjectionMember};
use crate::instance::Instance;
use crate::registration::Category;
use context::ResolveContext;
use processors::{CreationProcessor, FieldsProcessor, LifetimeProcessor, MethodsProcessor};

/// The fixed stage slots, in execution order.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Stage {
  /// Cache check before building, publish after.
  Lifetime,
  /// Constructor selection / factory invocation.
  Creation,
  /// Single-value member setters.
  Fields,
  /// Multi-parameter injection methods.
  Methods,
}

impl Stage {
  pub(crate) const ORDER: [Stage; 4] = [Stage::Lifetime, Stage::Creation, Stage::Fields, Stage::Methods];

  fn index(self) -> usize {
    match self {
      Stage::Lifetime => 0,
      Stage::Creation => 1,
      Stage::Fields => 2,
      Stage::Methods => 3,
    }
  }
}

/// Outcome of a pre-step.
pub enum Flow {
  /// Proceed to the next step.
  Continue,
  /// Short-circuit: skip the remaining pre-steps (the value is already in
  /// hand), then unwind.
  Done,
}

type PreStep = Box<dyn Fn(&mut ResolveContext<'_, '_>) -> Result<Flow, IocError> + Send + Sync>;
type PostStep = Box<dyn Fn(&mut ResolveContext<'_, '_>) + Send + Sync>;

/// One processor's contribution to a compiled pipeline.
pub struct StepPair {
  pre: PreStep,
  post: Option<PostStep>,
}

impl StepPair {
  pub fn new(
    pre: impl Fn(&mut ResolveContext<'_, '_>) -> Result<Flow, IocError> + Send + Sync + 'static,
  ) -> Self {
    Self {
      pre: Box::new(pre),
      post: None,
    }
  }

  pub fn with_post(
    mut self,
    post: impl Fn(&mut ResolveContext<'_, '_>) + Send + Sync + 'static,
  ) -> Self {
    self.post = Some(Box::new(post));
    self
  }
}

/// Everything a processor may inspect when contributing its step.
pub struct BuildPlan<'a> {
  pub(crate) contract: &'a Contract,
  pub(crate) category: &'a Category,
  pub(crate) members: &'a [InjectionMember],
  pub(crate) blueprint: Option<&'a Arc<Blueprint>>,
  pub(crate) build_up: bool,
}

impl<'a> BuildPlan<'a> {
  pub fn contract(&self) -> &Contract {
    self.contract
  }

  /// True when compiling the injection-only pipeline for `build_up`.
  pub fn is_build_up(&self) -> bool {
    self.build_up
  }
}

/// One step-contributor in the staged chain.
///
/// A processor is consulted once per contract when its pipeline is
/// composed; returning `None` opts out of that contract entirely.
/// Registration problems (a configured member that does not exist, an
/// ambiguous constructor) surface here, at compile time, as invalid
/// registrations.
pub trait Processor: Send + Sync {
  fn stage(&self) -> Stage;
  fn compile(&self, plan: &BuildPlan<'_>) -> IocResult<Option<StepPair>>;
}

/// The ordered processor chain, stored as a root-container policy.
/// Replacing it (e.g. inserting a diagnostic processor) bumps the chain
/// version and cached pipelines lazily rebuild.
#[derive(Clone)]
pub struct StagedChain {
  slots: [Vec<Arc<dyn Processor>>; 4],
}

impl StagedChain {
  /// The default chain: lifetime, creation, fields, methods.
  pub fn standard() -> Self {
    let mut chain = Self {
      slots: [Vec::new(), Vec::new(), Vec::new(), Vec::new()],
    };
    chain.insert(Arc::new(LifetimeProcessor));
    chain.insert(Arc::new(CreationProcessor));
    chain.insert(Arc::new(FieldsProcessor));
    chain.insert(Arc::new(MethodsProcessor));
    chain
  }

  /// Appends `processor` to its stage's slot.
  pub fn insert(&mut self, processor: Arc<dyn Processor>) {
    self.slots[processor.stage().index()].push(processor);
  }

  fn at(&self, stage: Stage) -> &[Arc<dyn Processor>] {
    &self.slots[stage.index()]
  }
}

/// A compiled, immutable pipeline for one contract.
pub(crate) struct Pipeline {
  steps: Box<[StepPair]>,
}

impl Pipeline {
  /// Runs the onion: pre-steps in order, post-steps in reverse for every
  /// entered step, then surfaces the fault or the produced value.
  pub(crate) fn run(&self, ctx: &mut ResolveContext<'_, '_>) -> IocResult<Option<Instance>> {
    let mut entered = 0;
    for step in self.steps.iter() {
      entered += 1;
      match (step.pre)(ctx) {
        Ok(Flow::Continue) => {}
        Ok(Flow::Done) => break,
        Err(fault) => {
          ctx.fault = Some(fault);
          break;
        }
      }
    }

    for step in self.steps[..entered].iter().rev() {
      if let Some(post) = &step.post {
        post(ctx);
      }
    }

    if let Some(fault) = ctx.fault.take() {
      return Err(fault);
    }
    Ok(ctx.result.take())
  }
}

/// Composes the chain's contributions for `plan` into one pipeline.
pub(crate) fn build_pipeline(chain: &StagedChain, plan: &BuildPlan<'_>) -> IocResult<Pipeline> {
  let mut steps = Vec::new();
  for stage in Stage::ORDER {
    for processor in chain.at(stage) {
      if let Some(step) = processor.compile(plan)? {
        steps.push(step);
      }
    }
  }
  Ok(Pipeline {
    steps: steps.into_boxed_slice(),
  })
}
