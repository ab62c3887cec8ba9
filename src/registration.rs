// src/registration.rs

//! Registration records: what the registry stores under each contract.

use std::sync::atomic::{AtomicU64, AtomicU8, Ordering};
use std::sync::Arc;

use parking_lot::RwLock;

use crate::error::IocResult;
use crate::inject::{Blueprint, InjectionMember, Seal};
use crate::instance::Instance;
use crate::lifetime::LifetimeManager;
use crate::pipeline::context::Resolver;
use crate::pipeline::Pipeline;

pub(crate) type FactoryFn =
  Arc<dyn Fn(&mut Resolver<'_, '_>) -> IocResult<Instance> + Send + Sync>;

/// The construction strategy bound to a contract.
pub(crate) enum Category {
  /// Registered but not yet configured; compiling its pipeline faults.
  Uninitialized,
  /// Built from a blueprint; `seal` erases the finished value under the
  /// registered contract type.
  Type {
    blueprint: Arc<Blueprint>,
    seal: Seal,
  },
  /// Built by a user factory.
  Factory { produce: FactoryFn },
  /// A pre-built value held by the lifetime manager.
  Instance,
}

static NEXT_REGISTRATION_ID: AtomicU64 = AtomicU64::new(1);

/// One contract's stored configuration: construction category, lifetime
/// manager, explicit injection members, and the cached pipelines. Owned
/// exclusively by the scope entry holding it and replaced wholesale on
/// re-registration.
pub(crate) struct Registration {
  pub(crate) id: u64,
  pub(crate) category: Category,
  pub(crate) lifetime: Arc<dyn LifetimeManager>,
  pub(crate) members: Vec<InjectionMember>,
  pub(crate) mapped_type: &'static str,
  pub(crate) resolve_slot: PipelineSlot,
  pub(crate) build_up_slot: PipelineSlot,
}

impl Registration {
  pub(crate) fn new(
    category: Category,
    lifetime: Box<dyn LifetimeManager>,
    members: Vec<InjectionMember>,
    mapped_type: &'static str,
  ) -> Self {
    Self {
      id: NEXT_REGISTRATION_ID.fetch_add(1, Ordering::Relaxed),
      category,
      lifetime: Arc::from(lifetime),
      members,
      mapped_type,
      resolve_slot: PipelineSlot::new(),
      build_up_slot: PipelineSlot::new(),
    }
  }
}

const SLOT_EMPTY: u8 = 0;
const SLOT_BUILDING: u8 = 1;
const SLOT_READY: u8 = 2;

/// At-most-once pipeline publication per contract.
///
/// The first resolver to claim the slot compiles the pipeline and publishes
/// it; concurrent losers spin until publication and then run the published
/// pipeline. Publication windows are microseconds (pipeline composition,
/// not construction), so the losers burn a handful of spins rather than
/// parking. A failed compile releases the claim, leaving the slot empty for
/// the next resolve to retry.
///
/// The slot remembers the processor-chain version it was built against;
/// a stale version is treated as empty, which is how chain edits invalidate
/// published pipelines without walking every registration.
pub(crate) struct PipelineSlot {
  state: AtomicU8,
  version: AtomicU64,
  cell: RwLock<Option<Arc<Pipeline>>>,
}

impl PipelineSlot {
  pub(crate) fn new() -> Self {
    Self {
      state: AtomicU8::new(SLOT_EMPTY),
      version: AtomicU64::new(0),
      cell: RwLock::new(None),
    }
  }

  pub(crate) fn get_or_build(
    &self,
    version: u64,
    build: impl FnOnce() -> IocResult<Pipeline>,
  ) -> IocResult<Arc<Pipeline>> {
    let mut build = Some(build);
    loop {
      match self.state.load(Ordering::Acquire) {
        SLOT_READY => {
          if self.version.load(Ordering::Acquire) == version {
            if let Some(pipeline) = self.cell.read().clone() {
              return Ok(pipeline);
            }
            std::hint::spin_loop();
          } else if self
            .state
            .compare_exchange(SLOT_READY, SLOT_BUILDING, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
          {
            let build = build.take().expect("claim succeeds at most once");
            return self.build_and_publish(version, build);
          }
        }
        SLOT_EMPTY => {
          if self
            .state
            .compare_exchange(SLOT_EMPTY, SLOT_BUILDING, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
          {
            let build = build.take().expect("claim succeeds at most once");
            return self.build_and_publish(version, build);
          }
        }
        _ => std::hint::spin_loop(),
      }
    }
  }

  fn build_and_publish(
    &self,
    version: u64,
    build: impl FnOnce() -> IocResult<Pipeline>,
  ) -> IocResult<Arc<Pipeline>> {
    match build() {
      Ok(pipeline) => {
        let pipeline = Arc::new(pipeline);
        *self.cell.write() = Some(pipeline.clone());
        self.version.store(version, Ordering::Release);
        self.state.store(SLOT_READY, Ordering::Release);
        Ok(pipeline)
      }
      Err(error) => {
        self.state.store(SLOT_EMPTY, Ordering::Release);
        Err(error)
      }
    }
  }
}
