// src/instance.rs

//! Type-erased handles to built values.
//!
//! The container stores every produced value as an [`Instance`]: an
//! `Arc<T>` (or `Arc<dyn Trait>`) erased behind `Arc<dyn Any + Send + Sync>`
//! so lifetime managers can cache and clone it without knowing `T`. The
//! typed `Arc` comes back out with [`Instance::downcast`].
//!
//! Every instance also carries a weak probe captured where `T` was still
//! statically known. [`WeakInstance`] uses it to observe liveness of the
//! *inner* `Arc<T>`, the handle callers actually hold, which is what the
//! externally-controlled lifetime needs: a true weak reference, not a strong
//! one in disguise.

use std::any::Any;
use std::fmt;
use std::sync::{Arc, Weak};

type Payload = Arc<dyn Any + Send + Sync>;
type Probe = Arc<dyn Fn() -> Option<Payload> + Send + Sync>;

/// A shared, type-erased handle to a resolved value.
#[derive(Clone)]
pub struct Instance {
  payload: Payload,
  probe: Probe,
}

impl Instance {
  /// Erases `value` into an instance handle.
  pub fn new<T: ?Sized + Send + Sync + 'static>(value: Arc<T>) -> Self {
    let weak: Weak<T> = Arc::downgrade(&value);
    let probe: Probe = Arc::new(move || {
      weak
        .upgrade()
        .map(|value| Arc::new(value) as Payload)
    });
    Self {
      payload: Arc::new(value),
      probe,
    }
  }

  /// Recovers the typed handle, or `None` when `T` is not the payload type.
  pub fn downcast<T: ?Sized + Send + Sync + 'static>(&self) -> Option<Arc<T>> {
    self.payload.downcast_ref::<Arc<T>>().cloned()
  }

  /// A weak handle observing the inner `Arc<T>`'s liveness.
  pub fn downgrade(&self) -> WeakInstance {
    WeakInstance {
      probe: self.probe.clone(),
    }
  }
}

impl fmt::Debug for Instance {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str("Instance(..)")
  }
}

/// Weak counterpart of [`Instance`]; upgrades succeed while any strong
/// handle to the value is alive anywhere in the program.
#[derive(Clone)]
pub struct WeakInstance {
  probe: Probe,
}

impl WeakInstance {
  pub fn upgrade(&self) -> Option<Instance> {
    (self.probe)().map(|payload| Instance {
      payload,
      probe: self.probe.clone(),
    })
  }
}

impl fmt::Debug for WeakInstance {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str("WeakInstance(..)")
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn downcast_recovers_the_same_allocation() {
    let value = Arc::new(String::from("shared"));
    let instance = Instance::new(value.clone());
    let back = instance.downcast::<String>().unwrap();
    assert!(Arc::ptr_eq(&value, &back));
    assert!(instance.downcast::<u32>().is_none());
  }

  #[test]
  fn weak_probe_tracks_the_inner_value() {
    let instance = Instance::new(Arc::new(7_u32));
    let weak = instance.downgrade();

    // The erased handle itself keeps the value alive.
    assert!(weak.upgrade().is_some());

    // Once the caller-visible Arc is gone the probe observes death, even if
    // a stale erased wrapper were still around somewhere.
    drop(instance);
    assert!(weak.upgrade().is_none());
  }

  #[test]
  fn weak_probe_survives_while_caller_holds_the_value() {
    let instance = Instance::new(Arc::new(String::from("held")));
    let caller_handle = instance.downcast::<String>().unwrap();
    let weak = instance.downgrade();
    drop(instance);

    // The container dropped its handle, but the caller still holds one.
    let revived = weak.upgrade().expect("value is externally alive");
    assert!(Arc::ptr_eq(
      &caller_handle,
      &revived.downcast::<String>().unwrap()
    ));
  }
}
