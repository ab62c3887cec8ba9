use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use weft_ioc::{lifetime, param, Blueprint, Container, Injectable, IocError};

// --- Test Fixtures ---

struct Service {
  id: usize,
}

fn register_counting_factory(container: &Container, lifetime: Box<dyn weft_ioc::LifetimeManager>) -> Arc<AtomicUsize> {
  let counter = Arc::new(AtomicUsize::new(0));
  let counter_for_factory = counter.clone();
  container
    .register_factory::<Service, _>(None, lifetime, move |_| {
      Ok(Arc::new(Service {
        id: counter_for_factory.fetch_add(1, Ordering::SeqCst),
      }))
    })
    .unwrap();
  counter
}

// --- Tests ---

#[test]
fn test_singleton_factory_runs_exactly_once_under_concurrency() {
  // The critical double-checked-locking property: N threads race to resolve
  // the same container-controlled contract, the factory runs once, and every
  // thread observes the identical instance.
  let container = Arc::new(Container::new());
  let counter = Arc::new(AtomicUsize::new(0));
  let counter_for_factory = counter.clone();
  container
    .register_factory::<Service, _>(None, lifetime::container_controlled(), move |_| {
      counter_for_factory.fetch_add(1, Ordering::SeqCst);
      // Widen the race window so losers really do contend on the publish
      // lock rather than arriving after the fact.
      thread::sleep(Duration::from_millis(50));
      Ok(Arc::new(Service { id: 0 }))
    })
    .unwrap();

  let winner = thread::scope(|scope| {
    let handles: Vec<_> = (0..16)
      .map(|_| {
        let container = container.clone();
        scope.spawn(move || container.resolve::<Service>(None).unwrap())
      })
      .collect();
    let resolved: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
    let first = resolved[0].clone();
    for other in &resolved {
      assert!(Arc::ptr_eq(&first, other));
    }
    first
  });

  assert_eq!(counter.load(Ordering::SeqCst), 1);
  assert!(Arc::ptr_eq(&winner, &container.resolve::<Service>(None).unwrap()));
}

#[test]
fn test_hierarchical_isolation_between_parent_and_child() {
  let parent = Container::new();
  let counter = register_counting_factory(&parent, lifetime::hierarchical());
  let child = parent.child();

  let in_parent_a = parent.resolve::<Service>(None).unwrap();
  let in_parent_b = parent.resolve::<Service>(None).unwrap();
  let in_child_a = child.resolve::<Service>(None).unwrap();
  let in_child_b = child.resolve::<Service>(None).unwrap();

  // Stable within each scope, distinct across scopes.
  assert!(Arc::ptr_eq(&in_parent_a, &in_parent_b));
  assert!(Arc::ptr_eq(&in_child_a, &in_child_b));
  assert!(!Arc::ptr_eq(&in_parent_a, &in_child_a));
  assert_eq!(counter.load(Ordering::SeqCst), 2);

  // A second child caches its own instance again.
  let other_child = parent.child();
  let in_other = other_child.resolve::<Service>(None).unwrap();
  assert!(!Arc::ptr_eq(&in_child_a, &in_other));
  assert_eq!(counter.load(Ordering::SeqCst), 3);
}

#[test]
fn test_per_thread_instances_are_isolated() {
  let container = Arc::new(Container::new());
  let counter = register_counting_factory(&container, lifetime::per_thread());

  let here_a = container.resolve::<Service>(None).unwrap();
  let here_b = container.resolve::<Service>(None).unwrap();
  assert!(Arc::ptr_eq(&here_a, &here_b));

  let elsewhere_id = thread::scope(|scope| {
    let container = container.clone();
    scope
      .spawn(move || {
        let there_a = container.resolve::<Service>(None).unwrap();
        let there_b = container.resolve::<Service>(None).unwrap();
        assert!(Arc::ptr_eq(&there_a, &there_b));
        there_a.id
      })
      .join()
      .unwrap()
  });

  assert_ne!(here_a.id, elsewhere_id);
  assert_eq!(counter.load(Ordering::SeqCst), 2);
}

#[test]
fn test_per_resolve_shares_one_instance_within_a_graph() {
  // Diamond graph: Root -> (Left, Right) -> Shared. With a per-resolve
  // lifetime on Shared, one resolve call sees a single Shared instance, and
  // the next call builds a fresh one.
  struct Shared {
    id: usize,
  }
  struct Left {
    shared: Arc<Shared>,
  }
  struct Right {
    shared: Arc<Shared>,
  }
  struct Root {
    left: Arc<Left>,
    right: Arc<Right>,
  }

  impl Injectable for Left {
    fn blueprint() -> Blueprint {
      Blueprint::of::<Self>()
        .constructor(vec![param::<Shared>("shared")], |args| {
          Ok(Self {
            shared: args.next()?,
          })
        })
        .build()
    }
  }
  impl Injectable for Right {
    fn blueprint() -> Blueprint {
      Blueprint::of::<Self>()
        .constructor(vec![param::<Shared>("shared")], |args| {
          Ok(Self {
            shared: args.next()?,
          })
        })
        .build()
    }
  }
  impl Injectable for Root {
    fn blueprint() -> Blueprint {
      Blueprint::of::<Self>()
        .constructor(
          vec![param::<Left>("left"), param::<Right>("right")],
          |args| {
            Ok(Self {
              left: args.next()?,
              right: args.next()?,
            })
          },
        )
        .build()
    }
  }

  let container = Container::new();
  let counter = Arc::new(AtomicUsize::new(0));
  let counter_for_factory = counter.clone();
  container
    .register_factory::<Shared, _>(None, lifetime::per_resolve(), move |_| {
      Ok(Arc::new(Shared {
        id: counter_for_factory.fetch_add(1, Ordering::SeqCst),
      }))
    })
    .unwrap();
  container
    .register_type::<Left>(None, lifetime::transient(), vec![])
    .unwrap();
  container
    .register_type::<Right>(None, lifetime::transient(), vec![])
    .unwrap();
  container
    .register_type::<Root>(None, lifetime::transient(), vec![])
    .unwrap();

  let first = container.resolve::<Root>(None).unwrap();
  assert!(Arc::ptr_eq(&first.left.shared, &first.right.shared));
  assert_eq!(counter.load(Ordering::SeqCst), 1);

  // The scratch value does not persist across calls.
  let second = container.resolve::<Root>(None).unwrap();
  assert!(!Arc::ptr_eq(&first.left.shared, &second.left.shared));
  assert_eq!(counter.load(Ordering::SeqCst), 2);
  assert_ne!(first.left.shared.id, second.right.shared.id);
}

#[test]
fn test_externally_controlled_lifetime_holds_only_a_weak_reference() {
  #[derive(Debug)]
  struct Session {
    token: String,
  }

  let container = Container::new();
  let session = Arc::new(Session {
    token: "abc123".to_string(),
  });
  container
    .register_instance_with(None, session.clone(), lifetime::externally_controlled())
    .unwrap();

  // While external code holds the value, resolves return the same handle.
  let resolved = container.resolve::<Session>(None).unwrap();
  assert!(Arc::ptr_eq(&session, &resolved));
  assert_eq!(resolved.token, "abc123");

  // Once every external handle is gone, the container's weak reference is
  // dead and the contract can no longer be satisfied.
  drop(resolved);
  drop(session);
  let error = container.resolve::<Session>(None).unwrap_err();
  match error {
    IocError::ResolutionFailed { reason, .. } => {
      assert!(reason.contains("no longer alive"));
    }
    other => panic!("expected ResolutionFailed, got: {other}"),
  }
}

#[test]
fn test_dropping_the_container_releases_cached_singletons() {
  static DROP_COUNT: AtomicUsize = AtomicUsize::new(0);

  struct ConnectionPool;
  impl Drop for ConnectionPool {
    fn drop(&mut self) {
      DROP_COUNT.fetch_add(1, Ordering::SeqCst);
    }
  }

  let container = Container::new();
  container
    .register_factory::<ConnectionPool, _>(None, lifetime::container_controlled(), |_| {
      Ok(Arc::new(ConnectionPool))
    })
    .unwrap();

  let pool = container.resolve::<ConnectionPool>(None).unwrap();
  assert_eq!(DROP_COUNT.load(Ordering::SeqCst), 0);

  // The container still holds a strong reference.
  drop(pool);
  assert_eq!(DROP_COUNT.load(Ordering::SeqCst), 0);

  // Dropping the container releases the last reference.
  drop(container);
  assert_eq!(DROP_COUNT.load(Ordering::SeqCst), 1);
}

#[test]
fn test_singleton_lifetime_outlives_the_registering_child_scope() {
  struct Pinned;

  let root = Container::new();
  let child = root.child();
  child
    .register_factory::<Pinned, _>(None, lifetime::singleton(), |_| Ok(Arc::new(Pinned)))
    .unwrap();

  let resolved = child.resolve::<Pinned>(None).unwrap();
  let weak = Arc::downgrade(&resolved);
  drop(resolved);
  child.dispose();
  drop(child);

  // The root pinned the singleton, so it is still alive even though the
  // registering scope is gone.
  assert!(weak.upgrade().is_some());

  drop(root);
  assert!(weak.upgrade().is_none());
}

#[test]
fn test_disposed_container_rejects_operations() {
  let container = Container::new();
  container
    .register_instance(None, Arc::new(String::from("value")))
    .unwrap();

  container.dispose();

  assert!(matches!(
    container.resolve::<String>(None),
    Err(IocError::Disposed)
  ));
  assert!(matches!(
    container.register_instance(None, Arc::new(42_u32)),
    Err(IocError::Disposed)
  ));

  // Disposal is idempotent.
  container.dispose();
}

#[test]
fn test_dispose_releases_cached_instances() {
  static DROP_COUNT: AtomicUsize = AtomicUsize::new(0);

  struct Held;
  impl Drop for Held {
    fn drop(&mut self) {
      DROP_COUNT.fetch_add(1, Ordering::SeqCst);
    }
  }

  let container = Container::new();
  container.register_instance(None, Arc::new(Held)).unwrap();
  let handle = container.resolve::<Held>(None).unwrap();

  container.dispose();
  // The caller's handle is still the last owner.
  assert_eq!(DROP_COUNT.load(Ordering::SeqCst), 0);
  drop(handle);
  assert_eq!(DROP_COUNT.load(Ordering::SeqCst), 1);
}
