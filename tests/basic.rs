use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use weft_ioc::{lifetime, param, Blueprint, Container, Injectable, IocError};

// --- Test Fixtures ---

trait Logger: Send + Sync {
  fn tag(&self) -> &'static str;
}

struct ConsoleLogger;
impl Logger for ConsoleLogger {
  fn tag(&self) -> &'static str {
    "console"
  }
}

struct FileLogger;
impl Logger for FileLogger {
  fn tag(&self) -> &'static str {
    "file"
  }
}

struct Config {
  url: String,
}

#[derive(Debug)]
struct Database {
  url: String,
}

impl Injectable for Database {
  fn blueprint() -> Blueprint {
    Blueprint::of::<Self>()
      .constructor(vec![param::<Config>("config")], |args| {
        let config: Arc<Config> = args.next()?;
        Ok(Self {
          url: config.url.clone(),
        })
      })
      .build()
  }
}

// --- Tests ---

#[test]
fn test_register_and_resolve_concrete_type() {
  let container = Container::new();
  container
    .register_instance(
      None,
      Arc::new(Config {
        url: "postgres://localhost/app".to_string(),
      }),
    )
    .unwrap();
  container
    .register_type::<Database>(None, lifetime::container_controlled(), vec![])
    .unwrap();

  let db = container.resolve::<Database>(None).unwrap();
  assert_eq!(db.url, "postgres://localhost/app");

  // Container-controlled: the second resolve returns the cached instance.
  let again = container.resolve::<Database>(None).unwrap();
  assert!(Arc::ptr_eq(&db, &again));
}

#[test]
fn test_transient_factory_returns_fresh_instances() {
  struct Stamp {
    id: usize,
  }

  let container = Container::new();
  let counter = Arc::new(AtomicUsize::new(0));
  let counter_for_factory = counter.clone();
  container
    .register_factory::<Stamp, _>(None, lifetime::transient(), move |_| {
      Ok(Arc::new(Stamp {
        id: counter_for_factory.fetch_add(1, Ordering::SeqCst),
      }))
    })
    .unwrap();

  let first = container.resolve::<Stamp>(None).unwrap();
  let second = container.resolve::<Stamp>(None).unwrap();
  assert_eq!(first.id, 0);
  assert_eq!(second.id, 1);
  assert!(!Arc::ptr_eq(&first, &second));
  assert_eq!(counter.load(Ordering::SeqCst), 2);
}

#[test]
fn test_default_and_named_registrations_are_independent() {
  let container = Container::new();
  container
    .register_instance(
      None,
      Arc::new(Config {
        url: "default".to_string(),
      }),
    )
    .unwrap();
  container
    .register_instance(
      Some("replica"),
      Arc::new(Config {
        url: "replica".to_string(),
      }),
    )
    .unwrap();

  let default = container.resolve::<Config>(None).unwrap();
  let named = container.resolve::<Config>(Some("replica")).unwrap();

  assert_eq!(default.url, "default");
  assert_eq!(named.url, "replica");
  assert!(!Arc::ptr_eq(&default, &named));

  // Resolving one never returns the other's cached value.
  assert!(Arc::ptr_eq(&default, &container.resolve::<Config>(None).unwrap()));
  assert!(Arc::ptr_eq(
    &named,
    &container.resolve::<Config>(Some("replica")).unwrap()
  ));
}

#[test]
fn test_trait_contract_resolution() {
  struct Noop;
  impl Injectable for Noop {
    fn blueprint() -> Blueprint {
      Blueprint::of::<Self>().constructor(vec![], |_| Ok(Self)).build()
    }
  }
  impl Logger for Noop {
    fn tag(&self) -> &'static str {
      "noop"
    }
  }

  let container = Container::new();
  container
    .register_type_as::<dyn Logger, Noop, _>(None, lifetime::container_controlled(), vec![], |l| {
      l as Arc<dyn Logger>
    })
    .unwrap();

  let logger = container.resolve::<dyn Logger>(None).unwrap();
  assert_eq!(logger.tag(), "noop");
}

#[test]
fn test_factory_resolves_its_own_dependencies() {
  let container = Container::new();
  container
    .register_instance(
      None,
      Arc::new(Config {
        url: "postgres://primary".to_string(),
      }),
    )
    .unwrap();
  // The factory pulls Config through the resolver handle, which keeps the
  // resolution inside the same request (cycle detection sees through it).
  container
    .register_factory::<dyn Logger, _>(None, lifetime::transient(), |resolver| {
      let config = resolver.resolve::<Config>(None)?;
      Ok(if config.url.contains("primary") {
        Arc::new(ConsoleLogger) as Arc<dyn Logger>
      } else {
        Arc::new(FileLogger) as Arc<dyn Logger>
      })
    })
    .unwrap();

  let logger = container.resolve::<dyn Logger>(None).unwrap();
  assert_eq!(logger.tag(), "console");
}

#[test]
fn test_registered_instance_is_returned_as_is() {
  let container = Container::new();
  let original = Arc::new(Config {
    url: "shared".to_string(),
  });
  container.register_instance(None, original.clone()).unwrap();

  let resolved = container.resolve::<Config>(None).unwrap();
  assert!(Arc::ptr_eq(&original, &resolved));
}

#[test]
fn test_reregistration_replaces_and_releases_the_previous_value() {
  static DROP_COUNT: AtomicUsize = AtomicUsize::new(0);

  struct Disposable;
  impl Drop for Disposable {
    fn drop(&mut self) {
      DROP_COUNT.fetch_add(1, Ordering::SeqCst);
    }
  }

  let container = Container::new();
  container.register_instance(None, Arc::new(Disposable)).unwrap();

  // Resolve and drop the handle; the container still owns the instance.
  let held = container.resolve::<Disposable>(None).unwrap();
  drop(held);
  assert_eq!(DROP_COUNT.load(Ordering::SeqCst), 0);

  // Re-registering the same contract replaces the registration and releases
  // the previous lifetime manager's held value.
  container.register_instance(None, Arc::new(Disposable)).unwrap();
  assert_eq!(DROP_COUNT.load(Ordering::SeqCst), 1);

  // Exactly one entry remains for the contract.
  let entries = container
    .registrations()
    .into_iter()
    .filter(|info| info.contract.type_id() == std::any::TypeId::of::<Disposable>())
    .count();
  assert_eq!(entries, 1);
}

#[test]
fn test_is_registered_and_enumeration() {
  let container = Container::new();
  assert!(!container.is_registered::<Config>(None));

  container
    .register_instance(
      None,
      Arc::new(Config {
        url: "x".to_string(),
      }),
    )
    .unwrap();
  container
    .register_type::<Database>(Some("primary"), lifetime::transient(), vec![])
    .unwrap();

  assert!(container.is_registered::<Config>(None));
  assert!(container.is_registered::<Database>(Some("primary")));
  assert!(!container.is_registered::<Database>(None));

  let infos = container.registrations();
  assert_eq!(infos.len(), 2);
  let db_info = infos
    .iter()
    .find(|info| info.contract.name() == Some("primary"))
    .expect("named registration is enumerated");
  assert!(db_info.mapped_type.contains("Database"));
  assert_eq!(db_info.lifetime, "transient");
}

#[test]
fn test_resolving_an_unknown_contract_fails() {
  let container = Container::new();
  let error = container.resolve::<Database>(None).unwrap_err();
  match error {
    IocError::ResolutionFailed { contract, .. } => {
      assert!(contract.contains("Database"));
    }
    other => panic!("expected ResolutionFailed, got: {other}"),
  }
}

#[test]
fn test_concurrent_registration_and_resolution() {
  // Registering new contracts while other threads resolve existing ones
  // must not deadlock or lose writes.
  let container = Arc::new(Container::new());
  container
    .register_instance(
      Some("common"),
      Arc::new(Config {
        url: "common".to_string(),
      }),
    )
    .unwrap();

  std::thread::scope(|scope| {
    for i in 0..8 {
      let container = container.clone();
      scope.spawn(move || {
        let name = format!("thread_{i}");
        container
          .register_instance(
            Some(name.as_str()),
            Arc::new(Config {
              url: name.clone(),
            }),
          )
          .unwrap();

        for _ in 0..50 {
          let common = container.resolve::<Config>(Some("common")).unwrap();
          assert_eq!(common.url, "common");
        }

        let mine = container.resolve::<Config>(Some(name.as_str())).unwrap();
        assert_eq!(mine.url, name);
      });
    }
  });

  assert_eq!(
    container.resolve::<Config>(Some("thread_5")).unwrap().url,
    "thread_5"
  );
}
