// Gated behind the `async` feature via [[test]] required-features.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use weft_ioc::{lifetime, Container, IocError};

struct Clock {
  ticks: usize,
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_resolve_async_offloads_the_synchronous_algorithm() {
  let container = Container::new();
  let builds = Arc::new(AtomicUsize::new(0));
  let builds_for_factory = builds.clone();
  container
    .register_factory::<Clock, _>(None, lifetime::container_controlled(), move |_| {
      Ok(Arc::new(Clock {
        ticks: builds_for_factory.fetch_add(1, Ordering::SeqCst),
      }))
    })
    .unwrap();

  let clock = container.resolve_async::<Clock>(None).await.unwrap();
  assert_eq!(clock.ticks, 0);

  // Same locking and cache invariants as the synchronous path: concurrent
  // async resolutions still build the singleton exactly once.
  let mut handles = Vec::new();
  for _ in 0..8 {
    let container = container.clone();
    handles.push(tokio::spawn(async move {
      container.resolve_async::<Clock>(None).await.unwrap()
    }));
  }
  for handle in handles {
    let resolved = handle.await.unwrap();
    assert!(Arc::ptr_eq(&clock, &resolved));
  }
  assert_eq!(builds.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_resolve_async_surfaces_resolution_errors() {
  #[derive(Debug)]
  struct Missing;

  let container = Container::new();
  let error = container.resolve_async::<Missing>(None).await.unwrap_err();
  assert!(matches!(error, IocError::ResolutionFailed { .. }));
}
