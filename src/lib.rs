//! # Weft IoC
//!
//! A hierarchical, pipeline-driven dependency injection container for Rust.
//!
//! Weft maps **contracts** (a type plus an optional name) to construction
//! strategies, caches what they produce under pluggable **lifetimes**, and
//! builds object graphs through a staged **pipeline** of constructor and
//! member injection. Scopes form a tree: a child container falls back to its
//! ancestors for lookups while keeping its own registrations and caches.
//!
//! ## Core Concepts
//!
//! - **Container**: a scope in the tree; the registration and resolution API.
//! - **Contract**: the `(type, name)` key everything is registered under.
//! - **Blueprint**: a type's construction recipe (its constructors and
//!   injectable members), supplied by implementing [`Injectable`].
//! - **Lifetime manager**: where an instance is cached and who shares it
//!   (transient, container-controlled, singleton, hierarchical, per-resolve,
//!   per-thread, externally-controlled).
//! - **Override**: a caller-supplied value that takes precedence over normal
//!   dependency resolution for one call.
//!
//! ## Quick Start
//!
//! ```
//! use std::sync::Arc;
//! use weft_ioc::{lifetime, param, Blueprint, Container, Injectable};
//!
//! trait Greeter: Send + Sync {
//!   fn greet(&self) -> String;
//! }
//!
//! struct Message(String);
//!
//! struct EnglishGreeter {
//!   message: Arc<Message>,
//! }
//!
//! impl Greeter for EnglishGreeter {
//!   fn greet(&self) -> String {
//!     self.message.0.clone()
//!   }
//! }
//!
//! impl Injectable for EnglishGreeter {
//!   fn blueprint() -> Blueprint {
//!     Blueprint::of::<Self>()
//!       .constructor(vec![param::<Message>("message")], |args| {
//!         Ok(Self { message: args.next()? })
//!       })
//!       .build()
//!   }
//! }
//!
//! let container = Container::new();
//! container
//!   .register_instance(None, Arc::new(Message(String::from("Hello, World!"))))
//!   .unwrap();
//! container
//!   .register_type_as::<dyn Greeter, EnglishGreeter, _>(
//!     None,
//!     lifetime::singleton(),
//!     vec![],
//!     |greeter| greeter as Arc<dyn Greeter>,
//!   )
//!   .unwrap();
//!
//! let greeter = container.resolve::<dyn Greeter>(None).unwrap();
//! assert_eq!(greeter.greet(), "Hello, World!");
//! ```

mod container;
mod contract;
mod error;
mod global;
mod inject;
mod instance;
pub mod lifetime;
mod macros;
mod overrides;
mod pipeline;
mod policy;
mod registration;
mod registry;

pub use container::{Container, ProvidedRegistration, RegistrationInfo};
pub use contract::Contract;
pub use error::{IocError, IocResult};
pub use global::global;
pub use inject::{
  param, Blueprint, BlueprintBuilder, Injectable, InjectionMember, MemberValue, Param,
  ResolvedArgs,
};
pub use instance::{Instance, WeakInstance};
pub use lifetime::{DefaultLifetime, LifetimeEnv, LifetimeManager};
pub use overrides::Override;
pub use pipeline::context::{Request, ResolveContext, Resolver};
pub use pipeline::{BuildPlan, Flow, Processor, Stage, StagedChain, StepPair};
pub use policy::{PolicyChange, PolicyStore};
