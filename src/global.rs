// src/global.rs

//! The global root container and its access function.

use crate::container::Container;
use once_cell::sync::Lazy;

// The one and only global container instance, created on first access in a
// thread-safe manner.
static GLOBAL_CONTAINER: Lazy<Container> = Lazy::new(Container::new);

/// Provides a reference to the global root container.
///
/// This allows registering and resolving services from anywhere in an
/// application without threading a container handle through every call.
///
/// # Examples
///
/// ```
/// use weft_ioc::global;
/// use std::sync::Arc;
///
/// fn register_services() -> weft_ioc::IocResult<()> {
///   global().register_instance(Some("motd"), Arc::new(String::from("Hello from global!")))
/// }
/// # register_services().unwrap();
/// ```
pub fn global() -> &'static Container {
  &GLOBAL_CONTAINER
}
