// src/macros.rs

//! Public macros for ergonomic service resolution.

/// Resolves a contract from the global container, panicking when it cannot
/// be satisfied.
///
/// This is the primary way to pull dependencies inside factories: a missing
/// registration surfaces immediately with the contract's type name instead
/// of threading a `Result` through construction code. For a non-panicking
/// version, use `global().resolve(..)` directly.
///
/// # Panics
///
/// Panics if the contract cannot be resolved.
///
/// # Examples
///
/// ```
/// use weft_ioc::{global, resolve};
/// use std::sync::Arc;
///
/// global().register_instance(Some("greeting"), Arc::new(String::from("hello"))).unwrap();
///
/// let message = resolve!(String, "greeting");
/// assert_eq!(*message, "hello");
/// ```
#[macro_export]
macro_rules! resolve {
    // Arm for the default contract: resolve!(MyService) / resolve!(dyn Greeter)
    ($type:ty) => {
        $crate::global()
            .resolve::<$type>(None)
            .unwrap_or_else(|error| {
                panic!(
                    "failed to resolve required contract `{}`: {}",
                    std::any::type_name::<$type>(),
                    error
                )
            })
    };

    // Arm for a named contract: resolve!(MyService, "name")
    ($type:ty, $name:expr) => {
        $crate::global()
            .resolve::<$type>(Some($name))
            .unwrap_or_else(|error| {
                panic!(
                    "failed to resolve required contract `{}` named '{}': {}",
                    std::any::type_name::<$type>(),
                    $name,
                    error
                )
            })
    };
}
