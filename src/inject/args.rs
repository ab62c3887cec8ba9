// src/inject/args.rs

use crate::error::{IocError, IocResult};
use crate::instance::Instance;
use std::sync::Arc;

/// Dependency values resolved by the engine, handed to a constructor or
/// method closure as an ordered cursor. The closure pulls each argument in
/// declaration order with [`next`](ResolvedArgs::next) (or
/// [`next_opt`](ResolvedArgs::next_opt) for optional parameters).
pub struct ResolvedArgs {
  values: Vec<Option<Instance>>,
  names: Vec<&'static str>,
  cursor: usize,
}

impl ResolvedArgs {
  pub(crate) fn new(values: Vec<Option<Instance>>, names: Vec<&'static str>) -> Self {
    debug_assert_eq!(values.len(), names.len());
    Self {
      values,
      names,
      cursor: 0,
    }
  }

  fn take(&mut self) -> IocResult<(Option<Instance>, &'static str)> {
    let index = self.cursor;
    if index >= self.values.len() {
      return Err(IocError::InvalidRegistration {
        contract: String::from("<constructor arguments>"),
        reason: format!(
          "constructor closure requested argument {} but only {} were declared",
          index + 1,
          self.values.len()
        ),
      });
    }
    self.cursor += 1;
    Ok((self.values[index].take(), self.names[index]))
  }

  /// The next required argument, downcast to its declared type.
  pub fn next<C: ?Sized + Send + Sync + 'static>(&mut self) -> IocResult<Arc<C>> {
    let (value, name) = self.take()?;
    let instance = value.ok_or_else(|| IocError::InvalidRegistration {
      contract: String::from(name),
      reason: String::from("argument was declared optional but consumed as required"),
    })?;
    instance.downcast::<C>().ok_or_else(|| IocError::InvalidRegistration {
      contract: String::from(name),
      reason: format!(
        "argument type mismatch: closure expected `{}`",
        std::any::type_name::<C>()
      ),
    })
  }

  /// The next optional argument; `None` when its contract was unresolved.
  pub fn next_opt<C: ?Sized + Send + Sync + 'static>(&mut self) -> IocResult<Option<Arc<C>>> {
    let (value, name) = self.take()?;
    match value {
      None => Ok(None),
      Some(instance) => instance
        .downcast::<C>()
        .map(Some)
        .ok_or_else(|| IocError::InvalidRegistration {
          contract: String::from(name),
          reason: format!(
            "argument type mismatch: closure expected `{}`",
            std::any::type_name::<C>()
          ),
        }),
    }
  }
}
