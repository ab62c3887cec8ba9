// src/error.rs

//! Error taxonomy for registration and resolution.

use thiserror::Error;

use crate::contract::Contract;

/// Convenience alias used throughout the crate.
pub type IocResult<T> = Result<T, IocError>;

/// Errors surfaced by container operations.
///
/// `InvalidRegistration` is raised at pipeline-build time, when a
/// registration's configuration is structurally impossible to satisfy.
/// `ResolutionFailed` is raised at resolve time and carries the dependency
/// chain that led to the failing contract, so a failure three levels deep in
/// an object graph still names every contract on the way down.
#[derive(Debug, Error, Clone)]
pub enum IocError {
  /// The registration's configuration can never produce an instance.
  #[error("invalid registration for `{contract}`: {reason}")]
  InvalidRegistration { contract: String, reason: String },

  /// A contract could not be satisfied at resolve time.
  #[error("resolution of `{contract}` failed: {reason} (chain: {})", .path.join(" -> "))]
  ResolutionFailed {
    contract: String,
    reason: String,
    /// Contracts on the resolution path, outermost first.
    path: Vec<String>,
    #[source]
    source: Option<Box<IocError>>,
  },

  /// A contract re-entered itself within one resolve call graph.
  #[error("circular dependency detected while resolving `{contract}` (cycle: {})", .path.join(" -> "))]
  CircularDependency { contract: String, path: Vec<String> },

  /// The container (or one of its collaborators) has been disposed.
  #[error("container has been disposed")]
  Disposed,
}

impl IocError {
  pub(crate) fn invalid(contract: &Contract, reason: impl Into<String>) -> Self {
    IocError::InvalidRegistration {
      contract: contract.to_string(),
      reason: reason.into(),
    }
  }

  pub(crate) fn failed(contract: &Contract, reason: impl Into<String>, path: Vec<String>) -> Self {
    IocError::ResolutionFailed {
      contract: contract.to_string(),
      reason: reason.into(),
      path,
      source: None,
    }
  }

  pub(crate) fn failed_with(
    contract: &Contract,
    reason: impl Into<String>,
    path: Vec<String>,
    source: IocError,
  ) -> Self {
    IocError::ResolutionFailed {
      contract: contract.to_string(),
      reason: reason.into(),
      path,
      source: Some(Box::new(source)),
    }
  }
}
