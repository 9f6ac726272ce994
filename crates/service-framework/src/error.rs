//! # Framework Errors
//!
//! This module defines the common error types used throughout the service
//! framework. By centralizing error definitions, we ensure consistent error
//! handling across the transition engine, the registry, and the service tree.
//!
//! All lifecycle, registry, and dependency operations fail synchronously to
//! their direct caller; there is no retry machinery anywhere in the framework.

use thiserror::Error;

/// Boxed error type carried by transition hooks.
///
/// Hooks can fail with any error type; the engine wraps whatever they return
/// the same way a parent operation wraps a child failure.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Errors raised by the state transition engine.
#[derive(Debug, Error)]
pub enum TransitionError {
    /// A transition or guarded call was attempted outside its allowed
    /// source state(s). The machine's state is unchanged.
    #[error("invalid transition: current state {current} is not in {allowed}")]
    InvalidTransition {
        /// The state the machine was observed in.
        current: String,
        /// The set of states the operation is allowed from.
        allowed: String,
    },

    /// An enter/action/exit hook failed, aborting the transition before the
    /// target state was reached.
    #[error("transition hook failed")]
    Hook(#[source] BoxError),
}

/// Errors raised by the type registry.
#[derive(Debug, Error)]
pub enum RegistryError {
    /// An operation referenced a key with no registry entry.
    #[error("no registry entry for \"{0}\"")]
    NotRegistered(String),
}

/// Errors reported by the name-resolution collaborator.
///
/// The two variants distinguish "the requested name itself could not be
/// found" from "the requested name exists but failed while one of its own
/// dependencies was loading". Resolvers report this explicitly; callers never
/// have to inspect a call stack to tell the cases apart.
#[derive(Debug, Error)]
pub enum ResolutionError {
    /// The requested name has no known type behind it.
    #[error("type \"{0}\" not found")]
    NotFound(String),

    /// The requested name exists, but loading it failed inside one of its
    /// transitive dependencies.
    #[error("failed to load \"{dependency}\" while resolving \"{name}\"")]
    Dependency { name: String, dependency: String },
}

/// Errors raised while resolving a service dependency to a live child.
#[derive(Debug, Error)]
pub enum DependencyError {
    /// The service declares no dependency under this name.
    #[error("no dependency declared under \"{0}\"")]
    Undeclared(String),

    /// The spec carried no explicit type, no type name, and no usable
    /// config value to resolve a type from.
    #[error("dependency \"{0}\" has no resolvable type reference")]
    Unresolvable(String),

    /// An abstract type has no registered concrete implementation.
    #[error(
        "no concrete implementation registered for abstract type \"{0}\"; \
         implementations must be registered before they can be resolved"
    )]
    NoImplementation(String),

    /// An abstract type has more than one registered concrete
    /// implementation and the reference does not pick one.
    #[error("ambiguous implementations for abstract type \"{key}\": {candidates:?}")]
    Ambiguous {
        key: String,
        candidates: Vec<String>,
    },

    #[error(transparent)]
    Resolution(#[from] ResolutionError),

    #[error(transparent)]
    Registry(#[from] RegistryError),
}

/// Errors raised by the configuration store.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A value declared `required` was never supplied.
    #[error("required config value \"{0}\" was never supplied")]
    MissingRequired(String),
}

/// Umbrella error for service lifecycle and tree operations.
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error(transparent)]
    Transition(#[from] TransitionError),

    #[error(transparent)]
    Dependency(#[from] DependencyError),

    #[error(transparent)]
    Registry(#[from] RegistryError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Detach was asked to remove a service that is not a child.
    #[error("service \"{service}\" is not a child of \"{parent}\"")]
    NotAttached { service: String, parent: String },

    /// A user-defined lifecycle callback reported a failure.
    #[error("service failure: {0}")]
    Failure(String),
}

impl ServiceError {
    /// Wraps this error for use inside a transition hook.
    pub(crate) fn boxed(self) -> BoxError {
        Box::new(self)
    }
}
