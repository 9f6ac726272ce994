//! # Service Framework
//!
//! This crate provides the foundational building blocks for composing
//! long-running processes out of a tree of lifecycle-managed services. Each
//! service moves through a fixed set of states (New, Initialized, Running,
//! Stopped) under a guarded transition engine, and lifecycle operations on
//! a parent propagate to its children in a well-defined order.
//!
//! ## Architecture Overview
//!
//! The framework separates concerns into four layers:
//!
//! 1. **Transition Engine** ([`StateMachine`], [`Transition`],
//!    [`StateGuard`]) - generic guarded state changes with enter/action/exit
//!    hooks and a blocking `wait_for`.
//! 2. **Lifecycle Machine** ([`Lifecycle`], [`ServiceState`]) - the fixed
//!    four-state specialization every service carries.
//! 3. **Service Tree** ([`Service`], [`ServiceCore`], [`ServiceView`]) -
//!    hierarchical, ordered composition with attach/detach and query views.
//! 4. **Type Registry** ([`Registry`], [`ServiceType`],
//!    [`DependencySpec`]) - canonical type identifiers, abstract extension
//!    points, and lazy dependency attachment.
//!
//! ## Lifecycle Semantics
//!
//! `init` moves New services to Initialized, materializing declared
//! dependencies and recursively initializing New children in attachment
//! order. `start` moves Initialized or Stopped services to Running,
//! starting Initialized children in attachment order. `stop` and `reload`
//! walk children in *reverse* attachment order: a later-attached child is
//! assumed to depend on earlier siblings, so dependents quiesce first.
//!
//! A failure anywhere in a propagation pass aborts the remaining siblings
//! of that pass and leaves the parent's state unchanged. Nothing is rolled
//! back; callers must treat every lifecycle call as all-or-partial-effect.
//!
//! ## Concurrency Model
//!
//! Everything is synchronous and blocking. Each service owns an independent
//! state machine with its own lock, so transitions on unrelated services do
//! not contend. A parent's transition runs on the calling thread and
//! recurses into children sequentially. The only suspension point is
//! [`StateMachine::wait_for`] (and the service `join` built on it), which
//! blocks with an optional deadline.
//!
//! ## Example
//!
//! ```
//! use service_framework::{GenericService, ServiceState};
//!
//! let root = GenericService::create("root");
//! let worker = GenericService::create("worker");
//! root.attach(&worker).unwrap();
//!
//! root.init().unwrap();
//! root.start().unwrap();
//! assert_eq!(worker.state(), ServiceState::Running);
//!
//! root.stop().unwrap();
//! assert_eq!(worker.state(), ServiceState::Stopped);
//! ```
//!
//! ## Type Registry
//!
//! Concrete service types register explicitly at process startup under a
//! canonical `"<namespace>.<TypeName>"` key. Registration is idempotent and
//! first-wins; the registry resolves names to constructible types but never
//! owns a running instance. Abstract keys are extension points: a
//! dependency declared against `"sample.Store"` resolves to whichever
//! single concrete implementation is registered, and it is an error for
//! there to be none or several.
//!
//! ## Testing
//!
//! The [`mock`] module provides a `ProbeService` that journals every
//! lifecycle callback, which is how the integration tests assert
//! propagation order without bespoke service types.

pub mod config;
pub mod dependency;
pub mod error;
pub mod lifecycle;
pub mod mock;
pub mod record;
pub mod registry;
pub mod service;
pub mod state;
pub mod telemetry;
pub mod tree;

// Re-export core types for convenience
pub use config::{Attributes, Config, Setting, Value};
pub use dependency::DependencySpec;
pub use error::{
    BoxError, ConfigError, DependencyError, RegistryError, ResolutionError, ServiceError,
    TransitionError,
};
pub use lifecycle::{Lifecycle, ServiceState};
pub use record::ServiceRecord;
pub use registry::{global, Factory, Registry, ServiceType, TypeResolver};
pub use service::{
    handle, typed_handle, CoreBuilder, GenericService, Service, ServiceCore, ServiceHandle,
};
pub use state::{State, StateGuard, StateMachine, Transition};
pub use telemetry::setup_tracing;
pub use tree::ServiceView;
