//! # System Bootstrap & Orchestration
//!
//! Wiring a service tree is a three-step affair, and this module is the
//! conductor that performs it:
//!
//! 1. **Type registration** - every concrete type the process can construct
//!    is registered explicitly, up front. Nothing registers itself as a
//!    side effect of being defined; [`register_types`] is the single place
//!    a reader looks to learn what this process can build.
//! 2. **Tree construction** - the root service is created and its children
//!    attached in dependency order (a later-attached child may lean on
//!    earlier siblings, and shutdown walks the same order in reverse).
//! 3. **Lifecycle driving** - `init`/`start`/`reload`/`stop` on the root
//!    propagate through the whole tree.
//!
//! Dependencies declared against the abstract `sample.Store` key resolve
//! during `init`, so the store child appears under the worker without the
//! worker ever naming a backend.

use service_framework::{global, Registry, ServiceError, ServiceHandle, ServiceType};
use tracing::info;

use crate::model::{AppService, SqliteStore, WorkerService, STORE};

/// Registers every type the sample process can construct. Idempotent;
/// first registration wins.
pub fn register_types(registry: &Registry) {
    registry.register(ServiceType::abstract_type(STORE));
    registry.register(SqliteStore::service_type());
    registry.register(WorkerService::service_type());
    registry.register(AppService::service_type());
}

/// The assembled sample tree: an app root with one worker, which pulls in
/// a store through dependency resolution.
pub struct SampleSystem {
    pub app: ServiceHandle,
}

impl SampleSystem {
    /// Registers types and builds the tree. The tree is New until
    /// [`SampleSystem::start`] runs.
    pub fn new() -> Result<Self, ServiceError> {
        let registry = global();
        register_types(&registry);

        let app = AppService::create("app");
        app.core().config().set("APP_ENV", "dev");
        app.child("sample.WorkerService", "worker")?;

        info!(services = app.services().len(), "sample system assembled");
        Ok(Self { app })
    }

    /// Initializes and starts the whole tree.
    pub fn start(&self) -> Result<(), ServiceError> {
        self.app.init()?;
        self.app.start()?;
        Ok(())
    }

    /// Reloads every running service, dependents first.
    pub fn reload(&self) -> Result<(), ServiceError> {
        self.app.reload()?;
        Ok(())
    }

    /// Stops the tree, dependents first.
    pub fn shutdown(&self) -> Result<(), ServiceError> {
        self.app.stop()?;
        Ok(())
    }
}
