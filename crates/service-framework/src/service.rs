//! # Services
//!
//! A service is a lifecycle-managed unit in a composition tree. Concrete
//! service types implement the [`Service`] trait: they expose their
//! [`ServiceCore`] (identity, config, attributes, children, lifecycle
//! machine) and override whichever lifecycle callbacks they care about.
//!
//! ## Architecture Note
//!
//! The trait splits the framework's bookkeeping from the user's behavior.
//! Everything the runtime needs lives behind `core()`; everything the user
//! customizes is a provided method defaulting to `Ok(())`. A service type
//! is therefore a struct with a `ServiceCore` field, a `core()` one-liner,
//! and the callbacks it actually wants:
//!
//! ```
//! use service_framework::{handle, Service, ServiceCore, ServiceError, ServiceHandle};
//!
//! struct CacheService {
//!     core: ServiceCore,
//! }
//!
//! impl CacheService {
//!     fn create(name: &str) -> ServiceHandle {
//!         handle(Self {
//!             core: ServiceCore::builder("demo.CacheService").name(name).build(),
//!         })
//!     }
//! }
//!
//! impl Service for CacheService {
//!     fn core(&self) -> &ServiceCore {
//!         &self.core
//!     }
//!
//!     fn on_started(&self) -> Result<(), ServiceError> {
//!         // warm the cache
//!         Ok(())
//!     }
//! }
//!
//! let cache = CacheService::create("cache");
//! cache.init().unwrap();
//! cache.start().unwrap();
//! cache.stop().unwrap();
//! ```
//!
//! Services are always handled as `Arc<dyn Service>` ([`ServiceHandle`]),
//! produced by [`handle`]. The driving operations (`init`, `start`, `stop`,
//! `reload`, tree queries, dependency access) are inherent methods on
//! `dyn Service`, so they are available on any handle without importing an
//! extension trait.

use std::sync::{Arc, Weak};
use std::time::Duration;

use indexmap::IndexMap;
use parking_lot::RwLock;
use uuid::Uuid;

use crate::config::{Attributes, Config, Setting, Value};
use crate::dependency::DependencySpec;
use crate::error::ServiceError;
use crate::lifecycle::{Lifecycle, ServiceState};
use crate::registry::{self, Registry, TypeResolver};

/// Shared, reference-counted handle to a service.
pub type ServiceHandle = Arc<dyn Service>;

/// Wraps a service in its [`ServiceHandle`], wiring the self-reference the
/// tree uses for parent back-links. All services enter the tree through
/// this function.
pub fn handle<T: Service>(service: T) -> ServiceHandle {
    typed_handle(service).1
}

/// Like [`handle`], but also returns the typed reference, for service
/// types that expose an API beyond the lifecycle (a store's `put`/`get`,
/// say). Both references point at the same instance.
pub fn typed_handle<T: Service>(service: T) -> (Arc<T>, ServiceHandle) {
    let typed = Arc::new(service);
    let handle: ServiceHandle = typed.clone();
    *handle.core().self_ref.write() = Arc::downgrade(&handle);
    (typed, handle)
}

/// A lifecycle-managed unit in the composition tree.
///
/// Every callback is optional; defaults do nothing. Callbacks run inside
/// the owning service's transition, so a failure aborts that transition.
pub trait Service: Send + Sync + 'static {
    /// The framework state this service carries.
    fn core(&self) -> &ServiceCore;

    fn on_initializing(&self) -> Result<(), ServiceError> {
        Ok(())
    }

    fn on_initialized(&self) -> Result<(), ServiceError> {
        Ok(())
    }

    fn on_starting(&self) -> Result<(), ServiceError> {
        Ok(())
    }

    fn on_started(&self) -> Result<(), ServiceError> {
        Ok(())
    }

    fn on_stopping(&self) -> Result<(), ServiceError> {
        Ok(())
    }

    fn on_stopped(&self) -> Result<(), ServiceError> {
        Ok(())
    }

    fn on_reloading(&self) -> Result<(), ServiceError> {
        Ok(())
    }

    fn on_reloaded(&self) -> Result<(), ServiceError> {
        Ok(())
    }

    /// Called after this service has been attached to `parent`.
    fn on_attached(&self, _parent: &dyn Service) {}

    /// Called after this service has been detached from `parent`.
    fn on_detached(&self, _parent: &dyn Service) {}
}

impl dyn Service {
    /// The current lifecycle state.
    pub fn state(&self) -> ServiceState {
        self.core().lifecycle().state()
    }

    /// Moves New -> Initialized: validates config, materializes declared
    /// dependencies, and initializes every New child in attachment order.
    pub fn init(&self) -> Result<ServiceState, ServiceError> {
        Ok(self.core().lifecycle().fire_init(self)?)
    }

    /// Moves Initialized/Stopped -> Running, starting every Initialized
    /// child in attachment order.
    pub fn start(&self) -> Result<ServiceState, ServiceError> {
        Ok(self.core().lifecycle().fire_start(self)?)
    }

    /// Moves Initialized/Running -> Stopped, stopping every Running child
    /// in reverse attachment order.
    pub fn stop(&self) -> Result<ServiceState, ServiceError> {
        Ok(self.core().lifecycle().fire_stop(self)?)
    }

    /// Running -> Running self-transition, reloading every Running child in
    /// reverse attachment order.
    pub fn reload(&self) -> Result<ServiceState, ServiceError> {
        Ok(self.core().lifecycle().fire_reload(self)?)
    }

    /// Blocks until this service reaches `state` or `timeout` elapses.
    pub fn wait_for_state(&self, state: ServiceState, timeout: Option<Duration>) -> bool {
        self.core().lifecycle().wait_for(state, timeout)
    }

    /// Blocks the caller until this service has stopped. Returns whether it
    /// stopped within the timeout.
    pub fn join(&self, timeout: Option<Duration>) -> bool {
        self.wait_for_state(ServiceState::Stopped, timeout)
    }

    /// The parent service, while one is attached.
    pub fn parent(&self) -> Option<ServiceHandle> {
        self.core().parent.read().upgrade()
    }

    /// Whether this service sits at the root of its tree.
    pub fn is_root(&self) -> bool {
        self.parent().is_none()
    }

    /// Constructs the registered type `key` under `name` and attaches it as
    /// a child of this service.
    pub fn child(&self, key: &str, name: &str) -> Result<ServiceHandle, ServiceError> {
        let ty = self
            .core()
            .registry()
            .get(key)
            .ok_or_else(|| crate::error::RegistryError::NotRegistered(key.to_owned()))?;
        let child = ty.construct(name)?;
        self.attach(&child)?;
        Ok(child)
    }
}

impl std::fmt::Debug for dyn Service {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let core = self.core();
        f.debug_struct("Service")
            .field("type_name", &core.type_name())
            .field("name", &core.name())
            .field("state", &self.state())
            .finish()
    }
}

fn urn() -> String {
    Uuid::new_v4().urn().to_string()
}

/// The framework-owned state of one service.
///
/// Built once per instance through [`ServiceCore::builder`]; the owning
/// struct stores it and hands out `&ServiceCore` via [`Service::core`].
pub struct ServiceCore {
    id: String,
    name: String,
    type_name: String,
    fully_qualified_type: String,
    config: Config,
    attributes: Attributes,
    dependencies: Vec<DependencySpec>,
    lifecycle: Lifecycle,
    pub(crate) children: RwLock<IndexMap<String, ServiceHandle>>,
    pub(crate) parent: RwLock<Weak<dyn Service>>,
    pub(crate) self_ref: RwLock<Weak<dyn Service>>,
    registry: Arc<Registry>,
    resolver: Arc<dyn TypeResolver>,
}

impl ServiceCore {
    /// Starts building a core for the canonical type
    /// `"<namespace>.<TypeName>"`.
    pub fn builder(fully_qualified_type: impl Into<String>) -> CoreBuilder {
        CoreBuilder {
            fully_qualified_type: fully_qualified_type.into(),
            name: None,
            settings: Vec::new(),
            config_values: Vec::new(),
            attributes: Vec::new(),
            dependencies: Vec::new(),
            registry: None,
            resolver: None,
        }
    }

    /// Unique id of this instance, a `urn:uuid:` string unless supplied via
    /// the `SERVICE_ID` config value.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Human-readable instance name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The short type name, e.g. `SqliteStore`.
    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    /// The canonical type identifier, e.g. `sample.SqliteStore`.
    pub fn fully_qualified_type(&self) -> &str {
        &self.fully_qualified_type
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn attributes(&self) -> &Attributes {
        &self.attributes
    }

    pub fn lifecycle(&self) -> &Lifecycle {
        &self.lifecycle
    }

    /// The registry consulted for child construction and concrete-type
    /// resolution.
    pub fn registry(&self) -> &Arc<Registry> {
        &self.registry
    }

    pub(crate) fn resolver(&self) -> &Arc<dyn TypeResolver> {
        &self.resolver
    }

    pub(crate) fn dependencies(&self) -> &[DependencySpec] {
        &self.dependencies
    }

    pub(crate) fn dependency_spec(&self, name: &str) -> Option<&DependencySpec> {
        self.dependencies.iter().find(|spec| spec.name() == name)
    }

    /// The handle wrapping the service that owns this core, if the service
    /// was created through [`handle`].
    pub fn handle(&self) -> Option<ServiceHandle> {
        self.self_ref.read().upgrade()
    }
}

/// Builder for [`ServiceCore`].
pub struct CoreBuilder {
    fully_qualified_type: String,
    name: Option<String>,
    settings: Vec<Setting>,
    config_values: Vec<(String, Value)>,
    attributes: Vec<(String, Value)>,
    dependencies: Vec<DependencySpec>,
    registry: Option<Arc<Registry>>,
    resolver: Option<Arc<dyn TypeResolver>>,
}

impl CoreBuilder {
    /// Sets the instance name. Falls back to the `SERVICE_NAME` config
    /// value, then to the short type name.
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Declares one configuration setting.
    pub fn setting(mut self, setting: Setting) -> Self {
        self.settings.push(setting);
        self
    }

    /// Supplies a configuration value up front.
    pub fn config_value(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.config_values.push((key.into(), value.into()));
        self
    }

    /// Sets a descriptive attribute.
    pub fn attribute(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.attributes.push((key.into(), value.into()));
        self
    }

    /// Declares a dependency to materialize during `init` (or on first
    /// access).
    pub fn dependency(mut self, spec: DependencySpec) -> Self {
        self.dependencies.push(spec);
        self
    }

    /// Uses a registry other than the process-wide one.
    pub fn registry(mut self, registry: Arc<Registry>) -> Self {
        self.registry = Some(registry);
        self
    }

    /// Uses a name resolver other than the service's registry.
    pub fn resolver(mut self, resolver: Arc<dyn TypeResolver>) -> Self {
        self.resolver = Some(resolver);
        self
    }

    pub fn build(self) -> ServiceCore {
        let config = Config::with_schema(self.settings);
        for (key, value) in self.config_values {
            config.set(&key, value);
        }
        let attributes = Attributes::new();
        for (key, value) in self.attributes {
            attributes.set(&key, value);
        }

        let fully_qualified_type = self.fully_qualified_type;
        let type_name = fully_qualified_type
            .rsplit('.')
            .next()
            .unwrap_or(fully_qualified_type.as_str())
            .to_owned();
        let id = config.get_str("SERVICE_ID").unwrap_or_else(urn);
        let name = self
            .name
            .or_else(|| config.get_str("SERVICE_NAME"))
            .unwrap_or_else(|| type_name.clone());

        let registry = self.registry.unwrap_or_else(registry::global);
        let resolver = self
            .resolver
            .unwrap_or_else(|| registry.clone() as Arc<dyn TypeResolver>);

        let no_parent: Weak<dyn Service> = Weak::<GenericService>::new();
        let no_self: Weak<dyn Service> = Weak::<GenericService>::new();
        ServiceCore {
            id,
            name,
            type_name,
            fully_qualified_type,
            config,
            attributes,
            dependencies: self.dependencies,
            lifecycle: Lifecycle::new(),
            children: RwLock::new(IndexMap::new()),
            parent: RwLock::new(no_parent),
            self_ref: RwLock::new(no_self),
            registry,
            resolver,
        }
    }
}

/// A plain service with no behavior beyond its lifecycle. Useful as a
/// grouping node or in tests.
pub struct GenericService {
    core: ServiceCore,
}

impl GenericService {
    pub fn create(name: &str) -> ServiceHandle {
        handle(Self {
            core: ServiceCore::builder("framework.GenericService")
                .name(name)
                .build(),
        })
    }
}

impl Service for GenericService {
    fn core(&self) -> &ServiceCore {
        &self.core
    }
}
