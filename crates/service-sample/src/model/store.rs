//! Store services: an abstract extension point plus two concrete backends.
//!
//! `sample.Store` is registered as an abstract type; services depend on it
//! without naming a backend, and the registry narrows the reference to
//! whichever single implementation the bootstrap registered.

use parking_lot::Mutex;
use service_framework::{
    handle, Service, ServiceCore, ServiceError, ServiceHandle, ServiceState, ServiceType, Setting,
    StateGuard, TransitionError,
};
use tracing::info;

/// Canonical key of the abstract store extension point.
pub const STORE: &str = "sample.Store";

const SQLITE_STORE: &str = "sample.SqliteStore";
const MEMORY_STORE: &str = "sample.MemoryStore";

/// Errors raised by store operations outside the lifecycle.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The store was used while not running.
    #[error("store is not available")]
    NotAvailable(#[from] TransitionError),
}

/// Key/value store pretending to sit on sqlite.
///
/// `put`/`get` are guarded: they only work while the service is Running.
pub struct SqliteStore {
    core: ServiceCore,
    rows: Mutex<Vec<(String, String)>>,
    available: StateGuard<ServiceState>,
}

impl SqliteStore {
    pub fn new(name: &str) -> Self {
        Self {
            core: ServiceCore::builder(SQLITE_STORE)
                .name(name)
                .setting(Setting::new("SQLITE_PATH", ":memory:"))
                .attribute("backend", "sqlite")
                .build(),
            rows: Mutex::new(Vec::new()),
            available: StateGuard::new([ServiceState::Running]),
        }
    }

    pub fn create(name: &str) -> ServiceHandle {
        handle(Self::new(name))
    }

    pub fn service_type() -> ServiceType {
        ServiceType::concrete(SQLITE_STORE, |name| Self::create(name)).implements(STORE)
    }

    pub fn put(&self, key: &str, value: &str) -> Result<(), StoreError> {
        self.available.call(self.core.lifecycle().machine(), || {
            self.rows.lock().push((key.to_owned(), value.to_owned()));
        })?;
        Ok(())
    }

    pub fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let value = self.available.call(self.core.lifecycle().machine(), || {
            self.rows
                .lock()
                .iter()
                .rev()
                .find(|(k, _)| k == key)
                .map(|(_, v)| v.clone())
        })?;
        Ok(value)
    }
}

impl Service for SqliteStore {
    fn core(&self) -> &ServiceCore {
        &self.core
    }

    fn on_started(&self) -> Result<(), ServiceError> {
        let path = self.core.config().get_or("SQLITE_PATH", ":memory:");
        info!(path = %path, "sqlite store opened");
        Ok(())
    }

    fn on_stopped(&self) -> Result<(), ServiceError> {
        let rows = self.rows.lock().len();
        info!(rows, "sqlite store closed");
        Ok(())
    }
}

/// In-memory store backend, mostly for tests.
pub struct MemoryStore {
    core: ServiceCore,
}

impl MemoryStore {
    pub fn create(name: &str) -> ServiceHandle {
        handle(Self {
            core: ServiceCore::builder(MEMORY_STORE)
                .name(name)
                .attribute("backend", "memory")
                .build(),
        })
    }

    pub fn service_type() -> ServiceType {
        ServiceType::concrete(MEMORY_STORE, |name| Self::create(name)).implements(STORE)
    }
}

impl Service for MemoryStore {
    fn core(&self) -> &ServiceCore {
        &self.core
    }
}
