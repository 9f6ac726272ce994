//! Worker service: depends on a store without naming a backend.

use service_framework::{
    handle, DependencySpec, Service, ServiceCore, ServiceError, ServiceHandle, ServiceType, Setting,
};
use tracing::info;

use crate::model::store::STORE;

const WORKER: &str = "sample.WorkerService";

/// A unit of background work bound to whatever store the process
/// registered.
///
/// The store dependency is declared against the abstract `sample.Store`
/// key through the `WORKER_STORE` config value, so a deployment can point
/// a worker at a specific backend without touching code.
pub struct WorkerService {
    core: ServiceCore,
}

impl WorkerService {
    pub fn create(name: &str) -> ServiceHandle {
        handle(Self {
            core: ServiceCore::builder(WORKER)
                .name(name)
                .setting(Setting::new("WORKER_STORE", STORE))
                .setting(Setting::new("POLL_INTERVAL_MS", 500))
                .dependency(DependencySpec::new("store").with_config_key("WORKER_STORE"))
                .build(),
        })
    }

    pub fn service_type() -> ServiceType {
        ServiceType::concrete(WORKER, |name| Self::create(name))
    }
}

impl Service for WorkerService {
    fn core(&self) -> &ServiceCore {
        &self.core
    }

    fn on_started(&self) -> Result<(), ServiceError> {
        if let Some(me) = self.core.handle() {
            let store = me.dependency("store")?;
            info!(store = %store.core().name(), "worker bound to store");
        }
        Ok(())
    }

    fn on_reloaded(&self) -> Result<(), ServiceError> {
        let reloads = self
            .core
            .attributes()
            .get("reloads")
            .and_then(|v| v.as_u64())
            .unwrap_or(0)
            + 1;
        self.core.attributes().set("reloads", reloads);
        info!(reloads, "worker reloaded");
        Ok(())
    }
}
