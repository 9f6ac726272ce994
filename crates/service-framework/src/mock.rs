//! # Test Doubles
//!
//! [`ProbeService`] records every lifecycle callback it receives into a
//! shared journal, which is how the integration tests assert propagation
//! order across a tree. A probe can also be armed to fail at a named
//! callback, for exercising abort-mid-propagation behavior.

use std::sync::Arc;

use parking_lot::Mutex;

use crate::error::ServiceError;
use crate::service::{handle, Service, ServiceCore, ServiceHandle};

/// Shared, ordered record of lifecycle events across services.
pub type Journal = Arc<Mutex<Vec<String>>>;

/// Creates an empty journal.
pub fn journal() -> Journal {
    Arc::new(Mutex::new(Vec::new()))
}

/// A service that journals its lifecycle callbacks.
pub struct ProbeService {
    core: ServiceCore,
    journal: Journal,
    fail_at: Option<&'static str>,
}

impl ProbeService {
    /// Creates a probe writing to `journal`.
    pub fn create(name: &str, journal: &Journal) -> ServiceHandle {
        handle(Self {
            core: ServiceCore::builder("framework.ProbeService").name(name).build(),
            journal: journal.clone(),
            fail_at: None,
        })
    }

    /// Creates a probe with a journal nobody else reads.
    pub fn detached(name: &str) -> ServiceHandle {
        Self::create(name, &journal())
    }

    /// Creates a probe that fails when the callback `fail_at` runs, e.g.
    /// `"starting"`.
    pub fn failing(name: &str, journal: &Journal, fail_at: &'static str) -> ServiceHandle {
        handle(Self {
            core: ServiceCore::builder("framework.ProbeService").name(name).build(),
            journal: journal.clone(),
            fail_at: Some(fail_at),
        })
    }

    fn record(&self, event: &str) -> Result<(), ServiceError> {
        self.journal
            .lock()
            .push(format!("{}:{event}", self.core.name()));
        if self.fail_at == Some(event) {
            return Err(ServiceError::Failure(format!(
                "{} refused to keep {event}",
                self.core.name()
            )));
        }
        Ok(())
    }
}

impl Service for ProbeService {
    fn core(&self) -> &ServiceCore {
        &self.core
    }

    fn on_initializing(&self) -> Result<(), ServiceError> {
        self.record("initializing")
    }

    fn on_initialized(&self) -> Result<(), ServiceError> {
        self.record("initialized")
    }

    fn on_starting(&self) -> Result<(), ServiceError> {
        self.record("starting")
    }

    fn on_started(&self) -> Result<(), ServiceError> {
        self.record("started")
    }

    fn on_stopping(&self) -> Result<(), ServiceError> {
        self.record("stopping")
    }

    fn on_stopped(&self) -> Result<(), ServiceError> {
        self.record("stopped")
    }

    fn on_reloading(&self) -> Result<(), ServiceError> {
        self.record("reloading")
    }

    fn on_reloaded(&self) -> Result<(), ServiceError> {
        self.record("reloaded")
    }

    fn on_attached(&self, parent: &dyn Service) {
        self.journal
            .lock()
            .push(format!("{}:attached->{}", self.core.name(), parent.core().name()));
    }

    fn on_detached(&self, parent: &dyn Service) {
        self.journal
            .lock()
            .push(format!("{}:detached->{}", self.core.name(), parent.core().name()));
    }
}
