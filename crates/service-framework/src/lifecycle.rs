//! # Service Lifecycle Machine
//!
//! The fixed four-state specialization of the transition engine that every
//! service carries:
//!
//! | transition | source                   | target      | action                                        |
//! |------------|--------------------------|-------------|-----------------------------------------------|
//! | `init`     | New                      | Initialized | materialize dependencies, init New children   |
//! | `start`    | Initialized, Stopped     | Running     | start Initialized children                    |
//! | `stop`     | Initialized, Running     | Stopped     | stop Running children, reverse order          |
//! | `reload`   | Running                  | Running     | reload Running children, reverse order        |
//!
//! Children are propagated in attachment order on the way up and in reverse
//! attachment order on the way down: a later-attached child is assumed to
//! depend on earlier-attached siblings, so dependents quiesce before their
//! dependencies.
//!
//! The enter/exit hooks around each action emit a lifecycle log event and
//! call the owning service's overridable callbacks
//! (`on_initializing`/`on_initialized` and friends). They are pass-through
//! extension points; a callback failure aborts the transition like any
//! other hook failure.
//!
//! A child failure mid-propagation aborts the remaining siblings of that
//! pass. Already-transitioned children are not rolled back and the parent's
//! own state does not advance.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::{BoxError, TransitionError};
use crate::service::Service;
use crate::state::{StateMachine, Transition};

/// Lifecycle states every service moves through.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ServiceState {
    /// Constructed, nothing resolved yet.
    New,
    /// Dependencies materialized, children initialized.
    Initialized,
    /// Actively running.
    Running,
    /// Quiesced; may be started again.
    Stopped,
}

fn log_event(service: &dyn Service, message: &'static str) {
    let core = service.core();
    info!(
        service_id = %core.id(),
        service_type = %core.fully_qualified_type(),
        service_name = %core.name(),
        "{message}"
    );
}

fn init_action(service: &dyn Service) -> Result<(), BoxError> {
    let core = service.core();
    core.config().validate().map_err(|e| Box::new(e) as BoxError)?;
    crate::dependency::materialize_all(service).map_err(|e| e.boxed())?;
    for child in service.services().by_state(ServiceState::New) {
        child.init().map_err(|e| e.boxed())?;
    }
    Ok(())
}

fn start_action(service: &dyn Service) -> Result<(), BoxError> {
    for child in service.services().by_state(ServiceState::Initialized) {
        child.start().map_err(|e| e.boxed())?;
    }
    Ok(())
}

fn stop_action(service: &dyn Service) -> Result<(), BoxError> {
    for child in service
        .services()
        .by_state(ServiceState::Running)
        .all()
        .into_iter()
        .rev()
    {
        child.stop().map_err(|e| e.boxed())?;
    }
    Ok(())
}

fn reload_action(service: &dyn Service) -> Result<(), BoxError> {
    for child in service
        .services()
        .by_state(ServiceState::Running)
        .all()
        .into_iter()
        .rev()
    {
        child.reload().map_err(|e| e.boxed())?;
    }
    Ok(())
}

/// One service's lifecycle machine: the four named transitions plus the
/// generic engine underneath.
pub struct Lifecycle {
    machine: StateMachine<ServiceState, dyn Service>,
    init: Transition<ServiceState, dyn Service>,
    start: Transition<ServiceState, dyn Service>,
    stop: Transition<ServiceState, dyn Service>,
    reload: Transition<ServiceState, dyn Service>,
}

impl Lifecycle {
    pub(crate) fn new() -> Self {
        let init = Transition::new([ServiceState::New], ServiceState::Initialized)
            .enter(|s: &dyn Service| {
                log_event(s, "Service initializing");
                s.on_initializing().map_err(|e| e.boxed())
            })
            .action(init_action)
            .exit(|s: &dyn Service| {
                s.on_initialized().map_err(|e| e.boxed())?;
                log_event(s, "Service initialized");
                Ok(())
            });

        let start = Transition::new(
            [ServiceState::Initialized, ServiceState::Stopped],
            ServiceState::Running,
        )
        .enter(|s: &dyn Service| {
            log_event(s, "Service starting");
            s.on_starting().map_err(|e| e.boxed())
        })
        .action(start_action)
        .exit(|s: &dyn Service| {
            s.on_started().map_err(|e| e.boxed())?;
            log_event(s, "Service started");
            Ok(())
        });

        let stop = Transition::new(
            [ServiceState::Initialized, ServiceState::Running],
            ServiceState::Stopped,
        )
        .enter(|s: &dyn Service| {
            log_event(s, "Service stopping");
            s.on_stopping().map_err(|e| e.boxed())
        })
        .action(stop_action)
        .exit(|s: &dyn Service| {
            s.on_stopped().map_err(|e| e.boxed())?;
            log_event(s, "Service stopped");
            Ok(())
        });

        let reload = Transition::new([ServiceState::Running], ServiceState::Running)
            .enter(|s: &dyn Service| {
                log_event(s, "Service reloading");
                s.on_reloading().map_err(|e| e.boxed())
            })
            .action(reload_action)
            .exit(|s: &dyn Service| {
                s.on_reloaded().map_err(|e| e.boxed())?;
                log_event(s, "Service reloaded");
                Ok(())
            });

        let machine = StateMachine::new(
            ServiceState::New,
            [init.clone(), start.clone(), stop.clone(), reload.clone()],
        );
        Self {
            machine,
            init,
            start,
            stop,
            reload,
        }
    }

    /// The engine underneath, for state guards and waiting.
    pub fn machine(&self) -> &StateMachine<ServiceState, dyn Service> {
        &self.machine
    }

    pub fn state(&self) -> ServiceState {
        self.machine.current()
    }

    pub fn is_new(&self) -> bool {
        self.state() == ServiceState::New
    }

    pub fn is_initialized(&self) -> bool {
        self.state() == ServiceState::Initialized
    }

    pub fn is_running(&self) -> bool {
        self.state() == ServiceState::Running
    }

    pub fn is_stopped(&self) -> bool {
        self.state() == ServiceState::Stopped
    }

    /// Whether the service has ever been started.
    pub fn is_started(&self) -> bool {
        matches!(self.state(), ServiceState::Running | ServiceState::Stopped)
    }

    /// Blocks until the machine reaches `state`; see
    /// [`StateMachine::wait_for`].
    pub fn wait_for(&self, state: ServiceState, timeout: Option<Duration>) -> bool {
        self.machine.wait_for(state, timeout)
    }

    /// The states this service has been in, oldest first.
    pub fn playback(&self) -> Vec<ServiceState> {
        self.machine.playback()
    }

    pub(crate) fn fire_init(&self, service: &dyn Service) -> Result<ServiceState, TransitionError> {
        self.machine.fire(&self.init, service)
    }

    pub(crate) fn fire_start(&self, service: &dyn Service) -> Result<ServiceState, TransitionError> {
        self.machine.fire(&self.start, service)
    }

    pub(crate) fn fire_stop(&self, service: &dyn Service) -> Result<ServiceState, TransitionError> {
        self.machine.fire(&self.stop, service)
    }

    pub(crate) fn fire_reload(&self, service: &dyn Service) -> Result<ServiceState, TransitionError> {
        self.machine.fire(&self.reload, service)
    }
}
