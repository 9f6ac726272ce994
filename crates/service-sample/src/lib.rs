//! # Service Framework Sample
//!
//! A reference application built on `service-framework`.
//!
//! - **[model]**: concrete service types ([`model::AppService`],
//!   [`model::WorkerService`], the store backends) implementing the
//!   [`Service`](service_framework::Service) trait.
//! - **[lifecycle]**: bootstrap and orchestration, from explicit type
//!   registration through tree assembly to shutdown.
//!
//! The binary in `main.rs` drives the full lifecycle once:
//! assemble, init, start, reload, stop.

pub mod lifecycle;
pub mod model;
