//! # Observability Setup
//!
//! One-call `tracing` initialization for applications built on the
//! framework. Lifecycle events carry `service_id`, `service_type`, and
//! `service_name` fields, so a line-oriented subscriber already gives a
//! usable audit of every tree.
//!
//! ```bash
//! RUST_LOG=info cargo run      # lifecycle events
//! RUST_LOG=debug cargo run     # plus resolution details
//! ```

use tracing_subscriber::EnvFilter;

/// Installs the global fmt subscriber, honoring `RUST_LOG` and defaulting
/// to `info`. Safe to call more than once; later calls are no-ops.
pub fn setup_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}
