//! Sample application entry point: assemble a service tree, walk it
//! through its full lifecycle, and leave a record of what ran.

use service_framework::setup_tracing;
use service_sample::lifecycle::SampleSystem;
use tracing::info;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Setup tracing once for the entire application
    setup_tracing();

    info!("starting sample system");
    let system = SampleSystem::new()?;
    system.start()?;

    let worker = system
        .app
        .services()
        .by_name("worker")
        .first()
        .ok_or("worker was not assembled")?;
    info!(
        worker_state = ?worker.state(),
        store = worker.services().by_name("store").first().is_some(),
        "system running"
    );

    system.reload()?;

    let record = system.app.to_record();
    info!(tree = %serde_json::to_string_pretty(&record)?, "system snapshot");

    system.shutdown()?;
    system.app.join(None);
    info!(state = ?system.app.state(), "sample system stopped cleanly");
    Ok(())
}
