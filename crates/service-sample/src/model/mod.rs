//! Concrete service types used by the sample application.

pub mod app;
pub mod store;
pub mod worker;

pub use app::AppService;
pub use store::{MemoryStore, SqliteStore, StoreError, STORE};
pub use worker::WorkerService;
