use std::sync::Arc;

use service_framework::{
    handle, typed_handle, DependencyError, DependencySpec, Registry, Service, ServiceCore,
    ServiceError, ServiceHandle, ServiceState,
};
use service_sample::lifecycle::{register_types, SampleSystem};
use service_sample::model::{AppService, MemoryStore, SqliteStore, STORE};

/// Full end-to-end lifecycle through the real bootstrap.
#[test]
fn sample_system_runs_a_full_lifecycle() {
    let system = SampleSystem::new().expect("failed to assemble system");
    system.start().expect("failed to start system");

    let worker = system
        .app
        .services()
        .by_name("worker")
        .first()
        .expect("worker not attached");
    assert_eq!(worker.state(), ServiceState::Running);

    // The store arrived through dependency resolution during init and was
    // carried through start with the rest of the tree.
    let store = worker
        .services()
        .by_name("store")
        .first()
        .expect("store not resolved");
    assert_eq!(store.core().fully_qualified_type(), "sample.SqliteStore");
    assert_eq!(store.state(), ServiceState::Running);

    system.reload().expect("failed to reload system");
    assert_eq!(
        worker.core().attributes().get("reloads"),
        Some(serde_json::json!(1))
    );

    system.shutdown().expect("failed to stop system");
    assert_eq!(system.app.state(), ServiceState::Stopped);
    assert_eq!(worker.state(), ServiceState::Stopped);
    assert_eq!(store.state(), ServiceState::Stopped);

    // Stopped trees can come back.
    system.app.start().expect("failed to restart app");
    assert_eq!(system.app.state(), ServiceState::Running);
}

#[test]
fn app_refuses_to_init_without_required_config() {
    let app = AppService::create("bare-app");
    let err = app.init().unwrap_err();
    assert!(matches!(err, ServiceError::Transition(_)));
    assert_eq!(app.state(), ServiceState::New);

    app.core().config().set("APP_ENV", "test");
    app.init().expect("init should pass once APP_ENV is set");
}

#[test]
fn two_store_backends_make_the_abstract_key_ambiguous() {
    struct Owner {
        core: ServiceCore,
    }
    impl Service for Owner {
        fn core(&self) -> &ServiceCore {
            &self.core
        }
    }

    let registry = Arc::new(Registry::new());
    register_types(&registry);
    registry.register(MemoryStore::service_type());

    let owner: ServiceHandle = handle(Owner {
        core: ServiceCore::builder("sample.Owner")
            .name("owner")
            .registry(registry)
            .dependency(DependencySpec::new("store").with_type_name(STORE))
            .build(),
    });

    let err = owner.dependency("store").unwrap_err();
    assert!(matches!(
        err,
        ServiceError::Dependency(DependencyError::Ambiguous { .. })
    ));
}

#[test]
fn store_operations_are_gated_to_the_running_state() {
    let (store, service) = typed_handle(SqliteStore::new("store"));

    assert!(store.put("answer", "42").is_err());

    service.init().unwrap();
    service.start().unwrap();
    store.put("answer", "42").unwrap();
    assert_eq!(store.get("answer").unwrap(), Some("42".to_owned()));

    service.stop().unwrap();
    assert!(store.get("answer").is_err());
}
