use std::sync::Arc;
use std::time::Duration;

use service_framework::mock::{journal, ProbeService};
use service_framework::{
    handle, DependencyError, DependencySpec, Registry, ResolutionError, Service, ServiceCore,
    ServiceError, ServiceHandle, ServiceState, ServiceType, TransitionError, TypeResolver,
};

// --- Test service ---

struct TestService {
    core: ServiceCore,
}

impl Service for TestService {
    fn core(&self) -> &ServiceCore {
        &self.core
    }
}

fn test_service(core: ServiceCore) -> ServiceHandle {
    handle(TestService { core })
}

fn probe_type(key: &'static str, events: &service_framework::mock::Journal) -> ServiceType {
    let events = events.clone();
    ServiceType::concrete(key, move |name| ProbeService::create(name, &events))
}

#[test]
fn lifecycle_propagates_in_attachment_order_and_reverses_on_stop() {
    let events = journal();
    let root = ProbeService::create("root", &events);
    let a = ProbeService::create("a", &events);
    let b = ProbeService::create("b", &events);
    root.attach(&a).unwrap();
    root.attach(&b).unwrap();
    events.lock().clear();

    root.init().unwrap();
    root.start().unwrap();
    root.stop().unwrap();

    let recorded = events.lock().clone();
    let position = |event: &str| {
        recorded
            .iter()
            .position(|e| e == event)
            .unwrap_or_else(|| panic!("missing {event} in {recorded:?}"))
    };

    // init and start visit a before b.
    assert!(position("a:initialized") < position("b:initializing"));
    assert!(position("a:started") < position("b:starting"));
    // stop visits b before a.
    assert!(position("b:stopped") < position("a:stopping"));
    // The parent completes each pass after its children.
    assert!(position("b:started") < position("root:started"));
    assert!(position("a:stopped") < position("root:stopped"));
}

#[test]
fn reload_is_a_running_self_transition_in_reverse_order() {
    let events = journal();
    let root = ProbeService::create("root", &events);
    let a = ProbeService::create("a", &events);
    let b = ProbeService::create("b", &events);
    root.attach(&a).unwrap();
    root.attach(&b).unwrap();
    root.init().unwrap();
    root.start().unwrap();
    events.lock().clear();

    root.reload().unwrap();
    assert_eq!(root.state(), ServiceState::Running);

    let recorded = events.lock().clone();
    let position = |event: &str| recorded.iter().position(|e| e == event).unwrap();
    assert!(position("b:reloaded") < position("a:reloading"));
}

#[test]
fn lifecycle_calls_outside_source_states_are_rejected() {
    let service = ProbeService::detached("loner");

    // start before init
    let err = service.start().unwrap_err();
    assert!(matches!(
        err,
        ServiceError::Transition(TransitionError::InvalidTransition { .. })
    ));
    assert_eq!(service.state(), ServiceState::New);

    // reload before running
    service.init().unwrap();
    assert!(service.reload().is_err());
    assert_eq!(service.state(), ServiceState::Initialized);
}

#[test]
fn child_failure_aborts_remaining_siblings_without_rollback() {
    let events = journal();
    let root = ProbeService::create("root", &events);
    let a = ProbeService::create("a", &events);
    let b = ProbeService::failing("b", &events, "starting");
    let c = ProbeService::create("c", &events);
    root.attach(&a).unwrap();
    root.attach(&b).unwrap();
    root.attach(&c).unwrap();
    root.init().unwrap();

    let err = root.start().unwrap_err();
    assert!(matches!(
        err,
        ServiceError::Transition(TransitionError::Hook(_))
    ));

    // a kept its transition, b and the parent never advanced, c was never
    // visited.
    assert_eq!(a.state(), ServiceState::Running);
    assert_eq!(b.state(), ServiceState::Initialized);
    assert_eq!(c.state(), ServiceState::Initialized);
    assert_eq!(root.state(), ServiceState::Initialized);
    assert!(!events.lock().iter().any(|e| e == "c:starting"));
}

#[test]
fn declared_dependency_attaches_one_concrete_implementation() {
    let events = journal();
    let registry = Arc::new(Registry::new());
    registry.register(ServiceType::abstract_type("test.Store"));
    registry.register(probe_type("test.SqliteStore", &events).implements("test.Store"));

    let owner = test_service(
        ServiceCore::builder("test.Owner")
            .name("owner")
            .registry(registry)
            .dependency(DependencySpec::new("db").with_type_name("test.Store"))
            .build(),
    );

    owner.init().unwrap();

    let db = owner.dependency("db").unwrap();
    assert_eq!(db.core().fully_qualified_type(), "framework.ProbeService");
    assert_eq!(db.core().name(), "db");
    assert_eq!(db.state(), ServiceState::Initialized);

    // Second access returns the identical attached instance.
    let again = owner.dependency("db").unwrap();
    assert!(Arc::ptr_eq(&db, &again));
    assert_eq!(owner.services().len(), 1);
}

#[test]
fn dependency_type_can_come_from_config() {
    let registry = Arc::new(Registry::new());
    registry.register(probe_type("test.MemoryStore", &journal()));

    let owner = test_service(
        ServiceCore::builder("test.Owner")
            .name("owner")
            .registry(registry)
            .config_value("STORE_TYPE", "test.MemoryStore")
            .dependency(DependencySpec::new("store").with_config_key("STORE_TYPE"))
            .build(),
    );

    owner.init().unwrap();
    assert!(owner.services().by_name("store").first().is_some());
}

#[test]
fn unresolvable_dependency_fails_init() {
    let registry = Arc::new(Registry::new());
    registry.register(ServiceType::abstract_type("test.Store"));

    let owner = test_service(
        ServiceCore::builder("test.Owner")
            .name("owner")
            .registry(registry)
            .dependency(DependencySpec::new("db").with_type_name("test.Store"))
            .build(),
    );

    // No concrete implementation registered: init aborts, state unchanged.
    assert!(owner.init().is_err());
    assert_eq!(owner.state(), ServiceState::New);

    let err = owner.dependency("db").unwrap_err();
    assert!(matches!(
        err,
        ServiceError::Dependency(DependencyError::NoImplementation(_))
    ));
}

#[test]
fn resolver_distinguishes_missing_names_from_load_failures() {
    // A resolver that knows "test.Broken" exists but cannot finish loading
    // it, and defers everything else to the registry.
    struct FlakyResolver {
        registry: Arc<Registry>,
    }

    impl TypeResolver for FlakyResolver {
        fn resolve(&self, name: &str) -> Result<ServiceType, ResolutionError> {
            if name == "test.Broken" {
                return Err(ResolutionError::Dependency {
                    name: name.to_owned(),
                    dependency: "test.MissingPiece".to_owned(),
                });
            }
            self.registry.resolve(name)
        }
    }

    let registry = Arc::new(Registry::new());
    let resolver = Arc::new(FlakyResolver {
        registry: registry.clone(),
    });

    let owner = test_service(
        ServiceCore::builder("test.Owner")
            .name("owner")
            .registry(registry)
            .resolver(resolver)
            .dependency(DependencySpec::new("feed").with_type_name("test.Broken"))
            .dependency(DependencySpec::new("ghost").with_type_name("test.Ghost"))
            .build(),
    );

    match owner.dependency("feed").unwrap_err() {
        ServiceError::Dependency(DependencyError::Resolution(ResolutionError::Dependency {
            name,
            dependency,
        })) => {
            assert_eq!(name, "test.Broken");
            assert_eq!(dependency, "test.MissingPiece");
        }
        other => panic!("expected a load failure, got {other:?}"),
    }

    match owner.dependency("ghost").unwrap_err() {
        ServiceError::Dependency(DependencyError::Resolution(ResolutionError::NotFound(name))) => {
            assert_eq!(name, "test.Ghost");
        }
        other => panic!("expected a missing name, got {other:?}"),
    }
}

#[test]
fn undeclared_dependency_is_reported() {
    let owner = test_service(ServiceCore::builder("test.Owner").name("owner").build());
    let err = owner.dependency("ghost").unwrap_err();
    assert!(matches!(
        err,
        ServiceError::Dependency(DependencyError::Undeclared(_))
    ));
}

#[test]
fn detach_removes_the_child_from_all_queries() {
    let events = journal();
    let root = ProbeService::create("root", &events);
    let worker = ProbeService::create("worker", &events);
    root.attach(&worker).unwrap();

    assert!(root.services().by_name("worker").first().is_some());
    assert_eq!(root.services().by_type("framework.ProbeService").len(), 1);

    root.detach(&worker).unwrap();
    assert!(root.services().by_name("worker").first().is_none());
    assert!(root.services().by_state(ServiceState::New).is_empty());
    assert!(worker.parent().is_none());
    assert!(events.lock().iter().any(|e| e == "worker:detached->root"));

    // Detaching again is a reported error.
    let err = root.detach(&worker).unwrap_err();
    assert!(matches!(err, ServiceError::NotAttached { .. }));
}

#[test]
fn attaching_an_attached_service_moves_it() {
    let events = journal();
    let first = ProbeService::create("first", &events);
    let second = ProbeService::create("second", &events);
    let child = ProbeService::create("child", &events);

    first.attach(&child).unwrap();
    second.attach(&child).unwrap();

    assert!(first.services().is_empty());
    assert_eq!(second.services().len(), 1);
    let parent = child.parent().unwrap();
    assert_eq!(parent.core().name(), "second");
}

#[test]
fn lifecycle_history_and_predicates_track_the_walk() {
    let service = ProbeService::detached("tracked");
    let lifecycle = service.core().lifecycle();
    assert!(lifecycle.is_new());
    assert!(!lifecycle.is_started());

    service.init().unwrap();
    service.start().unwrap();
    assert!(lifecycle.is_running());
    assert!(lifecycle.is_started());

    service.stop().unwrap();
    assert!(lifecycle.is_stopped());
    assert!(lifecycle.is_started());
    assert_eq!(
        lifecycle.playback(),
        vec![
            ServiceState::New,
            ServiceState::Initialized,
            ServiceState::Running,
            ServiceState::Stopped,
        ]
    );
}

#[test]
fn join_unblocks_when_a_concurrent_stop_lands() {
    let service = ProbeService::detached("joined");
    service.init().unwrap();
    service.start().unwrap();

    let waiter = {
        let service = service.clone();
        std::thread::spawn(move || service.join(Some(Duration::from_secs(5))))
    };
    std::thread::sleep(Duration::from_millis(20));
    service.stop().unwrap();

    assert!(waiter.join().unwrap());
    assert!(service.join(Some(Duration::from_millis(1))));
}

#[test]
fn records_snapshot_and_rebuild_a_tree() {
    let events = journal();
    let registry = Arc::new(Registry::new());
    registry.register(probe_type("framework.ProbeService", &events));

    let root = ProbeService::create("root", &events);
    let worker = ProbeService::create("worker", &events);
    root.attach(&worker).unwrap();
    root.core().config().set("DEBUG", true);

    let record = root.to_record();
    assert_eq!(record.name, "root");
    assert_eq!(record.services.len(), 1);
    assert_eq!(record.services[0].name, "worker");

    let rebuilt = record.build(&registry).unwrap();
    assert_eq!(rebuilt.core().name(), "root");
    assert_eq!(rebuilt.state(), ServiceState::New);
    assert_eq!(
        rebuilt.core().config().get("DEBUG"),
        Some(serde_json::json!(true))
    );
    assert_eq!(rebuilt.services().len(), 1);
}
