//! Integration tests for automatic test binding

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, OnceLock};

use mockall::{automock, mock};
use mockwire::prelude::*;
use mockwire::{
    AutoBindModule, BindingsCollector, Error, KeyStatus, RunnerConfig, ScopedTestModule,
    SkipReason, TestRunnerBuilder, TestScopes, TEST_EAGER_SINGLETON, TEST_SINGLETON,
};
use mockwire_di::{DiError, DiResult, InjectionPoint, InjectionSite, Instance, Qualifier};

#[automock]
trait Engine: Send + Sync {
    fn start(&self) -> bool;
    fn rpm(&self) -> u32;
}

#[automock]
trait Radio: Send + Sync {
    fn station(&self) -> String;
}

struct DieselEngine {
    label: &'static str,
}

impl DieselEngine {
    fn new(label: &'static str) -> Self {
        Self { label }
    }
}

impl Engine for DieselEngine {
    fn start(&self) -> bool {
        true
    }

    fn rpm(&self) -> u32 {
        800
    }
}

struct Car {
    engine: Arc<dyn Engine>,
}

impl Car {
    fn turn_key(&self) -> bool {
        self.engine.start()
    }
}

struct Workshop {
    engine: Arc<DieselEngine>,
}

struct Garage {
    radio: Arc<Provider<dyn Radio>>,
}

struct FmRadio;

impl Radio for FmRadio {
    fn station(&self) -> String {
        "fm".to_string()
    }
}

struct Tuned(&'static str);

impl Radio for Tuned {
    fn station(&self) -> String {
        self.0.to_string()
    }
}

#[allow(dead_code)]
struct Order {
    quantity: u32,
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Fuel {
    Diesel,
    Petrol,
}

struct Tank {
    fuel: Arc<Fuel>,
}

enum Blank {}

struct Void {
    _blank: Arc<Blank>,
}

struct Settings;

static REGION: OnceLock<String> = OnceLock::new();

struct Ignition;

static IGNITIONS: AtomicUsize = AtomicUsize::new(0);

fn init_tracing() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
}

fn registry() -> Arc<TypeRegistry> {
    Arc::new(
        TypeRegistry::new()
            .with(TypeDescriptor::interface::<dyn Engine>().build())
            .with(TypeDescriptor::interface::<dyn Radio>().build())
            .with(
                TypeDescriptor::concrete::<DieselEngine>()
                    .constructor(vec![], |_| Ok(DieselEngine::new("real")))
                    .implements::<dyn Engine, _>(|e| e as Arc<dyn Engine>)
                    .build(),
            )
            .with(
                TypeDescriptor::concrete::<FmRadio>()
                    .constructor(vec![], |_| Ok(FmRadio))
                    .implements::<dyn Radio, _>(|r| r as Arc<dyn Radio>)
                    .build(),
            )
            .with(
                TypeDescriptor::concrete::<Car>()
                    .constructor(vec![Key::of::<dyn Engine>()], |args| {
                        Ok(Car {
                            engine: args.next::<dyn Engine>()?,
                        })
                    })
                    .build(),
            )
            .with(
                TypeDescriptor::concrete::<Workshop>()
                    .constructor(vec![Key::of::<DieselEngine>()], |args| {
                        Ok(Workshop {
                            engine: args.next::<DieselEngine>()?,
                        })
                    })
                    .build(),
            )
            .with(
                TypeDescriptor::concrete::<Garage>()
                    .constructor(
                        vec![Key::provider_of::<dyn Radio>(Some(Qualifier::named("am")))],
                        |args| {
                            Ok(Garage {
                                radio: args.next::<Provider<dyn Radio>>()?,
                            })
                        },
                    )
                    .build(),
            )
            .with(
                TypeDescriptor::concrete::<Order>()
                    .constructor(
                        vec![
                            Key::qualified::<u32>(Qualifier::assisted()),
                            Key::of::<dyn Engine>(),
                        ],
                        |args| {
                            let quantity = *args.next::<u32>()?;
                            args.next::<dyn Engine>()?;
                            Ok(Order { quantity })
                        },
                    )
                    .build(),
            )
            .with(TypeDescriptor::enumeration([Fuel::Diesel, Fuel::Petrol]).build())
            .with(TypeDescriptor::enumeration::<Blank, _>([]).build())
            .with(
                TypeDescriptor::concrete::<Tank>()
                    .constructor(vec![Key::of::<Fuel>()], |args| {
                        Ok(Tank {
                            fuel: args.next::<Fuel>()?,
                        })
                    })
                    .build(),
            )
            .with(
                TypeDescriptor::concrete::<Void>()
                    .constructor(vec![Key::of::<Blank>()], |args| {
                        Ok(Void {
                            _blank: args.next::<Blank>()?,
                        })
                    })
                    .build(),
            )
            .with(
                TypeDescriptor::concrete::<Settings>()
                    .static_member(vec![Key::named::<String>("region")], |args| {
                        let _ = REGION.set(args.next::<String>()?.to_string());
                        Ok(())
                    })
                    .build(),
            )
            .with(
                TypeDescriptor::concrete::<Ignition>()
                    .constructor(vec![], |_| {
                        IGNITIONS.fetch_add(1, Ordering::SeqCst);
                        Ok(Ignition)
                    })
                    .build(),
            ),
    )
}

/// Mocks that count the calls made on them
fn mockery(starts: Arc<AtomicUsize>) -> Arc<Mockery> {
    let spied = starts.clone();
    Arc::new(
        Mockery::new()
            .mock::<dyn Engine, _>(move || {
                let starts = starts.clone();
                let mut engine = MockEngine::new();
                engine.expect_start().returning(move || {
                    starts.fetch_add(1, Ordering::SeqCst);
                    false
                });
                engine.expect_rpm().return_const(0u32);
                Arc::new(engine) as Arc<dyn Engine>
            })
            .spy::<dyn Engine, _>(move |real| {
                let starts = spied.clone();
                let mut engine = MockEngine::new();
                let delegate = real.clone();
                engine.expect_start().returning(move || {
                    starts.fetch_add(1, Ordering::SeqCst);
                    delegate.start()
                });
                engine.expect_rpm().returning(move || real.rpm());
                Arc::new(engine) as Arc<dyn Engine>
            })
            .mock::<dyn Radio, _>(|| {
                let mut radio = MockRadio::new();
                radio.expect_station().return_const("mock".to_string());
                Arc::new(radio) as Arc<dyn Radio>
            })
            .mock::<DieselEngine, _>(|| Arc::new(DieselEngine::new("mock"))),
    )
}

fn runner(class: TestClass) -> TestRunnerBuilder {
    TestRunner::builder(class, registry(), mockery(Arc::new(AtomicUsize::new(0))))
}

fn car_test() -> TestClass {
    TestClass::new("CarTest")
        .inject(InjectionPoint::new(
            InjectionSite::Field,
            vec![Key::of::<Car>()],
        ))
        .test("turns_key", vec![Key::of::<dyn Engine>()])
}

#[test]
fn test_interface_dependency_is_mocked() {
    init_tracing();
    let starts = Arc::new(AtomicUsize::new(0));
    let runner = TestRunner::builder(car_test(), registry(), mockery(starts.clone()))
        .build()
        .unwrap();
    runner.begin_test().unwrap();

    let fixture = runner.create_fixture().unwrap();
    let car = fixture.get::<Car>().unwrap();
    let mut args = runner.method_arguments("turns_key", &[]).unwrap();
    let engine = args.next::<dyn Engine>().unwrap();
    assert!(std::ptr::addr_eq(Arc::as_ptr(&car.engine), Arc::as_ptr(&engine)));

    assert!(!car.turn_key());
    assert_eq!(starts.load(Ordering::SeqCst), 1);

    let resolutions = runner.resolutions().unwrap();
    assert_eq!(
        resolutions.status(&Key::of::<Car>()),
        KeyStatus::BoundConcrete { test_singleton: true }
    );
    assert_eq!(resolutions.status(&Key::of::<dyn Engine>()), KeyStatus::BoundMock);
    runner.end_test();
}

#[test]
fn test_spy_runs_real_logic() {
    let starts = Arc::new(AtomicUsize::new(0));
    let runner = TestRunner::builder(car_test(), registry(), mockery(starts.clone()))
        .inner_module(|b: &mut TestBinder<'_>| {
            b.bind_spy_as::<dyn Engine, DieselEngine>();
        })
        .build()
        .unwrap();
    runner.begin_test().unwrap();

    let car = runner.injector().get::<Car>().unwrap();
    assert!(car.turn_key());
    assert_eq!(car.engine.rpm(), 800);
    assert_eq!(starts.load(Ordering::SeqCst), 1);
    assert_eq!(
        runner.resolutions().unwrap().status(&Key::of::<dyn Engine>()),
        KeyStatus::Explicit
    );
}

#[test]
fn test_linked_target_resolves_through_spy() {
    let wrapped = Arc::new(AtomicUsize::new(0));
    let counter = wrapped.clone();
    let mockery = Arc::new(Mockery::new().spy::<DieselEngine, _>(move |real| {
        counter.fetch_add(1, Ordering::SeqCst);
        real
    }));
    let runner = TestRunner::builder(car_test(), registry(), mockery)
        .inner_module(|b: &mut TestBinder<'_>| {
            b.bind::<dyn Engine>().to::<DieselEngine>();
            b.bind_spy::<DieselEngine>();
        })
        .build()
        .unwrap();
    runner.begin_test().unwrap();

    let car = runner.injector().get::<Car>().unwrap();
    assert!(car.turn_key());
    assert_eq!(wrapped.load(Ordering::SeqCst), 1);
}

#[test]
fn test_named_constants_resolve_distinctly() {
    let class = TestClass::new("ConstantsTest").test(
        "reads_both",
        vec![Key::named::<String>("first"), Key::named::<String>("second")],
    );
    let runner = runner(class)
        .inner_module(|b: &mut TestBinder<'_>| {
            b.bind_constant("first", "alpha".to_string());
            b.bind_constant("second", "beta".to_string());
        })
        .build()
        .unwrap();

    let mut args = runner.method_arguments("reads_both", &[]).unwrap();
    assert_eq!(args.next::<String>().unwrap().as_str(), "alpha");
    assert_eq!(args.next::<String>().unwrap().as_str(), "beta");
    assert_eq!(args.remaining(), 0);
}

#[test]
fn test_force_mock_reaches_concrete_subtypes() {
    let class = TestClass::new("WorkshopTest").test("repairs", vec![Key::of::<Workshop>()]);
    let runner = runner(class)
        .inner_module(|b: &mut TestBinder<'_>| b.force_mock::<dyn Engine>())
        .build()
        .unwrap();

    let workshop = runner.injector().get::<Workshop>().unwrap();
    assert_eq!(workshop.engine.label, "mock");
    assert_eq!(
        runner.resolutions().unwrap().status(&Key::of::<DieselEngine>()),
        KeyStatus::BoundMock
    );
}

#[test]
fn test_explicit_binding_beats_force_mock() {
    let class = TestClass::new("WorkshopTest").test("repairs", vec![Key::of::<Workshop>()]);
    let runner = runner(class)
        .inner_module(|b: &mut TestBinder<'_>| {
            b.force_mock::<dyn Engine>();
            b.bind::<DieselEngine>().in_annotated_scope(TEST_SINGLETON);
        })
        .build()
        .unwrap();

    let workshop = runner.injector().get::<Workshop>().unwrap();
    assert_eq!(workshop.engine.label, "real");
    assert_eq!(
        runner.resolutions().unwrap().status(&Key::of::<DieselEngine>()),
        KeyStatus::Explicit
    );
}

#[test]
fn test_provider_dependency_is_unwrapped() {
    let class = TestClass::new("GarageTest").test("listens", vec![Key::of::<Garage>()]);
    let runner = runner(class).build().unwrap();

    let am = Key::named::<dyn Radio>("am");
    let resolutions = runner.resolutions().unwrap();
    assert_eq!(resolutions.status(&am), KeyStatus::BoundMock);
    assert!(resolutions.needed_keys().contains(&am));

    let garage = runner.injector().get::<Garage>().unwrap();
    assert_eq!(garage.radio.get().unwrap().station(), "mock");
}

#[test]
fn test_assisted_parameters_are_left_unbound() {
    let registry = registry();
    let class = TestClass::new("OrderTest").test("ships", vec![Key::of::<Order>()]);
    let module: Arc<dyn TestModule> = Arc::new(|_: &mut TestBinder<'_>| {});
    let auto = AutoBindModule::new(
        module,
        Arc::new(class),
        registry.clone(),
        mockery(Arc::new(AtomicUsize::new(0))),
        TestScopes::new(),
    );
    let installed = mockwire_di::elements(&auto);

    let assisted = Key::qualified::<u32>(Qualifier::assisted());
    let resolutions = auto.resolutions().unwrap();
    assert_eq!(
        resolutions.status(&assisted),
        KeyStatus::Skipped(SkipReason::Assisted)
    );
    assert_eq!(resolutions.status(&Key::of::<dyn Engine>()), KeyStatus::BoundMock);
    assert!(!resolutions.needed_keys().contains(&assisted));

    let bound = BindingsCollector::new(registry).collect_elements(&installed);
    assert!(!bound.contains(&assisted));
    assert!(bound.contains(&Key::of::<Order>()));
}

#[test]
fn test_singleton_per_key() {
    let class = TestClass::new("SingletonTest").test("drives", vec![Key::of::<Car>()]);
    let runner = runner(class)
        .inner_module(|b: &mut TestBinder<'_>| {
            b.bind_named::<DieselEngine>("left")
                .to_constructor(TypeRef::of::<DieselEngine>());
            b.bind_named::<DieselEngine>("right")
                .to_constructor(TypeRef::of::<DieselEngine>());
        })
        .build()
        .unwrap();
    runner.begin_test().unwrap();

    let first = runner.injector().get::<Car>().unwrap();
    let second = runner.injector().get::<Car>().unwrap();
    assert!(Arc::ptr_eq(&first, &second));

    let left = runner.injector().get_named::<DieselEngine>("left").unwrap();
    let right = runner.injector().get_named::<DieselEngine>("right").unwrap();
    assert!(!Arc::ptr_eq(&left, &right));

    runner.end_test();
    runner.begin_test().unwrap();
    let third = runner.injector().get::<Car>().unwrap();
    assert!(!Arc::ptr_eq(&first, &third));
}

#[test]
fn test_report_lists_explicit_then_automatic() {
    init_tracing();
    let config = RunnerConfig {
        report: true,
        ..RunnerConfig::default()
    };
    let runner = runner(car_test())
        .config(config)
        .inner_module(|b: &mut TestBinder<'_>| b.bind_constant("first", "alpha".to_string()))
        .build()
        .unwrap();

    let report = runner.report().unwrap();
    let (explicit, automatic) = report
        .trim_start_matches("*** EXPLICIT BINDINGS ***\n")
        .split_once("*** AUTOMATIC BINDINGS ***\n")
        .unwrap();
    assert!(explicit.contains(&format!(
        "  {} --> Instance of alloc::string::String ### No scope\n",
        Key::named::<String>("first")
    )));
    assert!(automatic.contains(&format!(
        "  {} --> Bound directly ### In scope {TEST_SINGLETON}\n",
        Key::of::<Car>()
    )));
    assert!(automatic.contains(&format!(
        "  {} --> Instance of mockwire::providers::MockProvider ### In scope {TEST_SINGLETON}\n",
        Key::of::<dyn Engine>()
    )));
    assert!(!automatic.contains(&Key::named::<String>("first").to_string()));
}

#[test]
fn test_no_report_unless_requested() {
    let runner = runner(car_test()).build().unwrap();
    assert!(runner.report().is_none());
}

#[test]
fn test_static_injection_gets_defaults() {
    let class = TestClass::new("SettingsTest");
    let runner = runner(class)
        .inner_module(|b: &mut TestBinder<'_>| b.binder().request_static_injection::<Settings>())
        .build()
        .unwrap();

    assert_eq!(REGION.get().map(String::as_str), Some(""));
    assert_eq!(
        runner
            .resolutions()
            .unwrap()
            .status(&Key::named::<String>("region")),
        KeyStatus::BoundDefault
    );
}

#[test]
fn test_exposed_private_binding_is_not_mocked() {
    let class = TestClass::new("RadioTest").test("tunes", vec![Key::of::<dyn Radio>()]);
    let runner = runner(class)
        .inner_module(|b: &mut TestBinder<'_>| {
            b.binder().private_module(|private| {
                private.bind::<dyn Radio>().to::<FmRadio>();
                private.expose(Key::of::<dyn Radio>());
            });
        })
        .build()
        .unwrap();

    let radio = runner.injector().get::<dyn Radio>().unwrap();
    assert_eq!(radio.station(), "fm");
    assert_eq!(
        runner.resolutions().unwrap().status(&Key::of::<dyn Radio>()),
        KeyStatus::Explicit
    );
}

#[test]
fn test_fan_out_over_all_bindings() {
    let class = TestClass::new("PlaylistTest")
        .test("plays", vec![all::<dyn Radio>()])
        .test("plays_car", vec![all_named::<dyn Radio>("car")])
        .test("pairs", vec![all::<dyn Radio>(), all_named::<dyn Radio>("car")])
        .test("silent", vec![]);
    let runner = runner(class)
        .inner_module(|b: &mut TestBinder<'_>| {
            b.bind_many_instances([Tuned("jazz"), Tuned("news")], |radio| {
                radio as Arc<dyn Radio>
            });
            b.bind_many_named_instances("car", [Tuned("traffic")], |radio| {
                radio as Arc<dyn Radio>
            });
        })
        .build()
        .unwrap();

    assert_eq!(runner.fan_out("plays").unwrap().len(), 3);
    assert_eq!(runner.fan_out("pairs").unwrap().len(), 3);
    assert_eq!(runner.fan_out("silent").unwrap(), vec![Vec::<Key>::new()]);

    let runs = runner.fan_out("plays_car").unwrap();
    assert_eq!(runs.len(), 1);
    let mut args = runner.method_arguments("plays_car", &runs[0]).unwrap();
    assert_eq!(args.next::<dyn Radio>().unwrap().station(), "traffic");

    let mut stations: Vec<String> = runner
        .fan_out("plays")
        .unwrap()
        .iter()
        .map(|run| {
            let mut args = runner.method_arguments("plays", run).unwrap();
            args.next::<dyn Radio>().unwrap().station()
        })
        .collect();
    stations.sort();
    assert_eq!(stations, vec!["jazz", "news", "traffic"]);

    let resolutions = runner.resolutions().unwrap();
    assert_eq!(resolutions.status(&all::<dyn Radio>()), KeyStatus::Unseen);
}

#[test]
fn test_unknown_method_is_an_error() {
    let runner = runner(car_test()).build().unwrap();
    assert!(matches!(
        runner.fan_out("missing"),
        Err(Error::UnknownMethod { .. })
    ));
}

#[test]
fn test_two_inner_modules_are_ambiguous() {
    let result = runner(car_test())
        .inner_module(|_: &mut TestBinder<'_>| {})
        .inner_module(|_: &mut TestBinder<'_>| {})
        .build();
    match result {
        Err(Error::AmbiguousModule { class }) => assert_eq!(class, "CarTest"),
        _ => panic!("expected an ambiguous module error"),
    }
}

#[test]
fn test_use_modules_replace_inner_module() {
    let radio_module: Arc<dyn Module + Send + Sync> = Arc::new(|b: &mut Binder| {
        b.bind::<dyn Radio>().to::<FmRadio>();
    });
    let class = TestClass::new("RadioTest").test("tunes", vec![Key::of::<dyn Radio>()]);
    let runner = runner(class)
        .inner_module(|_: &mut TestBinder<'_>| {})
        .inner_module(|_: &mut TestBinder<'_>| {})
        .use_modules(vec![radio_module], true)
        .build()
        .unwrap();

    assert_eq!(runner.injector().get::<dyn Radio>().unwrap().station(), "fm");
}

#[test]
fn test_collection_is_repeatable() {
    let registry = registry();
    let module: Arc<dyn TestModule> = Arc::new(|b: &mut TestBinder<'_>| {
        b.bind::<dyn Engine>().to::<DieselEngine>();
        b.bind_constant("first", "alpha".to_string());
        b.bind_spy::<DieselEngine>();
    });
    let scoped = ScopedTestModule::new(
        module,
        mockery(Arc::new(AtomicUsize::new(0))),
        TestScopes::new(),
    );
    let collector = BindingsCollector::new(registry);

    let first = collector.collect(&scoped);
    let second = collector.collect(&scoped);
    assert_eq!(first.records, second.records);
    assert!(first.contains(&Key::of::<dyn Engine>()));
}

#[test]
fn test_auto_bindings_never_override_explicit_ones() {
    let class = car_test().test("listens", vec![Key::of::<Garage>(), Key::of::<dyn Radio>()]);
    let runner = runner(class)
        .inner_module(|b: &mut TestBinder<'_>| {
            b.bind::<dyn Radio>().to::<FmRadio>();
            b.bind_mock::<dyn Engine>();
        })
        .build()
        .unwrap();

    assert!(runner.injector().overridden_keys().is_empty());
    assert_eq!(runner.injector().get::<dyn Radio>().unwrap().station(), "fm");
}

#[test]
fn test_eager_test_singletons_are_created_per_test() {
    let class = TestClass::new("IgnitionTest");
    let runner = runner(class)
        .inner_module(|b: &mut TestBinder<'_>| {
            b.bind::<Ignition>().in_annotated_scope(TEST_EAGER_SINGLETON);
        })
        .build()
        .unwrap();
    let before = IGNITIONS.load(Ordering::SeqCst);

    runner.begin_test().unwrap();
    assert_eq!(IGNITIONS.load(Ordering::SeqCst), before + 1);
    runner.injector().get::<Ignition>().unwrap();
    assert_eq!(IGNITIONS.load(Ordering::SeqCst), before + 1);

    runner.end_test();
    runner.begin_test().unwrap();
    assert_eq!(IGNITIONS.load(Ordering::SeqCst), before + 2);
}

#[test]
fn test_lifecycle_methods_of_ancestors_are_roots() {
    let base = Arc::new(TestClass::new("BaseTest").before("set_up", vec![Key::of::<Car>()]));
    let class = TestClass::new("DerivedTest").extends(base);
    let runner = runner(class).build().unwrap();

    assert_eq!(
        runner.resolutions().unwrap().status(&Key::of::<Car>()),
        KeyStatus::BoundConcrete { test_singleton: true }
    );
    let mut args = runner.method_arguments("set_up", &[]).unwrap();
    assert!(!args.next::<Car>().unwrap().turn_key());
}

#[test]
fn test_bare_provider_parameters_are_reported_together() {
    let raw = Key::new(TypeRef::raw_provider(), None);
    let class = TestClass::new("BrokenTest")
        .test("first", vec![raw.clone()])
        .test("second", vec![raw]);
    let error = match runner(class).build() {
        Err(Error::Di(error)) => error,
        Err(other) => panic!("unexpected error: {other}"),
        Ok(_) => panic!("expected a configuration error"),
    };
    assert!(matches!(error, DiError::Configuration(_)));
    let messages = error.messages();
    let bare: Vec<&String> = messages
        .iter()
        .filter(|m| m.contains("Cannot inject a Provider that has no type parameter"))
        .collect();
    assert_eq!(bare.len(), 2);
}

#[test]
fn test_enum_dependencies_get_their_first_variant() {
    let class = TestClass::new("TankTest").test("fills", vec![Key::of::<Tank>()]);
    let runner = runner(class).build().unwrap();

    let tank = runner.injector().get::<Tank>().unwrap();
    assert_eq!(*tank.fuel, Fuel::Diesel);
    assert_eq!(
        runner.resolutions().unwrap().status(&Key::of::<Fuel>()),
        KeyStatus::BoundDefault
    );
}

#[test]
fn test_enum_without_variants_fails_configuration() {
    let class = TestClass::new("VoidTest").test("empties", vec![Key::of::<Void>()]);
    let error = match runner(class).build() {
        Err(Error::Di(error)) => error,
        Err(other) => panic!("unexpected error: {other}"),
        Ok(_) => panic!("expected a configuration error"),
    };
    assert!(matches!(error, DiError::Configuration(_)));
    assert!(error
        .messages()
        .iter()
        .any(|m| m.contains("declares no variant")));
}

#[test]
fn test_container_type_roots_need_a_binding() {
    let class = TestClass::new("InspectorTest").test("inspects", vec![Key::of::<TypeRef>()]);
    let error = match runner(class).build() {
        Err(Error::Di(error)) => error,
        Err(other) => panic!("unexpected error: {other}"),
        Ok(_) => panic!("expected a configuration error"),
    };
    assert!(matches!(error, DiError::Configuration(_)));
    assert!(error
        .messages()
        .iter()
        .any(|m| m.contains("belongs to the container")));

    let class = TestClass::new("InjectorTest").test("injects", vec![Key::of::<Injector>()]);
    let runner = runner(class).build().unwrap();
    let mut args = runner.method_arguments("injects", &[]).unwrap();
    assert!(args.next::<Injector>().is_ok());
}

#[test]
fn test_without_module_nothing_is_auto_bound_when_disabled() {
    let config = RunnerConfig {
        auto_bind_mocks_without_module: false,
        ..RunnerConfig::default()
    };
    let runner = runner(car_test()).config(config).build().unwrap();

    assert!(runner.resolutions().is_none());
    assert!(runner.injector().get::<Car>().is_err());
}

mock! {
    Fabric {}

    impl MockFactory for Fabric {
        fn create_mock(&self, ty: &TypeRef) -> DiResult<Instance>;
        fn create_spy(&self, ty: &TypeRef, real: Instance) -> DiResult<Instance>;
    }
}

#[test]
fn test_one_mock_per_test_singleton_scope() {
    let mut fabric = MockFabric::new();
    fabric
        .expect_create_mock()
        .withf(|ty| *ty == TypeRef::of::<dyn Engine>())
        .times(2)
        .returning(|_| {
            let mut engine = MockEngine::new();
            engine.expect_start().return_const(false);
            Ok(Instance::new(Arc::new(engine) as Arc<dyn Engine>))
        });
    fabric.expect_create_spy().never();

    let runner = TestRunner::builder(car_test(), registry(), Arc::new(fabric))
        .build()
        .unwrap();

    runner.begin_test().unwrap();
    let first = runner.injector().get::<dyn Engine>().unwrap();
    let again = runner.injector().get::<dyn Engine>().unwrap();
    assert!(Arc::ptr_eq(&first, &again));
    runner.end_test();

    runner.begin_test().unwrap();
    let second = runner.injector().get::<dyn Engine>().unwrap();
    assert!(!Arc::ptr_eq(&first, &second));
}

#[test]
fn test_missing_mock_registration_fails_at_resolution() {
    let runner = TestRunner::builder(car_test(), registry(), Arc::new(Mockery::new()))
        .build()
        .unwrap();
    match runner.injector().get::<dyn Engine>() {
        Err(error) => assert!(error.to_string().contains("no mock is registered")),
        Ok(_) => panic!("expected a provisioning failure"),
    }
}

#[cfg(feature = "config")]
#[test]
fn test_runner_from_toml_config() {
    let config = RunnerConfig::from_toml(
        r#"
        report = true
        stage = "tool"
        "#,
    )
    .unwrap();
    let runner = runner(car_test()).config(config).build().unwrap();
    assert!(runner.report().is_some());
    assert_eq!(runner.injector().stage(), mockwire_di::Stage::Tool);
}
