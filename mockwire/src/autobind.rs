//! The module that binds everything a test needs
//!
//! [`AutoBindModule`] installs the user's test module, then walks from the
//! bindings observed in a prior dry run and from the test class's own
//! injection points, binding concrete types to their constructors and every
//! remaining abstraction to a mock.

use std::sync::Arc;

use mockwire_di::{has_just_in_time_binding, Binder, Introspector, Key, Message, Module};
use parking_lot::Mutex;
use rustc_hash::FxHashSet;
use tracing::{debug, trace};

use crate::collector::CollectedBindings;
use crate::mock::MockFactory;
use crate::module::{TestBinder, TestModule};
use crate::policy::{decide_unresolved, Decision, ForceMockRegistry, SkipReason};
use crate::providers::MockProvider;
use crate::scope::{bind_scopes, TestScopes};
use crate::test_class::{is_all, TestClass};
use crate::walker::{ensure_provided_key, KeyStatus, ResolutionState, Resolutions, Walker};

pub struct AutoBindModule {
    module: Arc<dyn TestModule>,
    test_class: Arc<TestClass>,
    introspector: Arc<dyn Introspector>,
    factory: Arc<dyn MockFactory>,
    scopes: TestScopes,
    observed: CollectedBindings,
    resolutions: Mutex<Option<Resolutions>>,
}

impl AutoBindModule {
    pub fn new(
        module: Arc<dyn TestModule>,
        test_class: Arc<TestClass>,
        introspector: Arc<dyn Introspector>,
        factory: Arc<dyn MockFactory>,
        scopes: TestScopes,
    ) -> Self {
        Self {
            module,
            test_class,
            introspector,
            factory,
            scopes,
            observed: CollectedBindings::default(),
            resolutions: Mutex::new(None),
        }
    }

    /// Attaches the bindings a dry run of the test module observed
    pub fn with_observed(mut self, observed: CollectedBindings) -> Self {
        self.observed = observed;
        self
    }

    pub fn observed(&self) -> &CollectedBindings {
        &self.observed
    }

    /// Outcome of the last configuration
    pub fn resolutions(&self) -> Option<Resolutions> {
        self.resolutions.lock().clone()
    }

    /// Adds the keys the test class injects itself; returns them
    fn class_roots(&self, walker: &mut Walker<'_>, errors: &mut Vec<Message>) -> FxHashSet<Key> {
        let mut roots = FxHashSet::default();
        for class in self.test_class.hierarchy() {
            for method in class.methods() {
                for key in method.parameters.iter().filter(|key| !is_all(key)) {
                    match ensure_provided_key(key) {
                        Ok(key) => {
                            roots.insert(key.clone());
                            walker.add_test_root(key);
                        }
                        Err(text) => errors.push(
                            Message::new(text).with_source(format!("{}::{}", class.name(), method.name)),
                        ),
                    }
                }
            }
            for point in class.injection_points() {
                for key in &point.dependencies {
                    match ensure_provided_key(key) {
                        Ok(key) => {
                            roots.insert(key.clone());
                            walker.add_test_root(key);
                        }
                        Err(text) => errors.push(Message::new(text).with_source(class.name())),
                    }
                }
            }
        }
        roots
    }

    fn bind_unresolved(
        &self,
        binder: &mut Binder,
        mut state: ResolutionState,
        roots: &FxHashSet<Key>,
    ) -> Resolutions {
        for key in state.unresolved() {
            let status = match decide_unresolved(&key, self.introspector.as_ref()) {
                Decision::Skip(SkipReason::FrameworkType)
                    if roots.contains(&key)
                        && !has_just_in_time_binding(&key, self.introspector.as_ref()) =>
                {
                    binder.add_error(format!(
                        "No implementation for {key} can be bound: {} belongs to the container",
                        key.type_ref()
                    ));
                    KeyStatus::Skipped(SkipReason::FrameworkType)
                }
                Decision::Skip(reason) => KeyStatus::Skipped(reason),
                Decision::Default(value) => {
                    binder.bind_key(key.clone()).to_erased(value);
                    KeyStatus::BoundDefault
                }
                Decision::EmptyEnum => {
                    binder.add_error(format!(
                        "No default value for {key}: {} declares no variant",
                        key.type_ref()
                    ));
                    KeyStatus::Skipped(SkipReason::EmptyEnum)
                }
                Decision::Mock => {
                    let provider =
                        Arc::new(MockProvider::new(key.type_ref().clone(), self.factory.clone()));
                    binder
                        .bind_key(key.clone())
                        .to_provider(provider)
                        .in_scope(self.scopes.singleton.clone());
                    KeyStatus::BoundMock
                }
            };
            trace!("{} -> {:?}", key, status);
            state.settle(&key, status);
        }
        state.into_resolutions()
    }
}

impl Module for AutoBindModule {
    fn configure(&self, binder: &mut Binder) {
        bind_scopes(binder, &self.scopes);
        let forced = {
            let mut test_binder = TestBinder::new(binder, self.factory.clone(), self.scopes.clone());
            self.module.configure_test(&mut test_binder);
            test_binder.forced_types().to_vec()
        };

        let mut force_mock = ForceMockRegistry::new();
        for ty in forced {
            force_mock.add(ty);
        }

        let mut errors = Vec::new();
        let mut walker = Walker::new(
            self.introspector.as_ref(),
            &mut force_mock,
            binder,
            self.scopes.singleton.clone(),
        );
        for key in self.observed.keys() {
            walker.observe(key.clone());
        }
        for record in &self.observed.records {
            if let Some(key) = record.target.bound_key() {
                walker.add_binding_root(key.clone());
            }
            for key in record.target.dependencies() {
                walker.add_binding_root(key);
            }
        }
        for key in &self.observed.static_dependencies {
            walker.add_binding_root(key.clone());
        }
        let roots = self.class_roots(&mut walker, &mut errors);
        walker.run();
        let state = walker.into_state();

        let resolutions = self.bind_unresolved(binder, state, &roots);
        for error in errors {
            binder.add_message(error);
        }

        debug!(
            "Auto-bound {} of {} needed keys for {}",
            resolutions.auto_bound_keys().len(),
            resolutions.needed_keys().len(),
            self.test_class.name()
        );
        *self.resolutions.lock() = Some(resolutions);
    }
}
