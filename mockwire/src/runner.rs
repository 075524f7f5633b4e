//! Glue between a test class and its injector
//!
//! A [`TestRunner`] picks the test module of a class, observes its bindings,
//! lets [`AutoBindModule`] fill the gaps and builds the injector once for the
//! whole class. Each test then starts from empty test scopes.

use std::sync::Arc;

use mockwire_di::{elements, Args, DiError, Injector, Instance, Introspector, Key, Module, Qualifier};
use tracing::{debug, trace};

use crate::autobind::AutoBindModule;
use crate::collector::BindingsCollector;
use crate::config::RunnerConfig;
use crate::error::{Error, Result};
use crate::mock::MockFactory;
use crate::module::{EmptyTestModule, ScopedTestModule, TestModule, UseModules};
use crate::report::render_report;
use crate::scope::{TestScopes, TEST_EAGER_SINGLETON};
use crate::test_class::{all_group, is_all, TestClass, ALL_DEFAULT};
use crate::walker::Resolutions;

/// Creates a [`TestRunner`]
pub struct TestRunnerBuilder {
    test_class: Arc<TestClass>,
    introspector: Arc<dyn Introspector>,
    factory: Arc<dyn MockFactory>,
    inner_modules: Vec<Arc<dyn TestModule>>,
    use_modules: Option<UseModules>,
    config: RunnerConfig,
}

impl TestRunnerBuilder {
    pub fn new(
        test_class: TestClass,
        introspector: Arc<dyn Introspector>,
        factory: Arc<dyn MockFactory>,
    ) -> Self {
        Self {
            test_class: Arc::new(test_class),
            introspector,
            factory,
            inner_modules: Vec::new(),
            use_modules: None,
            config: RunnerConfig::default(),
        }
    }

    /// A test module declared by the test class
    pub fn inner_module(mut self, module: impl TestModule + 'static) -> Self {
        self.inner_modules.push(Arc::new(module));
        self
    }

    /// Plain modules to install instead of any inner test module
    pub fn use_modules(
        mut self,
        modules: Vec<Arc<dyn Module + Send + Sync>>,
        auto_bind_mocks: bool,
    ) -> Self {
        self.use_modules = Some(UseModules::new(modules).auto_bind_mocks(auto_bind_mocks));
        self
    }

    pub fn config(mut self, config: RunnerConfig) -> Self {
        self.config = config;
        self
    }

    fn select_module(&mut self) -> Result<Arc<dyn TestModule>> {
        if let Some(modules) = self.use_modules.take() {
            return Ok(Arc::new(modules));
        }
        match self.inner_modules.len() {
            0 => Ok(Arc::new(EmptyTestModule {
                auto_bind: self.config.auto_bind_mocks_without_module,
            })),
            1 => Ok(self.inner_modules.remove(0)),
            _ => Err(Error::AmbiguousModule {
                class: self.test_class.name().to_string(),
            }),
        }
    }

    pub fn build(mut self) -> Result<TestRunner> {
        let module = self.select_module()?;
        let scopes = TestScopes::new();
        let stage = self.config.stage.into();
        let scoped = ScopedTestModule::new(module.clone(), self.factory.clone(), scopes.clone());

        if !module.auto_bind() {
            let injector = Injector::builder(self.introspector.clone())
                .stage(stage)
                .module(&scoped)
                .build()?;
            return Ok(TestRunner {
                test_class: self.test_class,
                injector,
                scopes,
                report: None,
                resolutions: None,
            });
        }

        let collector = BindingsCollector::new(self.introspector.clone());
        let explicit = collector.collect(&scoped);
        for message in &explicit.messages {
            debug!("Test module message: {}", message);
        }

        let auto = AutoBindModule::new(
            module.clone(),
            self.test_class.clone(),
            self.introspector.clone(),
            self.factory.clone(),
            scopes.clone(),
        )
        .with_observed(explicit);
        let installed = elements(&auto);
        let injector = Injector::builder(self.introspector.clone())
            .stage(stage)
            .elements(installed.clone())
            .build()?;

        let report = if self.config.report || module.report() {
            let all = collector.collect_elements(&installed);
            let report = render_report(&auto.observed().records, &all.records)?;
            debug!("Bindings of {}:\n{}", self.test_class.name(), report);
            Some(report)
        } else {
            None
        };

        Ok(TestRunner {
            test_class: self.test_class,
            injector,
            scopes,
            report,
            resolutions: auto.resolutions(),
        })
    }
}

/// Values injected into a test instance
#[derive(Debug, Default)]
pub struct Fixture {
    values: Vec<(Key, Instance)>,
}

impl Fixture {
    pub fn get<T: ?Sized + Send + Sync + 'static>(&self) -> Option<Arc<T>> {
        self.get_key(&Key::of::<T>())
    }

    pub fn get_named<T: ?Sized + Send + Sync + 'static>(&self, name: &str) -> Option<Arc<T>> {
        self.get_key(&Key::named::<T>(name))
    }

    pub fn get_key<T: ?Sized + Send + Sync + 'static>(&self, key: &Key) -> Option<Arc<T>> {
        self.values
            .iter()
            .find(|(k, _)| k == key)
            .and_then(|(_, instance)| instance.downcast::<T>())
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

pub struct TestRunner {
    test_class: Arc<TestClass>,
    injector: Injector,
    scopes: TestScopes,
    report: Option<String>,
    resolutions: Option<Resolutions>,
}

impl TestRunner {
    pub fn builder(
        test_class: TestClass,
        introspector: Arc<dyn Introspector>,
        factory: Arc<dyn MockFactory>,
    ) -> TestRunnerBuilder {
        TestRunnerBuilder::new(test_class, introspector, factory)
    }

    pub fn injector(&self) -> &Injector {
        &self.injector
    }

    pub fn test_class(&self) -> &TestClass {
        &self.test_class
    }

    /// The binding report, when one was requested
    pub fn report(&self) -> Option<&str> {
        self.report.as_deref()
    }

    /// Auto-binding outcome, `None` for a module that does not auto-bind
    pub fn resolutions(&self) -> Option<&Resolutions> {
        self.resolutions.as_ref()
    }

    /// Empties the test scopes and creates the test eager singletons
    pub fn begin_test(&self) -> Result<()> {
        self.scopes.clear();
        let mut created = 0;
        for key in self.injector.binding_keys() {
            if self.injector.scope_of(&key).as_deref() == Some(TEST_EAGER_SINGLETON) {
                self.injector.get_instance(&key)?;
                created += 1;
            }
        }
        trace!("Created {} test eager singletons", created);
        Ok(())
    }

    /// Drops every instance cached for the finished test
    pub fn end_test(&self) {
        self.scopes.clear();
    }

    /// Resolves the injection points of the test class
    pub fn create_fixture(&self) -> Result<Fixture> {
        let mut values = Vec::new();
        for class in self.test_class.hierarchy() {
            for point in class.injection_points() {
                if point.optional
                    && !point
                        .dependencies
                        .iter()
                        .all(|key| self.injector.can_resolve(key))
                {
                    continue;
                }
                for key in &point.dependencies {
                    values.push((key.clone(), self.injector.get_instance(key)?));
                }
            }
        }
        Ok(Fixture { values })
    }

    /// Arguments of method `name`; `All` parameters take the keys of `assignment` in order
    pub fn method_arguments(&self, name: &str, assignment: &[Key]) -> Result<Args> {
        let method = self
            .test_class
            .find_method(name)
            .ok_or_else(|| Error::UnknownMethod {
                class: self.test_class.name().to_string(),
                method: name.to_string(),
            })?;
        let mut assigned = assignment.iter();
        let mut values = Vec::with_capacity(method.parameters.len());
        for parameter in &method.parameters {
            let key = if is_all(parameter) {
                assigned.next().ok_or_else(|| {
                    DiError::Other(format!("No binding assigned to {parameter} of {name}"))
                })?
            } else {
                parameter
            };
            values.push((key.clone(), self.injector.get_instance(key)?));
        }
        Ok(Args::new(values))
    }

    /// Every combination of bindings for the `All` parameters of method `name`
    pub fn fan_out(&self, name: &str) -> Result<Vec<Vec<Key>>> {
        let method = self
            .test_class
            .find_method(name)
            .ok_or_else(|| Error::UnknownMethod {
                class: self.test_class.name().to_string(),
                method: name.to_string(),
            })?;
        let choices: Vec<Vec<Key>> = method
            .parameters
            .iter()
            .filter_map(|parameter| Some((parameter, all_group(parameter)?)))
            .map(|(parameter, group)| self.candidates(parameter, group))
            .collect();

        let mut combinations = vec![Vec::new()];
        for options in &choices {
            combinations = combinations
                .iter()
                .flat_map(|prefix| {
                    options.iter().map(move |option| {
                        let mut combination = prefix.clone();
                        combination.push(option.clone());
                        combination
                    })
                })
                .collect();
        }
        debug!("{} expands into {} runs", name, combinations.len());
        Ok(combinations)
    }

    fn candidates(&self, parameter: &Key, group: &str) -> Vec<Key> {
        let bindings = self.injector.find_bindings_by_type(parameter.type_ref());
        if group == ALL_DEFAULT {
            return bindings;
        }
        bindings
            .into_iter()
            .filter(|key| {
                matches!(
                    key.qualifier(),
                    Some(Qualifier::Unique { name: Some(name), .. }) if name == group
                )
            })
            .collect()
    }
}
