//! Test modules and the binder they configure
//!
//! A [`TestModule`] declares the bindings of one test class through a
//! [`TestBinder`], which adds mock, spy and multi-binding helpers on top of
//! the container's [`Binder`].

use std::any::type_name;
use std::sync::Arc;

use mockwire_di::{Binder, BindingBuilder, Instance, Key, Module, Qualifier, TypeRef};

use crate::mock::MockFactory;
use crate::providers::{MockProvider, SpyImmutableInstanceProvider, SpyProvider};
use crate::scope::{bind_scopes, TestScope, TestScopes};
use crate::test_class::INTERNAL;

/// Bindings of a test class
pub trait TestModule: Send + Sync {
    fn configure_test(&self, binder: &mut TestBinder<'_>);

    /// Bind whatever the test needs but the module leaves unbound
    fn auto_bind(&self) -> bool {
        true
    }

    /// Render the binding report once the injector is created
    fn report(&self) -> bool {
        false
    }
}

impl<F> TestModule for F
where
    F: Fn(&mut TestBinder<'_>) + Send + Sync,
{
    fn configure_test(&self, binder: &mut TestBinder<'_>) {
        self(binder)
    }
}

pub struct TestBinder<'a> {
    binder: &'a mut Binder,
    factory: Arc<dyn MockFactory>,
    scopes: TestScopes,
    forced: Vec<TypeRef>,
}

impl<'a> TestBinder<'a> {
    pub fn new(binder: &'a mut Binder, factory: Arc<dyn MockFactory>, scopes: TestScopes) -> Self {
        Self {
            binder,
            factory,
            scopes,
            forced: Vec::new(),
        }
    }

    /// The underlying container binder
    pub fn binder(&mut self) -> &mut Binder {
        &mut *self.binder
    }

    pub fn test_singleton(&self) -> &Arc<TestScope> {
        &self.scopes.singleton
    }

    pub fn bind<T: ?Sized + 'static>(&mut self) -> BindingBuilder<'_> {
        self.binder.bind::<T>()
    }

    pub fn bind_named<T: ?Sized + 'static>(&mut self, name: impl Into<String>) -> BindingBuilder<'_> {
        self.binder.bind_named::<T>(name)
    }

    pub fn bind_key(&mut self, key: Key) -> BindingBuilder<'_> {
        self.binder.bind_key(key)
    }

    pub fn bind_constant<T: Send + Sync + 'static>(&mut self, name: impl Into<String>, value: T) {
        self.binder.bind_constant(name, value);
    }

    pub fn install(&mut self, module: &dyn Module) {
        self.binder.install(module);
    }

    pub fn bind_mock<T: ?Sized + Send + Sync + 'static>(&mut self) -> BindingBuilder<'_> {
        self.bind_new_mock(Key::of::<T>())
    }

    pub fn bind_named_mock<T: ?Sized + Send + Sync + 'static>(
        &mut self,
        name: impl Into<String>,
    ) -> BindingBuilder<'_> {
        self.bind_new_mock(Key::named::<T>(name))
    }

    fn bind_new_mock(&mut self, key: Key) -> BindingBuilder<'_> {
        let provider = Arc::new(MockProvider::new(key.type_ref().clone(), self.factory.clone()));
        self.binder.bind_key(key).to_provider(provider)
    }

    /// Spy on a really constructed `T`
    pub fn bind_spy<T: Send + Sync + 'static>(&mut self) -> BindingBuilder<'_> {
        let relay = Key::qualified::<T>(Qualifier::marker(INTERNAL));
        self.bind_new_spy(Key::of::<T>(), relay, TypeRef::of::<T>())
    }

    pub fn bind_named_spy<T: Send + Sync + 'static>(
        &mut self,
        name: impl Into<String>,
    ) -> BindingBuilder<'_> {
        let name = name.into();
        let relay = Key::qualified::<T>(Qualifier::annotation(INTERNAL, name.clone()));
        self.bind_new_spy(Key::named::<T>(name), relay, TypeRef::of::<T>())
    }

    /// Spy on `T` built from the real constructor of `C`, a declared subtype
    pub fn bind_spy_as<T, C>(&mut self) -> BindingBuilder<'_>
    where
        T: ?Sized + Send + Sync + 'static,
        C: Send + Sync + 'static,
    {
        let relay = Key::qualified::<C>(Qualifier::marker(INTERNAL));
        self.bind_new_spy(Key::of::<T>(), relay, TypeRef::of::<C>())
    }

    fn bind_new_spy(&mut self, key: Key, relay: Key, real: TypeRef) -> BindingBuilder<'_> {
        self.binder.bind_key(relay.clone()).to_constructor(real);
        let provider = Arc::new(SpyProvider::new(
            key.type_ref().clone(),
            relay,
            self.factory.clone(),
        ));
        self.binder.bind_key(key).to_provider(provider)
    }

    /// A fresh spy of `instance` on each request
    pub fn bind_spy_instance<T: ?Sized + Send + Sync + 'static>(
        &mut self,
        instance: Arc<T>,
    ) -> BindingBuilder<'_> {
        let provider = Arc::new(SpyImmutableInstanceProvider::new(
            TypeRef::of::<T>(),
            Instance::new(instance),
            self.factory.clone(),
        ));
        self.binder.bind::<T>().to_provider(provider)
    }

    /// Binds each value, upcast to `T`, under its own unique key of type `T`
    pub fn bind_many_instances<T, V, I, F>(&mut self, values: I, upcast: F)
    where
        T: ?Sized + Send + Sync + 'static,
        V: Send + Sync + 'static,
        I: IntoIterator<Item = V>,
        F: Fn(Arc<V>) -> Arc<T>,
    {
        self.bind_instances(None, values, upcast);
    }

    /// Like [`Self::bind_many_instances`], in a group an `All` parameter can select
    pub fn bind_many_named_instances<T, V, I, F>(
        &mut self,
        name: impl Into<String>,
        values: I,
        upcast: F,
    ) where
        T: ?Sized + Send + Sync + 'static,
        V: Send + Sync + 'static,
        I: IntoIterator<Item = V>,
        F: Fn(Arc<V>) -> Arc<T>,
    {
        self.bind_instances(Some(name.into()), values, upcast);
    }

    fn bind_instances<T, V, I, F>(&mut self, name: Option<String>, values: I, upcast: F)
    where
        T: ?Sized + Send + Sync + 'static,
        V: Send + Sync + 'static,
        I: IntoIterator<Item = V>,
        F: Fn(Arc<V>) -> Arc<T>,
    {
        for value in values {
            let instance = Instance::new(upcast(Arc::new(value))).with_type_name(type_name::<V>());
            self.binder
                .bind_key(Key::qualified::<T>(Qualifier::unique(name.clone())))
                .to_erased(instance);
        }
    }

    /// Binds `T` under a unique key to each of `targets`, in the test singleton scope
    pub fn bind_many<T: ?Sized + 'static>(&mut self, targets: &[TypeRef]) {
        self.bind_targets::<T>(None, targets);
    }

    pub fn bind_many_named<T: ?Sized + 'static>(&mut self, name: impl Into<String>, targets: &[TypeRef]) {
        self.bind_targets::<T>(Some(name.into()), targets);
    }

    fn bind_targets<T: ?Sized + 'static>(&mut self, name: Option<String>, targets: &[TypeRef]) {
        for target in targets {
            let scope = self.scopes.singleton.clone();
            self.binder
                .bind_key(Key::qualified::<T>(Qualifier::unique(name.clone())))
                .to_key(Key::new(target.clone(), None))
                .in_scope(scope);
        }
    }

    /// Mock every concrete type deriving from `T` instead of building it
    pub fn force_mock<T: ?Sized + 'static>(&mut self) {
        self.forced.push(TypeRef::of::<T>());
    }

    pub fn forced_types(&self) -> &[TypeRef] {
        &self.forced
    }
}

/// Installs a test module as it is, without auto-binding
pub struct ScopedTestModule {
    module: Arc<dyn TestModule>,
    factory: Arc<dyn MockFactory>,
    scopes: TestScopes,
}

impl ScopedTestModule {
    pub fn new(module: Arc<dyn TestModule>, factory: Arc<dyn MockFactory>, scopes: TestScopes) -> Self {
        Self {
            module,
            factory,
            scopes,
        }
    }
}

impl Module for ScopedTestModule {
    fn configure(&self, binder: &mut Binder) {
        bind_scopes(binder, &self.scopes);
        let mut test_binder = TestBinder::new(binder, self.factory.clone(), self.scopes.clone());
        self.module.configure_test(&mut test_binder);
    }
}

/// Stand-in for a test class that declares no module
#[derive(Debug, Clone, Copy)]
pub struct EmptyTestModule {
    pub auto_bind: bool,
}

impl TestModule for EmptyTestModule {
    fn configure_test(&self, _binder: &mut TestBinder<'_>) {}

    fn auto_bind(&self) -> bool {
        self.auto_bind
    }
}

/// Test module made of plain container modules
pub struct UseModules {
    modules: Vec<Arc<dyn Module + Send + Sync>>,
    auto_bind_mocks: bool,
}

impl UseModules {
    pub fn new(modules: Vec<Arc<dyn Module + Send + Sync>>) -> Self {
        Self {
            modules,
            auto_bind_mocks: true,
        }
    }

    pub fn auto_bind_mocks(mut self, enabled: bool) -> Self {
        self.auto_bind_mocks = enabled;
        self
    }
}

impl TestModule for UseModules {
    fn configure_test(&self, binder: &mut TestBinder<'_>) {
        for module in &self.modules {
            binder.install(module.as_ref());
        }
    }

    fn auto_bind(&self) -> bool {
        self.auto_bind_mocks
    }
}
