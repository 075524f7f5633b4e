//! Scopes whose cached instances live for one test

use std::fmt;
use std::sync::Arc;

use mockwire_di::{Binder, DiResult, Instance, Key, Scope, SingletonScope};
use tracing::trace;

/// Annotation name of the per-test singleton scope
pub const TEST_SINGLETON: &str = "TestSingleton";

/// Annotation name of the per-test singleton scope created before each test
pub const TEST_EAGER_SINGLETON: &str = "TestEagerSingleton";

/// A named instance cache, emptied between tests
#[derive(Debug)]
pub struct TestScope {
    name: &'static str,
    cache: SingletonScope,
}

impl TestScope {
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            cache: SingletonScope::new(),
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn len(&self) -> usize {
        self.cache.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cache.is_empty()
    }

    pub fn clear(&self) {
        trace!("Clearing {} scope ({} instances)", self.name, self.cache.len());
        self.cache.clear();
    }
}

impl Scope for TestScope {
    fn scope(&self, key: &Key, create: &dyn Fn() -> DiResult<Instance>) -> DiResult<Instance> {
        self.cache.scope(key, create)
    }
}

impl fmt::Display for TestScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

/// The two test scopes owned by one runner
#[derive(Debug, Clone)]
pub struct TestScopes {
    pub singleton: Arc<TestScope>,
    pub eager_singleton: Arc<TestScope>,
}

impl TestScopes {
    pub fn new() -> Self {
        Self {
            singleton: Arc::new(TestScope::new(TEST_SINGLETON)),
            eager_singleton: Arc::new(TestScope::new(TEST_EAGER_SINGLETON)),
        }
    }

    pub fn clear(&self) {
        self.singleton.clear();
        self.eager_singleton.clear();
    }
}

impl Default for TestScopes {
    fn default() -> Self {
        Self::new()
    }
}

/// Binds both scope annotations to `scopes`
pub fn bind_scopes(binder: &mut Binder, scopes: &TestScopes) {
    binder.bind_scope(TEST_SINGLETON, scopes.singleton.clone());
    binder.bind_scope(TEST_EAGER_SINGLETON, scopes.eager_singleton.clone());
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clear_forgets_instances() {
        let scopes = TestScopes::new();
        let key = Key::of::<u32>();
        let first = scopes
            .singleton
            .scope(&key, &|| Ok(Instance::of(1u32)))
            .unwrap();
        let again = scopes
            .singleton
            .scope(&key, &|| Ok(Instance::of(2u32)))
            .unwrap();
        assert!(first.same(&again));
        assert_eq!(scopes.singleton.len(), 1);

        scopes.clear();
        assert!(scopes.singleton.is_empty());
        let fresh = scopes
            .singleton
            .scope(&key, &|| Ok(Instance::of(3u32)))
            .unwrap();
        assert_eq!(*fresh.downcast::<u32>().unwrap(), 3);
    }

    #[test]
    fn test_display_is_annotation_name() {
        let scopes = TestScopes::default();
        assert_eq!(scopes.singleton.to_string(), TEST_SINGLETON);
        assert_eq!(scopes.eager_singleton.name(), TEST_EAGER_SINGLETON);
    }
}
