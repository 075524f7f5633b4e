//! The mocking collaborator
//!
//! Mocks and spies are produced by a [`MockFactory`]. [`Mockery`] is the
//! stock implementation: a registry of per-type constructors, usually backed
//! by `mockall` generated mocks.

use std::any::TypeId;
use std::sync::Arc;

use mockwire_di::{DiError, DiResult, Instance, Key, TypeRef};
use parking_lot::RwLock;
use rustc_hash::FxHashMap;
use tracing::trace;

/// Produces mocks and spies for types
pub trait MockFactory: Send + Sync {
    /// A fresh mock with no real behaviour
    fn create_mock(&self, ty: &TypeRef) -> DiResult<Instance>;

    /// A verifiable wrapper that delegates to `real`
    fn create_spy(&self, ty: &TypeRef, real: Instance) -> DiResult<Instance>;
}

type MockFn = Arc<dyn Fn() -> Instance + Send + Sync>;
type SpyFn = Arc<dyn Fn(Instance) -> DiResult<Instance> + Send + Sync>;

/// Registry of mock and spy constructors keyed by type
#[derive(Default)]
pub struct Mockery {
    mocks: RwLock<FxHashMap<TypeId, MockFn>>,
    spies: RwLock<FxHashMap<TypeId, SpyFn>>,
}

impl Mockery {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers how to mock `T`
    pub fn mock<T, F>(self, create: F) -> Self
    where
        T: ?Sized + Send + Sync + 'static,
        F: Fn() -> Arc<T> + Send + Sync + 'static,
    {
        self.register_mock(create);
        self
    }

    pub fn register_mock<T, F>(&self, create: F)
    where
        T: ?Sized + Send + Sync + 'static,
        F: Fn() -> Arc<T> + Send + Sync + 'static,
    {
        self.mocks.write().insert(
            TypeId::of::<T>(),
            Arc::new(move || Instance::new(create())),
        );
    }

    /// Registers how to wrap a real `T` into a spy
    pub fn spy<T, F>(self, wrap: F) -> Self
    where
        T: ?Sized + Send + Sync + 'static,
        F: Fn(Arc<T>) -> Arc<T> + Send + Sync + 'static,
    {
        self.register_spy(wrap);
        self
    }

    pub fn register_spy<T, F>(&self, wrap: F)
    where
        T: ?Sized + Send + Sync + 'static,
        F: Fn(Arc<T>) -> Arc<T> + Send + Sync + 'static,
    {
        let ty = TypeRef::of::<T>();
        self.spies.write().insert(
            TypeId::of::<T>(),
            Arc::new(move |real: Instance| {
                let real = real.downcast::<T>().ok_or_else(|| DiError::TypeMismatch {
                    key: Key::new(ty.clone(), None),
                    expected: ty.name(),
                    actual: real.type_name(),
                })?;
                Ok(Instance::new(wrap(real)))
            }),
        );
    }

    pub fn can_mock(&self, ty: &TypeRef) -> bool {
        self.mocks.read().contains_key(&ty.id())
    }
}

impl MockFactory for Mockery {
    fn create_mock(&self, ty: &TypeRef) -> DiResult<Instance> {
        let create = self.mocks.read().get(&ty.id()).cloned().ok_or_else(|| {
            DiError::ProvisionFailed {
                key: Key::new(ty.clone(), None),
                reason: format!("no mock is registered for {ty}"),
            }
        })?;
        trace!("Creating mock of {}", ty);
        Ok(create())
    }

    fn create_spy(&self, ty: &TypeRef, real: Instance) -> DiResult<Instance> {
        let wrap = self.spies.read().get(&ty.id()).cloned().ok_or_else(|| {
            DiError::ProvisionFailed {
                key: Key::new(ty.clone(), None),
                reason: format!("no spy is registered for {ty}"),
            }
        })?;
        trace!("Creating spy of {}", ty);
        wrap(real)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    trait Counter: Send + Sync {
        fn count(&self) -> usize;
    }

    struct Fixed(usize);

    impl Counter for Fixed {
        fn count(&self) -> usize {
            self.0
        }
    }

    struct Recording {
        real: Arc<dyn Counter>,
        calls: AtomicUsize,
    }

    impl Counter for Recording {
        fn count(&self) -> usize {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.real.count()
        }
    }

    #[test]
    fn test_mock_is_fresh_each_time() {
        let mockery = Mockery::new().mock::<dyn Counter, _>(|| Arc::new(Fixed(0)) as Arc<dyn Counter>);
        let ty = TypeRef::of::<dyn Counter>();
        assert!(mockery.can_mock(&ty));
        let a = mockery.create_mock(&ty).unwrap();
        let b = mockery.create_mock(&ty).unwrap();
        assert!(!a.same(&b));
        assert_eq!(a.downcast::<dyn Counter>().unwrap().count(), 0);
    }

    #[test]
    fn test_spy_delegates_to_real_instance() {
        let mockery = Mockery::new().spy::<dyn Counter, _>(|real| {
            Arc::new(Recording {
                real,
                calls: AtomicUsize::new(0),
            }) as Arc<dyn Counter>
        });
        let ty = TypeRef::of::<dyn Counter>();
        let real: Arc<dyn Counter> = Arc::new(Fixed(3));
        let spy = mockery.create_spy(&ty, Instance::new(real)).unwrap();
        assert_eq!(spy.downcast::<dyn Counter>().unwrap().count(), 3);
    }

    #[test]
    fn test_unregistered_type_fails() {
        let mockery = Mockery::new();
        let error = mockery.create_mock(&TypeRef::of::<Fixed>()).unwrap_err();
        assert!(error.to_string().contains("no mock is registered"));
    }
}
