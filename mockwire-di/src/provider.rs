//! Provider interfaces and the providers the container hands out

use std::any::type_name;
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

use crate::error::DiResult;
use crate::injector::{Injector, WeakInjector};
use crate::instance::Instance;
use crate::key::{Key, TypeRef};
use crate::types::Args;

/// Produces instances on demand for a provider binding
pub trait InstanceProvider: Send + Sync {
    fn get(&self, injector: &Injector) -> DiResult<Instance>;

    /// Keys this provider needs the injector to satisfy
    fn dependencies(&self) -> Vec<Key> {
        Vec::new()
    }

    /// Type name shown in binding reports
    fn type_name(&self) -> &'static str {
        type_name::<Self>()
    }
}

/// Lazily resolves `T` from the injector it was obtained from
pub struct Provider<T: ?Sized> {
    injector: WeakInjector,
    key: Key,
    _marker: PhantomData<fn() -> Arc<T>>,
}

impl<T: ?Sized + Send + Sync + 'static> Provider<T> {
    pub(crate) fn new(injector: &Injector, key: Key) -> Self {
        Self {
            injector: injector.downgrade(),
            key,
            _marker: PhantomData,
        }
    }

    pub fn key(&self) -> &Key {
        &self.key
    }

    pub fn get(&self) -> DiResult<Arc<T>> {
        self.injector.upgrade()?.get_key::<T>(&self.key)
    }
}

impl<T: ?Sized> Clone for Provider<T> {
    fn clone(&self) -> Self {
        Self {
            injector: self.injector.clone(),
            key: self.key.clone(),
            _marker: PhantomData,
        }
    }
}

impl<T: ?Sized> fmt::Debug for Provider<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Provider<{}>", self.key)
    }
}

/// The provider type with no type argument; it cannot be satisfied
#[derive(Debug, Clone, Copy)]
pub struct RawProvider;

/// Injects the members of instances created outside the container
pub struct MembersInjector<T: ?Sized> {
    injector: WeakInjector,
    ty: TypeRef,
    _marker: PhantomData<fn(&T)>,
}

impl<T: ?Sized + Send + Sync + 'static> MembersInjector<T> {
    pub(crate) fn new(injector: &Injector, ty: TypeRef) -> Self {
        let ty = ty.wrapped_type().cloned().unwrap_or(ty);
        Self {
            injector: injector.downgrade(),
            ty,
            _marker: PhantomData,
        }
    }

    pub fn inject_members(&self, target: &Arc<T>) -> DiResult<()> {
        self.injector
            .upgrade()?
            .inject_members(&Instance::new(target.clone()), &self.ty)
    }
}

/// Provider built from a closure and the keys it consumes
pub struct FnProvider {
    dependencies: Vec<Key>,
    provide: Arc<dyn Fn(&mut Args) -> DiResult<Instance> + Send + Sync>,
    type_name: &'static str,
}

impl FnProvider {
    pub fn new<T, F>(dependencies: Vec<Key>, provide: F) -> Self
    where
        T: ?Sized + Send + Sync + 'static,
        F: Fn(&mut Args) -> DiResult<Arc<T>> + Send + Sync + 'static,
    {
        Self {
            dependencies,
            provide: Arc::new(move |args: &mut Args| provide(args).map(Instance::new)),
            type_name: type_name::<F>(),
        }
    }
}

impl InstanceProvider for FnProvider {
    fn get(&self, injector: &Injector) -> DiResult<Instance> {
        let mut args = injector.resolve_all(&self.dependencies)?;
        (self.provide)(&mut args)
    }

    fn dependencies(&self) -> Vec<Key> {
        self.dependencies.clone()
    }

    fn type_name(&self) -> &'static str {
        self.type_name
    }
}

impl fmt::Debug for FnProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnProvider")
            .field("dependencies", &self.dependencies)
            .finish()
    }
}
