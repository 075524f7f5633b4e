//! Providers that hand out mocks and spies
//!
//! None of them cache anything: reuse is left to the scope the binding is
//! declared in.

use std::sync::Arc;

use mockwire_di::{DiError, DiResult, Injector, Instance, InstanceProvider, Key, TypeRef};

use crate::mock::MockFactory;

/// A new bare mock of its type on every request
pub struct MockProvider {
    ty: TypeRef,
    factory: Arc<dyn MockFactory>,
}

impl MockProvider {
    pub fn new(ty: TypeRef, factory: Arc<dyn MockFactory>) -> Self {
        Self { ty, factory }
    }
}

impl InstanceProvider for MockProvider {
    fn get(&self, _injector: &Injector) -> DiResult<Instance> {
        self.factory.create_mock(&self.ty)
    }
}

/// A fresh spy around one fixed, immutable instance
pub struct SpyImmutableInstanceProvider {
    ty: TypeRef,
    instance: Instance,
    factory: Arc<dyn MockFactory>,
}

impl SpyImmutableInstanceProvider {
    pub fn new(ty: TypeRef, instance: Instance, factory: Arc<dyn MockFactory>) -> Self {
        Self {
            ty,
            instance,
            factory,
        }
    }
}

impl InstanceProvider for SpyImmutableInstanceProvider {
    fn get(&self, _injector: &Injector) -> DiResult<Instance> {
        self.factory.create_spy(&self.ty, self.instance.clone())
    }
}

/// Spies on a really constructed instance fetched through a relay key
pub struct SpyProvider {
    ty: TypeRef,
    relay: Key,
    factory: Arc<dyn MockFactory>,
}

impl SpyProvider {
    pub fn new(ty: TypeRef, relay: Key, factory: Arc<dyn MockFactory>) -> Self {
        Self { ty, relay, factory }
    }
}

impl InstanceProvider for SpyProvider {
    fn get(&self, injector: &Injector) -> DiResult<Instance> {
        let real = injector.get_instance(&self.relay)?;
        let real = if self.relay.type_ref() == &self.ty {
            real
        } else {
            injector
                .introspector()
                .upcast(&real, self.relay.type_ref(), &self.ty)
                .ok_or_else(|| DiError::MissingUpcast {
                    from: self.relay.type_ref().to_string(),
                    to: self.ty.to_string(),
                })?
        };
        self.factory.create_spy(&self.ty, real)
    }

    fn dependencies(&self) -> Vec<Key> {
        vec![self.relay.clone()]
    }
}
