//! Auto-binding decisions

use std::any::TypeId;

use mockwire_di::{is_framework_type, Instance, Introspector, Key, TypeRef};
use rustc_hash::FxHashMap;

use crate::defaults::{default_for, is_primitive, PrimitiveDefault};

/// Types registered through `force_mock`, memoized per concrete type
#[derive(Debug, Default)]
pub struct ForceMockRegistry {
    roots: Vec<TypeRef>,
    memo: FxHashMap<TypeId, bool>,
}

impl ForceMockRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, ty: TypeRef) {
        if !self.roots.contains(&ty) {
            self.roots.push(ty);
            self.memo.clear();
        }
    }

    pub fn is_empty(&self) -> bool {
        self.roots.is_empty()
    }

    /// `ty` or one of its ancestors was force-mocked
    pub fn should_force_mock(&mut self, ty: &TypeRef, introspector: &dyn Introspector) -> bool {
        if let Some(&known) = self.memo.get(&ty.id()) {
            return known;
        }
        let result = self
            .roots
            .iter()
            .any(|root| root == ty || introspector.is_subtype(ty, root));
        self.memo.insert(ty.id(), result);
        result
    }

    pub fn memoized(&self) -> usize {
        self.memo.len()
    }
}

/// Belongs to the container and is never bound or mocked
pub fn is_core_type(ty: &TypeRef, introspector: &dyn Introspector) -> bool {
    is_framework_type(ty)
        || introspector
            .describe(ty)
            .is_some_and(|descriptor| descriptor.is_internal())
}

/// Concrete, constructible and neither value-like nor a container type
pub fn can_be_injected(ty: &TypeRef, introspector: &dyn Introspector) -> bool {
    if is_primitive(ty, introspector) || is_core_type(ty, introspector) {
        return false;
    }
    introspector
        .describe(ty)
        .is_some_and(|descriptor| descriptor.is_instantiable())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    FrameworkType,
    Assisted,
    /// A provider that the container supplies by itself
    Provider,
    /// An enum without variants, reported as a configuration error
    EmptyEnum,
}

/// What to bind a needed key that nothing binds yet
#[derive(Debug, Clone)]
pub enum Decision {
    Skip(SkipReason),
    Default(Instance),
    EmptyEnum,
    Mock,
}

pub fn decide_unresolved(key: &Key, introspector: &dyn Introspector) -> Decision {
    let ty = key.type_ref();
    if is_core_type(ty, introspector) {
        return Decision::Skip(SkipReason::FrameworkType);
    }
    if key.is_assisted() {
        return Decision::Skip(SkipReason::Assisted);
    }
    match default_for(ty, introspector) {
        Some(PrimitiveDefault::Value(value)) => Decision::Default(value),
        Some(PrimitiveDefault::EmptyEnum) => Decision::EmptyEnum,
        None if ty.is_provider() => Decision::Skip(SkipReason::Provider),
        None => Decision::Mock,
    }
}
