//! Canonical zero values for value-like types

use std::any::TypeId;
use std::sync::OnceLock;

use mockwire_di::{Instance, Introspector, TypeKind, TypeRef};
use rustc_hash::FxHashMap;

fn table() -> &'static FxHashMap<TypeId, Instance> {
    static TABLE: OnceLock<FxHashMap<TypeId, Instance>> = OnceLock::new();
    TABLE.get_or_init(|| {
        let mut table = FxHashMap::default();
        let mut put = |instance: Instance, id: TypeId| {
            table.insert(id, instance);
        };
        put(Instance::of(String::new()), TypeId::of::<String>());
        put(Instance::of(""), TypeId::of::<&'static str>());
        put(Instance::of(false), TypeId::of::<bool>());
        put(Instance::of('\0'), TypeId::of::<char>());
        put(Instance::of(0i8), TypeId::of::<i8>());
        put(Instance::of(0i16), TypeId::of::<i16>());
        put(Instance::of(0i32), TypeId::of::<i32>());
        put(Instance::of(0i64), TypeId::of::<i64>());
        put(Instance::of(0i128), TypeId::of::<i128>());
        put(Instance::of(0isize), TypeId::of::<isize>());
        put(Instance::of(0u8), TypeId::of::<u8>());
        put(Instance::of(0u16), TypeId::of::<u16>());
        put(Instance::of(0u32), TypeId::of::<u32>());
        put(Instance::of(0u64), TypeId::of::<u64>());
        put(Instance::of(0u128), TypeId::of::<u128>());
        put(Instance::of(0usize), TypeId::of::<usize>());
        put(Instance::of(0.0f32), TypeId::of::<f32>());
        put(Instance::of(0.0f64), TypeId::of::<f64>());
        table
    })
}

/// Outcome of looking up a default for a type
#[derive(Debug, Clone)]
pub enum PrimitiveDefault {
    Value(Instance),
    /// An enum that declares no variant
    EmptyEnum,
}

/// Default value of `ty`, `None` when it is not value-like
pub fn default_for(ty: &TypeRef, introspector: &dyn Introspector) -> Option<PrimitiveDefault> {
    if let Some(value) = table().get(&ty.id()) {
        return Some(PrimitiveDefault::Value(value.clone()));
    }
    let descriptor = introspector.describe(ty)?;
    if descriptor.kind() != TypeKind::Enum {
        return None;
    }
    Some(match descriptor.default_value() {
        Some(value) => PrimitiveDefault::Value(value.clone()),
        None => PrimitiveDefault::EmptyEnum,
    })
}

pub fn is_primitive(ty: &TypeRef, introspector: &dyn Introspector) -> bool {
    default_for(ty, introspector).is_some()
}
