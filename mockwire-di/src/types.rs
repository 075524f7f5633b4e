//! Type descriptors and the introspection capability
//!
//! Rust has no runtime reflection, so every type the container constructs or
//! auto-binds is described once through a [`TypeDescriptor`]: its kind, its
//! constructor dependencies, its injectable members and the ancestors it can
//! be upcast to. An [`Introspector`] hands those descriptors out by type.

use std::any::{type_name, TypeId};
use std::collections::VecDeque;
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

use parking_lot::RwLock;
use rustc_hash::{FxHashMap, FxHashSet};

use crate::error::{DiError, DiResult};
use crate::instance::Instance;
use crate::key::{Key, TypeRef};

/// Broad classification of a described type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeKind {
    Concrete,
    Abstract,
    Interface,
    Enum,
}

/// Where an injection point lives on its type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InjectionSite {
    Constructor,
    Field,
    Method,
}

/// A constructor, field or method together with the keys it requires
#[derive(Debug, Clone)]
pub struct InjectionPoint {
    pub site: InjectionSite,
    pub dependencies: Vec<Key>,
    /// Skipped when one of its dependencies cannot be resolved
    pub optional: bool,
}

impl InjectionPoint {
    pub fn new(site: InjectionSite, dependencies: Vec<Key>) -> Self {
        Self {
            site,
            dependencies,
            optional: false,
        }
    }

    pub fn optional(mut self) -> Self {
        self.optional = true;
        self
    }
}

/// Resolved dependencies, consumed in declaration order
pub struct Args {
    values: std::vec::IntoIter<(Key, Instance)>,
}

impl Args {
    pub fn new(values: Vec<(Key, Instance)>) -> Self {
        Self {
            values: values.into_iter(),
        }
    }

    /// Next argument as the type its key promised
    pub fn next<T: ?Sized + Send + Sync + 'static>(&mut self) -> DiResult<Arc<T>> {
        let (key, instance) = self.pop()?;
        instance.downcast::<T>().ok_or(DiError::TypeMismatch {
            key,
            expected: type_name::<T>(),
            actual: instance.type_name(),
        })
    }

    /// Next argument, left erased
    pub fn next_instance(&mut self) -> DiResult<Instance> {
        self.pop().map(|(_, instance)| instance)
    }

    pub fn remaining(&self) -> usize {
        self.values.len()
    }

    fn pop(&mut self) -> DiResult<(Key, Instance)> {
        self.values
            .next()
            .ok_or_else(|| {
                DiError::Other("injection point consumed more arguments than it declared".to_string())
            })
    }
}

pub type BuildFn = Arc<dyn Fn(&mut Args) -> DiResult<Instance> + Send + Sync>;
pub type InjectFn = Arc<dyn Fn(&Instance, &mut Args) -> DiResult<()> + Send + Sync>;
pub type StaticInjectFn = Arc<dyn Fn(&mut Args) -> DiResult<()> + Send + Sync>;
pub type UpcastFn = Arc<dyn Fn(&Instance) -> Option<Instance> + Send + Sync>;

#[derive(Clone)]
pub struct Constructor {
    point: InjectionPoint,
    build: BuildFn,
}

impl Constructor {
    pub fn point(&self) -> &InjectionPoint {
        &self.point
    }

    pub fn build(&self, args: &mut Args) -> DiResult<Instance> {
        (self.build)(args)
    }
}

#[derive(Clone)]
pub struct Member {
    point: InjectionPoint,
    inject: InjectFn,
}

impl Member {
    pub fn point(&self) -> &InjectionPoint {
        &self.point
    }

    pub fn inject(&self, target: &Instance, args: &mut Args) -> DiResult<()> {
        (self.inject)(target, args)
    }
}

#[derive(Clone)]
pub struct StaticMember {
    point: InjectionPoint,
    inject: StaticInjectFn,
}

impl StaticMember {
    pub fn point(&self) -> &InjectionPoint {
        &self.point
    }

    pub fn inject(&self, args: &mut Args) -> DiResult<()> {
        (self.inject)(args)
    }
}

/// A supertype together with the conversion into it
#[derive(Clone)]
pub struct Ancestor {
    ty: TypeRef,
    upcast: UpcastFn,
}

impl Ancestor {
    pub fn type_ref(&self) -> &TypeRef {
        &self.ty
    }
}

/// Everything the container knows about one type
#[derive(Clone)]
pub struct TypeDescriptor {
    ty: TypeRef,
    kind: TypeKind,
    singleton: bool,
    internal: bool,
    ancestors: Vec<Ancestor>,
    constructor: Option<Constructor>,
    members: Vec<Member>,
    static_members: Vec<StaticMember>,
    default_value: Option<Instance>,
}

impl TypeDescriptor {
    fn empty(ty: TypeRef, kind: TypeKind) -> Self {
        Self {
            ty,
            kind,
            singleton: false,
            internal: false,
            ancestors: Vec::new(),
            constructor: None,
            members: Vec::new(),
            static_members: Vec::new(),
            default_value: None,
        }
    }

    pub fn concrete<T: Send + Sync + 'static>() -> TypeBuilder<T> {
        TypeBuilder::new(TypeKind::Concrete)
    }

    pub fn interface<T: ?Sized + Send + Sync + 'static>() -> TypeBuilder<T> {
        TypeBuilder::new(TypeKind::Interface)
    }

    pub fn abstract_class<T: ?Sized + Send + Sync + 'static>() -> TypeBuilder<T> {
        TypeBuilder::new(TypeKind::Abstract)
    }

    /// An enumerated type; the first variant becomes its default value
    pub fn enumeration<T, I>(variants: I) -> TypeBuilder<T>
    where
        T: Send + Sync + 'static,
        I: IntoIterator<Item = T>,
    {
        let mut builder = TypeBuilder::new(TypeKind::Enum);
        builder.descriptor.default_value = variants.into_iter().next().map(Instance::of);
        builder
    }

    pub fn type_ref(&self) -> &TypeRef {
        &self.ty
    }

    pub fn kind(&self) -> TypeKind {
        self.kind
    }

    /// Carries the process-level singleton marker
    pub fn is_singleton(&self) -> bool {
        self.singleton
    }

    /// Belongs to the framework and must never be bound or mocked
    pub fn is_internal(&self) -> bool {
        self.internal
    }

    pub fn ancestors(&self) -> &[Ancestor] {
        &self.ancestors
    }

    pub fn constructor(&self) -> Option<&Constructor> {
        self.constructor.as_ref()
    }

    pub fn members(&self) -> &[Member] {
        &self.members
    }

    pub fn static_members(&self) -> &[StaticMember] {
        &self.static_members
    }

    /// First declared variant of an enum
    pub fn default_value(&self) -> Option<&Instance> {
        self.default_value.as_ref()
    }

    /// Concrete and constructible by the container
    pub fn is_instantiable(&self) -> bool {
        self.kind == TypeKind::Concrete && self.constructor.is_some()
    }

    /// Keys required to build an instance: constructor plus non-optional members
    pub fn required_keys(&self) -> Vec<Key> {
        let mut keys: Vec<Key> = self
            .constructor
            .iter()
            .flat_map(|c| c.point.dependencies.iter().cloned())
            .collect();
        for member in self.members.iter().filter(|m| !m.point.optional) {
            keys.extend(member.point.dependencies.iter().cloned());
        }
        keys
    }
}

impl fmt::Debug for TypeDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TypeDescriptor")
            .field("type", &self.ty)
            .field("kind", &self.kind)
            .field("singleton", &self.singleton)
            .field("constructor", &self.constructor.as_ref().map(|c| &c.point))
            .field("members", &self.members.len())
            .finish()
    }
}

/// Fluent builder for [`TypeDescriptor`]
pub struct TypeBuilder<T: ?Sized> {
    descriptor: TypeDescriptor,
    _marker: PhantomData<fn(&T)>,
}

impl<T: ?Sized + Send + Sync + 'static> TypeBuilder<T> {
    fn new(kind: TypeKind) -> Self {
        Self {
            descriptor: TypeDescriptor::empty(TypeRef::of::<T>(), kind),
            _marker: PhantomData,
        }
    }

    pub fn singleton(mut self) -> Self {
        self.descriptor.singleton = true;
        self
    }

    pub fn internal(mut self) -> Self {
        self.descriptor.internal = true;
        self
    }

    /// Declares `U` as a supertype reachable through `upcast`
    pub fn implements<U, F>(mut self, upcast: F) -> Self
    where
        U: ?Sized + Send + Sync + 'static,
        F: Fn(Arc<T>) -> Arc<U> + Send + Sync + 'static,
    {
        self.descriptor.ancestors.push(Ancestor {
            ty: TypeRef::of::<U>(),
            upcast: Arc::new(move |instance: &Instance| {
                instance
                    .downcast::<T>()
                    .map(|value| Instance::new(upcast(value)).with_type_name(instance.type_name()))
            }),
        });
        self
    }

    pub fn member<F>(self, dependencies: Vec<Key>, inject: F) -> Self
    where
        F: Fn(&T, &mut Args) -> DiResult<()> + Send + Sync + 'static,
    {
        self.push_member(InjectionPoint::new(InjectionSite::Method, dependencies), inject)
    }

    pub fn optional_member<F>(self, dependencies: Vec<Key>, inject: F) -> Self
    where
        F: Fn(&T, &mut Args) -> DiResult<()> + Send + Sync + 'static,
    {
        self.push_member(
            InjectionPoint::new(InjectionSite::Method, dependencies).optional(),
            inject,
        )
    }

    fn push_member<F>(mut self, point: InjectionPoint, inject: F) -> Self
    where
        F: Fn(&T, &mut Args) -> DiResult<()> + Send + Sync + 'static,
    {
        let ty = self.descriptor.ty.clone();
        self.descriptor.members.push(Member {
            point,
            inject: Arc::new(move |instance: &Instance, args: &mut Args| {
                let target = instance.downcast::<T>().ok_or(DiError::TypeMismatch {
                    key: Key::new(ty.clone(), None),
                    expected: type_name::<T>(),
                    actual: instance.type_name(),
                })?;
                inject(&target, args)
            }),
        });
        self
    }

    pub fn static_member<F>(mut self, dependencies: Vec<Key>, inject: F) -> Self
    where
        F: Fn(&mut Args) -> DiResult<()> + Send + Sync + 'static,
    {
        self.descriptor.static_members.push(StaticMember {
            point: InjectionPoint::new(InjectionSite::Field, dependencies),
            inject: Arc::new(inject),
        });
        self
    }

    pub fn build(self) -> TypeDescriptor {
        self.descriptor
    }
}

impl<T: Send + Sync + 'static> TypeBuilder<T> {
    pub fn constructor<F>(mut self, dependencies: Vec<Key>, build: F) -> Self
    where
        F: Fn(&mut Args) -> DiResult<T> + Send + Sync + 'static,
    {
        self.descriptor.constructor = Some(Constructor {
            point: InjectionPoint::new(InjectionSite::Constructor, dependencies),
            build: Arc::new(move |args: &mut Args| build(args).map(Instance::of)),
        });
        self
    }
}

/// Source of type descriptors
pub trait Introspector: Send + Sync {
    fn describe(&self, ty: &TypeRef) -> Option<Arc<TypeDescriptor>>;

    /// Whether `ty` is `ancestor` or declares it, directly or transitively
    fn is_subtype(&self, ty: &TypeRef, ancestor: &TypeRef) -> bool {
        let mut seen = FxHashSet::default();
        let mut queue = VecDeque::from([ty.clone()]);
        while let Some(current) = queue.pop_front() {
            if &current == ancestor {
                return true;
            }
            if !seen.insert(current.id()) {
                continue;
            }
            if let Some(descriptor) = self.describe(&current) {
                queue.extend(descriptor.ancestors().iter().map(|a| a.ty.clone()));
            }
        }
        false
    }

    /// Converts an instance of `from` into an instance of `to`
    fn upcast(&self, instance: &Instance, from: &TypeRef, to: &TypeRef) -> Option<Instance> {
        upcast_path(self, instance, from, to, &mut FxHashSet::default())
    }
}

fn upcast_path<I: Introspector + ?Sized>(
    introspector: &I,
    instance: &Instance,
    from: &TypeRef,
    to: &TypeRef,
    seen: &mut FxHashSet<TypeId>,
) -> Option<Instance> {
    if from == to {
        return Some(instance.clone());
    }
    if !seen.insert(from.id()) {
        return None;
    }
    let descriptor = introspector.describe(from)?;
    descriptor.ancestors().iter().find_map(|ancestor| {
        let lifted = (ancestor.upcast)(instance)?;
        upcast_path(introspector, &lifted, &ancestor.ty, to, seen)
    })
}

/// In-memory introspector fed with hand-written descriptors
#[derive(Default)]
pub struct TypeRegistry {
    descriptors: RwLock<FxHashMap<TypeId, Arc<TypeDescriptor>>>,
}

impl TypeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, descriptor: TypeDescriptor) {
        self.descriptors
            .write()
            .insert(descriptor.ty.id(), Arc::new(descriptor));
    }

    pub fn with(self, descriptor: TypeDescriptor) -> Self {
        self.register(descriptor);
        self
    }

    pub fn len(&self) -> usize {
        self.descriptors.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.descriptors.read().is_empty()
    }
}

impl Introspector for TypeRegistry {
    fn describe(&self, ty: &TypeRef) -> Option<Arc<TypeDescriptor>> {
        self.descriptors.read().get(&ty.id()).cloned()
    }
}
