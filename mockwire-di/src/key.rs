//! Binding keys: a type plus an optional qualifier

use std::any::{type_name, TypeId};
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crate::injector::Injector;
use crate::instance::Instance;
use crate::provider::{MembersInjector, Provider, RawProvider};

/// Qualifier kind used to mark parameters supplied by a factory caller
pub const ASSISTED: &str = "Assisted";

/// Generic wrappers the container knows how to satisfy on its own
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Wrapper {
    /// `Provider<T>`
    Provider,
    /// `MembersInjector<T>`
    MembersInjector,
}

type WrapFn = fn(&Injector, Key) -> Instance;

struct Wrapped {
    wrapper: Wrapper,
    inner: TypeRef,
    make: WrapFn,
}

/// Runtime handle on a Rust type.
///
/// Two handles are equal when they name the same `TypeId`. Handles created
/// through [`TypeRef::provider_of`] or [`TypeRef::members_injector_of`] also
/// remember the type they wrap, so callers can unwrap `Provider<T>` into `T`.
#[derive(Clone)]
pub struct TypeRef {
    id: TypeId,
    name: &'static str,
    wrapped: Option<Arc<Wrapped>>,
}

impl TypeRef {
    pub fn of<T: ?Sized + 'static>() -> Self {
        Self {
            id: TypeId::of::<T>(),
            name: type_name::<T>(),
            wrapped: None,
        }
    }

    /// Handle on `Provider<T>` that can be unwrapped back into `T`
    pub fn provider_of<T: ?Sized + Send + Sync + 'static>() -> Self {
        Self {
            id: TypeId::of::<Provider<T>>(),
            name: type_name::<Provider<T>>(),
            wrapped: Some(Arc::new(Wrapped {
                wrapper: Wrapper::Provider,
                inner: Self::of::<T>(),
                make: make_provider::<T>,
            })),
        }
    }

    /// Handle on `MembersInjector<T>`
    pub fn members_injector_of<T: ?Sized + Send + Sync + 'static>() -> Self {
        Self {
            id: TypeId::of::<MembersInjector<T>>(),
            name: type_name::<MembersInjector<T>>(),
            wrapped: Some(Arc::new(Wrapped {
                wrapper: Wrapper::MembersInjector,
                inner: Self::of::<T>(),
                make: make_members_injector::<T>,
            })),
        }
    }

    /// The bare provider type, which carries no type argument
    pub fn raw_provider() -> Self {
        Self::of::<RawProvider>()
    }

    pub fn id(&self) -> TypeId {
        self.id
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn wrapper(&self) -> Option<Wrapper> {
        self.wrapped.as_ref().map(|w| w.wrapper)
    }

    /// Whether this is `Provider<T>` or the bare provider type
    pub fn is_provider(&self) -> bool {
        self.wrapper() == Some(Wrapper::Provider) || self.id == TypeId::of::<RawProvider>()
    }

    /// `T` for a `Provider<T>` handle
    pub fn provided_type(&self) -> Option<&TypeRef> {
        match &self.wrapped {
            Some(w) if w.wrapper == Wrapper::Provider => Some(&w.inner),
            _ => None,
        }
    }

    /// The wrapped type of any generic wrapper
    pub fn wrapped_type(&self) -> Option<&TypeRef> {
        self.wrapped.as_ref().map(|w| &w.inner)
    }

    pub(crate) fn make_wrapper(&self, injector: &Injector, key: Key) -> Option<Instance> {
        self.wrapped.as_ref().map(|w| (w.make)(injector, key))
    }
}

fn make_provider<T: ?Sized + Send + Sync + 'static>(injector: &Injector, key: Key) -> Instance {
    Instance::of(Provider::<T>::new(injector, key))
}

fn make_members_injector<T: ?Sized + Send + Sync + 'static>(
    injector: &Injector,
    key: Key,
) -> Instance {
    Instance::of(MembersInjector::<T>::new(injector, key.type_ref().clone()))
}

impl PartialEq for TypeRef {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for TypeRef {}

impl Hash for TypeRef {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl fmt::Debug for TypeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

impl fmt::Display for TypeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

static NEXT_UNIQUE: AtomicU64 = AtomicU64::new(1);

/// Disambiguates several bindings of the same type
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Qualifier {
    /// `@Named(value)`
    Named(String),
    /// A marker annotation, optionally carrying a value
    Annotation {
        kind: &'static str,
        value: Option<String>,
    },
    /// Never equal to any other qualifier
    Unique { id: u64, name: Option<String> },
}

impl Qualifier {
    pub fn named(name: impl Into<String>) -> Self {
        Qualifier::Named(name.into())
    }

    pub fn marker(kind: &'static str) -> Self {
        Qualifier::Annotation { kind, value: None }
    }

    pub fn annotation(kind: &'static str, value: impl Into<String>) -> Self {
        Qualifier::Annotation {
            kind,
            value: Some(value.into()),
        }
    }

    pub fn assisted() -> Self {
        Self::marker(ASSISTED)
    }

    /// A fresh qualifier distinct from every other one in the process
    pub fn unique(name: Option<String>) -> Self {
        Qualifier::Unique {
            id: NEXT_UNIQUE.fetch_add(1, Ordering::Relaxed),
            name,
        }
    }

    /// The annotation kind, `Named` and `Unique` included
    pub fn kind(&self) -> &'static str {
        match self {
            Qualifier::Named(_) => "Named",
            Qualifier::Annotation { kind, .. } => kind,
            Qualifier::Unique { .. } => "Unique",
        }
    }

    pub fn is_assisted(&self) -> bool {
        self.kind() == ASSISTED
    }
}

impl fmt::Display for Qualifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Qualifier::Named(name) => write!(f, "@Named(value={name})"),
            Qualifier::Annotation { kind, value: None } => write!(f, "@{kind}"),
            Qualifier::Annotation {
                kind,
                value: Some(value),
            } => write!(f, "@{kind}(value={value})"),
            Qualifier::Unique { id, name: None } => write!(f, "@Unique(value={id})"),
            Qualifier::Unique { id, name: Some(name) } => {
                write!(f, "@Unique(name={name}, value={id})")
            }
        }
    }
}

/// Identity of a binding
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Key {
    ty: TypeRef,
    qualifier: Option<Qualifier>,
}

impl Key {
    pub fn new(ty: TypeRef, qualifier: Option<Qualifier>) -> Self {
        Self { ty, qualifier }
    }

    pub fn of<T: ?Sized + 'static>() -> Self {
        Self::new(TypeRef::of::<T>(), None)
    }

    pub fn named<T: ?Sized + 'static>(name: impl Into<String>) -> Self {
        Self::new(TypeRef::of::<T>(), Some(Qualifier::named(name)))
    }

    pub fn qualified<T: ?Sized + 'static>(qualifier: Qualifier) -> Self {
        Self::new(TypeRef::of::<T>(), Some(qualifier))
    }

    /// Key of `Provider<T>`, keeping `qualifier` for the provided key
    pub fn provider_of<T: ?Sized + Send + Sync + 'static>(qualifier: Option<Qualifier>) -> Self {
        Self::new(TypeRef::provider_of::<T>(), qualifier)
    }

    pub fn type_ref(&self) -> &TypeRef {
        &self.ty
    }

    pub fn qualifier(&self) -> Option<&Qualifier> {
        self.qualifier.as_ref()
    }

    pub fn is_assisted(&self) -> bool {
        self.qualifier.as_ref().is_some_and(Qualifier::is_assisted)
    }

    /// Same qualifier, different type
    pub fn with_type(&self, ty: TypeRef) -> Key {
        Key::new(ty, self.qualifier.clone())
    }

    /// Same type, no qualifier
    pub fn unqualified(&self) -> Key {
        Key::new(self.ty.clone(), None)
    }

    /// For a `Provider<T>` key, the key of `T` with the same qualifier
    pub fn provided_key(&self) -> Option<Key> {
        self.ty.provided_type().map(|inner| self.with_type(inner.clone()))
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.qualifier {
            Some(qualifier) => write!(f, "Key[type={}, annotation={}]", self.ty, qualifier),
            None => write!(f, "Key[type={}, annotation=[none]]", self.ty),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    trait Engine: Send + Sync {}
    struct Car;

    #[test]
    fn test_keys_compare_structurally() {
        assert_eq!(Key::of::<Car>(), Key::of::<Car>());
        assert_eq!(Key::named::<String>("salt"), Key::named::<String>("salt"));
        assert_ne!(Key::named::<String>("salt"), Key::named::<String>("pepper"));
        assert_ne!(Key::of::<Car>(), Key::of::<dyn Engine>());
    }

    #[test]
    fn test_unique_qualifiers_never_collide() {
        let a = Key::qualified::<String>(Qualifier::unique(None));
        let b = Key::qualified::<String>(Qualifier::unique(None));
        assert_ne!(a, b);
        assert_eq!(a, a.clone());
    }

    #[test]
    fn test_provider_key_unwraps_with_qualifier() {
        let key = Key::provider_of::<dyn Engine>(Some(Qualifier::named("fast")));
        assert!(key.type_ref().is_provider());
        assert_eq!(key.provided_key(), Some(Key::named::<dyn Engine>("fast")));
    }

    #[test]
    fn test_raw_provider_has_nothing_to_unwrap() {
        let key = Key::new(TypeRef::raw_provider(), None);
        assert!(key.type_ref().is_provider());
        assert_eq!(key.provided_key(), None);
    }

    #[test]
    fn test_display() {
        assert_eq!(
            Key::named::<String>("Spy").to_string(),
            "Key[type=alloc::string::String, annotation=@Named(value=Spy)]"
        );
        assert_eq!(
            Key::of::<u32>().to_string(),
            "Key[type=u32, annotation=[none]]"
        );
        assert!(Key::qualified::<u32>(Qualifier::assisted()).is_assisted());
    }
}
