//! The injector: validates a set of module elements and resolves instances

use std::any::{type_name, TypeId};
use std::cell::RefCell;
use std::fmt;
use std::sync::{Arc, Weak};

use parking_lot::{Mutex, RwLock};
use rustc_hash::{FxHashMap, FxHashSet};
use tracing::{debug, trace, warn};

use crate::binder::{elements, Module};
use crate::element::{Element, Message, Target};
use crate::error::{DiError, DiResult};
use crate::instance::Instance;
use crate::key::{Key, TypeRef, Wrapper};
use crate::provider::{InstanceProvider, Provider};
use crate::scope::{Scope, Scoping, SingletonScope, SINGLETON};
use crate::types::{Args, Introspector, TypeDescriptor};

/// Phase the injector is created for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Stage {
    /// Singletons are created lazily
    #[default]
    Development,
    /// Singletons are created with the injector
    Production,
    Tool,
}

/// Types the container owns; they are never bound by modules or mocked
pub fn is_framework_type(ty: &TypeRef) -> bool {
    let id = ty.id();
    id == TypeId::of::<TypeRef>()
        || id == TypeId::of::<Injector>()
        || id == TypeId::of::<Stage>()
        || id == TypeId::of::<tracing::Span>()
        || ty.wrapper() == Some(Wrapper::MembersInjector)
}

/// Whether any injector satisfies `key` without a binding for it
pub fn has_just_in_time_binding(key: &Key, introspector: &dyn Introspector) -> bool {
    let ty = key.type_ref();
    if ty.wrapper().is_some() {
        return true;
    }
    if key.qualifier().is_some() {
        return false;
    }
    let id = ty.id();
    id == TypeId::of::<Injector>()
        || id == TypeId::of::<Stage>()
        || id == TypeId::of::<tracing::Span>()
        || introspector
            .describe(ty)
            .is_some_and(|descriptor| descriptor.is_instantiable())
}

/// How a just-in-time binding is satisfied
#[derive(Debug, Clone)]
enum Builtin {
    Constructor(TypeRef),
    Wrapper,
    Injector,
    Stage,
    Logger,
}

enum Resolver {
    Declared { target: Target, scoping: Scoping },
    /// Bound inside a private module and exposed to this injector
    Exposed(Injector),
    Builtin(Builtin),
}

/// Creates an [`Injector`] from modules
pub struct InjectorBuilder {
    introspector: Arc<dyn Introspector>,
    stage: Stage,
    elements: Vec<Element>,
}

impl InjectorBuilder {
    pub fn new(introspector: Arc<dyn Introspector>) -> Self {
        Self {
            introspector,
            stage: Stage::default(),
            elements: Vec::new(),
        }
    }

    pub fn stage(mut self, stage: Stage) -> Self {
        self.stage = stage;
        self
    }

    pub fn module(mut self, module: &dyn Module) -> Self {
        self.elements.extend(elements(module));
        self
    }

    pub fn elements(mut self, elements: Vec<Element>) -> Self {
        self.elements.extend(elements);
        self
    }

    /// Validates every binding and fails with all problems found at once
    pub fn build(self) -> DiResult<Injector> {
        let injector = Injector::empty(self.introspector, self.stage, None);
        let mut errors = Vec::new();
        let mut statics = Vec::new();
        injector.install(self.elements, &mut errors, &mut statics);
        injector.validate(&mut errors);
        if !errors.is_empty() {
            debug!("Injector creation failed with {} errors", errors.len());
            return Err(DiError::Configuration(errors));
        }

        injector.create_eager_singletons()?;
        for (owner, ty) in statics {
            owner.inject_static(&ty)?;
        }

        debug!(
            "Created injector with {} explicit bindings",
            injector.inner.explicit.read().len()
        );
        Ok(injector)
    }
}

struct InjectorInner {
    parent: Option<Weak<InjectorInner>>,
    introspector: Arc<dyn Introspector>,
    stage: Stage,
    bindings: RwLock<FxHashMap<Key, Arc<Resolver>>>,
    explicit: RwLock<Vec<Key>>,
    builtins: RwLock<FxHashMap<Key, Arc<Resolver>>>,
    scopes: RwLock<FxHashMap<&'static str, Arc<dyn Scope>>>,
    singletons: Arc<SingletonScope>,
    overridden: RwLock<Vec<Key>>,
    children: Mutex<Vec<Injector>>,
}

/// Resolves instances for keys
#[derive(Clone)]
pub struct Injector {
    inner: Arc<InjectorInner>,
}

/// Non-owning handle used by providers
#[derive(Clone)]
pub struct WeakInjector {
    inner: Weak<InjectorInner>,
}

impl WeakInjector {
    pub fn try_upgrade(&self) -> Option<Injector> {
        self.inner.upgrade().map(|inner| Injector { inner })
    }

    pub(crate) fn upgrade(&self) -> DiResult<Injector> {
        self.try_upgrade().ok_or(DiError::InjectorDropped)
    }
}

thread_local! {
    static RESOLVING: RefCell<Vec<Key>> = const { RefCell::new(Vec::new()) };
}

/// Marks a key as being provisioned on this thread
struct ResolutionGuard;

impl ResolutionGuard {
    fn enter(key: &Key) -> DiResult<Self> {
        RESOLVING.with(|stack| {
            let mut stack = stack.borrow_mut();
            if let Some(start) = stack.iter().position(|k| k == key) {
                let path = stack[start..]
                    .iter()
                    .chain(std::iter::once(key))
                    .map(ToString::to_string)
                    .collect::<Vec<_>>()
                    .join(" -> ");
                return Err(DiError::CircularDependency { path });
            }
            stack.push(key.clone());
            Ok(ResolutionGuard)
        })
    }
}

impl Drop for ResolutionGuard {
    fn drop(&mut self) {
        RESOLVING.with(|stack| {
            stack.borrow_mut().pop();
        });
    }
}

impl Injector {
    pub fn builder(introspector: Arc<dyn Introspector>) -> InjectorBuilder {
        InjectorBuilder::new(introspector)
    }

    fn empty(
        introspector: Arc<dyn Introspector>,
        stage: Stage,
        parent: Option<Weak<InjectorInner>>,
    ) -> Self {
        let singletons = Arc::new(SingletonScope::new());
        let mut scopes: FxHashMap<&'static str, Arc<dyn Scope>> = FxHashMap::default();
        if parent.is_none() {
            scopes.insert(SINGLETON, singletons.clone());
        }
        Self {
            inner: Arc::new(InjectorInner {
                parent,
                introspector,
                stage,
                bindings: RwLock::new(FxHashMap::default()),
                explicit: RwLock::new(Vec::new()),
                builtins: RwLock::new(FxHashMap::default()),
                scopes: RwLock::new(scopes),
                singletons,
                overridden: RwLock::new(Vec::new()),
                children: Mutex::new(Vec::new()),
            }),
        }
    }

    pub fn downgrade(&self) -> WeakInjector {
        WeakInjector {
            inner: Arc::downgrade(&self.inner),
        }
    }

    pub fn stage(&self) -> Stage {
        self.inner.stage
    }

    pub fn introspector(&self) -> &Arc<dyn Introspector> {
        &self.inner.introspector
    }

    fn parent(&self) -> Option<Injector> {
        self.inner
            .parent
            .as_ref()
            .and_then(Weak::upgrade)
            .map(|inner| Injector { inner })
    }

    fn same(&self, other: &Injector) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    fn install(
        &self,
        elements: Vec<Element>,
        errors: &mut Vec<Message>,
        statics: &mut Vec<(Injector, TypeRef)>,
    ) {
        for element in elements {
            match element {
                Element::Binding(binding) => self.insert(
                    binding.key,
                    Resolver::Declared {
                        target: binding.target,
                        scoping: binding.scoping,
                    },
                ),
                Element::Message(message) => errors.push(message),
                Element::StaticInjection(ty) => statics.push((self.clone(), ty)),
                Element::ScopeBinding { annotation, scope } => {
                    let mut scopes = self.inner.scopes.write();
                    if scopes.contains_key(annotation) {
                        errors.push(Message::new(format!(
                            "Scope {annotation} is already bound"
                        )));
                    } else {
                        scopes.insert(annotation, scope);
                    }
                }
                Element::Private(private) => {
                    let child = Injector::empty(
                        self.inner.introspector.clone(),
                        self.inner.stage,
                        Some(Arc::downgrade(&self.inner)),
                    );
                    child.install(private.elements, errors, statics);
                    for key in private.exposed {
                        if child.inner.bindings.read().contains_key(&key) {
                            self.insert(key, Resolver::Exposed(child.clone()));
                        } else {
                            errors.push(Message::new(format!(
                                "Could not expose {key}: it must be explicitly bound"
                            )));
                        }
                    }
                    self.inner.children.lock().push(child);
                }
            }
        }
    }

    fn insert(&self, key: Key, resolver: Resolver) {
        let previous = self
            .inner
            .bindings
            .write()
            .insert(key.clone(), Arc::new(resolver));
        if previous.is_some() {
            warn!("{} was bound more than once, the last binding wins", key);
            self.inner.overridden.write().push(key);
        } else {
            self.inner.explicit.write().push(key);
        }
    }

    fn validate(&self, errors: &mut Vec<Message>) {
        for key in self.binding_keys() {
            let Some(resolver) = self.inner.bindings.read().get(&key).cloned() else {
                continue;
            };
            let Resolver::Declared { target, scoping } = resolver.as_ref() else {
                continue;
            };
            if let Scoping::Annotation(annotation) = scoping {
                if self.lookup_scope(annotation).is_none() {
                    errors.push(Message::new(format!(
                        "{}, used by {}",
                        DiError::ScopeNotBound {
                            annotation: (*annotation).to_string()
                        },
                        key
                    )));
                }
            }
            match self.target_dependencies(&key, target) {
                Ok(dependencies) => {
                    let mut visited = FxHashSet::default();
                    for dependency in dependencies {
                        if let Some(missing) = self.missing_dependency(&dependency, &mut visited) {
                            errors.push(Message::new(format!(
                                "{}, required by {}",
                                DiError::MissingBinding { key: missing },
                                key
                            )));
                        }
                    }
                }
                Err(error) => errors.push(Message::new(error.to_string())),
            }
        }
        for child in self.inner.children.lock().iter() {
            child.validate(errors);
        }
    }

    fn target_dependencies(&self, key: &Key, target: &Target) -> DiResult<Vec<Key>> {
        match target {
            Target::Untargeted => self.constructor_dependencies(key.type_ref()),
            Target::Constructor(ty) => {
                self.check_upcast(ty, key.type_ref())?;
                self.constructor_dependencies(ty)
            }
            Target::Linked(linked) => {
                self.check_upcast(linked.type_ref(), key.type_ref())?;
                Ok(vec![linked.clone()])
            }
            Target::ProviderKey(provider) => Ok(vec![provider.clone()]),
            Target::ProviderInstance(provider) => Ok(provider.dependencies()),
            Target::Instance(_) | Target::Constant(_) => Ok(Vec::new()),
        }
    }

    fn constructor_dependencies(&self, ty: &TypeRef) -> DiResult<Vec<Key>> {
        self.instantiable(ty).map(|descriptor| descriptor.required_keys())
    }

    fn check_upcast(&self, from: &TypeRef, to: &TypeRef) -> DiResult<()> {
        if from == to || self.inner.introspector.is_subtype(from, to) {
            Ok(())
        } else {
            Err(DiError::MissingUpcast {
                from: from.to_string(),
                to: to.to_string(),
            })
        }
    }

    fn instantiable(&self, ty: &TypeRef) -> DiResult<Arc<TypeDescriptor>> {
        self.inner
            .introspector
            .describe(ty)
            .filter(|descriptor| descriptor.is_instantiable())
            .ok_or_else(|| DiError::NotInstantiable { ty: ty.to_string() })
    }

    /// The first key in the dependency tree of `key` that nothing can satisfy
    fn missing_dependency(&self, key: &Key, visited: &mut FxHashSet<Key>) -> Option<Key> {
        if !visited.insert(key.clone()) || self.find_explicit(key).is_some() {
            return None;
        }
        match self.builtin_for(key) {
            Some(Builtin::Constructor(ty)) => match self.inner.introspector.describe(&ty) {
                Some(descriptor) => descriptor
                    .required_keys()
                    .iter()
                    .find_map(|dependency| self.missing_dependency(dependency, visited)),
                None => Some(key.clone()),
            },
            Some(Builtin::Wrapper) => key
                .provided_key()
                .and_then(|provided| self.missing_dependency(&provided, visited)),
            Some(_) => None,
            None => Some(key.clone()),
        }
    }

    fn create_eager_singletons(&self) -> DiResult<()> {
        for key in self.binding_keys() {
            let eager = matches!(
                self.inner.bindings.read().get(&key).map(|r| r.as_ref()),
                Some(Resolver::Declared { scoping: Scoping::EagerSingleton, .. })
            ) || (self.inner.stage == Stage::Production
                && matches!(
                    self.inner.bindings.read().get(&key).map(|r| r.as_ref()),
                    Some(Resolver::Declared { scoping: Scoping::Annotation(SINGLETON), .. })
                ));
            if eager {
                trace!("Creating eager singleton {}", key);
                self.get_instance(&key)?;
            }
        }
        let children = self.inner.children.lock().clone();
        for child in children {
            child.create_eager_singletons()?;
        }
        Ok(())
    }

    fn inject_static(&self, ty: &TypeRef) -> DiResult<()> {
        let Some(descriptor) = self.inner.introspector.describe(ty) else {
            return Ok(());
        };
        for member in descriptor.static_members() {
            let mut args = self.resolve_all(&member.point().dependencies)?;
            member.inject(&mut args)?;
        }
        Ok(())
    }

    /// Explicit binding for `key` here or in an ancestor injector
    fn find_explicit(&self, key: &Key) -> Option<(Injector, Arc<Resolver>)> {
        let mut current = Some(self.clone());
        while let Some(injector) = current {
            let found = injector.inner.bindings.read().get(key).cloned();
            if let Some(resolver) = found {
                return Some((injector, resolver));
            }
            current = injector.parent();
        }
        None
    }

    fn lookup_scope(&self, annotation: &str) -> Option<Arc<dyn Scope>> {
        let mut current = Some(self.clone());
        while let Some(injector) = current {
            let found = injector.inner.scopes.read().get(annotation).cloned();
            if let Some(scope) = found {
                return Some(scope);
            }
            current = injector.parent();
        }
        None
    }

    fn builtin_for(&self, key: &Key) -> Option<Builtin> {
        if !has_just_in_time_binding(key, self.inner.introspector.as_ref()) {
            return None;
        }
        let ty = key.type_ref();
        let id = ty.id();
        Some(if ty.wrapper().is_some() {
            Builtin::Wrapper
        } else if id == TypeId::of::<Injector>() {
            Builtin::Injector
        } else if id == TypeId::of::<Stage>() {
            Builtin::Stage
        } else if id == TypeId::of::<tracing::Span>() {
            Builtin::Logger
        } else {
            Builtin::Constructor(ty.clone())
        })
    }

    fn lookup(&self, key: &Key) -> DiResult<(Injector, Arc<Resolver>)> {
        if let Some(found) = self.find_explicit(key) {
            return Ok(found);
        }
        if let Some(resolver) = self.inner.builtins.read().get(key).cloned() {
            return Ok((self.clone(), resolver));
        }
        let builtin = self
            .builtin_for(key)
            .ok_or_else(|| DiError::MissingBinding { key: key.clone() })?;
        trace!("Just-in-time binding for {}", key);
        let resolver = self
            .inner
            .builtins
            .write()
            .entry(key.clone())
            .or_insert_with(|| Arc::new(Resolver::Builtin(builtin)))
            .clone();
        Ok((self.clone(), resolver))
    }

    /// Resolves `key`, applying its scope
    pub fn get_instance(&self, key: &Key) -> DiResult<Instance> {
        let (owner, resolver) = self.lookup(key)?;
        if !owner.same(self) {
            return owner.get_instance(key);
        }
        if let Resolver::Exposed(child) = resolver.as_ref() {
            return child.get_instance(key);
        }
        let _guard = ResolutionGuard::enter(key)?;
        match self.scope_for(key, &resolver)? {
            Some(scope) => scope.scope(key, &|| self.provision(key, &resolver)),
            None => self.provision(key, &resolver),
        }
    }

    fn scope_for(&self, key: &Key, resolver: &Resolver) -> DiResult<Option<Arc<dyn Scope>>> {
        let singleton: Arc<dyn Scope> = self.inner.singletons.clone();
        let marked_singleton = |ty: &TypeRef| {
            self.inner
                .introspector
                .describe(ty)
                .is_some_and(|descriptor| descriptor.is_singleton())
        };
        Ok(match resolver {
            Resolver::Declared { target, scoping } => match scoping {
                Scoping::Unscoped => {
                    let constructed = match target {
                        Target::Untargeted => Some(key.type_ref()),
                        Target::Constructor(ty) => Some(ty),
                        _ => None,
                    };
                    constructed.filter(|ty| marked_singleton(ty)).map(|_| singleton)
                }
                Scoping::EagerSingleton => Some(singleton),
                Scoping::Scope(scope) => Some(scope.clone()),
                Scoping::Annotation(annotation) => {
                    Some(self.lookup_scope(annotation).ok_or_else(|| {
                        DiError::ScopeNotBound {
                            annotation: (*annotation).to_string(),
                        }
                    })?)
                }
            },
            Resolver::Builtin(Builtin::Constructor(ty)) if marked_singleton(ty) => Some(singleton),
            _ => None,
        })
    }

    fn provision(&self, key: &Key, resolver: &Resolver) -> DiResult<Instance> {
        trace!("Provisioning {}", key);
        match resolver {
            Resolver::Declared { target, .. } => match target {
                Target::Untargeted => self.construct(key.type_ref()),
                Target::Constructor(ty) => {
                    let instance = self.construct(ty)?;
                    self.convert(instance, ty, key)
                }
                Target::Linked(linked) => {
                    let instance = self.get_instance(linked)?;
                    self.convert(instance, linked.type_ref(), key)
                }
                Target::Instance(instance) | Target::Constant(instance) => Ok(instance.clone()),
                Target::ProviderInstance(provider) => provider.get(self),
                Target::ProviderKey(provider_key) => {
                    let instance = self.get_instance(provider_key)?;
                    let provider_type = TypeRef::of::<dyn InstanceProvider>();
                    let provider = self
                        .convert(instance, provider_key.type_ref(), &Key::new(provider_type, None))?
                        .downcast::<dyn InstanceProvider>()
                        .ok_or_else(|| DiError::MissingUpcast {
                            from: provider_key.type_ref().to_string(),
                            to: type_name::<dyn InstanceProvider>().to_string(),
                        })?;
                    provider.get(self)
                }
            },
            Resolver::Exposed(child) => child.get_instance(key),
            Resolver::Builtin(builtin) => match builtin {
                Builtin::Constructor(ty) => self.construct(ty),
                Builtin::Wrapper => {
                    let target = key.provided_key().unwrap_or_else(|| key.clone());
                    key.type_ref()
                        .make_wrapper(self, target)
                        .ok_or_else(|| DiError::MissingBinding { key: key.clone() })
                }
                Builtin::Injector => Ok(Instance::of(self.clone())),
                Builtin::Stage => Ok(Instance::of(self.inner.stage)),
                Builtin::Logger => Ok(Instance::of(tracing::Span::current())),
            },
        }
    }

    fn construct(&self, ty: &TypeRef) -> DiResult<Instance> {
        let descriptor = self.instantiable(ty)?;
        let constructor = descriptor
            .constructor()
            .ok_or_else(|| DiError::NotInstantiable { ty: ty.to_string() })?;
        let mut args = self.resolve_all(&constructor.point().dependencies)?;
        let instance = constructor.build(&mut args)?;
        self.inject_members(&instance, ty)?;
        Ok(instance)
    }

    fn convert(&self, instance: Instance, from: &TypeRef, key: &Key) -> DiResult<Instance> {
        if from == key.type_ref() {
            return Ok(instance);
        }
        self.inner
            .introspector
            .upcast(&instance, from, key.type_ref())
            .ok_or_else(|| DiError::MissingUpcast {
                from: from.to_string(),
                to: key.type_ref().to_string(),
            })
    }

    /// Resolves every key, in order, into constructor arguments
    pub fn resolve_all(&self, keys: &[Key]) -> DiResult<Args> {
        keys.iter()
            .map(|key| Ok((key.clone(), self.get_instance(key)?)))
            .collect::<DiResult<Vec<_>>>()
            .map(Args::new)
    }

    /// Runs the member injection points of `ty` against `instance`
    pub fn inject_members(&self, instance: &Instance, ty: &TypeRef) -> DiResult<()> {
        let Some(descriptor) = self.inner.introspector.describe(ty) else {
            return Ok(());
        };
        for member in descriptor.members() {
            let point = member.point();
            if point.optional {
                if !point.dependencies.iter().all(|dependency| self.can_resolve(dependency)) {
                    trace!("Skipping optional member of {}", ty);
                    continue;
                }
            }
            let mut args = self.resolve_all(&point.dependencies)?;
            member.inject(instance, &mut args)?;
        }
        Ok(())
    }

    pub fn get_key<T: ?Sized + Send + Sync + 'static>(&self, key: &Key) -> DiResult<Arc<T>> {
        let instance = self.get_instance(key)?;
        instance.downcast::<T>().ok_or_else(|| DiError::TypeMismatch {
            key: key.clone(),
            expected: type_name::<T>(),
            actual: instance.type_name(),
        })
    }

    pub fn get<T: ?Sized + Send + Sync + 'static>(&self) -> DiResult<Arc<T>> {
        self.get_key(&Key::of::<T>())
    }

    pub fn get_named<T: ?Sized + Send + Sync + 'static>(&self, name: &str) -> DiResult<Arc<T>> {
        self.get_key(&Key::named::<T>(name))
    }

    pub fn provider<T: ?Sized + Send + Sync + 'static>(&self) -> Provider<T> {
        self.provider_for(Key::of::<T>())
    }

    pub fn provider_for<T: ?Sized + Send + Sync + 'static>(&self, key: Key) -> Provider<T> {
        Provider::new(self, key)
    }

    /// Whether `key` can be resolved, explicitly or just in time
    pub fn can_resolve(&self, key: &Key) -> bool {
        self.missing_dependency(key, &mut FxHashSet::default()).is_none()
    }

    /// Explicit bindings, in registration order
    pub fn binding_keys(&self) -> Vec<Key> {
        self.inner.explicit.read().clone()
    }

    pub fn has_explicit_binding(&self, key: &Key) -> bool {
        self.inner.bindings.read().contains_key(key)
    }

    /// Explicit bindings whose key has type `ty`
    pub fn find_bindings_by_type(&self, ty: &TypeRef) -> Vec<Key> {
        self.inner
            .explicit
            .read()
            .iter()
            .filter(|key| key.type_ref() == ty)
            .cloned()
            .collect()
    }

    /// Scope descriptor of an explicit binding
    pub fn scope_of(&self, key: &Key) -> Option<String> {
        let resolver = self.inner.bindings.read().get(key).cloned()?;
        match resolver.as_ref() {
            Resolver::Declared { scoping, .. } => scoping.describe(),
            Resolver::Exposed(child) => child.scope_of(key),
            Resolver::Builtin(_) => None,
        }
    }

    /// Keys registered more than once
    pub fn overridden_keys(&self) -> Vec<Key> {
        self.inner.overridden.read().clone()
    }
}

impl fmt::Debug for Injector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Injector")
            .field("stage", &self.inner.stage)
            .field("bindings", &self.inner.explicit.read().len())
            .finish()
    }
}
