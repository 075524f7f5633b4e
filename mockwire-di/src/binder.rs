//! Modules and the binder they configure

use std::sync::Arc;

use crate::element::{Binding, Element, Message, PrivateElements, Target};
use crate::instance::Instance;
use crate::key::{Key, TypeRef};
use crate::provider::{FnProvider, InstanceProvider};
use crate::scope::{Scope, Scoping, SINGLETON};
use crate::types::Args;

/// A unit of configuration
pub trait Module {
    fn configure(&self, binder: &mut Binder);
}

impl<F> Module for F
where
    F: Fn(&mut Binder),
{
    fn configure(&self, binder: &mut Binder) {
        self(binder)
    }
}

/// Records the elements a module declares
#[derive(Debug, Default)]
pub struct Binder {
    elements: Vec<Element>,
    /// Present while configuring a private module
    exposed: Option<Vec<Key>>,
}

impl Binder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn bind<T: ?Sized + 'static>(&mut self) -> BindingBuilder<'_> {
        self.bind_key(Key::of::<T>())
    }

    pub fn bind_named<T: ?Sized + 'static>(&mut self, name: impl Into<String>) -> BindingBuilder<'_> {
        self.bind_key(Key::named::<T>(name))
    }

    pub fn bind_key(&mut self, key: Key) -> BindingBuilder<'_> {
        self.elements.push(Element::Binding(Binding::new(key)));
        let index = self.elements.len() - 1;
        BindingBuilder {
            binder: self,
            index,
        }
    }

    /// Binds a named constant
    pub fn bind_constant<T: Send + Sync + 'static>(&mut self, name: impl Into<String>, value: T) {
        self.bind_key(Key::named::<T>(name))
            .target(Target::Constant(Instance::of(value)));
    }

    pub fn install(&mut self, module: &dyn Module) {
        module.configure(self);
    }

    /// Configures a module whose bindings stay hidden unless exposed
    pub fn private_module(&mut self, configure: impl FnOnce(&mut Binder)) {
        let mut child = Binder {
            elements: Vec::new(),
            exposed: Some(Vec::new()),
        };
        configure(&mut child);
        self.elements.push(Element::Private(PrivateElements {
            elements: child.elements,
            exposed: child.exposed.unwrap_or_default(),
        }));
    }

    /// Makes a key of the enclosing private module visible to its parent
    pub fn expose(&mut self, key: Key) {
        match &mut self.exposed {
            Some(exposed) => exposed.push(key),
            None => self.add_error(format!("Cannot expose {key} outside of a private module")),
        }
    }

    pub fn request_static_injection<T: ?Sized + 'static>(&mut self) {
        self.elements
            .push(Element::StaticInjection(TypeRef::of::<T>()));
    }

    pub fn bind_scope(&mut self, annotation: &'static str, scope: Arc<dyn Scope>) {
        self.elements
            .push(Element::ScopeBinding { annotation, scope });
    }

    pub fn add_error(&mut self, text: impl Into<String>) {
        self.add_message(Message::new(text));
    }

    pub fn add_message(&mut self, message: Message) {
        self.elements.push(Element::Message(message));
    }

    /// Provider method: binds `key` to a closure over its declared dependencies
    pub fn provides<T, F>(&mut self, key: Key, dependencies: Vec<Key>, provide: F) -> BindingBuilder<'_>
    where
        T: ?Sized + Send + Sync + 'static,
        F: Fn(&mut Args) -> crate::DiResult<Arc<T>> + Send + Sync + 'static,
    {
        let provider: Arc<dyn InstanceProvider> = Arc::new(FnProvider::new(dependencies, provide));
        self.bind_key(key).to_provider(provider)
    }

    pub fn elements(&self) -> &[Element] {
        &self.elements
    }

    pub fn into_elements(self) -> Vec<Element> {
        self.elements
    }
}

/// Dry run: the elements `module` declares, without creating anything
pub fn elements(module: &dyn Module) -> Vec<Element> {
    let mut binder = Binder::new();
    module.configure(&mut binder);
    binder.into_elements()
}

/// Chained configuration of the binding just declared
pub struct BindingBuilder<'a> {
    binder: &'a mut Binder,
    index: usize,
}

impl BindingBuilder<'_> {
    fn update(self, f: impl FnOnce(&mut Binding)) -> Self {
        if let Some(Element::Binding(binding)) = self.binder.elements.get_mut(self.index) {
            f(binding);
        }
        self
    }

    fn target(self, target: Target) -> Self {
        self.update(|binding| binding.target = target)
    }

    /// Links to the unqualified key of `U`
    pub fn to<U: ?Sized + 'static>(self) -> Self {
        self.to_key(Key::of::<U>())
    }

    pub fn to_key(self, key: Key) -> Self {
        self.target(Target::Linked(key))
    }

    pub fn to_instance<T: ?Sized + Send + Sync + 'static>(self, instance: Arc<T>) -> Self {
        self.target(Target::Instance(Instance::new(instance)))
    }

    pub fn to_value<T: Send + Sync + 'static>(self, value: T) -> Self {
        self.target(Target::Instance(Instance::of(value)))
    }

    pub fn to_erased(self, instance: Instance) -> Self {
        self.target(Target::Instance(instance))
    }

    pub fn to_provider(self, provider: Arc<dyn InstanceProvider>) -> Self {
        self.target(Target::ProviderInstance(provider))
    }

    pub fn to_provider_key(self, key: Key) -> Self {
        self.target(Target::ProviderKey(key))
    }

    pub fn to_constructor(self, ty: TypeRef) -> Self {
        self.target(Target::Constructor(ty))
    }

    pub fn in_scope(self, scope: Arc<dyn Scope>) -> Self {
        self.update(|binding| binding.scoping = Scoping::Scope(scope))
    }

    pub fn in_annotated_scope(self, annotation: &'static str) -> Self {
        self.update(|binding| binding.scoping = Scoping::Annotation(annotation))
    }

    pub fn in_singleton(self) -> Self {
        self.in_annotated_scope(SINGLETON)
    }

    pub fn as_eager_singleton(self) -> Self {
        self.update(|binding| binding.scoping = Scoping::EagerSingleton)
    }

    pub fn key(&self) -> Option<&Key> {
        match self.binder.elements.get(self.index) {
            Some(Element::Binding(binding)) => Some(&binding.key),
            _ => None,
        }
    }
}
