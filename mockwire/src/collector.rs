//! Dry-run observation of the bindings a module declares
//!
//! The collector enumerates a module's elements without building an injector
//! and flattens every binding into a [`BindingRecord`]. Nothing is registered
//! or instantiated, so collecting the same module twice yields equal records.

use std::fmt;
use std::sync::Arc;

use mockwire_di::{
    elements, Binding, Element, Instance, InstanceProvider, Introspector, Key, Message, Module,
    PrivateElements, Target,
};
use tracing::trace;

/// What an observed binding resolves to
#[derive(Clone)]
pub enum BoundTarget {
    /// Another key, or the binding's own key when bound directly
    LinkedKey(Key),
    /// A literal value or constant
    Instance(Instance),
    /// A provider object, which may need collaborators of its own
    Provider(Arc<dyn InstanceProvider>),
    /// Nothing is known about the target
    Untargeted,
}

impl BoundTarget {
    pub fn bound_key(&self) -> Option<&Key> {
        match self {
            BoundTarget::LinkedKey(key) => Some(key),
            _ => None,
        }
    }

    /// Keys a bound provider object requires
    pub fn dependencies(&self) -> Vec<Key> {
        match self {
            BoundTarget::Provider(provider) => provider.dependencies(),
            _ => Vec::new(),
        }
    }

    /// Type name of a bound value or provider
    pub fn instance_type(&self) -> Option<&'static str> {
        match self {
            BoundTarget::Instance(instance) => Some(instance.type_name()),
            BoundTarget::Provider(provider) => Some(provider.type_name()),
            _ => None,
        }
    }
}

impl PartialEq for BoundTarget {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (BoundTarget::LinkedKey(a), BoundTarget::LinkedKey(b)) => a == b,
            (BoundTarget::Instance(a), BoundTarget::Instance(b)) => a.type_name() == b.type_name(),
            (BoundTarget::Provider(a), BoundTarget::Provider(b)) => {
                a.type_name() == b.type_name() && a.dependencies() == b.dependencies()
            }
            (BoundTarget::Untargeted, BoundTarget::Untargeted) => true,
            _ => false,
        }
    }
}

impl fmt::Debug for BoundTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BoundTarget::LinkedKey(key) => write!(f, "LinkedKey({key})"),
            BoundTarget::Instance(instance) => write!(f, "Instance({})", instance.type_name()),
            BoundTarget::Provider(provider) => write!(f, "Provider({})", provider.type_name()),
            BoundTarget::Untargeted => f.write_str("Untargeted"),
        }
    }
}

/// One explicitly declared binding
#[derive(Debug, Clone, PartialEq)]
pub struct BindingRecord {
    pub key: Key,
    pub target: BoundTarget,
    /// Scope descriptor, `None` when unscoped
    pub scope: Option<String>,
}

impl BindingRecord {
    fn from_binding(binding: &Binding, private: bool) -> Self {
        let target = match &binding.target {
            Target::Linked(_) if private => BoundTarget::Untargeted,
            Target::Linked(key) | Target::ProviderKey(key) => BoundTarget::LinkedKey(key.clone()),
            Target::Untargeted | Target::Constructor(_) => {
                BoundTarget::LinkedKey(binding.key.clone())
            }
            Target::Instance(instance) | Target::Constant(instance) => {
                BoundTarget::Instance(instance.clone())
            }
            Target::ProviderInstance(provider) => BoundTarget::Provider(provider.clone()),
        };
        Self {
            key: binding.key.clone(),
            target,
            scope: binding.scoping.describe(),
        }
    }

    /// The record points back at its own key
    pub fn is_bound_directly(&self) -> bool {
        self.target.bound_key() == Some(&self.key)
    }
}

/// Everything one dry run observed
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CollectedBindings {
    pub records: Vec<BindingRecord>,
    /// Keys needed by requested static injections
    pub static_dependencies: Vec<Key>,
    /// Diagnostics the module emitted; informational only
    pub messages: Vec<Message>,
}

impl CollectedBindings {
    pub fn keys(&self) -> impl Iterator<Item = &Key> {
        self.records.iter().map(|record| &record.key)
    }

    pub fn contains(&self, key: &Key) -> bool {
        self.keys().any(|k| k == key)
    }
}

/// Observes the bindings of a module without installing them
pub struct BindingsCollector {
    introspector: Arc<dyn Introspector>,
}

impl BindingsCollector {
    pub fn new(introspector: Arc<dyn Introspector>) -> Self {
        Self { introspector }
    }

    pub fn collect(&self, module: &dyn Module) -> CollectedBindings {
        self.collect_elements(&elements(module))
    }

    pub fn collect_elements(&self, elements: &[Element]) -> CollectedBindings {
        let mut collected = CollectedBindings::default();
        for element in elements {
            match element {
                Element::Binding(binding) => collected
                    .records
                    .push(BindingRecord::from_binding(binding, false)),
                Element::Private(private) => self.collect_private(private, &mut collected),
                Element::StaticInjection(ty) => {
                    let Some(descriptor) = self.introspector.describe(ty) else {
                        continue;
                    };
                    for member in descriptor.static_members() {
                        let point = member.point();
                        if !point.optional {
                            collected
                                .static_dependencies
                                .extend(point.dependencies.iter().cloned());
                        }
                    }
                }
                Element::Message(message) => collected.messages.push(message.clone()),
                Element::ScopeBinding { .. } => {}
            }
        }
        trace!(
            "Collected {} bindings, {} static dependencies, {} messages",
            collected.records.len(),
            collected.static_dependencies.len(),
            collected.messages.len()
        );
        collected
    }

    fn collect_private(&self, private: &PrivateElements, collected: &mut CollectedBindings) {
        for element in &private.elements {
            if let Element::Binding(binding) = element {
                if private.is_exposed(&binding.key) {
                    collected
                        .records
                        .push(BindingRecord::from_binding(binding, true));
                }
            }
        }
    }
}
