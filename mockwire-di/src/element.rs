//! Elements a module declares when it is configured

use std::fmt;
use std::sync::Arc;

use crate::instance::Instance;
use crate::key::{Key, TypeRef};
use crate::provider::InstanceProvider;
use crate::scope::{Scope, Scoping};

/// What a binding resolves to
#[derive(Clone)]
pub enum Target {
    /// Declared without a target; the key's own constructor is used
    Untargeted,
    /// Resolves another key and upcasts the result
    Linked(Key),
    Instance(Instance),
    /// A constant value such as a named string
    Constant(Instance),
    ProviderInstance(Arc<dyn InstanceProvider>),
    /// A key whose instance is itself a provider
    ProviderKey(Key),
    /// Built through the constructor of the given type
    Constructor(TypeRef),
}

impl fmt::Debug for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Target::Untargeted => f.write_str("Untargeted"),
            Target::Linked(key) => write!(f, "Linked({key})"),
            Target::Instance(instance) => write!(f, "Instance({})", instance.type_name()),
            Target::Constant(instance) => write!(f, "Constant({})", instance.type_name()),
            Target::ProviderInstance(provider) => {
                write!(f, "ProviderInstance({})", provider.type_name())
            }
            Target::ProviderKey(key) => write!(f, "ProviderKey({key})"),
            Target::Constructor(ty) => write!(f, "Constructor({ty})"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Binding {
    pub key: Key,
    pub target: Target,
    pub scoping: Scoping,
}

impl Binding {
    pub fn new(key: Key) -> Self {
        Self {
            key,
            target: Target::Untargeted,
            scoping: Scoping::Unscoped,
        }
    }
}

/// Elements of a private module and the keys it exposes to its parent
#[derive(Debug, Clone, Default)]
pub struct PrivateElements {
    pub elements: Vec<Element>,
    pub exposed: Vec<Key>,
}

impl PrivateElements {
    pub fn is_exposed(&self, key: &Key) -> bool {
        self.exposed.contains(key)
    }
}

/// Diagnostic recorded by a module
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub source: Option<String>,
    pub text: String,
}

impl Message {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            source: None,
            text: text.into(),
        }
    }

    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }
}

impl fmt::Display for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.source {
            Some(source) => write!(f, "{}\n  at {}", self.text, source),
            None => f.write_str(&self.text),
        }
    }
}

#[derive(Debug, Clone)]
pub enum Element {
    Binding(Binding),
    Message(Message),
    /// Inject the static members of a type when the injector is created
    StaticInjection(TypeRef),
    ScopeBinding {
        annotation: &'static str,
        scope: Arc<dyn Scope>,
    },
    Private(PrivateElements),
}
