//! Scopes decide how long a provisioned instance is reused

use std::fmt;
use std::sync::Arc;

use parking_lot::Mutex;
use rustc_hash::FxHashMap;

use crate::error::DiResult;
use crate::instance::Instance;
use crate::key::Key;

/// Annotation name of the injector-wide singleton scope
pub const SINGLETON: &str = "Singleton";

/// Caching policy applied around a binding's provisioning
pub trait Scope: Send + Sync + fmt::Debug + fmt::Display {
    /// Returns the cached instance for `key`, calling `create` on a miss.
    ///
    /// `create` may resolve other keys in the same scope, so implementations
    /// must not hold a lock while calling it.
    fn scope(&self, key: &Key, create: &dyn Fn() -> DiResult<Instance>) -> DiResult<Instance>;
}

/// One instance per key for the life of the scope
#[derive(Debug, Default)]
pub struct SingletonScope {
    instances: Mutex<FxHashMap<Key, Instance>>,
}

impl SingletonScope {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.instances.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.instances.lock().is_empty()
    }

    pub fn clear(&self) {
        self.instances.lock().clear();
    }
}

impl Scope for SingletonScope {
    fn scope(&self, key: &Key, create: &dyn Fn() -> DiResult<Instance>) -> DiResult<Instance> {
        if let Some(instance) = self.instances.lock().get(key) {
            return Ok(instance.clone());
        }
        let created = create()?;
        // A nested resolution may have filled the slot first; keep that one
        Ok(self
            .instances
            .lock()
            .entry(key.clone())
            .or_insert(created)
            .clone())
    }
}

impl fmt::Display for SingletonScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(SINGLETON)
    }
}

/// Scope declared on a binding
#[derive(Debug, Clone, Default)]
pub enum Scoping {
    #[default]
    Unscoped,
    /// Injector singleton, created when the injector is
    EagerSingleton,
    /// A scope instance applied directly
    Scope(Arc<dyn Scope>),
    /// A scope annotation, resolved through the injector's scope bindings
    Annotation(&'static str),
}

impl Scoping {
    pub fn is_unscoped(&self) -> bool {
        matches!(self, Scoping::Unscoped)
    }

    /// Human readable scope descriptor, `None` when unscoped
    pub fn describe(&self) -> Option<String> {
        match self {
            Scoping::Unscoped => None,
            Scoping::EagerSingleton => Some("EagerSingleton".to_string()),
            Scoping::Scope(scope) => Some(scope.to_string()),
            Scoping::Annotation(annotation) => Some((*annotation).to_string()),
        }
    }
}
