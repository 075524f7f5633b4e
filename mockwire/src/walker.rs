//! Transitive walk over the keys a test needs
//!
//! Starting from root keys, the walker binds every concrete, injectable key
//! to its own constructor and expands that key's dependencies in turn. Keys
//! it cannot bind stay needed-but-unobserved for the policy engine.

use std::collections::VecDeque;
use std::sync::Arc;

use mockwire_di::{Binder, Introspector, Key};
use rustc_hash::{FxHashMap, FxHashSet};
use tracing::trace;

use crate::policy::{can_be_injected, ForceMockRegistry, SkipReason};
use crate::scope::TestScope;

/// Where a key stands once configuration is over
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyStatus {
    Unseen,
    /// Bound by the test module itself
    Explicit,
    /// Required but not decided yet
    Needed,
    Skipped(SkipReason),
    BoundConcrete { test_singleton: bool },
    BoundMock,
    BoundDefault,
}

impl KeyStatus {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, KeyStatus::Unseen | KeyStatus::Needed)
    }
}

/// Outcome of one auto-binding pass
#[derive(Debug, Clone, Default)]
pub struct Resolutions {
    needed: Vec<Key>,
    status: FxHashMap<Key, KeyStatus>,
}

impl Resolutions {
    pub fn status(&self, key: &Key) -> KeyStatus {
        self.status.get(key).copied().unwrap_or(KeyStatus::Unseen)
    }

    /// Needed keys, in discovery order
    pub fn needed_keys(&self) -> &[Key] {
        &self.needed
    }

    /// Keys the binder added on its own
    pub fn auto_bound_keys(&self) -> Vec<Key> {
        self.needed
            .iter()
            .filter(|key| {
                matches!(
                    self.status(key),
                    KeyStatus::BoundConcrete { .. } | KeyStatus::BoundMock | KeyStatus::BoundDefault
                )
            })
            .cloned()
            .collect()
    }
}

/// Mutable sets of one configuration pass
#[derive(Debug, Default)]
pub struct ResolutionState {
    observed: FxHashSet<Key>,
    needed: Vec<Key>,
    needed_set: FxHashSet<Key>,
    pending: VecDeque<Key>,
    expanded: FxHashSet<Key>,
    status: FxHashMap<Key, KeyStatus>,
}

impl ResolutionState {
    pub fn is_observed(&self, key: &Key) -> bool {
        self.observed.contains(key)
    }

    pub fn is_needed(&self, key: &Key) -> bool {
        self.needed_set.contains(key)
    }

    /// Needed keys nothing binds yet, in discovery order
    pub fn unresolved(&self) -> Vec<Key> {
        self.needed
            .iter()
            .filter(|key| !self.observed.contains(*key))
            .cloned()
            .collect()
    }

    pub fn status(&self, key: &Key) -> KeyStatus {
        self.status.get(key).copied().unwrap_or(KeyStatus::Unseen)
    }

    /// Records a terminal status; a decided key keeps its first status
    pub fn settle(&mut self, key: &Key, status: KeyStatus) {
        let current = self.status(key);
        if current.is_terminal() {
            trace!("{} already settled as {:?}", key, current);
            return;
        }
        self.status.insert(key.clone(), status);
    }

    fn observe(&mut self, key: Key) {
        self.status.entry(key.clone()).or_insert(KeyStatus::Explicit);
        self.observed.insert(key);
    }

    fn need(&mut self, key: &Key) {
        if self.needed_set.insert(key.clone()) {
            self.needed.push(key.clone());
            self.status.entry(key.clone()).or_insert(KeyStatus::Needed);
        }
    }

    /// Queues an observed key for expansion, at most once
    fn enqueue(&mut self, key: Key) {
        debug_assert!(self.observed.contains(&key));
        if self.expanded.insert(key.clone()) {
            self.pending.push_back(key);
        }
    }

    pub fn into_resolutions(self) -> Resolutions {
        Resolutions {
            needed: self.needed,
            status: self.status,
        }
    }
}

/// A root parameter as the walker needs it: `Provider<T>` becomes `T`
pub fn ensure_provided_key(key: &Key) -> Result<Key, String> {
    if !key.type_ref().is_provider() {
        return Ok(key.clone());
    }
    key.provided_key()
        .ok_or_else(|| format!("Cannot inject a Provider that has no type parameter ({key})"))
}

pub struct Walker<'a> {
    introspector: &'a dyn Introspector,
    force_mock: &'a mut ForceMockRegistry,
    binder: &'a mut Binder,
    test_singleton: Arc<TestScope>,
    state: ResolutionState,
}

impl<'a> Walker<'a> {
    pub fn new(
        introspector: &'a dyn Introspector,
        force_mock: &'a mut ForceMockRegistry,
        binder: &'a mut Binder,
        test_singleton: Arc<TestScope>,
    ) -> Self {
        Self {
            introspector,
            force_mock,
            binder,
            test_singleton,
            state: ResolutionState::default(),
        }
    }

    /// A key the test module binds already
    pub fn observe(&mut self, key: Key) {
        self.state.observe(key);
    }

    /// A key an existing binding depends on; bound unscoped if concrete
    pub fn add_binding_root(&mut self, key: Key) {
        self.add_needed_key(key.clone(), false);
        if self.state.is_observed(&key) {
            self.state.enqueue(key);
        }
    }

    /// A key the test class itself injects; bound as test singleton if concrete
    pub fn add_test_root(&mut self, key: Key) {
        self.add_needed_key(key, true);
    }

    pub fn add_needed_key(&mut self, key: Key, as_test_singleton: bool) {
        // Assisted values come from the caller, never from a binding
        if key.is_assisted() {
            trace!("{} is assisted, not needed", key);
            self.state.settle(&key, KeyStatus::Skipped(SkipReason::Assisted));
            return;
        }
        self.state.need(&key);
        self.bind_if_concrete(key, as_test_singleton);
    }

    fn bind_if_concrete(&mut self, key: Key, as_test_singleton: bool) {
        let ty = key.type_ref();
        if self.state.is_observed(&key)
            || !can_be_injected(ty, self.introspector)
            || self.force_mock.should_force_mock(ty, self.introspector)
        {
            return;
        }
        let singleton = as_test_singleton
            || self
                .introspector
                .describe(ty)
                .is_some_and(|descriptor| descriptor.is_singleton());
        if singleton {
            self.binder
                .bind_key(key.clone())
                .in_scope(self.test_singleton.clone());
        } else {
            self.binder.bind_key(key.clone());
        }
        trace!("Bound {} to its constructor (test singleton: {})", key, singleton);
        self.state.observed.insert(key.clone());
        self.state.settle(
            &key,
            KeyStatus::BoundConcrete {
                test_singleton: singleton,
            },
        );
        self.state.enqueue(key);
    }

    fn add_dependencies(&mut self, key: &Key) {
        let ty = key.type_ref();
        if !can_be_injected(ty, self.introspector) {
            return;
        }
        let Some(descriptor) = self.introspector.describe(ty) else {
            return;
        };
        let points = descriptor
            .constructor()
            .map(|c| c.point())
            .into_iter()
            .chain(descriptor.members().iter().map(|m| m.point()));
        let dependencies: Vec<Key> = points
            .filter(|point| !point.optional)
            .flat_map(|point| point.dependencies.iter().cloned())
            .collect();
        for dependency in dependencies {
            self.add_key_dependency(dependency);
        }
    }

    fn add_key_dependency(&mut self, key: Key) {
        let key = key.provided_key().unwrap_or(key);
        self.add_needed_key(key, true);
    }

    /// Expands queued keys until nothing new is discovered
    pub fn run(&mut self) {
        while let Some(key) = self.state.pending.pop_front() {
            self.add_dependencies(&key);
        }
    }

    pub fn state(&self) -> &ResolutionState {
        &self.state
    }

    pub fn into_state(self) -> ResolutionState {
        self.state
    }
}
