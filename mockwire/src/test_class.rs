//! Description of a test class: its lifecycle methods and injection points
//!
//! This plays the part of the annotations a test framework would expose. A
//! [`TestClass`] lists the parameter keys of its `Test`, `Before` and `After`
//! methods and the injection points of its own fields, and may extend a
//! parent class whose methods are inherited.

use std::sync::Arc;

use mockwire_di::{InjectionPoint, Key, Qualifier};

/// Qualifier kind of parameters the runner fans out over
pub const ALL: &str = "All";

/// Group name of an `All` parameter that selects every binding of its type
pub const ALL_DEFAULT: &str = "__ALL__";

/// Marker qualifier of keys the binder creates for its own use
pub const INTERNAL: &str = "MockwireInternal";

/// Parameter key fanning out over every binding of `T`
pub fn all<T: ?Sized + 'static>() -> Key {
    Key::qualified::<T>(Qualifier::annotation(ALL, ALL_DEFAULT))
}

/// Parameter key fanning out over the bindings of `T` created in group `name`
pub fn all_named<T: ?Sized + 'static>(name: impl Into<String>) -> Key {
    Key::qualified::<T>(Qualifier::annotation(ALL, name))
}

/// Whether `key` carries the fan-out marker
pub fn is_all(key: &Key) -> bool {
    key.qualifier().is_some_and(|q| q.kind() == ALL)
}

/// Group selected by a fan-out key
pub fn all_group(key: &Key) -> Option<&str> {
    match key.qualifier()? {
        Qualifier::Annotation {
            kind,
            value: Some(value),
        } if *kind == ALL => Some(value.as_str()),
        Qualifier::Annotation { kind, value: None } if *kind == ALL => Some(ALL_DEFAULT),
        _ => None,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lifecycle {
    Test,
    Before,
    After,
}

#[derive(Debug, Clone)]
pub struct TestMethod {
    pub name: String,
    pub lifecycle: Lifecycle,
    pub parameters: Vec<Key>,
}

#[derive(Debug, Clone)]
pub struct TestClass {
    name: String,
    parent: Option<Arc<TestClass>>,
    methods: Vec<TestMethod>,
    injection_points: Vec<InjectionPoint>,
}

impl TestClass {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            parent: None,
            methods: Vec::new(),
            injection_points: Vec::new(),
        }
    }

    pub fn extends(mut self, parent: Arc<TestClass>) -> Self {
        self.parent = Some(parent);
        self
    }

    pub fn test(self, name: impl Into<String>, parameters: Vec<Key>) -> Self {
        self.method(name, Lifecycle::Test, parameters)
    }

    pub fn before(self, name: impl Into<String>, parameters: Vec<Key>) -> Self {
        self.method(name, Lifecycle::Before, parameters)
    }

    pub fn after(self, name: impl Into<String>, parameters: Vec<Key>) -> Self {
        self.method(name, Lifecycle::After, parameters)
    }

    pub fn method(mut self, name: impl Into<String>, lifecycle: Lifecycle, parameters: Vec<Key>) -> Self {
        self.methods.push(TestMethod {
            name: name.into(),
            lifecycle,
            parameters,
        });
        self
    }

    /// An injected field or method of the test class itself
    pub fn inject(mut self, point: InjectionPoint) -> Self {
        self.injection_points.push(point);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn parent(&self) -> Option<&Arc<TestClass>> {
        self.parent.as_ref()
    }

    /// Methods declared directly on this class
    pub fn methods(&self) -> &[TestMethod] {
        &self.methods
    }

    pub fn injection_points(&self) -> &[InjectionPoint] {
        &self.injection_points
    }

    /// This class followed by its ancestors, nearest first
    pub fn hierarchy(&self) -> impl Iterator<Item = &TestClass> {
        std::iter::successors(Some(self), |class| class.parent.as_deref())
    }

    /// Every lifecycle method of the class and its ancestors
    pub fn lifecycle_methods(&self) -> impl Iterator<Item = &TestMethod> {
        self.hierarchy().flat_map(|class| class.methods.iter())
    }

    /// Nearest method called `name`
    pub fn find_method(&self, name: &str) -> Option<&TestMethod> {
        self.lifecycle_methods().find(|method| method.name == name)
    }

    /// Names of the test methods, inherited ones included
    pub fn test_names(&self) -> Vec<&str> {
        self.lifecycle_methods()
            .filter(|m| m.lifecycle == Lifecycle::Test)
            .map(|m| m.name.as_str())
            .collect()
    }
}
