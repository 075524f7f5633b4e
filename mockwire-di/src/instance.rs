//! Type-erased values handed out by the injector

use std::any::{type_name, Any};
use std::fmt;
use std::sync::Arc;

/// A shared, type-erased value.
///
/// An instance bound to a key of type `T` always holds an `Arc<T>`, where `T`
/// may be a trait object such as `dyn Engine`.
#[derive(Clone)]
pub struct Instance {
    value: Arc<dyn Any + Send + Sync>,
    type_name: &'static str,
}

impl Instance {
    /// Records `T` as the type name; for a trait object that is the trait,
    /// see [`Self::with_type_name`]
    pub fn new<T: ?Sized + Send + Sync + 'static>(value: Arc<T>) -> Self {
        Self {
            value: Arc::new(value),
            type_name: type_name::<T>(),
        }
    }

    pub fn of<T: Send + Sync + 'static>(value: T) -> Self {
        Self::new(Arc::new(value))
    }

    /// Names the concrete type behind a trait object in diagnostics
    pub fn with_type_name(mut self, type_name: &'static str) -> Self {
        self.type_name = type_name;
        self
    }

    pub fn downcast<T: ?Sized + Send + Sync + 'static>(&self) -> Option<Arc<T>> {
        self.value.downcast_ref::<Arc<T>>().cloned()
    }

    pub fn is<T: ?Sized + Send + Sync + 'static>(&self) -> bool {
        self.value.is::<Arc<T>>()
    }

    /// Type name shown in diagnostics and binding reports
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    /// Whether both handles share the same erased allocation
    pub fn same(&self, other: &Instance) -> bool {
        Arc::ptr_eq(&self.value, &other.value)
    }
}

impl fmt::Debug for Instance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Instance({})", self.type_name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    trait Greeter: Send + Sync {
        fn greet(&self) -> String;
    }

    struct English;

    impl Greeter for English {
        fn greet(&self) -> String {
            "hello".to_string()
        }
    }

    #[test]
    fn test_downcast_sized_and_trait_objects() {
        let number = Instance::of(42u32);
        assert_eq!(*number.downcast::<u32>().unwrap(), 42);
        assert!(number.downcast::<u64>().is_none());

        let greeter: Arc<dyn Greeter> = Arc::new(English);
        let erased = Instance::new(greeter).with_type_name(type_name::<English>());
        assert_eq!(erased.downcast::<dyn Greeter>().unwrap().greet(), "hello");
        assert!(erased.type_name().ends_with("English"));
    }

    #[test]
    fn test_clones_are_the_same_instance() {
        let a = Instance::of(String::from("x"));
        let b = a.clone();
        assert!(a.same(&b));
        assert!(!a.same(&Instance::of(String::from("x"))));
    }
}
