//! Injection container used by the mockwire test binder
//!
//! Modules declare bindings from [`Key`]s to targets through a [`Binder`].
//! An [`Injector`] validates those bindings up front and resolves instances,
//! building concrete types just in time from the descriptors an
//! [`Introspector`] supplies.

pub mod binder;
pub mod element;
pub mod error;
pub mod injector;
pub mod instance;
pub mod key;
pub mod provider;
pub mod scope;
pub mod types;

pub use binder::{elements, Binder, BindingBuilder, Module};
pub use element::{Binding, Element, Message, PrivateElements, Target};
pub use error::{DiError, DiResult};
pub use injector::{
    has_just_in_time_binding, is_framework_type, Injector, InjectorBuilder, Stage, WeakInjector,
};
pub use instance::Instance;
pub use key::{Key, Qualifier, TypeRef, Wrapper, ASSISTED};
pub use provider::{FnProvider, InstanceProvider, MembersInjector, Provider, RawProvider};
pub use scope::{Scope, Scoping, SingletonScope, SINGLETON};
pub use types::{
    Args, InjectionPoint, InjectionSite, Introspector, TypeBuilder, TypeDescriptor, TypeKind,
    TypeRegistry,
};

/// Prelude module for common imports
pub mod prelude {
    pub use crate::{
        Args, Binder, DiError, DiResult, Injector, Instance, InstanceProvider, Introspector, Key,
        Module, Provider, Qualifier, Scope, TypeDescriptor, TypeRef, TypeRegistry,
    };
}
