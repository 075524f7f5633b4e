//! Automatic test dependency binding
//!
//! Given the test module of a test class, mockwire works out everything the
//! class needs to be injected and binds whatever the module left out:
//! concrete types to their constructors in a per-test singleton scope,
//! abstractions to mocks, value types to zero values.
//!
//! ```ignore
//! let runner = TestRunner::builder(test_class, registry, mockery)
//!     .inner_module(|b: &mut TestBinder<'_>| {
//!         b.bind::<dyn Engine>().to::<Diesel>();
//!         b.bind_spy::<Diesel>();
//!     })
//!     .build()?;
//! runner.begin_test()?;
//! let car = runner.injector().get::<Car>()?;
//! ```

pub mod autobind;
pub mod collector;
pub mod config;
pub mod defaults;
pub mod error;
pub mod mock;
pub mod module;
pub mod policy;
pub mod providers;
pub mod report;
pub mod runner;
pub mod scope;
pub mod test_class;
pub mod walker;

pub use autobind::AutoBindModule;
pub use collector::{BindingRecord, BindingsCollector, BoundTarget, CollectedBindings};
pub use config::{RunnerConfig, StageConfig};
pub use error::{Error, Result};
pub use mock::{MockFactory, Mockery};
pub use module::{EmptyTestModule, ScopedTestModule, TestBinder, TestModule, UseModules};
pub use policy::{Decision, ForceMockRegistry, SkipReason};
pub use providers::{MockProvider, SpyImmutableInstanceProvider, SpyProvider};
pub use report::{render_report, write_bindings};
pub use runner::{Fixture, TestRunner, TestRunnerBuilder};
pub use scope::{TestScope, TestScopes, TEST_EAGER_SINGLETON, TEST_SINGLETON};
pub use test_class::{all, all_named, Lifecycle, TestClass, TestMethod, ALL, ALL_DEFAULT};
pub use walker::{KeyStatus, Resolutions};

/// Prelude module for common imports
pub mod prelude {
    pub use crate::{
        all, all_named, MockFactory, Mockery, TestBinder, TestClass, TestModule, TestRunner,
    };
    pub use mockwire_di::prelude::*;
}
