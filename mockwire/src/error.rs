//! Error types for the test binder

use std::fmt;

use mockwire_di::DiError;
use thiserror::Error;

/// Result type alias for test binder operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised while preparing or running a test class
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration or provisioning failure inside the injector
    #[error(transparent)]
    Di(#[from] DiError),

    /// More than one test module was declared for the test class
    #[error("More than one test module found within test class \"{class}\"")]
    AmbiguousModule { class: String },

    /// A method name the test class does not declare
    #[error("Test class \"{class}\" has no method named \"{method}\"")]
    UnknownMethod { class: String, method: String },

    /// Writing the binding report failed
    #[error("Failed to render binding report: {0}")]
    Report(#[from] fmt::Error),

    /// Configuration error
    #[cfg(feature = "config")]
    #[error("Configuration error: {0}")]
    Config(String),
}
