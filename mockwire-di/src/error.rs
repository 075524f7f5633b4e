//! Error types for the injection container

use std::fmt;

use thiserror::Error;

use crate::element::Message;
use crate::key::Key;

/// Result type alias for container operations
pub type DiResult<T> = Result<T, DiError>;

/// Errors that can occur while configuring or using an injector
#[derive(Error, Debug)]
pub enum DiError {
    /// Nothing is bound to the key and no just-in-time binding applies
    #[error("No implementation for {key} was bound")]
    MissingBinding { key: Key },

    /// The type has no constructor the container can call
    #[error("{ty} cannot be instantiated: no injectable constructor is registered")]
    NotInstantiable { ty: String },

    /// Circular dependency detected
    #[error("Circular dependency detected: {path}")]
    CircularDependency { path: String },

    /// An instance did not have the type its key promised
    #[error("Instance bound to {key} is a {actual}, expected {expected}")]
    TypeMismatch {
        key: Key,
        expected: &'static str,
        actual: &'static str,
    },

    /// A linked binding targets a type with no declared route to the key type
    #[error("{from} is not declared as an implementation of {to}")]
    MissingUpcast { from: String, to: String },

    /// A binding uses a scope annotation nothing was bound to
    #[error("No scope is bound to {annotation}")]
    ScopeNotBound { annotation: String },

    /// Provider or constructor failure
    #[error("Error provisioning {key}: {reason}")]
    ProvisionFailed { key: Key, reason: String },

    /// Aggregated configuration errors found while creating an injector
    #[error("{}", ConfigurationErrors(.0))]
    Configuration(Vec<Message>),

    /// A provider outlived the injector it was created from
    #[error("The injector backing this provider has been dropped")]
    InjectorDropped,

    /// Generic error
    #[error("DI error: {0}")]
    Other(String),
}

impl DiError {
    /// Messages carried by this error, one per problem
    pub fn messages(&self) -> Vec<String> {
        match self {
            DiError::Configuration(messages) => {
                messages.iter().map(|m| m.text.clone()).collect()
            }
            other => vec![other.to_string()],
        }
    }
}

struct ConfigurationErrors<'a>(&'a [Message]);

impl fmt::Display for ConfigurationErrors<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Unable to create injector, see the following errors:")?;
        for (i, message) in self.0.iter().enumerate() {
            write!(f, "\n{}) {}", i + 1, message)?;
        }
        let count = self.0.len();
        write!(
            f,
            "\n\n{} error{}",
            count,
            if count == 1 { "" } else { "s" }
        )
    }
}
