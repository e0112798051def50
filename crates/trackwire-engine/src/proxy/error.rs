//! Proxy errors

use crate::vm::VmError;

/// Errors raised while synthesizing or using tracking proxies
#[derive(Debug, thiserror::Error)]
pub enum ProxyError {
    /// The source class cannot be proxied
    #[error("Cannot create a tracking proxy for '{class}': {reason}")]
    UnsupportedType {
        /// Source class name
        class: String,
        /// Why it was rejected
        reason: String,
    },

    /// The runtime rejected the synthesized class or one of its bodies
    #[error("Failed to synthesize a tracking proxy for '{class}': {reason}")]
    Synthesis {
        /// Source class name
        class: String,
        /// Underlying failure
        reason: String,
    },

    /// The object is not a tracking proxy
    #[error("Object of class '{class}' is not a tracking proxy")]
    NotAProxy {
        /// Class name of the object
        class: String,
    },

    /// Failure while constructing or dispatching through a proxy
    #[error(transparent)]
    Runtime(#[from] VmError),
}

/// Proxy operation result
pub type ProxyResult<T> = Result<T, ProxyError>;
