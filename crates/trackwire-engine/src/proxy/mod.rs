//! Change-tracking proxies
//!
//! A proxy is an instance of a synthesized subclass of the source class.
//! Reads pass through to the wrapped instance; writes are forwarded to it
//! and, once the write succeeded, reported to the tracking callback.

pub mod cache;
pub mod emitter;
pub mod error;
pub mod factory;
pub mod options;
pub mod type_builder;

pub use cache::TypeCache;
pub use emitter::{Emitter, SlotLayout};
pub use error::{ProxyError, ProxyResult};
pub use factory::ProxyFactory;
pub use options::ProxyOptions;
pub use type_builder::{
    check_supported, InterceptedProperty, ProxyTypeBuilder, WrapperType, CALLBACK_FIELD,
    PROXIED_CAPABILITY, UNWRAP_METHOD, WRAPPED_FIELD,
};
