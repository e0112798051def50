//! Trackwire Engine
//!
//! Run-time synthesis of change-tracking proxies:
//! - Object runtime with classes, vtables and an interpreter for emitted bodies
//! - Proxy type builder that subclasses a plain class and intercepts its
//!   virtual property setters
//! - Type cache and proxy factory
//! - Composition-based tracking for Rust types
//!
//! ```ignore
//! let runtime = Arc::new(Runtime::default());
//! let poco = runtime.define_class(
//!     ClassDefinition::new("Poco").property(PropertyDefinition::new("Name", ValueKind::Str)),
//! )?;
//! let instance = runtime.instantiate(poco, vec![])?;
//!
//! let factory = ProxyFactory::new(Arc::clone(&runtime));
//! let proxy = factory.create_proxy(&instance, TrackingCallback::new(|_, name| {
//!     println!("{} changed", name);
//! }))?;
//! runtime.set_property(&proxy, "Name", "Test")?;
//! ```

#![warn(missing_docs)]
#![warn(rust_2018_idioms)]

pub mod proxy;
pub mod tracked;
pub mod vm;

pub use proxy::{
    ProxyError, ProxyFactory, ProxyOptions, ProxyResult, ProxyTypeBuilder, TypeCache, WrapperType,
};
pub use tracked::{track, TrackError, Trackable, Tracked};
pub use vm::{
    BoxError, ClassDefinition, ClassId, ObjectRef, PropertyDefinition, Runtime, RuntimeOptions,
    SubclassDefinition, TrackingCallback, Value, ValueKind, VmError, VmResult,
};
