//! Tracking callbacks
//!
//! A callback is shared by every proxy constructed with it and is invoked
//! with the wrapped instance and the name of the property that was written.

use std::fmt;
use std::sync::Arc;

use super::object::ObjectRef;

/// Error type returned by fallible callbacks and native methods
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

type CallbackFn = dyn Fn(&ObjectRef, &str) -> Result<(), BoxError> + Send + Sync;

/// Shared handle to a tracking callback
#[derive(Clone)]
pub struct TrackingCallback(Arc<CallbackFn>);

impl TrackingCallback {
    /// Wrap an infallible callback
    pub fn new<F>(f: F) -> Self
    where
        F: Fn(&ObjectRef, &str) + Send + Sync + 'static,
    {
        Self(Arc::new(move |instance: &ObjectRef, property: &str| {
            f(instance, property);
            Ok(())
        }))
    }

    /// Wrap a callback that may fail; its error is surfaced to the writer
    pub fn fallible<F>(f: F) -> Self
    where
        F: Fn(&ObjectRef, &str) -> Result<(), BoxError> + Send + Sync + 'static,
    {
        Self(Arc::new(f))
    }

    /// Invoke the callback
    pub fn invoke(&self, instance: &ObjectRef, property: &str) -> Result<(), BoxError> {
        (self.0)(instance, property)
    }

    /// Identity comparison
    pub fn ptr_eq(&self, other: &TrackingCallback) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl fmt::Debug for TrackingCallback {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TrackingCallback(@{:p})", Arc::as_ptr(&self.0))
    }
}
