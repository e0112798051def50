//! Change tracking by composition
//!
//! For Rust types there is no need to synthesize a subclass. A type lists
//! its properties through [`Trackable`] (by hand or with [`trackable!`]),
//! and [`Tracked`] owns an instance, forwards reads and writes to it and
//! reports each successful write to its callback. Every property can be
//! tracked, there is no sealed or virtual restriction.
//!
//! ```ignore
//! struct Poco { name: String, age: i32 }
//! trackwire_engine::trackable!(Poco { name, age });
//!
//! let mut tracked = Tracked::new(poco, |_, property| {
//!     println!("{} changed", property);
//!     Ok(())
//! });
//! tracked.set_property("name", Value::from("Test"))?;
//! ```

use std::fmt;

use crate::vm::{BoxError, Value, ValueKind};

/// Errors raised by [`Trackable`] accessors
#[derive(Debug, thiserror::Error)]
pub enum TrackError {
    /// No property with that name
    #[error("Unknown property '{0}'")]
    UnknownProperty(String),

    /// Property cannot be written
    #[error("Property '{0}' is read-only")]
    ReadOnly(String),

    /// Value cannot be converted to the property's type
    #[error("Property '{property}' cannot hold a {actual} value")]
    TypeMismatch {
        /// Property name
        property: String,
        /// Kind of the rejected value
        actual: ValueKind,
    },

    /// The type refused the write
    #[error("Write to '{property}' rejected: {source}")]
    Rejected {
        /// Property name
        property: String,
        /// Reason given by the type
        #[source]
        source: BoxError,
    },

    /// The callback failed after the write took effect
    #[error("Tracking callback failed for '{property}': {source}")]
    Callback {
        /// Property name
        property: String,
        /// Error returned by the callback
        #[source]
        source: BoxError,
    },
}

/// A type whose properties can be enumerated, read and written by name
pub trait Trackable {
    /// Property names in declaration order
    fn property_names(&self) -> &'static [&'static str];

    /// Read a property
    fn get_property(&self, name: &str) -> Result<Value, TrackError>;

    /// Write a property
    fn set_property(&mut self, name: &str, value: Value) -> Result<(), TrackError>;
}

/// Convert a value for assignment to a property; used by [`trackable!`]
#[doc(hidden)]
pub fn convert<T>(property: &str, value: Value) -> Result<T, TrackError>
where
    T: TryFrom<Value>,
{
    let actual = value.kind();
    T::try_from(value).map_err(|_| TrackError::TypeMismatch {
        property: property.to_string(),
        actual,
    })
}

/// Implement [`Trackable`] for a struct from its field names
///
/// Fields listed under `read_only` can be read but not written. Field types
/// must convert to and from [`Value`](crate::Value).
#[macro_export]
macro_rules! trackable {
    ($ty:ty { $($field:ident),* $(,)? } $(read_only { $($ro:ident),* $(,)? })?) => {
        impl $crate::tracked::Trackable for $ty {
            fn property_names(&self) -> &'static [&'static str] {
                &[$(stringify!($field),)* $($(stringify!($ro),)*)?]
            }

            fn get_property(
                &self,
                name: &str,
            ) -> ::std::result::Result<$crate::Value, $crate::tracked::TrackError> {
                match name {
                    $(stringify!($field) => Ok($crate::Value::from(self.$field.clone())),)*
                    $($(stringify!($ro) => Ok($crate::Value::from(self.$ro.clone())),)*)?
                    _ => Err($crate::tracked::TrackError::UnknownProperty(name.to_string())),
                }
            }

            fn set_property(
                &mut self,
                name: &str,
                value: $crate::Value,
            ) -> ::std::result::Result<(), $crate::tracked::TrackError> {
                match name {
                    $(stringify!($field) => {
                        self.$field = $crate::tracked::convert(name, value)?;
                        Ok(())
                    })*
                    $($(stringify!($ro) => {
                        Err($crate::tracked::TrackError::ReadOnly(name.to_string()))
                    })*)?
                    _ => Err($crate::tracked::TrackError::UnknownProperty(name.to_string())),
                }
            }
        }
    };
}

/// Owns a [`Trackable`] value and reports every successful write
///
/// The callback receives the inner value in its post-write state and the
/// property name. A failed write never reaches the callback; a failed
/// callback is reported after the write took effect.
pub struct Tracked<T, F> {
    inner: T,
    on_change: F,
}

impl<T, F> Tracked<T, F>
where
    T: Trackable,
    F: FnMut(&T, &str) -> Result<(), BoxError>,
{
    /// Wrap `inner`
    pub fn new(inner: T, on_change: F) -> Self {
        Self { inner, on_change }
    }

    /// Borrow the inner value
    pub fn get(&self) -> &T {
        &self.inner
    }

    /// Unwrap, dropping the callback
    pub fn into_inner(self) -> T {
        self.inner
    }
}

/// Wrap `inner` with a callback that cannot fail
pub fn track<T, G>(inner: T, mut on_change: G) -> Tracked<T, impl FnMut(&T, &str) -> Result<(), BoxError>>
where
    T: Trackable,
    G: FnMut(&T, &str),
{
    Tracked::new(inner, move |value: &T, property: &str| {
        on_change(value, property);
        Ok(())
    })
}

impl<T, F> Trackable for Tracked<T, F>
where
    T: Trackable,
    F: FnMut(&T, &str) -> Result<(), BoxError>,
{
    fn property_names(&self) -> &'static [&'static str] {
        self.inner.property_names()
    }

    fn get_property(&self, name: &str) -> Result<Value, TrackError> {
        self.inner.get_property(name)
    }

    fn set_property(&mut self, name: &str, value: Value) -> Result<(), TrackError> {
        self.inner.set_property(name, value)?;
        (self.on_change)(&self.inner, name).map_err(|source| TrackError::Callback {
            property: name.to_string(),
            source,
        })
    }
}

impl<T: fmt::Debug, F> fmt::Debug for Tracked<T, F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Tracked").field("inner", &self.inner).finish()
    }
}
