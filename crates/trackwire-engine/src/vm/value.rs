//! Runtime value representation
//!
//! Values are a plain tagged enum. Heap values (strings, objects, callbacks)
//! are reference counted; object and callback equality is identity.

use std::fmt;
use std::sync::Arc;

use super::callback::TrackingCallback;
use super::object::ObjectRef;
use crate::{VmError, VmResult};

/// A runtime value
#[derive(Clone, Default)]
pub enum Value {
    /// Absence of a value
    #[default]
    Null,
    /// Boolean
    Bool(bool),
    /// 32-bit integer
    I32(i32),
    /// 64-bit float
    F64(f64),
    /// Immutable string
    Str(Arc<str>),
    /// Object reference
    Object(ObjectRef),
    /// Tracking callback reference
    Callback(TrackingCallback),
}

/// Kind of a value, used for property type checks
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueKind {
    /// Accepts any value
    Any,
    /// Null
    Null,
    /// Boolean
    Bool,
    /// 32-bit integer
    I32,
    /// 64-bit float
    F64,
    /// String
    Str,
    /// Object reference
    Object,
    /// Tracking callback
    Callback,
}

impl ValueKind {
    /// Whether a value of this declared kind may hold `value`.
    ///
    /// Reference kinds are nullable, primitive kinds are not.
    pub fn accepts(self, value: &Value) -> bool {
        match (self, value.kind()) {
            (Self::Any, _) => true,
            (Self::Str | Self::Object | Self::Callback, ValueKind::Null) => true,
            (expected, actual) => expected == actual,
        }
    }

    /// Initial field value for this kind
    pub fn default_value(self) -> Value {
        match self {
            Self::Bool => Value::Bool(false),
            Self::I32 => Value::I32(0),
            Self::F64 => Value::F64(0.0),
            _ => Value::Null,
        }
    }

    /// Lowercase name used in diagnostics
    pub fn name(self) -> &'static str {
        match self {
            Self::Any => "any",
            Self::Null => "null",
            Self::Bool => "bool",
            Self::I32 => "i32",
            Self::F64 => "f64",
            Self::Str => "string",
            Self::Object => "object",
            Self::Callback => "callback",
        }
    }
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl Value {
    /// Create a null value
    #[inline]
    pub const fn null() -> Self {
        Value::Null
    }

    /// Create a string value
    pub fn str(s: &str) -> Self {
        Value::Str(Arc::from(s))
    }

    /// Kind of this value
    pub fn kind(&self) -> ValueKind {
        match self {
            Value::Null => ValueKind::Null,
            Value::Bool(_) => ValueKind::Bool,
            Value::I32(_) => ValueKind::I32,
            Value::F64(_) => ValueKind::F64,
            Value::Str(_) => ValueKind::Str,
            Value::Object(_) => ValueKind::Object,
            Value::Callback(_) => ValueKind::Callback,
        }
    }

    /// Check if this value is null
    #[inline]
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Extract boolean value
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Extract i32 value
    pub fn as_i32(&self) -> Option<i32> {
        match self {
            Value::I32(i) => Some(*i),
            _ => None,
        }
    }

    /// Extract f64 value
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::F64(f) => Some(*f),
            _ => None,
        }
    }

    /// Borrow string contents
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }

    /// Borrow object reference
    pub fn as_object(&self) -> Option<&ObjectRef> {
        match self {
            Value::Object(o) => Some(o),
            _ => None,
        }
    }

    /// Borrow callback reference
    pub fn as_callback(&self) -> Option<&TrackingCallback> {
        match self {
            Value::Callback(c) => Some(c),
            _ => None,
        }
    }

    /// Object reference or a type error naming `context`
    pub(crate) fn expect_object(&self, context: &str) -> VmResult<&ObjectRef> {
        self.as_object().ok_or_else(|| {
            VmError::TypeError(format!("Expected object for {}, got {}", context, self.kind()))
        })
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Null, Value::Null) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::I32(a), Value::I32(b)) => a == b,
            (Value::F64(a), Value::F64(b)) => a == b,
            (Value::Str(a), Value::Str(b)) => a == b,
            (Value::Object(a), Value::Object(b)) => a.ptr_eq(b),
            (Value::Callback(a), Value::Callback(b)) => a.ptr_eq(b),
            _ => false,
        }
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "null"),
            Value::Bool(b) => write!(f, "{}", b),
            Value::I32(i) => write!(f, "{}", i),
            Value::F64(x) => write!(f, "{}", x),
            Value::Str(s) => write!(f, "{:?}", s),
            Value::Object(o) => write!(f, "{:?}", o),
            Value::Callback(_) => write!(f, "<callback>"),
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<i32> for Value {
    fn from(i: i32) -> Self {
        Value::I32(i)
    }
}

impl From<f64> for Value {
    fn from(x: f64) -> Self {
        Value::F64(x)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::str(s)
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Str(Arc::from(s))
    }
}

impl From<ObjectRef> for Value {
    fn from(o: ObjectRef) -> Self {
        Value::Object(o)
    }
}

impl From<TrackingCallback> for Value {
    fn from(c: TrackingCallback) -> Self {
        Value::Callback(c)
    }
}

fn mismatch(expected: ValueKind, actual: &Value) -> VmError {
    VmError::TypeError(format!("Expected {}, got {}", expected, actual.kind()))
}

impl TryFrom<Value> for bool {
    type Error = VmError;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        value.as_bool().ok_or_else(|| mismatch(ValueKind::Bool, &value))
    }
}

impl TryFrom<Value> for i32 {
    type Error = VmError;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        value.as_i32().ok_or_else(|| mismatch(ValueKind::I32, &value))
    }
}

impl TryFrom<Value> for f64 {
    type Error = VmError;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        value.as_f64().ok_or_else(|| mismatch(ValueKind::F64, &value))
    }
}

impl TryFrom<Value> for String {
    type Error = VmError;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        match value {
            Value::Str(s) => Ok(s.to_string()),
            other => Err(mismatch(ValueKind::Str, &other)),
        }
    }
}

impl TryFrom<Value> for ObjectRef {
    type Error = VmError;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        match value {
            Value::Object(o) => Ok(o),
            other => Err(mismatch(ValueKind::Object, &other)),
        }
    }
}
