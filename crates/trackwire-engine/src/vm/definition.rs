//! Class definitions
//!
//! Builders describing classes to register with [`Runtime`](super::Runtime).
//! A [`ClassDefinition`] describes a plain class whose properties are backed
//! by one field each; a [`SubclassDefinition`] describes a class derived from
//! an existing one with extra fields and emitted methods.

use std::fmt;
use std::sync::Arc;

use super::object::{FunctionId, ObjectRef};
use super::value::{Value, ValueKind};
use crate::VmResult;

/// Custom getter: receives the object and the property's backing field index
pub type GetterFn = dyn Fn(&ObjectRef, usize) -> VmResult<Value> + Send + Sync;

/// Custom setter: receives the object, the backing field index and the value
pub type SetterFn = dyn Fn(&ObjectRef, usize, Value) -> VmResult<()> + Send + Sync;

/// Definition for a property of a plain class
#[derive(Clone)]
pub struct PropertyDefinition {
    /// Property name
    pub name: String,
    /// Declared value kind
    pub kind: ValueKind,
    /// Whether a getter is generated
    pub readable: bool,
    /// Whether a setter is generated
    pub writable: bool,
    /// Whether subclasses may override the accessors
    pub is_virtual: bool,
    /// Initial value of the backing field
    pub default: Option<Value>,
    pub(crate) getter: Option<Arc<GetterFn>>,
    pub(crate) setter: Option<Arc<SetterFn>>,
}

impl PropertyDefinition {
    /// Readable, writable, virtual property backed by a field
    pub fn new(name: impl Into<String>, kind: ValueKind) -> Self {
        Self {
            name: name.into(),
            kind,
            readable: true,
            writable: true,
            is_virtual: true,
            default: None,
            getter: None,
            setter: None,
        }
    }

    /// Drop the setter
    pub fn read_only(mut self) -> Self {
        self.writable = false;
        self
    }

    /// Drop the getter
    pub fn write_only(mut self) -> Self {
        self.readable = false;
        self
    }

    /// Mark the accessors as non-overridable
    pub fn non_virtual(mut self) -> Self {
        self.is_virtual = false;
        self
    }

    /// Set the initial value of the backing field
    pub fn default(mut self, value: impl Into<Value>) -> Self {
        self.default = Some(value.into());
        self
    }

    /// Replace the field-backed getter with a native one
    pub fn with_getter<F>(mut self, getter: F) -> Self
    where
        F: Fn(&ObjectRef, usize) -> VmResult<Value> + Send + Sync + 'static,
    {
        self.getter = Some(Arc::new(getter));
        self
    }

    /// Replace the field-backed setter with a native one
    pub fn with_setter<F>(mut self, setter: F) -> Self
    where
        F: Fn(&ObjectRef, usize, Value) -> VmResult<()> + Send + Sync + 'static,
    {
        self.setter = Some(Arc::new(setter));
        self
    }

    /// Initial value of the backing field
    pub fn initial_value(&self) -> Value {
        self.default
            .clone()
            .unwrap_or_else(|| self.kind.default_value())
    }
}

impl fmt::Debug for PropertyDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PropertyDefinition")
            .field("name", &self.name)
            .field("kind", &self.kind)
            .field("readable", &self.readable)
            .field("writable", &self.writable)
            .field("is_virtual", &self.is_virtual)
            .field("default", &self.default)
            .field("custom_getter", &self.getter.is_some())
            .field("custom_setter", &self.setter.is_some())
            .finish()
    }
}

/// Definition of a plain class
#[derive(Debug, Clone)]
pub struct ClassDefinition {
    /// Class name
    pub name: String,
    /// Properties in declaration order
    pub properties: Vec<PropertyDefinition>,
    /// Sealed classes cannot be subclassed
    pub is_sealed: bool,
    /// Number of constructor arguments, assigned to the first properties in order
    pub constructor_arity: usize,
}

impl ClassDefinition {
    /// Start a definition for class `name`
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            properties: Vec::new(),
            is_sealed: false,
            constructor_arity: 0,
        }
    }

    /// Add a property
    pub fn property(mut self, property: PropertyDefinition) -> Self {
        self.properties.push(property);
        self
    }

    /// Forbid subclassing
    pub fn sealed(mut self) -> Self {
        self.is_sealed = true;
        self
    }

    /// Require `arity` constructor arguments
    pub fn constructor_arity(mut self, arity: usize) -> Self {
        self.constructor_arity = arity;
        self
    }
}

/// Definition of a class derived from an existing one
#[derive(Debug, Clone)]
pub struct SubclassDefinition {
    /// Class name
    pub name: String,
    /// Fields appended after the inherited layout
    pub fields: Vec<(String, ValueKind)>,
    /// Methods by name; an inherited name is overridden, a new one is added
    pub methods: Vec<(String, FunctionId)>,
    /// Constructor function and its arity (excluding the receiver)
    pub constructor: Option<(FunctionId, usize)>,
    /// Capabilities declared in addition to inherited ones
    pub interfaces: Vec<String>,
    /// Whether the class can be subclassed further
    pub is_sealed: bool,
}

impl SubclassDefinition {
    /// Start a definition for class `name`
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            fields: Vec::new(),
            methods: Vec::new(),
            constructor: None,
            interfaces: Vec::new(),
            is_sealed: false,
        }
    }

    /// Append a field
    pub fn field(mut self, name: impl Into<String>, kind: ValueKind) -> Self {
        self.fields.push((name.into(), kind));
        self
    }

    /// Add or override a method
    pub fn method(mut self, name: impl Into<String>, function_id: FunctionId) -> Self {
        self.methods.push((name.into(), function_id));
        self
    }

    /// Set the constructor
    pub fn constructor(mut self, function_id: FunctionId, arity: usize) -> Self {
        self.constructor = Some((function_id, arity));
        self
    }

    /// Declare a capability
    pub fn implements(mut self, name: impl Into<String>) -> Self {
        self.interfaces.push(name.into());
        self
    }

    /// Prevent further subclassing
    pub fn sealed(mut self) -> Self {
        self.is_sealed = true;
        self
    }
}
