//! Object model and class system

use std::fmt;
use std::sync::Arc;

use parking_lot::RwLock;
use rustc_hash::FxHashMap;

use super::value::{Value, ValueKind};
use crate::{VmError, VmResult};

/// Index into the runtime class registry
pub type ClassId = usize;

/// Index into the runtime function table
pub type FunctionId = usize;

/// Name of the getter method backing property `property`
pub fn getter_name(property: &str) -> String {
    format!("get_{}", property)
}

/// Name of the setter method backing property `property`
pub fn setter_name(property: &str) -> String {
    format!("set_{}", property)
}

/// Object instance
///
/// Fields sit behind a lock so an object can be shared across threads; the
/// lock is only held for the duration of a single field access.
pub struct Object {
    class_id: ClassId,
    fields: RwLock<Vec<Value>>,
}

/// Shared handle to an [`Object`]
#[derive(Clone)]
pub struct ObjectRef(Arc<Object>);

impl ObjectRef {
    /// Create a new object with the given initial field values
    pub fn new(class_id: ClassId, fields: Vec<Value>) -> Self {
        Self(Arc::new(Object {
            class_id,
            fields: RwLock::new(fields),
        }))
    }

    /// Class of this object
    #[inline]
    pub fn class_id(&self) -> ClassId {
        self.0.class_id
    }

    /// Get a field value by index
    pub fn get_field(&self, index: usize) -> VmResult<Value> {
        let fields = self.0.fields.read();
        fields.get(index).cloned().ok_or(VmError::FieldOutOfBounds {
            index,
            count: fields.len(),
        })
    }

    /// Set a field value by index
    pub fn set_field(&self, index: usize, value: Value) -> VmResult<()> {
        let mut fields = self.0.fields.write();
        let count = fields.len();
        match fields.get_mut(index) {
            Some(slot) => {
                *slot = value;
                Ok(())
            }
            None => Err(VmError::FieldOutOfBounds { index, count }),
        }
    }

    /// Get number of fields
    pub fn field_count(&self) -> usize {
        self.0.fields.read().len()
    }

    /// Identity comparison
    #[inline]
    pub fn ptr_eq(&self, other: &ObjectRef) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }

    /// Stable address, for diagnostics
    pub fn addr(&self) -> usize {
        Arc::as_ptr(&self.0) as usize
    }
}

impl fmt::Debug for ObjectRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Object(class={}, @{:#x})", self.class_id(), self.addr())
    }
}

/// Field layout entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldInfo {
    /// Field name
    pub name: String,
    /// Declared kind
    pub kind: ValueKind,
    /// Position in the object's field vector
    pub index: usize,
}

/// Named method entry pointing at a vtable slot
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MethodEntry {
    /// Vtable slot
    pub slot: usize,
    /// Whether subclasses may override the slot
    pub is_virtual: bool,
}

/// Property metadata
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PropertyInfo {
    /// Property name
    pub name: String,
    /// Declared value kind
    pub kind: ValueKind,
    /// Vtable slot of the getter, if readable
    pub getter: Option<usize>,
    /// Vtable slot of the setter, if writable
    pub setter: Option<usize>,
    /// Whether the accessors can be overridden
    pub is_virtual: bool,
    /// Class that declared the property
    pub declaring_class_id: ClassId,
}

impl PropertyInfo {
    /// Reject a value the declared kind does not accept
    pub fn check_value(&self, class: &str, value: &Value) -> VmResult<()> {
        if self.kind.accepts(value) {
            return Ok(());
        }
        Err(VmError::TypeError(format!(
            "Property '{}.{}' expects {}, got {}",
            class,
            self.name,
            self.kind,
            value.kind()
        )))
    }
}

/// Class definition metadata
#[derive(Debug, Clone)]
pub struct Class {
    /// Class ID (unique identifier)
    pub id: ClassId,
    /// Class name
    pub name: String,
    /// Parent class ID (None for root classes)
    pub parent_id: Option<ClassId>,
    /// Field layout (including inherited)
    pub fields: Vec<FieldInfo>,
    /// Initial field values for new instances
    pub field_defaults: Vec<Value>,
    /// Virtual method table
    pub vtable: VTable,
    /// Method name to vtable slot
    pub methods: FxHashMap<String, MethodEntry>,
    /// Properties in declaration order (including inherited)
    pub properties: Vec<PropertyInfo>,
    /// Constructor function, if any
    pub constructor_id: Option<FunctionId>,
    /// Number of constructor arguments (excluding the receiver)
    pub constructor_arity: usize,
    /// Sealed classes cannot be subclassed
    pub is_sealed: bool,
    /// Capabilities this class declares
    pub interfaces: Vec<String>,
}

impl Class {
    /// Create a new root class
    pub fn new(id: ClassId, name: String) -> Self {
        Self {
            id,
            name,
            parent_id: None,
            fields: Vec::new(),
            field_defaults: Vec::new(),
            vtable: VTable::new(),
            methods: FxHashMap::default(),
            properties: Vec::new(),
            constructor_id: None,
            constructor_arity: 0,
            is_sealed: false,
            interfaces: Vec::new(),
        }
    }

    /// Create a class inheriting layout, vtable, properties and capabilities from `parent`
    pub fn with_parent(id: ClassId, name: String, parent: &Class) -> Self {
        Self {
            id,
            name,
            parent_id: Some(parent.id),
            fields: parent.fields.clone(),
            field_defaults: parent.field_defaults.clone(),
            vtable: parent.vtable.clone(),
            methods: parent.methods.clone(),
            properties: parent.properties.clone(),
            constructor_id: None,
            constructor_arity: 0,
            is_sealed: false,
            interfaces: parent.interfaces.clone(),
        }
    }

    /// Number of fields (including inherited)
    pub fn field_count(&self) -> usize {
        self.fields.len()
    }

    /// Append a field, returning its index
    pub fn add_field(&mut self, name: String, kind: ValueKind, initial: Value) -> usize {
        let index = self.fields.len();
        self.fields.push(FieldInfo { name, kind, index });
        self.field_defaults.push(initial);
        index
    }

    /// Look up a field index by name
    pub fn field_index(&self, name: &str) -> Option<usize> {
        self.fields.iter().find(|f| f.name == name).map(|f| f.index)
    }

    /// Add a new method, returning its vtable slot
    pub fn add_method(&mut self, name: String, function_id: FunctionId, is_virtual: bool) -> usize {
        let slot = self.vtable.add_method(function_id);
        self.methods.insert(name, MethodEntry { slot, is_virtual });
        slot
    }

    /// Replace the implementation of an existing virtual method
    pub fn override_method(&mut self, name: &str, function_id: FunctionId) -> VmResult<usize> {
        let entry = self.methods.get(name).copied().ok_or_else(|| VmError::UnknownMethod {
            class: self.name.clone(),
            method: name.to_string(),
        })?;
        if !entry.is_virtual {
            return Err(VmError::NotOverridable {
                class: self.name.clone(),
                method: name.to_string(),
            });
        }
        self.vtable.override_method(entry.slot, function_id)?;
        Ok(entry.slot)
    }

    /// Look up a method entry by name
    pub fn method(&self, name: &str) -> Option<MethodEntry> {
        self.methods.get(name).copied()
    }

    /// Get method implementation from vtable
    pub fn get_method(&self, slot: usize) -> Option<FunctionId> {
        self.vtable.get_method(slot)
    }

    /// Look up a property by name
    pub fn property(&self, name: &str) -> Option<&PropertyInfo> {
        self.properties.iter().find(|p| p.name == name)
    }

    /// Property whose setter occupies vtable `slot`
    pub fn setter_property(&self, slot: usize) -> Option<&PropertyInfo> {
        self.properties.iter().find(|p| p.setter == Some(slot))
    }

    /// Set the constructor
    pub fn set_constructor(&mut self, function_id: FunctionId, arity: usize) {
        self.constructor_id = Some(function_id);
        self.constructor_arity = arity;
    }

    /// Whether instances can be created without arguments
    pub fn has_default_constructor(&self) -> bool {
        self.constructor_arity == 0
    }

    /// Whether the class declares capability `name`
    pub fn implements(&self, name: &str) -> bool {
        self.interfaces.iter().any(|i| i == name)
    }
}

/// Virtual method table for dynamic dispatch
#[derive(Debug, Clone, Default)]
pub struct VTable {
    /// Method function IDs (indexed by method slot)
    pub methods: Vec<FunctionId>,
}

impl VTable {
    /// Create a new empty vtable
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a method to the vtable (appends to end)
    pub fn add_method(&mut self, function_id: FunctionId) -> usize {
        self.methods.push(function_id);
        self.methods.len() - 1
    }

    /// Get method function ID by index
    pub fn get_method(&self, index: usize) -> Option<FunctionId> {
        self.methods.get(index).copied()
    }

    /// Get number of methods
    pub fn method_count(&self) -> usize {
        self.methods.len()
    }

    /// Override a method at specific index
    pub fn override_method(&mut self, index: usize, function_id: FunctionId) -> VmResult<()> {
        match self.methods.get_mut(index) {
            Some(slot) => {
                *slot = function_id;
                Ok(())
            }
            None => Err(VmError::InvalidSlot(index)),
        }
    }
}
