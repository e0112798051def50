//! The object runtime
//!
//! Owns the class registry and function table and exposes the primitives the
//! proxy core builds on: define a class, define a subclass with emitted
//! methods, instantiate through a constructor, and access properties through
//! vtable dispatch.

use std::sync::Arc;

use parking_lot::RwLock;
use rustc_hash::FxHashSet;
use tracing::debug;
use trackwire_bytecode::{verify_function, Function, FunctionBuilder};

use super::class_registry::ClassRegistry;
use super::definition::{ClassDefinition, PropertyDefinition, SubclassDefinition};
use super::function_table::{Callable, FunctionTable, NativeMethod};
use super::interpreter::Interpreter;
use super::object::{getter_name, setter_name, Class, ClassId, FunctionId, ObjectRef, PropertyInfo};
use super::options::RuntimeOptions;
use super::value::Value;
use crate::{VmError, VmResult};

/// Shared object runtime
///
/// `Runtime` is `Send + Sync`; share it behind an `Arc`. The registry and
/// function table each sit behind their own lock and the two are never held
/// together.
#[derive(Debug)]
pub struct Runtime {
    options: RuntimeOptions,
    classes: RwLock<ClassRegistry>,
    functions: RwLock<FunctionTable>,
}

/// Accessor functions generated for one property
struct Accessors {
    getter: Option<FunctionId>,
    setter: Option<FunctionId>,
}

impl Runtime {
    /// Create an empty runtime
    pub fn new(options: RuntimeOptions) -> Self {
        Self {
            options,
            classes: RwLock::new(ClassRegistry::new()),
            functions: RwLock::new(FunctionTable::new()),
        }
    }

    /// Runtime options
    pub fn options(&self) -> &RuntimeOptions {
        &self.options
    }

    // ===== Functions =====

    /// Register a bytecode body, verifying it first when enabled
    pub fn define_function(&self, function: Function) -> VmResult<FunctionId> {
        if self.options.verify_functions {
            verify_function(&function)?;
        }
        Ok(self
            .functions
            .write()
            .register(Callable::Bytecode(Arc::new(function))))
    }

    /// Register a native method
    pub fn define_native(&self, method: NativeMethod) -> FunctionId {
        self.functions.write().register(Callable::Native(method))
    }

    /// Look up a callable
    pub fn function(&self, id: FunctionId) -> VmResult<Callable> {
        self.functions
            .read()
            .get(id)
            .ok_or(VmError::UnknownFunction(id))
    }

    /// Number of registered functions
    pub fn function_count(&self) -> usize {
        self.functions.read().len()
    }

    // ===== Classes =====

    /// Define a plain class whose properties are each backed by one field
    pub fn define_class(&self, definition: ClassDefinition) -> VmResult<ClassId> {
        let mut seen = FxHashSet::default();
        for property in &definition.properties {
            if !seen.insert(property.name.as_str()) {
                return Err(VmError::DuplicateMember {
                    class: definition.name.clone(),
                    member: property.name.clone(),
                });
            }
        }
        if definition.constructor_arity > definition.properties.len() {
            return Err(VmError::RuntimeError(format!(
                "Constructor of '{}' takes {} arguments but the class has {} properties",
                definition.name,
                definition.constructor_arity,
                definition.properties.len()
            )));
        }

        // Bodies only refer to field offsets, so they can be registered
        // before the class ID is known.
        let mut accessors = Vec::with_capacity(definition.properties.len());
        for (index, property) in definition.properties.iter().enumerate() {
            accessors.push(self.define_accessors(property, index)?);
        }
        let constructor = match definition.constructor_arity {
            0 => None,
            arity => Some(self.define_function(field_constructor(&definition.name, arity)?)?),
        };

        let mut classes = self.classes.write();
        let id = classes.next_class_id();
        let mut class = Class::new(id, definition.name.clone());
        class.is_sealed = definition.is_sealed;

        for (property, accessors) in definition.properties.iter().zip(accessors) {
            class.add_field(property.name.clone(), property.kind, property.initial_value());
            let getter = accessors.getter.map(|fid| {
                class.add_method(getter_name(&property.name), fid, property.is_virtual)
            });
            let setter = accessors.setter.map(|fid| {
                class.add_method(setter_name(&property.name), fid, property.is_virtual)
            });
            class.properties.push(PropertyInfo {
                name: property.name.clone(),
                kind: property.kind,
                getter,
                setter,
                is_virtual: property.is_virtual,
                declaring_class_id: id,
            });
        }
        if let Some(fid) = constructor {
            class.set_constructor(fid, definition.constructor_arity);
        }

        debug!(
            class = %definition.name,
            id,
            properties = definition.properties.len(),
            "defined class"
        );
        Ok(classes.register_class(class))
    }

    /// Define a class derived from `parent_id`
    ///
    /// Fields are appended after the inherited layout. A method whose name is
    /// already present overrides the inherited slot; any other name gets a
    /// new virtual slot.
    pub fn define_subclass(
        &self,
        parent_id: ClassId,
        definition: SubclassDefinition,
    ) -> VmResult<ClassId> {
        let parent = self.class(parent_id)?;
        if parent.is_sealed {
            return Err(VmError::SealedClass(parent.name.clone()));
        }

        let mut classes = self.classes.write();
        let id = classes.next_class_id();
        let mut class = Class::with_parent(id, definition.name.clone(), &parent);
        class.is_sealed = definition.is_sealed;

        for (name, kind) in definition.fields {
            if class.field_index(&name).is_some() {
                return Err(VmError::DuplicateMember {
                    class: definition.name.clone(),
                    member: name,
                });
            }
            class.add_field(name, kind, kind.default_value());
        }
        for (name, function_id) in definition.methods {
            if class.method(&name).is_some() {
                class.override_method(&name, function_id)?;
            } else {
                class.add_method(name, function_id, true);
            }
        }
        if let Some((function_id, arity)) = definition.constructor {
            class.set_constructor(function_id, arity);
        }
        for interface in definition.interfaces {
            if !class.implements(&interface) {
                class.interfaces.push(interface);
            }
        }

        debug!(class = %definition.name, id, parent = %parent.name, "defined subclass");
        Ok(classes.register_class(class))
    }

    /// Look up a class by ID
    pub fn class(&self, id: ClassId) -> VmResult<Arc<Class>> {
        self.classes
            .read()
            .get_class(id)
            .ok_or(VmError::UnknownClass(id))
    }

    /// Look up a class by name (the first class registered under it)
    pub fn class_by_name(&self, name: &str) -> Option<Arc<Class>> {
        self.classes.read().get_class_by_name(name)
    }

    /// Number of registered classes
    pub fn class_count(&self) -> usize {
        self.classes.read().len()
    }

    /// Whether `class_id` is `ancestor_id` or derives from it
    pub fn is_subclass_of(&self, class_id: ClassId, ancestor_id: ClassId) -> bool {
        let classes = self.classes.read();
        let mut current = Some(class_id);
        while let Some(id) = current {
            if id == ancestor_id {
                return true;
            }
            current = classes.get_class(id).and_then(|c| c.parent_id);
        }
        false
    }

    /// Whether `object` is an instance of `class_id` or one of its subclasses
    pub fn is_instance_of(&self, object: &ObjectRef, class_id: ClassId) -> bool {
        self.is_subclass_of(object.class_id(), class_id)
    }

    // ===== Instances =====

    /// Allocate an instance with default field values, without running a constructor
    pub fn allocate(&self, class_id: ClassId) -> VmResult<ObjectRef> {
        let class = self.class(class_id)?;
        Ok(ObjectRef::new(class.id, class.field_defaults.clone()))
    }

    /// Allocate an instance and run its constructor with `args`
    pub fn instantiate(&self, class_id: ClassId, args: Vec<Value>) -> VmResult<ObjectRef> {
        let class = self.class(class_id)?;
        if args.len() != class.constructor_arity {
            return Err(VmError::ArityMismatch {
                name: class.name.clone(),
                expected: class.constructor_arity,
                actual: args.len(),
            });
        }

        let object = ObjectRef::new(class.id, class.field_defaults.clone());
        if let Some(constructor) = class.constructor_id {
            let mut call_args = Vec::with_capacity(args.len() + 1);
            call_args.push(Value::Object(object.clone()));
            call_args.extend(args);
            Interpreter::new(self).call(constructor, call_args)?;
        }
        Ok(object)
    }

    // ===== Dispatch =====

    /// Read a property through its (possibly overridden) getter
    pub fn get_property(&self, object: &ObjectRef, name: &str) -> VmResult<Value> {
        let class = self.class(object.class_id())?;
        let property = lookup_property(&class, name)?;
        let slot = property.getter.ok_or_else(|| VmError::NotReadable {
            class: class.name.clone(),
            property: name.to_string(),
        })?;
        let function_id = class.get_method(slot).ok_or(VmError::InvalidSlot(slot))?;
        Interpreter::new(self).call(function_id, vec![Value::Object(object.clone())])
    }

    /// Write a property through its (possibly overridden) setter
    pub fn set_property(
        &self,
        object: &ObjectRef,
        name: &str,
        value: impl Into<Value>,
    ) -> VmResult<()> {
        let value = value.into();
        let class = self.class(object.class_id())?;
        let property = lookup_property(&class, name)?;
        let slot = property.setter.ok_or_else(|| VmError::NotWritable {
            class: class.name.clone(),
            property: name.to_string(),
        })?;
        property.check_value(&class.name, &value)?;
        let function_id = class.get_method(slot).ok_or(VmError::InvalidSlot(slot))?;
        Interpreter::new(self).call(function_id, vec![Value::Object(object.clone()), value])?;
        Ok(())
    }

    /// Call a method by name
    ///
    /// An argument passed to a property setter is checked against the declared kind.
    pub fn invoke(&self, object: &ObjectRef, method: &str, args: Vec<Value>) -> VmResult<Value> {
        let class = self.class(object.class_id())?;
        let entry = class.method(method).ok_or_else(|| VmError::UnknownMethod {
            class: class.name.clone(),
            method: method.to_string(),
        })?;
        let function_id = class
            .get_method(entry.slot)
            .ok_or(VmError::InvalidSlot(entry.slot))?;
        if let (Some(property), [value]) = (class.setter_property(entry.slot), args.as_slice()) {
            property.check_value(&class.name, value)?;
        }

        let mut call_args = Vec::with_capacity(args.len() + 1);
        call_args.push(Value::Object(object.clone()));
        call_args.extend(args);
        Interpreter::new(self).call(function_id, call_args)
    }

    fn define_accessors(&self, property: &PropertyDefinition, field: usize) -> VmResult<Accessors> {
        let offset = field_offset(field)?;

        let getter = if !property.readable {
            None
        } else if let Some(custom) = property.getter.clone() {
            let name = getter_name(&property.name);
            Some(self.define_native(NativeMethod::new(name.clone(), 1, move |args| {
                match args {
                    [Value::Object(this)] => custom(this, field),
                    _ => Err(receiver_error(&name)),
                }
            })))
        } else {
            Some(self.define_function(field_getter(&property.name, offset))?)
        };

        let setter = if !property.writable {
            None
        } else if let Some(custom) = property.setter.clone() {
            let name = setter_name(&property.name);
            Some(self.define_native(NativeMethod::new(name.clone(), 2, move |args| {
                match args {
                    [Value::Object(this), value] => {
                        custom(this, field, value.clone())?;
                        Ok(Value::null())
                    }
                    _ => Err(receiver_error(&name)),
                }
            })))
        } else {
            Some(self.define_function(field_setter(&property.name, offset))?)
        };

        Ok(Accessors { getter, setter })
    }
}

impl Default for Runtime {
    fn default() -> Self {
        Self::new(RuntimeOptions::default())
    }
}

fn lookup_property<'c>(class: &'c Class, name: &str) -> VmResult<&'c PropertyInfo> {
    class.property(name).ok_or_else(|| VmError::UnknownProperty {
        class: class.name.clone(),
        property: name.to_string(),
    })
}

fn receiver_error(method: &str) -> VmError {
    VmError::TypeError(format!("'{}' called without an object receiver", method))
}

fn field_offset(index: usize) -> VmResult<u16> {
    u16::try_from(index)
        .map_err(|_| VmError::RuntimeError(format!("Field index {} exceeds u16", index)))
}

/// `return this.<field>`
fn field_getter(property: &str, field: u16) -> Function {
    let mut b = FunctionBuilder::new(getter_name(property), 1);
    b.load_local(0).load_field(field).ret();
    b.build()
}

/// `this.<field> = value`
fn field_setter(property: &str, field: u16) -> Function {
    let mut b = FunctionBuilder::new(setter_name(property), 2);
    b.load_local(0).load_local(1).store_field(field).ret_void();
    b.build()
}

/// Stores each argument into the field of the same position
fn field_constructor(class: &str, arity: usize) -> VmResult<Function> {
    let mut b = FunctionBuilder::new(format!("{}::.ctor", class), arity + 1);
    for index in 0..arity {
        let offset = field_offset(index)?;
        b.load_local(0).load_local(offset + 1).store_field(offset);
    }
    b.ret_void();
    Ok(b.build())
}
