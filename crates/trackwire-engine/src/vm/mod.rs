//! Trackwire object runtime
//!
//! The runtime in which plain classes are defined and wrapper classes are
//! synthesized:
//! - Class registry with vtable dispatch and single inheritance
//! - Function table holding emitted bodies and native methods
//! - Stack-based interpreter for emitted bodies
//! - Property access with kind checks

pub mod callback;
pub mod class_registry;
pub mod definition;
pub mod function_table;
pub mod interpreter;
pub mod object;
pub mod options;
pub mod runtime;
pub mod stack;
pub mod value;

pub use callback::{BoxError, TrackingCallback};
pub use class_registry::ClassRegistry;
pub use definition::{ClassDefinition, PropertyDefinition, SubclassDefinition};
pub use function_table::{Callable, FunctionTable, NativeMethod};
pub use interpreter::Interpreter;
pub use object::{
    getter_name, setter_name, Class, ClassId, FieldInfo, FunctionId, MethodEntry, ObjectRef,
    PropertyInfo, VTable,
};
pub use options::RuntimeOptions;
pub use runtime::Runtime;
pub use stack::{CallFrame, Stack};
pub use value::{Value, ValueKind};

use trackwire_bytecode::{DecodeError, VerifyError};

/// VM execution errors
#[derive(Debug, thiserror::Error)]
pub enum VmError {
    /// Stack overflow (operand stack or call depth)
    #[error("Stack overflow")]
    StackOverflow,

    /// Stack underflow
    #[error("Stack underflow")]
    StackUnderflow,

    /// Type error
    #[error("Type error: {0}")]
    TypeError(String),

    /// Malformed body
    #[error("Decode error: {0}")]
    Decode(#[from] DecodeError),

    /// Body rejected by the verifier
    #[error("Verification failed: {0}")]
    Verify(#[from] VerifyError),

    /// Class ID not registered
    #[error("Unknown class ID {0}")]
    UnknownClass(ClassId),

    /// Function ID not registered
    #[error("Unknown function ID {0}")]
    UnknownFunction(FunctionId),

    /// No property with that name
    #[error("Class '{class}' has no property '{property}'")]
    UnknownProperty {
        /// Class name
        class: String,
        /// Property name
        property: String,
    },

    /// No method with that name
    #[error("Class '{class}' has no method '{method}'")]
    UnknownMethod {
        /// Class name
        class: String,
        /// Method name
        method: String,
    },

    /// Property has no getter
    #[error("Property '{class}.{property}' is not readable")]
    NotReadable {
        /// Class name
        class: String,
        /// Property name
        property: String,
    },

    /// Property has no setter
    #[error("Property '{class}.{property}' is not writable")]
    NotWritable {
        /// Class name
        class: String,
        /// Property name
        property: String,
    },

    /// Wrong number of arguments
    #[error("'{name}' expects {expected} argument(s), got {actual}")]
    ArityMismatch {
        /// Function or class name
        name: String,
        /// Declared count
        expected: usize,
        /// Supplied count
        actual: usize,
    },

    /// Attempt to subclass a sealed class
    #[error("Class '{0}' is sealed")]
    SealedClass(String),

    /// Attempt to override a non-virtual method
    #[error("Method '{class}.{method}' cannot be overridden")]
    NotOverridable {
        /// Class name
        class: String,
        /// Method name
        method: String,
    },

    /// Duplicate member in a class definition
    #[error("Class '{class}' declares '{member}' twice")]
    DuplicateMember {
        /// Class name
        class: String,
        /// Member name
        member: String,
    },

    /// Field index past the object's layout
    #[error("Field index {index} out of bounds (object has {count} fields)")]
    FieldOutOfBounds {
        /// Requested index
        index: usize,
        /// Number of fields
        count: usize,
    },

    /// Vtable slot not present
    #[error("Invalid vtable slot {0}")]
    InvalidSlot(usize),

    /// A native method failed
    #[error("Native method failed: {0}")]
    Native(#[source] BoxError),

    /// The tracking callback failed after the write took effect
    #[error("Tracking callback failed for '{property}': {source}")]
    Callback {
        /// Property whose write triggered the callback
        property: String,
        /// Error returned by the callback
        #[source]
        source: BoxError,
    },

    /// Runtime error
    #[error("Runtime error: {0}")]
    RuntimeError(String),
}

impl VmError {
    /// Wrap an arbitrary error raised by native code
    pub fn native<E>(error: E) -> Self
    where
        E: Into<BoxError>,
    {
        VmError::Native(error.into())
    }
}

/// VM execution result
pub type VmResult<T> = Result<T, VmError>;
