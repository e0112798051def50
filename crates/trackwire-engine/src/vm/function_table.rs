//! Function table: emitted bytecode bodies and native methods

use std::fmt;
use std::sync::Arc;

use trackwire_bytecode::Function;

use super::object::FunctionId;
use super::value::Value;
use crate::VmResult;

type NativeFn = dyn Fn(&[Value]) -> VmResult<Value> + Send + Sync;

/// A method implemented in Rust
///
/// Receives its arguments with the receiver first.
#[derive(Clone)]
pub struct NativeMethod {
    /// Method name (for diagnostics)
    pub name: String,
    /// Number of parameters including the receiver
    pub param_count: usize,
    func: Arc<NativeFn>,
}

impl NativeMethod {
    /// Wrap a closure
    pub fn new<F>(name: impl Into<String>, param_count: usize, func: F) -> Self
    where
        F: Fn(&[Value]) -> VmResult<Value> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            param_count,
            func: Arc::new(func),
        }
    }

    /// Call the native implementation
    pub fn call(&self, args: &[Value]) -> VmResult<Value> {
        (self.func)(args)
    }
}

impl fmt::Debug for NativeMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NativeMethod")
            .field("name", &self.name)
            .field("param_count", &self.param_count)
            .finish()
    }
}

/// Something the interpreter can call
#[derive(Debug, Clone)]
pub enum Callable {
    /// Emitted bytecode body
    Bytecode(Arc<Function>),
    /// Rust closure
    Native(NativeMethod),
}

impl Callable {
    /// Name of the callable
    pub fn name(&self) -> &str {
        match self {
            Callable::Bytecode(f) => &f.name,
            Callable::Native(n) => &n.name,
        }
    }

    /// Number of parameters including the receiver
    pub fn param_count(&self) -> usize {
        match self {
            Callable::Bytecode(f) => f.param_count,
            Callable::Native(n) => n.param_count,
        }
    }
}

/// Append-only table of callables indexed by [`FunctionId`]
#[derive(Debug, Default)]
pub struct FunctionTable {
    functions: Vec<Callable>,
}

impl FunctionTable {
    /// Create an empty table
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a callable, returning its ID
    pub fn register(&mut self, callable: Callable) -> FunctionId {
        self.functions.push(callable);
        self.functions.len() - 1
    }

    /// Look up a callable
    pub fn get(&self, id: FunctionId) -> Option<Callable> {
        self.functions.get(id).cloned()
    }

    /// Number of registered callables
    pub fn len(&self) -> usize {
        self.functions.len()
    }

    /// Check if the table is empty
    pub fn is_empty(&self) -> bool {
        self.functions.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_register_and_get() {
        let mut table = FunctionTable::new();
        let a = table.register(Callable::Bytecode(Arc::new(Function::new("a", 1, vec![]))));
        let b = table.register(Callable::Native(NativeMethod::new("b", 2, |_| {
            Ok(Value::null())
        })));

        assert_eq!((a, b), (0, 1));
        assert_eq!(table.get(0).unwrap().name(), "a");
        assert_eq!(table.get(1).unwrap().param_count(), 2);
        assert!(table.get(2).is_none());
    }

    #[test]
    fn test_native_call() {
        let native = NativeMethod::new("echo", 2, |args| Ok(args[1].clone()));
        let out = native.call(&[Value::null(), Value::from(5)]).unwrap();
        assert_eq!(out, Value::from(5));
    }
}
