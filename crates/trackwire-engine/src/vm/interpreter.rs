//! Bytecode interpreter
//!
//! Executes emitted bodies against a [`Runtime`]. Each interpreter owns its
//! own operand stack, so any number of threads can run bodies on the same
//! runtime concurrently. Registry locks are only taken to clone a class or a
//! callable out; nothing is locked while a body, a native method or a
//! tracking callback runs.
//!
//! Call depth is counted per thread rather than per interpreter. A native
//! method or tracking callback that calls back into the runtime starts a new
//! interpreter, and the nested calls still count against
//! `RuntimeOptions::max_call_depth`.

use std::cell::Cell;
use std::sync::Arc;

use trackwire_bytecode::{BytecodeReader, Function, Opcode};

use super::function_table::Callable;
use super::object::FunctionId;
use super::runtime::Runtime;
use super::stack::Stack;
use super::value::Value;
use crate::{VmError, VmResult};

thread_local! {
    static CALL_DEPTH: Cell<usize> = const { Cell::new(0) };
}

/// Holds one level of the thread's call depth until dropped
struct DepthGuard;

impl DepthGuard {
    fn enter(limit: usize) -> VmResult<Self> {
        CALL_DEPTH.with(|depth| {
            if depth.get() >= limit {
                return Err(VmError::StackOverflow);
            }
            depth.set(depth.get() + 1);
            Ok(DepthGuard)
        })
    }
}

impl Drop for DepthGuard {
    fn drop(&mut self) {
        CALL_DEPTH.with(|depth| depth.set(depth.get().saturating_sub(1)));
    }
}

/// Stack-based interpreter bound to a runtime
pub struct Interpreter<'rt> {
    runtime: &'rt Runtime,
    stack: Stack,
}

impl<'rt> Interpreter<'rt> {
    /// Create an interpreter with limits taken from the runtime's options
    pub fn new(runtime: &'rt Runtime) -> Self {
        Self {
            runtime,
            stack: Stack::with_capacity(runtime.options().max_stack_size),
        }
    }

    /// Nesting depth of calls on the current thread, across all interpreters
    pub fn call_depth() -> usize {
        CALL_DEPTH.with(Cell::get)
    }

    /// Call a function with its arguments (receiver first for methods)
    pub fn call(&mut self, function_id: FunctionId, args: Vec<Value>) -> VmResult<Value> {
        let callable = self.runtime.function(function_id)?;
        if args.len() != callable.param_count() {
            return Err(VmError::ArityMismatch {
                name: callable.name().to_string(),
                expected: callable.param_count(),
                actual: args.len(),
            });
        }

        let _depth = DepthGuard::enter(self.runtime.options().max_call_depth)?;
        match callable {
            Callable::Native(native) => native.call(&args),
            Callable::Bytecode(function) => self.run_frame(function_id, &function, args),
        }
    }

    fn run_frame(
        &mut self,
        function_id: FunctionId,
        function: &Arc<Function>,
        args: Vec<Value>,
    ) -> VmResult<Value> {
        self.stack
            .push_frame(function_id, args, function.local_count)?;
        let result = self.execute(function);
        // Always unwind the frame, even when the body failed
        let popped = self.stack.pop_frame();
        let value = result?;
        popped?;
        Ok(value)
    }

    fn execute(&mut self, function: &Function) -> VmResult<Value> {
        let mut reader = BytecodeReader::new(&function.code);

        loop {
            if !reader.has_more() {
                return Err(VmError::RuntimeError(format!(
                    "Function '{}' ended without returning",
                    function.name
                )));
            }

            match reader.read_opcode()? {
                Opcode::Nop => {}

                Opcode::Pop => {
                    self.stack.pop()?;
                }

                Opcode::Dup => {
                    let value = self.stack.peek()?.clone();
                    self.stack.push(value)?;
                }

                Opcode::ConstNull => self.stack.push(Value::null())?,

                Opcode::ConstStr => {
                    let index = reader.read_u32()?;
                    let s = function.constants.get_string(index).ok_or_else(|| {
                        VmError::RuntimeError(format!(
                            "Constant {} missing in '{}'",
                            index, function.name
                        ))
                    })?;
                    self.stack.push(Value::str(s))?;
                }

                Opcode::LoadLocal => {
                    let index = reader.read_u16()?;
                    let value = self.stack.load_local(index as usize)?;
                    self.stack.push(value)?;
                }

                Opcode::LoadLocal0 => {
                    let value = self.stack.load_local(0)?;
                    self.stack.push(value)?;
                }

                Opcode::LoadLocal1 => {
                    let value = self.stack.load_local(1)?;
                    self.stack.push(value)?;
                }

                Opcode::StoreLocal => {
                    let index = reader.read_u16()?;
                    let value = self.stack.pop()?;
                    self.stack.store_local(index as usize, value)?;
                }

                Opcode::LoadField => {
                    let offset = reader.read_u16()?;
                    let target = self.stack.pop()?;
                    let value = target.expect_object("LOAD_FIELD")?.get_field(offset as usize)?;
                    self.stack.push(value)?;
                }

                Opcode::StoreField => {
                    let offset = reader.read_u16()?;
                    let value = self.stack.pop()?;
                    let target = self.stack.pop()?;
                    target
                        .expect_object("STORE_FIELD")?
                        .set_field(offset as usize, value)?;
                }

                Opcode::CallMethod => {
                    let slot = reader.read_u32()? as usize;
                    let arg_count = reader.read_u8()? as usize;
                    // Receiver first, then the arguments in push order
                    let args = self.stack.pop_n(arg_count + 1)?;
                    let class_id = args[0].expect_object("CALL_METHOD")?.class_id();
                    let class = self.runtime.class(class_id)?;
                    let method = class.get_method(slot).ok_or(VmError::InvalidSlot(slot))?;
                    if let (Some(property), [_, value]) =
                        (class.setter_property(slot), args.as_slice())
                    {
                        property.check_value(&class.name, value)?;
                    }
                    let result = self.call(method, args)?;
                    self.stack.push(result)?;
                }

                Opcode::CallConstructor => {
                    let class_id = reader.read_u32()? as usize;
                    let receiver = self.stack.pop()?;
                    receiver.expect_object("CALL_CONSTRUCTOR")?;
                    let class = self.runtime.class(class_id)?;
                    if let Some(constructor) = class.constructor_id {
                        if class.constructor_arity != 0 {
                            return Err(VmError::ArityMismatch {
                                name: class.name.clone(),
                                expected: class.constructor_arity,
                                actual: 0,
                            });
                        }
                        self.call(constructor, vec![receiver])?;
                    }
                }

                Opcode::InvokeCallback => {
                    let arg_count = reader.read_u8()? as usize;
                    let args = self.stack.pop_n(arg_count)?;
                    let callback = self.stack.pop()?;
                    let callback = callback.as_callback().ok_or_else(|| {
                        VmError::TypeError(format!(
                            "Expected callback for INVOKE_CALLBACK, got {}",
                            callback.kind()
                        ))
                    })?;
                    match args.as_slice() {
                        [Value::Object(instance), Value::Str(property)] => {
                            callback.invoke(instance, property).map_err(|source| {
                                VmError::Callback {
                                    property: property.to_string(),
                                    source,
                                }
                            })?;
                        }
                        _ => {
                            return Err(VmError::TypeError(
                                "INVOKE_CALLBACK expects (object, string)".to_string(),
                            ))
                        }
                    }
                }

                Opcode::Return => return self.stack.pop(),

                Opcode::ReturnVoid => return Ok(Value::null()),
            }
        }
    }
}
