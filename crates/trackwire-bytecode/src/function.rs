//! Function bodies and the builder used to emit them

use crate::constants::ConstantPool;
use crate::encoder::BytecodeWriter;

/// A compiled function body
///
/// Arguments occupy locals `0..param_count`; for methods local 0 is the
/// receiver.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Function {
    /// Function name
    pub name: String,
    /// Number of parameters (including the receiver for methods)
    pub param_count: usize,
    /// Number of additional local variables
    pub local_count: usize,
    /// Bytecode instructions
    pub code: Vec<u8>,
    /// String constants referenced by `CONST_STR`
    pub constants: ConstantPool,
}

impl Function {
    /// Create a function from raw parts
    pub fn new(name: impl Into<String>, param_count: usize, code: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            param_count,
            local_count: 0,
            code,
            constants: ConstantPool::new(),
        }
    }

    /// Total number of local slots (parameters + locals)
    pub fn frame_size(&self) -> usize {
        self.param_count + self.local_count
    }

    /// CRC32 over the body's shape: arity, code and constants.
    ///
    /// The name is excluded so that bodies emitted for differently named but
    /// identically shaped classes compare equal.
    pub fn checksum(&self) -> u32 {
        let mut hasher = crc32fast::Hasher::new();
        hasher.update(&(self.param_count as u32).to_le_bytes());
        hasher.update(&(self.local_count as u32).to_le_bytes());
        hasher.update(&self.code);
        for s in self.constants.strings() {
            hasher.update(&(s.len() as u32).to_le_bytes());
            hasher.update(s.as_bytes());
        }
        hasher.finalize()
    }
}

/// Incremental builder for a [`Function`]
///
/// Pairs a [`BytecodeWriter`] with the function's constant pool so string
/// operands can be interned while emitting.
#[derive(Debug)]
pub struct FunctionBuilder {
    name: String,
    param_count: usize,
    local_count: usize,
    writer: BytecodeWriter,
    constants: ConstantPool,
}

impl FunctionBuilder {
    /// Start a new body
    pub fn new(name: impl Into<String>, param_count: usize) -> Self {
        Self {
            name: name.into(),
            param_count,
            local_count: 0,
            writer: BytecodeWriter::with_capacity(32),
            constants: ConstantPool::new(),
        }
    }

    /// Reserve an extra local slot, returning its index
    pub fn declare_local(&mut self) -> usize {
        let index = self.param_count + self.local_count;
        self.local_count += 1;
        index
    }

    /// Load argument/local `index`
    pub fn load_local(&mut self, index: u16) -> &mut Self {
        self.writer.emit_load_local(index);
        self
    }

    /// Store the top of stack into local `index`
    pub fn store_local(&mut self, index: u16) -> &mut Self {
        self.writer.emit_store_local(index);
        self
    }

    /// Pop an object, push its field at `offset`
    pub fn load_field(&mut self, offset: u16) -> &mut Self {
        self.writer.emit_load_field(offset);
        self
    }

    /// Pop a value and an object, store the value at `offset`
    pub fn store_field(&mut self, offset: u16) -> &mut Self {
        self.writer.emit_store_field(offset);
        self
    }

    /// Push a string constant
    pub fn const_str(&mut self, value: &str) -> &mut Self {
        let index = self.constants.add_string(value);
        self.writer.emit_const_str(index);
        self
    }

    /// Push null
    pub fn const_null(&mut self) -> &mut Self {
        self.writer.emit_const_null();
        self
    }

    /// Virtual call through vtable `slot`
    pub fn call_method(&mut self, slot: u32, arg_count: u8) -> &mut Self {
        self.writer.emit_call_method(slot, arg_count);
        self
    }

    /// Run the constructor of `class_id` on the receiver on top of the stack
    pub fn call_constructor(&mut self, class_id: u32) -> &mut Self {
        self.writer.emit_call_constructor(class_id);
        self
    }

    /// Invoke the callback below `arg_count` arguments
    pub fn invoke_callback(&mut self, arg_count: u8) -> &mut Self {
        self.writer.emit_invoke_callback(arg_count);
        self
    }

    /// Discard the top of stack
    pub fn pop(&mut self) -> &mut Self {
        self.writer.emit_pop();
        self
    }

    /// Return the top of stack
    pub fn ret(&mut self) -> &mut Self {
        self.writer.emit_return();
        self
    }

    /// Return without a value
    pub fn ret_void(&mut self) -> &mut Self {
        self.writer.emit_return_void();
        self
    }

    /// Finish the body
    pub fn build(self) -> Function {
        Function {
            name: self.name,
            param_count: self.param_count,
            local_count: self.local_count,
            code: self.writer.into_bytes(),
            constants: self.constants,
        }
    }
}
