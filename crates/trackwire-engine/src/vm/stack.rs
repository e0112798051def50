//! Stack and call frame management
//!
//! The stack holds both the locals of every active frame and the operand
//! values computed on top of them.
//!
//! ```text
//! ┌─────────────────────────────────────┐
//! │ Operand Stack (top)                 │
//! │   value₁                            │
//! │   value₀                            │
//! ├─────────────────────────────────────┤
//! │ Call Frame N (current)              │  ← base_pointer
//! │   local₁ (first argument)           │
//! │   local₀ (receiver)                 │
//! ├─────────────────────────────────────┤
//! │ Call Frame N-1                      │
//! │   ...                               │
//! └─────────────────────────────────────┘
//! ```

use super::object::FunctionId;
use super::value::Value;
use crate::{VmError, VmResult};

/// Default maximum stack size (in slots)
pub const DEFAULT_MAX_STACK_SIZE: usize = 1024 * 64;

/// Call frame for function invocation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CallFrame {
    /// Function ID being executed
    pub function_id: FunctionId,
    /// Base pointer (start of locals in stack)
    pub base_pointer: usize,
    /// Number of local slots (arguments included)
    pub local_count: usize,
}

impl CallFrame {
    /// First operand slot above the locals
    #[inline]
    pub fn operand_base(&self) -> usize {
        self.base_pointer + self.local_count
    }
}

/// Operand and call frame stack
#[derive(Debug)]
pub struct Stack {
    slots: Vec<Value>,
    frames: Vec<CallFrame>,
    max_size: usize,
}

impl Stack {
    /// Create a new stack with default size
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_MAX_STACK_SIZE)
    }

    /// Create a stack with specific capacity
    pub fn with_capacity(max_size: usize) -> Self {
        Self {
            slots: Vec::with_capacity(64),
            frames: Vec::with_capacity(16),
            max_size,
        }
    }

    // ===== Operand Stack Operations =====

    /// Push a value onto the stack
    #[inline]
    pub fn push(&mut self, value: Value) -> VmResult<()> {
        if self.slots.len() >= self.max_size {
            return Err(VmError::StackOverflow);
        }
        self.slots.push(value);
        Ok(())
    }

    /// Pop a value from the current frame's operands
    #[inline]
    pub fn pop(&mut self) -> VmResult<Value> {
        if self.slots.len() <= self.operand_base() {
            return Err(VmError::StackUnderflow);
        }
        self.slots.pop().ok_or(VmError::StackUnderflow)
    }

    /// Pop `n` values, returned in push order
    pub fn pop_n(&mut self, n: usize) -> VmResult<Vec<Value>> {
        let len = self.slots.len();
        if len < self.operand_base() + n {
            return Err(VmError::StackUnderflow);
        }
        Ok(self.slots.split_off(len - n))
    }

    /// Peek at the top value without popping
    #[inline]
    pub fn peek(&self) -> VmResult<&Value> {
        if self.slots.len() <= self.operand_base() {
            return Err(VmError::StackUnderflow);
        }
        self.slots.last().ok_or(VmError::StackUnderflow)
    }

    /// Get maximum stack size
    #[inline]
    pub fn max_size(&self) -> usize {
        self.max_size
    }

    // ===== Call Frame Management =====

    /// Push a new call frame holding `args` followed by `extra_locals` nulls
    pub fn push_frame(
        &mut self,
        function_id: FunctionId,
        args: Vec<Value>,
        extra_locals: usize,
    ) -> VmResult<()> {
        let local_count = args.len() + extra_locals;
        if self.slots.len() + local_count > self.max_size {
            return Err(VmError::StackOverflow);
        }

        let base_pointer = self.slots.len();
        self.slots.extend(args);
        self.slots
            .extend(std::iter::repeat_with(Value::null).take(extra_locals));
        self.frames.push(CallFrame {
            function_id,
            base_pointer,
            local_count,
        });
        Ok(())
    }

    /// Pop the current call frame, discarding its locals and operands
    pub fn pop_frame(&mut self) -> VmResult<CallFrame> {
        let frame = self
            .frames
            .pop()
            .ok_or_else(|| VmError::RuntimeError("No call frame to pop".to_string()))?;
        self.slots.truncate(frame.base_pointer);
        Ok(frame)
    }

    /// Get the number of active frames
    #[inline]
    pub fn frame_count(&self) -> usize {
        self.frames.len()
    }

    /// Load local `index` of the current frame
    pub fn load_local(&self, index: usize) -> VmResult<Value> {
        let frame = self.frame_or_err()?;
        if index >= frame.local_count {
            return Err(VmError::RuntimeError(format!(
                "Local index {} out of bounds (frame has {})",
                index, frame.local_count
            )));
        }
        Ok(self.slots[frame.base_pointer + index].clone())
    }

    /// Store into local `index` of the current frame
    pub fn store_local(&mut self, index: usize, value: Value) -> VmResult<()> {
        let frame = *self.frame_or_err()?;
        if index >= frame.local_count {
            return Err(VmError::RuntimeError(format!(
                "Local index {} out of bounds (frame has {})",
                index, frame.local_count
            )));
        }
        self.slots[frame.base_pointer + index] = value;
        Ok(())
    }

    fn frame_or_err(&self) -> VmResult<&CallFrame> {
        self.frames
            .last()
            .ok_or_else(|| VmError::RuntimeError("No active call frame".to_string()))
    }

    #[inline]
    fn operand_base(&self) -> usize {
        self.frames.last().map_or(0, CallFrame::operand_base)
    }
}

impl Default for Stack {
    fn default() -> Self {
        Self::new()
    }
}
