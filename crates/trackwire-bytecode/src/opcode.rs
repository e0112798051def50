//! Bytecode opcodes for the Trackwire runtime
//!
//! The instruction set is deliberately small: it only covers what accessor
//! and constructor bodies need (argument loads, field loads/stores, virtual
//! calls, callback invocation and returns). There is no arithmetic and no
//! control flow.

/// Bytecode opcode enumeration
///
/// All opcodes are single-byte instructions. Some opcodes take additional operands
/// that follow the opcode byte in the bytecode stream.
///
/// Opcodes are organized into categories:
/// - 0x00-0x0F: Stack manipulation & constants
/// - 0x10-0x1F: Local variables (arguments live in locals `0..param_count`)
/// - 0xA0-0xAF: Calls and returns
/// - 0xB0-0xBF: Object operations
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Opcode {
    // ===== Stack Manipulation & Constants (0x00-0x0F) =====
    /// No operation
    Nop = 0x00,
    /// Pop top value from stack
    Pop = 0x01,
    /// Duplicate top stack value
    Dup = 0x02,
    /// Push null constant
    ConstNull = 0x04,
    /// Push string constant from pool (operand: u32 index)
    ConstStr = 0x09,

    // ===== Local Variables (0x10-0x1F) =====
    /// Load local variable onto stack (operand: u16 index)
    LoadLocal = 0x10,
    /// Store top of stack to local variable (operand: u16 index)
    StoreLocal = 0x11,
    /// Load local variable 0, the receiver (optimized, no operand)
    LoadLocal0 = 0x12,
    /// Load local variable 1, the first argument (optimized, no operand)
    LoadLocal1 = 0x13,

    // ===== Calls (0xA0-0xAF) =====
    /// Call method on object through its vtable (operands: u32 slot, u8 argCount).
    /// Pops the arguments and the receiver, pushes the result.
    CallMethod = 0xA1,
    /// Return from function (pop return value)
    Return = 0xA2,
    /// Return from void function
    ReturnVoid = 0xA3,
    /// Run a class constructor on the popped receiver (operand: u32 classId)
    CallConstructor = 0xA4,
    /// Invoke a tracking callback (operand: u8 argCount).
    /// Pops the arguments, then the callback value. Pushes nothing.
    InvokeCallback = 0xA6,

    // ===== Object Operations (0xB0-0xBF) =====
    /// Load object field: pop object, push field (operand: u16 fieldOffset)
    LoadField = 0xB1,
    /// Store object field: pop value, pop object (operand: u16 fieldOffset)
    StoreField = 0xB2,
}

impl Opcode {
    /// Convert byte to opcode
    ///
    /// Returns None if the byte does not correspond to a valid opcode.
    pub fn from_u8(byte: u8) -> Option<Self> {
        match byte {
            0x00 => Some(Self::Nop),
            0x01 => Some(Self::Pop),
            0x02 => Some(Self::Dup),
            0x04 => Some(Self::ConstNull),
            0x09 => Some(Self::ConstStr),

            0x10 => Some(Self::LoadLocal),
            0x11 => Some(Self::StoreLocal),
            0x12 => Some(Self::LoadLocal0),
            0x13 => Some(Self::LoadLocal1),

            0xA1 => Some(Self::CallMethod),
            0xA2 => Some(Self::Return),
            0xA3 => Some(Self::ReturnVoid),
            0xA4 => Some(Self::CallConstructor),
            0xA6 => Some(Self::InvokeCallback),

            0xB1 => Some(Self::LoadField),
            0xB2 => Some(Self::StoreField),

            _ => None,
        }
    }

    /// Convert opcode to byte
    pub fn to_u8(self) -> u8 {
        self as u8
    }

    /// Get the human-readable name of the opcode
    pub fn name(self) -> &'static str {
        match self {
            Self::Nop => "NOP",
            Self::Pop => "POP",
            Self::Dup => "DUP",
            Self::ConstNull => "CONST_NULL",
            Self::ConstStr => "CONST_STR",
            Self::LoadLocal => "LOAD_LOCAL",
            Self::StoreLocal => "STORE_LOCAL",
            Self::LoadLocal0 => "LOAD_LOCAL_0",
            Self::LoadLocal1 => "LOAD_LOCAL_1",
            Self::CallMethod => "CALL_METHOD",
            Self::Return => "RETURN",
            Self::ReturnVoid => "RETURN_VOID",
            Self::CallConstructor => "CALL_CONSTRUCTOR",
            Self::InvokeCallback => "INVOKE_CALLBACK",
            Self::LoadField => "LOAD_FIELD",
            Self::StoreField => "STORE_FIELD",
        }
    }

    /// Number of operand bytes following the opcode byte
    pub fn operand_size(self) -> usize {
        match self {
            Self::Nop
            | Self::Pop
            | Self::Dup
            | Self::ConstNull
            | Self::LoadLocal0
            | Self::LoadLocal1
            | Self::Return
            | Self::ReturnVoid => 0,
            Self::InvokeCallback => 1,
            Self::LoadLocal | Self::StoreLocal | Self::LoadField | Self::StoreField => 2,
            Self::ConstStr | Self::CallConstructor => 4,
            Self::CallMethod => 5,
        }
    }

    /// Check if this opcode is a call instruction
    pub fn is_call(self) -> bool {
        matches!(
            self,
            Self::CallMethod | Self::CallConstructor | Self::InvokeCallback
        )
    }

    /// Check if this opcode is a return instruction
    pub fn is_return(self) -> bool {
        matches!(self, Self::Return | Self::ReturnVoid)
    }
}
