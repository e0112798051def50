//! Bytecode verification
//!
//! Bodies are straight-line, so verification is a single forward pass that
//! tracks operand stack depth.

use crate::encoder::{BytecodeReader, DecodeError};
use crate::function::Function;
use crate::opcode::Opcode;

/// Bytecode verification errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum VerifyError {
    /// Malformed instruction stream
    #[error("Decode error: {0}")]
    Decode(#[from] DecodeError),

    /// Stack underflow
    #[error("Stack underflow at offset {0}")]
    StackUnderflow(usize),

    /// Invalid constant pool reference
    #[error("Invalid constant pool reference: index {index} at offset {offset}")]
    InvalidConstantRef {
        /// Referenced index
        index: u32,
        /// Instruction offset
        offset: usize,
    },

    /// Invalid local variable reference
    #[error("Invalid local variable reference: index {index} (max {max}) at offset {offset}")]
    InvalidLocalRef {
        /// Referenced local
        index: usize,
        /// Frame size
        max: usize,
        /// Instruction offset
        offset: usize,
    },

    /// Instructions after a return
    #[error("Unreachable code at offset {0}")]
    UnreachableCode(usize),

    /// Execution falls off end
    #[error("Execution falls off end of function at offset {0}")]
    FallOffEnd(usize),
}

/// Parsed instruction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Instruction {
    /// Offset of the opcode byte
    pub offset: usize,
    /// Decoded opcode
    pub opcode: Opcode,
    /// Primary operand (index, slot, offset or class id), 0 if none
    pub operand: u32,
    /// Argument count for call instructions, 0 otherwise
    pub arg_count: u8,
}

/// Decode every instruction of a body
pub fn decode_instructions(code: &[u8]) -> Result<Vec<Instruction>, DecodeError> {
    let mut instructions = Vec::new();
    let mut reader = BytecodeReader::new(code);

    while reader.has_more() {
        let offset = reader.position();
        let opcode = reader.read_opcode()?;
        let (operand, arg_count) = match opcode {
            Opcode::LoadLocal | Opcode::StoreLocal | Opcode::LoadField | Opcode::StoreField => {
                (reader.read_u16()? as u32, 0)
            }
            Opcode::ConstStr | Opcode::CallConstructor => (reader.read_u32()?, 0),
            Opcode::CallMethod => {
                let slot = reader.read_u32()?;
                (slot, reader.read_u8()?)
            }
            Opcode::InvokeCallback => (0, reader.read_u8()?),
            Opcode::LoadLocal0 => (0, 0),
            Opcode::LoadLocal1 => (1, 0),
            _ => (0, 0),
        };
        instructions.push(Instruction {
            offset,
            opcode,
            operand,
            arg_count,
        });
    }

    Ok(instructions)
}

/// Verify a single function's bytecode
pub fn verify_function(function: &Function) -> Result<(), VerifyError> {
    let instructions = decode_instructions(&function.code)?;
    let frame_size = function.frame_size();

    let mut depth: usize = 0;
    let mut terminated = false;

    for instr in &instructions {
        if terminated {
            return Err(VerifyError::UnreachableCode(instr.offset));
        }

        let (pops, pushes) = stack_effect(instr);
        depth = depth
            .checked_sub(pops)
            .ok_or(VerifyError::StackUnderflow(instr.offset))?;
        depth += pushes;

        match instr.opcode {
            Opcode::ConstStr => {
                if function.constants.get_string(instr.operand).is_none() {
                    return Err(VerifyError::InvalidConstantRef {
                        index: instr.operand,
                        offset: instr.offset,
                    });
                }
            }
            Opcode::LoadLocal | Opcode::StoreLocal | Opcode::LoadLocal0 | Opcode::LoadLocal1 => {
                let index = instr.operand as usize;
                if index >= frame_size {
                    return Err(VerifyError::InvalidLocalRef {
                        index,
                        max: frame_size,
                        offset: instr.offset,
                    });
                }
            }
            _ => {}
        }

        terminated = instr.opcode.is_return();
    }

    match instructions.last() {
        Some(last) if last.opcode.is_return() => Ok(()),
        Some(last) => Err(VerifyError::FallOffEnd(last.offset)),
        None => Err(VerifyError::FallOffEnd(0)),
    }
}

/// (values popped, values pushed)
fn stack_effect(instr: &Instruction) -> (usize, usize) {
    let argc = instr.arg_count as usize;
    match instr.opcode {
        Opcode::Nop | Opcode::ReturnVoid => (0, 0),
        Opcode::Pop | Opcode::StoreLocal | Opcode::Return | Opcode::CallConstructor => (1, 0),
        Opcode::Dup => (1, 2),
        Opcode::ConstNull
        | Opcode::ConstStr
        | Opcode::LoadLocal
        | Opcode::LoadLocal0
        | Opcode::LoadLocal1 => (0, 1),
        Opcode::LoadField => (1, 1),
        Opcode::StoreField => (2, 0),
        Opcode::CallMethod => (argc + 1, 1),
        Opcode::InvokeCallback => (argc + 1, 0),
    }
}
