//! Trackwire Bytecode Definitions
//!
//! This crate provides the instruction set, body encoding and verification
//! used for runtime-emitted accessor and constructor bodies.

#![warn(missing_docs)]
#![warn(rust_2018_idioms)]

pub mod constants;
pub mod encoder;
pub mod function;
pub mod opcode;
pub mod verify;

pub use constants::ConstantPool;
pub use encoder::{BytecodeReader, BytecodeWriter, DecodeError};
pub use function::{Function, FunctionBuilder};
pub use opcode::Opcode;
pub use verify::{decode_instructions, verify_function, Instruction, VerifyError};
