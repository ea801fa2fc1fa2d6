//! CPU emulation for the 8-bit machine.
//!
//! This module implements the complete architecture:
//! - up to 256 byte cells of memory with wraparound addressing
//! - 4 registers: A (accumulator), B (auxiliary), PC, OUT (output latch)
//! - Zero/Carry/Negative flags and a halted bit
//! - 17-instruction set with zero or one operand byte

pub mod memory;
pub mod registers;
pub mod decode;
pub mod execute;

pub use memory::{Memory, MemoryError, DEFAULT_MEMORY_SIZE};
pub use registers::{Flags, Registers};
pub use decode::{Instruction, Opcode, DecodeError};
pub use execute::{Machine, MachineError};
