//! # byte8
//!
//! A deterministic emulator for a minimal 8-bit accumulator machine.
//!
//! The machine has an accumulator, one auxiliary register, an output latch,
//! Zero/Carry/Negative flags and up to 256 bytes of wraparound memory. Given
//! the same memory image it always produces the same result, bit for bit.

pub mod cpu;
pub mod config;
pub mod image;
pub mod demo;

#[cfg(feature = "tui")]
pub mod tui;

#[cfg(feature = "wasm")]
pub mod wasm;

// Re-export commonly used types
pub use cpu::{Machine, MachineError, Memory, Registers, Flags, Instruction, Opcode};
pub use config::MachineConfig;
pub use image::{load_image, ImageError, ProgramImage};

#[cfg(feature = "tui")]
pub use tui::run_debugger;
