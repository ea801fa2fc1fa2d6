//! Register file and flag unit.
//!
//! The processor has four 8-bit registers:
//! - A: accumulator (every ALU result lands here)
//! - B: auxiliary operand register
//! - PC: program counter
//! - OUT: output latch, the only externally visible channel
//!
//! plus the Zero/Carry/Negative flags and the halted bit.

use serde::{Serialize, Deserialize};

/// Condition flags.
///
/// Every flag-setting instruction overwrites all three at once, so there is
/// no way to update one flag alone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Flags {
    /// Set when the last result was zero.
    pub zero: bool,
    /// Carry (ADD) or borrow (SUB) out of bit 7. Cleared by every other
    /// flag-setting instruction.
    pub carry: bool,
    /// Bit 7 of the last result.
    pub negative: bool,
}

impl Flags {
    /// The flag unit: derive all three flags from an 8-bit result and the
    /// instruction's own carry term.
    pub const fn from_result(value: u8, carry: bool) -> Self {
        Self {
            zero: value == 0,
            carry,
            negative: value & 0x80 != 0,
        }
    }
}

impl std::fmt::Display for Flags {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let bit = |set: bool, c: char| if set { c } else { '-' };
        write!(
            f,
            "{}{}{}",
            bit(self.zero, 'Z'),
            bit(self.carry, 'C'),
            bit(self.negative, 'N')
        )
    }
}

/// The register file.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Registers {
    /// A: accumulator
    pub a: u8,

    /// B: auxiliary register, second ALU operand
    pub b: u8,

    /// PC: address of the next byte to fetch
    pub pc: u8,

    /// OUT: output latch
    pub out: u8,

    /// Zero/Carry/Negative
    pub flags: Flags,

    /// Set by HLT. Nothing clears it except a reset.
    pub halted: bool,
}

impl Registers {
    /// Create a new register file with all values zeroed.
    pub fn new() -> Self {
        Self::default()
    }

    /// Reset all registers, flags and the halted bit.
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// Overwrite all flags from a result value.
    pub fn set_flags(&mut self, value: u8, carry: bool) {
        self.flags = Flags::from_result(value, carry);
    }

    /// Load A and set flags from it in one go.
    pub fn set_a(&mut self, value: u8, carry: bool) {
        self.a = value;
        self.set_flags(value, carry);
    }

    /// Increment the program counter modulo `memory_size`.
    /// Returns the old value.
    pub fn advance_pc(&mut self, memory_size: usize) -> u8 {
        let old = self.pc;
        // memory_size <= 256, so the result always fits.
        self.pc = ((old as usize + 1) % memory_size) as u8;
        old
    }

    /// Set the program counter to an absolute address, wrapped into memory.
    pub fn jump(&mut self, addr: u8, memory_size: usize) {
        self.pc = (addr as usize % memory_size) as u8;
    }
}
