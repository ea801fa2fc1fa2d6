//! Instruction decoder.
//!
//! An instruction is one opcode byte optionally followed by one operand byte.
//! Decoding happens in two stages: the opcode byte is looked up into an
//! [`Opcode`] (which knows its operand length), then the operand, if any, is
//! attached to form an [`Instruction`].

use serde::{Serialize, Deserialize};
use thiserror::Error;

/// Opcode byte values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum Opcode {
    Nop = 0x00,
    LdiA = 0x01,
    LdiB = 0x02,
    Lda = 0x03,
    Sta = 0x04,
    Add = 0x05,
    Sub = 0x06,
    And = 0x07,
    Or = 0x08,
    Xor = 0x09,
    Not = 0x0A,
    Jmp = 0x0B,
    Jz = 0x0C,
    Jc = 0x0D,
    In = 0x0E,
    Out = 0x0F,
    Hlt = 0xFF,
}

impl Opcode {
    /// Every defined opcode, in byte order.
    pub const ALL: [Opcode; 17] = [
        Opcode::Nop,
        Opcode::LdiA,
        Opcode::LdiB,
        Opcode::Lda,
        Opcode::Sta,
        Opcode::Add,
        Opcode::Sub,
        Opcode::And,
        Opcode::Or,
        Opcode::Xor,
        Opcode::Not,
        Opcode::Jmp,
        Opcode::Jz,
        Opcode::Jc,
        Opcode::In,
        Opcode::Out,
        Opcode::Hlt,
    ];

    /// The byte this opcode is encoded as.
    #[inline]
    pub const fn byte(self) -> u8 {
        self as u8
    }

    /// Number of operand bytes following the opcode (0 or 1).
    pub const fn operand_len(self) -> usize {
        match self {
            Opcode::LdiA
            | Opcode::LdiB
            | Opcode::Lda
            | Opcode::Sta
            | Opcode::Jmp
            | Opcode::Jz
            | Opcode::Jc => 1,
            _ => 0,
        }
    }

    /// Assembly mnemonic without operands, e.g. `LDI`.
    pub const fn mnemonic(self) -> &'static str {
        match self {
            Opcode::Nop => "NOP",
            Opcode::LdiA | Opcode::LdiB => "LDI",
            Opcode::Lda => "LDA",
            Opcode::Sta => "STA",
            Opcode::Add => "ADD",
            Opcode::Sub => "SUB",
            Opcode::And => "AND",
            Opcode::Or => "OR",
            Opcode::Xor => "XOR",
            Opcode::Not => "NOT",
            Opcode::Jmp => "JMP",
            Opcode::Jz => "JZ",
            Opcode::Jc => "JC",
            Opcode::In => "IN",
            Opcode::Out => "OUT",
            Opcode::Hlt => "HLT",
        }
    }
}

impl TryFrom<u8> for Opcode {
    type Error = DecodeError;

    fn try_from(byte: u8) -> Result<Self, Self::Error> {
        let opcode = match byte {
            0x00 => Opcode::Nop,
            0x01 => Opcode::LdiA,
            0x02 => Opcode::LdiB,
            0x03 => Opcode::Lda,
            0x04 => Opcode::Sta,
            0x05 => Opcode::Add,
            0x06 => Opcode::Sub,
            0x07 => Opcode::And,
            0x08 => Opcode::Or,
            0x09 => Opcode::Xor,
            0x0A => Opcode::Not,
            0x0B => Opcode::Jmp,
            0x0C => Opcode::Jz,
            0x0D => Opcode::Jc,
            0x0E => Opcode::In,
            0x0F => Opcode::Out,
            0xFF => Opcode::Hlt,
            _ => return Err(DecodeError::InvalidOpcode(byte)),
        };
        Ok(opcode)
    }
}

/// A decoded instruction together with its operand.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Instruction {
    /// No operation
    Nop,

    // ==================== Loads / Stores ====================

    /// A := imm
    LdiA(u8),
    /// B := imm
    LdiB(u8),
    /// A := [addr]
    Lda(u8),
    /// [addr] := A
    Sta(u8),

    // ==================== ALU (operand is always B) ====================

    /// A := A + B, carry = bit 8 of the 9-bit sum
    Add,
    /// A := A - B, carry = bit 8 of (A - B) & 0x1FF
    Sub,
    And,
    Or,
    Xor,
    /// A := !A
    Not,

    // ==================== Control Flow ====================

    Jmp(u8),
    /// Jump if Zero
    Jz(u8),
    /// Jump if Carry
    Jc(u8),
    Hlt,

    // ==================== I/O ====================

    /// A := 0. There is no input device.
    In,
    /// OUT := A
    Out,
}

impl Instruction {
    /// Attach an operand to a decoded opcode.
    ///
    /// `operand` is ignored for opcodes that take none.
    pub fn new(opcode: Opcode, operand: u8) -> Self {
        match opcode {
            Opcode::Nop => Instruction::Nop,
            Opcode::LdiA => Instruction::LdiA(operand),
            Opcode::LdiB => Instruction::LdiB(operand),
            Opcode::Lda => Instruction::Lda(operand),
            Opcode::Sta => Instruction::Sta(operand),
            Opcode::Add => Instruction::Add,
            Opcode::Sub => Instruction::Sub,
            Opcode::And => Instruction::And,
            Opcode::Or => Instruction::Or,
            Opcode::Xor => Instruction::Xor,
            Opcode::Not => Instruction::Not,
            Opcode::Jmp => Instruction::Jmp(operand),
            Opcode::Jz => Instruction::Jz(operand),
            Opcode::Jc => Instruction::Jc(operand),
            Opcode::In => Instruction::In,
            Opcode::Out => Instruction::Out,
            Opcode::Hlt => Instruction::Hlt,
        }
    }

    /// The opcode this instruction encodes to.
    pub fn opcode(&self) -> Opcode {
        match self {
            Instruction::Nop => Opcode::Nop,
            Instruction::LdiA(_) => Opcode::LdiA,
            Instruction::LdiB(_) => Opcode::LdiB,
            Instruction::Lda(_) => Opcode::Lda,
            Instruction::Sta(_) => Opcode::Sta,
            Instruction::Add => Opcode::Add,
            Instruction::Sub => Opcode::Sub,
            Instruction::And => Opcode::And,
            Instruction::Or => Opcode::Or,
            Instruction::Xor => Opcode::Xor,
            Instruction::Not => Opcode::Not,
            Instruction::Jmp(_) => Opcode::Jmp,
            Instruction::Jz(_) => Opcode::Jz,
            Instruction::Jc(_) => Opcode::Jc,
            Instruction::In => Opcode::In,
            Instruction::Out => Opcode::Out,
            Instruction::Hlt => Opcode::Hlt,
        }
    }

    /// The operand byte, for instructions that carry one.
    pub fn operand(&self) -> Option<u8> {
        match *self {
            Instruction::LdiA(v)
            | Instruction::LdiB(v)
            | Instruction::Lda(v)
            | Instruction::Sta(v)
            | Instruction::Jmp(v)
            | Instruction::Jz(v)
            | Instruction::Jc(v) => Some(v),
            _ => None,
        }
    }

    /// Size of the encoded instruction in bytes (1 or 2).
    pub fn size(&self) -> usize {
        1 + self.opcode().operand_len()
    }

    /// Machine encoding of this instruction.
    pub fn encode(&self) -> Vec<u8> {
        let mut bytes = vec![self.opcode().byte()];
        bytes.extend(self.operand());
        bytes
    }
}

impl std::fmt::Display for Instruction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mnemonic = self.opcode().mnemonic();
        match *self {
            Instruction::LdiA(v) => write!(f, "{} A,#{:#04x}", mnemonic, v),
            Instruction::LdiB(v) => write!(f, "{} B,#{:#04x}", mnemonic, v),
            Instruction::Add
            | Instruction::Sub
            | Instruction::And
            | Instruction::Or
            | Instruction::Xor => write!(f, "{} B", mnemonic),
            Instruction::Not => write!(f, "{} A", mnemonic),
            _ => match self.operand() {
                Some(addr) => write!(f, "{} {:#04x}", mnemonic, addr),
                None => f.write_str(mnemonic),
            },
        }
    }
}

/// Errors that can occur during instruction decoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum DecodeError {
    #[error("invalid opcode: {0:#04x}")]
    InvalidOpcode(u8),
}
