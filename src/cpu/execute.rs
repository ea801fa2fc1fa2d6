//! Execution engine.
//!
//! Implements the fetch-decode-execute cycle, every instruction's behavior,
//! and the bounded run loop.

use crate::config::MachineConfig;
use crate::cpu::{Memory, Registers};
use crate::cpu::decode::{Instruction, Opcode};
use crate::cpu::memory::MemoryError;
use serde::{Serialize, Deserialize};
use thiserror::Error;

/// The whole machine: registers plus memory.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Machine {
    /// Registers, flags and the halted bit.
    pub regs: Registers,
    /// Main memory.
    pub mem: Memory,
    /// Instructions successfully executed since creation or reset.
    pub cycles: u64,
    /// Last executed instruction (for debugging).
    last_instr: Option<Instruction>,
}

impl Machine {
    /// Create a machine with 256 bytes of memory and zeroed state.
    pub fn new() -> Self {
        Self::with_memory(Memory::new())
    }

    /// Create a machine with `size` bytes of memory (1-256).
    pub fn with_memory_size(size: usize) -> Result<Self, MachineError> {
        Ok(Self::with_memory(Memory::with_size(size)?))
    }

    /// Create a machine from a configuration.
    pub fn from_config(config: &MachineConfig) -> Result<Self, MachineError> {
        Self::with_memory_size(config.memory_size)
    }

    /// Create a machine from a configuration, load `program` at the
    /// configured origin and point PC at it.
    pub fn with_program(config: &MachineConfig, program: &[u8]) -> Result<Self, MachineError> {
        let mut machine = Self::from_config(config)?;
        machine.load_program(config.origin as usize, program)?;
        machine.regs.jump(config.origin, machine.mem.len());
        Ok(machine)
    }

    fn with_memory(mem: Memory) -> Self {
        Self {
            regs: Registers::new(),
            mem,
            cycles: 0,
            last_instr: None,
        }
    }

    /// Zero registers, flags, memory and the cycle counter. The memory size
    /// is kept.
    pub fn reset(&mut self) {
        self.regs.reset();
        self.mem.clear();
        self.cycles = 0;
        self.last_instr = None;
    }

    /// Copy a program image into memory starting at `origin`.
    ///
    /// The program counter is left alone; point it at `origin` yourself if
    /// the program does not start at 0.
    pub fn load_program(&mut self, origin: usize, program: &[u8]) -> Result<(), MachineError> {
        self.mem.load_program(origin, program)?;
        log::debug!("loaded {} bytes at {:#04x}", program.len(), self.mem.wrap(origin));
        Ok(())
    }

    /// Read the byte at PC and advance PC by one.
    fn fetch(&mut self) -> u8 {
        let pc = self.regs.advance_pc(self.mem.len());
        self.mem.read(pc as usize)
    }

    /// Execute a single instruction.
    ///
    /// Returns the instruction that was executed. An undefined opcode byte
    /// fails with [`MachineError::InvalidOpcode`]; PC is then already past the
    /// offending byte and nothing else has changed.
    ///
    /// A halted machine is not refused here: the next instruction simply
    /// executes and `halted` stays set. [`Machine::run`] is the guarded entry
    /// point.
    pub fn step(&mut self) -> Result<Instruction, MachineError> {
        // Fetch
        let pc = self.regs.pc;
        let raw = self.fetch();

        // Decode
        let opcode = Opcode::try_from(raw).map_err(|_| {
            log::warn!("invalid opcode {:#04x} at {:#04x}", raw, pc);
            MachineError::InvalidOpcode { opcode: raw, addr: pc }
        })?;
        let operand = if opcode.operand_len() == 1 { self.fetch() } else { 0 };
        let instr = Instruction::new(opcode, operand);

        // Execute
        self.execute(instr);

        self.cycles += 1;
        self.last_instr = Some(instr);

        log::trace!(
            "{:02x}: {:<12} A={:02x} B={:02x} OUT={:02x} {}",
            pc, instr.to_string(), self.regs.a, self.regs.b, self.regs.out, self.regs.flags
        );

        Ok(instr)
    }

    /// Run until halted or `max_steps` instructions have executed.
    ///
    /// Returns the number of instructions executed by this call. A machine
    /// that is already halted executes nothing.
    pub fn run(&mut self, max_steps: u64) -> Result<u64, MachineError> {
        let mut steps = 0;

        while !self.regs.halted && steps < max_steps {
            self.step()?;
            steps += 1;
        }

        if self.regs.halted {
            log::debug!("halted after {} steps (PC={:#04x})", steps, self.regs.pc);
        } else {
            log::debug!("step budget of {} exhausted (PC={:#04x})", max_steps, self.regs.pc);
        }

        Ok(steps)
    }

    /// Apply a decoded instruction. Operands have already been fetched, so
    /// PC points at the next opcode.
    fn execute(&mut self, instr: Instruction) {
        let size = self.mem.len();

        match instr {
            Instruction::Nop => {}

            // ==================== Loads / Stores ====================

            Instruction::LdiA(imm) => {
                self.regs.set_a(imm, false);
            }

            Instruction::LdiB(imm) => {
                self.regs.b = imm;
                self.regs.set_flags(imm, false);
            }

            Instruction::Lda(addr) => {
                let value = self.mem.read(addr as usize);
                self.regs.set_a(value, false);
            }

            Instruction::Sta(addr) => {
                self.mem.write(addr as usize, self.regs.a);
            }

            // ==================== ALU ====================

            Instruction::Add => {
                let sum = self.regs.a as u16 + self.regs.b as u16;
                self.regs.set_a(sum as u8, sum & 0x100 != 0);
            }

            Instruction::Sub => {
                // Bit 8 of the 9-bit difference is the carry; it is set
                // exactly when B > A.
                let diff = (self.regs.a as u16).wrapping_sub(self.regs.b as u16) & 0x1FF;
                self.regs.set_a(diff as u8, diff & 0x100 != 0);
            }

            Instruction::And => {
                self.regs.set_a(self.regs.a & self.regs.b, false);
            }

            Instruction::Or => {
                self.regs.set_a(self.regs.a | self.regs.b, false);
            }

            Instruction::Xor => {
                self.regs.set_a(self.regs.a ^ self.regs.b, false);
            }

            Instruction::Not => {
                self.regs.set_a(!self.regs.a, false);
            }

            // ==================== Control Flow ====================

            Instruction::Jmp(addr) => {
                self.regs.jump(addr, size);
            }

            Instruction::Jz(addr) => {
                if self.regs.flags.zero {
                    self.regs.jump(addr, size);
                }
            }

            Instruction::Jc(addr) => {
                if self.regs.flags.carry {
                    self.regs.jump(addr, size);
                }
            }

            Instruction::Hlt => {
                self.regs.halted = true;
            }

            // ==================== I/O ====================

            Instruction::In => {
                self.regs.set_a(0, false);
            }

            Instruction::Out => {
                self.regs.out = self.regs.a;
            }
        }
    }

    /// Get the last executed instruction.
    pub fn last_instruction(&self) -> Option<Instruction> {
        self.last_instr
    }

    /// Check if the machine has executed HLT.
    pub fn is_halted(&self) -> bool {
        self.regs.halted
    }

    /// The OUT latch.
    pub fn output(&self) -> u8 {
        self.regs.out
    }
}

impl Default for Machine {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Machine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Machine")
            .field("cycles", &self.cycles)
            .field("regs", &self.regs)
            .field("mem", &self.mem)
            .finish()
    }
}

/// Errors that can occur while setting up or running a machine.
///
/// Execution itself only ever produces `InvalidOpcode`; addresses and
/// arithmetic wrap instead of failing.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MachineError {
    #[error("invalid opcode {opcode:#04x} at address {addr:#04x}")]
    InvalidOpcode { opcode: u8, addr: u8 },

    #[error("memory error: {0}")]
    Memory(#[from] MemoryError),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cpu::Flags;

    fn make_program(instructions: &[Instruction]) -> Vec<u8> {
        instructions.iter().flat_map(|i| i.encode()).collect()
    }

    fn machine_with(instructions: &[Instruction]) -> Machine {
        let mut machine = Machine::new();
        machine.load_program(0, &make_program(instructions)).unwrap();
        machine
    }

    #[test]
    fn test_halt() {
        let mut machine = machine_with(&[Instruction::Hlt]);

        let executed = machine.run(100).unwrap();

        assert_eq!(executed, 1);
        assert!(machine.is_halted());
        assert_eq!(machine.run(100).unwrap(), 0);
    }

    #[test]
    fn test_nop_only_advances_pc() {
        let mut machine = Machine::new();
        machine.regs.a = 9;
        machine.regs.b = 3;
        machine.regs.out = 1;
        machine.regs.flags = Flags::from_result(0x80, true);
        let before = machine.regs.clone();

        assert_eq!(machine.step().unwrap(), Instruction::Nop);

        assert_eq!(machine.regs.pc, 1);
        assert_eq!(Registers { pc: 0, ..machine.regs.clone() }, before);
    }

    #[test]
    fn test_ldi_a() {
        let mut machine = machine_with(&[Instruction::LdiA(0x90), Instruction::LdiA(0)]);
        machine.regs.flags.carry = true;

        machine.step().unwrap();
        assert_eq!(machine.regs.a, 0x90);
        assert_eq!(machine.regs.pc, 2);
        assert_eq!(machine.regs.flags, Flags { zero: false, carry: false, negative: true });

        machine.step().unwrap();
        assert_eq!(machine.regs.a, 0);
        assert_eq!(machine.regs.flags, Flags { zero: true, carry: false, negative: false });
    }

    #[test]
    fn test_ldi_b_sets_flags_from_b() {
        let mut machine = machine_with(&[Instruction::LdiB(0)]);
        machine.regs.a = 5;

        machine.step().unwrap();

        assert_eq!(machine.regs.b, 0);
        assert_eq!(machine.regs.a, 5);
        assert!(machine.regs.flags.zero);
    }

    #[test]
    fn test_load_store() {
        let mut machine = machine_with(&[
            Instruction::LdiA(42),
            Instruction::Sta(0x80),
            Instruction::LdiA(0),
            Instruction::Lda(0x80),
            Instruction::Hlt,
        ]);

        machine.run(10).unwrap();

        assert_eq!(machine.mem.read(0x80), 42);
        assert_eq!(machine.regs.a, 42);
        assert!(!machine.regs.flags.zero);
    }

    #[test]
    fn test_sta_leaves_flags() {
        let mut machine = machine_with(&[Instruction::Sta(0x40)]);
        machine.regs.flags = Flags::from_result(0, true);

        machine.step().unwrap();

        assert_eq!(machine.regs.flags, Flags::from_result(0, true));
    }

    #[test]
    fn test_add_carry() {
        let mut machine = machine_with(&[Instruction::Add]);
        machine.regs.a = 250;
        machine.regs.b = 10;

        machine.step().unwrap();

        assert_eq!(machine.regs.a, 4);
        assert_eq!(machine.regs.flags, Flags { zero: false, carry: true, negative: false });
    }

    #[test]
    fn test_add_to_zero() {
        let mut machine = machine_with(&[Instruction::Add]);
        machine.regs.a = 0x80;
        machine.regs.b = 0x80;

        machine.step().unwrap();

        assert_eq!(machine.regs.a, 0);
        assert_eq!(machine.regs.flags, Flags { zero: true, carry: true, negative: false });
    }

    #[test]
    fn test_sub_borrow() {
        let mut machine = machine_with(&[Instruction::Sub]);
        machine.regs.a = 5;
        machine.regs.b = 10;

        machine.step().unwrap();

        assert_eq!(machine.regs.a, 251);
        assert_eq!(machine.regs.flags, Flags { zero: false, carry: true, negative: true });
    }

    #[test]
    fn test_sub_no_borrow() {
        let mut machine = machine_with(&[Instruction::Sub]);
        machine.regs.a = 10;
        machine.regs.b = 10;

        machine.step().unwrap();

        assert_eq!(machine.regs.a, 0);
        assert_eq!(machine.regs.flags, Flags { zero: true, carry: false, negative: false });
    }

    #[test]
    fn test_logic_ops_clear_carry() {
        let mut machine = machine_with(&[
            Instruction::And,
            Instruction::Or,
            Instruction::Xor,
            Instruction::Not,
        ]);
        machine.regs.a = 0b1100_1010;
        machine.regs.b = 0b1010_0110;
        machine.regs.flags.carry = true;

        machine.step().unwrap();
        assert_eq!(machine.regs.a, 0b1000_0010);
        assert!(!machine.regs.flags.carry);
        assert!(machine.regs.flags.negative);

        machine.step().unwrap();
        assert_eq!(machine.regs.a, 0b1010_0110);

        machine.step().unwrap();
        assert_eq!(machine.regs.a, 0);
        assert!(machine.regs.flags.zero);

        machine.step().unwrap();
        assert_eq!(machine.regs.a, 0xFF);
        assert_eq!(machine.regs.flags, Flags { zero: false, carry: false, negative: true });
    }

    #[test]
    fn test_jmp() {
        let mut machine = machine_with(&[Instruction::Jmp(0x20)]);
        machine.step().unwrap();
        assert_eq!(machine.regs.pc, 0x20);
    }

    #[test]
    fn test_jz_taken_and_not_taken() {
        let mut machine = machine_with(&[Instruction::Jz(0x40)]);
        machine.regs.flags.zero = false;
        machine.step().unwrap();
        assert_eq!(machine.regs.pc, 2);

        machine.regs.pc = 0;
        machine.regs.flags.zero = true;
        machine.step().unwrap();
        assert_eq!(machine.regs.pc, 0x40);
    }

    #[test]
    fn test_jc_follows_carry() {
        let mut machine = machine_with(&[
            Instruction::LdiA(0xFF),
            Instruction::LdiB(1),
            Instruction::Add,
            Instruction::Jc(0x30),
        ]);
        machine.mem.write(0x30, Opcode::Hlt.byte());

        let steps = machine.run(10).unwrap();

        assert_eq!(steps, 5);
        assert!(machine.is_halted());
        assert_eq!(machine.regs.pc, 0x31);
    }

    #[test]
    fn test_in_loads_zero() {
        let mut machine = machine_with(&[Instruction::In]);
        machine.regs.a = 77;
        machine.regs.flags.carry = true;

        machine.step().unwrap();

        assert_eq!(machine.regs.a, 0);
        assert_eq!(machine.regs.flags, Flags { zero: true, carry: false, negative: false });
    }

    #[test]
    fn test_out_latches_a() {
        let mut machine = machine_with(&[Instruction::LdiA(7), Instruction::Out]);
        machine.run(2).unwrap();
        assert_eq!(machine.output(), 7);
    }

    #[test]
    fn test_invalid_opcode() {
        let mut machine = machine_with(&[Instruction::LdiA(3)]);
        machine.mem.write(2, 0x10);

        machine.step().unwrap();
        let before = machine.regs.clone();

        assert_eq!(
            machine.step(),
            Err(MachineError::InvalidOpcode { opcode: 0x10, addr: 2 })
        );
        assert_eq!(machine.regs.pc, 3);
        assert_eq!(Registers { pc: 2, ..machine.regs.clone() }, before);
        assert_eq!(machine.cycles, 1);
    }

    #[test]
    fn test_run_propagates_invalid_opcode() {
        let mut machine = Machine::new();
        machine.mem.write(1, 0x42);

        assert_eq!(
            machine.run(10),
            Err(MachineError::InvalidOpcode { opcode: 0x42, addr: 1 })
        );
        assert_eq!(machine.cycles, 1);
    }

    #[test]
    fn test_run_budget_on_infinite_loop() {
        let mut machine = machine_with(&[Instruction::Nop, Instruction::Jmp(0)]);

        assert_eq!(machine.run(1000).unwrap(), 1000);
        assert_eq!(machine.cycles, 1000);
        assert!(!machine.is_halted());
    }

    #[test]
    fn test_step_after_halt_still_executes() {
        let mut machine = machine_with(&[Instruction::Hlt, Instruction::LdiA(5)]);

        machine.step().unwrap();
        assert_eq!(machine.step().unwrap(), Instruction::LdiA(5));
        assert_eq!(machine.regs.a, 5);
        assert!(machine.is_halted());
    }

    #[test]
    fn test_pc_wraps_in_small_memory() {
        let mut machine = Machine::with_memory_size(4).unwrap();
        machine.load_program(0, &[0x00, 0x00, 0x00, 0x01]).unwrap();
        machine.regs.pc = 3;

        // LDI A with its operand fetched from address 0.
        assert_eq!(machine.step().unwrap(), Instruction::LdiA(0));
        assert_eq!(machine.regs.pc, 1);
    }

    #[test]
    fn test_addresses_wrap_in_small_memory() {
        let mut machine = Machine::with_memory_size(16).unwrap();
        machine.load_program(0, &[0x01, 0x2A, 0x04, 0x13]).unwrap();

        machine.run(2).unwrap();

        assert_eq!(machine.mem.read(3), 0x2A);
    }

    #[test]
    fn test_reset() {
        let mut machine = machine_with(&[Instruction::LdiA(1), Instruction::Hlt]);
        machine.run(10).unwrap();

        machine.reset();

        assert_eq!(machine.regs, Registers::new());
        assert_eq!(machine.cycles, 0);
        assert_eq!(machine.last_instruction(), None);
        assert!(machine.mem.as_slice().iter().all(|&b| b == 0));
    }

    #[test]
    fn test_last_instruction() {
        let mut machine = machine_with(&[Instruction::LdiB(2)]);
        machine.step().unwrap();
        assert_eq!(machine.last_instruction(), Some(Instruction::LdiB(2)));
    }

    #[test]
    fn test_with_program_starts_at_origin() {
        let config = MachineConfig { memory_size: 64, origin: 0x10 };
        let mut machine = Machine::with_program(&config, &[0x01, 0x07, 0x0F, 0xFF]).unwrap();

        assert_eq!(machine.regs.pc, 0x10);
        assert_eq!(machine.run(10).unwrap(), 3);
        assert_eq!(machine.output(), 7);
    }

    #[test]
    fn test_state_round_trips_through_json() {
        let mut machine = machine_with(&[Instruction::LdiA(9), Instruction::Out]);
        machine.run(2).unwrap();

        let json = serde_json::to_string(&machine).unwrap();
        let restored: Machine = serde_json::from_str(&json).unwrap();
        assert_eq!(restored, machine);
    }

    #[test]
    fn test_state_with_bad_memory_is_rejected() {
        let machine = Machine::new();

        let mut empty = serde_json::to_value(&machine).unwrap();
        empty["mem"] = serde_json::json!([]);
        assert!(serde_json::from_value::<Machine>(empty).is_err());

        let mut oversize = serde_json::to_value(&machine).unwrap();
        oversize["mem"] = serde_json::json!(vec![0u8; 300]);
        assert!(serde_json::from_value::<Machine>(oversize).is_err());
    }

    #[test]
    fn test_invalid_memory_size() {
        assert_eq!(
            Machine::with_memory_size(0).unwrap_err(),
            MachineError::Memory(MemoryError::InvalidSize(0))
        );
    }
}
