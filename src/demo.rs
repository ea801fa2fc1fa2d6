//! Built-in demo program.

use crate::cpu::{Machine, MachineError};

/// Counts upward on OUT forever:
///
/// ```text
/// 00: 02 01   LDI B,#1
/// 02: 01 00   LDI A,#0
/// 04: 0F      OUT
/// 05: 05      ADD B
/// 06: 0F      OUT
/// 07: 0B 03   JMP 3
/// ```
///
/// The jump lands on address 3, the operand of `LDI A`, which then executes
/// as NOP. Each trip round the loop is five instructions.
pub const DEMO_PROGRAM: [u8; 9] = [0x02, 0x01, 0x01, 0x00, 0x0F, 0x05, 0x0F, 0x0B, 0x03];

/// Step budget the demo is normally run with.
pub const DEMO_STEPS: u64 = 200;

/// Load the demo into a fresh 256-byte machine and run it for `max_steps`.
///
/// Returns the machine together with the number of steps executed.
pub fn run_demo(max_steps: u64) -> Result<(Machine, u64), MachineError> {
    let mut machine = Machine::new();
    machine.load_program(0, &DEMO_PROGRAM)?;
    let steps = machine.run(max_steps)?;
    Ok((machine, steps))
}
