//! WebAssembly bindings for the byte8 emulator.
//!
//! This module provides JavaScript-friendly wrappers around the core emulator.

use wasm_bindgen::prelude::*;
use crate::{Machine, MachineConfig, ProgramImage};

/// Initialize panic hook for better error messages in console.
#[wasm_bindgen(start)]
pub fn init() {
    #[cfg(feature = "console_error_panic_hook")]
    console_error_panic_hook::set_once();
}

/// WebAssembly-friendly machine wrapper.
#[wasm_bindgen]
pub struct WasmMachine {
    machine: Machine,
    config: MachineConfig,
    program: Vec<u8>,
}

#[wasm_bindgen]
impl WasmMachine {
    /// Create a new machine with 256 bytes of memory.
    #[wasm_bindgen(constructor)]
    pub fn new() -> Self {
        Self {
            machine: Machine::new(),
            config: MachineConfig::default(),
            program: Vec::new(),
        }
    }

    /// Load a program from raw bytes. Returns the number of bytes loaded.
    #[wasm_bindgen]
    pub fn load_bytes(&mut self, bytes: &[u8]) -> Result<usize, JsError> {
        self.machine = Machine::with_program(&self.config, bytes)
            .map_err(|e| JsError::new(&format!("{}", e)))?;
        self.program = bytes.to_vec();
        Ok(bytes.len())
    }

    /// Load a program from hex text.
    #[wasm_bindgen]
    pub fn load_hex(&mut self, source: &str) -> Result<usize, JsError> {
        let image = ProgramImage::parse_hex(source)
            .map_err(|e| JsError::new(&format!("{}", e)))?;
        self.load_bytes(&image.bytes)
    }

    /// Step one instruction. Returns the executed instruction as text.
    #[wasm_bindgen]
    pub fn step(&mut self) -> Result<String, JsError> {
        let instr = self.machine.step()
            .map_err(|e| JsError::new(&format!("{}", e)))?;

        Ok(instr.to_string())
    }

    /// Run until halt or `max_steps`. Returns the steps executed.
    #[wasm_bindgen]
    pub fn run(&mut self, max_steps: u32) -> Result<u32, JsError> {
        let steps = self.machine.run(max_steps as u64)
            .map_err(|e| JsError::new(&format!("{}", e)))?;
        Ok(steps as u32)
    }

    /// Reset to initial state with the loaded program.
    #[wasm_bindgen]
    pub fn reset(&mut self) -> Result<(), JsError> {
        self.machine = Machine::with_program(&self.config, &self.program)
            .map_err(|e| JsError::new(&format!("{}", e)))?;
        Ok(())
    }

    /// Whether HLT has executed.
    #[wasm_bindgen]
    pub fn is_halted(&self) -> bool {
        self.machine.is_halted()
    }

    /// Instructions executed since load or reset.
    #[wasm_bindgen]
    pub fn cycles(&self) -> u64 {
        self.machine.cycles
    }

    /// Program counter.
    #[wasm_bindgen]
    pub fn pc(&self) -> u8 {
        self.machine.regs.pc
    }

    /// Accumulator.
    #[wasm_bindgen]
    pub fn a(&self) -> u8 {
        self.machine.regs.a
    }

    /// B register.
    #[wasm_bindgen]
    pub fn b(&self) -> u8 {
        self.machine.regs.b
    }

    /// Output latch.
    #[wasm_bindgen]
    pub fn out(&self) -> u8 {
        self.machine.output()
    }

    /// Flags as "ZCN" with dashes for clear bits.
    #[wasm_bindgen]
    pub fn flags(&self) -> String {
        self.machine.regs.flags.to_string()
    }

    /// Copy of the whole memory.
    #[wasm_bindgen]
    pub fn memory(&self) -> js_sys::Uint8Array {
        js_sys::Uint8Array::from(self.machine.mem.as_slice())
    }

    /// Registers, flags and cycle count as JSON.
    #[wasm_bindgen]
    pub fn state_json(&self) -> Result<String, JsError> {
        let state = serde_json::json!({
            "registers": &self.machine.regs,
            "cycles": self.machine.cycles,
        });
        serde_json::to_string(&state).map_err(|e| JsError::new(&format!("{}", e)))
    }
}

impl Default for WasmMachine {
    fn default() -> Self {
        Self::new()
    }
}
