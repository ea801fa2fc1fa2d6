//! Machine configuration.

use serde::{Serialize, Deserialize};
use crate::cpu::DEFAULT_MEMORY_SIZE;

/// How a machine is laid out before a program runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MachineConfig {
    /// Number of memory cells (1-256).
    pub memory_size: usize,
    /// Address the program image is loaded at. Execution starts here.
    pub origin: u8,
}

impl Default for MachineConfig {
    fn default() -> Self {
        Self {
            memory_size: DEFAULT_MEMORY_SIZE,
            origin: 0,
        }
    }
}
