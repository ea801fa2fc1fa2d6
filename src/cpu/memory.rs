//! Byte-addressable main memory.
//!
//! Memory is a flat array of 8-bit cells. Every address is taken modulo the
//! memory size, so reads and writes never fail once the memory exists.

use serde::{Serialize, Deserialize};
use thiserror::Error;

/// Default number of memory cells.
pub const DEFAULT_MEMORY_SIZE: usize = 256;

/// Largest supported memory. The program counter is 8 bits wide, so anything
/// past 256 cells would be unreachable by fetch.
pub const MAX_MEMORY_SIZE: usize = 256;

/// Main memory: `len()` byte cells with wraparound addressing.
///
/// Serialized as a plain byte array. Deserializing goes through the same size
/// check as [`Memory::with_size`].
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<u8>", into = "Vec<u8>")]
pub struct Memory {
    cells: Vec<u8>,
}

impl Memory {
    /// Create a zeroed memory of the default size (256 cells).
    pub fn new() -> Self {
        Self {
            cells: vec![0; DEFAULT_MEMORY_SIZE],
        }
    }

    /// Create a zeroed memory with `size` cells.
    ///
    /// `size` must be in `1..=256`.
    pub fn with_size(size: usize) -> Result<Self, MemoryError> {
        if size == 0 || size > MAX_MEMORY_SIZE {
            return Err(MemoryError::InvalidSize(size));
        }
        Ok(Self { cells: vec![0; size] })
    }

    /// Number of cells.
    #[inline]
    pub fn len(&self) -> usize {
        self.cells.len()
    }

    /// Always false; a memory has at least one cell.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// Reduce an arbitrary address into range.
    #[inline]
    pub fn wrap(&self, addr: usize) -> usize {
        addr % self.cells.len()
    }

    /// Read a cell. The address wraps modulo the memory size.
    #[inline]
    pub fn read(&self, addr: usize) -> u8 {
        self.cells[self.wrap(addr)]
    }

    /// Write a cell. The address wraps modulo the memory size.
    #[inline]
    pub fn write(&mut self, addr: usize, value: u8) {
        let index = self.wrap(addr);
        self.cells[index] = value;
    }

    /// Clear all memory to zeros.
    pub fn clear(&mut self) {
        self.cells.fill(0);
    }

    /// Copy a program image into memory starting at `start_addr`.
    ///
    /// Bytes that run past the last cell wrap around to address 0. An image
    /// longer than the whole memory is rejected instead of overwriting itself.
    pub fn load_program(&mut self, start_addr: usize, program: &[u8]) -> Result<(), MemoryError> {
        if program.len() > self.cells.len() {
            return Err(MemoryError::ProgramTooLarge {
                size: program.len(),
                available: self.cells.len(),
            });
        }

        for (i, &byte) in program.iter().enumerate() {
            self.write(start_addr + i, byte);
        }

        Ok(())
    }

    /// Dump memory contents (for debugging).
    pub fn dump(&self, start: usize, count: usize) -> Vec<(usize, u8)> {
        let end = (start + count).min(self.cells.len());
        (start.min(end)..end)
            .map(|i| (i, self.cells[i]))
            .collect()
    }

    /// The raw cells.
    pub fn as_slice(&self) -> &[u8] {
        &self.cells
    }
}

impl TryFrom<Vec<u8>> for Memory {
    type Error = MemoryError;

    fn try_from(cells: Vec<u8>) -> Result<Self, Self::Error> {
        let mut mem = Self::with_size(cells.len())?;
        mem.cells = cells;
        Ok(mem)
    }
}

impl From<Memory> for Vec<u8> {
    fn from(mem: Memory) -> Self {
        mem.cells
    }
}

impl Default for Memory {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Memory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let non_zero = self.cells.iter().filter(|&&cell| cell != 0).count();

        f.debug_struct("Memory")
            .field("non_zero_cells", &non_zero)
            .field("total_cells", &self.cells.len())
            .finish()
    }
}

/// Errors from creating or loading memory. Execution itself never fails on
/// an address.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MemoryError {
    #[error("memory size {0} out of range (1-256)")]
    InvalidSize(usize),

    #[error("program size {size} exceeds memory size {available}")]
    ProgramTooLarge { size: usize, available: usize },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_read_write() {
        let mut mem = Memory::new();
        mem.write(10, 42);
        assert_eq!(mem.read(10), 42);
    }

    #[test]
    fn test_memory_wraps() {
        let mut mem = Memory::with_size(16).unwrap();
        mem.write(17, 7);
        assert_eq!(mem.read(1), 7);
        assert_eq!(mem.read(33), 7);
    }

    #[test]
    fn test_memory_size_bounds() {
        assert_eq!(Memory::with_size(0), Err(MemoryError::InvalidSize(0)));
        assert_eq!(Memory::with_size(257), Err(MemoryError::InvalidSize(257)));
        assert_eq!(Memory::with_size(256).unwrap().len(), 256);
        assert_eq!(Memory::with_size(1).unwrap().len(), 1);
    }

    #[test]
    fn test_load_program() {
        let mut mem = Memory::new();
        mem.load_program(0, &[1, 2, 3]).unwrap();

        assert_eq!(mem.read(0), 1);
        assert_eq!(mem.read(1), 2);
        assert_eq!(mem.read(2), 3);
    }

    #[test]
    fn test_load_program_wraps_past_end() {
        let mut mem = Memory::with_size(4).unwrap();
        mem.load_program(3, &[0xAA, 0xBB]).unwrap();

        assert_eq!(mem.read(3), 0xAA);
        assert_eq!(mem.read(0), 0xBB);
    }

    #[test]
    fn test_load_program_too_large() {
        let mut mem = Memory::with_size(2).unwrap();
        assert_eq!(
            mem.load_program(0, &[0, 0, 0]),
            Err(MemoryError::ProgramTooLarge { size: 3, available: 2 })
        );
    }

    #[test]
    fn test_deserialize_checks_size() {
        let mem: Memory = serde_json::from_str("[1, 2, 3]").unwrap();
        assert_eq!(mem.len(), 3);
        assert_eq!(mem.read(4), 2);

        assert!(serde_json::from_str::<Memory>("[]").is_err());

        let oversize = serde_json::to_string(&vec![0u8; 300]).unwrap();
        assert!(serde_json::from_str::<Memory>(&oversize).is_err());
    }

    #[test]
    fn test_serialize_as_byte_array() {
        let mut mem = Memory::with_size(2).unwrap();
        mem.write(1, 0xAB);
        assert_eq!(serde_json::to_string(&mem).unwrap(), "[0,171]");
    }

    #[test]
    fn test_dump_is_clamped() {
        let mut mem = Memory::with_size(8).unwrap();
        mem.write(7, 9);
        assert_eq!(mem.dump(6, 10), vec![(6, 0), (7, 9)]);
        assert!(mem.dump(20, 4).is_empty());
    }
}
