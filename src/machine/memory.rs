//! Data memory.
//!
//! The CPU only sees memory through its boundary buses; this flat RAM
//! is the collaborator that honors them. 32K cells by default, the
//! reach of a 15-bit address literal.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Default number of data cells.
pub const DEFAULT_RAM_SIZE: usize = 32_768;

/// Flat RAM of 16-bit cells.
#[derive(Clone, Serialize, Deserialize)]
pub struct Ram {
    cells: Vec<u16>,
}

/// Errors raised by memory accesses.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MemoryError {
    #[error("memory address {addr} out of range (size {size})")]
    AddressOutOfRange { addr: u16, size: usize },
}

impl Ram {
    /// Create a RAM of `size` zeroed cells.
    pub fn new(size: usize) -> Self {
        Self {
            cells: vec![0; size],
        }
    }

    /// Number of cells.
    pub fn size(&self) -> usize {
        self.cells.len()
    }

    /// Read a cell.
    pub fn read(&self, addr: u16) -> Result<u16, MemoryError> {
        self.cells
            .get(addr as usize)
            .copied()
            .ok_or(MemoryError::AddressOutOfRange {
                addr,
                size: self.cells.len(),
            })
    }

    /// Write a cell.
    pub fn write(&mut self, addr: u16, value: u16) -> Result<(), MemoryError> {
        let size = self.cells.len();
        match self.cells.get_mut(addr as usize) {
            Some(cell) => {
                *cell = value;
                Ok(())
            }
            None => Err(MemoryError::AddressOutOfRange { addr, size }),
        }
    }

    /// Zero every cell.
    pub fn clear(&mut self) {
        self.cells.fill(0);
    }

    /// Every non-zero cell with its address, for dumps and reports.
    pub fn non_zero(&self) -> Vec<(u16, u16)> {
        self.cells
            .iter()
            .enumerate()
            .filter(|(_, &v)| v != 0)
            .map(|(addr, &v)| (addr as u16, v))
            .collect()
    }
}

impl Default for Ram {
    fn default() -> Self {
        Self::new(DEFAULT_RAM_SIZE)
    }
}

impl std::fmt::Debug for Ram {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Ram")
            .field("non_zero_cells", &self.non_zero().len())
            .field("total_cells", &self.cells.len())
            .finish()
    }
}
