//! Sparse data memory.
//!
//! A mapping from 16-bit address to 16-bit value. Addresses never written
//! read as zero; the memory stage turns such reads into an
//! uninitialized-read warning rather than an error.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Sparse 16-bit word-addressed data memory.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DataMemory {
    cells: BTreeMap<u16, u16>,
}

impl DataMemory {
    /// Creates an empty data memory.
    pub fn new() -> Self {
        Self::default()
    }

    /// Reads an address. Returns the value and whether the address had
    /// ever been written (`false` means the zero is a default).
    pub fn load(&self, addr: u16) -> (u16, bool) {
        match self.cells.get(&addr) {
            Some(&v) => (v, true),
            None => (0, false),
        }
    }

    /// Writes a value at an address.
    pub fn store(&mut self, addr: u16, value: u16) {
        self.cells.insert(addr, value);
    }

    /// All written cells, in address order.
    pub fn cells(&self) -> &BTreeMap<u16, u16> {
        &self.cells
    }

    /// Discards every written cell.
    pub fn clear(&mut self) {
        self.cells.clear();
    }
}
