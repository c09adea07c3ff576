//! General-purpose register file.
//!
//! Eight 16-bit registers, `$r0`-`$r7`. Register `$r0` is hardwired to
//! zero: reads always return 0 and writes are silently discarded.

use serde::{Deserialize, Serialize};

use crate::isa::NUM_REGS;

/// The eight-entry register file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RegisterFile {
    regs: [u16; NUM_REGS],
}

impl RegisterFile {
    /// Creates a register file with all registers zeroed.
    pub fn new() -> Self {
        Self::default()
    }

    /// Reads a register. `$r0` always reads zero.
    #[inline]
    pub fn read(&self, idx: usize) -> u16 {
        if idx == 0 { 0 } else { self.regs[idx] }
    }

    /// Writes a register, masking to 16 bits. Writes to `$r0` are dropped.
    #[inline]
    pub fn write(&mut self, idx: usize, val: u16) {
        if idx != 0 {
            self.regs[idx] = val;
        }
    }

    /// Returns all eight register values.
    pub fn snapshot(&self) -> [u16; NUM_REGS] {
        self.regs
    }

    /// Zeroes every register.
    pub fn clear(&mut self) {
        self.regs = [0; NUM_REGS];
    }
}
