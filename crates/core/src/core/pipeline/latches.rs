//! Pipeline latch structures.
//!
//! The buffers between the five stages. Each latch on the CPU is an
//! `Option` of one of these entry types; `None` is a bubble. Every valid
//! entry carries the raw word and the PC it was fetched from so that latch
//! contents can be disassembled for display at any time.

use serde::{Deserialize, Serialize};

use crate::core::pipeline::signals::ControlSignals;

/// IF/ID latch entry: a fetched, not-yet-decoded instruction.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct IfId {
    /// Address the word was fetched from.
    pub pc: u16,
    /// Raw machine word.
    pub word: u16,
}

/// ID/EX latch entry: a fully decoded instruction with its operand values
/// as read from the register file at decode time. Forwarding in EX may
/// override `rs_val`/`rt_val`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdEx {
    /// Address the instruction was fetched from.
    pub pc: u16,
    /// Raw machine word.
    pub word: u16,
    /// First source register index.
    pub rs: usize,
    /// Second source register index.
    pub rt: usize,
    /// Destination register index (`rt` for I-type, 7 for JAL, 0 if none).
    pub rd: usize,
    /// Sign-extended immediate.
    pub imm: i16,
    /// `rs` value at decode time. For JAL this slot carries the return
    /// address instead.
    pub rs_val: u16,
    /// `rt` value at decode time.
    pub rt_val: u16,
    /// Control signals for the stages downstream.
    pub ctrl: ControlSignals,
}

/// EX/MEM latch entry: an executed instruction with its ALU result.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExMem {
    /// Address the instruction was fetched from.
    pub pc: u16,
    /// Raw machine word.
    pub word: u16,
    /// Destination register index.
    pub rd: usize,
    /// Second source register index; the memory stage uses it to bypass a
    /// just-loaded value into a store's data.
    pub rt: usize,
    /// ALU result (the effective address for loads and stores).
    pub alu: u16,
    /// Store data as resolved in EX.
    pub rt_val: u16,
    /// Control signals for the stages downstream.
    pub ctrl: ControlSignals,
}

/// MEM/WB latch entry: results ready for writeback.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemWb {
    /// Address the instruction was fetched from.
    pub pc: u16,
    /// Raw machine word.
    pub word: u16,
    /// Destination register index.
    pub rd: usize,
    /// ALU result.
    pub alu: u16,
    /// Value loaded from data memory (loads only).
    pub mem_data: u16,
    /// Control signals for the writeback stage.
    pub ctrl: ControlSignals,
}

impl MemWb {
    /// The value this instruction writes back: the loaded value for loads,
    /// the ALU result otherwise.
    #[inline]
    pub fn writeback_value(&self) -> u16 {
        if self.ctrl.mem_to_reg {
            self.mem_data
        } else {
            self.alu
        }
    }
}
