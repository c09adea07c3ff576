//! Pipeline control signals.
//!
//! All signals are established at decode and travel down the pipeline with
//! the instruction. This module defines:
//! 1. **Operation selection:** The ALU operation and its second-operand
//!    source.
//! 2. **Memory control:** Read/write enables and the load-to-register path.
//! 3. **Control flow:** Branch and jump markers (both resolve in decode).

use serde::{Deserialize, Serialize};

/// ALU operation to perform in the execute stage.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum AluOp {
    /// Addition, wrapping modulo 2^16. Also computes load/store addresses.
    #[default]
    Add,

    /// Subtraction, wrapping modulo 2^16.
    Sub,

    /// Bitwise AND.
    And,

    /// Bitwise OR.
    Or,

    /// Set-less-than; operands compared as two's-complement 16-bit signed.
    Slt,
}

/// Source of the ALU's second operand.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum OpBSrc {
    /// The `rt` register value (R-type and branch comparisons).
    #[default]
    Reg2,

    /// The sign-extended 6-bit immediate.
    Imm,

    /// The immediate zero-extended to six bits (ANDI).
    ImmZero,
}

/// Control signals established at decode.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ControlSignals {
    /// Write the result to the destination register at writeback.
    pub reg_write: bool,
    /// Read data memory in the memory stage (loads).
    pub mem_read: bool,
    /// Write data memory in the memory stage (stores).
    pub mem_write: bool,
    /// Writeback takes the loaded value rather than the ALU result.
    pub mem_to_reg: bool,
    /// Instruction is a conditional branch (BEQ/BNQ), resolved in decode.
    pub branch: bool,
    /// Instruction is an unconditional transfer (JUMP/JAL/JR), resolved in
    /// decode. JAL additionally sets `reg_write` and carries its return
    /// address through the `rs_val` slot.
    pub jump: bool,
    /// ALU operation.
    pub alu: AluOp,
    /// Second-operand source.
    pub b_src: OpBSrc,
}

impl ControlSignals {
    /// Whether this instruction links: a jump that writes the register
    /// file (JAL). The execute stage passes the return address carried in
    /// `rs_val` straight to `alu_result`.
    #[inline]
    pub fn is_link(&self) -> bool {
        self.jump && self.reg_write
    }
}
