//! Per-cycle observability records.
//!
//! Every call to [`Cpu::step`](crate::core::Cpu::step) produces a fresh
//! [`CycleEvents`] describing what the hazard and forwarding logic did that
//! cycle. The records are overwritten each step; cumulative views live in
//! [`stats`](crate::stats).

use serde::{Deserialize, Serialize};

/// The pipeline latch a forwarded value was taken from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ForwardSource {
    /// The EX/MEM latch (result of the instruction one stage ahead).
    ExMem,
    /// The MEM/WB latch (writeback value of the instruction two ahead).
    MemWb,
}

/// A single operand bypass: which latch supplied which register's value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ForwardInfo {
    /// Latch the value came from.
    pub source: ForwardSource,
    /// Register being bypassed.
    pub reg: usize,
    /// The forwarded value.
    pub value: u16,
}

/// Why the pipeline stalled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StallKind {
    /// A load in EX produces a register the decoding instruction reads.
    LoadUse,
    /// A load in MEM produces a register a branch or jump resolving in
    /// decode needs; one extra stall beyond the general load-use case.
    LoadUseControl,
}

/// Details of a stall inserted this cycle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StallInfo {
    /// Which hazard forced the stall.
    pub kind: StallKind,
    /// Register the decoding instruction is waiting on.
    pub reg: usize,
    /// Disassembly of the in-flight instruction producing the register.
    pub blocking: String,
    /// Disassembly of the instruction held in decode.
    pub blocked: String,
}

/// Kind of taken control transfer resolved in decode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ControlKind {
    /// A taken BEQ/BNQ.
    Branch,
    /// JUMP, JAL, or JR.
    Jump,
}

/// A taken control transfer and the speculatively fetched instruction it
/// flushed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ControlHazard {
    /// Branch or jump.
    pub kind: ControlKind,
    /// Redirect target address.
    pub target: u16,
    /// Disassembly of the flushed instruction, or `"NOP"` if the fetch
    /// slot was already empty.
    pub flushed: String,
}

/// Non-fatal warning for a read of a never-written data-memory address.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemoryWarning {
    /// The uninitialized address (the read returned zero).
    pub address: u16,
    /// Disassembly of the load that performed the read.
    pub instruction: String,
}

/// Everything observable about a single cycle, rebuilt by every step.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CycleEvents {
    /// Bypass into the EX stage's first operand, if one fired.
    pub forward_a: Option<ForwardInfo>,
    /// Bypass into the EX stage's second operand (or a store's data, via
    /// the MEM-stage bypass), if one fired.
    pub forward_b: Option<ForwardInfo>,
    /// Stall inserted this cycle, if any.
    #[serde(rename = "stall_info")]
    pub stall: Option<StallInfo>,
    /// Taken control transfer resolved this cycle, if any.
    pub control_hazard: Option<ControlHazard>,
    /// Uninitialized data-memory read this cycle, if any.
    pub memory_warning: Option<MemoryWarning>,
}

impl CycleEvents {
    /// Whether any operand bypass fired this cycle.
    pub fn any_forward(&self) -> bool {
        self.forward_a.is_some() || self.forward_b.is_some()
    }
}
