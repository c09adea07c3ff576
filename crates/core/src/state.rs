//! State snapshot and persistence.
//!
//! Two host-facing views of a CPU live here:
//! 1. **Snapshot** ([`CpuState`]): a display-oriented copy of everything a
//!    front end needs per cycle, with latch contents disassembled and
//!    derived performance metrics attached.
//! 2. **Persistence** ([`Cpu::serialize`] / [`Cpu::restore`]): a versioned
//!    wire format carrying every field needed to resume mid-program,
//!    including the retirement-tracking sets.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::core::gpr::RegisterFile;
use crate::core::memory::DataMemory;
use crate::core::pipeline::latches::{ExMem, IdEx, IfId, MemWb};
use crate::core::Cpu;
use crate::events::CycleEvents;
use crate::isa::NUM_REGS;
use crate::isa::disasm::disassemble;
use crate::stats::{ForwardRecord, Performance, PipelineSnapshot, SimStats};

/// Version stamp of the persisted wire format.
pub const STATE_VERSION: u32 = 1;

/// Failures when restoring a persisted CPU.
#[derive(Debug, Error)]
pub enum StateError {
    /// The bytes are not a well-formed saved state.
    #[error("malformed state: {0}")]
    Malformed(#[from] serde_json::Error),

    /// The state was written by an incompatible format version.
    #[error("unsupported state version {0} (expected {STATE_VERSION})")]
    UnsupportedVersion(u32),
}

/// A pipeline latch as shown to the host: validity, disassembly, and the
/// raw fields when the latch is occupied.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LatchView<L> {
    /// Whether the latch holds an instruction (`false` is a bubble).
    pub valid: bool,
    /// Disassembly of the held instruction, or `"NOP"`.
    pub disasm: String,
    /// The latch fields themselves, flattened in when valid.
    #[serde(flatten)]
    pub fields: Option<L>,
}

fn latch_view<L: Clone>(latch: Option<&L>, word: fn(&L) -> u16) -> LatchView<L> {
    match latch {
        Some(entry) => LatchView {
            valid: true,
            disasm: disassemble(word(entry)),
            fields: Some(entry.clone()),
        },
        None => LatchView {
            valid: false,
            disasm: "NOP".to_owned(),
            fields: None,
        },
    }
}

/// Display-oriented snapshot of the full CPU state after a cycle.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CpuState {
    /// Program counter.
    pub pc: u16,
    /// Cycles executed.
    pub cycle: u64,
    /// All eight registers.
    pub registers: [u16; NUM_REGS],
    /// Every written data-memory cell, in address order.
    pub data_memory: BTreeMap<u16, u16>,
    /// The loaded program as four-digit hex words.
    pub instruction_memory: Vec<String>,
    /// IF/ID latch with disassembly.
    #[serde(rename = "IF_ID")]
    pub if_id: LatchView<IfId>,
    /// ID/EX latch with disassembly.
    #[serde(rename = "ID_EX")]
    pub id_ex: LatchView<IdEx>,
    /// EX/MEM latch with disassembly.
    #[serde(rename = "EX_MEM")]
    pub ex_mem: LatchView<ExMem>,
    /// MEM/WB latch with disassembly.
    #[serde(rename = "MEM_WB")]
    pub mem_wb: LatchView<MemWb>,
    /// Whether the pipeline has fully drained.
    pub halted: bool,
    /// Whether the last cycle inserted a stall bubble.
    pub is_stalling: bool,
    /// The last cycle's observability records, flattened in.
    #[serde(flatten)]
    pub events: CycleEvents,
    /// One entry per executed cycle.
    pub pipeline_history: Vec<PipelineSnapshot>,
    /// Cycles that inserted a stall bubble.
    pub stall_history: Vec<u64>,
    /// Cycles with any forwarding.
    pub forward_history: Vec<ForwardRecord>,
    /// Derived pipeline-efficiency metrics.
    pub performance: Performance,
}

/// The versioned persisted form: every field needed to resume mid-program.
#[derive(Debug, Serialize, Deserialize)]
struct SavedState {
    version: u32,
    pc: u16,
    cycle: u64,
    halted: bool,
    stalled: bool,
    registers: RegisterFile,
    data_memory: DataMemory,
    instruction_memory: Vec<u16>,
    if_id: Option<IfId>,
    id_ex: Option<IdEx>,
    ex_mem: Option<ExMem>,
    mem_wb: Option<MemWb>,
    stats: SimStats,
}

impl Cpu {
    /// Builds the display snapshot for the current cycle.
    pub fn state(&self) -> CpuState {
        CpuState {
            pc: self.pc,
            cycle: self.cycle,
            registers: self.regs.snapshot(),
            data_memory: self.mem.cells().clone(),
            instruction_memory: self
                .instruction_memory()
                .iter()
                .map(|w| format!("{w:04X}"))
                .collect(),
            if_id: latch_view(self.if_id.as_ref(), |l| l.word),
            id_ex: latch_view(self.id_ex.as_ref(), |l| l.word),
            ex_mem: latch_view(self.ex_mem.as_ref(), |l| l.word),
            mem_wb: latch_view(self.mem_wb.as_ref(), |l| l.word),
            halted: self.halted,
            is_stalling: self.is_stalling(),
            events: self.events().clone(),
            pipeline_history: self.stats.pipeline_history.clone(),
            stall_history: self.stats.stall_history.clone(),
            forward_history: self.stats.forward_history.clone(),
            performance: self.stats.performance(self.cycle),
        }
    }

    /// Serializes the full CPU state into the versioned wire format.
    ///
    /// # Errors
    ///
    /// Fails only if JSON encoding itself fails.
    pub fn serialize(&self) -> Result<Vec<u8>, StateError> {
        let saved = SavedState {
            version: STATE_VERSION,
            pc: self.pc,
            cycle: self.cycle,
            halted: self.halted,
            stalled: self.stalled,
            registers: self.regs.clone(),
            data_memory: self.mem.clone(),
            instruction_memory: self.instruction_memory().to_vec(),
            if_id: self.if_id.clone(),
            id_ex: self.id_ex.clone(),
            ex_mem: self.ex_mem.clone(),
            mem_wb: self.mem_wb.clone(),
            stats: self.stats.clone(),
        };
        Ok(serde_json::to_vec(&saved)?)
    }

    /// Reconstructs a CPU from bytes produced by [`Cpu::serialize`].
    ///
    /// The restored CPU steps identically to the original from the point
    /// it was saved at.
    ///
    /// # Errors
    ///
    /// Fails on malformed bytes or an unsupported format version.
    pub fn restore(bytes: &[u8]) -> Result<Self, StateError> {
        let saved: SavedState = serde_json::from_slice(bytes)?;
        if saved.version != STATE_VERSION {
            return Err(StateError::UnsupportedVersion(saved.version));
        }
        let mut cpu = Self::new();
        cpu.pc = saved.pc;
        cpu.cycle = saved.cycle;
        cpu.halted = saved.halted;
        cpu.stalled = saved.stalled;
        cpu.regs = saved.registers;
        cpu.mem = saved.data_memory;
        cpu.imem = saved.instruction_memory;
        cpu.if_id = saved.if_id;
        cpu.id_ex = saved.id_ex;
        cpu.ex_mem = saved.ex_mem;
        cpu.mem_wb = saved.mem_wb;
        cpu.stats = saved.stats;
        Ok(cpu)
    }
}
