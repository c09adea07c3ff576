//! Cumulative simulation statistics and derived performance metrics.
//!
//! This module tracks everything that accumulates across cycles:
//! 1. **Pipeline history:** One snapshot per cycle naming the instruction
//!    visible in each of the five stages.
//! 2. **Stall and forward histories:** The cycles in which a stall bubble
//!    was inserted or any bypass fired.
//! 3. **Retirement tracking:** `(pc, word)` sets ensuring a held
//!    instruction is counted at most once in IF and once in WB.
//! 4. **Derived metrics:** CPI, stall rate, and forward rate.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::events::ForwardInfo;

/// The `(address, word)` pair occupying a pipeline stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageSlot {
    /// Instruction address.
    pub pc: u16,
    /// Machine word.
    pub word: u16,
}

/// What each stage held at the end of one cycle. `None` is a bubble, an
/// empty fetch slot, or an instruction already shown in that column.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineSnapshot {
    /// Cycle this snapshot was taken at (1-based).
    pub cycle: u64,
    /// Fetch stage.
    #[serde(rename = "IF")]
    pub fetch: Option<StageSlot>,
    /// Decode stage; shows the held instruction on a stall cycle.
    #[serde(rename = "ID")]
    pub decode: Option<StageSlot>,
    /// Execute stage.
    #[serde(rename = "EX")]
    pub execute: Option<StageSlot>,
    /// Memory stage.
    #[serde(rename = "MEM")]
    pub memory: Option<StageSlot>,
    /// Writeback stage.
    #[serde(rename = "WB")]
    pub writeback: Option<StageSlot>,
}

/// The bypasses that fired in one cycle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ForwardRecord {
    /// Cycle the forwarding happened in.
    pub cycle: u64,
    /// First-operand bypass, if any.
    pub forward_a: Option<ForwardInfo>,
    /// Second-operand bypass, if any.
    pub forward_b: Option<ForwardInfo>,
}

/// Cumulative statistics for one CPU instance.
///
/// Everything here persists across [`serialize`](crate::core::Cpu::serialize)
/// / [`restore`](crate::core::Cpu::restore) so that metrics keep counting
/// when a simulation resumes mid-program.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SimStats {
    /// One entry per executed cycle.
    pub pipeline_history: Vec<PipelineSnapshot>,
    /// Cycles in which a hazard stall inserted a bubble.
    pub stall_history: Vec<u64>,
    /// Cycles in which at least one bypass fired.
    pub forward_history: Vec<ForwardRecord>,
    /// Number of taken control transfers (each one flushed the fetch slot).
    pub flush_count: u64,
    seen_in_if: BTreeSet<(u16, u16)>,
    seen_in_wb: BTreeSet<(u16, u16)>,
}

impl SimStats {
    /// Marks an instruction instance as shown in the IF column; returns
    /// `true` the first time so a held instruction is not double-counted.
    pub fn first_seen_in_if(&mut self, pc: u16, word: u16) -> bool {
        self.seen_in_if.insert((pc, word))
    }

    /// Marks an instruction instance as retired through WB; returns `true`
    /// the first time.
    pub fn first_seen_in_wb(&mut self, pc: u16, word: u16) -> bool {
        self.seen_in_wb.insert((pc, word))
    }

    /// Number of unique instructions that have passed writeback.
    pub fn instructions_retired(&self) -> u64 {
        self.seen_in_wb.len() as u64
    }

    /// Computes the derived metrics for a run of `cycles` cycles.
    pub fn performance(&self, cycles: u64) -> Performance {
        let instructions = self.instructions_retired();
        let stall_cycles = self.stall_history.len() as u64;
        let forward_cycles = self.forward_history.len() as u64;

        let cpi = if instructions > 0 {
            cycles as f64 / instructions as f64
        } else {
            0.0
        };
        let stall_rate = rate(stall_cycles, cycles);
        let forward_rate = rate(forward_cycles, cycles);

        Performance {
            cycles,
            instructions,
            cpi: round_to(cpi, 2),
            stall_cycles,
            stall_rate: round_to(stall_rate, 1),
            forward_cycles,
            forward_rate: round_to(forward_rate, 1),
            flush_count: self.flush_count,
        }
    }
}

/// Derived pipeline-efficiency metrics, rounded for display.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Performance {
    /// Total cycles executed.
    pub cycles: u64,
    /// Unique instructions retired through writeback.
    pub instructions: u64,
    /// Cycles per instruction (0 if nothing retired), two decimals.
    pub cpi: f64,
    /// Cycles containing a stall bubble.
    pub stall_cycles: u64,
    /// Stall cycles as a percentage of all cycles, one decimal.
    pub stall_rate: f64,
    /// Cycles with any forwarding.
    pub forward_cycles: u64,
    /// Forwarding cycles as a percentage of all cycles, one decimal.
    pub forward_rate: f64,
    /// Taken control transfers.
    pub flush_count: u64,
}

fn rate(part: u64, whole: u64) -> f64 {
    if whole > 0 {
        part as f64 / whole as f64 * 100.0
    } else {
        0.0
    }
}

fn round_to(value: f64, decimals: u32) -> f64 {
    let scale = 10f64.powi(decimals as i32);
    (value * scale).round() / scale
}
