//! CPU core: architectural state and the per-cycle step function.
//!
//! The CPU owns the register file, instruction and data memories, the four
//! pipeline latches, and all cumulative statistics. One call to
//! [`Cpu::step`] advances exactly one clock cycle:
//! 1. All stages read **old** latch contents (writeback first, fetch last),
//!    computing the new latch entries as a function of the old state.
//! 2. Decode additionally sees the EX/MEM entry computed **this** cycle,
//!    the one intra-cycle dependency, so a branch can compare against the
//!    result of the immediately preceding instruction without stalling.
//! 3. Stall and flush effects are applied, then all latches commit at once.
//!
//! A latch holding `None` is a bubble. The CPU halts when the PC has run
//! past the end of instruction memory and every latch is a bubble.

/// General-purpose register file.
pub mod gpr;
/// Sparse data memory.
pub mod memory;
/// Latches, control signals, hazard logic, and the stage functions.
pub mod pipeline;

use tracing::{debug, trace};

use crate::core::gpr::RegisterFile;
use crate::core::memory::DataMemory;
use crate::core::pipeline::latches::{ExMem, IdEx, IfId, MemWb};
use crate::core::pipeline::stages::{
    decode_stage, execute_stage, fetch_stage, memory_stage, writeback_stage,
};
use crate::events::{ControlHazard, CycleEvents};
use crate::isa::disasm::disassemble;
use crate::stats::{ForwardRecord, PipelineSnapshot, SimStats, StageSlot};

/// What one call to [`Cpu::step`] produced: the per-cycle observability
/// records, and whether the CPU is still running.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepReport {
    /// `false` once the pipeline has fully drained.
    pub running: bool,
    /// This cycle's stall/forward/flush/warning records.
    pub events: CycleEvents,
}

/// The pipelined CPU.
pub struct Cpu {
    /// Register file; `$r0` reads zero.
    pub regs: RegisterFile,
    /// Program counter: an index into instruction memory. May run past the
    /// end, which drains the pipeline.
    pub pc: u16,
    /// Clock cycles executed since the last reset.
    pub cycle: u64,
    /// Sparse data memory.
    pub mem: DataMemory,
    /// IF/ID latch.
    pub if_id: Option<IfId>,
    /// ID/EX latch.
    pub id_ex: Option<IdEx>,
    /// EX/MEM latch.
    pub ex_mem: Option<ExMem>,
    /// MEM/WB latch.
    pub mem_wb: Option<MemWb>,
    /// Set once the program has fully drained out of the pipeline.
    pub halted: bool,
    /// Cumulative histories and derived-metric inputs.
    pub stats: SimStats,

    pub(crate) imem: Vec<u16>,
    pub(crate) stalled: bool,
    pub(crate) events: CycleEvents,
}

impl Default for Cpu {
    fn default() -> Self {
        Self::new()
    }
}

impl Cpu {
    /// Upper bound on [`Cpu::run`]: the pipeline stops after this many
    /// cycles even if the program never drains.
    pub const RUN_CYCLE_LIMIT: u64 = 1000;

    /// Creates a CPU with no program loaded.
    pub fn new() -> Self {
        Self {
            regs: RegisterFile::new(),
            pc: 0,
            cycle: 0,
            mem: DataMemory::new(),
            if_id: None,
            id_ex: None,
            ex_mem: None,
            mem_wb: None,
            halted: false,
            stats: SimStats::default(),
            imem: Vec::new(),
            stalled: false,
            events: CycleEvents::default(),
        }
    }

    /// Resets all execution state but keeps the loaded program: registers,
    /// data memory, latches, cycle counter, PC, histories, and the
    /// retirement-tracking sets are cleared; instruction memory survives.
    pub fn reset(&mut self) {
        self.regs.clear();
        self.pc = 0;
        self.cycle = 0;
        self.mem.clear();
        self.if_id = None;
        self.id_ex = None;
        self.ex_mem = None;
        self.mem_wb = None;
        self.halted = false;
        self.stats = SimStats::default();
        self.stalled = false;
        self.events = CycleEvents::default();
        debug!("cpu reset");
    }

    /// Resets the CPU and installs a new program.
    pub fn load(&mut self, words: Vec<u16>) {
        debug!(instructions = words.len(), "loading program");
        self.imem = words;
        self.reset();
    }

    /// Resets the CPU and installs a program given as hex-digit words
    /// (e.g. `"3045"`).
    ///
    /// # Errors
    ///
    /// Fails if any word is not valid hexadecimal.
    pub fn load_hex<S: AsRef<str>>(
        &mut self,
        words: impl IntoIterator<Item = S>,
    ) -> Result<(), std::num::ParseIntError> {
        let words = words
            .into_iter()
            .map(|w| u16::from_str_radix(w.as_ref().trim(), 16))
            .collect::<Result<Vec<_>, _>>()?;
        self.load(words);
        Ok(())
    }

    /// The loaded program.
    pub fn instruction_memory(&self) -> &[u16] {
        &self.imem
    }

    /// The observability records from the most recent cycle.
    pub fn events(&self) -> &CycleEvents {
        &self.events
    }

    /// Whether the last executed cycle inserted a stall bubble.
    pub fn is_stalling(&self) -> bool {
        self.stalled
    }

    /// Executes one clock cycle.
    ///
    /// Once halted, further calls return immediately and leave all state
    /// untouched.
    pub fn step(&mut self) -> StepReport {
        if self.halted {
            return StepReport {
                running: false,
                events: CycleEvents::default(),
            };
        }

        let mut ev = CycleEvents::default();

        let old_if_id = self.if_id.take();
        let old_id_ex = self.id_ex.take();
        let old_ex_mem = self.ex_mem.take();
        let old_mem_wb = self.mem_wb.take();

        // Reverse stage order: every stage sees only old latch state.
        writeback_stage(&mut self.regs, old_mem_wb.as_ref());
        let new_mem_wb = memory_stage(
            &mut self.mem,
            old_ex_mem.as_ref(),
            old_mem_wb.as_ref(),
            &mut ev,
        );
        let new_ex_mem = execute_stage(
            old_id_ex.as_ref(),
            old_ex_mem.as_ref(),
            old_mem_wb.as_ref(),
            &mut ev,
        );
        // Decode also sees the EX result produced this cycle, so a branch
        // can compare against its immediate predecessor without a stall.
        let decoded = decode_stage(
            &self.regs,
            old_if_id.as_ref(),
            new_ex_mem.as_ref(),
            old_id_ex.as_ref(),
            old_ex_mem.as_ref(),
            old_mem_wb.as_ref(),
        );
        let mut new_if_id = fetch_stage(&self.imem, &mut self.pc);
        let mut new_id_ex = decoded.latch;

        let stalled = decoded.stall.is_some();
        if let Some(stall) = decoded.stall {
            // Hold the fetched instruction, insert a bubble, and rewind the
            // PC so the instruction after the held one is the next fetch.
            new_id_ex = None;
            new_if_id = old_if_id.clone();
            if let Some(held) = &new_if_id {
                self.pc = held.pc.wrapping_add(1);
            }
            trace!(cycle = self.cycle + 1, reg = stall.reg, kind = ?stall.kind, "stall");
            ev.stall = Some(stall);
        } else if let Some(redirect) = decoded.redirect {
            // Taken branch or jump: squash the speculatively fetched
            // successor and steer the PC. The transfer instruction itself
            // keeps flowing down the pipeline.
            let flushed = new_if_id
                .as_ref()
                .map_or_else(|| "NOP".to_owned(), |l| disassemble(l.word));
            trace!(
                cycle = self.cycle + 1,
                target = redirect.target,
                kind = ?redirect.kind,
                "flush"
            );
            ev.control_hazard = Some(ControlHazard {
                kind: redirect.kind,
                target: redirect.target,
                flushed,
            });
            self.stats.flush_count += 1;
            new_if_id = None;
            self.pc = redirect.target;
        }

        self.if_id = new_if_id;
        self.id_ex = new_id_ex;
        self.ex_mem = new_ex_mem;
        self.mem_wb = new_mem_wb;
        self.cycle += 1;
        self.stalled = stalled;

        self.record_history(&ev, stalled, old_if_id.as_ref(), old_mem_wb.as_ref());

        if self.if_id.is_none()
            && self.id_ex.is_none()
            && self.ex_mem.is_none()
            && self.mem_wb.is_none()
            && usize::from(self.pc) >= self.imem.len()
        {
            self.halted = true;
        }

        self.events = ev.clone();
        StepReport {
            running: !self.halted,
            events: ev,
        }
    }

    /// Steps until the CPU halts or [`Self::RUN_CYCLE_LIMIT`] cycles have
    /// been executed, whichever comes first. Returns the number of cycles
    /// executed by this call.
    pub fn run(&mut self) -> u64 {
        let start = self.cycle;
        while !self.halted && self.cycle - start < Self::RUN_CYCLE_LIMIT {
            let _ = self.step();
        }
        self.cycle - start
    }

    /// Appends this cycle's entry to the pipeline history, plus the stall
    /// and forward histories when applicable. A given instruction instance
    /// appears at most once in the IF column and at most once in the WB
    /// column, so a held instruction is not double-counted.
    fn record_history(
        &mut self,
        ev: &CycleEvents,
        stalled: bool,
        old_if_id: Option<&IfId>,
        old_mem_wb: Option<&MemWb>,
    ) {
        let fetched = self.if_id.as_ref().map(|l| (l.pc, l.word));
        let if_slot = match fetched {
            Some((pc, word)) if self.stats.first_seen_in_if(pc, word) => {
                Some(StageSlot { pc, word })
            }
            _ => None,
        };

        // On a stall cycle the ID column shows the held instruction.
        let id_slot = if stalled {
            old_if_id.map(|l| StageSlot {
                pc: l.pc,
                word: l.word,
            })
        } else {
            self.id_ex.as_ref().map(|l| StageSlot {
                pc: l.pc,
                word: l.word,
            })
        };

        let ex_slot = self.ex_mem.as_ref().map(|l| StageSlot {
            pc: l.pc,
            word: l.word,
        });
        let mem_slot = self.mem_wb.as_ref().map(|l| StageSlot {
            pc: l.pc,
            word: l.word,
        });

        let retiring = old_mem_wb.map(|l| (l.pc, l.word));
        let wb_slot = match retiring {
            Some((pc, word)) if self.stats.first_seen_in_wb(pc, word) => {
                Some(StageSlot { pc, word })
            }
            _ => None,
        };

        self.stats.pipeline_history.push(PipelineSnapshot {
            cycle: self.cycle,
            fetch: if_slot,
            decode: id_slot,
            execute: ex_slot,
            memory: mem_slot,
            writeback: wb_slot,
        });

        if stalled {
            self.stats.stall_history.push(self.cycle);
        }
        if ev.any_forward() {
            self.stats.forward_history.push(ForwardRecord {
                cycle: self.cycle,
                forward_a: ev.forward_a.clone(),
                forward_b: ev.forward_b.clone(),
            });
        }
    }
}
