//! Cycle-accurate 16-bit MIPS-style pipeline simulator core.
//!
//! This crate implements a teaching simulator with the following pieces:
//! 1. **Assembler:** Two-pass translation of source text into 16-bit
//!    machine words with label resolution and line-numbered errors.
//! 2. **ISA:** Encoding primitives, field extraction, and a disassembler
//!    for the R/I/J instruction formats.
//! 3. **Core:** A classical five-stage in-order pipeline (IF, ID, EX, MEM,
//!    WB) with operand forwarding, load-use hazard stalls, and decode-stage
//!    branch resolution with flush.
//! 4. **Observability:** Per-cycle records of every stall, forward, flush,
//!    and uninitialized memory read, plus cumulative histories and derived
//!    metrics (CPI, stall rate, forward rate) for visualization.
//! 5. **State:** Display snapshots and a versioned serialize/restore wire
//!    format so a host can persist a CPU between steps.

/// Two-pass assembler: tokenizer, operand parsers, driver, errors.
pub mod asm;
/// CPU core: register file, memories, pipeline, step function.
pub mod core;
/// Per-cycle observability records.
pub mod events;
/// Instruction set: formats, encoding, disassembly.
pub mod isa;
/// Snapshots and the persisted wire format.
pub mod state;
/// Cumulative histories and derived performance metrics.
pub mod stats;

/// Assembles source text into machine words; the main assembler entry.
pub use crate::asm::{AsmError, Program, assemble};
/// The pipelined CPU; construct with `Cpu::new`, drive with `step`.
pub use crate::core::Cpu;
/// Display-oriented snapshot of the full CPU state.
pub use crate::state::CpuState;
