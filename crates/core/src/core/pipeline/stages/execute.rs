//! Execute stage with operand forwarding.

use tracing::trace;

use crate::core::pipeline::hazards::forward_operands;
use crate::core::pipeline::latches::{ExMem, IdEx, MemWb};
use crate::core::pipeline::signals::{AluOp, OpBSrc};
use crate::events::CycleEvents;

/// 16-bit ALU. Addition and subtraction wrap modulo 2^16; set-less-than
/// compares two's-complement signed.
fn alu(op: AluOp, a: u16, b: u16) -> u16 {
    match op {
        AluOp::Add => a.wrapping_add(b),
        AluOp::Sub => a.wrapping_sub(b),
        AluOp::And => a & b,
        AluOp::Or => a | b,
        AluOp::Slt => u16::from((a as i16) < (b as i16)),
    }
}

/// Executes the instruction in the old ID/EX latch, resolving operands
/// through the forwarding unit and recording any bypass that fired.
pub(crate) fn execute_stage(
    id_ex: Option<&IdEx>,
    ex_mem_old: Option<&ExMem>,
    mem_wb_old: Option<&MemWb>,
    ev: &mut CycleEvents,
) -> Option<ExMem> {
    let id = id_ex?;

    let (rs_val, rt_val, fwd_a, fwd_b) = forward_operands(id, ex_mem_old, mem_wb_old);
    if let Some(f) = &fwd_a {
        trace!(pc = id.pc, reg = f.reg, value = f.value, source = ?f.source, "forward rs");
    }
    if let Some(f) = &fwd_b {
        trace!(pc = id.pc, reg = f.reg, value = f.value, source = ?f.source, "forward rt");
    }
    // The MEM stage may already have recorded a store bypass in the same
    // slot this cycle; only a real EX-stage bypass replaces it.
    if fwd_a.is_some() {
        ev.forward_a = fwd_a;
    }
    if fwd_b.is_some() {
        ev.forward_b = fwd_b;
    }

    let op_b = match id.ctrl.b_src {
        OpBSrc::Reg2 => rt_val,
        OpBSrc::Imm => id.imm as u16,
        OpBSrc::ImmZero => (id.imm as u16) & 0x3F,
    };

    // JAL carries its return address in the rs_val slot; everything else
    // goes through the ALU.
    let alu_out = if id.ctrl.is_link() {
        id.rs_val
    } else {
        alu(id.ctrl.alu, rs_val, op_b)
    };

    Some(ExMem {
        pc: id.pc,
        word: id.word,
        rd: id.rd,
        rt: id.rt,
        alu: alu_out,
        rt_val,
        ctrl: id.ctrl,
    })
}
