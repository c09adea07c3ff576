//! Data hazard detection and operand forwarding.
//!
//! This module keeps the pipeline consistent across data dependencies:
//! 1. **Load-use detection:** Identifies the hazards that forwarding cannot
//!    resolve and that therefore require a stall bubble.
//! 2. **EX-stage forwarding:** Bypasses not-yet-written-back values from
//!    EX/MEM and MEM/WB into a dependent instruction's operands.
//! 3. **Decode-stage resolution:** Supplies branch/jump comparison values,
//!    including the result the EX stage produced earlier this same cycle.

use crate::core::pipeline::latches::{ExMem, IdEx, MemWb};
use crate::events::{ForwardInfo, ForwardSource};

/// Checks the general load-use hazard: a load in EX (the old ID/EX latch)
/// produces a register the instruction in decode reads.
///
/// A store's `rt` is exempt: it is consumed only in MEM, where the
/// just-loaded value can still be bypassed in from MEM/WB.
/// Returns the awaited register.
pub fn load_use_hazard(id_ex: &IdEx, rs: usize, rt: usize, is_store: bool) -> Option<usize> {
    if !id_ex.ctrl.mem_read || id_ex.rd == 0 {
        return None;
    }
    if id_ex.rd == rs {
        return Some(rs);
    }
    if id_ex.rd == rt && !is_store {
        return Some(rt);
    }
    None
}

/// Checks the load-to-branch/jump hazard: a load in MEM (the old EX/MEM
/// latch) produces a register a branch or jump resolving in decode needs.
/// The load's data is only known after MEM, so this costs one extra stall
/// beyond the general load-use case. Returns the awaited register.
pub fn load_control_hazard(ex_mem: &ExMem, rs: usize, rt: usize, uses_rt: bool) -> Option<usize> {
    if !ex_mem.ctrl.mem_to_reg || ex_mem.rd == 0 {
        return None;
    }
    if ex_mem.rd == rs {
        return Some(rs);
    }
    if uses_rt && ex_mem.rd == rt {
        return Some(rt);
    }
    None
}

/// Resolves both EX operands by bypassing from later pipeline stages.
///
/// Lower-priority sources are applied first and overridden by higher ones:
/// MEM/WB-old supplies its writeback value, then EX/MEM-old supplies its
/// ALU result. Loads are excluded from the EX/MEM path (their ALU result
/// is an address); the load-use stall guarantees a dependent consumer
/// never meets a load there, and stores pick up their data in MEM.
///
/// Returns the resolved `(rs_val, rt_val)` and a record of which bypass,
/// if any, supplied each operand.
pub fn forward_operands(
    id: &IdEx,
    ex_mem: Option<&ExMem>,
    mem_wb: Option<&MemWb>,
) -> (u16, u16, Option<ForwardInfo>, Option<ForwardInfo>) {
    let mut a = id.rs_val;
    let mut b = id.rt_val;
    let mut info_a = None;
    let mut info_b = None;

    if let Some(wb) = mem_wb {
        if wb.ctrl.reg_write && wb.rd != 0 {
            let val = wb.writeback_value();
            if wb.rd == id.rs {
                a = val;
                info_a = Some(ForwardInfo {
                    source: ForwardSource::MemWb,
                    reg: wb.rd,
                    value: val,
                });
            }
            if wb.rd == id.rt {
                b = val;
                info_b = Some(ForwardInfo {
                    source: ForwardSource::MemWb,
                    reg: wb.rd,
                    value: val,
                });
            }
        }
    }

    if let Some(ex) = ex_mem {
        if ex.ctrl.reg_write && ex.rd != 0 && !ex.ctrl.mem_read {
            if ex.rd == id.rs {
                a = ex.alu;
                info_a = Some(ForwardInfo {
                    source: ForwardSource::ExMem,
                    reg: ex.rd,
                    value: ex.alu,
                });
            }
            if ex.rd == id.rt {
                b = ex.alu;
                info_b = Some(ForwardInfo {
                    source: ForwardSource::ExMem,
                    reg: ex.rd,
                    value: ex.alu,
                });
            }
        }
    }

    (a, b, info_a, info_b)
}

/// Resolves one register value for a branch comparison or jump target in
/// decode.
///
/// Priority, highest first: the EX/MEM latch freshly computed this same
/// cycle (the result of the immediately preceding instruction), then the
/// old EX/MEM latch, then the old MEM/WB latch, then the register file
/// value read at decode. Loads never supply a value here; the load-use and
/// load-to-control stalls hold the branch until the data reaches MEM/WB.
pub fn resolve_for_decode(
    reg: usize,
    reg_val: u16,
    ex_mem_fresh: Option<&ExMem>,
    ex_mem_old: Option<&ExMem>,
    mem_wb_old: Option<&MemWb>,
) -> u16 {
    let mut val = reg_val;

    if let Some(wb) = mem_wb_old {
        if wb.ctrl.reg_write && wb.rd != 0 && wb.rd == reg {
            val = wb.writeback_value();
        }
    }
    if let Some(ex) = ex_mem_old {
        if ex.ctrl.reg_write && ex.rd != 0 && !ex.ctrl.mem_read && ex.rd == reg {
            val = ex.alu;
        }
    }
    if let Some(fresh) = ex_mem_fresh {
        if fresh.ctrl.reg_write && fresh.rd != 0 && !fresh.ctrl.mem_read && fresh.rd == reg {
            val = fresh.alu;
        }
    }

    val
}

/// Bypasses a just-loaded value into a store's data in the MEM stage.
///
/// Fires when the instruction completing writeback this cycle (MEM/WB-old)
/// is a load whose destination is the store's `rt`; this is the one data
/// path the EX-stage forwarding cannot cover without a stall.
pub fn store_bypass(store: &ExMem, mem_wb_old: Option<&MemWb>) -> Option<ForwardInfo> {
    let wb = mem_wb_old?;
    if wb.ctrl.mem_to_reg && wb.ctrl.reg_write && wb.rd != 0 && wb.rd == store.rt {
        Some(ForwardInfo {
            source: ForwardSource::MemWb,
            reg: wb.rd,
            value: wb.mem_data,
        })
    } else {
        None
    }
}
