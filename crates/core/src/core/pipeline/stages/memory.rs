//! Memory access stage.

use tracing::trace;

use crate::core::memory::DataMemory;
use crate::core::pipeline::hazards::store_bypass;
use crate::core::pipeline::latches::{ExMem, MemWb};
use crate::events::{CycleEvents, MemoryWarning};
use crate::isa::disasm::disassemble;

/// Performs the data-memory access for the instruction in the old EX/MEM
/// latch. Reads of never-written addresses return zero and raise an
/// uninitialized-read warning. A store whose data register is being
/// written back by a load this very cycle picks the value up from
/// MEM/WB-old instead of its stale EX-stage copy.
pub(crate) fn memory_stage(
    mem: &mut DataMemory,
    ex_mem: Option<&ExMem>,
    mem_wb_old: Option<&MemWb>,
    ev: &mut CycleEvents,
) -> Option<MemWb> {
    let ex = ex_mem?;
    let addr = ex.alu;
    let mut mem_data = 0;

    if ex.ctrl.mem_read {
        let (value, initialized) = mem.load(addr);
        if !initialized {
            trace!(pc = ex.pc, addr, "uninitialized read");
            ev.memory_warning = Some(MemoryWarning {
                address: addr,
                instruction: disassemble(ex.word),
            });
        }
        mem_data = value;
    } else if ex.ctrl.mem_write {
        let mut value = ex.rt_val;
        if let Some(bypass) = store_bypass(ex, mem_wb_old) {
            trace!(pc = ex.pc, reg = bypass.reg, value = bypass.value, "store bypass");
            value = bypass.value;
            if ev.forward_b.is_none() {
                ev.forward_b = Some(bypass);
            }
        }
        mem.store(addr, value);
    }

    Some(MemWb {
        pc: ex.pc,
        word: ex.word,
        rd: ex.rd,
        alu: ex.alu,
        mem_data,
        ctrl: ex.ctrl,
    })
}
