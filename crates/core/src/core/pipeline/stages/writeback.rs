//! Writeback stage.

use crate::core::gpr::RegisterFile;
use crate::core::pipeline::latches::MemWb;

/// Commits the writeback value to the register file. Writes to `$r0` are
/// discarded by the register file itself.
pub(crate) fn writeback_stage(regs: &mut RegisterFile, mem_wb: Option<&MemWb>) {
    let Some(wb) = mem_wb else { return };
    if wb.ctrl.reg_write && wb.rd != 0 {
        regs.write(wb.rd, wb.writeback_value());
    }
}
