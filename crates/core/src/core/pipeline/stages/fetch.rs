//! Instruction fetch stage.

use crate::core::pipeline::latches::IfId;

/// Fetches the word at `pc` and advances `pc` by one. Returns a bubble
/// once the PC has run past the end of instruction memory, which lets the
/// pipeline drain.
pub(crate) fn fetch_stage(imem: &[u16], pc: &mut u16) -> Option<IfId> {
    let index = usize::from(*pc);
    if index >= imem.len() {
        return None;
    }
    let latch = IfId {
        pc: *pc,
        word: imem[index],
    };
    *pc = pc.wrapping_add(1);
    Some(latch)
}
