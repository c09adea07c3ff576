//! Control Transfer Tests: decode-stage branch resolution, flushes,
//! load-to-branch stalls, and the jump family.

use m16_core::events::{ControlKind, StallKind};
use pretty_assertions::assert_eq;

use crate::common::{boot, run_program, run_to_halt, step_n};

// ══════════════════════════════════════════════════════════
// 1. Taken branch flushes the fetched successor
// ══════════════════════════════════════════════════════════

#[test]
fn taken_branch_flushes_the_wrong_path_instruction() {
    let mut cpu = boot(
        "
        ADDI $r1, $r0, 1
        ADDI $r2, $r0, 1
        BEQ  $r1, $r2, TGT
        ADDI $r4, $r0, 99
        TGT: ADDI $r5, $r0, 42
        ",
    );
    let reports = run_to_halt(&mut cpu);

    assert_eq!(cpu.regs.read(4), 0, "the flushed ADDI never retires");
    assert_eq!(cpu.regs.read(5), 42);
    assert_eq!(cpu.stats.flush_count, 1);
    assert!(
        cpu.stats.stall_history.is_empty(),
        "EX/MEM-new forwarding resolves the branch without stalling"
    );

    let hazard = reports
        .iter()
        .find_map(|r| r.events.control_hazard.as_ref())
        .map(|h| (h.kind, h.target, h.flushed.as_str()));
    assert_eq!(
        hazard,
        Some((ControlKind::Branch, 4, "ADDI $r4, $r0, 99")),
        "the flush names the squashed instruction and the target"
    );
}

#[test]
fn untaken_branch_does_not_flush() {
    let cpu = run_program(
        "
        ADDI $r1, $r0, 1
        BEQ  $r1, $r0, SKIP
        ADDI $r2, $r0, 7
        SKIP: ADDI $r3, $r0, 2
        ",
    );
    assert_eq!(cpu.regs.read(2), 7, "fall-through path executes");
    assert_eq!(cpu.regs.read(3), 2);
    assert_eq!(cpu.stats.flush_count, 0);
}

#[test]
fn bnq_branches_backward() {
    let cpu = run_program(
        "
        ADDI $r1, $r0, 3
        LOOP: SUBI $r1, $r1, 1
        BNQ  $r1, $r0, LOOP
        ADDI $r2, $r0, 1
        ",
    );
    assert_eq!(cpu.regs.read(1), 0, "loop counts down to zero");
    assert_eq!(cpu.regs.read(2), 1);
    assert_eq!(cpu.stats.flush_count, 2, "two taken back-edges");
}

// ══════════════════════════════════════════════════════════
// 2. Load-to-branch: one extra stall beyond load-use
// ══════════════════════════════════════════════════════════

#[test]
fn branch_on_loaded_value_stalls_twice_then_resolves() {
    let mut cpu = boot(
        "
        LW  $r1, $r0, 0
        BEQ $r1, $r0, TGT
        TGT: ADDI $r2, $r0, 9
        ",
    );
    let reports = run_to_halt(&mut cpu);

    assert_eq!(cpu.regs.read(2), 9, "branch taken: loaded 0 equals r0");
    assert_eq!(cpu.stats.flush_count, 1, "exactly one taken transfer");

    let kinds: Vec<_> = reports
        .iter()
        .filter_map(|r| r.events.stall.as_ref().map(|s| s.kind))
        .collect();
    assert_eq!(
        kinds,
        vec![StallKind::LoadUse, StallKind::LoadUseControl],
        "the general load-use stall, then the load-to-branch stall"
    );

    let warnings: Vec<_> = reports
        .iter()
        .filter_map(|r| r.events.memory_warning.as_ref())
        .collect();
    assert_eq!(warnings.len(), 1, "one uninitialized read");
    assert_eq!(warnings[0].address, 0);
    assert_eq!(warnings[0].instruction, "LW $r1, 0($r0)");
}

// ══════════════════════════════════════════════════════════
// 3. Jumps
// ══════════════════════════════════════════════════════════

#[test]
fn jump_redirects_and_flushes() {
    let mut cpu = boot(
        "
        JUMP OVER
        ADDI $r1, $r0, 1
        OVER: ADDI $r2, $r0, 2
        ",
    );
    let reports = run_to_halt(&mut cpu);
    assert_eq!(cpu.regs.read(1), 0);
    assert_eq!(cpu.regs.read(2), 2);
    assert_eq!(cpu.stats.flush_count, 1);

    let hazard = reports
        .iter()
        .find_map(|r| r.events.control_hazard.as_ref())
        .map(|h| (h.kind, h.target));
    assert_eq!(hazard, Some((ControlKind::Jump, 2)));
}

#[test]
fn jal_links_and_jr_returns() {
    let cpu = run_program(
        "
        JAL FN
        ADDI $r2, $r0, 1
        JUMP DONE
        FN: ADDI $r1, $r0, 5
        JR $r7
        DONE: ADD $r3, $r1, $r2
        ",
    );
    assert_eq!(
        cpu.regs.read(7),
        1,
        "JAL links the address after itself into r7"
    );
    assert_eq!(cpu.regs.read(1), 5, "callee body ran");
    assert_eq!(cpu.regs.read(2), 1, "execution resumed after the call");
    assert_eq!(cpu.regs.read(3), 6);
    assert_eq!(cpu.stats.flush_count, 3, "JAL, JR, and JUMP each flush");
    assert!(cpu.halted, "PC runs past the end and the pipeline drains");
}

#[test]
fn jal_write_forwards_into_an_immediate_jr() {
    let mut cpu = boot(
        "
        ADDI $r7, $r0, 0
        JAL FN
        ADDI $r1, $r0, 5
        FN: JR $r7
        ",
    );
    // Cycle 5 resolves the JR: its r7 comes from the in-flight JAL write,
    // not the stale register file.
    let reports = step_n(&mut cpu, 5);
    let last_hazard = reports
        .iter()
        .rev()
        .find_map(|r| r.events.control_hazard.as_ref());
    assert_eq!(
        last_hazard.map(|h| (h.kind, h.target)),
        Some((ControlKind::Jump, 2)),
        "JR jumps to the linked return address"
    );
    assert_eq!(cpu.stats.flush_count, 2, "JAL flush, then JR flush");

    // One more cycle retires the JAL.
    let _ = step_n(&mut cpu, 1);
    assert_eq!(cpu.regs.read(7), 2, "JAL wrote the return address");
}

#[test]
fn jr_forwards_from_the_same_cycle_ex_result() {
    let cpu = run_program(
        "
        ADDI $r1, $r0, 3
        JR   $r1
        ADDI $r2, $r0, 1
        ADDI $r3, $r0, 9
        ",
    );
    assert_eq!(cpu.regs.read(3), 9, "JR lands on address 3");
    assert_eq!(cpu.regs.read(2), 0, "skipped instruction never retires");
    assert!(
        cpu.stats.stall_history.is_empty(),
        "the producer's result is forwarded from the EX/MEM latch computed \
         this cycle"
    );
    assert_eq!(cpu.stats.flush_count, 1);
}

// ══════════════════════════════════════════════════════════
// 4. Flush bookkeeping details
// ══════════════════════════════════════════════════════════

#[test]
fn flush_with_empty_fetch_slot_still_counts() {
    // The JR sits at the end of instruction memory, so the slot it
    // flushes is already empty; its target is one past the end.
    let mut cpu = boot(
        "
        ADDI $r1, $r0, 2
        JR   $r1
        ",
    );
    let reports = run_to_halt(&mut cpu);
    let hazard = reports
        .iter()
        .find_map(|r| r.events.control_hazard.as_ref());
    assert_eq!(hazard.map(|h| h.flushed.as_str()), Some("NOP"));
    assert!(cpu.stats.flush_count >= 1);
}
