//! Instruction decode stage.
//!
//! Decode does three jobs in one cycle: it extracts fields and control
//! signals, it detects the hazards forwarding cannot fix, and it resolves
//! branches and jumps. Branch comparison values may come from the EX/MEM
//! latch computed earlier this same cycle, which is why the step function
//! hands the freshly computed latch in alongside the old ones.

use crate::core::gpr::RegisterFile;
use crate::core::pipeline::hazards::{load_control_hazard, load_use_hazard, resolve_for_decode};
use crate::core::pipeline::latches::{ExMem, IdEx, IfId, MemWb};
use crate::core::pipeline::signals::{AluOp, ControlSignals, OpBSrc};
use crate::events::{ControlKind, StallInfo, StallKind};
use crate::isa::{WordFields, disasm::disassemble, funct, opcodes};

/// A taken control transfer resolved in decode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Redirect {
    /// New PC.
    pub target: u16,
    /// Branch or jump, for the flush record.
    pub kind: ControlKind,
}

/// Everything decode hands back to the step function.
#[derive(Debug, Clone, Default)]
pub(crate) struct DecodeOutcome {
    /// The decoded latch entry; `None` for a bubble (empty fetch slot or
    /// an undefined encoding).
    pub latch: Option<IdEx>,
    /// Taken branch/jump. Never set together with `stall`.
    pub redirect: Option<Redirect>,
    /// Hazard requiring a stall. When set, the step function holds IF/ID,
    /// inserts a bubble, and rewinds the PC; the latch is discarded.
    pub stall: Option<StallInfo>,
}

/// Decodes the instruction in the old IF/ID latch.
pub(crate) fn decode_stage(
    regs: &RegisterFile,
    if_id: Option<&IfId>,
    ex_mem_fresh: Option<&ExMem>,
    id_ex_old: Option<&IdEx>,
    ex_mem_old: Option<&ExMem>,
    mem_wb_old: Option<&MemWb>,
) -> DecodeOutcome {
    let Some(fid) = if_id else {
        return DecodeOutcome::default();
    };
    let word = fid.word;

    let Some(decoded) = decode_word(word) else {
        // Reserved funct or opcode: a bubble, no writes, no side effects.
        return DecodeOutcome::default();
    };
    let (ctrl, rs, rt, rd) = decoded;
    let imm = word.imm();

    let mut latch = IdEx {
        pc: fid.pc,
        word,
        rs,
        rt,
        rd,
        imm,
        rs_val: regs.read(rs),
        rt_val: regs.read(rt),
        ctrl,
    };
    if ctrl.is_link() {
        // JAL: the return address rides down the pipeline in the rs_val
        // slot and EX moves it into alu_result.
        latch.rs_val = fid.pc.wrapping_add(1);
    }

    // Hazard detection. A stalled instruction is held in IF/ID and decoded
    // again next cycle; in particular a stalled branch or jump is NOT
    // resolved this cycle.
    let stall = detect_stall(&latch, id_ex_old, ex_mem_old);
    if stall.is_some() {
        return DecodeOutcome {
            latch: Some(latch),
            redirect: None,
            stall,
        };
    }

    // Branch and jump resolution, with same-cycle EX/MEM forwarding.
    let redirect = if ctrl.jump {
        let target = if word.opcode() == opcodes::R_TYPE {
            // JR: the target is rs, subject to the same forwarding
            // priority as branch comparison.
            resolve_for_decode(rs, regs.read(rs), ex_mem_fresh, ex_mem_old, mem_wb_old)
        } else {
            word.addr()
        };
        Some(Redirect {
            target,
            kind: ControlKind::Jump,
        })
    } else if ctrl.branch {
        let a = resolve_for_decode(rs, regs.read(rs), ex_mem_fresh, ex_mem_old, mem_wb_old);
        let b = resolve_for_decode(rt, regs.read(rt), ex_mem_fresh, ex_mem_old, mem_wb_old);
        let taken = if word.opcode() == opcodes::BEQ {
            a == b
        } else {
            a != b
        };
        taken.then(|| Redirect {
            target: (i32::from(fid.pc) + 1 + i32::from(imm)) as u16,
            kind: ControlKind::Branch,
        })
    } else {
        None
    };

    DecodeOutcome {
        latch: Some(latch),
        redirect,
        stall: None,
    }
}

/// Extracts control signals and register fields; `None` for reserved
/// encodings (R-type funct 6-7 and opcodes 11-15), which become bubbles.
fn decode_word(word: u16) -> Option<(ControlSignals, usize, usize, usize)> {
    let opcode = word.opcode();
    let mut ctrl = ControlSignals::default();

    match opcode {
        opcodes::R_TYPE => {
            let (rs, rt, rd) = (word.rs(), word.rt(), word.rd());
            match word.funct() {
                funct::ADD | funct::SUB | funct::AND | funct::OR | funct::SLT => {
                    ctrl.reg_write = true;
                    ctrl.b_src = OpBSrc::Reg2;
                    ctrl.alu = match word.funct() {
                        funct::ADD => AluOp::Add,
                        funct::SUB => AluOp::Sub,
                        funct::AND => AluOp::And,
                        funct::OR => AluOp::Or,
                        _ => AluOp::Slt,
                    };
                    Some((ctrl, rs, rt, rd))
                }
                funct::JR => {
                    ctrl.jump = true;
                    Some((ctrl, rs, rt, 0))
                }
                _ => None,
            }
        }

        opcodes::JUMP => {
            ctrl.jump = true;
            Some((ctrl, 0, 0, 0))
        }
        opcodes::JAL => {
            ctrl.jump = true;
            ctrl.reg_write = true;
            Some((ctrl, 0, 0, 7))
        }

        _ => {
            let (rs, rt) = (word.rs(), word.rt());
            match opcode {
                opcodes::LW => {
                    ctrl.reg_write = true;
                    ctrl.mem_read = true;
                    ctrl.mem_to_reg = true;
                    ctrl.b_src = OpBSrc::Imm;
                }
                opcodes::SW => {
                    ctrl.mem_write = true;
                    ctrl.b_src = OpBSrc::Imm;
                }
                opcodes::ADDI => {
                    ctrl.reg_write = true;
                    ctrl.b_src = OpBSrc::Imm;
                }
                opcodes::SUBI => {
                    ctrl.reg_write = true;
                    ctrl.alu = AluOp::Sub;
                    ctrl.b_src = OpBSrc::Imm;
                }
                opcodes::SLTI => {
                    ctrl.reg_write = true;
                    ctrl.alu = AluOp::Slt;
                    ctrl.b_src = OpBSrc::Imm;
                }
                opcodes::ANDI => {
                    ctrl.reg_write = true;
                    ctrl.alu = AluOp::And;
                    ctrl.b_src = OpBSrc::ImmZero;
                }
                opcodes::BEQ | opcodes::BNQ => {
                    ctrl.branch = true;
                    ctrl.b_src = OpBSrc::Reg2;
                }
                _ => return None,
            }
            // I-type writes land in rt.
            Some((ctrl, rs, rt, rt))
        }
    }
}

/// Runs both stall predicates against the in-flight latches.
fn detect_stall(
    latch: &IdEx,
    id_ex_old: Option<&IdEx>,
    ex_mem_old: Option<&ExMem>,
) -> Option<StallInfo> {
    let is_store = latch.ctrl.mem_write;

    if let Some(producer) = id_ex_old {
        if let Some(reg) = load_use_hazard(producer, latch.rs, latch.rt, is_store) {
            return Some(StallInfo {
                kind: StallKind::LoadUse,
                reg,
                blocking: disassemble(producer.word),
                blocked: disassemble(latch.word),
            });
        }
    }

    if latch.ctrl.branch || latch.ctrl.jump {
        if let Some(producer) = ex_mem_old {
            if let Some(reg) =
                load_control_hazard(producer, latch.rs, latch.rt, latch.ctrl.branch)
            {
                return Some(StallInfo {
                    kind: StallKind::LoadUseControl,
                    reg,
                    blocking: disassemble(producer.word),
                    blocked: disassemble(latch.word),
                });
            }
        }
    }

    None
}
