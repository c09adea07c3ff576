//! Instruction disassembler.
//!
//! Converts a 16-bit instruction word into a human-readable mnemonic string
//! for latch display, trace output, and test diagnostics. Immediates are
//! shown signed after sign-extension from six bits; loads and stores use the
//! `offset(reg)` form. Unrecognized encodings render as `"???"`.

use crate::isa::{WordFields, funct, opcodes};

/// Disassembles a 16-bit instruction word.
///
/// The output re-assembles to the same word for every valid encoding
/// (loads and stores normalize to the two-operand `offset(reg)` form).
pub fn disassemble(word: u16) -> String {
    match word.opcode() {
        opcodes::R_TYPE => disasm_r_type(word),

        opcodes::JUMP => format!("JUMP {}", word.addr()),
        opcodes::JAL => format!("JAL {}", word.addr()),

        op => {
            let (rs, rt, imm) = (word.rs(), word.rt(), word.imm());
            match op {
                opcodes::LW => format!("LW $r{rt}, {imm}($r{rs})"),
                opcodes::SW => format!("SW $r{rt}, {imm}($r{rs})"),
                opcodes::ADDI => format!("ADDI $r{rt}, $r{rs}, {imm}"),
                opcodes::SUBI => format!("SUBI $r{rt}, $r{rs}, {imm}"),
                opcodes::SLTI => format!("SLTI $r{rt}, $r{rs}, {imm}"),
                opcodes::BEQ => format!("BEQ $r{rs}, $r{rt}, {imm}"),
                opcodes::BNQ => format!("BNQ $r{rs}, $r{rt}, {imm}"),
                opcodes::ANDI => format!("ANDI $r{rt}, $r{rs}, {imm}"),
                _ => "???".to_owned(),
            }
        }
    }
}

fn disasm_r_type(word: u16) -> String {
    let (rs, rt, rd) = (word.rs(), word.rt(), word.rd());
    match word.funct() {
        funct::ADD => format!("ADD $r{rd}, $r{rs}, $r{rt}"),
        funct::SUB => format!("SUB $r{rd}, $r{rs}, $r{rt}"),
        funct::AND => format!("AND $r{rd}, $r{rs}, $r{rt}"),
        funct::OR => format!("OR $r{rd}, $r{rs}, $r{rt}"),
        funct::SLT => format!("SLT $r{rd}, $r{rs}, $r{rt}"),
        funct::JR => format!("JR $r{rs}"),
        _ => "???".to_owned(),
    }
}
