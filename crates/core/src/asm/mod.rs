//! Two-pass assembler for the 16-bit instruction set.
//!
//! Translates free-form source text into 16-bit machine words:
//! 1. **Pass one** walks every line, assigns each instruction a sequential
//!    address starting at zero, and records label declarations. Forward
//!    references never fail this pass.
//! 2. **Pass two** encodes one word per instruction, resolving label
//!    references (absolute for jumps, PC-relative for branches).
//!
//! Errors abort assembly immediately and carry the offending source line;
//! no partial output is produced.

/// Assembler error types.
pub mod error;
/// Source line tokenizer.
pub mod lexer;
/// Operand parsers (registers, immediates, memory operands).
pub mod operand;

pub use error::{AsmError, AsmErrorKind};

use std::collections::BTreeMap;

use serde::Serialize;
use tracing::debug;

use crate::asm::lexer::tokenize;
use crate::asm::operand::{
    looks_like_label, parse_immediate, parse_int, parse_register, split_mem_operand,
};
use crate::isa::{ADDR_MAX, disasm::disassemble, encode, funct, opcodes};

/// Width of the branch/ALU immediate field in bits.
const IMM_BITS: u32 = 6;

/// A fully assembled program.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Program {
    /// Machine words in instruction-memory order.
    pub words: Vec<u16>,
    /// Instruction address to trimmed source line, for display.
    pub source_map: BTreeMap<u16, String>,
    /// Label name to instruction address.
    pub labels: BTreeMap<String, u16>,
}

/// One row of the program listing: everything a front end needs to display
/// an assembled instruction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ListingEntry {
    /// Instruction address.
    pub address: u16,
    /// Machine word as four uppercase hex digits.
    pub hex: String,
    /// Machine word as sixteen binary digits.
    pub binary: String,
    /// Trimmed source line the word came from.
    pub source: String,
    /// Disassembly of the word.
    pub disasm: String,
}

impl Program {
    /// Machine words formatted as four uppercase hex digits each.
    pub fn hex_words(&self) -> Vec<String> {
        self.words.iter().map(|w| format!("{w:04X}")).collect()
    }

    /// Builds the per-instruction listing (address, hex, binary, source,
    /// disassembly).
    pub fn listing(&self) -> Vec<ListingEntry> {
        self.words
            .iter()
            .enumerate()
            .map(|(i, &word)| {
                let address = i as u16;
                ListingEntry {
                    address,
                    hex: format!("{word:04X}"),
                    binary: format!("{word:016b}"),
                    source: self.source_map.get(&address).cloned().unwrap_or_default(),
                    disasm: disassemble(word),
                }
            })
            .collect()
    }
}

/// An instruction collected by pass one, waiting to be encoded.
struct Pending {
    addr: u16,
    line: usize,
    mnemonic: String,
    operands: Vec<String>,
    source: String,
}

/// Assembles source text into a [`Program`].
///
/// # Errors
///
/// Returns the first [`AsmError`] encountered, with its 1-based source line.
pub fn assemble(source: &str) -> Result<Program, AsmError> {
    let lines: Vec<&str> = source.lines().collect();

    // Pass one: addresses and labels.
    let mut labels = BTreeMap::new();
    let mut pending = Vec::new();
    let mut addr: u16 = 0;
    for (idx, raw) in lines.iter().enumerate() {
        let line = idx + 1;
        let tokens = tokenize(raw);

        if let Some(label) = tokens.label {
            if labels.contains_key(&label) {
                return Err(AsmError::new(line, AsmErrorKind::DuplicateLabel(label)));
            }
            labels.insert(label, addr);
        }

        if let Some(mnemonic) = tokens.mnemonic {
            pending.push(Pending {
                addr,
                line,
                mnemonic,
                operands: tokens.operands,
                source: raw.trim().to_owned(),
            });
            addr += 1;
        }
    }

    // Pass two: encoding, with labels fully known.
    let mut program = Program {
        labels,
        ..Program::default()
    };
    for inst in pending {
        let word = encode_instruction(&inst, &program.labels)
            .map_err(|kind| AsmError::new(inst.line, kind))?;
        program.words.push(word);
        program.source_map.insert(inst.addr, inst.source);
    }

    debug!(
        instructions = program.words.len(),
        labels = program.labels.len(),
        "assembled program"
    );
    Ok(program)
}

/// Encodes one instruction with all labels resolved.
fn encode_instruction(inst: &Pending, labels: &BTreeMap<String, u16>) -> Result<u16, AsmErrorKind> {
    let ops = &inst.operands;
    match inst.mnemonic.as_str() {
        "ADD" | "SUB" | "AND" | "OR" | "SLT" => {
            let f = match inst.mnemonic.as_str() {
                "ADD" => funct::ADD,
                "SUB" => funct::SUB,
                "AND" => funct::AND,
                "OR" => funct::OR,
                _ => funct::SLT,
            };
            expect_operands(inst, 3, "3")?;
            let rd = parse_register(&ops[0])?;
            let rs = parse_register(&ops[1])?;
            let rt = parse_register(&ops[2])?;
            Ok(encode::encode_r(rs, rt, rd, f))
        }

        "JR" => {
            expect_operands(inst, 1, "1")?;
            let rs = parse_register(&ops[0])?;
            Ok(encode::encode_r(rs, 0, 0, funct::JR))
        }

        "LW" | "SW" => {
            let opcode = if inst.mnemonic == "LW" {
                opcodes::LW
            } else {
                opcodes::SW
            };
            let (rt, rs, imm) = match ops.len() {
                // LW $rt, offset($rs)
                2 => {
                    let rt = parse_register(&ops[0])?;
                    let (offset, reg) = split_mem_operand(&ops[1])
                        .ok_or_else(|| AsmErrorKind::MalformedMemOperand(ops[1].clone()))?;
                    let rs = parse_register(reg)
                        .map_err(|_| AsmErrorKind::MalformedMemOperand(ops[1].clone()))?;
                    (rt, rs, parse_immediate(offset, IMM_BITS)?)
                }
                // LW $rt, $rs, offset
                3 => {
                    let rt = parse_register(&ops[0])?;
                    let rs = parse_register(&ops[1])?;
                    (rt, rs, parse_immediate(&ops[2], IMM_BITS)?)
                }
                n => {
                    return Err(AsmErrorKind::OperandCount {
                        mnemonic: inst.mnemonic.clone(),
                        expected: "2 or 3",
                        got: n,
                    });
                }
            };
            Ok(encode::encode_i(opcode, rs, rt, imm))
        }

        "ADDI" | "SUBI" | "SLTI" | "ANDI" => {
            let opcode = match inst.mnemonic.as_str() {
                "ADDI" => opcodes::ADDI,
                "SUBI" => opcodes::SUBI,
                "SLTI" => opcodes::SLTI,
                _ => opcodes::ANDI,
            };
            expect_operands(inst, 3, "3")?;
            let rt = parse_register(&ops[0])?;
            let rs = parse_register(&ops[1])?;
            let imm = parse_immediate(&ops[2], IMM_BITS)?;
            Ok(encode::encode_i(opcode, rs, rt, imm))
        }

        "BEQ" | "BNQ" => {
            let opcode = if inst.mnemonic == "BEQ" {
                opcodes::BEQ
            } else {
                opcodes::BNQ
            };
            expect_operands(inst, 3, "3")?;
            let rs = parse_register(&ops[0])?;
            let rt = parse_register(&ops[1])?;
            let imm = branch_offset(&ops[2], inst.addr, labels)?;
            Ok(encode::encode_i(opcode, rs, rt, imm))
        }

        "JUMP" | "JAL" => {
            let opcode = if inst.mnemonic == "JUMP" {
                opcodes::JUMP
            } else {
                opcodes::JAL
            };
            expect_operands(inst, 1, "1")?;
            let address = jump_target(&ops[0], labels)?;
            Ok(encode::encode_j(opcode, address))
        }

        other => Err(AsmErrorKind::UnknownMnemonic(other.to_owned())),
    }
}

/// Resolves a branch target to a PC-relative offset from the instruction
/// after the branch: `target_addr - (current_addr + 1)`.
fn branch_offset(
    target: &str,
    current_addr: u16,
    labels: &BTreeMap<String, u16>,
) -> Result<i16, AsmErrorKind> {
    let target = target.trim();
    if let Some(&addr) = labels.get(target) {
        let offset = i64::from(addr) - (i64::from(current_addr) + 1);
        let max = (1i64 << (IMM_BITS - 1)) - 1;
        let min = -(1i64 << (IMM_BITS - 1));
        if offset < min || offset > max {
            return Err(AsmErrorKind::ImmediateRange {
                value: offset,
                min,
                max,
            });
        }
        Ok(offset as i16)
    } else if looks_like_label(target) {
        Err(AsmErrorKind::UndefinedLabel(target.to_owned()))
    } else {
        parse_immediate(target, IMM_BITS)
    }
}

/// Resolves a jump target to an absolute 12-bit address.
fn jump_target(target: &str, labels: &BTreeMap<String, u16>) -> Result<u16, AsmErrorKind> {
    let target = target.trim();
    if let Some(&addr) = labels.get(target) {
        if addr > ADDR_MAX {
            return Err(AsmErrorKind::JumpOutOfRange(i64::from(addr)));
        }
        return Ok(addr);
    }
    if looks_like_label(target) {
        return Err(AsmErrorKind::UndefinedLabel(target.to_owned()));
    }
    let value =
        parse_int(target).ok_or_else(|| AsmErrorKind::MalformedImmediate(target.to_owned()))?;
    if value < 0 || value > i64::from(ADDR_MAX) {
        return Err(AsmErrorKind::JumpOutOfRange(value));
    }
    Ok(value as u16)
}

fn expect_operands(inst: &Pending, want: usize, label: &'static str) -> Result<(), AsmErrorKind> {
    if inst.operands.len() == want {
        Ok(())
    } else {
        Err(AsmErrorKind::OperandCount {
            mnemonic: inst.mnemonic.clone(),
            expected: label,
            got: inst.operands.len(),
        })
    }
}
