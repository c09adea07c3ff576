//! ISA Tests: field extraction, encoder primitives, disassembly, and the
//! encode → disassemble → re-assemble round trip.

use m16_core::assemble;
use m16_core::isa::disasm::disassemble;
use m16_core::isa::encode::{encode_i, encode_j, encode_r};
use m16_core::isa::{WordFields, funct, opcodes};
use pretty_assertions::assert_eq;
use proptest::prelude::*;

// ══════════════════════════════════════════════════════════
// 1. Field extraction
// ══════════════════════════════════════════════════════════

#[test]
fn fields_round_trip_through_the_word() {
    let w = encode_r(1, 2, 3, funct::SUB);
    assert_eq!(w.opcode(), opcodes::R_TYPE);
    assert_eq!((w.rs(), w.rt(), w.rd(), w.funct()), (1, 2, 3, funct::SUB));

    let w = encode_i(opcodes::ADDI, 5, 6, -7);
    assert_eq!(w.opcode(), opcodes::ADDI);
    assert_eq!((w.rs(), w.rt(), w.imm()), (5, 6, -7));

    let w = encode_j(opcodes::JUMP, 0xABC);
    assert_eq!((w.opcode(), w.addr()), (opcodes::JUMP, 0xABC));
}

#[test]
fn immediate_sign_extension_covers_the_full_range() {
    for imm in -32i16..=31 {
        let w = encode_i(opcodes::ADDI, 0, 1, imm);
        assert_eq!(w.imm(), imm, "imm {imm} must survive encode/extract");
    }
}

// ══════════════════════════════════════════════════════════
// 2. Disassembly
// ══════════════════════════════════════════════════════════

#[test]
fn disassembles_each_format() {
    assert_eq!(disassemble(0x3045), "ADDI $r1, $r0, 5");
    assert_eq!(disassemble(0x0298), "ADD $r3, $r1, $r2");
    assert_eq!(disassemble(0x0E05), "JR $r7");
    assert_eq!(disassemble(0x9003), "JUMP 3");
    assert_eq!(disassemble(0xA003), "JAL 3");
}

#[test]
fn loads_and_stores_print_offset_form() {
    assert_eq!(
        disassemble(encode_i(opcodes::LW, 0, 2, 4)),
        "LW $r2, 4($r0)"
    );
    assert_eq!(
        disassemble(encode_i(opcodes::SW, 5, 1, -3)),
        "SW $r1, -3($r5)"
    );
}

#[test]
fn branch_immediates_print_signed() {
    assert_eq!(
        disassemble(encode_i(opcodes::BNQ, 1, 0, -3)),
        "BNQ $r1, $r0, -3"
    );
}

#[test]
fn reserved_encodings_print_question_marks() {
    // R-type funct 6 and 7 are undefined, as are opcodes 11-15.
    assert_eq!(disassemble(0x0006), "???");
    assert_eq!(disassemble(0x0007), "???");
    assert_eq!(disassemble(0xB000), "???");
    assert_eq!(disassemble(0xF123), "???");
}

// ══════════════════════════════════════════════════════════
// 3. Round trip: encode → disassemble → re-assemble
// ══════════════════════════════════════════════════════════

/// Strategy over every valid instruction encoding.
fn valid_word() -> impl Strategy<Value = u16> {
    prop_oneof![
        // R-type ALU
        (0usize..8, 0usize..8, 0usize..8, 0u16..5)
            .prop_map(|(rs, rt, rd, f)| encode_r(rs, rt, rd, f)),
        // JR
        (0usize..8).prop_map(|rs| encode_r(rs, 0, 0, funct::JR)),
        // I-type
        (
            prop_oneof![
                Just(opcodes::LW),
                Just(opcodes::SW),
                Just(opcodes::ADDI),
                Just(opcodes::SUBI),
                Just(opcodes::SLTI),
                Just(opcodes::BEQ),
                Just(opcodes::BNQ),
                Just(opcodes::ANDI),
            ],
            0usize..8,
            0usize..8,
            -32i16..32,
        )
            .prop_map(|(op, rs, rt, imm)| encode_i(op, rs, rt, imm)),
        // J-type
        (
            prop_oneof![Just(opcodes::JUMP), Just(opcodes::JAL)],
            0u16..0x1000
        )
            .prop_map(|(op, addr)| encode_j(op, addr)),
    ]
}

proptest! {
    #[test]
    fn disassembly_reassembles_to_the_same_word(word in valid_word()) {
        let text = disassemble(word);
        let program = assemble(&text);
        prop_assert!(program.is_ok(), "`{}` failed to re-assemble", text);
        let words = program.map(|p| p.words).unwrap_or_default();
        prop_assert_eq!(words, vec![word], "`{}` round trip", text);
    }
}
