//! Assembler Tests: tokenizing, labels, operand shapes, and errors.

use m16_core::asm::lexer::{LineTokens, tokenize};
use m16_core::asm::{AsmErrorKind, assemble};
use pretty_assertions::assert_eq;
use rstest::rstest;

use crate::common::{asm, asm_err};

// ══════════════════════════════════════════════════════════
// 1. Tokenizer
// ══════════════════════════════════════════════════════════

#[test]
fn tokenize_strips_comments_and_whitespace() {
    assert_eq!(tokenize("  # just a comment"), LineTokens::default());
    assert_eq!(tokenize("   // another"), LineTokens::default());
    assert_eq!(tokenize(""), LineTokens::default());

    let t = tokenize("  addi $r1, $r0, 5   # set up");
    assert_eq!(t.mnemonic.as_deref(), Some("ADDI"));
    assert_eq!(t.operands, vec!["$r1", "$r0", "5"]);
    assert_eq!(t.label, None);
}

#[test]
fn tokenize_splits_label() {
    let t = tokenize("loop: SUBI $r1, $r1, 1");
    assert_eq!(t.label.as_deref(), Some("loop"));
    assert_eq!(t.mnemonic.as_deref(), Some("SUBI"));

    let bare = tokenize("end:");
    assert_eq!(bare.label.as_deref(), Some("end"));
    assert_eq!(bare.mnemonic, None);
}

// ══════════════════════════════════════════════════════════
// 2. Encoding through the driver
// ══════════════════════════════════════════════════════════

#[test]
fn encodes_the_three_formats() {
    assert_eq!(asm("ADDI $r1, $r0, 5"), vec![0x3045]);
    assert_eq!(asm("ADD $r3, $r1, $r2"), vec![0x0298]);
    assert_eq!(asm("JUMP 3"), vec![0x9003]);
    assert_eq!(asm("JAL 3"), vec![0xA003]);
    assert_eq!(asm("JR $r7"), vec![0x0E05]);
}

#[test]
fn registers_accept_optional_prefix_and_case() {
    // All four spellings of the same instruction.
    let canonical = asm("ADDI $r1, $r0, 5");
    assert_eq!(asm("addi r1, r0, 5"), canonical);
    assert_eq!(asm("ADDI $R1, $R0, 5"), canonical);
    assert_eq!(asm("Addi R1, r0, 5"), canonical);
}

#[test]
fn negative_immediates_use_twos_complement() {
    assert_eq!(asm("ADDI $r1, $r0, -1"), vec![0x307F]);
    assert_eq!(asm("ADDI $r1, $r0, -32"), vec![0x3060]);
}

#[test]
fn hex_immediates_are_accepted() {
    assert_eq!(asm("ADDI $r1, $r0, 0x1F"), asm("ADDI $r1, $r0, 31"));
    assert_eq!(asm("JUMP 0xFFF"), vec![0x9FFF]);
}

#[test]
fn memory_operands_accept_both_forms() {
    // `rt, imm(rs)` and `rt, rs, imm` encode identically.
    assert_eq!(asm("LW $r2, 4($r0)"), asm("LW $r2, $r0, 4"));
    assert_eq!(asm("SW $r1, -3($r5)"), asm("SW $r1, $r5, -3"));
    // Interior whitespace is allowed.
    assert_eq!(asm("LW $r2, 4 ( $r0 )"), asm("LW $r2, $r0, 4"));
}

// ══════════════════════════════════════════════════════════
// 3. Labels
// ══════════════════════════════════════════════════════════

#[test]
fn labels_resolve_forward_and_backward() {
    let src = "
        TOP: ADDI $r1, $r0, 1
        BEQ $r1, $r0, END
        BNQ $r1, $r0, TOP
        END: ADDI $r2, $r0, 2
    ";
    let program = match assemble(src) {
        Ok(p) => p,
        Err(e) => panic!("assembly failed: {e}"),
    };
    assert_eq!(program.labels.get("TOP"), Some(&0));
    assert_eq!(program.labels.get("END"), Some(&3));
    // BEQ at addr 1: END(3) - (1+1) = +1. BNQ at addr 2: TOP(0) - (2+1) = -3.
    assert_eq!(program.words[1] & 0x3F, 1);
    assert_eq!(program.words[2] & 0x3F, (-3i16 as u16) & 0x3F);
}

#[test]
fn label_on_its_own_line_names_the_next_instruction() {
    let src = "
        JUMP TGT
        TGT:
        ADDI $r1, $r0, 1
    ";
    let program = match assemble(src) {
        Ok(p) => p,
        Err(e) => panic!("assembly failed: {e}"),
    };
    assert_eq!(program.labels.get("TGT"), Some(&1));
    assert_eq!(program.words[0], 0x9001);
}

#[test]
fn source_map_keeps_trimmed_lines() {
    let src = "ADDI $r1, $r0, 5\n   ADD $r2, $r1, $r1   ";
    let program = match assemble(src) {
        Ok(p) => p,
        Err(e) => panic!("assembly failed: {e}"),
    };
    assert_eq!(
        program.source_map.get(&1).map(String::as_str),
        Some("ADD $r2, $r1, $r1")
    );
}

#[test]
fn listing_carries_hex_binary_and_disasm() {
    let src = "ADDI $r1, $r0, 5";
    let program = match assemble(src) {
        Ok(p) => p,
        Err(e) => panic!("assembly failed: {e}"),
    };
    let listing = program.listing();
    assert_eq!(listing.len(), 1);
    assert_eq!(listing[0].hex, "3045");
    assert_eq!(listing[0].binary, "0011000001000101");
    assert_eq!(listing[0].disasm, "ADDI $r1, $r0, 5");
}

// ══════════════════════════════════════════════════════════
// 4. Errors, with line numbers
// ══════════════════════════════════════════════════════════

#[test]
fn immediate_out_of_range_reports_the_line() {
    let err = asm_err("ADDI $r1, $r0, 5\nADDI $r1, $r0, 64");
    assert_eq!(err.line, 2);
    assert!(
        matches!(err.kind, AsmErrorKind::ImmediateRange { value: 64, .. }),
        "expected range error, got {:?}",
        err.kind
    );
}

#[rstest]
#[case("NOP", 1)]
#[case("ADDI $r1, $r0, 5\nMOVE $r1, $r2", 2)]
fn unknown_mnemonics_are_rejected(#[case] src: &str, #[case] line: usize) {
    let err = asm_err(src);
    assert_eq!(err.line, line);
    assert!(matches!(err.kind, AsmErrorKind::UnknownMnemonic(_)));
}

#[rstest]
#[case("ADD $r1, $r2")]
#[case("JR $r1, $r2")]
#[case("LW $r1")]
#[case("JUMP")]
fn wrong_operand_counts_are_rejected(#[case] src: &str) {
    assert!(matches!(
        asm_err(src).kind,
        AsmErrorKind::OperandCount { .. }
    ));
}

#[rstest]
#[case("ADD $r1, $r2, $r8")]
#[case("ADDI $rx, $r0, 1")]
#[case("JR x1")]
fn bad_registers_are_rejected(#[case] src: &str) {
    assert!(matches!(asm_err(src).kind, AsmErrorKind::InvalidRegister(_)));
}

#[test]
fn duplicate_labels_are_rejected() {
    let err = asm_err("A: ADDI $r1, $r0, 1\nA: ADDI $r2, $r0, 2");
    assert_eq!(err.line, 2);
    assert!(matches!(err.kind, AsmErrorKind::DuplicateLabel(_)));
}

#[test]
fn undefined_labels_are_rejected() {
    assert!(matches!(
        asm_err("BEQ $r1, $r0, NOWHERE").kind,
        AsmErrorKind::UndefinedLabel(_)
    ));
    assert!(matches!(
        asm_err("JUMP NOWHERE").kind,
        AsmErrorKind::UndefinedLabel(_)
    ));
}

#[test]
fn malformed_memory_operands_are_rejected() {
    assert!(matches!(
        asm_err("LW $r1, 4[$r0]").kind,
        AsmErrorKind::MalformedMemOperand(_)
    ));
    assert!(matches!(
        asm_err("LW $r1, ($r0)").kind,
        AsmErrorKind::MalformedMemOperand(_)
    ));
}

#[test]
fn jump_targets_must_fit_twelve_bits() {
    assert!(matches!(
        asm_err("JUMP 4096").kind,
        AsmErrorKind::JumpOutOfRange(4096)
    ));
    assert!(matches!(
        asm_err("JUMP -1").kind,
        AsmErrorKind::JumpOutOfRange(-1)
    ));
}

#[test]
fn branch_to_distant_label_is_a_range_error() {
    // 40 instructions between the branch and its target overflows the
    // 6-bit signed offset.
    let mut src = String::from("BEQ $r0, $r0, FAR\n");
    for _ in 0..40 {
        src.push_str("ADDI $r1, $r0, 0\n");
    }
    src.push_str("FAR: ADDI $r2, $r0, 1\n");
    let err = asm_err(&src);
    assert_eq!(err.line, 1);
    assert!(matches!(err.kind, AsmErrorKind::ImmediateRange { .. }));
}

#[test]
fn no_partial_output_on_error() {
    // The failing line is in the middle; nothing is returned.
    let err = asm_err("ADDI $r1, $r0, 1\nADDI $r1, $r0, 99\nADDI $r2, $r0, 2");
    assert_eq!(err.line, 2);
}
