//! Operand parsers: registers, immediates, and memory operands.
//!
//! These are the leaf parsers of the assembler. They return plain
//! [`AsmErrorKind`] values; the driver attaches line numbers.

use crate::asm::error::AsmErrorKind;

/// Parses a register name: `$r0`-`$r7` or `r0`-`r7`, case-insensitive.
pub fn parse_register(text: &str) -> Result<usize, AsmErrorKind> {
    let name = text.trim();
    let body = name.strip_prefix('$').unwrap_or(name);
    let digit = body
        .strip_prefix(['r', 'R'])
        .filter(|d| d.len() == 1)
        .and_then(|d| d.chars().next())
        .and_then(|c| c.to_digit(10));
    match digit {
        Some(n) if n < 8 => Ok(n as usize),
        _ => Err(AsmErrorKind::InvalidRegister(name.to_owned())),
    }
}

/// Parses a signed immediate, decimal or `0x`-prefixed hex, range-checked
/// against the signed range of a `bits`-wide field.
pub fn parse_immediate(text: &str, bits: u32) -> Result<i16, AsmErrorKind> {
    let body = text.trim();
    let value = parse_int(body).ok_or_else(|| AsmErrorKind::MalformedImmediate(body.to_owned()))?;

    let max = (1i64 << (bits - 1)) - 1;
    let min = -(1i64 << (bits - 1));
    if value < min || value > max {
        return Err(AsmErrorKind::ImmediateRange { value, min, max });
    }
    Ok(value as i16)
}

/// Splits a memory operand of the form `offset(reg)`, allowing interior
/// whitespace. Returns the raw offset and register substrings.
pub fn split_mem_operand(text: &str) -> Option<(&str, &str)> {
    let body = text.trim();
    let (offset, rest) = body.split_once('(')?;
    let reg = rest.trim_end().strip_suffix(')')?;
    let offset = offset.trim();
    if offset.is_empty() {
        return None;
    }
    Some((offset, reg.trim()))
}

/// Parses a decimal or `0x`-prefixed integer. Used for immediates and for
/// numeric jump targets (which are range-checked separately).
pub fn parse_int(text: &str) -> Option<i64> {
    let body = text.trim();
    if let Some(hex) = body.strip_prefix("0x").or_else(|| body.strip_prefix("0X")) {
        i64::from_str_radix(hex, 16).ok()
    } else {
        body.parse::<i64>().ok()
    }
}

/// Whether a branch/jump target operand should be treated as a label
/// reference rather than a numeric immediate.
pub fn looks_like_label(text: &str) -> bool {
    text.chars()
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
}
