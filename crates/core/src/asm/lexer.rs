//! Source line tokenizer.
//!
//! Splits one line of assembly into an optional label, an uppercased
//! mnemonic, and a comma-separated operand list. Comments start at `#` or
//! `//` and run to the end of the line.

/// Tokens of a single source line. Any of the parts may be absent.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LineTokens {
    /// Label declared on this line, without the trailing `:`.
    pub label: Option<String>,
    /// Mnemonic, normalized to uppercase.
    pub mnemonic: Option<String>,
    /// Operands with surrounding whitespace stripped.
    pub operands: Vec<String>,
}

/// Tokenizes one line of assembly source.
pub fn tokenize(line: &str) -> LineTokens {
    let mut rest = line;
    if let Some(i) = rest.find('#') {
        rest = &rest[..i];
    }
    if let Some(i) = rest.find("//") {
        rest = &rest[..i];
    }
    let mut rest = rest.trim();
    if rest.is_empty() {
        return LineTokens::default();
    }

    let mut label = None;
    if let Some(i) = rest.find(':') {
        label = Some(rest[..i].trim().to_owned());
        rest = rest[i + 1..].trim();
    }

    if rest.is_empty() {
        return LineTokens {
            label,
            ..LineTokens::default()
        };
    }

    let (head, tail) = match rest.split_once(char::is_whitespace) {
        Some((head, tail)) => (head, tail.trim()),
        None => (rest, ""),
    };

    let operands = if tail.is_empty() {
        Vec::new()
    } else {
        tail.split(',').map(|op| op.trim().to_owned()).collect()
    };

    LineTokens {
        label,
        mnemonic: Some(head.to_uppercase()),
        operands,
    }
}
