//! Submission Normalizer
//!
//! Strips every line's leading whitespace down to column zero. This is not a
//! common-indent dedent: nested blocks are flattened, which breaks
//! indentation-sensitive languages. Challenge content assumes flat code.
//!
//! The whitespace run at a line start may itself contain line terminators,
//! so blank and whitespace-only lines are dropped too.
//!
//! Not a security boundary: no escaping, no analysis.

/// Unicode space separators, line terminators, tab/VT/FF and BOM
fn is_space(c: char) -> bool {
    matches!(
        c,
        '\t' | '\n'
            | '\u{000B}'
            | '\u{000C}'
            | '\r'
            | ' '
            | '\u{00A0}'
            | '\u{1680}'
            | '\u{2000}'..='\u{200A}'
            | '\u{2028}'
            | '\u{2029}'
            | '\u{202F}'
            | '\u{205F}'
            | '\u{3000}'
            | '\u{FEFF}'
    )
}

fn is_line_terminator(c: char) -> bool {
    matches!(c, '\n' | '\r' | '\u{2028}' | '\u{2029}')
}

/// Remove all leading whitespace from every line. Total over any input.
pub fn normalize(source_code: &str) -> String {
    let mut out = String::with_capacity(source_code.len());
    let mut at_line_start = true;

    for c in source_code.chars() {
        if at_line_start && is_space(c) {
            continue;
        }
        out.push(c);
        at_line_start = is_line_terminator(c);
    }

    out
}
