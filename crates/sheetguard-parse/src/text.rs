use std::borrow::Cow;

/// Replace the contents of double-quoted string literals with spaces.
///
/// Byte offsets are preserved (a multi-byte character becomes as many spaces
/// as it has bytes), so positions found in the blanked text index the original
/// formula directly. The quote characters themselves are kept; Excel's `""`
/// escape needs no special casing because it toggles twice.
pub fn blank_quoted_text(formula: &str) -> Cow<'_, str> {
    if !formula.contains('"') {
        return Cow::Borrowed(formula);
    }
    let mut out = String::with_capacity(formula.len());
    let mut in_quotes = false;
    for ch in formula.chars() {
        if ch == '"' {
            in_quotes = !in_quotes;
            out.push(ch);
        } else if in_quotes {
            for _ in 0..ch.len_utf8() {
                out.push(' ');
            }
        } else {
            out.push(ch);
        }
    }
    Cow::Owned(out)
}
