//! Reference extraction for dependency graph building.
//!
//! The extractor runs four passes in a fixed precedence order:
//!
//! 1. structured references (`Table1[Amount]`) → symbolic
//! 2. sheet-qualified addresses (`Sheet2!A1:B5`, `'My Sheet'!C:C`)
//! 3. unqualified addresses (`A1`, `$B$2:C9`, `3:3`)
//! 4. bare identifiers, treated as candidate named ranges → symbolic
//!
//! Text consumed by an earlier pass is masked out before the next pass runs, so
//! `Sheet2!A1` never also yields a bare `A1` and `Table1[Amount]` never yields
//! `Table1` or `Amount` as names. String literals are ignored entirely.

use std::borrow::Cow;
use std::fmt;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use sheetguard_common::strip_anchors;

use crate::text::blank_quoted_text;
use crate::volatile::is_volatile_function;

const CELL: &str = r"\$?[A-Z]{1,3}\$?[0-9]{1,7}";
const WHOLE_COL: &str = r"\$?[A-Z]{1,3}:\$?[A-Z]{1,3}";
const WHOLE_ROW: &str = r"\$?[0-9]{1,7}:\$?[0-9]{1,7}";

/// Literals that look like identifiers but are never names.
const RESERVED_WORDS: [&str; 6] = ["TRUE", "FALSE", "NA", "N", "PI", "E"];

fn address_alternation() -> String {
    format!("{CELL}:{CELL}|{CELL}|{WHOLE_COL}|{WHOLE_ROW}")
}

fn anchored(pattern: &str) -> Regex {
    Regex::new(&format!("^(?:{pattern})$")).expect("static address pattern")
}

static RE_CELL: Lazy<Regex> = Lazy::new(|| anchored(CELL));
static RE_RANGE: Lazy<Regex> = Lazy::new(|| anchored(&format!("{CELL}:{CELL}")));
static RE_WHOLE_COL: Lazy<Regex> = Lazy::new(|| anchored(WHOLE_COL));
static RE_WHOLE_ROW: Lazy<Regex> = Lazy::new(|| anchored(WHOLE_ROW));

static RE_STRUCTURED: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"[\p{L}_][\p{L}\p{N}_.]*\[(?:[^\[\]]|\[[^\[\]]*\])+\]")
        .expect("static structured-reference pattern")
});

static RE_SHEET_ADDR: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!(
        r"(?:'(?P<qs>(?:[^']|'')+)'|(?P<us>[\p{{L}}\p{{N}}_][\p{{L}}\p{{N}}_.]*))!(?P<addr>{})",
        address_alternation()
    ))
    .expect("static sheet-address pattern")
});

static RE_BARE_ADDR: Lazy<Regex> =
    Lazy::new(|| Regex::new(&address_alternation()).expect("static address pattern"));

static RE_ERROR_LITERAL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)#(?:NULL!|DIV/0!|VALUE!|REF!|NAME\?|NUM!|N/A|SPILL!|CALC!|GETTING_DATA)")
        .expect("static error-literal pattern")
});

static RE_NAME: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[\p{L}_][\p{L}\p{N}_.]*").expect("static name pattern"));

/// Longest defined name Excel accepts, in characters.
const MAX_NAME_CHARS: usize = 255;

/// Shape of a reference token.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RefKind {
    Cell,
    Range,
    WholeRow,
    WholeColumn,
    Symbolic,
}

impl RefKind {
    pub fn as_str(self) -> &'static str {
        match self {
            RefKind::Cell => "cell",
            RefKind::Range => "range",
            RefKind::WholeRow => "whole_row",
            RefKind::WholeColumn => "whole_column",
            RefKind::Symbolic => "symbolic",
        }
    }

    /// Lenient conversion from an external label; unknown labels are symbolic.
    pub fn from_label(label: &str) -> Self {
        match label.trim().to_ascii_lowercase().as_str() {
            "cell" => RefKind::Cell,
            "range" => RefKind::Range,
            "whole_row" => RefKind::WholeRow,
            "whole_column" => RefKind::WholeColumn,
            _ => RefKind::Symbolic,
        }
    }
}

impl fmt::Display for RefKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One referenced address or name found in a formula.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RefToken {
    /// Text as written, anchors included (`$A$1`, `Table1[Amount]`).
    pub raw: String,
    /// Explicit sheet qualifier; `None` means "the formula's own sheet".
    pub sheet: Option<String>,
    pub kind: RefKind,
    pub symbolic: bool,
}

impl RefToken {
    pub fn address(raw: impl Into<String>, sheet: Option<String>) -> Self {
        let raw = raw.into();
        let kind = classify_address(&raw);
        Self {
            raw,
            sheet,
            kind,
            symbolic: false,
        }
    }

    pub fn symbolic(raw: impl Into<String>) -> Self {
        Self {
            raw: raw.into(),
            sheet: None,
            kind: RefKind::Symbolic,
            symbolic: true,
        }
    }

    /// Graph-facing form of `raw`: anchors removed for addresses, verbatim for names.
    pub fn unanchored(&self) -> Cow<'_, str> {
        if self.symbolic {
            Cow::Borrowed(&self.raw)
        } else {
            strip_anchors(&self.raw)
        }
    }

    /// Build a token from loosely-typed parts supplied by an outside caller.
    ///
    /// This is the only place external token shapes enter the crate: blank
    /// `raw` is rejected, an unknown kind is symbolic, and a symbolic kind
    /// forces the symbolic flag.
    pub fn from_parts(
        raw: &str,
        sheet: Option<&str>,
        kind: Option<&str>,
        symbolic: bool,
    ) -> Option<Self> {
        let raw = raw.trim();
        if raw.is_empty() {
            return None;
        }
        let kind = kind.map(RefKind::from_label).unwrap_or(RefKind::Symbolic);
        Some(Self {
            raw: raw.to_string(),
            sheet: sheet.filter(|s| !s.is_empty()).map(str::to_string),
            kind,
            symbolic: symbolic || kind == RefKind::Symbolic,
        })
    }
}

/// Classify an address by exact match against the cell/range/column/row shapes.
pub fn classify_address(addr: &str) -> RefKind {
    if RE_CELL.is_match(addr) {
        RefKind::Cell
    } else if RE_RANGE.is_match(addr) {
        RefKind::Range
    } else if RE_WHOLE_COL.is_match(addr) {
        RefKind::WholeColumn
    } else if RE_WHOLE_ROW.is_match(addr) {
        RefKind::WholeRow
    } else {
        RefKind::Symbolic
    }
}

/// Exact, case-sensitive match: lowercase `a1` is left to the name pass.
fn looks_like_address(token: &str) -> bool {
    RE_CELL.is_match(token) || RE_WHOLE_COL.is_match(token) || RE_WHOLE_ROW.is_match(token)
}

fn is_ident_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_' || c == '.'
}

fn char_before(text: &str, pos: usize) -> Option<char> {
    text[..pos].chars().next_back()
}

fn char_at(text: &str, pos: usize) -> Option<char> {
    text[pos..].chars().next()
}

/// An address must not be glued to identifier text on either side, and must
/// not be a function name (`LOG10(`) or a sheet qualifier (`Q1!`).
fn address_boundary_ok(text: &str, start: usize, end: usize) -> bool {
    let before_ok = !matches!(char_before(text, start), Some(c) if is_ident_char(c) || c == '$');
    let after_ok =
        !matches!(char_at(text, end), Some(c) if is_ident_char(c) || matches!(c, '(' | '!' | '['));
    before_ok && after_ok
}

fn mask(text: &mut String, start: usize, end: usize) {
    text.replace_range(start..end, &" ".repeat(end - start));
}

#[derive(Default)]
struct TokenList {
    tokens: Vec<RefToken>,
}

impl TokenList {
    fn push(&mut self, token: RefToken) {
        if !self.tokens.contains(&token) {
            self.tokens.push(token);
        }
    }
}

/// Extract reference tokens from one formula.
///
/// The leading `=` is optional. The result is de-duplicated on
/// `(raw, sheet, kind, symbolic)` keeping the first occurrence. Input the
/// patterns cannot make sense of simply yields fewer (or zero) tokens.
pub fn extract_references(formula: &str) -> Vec<RefToken> {
    let body = formula.strip_prefix('=').unwrap_or(formula);
    if body.trim().is_empty() {
        return Vec::new();
    }

    let mut text = blank_quoted_text(body).into_owned();
    let mut out = TokenList::default();

    let errors: Vec<(usize, usize)> = RE_ERROR_LITERAL
        .find_iter(&text)
        .map(|m| (m.start(), m.end()))
        .collect();
    for (start, end) in errors {
        mask(&mut text, start, end);
    }

    // 1) structured references
    let spans: Vec<(usize, usize)> = RE_STRUCTURED
        .find_iter(&text)
        .filter(|m| !matches!(char_before(&text, m.start()), Some(c) if is_ident_char(c)))
        .map(|m| (m.start(), m.end()))
        .collect();
    for (start, end) in spans {
        out.push(RefToken::symbolic(&body[start..end]));
        mask(&mut text, start, end);
    }

    // 2) sheet-qualified addresses
    let qualified: Vec<(String, usize, usize, usize)> = RE_SHEET_ADDR
        .captures_iter(&text)
        .filter_map(|caps| {
            let whole = caps.get(0)?;
            let addr = caps.name("addr")?;
            if !address_boundary_ok(&text, whole.start(), addr.end()) {
                return None;
            }
            let sheet = match (caps.name("qs"), caps.name("us")) {
                (Some(q), _) => q.as_str().replace("''", "'"),
                (None, Some(u)) => u.as_str().to_string(),
                (None, None) => return None,
            };
            Some((sheet, addr.start(), addr.end(), whole.start()))
        })
        .collect();
    for (sheet, addr_start, addr_end, whole_start) in qualified {
        out.push(RefToken::address(&body[addr_start..addr_end], Some(sheet)));
        mask(&mut text, whole_start, addr_end);
    }

    // 3) unqualified addresses
    let bare: Vec<(usize, usize)> = RE_BARE_ADDR
        .find_iter(&text)
        .filter(|m| address_boundary_ok(&text, m.start(), m.end()))
        .map(|m| (m.start(), m.end()))
        .collect();
    for (start, end) in bare {
        out.push(RefToken::address(&body[start..end], None));
        mask(&mut text, start, end);
    }

    // 4) candidate named ranges
    for m in RE_NAME.find_iter(&text) {
        if matches!(char_before(&text, m.start()), Some(c) if is_ident_char(c) || matches!(c, '$' | '#'))
        {
            continue;
        }
        if matches!(char_at(&text, m.end()), Some('(' | '!' | '[')) {
            continue;
        }
        let name = m.as_str();
        if name.chars().count() > MAX_NAME_CHARS
            || looks_like_address(name)
            || RESERVED_WORDS.iter().any(|w| w.eq_ignore_ascii_case(name))
            || is_volatile_function(name)
        {
            continue;
        }
        out.push(RefToken::symbolic(name));
    }

    out.tokens
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raws(tokens: &[RefToken]) -> Vec<&str> {
        tokens.iter().map(|t| t.raw.as_str()).collect()
    }

    #[test]
    fn classifies_address_shapes() {
        assert_eq!(classify_address("A1"), RefKind::Cell);
        assert_eq!(classify_address("$XFD$1048576"), RefKind::Cell);
        assert_eq!(classify_address("A1:$B$5"), RefKind::Range);
        assert_eq!(classify_address("C:C"), RefKind::WholeColumn);
        assert_eq!(classify_address("$3:$7"), RefKind::WholeRow);
        assert_eq!(classify_address("Rate"), RefKind::Symbolic);
        assert_eq!(classify_address("A1:"), RefKind::Symbolic);
    }

    #[test]
    fn two_cells() {
        let tokens = extract_references("=A1+B2");
        assert_eq!(
            tokens,
            vec![
                RefToken::address("A1", None),
                RefToken::address("B2", None)
            ]
        );
        assert!(tokens.iter().all(|t| !t.symbolic && t.kind == RefKind::Cell));
    }

    #[test]
    fn qualified_range_is_not_repeated_as_bare() {
        let tokens = extract_references("=Sheet2!A1:B5");
        assert_eq!(tokens.len(), 1);
        assert_eq!(tokens[0].raw, "A1:B5");
        assert_eq!(tokens[0].sheet.as_deref(), Some("Sheet2"));
        assert_eq!(tokens[0].kind, RefKind::Range);
    }

    #[test]
    fn quoted_sheet_names_unescape() {
        let tokens = extract_references("='Bob''s Plan'!C:C*2");
        assert_eq!(tokens.len(), 1);
        assert_eq!(tokens[0].sheet.as_deref(), Some("Bob's Plan"));
        assert_eq!(tokens[0].kind, RefKind::WholeColumn);
    }

    #[test]
    fn unquoted_sheet_names_may_be_accented() {
        let tokens = extract_references("=Données!A1*2");
        assert_eq!(
            tokens,
            vec![RefToken::address("A1", Some("Données".into()))]
        );
    }

    #[test]
    fn accented_names_stay_whole() {
        let tokens = extract_references("=Umsätze*Größe+B1");
        assert_eq!(raws(&tokens), vec!["B1", "Umsätze", "Größe"]);
        assert!(tokens[1].symbolic && tokens[2].symbolic);
    }

    #[test]
    fn lowercase_addresses_fall_through_as_names() {
        let tokens = extract_references("=a1+b2");
        assert_eq!(
            tokens,
            vec![RefToken::symbolic("a1"), RefToken::symbolic("b2")]
        );
    }

    #[test]
    fn structured_reference_is_one_symbolic_token() {
        let tokens = extract_references("=SUM(Table1[Amount])");
        assert_eq!(tokens, vec![RefToken::symbolic("Table1[Amount]")]);
    }

    #[test]
    fn nested_structured_reference() {
        let tokens = extract_references("=Sales[[#This Row],[Qty]]*2");
        assert_eq!(raws(&tokens), vec!["Sales[[#This Row],[Qty]]"]);
    }

    #[test]
    fn function_calls_and_literals_are_not_names() {
        let tokens = extract_references("=IF(TRUE,NOW()+A1,PI())");
        assert_eq!(raws(&tokens), vec!["A1"]);
    }

    #[test]
    fn named_ranges_are_symbolic() {
        let tokens = extract_references("=Revenue*TaxRate+B3");
        assert_eq!(raws(&tokens), vec!["B3", "Revenue", "TaxRate"]);
        assert!(tokens[1].symbolic && tokens[2].symbolic);
    }

    #[test]
    fn string_literals_are_ignored() {
        let tokens = extract_references(r#"=A1&" see B7 or Rate""#);
        assert_eq!(raws(&tokens), vec!["A1"]);
    }

    #[test]
    fn duplicates_collapse_in_insertion_order() {
        let tokens = extract_references("=B2+A1+B2+Sheet1!A1");
        assert_eq!(
            tokens,
            vec![
                RefToken::address("A1", Some("Sheet1".into())),
                RefToken::address("B2", None),
                RefToken::address("A1", None),
            ]
        );
    }

    #[test]
    fn function_name_shaped_like_cell_is_skipped() {
        assert_eq!(raws(&extract_references("=LOG10(C4)")), vec!["C4"]);
    }

    #[test]
    fn error_literals_and_numbers_are_not_names() {
        assert!(extract_references("=#N/A").is_empty());
        assert!(extract_references("=1.5E+3*2").is_empty());
    }

    #[test]
    fn garbage_yields_nothing() {
        assert!(extract_references("").is_empty());
        assert!(extract_references("=").is_empty());
        assert!(extract_references("=((((").is_empty());
    }

    #[test]
    fn unanchored_only_touches_addresses() {
        let tokens = extract_references("=$A$1+Rate");
        assert_eq!(tokens[0].unanchored(), "A1");
        assert_eq!(tokens[1].unanchored(), "Rate");
    }

    #[test]
    fn from_parts_is_lenient() {
        let token = RefToken::from_parts(" Rate ", Some(""), Some("weird"), false).unwrap();
        assert_eq!(token, RefToken::symbolic("Rate"));
        assert!(RefToken::from_parts("  ", None, None, false).is_none());
        let cell = RefToken::from_parts("B2", Some("Data"), Some("cell"), false).unwrap();
        assert_eq!(cell, RefToken::address("B2", Some("Data".into())));
    }
}
