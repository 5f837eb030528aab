//! Hard-coded constant detection.
//!
//! Flags numeric literals that look like buried business assumptions
//! (`*1.05`, `/365`, `NPV(0.08, ...)`) rather than structural numbers.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use sheetguard_parse::blank_quoted_text;

use crate::config::ConfigTree;

static RE_NUMBER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)[+-]?(?:\d+(?:\.\d*)?|\.\d+)(?:e[+-]?\d+)?").expect("static number pattern")
});

const FALLBACK_RISKY_OPERATORS: [&str; 2] = ["*", "/"];
const OPERATORS: [char; 4] = ['*', '/', '+', '-'];

#[derive(Debug, Clone, PartialEq)]
pub struct ConstantsConfig {
    pub enabled: bool,
    pub ignore_literals: Vec<String>,
    /// Stored uppercase.
    pub ignore_functions: Vec<String>,
    /// Empty means `*` and `/`, never "every operator".
    pub risky_operators: Vec<String>,
    /// Stored uppercase.
    pub risky_functions: Vec<String>,
    pub max_findings: usize,
}

impl ConstantsConfig {
    pub const DEFAULT_MAX_FINDINGS: usize = 100;

    /// Build from the `app.detectors.hardcoded_constants` subtree.
    pub fn from_tree(tree: &ConfigTree) -> Self {
        let upper = |items: Vec<String>| -> Vec<String> {
            items.into_iter().map(|s| s.to_uppercase()).collect()
        };
        Self {
            enabled: tree.bool_or("enabled", true),
            ignore_literals: tree.string_list("ignore_literals"),
            ignore_functions: upper(tree.string_list("ignore_functions")),
            risky_operators: tree.string_list("risky_operators"),
            risky_functions: upper(tree.string_list("risky_functions")),
            max_findings: tree.usize_or("max_findings", Self::DEFAULT_MAX_FINDINGS),
        }
    }

    fn is_risky_operator(&self, op: char) -> bool {
        let mut buf = [0u8; 4];
        let op = op.encode_utf8(&mut buf);
        if self.risky_operators.is_empty() {
            FALLBACK_RISKY_OPERATORS.contains(&&*op)
        } else {
            self.risky_operators.iter().any(|r| r == op)
        }
    }

    fn ignores_literal(&self, literal: &str, value: f64) -> bool {
        let unsigned = literal.trim_start_matches(['+', '-']);
        if self
            .ignore_literals
            .iter()
            .any(|l| l == literal || l == unsigned)
        {
            return true;
        }
        let magnitude = value.abs();
        if magnitude.fract() == 0.0 && magnitude < 1e18 {
            let truncated = (magnitude as u64).to_string();
            return self.ignore_literals.iter().any(|l| *l == truncated);
        }
        false
    }
}

impl Default for ConstantsConfig {
    fn default() -> Self {
        Self::from_tree(&ConfigTree::default())
    }
}

/// One flagged literal. Offsets are byte positions in the formula text.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConstantHit {
    pub literal: String,
    pub value: f64,
    /// Adjacent operator, or empty when the literal stands alone.
    pub operator: String,
    /// Innermost enclosing function, uppercase, or empty.
    pub function: String,
    pub start: usize,
    pub end: usize,
}

impl ConstantHit {
    pub fn into_finding(self, sheet: &str, cell: &str, formula: &str) -> HardcodedConstantFinding {
        HardcodedConstantFinding {
            kind: HardcodedConstantFinding::KIND,
            sheet: sheet.to_string(),
            cell: cell.to_string(),
            literal: self.literal,
            value: self.value,
            operator: self.operator,
            function: self.function,
            formula: formula.to_string(),
        }
    }
}

/// A [`ConstantHit`] placed in its sheet/cell context for reporting.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HardcodedConstantFinding {
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub sheet: String,
    pub cell: String,
    pub literal: String,
    pub value: f64,
    pub operator: String,
    pub function: String,
    pub formula: String,
}

impl HardcodedConstantFinding {
    pub const KIND: &'static str = "HARDCODED_CONSTANT";
}

/// Part of a cell reference (`A10`, `$B$12`) or a name rather than a number.
fn glued_to_reference(text: &str, start: usize, end: usize) -> bool {
    let glued = |c: char| c.is_alphabetic() || c == '$';
    text[..start].chars().next_back().is_some_and(glued)
        || text[end..].chars().next().is_some_and(glued)
}

fn adjacent_operator(text: &str, start: usize) -> Option<char> {
    let left = text[..start].trim_end().chars().next_back();
    if let Some(c) = left.filter(|c| OPERATORS.contains(c)) {
        return Some(c);
    }
    text[start..]
        .trim_start()
        .chars()
        .next()
        .filter(|c| OPERATORS.contains(c))
}

/// Name before the nearest unmatched `(` to the left of `pos`.
fn enclosing_function(text: &str, pos: usize) -> String {
    let bytes = text.as_bytes();
    let mut depth = 0usize;
    let mut i = pos.min(bytes.len());
    while i > 0 {
        i -= 1;
        match bytes[i] {
            b')' => depth += 1,
            b'(' if depth == 0 => {
                let head = &text[..i];
                let name_start = head
                    .char_indices()
                    .rev()
                    .take_while(|&(_, c)| c.is_alphabetic() || c == '.' || c == '_')
                    .last()
                    .map_or(i, |(idx, _)| idx);
                return head[name_start..].trim().to_uppercase();
            }
            b'(' => depth -= 1,
            _ => {}
        }
    }
    String::new()
}

/// Scan one formula for numeric literals next to risky operators or inside
/// risky functions. Text inside double quotes is never inspected.
pub fn detect_hardcoded_constants(formula: &str, cfg: &ConstantsConfig) -> Vec<ConstantHit> {
    if formula.is_empty() {
        return Vec::new();
    }
    let text = blank_quoted_text(formula);
    let text = text.as_ref();

    let mut hits = Vec::new();
    for m in RE_NUMBER.find_iter(text) {
        let (start, end) = (m.start(), m.end());
        let literal = m.as_str();
        if glued_to_reference(text, start, end) {
            continue;
        }
        let Ok(value) = literal.parse::<f64>() else {
            continue;
        };
        if cfg.ignores_literal(literal, value) {
            continue;
        }

        let operator = adjacent_operator(text, start);
        let function = enclosing_function(text, start);
        if !function.is_empty() && cfg.ignore_functions.contains(&function) {
            continue;
        }

        let risky_op = operator.is_some_and(|op| cfg.is_risky_operator(op));
        let risky_fn = !function.is_empty() && cfg.risky_functions.contains(&function);
        if !(risky_op || risky_fn) {
            continue;
        }

        hits.push(ConstantHit {
            literal: literal.to_string(),
            value,
            operator: operator.map(String::from).unwrap_or_default(),
            function,
            start,
            end,
        });
    }
    hits
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn cfg(value: serde_json::Value) -> ConstantsConfig {
        ConstantsConfig::from_tree(&ConfigTree::new(value))
    }

    #[test]
    fn multiplier_is_flagged() {
        let hits = detect_hardcoded_constants("=A1*1.05", &ConstantsConfig::default());
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].literal, "1.05");
        assert_eq!(hits[0].operator, "*");
        assert_eq!(hits[0].value, 1.05);
        assert_eq!((hits[0].start, hits[0].end), (4, 8));
    }

    #[test]
    fn addition_is_not_risky_by_default() {
        assert!(detect_hardcoded_constants("=A1+1", &ConstantsConfig::default()).is_empty());
    }

    #[test]
    fn empty_operator_list_means_multiply_and_divide() {
        let c = cfg(json!({"risky_operators": []}));
        assert!(detect_hardcoded_constants("=A1+100", &c).is_empty());
        assert_eq!(detect_hardcoded_constants("=A1/365", &c).len(), 1);
    }

    #[test]
    fn configured_operators_replace_the_fallback() {
        let c = cfg(json!({"risky_operators": ["+"]}));
        let hits = detect_hardcoded_constants("=B2*3+7", &c);
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].literal, "+7");
        assert_eq!(hits[0].operator, "+");
    }

    #[test]
    fn row_numbers_and_anchored_rows_are_not_literals() {
        let hits = detect_hardcoded_constants("=A10*$B$12", &ConstantsConfig::default());
        assert!(hits.is_empty());
    }

    #[test]
    fn quoted_text_is_ignored() {
        let hits = detect_hardcoded_constants(r#"=IF(A1>0,"x*2",A1)"#, &ConstantsConfig::default());
        assert!(hits.is_empty());
    }

    #[test]
    fn ignore_list_matches_signed_and_truncated_forms() {
        let c = cfg(json!({"ignore_literals": [100, "12"]}));
        assert!(detect_hardcoded_constants("=A1*100", &c).is_empty());
        assert!(detect_hardcoded_constants("=A1*-100", &c).is_empty());
        assert!(detect_hardcoded_constants("=A1/12.0", &c).is_empty());
        assert_eq!(detect_hardcoded_constants("=A1/12.5", &c).len(), 1);
    }

    #[test]
    fn risky_and_ignored_functions() {
        let c = cfg(json!({"risky_functions": ["npv"], "ignore_functions": ["round"]}));
        let hits = detect_hardcoded_constants("=NPV(0.08,B2:B9)", &c);
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].function, "NPV");
        assert_eq!(hits[0].operator, "");

        assert!(detect_hardcoded_constants("=ROUND(A1*2,2)", &c).is_empty());
    }

    #[test]
    fn nested_call_reports_innermost_function() {
        let c = cfg(json!({"risky_functions": ["MAX"]}));
        let hits = detect_hardcoded_constants("=SUM(MAX(A1,0.5),B1)", &c);
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].function, "MAX");
    }

    #[test]
    fn finding_carries_context() {
        let hit = detect_hardcoded_constants("=A1*1.05", &ConstantsConfig::default())
            .remove(0)
            .into_finding("Model", "C3", "=A1*1.05");
        let json = serde_json::to_value(&hit).unwrap();
        assert_eq!(json["type"], "HARDCODED_CONSTANT");
        assert_eq!(json["sheet"], "Model");
        assert_eq!(json["literal"], "1.05");
    }
}
