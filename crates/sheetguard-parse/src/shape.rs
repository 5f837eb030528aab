//! Formula shape normalization for copy/paste drift checks.

use once_cell::sync::Lazy;
use regex::Regex;

static RE_REF: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?:(?:'[^']+'|[\p{L}\p{N}_]+)!)?\$?[A-Z]{1,3}\$?\d+(?::\$?[A-Z]{1,3}\$?\d+)?",
    )
    .expect("static reference pattern")
});

static RE_NUM: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\d+(?:\.\d+)?(?:[eE][-+]?\d+)?").expect("static number pattern"));

/// Reduce a formula to its structural shape.
///
/// References become `CELL`, numeric literals become `NUM`, whitespace is
/// dropped and the result is uppercased, so `=A1*2` and `=B1 * 3` share the
/// shape `=CELL*NUM`. Text without a leading `=` has no shape.
pub fn normalize_formula(formula: &str) -> Option<String> {
    let trimmed = formula.trim();
    if !trimmed.starts_with('=') {
        return None;
    }

    let with_cells = RE_REF.replace_all(trimmed, "CELL");

    let mut out = String::with_capacity(with_cells.len());
    let mut last = 0;
    for m in RE_NUM.find_iter(&with_cells) {
        let glued = with_cells[..m.start()]
            .chars()
            .next_back()
            .is_some_and(|c| c.is_alphabetic() || c == '_');
        if glued {
            continue;
        }
        out.push_str(&with_cells[last..m.start()]);
        out.push_str("NUM");
        last = m.end();
    }
    out.push_str(&with_cells[last..]);

    Some(
        out.chars()
            .filter(|c| !c.is_whitespace())
            .collect::<String>()
            .to_uppercase(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn copies_share_a_shape() {
        assert_eq!(normalize_formula("=A1*2").as_deref(), Some("=CELL*NUM"));
        assert_eq!(normalize_formula(" =B7 * 3.5 ").as_deref(), Some("=CELL*NUM"));
        assert_eq!(
            normalize_formula("=SUM(Data!$A$1:$A$9)/1e3").as_deref(),
            Some("=SUM(CELL)/NUM")
        );
    }

    #[test]
    fn accented_sheet_prefix_is_part_of_the_reference() {
        assert_eq!(
            normalize_formula("=Données!A1*2").as_deref(),
            Some("=CELL*NUM")
        );
    }

    #[test]
    fn different_structure_differs() {
        assert_ne!(normalize_formula("=A1*2"), normalize_formula("=A1+2"));
    }

    #[test]
    fn digits_inside_names_stay() {
        assert_eq!(
            normalize_formula("=log10(x_2)").as_deref(),
            Some("=LOG10(X_2)")
        );
    }

    #[test]
    fn non_formulas_have_no_shape() {
        assert_eq!(normalize_formula("42"), None);
        assert_eq!(normalize_formula(""), None);
    }
}
