/// Functions whose result can change without any precedent changing.
///
/// Kept sorted so detection output is sorted without an extra pass.
pub const VOLATILE_FUNCTIONS: [&str; 8] = [
    "CELL",
    "INDIRECT",
    "INFO",
    "NOW",
    "OFFSET",
    "RAND",
    "RANDBETWEEN",
    "TODAY",
];

pub fn is_volatile_function(name: &str) -> bool {
    VOLATILE_FUNCTIONS
        .iter()
        .any(|f| f.eq_ignore_ascii_case(name))
}

/// Volatile functions mentioned in `formula`, sorted and de-duplicated.
///
/// Matching is a case-insensitive search for `NAME(` anywhere in the text; it
/// does not check that the hit sits in a real call position.
pub fn detect_volatile_functions(formula: &str) -> Vec<&'static str> {
    if formula.is_empty() {
        return Vec::new();
    }
    let upper = formula.to_ascii_uppercase();
    VOLATILE_FUNCTIONS
        .iter()
        .copied()
        .filter(|name| {
            let mut needle = String::with_capacity(name.len() + 1);
            needle.push_str(name);
            needle.push('(');
            upper.contains(&needle)
        })
        .collect()
}
