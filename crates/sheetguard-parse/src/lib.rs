//! Formula text analysis that never evaluates anything.
//!
//! Everything here is best-effort: a formula the patterns do not understand
//! yields fewer tokens, never an error.

pub mod references;
pub mod shape;
pub mod text;
pub mod volatile;

pub use references::{RefKind, RefToken, classify_address, extract_references};
pub use shape::normalize_formula;
pub use text::blank_quoted_text;
pub use volatile::{VOLATILE_FUNCTIONS, detect_volatile_functions, is_volatile_function};
