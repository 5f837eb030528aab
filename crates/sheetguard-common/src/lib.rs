pub mod address;
pub mod coord;
pub mod issue;

pub use address::{NodeKey, node_key, split_node_key};
pub use coord::{A1ParseError, CellCoord, column_to_letters, letters_to_column, strip_anchors};
pub use issue::{IssueScope, ScanIssue};
