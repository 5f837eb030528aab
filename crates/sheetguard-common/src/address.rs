//! Graph node keys of the form `<sheet>!<addr>`.

/// Canonical identity of a graph node: a scanned formula cell or a referenced
/// cell, range or name.
pub type NodeKey = String;

/// Build the key for `addr` on `sheet`.
pub fn node_key(sheet: &str, addr: &str) -> NodeKey {
    let mut key = String::with_capacity(sheet.len() + addr.len() + 1);
    key.push_str(sheet);
    key.push('!');
    key.push_str(addr);
    key
}

/// Split a key back into `(sheet, addr)`.
///
/// Addresses never contain `!`, so the split happens on the last separator and
/// sheet titles that contain `!` survive.
pub fn split_node_key(key: &str) -> Option<(&str, &str)> {
    let (sheet, addr) = key.rsplit_once('!')?;
    if sheet.is_empty() || addr.is_empty() {
        return None;
    }
    Some((sheet, addr))
}
