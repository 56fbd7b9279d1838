// src/path.rs
//! Windows-convention path splitting for `Object Name` values.
//!
//! Windows alerts are split the way the Windows host would split them, no
//! matter which OS this process runs on. Both `\` and `/` are separators and
//! the drive (`C:`) or UNC share (`\\server\share`) stays with the directory.

fn is_sep(c: char) -> bool {
    c == '\\' || c == '/'
}

/// Split off the drive or UNC prefix.
fn split_drive(path: &str) -> (&str, &str) {
    let bytes = path.as_bytes();
    if bytes.len() >= 2 && bytes[1] == b':' && bytes[0].is_ascii_alphabetic() {
        return path.split_at(2);
    }
    // \\server\share\rest
    if bytes.len() > 2 && is_sep(bytes[0] as char) && is_sep(bytes[1] as char) && !is_sep(bytes[2] as char) {
        let after_server = match path[2..].find(is_sep) {
            Some(i) => i + 2,
            None => return (path, ""),
        };
        let share_end = match path[after_server + 1..].find(is_sep) {
            Some(i) => i + after_server + 1,
            None => path.len(),
        };
        return path.split_at(share_end);
    }
    ("", path)
}

/// Split into (directory, base name).
pub fn split(path: &str) -> (String, String) {
    let (drive, rest) = split_drive(path);
    let idx = rest.rfind(is_sep).map(|i| i + 1).unwrap_or(0);
    let (head, tail) = rest.split_at(idx);
    let trimmed = head.trim_end_matches(is_sep);
    let head = if trimmed.is_empty() { head } else { trimmed };
    (format!("{drive}{head}"), tail.to_string())
}
