//! Path Resolution
//!
//! Pure helpers over relative asset paths. Paths are treated as `/`-separated
//! strings because they double as URLs.

use crate::hashing::fingerprint;

/// Source extensions that compile to a different output extension.
const COMPILE_TARGETS: &[(&str, &str)] = &[
    ("less", "css"),
    ("sass", "css"),
    ("scss", "css"),
    ("styl", "css"),
    ("stylus", "css"),
    ("coffee", "js"),
    ("ts", "js"),
    ("dart", "js"),
    ("roy", "js"),
];

/// True if the path carries a URL scheme (`scheme://`) or is protocol-relative (`//`).
pub fn is_remote(path: &str) -> bool {
    if path.starts_with("//") {
        return true;
    }

    match path.find("://") {
        Some(idx) if idx > 0 => {
            let scheme = &path[..idx];
            let mut chars = scheme.chars();
            chars.next().map_or(false, |c| c.is_ascii_alphabetic())
                && chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'))
        }
        _ => false,
    }
}

/// Split a path into (directory prefix including the trailing `/`, stem, extension).
/// A trailing dot is dropped from the stem and yields no extension.
fn split(path: &str) -> (&str, &str, Option<&str>) {
    let name_start = path.rfind('/').map_or(0, |i| i + 1);
    let (dir, name) = path.split_at(name_start);
    match name.rfind('.') {
        Some(dot) if dot > 0 && dot + 1 < name.len() => {
            (dir, &name[..dot], Some(&name[dot + 1..]))
        }
        Some(dot) if dot > 0 => (dir, &name[..dot], None),
        _ => (dir, name, None),
    }
}

/// Extension of the path's final segment, empty if there is none.
pub fn extension(path: &str) -> &str {
    split(path).2.unwrap_or("")
}

/// Map a source extension to the extension of the compiled output.
pub fn usable_extension(extension: &str) -> &str {
    COMPILE_TARGETS
        .iter()
        .find(|(source, _)| source.eq_ignore_ascii_case(extension))
        .map_or(extension, |(_, target)| target)
}

/// Relative path with its extension replaced by the usable extension.
pub fn usable_path(relative_path: &str) -> String {
    match split(relative_path) {
        (dir, stem, Some(ext)) => format!("{}{}.{}", dir, stem, usable_extension(ext)),
        _ => relative_path.to_string(),
    }
}

/// Usable path with `-<digest>` injected before the extension.
pub fn fingerprinted_path(relative_path: &str, content: &str) -> String {
    let digest = fingerprint(relative_path, content);
    match split(relative_path) {
        (dir, stem, Some(ext)) => format!("{}{}-{}.{}", dir, stem, digest, usable_extension(ext)),
        (dir, stem, None) => format!("{}{}-{}", dir, stem, digest),
    }
}
