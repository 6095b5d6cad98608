//! Entity key to directory name mapping.

const ILLEGAL: &[char] = &['<', '>', ':', '"', '/', '\\', '|', '?', '*'];

/// Turns an entity key into a single safe path segment.
///
/// Characters that are illegal in a path segment on any supported platform
/// are removed, so `entity:1` becomes `entity1`. Results that would be
/// empty or refer to the current/parent directory become `_`.
///
/// The same mapping must be used for writing snapshots and for the GC sweep.
pub fn sanitize_file_name(key: &str) -> String {
    let sanitized: String = key
        .chars()
        .filter(|c| !ILLEGAL.contains(c) && !c.is_control())
        .collect();

    match sanitized.as_str() {
        "" | "." | ".." => "_".to_string(),
        _ => sanitized,
    }
}
