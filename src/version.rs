//! Dotted version comparison.
//!
//! Host versions are plain `MAJOR.MINOR.PATCH` strings, often truncated
//! ("2.0") by older hosts, so this does not go through strict semver parsing.

use std::cmp::Ordering;

/// Compare two dotted version strings numerically, segment by segment.
///
/// Missing segments count as 0, so `"2"`, `"2.0"` and `"2.0.0"` are equal.
/// A segment that is not a non-negative integer also counts as 0; an all-digit
/// segment too large for `u64` saturates to `u64::MAX`.
pub fn compare_versions(a: &str, b: &str) -> Ordering {
    let left = segments(a);
    let right = segments(b);
    let len = left.len().max(right.len()).max(3);

    for i in 0..len {
        let l = left.get(i).copied().unwrap_or(0);
        let r = right.get(i).copied().unwrap_or(0);
        match l.cmp(&r) {
            Ordering::Equal => continue,
            decided => return decided,
        }
    }

    Ordering::Equal
}

/// Whether `version` is at or above `minimum`.
pub fn is_at_least(version: &str, minimum: &str) -> bool {
    compare_versions(version, minimum) != Ordering::Less
}

fn segments(version: &str) -> Vec<u64> {
    let version = version.trim();
    if version.is_empty() {
        return Vec::new();
    }
    version
        .split('.')
        .map(|segment| parse_segment(segment.trim()))
        .collect()
}

fn parse_segment(segment: &str) -> u64 {
    match segment.parse::<u64>() {
        Ok(value) => value,
        // All digits but too large for u64.
        Err(_) if !segment.is_empty() && segment.bytes().all(|b| b.is_ascii_digit()) => u64::MAX,
        Err(_) => 0,
    }
}
