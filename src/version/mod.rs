use std::cmp::Ordering;
use std::sync::LazyLock;

use regex::Regex;

use crate::error::{Result, UpdaterError};

// Most specific first; the first pattern that matches wins.
static FILENAME_VERSION_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        r"-(\d+\.\d+\.\d+(?:-[a-z0-9.]+)?)(?:-[a-z]+)?\.jar$",
        r"-(\d+\.\d+(?:-[a-z0-9.]+)?)(?:-[a-z]+)?\.jar$",
        r"[_-]v?(\d+\.\d+\.\d+(?:-[a-z0-9.]+)?)(?:-[a-z]+)?\.jar$",
        r"[_-]v?(\d+\.\d+(?:-[a-z0-9.]+)?)(?:-[a-z]+)?\.jar$",
    ]
    .into_iter()
    .filter_map(|pattern| Regex::new(pattern).ok())
    .collect()
});

/// Pull a dotted version token out of a mod filename, e.g. `sodium-fabric-1.2.3.jar` -> `1.2.3`.
pub fn extract_version(filename: &str) -> Option<String> {
    FILENAME_VERSION_PATTERNS.iter().find_map(|pattern| {
        pattern
            .captures(filename)
            .and_then(|caps| caps.get(1))
            .map(|m| m.as_str().to_owned())
    })
}

/// Returns true when `latest` is newer than `current`.
///
/// Both inputs are cut at the first hyphen and stripped to digits and dots before
/// being compared numerically. When either side has nothing left, or does not parse
/// as a dotted integer tuple, the result degrades to `current != latest`. That
/// fallback is lossy and not transitive across malformed inputs.
pub fn is_newer(current: &str, latest: &str) -> bool {
    let current_clean = clean_version(current);
    let latest_clean = clean_version(latest);
    if current_clean.is_empty() || latest_clean.is_empty() {
        return current != latest;
    }
    match (
        parse_version_parts(&current_clean),
        parse_version_parts(&latest_clean),
    ) {
        (Ok(current_parts), Ok(latest_parts)) => {
            compare_parts(&latest_parts, &current_parts) == Ordering::Greater
        }
        _ => current != latest,
    }
}

/// Leading release segment: text before the first `-`, restricted to digits and dots.
fn clean_version(version: &str) -> String {
    version
        .split('-')
        .next()
        .unwrap_or_default()
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == '.')
        .collect()
}

/// Parse version string into parts (e.g., "0.1.5" -> [0, 1, 5]).
fn parse_version_parts(version: &str) -> Result<Vec<u64>> {
    version
        .split('.')
        .map(|part| {
            part.parse::<u64>()
                .map_err(|_| UpdaterError::Parse(format!("malformed version '{version}'")))
        })
        .collect()
}

/// Missing trailing components count as zero, so `1.2` equals `1.2.0`.
fn compare_parts(a: &[u64], b: &[u64]) -> Ordering {
    let max_len = a.len().max(b.len());
    for i in 0..max_len {
        let a_part = a.get(i).copied().unwrap_or(0);
        let b_part = b.get(i).copied().unwrap_or(0);
        match a_part.cmp(&b_part) {
            Ordering::Equal => continue,
            other => return other,
        }
    }
    Ordering::Equal
}
