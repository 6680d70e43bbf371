//! Serial canonicalization used for equality checks only, never for display.

use once_cell::sync::Lazy;
use regex::Regex;

static WHITESPACE_RUN: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").unwrap());

/// Trim, lowercase, collapse whitespace runs to one space, then drop control
/// characters (C0, DEL and C1).
pub fn normalize(serial: &str) -> String {
    let lowered = serial.trim().to_lowercase();
    WHITESPACE_RUN
        .replace_all(&lowered, " ")
        .chars()
        .filter(|c| !c.is_control())
        .collect()
}

/// Normalized form with every whitespace character removed.
///
/// Two serials match exactly when their keys are equal, so this is what the
/// comparator indexes on.
pub fn match_key(serial: &str) -> String {
    normalize(serial)
        .chars()
        .filter(|c| !c.is_whitespace())
        .collect()
}

/// Compare normalized forms, falling back to a whitespace-free comparison.
pub fn serials_match(a: &str, b: &str) -> bool {
    let (a, b) = (normalize(a), normalize(b));
    if a == b {
        return true;
    }
    let strip = |s: &str| s.chars().filter(|c| !c.is_whitespace()).collect::<String>();
    strip(&a) == strip(&b)
}
