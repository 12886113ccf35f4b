//! Glob matching for cache key patterns.
//!
//! Supports `*` (any run of characters, including none) and `?` (exactly
//! one character), the subset of Redis `MATCH` syntax the stores use.

/// Checks if a cache key matches a glob pattern.
///
/// # Examples
///
/// ```
/// use mango_core::cache::pattern_matches;
///
/// assert!(pattern_matches("MANGO:QUESTION:ALL", "MANGO:QUESTION:ALL"));
/// assert!(pattern_matches("MANGO:SURVEY:PAGE:*", "MANGO:SURVEY:PAGE:ab12:ITEMS"));
/// assert!(pattern_matches("MANGO:*:ALL", "MANGO:QUESTION:ALL"));
/// assert!(!pattern_matches("MANGO:SURVEY:PAGE:*", "MANGO:QUESTION:ALL"));
/// ```
pub fn pattern_matches(pattern: &str, key: &str) -> bool {
    let pattern: Vec<char> = pattern.chars().collect();
    let key: Vec<char> = key.chars().collect();

    let (mut p, mut k) = (0, 0);
    // Position of the last `*` seen and the key index it was tried at.
    let mut backtrack: Option<(usize, usize)> = None;

    while k < key.len() {
        match pattern.get(p) {
            Some('*') => {
                backtrack = Some((p, k));
                p += 1;
            }
            Some('?') => {
                p += 1;
                k += 1;
            }
            Some(c) if *c == key[k] => {
                p += 1;
                k += 1;
            }
            _ => match backtrack {
                // Let the last star swallow one more character.
                Some((star, star_k)) => {
                    p = star + 1;
                    k = star_k + 1;
                    backtrack = Some((star, star_k + 1));
                }
                None => return false,
            },
        }
    }

    pattern[p..].iter().all(|c| *c == '*')
}
