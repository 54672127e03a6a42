// src/matching/similarity.rs
use indexmap::IndexMap;
use strsim::levenshtein;

use crate::models::NO_MATCH;

/// Edit distance divided by the length of the longer string.
///
/// 0.0 means identical, 1.0 means nothing in common relative to length.
/// Two empty strings are treated as identical; the matchers never ask.
pub fn levenshtein_ratio(first: &str, second: &str) -> f64 {
    let longest = first.chars().count().max(second.chars().count());
    if longest == 0 {
        return 0.0;
    }
    levenshtein(first, second) as f64 / longest as f64
}

/// Returns the id of the candidate with the lowest ratio to `name`, provided
/// that ratio is at most `cutoff`. Ties keep the earliest candidate.
pub fn closest_within(name: &str, candidates: &IndexMap<i64, String>, cutoff: f64) -> i64 {
    let mut best: Option<(f64, i64)> = None;
    for (&id, candidate) in candidates {
        let ratio = levenshtein_ratio(name, candidate);
        if ratio > cutoff {
            continue;
        }
        match best {
            Some((best_ratio, _)) if ratio >= best_ratio => {}
            _ => best = Some((ratio, id)),
        }
    }
    best.map(|(_, id)| id).unwrap_or(NO_MATCH)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candidates(list: &[(i64, &str)]) -> IndexMap<i64, String> {
        list.iter().map(|(id, name)| (*id, name.to_string())).collect()
    }

    #[test]
    fn test_ratio_values() {
        assert_eq!(levenshtein_ratio("cornell", "cornell"), 0.0);
        assert_eq!(levenshtein_ratio("abcd", "abce"), 0.25);
        assert_eq!(levenshtein_ratio("abc", "xyz"), 1.0);
        assert_eq!(levenshtein_ratio("", "abc"), 1.0);
        // 6 edits over 18 characters.
        let ratio = levenshtein_ratio("cornell univ", "cornell university");
        assert!((ratio - 6.0 / 18.0).abs() < 1e-12);
    }

    #[test]
    fn test_ratio_counts_characters_not_bytes() {
        assert_eq!(levenshtein_ratio("école", "ecole"), 0.2);
    }

    #[test]
    fn test_cutoff_is_inclusive() {
        let list = candidates(&[(9, "abce")]);
        assert_eq!(closest_within("abcd", &list, 0.25), 9);
        assert_eq!(closest_within("abcd", &list, 0.24), NO_MATCH);
    }

    #[test]
    fn test_lowest_ratio_wins() {
        let list = candidates(&[(1, "abcxx"), (2, "abcdx"), (3, "zzzzz")]);
        assert_eq!(closest_within("abcde", &list, 0.5), 2);
    }

    #[test]
    fn test_ties_keep_first_in_iteration_order() {
        let list = candidates(&[(40, "abcx"), (10, "abcy")]);
        assert_eq!(closest_within("abcd", &list, 0.25), 40);
        let reversed = candidates(&[(10, "abcy"), (40, "abcx")]);
        assert_eq!(closest_within("abcd", &reversed, 0.25), 10);
    }

    #[test]
    fn test_empty_candidates() {
        assert_eq!(closest_within("abcd", &IndexMap::new(), 0.4), NO_MATCH);
    }
}
