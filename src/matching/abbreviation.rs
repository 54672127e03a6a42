// src/matching/abbreviation.rs
use indexmap::IndexMap;

use crate::models::NO_MATCH;

/// Finds a candidate whose remainder, after dropping as many leading
/// characters as `name` has, equals `name`. First qualifying candidate wins.
///
/// The comparison is kept literal: it matches stored names shaped like
/// `<prefix of equal length><name>`, which is not necessarily the initialed
/// form one would expect.
pub fn match_abbreviation(name: &str, candidates: &IndexMap<i64, String>) -> i64 {
    let skip = name.chars().count();
    for (&id, candidate) in candidates {
        let remainder = match candidate.char_indices().nth(skip) {
            Some((offset, _)) => &candidate[offset..],
            None => "",
        };
        if remainder == name {
            return id;
        }
    }
    NO_MATCH
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candidates(list: &[(i64, &str)]) -> IndexMap<i64, String> {
        list.iter().map(|(id, name)| (*id, name.to_string())).collect()
    }

    #[test]
    fn test_literal_prefix_trim_comparison() {
        // "li kim" minus its first three characters is "kim".
        let list = candidates(&[(3, "kim li"), (5, "li kim")]);
        assert_eq!(match_abbreviation("kim", &list), 5);
    }

    #[test]
    fn test_initialed_form_is_not_matched() {
        // A stored full name is not found from its surname plus initial; the
        // literal comparison only looks at the tail after an equal-length prefix.
        let list = candidates(&[(1, "smith john")]);
        assert_eq!(match_abbreviation("smith j", &list), NO_MATCH);
    }

    #[test]
    fn test_first_qualifying_candidate_wins() {
        let list = candidates(&[(8, "ab xy"), (2, "cd xy")]);
        assert_eq!(match_abbreviation("xy", &list), NO_MATCH);
        let list = candidates(&[(8, "abxy"), (2, "cdxy")]);
        assert_eq!(match_abbreviation("xy", &list), 8);
    }

    #[test]
    fn test_name_longer_than_candidate() {
        let list = candidates(&[(1, "ann")]);
        assert_eq!(match_abbreviation("annabel", &list), NO_MATCH);
    }
}
