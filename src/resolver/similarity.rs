//! String similarity primitives for target resolution
//!
//! Two measures, used deliberately asymmetrically by the resolver:
//! [`ratio`] is a character-level indel similarity for short single-phrase
//! names (scenes, areas, devices), while [`token_set_ratio`] compares
//! whitespace token sets so multi-word entity names match regardless of word
//! order or extra words.

use std::collections::BTreeSet;

/// Character-level similarity in [0, 1]: `2·LCS(a, b) / (|a| + |b|)`.
///
/// 1.0 for identical strings (including two empty strings), 0.0 when
/// nothing aligns.
pub fn ratio(a: &str, b: &str) -> f64 {
    let a_chars: Vec<char> = a.chars().collect();
    let b_chars: Vec<char> = b.chars().collect();
    let total = a_chars.len() + b_chars.len();
    if total == 0 {
        return 1.0;
    }

    let lcs = lcs_length(&a_chars, &b_chars);
    (2 * lcs) as f64 / total as f64
}

/// Token-set similarity in [0, 1], order- and subset-insensitive.
///
/// Both strings are split on whitespace into unique sorted token sets; with
/// intersection `t0` and the two difference sets, the score is the best
/// [`ratio`] among the joined combinations. A query whose tokens are a
/// subset of the candidate's scores 1.0.
pub fn token_set_ratio(a: &str, b: &str) -> f64 {
    let a_tokens: BTreeSet<&str> = a.split_whitespace().collect();
    let b_tokens: BTreeSet<&str> = b.split_whitespace().collect();

    if a_tokens.is_empty() || b_tokens.is_empty() {
        return if a_tokens.is_empty() && b_tokens.is_empty() {
            1.0
        } else {
            0.0
        };
    }

    let intersection: Vec<&str> = a_tokens.intersection(&b_tokens).copied().collect();
    let only_a: Vec<&str> = a_tokens.difference(&b_tokens).copied().collect();
    let only_b: Vec<&str> = b_tokens.difference(&a_tokens).copied().collect();

    if !intersection.is_empty() && (only_a.is_empty() || only_b.is_empty()) {
        return 1.0;
    }

    let sect = intersection.join(" ");
    let sect_a = join_parts(&sect, &only_a);
    let sect_b = join_parts(&sect, &only_b);

    ratio(&sect, &sect_a)
        .max(ratio(&sect, &sect_b))
        .max(ratio(&sect_a, &sect_b))
}

fn join_parts(sect: &str, rest: &[&str]) -> String {
    if sect.is_empty() {
        rest.join(" ")
    } else if rest.is_empty() {
        sect.to_string()
    } else {
        format!("{} {}", sect, rest.join(" "))
    }
}

/// Longest common subsequence length, two-row dynamic programming
fn lcs_length(a: &[char], b: &[char]) -> usize {
    if a.is_empty() || b.is_empty() {
        return 0;
    }

    let mut prev = vec![0usize; b.len() + 1];
    let mut curr = vec![0usize; b.len() + 1];

    for &ca in a {
        for (j, &cb) in b.iter().enumerate() {
            curr[j + 1] = if ca == cb {
                prev[j] + 1
            } else {
                prev[j + 1].max(curr[j])
            };
        }
        std::mem::swap(&mut prev, &mut curr);
    }

    prev[b.len()]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ratio_identity_and_bounds() {
        assert_eq!(ratio("bedroom", "bedroom"), 1.0);
        assert_eq!(ratio("", ""), 1.0);
        assert_eq!(ratio("abc", ""), 0.0);
        assert_eq!(ratio("abc", "xyz"), 0.0);

        let score = ratio("bedroom", "bedrom");
        assert!(score > 0.9 && score < 1.0);
    }

    #[test]
    fn ratio_is_symmetric() {
        assert_eq!(ratio("desk lamp", "lamp desk"), ratio("lamp desk", "desk lamp"));
    }

    #[test]
    fn token_set_subset_scores_full() {
        assert_eq!(token_set_ratio("desk lamp", "office desk lamp"), 1.0);
        assert_eq!(token_set_ratio("lamp desk", "desk lamp"), 1.0);
    }

    #[test]
    fn token_set_handles_empty_inputs() {
        assert_eq!(token_set_ratio("", ""), 1.0);
        assert_eq!(token_set_ratio("", "lamp"), 0.0);
    }

    #[test]
    fn token_set_partial_overlap() {
        let score = token_set_ratio("kitchen light", "kitchen ceiling lamp");
        assert!(score > 0.0 && score < 1.0);
    }

    #[test]
    fn disjoint_tokens_score_low() {
        let score = token_set_ratio("garage door", "bedroom fan");
        assert!(score < 0.5);
    }
}
