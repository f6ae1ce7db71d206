//! String similarity for fuzzy token matching.
//!
//! The ratio is `2 * M / (len(a) + len(b))` where `M` is the length of the
//! longest common subsequence, measured in chars. One edit on a short
//! identifier (`pt101` vs `pt_101`) stays above the default 0.8 cutoff.

/// Similarity in `[0.0, 1.0]`; two empty strings are identical.
pub fn similarity_ratio(a: &str, b: &str) -> f64 {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    let total = a.len() + b.len();
    if total == 0 {
        return 1.0;
    }
    2.0 * lcs_len(&a, &b) as f64 / total as f64
}

/// Whether any candidate is at least `cutoff` similar to `word`.
pub fn has_close_match<'a, I>(word: &str, candidates: I, cutoff: f64) -> bool
where
    I: IntoIterator<Item = &'a String>,
{
    let word_len = word.chars().count();
    candidates.into_iter().any(|candidate| {
        // Upper bound from lengths alone: M <= min(la, lb).
        let cand_len = candidate.chars().count();
        let total = word_len + cand_len;
        let best = if total == 0 {
            1.0
        } else {
            2.0 * word_len.min(cand_len) as f64 / total as f64
        };
        best >= cutoff && similarity_ratio(word, candidate) >= cutoff
    })
}

fn lcs_len(a: &[char], b: &[char]) -> usize {
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
