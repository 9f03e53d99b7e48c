//! Ratcliff/Obershelp gestalt string similarity.
//!
//! `ratio(a, b) = 2·M / (|a| + |b|)` where `M` counts the characters in matching blocks.
//! Blocks are found by taking the longest common contiguous run (earliest in `a` on ties, then
//! earliest in `b`) and recursing on the unmatched text to its left and right. Comparison is
//! per `char`, with no junk heuristic.

/// Similarity of `a` and `b` in `[0, 1]`. Two empty strings are identical.
pub fn ratio(a: &str, b: &str) -> f64 {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    let total = a.len() + b.len();
    if total == 0 {
        return 1.0;
    }
    2.0 * matching_chars(&a, &b) as f64 / total as f64
}

fn matching_chars(a: &[char], b: &[char]) -> usize {
    let mut matched = 0;
    let mut pending = vec![(0, a.len(), 0, b.len())];

    while let Some((alo, ahi, blo, bhi)) = pending.pop() {
        let (i, j, k) = longest_match(a, b, alo, ahi, blo, bhi);
        if k == 0 {
            continue;
        }
        matched += k;
        if alo < i && blo < j {
            pending.push((alo, i, blo, j));
        }
        if i + k < ahi && j + k < bhi {
            pending.push((i + k, ahi, j + k, bhi));
        }
    }
    matched
}

/// Longest common run of `a[alo..ahi]` and `b[blo..bhi]` as `(start_a, start_b, len)`.
fn longest_match(
    a: &[char],
    b: &[char],
    alo: usize,
    ahi: usize,
    blo: usize,
    bhi: usize,
) -> (usize, usize, usize) {
    let width = bhi.saturating_sub(blo);
    let mut best = (alo, blo, 0);
    // prev[x + 1] = length of the run ending at a[i - 1], b[blo + x]
    let mut prev = vec![0usize; width + 1];
    let mut cur = vec![0usize; width + 1];

    for i in alo..ahi {
        for j in blo..bhi {
            let x = j - blo;
            if a[i] == b[j] {
                let k = prev[x] + 1;
                cur[x + 1] = k;
                if k > best.2 {
                    best = (i + 1 - k, j + 1 - k, k);
                }
            } else {
                cur[x + 1] = 0;
            }
        }
        std::mem::swap(&mut prev, &mut cur);
    }
    best
}
