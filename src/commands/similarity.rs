//! Ratcliff/Obershelp string similarity
//!
//! Computes `2 * M / T` where `M` is the number of characters in matching
//! blocks and `T` the combined length. Blocks are found by taking the longest
//! common run, then recursing on the pieces left and right of it. Works on
//! Unicode scalar values so Devanagari trigger phrases compare per character.

/// Similarity ratio in `[0, 1]` between `a` and `b`
///
/// Two empty strings are identical (`1.0`).
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn ratio(a: &str, b: &str) -> f64 {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();

    let total = a.len() + b.len();
    if total == 0 {
        return 1.0;
    }

    2.0 * matching_chars(&a, &b) as f64 / total as f64
}

/// Sum of all matching block sizes
fn matching_chars(a: &[char], b: &[char]) -> usize {
    let mut matched = 0;
    let mut pending = vec![(0, a.len(), 0, b.len())];

    while let Some((alo, ahi, blo, bhi)) = pending.pop() {
        let (i, j, size) = longest_match(a, b, alo, ahi, blo, bhi);
        if size == 0 {
            continue;
        }

        matched += size;
        if alo < i && blo < j {
            pending.push((alo, i, blo, j));
        }
        if i + size < ahi && j + size < bhi {
            pending.push((i + size, ahi, j + size, bhi));
        }
    }

    matched
}

/// Longest common run of `a[alo..ahi]` and `b[blo..bhi]`
///
/// Returns `(i, j, size)`. Among equally long runs the one ending first in
/// `a` wins, then the one ending first in `b`.
fn longest_match(
    a: &[char],
    b: &[char],
    alo: usize,
    ahi: usize,
    blo: usize,
    bhi: usize,
) -> (usize, usize, usize) {
    let (mut best_i, mut best_j, mut best_size) = (alo, blo, 0);

    // run lengths ending at the previous row, offset by one so index 0 is a sentinel
    let width = bhi - blo;
    let mut prev = vec![0usize; width + 1];
    let mut curr = vec![0usize; width + 1];

    for i in alo..ahi {
        for j in blo..bhi {
            let idx = j - blo + 1;
            if a[i] == b[j] {
                let run = prev[idx - 1] + 1;
                curr[idx] = run;
                if run > best_size {
                    best_i = i + 1 - run;
                    best_j = j + 1 - run;
                    best_size = run;
                }
            } else {
                curr[idx] = 0;
            }
        }
        std::mem::swap(&mut prev, &mut curr);
    }

    (best_i, best_j, best_size)
}
