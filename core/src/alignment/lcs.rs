//! Longest common subsequence over an arbitrary match predicate.
//!
//! The table holds suffix lengths in a flat arena: entry `(i, j)` is the LCS
//! length of `a[i..]` against `b[j..]`, stored at `i * (m + 1) + j`. The
//! predicate is evaluated once per cell and cached in a bitmap so the walk
//! never re-evaluates it.
//!
//! The walk starts at `(0, 0)` and, on ties, prefers match, then delete
//! (advance the source), then insert (advance the target). A common prefix
//! is exactly what that walk takes first, so it is matched before the table
//! is built. [`oriented_lcs_pairs`] picks which side acts as the source from
//! content alone, which makes the chosen alignment independent of argument
//! order.

#[inline]
fn idx(i: usize, j: usize, m: usize) -> usize {
    i * (m + 1) + j
}

struct Bitmap {
    words: Vec<u64>,
}

impl Bitmap {
    fn new(bits: usize) -> Bitmap {
        Bitmap {
            words: vec![0; bits.div_ceil(64)],
        }
    }

    fn set(&mut self, bit: usize) {
        self.words[bit / 64] |= 1 << (bit % 64);
    }

    fn get(&self, bit: usize) -> bool {
        self.words[bit / 64] & (1 << (bit % 64)) != 0
    }
}

/// Matched `(source, target)` pairs of an LCS of two sequences of lengths
/// `n` and `m`, in increasing order. Callers bound `n * m` before calling.
pub(crate) fn lcs_pairs<F>(n: usize, m: usize, mut matches: F) -> Vec<(u32, u32)>
where
    F: FnMut(usize, usize) -> bool,
{
    let mut prefix = 0;
    while prefix < n && prefix < m && matches(prefix, prefix) {
        prefix += 1;
    }

    let mut pairs: Vec<(u32, u32)> = (0..prefix).map(|k| (k as u32, k as u32)).collect();
    let (inner_n, inner_m) = (n - prefix, m - prefix);
    if inner_n > 0 && inner_m > 0 {
        for (a, b) in lcs_table_pairs(inner_n, inner_m, |i, j| matches(prefix + i, prefix + j)) {
            pairs.push((a + prefix as u32, b + prefix as u32));
        }
    }
    pairs
}

/// [`lcs_pairs`] with the walk run from the side whose `keys` sort first.
///
/// `matches` must be symmetric. Swapping the two sides then yields the same
/// pairs transposed. Sides with equal keys hold the same content, so either
/// orientation gives the same answer.
pub(crate) fn oriented_lcs_pairs<K, F>(keys_a: &[K], keys_b: &[K], mut matches: F) -> Vec<(u32, u32)>
where
    K: Ord,
    F: FnMut(usize, usize) -> bool,
{
    if keys_a <= keys_b {
        return lcs_pairs(keys_a.len(), keys_b.len(), matches);
    }
    lcs_pairs(keys_b.len(), keys_a.len(), |j, i| matches(i, j))
        .into_iter()
        .map(|(j, i)| (i, j))
        .collect()
}

fn lcs_table_pairs<F>(n: usize, m: usize, mut matches: F) -> Vec<(u32, u32)>
where
    F: FnMut(usize, usize) -> bool,
{
    let mut lengths = vec![0u32; (n + 1) * (m + 1)];
    let mut similar = Bitmap::new(n * m);

    for i in (0..n).rev() {
        for j in (0..m).rev() {
            lengths[idx(i, j, m)] = if matches(i, j) {
                similar.set(i * m + j);
                lengths[idx(i + 1, j + 1, m)] + 1
            } else {
                lengths[idx(i + 1, j, m)].max(lengths[idx(i, j + 1, m)])
            };
        }
    }

    let mut pairs = Vec::with_capacity(lengths[idx(0, 0, m)] as usize);
    let (mut i, mut j) = (0usize, 0usize);
    while i < n && j < m {
        if similar.get(i * m + j) {
            pairs.push((i as u32, j as u32));
            i += 1;
            j += 1;
        } else if lengths[idx(i + 1, j, m)] >= lengths[idx(i, j + 1, m)] {
            i += 1;
        } else {
            j += 1;
        }
    }
    pairs
}
