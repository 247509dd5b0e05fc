//! Longest strictly increasing subsequence by patience sorting.

/// Indices into `items` of a longest subsequence whose keys strictly
/// increase. Among equal-length answers the one ending earliest in each pile
/// is kept, which makes the result deterministic.
pub(crate) fn lis_indices<T, F>(items: &[T], key: F) -> Vec<usize>
where
    F: Fn(&T) -> u32,
{
    let mut piles: Vec<usize> = Vec::new();
    let mut predecessors: Vec<Option<usize>> = vec![None; items.len()];

    for (idx, item) in items.iter().enumerate() {
        let k = key(item);
        let pos = piles.partition_point(|&top| key(&items[top]) < k);
        if pos > 0 {
            predecessors[idx] = Some(piles[pos - 1]);
        }
        if pos == piles.len() {
            piles.push(idx);
        } else {
            piles[pos] = idx;
        }
    }

    let mut chain = Vec::with_capacity(piles.len());
    let mut current = piles.last().copied();
    while let Some(idx) = current {
        chain.push(idx);
        current = predecessors[idx];
    }
    chain.reverse();
    chain
}
