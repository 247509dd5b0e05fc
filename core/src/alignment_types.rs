use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Which dimension of a grid an alignment or error refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Axis {
    Rows,
    Columns,
}

impl std::fmt::Display for Axis {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Axis::Rows => "row",
            Axis::Columns => "column",
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("alignment pair ({source_index}, {target_index}) breaks order or bounds")]
pub struct InvalidAlignment {
    pub source_index: u32,
    pub target_index: u32,
}

/// One step of the merged edit script along an axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlignStep {
    Matched { source: u32, target: u32 },
    Deleted { source: u32 },
    Inserted { target: u32 },
}

/// An order-preserving partial matching between the indices of two sequences.
///
/// `forward[i]` is the target index matched to source index `i`, and
/// `backward[j]` is the inverse. Matched pairs are strictly increasing on
/// both sides.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct AxisAlignment {
    forward: Vec<Option<u32>>,
    backward: Vec<Option<u32>>,
}

impl AxisAlignment {
    /// Build from matched pairs, checking bounds and strict monotonicity.
    pub fn from_pairs(
        source_len: u32,
        target_len: u32,
        pairs: &[(u32, u32)],
    ) -> Result<AxisAlignment, InvalidAlignment> {
        let mut prev: Option<(u32, u32)> = None;
        for &(a, b) in pairs {
            let in_bounds = a < source_len && b < target_len;
            let increasing = prev.is_none_or(|(pa, pb)| a > pa && b > pb);
            if !in_bounds || !increasing {
                return Err(InvalidAlignment {
                    source_index: a,
                    target_index: b,
                });
            }
            prev = Some((a, b));
        }
        Ok(Self::from_valid_pairs(source_len, target_len, pairs))
    }

    /// Pairs produced by the aligner are valid by construction.
    pub(crate) fn from_valid_pairs(
        source_len: u32,
        target_len: u32,
        pairs: &[(u32, u32)],
    ) -> AxisAlignment {
        debug_assert!(pairs.windows(2).all(|w| w[0].0 < w[1].0 && w[0].1 < w[1].1));
        let mut forward = vec![None; source_len as usize];
        let mut backward = vec![None; target_len as usize];
        for &(a, b) in pairs {
            forward[a as usize] = Some(b);
            backward[b as usize] = Some(a);
        }
        AxisAlignment { forward, backward }
    }

    /// Index-to-index pairing; the surplus on the longer side is unmatched.
    pub fn positional(source_len: u32, target_len: u32) -> AxisAlignment {
        let common = source_len.min(target_len);
        let pairs: Vec<(u32, u32)> = (0..common).map(|i| (i, i)).collect();
        Self::from_valid_pairs(source_len, target_len, &pairs)
    }

    pub fn source_len(&self) -> u32 {
        self.forward.len() as u32
    }

    pub fn target_len(&self) -> u32 {
        self.backward.len() as u32
    }

    pub fn target_of(&self, source: u32) -> Option<u32> {
        self.forward.get(source as usize).copied().flatten()
    }

    pub fn source_of(&self, target: u32) -> Option<u32> {
        self.backward.get(target as usize).copied().flatten()
    }

    pub fn matched(&self) -> impl Iterator<Item = (u32, u32)> + '_ {
        self.forward
            .iter()
            .enumerate()
            .filter_map(|(a, b)| b.map(|b| (a as u32, b)))
    }

    pub fn deleted(&self) -> impl Iterator<Item = u32> + '_ {
        unmatched(&self.forward)
    }

    pub fn inserted(&self) -> impl Iterator<Item = u32> + '_ {
        unmatched(&self.backward)
    }

    pub fn matched_count(&self) -> usize {
        self.forward.iter().filter(|b| b.is_some()).count()
    }

    /// Every index matched, index to index, with equal lengths.
    pub fn is_identity(&self) -> bool {
        self.forward.len() == self.backward.len()
            && self
                .forward
                .iter()
                .enumerate()
                .all(|(a, b)| *b == Some(a as u32))
    }

    /// The merged edit script in alignment order. At any position, deletions
    /// come before insertions.
    pub fn steps(&self) -> Vec<AlignStep> {
        let (n, m) = (self.forward.len(), self.backward.len());
        let mut steps = Vec::with_capacity(n.max(m));
        let (mut i, mut j) = (0usize, 0usize);
        loop {
            if i < n && self.forward[i].is_none() {
                steps.push(AlignStep::Deleted { source: i as u32 });
                i += 1;
            } else if j < m && self.backward[j].is_none() {
                steps.push(AlignStep::Inserted { target: j as u32 });
                j += 1;
            } else if i < n && j < m {
                steps.push(AlignStep::Matched {
                    source: i as u32,
                    target: j as u32,
                });
                i += 1;
                j += 1;
            } else {
                break;
            }
        }
        steps
    }
}

fn unmatched(map: &[Option<u32>]) -> impl Iterator<Item = u32> + '_ {
    map.iter()
        .enumerate()
        .filter(|(_, other)| other.is_none())
        .map(|(idx, _)| idx as u32)
}

/// Row and column alignment for one sheet pair.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct AlignmentMap {
    pub rows: AxisAlignment,
    pub cols: AxisAlignment,
}
