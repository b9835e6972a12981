use coitrees::{BasicCOITree, GenericInterval, Interval, IntervalTree};

use crate::Position;

use super::IntervalIndexed;

fn to_coord(position: Position) -> i32 {
    i32::try_from(position).unwrap_or(i32::MAX)
}

/// A [`coitrees::BasicCOITree`] interval tree over the features of a single
/// sequence. The metadata carried by each node is an index back into the
/// caller's feature list.
///
/// Both coitrees and [`IntervalIndexed`] use closed intervals, so no
/// coordinate shifting happens here.
pub struct FeatureTree {
    pub(crate) ranges: BasicCOITree<usize, usize>,
}

impl std::fmt::Debug for FeatureTree {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FeatureTree")
            .field("number of ranges:", &self.ranges.len())
            .finish()
    }
}

impl FeatureTree {
    /// Build a tree from indexed closed intervals.
    pub fn new(ranges: &[IntervalIndexed]) -> Self {
        let intervals: Vec<Interval<usize>> = ranges
            .iter()
            .map(|range| Interval::new(to_coord(range.start), to_coord(range.stop), range.index))
            .collect();
        Self {
            ranges: BasicCOITree::new(&intervals),
        }
    }

    /// Indices of every range overlapping `[start, stop]`.
    pub fn overlapping(&self, start: Position, stop: Position) -> Vec<usize> {
        let mut hits = Vec::new();
        self.ranges
            .query(to_coord(start), to_coord(stop), |node| hits.push(*node.metadata()));
        hits.sort_unstable();
        hits
    }

    /// Return the number of ranges in this tree.
    pub fn len(&self) -> usize {
        self.ranges.len()
    }

    /// Return whether the tree is empty (contains no ranges).
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
