use ordered_float::OrderedFloat;

/// A candidate tree with its score, for priority queue ordering.
///
/// Used with `BinaryHeap` (max-heap). Higher score = higher priority; on
/// equal scores the tree created first wins, so search order is
/// deterministic.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScoredTree {
    /// Index into the search's tree arena.
    pub index: usize,
    /// Scorer output (negated cost).
    pub score: OrderedFloat<f64>,
}

impl ScoredTree {
    pub fn new(index: usize, score: f64) -> Self {
        Self {
            index,
            score: OrderedFloat(score),
        }
    }

    /// Cost as reported in open/closed lists: lower is better.
    pub fn cost(&self) -> f64 {
        -self.score.0
    }
}

impl PartialOrd for ScoredTree {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for ScoredTree {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.score
            .cmp(&other.score)
            .then_with(|| other.index.cmp(&self.index))
    }
}
