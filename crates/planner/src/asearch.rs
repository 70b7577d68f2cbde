//! Best-first (A*) search over candidate trees.
//!
//! Starts from a bare root, repeatedly closes the highest-scoring open tree
//! and opens its successors, scoring each with an injected [`TreeScorer`].
//! Three independent caps bound the run: total iterations, iterations
//! without improvement, and an optional beam on the open list.
//!
//! With a future-promise weight set, a tree's priority is its score plus the
//! weighted estimate of what it may still gain
//! ([`CandidateGenerator::future_promise`]).

use std::collections::{BinaryHeap, HashSet};
use std::path::PathBuf;
use std::sync::Arc;

use ttree::{Da, TTree};

use crate::candgen::{CandidateGenerator, FuturePromiseType};
use crate::node::ScoredTree;

/// Errors that can occur during candidate generation.
#[derive(Debug, thiserror::Error)]
pub enum PlannerError {
    /// A model file could not be opened or written.
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    /// A model file could not be (de)serialized.
    #[error("Invalid candidate generator model {path}: {source}")]
    Model {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    /// DA and tree lists differ in length.
    #[error("Training data mismatch: {das} DAs vs {trees} trees")]
    Misaligned { das: usize, trees: usize },
    /// Error from the tree scorer.
    #[error("Scorer error: {0}")]
    Scorer(#[source] anyhow::Error),
    /// Error from a tree sampler.
    #[error("Sampler error: {0}")]
    Sampler(#[source] anyhow::Error),
}

// ---------------------------------------------------------------------------
// Traits
// ---------------------------------------------------------------------------

/// Scores a candidate tree for a DA. Convention: higher = better.
///
/// Implementations must be free of side effects; the search calls back
/// into them many times per run.
pub trait TreeScorer {
    fn score_tree(&self, tree: &TTree, da: &Da) -> Result<f64, PlannerError>;
}

/// A bounded search producing open and closed candidate lists.
pub trait TreeSearch {
    fn run(
        &self,
        da: &Da,
        scorer: &dyn TreeScorer,
        max_iter: usize,
        max_defic_iter: usize,
        beam_size: Option<usize>,
    ) -> Result<SearchLists, PlannerError>;
}

// ---------------------------------------------------------------------------
// Search results
// ---------------------------------------------------------------------------

/// Why a search run stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// `max_iter` expansions done.
    MaxIter,
    /// `max_defic_iter` expansions in a row without a better open tree.
    MaxDeficIter,
    /// Open list ran empty.
    Exhausted,
}

/// Counters from a single search run.
#[derive(Debug, Clone)]
pub struct SearchStats {
    /// Number of trees moved from the open to the closed list.
    pub iterations: usize,
    /// Trailing iterations without improvement when the run stopped.
    pub defic_iterations: usize,
    /// Number of scorer calls.
    pub trees_scored: usize,
    /// Largest open list size seen (after beam pruning).
    pub peak_open_size: usize,
    pub stop: StopReason,
}

/// Open and closed lists of a finished run, as `(tree, cost)` pairs with
/// `cost = -priority` (`-score` unless a future promise is weighted in).
#[derive(Debug, Clone)]
pub struct SearchLists {
    /// Unexpanded trees, cheapest first.
    pub open: Vec<(TTree, f64)>,
    /// Expanded trees in the order they were closed; `pop()` yields the most
    /// recently closed one.
    pub closed: Vec<(TTree, f64)>,
    pub stats: SearchStats,
}

impl SearchLists {
    /// Cheapest closed entry; the earliest closed one on ties.
    pub fn best_closed(&self) -> Option<&(TTree, f64)> {
        self.closed
            .iter()
            .reduce(|best, entry| if entry.1 < best.1 { entry } else { best })
    }

    pub fn in_closed(&self, tree: &TTree) -> bool {
        self.closed.iter().any(|(t, _)| t == tree)
    }

    pub fn in_open(&self, tree: &TTree) -> bool {
        self.open.iter().any(|(t, _)| t == tree)
    }
}

// ---------------------------------------------------------------------------
// ASearchPlanner
// ---------------------------------------------------------------------------

/// A* planner over the candidate generator's expansion space.
#[derive(Debug, Clone)]
pub struct ASearchPlanner {
    candgen: Arc<CandidateGenerator>,
    future_promise_weight: f64,
    future_promise_type: FuturePromiseType,
}

impl ASearchPlanner {
    pub fn new(candgen: Arc<CandidateGenerator>) -> Self {
        Self {
            candgen,
            future_promise_weight: 0.0,
            future_promise_type: FuturePromiseType::default(),
        }
    }

    /// Add `weight * future_promise(tree, kind)` to every tree's priority.
    pub fn with_future_promise(mut self, weight: f64, kind: FuturePromiseType) -> Self {
        self.future_promise_weight = weight;
        self.future_promise_type = kind;
        self
    }

    fn priority(&self, tree: &TTree, score: f64) -> f64 {
        if self.future_promise_weight == 0.0 {
            return score;
        }
        score
            + self.future_promise_weight
                * self.candgen.future_promise(tree, self.future_promise_type)
    }
}

impl TreeSearch for ASearchPlanner {
    fn run(
        &self,
        da: &Da,
        scorer: &dyn TreeScorer,
        max_iter: usize,
        max_defic_iter: usize,
        beam_size: Option<usize>,
    ) -> Result<SearchLists, PlannerError> {
        let root = TTree::new();
        let root_score = self.priority(&root, scorer.score_tree(&root, da)?);

        let mut arena: Vec<TTree> = vec![root.clone()];
        let mut open = BinaryHeap::new();
        let mut open_set: HashSet<TTree> = HashSet::from([root]);
        let mut closed: Vec<ScoredTree> = Vec::new();
        let mut closed_set: HashSet<TTree> = HashSet::new();
        open.push(ScoredTree::new(0, root_score));

        let mut iterations = 0;
        let mut defic_iterations = 0;
        let mut trees_scored = 1;
        let mut peak_open_size = 1;
        let mut best_closed = f64::NEG_INFINITY;
        let mut exhausted = false;

        while iterations < max_iter && defic_iterations < max_defic_iter {
            let Some(current) = open.pop() else {
                exhausted = true;
                break;
            };
            let tree = arena[current.index].clone();
            open_set.remove(&tree);
            best_closed = best_closed.max(current.score.0);

            for succ in self.candgen.successors(&tree, da) {
                if open_set.contains(&succ) || closed_set.contains(&succ) {
                    continue;
                }
                let score = self.priority(&succ, scorer.score_tree(&succ, da)?);
                trees_scored += 1;
                open_set.insert(succ.clone());
                open.push(ScoredTree::new(arena.len(), score));
                arena.push(succ);
            }
            closed_set.insert(tree);
            closed.push(current);

            if let Some(beam) = beam_size {
                if open.len() > beam {
                    // Ascending priority: drop from the front.
                    let mut kept = std::mem::take(&mut open).into_sorted_vec();
                    let dropped = kept.len() - beam;
                    for pruned in kept.drain(..dropped) {
                        open_set.remove(&arena[pruned.index]);
                    }
                    open = kept.into_iter().collect();
                }
            }
            peak_open_size = peak_open_size.max(open.len());

            match open.peek() {
                Some(best_open) if best_open.score.0 > best_closed => defic_iterations = 0,
                _ => defic_iterations += 1,
            }
            iterations += 1;

            tracing::trace!(
                iteration = iterations,
                open = open.len(),
                closed = closed.len(),
                defic = defic_iterations,
                "A* step"
            );
        }

        let stop = if exhausted {
            StopReason::Exhausted
        } else if iterations >= max_iter {
            StopReason::MaxIter
        } else {
            StopReason::MaxDeficIter
        };

        tracing::debug!(
            da = %da,
            iterations,
            trees_scored,
            open = open.len(),
            closed = closed.len(),
            ?stop,
            "A* search finished"
        );

        let mut open_sorted = open.into_sorted_vec();
        open_sorted.reverse();
        Ok(SearchLists {
            open: open_sorted
                .iter()
                .map(|s| (arena[s.index].clone(), s.cost()))
                .collect(),
            closed: closed
                .iter()
                .map(|s| (arena[s.index].clone(), s.cost()))
                .collect(),
            stats: SearchStats {
                iterations,
                defic_iterations,
                trees_scored,
                peak_open_size,
                stop,
            },
        })
    }
}
