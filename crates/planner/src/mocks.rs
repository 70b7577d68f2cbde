//! Mock scorers, samplers and searches for testing rival generation without
//! a trained model, plus a tiny restaurant-domain corpus.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use ttree::{Da, NodeData, TTree};

use crate::asearch::{PlannerError, SearchLists, SearchStats, StopReason, TreeScorer, TreeSearch};
use crate::sampling::TreeSampler;

/// Build a tree from `(t_lemma, formeme, parent)` triples for nodes 1.., in
/// surface order. Panics on malformed input.
pub fn make_tree(nodes: &[(&str, &str, usize)]) -> TTree {
    let mut data = vec![NodeData::root()];
    let mut parents = vec![None];
    for (lemma, formeme, parent) in nodes {
        data.push(NodeData::new(lemma, formeme));
        parents.push(Some(*parent));
    }
    TTree::from_parts(data, parents).expect("malformed mock tree")
}

/// Five aligned DA/tree pairs. Every tree hangs a single verb under the
/// root and has three or four real nodes.
pub fn restaurant_corpus() -> (Vec<Da>, Vec<TTree>) {
    let pairs = [
        (
            "inform(name=X-name)&inform(food=Chinese)",
            make_tree(&[
                ("X-name", "n:subj", 2),
                ("serve", "v:fin", 0),
                ("Chinese", "adj:attr", 4),
                ("food", "n:obj", 2),
            ]),
        ),
        (
            "inform(name=X-name)&inform(area=centre)",
            make_tree(&[
                ("X-name", "n:subj", 2),
                ("be", "v:fin", 0),
                ("centre", "n:in+X", 2),
            ]),
        ),
        (
            "inform(name=X-name)&inform(price=cheap)",
            make_tree(&[
                ("X-name", "n:subj", 2),
                ("be", "v:fin", 0),
                ("cheap", "adj:compl", 2),
            ]),
        ),
        (
            "request(food)",
            make_tree(&[
                ("what", "adj:attr", 2),
                ("food", "n:obj", 3),
                ("want", "v:fin", 0),
                ("you", "n:subj", 3),
            ]),
        ),
        (
            "inform(name=X-name)&inform(food=Italian)",
            make_tree(&[
                ("X-name", "n:subj", 2),
                ("serve", "v:fin", 0),
                ("Italian", "adj:attr", 4),
                ("food", "n:obj", 2),
            ]),
        ),
    ];

    pairs
        .into_iter()
        .map(|(da, tree)| (da.parse::<Da>().expect("malformed mock DA"), tree))
        .unzip()
}

// ---------------------------------------------------------------------------
// Scorers
// ---------------------------------------------------------------------------

/// Scores every tree the same.
pub struct ConstScorer(pub f64);

impl TreeScorer for ConstScorer {
    fn score_tree(&self, _tree: &TTree, _da: &Da) -> Result<f64, PlannerError> {
        Ok(self.0)
    }
}

/// Score proportional to the number of real nodes.
pub struct SizeScorer(pub f64);

impl TreeScorer for SizeScorer {
    fn score_tree(&self, tree: &TTree, _da: &Da) -> Result<f64, PlannerError> {
        Ok(self.0 * tree.size() as f64)
    }
}

/// Looks scores up by exact tree, falling back to a default.
pub struct TableScorer {
    scores: HashMap<TTree, f64>,
    default: f64,
}

impl TableScorer {
    pub fn new(default: f64) -> Self {
        Self {
            scores: HashMap::new(),
            default,
        }
    }

    pub fn set(&mut self, tree: TTree, score: f64) {
        self.scores.insert(tree, score);
    }
}

impl TreeScorer for TableScorer {
    fn score_tree(&self, tree: &TTree, _da: &Da) -> Result<f64, PlannerError> {
        Ok(self.scores.get(tree).copied().unwrap_or(self.default))
    }
}

/// Always fails; for checking error propagation.
pub struct FailingScorer;

impl TreeScorer for FailingScorer {
    fn score_tree(&self, _tree: &TTree, _da: &Da) -> Result<f64, PlannerError> {
        Err(PlannerError::Scorer(anyhow::anyhow!("mock scorer failure")))
    }
}

// ---------------------------------------------------------------------------
// MockSampler
// ---------------------------------------------------------------------------

/// Returns canned trees in rotation and counts calls.
pub struct MockSampler {
    trees: Vec<TTree>,
    calls: Arc<AtomicUsize>,
}

impl MockSampler {
    /// Panics if `trees` is empty.
    pub fn new(trees: Vec<TTree>) -> Self {
        assert!(!trees.is_empty(), "MockSampler needs at least one tree");
        Self {
            trees,
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Shared call counter, readable after the sampler is boxed away.
    pub fn calls(&self) -> Arc<AtomicUsize> {
        Arc::clone(&self.calls)
    }
}

impl TreeSampler for MockSampler {
    fn generate_tree(&mut self, _da: &Da) -> Result<TTree, PlannerError> {
        let n = self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.trees[n % self.trees.len()].clone())
    }
}

// ---------------------------------------------------------------------------
// MockSearch
// ---------------------------------------------------------------------------

/// Returns the same closed list for every DA, ignoring the scorer and limits.
pub struct MockSearch {
    closed: Vec<(TTree, f64)>,
    runs: Arc<AtomicUsize>,
}

impl MockSearch {
    pub fn new(closed: Vec<(TTree, f64)>) -> Self {
        Self {
            closed,
            runs: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn runs(&self) -> Arc<AtomicUsize> {
        Arc::clone(&self.runs)
    }
}

impl TreeSearch for MockSearch {
    fn run(
        &self,
        _da: &Da,
        _scorer: &dyn TreeScorer,
        max_iter: usize,
        _max_defic_iter: usize,
        _beam_size: Option<usize>,
    ) -> Result<SearchLists, PlannerError> {
        self.runs.fetch_add(1, Ordering::SeqCst);
        Ok(SearchLists {
            open: Vec::new(),
            closed: self.closed.clone(),
            stats: SearchStats {
                iterations: self.closed.len().min(max_iter),
                defic_iterations: 0,
                trees_scored: self.closed.len(),
                peak_open_size: 0,
                stop: StopReason::MaxIter,
            },
        })
    }
}

/// A [`MockSearch`] that also scores a fixed watched tree through the injected
/// scorer on every run, keeping each score.
pub struct RecordingSearch {
    inner: MockSearch,
    watched: TTree,
    seen: Arc<Mutex<Vec<f64>>>,
}

impl RecordingSearch {
    pub fn new(closed: Vec<(TTree, f64)>, watched: TTree) -> Self {
        Self {
            inner: MockSearch::new(closed),
            watched,
            seen: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Scores of the watched tree, one per run.
    pub fn seen(&self) -> Arc<Mutex<Vec<f64>>> {
        Arc::clone(&self.seen)
    }
}

impl TreeSearch for RecordingSearch {
    fn run(
        &self,
        da: &Da,
        scorer: &dyn TreeScorer,
        max_iter: usize,
        max_defic_iter: usize,
        beam_size: Option<usize>,
    ) -> Result<SearchLists, PlannerError> {
        let score = scorer.score_tree(&self.watched, da)?;
        self.seen.lock().expect("recording lock poisoned").push(score);
        self.inner.run(da, scorer, max_iter, max_defic_iter, beam_size)
    }
}
