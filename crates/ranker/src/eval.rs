//! Node- and dependency-level precision/recall/F1 of generated trees
//! against gold trees.

use std::collections::BTreeMap;
use std::fmt;

use ttree::TTree;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EvalType {
    /// Nodes matched by `t_lemma/formeme`.
    Node,
    /// Head-dependent pairs of node labels.
    Dep,
}

/// Precision, recall and F1.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Prf {
    pub precision: f64,
    pub recall: f64,
    pub f1: f64,
}

impl fmt::Display for Prf {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "P: {:.4}, R: {:.4}, F: {:.4}",
            self.precision, self.recall, self.f1
        )
    }
}

#[derive(Debug, Clone, Copy, Default)]
struct Counts {
    correct: usize,
    predicted: usize,
    gold: usize,
}

impl Counts {
    fn add(&mut self, gold: BTreeMap<String, usize>, predicted: BTreeMap<String, usize>) {
        self.gold += gold.values().sum::<usize>();
        self.predicted += predicted.values().sum::<usize>();
        self.correct += predicted
            .iter()
            .map(|(key, n)| gold.get(key).map_or(0, |g| (*g).min(*n)))
            .sum::<usize>();
    }

    fn prf(&self) -> Prf {
        let ratio = |num: usize, den: usize| if den == 0 { 0.0 } else { num as f64 / den as f64 };
        let precision = ratio(self.correct, self.predicted);
        let recall = ratio(self.correct, self.gold);
        let f1 = if precision + recall == 0.0 {
            0.0
        } else {
            2.0 * precision * recall / (precision + recall)
        };
        Prf {
            precision,
            recall,
            f1,
        }
    }
}

fn node_bag(tree: &TTree) -> BTreeMap<String, usize> {
    let mut bag = BTreeMap::new();
    for node in &tree.nodes()[1..] {
        *bag.entry(node.key()).or_default() += 1;
    }
    bag
}

fn dep_bag(tree: &TTree) -> BTreeMap<String, usize> {
    let mut bag = BTreeMap::new();
    for (parent, child) in tree.edges() {
        let key = format!("{}->{}", tree.node(parent).key(), tree.node(child).key());
        *bag.entry(key).or_default() += 1;
    }
    bag
}

/// Accumulates matches over a training pass; micro-averaged.
#[derive(Debug, Clone, Default)]
pub struct Evaluator {
    node: Counts,
    dep: Counts,
}

impl Evaluator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }

    pub fn append(&mut self, gold: &TTree, predicted: &TTree) {
        self.node.add(node_bag(gold), node_bag(predicted));
        self.dep.add(dep_bag(gold), dep_bag(predicted));
    }

    /// Scores so far; all zero when nothing matched or nothing was appended.
    pub fn p_r_f1(&self, eval_type: EvalType) -> Prf {
        match eval_type {
            EvalType::Node => self.node.prf(),
            EvalType::Dep => self.dep.prf(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ttree::NodeData;

    fn gold() -> TTree {
        let mut t = TTree::new();
        let be = t.create_child(0, true, NodeData::new("be", "v:fin"));
        t.create_child(be, true, NodeData::new("cheap", "adj:compl"));
        t
    }

    fn predicted() -> TTree {
        let mut t = TTree::new();
        let be = t.create_child(0, true, NodeData::new("be", "v:fin"));
        t.create_child(be, true, NodeData::new("cheap", "adj:compl"));
        t.create_child(be, true, NodeData::new("centre", "n:in+X"));
        t
    }

    #[test]
    fn test_identical_trees_score_one() {
        let mut eval = Evaluator::new();
        eval.append(&gold(), &gold());
        let prf = eval.p_r_f1(EvalType::Node);
        assert_eq!(prf, Prf { precision: 1.0, recall: 1.0, f1: 1.0 });
        assert_eq!(eval.p_r_f1(EvalType::Dep).f1, 1.0);
    }

    #[test]
    fn test_partial_match() {
        let mut eval = Evaluator::new();
        eval.append(&gold(), &predicted());
        let node = eval.p_r_f1(EvalType::Node);
        assert!((node.precision - 2.0 / 3.0).abs() < 1e-12);
        assert_eq!(node.recall, 1.0);
        assert!((node.f1 - 0.8).abs() < 1e-12);
        // <root>->be and be->cheap match; be->centre does not
        let dep = eval.p_r_f1(EvalType::Dep);
        assert!((dep.precision - 2.0 / 3.0).abs() < 1e-12);
        assert_eq!(dep.recall, 1.0);
    }

    #[test]
    fn test_empty_and_reset() {
        let mut eval = Evaluator::new();
        assert_eq!(eval.p_r_f1(EvalType::Node), Prf::default());
        eval.append(&gold(), &TTree::new());
        assert_eq!(eval.p_r_f1(EvalType::Node), Prf::default());
        eval.append(&gold(), &gold());
        assert!(eval.p_r_f1(EvalType::Node).f1 > 0.0);
        eval.reset();
        assert_eq!(eval.p_r_f1(EvalType::Dep), Prf::default());
    }

    #[test]
    fn test_display() {
        let prf = Prf {
            precision: 0.5,
            recall: 0.25,
            f1: 1.0 / 3.0,
        };
        assert_eq!(prf.to_string(), "P: 0.5000, R: 0.2500, F: 0.3333");
    }
}
