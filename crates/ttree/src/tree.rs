//! Dependency trees (t-trees) stored as a flat arena.
//!
//! Node `0` is always the technical root. Every other node references its
//! parent by index, and the arena order is the surface word order.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::corpus::CorpusError;

/// Label used for both attributes of the technical root.
pub const ROOT_LABEL: &str = "<root>";

/// Attributes of a single t-tree node.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NodeData {
    /// Deep lemma (`restaurant`, `be`, `X-name`, ...).
    pub t_lemma: String,
    /// Morphosyntactic form of the node (`n:subj`, `v:fin`, `n:in+X`, ...).
    pub formeme: String,
}

impl NodeData {
    pub fn new(t_lemma: &str, formeme: &str) -> Self {
        Self {
            t_lemma: t_lemma.to_string(),
            formeme: formeme.to_string(),
        }
    }

    /// Data of the technical root node.
    pub fn root() -> Self {
        Self::new(ROOT_LABEL, ROOT_LABEL)
    }

    /// `t_lemma/formeme`, used as a map key by models and features.
    pub fn key(&self) -> String {
        format!("{}/{}", self.t_lemma, self.formeme)
    }
}

impl fmt::Display for NodeData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.t_lemma, self.formeme)
    }
}

/// A t-tree: node arena in surface order plus parent links.
///
/// Equality and hashing are structural, so two independently generated
/// trees with the same nodes in the same order and shape compare equal.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "RawTree", into = "RawTree")]
pub struct TTree {
    nodes: Vec<NodeData>,
    parents: Vec<Option<usize>>,
}

/// Serialized form; validated on the way in.
#[derive(Serialize, Deserialize)]
struct RawTree {
    nodes: Vec<NodeData>,
    parents: Vec<Option<usize>>,
}

impl TryFrom<RawTree> for TTree {
    type Error = CorpusError;

    fn try_from(raw: RawTree) -> Result<Self, Self::Error> {
        TTree::from_parts(raw.nodes, raw.parents)
    }
}

impl From<TTree> for RawTree {
    fn from(tree: TTree) -> Self {
        RawTree {
            nodes: tree.nodes,
            parents: tree.parents,
        }
    }
}

impl Default for TTree {
    fn default() -> Self {
        Self::new()
    }
}

impl TTree {
    /// A tree holding only its technical root.
    pub fn new() -> Self {
        Self {
            nodes: vec![NodeData::root()],
            parents: vec![None],
        }
    }

    /// Build a tree from its arena, checking that the parent links form a
    /// single tree rooted at node 0.
    pub fn from_parts(nodes: Vec<NodeData>, parents: Vec<Option<usize>>) -> Result<Self, CorpusError> {
        let invalid = |msg: String| Err(CorpusError::InvalidTree(msg));
        if nodes.is_empty() {
            return invalid("tree has no root node".to_string());
        }
        if nodes.len() != parents.len() {
            return invalid(format!(
                "{} nodes but {} parent links",
                nodes.len(),
                parents.len()
            ));
        }
        if parents[0].is_some() {
            return invalid("node 0 must be the root".to_string());
        }
        for (idx, parent) in parents.iter().enumerate().skip(1) {
            match parent {
                None => return invalid(format!("node {idx} has no parent")),
                Some(p) if *p >= nodes.len() => {
                    return invalid(format!("node {idx} has out-of-range parent {p}"))
                }
                _ => {}
            }
        }
        let tree = Self { nodes, parents };
        // Every chain of parent links must reach the root without looping.
        for idx in 1..tree.len() {
            let mut current = idx;
            let mut steps = 0;
            while let Some(p) = tree.parents[current] {
                current = p;
                steps += 1;
                if steps > tree.len() {
                    return invalid(format!("cycle through node {idx}"));
                }
            }
        }
        Ok(tree)
    }

    /// Number of nodes, technical root included.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// True when the tree holds nothing but its technical root.
    pub fn is_empty(&self) -> bool {
        self.nodes.len() <= 1
    }

    /// Number of real (non-root) nodes.
    pub fn size(&self) -> usize {
        self.nodes.len() - 1
    }

    pub fn node(&self, idx: usize) -> &NodeData {
        &self.nodes[idx]
    }

    pub fn nodes(&self) -> &[NodeData] {
        &self.nodes
    }

    pub fn parent(&self, idx: usize) -> Option<usize> {
        self.parents[idx]
    }

    /// Children of `idx` in surface order.
    pub fn children(&self, idx: usize) -> Vec<usize> {
        (1..self.len())
            .filter(|&i| self.parents[i] == Some(idx))
            .collect()
    }

    /// `(parent, child)` index pairs for every non-root node, in surface order.
    pub fn edges(&self) -> impl Iterator<Item = (usize, usize)> + '_ {
        (1..self.len()).filter_map(move |i| self.parents[i].map(|p| (p, i)))
    }

    /// Distance of `idx` from the root (root = 0).
    pub fn node_depth(&self, idx: usize) -> usize {
        let mut depth = 0;
        let mut current = idx;
        while let Some(p) = self.parents[current] {
            depth += 1;
            current = p;
        }
        depth
    }

    /// Maximum node depth; 0 for a bare root.
    pub fn depth(&self) -> usize {
        (0..self.len()).map(|i| self.node_depth(i)).max().unwrap_or(0)
    }

    /// Largest number of children attached to a single node.
    pub fn max_children(&self) -> usize {
        let mut counts = vec![0usize; self.len()];
        for (p, _) in self.edges() {
            counts[p] += 1;
        }
        counts.into_iter().max().unwrap_or(0)
    }

    fn is_in_subtree(&self, idx: usize, ancestor: usize) -> bool {
        let mut current = Some(idx);
        while let Some(c) = current {
            if c == ancestor {
                return true;
            }
            current = self.parents[c];
        }
        false
    }

    /// Leftmost and rightmost arena positions covered by the subtree of `idx`.
    fn subtree_span(&self, idx: usize) -> (usize, usize) {
        let mut lo = idx;
        let mut hi = idx;
        for i in 0..self.len() {
            if self.is_in_subtree(i, idx) {
                lo = lo.min(i);
                hi = hi.max(i);
            }
        }
        (lo, hi)
    }

    /// Attach a new child to `parent`, placed immediately left of the
    /// parent's subtree or immediately right of it. Returns the new node's
    /// index; indices of nodes to its right shift by one.
    pub fn create_child(&mut self, parent: usize, right: bool, data: NodeData) -> usize {
        let (lo, hi) = self.subtree_span(parent);
        let pos = if right { hi + 1 } else { lo.max(1) };

        for p in self.parents.iter_mut().flatten() {
            if *p >= pos {
                *p += 1;
            }
        }
        let new_parent = if parent >= pos { parent + 1 } else { parent };
        self.nodes.insert(pos, data);
        self.parents.insert(pos, Some(new_parent));
        pos
    }

    fn fmt_subtree(&self, idx: usize, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}", self.nodes[idx])?;
        for child in self.children(idx) {
            f.write_str(" ")?;
            self.fmt_subtree(child, f)?;
        }
        f.write_str(")")
    }
}

impl fmt::Display for TTree {
    /// Bracketed form without the root: `[(be/v:fin (it/n:subj))]`.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("[")?;
        for (i, child) in self.children(0).into_iter().enumerate() {
            if i > 0 {
                f.write_str(" ")?;
            }
            self.fmt_subtree(child, f)?;
        }
        f.write_str("]")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// "it is good": be/v:fin under root, it/n:subj left, good/adj:compl right.
    fn small_tree() -> TTree {
        let mut tree = TTree::new();
        let be = tree.create_child(0, true, NodeData::new("be", "v:fin"));
        tree.create_child(be, false, NodeData::new("it", "n:subj"));
        let be = 2;
        tree.create_child(be, true, NodeData::new("good", "adj:compl"));
        tree
    }

    #[test]
    fn test_new_tree_is_bare_root() {
        let tree = TTree::new();
        assert_eq!(tree.len(), 1);
        assert!(tree.is_empty());
        assert_eq!(tree.size(), 0);
        assert_eq!(tree.depth(), 0);
        assert_eq!(tree.to_string(), "[]");
    }

    #[test]
    fn test_create_child_orders_nodes() {
        let tree = small_tree();
        let lemmas: Vec<_> = tree.nodes().iter().map(|n| n.t_lemma.as_str()).collect();
        assert_eq!(lemmas, vec![ROOT_LABEL, "it", "be", "good"]);
        assert_eq!(tree.parent(1), Some(2));
        assert_eq!(tree.parent(2), Some(0));
        assert_eq!(tree.parent(3), Some(2));
        assert_eq!(tree.children(2), vec![1, 3]);
    }

    #[test]
    fn test_left_child_of_root_goes_first() {
        let mut tree = small_tree();
        let idx = tree.create_child(0, false, NodeData::new("well", "x"));
        assert_eq!(idx, 1);
        assert_eq!(tree.node(1).t_lemma, "well");
        // Existing links shifted by one.
        assert_eq!(tree.parent(2), Some(3));
        assert_eq!(tree.parent(3), Some(0));
        assert_eq!(tree.parent(4), Some(3));
    }

    #[test]
    fn test_depth_and_max_children() {
        let mut tree = small_tree();
        assert_eq!(tree.depth(), 2);
        assert_eq!(tree.max_children(), 2);
        tree.create_child(3, true, NodeData::new("very", "adv"));
        assert_eq!(tree.depth(), 3);
    }

    #[test]
    fn test_structural_equality() {
        assert_eq!(small_tree(), small_tree());
        let mut other = small_tree();
        other.create_child(0, true, NodeData::new("too", "adv"));
        assert_ne!(small_tree(), other);
    }

    #[test]
    fn test_display() {
        assert_eq!(
            small_tree().to_string(),
            "[(be/v:fin (it/n:subj) (good/adj:compl))]"
        );
    }

    #[test]
    fn test_edges() {
        let edges: Vec<_> = small_tree().edges().collect();
        assert_eq!(edges, vec![(2, 1), (0, 2), (2, 3)]);
    }

    #[test]
    fn test_from_parts_validation() {
        let nodes = vec![NodeData::root(), NodeData::new("a", "x"), NodeData::new("b", "x")];
        assert!(TTree::from_parts(nodes.clone(), vec![None, Some(0), Some(1)]).is_ok());
        assert!(TTree::from_parts(nodes.clone(), vec![None, Some(0)]).is_err());
        assert!(TTree::from_parts(nodes.clone(), vec![Some(0), Some(0), Some(0)]).is_err());
        assert!(TTree::from_parts(nodes.clone(), vec![None, Some(5), Some(0)]).is_err());
        assert!(TTree::from_parts(nodes.clone(), vec![None, Some(2), Some(1)]).is_err());
        assert!(TTree::from_parts(vec![], vec![]).is_err());
    }

    #[test]
    fn test_serde_roundtrip() {
        let tree = small_tree();
        let json = serde_json::to_string(&tree).unwrap();
        let parsed: TTree = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, tree);
    }

    #[test]
    fn test_deserialize_rejects_cycle() {
        let json = r#"{"nodes":[{"t_lemma":"<root>","formeme":"<root>"},{"t_lemma":"a","formeme":"x"},{"t_lemma":"b","formeme":"x"}],"parents":[null,2,1]}"#;
        assert!(serde_json::from_str::<TTree>(json).is_err());
    }
}
