//! Individual feature functions.
//!
//! Each function returns local keys only; the empty key marks a scalar
//! feature. The technical root never counts as a node, but it does appear as
//! the head of dependencies hanging directly under it.

use std::collections::BTreeMap;

use ttree::{Da, TTree};

use crate::template::Attr;
use crate::FeatureMap;

fn scalar(value: f64) -> FeatureMap {
    BTreeMap::from([(String::new(), value)])
}

fn node_label(tree: &TTree, idx: usize, attrs: &[Attr]) -> String {
    let node = tree.node(idx);
    attrs
        .iter()
        .map(|attr| match attr {
            Attr::TLemma => node.t_lemma.clone(),
            Attr::Formeme => node.formeme.clone(),
            Attr::NumChildren => tree.children(idx).len().to_string(),
        })
        .collect::<Vec<_>>()
        .join("/")
}

/// Occurrences beyond the first of every repeated key.
fn surplus(keys: impl IntoIterator<Item = String>) -> usize {
    let mut counts: BTreeMap<String, usize> = BTreeMap::new();
    for key in keys {
        *counts.entry(key).or_default() += 1;
    }
    counts.values().map(|c| c - 1).sum()
}

fn presence_of(keys: impl IntoIterator<Item = String>) -> FeatureMap {
    keys.into_iter().map(|k| (k, 1.0)).collect()
}

pub fn bias() -> FeatureMap {
    scalar(1.0)
}

pub fn depth(tree: &TTree) -> FeatureMap {
    scalar(tree.depth() as f64)
}

pub fn tree_size(tree: &TTree) -> FeatureMap {
    scalar(tree.size() as f64)
}

pub fn max_children(tree: &TTree) -> FeatureMap {
    scalar(tree.max_children() as f64)
}

/// Real nodes per DA item; an empty DA counts as one item.
pub fn nodes_per_dai(tree: &TTree, da: &Da) -> FeatureMap {
    scalar(tree.size() as f64 / da.len().max(1) as f64)
}

/// Surplus occurrences of repeated `t_lemma/formeme` nodes.
pub fn rep_nodes(tree: &TTree) -> FeatureMap {
    scalar(surplus(tree.nodes()[1..].iter().map(|n| n.key())) as f64)
}

/// Repeated nodes relative to repeated DA items, smoothed by 0.1 on both
/// sides so a tree without repeats for a DA without repeats scores 1.
pub fn rep_nodes_per_rep_dai(tree: &TTree, da: &Da) -> FeatureMap {
    let nodes = surplus(tree.nodes()[1..].iter().map(|n| n.key())) as f64;
    let dais = surplus(da.iter().map(|dai| dai.to_string())) as f64;
    scalar((nodes + 0.1) / (dais + 0.1))
}

/// Node labels present in the tree.
pub fn presence(tree: &TTree, attrs: &[Attr]) -> FeatureMap {
    presence_of((1..tree.len()).map(|i| node_label(tree, i, attrs)))
}

/// Node labels occurring more than once.
pub fn repeated(tree: &TTree, attrs: &[Attr]) -> FeatureMap {
    let mut counts: BTreeMap<String, usize> = BTreeMap::new();
    for i in 1..tree.len() {
        *counts.entry(node_label(tree, i, attrs)).or_default() += 1;
    }
    presence_of(counts.into_iter().filter(|(_, c)| *c > 1).map(|(k, _)| k))
}

/// Head->dependent label pairs.
pub fn dependency(tree: &TTree, attrs: &[Attr]) -> FeatureMap {
    presence_of(tree.edges().map(|(p, c)| {
        format!("{}->{}", node_label(tree, p, attrs), node_label(tree, c, attrs))
    }))
}

/// Head->dependent pairs with the side the dependent sits on.
pub fn dir_dependency(tree: &TTree, attrs: &[Attr]) -> FeatureMap {
    presence_of(tree.edges().map(|(p, c)| {
        let dir = if c < p { "L" } else { "R" };
        format!(
            "{}-{}->{}",
            node_label(tree, p, attrs),
            dir,
            node_label(tree, c, attrs)
        )
    }))
}

/// Ordered pairs of children sharing a parent.
pub fn siblings(tree: &TTree, attrs: &[Attr]) -> FeatureMap {
    let mut keys = Vec::new();
    for parent in 0..tree.len() {
        let children = tree.children(parent);
        for (i, &a) in children.iter().enumerate() {
            for &b in &children[i + 1..] {
                keys.push(format!(
                    "{}~{}",
                    node_label(tree, a, attrs),
                    node_label(tree, b, attrs)
                ));
            }
        }
    }
    presence_of(keys)
}

/// Surface-adjacent node pairs.
pub fn bigrams(tree: &TTree, attrs: &[Attr]) -> FeatureMap {
    presence_of((2..tree.len()).map(|i| {
        format!(
            "{}|{}",
            node_label(tree, i - 1, attrs),
            node_label(tree, i, attrs)
        )
    }))
}

/// Full DA items, values included.
pub fn dai_presence(da: &Da) -> FeatureMap {
    presence_of(da.iter().map(|dai| dai.to_string()))
}

/// DA items without values.
pub fn slot_presence(da: &Da) -> FeatureMap {
    presence_of(da.iter().map(|dai| dai.slot_key()))
}

/// DA items without values occurring more than once.
pub fn slot_repeated(da: &Da) -> FeatureMap {
    let mut counts: BTreeMap<String, usize> = BTreeMap::new();
    for dai in da.iter() {
        *counts.entry(dai.slot_key()).or_default() += 1;
    }
    presence_of(counts.into_iter().filter(|(_, c)| *c > 1).map(|(k, _)| k))
}

/// Cartesian product of two feature maps, multiplying values.
pub fn combine(left: &FeatureMap, right: &FeatureMap) -> FeatureMap {
    let mut out = FeatureMap::new();
    for (lk, lv) in left {
        for (rk, rv) in right {
            out.insert(format!("{lk}+{rk}"), lv * rv);
        }
    }
    out
}

/// Entries of `left` whose key is absent from `right`.
pub fn set_difference(left: &FeatureMap, right: &FeatureMap) -> FeatureMap {
    left.iter()
        .filter(|(key, _)| !right.contains_key(*key))
        .map(|(key, value)| (key.clone(), *value))
        .collect()
}
