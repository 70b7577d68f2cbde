//! Data model for the tree reranker: dialogue acts, t-trees and the
//! JSON corpus documents they are loaded from.
//!
//! # Key types
//!
//! - [`Da`] / [`Dai`]: dialogue act and its items, parsed from `inform(food=Chinese)&...`
//! - [`TTree`] / [`NodeData`]: dependency tree stored as a flat arena with parent links
//! - [`TreeDocument`]: bundles of language/selector zones holding one t-tree each

pub mod corpus;
pub mod da;
pub mod tree;

pub use corpus::{
    read_das, read_ttrees, sentences_from_doc, trees_from_doc, write_ttrees, Bundle, CorpusError,
    TreeDocument, Zone,
};
pub use da::{Da, Dai};
pub use tree::{NodeData, TTree};
