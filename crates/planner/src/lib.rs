//! Candidate tree generation for the reranker.
//!
//! A [`CandidateGenerator`] model learned from a corpus proposes one-node
//! expansions of partial trees. Two planners turn it into full candidates:
//! [`SamplingPlanner`] draws trees at random, [`ASearchPlanner`] runs a
//! best-first search whose priorities come from an injected [`TreeScorer`].
//! Both sit behind traits ([`TreeSampler`], [`TreeSearch`]) so callers can be
//! tested with the canned implementations in [`mocks`].

pub mod asearch;
pub mod candgen;
pub mod mocks;
pub mod node;
pub mod sampling;

pub use asearch::{
    ASearchPlanner, PlannerError, SearchLists, SearchStats, StopReason, TreeScorer, TreeSearch,
};
pub use candgen::{CandidateGenerator, ChildType, Expansion, FuturePromiseType};
pub use node::ScoredTree;
pub use sampling::{SamplingPlanner, TreeSampler};
