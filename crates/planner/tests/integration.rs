//! End-to-end planner tests: train a candidate generator, persist it, and
//! search with a scorer that prefers the reference tree.

use std::sync::Arc;

use planner::mocks::{restaurant_corpus, FailingScorer, TableScorer};
use planner::{
    ASearchPlanner, CandidateGenerator, PlannerError, SamplingPlanner, TreeSampler, TreeSearch,
};
use ttree::TTree;

fn trained_candgen() -> Arc<CandidateGenerator> {
    let (das, trees) = restaurant_corpus();
    let tmp = tempfile::TempDir::new().unwrap();
    let path = tmp.path().join("candgen.json");
    CandidateGenerator::train(&das, &trees)
        .unwrap()
        .save_model(&path)
        .unwrap();
    Arc::new(CandidateGenerator::load_model(&path).unwrap())
}

/// Scores each prefix of `gold` by how much of it is built, so the search
/// is guided straight to it.
fn guiding_scorer(gold: &TTree) -> TableScorer {
    let mut scorer = TableScorer::new(-1.0);
    let mut partial = TTree::new();
    scorer.set(partial.clone(), 0.0);
    // serve, X-name, food, Chinese
    let serve = partial.create_child(0, true, gold.node(2).clone());
    scorer.set(partial.clone(), 1.0);
    partial.create_child(serve, false, gold.node(1).clone());
    // the left child shifts its parent one slot right
    let serve = serve + 1;
    scorer.set(partial.clone(), 2.0);
    let food = partial.create_child(serve, true, gold.node(4).clone());
    scorer.set(partial.clone(), 3.0);
    partial.create_child(food, false, gold.node(3).clone());
    scorer.set(partial.clone(), 4.0);
    assert_eq!(&partial, gold);
    scorer
}

#[test]
fn test_search_reaches_reference_tree() {
    let (das, trees) = restaurant_corpus();
    let planner = ASearchPlanner::new(trained_candgen());
    let scorer = guiding_scorer(&trees[0]);

    let lists = planner.run(&das[0], &scorer, 5, 3, None).unwrap();
    assert_eq!(lists.closed.len(), 5);
    assert_eq!(lists.closed.last().unwrap().0, trees[0]);
    assert_eq!(lists.best_closed().unwrap().0, trees[0]);
    assert_eq!(lists.best_closed().unwrap().1, -4.0);
}

#[test]
fn test_scorer_errors_propagate() {
    let (das, _) = restaurant_corpus();
    let planner = ASearchPlanner::new(trained_candgen());
    let err = planner.run(&das[0], &FailingScorer, 5, 3, None).unwrap_err();
    assert!(matches!(err, PlannerError::Scorer(_)));
}

#[test]
fn test_sampler_only_uses_allowed_nodes() {
    let (das, _) = restaurant_corpus();
    let candgen = trained_candgen();
    let allowed: Vec<String> = candgen
        .allowed_nodes(&das[3])
        .into_iter()
        .map(str::to_string)
        .collect();
    let mut sampler = SamplingPlanner::from_seed(candgen, Some(5));
    for _ in 0..10 {
        let tree = sampler.generate_tree(&das[3]).unwrap();
        for node in &tree.nodes()[1..] {
            assert!(allowed.contains(&node.key()));
        }
    }
}
