//! Property-based tests using proptest.
//!
//! Random chains and MDPs are drawn from a seed so failures shrink to a
//! small state count and a reproducible structure.

mod helpers;

use proptest::prelude::*;

use markov_solver::config::{IterationMethod, SolverConfig};
use markov_solver::objective::{Measure, Objective};
use markov_solver::preprocess::GraphPreprocessor;
use markov_solver::solver::GraphSolver;
use markov_solver::types::{ModelGraph, SparseChain, StateSet};

use helpers::{max_abs_diff, random_chain_rows, random_mdp};

fn model_strategy() -> impl Strategy<Value = (usize, u64)> {
    (2usize..24, any::<u64>())
}

fn subset(n: usize, mask: u32) -> StateSet {
    StateSet::from_indices(n, (0..n).filter(|s| mask & (1 << (s % 32)) != 0)).unwrap()
}

fn solve(solver: &GraphSolver, model: &ModelGraph<f64>, measure: Measure<f64>) -> Vec<f64> {
    let mut objective = Objective::new(measure);
    solver.solve(model, &mut objective).unwrap();
    objective.take_result().unwrap()
}

proptest! {
    // Seeding into iteration order and projecting back is the identity on
    // retained states, and the two directions of the map agree.
    #[test]
    fn index_map_round_trips(
        (n, seed) in model_strategy(),
        initial in 1u32..,
        sinks in any::<u32>(),
        reorder in any::<bool>(),
    ) {
        let initial_set = subset(n, initial | 1);
        let model = ModelGraph::dtmc(SparseChain::from_rows(random_chain_rows(n, 2, seed)).unwrap())
            .with_initial_states(initial_set.clone())
            .unwrap();
        let prepared = GraphPreprocessor::new(&model)
            .add_sinks(&subset(n, sinks))
            .reorder(reorder)
            .build()
            .unwrap();
        let map = &prepared.index_map;

        for s in initial_set.iter() {
            prop_assert!(map.output(s).is_some(), "initial state {} dropped", s);
        }
        for i in 0..map.num_retained() {
            let orig = map.input_of(i).unwrap();
            prop_assert_eq!(map.output(orig), Some(i));
        }

        let values: Vec<f64> = (0..n).map(|s| s as f64).collect();
        let expected: Vec<f64> = (0..n)
            .filter(|&s| map.output(s).is_some())
            .map(|s| s as f64)
            .collect();
        prop_assert_eq!(map.project(&map.seed(&values)), expected);
        prop_assert_eq!(prepared.graph.num_states(), map.num_retained());
    }

    // Both sweep disciplines converge to the same reachability values.
    #[test]
    fn jacobi_matches_gauss_seidel((n, seed) in model_strategy(), targets in 1u32..) {
        let model = ModelGraph::dtmc(SparseChain::from_rows(random_chain_rows(n, 3, seed)).unwrap());
        let target = subset(n, targets);
        let measure = || Measure::UnboundedReachability {
            target: target.clone(),
            zero_set: None,
            min: false,
        };
        let config = |method| SolverConfig { method, tolerance: 1e-12, ..Default::default() };
        let jacobi = solve(&GraphSolver::new(config(IterationMethod::Jacobi)), &model, measure());
        let gs = solve(&GraphSolver::new(config(IterationMethod::GaussSeidel)), &model, measure());
        prop_assert!(max_abs_diff(&jacobi, &gs) < 1e-6);
    }

    // Bounded reachability probabilities grow with the bound and stay in
    // [0, 1]; max dominates min on MDPs.
    #[test]
    fn bounded_mdp_reachability_is_ordered(
        (n, seed) in model_strategy(),
        targets in 1u32..,
        steps in 0usize..12,
    ) {
        let model = ModelGraph::mdp(random_mdp(n, 3, 2, seed));
        let target = subset(n, targets);
        let solver = GraphSolver::default();
        let run = |time: usize, min: bool| solve(&solver, &model, Measure::BoundedReachability {
            target: target.clone(),
            zero_set: None,
            time: time as f64,
            min,
        });
        let lo = run(steps, true);
        let hi = run(steps, false);
        let hi_next = run(steps + 1, false);
        for s in 0..n {
            prop_assert!(lo[s] <= hi[s] + 1e-12);
            prop_assert!(hi[s] <= hi_next[s] + 1e-12);
            prop_assert!((0.0..=1.0 + 1e-12).contains(&hi_next[s]));
        }
    }

    // k steps of non-negative rewards accumulate at most k times the
    // largest reward.
    #[test]
    fn cumulative_reward_is_bounded(
        (n, seed) in model_strategy(),
        steps in 0usize..20,
        rewards in prop::collection::vec(0.0f64..10.0, 24),
    ) {
        let model = ModelGraph::dtmc(SparseChain::from_rows(random_chain_rows(n, 3, seed)).unwrap());
        let rewards = rewards[..n].to_vec();
        let max = rewards.iter().copied().fold(0.0, f64::max);
        let result = solve(&GraphSolver::default(), &model, Measure::BoundedCumulative {
            time: steps as f64,
            state_rewards: rewards,
            min: false,
        });
        for v in result {
            prop_assert!(v >= 0.0);
            prop_assert!(v <= steps as f64 * max * (1.0 + 1e-12) + 1e-12);
        }
    }
}
