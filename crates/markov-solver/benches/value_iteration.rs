//! Benchmarks for the value-iteration kernels.
//!
//! Compares Jacobi and Gauss-Seidel sweeps, and the native `f64` kernels
//! against the generic field kernels, on random chains and MDPs.

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use std::time::Duration;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use markov_solver::config::{IterationMethod, SolverConfig};
use markov_solver::objective::{Measure, Objective};
use markov_solver::solver::GraphSolver;
use markov_solver::types::{ModelGraph, SparseChain, SparseNondet, StateSet};

// ---------------------------------------------------------------------------
// Helpers: deterministic random models
// ---------------------------------------------------------------------------

/// One distribution over `degree` random successors.
fn random_distribution(rng: &mut StdRng, n: usize, degree: usize) -> Vec<(usize, f64)> {
    let mut succs: Vec<usize> = (0..degree).map(|_| rng.gen_range(0..n)).collect();
    succs.sort_unstable();
    succs.dedup();
    let raw: Vec<f64> = succs.iter().map(|_| rng.gen_range(0.1..1.0)).collect();
    let total: f64 = raw.iter().sum();
    succs.into_iter().zip(raw).map(|(s, w)| (s, w / total)).collect()
}

fn random_chain(n: usize, degree: usize, seed: u64) -> SparseChain<f64> {
    let mut rng = StdRng::seed_from_u64(seed);
    let rows = (0..n).map(|_| random_distribution(&mut rng, n, degree)).collect();
    SparseChain::from_rows(rows).expect("random chain is well formed")
}

fn random_mdp(n: usize, choices: usize, degree: usize, seed: u64) -> SparseNondet<f64> {
    let mut rng = StdRng::seed_from_u64(seed);
    let states = (0..n)
        .map(|_| {
            let k = rng.gen_range(1..=choices);
            (0..k).map(|_| random_distribution(&mut rng, n, degree)).collect()
        })
        .collect();
    SparseNondet::from_choices(states).expect("random mdp is well formed")
}

/// Roughly 1% of the states, chosen at random.
fn random_target(n: usize, seed: u64) -> StateSet {
    let mut rng = StdRng::seed_from_u64(seed);
    StateSet::from_indices(n, (0..n / 100 + 1).map(|_| rng.gen_range(0..n)))
        .expect("indices are in range")
}

fn reachability(target: &StateSet, min: bool) -> Objective<f64> {
    Objective::new(Measure::UnboundedReachability {
        target: target.clone(),
        zero_set: None,
        min,
    })
}

fn solver(method: IterationMethod, use_native: bool) -> GraphSolver {
    GraphSolver::new(SolverConfig {
        method,
        use_native,
        tolerance: 1e-8,
        ..Default::default()
    })
}

// ---------------------------------------------------------------------------
// Chain: unbounded reachability
// ---------------------------------------------------------------------------

fn chain_unbounded(c: &mut Criterion) {
    let mut group = c.benchmark_group("chain_unbounded");
    group.warm_up_time(Duration::from_secs(2));
    group.sample_size(20);

    for n in [1_000, 10_000, 100_000] {
        let model = ModelGraph::dtmc(random_chain(n, 4, 42));
        let target = random_target(n, 43);
        group.throughput(Throughput::Elements(model.graph().num_transitions() as u64));

        for (label, method, native) in [
            ("jacobi_native", IterationMethod::Jacobi, true),
            ("gauss_seidel_native", IterationMethod::GaussSeidel, true),
            ("jacobi_generic", IterationMethod::Jacobi, false),
            ("gauss_seidel_generic", IterationMethod::GaussSeidel, false),
        ] {
            let solver = solver(method, native);
            group.bench_with_input(BenchmarkId::new(label, n), &n, |b, _| {
                b.iter(|| {
                    let mut objective = reachability(&target, false);
                    solver
                        .solve(criterion::black_box(&model), &mut objective)
                        .expect("solve succeeds");
                    objective
                });
            });
        }
    }
    group.finish();
}

// ---------------------------------------------------------------------------
// Chain: bounded cumulative reward
// ---------------------------------------------------------------------------

fn chain_bounded(c: &mut Criterion) {
    let mut group = c.benchmark_group("chain_bounded");
    group.warm_up_time(Duration::from_secs(2));
    group.sample_size(20);

    let steps = 100;
    for n in [1_000, 10_000, 100_000] {
        let model = ModelGraph::dtmc(random_chain(n, 4, 44));
        let mut rng = StdRng::seed_from_u64(45);
        let rewards: Vec<f64> = (0..n).map(|_| rng.gen_range(0.0..1.0)).collect();
        group.throughput(Throughput::Elements(
            (model.graph().num_transitions() * steps) as u64,
        ));

        for (label, native) in [("native", true), ("generic", false)] {
            let solver = solver(IterationMethod::Jacobi, native);
            group.bench_with_input(BenchmarkId::new(label, n), &n, |b, _| {
                b.iter(|| {
                    let mut objective = Objective::new(Measure::BoundedCumulativeDiscounted {
                        time: steps as f64,
                        discount: 0.95,
                        state_rewards: rewards.clone(),
                        min: false,
                    });
                    solver
                        .solve(criterion::black_box(&model), &mut objective)
                        .expect("solve succeeds");
                    objective
                });
            });
        }
    }
    group.finish();
}

// ---------------------------------------------------------------------------
// MDP: min/max value iteration
// ---------------------------------------------------------------------------

fn mdp_unbounded(c: &mut Criterion) {
    let mut group = c.benchmark_group("mdp_unbounded");
    group.warm_up_time(Duration::from_secs(2));
    group.sample_size(20);

    for n in [1_000, 10_000, 50_000] {
        let model = ModelGraph::mdp(random_mdp(n, 3, 3, 46));
        let target = random_target(n, 47);
        group.throughput(Throughput::Elements(model.graph().num_transitions() as u64));

        for (label, method, min) in [
            ("jacobi_max", IterationMethod::Jacobi, false),
            ("gauss_seidel_max", IterationMethod::GaussSeidel, false),
            ("gauss_seidel_min", IterationMethod::GaussSeidel, true),
        ] {
            let solver = solver(method, true);
            group.bench_with_input(BenchmarkId::new(label, n), &n, |b, _| {
                b.iter(|| {
                    let mut objective = reachability(&target, min);
                    solver
                        .solve(criterion::black_box(&model), &mut objective)
                        .expect("solve succeeds");
                    objective
                });
            });
        }
    }
    group.finish();
}

criterion_group!(value_iteration, chain_unbounded, chain_bounded, mdp_unbounded);
criterion_main!(value_iteration);
