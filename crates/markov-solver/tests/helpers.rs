//! Shared test helpers for the markov-solver integration test suite.
//!
//! Provides deterministic random model generators, a dense matrix-power
//! reference, exact rational constructors and floating-point comparison
//! utilities used across all test modules.

#![allow(dead_code)]

use markov_solver::types::{SparseChain, SparseNondet};
use num_bigint::BigInt;
use num_rational::BigRational;

// ---------------------------------------------------------------------------
// Random number generator (simple LCG for deterministic reproducibility)
// ---------------------------------------------------------------------------

/// A minimal linear congruential generator for deterministic test data.
pub struct Lcg {
    state: u64,
}

impl Lcg {
    pub fn new(seed: u64) -> Self {
        Self { state: seed }
    }

    pub fn next_u64(&mut self) -> u64 {
        self.state = self
            .state
            .wrapping_mul(6364136223846793005)
            .wrapping_add(1442695040888963407);
        self.state
    }

    /// Uniform f64 in [0, 1).
    pub fn next_f64(&mut self) -> f64 {
        (self.next_u64() >> 11) as f64 / (1u64 << 53) as f64
    }

    /// Uniform index in [0, n).
    pub fn next_index(&mut self, n: usize) -> usize {
        (self.next_u64() >> 33) as usize % n
    }
}

// ---------------------------------------------------------------------------
// Model generators
// ---------------------------------------------------------------------------

/// One stochastic row with up to `degree` distinct successors.
fn random_distribution(rng: &mut Lcg, n: usize, degree: usize) -> Vec<(usize, f64)> {
    let mut succs: Vec<usize> = (0..degree.max(1)).map(|_| rng.next_index(n)).collect();
    succs.sort_unstable();
    succs.dedup();
    let raw: Vec<f64> = succs.iter().map(|_| 0.1 + rng.next_f64()).collect();
    let total: f64 = raw.iter().sum();
    succs.into_iter().zip(raw).map(|(s, w)| (s, w / total)).collect()
}

/// Rows of a random stochastic chain over `n` states.
pub fn random_chain_rows(n: usize, degree: usize, seed: u64) -> Vec<Vec<(usize, f64)>> {
    let mut rng = Lcg::new(seed);
    (0..n).map(|_| random_distribution(&mut rng, n, degree)).collect()
}

/// A random stochastic chain over `n` states.
pub fn random_chain(n: usize, degree: usize, seed: u64) -> SparseChain<f64> {
    SparseChain::from_rows(random_chain_rows(n, degree, seed)).unwrap()
}

/// A random MDP over `n` states with 1..=`max_choices` choices per state.
pub fn random_mdp(n: usize, max_choices: usize, degree: usize, seed: u64) -> SparseNondet<f64> {
    let mut rng = Lcg::new(seed);
    let states = (0..n)
        .map(|_| {
            let k = 1 + rng.next_index(max_choices);
            (0..k).map(|_| random_distribution(&mut rng, n, degree)).collect()
        })
        .collect();
    SparseNondet::from_choices(states).unwrap()
}

/// A random CTMC over `n` states with rates in [0.5, 3.5).
pub fn random_ctmc_rows(n: usize, degree: usize, seed: u64) -> Vec<Vec<(usize, f64)>> {
    let mut rng = Lcg::new(seed);
    (0..n)
        .map(|_| {
            let mut row: Vec<(usize, f64)> = (0..degree)
                .map(|_| (rng.next_index(n), 0.5 + 3.0 * rng.next_f64()))
                .collect();
            row.sort_by_key(|&(s, _)| s);
            row.dedup_by_key(|&mut (s, _)| s);
            row
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Dense references
// ---------------------------------------------------------------------------

/// Dense row-major matrix from successor rows.
pub fn dense(rows: &[Vec<(usize, f64)>]) -> Vec<Vec<f64>> {
    let n = rows.len();
    let mut m = vec![vec![0.0; n]; n];
    for (i, row) in rows.iter().enumerate() {
        for &(j, w) in row {
            m[i][j] += w;
        }
    }
    m
}

/// Dense matrix product.
pub fn mat_mul(a: &[Vec<f64>], b: &[Vec<f64>]) -> Vec<Vec<f64>> {
    let n = a.len();
    let mut c = vec![vec![0.0; n]; n];
    for i in 0..n {
        for k in 0..n {
            if a[i][k] == 0.0 {
                continue;
            }
            for j in 0..n {
                c[i][j] += a[i][k] * b[k][j];
            }
        }
    }
    c
}

/// `P^k · values` computed through an explicit matrix power.
pub fn matrix_power_apply(rows: &[Vec<(usize, f64)>], values: &[f64], k: usize) -> Vec<f64> {
    let p = dense(rows);
    let n = p.len();
    let mut power: Vec<Vec<f64>> = (0..n)
        .map(|i| (0..n).map(|j| if i == j { 1.0 } else { 0.0 }).collect())
        .collect();
    for _ in 0..k {
        power = mat_mul(&power, &p);
    }
    power
        .iter()
        .map(|row| row.iter().zip(values).map(|(a, b)| a * b).sum())
        .collect()
}

/// Largest absolute entry-wise difference.
pub fn max_abs_diff(a: &[f64], b: &[f64]) -> f64 {
    assert_eq!(a.len(), b.len(), "length mismatch");
    a.iter()
        .zip(b)
        .map(|(x, y)| (x - y).abs())
        .fold(0.0, f64::max)
}

// ---------------------------------------------------------------------------
// Exact rationals
// ---------------------------------------------------------------------------

/// The rational `num / den`.
pub fn q(num: i64, den: i64) -> BigRational {
    BigRational::new(BigInt::from(num), BigInt::from(den))
}

/// Convert a chain's rows to exact rationals with denominator `den`.
pub fn rational_rows(rows: &[Vec<(usize, i64)>], den: i64) -> Vec<Vec<(usize, BigRational)>> {
    rows.iter()
        .map(|row| row.iter().map(|&(s, n)| (s, q(n, den))).collect())
        .collect()
}
