//! Generic kernels for nondeterministic graphs (MDPs).
//!
//! Each state takes the minimum or maximum over its choices of the choice
//! value `cumul[c] + Σ w · present[succ]` (successor terms scaled by
//! `discount` when one is given). Rewards are indexed by choice, not by
//! state. The sweep drivers are shared with the chain kernels.

use tracing::instrument;

use crate::config::StopCriterion;
use crate::error::SolverError;
use crate::events::ProgressSink;
use crate::field::Field;
use crate::kernels::{bounded_steps, gauss_seidel_sweeps, jacobi_sweeps, weighted_sum};
use crate::types::SparseNondet;

/// Optimised value of state `s` over its choices.
///
/// The aggregate is seeded with the first choice's value, so fields with no
/// representable infinity work unchanged.
#[inline]
fn optimise<F: Field>(
    graph: &SparseNondet<F>,
    s: usize,
    present: &[F],
    cumul: Option<&[F]>,
    discount: Option<&F>,
    min: bool,
) -> F {
    let mut best: Option<F> = None;
    for c in graph.choices(s) {
        let value = weighted_sum(
            graph.choice_successors(c),
            present,
            cumul.map(|r| &r[c]),
            discount,
        );
        best = Some(match best {
            None => value,
            Some(b) if min => Field::minimum(b, value),
            Some(b) => Field::maximum(b, value),
        });
    }
    // Validated graphs give every state at least one choice.
    best.unwrap_or_else(F::zero)
}

/// Unbounded Jacobi value iteration on an MDP.
#[instrument(skip(graph, values, cumul, sink), fields(n = graph.num_states(), choices = graph.num_choices()))]
pub fn unbounded_jacobi<F: Field>(
    graph: &SparseNondet<F>,
    values: &mut Vec<F>,
    cumul: Option<&[F]>,
    min: bool,
    criterion: StopCriterion,
    tolerance: f64,
    sink: &mut dyn ProgressSink,
) -> Result<usize, SolverError> {
    debug_assert_eq!(values.len(), graph.num_states());
    debug_assert!(cumul.map_or(true, |c| c.len() == graph.num_choices()));
    jacobi_sweeps(values, criterion, tolerance, sink, |s, present| {
        optimise(graph, s, present, cumul, None, min)
    })
}

/// Unbounded Gauss-Seidel value iteration on an MDP.
#[instrument(skip(graph, values, cumul, sink), fields(n = graph.num_states(), choices = graph.num_choices()))]
pub fn unbounded_gauss_seidel<F: Field>(
    graph: &SparseNondet<F>,
    values: &mut [F],
    cumul: Option<&[F]>,
    min: bool,
    criterion: StopCriterion,
    tolerance: f64,
    sink: &mut dyn ProgressSink,
) -> Result<usize, SolverError> {
    debug_assert_eq!(values.len(), graph.num_states());
    debug_assert!(cumul.map_or(true, |c| c.len() == graph.num_choices()));
    gauss_seidel_sweeps(values, criterion, tolerance, sink, |s, present| {
        optimise(graph, s, present, cumul, None, min)
    })
}

/// Exactly `steps` Jacobi value-iteration sweeps on an MDP.
#[instrument(skip(graph, values, cumul, discount, sink), fields(n = graph.num_states()))]
pub fn bounded<F: Field>(
    graph: &SparseNondet<F>,
    values: &mut Vec<F>,
    steps: usize,
    cumul: Option<&[F]>,
    discount: Option<&F>,
    min: bool,
    sink: &mut dyn ProgressSink,
) -> usize {
    debug_assert_eq!(values.len(), graph.num_states());
    bounded_steps(values, steps, sink, |s, present| {
        optimise(graph, s, present, cumul, discount, min)
    })
}
