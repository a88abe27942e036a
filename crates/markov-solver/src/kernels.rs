//! Generic fixed-point kernels for Markov chains.
//!
//! Every kernel is a pure function over a borrowed graph and a value vector
//! it owns for the duration of the call. The sweep drivers
//! ([`jacobi_sweeps`], [`gauss_seidel_sweeps`], [`bounded_steps`]) are
//! shared with the nondeterministic kernels in [`nondet`](crate::nondet);
//! only the per-state update differs.
//!
//! # Recurrences
//!
//! ```text
//! plain:       next[s] = Σ w · present[succ]
//! cumulative:  next[s] = cumul[s] + Σ w · present[succ]
//! discounted:  next[s] = cumul[s] + Σ (w · present[succ]) · discount
//! ```
//!
//! Unbounded kernels run `do { sweep } while distance > tolerance / 2`.

use tracing::{debug, instrument, warn};

use crate::config::StopCriterion;
use crate::error::SolverError;
use crate::events::{ProgressSink, SolverEvent};
use crate::field::Field;
use crate::types::SparseChain;

// ---------------------------------------------------------------------------
// Convergence measure
// ---------------------------------------------------------------------------

/// Per-sweep difference between consecutive iterates.
///
/// Tracks the largest absolute change and the sup-norm of the previous
/// iterate. Under [`StopCriterion::Relative`] the change is divided by that
/// norm, unless the norm is zero.
///
/// A change that is not a number (`inf - inf`, or a NaN iterate) is never
/// folded into the maximum. The first such state is recorded instead and
/// the measured value becomes infinite, so the sweep cannot converge.
#[derive(Debug, Clone, Copy)]
pub struct Distance {
    criterion: StopCriterion,
    diff: f64,
    norm: f64,
    unstable: Option<usize>,
}

impl Distance {
    pub fn new(criterion: StopCriterion) -> Self {
        Self {
            criterion,
            diff: 0.0,
            norm: 0.0,
            unstable: None,
        }
    }

    /// Record the update of state `s`.
    #[inline]
    pub fn observe<F: Field>(&mut self, s: usize, old: &F, new: &F) {
        self.record(s, old.distance(new), old.magnitude());
    }

    /// Record the update of state `s`, native doubles.
    #[inline]
    pub fn observe_f64(&mut self, s: usize, old: f64, new: f64) {
        self.record(s, (old - new).abs(), old.abs());
    }

    #[inline]
    fn record(&mut self, s: usize, diff: f64, norm: f64) {
        if diff.is_nan() {
            self.unstable.get_or_insert(s);
        } else {
            self.diff = self.diff.max(diff);
        }
        self.norm = self.norm.max(norm);
    }

    /// Combine the measures of two disjoint state ranges.
    #[inline]
    pub fn merge(self, other: Self) -> Self {
        let unstable = match (self.unstable, other.unstable) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => a.or(b),
        };
        Self {
            criterion: self.criterion,
            diff: self.diff.max(other.diff),
            norm: self.norm.max(other.norm),
            unstable,
        }
    }

    /// First state whose change was not a number.
    #[inline]
    pub fn unstable_state(&self) -> Option<usize> {
        self.unstable
    }

    /// The measured difference under the configured criterion.
    #[inline]
    pub fn value(&self) -> f64 {
        if self.unstable.is_some() {
            return f64::INFINITY;
        }
        match self.criterion {
            StopCriterion::Absolute => self.diff,
            StopCriterion::Relative if self.norm != 0.0 => self.diff / self.norm,
            StopCriterion::Relative => self.diff,
        }
    }
}

/// Whether a measured difference satisfies the stopping threshold.
#[inline]
pub fn converged(difference: f64, tolerance: f64) -> bool {
    difference <= tolerance / 2.0
}

/// Fail the sweep if `distance` saw a change that is not a number.
///
/// The reported state is in iteration numbering.
#[inline]
pub(crate) fn check_stable(distance: &Distance, sweep: usize) -> Result<(), SolverError> {
    match distance.unstable_state() {
        Some(state) => {
            warn!(sweep, state, "iterate is no longer finite");
            Err(SolverError::NumericalInstability { sweep, state })
        }
        None => Ok(()),
    }
}

// ---------------------------------------------------------------------------
// Sweep drivers
// ---------------------------------------------------------------------------

/// Run double-buffered sweeps until convergence. Returns the sweep count.
///
/// `update(s, present)` computes the new value of state `s` from the
/// previous iterate.
///
/// # Errors
///
/// [`SolverError::NumericalInstability`] if a sweep produces a change that
/// is not a number.
pub fn jacobi_sweeps<F, U>(
    values: &mut Vec<F>,
    criterion: StopCriterion,
    tolerance: f64,
    sink: &mut dyn ProgressSink,
    update: U,
) -> Result<usize, SolverError>
where
    F: Field,
    U: Fn(usize, &[F]) -> F,
{
    let n = values.len();
    let mut next = values.clone();
    let mut sweep = 0;
    loop {
        let mut distance = Distance::new(criterion);
        for s in 0..n {
            let v = update(s, values);
            distance.observe(s, &values[s], &v);
            next[s] = v;
        }
        std::mem::swap(values, &mut next);
        sweep += 1;

        let difference = distance.value();
        debug!(sweep, difference, "jacobi sweep");
        sink.on_event(&SolverEvent::SweepCompleted { sweep, difference });
        check_stable(&distance, sweep)?;
        if converged(difference, tolerance) {
            return Ok(sweep);
        }
    }
}

/// Run in-place sweeps in index order until convergence. Returns the sweep
/// count.
///
/// Later states in a sweep observe the already updated values of earlier
/// ones, so this must stay sequential.
pub fn gauss_seidel_sweeps<F, U>(
    values: &mut [F],
    criterion: StopCriterion,
    tolerance: f64,
    sink: &mut dyn ProgressSink,
    update: U,
) -> Result<usize, SolverError>
where
    F: Field,
    U: Fn(usize, &[F]) -> F,
{
    let n = values.len();
    let mut sweep = 0;
    loop {
        let mut distance = Distance::new(criterion);
        for s in 0..n {
            let v = update(s, values);
            distance.observe(s, &values[s], &v);
            values[s] = v;
        }
        sweep += 1;

        let difference = distance.value();
        debug!(sweep, difference, "gauss-seidel sweep");
        sink.on_event(&SolverEvent::SweepCompleted { sweep, difference });
        check_stable(&distance, sweep)?;
        if converged(difference, tolerance) {
            return Ok(sweep);
        }
    }
}

/// Run exactly `steps` double-buffered sweeps, without a convergence check.
pub fn bounded_steps<F, U>(
    values: &mut Vec<F>,
    steps: usize,
    sink: &mut dyn ProgressSink,
    update: U,
) -> usize
where
    F: Field,
    U: Fn(usize, &[F]) -> F,
{
    let mut next = values.clone();
    for step in 1..=steps {
        for (s, slot) in next.iter_mut().enumerate() {
            *slot = update(s, values);
        }
        std::mem::swap(values, &mut next);
        sink.on_event(&SolverEvent::StepCompleted { step, total: steps });
    }
    steps
}

// ---------------------------------------------------------------------------
// Per-state update
// ---------------------------------------------------------------------------

/// `base + Σ w · present[succ]`, each term optionally scaled by `discount`.
#[inline]
pub(crate) fn weighted_sum<'a, F, I>(
    successors: I,
    present: &[F],
    base: Option<&F>,
    discount: Option<&F>,
) -> F
where
    F: Field,
    I: Iterator<Item = (usize, &'a F)>,
{
    let mut acc = base.cloned().unwrap_or_else(F::zero);
    for (succ, w) in successors {
        let term = w.clone() * present[succ].clone();
        acc = match discount {
            Some(d) => acc + term * d.clone(),
            None => acc + term,
        };
    }
    acc
}

// ---------------------------------------------------------------------------
// Chain kernels
// ---------------------------------------------------------------------------

/// Unbounded Jacobi iteration on a chain.
///
/// With `cumul`, each state adds its reward before the successor sum.
#[instrument(skip(graph, values, cumul, sink), fields(n = graph.num_states(), nnz = graph.num_transitions()))]
pub fn unbounded_jacobi<F: Field>(
    graph: &SparseChain<F>,
    values: &mut Vec<F>,
    cumul: Option<&[F]>,
    criterion: StopCriterion,
    tolerance: f64,
    sink: &mut dyn ProgressSink,
) -> Result<usize, SolverError> {
    debug_assert_eq!(values.len(), graph.num_states());
    jacobi_sweeps(values, criterion, tolerance, sink, |s, present| {
        weighted_sum(graph.successors(s), present, cumul.map(|c| &c[s]), None)
    })
}

/// Unbounded Gauss-Seidel iteration on a chain.
#[instrument(skip(graph, values, cumul, sink), fields(n = graph.num_states(), nnz = graph.num_transitions()))]
pub fn unbounded_gauss_seidel<F: Field>(
    graph: &SparseChain<F>,
    values: &mut [F],
    cumul: Option<&[F]>,
    criterion: StopCriterion,
    tolerance: f64,
    sink: &mut dyn ProgressSink,
) -> Result<usize, SolverError> {
    debug_assert_eq!(values.len(), graph.num_states());
    gauss_seidel_sweeps(values, criterion, tolerance, sink, |s, present| {
        weighted_sum(graph.successors(s), present, cumul.map(|c| &c[s]), None)
    })
}

/// Exactly `steps` Jacobi sweeps on a chain.
///
/// `discount` scales every successor contribution; it is only meaningful
/// together with `cumul`.
#[instrument(skip(graph, values, cumul, discount, sink), fields(n = graph.num_states()))]
pub fn bounded<F: Field>(
    graph: &SparseChain<F>,
    values: &mut Vec<F>,
    steps: usize,
    cumul: Option<&[F]>,
    discount: Option<&F>,
    sink: &mut dyn ProgressSink,
) -> usize {
    debug_assert_eq!(values.len(), graph.num_states());
    bounded_steps(values, steps, sink, |s, present| {
        weighted_sum(graph.successors(s), present, cumul.map(|c| &c[s]), discount)
    })
}

/// Transient analysis of a uniformised chain.
///
/// `fg[i]` is the Poisson weight of `left + i` jumps. The kernel builds
/// `Σ_i fg[i] · P^(left+i) · values` with `fg.len() + left` sweeps and no
/// convergence check: first a weighted sweep per window entry from the
/// right end down to `left`, then `left` unweighted sweeps.
#[instrument(skip(graph, values, fg, sink), fields(n = graph.num_states(), width = fg.len()))]
pub fn transient<F: Field>(
    graph: &SparseChain<F>,
    values: &mut Vec<F>,
    left: usize,
    fg: &[F],
    sink: &mut dyn ProgressSink,
) -> usize {
    let n = graph.num_states();
    debug_assert_eq!(values.len(), n);
    let total = fg.len() + left;
    let mut present = vec![F::zero(); n];
    let mut next = vec![F::zero(); n];
    let mut step = 0;

    for weight in fg.iter().rev() {
        for s in 0..n {
            let base = weight.clone() * values[s].clone();
            next[s] = weighted_sum(graph.successors(s), &present, Some(&base), None);
        }
        std::mem::swap(&mut present, &mut next);
        step += 1;
        sink.on_event(&SolverEvent::StepCompleted { step, total });
    }
    for _ in 0..left {
        for s in 0..n {
            next[s] = weighted_sum(graph.successors(s), &present, None, None);
        }
        std::mem::swap(&mut present, &mut next);
        step += 1;
        sink.on_event(&SolverEvent::StepCompleted { step, total });
    }

    *values = present;
    total
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
