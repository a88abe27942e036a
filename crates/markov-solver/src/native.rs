//! Native `f64` kernels.
//!
//! These run the same recurrences as [`kernels`](crate::kernels) and
//! [`nondet`](crate::nondet) over borrowed dense arrays of doubles, with
//! bounds checks removed from the inner loop. Scratch buffers are reserved
//! with [`Vec::try_reserve_exact`], so allocation failure surfaces as
//! [`NativeError::OutOfMemory`] instead of aborting the process.
//!
//! Per-state arithmetic is performed in the same order as the generic
//! kernels, so both backends produce bit-identical results on `f64`.
//!
//! With the `parallel` feature, double-buffered sweeps are split across the
//! rayon thread pool. Gauss-Seidel sweeps always run sequentially.

use tracing::{debug, instrument, warn};

use crate::config::StopCriterion;
use crate::events::{ProgressSink, SolverEvent};
use crate::field::Field;
use crate::kernels::{converged, Distance};
use crate::types::{SparseChain, SparseNondet};

/// Status code of a native call that could not allocate scratch space.
pub const STATUS_OUT_OF_MEMORY: i32 = 1;
/// Status code of a native call whose iterate stopped being finite.
pub const STATUS_NUMERICAL_INSTABILITY: i32 = 2;

/// Failure of a native kernel.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum NativeError {
    /// A scratch buffer could not be reserved.
    #[error("native kernel could not allocate {requested_bytes} bytes of scratch space")]
    OutOfMemory {
        /// Bytes requested by the failed reservation.
        requested_bytes: usize,
    },
    /// A sweep produced a change that is not a number. `state` is in
    /// iteration numbering.
    #[error("native kernel iterate is no longer finite at sweep {sweep} (state {state})")]
    NumericalInstability { sweep: usize, state: usize },
}

impl NativeError {
    /// Numeric status code of this failure.
    pub fn status_code(&self) -> i32 {
        match self {
            NativeError::OutOfMemory { .. } => STATUS_OUT_OF_MEMORY,
            NativeError::NumericalInstability { .. } => STATUS_NUMERICAL_INSTABILITY,
        }
    }
}

/// Fail the sweep if `distance` saw a change that is not a number.
#[inline]
fn check_stable(distance: &Distance, sweep: usize) -> Result<(), NativeError> {
    match distance.unstable_state() {
        Some(state) => Err(NativeError::NumericalInstability { sweep, state }),
        None => Ok(()),
    }
}

/// Zero-filled scratch buffer of `len` doubles.
fn scratch(len: usize) -> Result<Vec<f64>, NativeError> {
    let requested_bytes = len.saturating_mul(std::mem::size_of::<f64>());
    let mut buf = Vec::new();
    buf.try_reserve_exact(len).map_err(|_| {
        warn!(requested_bytes, "native scratch allocation failed");
        NativeError::OutOfMemory { requested_bytes }
    })?;
    buf.resize(len, 0.0);
    Ok(buf)
}

// ---------------------------------------------------------------------------
// Views
// ---------------------------------------------------------------------------

/// Borrowed native arrays of a validated [`SparseChain`].
#[derive(Debug, Clone, Copy)]
pub struct ChainView<'a> {
    state_bounds: &'a [usize],
    targets: &'a [usize],
    weights: &'a [f64],
}

impl<'a> ChainView<'a> {
    /// View `graph` as native arrays. `None` if `F` is not `f64`.
    pub fn from_chain<F: Field>(graph: &'a SparseChain<F>) -> Option<Self> {
        Some(Self {
            state_bounds: graph.state_bounds(),
            targets: graph.targets(),
            weights: F::native_slice(graph.weights())?,
        })
    }

    #[inline]
    pub fn num_states(&self) -> usize {
        self.state_bounds.len() - 1
    }

    /// `base + Σ (w · x[succ]) · scale` over the row of `s`.
    ///
    /// Callers guarantee `s < num_states()` and `x.len() == num_states()`.
    #[inline]
    fn row_value(&self, s: usize, x: &[f64], base: f64, scale: f64) -> f64 {
        debug_assert!(s < self.num_states() && x.len() == self.num_states());
        let mut acc = base;
        // SAFETY: state_bounds has num_states + 1 monotone entries ending at
        // targets.len() == weights.len(), and every target is < num_states
        // == x.len(). Both are enforced when the graph is constructed.
        unsafe {
            let start = *self.state_bounds.get_unchecked(s);
            let end = *self.state_bounds.get_unchecked(s + 1);
            for idx in start..end {
                let w = *self.weights.get_unchecked(idx);
                let t = *self.targets.get_unchecked(idx);
                acc += (w * *x.get_unchecked(t)) * scale;
            }
        }
        acc
    }
}

/// Borrowed native arrays of a validated [`SparseNondet`].
#[derive(Debug, Clone, Copy)]
pub struct NondetView<'a> {
    state_bounds: &'a [usize],
    nondet_bounds: &'a [usize],
    targets: &'a [usize],
    weights: &'a [f64],
}

impl<'a> NondetView<'a> {
    /// View `graph` as native arrays. `None` if `F` is not `f64`.
    pub fn from_nondet<F: Field>(graph: &'a SparseNondet<F>) -> Option<Self> {
        Some(Self {
            state_bounds: graph.state_bounds(),
            nondet_bounds: graph.nondet_bounds(),
            targets: graph.targets(),
            weights: F::native_slice(graph.weights())?,
        })
    }

    #[inline]
    pub fn num_states(&self) -> usize {
        self.state_bounds.len() - 1
    }

    #[inline]
    pub fn num_choices(&self) -> usize {
        self.nondet_bounds.len() - 1
    }

    /// Optimum over the choices of `s` of `cumul[c] + Σ (w · x[succ]) · scale`.
    #[inline]
    fn state_value(
        &self,
        s: usize,
        x: &[f64],
        cumul: Option<&[f64]>,
        scale: f64,
        min: bool,
    ) -> f64 {
        debug_assert!(s < self.num_states() && x.len() == self.num_states());
        let mut best = if min { f64::INFINITY } else { f64::NEG_INFINITY };
        // SAFETY: state_bounds indexes nondet_bounds, nondet_bounds indexes
        // targets/weights, and every target is < num_states == x.len().
        // cumul has num_choices entries (asserted by the kernel entry).
        unsafe {
            let first = *self.state_bounds.get_unchecked(s);
            let last = *self.state_bounds.get_unchecked(s + 1);
            for c in first..last {
                let mut acc = match cumul {
                    Some(r) => *r.get_unchecked(c),
                    None => 0.0,
                };
                let start = *self.nondet_bounds.get_unchecked(c);
                let end = *self.nondet_bounds.get_unchecked(c + 1);
                for idx in start..end {
                    let w = *self.weights.get_unchecked(idx);
                    let t = *self.targets.get_unchecked(idx);
                    acc += (w * *x.get_unchecked(t)) * scale;
                }
                best = if min { best.min(acc) } else { best.max(acc) };
            }
        }
        best
    }
}

// ---------------------------------------------------------------------------
// Sweep helpers
// ---------------------------------------------------------------------------

/// Fill `next` from `present`, returning the convergence measure.
#[cfg(not(feature = "parallel"))]
fn sweep_into<U>(present: &[f64], next: &mut [f64], criterion: StopCriterion, update: U) -> Distance
where
    U: Fn(usize, &[f64]) -> f64 + Sync,
{
    let mut distance = Distance::new(criterion);
    for (s, slot) in next.iter_mut().enumerate() {
        let v = update(s, present);
        distance.observe_f64(s, present[s], v);
        *slot = v;
    }
    distance
}

/// Fill `next` from `present` across the rayon pool.
#[cfg(feature = "parallel")]
fn sweep_into<U>(present: &[f64], next: &mut [f64], criterion: StopCriterion, update: U) -> Distance
where
    U: Fn(usize, &[f64]) -> f64 + Sync,
{
    use rayon::prelude::*;

    next.par_iter_mut()
        .enumerate()
        .map(|(s, slot)| {
            let v = update(s, present);
            let mut d = Distance::new(criterion);
            d.observe_f64(s, present[s], v);
            *slot = v;
            d
        })
        .reduce(|| Distance::new(criterion), Distance::merge)
}

/// Alternate between `values` and a scratch buffer. `round(k, present,
/// next)` runs round `k` (1-based) and returns whether another round
/// follows. The final iterate always ends up in `values`.
fn ping_pong<R>(values: &mut [f64], mut round: R) -> Result<usize, NativeError>
where
    R: FnMut(usize, &[f64], &mut [f64]) -> Result<bool, NativeError>,
{
    let mut buffer = scratch(values.len())?;
    let mut rounds = 0;
    {
        let mut present: &mut [f64] = &mut *values;
        let mut next: &mut [f64] = &mut buffer[..];
        loop {
            rounds += 1;
            let more = round(rounds, present, next)?;
            std::mem::swap(&mut present, &mut next);
            if !more {
                break;
            }
        }
    }
    if rounds % 2 == 1 {
        values.copy_from_slice(&buffer);
    }
    Ok(rounds)
}

// ---------------------------------------------------------------------------
// Chain kernels
// ---------------------------------------------------------------------------

/// Native unbounded Jacobi iteration on a chain.
#[instrument(skip(view, values, cumul, sink), fields(n = view.num_states()))]
pub fn chain_unbounded_jacobi(
    view: &ChainView<'_>,
    values: &mut [f64],
    cumul: Option<&[f64]>,
    criterion: StopCriterion,
    tolerance: f64,
    sink: &mut dyn ProgressSink,
) -> Result<usize, NativeError> {
    let n = view.num_states();
    assert_eq!(values.len(), n, "value vector length must match state count");
    if let Some(c) = cumul {
        assert_eq!(c.len(), n, "reward vector length must match state count");
    }
    ping_pong(values, |sweep, present, next| {
        let distance = sweep_into(present, next, criterion, |s, x| {
            view.row_value(s, x, cumul.map_or(0.0, |c| c[s]), 1.0)
        });
        let difference = distance.value();
        debug!(sweep, difference, "native jacobi sweep");
        sink.on_event(&SolverEvent::SweepCompleted { sweep, difference });
        check_stable(&distance, sweep)?;
        Ok(!converged(difference, tolerance))
    })
}

/// Native unbounded Gauss-Seidel iteration on a chain.
#[instrument(skip(view, values, cumul, sink), fields(n = view.num_states()))]
pub fn chain_unbounded_gauss_seidel(
    view: &ChainView<'_>,
    values: &mut [f64],
    cumul: Option<&[f64]>,
    criterion: StopCriterion,
    tolerance: f64,
    sink: &mut dyn ProgressSink,
) -> Result<usize, NativeError> {
    let n = view.num_states();
    assert_eq!(values.len(), n, "value vector length must match state count");
    if let Some(c) = cumul {
        assert_eq!(c.len(), n, "reward vector length must match state count");
    }
    let mut sweep = 0;
    loop {
        let mut distance = Distance::new(criterion);
        for s in 0..n {
            let v = view.row_value(s, values, cumul.map_or(0.0, |c| c[s]), 1.0);
            distance.observe_f64(s, values[s], v);
            values[s] = v;
        }
        sweep += 1;
        let difference = distance.value();
        debug!(sweep, difference, "native gauss-seidel sweep");
        sink.on_event(&SolverEvent::SweepCompleted { sweep, difference });
        check_stable(&distance, sweep)?;
        if converged(difference, tolerance) {
            return Ok(sweep);
        }
    }
}

/// Native bounded iteration on a chain: exactly `steps` Jacobi sweeps.
#[instrument(skip(view, values, cumul, sink), fields(n = view.num_states()))]
pub fn chain_bounded(
    view: &ChainView<'_>,
    values: &mut [f64],
    steps: usize,
    cumul: Option<&[f64]>,
    discount: Option<f64>,
    sink: &mut dyn ProgressSink,
) -> Result<usize, NativeError> {
    let n = view.num_states();
    assert_eq!(values.len(), n, "value vector length must match state count");
    if let Some(c) = cumul {
        assert_eq!(c.len(), n, "reward vector length must match state count");
    }
    if steps == 0 {
        return Ok(0);
    }
    let scale = discount.unwrap_or(1.0);
    ping_pong(values, |step, present, next| {
        sweep_into(present, next, StopCriterion::Absolute, |s, x| {
            view.row_value(s, x, cumul.map_or(0.0, |c| c[s]), scale)
        });
        sink.on_event(&SolverEvent::StepCompleted { step, total: steps });
        Ok(step < steps)
    })
}

/// Native transient analysis of a uniformised chain.
///
/// `fg[i]` is the Poisson weight of `left + i` jumps; see
/// [`kernels::transient`](crate::kernels::transient).
#[instrument(skip(view, values, fg, sink), fields(n = view.num_states(), width = fg.len()))]
pub fn chain_transient(
    view: &ChainView<'_>,
    values: &mut [f64],
    left: usize,
    fg: &[f64],
    sink: &mut dyn ProgressSink,
) -> Result<usize, NativeError> {
    let n = view.num_states();
    assert_eq!(values.len(), n, "value vector length must match state count");
    let total = fg.len() + left;
    if total == 0 {
        values.fill(0.0);
        return Ok(0);
    }

    let mut original = scratch(n)?;
    original.copy_from_slice(values);
    values.fill(0.0);

    let width = fg.len();
    ping_pong(values, |step, present, next| {
        if step <= width {
            let weight = fg[width - step];
            sweep_into(present, next, StopCriterion::Absolute, |s, x| {
                view.row_value(s, x, weight * original[s], 1.0)
            });
        } else {
            sweep_into(present, next, StopCriterion::Absolute, |s, x| {
                view.row_value(s, x, 0.0, 1.0)
            });
        }
        sink.on_event(&SolverEvent::StepCompleted { step, total });
        Ok(step < total)
    })
}

// ---------------------------------------------------------------------------
// Nondeterministic kernels
// ---------------------------------------------------------------------------

fn check_nondet_inputs(view: &NondetView<'_>, values: &[f64], cumul: Option<&[f64]>) {
    assert_eq!(values.len(), view.num_states(), "value vector length must match state count");
    if let Some(c) = cumul {
        assert_eq!(c.len(), view.num_choices(), "reward vector length must match choice count");
    }
}

/// Native unbounded Jacobi value iteration on an MDP.
#[instrument(skip(view, values, cumul, sink), fields(n = view.num_states()))]
pub fn nondet_unbounded_jacobi(
    view: &NondetView<'_>,
    values: &mut [f64],
    cumul: Option<&[f64]>,
    min: bool,
    criterion: StopCriterion,
    tolerance: f64,
    sink: &mut dyn ProgressSink,
) -> Result<usize, NativeError> {
    check_nondet_inputs(view, values, cumul);
    ping_pong(values, |sweep, present, next| {
        let distance = sweep_into(present, next, criterion, |s, x| {
            view.state_value(s, x, cumul, 1.0, min)
        });
        let difference = distance.value();
        debug!(sweep, difference, "native jacobi sweep");
        sink.on_event(&SolverEvent::SweepCompleted { sweep, difference });
        check_stable(&distance, sweep)?;
        Ok(!converged(difference, tolerance))
    })
}

/// Native unbounded Gauss-Seidel value iteration on an MDP.
#[instrument(skip(view, values, cumul, sink), fields(n = view.num_states()))]
pub fn nondet_unbounded_gauss_seidel(
    view: &NondetView<'_>,
    values: &mut [f64],
    cumul: Option<&[f64]>,
    min: bool,
    criterion: StopCriterion,
    tolerance: f64,
    sink: &mut dyn ProgressSink,
) -> Result<usize, NativeError> {
    check_nondet_inputs(view, values, cumul);
    let n = view.num_states();
    let mut sweep = 0;
    loop {
        let mut distance = Distance::new(criterion);
        for s in 0..n {
            let v = view.state_value(s, values, cumul, 1.0, min);
            distance.observe_f64(s, values[s], v);
            values[s] = v;
        }
        sweep += 1;
        let difference = distance.value();
        debug!(sweep, difference, "native gauss-seidel sweep");
        sink.on_event(&SolverEvent::SweepCompleted { sweep, difference });
        check_stable(&distance, sweep)?;
        if converged(difference, tolerance) {
            return Ok(sweep);
        }
    }
}

/// Native bounded value iteration on an MDP.
#[instrument(skip(view, values, cumul, sink), fields(n = view.num_states()))]
pub fn nondet_bounded(
    view: &NondetView<'_>,
    values: &mut [f64],
    steps: usize,
    cumul: Option<&[f64]>,
    discount: Option<f64>,
    min: bool,
    sink: &mut dyn ProgressSink,
) -> Result<usize, NativeError> {
    check_nondet_inputs(view, values, cumul);
    if steps == 0 {
        return Ok(0);
    }
    let scale = discount.unwrap_or(1.0);
    ping_pong(values, |step, present, next| {
        sweep_into(present, next, StopCriterion::Absolute, |s, x| {
            view.state_value(s, x, cumul, scale, min)
        });
        sink.on_event(&SolverEvent::StepCompleted { step, total: steps });
        Ok(step < steps)
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::{EventLog, NullSink};
    use crate::{kernels, nondet};

    fn chain() -> SparseChain<f64> {
        SparseChain::from_rows(vec![
            vec![(0, 0.1), (1, 0.6), (3, 0.3)],
            vec![(0, 0.4), (2, 0.6)],
            vec![(2, 1.0)],
            vec![(3, 1.0)],
        ])
        .unwrap()
    }

    fn mdp() -> SparseNondet<f64> {
        SparseNondet::from_choices(vec![
            vec![vec![(1, 1.0)], vec![(0, 0.5), (2, 0.5)]],
            vec![vec![(0, 0.3), (3, 0.7)], vec![(2, 0.2), (3, 0.8)]],
            vec![vec![(2, 1.0)]],
            vec![vec![(3, 1.0)]],
        ])
        .unwrap()
    }

    #[test]
    fn views_require_native_weights() {
        let g64 = chain();
        assert!(ChainView::from_chain(&g64).is_some());
        let g32 = SparseChain::from_rows(vec![vec![(0, 1.0f32)]]).unwrap();
        assert!(ChainView::from_chain(&g32).is_none());
    }

    #[test]
    fn status_codes() {
        let oom = NativeError::OutOfMemory { requested_bytes: 8 };
        assert_eq!(oom.status_code(), STATUS_OUT_OF_MEMORY);
        let nan = NativeError::NumericalInstability { sweep: 2, state: 0 };
        assert_eq!(nan.status_code(), STATUS_NUMERICAL_INSTABILITY);
    }

    #[test]
    fn overflowing_rewards_fail_every_unbounded_kernel() {
        let g = SparseChain::from_rows(vec![vec![(0, 0.5), (1, 0.5)], vec![(1, 1.0)]]).unwrap();
        let view = ChainView::from_chain(&g).unwrap();
        let cumul = [1.5e308, 0.0];
        let expected = NativeError::NumericalInstability { sweep: 3, state: 0 };

        let mut v = vec![0.0; 2];
        let jacobi = chain_unbounded_jacobi(&view, &mut v, Some(&cumul), StopCriterion::Absolute, 1e-10, &mut NullSink);
        assert_eq!(jacobi, Err(expected.clone()));
        let mut v = vec![0.0; 2];
        let gs = chain_unbounded_gauss_seidel(&view, &mut v, Some(&cumul), StopCriterion::Absolute, 1e-10, &mut NullSink);
        assert_eq!(gs, Err(expected.clone()));

        let m = SparseNondet::from_choices(vec![
            vec![vec![(0, 0.5), (1, 0.5)], vec![(1, 1.0)]],
            vec![vec![(1, 1.0)]],
        ])
        .unwrap();
        let view = NondetView::from_nondet(&m).unwrap();
        let per_choice = [1.5e308, 1.5e308, 0.0];
        let mut v = vec![0.0; 2];
        let max = nondet_unbounded_jacobi(&view, &mut v, Some(&per_choice), false, StopCriterion::Absolute, 1e-10, &mut NullSink);
        assert_eq!(max, Err(expected.clone()));
        let mut v = vec![0.0; 2];
        let max = nondet_unbounded_gauss_seidel(&view, &mut v, Some(&per_choice), false, StopCriterion::Absolute, 1e-10, &mut NullSink);
        assert_eq!(max, Err(expected));
    }

    #[test]
    fn huge_scratch_reports_out_of_memory() {
        let err = scratch(usize::MAX / 16).unwrap_err();
        assert_eq!(err.status_code(), STATUS_OUT_OF_MEMORY);
    }

    #[test]
    fn chain_jacobi_matches_generic() {
        let g = chain();
        let view = ChainView::from_chain(&g).unwrap();
        let start = vec![0.0, 0.0, 1.0, 0.0];

        let mut generic = start.clone();
        let gs = kernels::unbounded_jacobi(&g, &mut generic, None, StopCriterion::Absolute, 1e-12, &mut NullSink).unwrap();
        let mut native = start;
        let ns = chain_unbounded_jacobi(&view, &mut native, None, StopCriterion::Absolute, 1e-12, &mut NullSink).unwrap();

        assert_eq!(gs, ns);
        assert_eq!(generic, native);
    }

    #[test]
    fn chain_gauss_seidel_matches_generic() {
        let g = chain();
        let view = ChainView::from_chain(&g).unwrap();
        let rewards = vec![1.0, 2.0, 0.0, 0.0];

        let mut generic = vec![0.0; 4];
        kernels::unbounded_gauss_seidel(&g, &mut generic, Some(&rewards), StopCriterion::Relative, 1e-10, &mut NullSink).unwrap();
        let mut native = vec![0.0; 4];
        chain_unbounded_gauss_seidel(&view, &mut native, Some(&rewards), StopCriterion::Relative, 1e-10, &mut NullSink).unwrap();
        assert_eq!(generic, native);
    }

    #[test]
    fn chain_bounded_odd_and_even_step_counts() {
        let g = chain();
        let view = ChainView::from_chain(&g).unwrap();
        for steps in [0, 1, 2, 7] {
            let mut generic = vec![0.0, 0.0, 1.0, 0.0];
            kernels::bounded(&g, &mut generic, steps, None, None, &mut NullSink);
            let mut native = vec![0.0, 0.0, 1.0, 0.0];
            let mut log = EventLog::new();
            let ran = chain_bounded(&view, &mut native, steps, None, None, &mut log).unwrap();
            assert_eq!(ran, steps);
            assert_eq!(log.steps(), steps);
            assert_eq!(generic, native, "steps = {steps}");
        }
    }

    #[test]
    fn chain_bounded_discounted_matches_generic() {
        let g = chain();
        let view = ChainView::from_chain(&g).unwrap();
        let rewards = vec![1.0, 0.5, 0.0, 2.0];
        let mut generic = vec![0.0; 4];
        kernels::bounded(&g, &mut generic, 5, Some(&rewards), Some(&0.9), &mut NullSink);
        let mut native = vec![0.0; 4];
        chain_bounded(&view, &mut native, 5, Some(&rewards), Some(0.9), &mut NullSink).unwrap();
        assert_eq!(generic, native);
    }

    #[test]
    fn chain_transient_matches_generic() {
        let g = chain();
        let view = ChainView::from_chain(&g).unwrap();
        let fg = [0.1, 0.2, 0.4, 0.3];
        for left in [0, 1, 3] {
            let mut generic = vec![0.0, 0.0, 1.0, 0.0];
            let gs = kernels::transient(&g, &mut generic, left, &fg, &mut NullSink);
            let mut native = vec![0.0, 0.0, 1.0, 0.0];
            let ns = chain_transient(&view, &mut native, left, &fg, &mut NullSink).unwrap();
            assert_eq!(gs, ns);
            assert_eq!(generic, native, "left = {left}");
        }
    }

    #[test]
    fn nondet_kernels_match_generic() {
        let g = mdp();
        let view = NondetView::from_nondet(&g).unwrap();
        let start = vec![0.0, 0.0, 1.0, 0.0];
        for min in [false, true] {
            let mut generic = start.clone();
            nondet::unbounded_jacobi(&g, &mut generic, None, min, StopCriterion::Absolute, 1e-12, &mut NullSink).unwrap();
            let mut native = start.clone();
            nondet_unbounded_jacobi(&view, &mut native, None, min, StopCriterion::Absolute, 1e-12, &mut NullSink).unwrap();
            assert_eq!(generic, native);

            let mut generic = start.clone();
            nondet::unbounded_gauss_seidel(&g, &mut generic, None, min, StopCriterion::Absolute, 1e-12, &mut NullSink).unwrap();
            let mut native = start.clone();
            nondet_unbounded_gauss_seidel(&view, &mut native, None, min, StopCriterion::Absolute, 1e-12, &mut NullSink).unwrap();
            assert_eq!(generic, native);

            let rewards = vec![1.0, 2.0, 0.5, 0.25, 0.0, 0.0];
            let mut generic = vec![0.0; 4];
            nondet::bounded(&g, &mut generic, 3, Some(&rewards), Some(&0.5), min, &mut NullSink);
            let mut native = vec![0.0; 4];
            nondet_bounded(&view, &mut native, 3, Some(&rewards), Some(0.5), min, &mut NullSink).unwrap();
            assert_eq!(generic, native);
        }
    }
}
