//! Input validation for graphs, objectives and parameters.
//!
//! All validation functions run eagerly before any iteration begins, so that
//! a malformed model surfaces as a [`ValidationError`] rather than as an
//! index panic or a silently wrong fixed point deep inside a kernel. Every
//! public function returns [`ValidationError`] on failure, which converts
//! into [`SolverError::InvalidInput`](crate::error::SolverError::InvalidInput)
//! via `From`.

use crate::error::ValidationError;
use crate::field::Field;

// ---------------------------------------------------------------------------
// Graph validation
// ---------------------------------------------------------------------------

/// Validate the arrays of a chain graph.
///
/// Checks, in order:
///
/// 1. `state_bounds` is non-empty and starts at 0.
/// 2. `state_bounds` is monotonically non-decreasing.
/// 3. `state_bounds[n]` equals `targets.len()`, which equals `weights.len()`.
/// 4. Every successor id is `< n`.
/// 5. Every weight is finite.
///
/// # Errors
///
/// Returns [`ValidationError`] describing the first violation found.
pub fn validate_chain_parts<F: Field>(
    state_bounds: &[usize],
    targets: &[usize],
    weights: &[F],
) -> Result<(), ValidationError> {
    validate_bounds("state_bounds", state_bounds, targets.len())?;
    if weights.len() != targets.len() {
        return Err(ValidationError::DimensionMismatch(format!(
            "weights length {} does not match targets length {}",
            weights.len(),
            targets.len(),
        )));
    }

    let n = state_bounds.len() - 1;
    for s in 0..n {
        for idx in state_bounds[s]..state_bounds[s + 1] {
            check_entry(idx, s, n, targets, weights)?;
        }
    }
    Ok(())
}

/// Validate the arrays of a nondeterministic graph.
///
/// In addition to the chain checks (applied to `nondet_bounds`), every state
/// must own at least one choice and every choice at least one transition.
///
/// # Errors
///
/// Returns [`ValidationError::EmptyState`] or
/// [`ValidationError::EmptyChoice`] for degenerate structure, or the first
/// structural violation found.
pub fn validate_nondet_parts<F: Field>(
    state_bounds: &[usize],
    nondet_bounds: &[usize],
    targets: &[usize],
    weights: &[F],
) -> Result<(), ValidationError> {
    validate_bounds("nondet_bounds", nondet_bounds, targets.len())?;
    validate_bounds("state_bounds", state_bounds, nondet_bounds.len() - 1)?;
    if weights.len() != targets.len() {
        return Err(ValidationError::DimensionMismatch(format!(
            "weights length {} does not match targets length {}",
            weights.len(),
            targets.len(),
        )));
    }

    let n = state_bounds.len() - 1;
    for s in 0..n {
        if state_bounds[s] == state_bounds[s + 1] {
            return Err(ValidationError::EmptyState { state: s });
        }
    }
    for c in 0..nondet_bounds.len() - 1 {
        let (start, end) = (nondet_bounds[c], nondet_bounds[c + 1]);
        if start == end {
            return Err(ValidationError::EmptyChoice { choice: c });
        }
        for idx in start..end {
            check_entry(idx, c, n, targets, weights)?;
        }
    }
    Ok(())
}

fn validate_bounds(
    name: &'static str,
    bounds: &[usize],
    entries: usize,
) -> Result<(), ValidationError> {
    if bounds.is_empty() {
        return Err(ValidationError::DimensionMismatch(format!(
            "{name} must contain at least one entry"
        )));
    }
    if bounds[0] != 0 {
        return Err(ValidationError::DimensionMismatch(format!(
            "{name}[0] = {} (expected 0)",
            bounds[0]
        )));
    }
    for i in 1..bounds.len() {
        if bounds[i] < bounds[i - 1] {
            return Err(ValidationError::NonMonotonicBounds {
                array: name,
                position: i,
            });
        }
    }
    let last = bounds[bounds.len() - 1];
    if last != entries {
        return Err(ValidationError::DimensionMismatch(format!(
            "{name} ends at {last} but {entries} entries are present"
        )));
    }
    Ok(())
}

#[inline]
fn check_entry<F: Field>(
    idx: usize,
    owner: usize,
    states: usize,
    targets: &[usize],
    weights: &[F],
) -> Result<(), ValidationError> {
    let succ = targets[idx];
    if succ >= states {
        return Err(ValidationError::IndexOutOfBounds {
            index: succ,
            state: owner,
            states,
        });
    }
    if !is_finite_value(&weights[idx]) {
        return Err(ValidationError::NonFiniteValue(format!(
            "weight at entry {idx} (owner {owner}) is {:?}",
            weights[idx]
        )));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Vector & parameter validation
// ---------------------------------------------------------------------------

/// Whether `value` is neither NaN nor infinite.
///
/// Field types without an `f64` image are accepted as long as they are
/// reflexively equal.
pub fn is_finite_value<F: Field>(value: &F) -> bool {
    #[allow(clippy::eq_op)]
    let reflexive = value == value;
    reflexive && value.to_f64().map_or(true, |v| !v.is_nan() && !v.is_infinite())
}

/// Validate that a per-state vector has one finite entry per state.
///
/// # Errors
///
/// Returns [`ValidationError::DimensionMismatch`] or
/// [`ValidationError::NonFiniteValue`].
pub fn validate_state_vector<F: Field>(
    name: &str,
    values: &[F],
    states: usize,
) -> Result<(), ValidationError> {
    if values.len() != states {
        return Err(ValidationError::DimensionMismatch(format!(
            "{name} has length {} but the model has {states} states",
            values.len()
        )));
    }
    if let Some(pos) = values.iter().position(|v| !is_finite_value(v)) {
        return Err(ValidationError::NonFiniteValue(format!(
            "{name}[{pos}] = {:?}",
            values[pos]
        )));
    }
    Ok(())
}

/// Validate a convergence tolerance: finite and in `(0, 1)`.
pub fn validate_tolerance(tolerance: f64) -> Result<(), ValidationError> {
    if !tolerance.is_finite() || tolerance <= 0.0 || tolerance >= 1.0 {
        return Err(ValidationError::ParameterOutOfRange {
            name: "tolerance".into(),
            value: tolerance.to_string(),
            expected: "finite value in (0, 1)".into(),
        });
    }
    Ok(())
}

/// Validate a discrete time bound and convert it into a step count.
///
/// The bound must be a non-negative integer that fits in a `usize`.
pub fn validate_steps(time: f64) -> Result<usize, ValidationError> {
    // `usize::MAX as f64` rounds up to 2^64, so `<` keeps the cast exact.
    if !time.is_finite() || time < 0.0 || time.fract() != 0.0 || time >= usize::MAX as f64 {
        return Err(ValidationError::ParameterOutOfRange {
            name: "time".into(),
            value: time.to_string(),
            expected: "non-negative integer step count".into(),
        });
    }
    Ok(time as usize)
}

/// Validate a continuous time bound: finite and non-negative.
pub fn validate_time(time: f64) -> Result<(), ValidationError> {
    if !time.is_finite() || time < 0.0 {
        return Err(ValidationError::ParameterOutOfRange {
            name: "time".into(),
            value: time.to_string(),
            expected: "finite non-negative time".into(),
        });
    }
    Ok(())
}

/// Validate a discount factor: finite and non-negative.
pub fn validate_discount<F: Field>(discount: &F) -> Result<(), ValidationError> {
    if !is_finite_value(discount) || *discount < F::zero() {
        return Err(ValidationError::ParameterOutOfRange {
            name: "discount".into(),
            value: format!("{discount:?}"),
            expected: "finite non-negative factor".into(),
        });
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
