//! Fox–Glynn truncation of the Poisson distribution.
//!
//! Computes left and right truncation points and normalised weights for
//! Poisson(λ) such that the mass outside `[left, right]` is at most
//! `epsilon`, without underflow or overflow in the intermediate values.
//!
//! Reference: B. L. Fox and P. W. Glynn, "Computing Poisson probabilities",
//! Communications of the ACM 31(4), 1988.

use tracing::{debug, instrument, warn};

use crate::error::{SolverError, ValidationError};

/// √(2π).
const SQRT_2_PI: f64 = 2.506_628_274_631_000_5;
/// log10(e).
const LOG10_E: f64 = 0.434_294_481_903_251_83;
/// Error-bound factor for λ < 400.
const FACTOR_SMALL: f64 = 0.662_608_824_988_162_4;
/// Error-bound factor for λ ≥ 400.
const FACTOR_LARGE: f64 = 0.664_265_347_050_632_8;
/// Headroom divisor for the starting weight.
const BIG_NUMBER: f64 = 1.0e10;
/// Constant term of the lower bound on ln c_m.
const LOG_C_M_OFFSET: f64 = -1.922_272;

/// Below this mode, the left truncation point is always zero.
const SMALL_MODE: usize = 25;
/// At or above this mode, the right-tail bound uses λ itself.
const LARGE_MODE: usize = 400;
/// Right truncation points beyond this may underflow for λ < 400.
const UNDERFLOW_RIGHT: usize = 600;

/// Smallest positive normal double.
const TAU: f64 = f64::MIN_POSITIVE;
/// Largest finite double.
const OMEGA: f64 = f64::MAX;

/// A truncated, normalised Poisson distribution.
///
/// `weights()[i]` approximates `P(N = left + i)` for `N ~ Poisson(λ)`.
#[derive(Debug, Clone, PartialEq)]
pub struct PoissonWindow {
    left: usize,
    right: usize,
    weights: Vec<f64>,
    total_weight: f64,
}

impl PoissonWindow {
    /// First jump count with a non-zero weight.
    #[inline]
    pub fn left(&self) -> usize {
        self.left
    }

    /// Last jump count with a non-zero weight.
    #[inline]
    pub fn right(&self) -> usize {
        self.right
    }

    /// Normalised weights for `left..=right`.
    #[inline]
    pub fn weights(&self) -> &[f64] {
        &self.weights
    }

    /// Sum of the unnormalised weights before normalisation.
    #[inline]
    pub fn total_weight(&self) -> f64 {
        self.total_weight
    }

    /// Weight of `k` jumps, zero outside the window.
    pub fn weight(&self, k: usize) -> f64 {
        if k < self.left || k > self.right {
            0.0
        } else {
            self.weights[k - self.left]
        }
    }
}

/// Truncation points and normalised weights for Poisson(`lambda`).
///
/// # Errors
///
/// - [`SolverError::InvalidInput`] if `lambda` is negative or non-finite,
///   `epsilon` is not in `(0, 1)`, or the truncation points of `lambda` do
///   not fit in a `usize`.
/// - [`SolverError::OutOfMemory`] if the weight vector cannot be allocated.
#[instrument(level = "debug")]
pub fn fox_glynn(lambda: f64, epsilon: f64) -> Result<PoissonWindow, SolverError> {
    if !lambda.is_finite() || lambda < 0.0 {
        return Err(ValidationError::ParameterOutOfRange {
            name: "lambda".into(),
            value: lambda.to_string(),
            expected: "finite and >= 0".into(),
        }
        .into());
    }
    if !(epsilon > 0.0 && epsilon < 1.0) {
        return Err(ValidationError::ParameterOutOfRange {
            name: "epsilon".into(),
            value: epsilon.to_string(),
            expected: "in (0, 1)".into(),
        }
        .into());
    }

    if lambda == 0.0 {
        return Ok(PoissonWindow {
            left: 0,
            right: 0,
            weights: vec![1.0],
            total_weight: 1.0,
        });
    }

    let mode = to_index(lambda, lambda.floor())?;
    let bounds = find_bounds(lambda, mode, epsilon)?;
    let window = compute_weights(lambda, mode, bounds)?;
    debug!(
        left = window.left,
        right = window.right,
        total_weight = window.total_weight,
        "fox-glynn window"
    );
    Ok(window)
}

// ---------------------------------------------------------------------------
// Finder
// ---------------------------------------------------------------------------

/// A non-negative whole `value` derived from `lambda` as a jump count.
fn to_index(lambda: f64, value: f64) -> Result<usize, SolverError> {
    // `usize::MAX as f64` rounds up to 2^64, so `<` keeps the cast exact.
    if value >= 0.0 && value < usize::MAX as f64 {
        Ok(value as usize)
    } else {
        Err(window_too_large(lambda))
    }
}

fn window_too_large(lambda: f64) -> SolverError {
    ValidationError::ParameterOutOfRange {
        name: "lambda".into(),
        value: lambda.to_string(),
        expected: "time * rate small enough for an addressable Poisson window".into(),
    }
    .into()
}

#[derive(Debug, Clone, Copy)]
struct Bounds {
    left: usize,
    right: usize,
    start: f64,
}

fn find_bounds(lambda: f64, mode: usize, epsilon: f64) -> Result<Bounds, SolverError> {
    let ln_tau = TAU.ln();
    let mut eps = epsilon * SQRT_2_PI;

    // Left truncation point.
    let left = if mode < SMALL_MODE {
        if -lambda < ln_tau {
            warn!(lambda, "e^-lambda underflows; Poisson weights may be unreliable");
        }
        0
    } else {
        let inv = 1.0 / lambda;
        let b_lambda = (1.0 + inv) * (inv * 0.125).exp();
        let sqrt_lambda = lambda.sqrt();
        let mut k = 4.0_f64;
        loop {
            let offset = to_index(lambda, (k * sqrt_lambda + 0.5).ceil())?;
            if offset >= mode {
                break 0;
            }
            let max_err = b_lambda * (-(k * k) * 0.5).exp() / k;
            if 2.0 * max_err < eps {
                eps -= max_err;
                break mode - offset;
            }
            k += 1.0;
        }
    };

    // Right truncation point.
    let (lambda_max, mode_max) = if mode < LARGE_MODE {
        eps *= FACTOR_SMALL;
        (LARGE_MODE as f64, LARGE_MODE)
    } else {
        eps *= (1.0 - 1.0 / (lambda + 1.0)) * FACTOR_LARGE;
        (lambda, mode)
    };
    let mut k = 4.0_f64;
    while k * eps <= (-(k * k) * 0.5).exp() {
        k += 1.0;
    }
    let right = mode_max
        .checked_add(to_index(lambda, (k * (2.0 * lambda_max).sqrt() + 0.5).ceil())?)
        .ok_or_else(|| window_too_large(lambda))?;
    let a_priori = to_index(lambda, ((lambda_max + 1.0) * 0.5).ceil())?;
    if right > mode_max.saturating_add(a_priori) {
        warn!(right, lambda_max, "right truncation point exceeds its a-priori bound");
    }

    let start = OMEGA / (BIG_NUMBER * (right - left) as f64);

    if mode >= SMALL_MODE {
        check_tails(lambda, mode, left, right, start, ln_tau);
    }

    Ok(Bounds { left, right, start })
}

/// Warn when the truncated tails might not be representable.
fn check_tails(lambda: f64, mode: usize, left: usize, right: usize, start: f64, ln_tau: f64) {
    let ln_tau_start = ln_tau - start.ln();
    let log_c_m = LOG_C_M_OFFSET - 0.5 * (mode as f64).ln();

    let i = (mode - left) as f64;
    let left_bound = if mode - left <= left {
        log_c_m - i * (i + 1.0) * (0.5 + (2.0 * i + 1.0) / (6.0 * lambda)) / lambda
    } else {
        let r = -lambda;
        if left != 0 {
            r.max(log_c_m + i * (1.0 - i / (mode as f64 + 1.0)).ln())
        } else {
            r
        }
    };
    if left_bound < ln_tau_start {
        warn!(
            lambda,
            left,
            log10_bound = left_bound * LOG10_E,
            "left Poisson tail may underflow"
        );
    }

    if mode >= LARGE_MODE {
        let i = (right - mode) as f64;
        let right_bound = log_c_m - i * (i + 1.0) / (2.0 * lambda);
        if right_bound < ln_tau_start {
            warn!(
                lambda,
                right,
                log10_bound = right_bound * LOG10_E,
                "right Poisson tail may underflow"
            );
        }
    }
}

// ---------------------------------------------------------------------------
// Weighter
// ---------------------------------------------------------------------------

fn compute_weights(lambda: f64, mode: usize, bounds: Bounds) -> Result<PoissonWindow, SolverError> {
    let Bounds {
        left,
        mut right,
        start,
    } = bounds;
    let len = right - left + 1;

    let mut weights = Vec::new();
    weights
        .try_reserve_exact(len)
        .map_err(|_| SolverError::OutOfMemory {
            requested_bytes: len.saturating_mul(std::mem::size_of::<f64>()),
            kernel: "fox-glynn",
        })?;
    weights.resize(len, 0.0);

    let m = mode - left;
    weights[m] = start;

    // Down from the mode.
    for j in (1..=m).rev() {
        weights[j - 1] = ((j + left) as f64 / lambda) * weights[j];
    }

    // Up from the mode.
    let mut t = right - left;
    if mode < LARGE_MODE {
        if right > UNDERFLOW_RIGHT {
            warn!(right, lambda, "right truncation point large for lambda < 400; weights may underflow");
        }
        for j in m..t {
            let q = lambda / (j + 1 + left) as f64;
            if weights[j] > TAU / q {
                weights[j + 1] = q * weights[j];
            } else {
                t = j;
                right = j + left;
                break;
            }
        }
        weights.truncate(t + 1);
    } else {
        for j in m..t {
            weights[j + 1] = (lambda / (j + 1 + left) as f64) * weights[j];
        }
    }

    // Sum smallest terms first.
    let mut total = 0.0;
    let (mut lo, mut hi) = (0, t);
    while lo < hi {
        if weights[lo] <= weights[hi] {
            total += weights[lo];
            lo += 1;
        } else {
            total += weights[hi];
            hi -= 1;
        }
    }
    total += weights[lo];

    for w in &mut weights {
        *w /= total;
    }

    Ok(PoissonWindow {
        left,
        right,
        weights,
        total_weight: total,
    })
}
