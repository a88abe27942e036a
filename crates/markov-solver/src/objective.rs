//! Solver objectives.
//!
//! An [`Objective`] pairs a [`Measure`] (what to compute) with a result
//! slot. The caller owns the objective, [`GraphSolver::solve`] fills the
//! slot with one value per retained state in original numbering.
//!
//! [`GraphSolver::solve`]: crate::solver::GraphSolver::solve

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;
use crate::field::Field;
use crate::types::{ModelGraph, Semantics, StateSet};
use crate::validation::{
    validate_discount, validate_state_vector, validate_steps, validate_time,
};

/// What to compute, with its inputs in original state numbering.
///
/// `time` is a step count for discrete-time models (it must be a
/// non-negative integer) and a real time bound for continuous-time models.
/// `min` selects minimisation over choices on MDPs and is ignored
/// otherwise.
#[derive(Debug, Clone, PartialEq)]
pub enum Measure<F> {
    /// `time` steps of the transition relation applied to `values`.
    Bounded {
        time: f64,
        values: Vec<F>,
        min: bool,
    },
    /// Probability of reaching `target` within `time`, never passing
    /// through `zero_set`.
    BoundedReachability {
        target: StateSet,
        zero_set: Option<StateSet>,
        time: f64,
        min: bool,
    },
    /// Reward accumulated over `time` steps.
    BoundedCumulative {
        time: f64,
        state_rewards: Vec<F>,
        min: bool,
    },
    /// Reward accumulated over `time` steps, each successor contribution
    /// scaled by `discount`.
    BoundedCumulativeDiscounted {
        time: f64,
        discount: F,
        state_rewards: Vec<F>,
        min: bool,
    },
    /// Probability of eventually reaching `target`, never passing through
    /// `zero_set`.
    UnboundedReachability {
        target: StateSet,
        zero_set: Option<StateSet>,
        min: bool,
    },
    /// Fixed point of the transition relation seeded with `values`.
    Unbounded { values: Vec<F>, min: bool },
    /// Reward accumulated until a state of `sinks` is reached.
    UnboundedCumulative {
        sinks: StateSet,
        state_rewards: Vec<F>,
        min: bool,
    },
}

/// Fieldless tag of a [`Measure`], used for capability queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ObjectiveKind {
    Bounded,
    BoundedReachability,
    BoundedCumulative,
    BoundedCumulativeDiscounted,
    UnboundedReachability,
    Unbounded,
    UnboundedCumulative,
}

impl ObjectiveKind {
    /// All kinds, in declaration order.
    pub const ALL: [ObjectiveKind; 7] = [
        ObjectiveKind::Bounded,
        ObjectiveKind::BoundedReachability,
        ObjectiveKind::BoundedCumulative,
        ObjectiveKind::BoundedCumulativeDiscounted,
        ObjectiveKind::UnboundedReachability,
        ObjectiveKind::Unbounded,
        ObjectiveKind::UnboundedCumulative,
    ];

    /// Whether the objective runs a fixed number of steps.
    pub fn is_bounded(self) -> bool {
        matches!(
            self,
            ObjectiveKind::Bounded
                | ObjectiveKind::BoundedReachability
                | ObjectiveKind::BoundedCumulative
                | ObjectiveKind::BoundedCumulativeDiscounted
        )
    }

    /// Whether the objective carries state rewards.
    pub fn is_cumulative(self) -> bool {
        matches!(
            self,
            ObjectiveKind::BoundedCumulative
                | ObjectiveKind::BoundedCumulativeDiscounted
                | ObjectiveKind::UnboundedCumulative
        )
    }
}

impl fmt::Display for ObjectiveKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ObjectiveKind::Bounded => "bounded",
            ObjectiveKind::BoundedReachability => "bounded-reachability",
            ObjectiveKind::BoundedCumulative => "bounded-cumulative",
            ObjectiveKind::BoundedCumulativeDiscounted => "bounded-cumulative-discounted",
            ObjectiveKind::UnboundedReachability => "unbounded-reachability",
            ObjectiveKind::Unbounded => "unbounded",
            ObjectiveKind::UnboundedCumulative => "unbounded-cumulative",
        };
        f.write_str(name)
    }
}

impl<F> Measure<F> {
    pub fn kind(&self) -> ObjectiveKind {
        match self {
            Measure::Bounded { .. } => ObjectiveKind::Bounded,
            Measure::BoundedReachability { .. } => ObjectiveKind::BoundedReachability,
            Measure::BoundedCumulative { .. } => ObjectiveKind::BoundedCumulative,
            Measure::BoundedCumulativeDiscounted { .. } => {
                ObjectiveKind::BoundedCumulativeDiscounted
            }
            Measure::UnboundedReachability { .. } => ObjectiveKind::UnboundedReachability,
            Measure::Unbounded { .. } => ObjectiveKind::Unbounded,
            Measure::UnboundedCumulative { .. } => ObjectiveKind::UnboundedCumulative,
        }
    }

    /// Whether choices are resolved by minimisation.
    pub fn is_min(&self) -> bool {
        match self {
            Measure::Bounded { min, .. }
            | Measure::BoundedReachability { min, .. }
            | Measure::BoundedCumulative { min, .. }
            | Measure::BoundedCumulativeDiscounted { min, .. }
            | Measure::UnboundedReachability { min, .. }
            | Measure::Unbounded { min, .. }
            | Measure::UnboundedCumulative { min, .. } => *min,
        }
    }

    /// The time bound, if the measure has one.
    pub fn time(&self) -> Option<f64> {
        match self {
            Measure::Bounded { time, .. }
            | Measure::BoundedReachability { time, .. }
            | Measure::BoundedCumulative { time, .. }
            | Measure::BoundedCumulativeDiscounted { time, .. } => Some(*time),
            _ => None,
        }
    }

    /// Per-state rewards of cumulative measures.
    pub fn state_rewards(&self) -> Option<&[F]> {
        match self {
            Measure::BoundedCumulative { state_rewards, .. }
            | Measure::BoundedCumulativeDiscounted { state_rewards, .. }
            | Measure::UnboundedCumulative { state_rewards, .. } => Some(state_rewards),
            _ => None,
        }
    }
}

impl<F: Field> Measure<F> {
    /// Check every input against the model before any work is done.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError`] for vectors or sets of the wrong length,
    /// non-finite entries, invalid time bounds or a negative discount.
    pub fn validate(&self, model: &ModelGraph<F>) -> Result<(), ValidationError> {
        let n = model.num_states();
        if let Some(time) = self.time() {
            match model.semantics() {
                Semantics::Ctmc => validate_time(time)?,
                Semantics::Dtmc | Semantics::Mdp => {
                    validate_steps(time)?;
                }
            }
        }
        match self {
            Measure::Bounded { values, .. } | Measure::Unbounded { values, .. } => {
                validate_state_vector("values", values, n)?;
            }
            Measure::BoundedReachability {
                target, zero_set, ..
            }
            | Measure::UnboundedReachability {
                target, zero_set, ..
            } => {
                validate_set("target", target, n)?;
                if let Some(zero) = zero_set {
                    validate_set("zero_set", zero, n)?;
                }
            }
            Measure::BoundedCumulative { state_rewards, .. } => {
                validate_state_vector("state_rewards", state_rewards, n)?;
            }
            Measure::BoundedCumulativeDiscounted {
                discount,
                state_rewards,
                ..
            } => {
                validate_discount(discount)?;
                validate_state_vector("state_rewards", state_rewards, n)?;
            }
            Measure::UnboundedCumulative {
                sinks,
                state_rewards,
                ..
            } => {
                validate_set("sinks", sinks, n)?;
                validate_state_vector("state_rewards", state_rewards, n)?;
            }
        }
        Ok(())
    }
}

fn validate_set(name: &str, set: &StateSet, states: usize) -> Result<(), ValidationError> {
    if set.universe() != states {
        return Err(ValidationError::DimensionMismatch(format!(
            "{name} covers {} states but the model has {states}",
            set.universe()
        )));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Objective<F>
// ---------------------------------------------------------------------------

/// A measure together with the slot that receives its result.
#[derive(Debug, Clone, PartialEq)]
pub struct Objective<F> {
    measure: Measure<F>,
    result: Option<Vec<F>>,
}

impl<F> Objective<F> {
    pub fn new(measure: Measure<F>) -> Self {
        Self {
            measure,
            result: None,
        }
    }

    #[inline]
    pub fn measure(&self) -> &Measure<F> {
        &self.measure
    }

    #[inline]
    pub fn kind(&self) -> ObjectiveKind {
        self.measure.kind()
    }

    /// The result of the last successful solve, in original numbering with
    /// removed states skipped.
    #[inline]
    pub fn result(&self) -> Option<&[F]> {
        self.result.as_deref()
    }

    /// Move the result out, leaving the slot empty.
    pub fn take_result(&mut self) -> Option<Vec<F>> {
        self.result.take()
    }

    pub(crate) fn set_result(&mut self, values: Vec<F>) {
        self.result = Some(values);
    }
}

impl<F> From<Measure<F>> for Objective<F> {
    fn from(measure: Measure<F>) -> Self {
        Self::new(measure)
    }
}
