//! Error types for the solver crate.
//!
//! Provides structured error variants for capability negotiation failures,
//! resource exhaustion in the native kernels, numerical instabilities,
//! configuration problems, and invalid inputs. All errors implement `std::error::Error` via `thiserror`.

use crate::objective::ObjectiveKind;
use crate::types::{GraphShape, Semantics};

/// Primary error type for solver operations.
///
/// A failed solve never leaves a partially written result behind: the
/// objective's result slot is only filled after every stage succeeded.
#[derive(Debug, thiserror::Error)]
pub enum SolverError {
    /// No kernel implements the requested combination of model semantics
    /// and objective kind. Raised before any iteration starts.
    #[error("no applicable solver for {objective} on {semantics} models")]
    NoApplicableSolver {
        /// Semantics of the model graph.
        semantics: Semantics,
        /// Objective kind that was requested.
        objective: ObjectiveKind,
    },

    /// A native kernel could not allocate its working buffers.
    #[error("native kernel {kernel} ran out of memory (requested {requested_bytes} bytes)")]
    OutOfMemory {
        /// Size of the allocation that failed.
        requested_bytes: usize,
        /// Kernel that attempted the allocation.
        kernel: &'static str,
    },

    /// An iterate stopped being finite, so the convergence measure is
    /// meaningless. `state` is in the caller's numbering.
    #[error("numerical instability at sweep {sweep}: value of state {state} is no longer finite")]
    NumericalInstability {
        /// Sweep in which the instability was detected.
        sweep: usize,
        /// First state whose update had no finite difference.
        state: usize,
    },

    /// A preprocessing invariant was violated. Indicates a bug in this
    /// crate rather than bad input.
    #[error("internal error: {0}")]
    Internal(String),

    /// The caller supplied invalid input (graph structure, vector lengths,
    /// parameters).
    #[error("invalid input: {0}")]
    InvalidInput(#[from] ValidationError),

    /// The solver configuration could not be loaded or is inconsistent.
    #[error("configuration error: {0}")]
    Config(String),
}

/// Validation errors for solver inputs.
///
/// These are raised eagerly, at graph construction or objective
/// validation time, so that a malformed model never reaches a kernel.
#[derive(Debug, thiserror::Error)]
pub enum ValidationError {
    /// Array lengths are inconsistent (e.g. `state_bounds` vs state count,
    /// reward vector vs state count).
    #[error("dimension mismatch: {0}")]
    DimensionMismatch(String),

    /// A value is NaN or infinite where a finite number is required.
    #[error("non-finite value detected: {0}")]
    NonFiniteValue(String),

    /// A successor id is not a valid state.
    #[error("successor {index} out of bounds for {states} states (state {state})")]
    IndexOutOfBounds {
        /// Offending successor id.
        index: usize,
        /// State (or choice) owning the offending entry.
        state: usize,
        /// Declared number of states.
        states: usize,
    },

    /// A bounds array is not monotonically non-decreasing.
    #[error("{array} is not monotonically non-decreasing at position {position}")]
    NonMonotonicBounds {
        /// Name of the offending array.
        array: &'static str,
        /// Position where the violation was detected.
        position: usize,
    },

    /// A state of a nondeterministic graph has no choices.
    #[error("state {state} has no choices")]
    EmptyState {
        /// The choice-less state.
        state: usize,
    },

    /// A choice of a nondeterministic graph has no transitions.
    #[error("choice {choice} has no transitions")]
    EmptyChoice {
        /// The degenerate choice.
        choice: usize,
    },

    /// The graph shape does not match the declared model semantics.
    #[error("{semantics} models require a different graph shape than {shape}")]
    ShapeMismatch {
        /// Declared semantics.
        semantics: Semantics,
        /// Shape of the supplied graph.
        shape: GraphShape,
    },

    /// A parameter is outside its valid range.
    #[error("parameter out of range: {name} = {value} (expected {expected})")]
    ParameterOutOfRange {
        /// Name of the parameter.
        name: String,
        /// The invalid value (as a string for flexibility).
        value: String,
        /// Human-readable description of the valid range.
        expected: String,
    },
}
