//! Solver configuration.
//!
//! [`SolverConfig`] carries the four knobs of the iterative engine. It
//! deserialises from TOML with every field optional:
//!
//! ```toml
//! method = "jacobi"
//! stop_criterion = "relative"
//! tolerance = 1e-8
//! use_native = false
//! ```

use std::fmt;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::SolverError;
use crate::validation::validate_tolerance;

/// Fixed-point sweep discipline for unbounded objectives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum IterationMethod {
    /// Double-buffered sweeps that read only the previous iterate.
    Jacobi,
    /// In-place sweeps that read the freshest value of every state.
    GaussSeidel,
}

impl fmt::Display for IterationMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IterationMethod::Jacobi => write!(f, "jacobi"),
            IterationMethod::GaussSeidel => write!(f, "gauss-seidel"),
        }
    }
}

/// How the per-sweep difference is measured.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum StopCriterion {
    /// Largest absolute change of any state.
    Absolute,
    /// Largest absolute change divided by the sup-norm of the previous
    /// iterate (undivided when that norm is zero).
    Relative,
}

/// Configuration for [`GraphSolver`](crate::solver::GraphSolver).
///
/// # Example
///
/// ```rust
/// use markov_solver::config::{IterationMethod, SolverConfig};
///
/// let config = SolverConfig {
///     method: IterationMethod::Jacobi,
///     ..Default::default()
/// };
/// assert_eq!(config.tolerance, 1e-10);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SolverConfig {
    /// Sweep discipline for unbounded objectives.
    ///
    /// Default: [`IterationMethod::GaussSeidel`].
    pub method: IterationMethod,

    /// Difference measure compared against the tolerance.
    ///
    /// Default: [`StopCriterion::Absolute`].
    pub stop_criterion: StopCriterion,

    /// Convergence tolerance. Unbounded iteration stops once the measured
    /// difference is at most `tolerance / 2`. Also the precision target of
    /// the Poisson truncation for continuous-time bounded objectives.
    ///
    /// Default: `1e-10`.
    pub tolerance: f64,

    /// Use the native `f64` kernels when the weight type allows it.
    ///
    /// Default: `true`.
    pub use_native: bool,
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            method: IterationMethod::GaussSeidel,
            stop_criterion: StopCriterion::Absolute,
            tolerance: 1e-10,
            use_native: true,
        }
    }
}

impl SolverConfig {
    /// Parse a configuration from TOML text and validate it.
    ///
    /// # Errors
    ///
    /// Returns [`SolverError::Config`] on malformed TOML, unknown enum
    /// values or an out-of-range tolerance.
    pub fn from_toml_str(content: &str) -> Result<Self, SolverError> {
        let config: SolverConfig = toml::from_str(content)
            .map_err(|e| SolverError::Config(format!("failed to parse solver config: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    /// Load a configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns [`SolverError::Config`] if the file cannot be read or parsed.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, SolverError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            SolverError::Config(format!("failed to read {}: {e}", path.display()))
        })?;
        Self::from_toml_str(&content)
    }

    /// Check the invariants deserialisation cannot express.
    ///
    /// # Errors
    ///
    /// Returns [`SolverError::Config`] if the tolerance is not in `(0, 1)`.
    pub fn validate(&self) -> Result<(), SolverError> {
        validate_tolerance(self.tolerance).map_err(|e| SolverError::Config(e.to_string()))
    }

    /// Serialise back to TOML.
    pub fn to_toml_string(&self) -> Result<String, SolverError> {
        toml::to_string(self).map_err(|e| SolverError::Config(e.to_string()))
    }
}
