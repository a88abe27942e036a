//! Kernel router.
//!
//! The [`SolverRouter`] maps a model's [`Semantics`] and an
//! [`ObjectiveKind`] to a [`KernelPlan`] and decides which preprocessing the
//! plan needs. It never touches graph data, so every decision is a pure
//! function of the request.
//!
//! # Routing table
//!
//! | Semantics | Objective | Preprocessing | Kernel |
//! |-----------|-----------|---------------|--------|
//! | DTMC | bounded kinds | - | `ChainBounded` |
//! | DTMC | unbounded kinds | - | `ChainUnbounded` |
//! | CTMC | `Bounded`, `BoundedReachability` | uniformise | `ChainTransient` |
//! | CTMC | `Unbounded`, `UnboundedReachability` | embed | `ChainUnbounded` |
//! | CTMC | cumulative kinds | | none |
//! | MDP | bounded kinds | - | `NondetBounded` |
//! | MDP | unbounded kinds | - | `NondetUnbounded` |
//!
//! Reachability kinds make the target and zero sets absorbing;
//! `UnboundedCumulative` makes its `sinks` absorbing.

use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::{IterationMethod, SolverConfig};
use crate::error::SolverError;
use crate::objective::ObjectiveKind;
use crate::types::Semantics;

// ---------------------------------------------------------------------------
// KernelPlan / Backend
// ---------------------------------------------------------------------------

/// The kernel family a solve runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kernel", rename_all = "kebab-case")]
pub enum KernelPlan {
    /// Fixed-point iteration on a chain.
    ChainUnbounded { method: IterationMethod },
    /// Fixed step count on a chain.
    ChainBounded,
    /// Poisson-weighted transient analysis on a uniformised chain.
    ChainTransient,
    /// Fixed-point value iteration on an MDP.
    NondetUnbounded { method: IterationMethod },
    /// Fixed step count value iteration on an MDP.
    NondetBounded,
}

impl KernelPlan {
    /// Name used in logs and error reports.
    pub fn name(&self) -> &'static str {
        match self {
            KernelPlan::ChainUnbounded { .. } => "chain-unbounded",
            KernelPlan::ChainBounded => "chain-bounded",
            KernelPlan::ChainTransient => "chain-transient",
            KernelPlan::NondetUnbounded { .. } => "nondet-unbounded",
            KernelPlan::NondetBounded => "nondet-bounded",
        }
    }
}

impl fmt::Display for KernelPlan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KernelPlan::ChainUnbounded { method } | KernelPlan::NondetUnbounded { method } => {
                write!(f, "{}({method})", self.name())
            }
            _ => f.write_str(self.name()),
        }
    }
}

/// Numeric backend a kernel runs on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Backend {
    /// Generic kernels over any [`Field`](crate::field::Field).
    Generic,
    /// Native `f64` kernels.
    Native,
}

impl fmt::Display for Backend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Backend::Generic => f.write_str("generic"),
            Backend::Native => f.write_str("native"),
        }
    }
}

/// Which sets the preprocessor makes absorbing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SinkSource {
    /// None.
    None,
    /// Target plus zero set.
    TargetAndZeroSet,
    /// The objective's own sink set.
    Sinks,
}

/// Preprocessing a plan requires.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Preprocessing {
    pub sinks: SinkSource,
    pub uniformise: bool,
    pub embed: bool,
}

// ---------------------------------------------------------------------------
// SolverRouter
// ---------------------------------------------------------------------------

/// Stateless kernel selector.
///
/// # Example
///
/// ```rust
/// use markov_solver::config::{IterationMethod, SolverConfig};
/// use markov_solver::objective::ObjectiveKind;
/// use markov_solver::router::{KernelPlan, SolverRouter};
/// use markov_solver::types::Semantics;
///
/// let router = SolverRouter::new(&SolverConfig::default());
/// let plan = router
///     .plan(Semantics::Ctmc, ObjectiveKind::BoundedReachability)
///     .unwrap();
/// assert_eq!(plan, KernelPlan::ChainTransient);
/// assert!(!router.can_handle(Semantics::Ctmc, ObjectiveKind::BoundedCumulative));
/// ```
#[derive(Debug, Clone)]
pub struct SolverRouter {
    method: IterationMethod,
    use_native: bool,
}

impl SolverRouter {
    pub fn new(config: &SolverConfig) -> Self {
        Self {
            method: config.method,
            use_native: config.use_native,
        }
    }

    /// Whether a kernel exists for `kind` on `semantics` models.
    pub fn can_handle(&self, semantics: Semantics, kind: ObjectiveKind) -> bool {
        match semantics {
            Semantics::Dtmc | Semantics::Mdp => true,
            Semantics::Ctmc => !kind.is_cumulative(),
        }
    }

    /// Select the kernel for `kind` on `semantics` models.
    ///
    /// # Errors
    ///
    /// [`SolverError::NoApplicableSolver`] if [`can_handle`](Self::can_handle)
    /// is false.
    pub fn plan(&self, semantics: Semantics, kind: ObjectiveKind) -> Result<KernelPlan, SolverError> {
        if !self.can_handle(semantics, kind) {
            debug!(%semantics, objective = %kind, "no kernel for request");
            return Err(SolverError::NoApplicableSolver {
                semantics,
                objective: kind,
            });
        }
        let method = self.method;
        let plan = match (semantics, kind.is_bounded()) {
            (Semantics::Dtmc, true) => KernelPlan::ChainBounded,
            (Semantics::Ctmc, true) => KernelPlan::ChainTransient,
            (Semantics::Dtmc | Semantics::Ctmc, false) => KernelPlan::ChainUnbounded { method },
            (Semantics::Mdp, true) => KernelPlan::NondetBounded,
            (Semantics::Mdp, false) => KernelPlan::NondetUnbounded { method },
        };
        debug!(%semantics, objective = %kind, %plan, "routed");
        Ok(plan)
    }

    /// Preprocessing required by `kind` on `semantics` models.
    pub fn preprocessing(&self, semantics: Semantics, kind: ObjectiveKind) -> Preprocessing {
        let sinks = match kind {
            ObjectiveKind::BoundedReachability | ObjectiveKind::UnboundedReachability => {
                SinkSource::TargetAndZeroSet
            }
            ObjectiveKind::UnboundedCumulative => SinkSource::Sinks,
            _ => SinkSource::None,
        };
        let continuous = semantics.is_continuous_time();
        Preprocessing {
            sinks,
            uniformise: continuous && kind.is_bounded(),
            embed: continuous && !kind.is_bounded(),
        }
    }

    /// Backend for a prepared graph. Every plan has a native kernel, so
    /// only the configuration and the element type decide.
    pub fn select_backend(&self, native_capable: bool) -> Backend {
        if self.use_native && native_capable {
            Backend::Native
        } else {
            Backend::Generic
        }
    }
}

impl Default for SolverRouter {
    fn default() -> Self {
        Self::new(&SolverConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn capability_table() {
        let router = SolverRouter::default();
        for kind in ObjectiveKind::ALL {
            assert!(router.can_handle(Semantics::Dtmc, kind));
            assert!(router.can_handle(Semantics::Mdp, kind));
            assert_eq!(router.can_handle(Semantics::Ctmc, kind), !kind.is_cumulative());
        }
    }

    #[test]
    fn plans_follow_semantics_and_boundedness() {
        let router = SolverRouter::new(&SolverConfig {
            method: IterationMethod::Jacobi,
            ..Default::default()
        });
        assert_eq!(
            router.plan(Semantics::Dtmc, ObjectiveKind::Bounded).unwrap(),
            KernelPlan::ChainBounded
        );
        assert_eq!(
            router.plan(Semantics::Ctmc, ObjectiveKind::Bounded).unwrap(),
            KernelPlan::ChainTransient
        );
        assert_eq!(
            router.plan(Semantics::Ctmc, ObjectiveKind::UnboundedReachability).unwrap(),
            KernelPlan::ChainUnbounded {
                method: IterationMethod::Jacobi
            }
        );
        assert_eq!(
            router.plan(Semantics::Mdp, ObjectiveKind::UnboundedCumulative).unwrap(),
            KernelPlan::NondetUnbounded {
                method: IterationMethod::Jacobi
            }
        );
        assert_eq!(
            router.plan(Semantics::Mdp, ObjectiveKind::BoundedCumulativeDiscounted).unwrap(),
            KernelPlan::NondetBounded
        );
    }

    #[test]
    fn ctmc_cumulative_has_no_kernel() {
        let router = SolverRouter::default();
        let err = router
            .plan(Semantics::Ctmc, ObjectiveKind::UnboundedCumulative)
            .unwrap_err();
        assert!(matches!(
            err,
            SolverError::NoApplicableSolver {
                semantics: Semantics::Ctmc,
                objective: ObjectiveKind::UnboundedCumulative
            }
        ));
    }

    #[test]
    fn preprocessing_decisions() {
        let router = SolverRouter::default();
        let p = router.preprocessing(Semantics::Ctmc, ObjectiveKind::BoundedReachability);
        assert_eq!(p.sinks, SinkSource::TargetAndZeroSet);
        assert!(p.uniformise && !p.embed);

        let p = router.preprocessing(Semantics::Ctmc, ObjectiveKind::Unbounded);
        assert_eq!(p.sinks, SinkSource::None);
        assert!(!p.uniformise && p.embed);

        let p = router.preprocessing(Semantics::Mdp, ObjectiveKind::UnboundedCumulative);
        assert_eq!(p.sinks, SinkSource::Sinks);
        assert!(!p.uniformise && !p.embed);
    }

    #[test]
    fn backend_selection() {
        let router = SolverRouter::default();
        assert_eq!(router.select_backend(true), Backend::Native);
        assert_eq!(router.select_backend(false), Backend::Generic);

        let router = SolverRouter::new(&SolverConfig {
            use_native: false,
            ..Default::default()
        });
        assert_eq!(router.select_backend(true), Backend::Generic);
    }

    #[test]
    fn plan_display() {
        let plan = KernelPlan::NondetUnbounded {
            method: IterationMethod::GaussSeidel,
        };
        assert_eq!(plan.to_string(), "nondet-unbounded(gauss-seidel)");
        assert_eq!(KernelPlan::ChainTransient.to_string(), "chain-transient");
        assert_eq!(Backend::Native.to_string(), "native");
    }
}
