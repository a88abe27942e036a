//! Iterative fixed-point solvers for probabilistic model checking.
//!
//! This crate computes reachability probabilities, bounded and transient
//! probabilities, and accumulated (optionally discounted) rewards on sparse
//! discrete-time Markov chains (DTMCs), continuous-time Markov chains
//! (CTMCs) and Markov decision processes (MDPs).
//!
//! # Kernels
//!
//! | Model | Objective | Kernel |
//! |-------|-----------|--------|
//! | DTMC | unbounded | Jacobi or Gauss-Seidel ([`kernels`]) |
//! | DTMC | bounded | fixed step count ([`kernels::bounded`]) |
//! | CTMC | bounded | uniformisation + Fox–Glynn ([`kernels::transient`]) |
//! | CTMC | unbounded | embedded chain, Jacobi or Gauss-Seidel |
//! | MDP | unbounded / bounded | min/max value iteration ([`nondet`]) |
//!
//! Every kernel exists twice: generic over any [`Field`](field::Field)
//! (e.g. exact rationals) and natively over `f64` ([`native`]). The
//! [`GraphSolver`](solver::GraphSolver) picks the native path whenever the
//! weight type allows it.
//!
//! # Example
//!
//! ```rust
//! use markov_solver::config::{IterationMethod, SolverConfig};
//! use markov_solver::objective::{Measure, Objective};
//! use markov_solver::solver::GraphSolver;
//! use markov_solver::types::{ModelGraph, SparseChain, StateSet};
//!
//! // 0 -> 1 -> {1, 2}, with 2 absorbing.
//! let model = ModelGraph::dtmc(
//!     SparseChain::from_rows(vec![
//!         vec![(1, 1.0)],
//!         vec![(1, 0.5), (2, 0.5)],
//!         vec![(2, 1.0)],
//!     ])
//!     .unwrap(),
//! );
//! let mut objective = Objective::new(Measure::BoundedReachability {
//!     target: StateSet::from_indices(3, [2]).unwrap(),
//!     zero_set: None,
//!     time: 2.0,
//!     min: false,
//! });
//!
//! let solver = GraphSolver::new(SolverConfig {
//!     method: IterationMethod::Jacobi,
//!     ..Default::default()
//! });
//! let report = solver.solve(&model, &mut objective).unwrap();
//! assert_eq!(report.sweeps, 2);
//! assert_eq!(objective.result().unwrap(), &[0.5, 0.75, 1.0]);
//! ```

pub mod config;
pub mod error;
pub mod events;
pub mod field;
pub mod foxglynn;
pub mod kernels;
pub mod native;
pub mod nondet;
pub mod objective;
pub mod preprocess;
pub mod router;
pub mod solver;
pub mod types;
pub mod validation;

pub use config::{IterationMethod, SolverConfig, StopCriterion};
pub use error::{SolverError, ValidationError};
pub use events::{EventLog, NullSink, ProgressSink, SolverEvent, TracingSink};
pub use field::Field;
pub use objective::{Measure, Objective, ObjectiveKind};
pub use solver::{GraphSolver, SolveReport};
pub use types::{IterationGraph, ModelGraph, Semantics, SparseChain, SparseNondet, StateSet};
