//! The solver facade.
//!
//! [`GraphSolver`] validates a request, routes it to a kernel, prepares the
//! graph, runs the kernel on the selected backend and writes the projected
//! result into the caller's [`Objective`]. On any error the objective's
//! result slot is left untouched.

use std::time::{Duration, Instant};

use num_traits::ToPrimitive;
use tracing::{info, instrument, warn};

use crate::config::{IterationMethod, SolverConfig};
use crate::error::{SolverError, ValidationError};
use crate::events::{ProgressSink, SolverEvent, TracingSink};
use crate::field::{field_from_f64, Field};
use crate::foxglynn::{fox_glynn, PoissonWindow};
use crate::native::{self, ChainView, NativeError, NondetView};
use crate::objective::{Measure, Objective, ObjectiveKind};
use crate::preprocess::{GraphPreprocessor, IndexMap, PreparedGraph};
use crate::router::{Backend, KernelPlan, SinkSource, SolverRouter};
use crate::types::{IterationGraph, ModelGraph, Semantics, StateSet};
use crate::validation::validate_steps;
use crate::{kernels, nondet};

/// Summary of a completed solve.
#[derive(Debug, Clone, PartialEq)]
pub struct SolveReport {
    /// Kernel that ran.
    pub kernel: KernelPlan,
    /// Backend it ran on.
    pub backend: Backend,
    /// Sweeps (unbounded) or steps (bounded, transient) executed.
    pub sweeps: usize,
    /// States in the iteration graph.
    pub retained_states: usize,
    /// Original states dropped as unreachable.
    pub removed_states: usize,
    /// Rate used to uniformise a continuous-time chain.
    pub uniformisation_rate: Option<f64>,
    /// Wall time of the whole solve.
    pub wall_time: Duration,
}

/// Kernel parameters extracted from a [`Measure`].
struct KernelInputs<F> {
    min: bool,
    time: f64,
    discount: Option<F>,
    rewards: Option<Vec<F>>,
}

// ---------------------------------------------------------------------------
// GraphSolver
// ---------------------------------------------------------------------------

/// Iterative solver for Markov chains and MDPs.
///
/// The solver holds only its configuration, so one instance can serve
/// concurrent calls from several threads.
///
/// # Example
///
/// ```rust
/// use markov_solver::config::SolverConfig;
/// use markov_solver::objective::{Measure, Objective};
/// use markov_solver::solver::GraphSolver;
/// use markov_solver::types::{ModelGraph, SparseChain, StateSet};
///
/// let model = ModelGraph::dtmc(
///     SparseChain::from_rows(vec![
///         vec![(1, 1.0_f64)],
///         vec![(1, 0.5), (2, 0.5)],
///         vec![(2, 1.0)],
///     ])
///     .unwrap(),
/// );
/// let mut objective = Objective::new(Measure::UnboundedReachability {
///     target: StateSet::from_indices(3, [2]).unwrap(),
///     zero_set: None,
///     min: false,
/// });
///
/// let solver = GraphSolver::new(SolverConfig::default());
/// solver.solve(&model, &mut objective).unwrap();
/// let result = objective.result().unwrap();
/// assert!((result[0] - 1.0).abs() < 1e-9);
/// ```
#[derive(Debug, Clone)]
pub struct GraphSolver {
    config: SolverConfig,
    router: SolverRouter,
}

impl GraphSolver {
    pub fn new(config: SolverConfig) -> Self {
        let router = SolverRouter::new(&config);
        Self { config, router }
    }

    #[inline]
    pub fn config(&self) -> &SolverConfig {
        &self.config
    }

    #[inline]
    pub fn router(&self) -> &SolverRouter {
        &self.router
    }

    /// Whether some kernel handles `kind` on `semantics` models.
    pub fn can_handle(&self, semantics: Semantics, kind: ObjectiveKind) -> bool {
        self.router.can_handle(semantics, kind)
    }

    /// Solve `objective` on `model`, reporting progress through `tracing`.
    ///
    /// # Errors
    ///
    /// - [`SolverError::Config`] for an invalid configuration.
    /// - [`SolverError::InvalidInput`] for inputs inconsistent with the model.
    /// - [`SolverError::NoApplicableSolver`] if no kernel fits the request.
    /// - [`SolverError::OutOfMemory`] if a native kernel cannot allocate.
    /// - [`SolverError::NumericalInstability`] if an unbounded iterate stops
    ///   being finite.
    pub fn solve<F: Field>(
        &self,
        model: &ModelGraph<F>,
        objective: &mut Objective<F>,
    ) -> Result<SolveReport, SolverError> {
        self.solve_with_sink(model, objective, &mut TracingSink)
    }

    /// Like [`solve`](Self::solve), reporting every sweep to `sink`.
    #[instrument(
        skip(self, model, objective, sink),
        fields(semantics = %model.semantics(), objective = %objective.kind(), n = model.num_states())
    )]
    pub fn solve_with_sink<F: Field>(
        &self,
        model: &ModelGraph<F>,
        objective: &mut Objective<F>,
        sink: &mut dyn ProgressSink,
    ) -> Result<SolveReport, SolverError> {
        let started = Instant::now();
        self.config.validate()?;

        let measure = objective.measure();
        let semantics = model.semantics();
        let kind = measure.kind();

        // 1. Validate.
        measure.validate(model)?;

        // 2. Route.
        let plan = self.router.plan(semantics, kind)?;

        // 3. Preprocess.
        let prepared = self.prepare(model, measure)?;
        let backend = self.router.select_backend(prepared.native);

        // 4-5. Seed values and rewards in iteration numbering.
        let mut values = initial_values(measure, &prepared.index_map);
        let inputs = kernel_inputs(measure, &prepared);

        sink.on_event(&SolverEvent::SolveRequested {
            semantics,
            objective: kind,
            kernel: plan,
            backend,
            states: prepared.graph.num_states(),
            transitions: prepared.graph.num_transitions(),
        });
        info!(
            %plan,
            %backend,
            states = prepared.graph.num_states(),
            transitions = prepared.graph.num_transitions(),
            "solve: selected kernel"
        );

        // 6-7. Run.
        let (backend, sweeps) = self
            .run(semantics, plan, backend, &prepared, &mut values, &inputs, sink)
            .map_err(|e| in_input_numbering(e, &prepared.index_map))?;

        // 8. Project back.
        objective.set_result(prepared.index_map.project(&values));

        let wall_time = started.elapsed();
        sink.on_event(&SolverEvent::SolveFinished { sweeps, wall_time });
        info!(sweeps, ?wall_time, "solve: finished");

        Ok(SolveReport {
            kernel: plan,
            backend,
            sweeps,
            retained_states: prepared.index_map.num_retained(),
            removed_states: prepared.index_map.num_input() - prepared.index_map.num_retained(),
            uniformisation_rate: prepared
                .uniformisation_rate
                .as_ref()
                .and_then(ToPrimitive::to_f64),
            wall_time,
        })
    }

    // -----------------------------------------------------------------------
    // Pipeline stages
    // -----------------------------------------------------------------------

    fn prepare<F: Field>(
        &self,
        model: &ModelGraph<F>,
        measure: &Measure<F>,
    ) -> Result<PreparedGraph<F>, SolverError> {
        let needs = self.router.preprocessing(model.semantics(), measure.kind());
        let mut builder = GraphPreprocessor::new(model)
            .uniformise(needs.uniformise)
            .embed(needs.embed)
            .for_native(self.config.use_native)
            .reorder(true);
        for set in sink_sets(needs.sinks, measure) {
            builder = builder.add_sinks(set);
        }
        builder.build()
    }

    #[allow(clippy::too_many_arguments)]
    fn run<F: Field>(
        &self,
        semantics: Semantics,
        plan: KernelPlan,
        backend: Backend,
        prepared: &PreparedGraph<F>,
        values: &mut Vec<F>,
        inputs: &KernelInputs<F>,
        sink: &mut dyn ProgressSink,
    ) -> Result<(Backend, usize), SolverError> {
        if backend == Backend::Native {
            if let Some(sweeps) = self.run_native(semantics, plan, prepared, values, inputs, sink)? {
                return Ok((Backend::Native, sweeps));
            }
        }
        let sweeps = self.run_generic(semantics, plan, prepared, values, inputs, sink)?;
        Ok((Backend::Generic, sweeps))
    }

    fn transient_window<F: Field>(
        &self,
        prepared: &PreparedGraph<F>,
        time: f64,
    ) -> Result<PoissonWindow, SolverError> {
        let rate = prepared
            .uniformisation_rate
            .as_ref()
            .and_then(ToPrimitive::to_f64)
            .unwrap_or(1.0);
        fox_glynn(time * rate, self.config.tolerance)
    }

    fn run_generic<F: Field>(
        &self,
        semantics: Semantics,
        plan: KernelPlan,
        prepared: &PreparedGraph<F>,
        values: &mut Vec<F>,
        inputs: &KernelInputs<F>,
        sink: &mut dyn ProgressSink,
    ) -> Result<usize, SolverError> {
        let cumul = inputs.rewards.as_deref();
        let discount = inputs.discount.as_ref();
        let criterion = self.config.stop_criterion;
        let tolerance = self.config.tolerance;
        let min = inputs.min;

        let sweeps = match (plan, &prepared.graph) {
            (KernelPlan::ChainUnbounded { method }, IterationGraph::Chain(g)) => match method {
                IterationMethod::Jacobi => {
                    kernels::unbounded_jacobi(g, values, cumul, criterion, tolerance, sink)?
                }
                IterationMethod::GaussSeidel => {
                    kernels::unbounded_gauss_seidel(g, values, cumul, criterion, tolerance, sink)?
                }
            },
            (KernelPlan::ChainBounded, IterationGraph::Chain(g)) => {
                let steps = validate_steps(inputs.time)?;
                kernels::bounded(g, values, steps, cumul, discount, sink)
            }
            (KernelPlan::ChainTransient, IterationGraph::Chain(g)) => {
                let window = self.transient_window(prepared, inputs.time)?;
                let fg = window
                    .weights()
                    .iter()
                    .map(|&w| field_from_f64("poisson weight", w))
                    .collect::<Result<Vec<F>, _>>()?;
                kernels::transient(g, values, window.left(), &fg, sink)
            }
            (KernelPlan::NondetUnbounded { method }, IterationGraph::Nondet(g)) => match method {
                IterationMethod::Jacobi => {
                    nondet::unbounded_jacobi(g, values, cumul, min, criterion, tolerance, sink)?
                }
                IterationMethod::GaussSeidel => {
                    nondet::unbounded_gauss_seidel(g, values, cumul, min, criterion, tolerance, sink)?
                }
            },
            (KernelPlan::NondetBounded, IterationGraph::Nondet(g)) => {
                let steps = validate_steps(inputs.time)?;
                nondet::bounded(g, values, steps, cumul, discount, min, sink)
            }
            (_, graph) => return Err(shape_mismatch(semantics, graph)),
        };
        Ok(sweeps)
    }

    /// Run on the native backend. `Ok(None)` if the arrays have no native
    /// view, in which case nothing was touched.
    fn run_native<F: Field>(
        &self,
        semantics: Semantics,
        plan: KernelPlan,
        prepared: &PreparedGraph<F>,
        values: &mut [F],
        inputs: &KernelInputs<F>,
        sink: &mut dyn ProgressSink,
    ) -> Result<Option<usize>, SolverError> {
        let Some(values) = F::native_slice_mut(values) else {
            return Ok(None);
        };
        let cumul = match inputs.rewards.as_deref() {
            Some(r) => match F::native_slice(r) {
                Some(view) => Some(view),
                None => return Ok(None),
            },
            None => None,
        };
        let discount = inputs.discount.as_ref().and_then(ToPrimitive::to_f64);
        let criterion = self.config.stop_criterion;
        let tolerance = self.config.tolerance;
        let min = inputs.min;

        let result = match (plan, &prepared.graph) {
            (KernelPlan::ChainUnbounded { .. }, IterationGraph::Chain(g))
            | (KernelPlan::ChainBounded, IterationGraph::Chain(g))
            | (KernelPlan::ChainTransient, IterationGraph::Chain(g)) => {
                let Some(view) = ChainView::from_chain(g) else {
                    return Ok(None);
                };
                match plan {
                    KernelPlan::ChainUnbounded {
                        method: IterationMethod::Jacobi,
                    } => native::chain_unbounded_jacobi(&view, values, cumul, criterion, tolerance, sink),
                    KernelPlan::ChainUnbounded {
                        method: IterationMethod::GaussSeidel,
                    } => native::chain_unbounded_gauss_seidel(
                        &view, values, cumul, criterion, tolerance, sink,
                    ),
                    KernelPlan::ChainTransient => {
                        let window = self.transient_window(prepared, inputs.time)?;
                        native::chain_transient(&view, values, window.left(), window.weights(), sink)
                    }
                    _ => {
                        let steps = validate_steps(inputs.time)?;
                        native::chain_bounded(&view, values, steps, cumul, discount, sink)
                    }
                }
            }
            (KernelPlan::NondetUnbounded { method }, IterationGraph::Nondet(g)) => {
                let Some(view) = NondetView::from_nondet(g) else {
                    return Ok(None);
                };
                match method {
                    IterationMethod::Jacobi => native::nondet_unbounded_jacobi(
                        &view, values, cumul, min, criterion, tolerance, sink,
                    ),
                    IterationMethod::GaussSeidel => native::nondet_unbounded_gauss_seidel(
                        &view, values, cumul, min, criterion, tolerance, sink,
                    ),
                }
            }
            (KernelPlan::NondetBounded, IterationGraph::Nondet(g)) => {
                let Some(view) = NondetView::from_nondet(g) else {
                    return Ok(None);
                };
                let steps = validate_steps(inputs.time)?;
                native::nondet_bounded(&view, values, steps, cumul, discount, min, sink)
            }
            (_, graph) => return Err(shape_mismatch(semantics, graph)),
        };
        result.map(Some).map_err(|e| native_failure(e, plan))
    }
}

impl Default for GraphSolver {
    fn default() -> Self {
        Self::new(SolverConfig::default())
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn sink_sets<F>(source: SinkSource, measure: &Measure<F>) -> Vec<&StateSet> {
    match (source, measure) {
        (
            SinkSource::TargetAndZeroSet,
            Measure::BoundedReachability {
                target, zero_set, ..
            }
            | Measure::UnboundedReachability {
                target, zero_set, ..
            },
        ) => std::iter::once(target).chain(zero_set.as_ref()).collect(),
        (SinkSource::Sinks, Measure::UnboundedCumulative { sinks, .. }) => vec![sinks],
        _ => Vec::new(),
    }
}

/// Initial iterate in iteration numbering.
fn initial_values<F: Field>(measure: &Measure<F>, map: &IndexMap) -> Vec<F> {
    match measure {
        Measure::BoundedReachability { target, .. }
        | Measure::UnboundedReachability { target, .. } => {
            let indicator: Vec<F> = (0..map.num_input())
                .map(|s| if target.contains(s) { F::one() } else { F::zero() })
                .collect();
            map.seed(&indicator)
        }
        Measure::Bounded { values, .. } | Measure::Unbounded { values, .. } => map.seed(values),
        Measure::BoundedCumulative { .. }
        | Measure::BoundedCumulativeDiscounted { .. }
        | Measure::UnboundedCumulative { .. } => vec![F::zero(); map.num_retained()],
    }
}

/// Rewards in iteration numbering, one per state for chains and one per
/// choice for MDPs (each choice inherits its state's reward).
///
/// Sinks of an unbounded cumulative objective earn nothing, so their value
/// stays at zero under the self-loop.
fn kernel_inputs<F: Field>(measure: &Measure<F>, prepared: &PreparedGraph<F>) -> KernelInputs<F> {
    let rewards = measure.state_rewards().map(|r| {
        let seeded = match measure {
            Measure::UnboundedCumulative { sinks, .. } => {
                let masked: Vec<F> = r
                    .iter()
                    .enumerate()
                    .map(|(s, v)| if sinks.contains(s) { F::zero() } else { v.clone() })
                    .collect();
                prepared.index_map.seed(&masked)
            }
            _ => prepared.index_map.seed(r),
        };
        match &prepared.graph {
            IterationGraph::Chain(_) => seeded,
            IterationGraph::Nondet(g) => {
                let mut per_choice = Vec::with_capacity(g.num_choices());
                for (s, reward) in seeded.iter().enumerate() {
                    per_choice.extend(g.choices(s).map(|_| reward.clone()));
                }
                per_choice
            }
        }
    });
    let discount = match measure {
        Measure::BoundedCumulativeDiscounted { discount, .. } => Some(discount.clone()),
        _ => None,
    };
    KernelInputs {
        min: measure.is_min(),
        time: measure.time().unwrap_or(0.0),
        discount,
        rewards,
    }
}

fn shape_mismatch<F>(semantics: Semantics, graph: &IterationGraph<F>) -> SolverError {
    ValidationError::ShapeMismatch {
        semantics,
        shape: graph.shape(),
    }
    .into()
}

fn native_failure(err: NativeError, plan: KernelPlan) -> SolverError {
    warn!(kernel = plan.name(), status = err.status_code(), %err, "native kernel failed");
    match err {
        NativeError::OutOfMemory { requested_bytes } => SolverError::OutOfMemory {
            requested_bytes,
            kernel: plan.name(),
        },
        NativeError::NumericalInstability { sweep, state } => {
            SolverError::NumericalInstability { sweep, state }
        }
    }
}

/// Kernels report states in iteration numbering; callers see their own.
fn in_input_numbering(err: SolverError, map: &IndexMap) -> SolverError {
    match err {
        SolverError::NumericalInstability { sweep, state } => match map.input_of(state) {
            Some(state) => SolverError::NumericalInstability { sweep, state },
            None => SolverError::Internal(format!("iteration state {state} has no input state")),
        },
        other => other,
    }
}
