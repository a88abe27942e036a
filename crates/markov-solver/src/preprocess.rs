//! Graph preprocessing.
//!
//! [`GraphPreprocessor`] turns a [`ModelGraph`] into the [`PreparedGraph`]
//! the kernels iterate on: sinks made absorbing, rates uniformised or
//! embedded, unreachable states dropped and states renumbered. The
//! [`IndexMap`] records the renumbering so inputs can be seeded into
//! iteration order and results projected back.

use tracing::{debug, instrument};

use crate::error::{SolverError, ValidationError};
use crate::field::Field;
use crate::types::{GraphShape, IterationGraph, ModelGraph, SparseChain, SparseNondet, StateSet};

// ---------------------------------------------------------------------------
// IndexMap
// ---------------------------------------------------------------------------

/// Renumbering from original state ids to iteration state ids.
///
/// Retained states map bijectively onto `0..num_retained()`; removed states
/// map to `None`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexMap {
    input_to_output: Vec<Option<usize>>,
    output_to_input: Vec<usize>,
}

impl IndexMap {
    #[cfg(test)]
    fn identity(n: usize) -> Self {
        Self {
            input_to_output: (0..n).map(Some).collect(),
            output_to_input: (0..n).collect(),
        }
    }

    /// Build from the original ids in iteration order.
    ///
    /// `order` must not contain duplicates or ids `>= num_input`.
    fn from_order(num_input: usize, order: Vec<usize>) -> Self {
        let mut input_to_output = vec![None; num_input];
        for (out, &orig) in order.iter().enumerate() {
            debug_assert!(input_to_output[orig].is_none(), "state {orig} ordered twice");
            input_to_output[orig] = Some(out);
        }
        Self {
            input_to_output,
            output_to_input: order,
        }
    }

    /// Iteration id of original state `orig`, `None` if it was removed.
    #[inline]
    pub fn output(&self, orig: usize) -> Option<usize> {
        self.input_to_output.get(orig).copied().flatten()
    }

    /// Original id of iteration state `iter_state`.
    #[inline]
    pub fn input_of(&self, iter_state: usize) -> Option<usize> {
        self.output_to_input.get(iter_state).copied()
    }

    /// Number of original states.
    #[inline]
    pub fn num_input(&self) -> usize {
        self.input_to_output.len()
    }

    /// Number of iteration states.
    #[inline]
    pub fn num_retained(&self) -> usize {
        self.output_to_input.len()
    }

    /// Remap an original-numbered vector into iteration order, dropping
    /// removed states.
    pub fn seed<F: Clone>(&self, values: &[F]) -> Vec<F> {
        debug_assert_eq!(values.len(), self.num_input());
        self.output_to_input
            .iter()
            .map(|&orig| values[orig].clone())
            .collect()
    }

    /// Read an iteration-numbered vector back in ascending original order,
    /// skipping removed states.
    pub fn project<F: Clone>(&self, values: &[F]) -> Vec<F> {
        debug_assert_eq!(values.len(), self.num_retained());
        self.input_to_output
            .iter()
            .filter_map(|out| out.map(|o| values[o].clone()))
            .collect()
    }
}

// ---------------------------------------------------------------------------
// PreparedGraph
// ---------------------------------------------------------------------------

/// Output of [`GraphPreprocessor::build`].
#[derive(Debug, Clone)]
pub struct PreparedGraph<F> {
    /// The graph the kernels iterate on, in iteration numbering.
    pub graph: IterationGraph<F>,
    /// Original to iteration numbering.
    pub index_map: IndexMap,
    /// The rate `q` used for uniformisation, if it was requested.
    pub uniformisation_rate: Option<F>,
    /// Whether the native backend may run on this graph.
    pub native: bool,
}

// ---------------------------------------------------------------------------
// GraphPreprocessor
// ---------------------------------------------------------------------------

/// Builder for a [`PreparedGraph`].
///
/// # Example
///
/// ```
/// use markov_solver::preprocess::GraphPreprocessor;
/// use markov_solver::types::{ModelGraph, SparseChain, StateSet};
///
/// let model = ModelGraph::dtmc(
///     SparseChain::from_rows(vec![vec![(1, 1.0)], vec![(0, 1.0)]]).unwrap(),
/// );
/// let target = StateSet::from_indices(2, [1]).unwrap();
/// let prepared = GraphPreprocessor::new(&model)
///     .add_sinks(&target)
///     .reorder(true)
///     .build()
///     .unwrap();
/// // The sink comes first.
/// assert_eq!(prepared.index_map.output(1), Some(0));
/// ```
#[derive(Debug)]
pub struct GraphPreprocessor<'a, F> {
    model: &'a ModelGraph<F>,
    sinks: Vec<bool>,
    uniformise: bool,
    embed: bool,
    native: bool,
    reorder: bool,
    pending: Option<ValidationError>,
}

impl<'a, F: Field> GraphPreprocessor<'a, F> {
    pub fn new(model: &'a ModelGraph<F>) -> Self {
        Self {
            model,
            sinks: vec![false; model.num_states()],
            uniformise: false,
            embed: false,
            native: false,
            reorder: false,
            pending: None,
        }
    }

    /// Make every state of `set` absorbing. May be called repeatedly.
    pub fn add_sinks(mut self, set: &StateSet) -> Self {
        if set.universe() != self.sinks.len() {
            self.pending.get_or_insert(ValidationError::DimensionMismatch(format!(
                "sink set covers {} states but the model has {}",
                set.universe(),
                self.sinks.len()
            )));
            return self;
        }
        for s in set.iter() {
            self.sinks[s] = true;
        }
        self
    }

    /// Normalise rates by the largest exit rate and add residual self-loops.
    pub fn uniformise(mut self, enabled: bool) -> Self {
        self.uniformise = enabled;
        self
    }

    /// Normalise each state's rates by its own exit rate.
    pub fn embed(mut self, enabled: bool) -> Self {
        self.embed = enabled;
        self
    }

    /// Request the native backend.
    pub fn for_native(mut self, enabled: bool) -> Self {
        self.native = enabled;
        self
    }

    /// Number sink states first.
    pub fn reorder(mut self, enabled: bool) -> Self {
        self.reorder = enabled;
        self
    }

    /// Produce the prepared graph.
    ///
    /// # Errors
    ///
    /// [`SolverError::InvalidInput`] if a sink set has the wrong length, if
    /// both uniformisation and embedding were requested, or if either was
    /// requested on a nondeterministic graph.
    #[instrument(skip(self), fields(n = self.model.num_states(), semantics = %self.model.semantics()))]
    pub fn build(self) -> Result<PreparedGraph<F>, SolverError> {
        if let Some(err) = self.pending {
            return Err(err.into());
        }
        if self.uniformise && self.embed {
            return Err(ValidationError::ParameterOutOfRange {
                name: "preprocessing".into(),
                value: "uniformise and embed".into(),
                expected: "at most one rate normalisation".into(),
            }
            .into());
        }
        let graph = self.model.graph();
        if (self.uniformise || self.embed) && graph.shape() == GraphShape::Nondet {
            return Err(ValidationError::ShapeMismatch {
                semantics: self.model.semantics(),
                shape: GraphShape::Nondet,
            }
            .into());
        }

        let index_map = IndexMap::from_order(self.model.num_states(), self.iteration_order());
        let (graph, uniformisation_rate) = match graph {
            IterationGraph::Chain(chain) => {
                let (chain, rate) = self.build_chain(chain, &index_map)?;
                (IterationGraph::Chain(chain), rate)
            }
            IterationGraph::Nondet(nondet) => {
                (IterationGraph::Nondet(self.build_nondet(nondet, &index_map)?), None)
            }
        };
        let native = self.native && F::has_native_form();

        debug!(
            retained = index_map.num_retained(),
            removed = index_map.num_input() - index_map.num_retained(),
            sinks = index_map.output_to_input.iter().filter(|&&orig| self.sinks[orig]).count(),
            transitions = graph.num_transitions(),
            native,
            "graph prepared"
        );

        Ok(PreparedGraph {
            graph,
            index_map,
            uniformisation_rate,
            native,
        })
    }

    // -----------------------------------------------------------------------
    // Internals
    // -----------------------------------------------------------------------

    /// States reachable from the initial states once sinks are absorbing.
    /// Everything is reachable when no initial states are declared.
    fn reachable(&self) -> Vec<bool> {
        let n = self.model.num_states();
        let Some(initial) = self.model.initial_states() else {
            return vec![true; n];
        };
        let graph = self.model.graph();
        let mut seen = vec![false; n];
        let mut stack: Vec<usize> = initial.iter().collect();
        for &s in &stack {
            seen[s] = true;
        }
        while let Some(s) = stack.pop() {
            if self.sinks[s] {
                continue;
            }
            for &t in graph.successor_ids(s) {
                if !seen[t] {
                    seen[t] = true;
                    stack.push(t);
                }
            }
        }
        seen
    }

    /// Retained original ids in iteration order.
    fn iteration_order(&self) -> Vec<usize> {
        let retained = self.reachable();
        let kept = (0..retained.len()).filter(|&s| retained[s]);
        if self.reorder {
            let (mut order, rest): (Vec<usize>, Vec<usize>) = kept.partition(|&s| self.sinks[s]);
            order.extend(rest);
            order
        } else {
            kept.collect()
        }
    }

    fn build_chain(
        &self,
        chain: &SparseChain<F>,
        map: &IndexMap,
    ) -> Result<(SparseChain<F>, Option<F>), SolverError> {
        let exit_rate = |s: usize| {
            chain
                .successors(s)
                .fold(F::zero(), |acc, (_, w)| acc + w.clone())
        };

        let rate = self.uniformise.then(|| {
            let mut q = F::zero();
            for &orig in &map.output_to_input {
                if !self.sinks[orig] {
                    let e = exit_rate(orig);
                    if e > q {
                        q = e;
                    }
                }
            }
            if q.is_zero() {
                F::one()
            } else {
                q
            }
        });

        let n = map.num_retained();
        let mut state_bounds = Vec::with_capacity(n + 1);
        let mut targets = Vec::with_capacity(chain.num_transitions() + n);
        let mut weights = Vec::with_capacity(chain.num_transitions() + n);
        state_bounds.push(0);

        for (out, &orig) in map.output_to_input.iter().enumerate() {
            if self.sinks[orig] {
                targets.push(out);
                weights.push(F::one());
            } else if let Some(q) = &rate {
                let exit = exit_rate(orig);
                for (t, w) in chain.successors(orig) {
                    targets.push(remap(map, orig, t)?);
                    weights.push(w.clone() / q.clone());
                }
                let residual = F::one() - exit / q.clone();
                if !residual.is_zero() {
                    targets.push(out);
                    weights.push(residual);
                }
            } else if self.embed {
                let exit = exit_rate(orig);
                if exit.is_zero() {
                    targets.push(out);
                    weights.push(F::one());
                } else {
                    for (t, w) in chain.successors(orig) {
                        targets.push(remap(map, orig, t)?);
                        weights.push(w.clone() / exit.clone());
                    }
                }
            } else {
                for (t, w) in chain.successors(orig) {
                    targets.push(remap(map, orig, t)?);
                    weights.push(w.clone());
                }
            }
            state_bounds.push(targets.len());
        }

        Ok((SparseChain::from_parts_unchecked(state_bounds, targets, weights), rate))
    }

    fn build_nondet(&self, nondet: &SparseNondet<F>, map: &IndexMap) -> Result<SparseNondet<F>, SolverError> {
        let n = map.num_retained();
        let mut state_bounds = Vec::with_capacity(n + 1);
        let mut nondet_bounds = Vec::with_capacity(nondet.num_choices() + 1);
        let mut targets = Vec::with_capacity(nondet.num_transitions());
        let mut weights = Vec::with_capacity(nondet.num_transitions());
        state_bounds.push(0);
        nondet_bounds.push(0);

        for (out, &orig) in map.output_to_input.iter().enumerate() {
            if self.sinks[orig] {
                targets.push(out);
                weights.push(F::one());
                nondet_bounds.push(targets.len());
            } else {
                for c in nondet.choices(orig) {
                    for (t, w) in nondet.choice_successors(c) {
                        targets.push(remap(map, orig, t)?);
                        weights.push(w.clone());
                    }
                    nondet_bounds.push(targets.len());
                }
            }
            state_bounds.push(nondet_bounds.len() - 1);
        }

        Ok(SparseNondet::from_parts_unchecked(state_bounds, nondet_bounds, targets, weights))
    }
}

/// Iteration id of successor `t` of retained state `orig`.
///
/// Successors of retained non-sink states are reachable, hence retained.
#[inline]
fn remap(map: &IndexMap, orig: usize, t: usize) -> Result<usize, SolverError> {
    map.output(t).ok_or_else(|| {
        SolverError::Internal(format!("successor {t} of retained state {orig} was removed"))
    })
}
