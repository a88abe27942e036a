//! Sparse transition graphs.
//!
//! Provides [`SparseChain`] for Markov chains (state -> successors) and
//! [`SparseNondet`] for nondeterministic models (state -> choices ->
//! successors), the [`IterationGraph`] sum type that the kernels dispatch
//! on, and [`ModelGraph`], the solver input pairing a graph with its
//! [`Semantics`].
//!
//! Graphs are immutable once built. Every constructor validates the full
//! structure, so kernels may index without re-checking.

use std::fmt;
use std::ops::Range;

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;
use crate::field::Field;
use crate::validation::{validate_chain_parts, validate_nondet_parts};

// ---------------------------------------------------------------------------
// Semantics & shape tags
// ---------------------------------------------------------------------------

/// Model semantics of a transition graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Semantics {
    /// Discrete-time Markov chain: weights are probabilities.
    Dtmc,
    /// Continuous-time Markov chain: weights are rates.
    Ctmc,
    /// Markov decision process: each choice carries a distribution.
    Mdp,
}

impl Semantics {
    /// Graph shape this semantics is stored in.
    pub fn shape(self) -> GraphShape {
        match self {
            Semantics::Dtmc | Semantics::Ctmc => GraphShape::Chain,
            Semantics::Mdp => GraphShape::Nondet,
        }
    }

    /// Whether transition weights are rates rather than probabilities.
    pub fn is_continuous_time(self) -> bool {
        matches!(self, Semantics::Ctmc)
    }
}

impl fmt::Display for Semantics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Semantics::Dtmc => write!(f, "dtmc"),
            Semantics::Ctmc => write!(f, "ctmc"),
            Semantics::Mdp => write!(f, "mdp"),
        }
    }
}

/// Storage shape of an iteration graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum GraphShape {
    /// Flat successor lists ([`SparseChain`]).
    Chain,
    /// Two-level state/choice lists ([`SparseNondet`]).
    Nondet,
}

impl fmt::Display for GraphShape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GraphShape::Chain => write!(f, "chain"),
            GraphShape::Nondet => write!(f, "nondet"),
        }
    }
}

// ---------------------------------------------------------------------------
// SparseChain<F>
// ---------------------------------------------------------------------------

/// Markov chain in compressed successor form.
///
/// # Layout
///
/// For a chain with `n` states and `m` transitions:
/// - `state_bounds` has length `n + 1`
/// - `targets` and `weights` each have length `m`
/// - State `s` owns entries `state_bounds[s]..state_bounds[s+1]`
#[derive(Debug, Clone, PartialEq)]
pub struct SparseChain<F> {
    state_bounds: Vec<usize>,
    targets: Vec<usize>,
    weights: Vec<F>,
}

impl<F: Field> SparseChain<F> {
    /// Build a chain from raw arrays, validating every structural invariant.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError`] if the bounds are not monotone, lengths
    /// disagree, a successor is out of range or a weight is not finite.
    pub fn from_parts(
        state_bounds: Vec<usize>,
        targets: Vec<usize>,
        weights: Vec<F>,
    ) -> Result<Self, ValidationError> {
        validate_chain_parts(&state_bounds, &targets, &weights)?;
        Ok(Self {
            state_bounds,
            targets,
            weights,
        })
    }

    /// Build a chain from one successor list per state.
    ///
    /// # Example
    ///
    /// ```
    /// use markov_solver::types::SparseChain;
    ///
    /// let chain = SparseChain::from_rows(vec![
    ///     vec![(1, 1.0)],
    ///     vec![(1, 0.5), (2, 0.5)],
    ///     vec![(2, 1.0)],
    /// ])
    /// .unwrap();
    /// assert_eq!(chain.num_states(), 3);
    /// assert_eq!(chain.num_transitions(), 4);
    /// ```
    pub fn from_rows(rows: Vec<Vec<(usize, F)>>) -> Result<Self, ValidationError> {
        let nnz = rows.iter().map(Vec::len).sum();
        let mut state_bounds = Vec::with_capacity(rows.len() + 1);
        let mut targets = Vec::with_capacity(nnz);
        let mut weights = Vec::with_capacity(nnz);

        state_bounds.push(0);
        for row in rows {
            for (succ, w) in row {
                targets.push(succ);
                weights.push(w);
            }
            state_bounds.push(targets.len());
        }
        Self::from_parts(state_bounds, targets, weights)
    }
}

impl<F> SparseChain<F> {
    /// Assemble without validation. Callers inside the crate guarantee the
    /// invariants by construction.
    pub(crate) fn from_parts_unchecked(
        state_bounds: Vec<usize>,
        targets: Vec<usize>,
        weights: Vec<F>,
    ) -> Self {
        debug_assert_eq!(state_bounds.last().copied(), Some(targets.len()));
        debug_assert_eq!(targets.len(), weights.len());
        Self {
            state_bounds,
            targets,
            weights,
        }
    }

    /// Number of states.
    #[inline]
    pub fn num_states(&self) -> usize {
        self.state_bounds.len() - 1
    }

    /// Number of transitions.
    #[inline]
    pub fn num_transitions(&self) -> usize {
        self.targets.len()
    }

    /// Entry range owned by state `s`.
    #[inline]
    pub fn row(&self, s: usize) -> Range<usize> {
        self.state_bounds[s]..self.state_bounds[s + 1]
    }

    /// Iterate over `(successor, &weight)` pairs of state `s`.
    #[inline]
    pub fn successors(&self, s: usize) -> impl Iterator<Item = (usize, &F)> {
        let range = self.row(s);
        self.targets[range.clone()]
            .iter()
            .copied()
            .zip(self.weights[range].iter())
    }

    /// Offsets into `targets`/`weights`, one per state plus a sentinel.
    #[inline]
    pub fn state_bounds(&self) -> &[usize] {
        &self.state_bounds
    }

    /// Successor state ids.
    #[inline]
    pub fn targets(&self) -> &[usize] {
        &self.targets
    }

    /// Transition weights, parallel to [`targets`](Self::targets).
    #[inline]
    pub fn weights(&self) -> &[F] {
        &self.weights
    }
}

// ---------------------------------------------------------------------------
// SparseNondet<F>
// ---------------------------------------------------------------------------

/// Nondeterministic model in two-level compressed form.
///
/// `state_bounds[s]..state_bounds[s+1]` are the choices of state `s`;
/// `nondet_bounds[c]..nondet_bounds[c+1]` are the transitions of choice `c`.
/// Every state has at least one choice and every choice at least one
/// transition.
#[derive(Debug, Clone, PartialEq)]
pub struct SparseNondet<F> {
    state_bounds: Vec<usize>,
    nondet_bounds: Vec<usize>,
    targets: Vec<usize>,
    weights: Vec<F>,
}

impl<F: Field> SparseNondet<F> {
    /// Build from raw arrays, validating every structural invariant.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::EmptyState`] for a choice-less state,
    /// [`ValidationError::EmptyChoice`] for a choice without transitions,
    /// and the usual structural errors otherwise.
    pub fn from_parts(
        state_bounds: Vec<usize>,
        nondet_bounds: Vec<usize>,
        targets: Vec<usize>,
        weights: Vec<F>,
    ) -> Result<Self, ValidationError> {
        validate_nondet_parts(&state_bounds, &nondet_bounds, &targets, &weights)?;
        Ok(Self {
            state_bounds,
            nondet_bounds,
            targets,
            weights,
        })
    }

    /// Build from a nested list: states -> choices -> `(successor, weight)`.
    ///
    /// ```
    /// use markov_solver::types::SparseNondet;
    ///
    /// let mdp = SparseNondet::from_choices(vec![
    ///     vec![vec![(1, 1.0)], vec![(2, 1.0)]],
    ///     vec![vec![(1, 1.0)]],
    ///     vec![vec![(2, 1.0)]],
    /// ])
    /// .unwrap();
    /// assert_eq!(mdp.num_choices(), 4);
    /// ```
    pub fn from_choices(states: Vec<Vec<Vec<(usize, F)>>>) -> Result<Self, ValidationError> {
        let mut state_bounds = Vec::with_capacity(states.len() + 1);
        let mut nondet_bounds = vec![0];
        let mut targets = Vec::new();
        let mut weights = Vec::new();

        state_bounds.push(0);
        for choices in states {
            for choice in choices {
                for (succ, w) in choice {
                    targets.push(succ);
                    weights.push(w);
                }
                nondet_bounds.push(targets.len());
            }
            state_bounds.push(nondet_bounds.len() - 1);
        }
        Self::from_parts(state_bounds, nondet_bounds, targets, weights)
    }
}

impl<F> SparseNondet<F> {
    pub(crate) fn from_parts_unchecked(
        state_bounds: Vec<usize>,
        nondet_bounds: Vec<usize>,
        targets: Vec<usize>,
        weights: Vec<F>,
    ) -> Self {
        debug_assert_eq!(state_bounds.last().copied(), Some(nondet_bounds.len() - 1));
        debug_assert_eq!(nondet_bounds.last().copied(), Some(targets.len()));
        Self {
            state_bounds,
            nondet_bounds,
            targets,
            weights,
        }
    }

    /// Number of states.
    #[inline]
    pub fn num_states(&self) -> usize {
        self.state_bounds.len() - 1
    }

    /// Total number of choices over all states.
    #[inline]
    pub fn num_choices(&self) -> usize {
        self.nondet_bounds.len() - 1
    }

    /// Number of transitions.
    #[inline]
    pub fn num_transitions(&self) -> usize {
        self.targets.len()
    }

    /// Choice ids of state `s`.
    #[inline]
    pub fn choices(&self, s: usize) -> Range<usize> {
        self.state_bounds[s]..self.state_bounds[s + 1]
    }

    /// Entry range owned by choice `c`.
    #[inline]
    pub fn choice_row(&self, c: usize) -> Range<usize> {
        self.nondet_bounds[c]..self.nondet_bounds[c + 1]
    }

    /// Iterate over `(successor, &weight)` pairs of choice `c`.
    #[inline]
    pub fn choice_successors(&self, c: usize) -> impl Iterator<Item = (usize, &F)> {
        let range = self.choice_row(c);
        self.targets[range.clone()]
            .iter()
            .copied()
            .zip(self.weights[range].iter())
    }

    #[inline]
    pub fn state_bounds(&self) -> &[usize] {
        &self.state_bounds
    }

    #[inline]
    pub fn nondet_bounds(&self) -> &[usize] {
        &self.nondet_bounds
    }

    #[inline]
    pub fn targets(&self) -> &[usize] {
        &self.targets
    }

    #[inline]
    pub fn weights(&self) -> &[F] {
        &self.weights
    }
}

// ---------------------------------------------------------------------------
// IterationGraph<F>
// ---------------------------------------------------------------------------

/// A transition graph in one of the two supported shapes.
#[derive(Debug, Clone, PartialEq)]
pub enum IterationGraph<F> {
    /// Markov chain.
    Chain(SparseChain<F>),
    /// Nondeterministic model.
    Nondet(SparseNondet<F>),
}

impl<F> IterationGraph<F> {
    /// Shape tag of this graph.
    pub fn shape(&self) -> GraphShape {
        match self {
            IterationGraph::Chain(_) => GraphShape::Chain,
            IterationGraph::Nondet(_) => GraphShape::Nondet,
        }
    }

    /// Number of states.
    pub fn num_states(&self) -> usize {
        match self {
            IterationGraph::Chain(g) => g.num_states(),
            IterationGraph::Nondet(g) => g.num_states(),
        }
    }

    /// Number of transitions.
    pub fn num_transitions(&self) -> usize {
        match self {
            IterationGraph::Chain(g) => g.num_transitions(),
            IterationGraph::Nondet(g) => g.num_transitions(),
        }
    }

    /// Successor ids of state `s`, across all of its choices.
    pub(crate) fn successor_ids(&self, s: usize) -> &[usize] {
        match self {
            IterationGraph::Chain(g) => &g.targets[g.row(s)],
            IterationGraph::Nondet(g) => {
                let choices = g.choices(s);
                let start = g.nondet_bounds[choices.start];
                let end = g.nondet_bounds[choices.end];
                &g.targets[start..end]
            }
        }
    }
}

// ---------------------------------------------------------------------------
// StateSet
// ---------------------------------------------------------------------------

/// A set of states over a fixed universe `0..len`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StateSet {
    members: Vec<bool>,
}

impl StateSet {
    /// The empty set over `len` states.
    pub fn empty(len: usize) -> Self {
        Self {
            members: vec![false; len],
        }
    }

    /// Build from a list of member indices.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::IndexOutOfBounds`] if an index is `>= len`.
    pub fn from_indices(
        len: usize,
        indices: impl IntoIterator<Item = usize>,
    ) -> Result<Self, ValidationError> {
        let mut set = Self::empty(len);
        for index in indices {
            if index >= len {
                return Err(ValidationError::IndexOutOfBounds {
                    index,
                    state: index,
                    states: len,
                });
            }
            set.members[index] = true;
        }
        Ok(set)
    }

    /// Size of the universe.
    #[inline]
    pub fn universe(&self) -> usize {
        self.members.len()
    }

    #[inline]
    pub fn contains(&self, state: usize) -> bool {
        self.members.get(state).copied().unwrap_or(false)
    }

    /// Number of members.
    pub fn count(&self) -> usize {
        self.members.iter().filter(|&&m| m).count()
    }

    /// Iterate over member indices in ascending order.
    pub fn iter(&self) -> impl Iterator<Item = usize> + '_ {
        self.members
            .iter()
            .enumerate()
            .filter_map(|(i, &m)| m.then_some(i))
    }
}

// ---------------------------------------------------------------------------
// ModelGraph<F>
// ---------------------------------------------------------------------------

/// Solver input: a transition graph together with its semantics.
///
/// If initial states are declared, the preprocessor drops every state that
/// cannot be reached from them once sinks are in place.
#[derive(Debug, Clone)]
pub struct ModelGraph<F> {
    semantics: Semantics,
    graph: IterationGraph<F>,
    initial_states: Option<StateSet>,
}

impl<F: Field> ModelGraph<F> {
    /// Pair a graph with its semantics.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::ShapeMismatch`] when the graph shape does
    /// not fit the semantics (e.g. a chain declared as an MDP).
    pub fn new(semantics: Semantics, graph: IterationGraph<F>) -> Result<Self, ValidationError> {
        if semantics.shape() != graph.shape() {
            return Err(ValidationError::ShapeMismatch {
                semantics,
                shape: graph.shape(),
            });
        }
        Ok(Self {
            semantics,
            graph,
            initial_states: None,
        })
    }

    /// A discrete-time Markov chain.
    pub fn dtmc(chain: SparseChain<F>) -> Self {
        Self {
            semantics: Semantics::Dtmc,
            graph: IterationGraph::Chain(chain),
            initial_states: None,
        }
    }

    /// A continuous-time Markov chain; weights are rates.
    pub fn ctmc(chain: SparseChain<F>) -> Self {
        Self {
            semantics: Semantics::Ctmc,
            graph: IterationGraph::Chain(chain),
            initial_states: None,
        }
    }

    /// A Markov decision process.
    pub fn mdp(nondet: SparseNondet<F>) -> Self {
        Self {
            semantics: Semantics::Mdp,
            graph: IterationGraph::Nondet(nondet),
            initial_states: None,
        }
    }

    /// Declare the initial states.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::DimensionMismatch`] if the set's universe
    /// differs from the number of states.
    pub fn with_initial_states(mut self, initial: StateSet) -> Result<Self, ValidationError> {
        if initial.universe() != self.graph.num_states() {
            return Err(ValidationError::DimensionMismatch(format!(
                "initial state set covers {} states, graph has {}",
                initial.universe(),
                self.graph.num_states()
            )));
        }
        self.initial_states = Some(initial);
        Ok(self)
    }
}

impl<F> ModelGraph<F> {
    #[inline]
    pub fn semantics(&self) -> Semantics {
        self.semantics
    }

    #[inline]
    pub fn graph(&self) -> &IterationGraph<F> {
        &self.graph
    }

    #[inline]
    pub fn initial_states(&self) -> Option<&StateSet> {
        self.initial_states.as_ref()
    }

    #[inline]
    pub fn num_states(&self) -> usize {
        self.graph.num_states()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
