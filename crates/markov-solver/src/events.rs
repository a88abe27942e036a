//! Progress events for solver operations.
//!
//! Kernels report once per completed sweep (unbounded objectives) or step
//! (bounded objectives) to a [`ProgressSink`]. Events are for observation
//! only: no kernel ever reads anything back from the sink.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::objective::ObjectiveKind;
use crate::router::{Backend, KernelPlan};
use crate::types::Semantics;

/// Events emitted during a solve.
///
/// Events are tagged with `#[serde(tag = "type")]` so they serialise as
/// `{ "type": "SweepCompleted", ... }` for easy ingestion into event stores.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum SolverEvent {
    /// A solve passed validation and preprocessing and is about to iterate.
    SolveRequested {
        /// Model semantics.
        semantics: Semantics,
        /// Objective kind.
        objective: ObjectiveKind,
        /// Kernel that will run.
        kernel: KernelPlan,
        /// Numeric backend.
        backend: Backend,
        /// States in the iteration graph.
        states: usize,
        /// Transitions in the iteration graph.
        transitions: usize,
    },

    /// One fixed-point sweep of an unbounded kernel completed.
    SweepCompleted {
        /// Sweep number (1-based).
        sweep: usize,
        /// Measured difference for this sweep.
        difference: f64,
    },

    /// One step of a bounded or transient kernel completed.
    StepCompleted {
        /// Step number (1-based).
        step: usize,
        /// Total number of steps the kernel will run.
        total: usize,
    },

    /// The solve finished and the result was written.
    SolveFinished {
        /// Sweeps or steps executed.
        sweeps: usize,
        /// Total wall time.
        wall_time: Duration,
    },
}

/// Receiver for [`SolverEvent`]s.
pub trait ProgressSink {
    /// Observe one event.
    fn on_event(&mut self, event: &SolverEvent);
}

/// Discards every event.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullSink;

impl ProgressSink for NullSink {
    #[inline]
    fn on_event(&mut self, _event: &SolverEvent) {}
}

/// Forwards events to `tracing` at trace level.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl ProgressSink for TracingSink {
    fn on_event(&mut self, event: &SolverEvent) {
        match event {
            SolverEvent::SweepCompleted { sweep, difference } => {
                tracing::trace!(sweep, difference, "sweep completed");
            }
            SolverEvent::StepCompleted { step, total } => {
                tracing::trace!(step, total, "step completed");
            }
            other => tracing::trace!(event = ?other, "solver event"),
        }
    }
}

/// Collects every event in memory.
#[derive(Debug, Clone, Default)]
pub struct EventLog {
    events: Vec<SolverEvent>,
}

impl EventLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Events in emission order.
    pub fn events(&self) -> &[SolverEvent] {
        &self.events
    }

    /// Differences reported by `SweepCompleted` events, in order.
    pub fn sweep_differences(&self) -> Vec<f64> {
        self.events
            .iter()
            .filter_map(|e| match e {
                SolverEvent::SweepCompleted { difference, .. } => Some(*difference),
                _ => None,
            })
            .collect()
    }

    /// Number of `StepCompleted` events.
    pub fn steps(&self) -> usize {
        self.events
            .iter()
            .filter(|e| matches!(e, SolverEvent::StepCompleted { .. }))
            .count()
    }
}

impl ProgressSink for EventLog {
    fn on_event(&mut self, event: &SolverEvent) {
        self.events.push(event.clone());
    }
}
