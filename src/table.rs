//! State table construction: prioritized transition rows with determinism checking.

use linked_hash_map::LinkedHashMap;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::chart::{Chart, Direction, Signal, StateId, Transition};
use crate::config::CompileConfig;
use crate::expr::{Expr, Var};

/// One row of the state table: a state with its transitions in selection order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Row {
    /// State identifier.
    pub id: String,

    /// Outgoing transitions, ordered by priority (declaration order breaks ties).
    pub transitions: Vec<Transition>,

    /// Output bindings, one per declared output signal, in declaration order.
    pub outputs: LinkedHashMap<String, Expr>,
}

/// Derived, immutable per-state table of prioritized guarded transitions and output
/// assignments, cross-checked for determinism.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StateTable {
    /// Entity name.
    pub entity: String,

    /// Declared port signals.
    pub signals: Vec<Signal>,

    /// Table rows, indexed by [`StateId`].
    pub rows: Vec<Row>,

    /// Initial/reset state.
    pub initial: StateId,
}

impl StateTable {
    /// Declared input signals, in declaration order.
    pub fn inputs(&self) -> impl Iterator<Item = &Signal> {
        self.signals.iter().filter(|signal| signal.direction == Direction::Input)
    }

    /// Declared output signals, in declaration order.
    pub fn outputs(&self) -> impl Iterator<Item = &Signal> {
        self.signals.iter().filter(|signal| signal.direction == Direction::Output)
    }

    /// Input signals as expression variables, in declaration order.
    pub fn input_vars(&self) -> Vec<Var> { self.inputs().map(|signal| Var::Signal(signal.name.clone())).collect() }

    /// Transition selected in `state` under the given input environment: the first
    /// transition in priority order whose guard holds, if any.
    pub fn selected(&self, state: StateId, env: &impl Fn(&Var) -> bool) -> Option<&Transition> {
        self.rows[state.0].transitions.iter().find(|transition| transition.guard.eval(env))
    }

    /// Successor of `state` under the given input environment. When no guard fires the
    /// implicit self-loop keeps the machine in place.
    pub fn successor(&self, state: StateId, env: &impl Fn(&Var) -> bool) -> StateId {
        self.selected(state, env).map_or(state, |transition| transition.target)
    }

    /// Values of all declared outputs in `state` under the given input environment, in
    /// declaration order.
    pub fn output_values(&self, state: StateId, env: &impl Fn(&Var) -> bool) -> Vec<bool> {
        self.rows[state.0].outputs.values().map(|expr| expr.eval(env)).collect()
    }
}

/// Two transitions out of one state can fire simultaneously and priority does not
/// disambiguate them.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[error("state `{state}`: guards of transitions `{first}` and `{second}` can hold simultaneously")]
pub struct NonDeterminismError {
    /// Offending state id.
    pub state: String,

    /// First ambiguous transition id.
    pub first: String,

    /// Second ambiguous transition id.
    pub second: String,
}

/// Builds the state table from a validated chart.
///
/// Transitions are stably ordered by priority, so equal priorities keep declaration
/// order. Guards of equal priority that can hold simultaneously are a fatal
/// [`NonDeterminismError`]; with `require_disjoint_guards` set, any overlapping pair is,
/// even when priority would disambiguate.
pub fn build(chart: &Chart, config: &CompileConfig) -> Result<StateTable, NonDeterminismError> {
    let mut rows = Vec::with_capacity(chart.states.len());

    for state in &chart.states {
        let mut transitions = state.transitions.clone();
        transitions.sort_by_key(|transition| transition.priority);

        for (index, first) in transitions.iter().enumerate() {
            for second in &transitions[index + 1..] {
                let ambiguous = first.priority == second.priority || config.require_disjoint_guards;
                if ambiguous && first.guard.overlaps(&second.guard) {
                    return Err(NonDeterminismError {
                        state: state.id.clone(),
                        first: first.id.clone(),
                        second: second.id.clone(),
                    });
                }
            }
        }

        rows.push(Row { id: state.id.clone(), transitions, outputs: state.outputs.clone() });
    }

    debug!(states = rows.len(), "state table built");
    Ok(StateTable { entity: chart.name.clone(), signals: chart.signals.clone(), rows, initial: chart.initial })
}
