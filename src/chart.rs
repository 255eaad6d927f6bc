//! Chart validation: turns a raw chart description into a validated, immutable graph.

use linked_hash_map::LinkedHashMap;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::warn;

use crate::config::CompileConfig;
use crate::expr::{Expr, Var};

/// Port names claimed by the generated entity itself.
const RESERVED_NAMES: [&str; 4] = ["clk", "reset", "current_state", "next_state"];

/// Signal direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    /// Input port.
    Input,

    /// Output port.
    Output,
}

/// Declared port signal. Immutable once declared.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Signal {
    /// Port name.
    pub name: String,

    /// Port direction.
    pub direction: Direction,

    /// Bit width.
    pub width: usize,
}

/// Raw state node description.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateDesc {
    /// State identifier.
    pub id: String,

    /// Output bindings: output signal name to expression over inputs. A constant
    /// binding gives Moore-style outputs; expressions over inputs give Mealy-style
    /// per-state outputs.
    #[serde(default)]
    pub outputs: Vec<(String, Expr)>,
}

/// Raw transition description.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransitionDesc {
    /// Transition identifier.
    pub id: String,

    /// Source state id.
    pub from: String,

    /// Target state id.
    pub to: String,

    /// Guard expression over input signals.
    pub guard: Expr,

    /// Priority; lower numbers are considered first.
    pub priority: u32,
}

/// Raw chart description, as handed over by the transport layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChartDesc {
    /// Entity name for the generated design.
    pub name: String,

    /// Declared port signals.
    pub signals: Vec<Signal>,

    /// State nodes.
    pub states: Vec<StateDesc>,

    /// Guarded transitions.
    pub transitions: Vec<TransitionDesc>,

    /// Id of the initial/reset state.
    pub initial_state: String,
}

/// Index of a state inside its [`Chart`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct StateId(
    /// Zero-based index, stable within one chart.
    pub usize,
);

/// Validated transition, owned by its source state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transition {
    /// Transition identifier.
    pub id: String,

    /// Target state.
    pub target: StateId,

    /// Guard expression over input signals.
    pub guard: Expr,

    /// Priority; lower numbers are considered first.
    pub priority: u32,
}

/// Validated state with total output bindings and its outgoing transitions in
/// declaration order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct State {
    /// State identifier.
    pub id: String,

    /// Output bindings, one per declared output signal, in declaration order.
    pub outputs: LinkedHashMap<String, Expr>,

    /// Outgoing transitions in declaration order.
    pub transitions: Vec<Transition>,
}

/// Validated, immutable chart graph.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chart {
    /// Entity name.
    pub name: String,

    /// Declared port signals.
    pub signals: Vec<Signal>,

    /// Reachable states, in declaration order.
    pub states: Vec<State>,

    /// Initial/reset state.
    pub initial: StateId,
}

impl Chart {
    /// Declared input signals, in declaration order.
    pub fn inputs(&self) -> impl Iterator<Item = &Signal> {
        self.signals.iter().filter(|signal| signal.direction == Direction::Input)
    }

    /// Declared output signals, in declaration order.
    pub fn outputs(&self) -> impl Iterator<Item = &Signal> {
        self.signals.iter().filter(|signal| signal.direction == Direction::Output)
    }
}

/// Single validation finding.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
pub enum ValidationIssue {
    /// Entity or signal name is not a legal identifier.
    #[error("`{name}` is not a legal identifier")]
    InvalidName {
        /// Offending name.
        name: String,
    },

    /// Signal declared more than once.
    #[error("signal `{name}` is declared more than once")]
    DuplicateSignal {
        /// Offending signal name.
        name: String,
    },

    /// Signal name collides with a port of the generated entity.
    #[error("signal name `{name}` is reserved by the generated entity")]
    ReservedName {
        /// Offending signal name.
        name: String,
    },

    /// State declared more than once.
    #[error("state `{id}` is declared more than once")]
    DuplicateState {
        /// Offending state id.
        id: String,
    },

    /// Transition id used more than once.
    #[error("transition id `{id}` is used more than once")]
    DuplicateTransition {
        /// Offending transition id.
        id: String,
    },

    /// Expression references an undeclared signal.
    #[error("`{referenced_by}` references undeclared signal `{name}`")]
    UndeclaredSignal {
        /// Undeclared signal name.
        name: String,
        /// Id of the state or transition containing the reference.
        referenced_by: String,
    },

    /// Expression references an output signal where only inputs are legal.
    #[error("`{referenced_by}` references output signal `{name}` in an expression over inputs")]
    NotAnInput {
        /// Offending signal name.
        name: String,
        /// Id of the state or transition containing the reference.
        referenced_by: String,
    },

    /// State binds a signal that is not a declared output.
    #[error("state `{state}` binds `{name}`, which is not a declared output")]
    NotAnOutput {
        /// Offending signal name.
        name: String,
        /// Binding state id.
        state: String,
    },

    /// User expression contains an encoded state bit literal.
    #[error("`{referenced_by}` references an encoded state bit, which is reserved for generated logic")]
    StateBitReference {
        /// Id of the state or transition containing the reference.
        referenced_by: String,
    },

    /// No initial state designated.
    #[error("no initial state designated")]
    MissingInitialState,

    /// Designated initial state does not exist.
    #[error("initial state `{id}` is not a declared state")]
    UnknownInitialState {
        /// Offending state id.
        id: String,
    },

    /// Transition endpoint names an unknown state.
    #[error("transition `{id}` references unknown state `{state}`")]
    DanglingTransition {
        /// Offending transition id.
        id: String,
        /// Unknown endpoint state id.
        state: String,
    },

    /// Output left unbound while explicit bindings are required.
    #[error("state `{state}` leaves output `{signal}` unbound")]
    UnboundOutput {
        /// Binding state id.
        state: String,
        /// Unbound output signal name.
        signal: String,
    },
}

impl ValidationIssue {
    /// Ids of the chart entities this issue points at.
    pub fn entities(&self) -> Vec<String> {
        match self {
            Self::MissingInitialState => vec![],
            Self::InvalidName { name } => vec![name.clone()],
            Self::DuplicateSignal { name } | Self::ReservedName { name } => vec![name.clone()],
            Self::DuplicateState { id }
            | Self::DuplicateTransition { id }
            | Self::UnknownInitialState { id } => vec![id.clone()],
            Self::UndeclaredSignal { referenced_by, .. }
            | Self::NotAnInput { referenced_by, .. }
            | Self::StateBitReference { referenced_by } => vec![referenced_by.clone()],
            Self::NotAnOutput { state, .. } | Self::UnboundOutput { state, .. } => vec![state.clone()],
            Self::DanglingTransition { id, .. } => vec![id.clone()],
        }
    }
}

/// Malformed chart. Carries every finding of the validation pass, not only the first.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[error("chart validation failed: {}", .issues.iter().map(|issue| issue.to_string()).collect::<Vec<_>>().join("; "))]
pub struct ValidationError {
    /// All findings, in detection order.
    pub issues: Vec<ValidationIssue>,
}

/// Non-fatal finding: a state was unreachable from the initial state and has been
/// dropped from the compiled output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnreachableStateWarning {
    /// Dropped state id.
    pub state: String,
}

fn legal_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    chars.next().map_or(false, |c| c.is_ascii_alphabetic()) && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// Checks an expression that must range over declared input signals only.
fn check_expr(expr: &Expr, referenced_by: &str, signals: &[Signal], issues: &mut Vec<ValidationIssue>) {
    for var in expr.vars() {
        match var {
            Var::StateBit(_) => {
                issues.push(ValidationIssue::StateBitReference { referenced_by: referenced_by.to_string() })
            }
            Var::Signal(name) => match signals.iter().find(|signal| signal.name == name) {
                None => issues
                    .push(ValidationIssue::UndeclaredSignal { name, referenced_by: referenced_by.to_string() }),
                Some(signal) if signal.direction == Direction::Output => {
                    issues.push(ValidationIssue::NotAnInput { name, referenced_by: referenced_by.to_string() })
                }
                Some(_) => {}
            },
        }
    }
}

/// Validates a raw chart description.
///
/// All violations are collected and reported together. On success returns the validated
/// chart (restricted to states reachable from the initial state) together with one
/// warning per dropped unreachable state.
pub fn validate(
    desc: &ChartDesc, config: &CompileConfig,
) -> Result<(Chart, Vec<UnreachableStateWarning>), ValidationError> {
    let mut issues = Vec::new();

    if !legal_identifier(&desc.name) {
        issues.push(ValidationIssue::InvalidName { name: desc.name.clone() });
    }

    for (index, signal) in desc.signals.iter().enumerate() {
        if desc.signals[..index].iter().any(|other| other.name == signal.name) {
            issues.push(ValidationIssue::DuplicateSignal { name: signal.name.clone() });
        }
        if RESERVED_NAMES.contains(&signal.name.as_str()) {
            issues.push(ValidationIssue::ReservedName { name: signal.name.clone() });
        } else if !legal_identifier(&signal.name) {
            issues.push(ValidationIssue::InvalidName { name: signal.name.clone() });
        }
    }

    for (index, state) in desc.states.iter().enumerate() {
        if desc.states[..index].iter().any(|other| other.id == state.id) {
            issues.push(ValidationIssue::DuplicateState { id: state.id.clone() });
        }
        for (name, expr) in &state.outputs {
            match desc.signals.iter().find(|signal| signal.name == *name) {
                None => issues
                    .push(ValidationIssue::UndeclaredSignal { name: name.clone(), referenced_by: state.id.clone() }),
                Some(signal) if signal.direction == Direction::Input => {
                    issues.push(ValidationIssue::NotAnOutput { name: name.clone(), state: state.id.clone() })
                }
                Some(_) => {}
            }
            check_expr(expr, &state.id, &desc.signals, &mut issues);
        }
    }

    if desc.initial_state.is_empty() {
        issues.push(ValidationIssue::MissingInitialState);
    } else if !desc.states.iter().any(|state| state.id == desc.initial_state) {
        issues.push(ValidationIssue::UnknownInitialState { id: desc.initial_state.clone() });
    }

    for (index, transition) in desc.transitions.iter().enumerate() {
        if desc.transitions[..index].iter().any(|other| other.id == transition.id) {
            issues.push(ValidationIssue::DuplicateTransition { id: transition.id.clone() });
        }
        for endpoint in [&transition.from, &transition.to] {
            if !desc.states.iter().any(|state| state.id == *endpoint) {
                issues.push(ValidationIssue::DanglingTransition {
                    id: transition.id.clone(),
                    state: endpoint.clone(),
                });
            }
        }
        check_expr(&transition.guard, &transition.id, &desc.signals, &mut issues);
    }

    if config.require_explicit_outputs {
        for state in &desc.states {
            for signal in desc.signals.iter().filter(|signal| signal.direction == Direction::Output) {
                if !state.outputs.iter().any(|(name, _)| *name == signal.name) {
                    issues.push(ValidationIssue::UnboundOutput {
                        state: state.id.clone(),
                        signal: signal.name.clone(),
                    });
                }
            }
        }
    }

    if !issues.is_empty() {
        return Err(ValidationError { issues });
    }

    // Structure is sound from here on; build the graph with total output bindings.
    let state_index =
        |id: &str| StateId(desc.states.iter().position(|state| state.id == id).expect("validated state id"));

    let mut states = desc
        .states
        .iter()
        .map(|state| {
            let outputs = desc
                .signals
                .iter()
                .filter(|signal| signal.direction == Direction::Output)
                .map(|signal| {
                    let bound = state
                        .outputs
                        .iter()
                        .find(|(name, _)| *name == signal.name)
                        .map(|(_, expr)| expr.clone());
                    (signal.name.clone(), bound.unwrap_or(Expr::Const(false)))
                })
                .collect();
            State { id: state.id.clone(), outputs, transitions: Vec::new() }
        })
        .collect::<Vec<_>>();

    for transition in &desc.transitions {
        let StateId(from) = state_index(&transition.from);
        states[from].transitions.push(Transition {
            id: transition.id.clone(),
            target: state_index(&transition.to),
            guard: transition.guard.clone(),
            priority: transition.priority,
        });
    }

    // BFS reachability from the initial state; unreachable states are dropped with a
    // warning, never silently kept.
    let initial = state_index(&desc.initial_state);
    let mut reachable = vec![false; states.len()];
    let mut queue = std::collections::VecDeque::from([initial]);
    reachable[initial.0] = true;
    while let Some(StateId(current)) = queue.pop_front() {
        for transition in &states[current].transitions {
            if !reachable[transition.target.0] {
                reachable[transition.target.0] = true;
                queue.push_back(transition.target);
            }
        }
    }

    let warnings = states
        .iter()
        .enumerate()
        .filter(|(index, _)| !reachable[*index])
        .map(|(_, state)| {
            warn!(state = %state.id, "dropping unreachable state");
            UnreachableStateWarning { state: state.id.clone() }
        })
        .collect::<Vec<_>>();

    let remap = {
        let mut remap = vec![usize::MAX; states.len()];
        let mut next = 0;
        for (index, live) in reachable.iter().enumerate() {
            if *live {
                remap[index] = next;
                next += 1;
            }
        }
        remap
    };

    let mut kept = Vec::new();
    for (index, mut state) in states.into_iter().enumerate() {
        if reachable[index] {
            for transition in &mut state.transitions {
                transition.target = StateId(remap[transition.target.0]);
            }
            kept.push(state);
        }
    }

    let chart = Chart {
        name: desc.name.clone(),
        signals: desc.signals.clone(),
        states: kept,
        initial: StateId(remap[initial.0]),
    };
    Ok((chart, warnings))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expr::Expr;

    fn signal(name: &str, direction: Direction) -> Signal { Signal { name: name.into(), direction, width: 1 } }

    fn desc() -> ChartDesc {
        ChartDesc {
            name: "demo".into(),
            signals: vec![signal("go", Direction::Input), signal("busy", Direction::Output)],
            states: vec![
                StateDesc { id: "idle".into(), outputs: vec![] },
                StateDesc { id: "run".into(), outputs: vec![("busy".into(), Expr::Const(true))] },
            ],
            transitions: vec![
                TransitionDesc {
                    id: "t0".into(),
                    from: "idle".into(),
                    to: "run".into(),
                    guard: Expr::signal("go"),
                    priority: 0,
                },
                TransitionDesc {
                    id: "t1".into(),
                    from: "run".into(),
                    to: "idle".into(),
                    guard: Expr::signal("go").not(),
                    priority: 0,
                },
            ],
            initial_state: "idle".into(),
        }
    }

    #[test]
    fn accepts_well_formed_chart_and_defaults_outputs() {
        let (chart, warnings) = validate(&desc(), &CompileConfig::default()).unwrap();
        assert!(warnings.is_empty());
        assert_eq!(chart.states.len(), 2);
        // `idle` leaves `busy` unbound; it defaults to constant 0.
        assert_eq!(chart.states[0].outputs["busy"], Expr::Const(false));
        assert_eq!(chart.initial, StateId(0));
    }

    #[test]
    fn collects_all_issues_in_one_pass() {
        let mut bad = desc();
        bad.signals.push(signal("go", Direction::Input));
        bad.transitions[0].guard = Expr::signal("nope");
        bad.transitions[1].to = "missing".into();
        bad.initial_state = "absent".into();
        let err = validate(&bad, &CompileConfig::default()).unwrap_err();
        assert_eq!(err.issues.len(), 4);
        assert!(err.issues.contains(&ValidationIssue::DuplicateSignal { name: "go".into() }));
        assert!(err
            .issues
            .contains(&ValidationIssue::UndeclaredSignal { name: "nope".into(), referenced_by: "t0".into() }));
        assert!(err
            .issues
            .contains(&ValidationIssue::DanglingTransition { id: "t1".into(), state: "missing".into() }));
        assert!(err.issues.contains(&ValidationIssue::UnknownInitialState { id: "absent".into() }));
    }

    #[test]
    fn rejects_reserved_port_names() {
        let mut bad = desc();
        bad.signals.push(signal("clk", Direction::Input));
        let err = validate(&bad, &CompileConfig::default()).unwrap_err();
        assert!(err.issues.contains(&ValidationIssue::ReservedName { name: "clk".into() }));
    }

    #[test]
    fn rejects_output_signal_inside_guard() {
        let mut bad = desc();
        bad.transitions[0].guard = Expr::signal("busy");
        let err = validate(&bad, &CompileConfig::default()).unwrap_err();
        assert!(err
            .issues
            .contains(&ValidationIssue::NotAnInput { name: "busy".into(), referenced_by: "t0".into() }));
    }

    #[test]
    fn requires_explicit_outputs_when_configured() {
        let config = CompileConfig { require_explicit_outputs: true, ..CompileConfig::default() };
        let err = validate(&desc(), &config).unwrap_err();
        assert!(err
            .issues
            .contains(&ValidationIssue::UnboundOutput { state: "idle".into(), signal: "busy".into() }));
    }

    #[test]
    fn drops_unreachable_states_with_warning() {
        let mut orphaned = desc();
        orphaned.states.push(StateDesc { id: "island".into(), outputs: vec![] });
        let (chart, warnings) = validate(&orphaned, &CompileConfig::default()).unwrap();
        assert_eq!(chart.states.len(), 2);
        assert_eq!(warnings, vec![UnreachableStateWarning { state: "island".into() }]);
    }

    #[test]
    fn rejects_state_bit_literals_in_user_expressions() {
        let mut bad = desc();
        bad.transitions[0].guard = Expr::state_bit(0);
        let err = validate(&bad, &CompileConfig::default()).unwrap_err();
        assert!(err.issues.contains(&ValidationIssue::StateBitReference { referenced_by: "t0".into() }));
    }
}
