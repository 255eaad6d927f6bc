//! State minimization: Moore-style partition refinement over the state table.

use linked_hash_map::LinkedHashMap;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::chart::StateId;
use crate::expr::{Expr, Var, MAX_ENUM_VARS};
use crate::table::{Row, StateTable};

/// Semantic key of an expression over a fixed input ordering: the full truth table when
/// the inputs fit the enumeration bound, the canonical form otherwise.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum Key {
    Table(Vec<u32>),
    Canon(String),
}

fn key_of(expr: &Expr, inputs: &[Var]) -> Key {
    if inputs.len() <= MAX_ENUM_VARS {
        Key::Table(expr.on_set(inputs))
    } else {
        Key::Canon(expr.canonical())
    }
}

/// State minimization failure.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
pub enum MinimizeError {
    /// The partition-refinement fixpoint did not converge within the safety bound.
    ///
    /// Refinement strictly grows the partition, so exceeding `state count + 1` rounds
    /// signals a builder bug, not legitimate non-convergence.
    #[error("state-equivalence refinement did not converge within {iterations} rounds")]
    Timeout {
        /// Rounds executed before giving up.
        iterations: usize,
    },
}

/// Result of state-equivalence reduction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reduction {
    /// Reduced table over representative states.
    pub table: StateTable,

    /// Representative (in the reduced table) of each original state.
    pub class_of: Vec<StateId>,
}

/// Merges behaviorally equivalent states.
///
/// The initial partition groups states by semantic output signature; each round splits
/// a group whose members disagree, for some input assignment, on the group of their
/// selected successor. Each surviving group is represented by its first-declared member
/// and transitions are rewritten to reference representatives, so identical input
/// tables always reduce to identical output tables.
pub fn reduce(table: &StateTable) -> Result<Reduction, MinimizeError> {
    let n = table.rows.len();
    let inputs = table.input_vars();

    // Initial partition: semantic output-assignment signature.
    let mut group_of = assign_groups(
        (0..n).map(|state| table.rows[state].outputs.values().map(|expr| key_of(expr, &inputs)).collect::<Vec<_>>()),
    );

    // Refinement rounds, fused at `state count + 1` iterations.
    let fuse = n + 1;
    let mut iterations = 0;
    loop {
        iterations += 1;
        if iterations > fuse {
            return Err(MinimizeError::Timeout { iterations });
        }

        let refined = assign_groups((0..n).map(|state| successor_signature(table, state, &inputs, &group_of)));
        let splits = refined.iter().max().map_or(0, |g| g + 1) > group_of.iter().max().map_or(0, |g| g + 1);
        let converged = !splits;
        group_of = refined;
        if converged {
            break;
        }
    }

    // Representatives in declaration order.
    let group_count = group_of.iter().max().map_or(0, |g| g + 1);
    let mut representative = vec![usize::MAX; group_count];
    for state in (0..n).rev() {
        representative[group_of[state]] = state;
    }
    let mut order = representative.clone();
    order.sort_unstable();

    let class_of = group_of
        .iter()
        .map(|&group| StateId(order.iter().position(|&rep| rep == representative[group]).expect("representative")))
        .collect::<Vec<_>>();

    let rows = order
        .iter()
        .map(|&rep| {
            let row = &table.rows[rep];
            let transitions = row
                .transitions
                .iter()
                .map(|transition| {
                    let mut transition = transition.clone();
                    transition.target = class_of[transition.target.0];
                    transition
                })
                .collect();
            Row { id: row.id.clone(), transitions, outputs: row.outputs.clone() }
        })
        .collect::<Vec<_>>();

    debug!(before = n, after = rows.len(), rounds = iterations, "state equivalence reduction");

    let table = StateTable {
        entity: table.entity.clone(),
        signals: table.signals.clone(),
        rows,
        initial: class_of[table.initial.0],
    };
    Ok(Reduction { table, class_of })
}

/// Numbers signatures by first occurrence, yielding a deterministic group index per state.
fn assign_groups<K: std::hash::Hash + Eq>(signatures: impl Iterator<Item = K>) -> Vec<usize> {
    let mut numbering = LinkedHashMap::new();
    signatures
        .map(|signature| {
            let next = numbering.len();
            *numbering.entry(signature).or_insert(next)
        })
        .collect()
}

/// Signature distinguishing states whose selected successors land in different groups.
///
/// Within the enumeration bound the check is exhaustive over input assignments; beyond
/// it the signature falls back to the syntactic transition shape (guard canonical form,
/// priority, target group), which may under-merge but never merges inequivalent states.
fn successor_signature(table: &StateTable, state: usize, inputs: &[Var], group_of: &[usize]) -> (usize, Vec<usize>, Vec<(String, u32, usize)>) {
    let own = group_of[state];
    if inputs.len() <= MAX_ENUM_VARS {
        let successors = (0..1u32 << inputs.len())
            .map(|assignment| {
                let env = |var: &Var| inputs.iter().position(|v| v == var).map_or(false, |i| assignment & (1 << i) != 0);
                group_of[table.successor(StateId(state), &env).0]
            })
            .collect();
        (own, successors, Vec::new())
    } else {
        let shape = table.rows[state]
            .transitions
            .iter()
            .map(|transition| (transition.guard.canonical(), transition.priority, group_of[transition.target.0]))
            .collect();
        (own, Vec::new(), shape)
    }
}
