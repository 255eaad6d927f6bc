//! State encoding: stable binary codes for the surviving logical states.

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::chart::StateId;
use crate::table::StateTable;
use crate::utils::clog2;

/// Largest state count a one-hot encoding can represent: codes are packed into `u32`,
/// one bit per state.
pub const MAX_ONE_HOT_STATES: usize = 32;

/// State encoding policy.
///
/// Every policy preserves the same determinism contract: identical input chart implies
/// identical encoding on every run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EncodingPolicy {
    /// Sequential binary in breadth-first discovery order.
    #[default]
    Binary,

    /// Gray code in breadth-first discovery order.
    Gray,

    /// One-hot, one register bit per state.
    OneHot,
}

/// State encoding failure.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
pub enum EncodeError {
    /// More surviving states than one-hot code bits.
    #[error("one-hot encoding supports at most {max} states, the chart has {states}")]
    OneHotOverflow {
        /// Surviving state count.
        states: usize,
        /// Largest representable one-hot state count.
        max: usize,
    },
}

/// Assignment of a fixed-width code to every state of one compilation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Encoding {
    /// Code width in bits.
    pub width: usize,

    /// Code per state, indexed by [`StateId`].
    pub codes: Vec<u32>,
}

impl Encoding {
    /// Bit `bit` of the code of `state`.
    pub fn bit(&self, state: StateId, bit: usize) -> bool { self.codes[state.0] & (1 << bit) != 0 }

    /// Returns `true` if some state carries the given code.
    pub fn is_used(&self, code: u32) -> bool { self.codes.contains(&code) }
}

/// Assigns codes in breadth-first discovery order starting from the initial state,
/// following transitions in priority order. Chosen for determinism and reproducibility
/// across identical input charts.
///
/// One-hot needs one code bit per state; charts with more than
/// [`MAX_ONE_HOT_STATES`] surviving states are rejected with
/// [`EncodeError::OneHotOverflow`] instead of overflowing the code word.
pub fn encode(table: &StateTable, policy: EncodingPolicy) -> Result<Encoding, EncodeError> {
    let n = table.rows.len();
    if policy == EncodingPolicy::OneHot && n > MAX_ONE_HOT_STATES {
        return Err(EncodeError::OneHotOverflow { states: n, max: MAX_ONE_HOT_STATES });
    }
    let width = match policy {
        EncodingPolicy::Binary | EncodingPolicy::Gray => clog2(n).max(1),
        EncodingPolicy::OneHot => n,
    };

    let mut discovery = Vec::with_capacity(n);
    let mut seen = vec![false; n];
    let mut queue = VecDeque::from([table.initial]);
    seen[table.initial.0] = true;
    while let Some(state) = queue.pop_front() {
        discovery.push(state);
        for transition in &table.rows[state.0].transitions {
            if !seen[transition.target.0] {
                seen[transition.target.0] = true;
                queue.push_back(transition.target);
            }
        }
    }
    debug_assert_eq!(discovery.len(), n, "table states are reachable post-validation");

    let mut codes = vec![0; n];
    for (rank, state) in discovery.iter().enumerate() {
        let rank = rank as u32;
        codes[state.0] = match policy {
            EncodingPolicy::Binary => rank,
            EncodingPolicy::Gray => rank ^ (rank >> 1),
            EncodingPolicy::OneHot => 1 << rank,
        };
    }

    debug!(states = n, width, ?policy, "states encoded");
    Ok(Encoding { width, codes })
}
