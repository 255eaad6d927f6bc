//! Compilation options.

use serde::{Deserialize, Serialize};

use crate::encode::EncodingPolicy;

/// Options controlling a single chart compilation.
///
/// The pipeline itself is a pure function; the configuration is part of its input and
/// identical (chart, config) pairs always produce byte-identical output.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompileConfig {
    /// State encoding policy.
    pub encoding: EncodingPolicy,

    /// Requires the guards leaving each state to be pairwise disjoint.
    ///
    /// When unset, overlapping guards with distinct priorities are legal and resolved in
    /// priority order (the emitter documents this contract in the generated code).
    /// Guards overlapping under *equal* priority are always a fatal non-determinism
    /// error, independent of this flag.
    pub require_disjoint_guards: bool,

    /// Requires every state to bind every declared output explicitly.
    ///
    /// When unset, outputs left unbound in a state default to constant 0.
    pub require_explicit_outputs: bool,
}
