//! Pipeline orchestration: one pure function from chart description to VHDL text.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::chart::{self, ChartDesc, UnreachableStateWarning, ValidationError};
use crate::config::CompileConfig;
use crate::encode::{self, EncodeError};
use crate::logic::{self, LogicError};
use crate::minimize::{self, MinimizeError};
use crate::table::{self, NonDeterminismError};
use crate::vhdlgen::{self, CodeGenError};

/// Pipeline stage that produced a diagnostic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    /// Chart validation.
    Validate,

    /// State table construction.
    Table,

    /// State minimization and boolean simplification.
    Minimize,

    /// State encoding.
    Encode,

    /// Code emission.
    Emit,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Validate => "validate",
            Self::Table => "table",
            Self::Minimize => "minimize",
            Self::Encode => "encode",
            Self::Emit => "emit",
        };
        write!(f, "{}", name)
    }
}

/// Diagnostic category, mirroring the stage error taxonomy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiagnosticKind {
    /// Malformed chart.
    Validation,

    /// Ambiguous unresolved guards.
    NonDeterminism,

    /// Minimization fixpoint exceeded its safety bound.
    MinimizationTimeout,

    /// A simplified expression provably differs from its source.
    EquivalenceCheck,

    /// State count exceeds the chosen encoding policy's code capacity.
    Encoding,

    /// Signal or width mismatch at emission time.
    CodeGen,
}

/// Structured failure report returned to the caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostic {
    /// Failing stage.
    pub stage: Stage,

    /// Diagnostic category.
    pub kind: DiagnosticKind,

    /// Human-readable message.
    pub message: String,

    /// Ids of the offending chart entities, if any.
    pub entities: Vec<String>,
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.stage, self.message)
    }
}

/// Stage failure.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CompileError {
    /// Chart validation failed.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// The chart is non-deterministic.
    #[error(transparent)]
    NonDeterminism(#[from] NonDeterminismError),

    /// State minimization failed.
    #[error(transparent)]
    Minimize(#[from] MinimizeError),

    /// State encoding failed.
    #[error(transparent)]
    Encode(#[from] EncodeError),

    /// Equation simplification failed.
    #[error(transparent)]
    Logic(#[from] LogicError),

    /// Code emission failed.
    #[error(transparent)]
    CodeGen(#[from] CodeGenError),
}

impl CompileError {
    /// Converts the typed error into the transport-facing diagnostic.
    pub fn diagnostic(&self) -> Diagnostic {
        let (stage, kind, entities) = match self {
            Self::Validation(error) => {
                let mut entities = Vec::new();
                for issue in &error.issues {
                    for entity in issue.entities() {
                        if !entities.contains(&entity) {
                            entities.push(entity);
                        }
                    }
                }
                (Stage::Validate, DiagnosticKind::Validation, entities)
            }
            Self::NonDeterminism(error) => (
                Stage::Table,
                DiagnosticKind::NonDeterminism,
                vec![error.state.clone(), error.first.clone(), error.second.clone()],
            ),
            Self::Minimize(MinimizeError::Timeout { .. }) => {
                (Stage::Minimize, DiagnosticKind::MinimizationTimeout, vec![])
            }
            Self::Encode(EncodeError::OneHotOverflow { .. }) => {
                (Stage::Encode, DiagnosticKind::Encoding, vec![])
            }
            Self::Logic(LogicError::EquivalenceCheckFailure { target }) => {
                (Stage::Minimize, DiagnosticKind::EquivalenceCheck, vec![target.clone()])
            }
            Self::CodeGen(error) => {
                let entities = match error {
                    CodeGenError::WidthMismatch { name, .. } => vec![name.clone()],
                    CodeGenError::StateBitOutOfRange { .. } => vec![],
                };
                (Stage::Emit, DiagnosticKind::CodeGen, entities)
            }
        };
        Diagnostic { stage, kind, message: self.to_string(), entities }
    }
}

impl From<CompileError> for Diagnostic {
    fn from(error: CompileError) -> Self { error.diagnostic() }
}

/// Successful compilation result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompileOutput {
    /// Generated VHDL source text.
    pub source: String,

    /// Number of states surviving minimization.
    pub state_count: usize,

    /// State encoding width in bits.
    pub encoding_width: usize,

    /// Non-fatal findings (unreachable states dropped during validation).
    pub warnings: Vec<UnreachableStateWarning>,
}

/// Compiles a chart description into VHDL.
///
/// Pure and deterministic: no process-wide state is read or written, and identical
/// (description, configuration) pairs produce byte-identical output, so independent
/// compilations can run concurrently without coordination. Any stage failure aborts the
/// pipeline with that stage's diagnostic; no partial code text is ever returned.
pub fn compile(desc: &ChartDesc, config: &CompileConfig) -> Result<CompileOutput, Diagnostic> {
    run(desc, config).map_err(Diagnostic::from)
}

fn run(desc: &ChartDesc, config: &CompileConfig) -> Result<CompileOutput, CompileError> {
    debug!(entity = %desc.name, states = desc.states.len(), "compilation started");

    let (chart, warnings) = chart::validate(desc, config)?;
    let table = table::build(&chart, config)?;
    let reduction = minimize::reduce(&table)?;
    let encoding = encode::encode(&reduction.table, config.encoding)?;
    let equations = logic::synthesize(&reduction.table, &encoding)?;
    let design = vhdlgen::generate(&reduction.table, &encoding, &equations)?;

    let state_count = reduction.table.rows.len();
    debug!(entity = %desc.name, state_count, width = encoding.width, "compilation finished");

    Ok(CompileOutput { source: design.to_string(), state_count, encoding_width: encoding.width, warnings })
}
