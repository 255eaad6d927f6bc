//! Generates VHDL from the encoded, simplified machine.
//!
//! Purely textual lowering: every logic decision has been made by the earlier stages,
//! this module only checks emission-level well-formedness (signal widths) and renders.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::encode::Encoding;
use crate::expr::{Expr, Var};
use crate::logic::Equations;
use crate::table::StateTable;
use crate::utils::code_bits;
use crate::vhdl::{
    Architecture, ConcurrentItem, Declaration, DesignFile, Entity, Expression, LogicOp, PortDeclaration, Process,
    Statement,
};

/// Emission-time failure.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
pub enum CodeGenError {
    /// A boolean equation references a signal that is not single-bit.
    #[error("signal `{name}` has width {width} but is used as a single-bit boolean")]
    WidthMismatch {
        /// Offending signal name.
        name: String,
        /// Declared width.
        width: usize,
    },

    /// An equation references a state bit outside the encoding width.
    #[error("state bit {bit} referenced outside encoding width {width}")]
    StateBitOutOfRange {
        /// Referenced bit.
        bit: usize,
        /// Encoding width.
        width: usize,
    },
}

/// Lowers a boolean expression into a VHDL expression over ports and state bits.
fn lower(expr: &Expr, table: &StateTable, width: usize) -> Result<Expression, CodeGenError> {
    match expr {
        Expr::Const(value) => Ok(Expression::Bit(*value)),
        Expr::Var(Var::Signal(name)) => {
            let signal = table.signals.iter().find(|signal| signal.name == *name).expect("validated signal");
            if signal.width != 1 {
                return Err(CodeGenError::WidthMismatch { name: name.clone(), width: signal.width });
            }
            Ok(Expression::Ident(name.clone()))
        }
        Expr::Var(Var::StateBit(bit)) => {
            if *bit >= width {
                return Err(CodeGenError::StateBitOutOfRange { bit: *bit, width });
            }
            Ok(Expression::Indexed("current_state".to_string(), *bit))
        }
        Expr::Not(inner) => Ok(lower(inner, table, width)?.not()),
        Expr::And(args) => Ok(Expression::Nary(
            LogicOp::And,
            args.iter().map(|arg| lower(arg, table, width)).collect::<Result<_, _>>()?,
        )),
        Expr::Or(args) => Ok(Expression::Nary(
            LogicOp::Or,
            args.iter().map(|arg| lower(arg, table, width)).collect::<Result<_, _>>()?,
        )),
    }
}

/// Renders the encoded machine as a VHDL design file.
pub fn generate(table: &StateTable, encoding: &Encoding, equations: &Equations) -> Result<DesignFile, CodeGenError> {
    let width = encoding.width;

    let mut port_decls = vec![
        PortDeclaration::Input(1, "clk".to_string()),
        PortDeclaration::Input(1, "reset".to_string()),
    ];
    port_decls.extend(table.inputs().map(|signal| PortDeclaration::Input(signal.width, signal.name.clone())));
    for signal in table.outputs() {
        if signal.width != 1 {
            // Output equations are single-bit assignments.
            return Err(CodeGenError::WidthMismatch { name: signal.name.clone(), width: signal.width });
        }
        port_decls.push(PortDeclaration::Output(signal.width, signal.name.clone()));
    }

    let entity = Entity { name: table.entity.clone(), port_decls };

    let mut comb_stmts = Vec::with_capacity(equations.next_state.len() + equations.outputs.len());
    for (bit, expr) in equations.next_state.iter().enumerate() {
        comb_stmts.push(Statement::Assignment(
            Expression::Indexed("next_state".to_string(), bit),
            lower(expr, table, width)?,
        ));
    }
    for (name, expr) in &equations.outputs {
        comb_stmts.push(Statement::Assignment(Expression::Ident(name.clone()), lower(expr, table, width)?));
    }

    let mut sensitivity = vec!["current_state".to_string()];
    sensitivity.extend(table.inputs().map(|signal| signal.name.clone()));
    let comb = ConcurrentItem::Commented(
        "Next-state and output logic. Transitions with overlapping guards are\nresolved in priority order: the lowest priority number wins.".to_string(),
        Box::new(ConcurrentItem::Process(Process { label: "comb".to_string(), sensitivity, stmts: comb_stmts })),
    );

    let reset_code = code_bits(encoding.codes[table.initial.0], width);
    let sync = ConcurrentItem::Commented(
        "State register.".to_string(),
        Box::new(ConcurrentItem::Process(Process {
            label: "sync".to_string(),
            sensitivity: vec!["clk".to_string(), "reset".to_string()],
            stmts: vec![Statement::If(
                vec![
                    (
                        Expression::eq(Expression::Ident("reset".to_string()), Expression::Bit(true)),
                        vec![Statement::Assignment(
                            Expression::Ident("current_state".to_string()),
                            Expression::Bits(reset_code),
                        )],
                    ),
                    (
                        Expression::FunctionCall("rising_edge".to_string(), vec![Expression::Ident("clk".to_string())]),
                        vec![Statement::Assignment(
                            Expression::Ident("current_state".to_string()),
                            Expression::Ident("next_state".to_string()),
                        )],
                    ),
                ],
                vec![],
            )],
        })),
    );

    let architecture = Architecture {
        name: "Behavioral".to_string(),
        entity: table.entity.clone(),
        decls: vec![Declaration::Signal(vec!["current_state".to_string(), "next_state".to_string()], width)],
        items: vec![comb, sync],
    };

    debug!(entity = %table.entity, width, "design rendered");
    Ok(DesignFile { entity, architecture })
}
