//! VHDL IR.

use crate::utils::indent;

const INDENT: usize = 4;

/// Design file: context clause, entity and architecture.
#[derive(Debug, PartialEq, Eq, Clone)]
pub struct DesignFile {
    /// Entity declaration.
    pub entity: Entity,

    /// Architecture body.
    pub architecture: Architecture,
}

impl ToString for DesignFile {
    fn to_string(&self) -> String {
        format!(
            "library IEEE;\nuse IEEE.STD_LOGIC_1164.ALL;\n\n{}\n\n{}\n",
            self.entity.to_string(),
            self.architecture.to_string()
        )
    }
}

/// Entity declaration.
#[derive(Debug, PartialEq, Eq, Clone)]
pub struct Entity {
    /// Entity name.
    pub name: String,

    /// Port declarations.
    pub port_decls: Vec<PortDeclaration>,
}

impl ToString for Entity {
    fn to_string(&self) -> String {
        format!(
            "entity {} is\n{}port (\n{}\n{});\nend entity {};",
            self.name,
            " ".repeat(INDENT),
            indent(
                self.port_decls.iter().map(|port_decl| port_decl.to_string()).collect::<Vec<_>>().join(";\n"),
                2 * INDENT
            ),
            " ".repeat(INDENT),
            self.name
        )
    }
}

/// Port declaration.
#[derive(Debug, PartialEq, Eq, Clone)]
pub enum PortDeclaration {
    /// Input declaration.
    Input(usize, String),

    /// Output declaration.
    Output(usize, String),
}

fn subtype(width: usize) -> String {
    if width > 1 {
        format!("std_logic_vector({} downto 0)", width - 1)
    } else {
        "std_logic".to_string()
    }
}

impl ToString for PortDeclaration {
    fn to_string(&self) -> String {
        match self {
            Self::Input(width, ident) => format!("{} : in {}", ident, subtype(*width)),
            Self::Output(width, ident) => format!("{} : out {}", ident, subtype(*width)),
        }
    }
}

/// Architecture body.
#[derive(Debug, PartialEq, Eq, Clone)]
pub struct Architecture {
    /// Architecture name.
    pub name: String,

    /// Name of the entity the architecture belongs to.
    pub entity: String,

    /// Declarative part.
    pub decls: Vec<Declaration>,

    /// Concurrent statements.
    pub items: Vec<ConcurrentItem>,
}

impl ToString for Architecture {
    fn to_string(&self) -> String {
        format!(
            "architecture {} of {} is\n{}\nbegin\n\n{}\n\nend architecture {};",
            self.name,
            self.entity,
            indent(self.decls.iter().map(|decl| decl.to_string()).collect::<Vec<_>>().join("\n"), INDENT),
            indent(self.items.iter().map(|item| item.to_string()).collect::<Vec<_>>().join("\n\n"), INDENT),
            self.name
        )
    }
}

/// Declaration in the architecture declarative part.
#[derive(Debug, PartialEq, Eq, Clone)]
pub enum Declaration {
    /// Signal declaration, possibly naming several signals of one subtype.
    Signal(Vec<String>, usize),
}

impl ToString for Declaration {
    fn to_string(&self) -> String {
        match self {
            Self::Signal(idents, width) => {
                format!("signal {} : std_logic_vector({} downto 0);", idents.join(", "), width.saturating_sub(1))
            }
        }
    }
}

/// Concurrent statement.
#[derive(Debug, PartialEq, Eq, Clone)]
pub enum ConcurrentItem {
    /// Process statement.
    Process(Process),

    /// Comment lines in front of an item.
    Commented(String, Box<ConcurrentItem>),
}

impl ToString for ConcurrentItem {
    fn to_string(&self) -> String {
        match self {
            Self::Process(process) => process.to_string(),
            Self::Commented(comment, item) => {
                let lines = comment.lines().map(|line| format!("-- {}", line)).collect::<Vec<_>>().join("\n");
                format!("{}\n{}", lines, item.to_string())
            }
        }
    }
}

/// Process statement.
#[derive(Debug, PartialEq, Eq, Clone)]
pub struct Process {
    /// Process label.
    pub label: String,

    /// Sensitivity list.
    pub sensitivity: Vec<String>,

    /// Sequential statements.
    pub stmts: Vec<Statement>,
}

impl ToString for Process {
    fn to_string(&self) -> String {
        format!(
            "{} : process ({})\nbegin\n{}\nend process {};",
            self.label,
            self.sensitivity.join(", "),
            indent(self.stmts.iter().map(|stmt| stmt.to_string()).collect::<Vec<_>>().join("\n"), INDENT),
            self.label
        )
    }
}

/// Sequential statement.
#[derive(Debug, PartialEq, Eq, Clone)]
pub enum Statement {
    /// Signal assignment.
    Assignment(Expression, Expression),

    /// If statement: guarded arms plus an optional final else.
    If(Vec<(Expression, Vec<Statement>)>, Vec<Statement>),
}

impl ToString for Statement {
    fn to_string(&self) -> String {
        match self {
            Self::Assignment(lvalue, expr) => format!("{} <= {};", lvalue.to_string(), expr.to_string()),
            Self::If(arms, else_stmts) => {
                assert!(!arms.is_empty(), "if statement requires at least one arm");
                let mut code = String::new();
                for (index, (cond, stmts)) in arms.iter().enumerate() {
                    let keyword = if index == 0 { "if" } else { "elsif" };
                    code.push_str(&format!(
                        "{} {} then\n{}\n",
                        keyword,
                        cond.to_string(),
                        indent(stmts.iter().map(|stmt| stmt.to_string()).collect::<Vec<_>>().join("\n"), INDENT)
                    ));
                }
                if !else_stmts.is_empty() {
                    code.push_str(&format!(
                        "else\n{}\n",
                        indent(else_stmts.iter().map(|stmt| stmt.to_string()).collect::<Vec<_>>().join("\n"), INDENT)
                    ));
                }
                code.push_str("end if;");
                code
            }
        }
    }
}

/// Logical connective.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum LogicOp {
    /// Conjunction.
    And,

    /// Disjunction.
    Or,
}

/// Expression.
#[derive(Debug, PartialEq, Eq, Clone)]
pub enum Expression {
    /// Bit literal: `'0'` or `'1'`.
    Bit(bool),

    /// Bit-string literal, MSB first: `"01"`.
    Bits(String),

    /// Identifier.
    Ident(String),

    /// Statically indexed identifier: `current_state(0)`.
    Indexed(String, usize),

    /// Negation.
    Not(Box<Expression>),

    /// N-ary logical chain. VHDL forbids mixing `and`/`or` without parentheses, so
    /// nested chains are parenthesized when rendered.
    Nary(LogicOp, Vec<Expression>),

    /// Equality comparison.
    Eq(Box<Expression>, Box<Expression>),

    /// Function call.
    FunctionCall(String, Vec<Expression>),
}

impl Expression {
    /// Negation.
    pub fn not(self) -> Self { Self::Not(Box::new(self)) }

    /// Equality comparison.
    pub fn eq(lhs: Expression, rhs: Expression) -> Self { Self::Eq(Box::new(lhs), Box::new(rhs)) }

    fn to_operand(&self) -> String {
        match self {
            Self::Nary(_, _) => format!("({})", self.to_string()),
            _ => self.to_string(),
        }
    }
}

impl ToString for Expression {
    fn to_string(&self) -> String {
        match self {
            Self::Bit(value) => if *value { "'1'" } else { "'0'" }.to_string(),
            Self::Bits(bits) => format!("\"{}\"", bits),
            Self::Ident(ident) => ident.clone(),
            Self::Indexed(ident, index) => format!("{}({})", ident, index),
            Self::Not(inner) => format!("not {}", inner.to_operand()),
            Self::Nary(op, args) => {
                assert!(!args.is_empty(), "logical chain requires operands");
                let op = match op {
                    LogicOp::And => " and ",
                    LogicOp::Or => " or ",
                };
                args.iter().map(|arg| arg.to_operand()).collect::<Vec<_>>().join(op)
            }
            Self::Eq(lhs, rhs) => format!("{} = {}", lhs.to_operand(), rhs.to_operand()),
            Self::FunctionCall(func, args) => {
                format!("{}({})", func, args.iter().map(|arg| arg.to_string()).collect::<Vec<_>>().join(", "))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sum_of_products_parenthesization() {
        let term = |idents: Vec<Expression>| Expression::Nary(LogicOp::And, idents);
        let expr = Expression::Nary(
            LogicOp::Or,
            vec![
                term(vec![Expression::Indexed("current_state".into(), 0).not(), Expression::Ident("go".into())]),
                term(vec![Expression::Indexed("current_state".into(), 0), Expression::Ident("stall".into()).not()]),
            ],
        );
        assert_eq!(
            expr.to_string(),
            "(not current_state(0) and go) or (current_state(0) and not stall)"
        );
    }

    #[test]
    fn single_term_needs_no_parentheses() {
        let expr = Expression::Nary(
            LogicOp::And,
            vec![Expression::Ident("a".into()), Expression::Ident("b".into()).not()],
        );
        assert_eq!(expr.to_string(), "a and not b");
    }

    #[test]
    fn if_statement_renders_elsif_chain() {
        let stmt = Statement::If(
            vec![
                (
                    Expression::eq(Expression::Ident("reset".into()), Expression::Bit(true)),
                    vec![Statement::Assignment(Expression::Ident("current_state".into()), Expression::Bits("00".into()))],
                ),
                (
                    Expression::FunctionCall("rising_edge".into(), vec![Expression::Ident("clk".into())]),
                    vec![Statement::Assignment(
                        Expression::Ident("current_state".into()),
                        Expression::Ident("next_state".into()),
                    )],
                ),
            ],
            vec![],
        );
        assert_eq!(
            stmt.to_string(),
            "if reset = '1' then\n    current_state <= \"00\";\nelsif rising_edge(clk) then\n    current_state <= next_state;\nend if;"
        );
    }

    #[test]
    fn entity_port_block() {
        let entity = Entity {
            name: "demo".into(),
            port_decls: vec![
                PortDeclaration::Input(1, "clk".into()),
                PortDeclaration::Input(8, "bus_in".into()),
                PortDeclaration::Output(1, "done".into()),
            ],
        };
        assert_eq!(
            entity.to_string(),
            "entity demo is\n    port (\n        clk : in std_logic;\n        bus_in : in std_logic_vector(7 downto 0);\n        done : out std_logic\n    );\nend entity demo;"
        );
    }
}
