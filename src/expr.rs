//! Boolean expressions over chart signals and encoded state bits.

use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Upper bound on the number of free variables for exhaustive truth-table enumeration.
///
/// Semantic checks (equivalence, guard overlap) are exact up to this bound and fall back
/// to structural canonicalization beyond it.
pub const MAX_ENUM_VARS: usize = 16;

/// Free variable of a boolean expression.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Var {
    /// Declared chart signal, referenced by name.
    Signal(String),

    /// Bit of the encoded state register.
    ///
    /// Introduced by equation synthesis; never legal in user-written guards or output
    /// bindings (the validator rejects it).
    StateBit(usize),
}

impl fmt::Display for Var {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Signal(name) => write!(f, "{}", name),
            Self::StateBit(index) => write!(f, "Y{}", index),
        }
    }
}

/// Boolean expression tree.
///
/// Immutable value type. Two expressions are *equivalent* when they agree on every
/// assignment of their free variables, not merely when they are structurally equal;
/// see [`Expr::equivalent`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Expr {
    /// Constant value.
    Const(bool),

    /// Variable literal.
    Var(Var),

    /// Negation.
    Not(Box<Expr>),

    /// Conjunction of all operands.
    And(Vec<Expr>),

    /// Disjunction of all operands.
    Or(Vec<Expr>),
}

impl Expr {
    /// Signal literal.
    pub fn signal(name: impl Into<String>) -> Self { Self::Var(Var::Signal(name.into())) }

    /// Encoded state bit literal.
    pub fn state_bit(index: usize) -> Self { Self::Var(Var::StateBit(index)) }

    /// Negation, folding constants and double negation.
    pub fn not(self) -> Self {
        match self {
            Self::Const(value) => Self::Const(!value),
            Self::Not(inner) => *inner,
            expr => Self::Not(Box::new(expr)),
        }
    }

    /// Conjunction, flattening nested conjunctions and folding constants.
    pub fn and(exprs: Vec<Expr>) -> Self {
        let mut args = Vec::new();
        for expr in exprs {
            match expr {
                Self::Const(false) => return Self::Const(false),
                Self::Const(true) => {}
                Self::And(inner) => args.extend(inner),
                expr => args.push(expr),
            }
        }
        match args.len() {
            0 => Self::Const(true),
            1 => args.into_iter().next().unwrap(),
            _ => Self::And(args),
        }
    }

    /// Disjunction, flattening nested disjunctions and folding constants.
    pub fn or(exprs: Vec<Expr>) -> Self {
        let mut args = Vec::new();
        for expr in exprs {
            match expr {
                Self::Const(true) => return Self::Const(true),
                Self::Const(false) => {}
                Self::Or(inner) => args.extend(inner),
                expr => args.push(expr),
            }
        }
        match args.len() {
            0 => Self::Const(false),
            1 => args.into_iter().next().unwrap(),
            _ => Self::Or(args),
        }
    }

    /// Free variables, in deterministic order.
    pub fn vars(&self) -> BTreeSet<Var> {
        let mut set = BTreeSet::new();
        self.collect_vars(&mut set);
        set
    }

    fn collect_vars(&self, set: &mut BTreeSet<Var>) {
        match self {
            Self::Const(_) => {}
            Self::Var(var) => {
                let _ = set.insert(var.clone());
            }
            Self::Not(inner) => inner.collect_vars(set),
            Self::And(args) | Self::Or(args) => args.iter().for_each(|arg| arg.collect_vars(set)),
        }
    }

    /// Evaluates under the given variable environment.
    pub fn eval(&self, env: &impl Fn(&Var) -> bool) -> bool {
        match self {
            Self::Const(value) => *value,
            Self::Var(var) => env(var),
            Self::Not(inner) => !inner.eval(env),
            Self::And(args) => args.iter().all(|arg| arg.eval(env)),
            Self::Or(args) => args.iter().any(|arg| arg.eval(env)),
        }
    }

    /// Evaluates under an assignment packed as bits of `assignment`, where bit `i` holds
    /// the value of `vars[i]`. Variables absent from `vars` evaluate to false.
    pub fn eval_at(&self, vars: &[Var], assignment: u32) -> bool {
        self.eval(&|var| vars.iter().position(|v| v == var).map_or(false, |i| assignment & (1 << i) != 0))
    }

    /// Assignments (over `vars`, packed as in [`Expr::eval_at`]) under which the
    /// expression is true.
    ///
    /// # Panics
    ///
    /// Panics if `vars` exceeds [`MAX_ENUM_VARS`].
    pub fn on_set(&self, vars: &[Var]) -> Vec<u32> {
        assert!(vars.len() <= MAX_ENUM_VARS, "truth-table enumeration over {} variables", vars.len());
        (0..1u32 << vars.len()).filter(|&assignment| self.eval_at(vars, assignment)).collect()
    }

    /// Semantic equivalence: exhaustive truth-table comparison when the combined support
    /// fits the enumeration bound, canonical-form comparison otherwise.
    pub fn equivalent(&self, other: &Expr) -> bool {
        let vars = self.vars().union(&other.vars()).cloned().collect::<Vec<_>>();
        if vars.len() <= MAX_ENUM_VARS {
            (0..1u32 << vars.len()).all(|assignment| self.eval_at(&vars, assignment) == other.eval_at(&vars, assignment))
        } else {
            self.canonical() == other.canonical()
        }
    }

    /// Returns `true` if the conjunction of `self` and `other` is satisfiable.
    ///
    /// Exact up to the enumeration bound; above it no overlap is reported, so oversized
    /// guards are never spuriously flagged as non-deterministic.
    pub fn overlaps(&self, other: &Expr) -> bool {
        let vars = self.vars().union(&other.vars()).cloned().collect::<Vec<_>>();
        vars.len() <= MAX_ENUM_VARS
            && (0..1u32 << vars.len()).any(|assignment| self.eval_at(&vars, assignment) && other.eval_at(&vars, assignment))
    }

    /// Structural canonical form: negation-normal form with flattened, sorted,
    /// deduplicated operands. Used as the semantic key beyond the enumeration bound.
    pub fn canonical(&self) -> String { self.nnf(false).render_canonical() }

    fn nnf(&self, negated: bool) -> Expr {
        match (self, negated) {
            (Self::Const(value), _) => Self::Const(*value != negated),
            (Self::Var(var), false) => Self::Var(var.clone()),
            (Self::Var(var), true) => Self::Not(Box::new(Self::Var(var.clone()))),
            (Self::Not(inner), _) => inner.nnf(!negated),
            (Self::And(args), false) | (Self::Or(args), true) => {
                Self::and(args.iter().map(|arg| arg.nnf(negated)).collect())
            }
            (Self::Or(args), false) | (Self::And(args), true) => {
                Self::or(args.iter().map(|arg| arg.nnf(negated)).collect())
            }
        }
    }

    fn render_canonical(&self) -> String {
        match self {
            Self::And(args) | Self::Or(args) => {
                let head = if matches!(self, Self::And(_)) { "&" } else { "|" };
                let mut rendered = args.iter().map(|arg| arg.render_canonical()).collect::<Vec<_>>();
                rendered.sort();
                rendered.dedup();
                format!("({} {})", head, rendered.join(" "))
            }
            _ => self.to_string(),
        }
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Const(value) => write!(f, "{}", if *value { "1" } else { "0" }),
            Self::Var(var) => write!(f, "{}", var),
            Self::Not(inner) => write!(f, "!{}", inner),
            Self::And(args) => {
                write!(f, "({})", args.iter().map(|arg| arg.to_string()).collect::<Vec<_>>().join(" & "))
            }
            Self::Or(args) => {
                write!(f, "({})", args.iter().map(|arg| arg.to_string()).collect::<Vec<_>>().join(" | "))
            }
        }
    }
}
