//! Equation synthesis: minimized next-state and output logic for the encoded machine.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::encode::Encoding;
use crate::expr::{Expr, Var, MAX_ENUM_VARS};
use crate::qm;
use crate::table::StateTable;

/// Minimized combinational logic of the machine: one sum-of-products expression per
/// next-state bit and per declared output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Equations {
    /// Next-state expressions, indexed by state bit.
    pub next_state: Vec<Expr>,

    /// Output expressions, in declaration order.
    pub outputs: Vec<(String, Expr)>,
}

impl Equations {
    /// Next-state code for the given current code and input environment.
    pub fn next_code(&self, current: u32, env: &impl Fn(&Var) -> bool) -> u32 {
        let env = state_env(current, env);
        self.next_state
            .iter()
            .enumerate()
            .filter(|(_, expr)| expr.eval(&env))
            .fold(0, |code, (bit, _)| code | 1 << bit)
    }

    /// Output values for the given current code and input environment, in declaration
    /// order.
    pub fn output_values(&self, current: u32, env: &impl Fn(&Var) -> bool) -> Vec<bool> {
        let env = state_env(current, env);
        self.outputs.iter().map(|(_, expr)| expr.eval(&env)).collect()
    }
}

/// Extends an input environment with the encoded state bits of `current`.
fn state_env<'a>(current: u32, env: &'a impl Fn(&Var) -> bool) -> impl Fn(&Var) -> bool + 'a {
    move |var: &Var| match var {
        Var::StateBit(bit) => current & (1 << bit) != 0,
        var => env(var),
    }
}

/// Internal simplification failure.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
pub enum LogicError {
    /// The minimized expression provably differs from its source. Fatal; never
    /// suppressed in favor of the unverified expression.
    #[error("minimized expression for `{target}` differs from its source logic")]
    EquivalenceCheckFailure {
        /// Assignment target (`next_state(i)` or an output name).
        target: String,
    },
}

/// Indicator minterm of a state code over the encoded state bits.
fn state_minterm(code: u32, width: usize) -> Expr {
    Expr::and(
        (0..width)
            .map(|bit| {
                let literal = Expr::state_bit(bit);
                if code & (1 << bit) != 0 {
                    literal
                } else {
                    literal.not()
                }
            })
            .collect(),
    )
}

/// Builds and minimizes the machine's combinational equations.
///
/// For every next-state bit and every output the raw expression is the sum of
/// (state-indicator ∧ priority-resolved guard) terms, with an implicit hold term for
/// states whose guards are not total. Unused state codes are don't-cares for the
/// minimizer. Each minimized expression is verified equivalent to its raw source over
/// the care set; a mismatch is a fatal [`LogicError::EquivalenceCheckFailure`].
pub fn synthesize(table: &StateTable, encoding: &Encoding) -> Result<Equations, LogicError> {
    let width = encoding.width;
    let inputs = table.input_vars();

    let mut next_raw = vec![Vec::new(); width];
    let mut out_raw = table.outputs().map(|signal| (signal.name.clone(), Vec::new())).collect::<Vec<_>>();

    for (index, row) in table.rows.iter().enumerate() {
        let code = encoding.codes[index];
        let minterm = state_minterm(code, width);

        // Priority-resolved transition selectors: a guard only fires when every
        // higher-priority guard of the same state is false.
        let mut earlier: Vec<Expr> = Vec::new();
        for transition in &row.transitions {
            let selected = Expr::and(vec![
                minterm.clone(),
                transition.guard.clone(),
                Expr::or(earlier.clone()).not(),
            ]);
            let target_code = encoding.codes[transition.target.0];
            for (bit, terms) in next_raw.iter_mut().enumerate() {
                if target_code & (1 << bit) != 0 {
                    terms.push(selected.clone());
                }
            }
            earlier.push(transition.guard.clone());
        }

        // Implicit self-loop: no guard fires, the state holds.
        let hold = Expr::and(vec![minterm.clone(), Expr::or(earlier).not()]);
        for (bit, terms) in next_raw.iter_mut().enumerate() {
            if code & (1 << bit) != 0 {
                terms.push(hold.clone());
            }
        }

        // Output bindings are built in declaration order, matching `out_raw`.
        for ((_, terms), binding) in out_raw.iter_mut().zip(row.outputs.values()) {
            if *binding != Expr::Const(false) {
                terms.push(Expr::and(vec![minterm.clone(), binding.clone()]));
            }
        }
    }

    let next_state = next_raw
        .into_iter()
        .enumerate()
        .map(|(bit, terms)| simplify(Expr::or(terms), &format!("next_state({})", bit), &inputs, encoding))
        .collect::<Result<Vec<_>, _>>()?;

    let outputs = out_raw
        .into_iter()
        .map(|(name, terms)| {
            let expr = simplify(Expr::or(terms), &name, &inputs, encoding)?;
            Ok((name, expr))
        })
        .collect::<Result<Vec<_>, _>>()?;

    debug!(bits = next_state.len(), outputs = outputs.len(), "equations synthesized");
    Ok(Equations { next_state, outputs })
}

/// Minimizes one equation to a compact sum-of-products and verifies equivalence.
fn simplify(raw: Expr, target: &str, inputs: &[Var], encoding: &Encoding) -> Result<Expr, LogicError> {
    // Variable order: encoded state bits first, then inputs in declaration order,
    // restricted to the raw expression's support.
    let support = raw.vars();
    let mut vars = (0..encoding.width).map(Var::StateBit).collect::<Vec<_>>();
    vars.extend(inputs.iter().filter(|var| support.contains(var)).cloned());

    if vars.len() > MAX_ENUM_VARS {
        // Beyond the enumeration bound the unminimized sum of products is kept; the
        // equivalence obligation is discharged by identity.
        return Ok(raw);
    }

    let mut on_set = Vec::new();
    let mut dc_set = Vec::new();
    let state_mask = if encoding.width < 32 { (1u32 << encoding.width) - 1 } else { u32::MAX };
    for assignment in 0..1u32 << vars.len() {
        if !encoding.is_used(assignment & state_mask) {
            dc_set.push(assignment);
        } else if raw.eval_at(&vars, assignment) {
            on_set.push(assignment);
        }
    }

    let cover = qm::minimize(&on_set, &dc_set, vars.len());
    let minimized = qm::cover_to_expr(&cover, &vars);

    // Exhaustive truth-table comparison over the care set.
    for assignment in 0..1u32 << vars.len() {
        if encoding.is_used(assignment & state_mask)
            && minimized.eval_at(&vars, assignment) != raw.eval_at(&vars, assignment)
        {
            return Err(LogicError::EquivalenceCheckFailure { target: target.to_string() });
        }
    }

    Ok(minimized)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chart::{validate, ChartDesc, Direction, Signal, StateDesc, StateId, TransitionDesc};
    use crate::config::CompileConfig;
    use crate::encode::{encode, EncodingPolicy};
    use crate::table::build;

    fn sequence_desc() -> ChartDesc {
        // Two-state recognizer: waits for `a`, raises `hit` while `a & b` in `armed`.
        ChartDesc {
            name: "seq".into(),
            signals: vec![
                Signal { name: "a".into(), direction: Direction::Input, width: 1 },
                Signal { name: "b".into(), direction: Direction::Input, width: 1 },
                Signal { name: "hit".into(), direction: Direction::Output, width: 1 },
            ],
            states: vec![
                StateDesc { id: "wait".into(), outputs: vec![] },
                StateDesc {
                    id: "armed".into(),
                    outputs: vec![("hit".into(), Expr::and(vec![Expr::signal("a"), Expr::signal("b")]))],
                },
            ],
            transitions: vec![
                TransitionDesc {
                    id: "t0".into(),
                    from: "wait".into(),
                    to: "armed".into(),
                    guard: Expr::signal("a"),
                    priority: 0,
                },
                TransitionDesc {
                    id: "t1".into(),
                    from: "armed".into(),
                    to: "wait".into(),
                    guard: Expr::signal("b").not(),
                    priority: 0,
                },
            ],
            initial_state: "wait".into(),
        }
    }

    fn synthesized(desc: &ChartDesc) -> (StateTable, Encoding, Equations) {
        let config = CompileConfig::default();
        let (chart, _) = validate(desc, &config).unwrap();
        let table = build(&chart, &config).unwrap();
        let encoding = encode(&table, EncodingPolicy::Binary).unwrap();
        let equations = synthesize(&table, &encoding).unwrap();
        (table, encoding, equations)
    }

    /// Exhaustive semantic preservation: for every state and input assignment, the
    /// synthesized equations agree with the state table's successor and outputs.
    #[test]
    fn equations_match_table_semantics() {
        let desc = sequence_desc();
        let (table, encoding, equations) = synthesized(&desc);
        let inputs = table.input_vars();

        for state in 0..table.rows.len() {
            for assignment in 0..1u32 << inputs.len() {
                let env =
                    |var: &Var| inputs.iter().position(|v| v == var).map_or(false, |i| assignment & (1 << i) != 0);
                let current = encoding.codes[state];
                let expected = encoding.codes[table.successor(StateId(state), &env).0];
                assert_eq!(equations.next_code(current, &env), expected, "state {} assignment {:b}", state, assignment);
                assert_eq!(
                    equations.output_values(current, &env),
                    table.output_values(StateId(state), &env),
                    "state {} assignment {:b}",
                    state,
                    assignment
                );
            }
        }
    }

    #[test]
    fn hold_terms_cover_non_total_guards() {
        let (_, encoding, equations) = synthesized(&sequence_desc());
        // In `wait` (code 0) with `a` low no guard fires; the machine must hold.
        let idle = |_: &Var| false;
        assert_eq!(equations.next_code(encoding.codes[0], &idle), encoding.codes[0]);
    }

    #[test]
    fn mealy_output_depends_on_inputs() {
        let (_, encoding, equations) = synthesized(&sequence_desc());
        let armed = encoding.codes[1];
        let both = |var: &Var| matches!(var, Var::Signal(name) if name == "a" || name == "b");
        let only_a = |var: &Var| matches!(var, Var::Signal(name) if name == "a");
        assert_eq!(equations.output_values(armed, &both), vec![true]);
        assert_eq!(equations.output_values(armed, &only_a), vec![false]);
    }

    #[test]
    fn equations_are_sum_of_products() {
        let (_, _, equations) = synthesized(&sequence_desc());
        fn is_literal(expr: &Expr) -> bool {
            matches!(expr, Expr::Var(_)) || matches!(expr, Expr::Not(inner) if matches!(**inner, Expr::Var(_)))
        }
        fn is_product(expr: &Expr) -> bool {
            is_literal(expr) || matches!(expr, Expr::And(args) if args.iter().all(is_literal))
        }
        for expr in equations.next_state.iter().chain(equations.outputs.iter().map(|(_, e)| e)) {
            let sop = match expr {
                Expr::Const(_) => true,
                Expr::Or(args) => args.iter().all(is_product),
                expr => is_product(expr),
            };
            assert!(sop, "not sum-of-products: {}", expr);
        }
    }
}
