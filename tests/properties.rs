//! Randomized behavioral properties of the pipeline over small generated charts.

use chartflow::chart::validate;
use chartflow::minimize::reduce;
use chartflow::table::build;
use chartflow::{compile, ChartDesc, CompileConfig, Direction, Expr, Signal, StateDesc, TransitionDesc, Var};
use proptest::prelude::*;

fn guard() -> impl Strategy<Value = Expr> {
    prop_oneof![
        Just(Expr::signal("a")),
        Just(Expr::signal("a").not()),
        Just(Expr::signal("b")),
        Just(Expr::signal("b").not()),
        Just(Expr::and(vec![Expr::signal("a"), Expr::signal("b")])),
        Just(Expr::and(vec![Expr::signal("a"), Expr::signal("b").not()])),
        Just(Expr::or(vec![Expr::signal("a"), Expr::signal("b")])),
    ]
}

/// Charts over inputs `a`, `b` and output `led`, with `n` states and arbitrary
/// transitions. Priorities are globally distinct, so no chart is non-deterministic.
fn chart(n: usize) -> impl Strategy<Value = ChartDesc> {
    let transitions = proptest::collection::vec((0..n, 0..n, guard()), 0..2 * n);
    let bindings = proptest::collection::vec(any::<bool>(), n);
    (transitions, bindings).prop_map(move |(transitions, bindings)| {
        let states = bindings
            .iter()
            .enumerate()
            .map(|(index, lit)| StateDesc {
                id: format!("s{}", index),
                outputs: if *lit { vec![("led".to_string(), Expr::Const(true))] } else { vec![] },
            })
            .collect();
        let transitions = transitions
            .into_iter()
            .enumerate()
            .map(|(index, (from, to, guard))| TransitionDesc {
                id: format!("t{}", index),
                from: format!("s{}", from),
                to: format!("s{}", to),
                guard,
                priority: index as u32,
            })
            .collect();
        ChartDesc {
            name: "randomized".to_string(),
            signals: vec![
                Signal { name: "a".to_string(), direction: Direction::Input, width: 1 },
                Signal { name: "b".to_string(), direction: Direction::Input, width: 1 },
                Signal { name: "led".to_string(), direction: Direction::Output, width: 1 },
            ],
            states,
            transitions,
            initial_state: "s0".to_string(),
        }
    })
}

proptest! {
    #[test]
    fn compilation_is_deterministic(desc in (2usize..=4).prop_flat_map(chart)) {
        let config = CompileConfig::default();
        let first = compile(&desc, &config).unwrap();
        let second = compile(&desc, &config).unwrap();
        prop_assert_eq!(first.source, second.source);
    }

    #[test]
    fn minimization_preserves_observable_behavior(
        desc in (2usize..=4).prop_flat_map(chart),
        stimulus in proptest::collection::vec((any::<bool>(), any::<bool>()), 1..8),
    ) {
        let config = CompileConfig::default();
        let (machine, _) = validate(&desc, &config).unwrap();
        let table = build(&machine, &config).unwrap();
        let reduction = reduce(&table).unwrap();
        prop_assert!(reduction.table.rows.len() <= table.rows.len());

        // Lock-step simulation: the reduced machine must be indistinguishable from the
        // original on every input sequence.
        let mut original = table.initial;
        let mut reduced = reduction.table.initial;
        for (a, b) in stimulus {
            let env = |var: &Var| match var {
                Var::Signal(name) if name == "a" => a,
                Var::Signal(name) if name == "b" => b,
                _ => false,
            };
            prop_assert_eq!(table.output_values(original, &env), reduction.table.output_values(reduced, &env));
            original = table.successor(original, &env);
            reduced = reduction.table.successor(reduced, &env);
        }
    }

    #[test]
    fn generated_vhdl_is_well_formed(desc in (2usize..=4).prop_flat_map(chart)) {
        let output = compile(&desc, &CompileConfig::default()).unwrap();
        let text = output.source;
        prop_assert!(text.starts_with("library IEEE;"));
        prop_assert!(text.ends_with("end architecture Behavioral;\n"));
        prop_assert_eq!(text.matches(" process (").count(), text.matches("end process ").count());
        prop_assert_eq!(text.matches('(').count(), text.matches(')').count());
    }
}
