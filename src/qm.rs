//! Quine–McCluskey prime-implicant reduction.
//!
//! Self-contained sum-of-products minimizer used for the next-state and output
//! equations; replaces the general-purpose symbolic-algebra dependency of earlier
//! designs. Every call site re-verifies the result against the source truth table.

use std::collections::{BTreeSet, HashSet};

use itertools::Itertools;
use static_assertions::const_assert;

use crate::expr::{Expr, Var, MAX_ENUM_VARS};

// Minterms are packed into `u32` assignments.
const_assert!(MAX_ENUM_VARS <= 32);

/// Product term over a fixed variable ordering.
///
/// Bit `i` of `mask` marks variable `i` as eliminated; for the remaining variables bit
/// `i` of `value` gives the required polarity. `value` keeps eliminated bits at zero so
/// the derived ordering is deterministic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Implicant {
    /// Eliminated-variable mask.
    pub mask: u32,

    /// Required polarities of the remaining variables.
    pub value: u32,
}

impl Implicant {
    fn minterm(value: u32) -> Self { Self { mask: 0, value } }

    /// Returns `true` if the implicant covers the given minterm.
    pub fn covers(&self, minterm: u32) -> bool { minterm & !self.mask == self.value }

    /// Combines two implicants differing in exactly one literal, if possible.
    fn combine(&self, other: &Self) -> Option<Self> {
        if self.mask != other.mask {
            return None;
        }
        let diff = self.value ^ other.value;
        (diff.count_ones() == 1).then(|| Self { mask: self.mask | diff, value: self.value & !diff })
    }

    /// Renders the implicant as a conjunction of literals over `vars`.
    pub fn to_expr(&self, vars: &[Var]) -> Expr {
        Expr::and(
            vars.iter()
                .enumerate()
                .filter(|(index, _)| self.mask & (1 << index) == 0)
                .map(|(index, var)| {
                    let literal = Expr::Var(var.clone());
                    if self.value & (1 << index) != 0 {
                        literal
                    } else {
                        literal.not()
                    }
                })
                .collect(),
        )
    }
}

/// Minimizes the function with the given ON-set and don't-care set over `num_vars`
/// variables into a deterministic prime-implicant cover.
///
/// Essential primes are selected first, the remainder greedily by descending uncovered
/// coverage (ties broken by implicant order); the chosen cover is returned sorted.
pub fn minimize(on_set: &[u32], dc_set: &[u32], num_vars: usize) -> Vec<Implicant> {
    assert!(num_vars <= MAX_ENUM_VARS);
    if on_set.is_empty() {
        return Vec::new();
    }

    let primes = prime_implicants(on_set, dc_set);

    // Prime-implicant chart over the ON-set only; don't-cares need no cover.
    let mut uncovered = on_set.iter().copied().collect::<BTreeSet<_>>();
    let mut cover = BTreeSet::new();

    for &minterm in on_set {
        let covering = primes.iter().filter(|prime| prime.covers(minterm)).collect::<Vec<_>>();
        if let [essential] = covering[..] {
            let _ = cover.insert(*essential);
        }
    }
    for prime in &cover {
        uncovered.retain(|&minterm| !prime.covers(minterm));
    }

    while !uncovered.is_empty() {
        let best = primes
            .iter()
            .max_by_key(|prime| {
                let gain = uncovered.iter().filter(|&&minterm| prime.covers(minterm)).count();
                // Max-by keeps the last maximum; invert the implicant order so that the
                // smallest implicant wins ties.
                (gain, std::cmp::Reverse(**prime))
            })
            .expect("nonempty prime set");
        let _ = cover.insert(*best);
        uncovered.retain(|&minterm| !best.covers(minterm));
    }

    cover.into_iter().collect()
}

/// All prime implicants of the function given by ON-set plus don't-cares.
fn prime_implicants(on_set: &[u32], dc_set: &[u32]) -> BTreeSet<Implicant> {
    let mut current = on_set.iter().chain(dc_set).copied().map(Implicant::minterm).collect::<BTreeSet<_>>();
    let mut primes = BTreeSet::new();

    while !current.is_empty() {
        let mut combined = HashSet::new();
        let mut next = BTreeSet::new();

        for (first, second) in current.iter().tuple_combinations() {
            if let Some(merged) = first.combine(second) {
                let _ = next.insert(merged);
                let _ = combined.insert(*first);
                let _ = combined.insert(*second);
            }
        }

        primes.extend(current.iter().filter(|implicant| !combined.contains(implicant)));
        current = next;
    }

    primes
}

/// Builds the sum-of-products expression for a cover over `vars`.
pub fn cover_to_expr(cover: &[Implicant], vars: &[Var]) -> Expr {
    Expr::or(cover.iter().map(|implicant| implicant.to_expr(vars)).collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vars(n: usize) -> Vec<Var> { (0..n).map(|i| Var::Signal(format!("x{}", i))).collect() }

    fn truth_table(expr: &Expr, vars: &[Var]) -> Vec<bool> {
        (0..1u32 << vars.len()).map(|assignment| expr.eval_at(vars, assignment)).collect()
    }

    #[test]
    fn full_on_set_collapses_to_constant_true() {
        let cover = minimize(&[0, 1, 2, 3], &[], 2);
        assert_eq!(cover, vec![Implicant { mask: 0b11, value: 0 }]);
        assert_eq!(cover_to_expr(&cover, &vars(2)), Expr::Const(true));
    }

    #[test]
    fn empty_on_set_is_constant_false() {
        assert_eq!(cover_to_expr(&minimize(&[], &[], 3), &vars(3)), Expr::Const(false));
    }

    #[test]
    fn adjacent_minterms_merge() {
        // ON-set {0b00, 0b01}: the minterms differ only in x0 (bit 0), so the cover is
        // the single term !x1.
        let cover = minimize(&[0b00, 0b01], &[], 2);
        assert_eq!(cover, vec![Implicant { mask: 0b01, value: 0 }]);
        let expr = cover_to_expr(&cover, &vars(2));
        assert_eq!(expr, Expr::signal("x1").not());
    }

    #[test]
    fn dont_cares_enlarge_implicants() {
        // ON {0b00}, DC {0b01}: x0 can be absorbed, yielding !x1 instead of !x1 & !x0.
        let cover = minimize(&[0b00], &[0b01], 2);
        assert_eq!(cover, vec![Implicant { mask: 0b01, value: 0 }]);
    }

    /// Exhaustive check over every 3-variable boolean function: the minimized cover is
    /// equivalent to the source function on its care set.
    #[test]
    fn equivalent_to_brute_force_for_all_three_var_functions() {
        let vars = vars(3);
        for function in 0u32..256 {
            let on_set = (0..8).filter(|&m| function & (1 << m) != 0).collect::<Vec<u32>>();
            let cover = minimize(&on_set, &[], 3);
            let expr = cover_to_expr(&cover, &vars);
            let table = truth_table(&expr, &vars);
            for minterm in 0..8u32 {
                assert_eq!(table[minterm as usize], function & (1 << minterm) != 0, "function {:#010b}", function);
            }
        }
    }

    #[test]
    fn cover_is_deterministic() {
        let on_set = [1, 3, 4, 5, 6, 7];
        assert_eq!(minimize(&on_set, &[], 3), minimize(&on_set, &[], 3));
    }
}
