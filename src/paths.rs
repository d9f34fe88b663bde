//! Paths of a BDD and its conversion back into formulas.
//!
//! ```text
//!   cnf: one clause per path to 0, negating the path
//!   dnf: one term per path to 1
//!   shannon: (v ∧ high) ∨ (¬v ∧ low), or its dual (¬v ∨ high) ∧ (v ∨ low)
//! ```
//!
//! The number of paths can be exponential in the size of the BDD.

use std::collections::HashMap;

use crate::formula::{Formula, Literal};
use crate::kernel::Kernel;
use crate::reference::Ref;
use crate::types::Var;

impl Kernel {
    /// Every path from `r` to `terminal`, as the list of decisions taken along it.
    pub fn paths_to(&self, r: Ref, terminal: Ref) -> Vec<Vec<(Var, bool)>> {
        assert!(terminal.is_constant(), "Paths must end in a terminal");
        let mut result = Vec::new();
        let mut path = Vec::new();
        self.paths_rec(r, terminal, &mut path, &mut result);
        result
    }

    fn paths_rec(&self, r: Ref, terminal: Ref, path: &mut Vec<(Var, bool)>, result: &mut Vec<Vec<(Var, bool)>>) {
        if r.is_constant() {
            if r == terminal {
                result.push(path.clone());
            }
            return;
        }
        let var = self.var_of(r);
        for (child, value) in [(self.low(r), false), (self.high(r), true)] {
            path.push((var, value));
            self.paths_rec(child, terminal, path, result);
            path.pop();
        }
    }

    fn literal_of(&self, var: Var, phase: bool) -> Formula {
        Formula::Lit(Literal::new(self.name_of(var), phase))
    }

    /// Conjunction of clauses, one for every path to the zero terminal.
    pub fn cnf(&self, r: Ref) -> Formula {
        Formula::and(self.paths_to(r, Ref::ZERO).into_iter().map(|path| {
            Formula::or(path.into_iter().map(|(var, value)| self.literal_of(var, !value)))
        }))
    }

    /// Disjunction of terms, one for every path to the one terminal.
    pub fn dnf(&self, r: Ref) -> Formula {
        Formula::or(self.paths_to(r, Ref::ONE).into_iter().map(|path| {
            Formula::and(path.into_iter().map(|(var, value)| self.literal_of(var, value)))
        }))
    }

    /// Shannon expansion of `r`. With `follow_true` every node becomes
    /// `(v ∧ high) ∨ (¬v ∧ low)`, otherwise `(¬v ∨ high) ∧ (v ∨ low)`.
    pub fn to_formula(&self, r: Ref, follow_true: bool) -> Formula {
        let mut memo = HashMap::new();
        self.to_formula_rec(r, follow_true, &mut memo)
    }

    fn to_formula_rec(&self, r: Ref, follow_true: bool, memo: &mut HashMap<Ref, Formula>) -> Formula {
        if r.is_constant() {
            return Formula::constant(r.is_one());
        }
        if let Some(f) = memo.get(&r) {
            return f.clone();
        }

        let var = self.var_of(r);
        let low = self.to_formula_rec(self.low(r), follow_true, memo);
        let high = self.to_formula_rec(self.high(r), follow_true, memo);
        let (pos, neg) = (self.literal_of(var, true), self.literal_of(var, false));
        let res = if follow_true {
            Formula::or([Formula::and([pos, high]), Formula::and([neg, low])])
        } else {
            Formula::and([Formula::or([neg, high]), Formula::or([pos, low])])
        };

        memo.insert(r, res.clone());
        res
    }
}

#[cfg(test)]
mod tests {
    use test_log::test;

    use super::*;
    use crate::formula::Variable;

    fn setup() -> (Kernel, Ref, Ref, Ref) {
        let mut kernel = Kernel::new(3, 100, 100);
        for name in ["a", "b", "c"] {
            kernel.register_variable(&Variable::new(name)).unwrap();
        }
        let a = kernel.ith_var(Var::new(0));
        let b = kernel.ith_var(Var::new(1));
        let c = kernel.ith_var(Var::new(2));
        (kernel, a, b, c)
    }

    fn agrees(kernel: &Kernel, r: Ref, formula: &Formula) -> bool {
        (0..8).all(|mask: u32| {
            let value_of = |v: &Variable| {
                let i = kernel.index_for_variable(v).unwrap().index();
                mask >> i & 1 == 1
            };
            let mut n = r;
            while !n.is_constant() {
                let i = kernel.var_of(n).index();
                n = if mask >> i & 1 == 1 { kernel.high(n) } else { kernel.low(n) };
            }
            n.is_one() == formula.evaluate(&value_of)
        })
    }

    #[test]
    fn test_paths() {
        let (mut kernel, a, b, _) = setup();
        let nb = kernel.not(b);
        let f = kernel.implication(a, nb);
        assert_eq!(kernel.paths_to(f, Ref::ZERO), vec![vec![(Var::new(0), true), (Var::new(1), true)]]);
        assert_eq!(kernel.paths_to(f, Ref::ONE).len(), 2);
    }

    #[test]
    fn test_cnf_dnf() {
        let (mut kernel, a, b, c) = setup();
        let nb = kernel.not(b);
        let f = kernel.implication(a, nb);
        let cnf = kernel.cnf(f);
        assert_eq!(cnf, Formula::or([Formula::lit(Variable::new("a").neg()), Formula::lit(Variable::new("b").neg())]));

        let ab = kernel.xor(a, b);
        let g = kernel.or(ab, c);
        let cnf = kernel.cnf(g);
        assert!(cnf.is_cnf());
        assert!(agrees(&kernel, g, &cnf));
        assert!(agrees(&kernel, g, &kernel.dnf(g)));

        assert_eq!(kernel.cnf(Ref::ONE), Formula::True);
        assert_eq!(kernel.cnf(Ref::ZERO), Formula::False);
        assert_eq!(kernel.dnf(Ref::ZERO), Formula::False);
        assert_eq!(kernel.dnf(Ref::ONE), Formula::True);
    }

    #[test]
    fn test_shannon() {
        let (mut kernel, a, b, c) = setup();
        let bc = kernel.equivalence(b, c);
        let f = kernel.and(a, bc);
        for follow_true in [true, false] {
            let formula = kernel.to_formula(f, follow_true);
            assert!(agrees(&kernel, f, &formula));
        }
        assert_eq!(kernel.to_formula(a, true), Formula::var("a"));
    }
}
