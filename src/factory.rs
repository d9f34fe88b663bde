//! Normal-form collaborator consumed by the kernel.
//!
//! The compilation driver only understands the Boolean connectives. Cardinality
//! and pseudo-Boolean constraints are handed to a [`FormulaFactory`] which turns
//! them into negation normal form, and the FORCE ordering heuristic asks the
//! same collaborator for a CNF to build its clause hypergraph.
//!
//! [`DefaultFactory`] is a self-contained implementation: constraints are
//! expanded by Shannon decomposition over their literals (memoized on the
//! partial sum) and CNF is produced by distribution.

use std::collections::{BTreeSet, HashMap};

use log::trace;

use crate::formula::{Comparator, Formula, Literal, PbConstraint};

pub trait FormulaFactory {
    /// Equivalent formula in negation normal form (only literals, `∧`, `∨`, constants).
    fn nnf(&self, formula: &Formula) -> Formula;

    /// Equivalent formula in conjunctive normal form.
    fn cnf(&self, formula: &Formula) -> Formula;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct DefaultFactory;

impl FormulaFactory for DefaultFactory {
    fn nnf(&self, formula: &Formula) -> Formula {
        nnf_rec(formula, true)
    }

    fn cnf(&self, formula: &Formula) -> Formula {
        let nnf = self.nnf(formula);
        let clauses = clauses_of(&nnf);
        trace!("cnf: {} clauses", clauses.len());
        Formula::and(
            clauses
                .into_iter()
                .map(|clause| Formula::or(clause.into_iter().map(Formula::Lit))),
        )
    }
}

fn nnf_rec(formula: &Formula, phase: bool) -> Formula {
    match formula {
        Formula::False => Formula::constant(!phase),
        Formula::True => Formula::constant(phase),
        Formula::Lit(lit) => Formula::Lit(if phase { lit.clone() } else { lit.negate() }),
        Formula::Not(op) => nnf_rec(op, !phase),
        Formula::And(ops) => {
            let ops = ops.iter().map(|op| nnf_rec(op, phase));
            if phase {
                Formula::and(ops)
            } else {
                Formula::or(ops)
            }
        }
        Formula::Or(ops) => {
            let ops = ops.iter().map(|op| nnf_rec(op, phase));
            if phase {
                Formula::or(ops)
            } else {
                Formula::and(ops)
            }
        }
        Formula::Impl(l, r) => {
            if phase {
                Formula::or([nnf_rec(l, false), nnf_rec(r, true)])
            } else {
                Formula::and([nnf_rec(l, true), nnf_rec(r, false)])
            }
        }
        Formula::Equiv(l, r) => Formula::or([
            Formula::and([nnf_rec(l, true), nnf_rec(r, phase)]),
            Formula::and([nnf_rec(l, false), nnf_rec(r, !phase)]),
        ]),
        Formula::Cc(c) | Formula::Pbc(c) => {
            let expanded = ConstraintExpander::new(c).expand();
            if phase {
                expanded
            } else {
                nnf_rec(&expanded, false)
            }
        }
    }
}

/// Decision-diagram style expansion of a pseudo-Boolean constraint.
struct ConstraintExpander<'a> {
    constraint: &'a PbConstraint,
    /// Smallest achievable sum of the literals from position `i` on.
    min_rest: Vec<i64>,
    /// Largest achievable sum of the literals from position `i` on.
    max_rest: Vec<i64>,
    memo: HashMap<(usize, i64), Formula>,
}

impl<'a> ConstraintExpander<'a> {
    fn new(constraint: &'a PbConstraint) -> Self {
        let n = constraint.literals.len();
        let mut min_rest = vec![0; n + 1];
        let mut max_rest = vec![0; n + 1];
        for i in (0..n).rev() {
            let c = constraint.coefficients[i];
            min_rest[i] = min_rest[i + 1] + c.min(0);
            max_rest[i] = max_rest[i + 1] + c.max(0);
        }
        Self {
            constraint,
            min_rest,
            max_rest,
            memo: HashMap::new(),
        }
    }

    fn expand(&mut self) -> Formula {
        self.expand_from(0, 0)
    }

    /// Truth value of the constraint if it no longer depends on positions `>= i`.
    fn decided(&self, i: usize, acc: i64) -> Option<bool> {
        let lo = acc + self.min_rest[i];
        let hi = acc + self.max_rest[i];
        let rhs = self.constraint.rhs;
        let (all, none) = match self.constraint.comparator {
            Comparator::Eq => (lo == rhs && hi == rhs, rhs < lo || rhs > hi),
            Comparator::Le => (hi <= rhs, lo > rhs),
            Comparator::Lt => (hi < rhs, lo >= rhs),
            Comparator::Ge => (lo >= rhs, hi < rhs),
            Comparator::Gt => (lo > rhs, hi <= rhs),
        };
        if all {
            Some(true)
        } else if none {
            Some(false)
        } else {
            None
        }
    }

    fn expand_from(&mut self, i: usize, acc: i64) -> Formula {
        if let Some(value) = self.decided(i, acc) {
            return Formula::constant(value);
        }
        if let Some(f) = self.memo.get(&(i, acc)) {
            return f.clone();
        }

        let lit: &Literal = &self.constraint.literals[i];
        let c = self.constraint.coefficients[i];
        let (pos, neg) = (Formula::Lit(lit.clone()), Formula::Lit(lit.negate()));
        let high = self.expand_from(i + 1, acc + c);
        let low = self.expand_from(i + 1, acc);

        let res = if high == low {
            high
        } else {
            Formula::or([Formula::and([pos, high]), Formula::and([neg, low])])
        };
        self.memo.insert((i, acc), res.clone());
        res
    }
}

/// Clause set of an NNF formula by distribution. `True` is the empty set,
/// `False` the set holding the empty clause.
fn clauses_of(nnf: &Formula) -> Vec<Vec<Literal>> {
    match nnf {
        Formula::True => Vec::new(),
        Formula::False => vec![Vec::new()],
        Formula::Lit(lit) => vec![vec![lit.clone()]],
        Formula::And(ops) => ops.iter().flat_map(clauses_of).collect(),
        Formula::Or(ops) => {
            let mut acc: Vec<Vec<Literal>> = vec![Vec::new()];
            for op in ops {
                let rhs = clauses_of(op);
                let mut next = Vec::with_capacity(acc.len() * rhs.len());
                for left in &acc {
                    for right in &rhs {
                        if let Some(clause) = merge_clauses(left, right) {
                            next.push(clause);
                        }
                    }
                }
                acc = next;
            }
            acc
        }
        other => clauses_of(&nnf_rec(other, true)),
    }
}

/// Union of two clauses, `None` if the union is a tautology.
fn merge_clauses(a: &[Literal], b: &[Literal]) -> Option<Vec<Literal>> {
    let mut set: BTreeSet<Literal> = a.iter().cloned().collect();
    for lit in b {
        if set.contains(&lit.negate()) {
            return None;
        }
        set.insert(lit.clone());
    }
    Some(set.into_iter().collect())
}
