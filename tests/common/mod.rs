#![allow(dead_code)]

use rand::prelude::*;

use robdd_rs::formula::{Comparator, Formula, Variable};

pub fn vars(prefix: &str, n: usize) -> Vec<Variable> {
    (0..n).map(|i| Variable::new(format!("{}{}", prefix, i))).collect()
}

/// N-queens: one queen per row and column, at most one per diagonal.
/// Variables come back in row-major order.
pub fn queens(n: usize) -> (Vec<Variable>, Formula) {
    let q = |i: usize, j: usize| Variable::new(format!("q_{}_{}", i, j));
    let mut constraints = Vec::new();
    for i in 0..n {
        constraints.push(Formula::exactly_one((0..n).map(|j| q(i, j))));
        constraints.push(Formula::exactly_one((0..n).map(|j| q(j, i))));
    }
    for d in 0..2 * n - 1 {
        let rising: Vec<Variable> = (0..n).filter_map(|i| d.checked_sub(i).filter(|&j| j < n).map(|j| q(i, j))).collect();
        let falling: Vec<Variable> = (0..n)
            .filter_map(|i| (i + n - 1).checked_sub(d).filter(|&j| j < n).map(|j| q(i, j)))
            .collect();
        for diag in [rising, falling] {
            if diag.len() > 1 {
                constraints.push(Formula::at_most_one(diag));
            }
        }
    }
    let all = (0..n).flat_map(|i| (0..n).map(move |j| q(i, j))).collect();
    (all, Formula::and(constraints))
}

/// `n + 1` pigeons in `n` holes, every pigeon in some hole, no hole shared.
pub fn pigeonhole(n: usize) -> Formula {
    let p = |i: usize, j: usize| Formula::var(format!("p_{}_{}", i, j));
    let mut clauses = Vec::new();
    for i in 0..=n {
        clauses.push(Formula::or((0..n).map(|j| p(i, j))));
    }
    for j in 0..n {
        for i in 0..=n {
            for k in i + 1..=n {
                clauses.push(Formula::or([Formula::not(p(i, j)), Formula::not(p(k, j))]));
            }
        }
    }
    Formula::and(clauses)
}

/// `(a0 ∧ b0) ∨ ... ∨ (a{n-1} ∧ b{n-1})`, plus its two classic orderings:
/// interleaved (linear size) and separated (exponential size).
pub fn pairs(n: usize) -> (Formula, Vec<Variable>, Vec<Variable>) {
    let a = vars("a", n);
    let b = vars("b", n);
    let f = Formula::or((0..n).map(|i| Formula::and([Formula::lit(a[i].pos()), Formula::lit(b[i].pos())])));
    let interleaved = (0..n).flat_map(|i| [a[i].clone(), b[i].clone()]).collect();
    let separated = a.iter().chain(&b).cloned().collect();
    (f, interleaved, separated)
}

pub fn random_formula(rng: &mut StdRng, vars: &[Variable], depth: usize) -> Formula {
    if depth == 0 || rng.gen_bool(0.2) {
        let v = vars[rng.gen_range(0..vars.len())].clone();
        return Formula::lit(if rng.gen_bool(0.5) { v.pos() } else { v.neg() });
    }
    match rng.gen_range(0..6) {
        0 => Formula::not(random_formula(rng, vars, depth - 1)),
        1 => Formula::and((0..rng.gen_range(2..4)).map(|_| random_formula(rng, vars, depth - 1)).collect::<Vec<_>>()),
        2 => Formula::or((0..rng.gen_range(2..4)).map(|_| random_formula(rng, vars, depth - 1)).collect::<Vec<_>>()),
        3 => Formula::implies(random_formula(rng, vars, depth - 1), random_formula(rng, vars, depth - 1)),
        4 => Formula::equiv(random_formula(rng, vars, depth - 1), random_formula(rng, vars, depth - 1)),
        _ => {
            let mut chosen = vars.to_vec();
            chosen.shuffle(rng);
            chosen.truncate(rng.gen_range(2..=vars.len()));
            let comparator = [Comparator::Le, Comparator::Ge, Comparator::Eq][rng.gen_range(0..3)];
            Formula::cc(chosen, comparator, rng.gen_range(0..3))
        }
    }
}

/// Every assignment of `vars`, one value per variable.
pub fn assignments(vars: &[Variable]) -> Vec<Vec<bool>> {
    (0..1usize << vars.len())
        .map(|mask| (0..vars.len()).map(|i| mask >> i & 1 == 1).collect())
        .collect()
}

pub fn evaluate(formula: &Formula, vars: &[Variable], values: &[bool]) -> bool {
    formula.evaluate(&|v: &Variable| vars.iter().position(|x| x == v).map(|i| values[i]).unwrap_or(false))
}
