//! Static variable ordering heuristics.
//!
//! An ordering is computed from the formula before compilation and passed to
//! [`compile_with_order`](crate::compile::compile_with_order). Variables that
//! do not occur in the formula are never part of an ordering.

use std::collections::{BTreeSet, HashMap, HashSet, VecDeque};

use log::debug;

use crate::factory::FormulaFactory;
use crate::formula::{Formula, Variable};

/// Rounds of FORCE placement before giving up on a fixed point.
const FORCE_MAX_ROUNDS: usize = 1000;

#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum VariableOrdering {
    /// Breadth-first traversal of the formula.
    Bfs,
    /// Depth-first traversal of the formula (the insertion order of the compiler).
    Dfs,
    /// Rarely occurring variables first, ties broken by depth-first order.
    MinToMax,
    /// Frequently occurring variables first, ties broken by depth-first order.
    MaxToMin,
    /// FORCE placement over the clause hypergraph of the CNF.
    Force,
}

impl VariableOrdering {
    pub fn order(self, factory: &dyn FormulaFactory, formula: &Formula) -> Vec<Variable> {
        let order = match self {
            VariableOrdering::Bfs => bfs_order(formula),
            VariableOrdering::Dfs => dfs_order(formula),
            VariableOrdering::MinToMax => occurrence_order(formula, false),
            VariableOrdering::MaxToMin => occurrence_order(formula, true),
            VariableOrdering::Force => force_order(factory, formula),
        };
        debug!("{:?} ordering of {} variables", self, order.len());
        order
    }
}

fn push_unique(order: &mut Vec<Variable>, seen: &mut HashSet<Variable>, v: &Variable) {
    if seen.insert(v.clone()) {
        order.push(v.clone());
    }
}

fn dfs_order(formula: &Formula) -> Vec<Variable> {
    let mut order = Vec::new();
    let mut seen = HashSet::new();
    formula.for_each_literal(&mut |lit| push_unique(&mut order, &mut seen, lit.variable()));
    order
}

fn bfs_order(formula: &Formula) -> Vec<Variable> {
    let mut order = Vec::new();
    let mut seen = HashSet::new();
    let mut queue = VecDeque::from([formula]);
    while let Some(f) = queue.pop_front() {
        match f {
            Formula::Lit(lit) => push_unique(&mut order, &mut seen, lit.variable()),
            Formula::Cc(c) | Formula::Pbc(c) => {
                for lit in &c.literals {
                    push_unique(&mut order, &mut seen, lit.variable());
                }
            }
            other => queue.extend(other.operands()),
        }
    }
    order
}

fn occurrence_order(formula: &Formula, descending: bool) -> Vec<Variable> {
    let mut occurrences: HashMap<Variable, usize> = HashMap::new();
    formula.for_each_literal(&mut |lit| *occurrences.entry(lit.variable().clone()).or_default() += 1);

    let mut order = dfs_order(formula);
    // Stable, so equal counts keep their depth-first order.
    order.sort_by_key(|v| {
        let count = occurrences.get(v).copied().unwrap_or(0);
        if descending {
            usize::MAX - count
        } else {
            count
        }
    });
    order
}

/// FORCE (Aloul, Markov, Sakallah): every variable moves to the average
/// center of gravity of the clauses it occurs in, until the order is stable.
fn force_order(factory: &dyn FormulaFactory, formula: &Formula) -> Vec<Variable> {
    let cnf = factory.cnf(formula);
    let initial = dfs_order(formula);
    let index: HashMap<&Variable, usize> = initial.iter().enumerate().map(|(i, v)| (v, i)).collect();

    let clauses: Vec<Vec<usize>> = match &cnf {
        Formula::And(ops) => ops.iter().map(|clause| clause_vars(clause, &index)).collect(),
        clause => vec![clause_vars(clause, &index)],
    };
    let mut edges_of: Vec<Vec<usize>> = vec![Vec::new(); initial.len()];
    for (e, clause) in clauses.iter().enumerate() {
        for &v in clause {
            edges_of[v].push(e);
        }
    }

    // position[v] is the place of variable `v` in the current order.
    let mut position: Vec<usize> = (0..initial.len()).collect();
    for round in 0..FORCE_MAX_ROUNDS {
        let centers: Vec<f64> = clauses
            .iter()
            .map(|clause| clause.iter().map(|&v| position[v] as f64).sum::<f64>() / clause.len().max(1) as f64)
            .collect();
        let location: Vec<f64> = (0..initial.len())
            .map(|v| {
                let edges = &edges_of[v];
                if edges.is_empty() {
                    position[v] as f64
                } else {
                    edges.iter().map(|&e| centers[e]).sum::<f64>() / edges.len() as f64
                }
            })
            .collect();

        let mut by_position: Vec<usize> = (0..initial.len()).collect();
        by_position.sort_by_key(|&v| position[v]);
        by_position.sort_by(|&a, &b| location[a].total_cmp(&location[b]));
        let mut next = vec![0; initial.len()];
        for (pos, &v) in by_position.iter().enumerate() {
            next[v] = pos;
        }

        if next == position {
            debug!("FORCE stable after {} rounds", round);
            break;
        }
        position = next;
    }

    let mut order: Vec<(usize, Variable)> = initial.into_iter().enumerate().map(|(v, var)| (position[v], var)).collect();
    order.sort_by_key(|(pos, _)| *pos);
    order.into_iter().map(|(_, var)| var).collect()
}

fn clause_vars(clause: &Formula, index: &HashMap<&Variable, usize>) -> Vec<usize> {
    let mut vars = BTreeSet::new();
    clause.for_each_literal(&mut |lit| {
        if let Some(&i) = index.get(lit.variable()) {
            vars.insert(i);
        }
    });
    vars.into_iter().collect()
}
