//! Compilation of formulas into BDDs.
//!
//! The driver walks the formula recursively and combines the compiled
//! operands with kernel operations. Every intermediate result is referenced
//! as soon as it exists and released once the next step no longer needs it,
//! so automatic reordering and garbage collection may run at any point.
//!
//! Each new reference is announced to a [`ComputationHandler`] first; when the
//! handler refuses, the driver releases what it still holds and returns
//! [`BddError::Aborted`]. The kernel stays usable.

use std::collections::HashSet;
use std::rc::Rc;

use log::{debug, info};

use crate::bdd::{Bdd, BddKernel};
use crate::error::BddError;
use crate::factory::FormulaFactory;
use crate::formula::{Formula, Literal, Variable};
use crate::handler::{ComputationHandler, NopHandler};
use crate::kernel::Kernel;
use crate::reference::Ref;
use crate::types::Var;

/// Node table size used by the `compile*` functions that create their own kernel.
pub fn default_node_size(var_count: usize) -> usize {
    (30 * var_count).max(20_000)
}

/// Operation cache size used by the `compile*` functions that create their own kernel.
pub fn default_cache_size(var_count: usize) -> usize {
    (20 * var_count).max(20_000)
}

pub(crate) struct Compiler<'a> {
    kernel: &'a mut Kernel,
    handler: &'a mut dyn ComputationHandler,
    factory: Rc<dyn FormulaFactory>,
}

impl<'a> Compiler<'a> {
    pub(crate) fn new(kernel: &'a mut Kernel, handler: &'a mut dyn ComputationHandler) -> Self {
        let factory = kernel.factory();
        Self {
            kernel,
            handler,
            factory,
        }
    }

    /// Compiles `formula`. The result carries one reference owned by the caller.
    pub(crate) fn build(&mut self, formula: &Formula) -> Result<Ref, BddError> {
        self.handler.started();
        let res = self.build_rec(formula);
        match &res {
            Ok(r) => debug!("compiled {:?} into {}", formula.sort(), r),
            Err(e) => info!("compilation failed: {}", e),
        }
        res
    }

    fn add_ref(&mut self, r: Ref) -> Result<Ref, BddError> {
        if !self.handler.new_ref_added() {
            return Err(BddError::Aborted);
        }
        Ok(self.kernel.add_ref(r))
    }

    /// Releases `held` when `res` is an error.
    fn release_on_err<T>(&mut self, res: Result<T, BddError>, held: &[Ref]) -> Result<T, BddError> {
        if res.is_err() {
            for &r in held {
                self.kernel.del_ref(r);
            }
        }
        res
    }

    fn build_rec(&mut self, formula: &Formula) -> Result<Ref, BddError> {
        match formula {
            Formula::False => Ok(Ref::ZERO),
            Formula::True => Ok(Ref::ONE),
            Formula::Lit(lit) => {
                let var = self.kernel.register_variable(lit.variable())?;
                Ok(self.kernel.literal(var, lit.phase()))
            }
            Formula::Not(op) => {
                let operand = self.build_rec(op)?;
                let res = self.kernel.not(operand);
                let res = self.add_ref(res);
                let res = self.release_on_err(res, &[operand])?;
                self.kernel.del_ref(operand);
                Ok(res)
            }
            Formula::Impl(l, r) | Formula::Equiv(l, r) => {
                let left = self.build_rec(l)?;
                let right = self.build_rec(r);
                let right = self.release_on_err(right, &[left])?;
                let res = match formula {
                    Formula::Impl(..) => self.kernel.implication(left, right),
                    _ => self.kernel.equivalence(left, right),
                };
                let res = self.add_ref(res);
                let res = self.release_on_err(res, &[left, right])?;
                self.kernel.del_ref(left);
                self.kernel.del_ref(right);
                Ok(res)
            }
            Formula::And(ops) | Formula::Or(ops) => {
                let is_and = matches!(formula, Formula::And(_));
                let mut ops = ops.iter();
                let mut res = match ops.next() {
                    Some(op) => self.build_rec(op)?,
                    None => return Ok(Ref::constant(is_and)),
                };
                for op in ops {
                    let operand = self.build_rec(op);
                    let operand = self.release_on_err(operand, &[res])?;
                    let prev = res;
                    let next = if is_and {
                        self.kernel.and(prev, operand)
                    } else {
                        self.kernel.or(prev, operand)
                    };
                    let next = self.add_ref(next);
                    res = self.release_on_err(next, &[prev, operand])?;
                    self.kernel.del_ref(prev);
                    self.kernel.del_ref(operand);
                }
                Ok(res)
            }
            Formula::Cc(_) | Formula::Pbc(_) => {
                let nnf = self.factory.nnf(formula);
                self.build_rec(&nnf)
            }
        }
    }
}

impl Kernel {
    /// The conjunction of `literals`, built bottom-up without `apply`.
    /// Contradicting literals yield `Ref::ZERO`.
    pub fn cube(&mut self, literals: &[(Var, bool)]) -> Ref {
        self.run(|k| {
            let mut lits: Vec<(u32, bool)> = literals.iter().map(|&(v, phase)| (k.level_of(v), phase)).collect();
            lits.sort_unstable();
            lits.dedup();
            if lits.windows(2).any(|w| w[0].0 == w[1].0) {
                return Ok(Ref::ZERO);
            }

            let mut res = Ref::ONE;
            for &(level, phase) in lits.iter().rev() {
                k.push_ref(res);
                res = if phase {
                    k.make_node(level, Ref::ZERO, res)?
                } else {
                    k.make_node(level, res, Ref::ZERO)?
                };
            }
            Ok(res)
        })
    }
}

/// Compiles `formula` into a fresh kernel with variables in insertion order.
pub fn compile(formula: &Formula) -> Result<Bdd, BddError> {
    let var_count = formula.variables().len();
    let kernel = BddKernel::new(var_count as u32, default_node_size(var_count), default_cache_size(var_count));
    compile_with_kernel(formula, &kernel)
}

/// Compiles `formula` into a fresh kernel whose variables follow `order`.
///
/// Repeated entries of `order` count once; formula variables missing from
/// `order` are appended in name order.
pub fn compile_with_order(formula: &Formula, order: &[Variable]) -> Result<Bdd, BddError> {
    let mut seen = HashSet::new();
    let mut ordering: Vec<Variable> = order.iter().filter(|v| seen.insert(*v)).cloned().collect();
    for v in formula.variables() {
        if !seen.contains(&v) {
            ordering.push(v);
        }
    }
    let var_count = ordering.len();
    let kernel = BddKernel::with_ordering(&ordering, default_node_size(var_count), default_cache_size(var_count));
    compile_with_kernel(formula, &kernel)
}

/// Compiles `formula` into an existing kernel, sharing its nodes with other BDDs.
pub fn compile_with_kernel(formula: &Formula, kernel: &BddKernel) -> Result<Bdd, BddError> {
    compile_with_handler(formula, kernel, &mut NopHandler)
}

/// Compiles `formula`, polling `handler` at every new intermediate reference.
///
/// Returns [`BddError::Aborted`] when the handler cancels the compilation.
pub fn compile_with_handler(
    formula: &Formula,
    kernel: &BddKernel,
    handler: &mut dyn ComputationHandler,
) -> Result<Bdd, BddError> {
    let root = {
        let mut k = kernel.borrow_mut();
        Compiler::new(&mut k, handler).build(formula)?
    };
    Ok(Bdd::from_owned(kernel.clone(), root))
}

/// Compiles the conjunction of `literals` directly as a cube.
pub fn compile_literals(literals: &[Literal], kernel: &BddKernel) -> Result<Bdd, BddError> {
    let root = {
        let mut k = kernel.borrow_mut();
        let mut lits = Vec::with_capacity(literals.len());
        for lit in literals {
            lits.push((k.register_variable(lit.variable())?, lit.phase()));
        }
        let cube = k.cube(&lits);
        k.add_ref(cube)
    };
    Ok(Bdd::from_owned(kernel.clone(), root))
}

#[cfg(test)]
mod tests {
    use num_bigint::BigUint;
    use test_log::test;

    use super::*;
    use crate::debug::check_invariants;
    use crate::handler::NumberOfNodesHandler;

    #[test]
    fn test_compile_connectives() {
        let a = Formula::var("a");
        let b = Formula::var("b");
        let f = Formula::equiv(Formula::implies(a.clone(), b.clone()), Formula::or([Formula::not(a), b]));
        let bdd = compile(&f).unwrap();
        assert!(bdd.is_tautology());

        let g = Formula::and([Formula::var("a"), Formula::not(Formula::var("b"))]);
        let bdd = compile(&g).unwrap();
        assert_eq!(bdd.model_count(), BigUint::from(1u32));
        check_invariants(&bdd.kernel().borrow());
    }

    #[test]
    fn test_intermediate_results_are_released() {
        let kernel = BddKernel::new(4, 100, 100);
        let f = Formula::or([
            Formula::and([Formula::var("a"), Formula::var("b")]),
            Formula::and([Formula::var("c"), Formula::var("d")]),
        ]);
        let bdd = compile_with_kernel(&f, &kernel).unwrap();
        let k = kernel.borrow();
        let referenced: Vec<Ref> = k
            .table
            .live_nodes()
            .filter(|&r| !k.table[r].is_pinned() && k.table[r].ref_count > 0)
            .collect();
        assert_eq!(referenced, vec![bdd.index()]);
        assert_eq!(k.ref_count(bdd.index()), 1);
    }

    #[test]
    fn test_abort_releases_references() {
        let kernel = BddKernel::new(6, 100, 100);
        let f = Formula::and((0..6).map(|i| Formula::or([Formula::var(format!("x{}", i)), Formula::var("x0")])));
        let mut handler = NumberOfNodesHandler::new(3);
        let res = compile_with_handler(&f, &kernel, &mut handler);
        assert_eq!(res.err(), Some(BddError::Aborted));
        assert!(handler.aborted());

        let k = kernel.borrow();
        assert!(k.table.live_nodes().all(|r| k.table[r].is_pinned() || k.table[r].ref_count == 0));
    }

    #[test]
    fn test_compile_with_order_ignores_repeats() {
        let order = [Variable::new("b"), Variable::new("a"), Variable::new("b")];
        let f = Formula::and([Formula::var("a"), Formula::var("b"), Formula::var("c")]);
        let bdd = compile_with_order(&f, &order).unwrap();
        let names: Vec<String> = bdd.variable_order().iter().map(|v| v.name().to_string()).collect();
        assert_eq!(names, ["b", "a", "c"]);
        assert_eq!(bdd.model_count(), BigUint::from(1u32));
    }

    #[test]
    fn test_too_many_variables() {
        let kernel = BddKernel::new(1, 100, 100);
        let f = Formula::and([Formula::var("a"), Formula::var("b")]);
        assert_eq!(
            compile_with_kernel(&f, &kernel).err(),
            Some(BddError::TooManyVariables(1))
        );
    }

    #[test]
    fn test_cube() {
        let mut kernel = Kernel::new(3, 100, 100);
        let (x, y, z) = (Var::new(0), Var::new(1), Var::new(2));
        let cube = kernel.cube(&[(z, true), (x, false)]);
        assert_eq!(kernel.cube_literals(cube), vec![(x, false), (z, true)]);
        assert_eq!(kernel.cube(&[(y, true), (y, false)]), Ref::ZERO);
        assert_eq!(kernel.cube(&[]), Ref::ONE);
        assert_eq!(kernel.cube(&[(y, true), (y, true)]), kernel.ith_var(y));
    }

    #[test]
    fn test_compile_literals() {
        let kernel = BddKernel::new(3, 100, 100);
        let lits = [Variable::new("a").pos(), Variable::new("b").neg()];
        let bdd = compile_literals(&lits, &kernel).unwrap();
        let same = compile_with_kernel(&Formula::and(lits.iter().cloned().map(Formula::Lit)), &kernel).unwrap();
        assert_eq!(bdd, same);
    }
}
