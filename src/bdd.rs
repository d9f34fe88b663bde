//! Reference-counted BDD handles.
//!
//! A [`BddKernel`] is a shared, interior-mutable [`Kernel`]. A [`Bdd`] pairs a
//! kernel with a root node and keeps that root referenced for as long as the
//! handle lives: cloning a handle adds a reference, dropping it releases one.
//!
//! ```
//! use num_bigint::BigUint;
//! use robdd_rs::compile::compile;
//! use robdd_rs::formula::Formula;
//!
//! let f = Formula::implies(Formula::var("a"), Formula::not(Formula::var("b")));
//! let bdd = compile(&f).unwrap();
//! assert_eq!(bdd.model_count(), BigUint::from(3u32));
//! assert_eq!(bdd.path_count_zero(), BigUint::from(1u32));
//! ```
//!
//! Handles of different kernels cannot be combined; doing so panics.

use std::cell::{Ref as CellRef, RefCell, RefMut};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt::{Debug, Formatter};
use std::ops::{BitAnd, BitOr, BitXor, Not};
use std::rc::Rc;

use num_bigint::BigUint;

use crate::apply::BinaryOp;
use crate::error::BddError;
use crate::factory::FormulaFactory;
use crate::formula::{Formula, Literal, Variable};
use crate::kernel::{Kernel, KernelConfig, KernelStatistics};
use crate::reference::Ref;
use crate::reorder::{ReorderMethod, ReorderStats};
use crate::sat::PathValue;
use crate::types::Var;

/// A model: one literal per assigned variable.
pub type Model = BTreeSet<Literal>;

#[derive(Clone)]
pub struct BddKernel(Rc<RefCell<Kernel>>);

impl BddKernel {
    pub fn new(var_count: u32, node_size: usize, cache_size: usize) -> Self {
        Self::from_kernel(Kernel::new(var_count, node_size, cache_size))
    }

    pub fn with_config(var_count: u32, node_size: usize, cache_size: usize, config: KernelConfig) -> Self {
        Self::from_kernel(Kernel::with_config(var_count, node_size, cache_size, config))
    }

    /// A kernel whose variables are registered in the given order.
    pub fn with_ordering(ordering: &[Variable], node_size: usize, cache_size: usize) -> Self {
        Self::from_kernel(Kernel::with_ordering(ordering, node_size, cache_size))
    }

    pub fn from_kernel(kernel: Kernel) -> Self {
        Self(Rc::new(RefCell::new(kernel)))
    }

    pub fn borrow(&self) -> CellRef<'_, Kernel> {
        self.0.borrow()
    }

    pub fn borrow_mut(&self) -> RefMut<'_, Kernel> {
        self.0.borrow_mut()
    }

    pub fn same_kernel(&self, other: &BddKernel) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }

    pub fn index_for_variable(&self, v: &Variable) -> Result<Var, BddError> {
        self.borrow()
            .index_for_variable(v)
            .ok_or_else(|| BddError::UnknownVariable(v.name().to_string()))
    }

    /// Exchanges two variables in the ordering. Panics if variable blocks exist.
    pub fn swap_variables(&self, a: &Variable, b: &Variable) -> Result<(), BddError> {
        let (a, b) = (self.index_for_variable(a)?, self.index_for_variable(b)?);
        self.borrow_mut().swap_variables(a, b);
        Ok(())
    }

    pub fn reorder(&self, method: ReorderMethod) -> ReorderStats {
        self.borrow_mut().reorder(method)
    }

    pub fn activate_reorder_during_build(&self, method: ReorderMethod, bound: usize) {
        self.borrow_mut().activate_reorder_during_build(method, bound);
    }

    pub fn add_variable_block(&self, first: Var, last: Var, fixed: bool) -> Result<(), BddError> {
        self.borrow_mut().add_variable_block(first, last, fixed)
    }

    pub fn add_all_variables_as_block(&self) {
        self.borrow_mut().add_all_variables_as_block();
    }

    pub fn statistics(&self) -> KernelStatistics {
        self.borrow().statistics()
    }

    pub fn factory(&self) -> Rc<dyn FormulaFactory> {
        self.borrow().factory()
    }
}

impl Debug for BddKernel {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self.0.try_borrow() {
            Ok(kernel) => kernel.fmt(f),
            Err(_) => f.write_str("Kernel { <borrowed> }"),
        }
    }
}

pub struct Bdd {
    kernel: BddKernel,
    index: Ref,
}

impl Bdd {
    /// Wraps `index`, taking over one reference the caller already holds.
    pub(crate) fn from_owned(kernel: BddKernel, index: Ref) -> Self {
        Self { kernel, index }
    }

    /// Wraps `index`, adding a reference.
    pub fn new(kernel: &BddKernel, index: Ref) -> Self {
        kernel.borrow_mut().add_ref(index);
        Self::from_owned(kernel.clone(), index)
    }

    pub fn index(&self) -> Ref {
        self.index
    }

    pub fn kernel(&self) -> &BddKernel {
        &self.kernel
    }

    fn check_same_kernel(&self, other: &Bdd) {
        assert!(
            self.kernel.same_kernel(&other.kernel),
            "Cannot combine BDDs of different kernels"
        );
    }

    fn wrap(&self, op: impl FnOnce(&mut Kernel) -> Ref) -> Bdd {
        let index = {
            let mut k = self.kernel.borrow_mut();
            let r = op(&mut k);
            k.add_ref(r)
        };
        Bdd::from_owned(self.kernel.clone(), index)
    }

    fn binary(&self, other: &Bdd, op: BinaryOp) -> Bdd {
        self.check_same_kernel(other);
        let (l, r) = (self.index, other.index);
        self.wrap(|k| k.apply(l, r, op))
    }

    pub fn negate(&self) -> Bdd {
        let r = self.index;
        self.wrap(|k| k.not(r))
    }

    pub fn and(&self, other: &Bdd) -> Bdd {
        self.binary(other, BinaryOp::And)
    }

    pub fn or(&self, other: &Bdd) -> Bdd {
        self.binary(other, BinaryOp::Or)
    }

    pub fn xor(&self, other: &Bdd) -> Bdd {
        self.binary(other, BinaryOp::Xor)
    }

    /// `self ⇒ other`
    pub fn implies(&self, other: &Bdd) -> Bdd {
        self.binary(other, BinaryOp::Imp)
    }

    /// `other ⇒ self`
    pub fn implied_by(&self, other: &Bdd) -> Bdd {
        self.binary(other, BinaryOp::InvImp)
    }

    pub fn equivalence(&self, other: &Bdd) -> Bdd {
        self.binary(other, BinaryOp::Biimp)
    }

    pub fn is_tautology(&self) -> bool {
        self.index.is_one()
    }

    pub fn is_contradiction(&self) -> bool {
        self.index.is_zero()
    }

    /// Runs `op` with the cube of `literals` referenced.
    /// Literals over variables unknown to the kernel are skipped.
    fn with_cube(&self, literals: impl IntoIterator<Item = (Variable, bool)>, op: impl FnOnce(&mut Kernel, Ref, Ref) -> Ref) -> Bdd {
        let r = self.index;
        self.wrap(|k| {
            let lits: Vec<(Var, bool)> = literals
                .into_iter()
                .filter_map(|(v, phase)| k.index_for_variable(&v).map(|var| (var, phase)))
                .collect();
            let cube = k.cube(&lits);
            k.add_ref(cube);
            let res = op(k, r, cube);
            k.del_ref(cube);
            res
        })
    }

    /// Restricts the BDD by assigning the given literals.
    pub fn restrict(&self, literals: &[Literal]) -> Bdd {
        let lits = literals.iter().map(|l| (l.variable().clone(), l.phase()));
        self.with_cube(lits, |k, r, cube| k.restrict(r, cube))
    }

    pub fn exists(&self, vars: &[Variable]) -> Bdd {
        let lits = vars.iter().map(|v| (v.clone(), true));
        self.with_cube(lits, |k, r, cube| k.exists(r, cube))
    }

    pub fn for_all(&self, vars: &[Variable]) -> Bdd {
        let lits = vars.iter().map(|v| (v.clone(), true));
        self.with_cube(lits, |k, r, cube| k.for_all(r, cube))
    }

    /// Substitutes `g` for `var`. Unknown variables leave the BDD unchanged.
    pub fn compose(&self, var: &Variable, g: &Bdd) -> Bdd {
        self.check_same_kernel(g);
        let (r, g) = (self.index, g.index);
        let var = self.kernel.borrow().index_for_variable(var);
        match var {
            Some(var) => self.wrap(|k| k.compose(r, var, g)),
            None => self.clone(),
        }
    }

    /// Renames variables. Targets are registered in the kernel when new.
    pub fn replace(&self, pairs: &[(Variable, Variable)]) -> Result<Bdd, BddError> {
        let mut mapping = Vec::with_capacity(pairs.len());
        {
            let mut k = self.kernel.borrow_mut();
            for (from, to) in pairs {
                if let Some(from) = k.index_for_variable(from) {
                    mapping.push((from, k.register_variable(to)?));
                }
            }
        }
        let r = self.index;
        Ok(self.wrap(|k| k.replace(r, &mapping)))
    }

    /// Number of satisfying assignments over all variables of the kernel.
    pub fn model_count(&self) -> BigUint {
        self.kernel.borrow_mut().sat_count(self.index)
    }

    pub fn path_count_one(&self) -> BigUint {
        self.kernel.borrow_mut().path_count_one(self.index)
    }

    pub fn path_count_zero(&self) -> BigUint {
        self.kernel.borrow_mut().path_count_zero(self.index)
    }

    fn to_model(kernel: &Kernel, cube: Ref) -> Model {
        kernel
            .cube_literals(cube)
            .into_iter()
            .map(|(var, phase)| Literal::new(kernel.name_of(var), phase))
            .collect()
    }

    /// A satisfying assignment of the variables on one path to the one terminal.
    pub fn model(&self) -> Result<Model, BddError> {
        let mut k = self.kernel.borrow_mut();
        let cube = k.sat_one(self.index);
        if cube.is_zero() {
            return Err(BddError::NoModel);
        }
        Ok(Self::to_model(&k, cube))
    }

    /// A satisfying assignment over all kernel variables, preferring `false`.
    pub fn full_model(&self) -> Result<Model, BddError> {
        let mut k = self.kernel.borrow_mut();
        let cube = k.full_sat_one(self.index);
        if cube.is_zero() {
            return Err(BddError::NoModel);
        }
        Ok(Self::to_model(&k, cube))
    }

    /// A satisfying assignment that also covers `vars`; variables the BDD
    /// does not constrain get the phase `default`.
    pub fn model_with_variables(&self, default: bool, vars: &[Variable]) -> Result<Model, BddError> {
        if self.is_contradiction() {
            return Err(BddError::NoModel);
        }
        let mut k = self.kernel.borrow_mut();
        let known: Vec<(Var, bool)> = vars.iter().filter_map(|v| k.index_for_variable(v)).map(|var| (var, true)).collect();
        let set = k.cube(&known);
        k.add_ref(set);
        let cube = k.sat_one_set(self.index, set, default);
        k.del_ref(set);

        let mut model = Self::to_model(&k, cube);
        for v in vars {
            if k.index_for_variable(v).is_none() {
                model.insert(Literal::new(v.clone(), default));
            }
        }
        Ok(model)
    }

    /// All models projected onto `vars` (all registered variables when empty).
    pub fn model_enumeration(&self, vars: &[Variable]) -> Vec<Model> {
        let k = self.kernel.borrow();
        let vars: Vec<Variable> = if vars.is_empty() {
            (0..k.registered_count() as u32).map(|i| k.name_of(Var::new(i))).collect()
        } else {
            vars.to_vec()
        };
        let indices: Vec<Option<Var>> = vars.iter().map(|v| k.index_for_variable(v)).collect();

        let mut models = BTreeSet::new();
        for path in k.all_sat(self.index) {
            let mut partial = vec![Model::new()];
            for (v, index) in vars.iter().zip(&indices) {
                let value = index.map_or(PathValue::DontCare, |var| path[var.index() as usize]);
                let phases: &[bool] = match value {
                    PathValue::False => &[false],
                    PathValue::True => &[true],
                    PathValue::DontCare => &[false, true],
                };
                partial = partial
                    .into_iter()
                    .flat_map(|m| {
                        phases.iter().map(move |&phase| {
                            let mut m = m.clone();
                            m.insert(Literal::new(v.clone(), phase));
                            m
                        })
                    })
                    .collect();
            }
            models.extend(partial);
        }
        models.into_iter().collect()
    }

    /// Variables the BDD depends on.
    pub fn support(&self) -> BTreeSet<Variable> {
        let mut k = self.kernel.borrow_mut();
        let cube = k.support(self.index);
        k.cube_literals(cube).into_iter().map(|(var, _)| k.name_of(var)).collect()
    }

    pub fn node_count(&self) -> usize {
        self.kernel.borrow_mut().node_count(self.index)
    }

    /// Number of nodes per registered variable.
    pub fn variable_profile(&self) -> BTreeMap<Variable, usize> {
        let mut k = self.kernel.borrow_mut();
        let profile = k.var_profile(self.index);
        (0..k.registered_count())
            .map(|i| (k.name_of(Var::new(i as u32)), profile[i]))
            .collect()
    }

    /// Registered variables from the top of the ordering to the bottom.
    pub fn variable_order(&self) -> Vec<Variable> {
        let k = self.kernel.borrow();
        k.current_order()
            .into_iter()
            .filter(|var| (var.index() as usize) < k.registered_count())
            .map(|var| k.name_of(var))
            .collect()
    }

    pub fn cnf(&self) -> Formula {
        self.kernel.borrow().cnf(self.index)
    }

    pub fn dnf(&self) -> Formula {
        self.kernel.borrow().dnf(self.index)
    }

    pub fn to_formula(&self, follow_paths_to_true: bool) -> Formula {
        self.kernel.borrow().to_formula(self.index, follow_paths_to_true)
    }
}

impl Clone for Bdd {
    fn clone(&self) -> Self {
        Bdd::new(&self.kernel, self.index)
    }
}

impl Drop for Bdd {
    fn drop(&mut self) {
        // A handle dropped while the kernel is borrowed keeps its reference.
        if let Ok(mut kernel) = self.kernel.0.try_borrow_mut() {
            kernel.del_ref(self.index);
        }
    }
}

impl PartialEq for Bdd {
    fn eq(&self, other: &Self) -> bool {
        self.kernel.same_kernel(&other.kernel) && self.index == other.index
    }
}

impl Eq for Bdd {}

impl Debug for Bdd {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "Bdd({})", self.index)
    }
}

impl Not for &Bdd {
    type Output = Bdd;

    fn not(self) -> Bdd {
        self.negate()
    }
}

impl BitAnd for &Bdd {
    type Output = Bdd;

    fn bitand(self, rhs: Self) -> Bdd {
        self.and(rhs)
    }
}

impl BitOr for &Bdd {
    type Output = Bdd;

    fn bitor(self, rhs: Self) -> Bdd {
        self.or(rhs)
    }
}

impl BitXor for &Bdd {
    type Output = Bdd;

    fn bitxor(self, rhs: Self) -> Bdd {
        self.xor(rhs)
    }
}
