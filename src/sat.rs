//! Satisfying assignments.
//!
//! Witnesses are returned as cubes. [`Kernel::all_sat`] enumerates every path
//! to the one terminal as a profile over the kernel variables.

use log::debug;

use crate::kernel::{Kernel, OpResult};
use crate::reference::Ref;
use crate::types::Var;

/// Value of a variable along a satisfying path.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum PathValue {
    False,
    True,
    DontCare,
}

impl Kernel {
    /// A cube implying `r`, preferring the low branch. `Ref::ZERO` if `r` is unsatisfiable.
    pub fn sat_one(&mut self, r: Ref) -> Ref {
        debug!("sat_one(r = {})", r);
        self.run(|k| k.sat_one_rec(r))
    }

    fn sat_one_rec(&mut self, r: Ref) -> OpResult {
        if r.is_constant() {
            return Ok(r);
        }
        let level = self.level(r);
        let res = if self.low(r).is_zero() {
            let high = self.sat_one_rec(self.high(r))?;
            self.push_ref(high);
            self.make_node(level, Ref::ZERO, high)?
        } else {
            let low = self.sat_one_rec(self.low(r))?;
            self.push_ref(low);
            self.make_node(level, low, Ref::ZERO)?
        };
        self.pop_refs(1);
        Ok(res)
    }

    /// A minterm (over all kernel variables) implying `r`, preferring `false`.
    pub fn full_sat_one(&mut self, r: Ref) -> Ref {
        debug!("full_sat_one(r = {})", r);
        if r.is_zero() {
            return Ref::ZERO;
        }
        self.run(|k| {
            let mut res = k.full_sat_one_rec(r)?;
            for level in (0..k.level(r)).rev() {
                k.push_ref(res);
                res = k.make_node(level, res, Ref::ZERO)?;
            }
            Ok(res)
        })
    }

    fn full_sat_one_rec(&mut self, r: Ref) -> OpResult {
        if r.is_constant() {
            return Ok(r);
        }
        let level = self.level(r);
        let (low, high) = (self.low(r), self.high(r));
        let (child, phase) = if !low.is_zero() { (low, false) } else { (high, true) };

        let mut res = self.full_sat_one_rec(child)?;
        for skipped in (level + 1..self.level(child)).rev() {
            self.push_ref(res);
            res = self.make_node(skipped, res, Ref::ZERO)?;
        }
        self.push_ref(res);
        if phase {
            self.make_node(level, Ref::ZERO, res)
        } else {
            self.make_node(level, res, Ref::ZERO)
        }
    }

    /// A cube implying `r` that mentions every variable of the positive cube
    /// `vars`; variables `r` does not constrain get the polarity `phase`.
    pub fn sat_one_set(&mut self, r: Ref, vars: Ref, phase: bool) -> Ref {
        debug!("sat_one_set(r = {}, vars = {}, phase = {})", r, vars, phase);
        if r.is_zero() {
            return Ref::ZERO;
        }
        self.run(|k| k.sat_one_set_rec(r, vars, phase))
    }

    fn sat_one_set_rec(&mut self, r: Ref, vars: Ref, phase: bool) -> OpResult {
        if r.is_constant() && vars.is_constant() {
            return Ok(r);
        }
        let (level_r, level_v) = (self.level(r), self.level(vars));
        let res = if level_v < level_r {
            let res = self.sat_one_set_rec(r, self.high(vars), phase)?;
            self.push_ref(res);
            if phase {
                self.make_node(level_v, Ref::ZERO, res)?
            } else {
                self.make_node(level_v, res, Ref::ZERO)?
            }
        } else {
            // Below the current set variable (or on it) follow the satisfiable branch of `r`.
            let next_vars = if level_v == level_r { self.high(vars) } else { vars };
            if self.low(r).is_zero() {
                let res = self.sat_one_set_rec(self.high(r), next_vars, phase)?;
                self.push_ref(res);
                self.make_node(level_r, Ref::ZERO, res)?
            } else {
                let res = self.sat_one_set_rec(self.low(r), next_vars, phase)?;
                self.push_ref(res);
                self.make_node(level_r, res, Ref::ZERO)?
            }
        };
        self.pop_refs(1);
        Ok(res)
    }

    /// All paths from `r` to the one terminal, each as a profile indexed by
    /// kernel variable.
    pub fn all_sat(&self, r: Ref) -> Vec<Vec<PathValue>> {
        let mut result = Vec::new();
        let mut profile = vec![PathValue::DontCare; self.var_count() as usize];
        self.all_sat_rec(r, &mut profile, &mut result);
        result
    }

    fn all_sat_rec(&self, r: Ref, profile: &mut [PathValue], result: &mut Vec<Vec<PathValue>>) {
        if r.is_one() {
            result.push(profile.to_vec());
            return;
        }
        if r.is_zero() {
            return;
        }

        let level = self.level(r);
        let var = self.var_of(r).index() as usize;
        for (child, value) in [(self.low(r), PathValue::False), (self.high(r), PathValue::True)] {
            if child.is_zero() {
                continue;
            }
            profile[var] = value;
            for skipped in level + 1..self.level(child) {
                profile[self.level2var[skipped as usize] as usize] = PathValue::DontCare;
            }
            self.all_sat_rec(child, profile, result);
        }
        profile[var] = PathValue::DontCare;
    }

    /// Walks a cube and returns its literals from top to bottom.
    pub fn cube_literals(&self, cube: Ref) -> Vec<(Var, bool)> {
        let mut literals = Vec::new();
        let mut n = cube;
        while !n.is_constant() {
            if self.low(n).is_zero() {
                literals.push((self.var_of(n), true));
                n = self.high(n);
            } else {
                literals.push((self.var_of(n), false));
                n = self.low(n);
            }
        }
        literals
    }
}
