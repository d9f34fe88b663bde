//! Restriction, quantification, composition and variable renaming.
//!
//! Variable sets are passed as cubes. Before a recursion starts the cube is
//! loaded into the per-level tag array (see [`Kernel::load_varset`]), so the
//! recursion answers "is this level in the set?" in constant time and stops
//! descending below the deepest level of the set.

use log::debug;

use crate::apply::BinaryOp;
use crate::kernel::{Kernel, OpResult};
use crate::reference::Ref;
use crate::types::Var;

const RESTRICT_TAG: u32 = 0;
const EXISTS_TAG: u32 = 1;
const FOR_ALL_TAG: u32 = 2;

impl Kernel {
    /// Restricts `r` by the assignment encoded in the cube `cube`: positive
    /// literals set their variable to true, negative ones to false.
    pub fn restrict(&mut self, r: Ref, cube: Ref) -> Ref {
        debug!("restrict(r = {}, cube = {})", r, cube);
        self.run(|k| {
            if cube.is_constant() {
                return Ok(r);
            }
            k.load_varset(cube);
            k.restrict_rec(r, cube)
        })
    }

    /// Existential quantification of the variables of the positive cube `cube`.
    pub fn exists(&mut self, r: Ref, cube: Ref) -> Ref {
        debug!("exists(r = {}, cube = {})", r, cube);
        self.quantify(r, cube, BinaryOp::Or, EXISTS_TAG)
    }

    /// Universal quantification of the variables of the positive cube `cube`.
    pub fn for_all(&mut self, r: Ref, cube: Ref) -> Ref {
        debug!("for_all(r = {}, cube = {})", r, cube);
        self.quantify(r, cube, BinaryOp::And, FOR_ALL_TAG)
    }

    fn quantify(&mut self, r: Ref, cube: Ref, op: BinaryOp, tag: u32) -> Ref {
        self.run(|k| {
            if cube.is_constant() {
                return Ok(r);
            }
            k.load_varset(cube);
            k.quant_rec(r, cube, op, tag)
        })
    }

    fn restrict_rec(&mut self, r: Ref, cube: Ref) -> OpResult {
        if r.is_constant() || self.level(r) > self.varset_last {
            return Ok(r);
        }
        if let Some(&res) = self.quant_cache.get(r, cube, RESTRICT_TAG) {
            return Ok(res);
        }

        let level = self.level(r);
        let res = match self.varset_polarity(level) {
            Some(true) => self.restrict_rec(self.high(r), cube)?,
            Some(false) => self.restrict_rec(self.low(r), cube)?,
            None => {
                let low = self.restrict_rec(self.low(r), cube)?;
                self.push_ref(low);
                let high = self.restrict_rec(self.high(r), cube)?;
                self.push_ref(high);
                let res = self.make_node(level, low, high)?;
                self.pop_refs(2);
                res
            }
        };

        self.quant_cache.insert(r, cube, RESTRICT_TAG, res);
        Ok(res)
    }

    fn quant_rec(&mut self, r: Ref, cube: Ref, op: BinaryOp, tag: u32) -> OpResult {
        if r.is_constant() || self.level(r) > self.varset_last {
            return Ok(r);
        }
        if let Some(&res) = self.quant_cache.get(r, cube, tag) {
            return Ok(res);
        }

        let level = self.level(r);
        let low = self.quant_rec(self.low(r), cube, op, tag)?;
        self.push_ref(low);
        let high = self.quant_rec(self.high(r), cube, op, tag)?;
        self.push_ref(high);
        let res = if self.in_varset(level) {
            self.apply_rec(low, high, op)?
        } else {
            self.make_node(level, low, high)?
        };
        self.pop_refs(2);

        self.quant_cache.insert(r, cube, tag, res);
        Ok(res)
    }

    /// Substitutes `g` for the variable `var` in `f`.
    pub fn compose(&mut self, f: Ref, var: Var, g: Ref) -> Ref {
        debug!("compose(f = {}, var = {}, g = {})", f, var, g);
        self.run(|k| {
            // A reordering between attempts moves `var`.
            let level = k.level_of(var);
            k.compose_rec(f, g, level)
        })
    }

    fn compose_rec(&mut self, f: Ref, g: Ref, level: u32) -> OpResult {
        let level_f = self.level(f);
        if level_f > level {
            return Ok(f);
        }
        let tag = (level << 1) | 1;
        if let Some(&res) = self.replace_cache.get(f, g, tag) {
            return Ok(res);
        }

        let res = if level_f < level {
            let level_g = self.level(g);
            let top = level_f.min(level_g);
            let (f0, f1) = if level_f == top { (self.low(f), self.high(f)) } else { (f, f) };
            let (g0, g1) = if level_g == top { (self.low(g), self.high(g)) } else { (g, g) };
            let low = self.compose_rec(f0, g0, level)?;
            self.push_ref(low);
            let high = self.compose_rec(f1, g1, level)?;
            self.push_ref(high);
            let res = self.make_node(top, low, high)?;
            self.pop_refs(2);
            res
        } else {
            self.ite_rec(g, self.high(f), self.low(f))?
        };

        self.replace_cache.insert(f, g, tag, res);
        Ok(res)
    }

    /// Renames variables of `f` according to `pairs` (`old -> new`).
    ///
    /// Panics if a variable is renamed onto a variable `f` still depends on.
    pub fn replace(&mut self, f: Ref, pairs: &[(Var, Var)]) -> Ref {
        debug!("replace(f = {}, pairs = {:?})", f, pairs);
        self.replace_id = self.replace_id.wrapping_add(1);
        if self.replace_id == 0 {
            self.replace_cache.clear();
            self.replace_id = 1;
        }
        self.run(|k| {
            let mut target: Vec<u32> = (0..k.var_count()).map(|v| k.var2level[v as usize]).collect();
            let mut last = 0;
            for &(old, new) in pairs {
                let old_level = k.level_of(old);
                target[old.index() as usize] = k.level_of(new);
                last = last.max(old_level);
            }
            k.replace_rec(f, &target, last)
        })
    }

    fn replace_rec(&mut self, r: Ref, target: &[u32], last: u32) -> OpResult {
        if r.is_constant() || self.level(r) > last {
            return Ok(r);
        }
        let tag = self.replace_id << 1;
        if let Some(&res) = self.replace_cache.get(r, Ref::INVALID, tag) {
            return Ok(res);
        }

        let low = self.replace_rec(self.low(r), target, last)?;
        self.push_ref(low);
        let high = self.replace_rec(self.high(r), target, last)?;
        self.push_ref(high);
        let new_level = target[self.var_of(r).index() as usize];
        let res = self.correctify(new_level, low, high)?;
        self.pop_refs(2);

        self.replace_cache.insert(r, Ref::INVALID, tag, res);
        Ok(res)
    }

    /// Builds `(level ? high : low)` when `low`/`high` may contain nodes above `level`.
    fn correctify(&mut self, level: u32, low: Ref, high: Ref) -> OpResult {
        let (level_l, level_h) = (self.level(low), self.level(high));
        if level < level_l && level < level_h {
            return self.make_node(level, low, high);
        }
        assert!(
            level != level_l && level != level_h,
            "Cannot replace onto a variable the BDD depends on"
        );

        let top = level_l.min(level_h);
        let (l0, l1) = if level_l == top { (self.low(low), self.high(low)) } else { (low, low) };
        let (h0, h1) = if level_h == top { (self.low(high), self.high(high)) } else { (high, high) };
        let res_low = self.correctify(level, l0, h0)?;
        self.push_ref(res_low);
        let res_high = self.correctify(level, l1, h1)?;
        self.push_ref(res_high);
        let res = self.make_node(top, res_low, res_high)?;
        self.pop_refs(2);
        Ok(res)
    }
}

#[cfg(test)]
mod tests {
    use test_log::test;

    use super::*;
    use crate::debug::check_invariants;

    fn setup() -> (Kernel, Ref, Ref, Ref) {
        let kernel = Kernel::new(3, 100, 100);
        let x = kernel.ith_var(Var::new(0));
        let y = kernel.ith_var(Var::new(1));
        let z = kernel.ith_var(Var::new(2));
        (kernel, x, y, z)
    }

    #[test]
    fn test_restrict() {
        let (mut kernel, x, y, z) = setup();
        let xy = kernel.and(x, y);
        let f = kernel.or(xy, z);
        assert_eq!(kernel.restrict(f, x), kernel.or(y, z));
        let nx = kernel.nith_var(Var::new(0));
        assert_eq!(kernel.restrict(f, nx), z);
        let nz = kernel.nith_var(Var::new(2));
        let cube = kernel.and(x, nz);
        assert_eq!(kernel.restrict(f, cube), y);
        assert_eq!(kernel.restrict(f, Ref::ONE), f);
    }

    #[test]
    fn test_shannon_join() {
        let (mut kernel, x, y, z) = setup();
        let yz = kernel.xor(y, z);
        let f = kernel.or(x, yz);
        let ny = kernel.nith_var(Var::new(1));
        let f1 = kernel.restrict(f, y);
        let f0 = kernel.restrict(f, ny);
        assert_eq!(kernel.ite(y, f1, f0), f);
    }

    #[test]
    fn test_quantifiers_match_restrict() {
        let (mut kernel, x, y, z) = setup();
        let xy = kernel.and(x, y);
        let nx = kernel.not(x);
        let nxz = kernel.and(nx, z);
        let f = kernel.or(xy, nxz);

        let f1 = kernel.restrict(f, x);
        let f0 = kernel.restrict(f, nx);
        let expected_exists = kernel.or(f1, f0);
        let expected_forall = kernel.and(f1, f0);
        assert_eq!(kernel.exists(f, x), expected_exists);
        assert_eq!(kernel.for_all(f, x), expected_forall);

        let all = kernel.and(xy, z);
        assert_eq!(kernel.exists(f, all), Ref::ONE);
        assert_eq!(kernel.for_all(f, all), Ref::ZERO);
        check_invariants(&kernel);
    }

    #[test]
    fn test_compose() {
        let (mut kernel, x, y, z) = setup();
        let f = kernel.and(x, y);
        let g = kernel.or(y, z);
        let composed = kernel.compose(f, Var::new(0), g);
        assert_eq!(composed, y);

        let h = kernel.xor(x, z);
        let composed = kernel.compose(h, Var::new(2), x);
        assert_eq!(composed, Ref::ZERO);
    }

    #[test]
    fn test_replace() {
        let (mut kernel, x, y, z) = setup();
        let f = kernel.and(x, y);
        let renamed = kernel.replace(f, &[(Var::new(1), Var::new(2))]);
        assert_eq!(renamed, kernel.and(x, z));

        let swapped = kernel.replace(renamed, &[(Var::new(0), Var::new(2)), (Var::new(2), Var::new(0))]);
        assert_eq!(swapped, renamed);

        let nx = kernel.not(x);
        let g = kernel.or(nx, z);
        let moved = kernel.replace(g, &[(Var::new(0), Var::new(1))]);
        let ny = kernel.not(y);
        assert_eq!(moved, kernel.or(ny, z));
        check_invariants(&kernel);
    }

    #[test]
    #[should_panic(expected = "Cannot replace")]
    fn test_replace_onto_existing_variable() {
        let (mut kernel, x, y, _) = setup();
        let f = kernel.and(x, y);
        kernel.replace(f, &[(Var::new(0), Var::new(1))]);
    }
}
