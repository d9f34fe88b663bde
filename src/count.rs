//! Counting: satisfying assignments, paths, nodes, and the support of a BDD.

use log::debug;
use num_bigint::BigUint;
use num_traits::{One, Zero};

use crate::kernel::{Kernel, OpResult};
use crate::reference::Ref;

const SAT_COUNT_TAG: u32 = 0;
const PATH_ONE_TAG: u32 = 1;
const PATH_ZERO_TAG: u32 = 2;

impl Kernel {
    /// Number of satisfying assignments of `r` over all kernel variables.
    pub fn sat_count(&mut self, r: Ref) -> BigUint {
        debug!("sat_count(r = {})", r);
        let level = self.level(r);
        self.sat_count_rec(r) << level
    }

    fn sat_count_rec(&mut self, r: Ref) -> BigUint {
        if r.is_constant() {
            return if r.is_one() { BigUint::one() } else { BigUint::zero() };
        }
        if let Some(res) = self.misc_cache.get(r, Ref::INVALID, SAT_COUNT_TAG) {
            return res.clone();
        }

        let level = self.level(r);
        let (low, high) = (self.low(r), self.high(r));
        let low_count = self.sat_count_rec(low) << (self.level(low) - level - 1);
        let high_count = self.sat_count_rec(high) << (self.level(high) - level - 1);
        let res = low_count + high_count;

        self.misc_cache.insert(r, Ref::INVALID, SAT_COUNT_TAG, res.clone());
        res
    }

    /// Number of paths from `r` to the one terminal.
    pub fn path_count_one(&mut self, r: Ref) -> BigUint {
        self.path_count_rec(r, Ref::ONE, PATH_ONE_TAG)
    }

    /// Number of paths from `r` to the zero terminal.
    pub fn path_count_zero(&mut self, r: Ref) -> BigUint {
        self.path_count_rec(r, Ref::ZERO, PATH_ZERO_TAG)
    }

    fn path_count_rec(&mut self, r: Ref, terminal: Ref, tag: u32) -> BigUint {
        if r.is_constant() {
            return if r == terminal { BigUint::one() } else { BigUint::zero() };
        }
        if let Some(res) = self.misc_cache.get(r, Ref::INVALID, tag) {
            return res.clone();
        }
        let res = self.path_count_rec(self.low(r), terminal, tag) + self.path_count_rec(self.high(r), terminal, tag);
        self.misc_cache.insert(r, Ref::INVALID, tag, res.clone());
        res
    }

    /// Visits every internal node reachable from `r` once, using the mark bit.
    /// The marks are cleared before returning.
    pub(crate) fn for_each_node(&mut self, r: Ref, mut f: impl FnMut(&Self, Ref)) {
        let mut stack = vec![r];
        let mut visited = Vec::new();
        while let Some(n) = stack.pop() {
            if n.is_constant() || self.table[n].is_marked() {
                continue;
            }
            self.table[n].mark();
            visited.push(n);
            f(self, n);
            stack.push(self.low(n));
            stack.push(self.high(n));
        }
        for n in visited {
            self.table[n].unmark();
        }
    }

    /// Number of internal nodes of `r`.
    pub fn node_count(&mut self, r: Ref) -> usize {
        let mut count = 0;
        self.for_each_node(r, |_, _| count += 1);
        count
    }

    /// Number of nodes labelled with each kernel variable, indexed by variable.
    pub fn var_profile(&mut self, r: Ref) -> Vec<usize> {
        let mut profile = vec![0; self.var_count() as usize];
        self.for_each_node(r, |k, n| profile[k.var_of(n).index() as usize] += 1);
        profile
    }

    /// The positive cube of all variables `r` depends on; `Ref::ZERO` for constants.
    pub fn support(&mut self, r: Ref) -> Ref {
        debug!("support(r = {})", r);
        self.run(|k| k.support_cube(r))
    }

    fn support_cube(&mut self, r: Ref) -> OpResult {
        if r.is_constant() {
            return Ok(Ref::ZERO);
        }
        self.varset_begin();
        let mut levels = Vec::new();
        self.for_each_node(r, |k, n| levels.push(k.level(n)));
        let min_level = levels.iter().copied().min().unwrap_or(0);
        for level in levels {
            self.tag_level(level);
        }

        let mut res = Ref::ONE;
        for level in (min_level..=self.varset_last).rev() {
            if self.in_varset(level) {
                res = self.make_node(level, Ref::ZERO, res)?;
                self.push_ref(res);
            }
        }
        Ok(res)
    }
}
