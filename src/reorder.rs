//! Dynamic variable reordering.
//!
//! # Theory: Variable Ordering
//!
//! The size of a BDD representing a Boolean function is highly sensitive to the order
//! in which variables appear in the decision diagram. For some functions, different orderings
//! can cause the BDD size to vary from linear to exponential in the number of variables.
//!
//! Consider the function `f = (x₁ ∧ y₁) ∨ (x₂ ∧ y₂) ∨ ... ∨ (xₙ ∧ yₙ)`:
//!
//! - **Good ordering** (x₁, y₁, x₂, y₂, ..., xₙ, yₙ): O(n) nodes
//! - **Bad ordering** (x₁, x₂, ..., xₙ, y₁, y₂, ..., yₙ): O(2ⁿ) nodes
//!
//! Finding the optimal variable ordering is NP-complete, so the kernel offers
//! heuristics built on a single primitive: the in-place swap of two adjacent
//! levels.
//!
//! # In-place swap
//!
//! Swapping levels `i` and `i+1` (variables `x` above `y`) rewrites every
//! `x`-node `f` that has a `y`-child. With `fij = f[x=i, y=j]`:
//!
//! ```text
//!        f:x                 f:y
//!       /   \               /   \
//!     y       y    ==>    x       x
//!    / \     / \         / \     / \
//!  f00 f01 f10 f11     f00 f10 f01 f11
//! ```
//!
//! The node `f` keeps its index, so every root and every parent stays valid.
//! `y`-nodes simply move up one level and `x`-nodes without `y`-children move
//! down one level. Nodes that lose their last parent are freed immediately,
//! which keeps the live node count equal to the size of the diagram.
//!
//! # Heuristics
//!
//! All heuristics permute the children of unfixed [blocks](crate::blocks); a
//! child moves as a unit, so swapping units of sizes `a` and `b` costs `a·b`
//! adjacent swaps.
//!
//! - **Win2 / Win3**: slide a window over the children and keep the best of all
//!   permutations of the window. The iterative variants repeat until no
//!   further reduction.
//! - **Sifting** (Rudell): move each child through all positions, stopping a
//!   direction early once the size exceeds 120% of the best one seen, then
//!   return it to its best position.
//! - **Random**: random adjacent swaps.
//!
//! # References
//!
//! - R. Rudell. "Dynamic variable ordering for ordered binary decision diagrams."
//!   ICCAD 1993. DOI: 10.1109/ICCAD.1993.580054
//!
//! - C. Meinel & T. Theobald. "Algorithms and Data Structures in VLSI Design."
//!   Springer, 1998. Chapter 4.

use std::collections::BTreeSet;

use log::{debug, info, trace};
use rand::Rng;

use crate::blocks::{build_tree, Block};
use crate::kernel::{AutoReorder, Kernel};
use crate::reference::Ref;
use crate::types::Var;

#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum ReorderMethod {
    None,
    Win2,
    Win2Ite,
    Win3,
    Win3Ite,
    Sift,
    SiftIte,
    Random,
}

/// Statistics collected during reordering.
#[derive(Debug, Clone, Default)]
pub struct ReorderStats {
    /// Number of adjacent level swaps performed
    pub swaps: usize,
    /// Diagram size before reordering
    pub initial_size: usize,
    /// Diagram size after reordering
    pub final_size: usize,
}

impl ReorderStats {
    /// Calculate the size reduction ratio.
    pub fn reduction_ratio(&self) -> f64 {
        if self.initial_size == 0 {
            return 0.0;
        }
        1.0 - (self.final_size as f64 / self.initial_size as f64)
    }

    /// Calculate the percentage reduction.
    pub fn reduction_percent(&self) -> f64 {
        self.reduction_ratio() * 100.0
    }
}

/// Bookkeeping of a reordering session.
struct Session {
    /// Number of parents of every node.
    in_degree: Vec<u32>,
    /// Nodes of each level (may contain stale entries, filtered on use).
    level_nodes: Vec<Vec<Ref>>,
    /// Internal nodes reachable from the roots, literal nodes without parents excluded.
    size: usize,
    swaps: usize,
}

impl Kernel {
    fn is_literal_node(&self, r: Ref) -> bool {
        self.low(r).is_constant() && self.high(r).is_constant()
    }

    fn session_begin(&mut self) -> Session {
        self.gc();

        let mut session = Session {
            in_degree: vec![0; self.table.capacity()],
            level_nodes: vec![Vec::new(); self.var_count() as usize],
            size: 0,
            swaps: 0,
        };
        let live: Vec<Ref> = self.table.live_nodes().collect();
        for &n in &live {
            session.in_degree[self.low(n).index()] += 1;
            session.in_degree[self.high(n).index()] += 1;
            session.level_nodes[self.level(n) as usize].push(n);
        }
        session.size = live
            .iter()
            .filter(|&&n| !(self.is_literal_node(n) && session.in_degree[n.index()] == 0))
            .count();
        session
    }

    fn session_end(&mut self, session: Session) -> usize {
        self.clear_caches();
        self.reorders += 1;
        session.swaps
    }

    fn inc_in_degree(&self, session: &mut Session, n: Ref) {
        if n.is_constant() {
            return;
        }
        if session.in_degree[n.index()] == 0 && self.is_literal_node(n) {
            session.size += 1;
        }
        session.in_degree[n.index()] += 1;
    }

    /// Drops one parent of `n`, freeing every node that becomes unreachable.
    fn dec_in_degree(&mut self, session: &mut Session, n: Ref) {
        let mut stack = vec![n];
        while let Some(n) = stack.pop() {
            if n.is_constant() {
                continue;
            }
            let degree = &mut session.in_degree[n.index()];
            *degree -= 1;
            if *degree > 0 {
                continue;
            }
            if self.table[n].ref_count > 0 {
                if self.is_literal_node(n) {
                    session.size -= 1;
                }
                continue;
            }
            let (low, high) = (self.low(n), self.high(n));
            self.table.unlink(n);
            self.table.release(n);
            session.size -= 1;
            stack.push(low);
            stack.push(high);
        }
    }

    /// Finds or creates `(level, low, high)` as the new child of a rewritten node.
    fn swap_make(&mut self, session: &mut Session, level: u32, low: Ref, high: Ref) -> Ref {
        if low == high {
            self.inc_in_degree(session, low);
            return low;
        }
        if let Some(r) = self.table.find(level, low, high) {
            self.inc_in_degree(session, r);
            return r;
        }
        let r = match self.table.alloc(level, low, high) {
            Some(r) => r,
            None => panic!("Node table exhausted during reordering"),
        };
        session.in_degree[r.index()] = 1;
        session.size += 1;
        self.inc_in_degree(session, low);
        self.inc_in_degree(session, high);
        session.level_nodes[level as usize].push(r);
        r
    }

    fn ensure_free(&mut self, session: &mut Session, needed: usize) {
        while self.table.free_count() < needed {
            if !self.grow() {
                panic!("Node table exhausted during reordering");
            }
        }
        session.in_degree.resize(self.table.capacity(), 0);
    }

    fn take_level(&self, session: &mut Session, level: u32) -> Vec<Ref> {
        let mut nodes = std::mem::take(&mut session.level_nodes[level as usize]);
        nodes.retain(|&n| !self.table[n].is_free() && self.level(n) == level);
        nodes.sort_unstable();
        nodes.dedup();
        nodes
    }

    /// Swaps the variables at `level` and `level + 1` in place.
    fn swap_levels(&mut self, session: &mut Session, level: u32) {
        let (i, j) = (level, level + 1);
        let xs = self.take_level(session, i);
        let ys = self.take_level(session, j);
        self.ensure_free(session, 2 * xs.len());

        let (dependent, independent): (Vec<Ref>, Vec<Ref>) = xs.iter().partition(|&&x| {
            let (low, high) = (self.low(x), self.high(x));
            self.level(low) == j || self.level(high) == j
        });

        for &n in xs.iter().chain(&ys) {
            self.table.unlink(n);
        }
        for &y in &ys {
            self.table[y].set_level(i);
            self.table.link(y);
        }
        for &x in &independent {
            self.table[x].set_level(j);
            self.table.link(x);
        }
        session.level_nodes[j as usize] = independent;

        // Children at level `i` are former `y`-nodes.
        let cofactors = |kernel: &Self, n: Ref| {
            if !n.is_constant() && kernel.level(n) == i {
                (kernel.low(n), kernel.high(n))
            } else {
                (n, n)
            }
        };
        for &f in &dependent {
            let (f0, f1) = (self.low(f), self.high(f));
            let (f00, f01) = cofactors(self, f0);
            let (f10, f11) = cofactors(self, f1);
            let n0 = self.swap_make(session, j, f00, f10);
            let n1 = self.swap_make(session, j, f01, f11);
            self.table[f].low = n0;
            self.table[f].high = n1;
            self.table.link(f);
            self.dec_in_degree(session, f0);
            self.dec_in_degree(session, f1);
        }

        let mut new_i = ys;
        new_i.extend(dependent);
        session.level_nodes[i as usize] = new_i;

        let (vx, vy) = (self.level2var[i as usize], self.level2var[j as usize]);
        self.level2var.swap(i as usize, j as usize);
        self.var2level[vx as usize] = j;
        self.var2level[vy as usize] = i;
        session.swaps += 1;
        trace!("swap levels {} <-> {}: size = {}", i, j, session.size);
    }

    /// Swaps the adjacent units at positions `pos` and `pos + 1`.
    fn swap_units(&mut self, session: &mut Session, units: &mut [BTreeSet<u32>], pos: usize) {
        let top = units[pos].iter().map(|&v| self.var2level[v as usize]).min().unwrap_or(0);
        let ka = units[pos].len() as u32;
        let kb = units[pos + 1].len() as u32;
        for k in 0..kb {
            for l in (top + k..top + ka + k).rev() {
                self.swap_levels(session, l);
            }
        }
        units.swap(pos, pos + 1);
    }

    /// Number of distinct live nodes at the levels of `unit`.
    fn unit_size(&self, session: &Session, unit: &BTreeSet<u32>) -> usize {
        unit.iter()
            .map(|&v| {
                let level = self.var2level[v as usize];
                // A slot freed and reused at the same level is listed twice.
                let mut nodes: Vec<Ref> = session.level_nodes[level as usize]
                    .iter()
                    .copied()
                    .filter(|&n| !self.table[n].is_free() && self.level(n) == level)
                    .collect();
                nodes.sort_unstable();
                nodes.dedup();
                nodes.len()
            })
            .sum()
    }

    fn win2(&mut self, session: &mut Session, units: &mut [BTreeSet<u32>]) {
        for pos in 0..units.len().saturating_sub(1) {
            let before = session.size;
            self.swap_units(session, units, pos);
            if session.size >= before {
                self.swap_units(session, units, pos);
            }
        }
    }

    fn win3(&mut self, session: &mut Session, units: &mut [BTreeSet<u32>]) {
        if units.len() < 3 {
            self.win2(session, units);
            return;
        }
        for pos in 0..units.len() - 2 {
            // The six permutations of a window, visited by alternating swaps.
            let steps = [pos, pos + 1, pos, pos + 1, pos, pos + 1];
            let mut best = session.size;
            let mut best_k = 0;
            for (k, &step) in steps[..5].iter().enumerate() {
                self.swap_units(session, units, step);
                if session.size < best {
                    best = session.size;
                    best_k = k + 1;
                }
            }
            // Currently at permutation 5: walk back or wrap around, whichever is shorter.
            if 5 - best_k <= best_k + 1 {
                for &step in steps[best_k..5].iter().rev() {
                    self.swap_units(session, units, step);
                }
            } else {
                self.swap_units(session, units, steps[5]);
                for &step in &steps[..best_k] {
                    self.swap_units(session, units, step);
                }
            }
        }
    }

    fn sift(&mut self, session: &mut Session, units: &mut [BTreeSet<u32>]) {
        let mut order: Vec<(usize, BTreeSet<u32>)> =
            units.iter().map(|u| (self.unit_size(session, u), u.clone())).collect();
        order.sort_by(|a, b| b.0.cmp(&a.0));

        let n = units.len();
        for (_, unit) in order {
            let Some(start) = units.iter().position(|u| *u == unit) else {
                continue;
            };
            let mut best = session.size;
            let mut best_pos = start;
            let mut pos = start;

            while pos > 0 {
                self.swap_units(session, units, pos - 1);
                pos -= 1;
                if session.size < best {
                    best = session.size;
                    best_pos = pos;
                } else if session.size * 5 > best * 6 {
                    break;
                }
            }
            while pos + 1 < n {
                self.swap_units(session, units, pos);
                pos += 1;
                if session.size < best {
                    best = session.size;
                    best_pos = pos;
                } else if session.size * 5 > best * 6 {
                    break;
                }
            }
            while pos > best_pos {
                self.swap_units(session, units, pos - 1);
                pos -= 1;
            }
            while pos < best_pos {
                self.swap_units(session, units, pos);
                pos += 1;
            }
            debug!("sifted unit {:?} from {} to {}: size = {}", unit, start, best_pos, best);
        }
    }

    fn random(&mut self, session: &mut Session, units: &mut [BTreeSet<u32>]) {
        if units.len() < 2 {
            return;
        }
        let mut rng = rand::thread_rng();
        for _ in 0..units.len() {
            let pos = rng.gen_range(0..units.len() - 1);
            self.swap_units(session, units, pos);
        }
    }

    /// Repeats `pass` until it stops reducing the size.
    fn iterate(
        &mut self,
        session: &mut Session,
        units: &mut [BTreeSet<u32>],
        pass: fn(&mut Self, &mut Session, &mut [BTreeSet<u32>]),
    ) {
        loop {
            let before = session.size;
            pass(self, session, units);
            if session.size >= before {
                break;
            }
        }
    }

    fn reorder_units(&mut self, session: &mut Session, units: &mut [BTreeSet<u32>], method: ReorderMethod) {
        match method {
            ReorderMethod::None => {}
            ReorderMethod::Win2 => self.win2(session, units),
            ReorderMethod::Win2Ite => self.iterate(session, units, Self::win2),
            ReorderMethod::Win3 => self.win3(session, units),
            ReorderMethod::Win3Ite => self.iterate(session, units, Self::win3),
            ReorderMethod::Sift => self.sift(session, units),
            ReorderMethod::SiftIte => self.iterate(session, units, Self::sift),
            ReorderMethod::Random => self.random(session, units),
        }
    }

    fn reorder_block(&mut self, session: &mut Session, block: &Block, method: ReorderMethod) {
        if !block.fixed && block.children.len() >= 2 {
            let mut units: Vec<BTreeSet<u32>> = block.children.iter().map(|c| c.vars.clone()).collect();
            units.sort_by_key(|u| u.iter().map(|&v| self.var2level[v as usize]).min());
            self.reorder_units(session, &mut units, method);
        }
        for child in &block.children {
            self.reorder_block(session, child, method);
        }
    }

    /// Reorders the variables within the declared blocks.
    ///
    /// Without blocks (see [`add_variable_block`](Kernel::add_variable_block)
    /// and [`add_all_variables_as_block`](Kernel::add_all_variables_as_block))
    /// this is a no-op. Nodes without references are collected first; every
    /// referenced node keeps its index and its function.
    pub fn reorder(&mut self, method: ReorderMethod) -> ReorderStats {
        let tree = match build_tree(&self.blocks, &self.var2level) {
            Some(tree) if method != ReorderMethod::None => tree,
            _ => {
                debug!("reorder({:?}): nothing to reorder", method);
                return ReorderStats::default();
            }
        };

        let mut session = self.session_begin();
        let initial_size = session.size;
        info!("Reordering with {:?}: {} nodes", method, initial_size);
        self.reorder_block(&mut session, &tree, method);
        let final_size = session.size;
        let swaps = self.session_end(session);
        info!("Reordering done: {} -> {} nodes in {} swaps", initial_size, final_size, swaps);

        ReorderStats {
            swaps,
            initial_size,
            final_size,
        }
    }

    /// Exchanges the positions of two variables in the ordering.
    ///
    /// Panics if variable blocks have been declared.
    pub fn swap_variables(&mut self, a: Var, b: Var) {
        assert!(self.blocks.is_empty(), "Cannot swap variables while variable blocks are defined");
        let (la, lb) = (self.level_of(a), self.level_of(b));
        let (top, bottom) = (la.min(lb), la.max(lb));
        if top == bottom {
            return;
        }
        debug!("swap_variables({}, {}): levels {} and {}", a, b, la, lb);

        let mut session = self.session_begin();
        for l in top..bottom {
            self.swap_levels(&mut session, l);
        }
        for l in (top..bottom - 1).rev() {
            self.swap_levels(&mut session, l);
        }
        self.session_end(session);
    }

    /// Arms automatic reordering during node creation, for at most `bound` reorderings.
    pub fn activate_reorder_during_build(&mut self, method: ReorderMethod, bound: usize) {
        debug!("activate_reorder_during_build({:?}, bound = {})", method, bound);
        self.auto_reorder = Some(AutoReorder {
            method,
            bound,
            performed: 0,
            threshold: self.config.auto_reorder_initial_threshold,
        });
    }

    pub fn deactivate_reorder_during_build(&mut self) {
        self.auto_reorder = None;
    }

    /// Number of reorderings performed so far.
    pub fn reorder_count(&self) -> usize {
        self.reorders
    }

    pub(crate) fn auto_reorder_due(&self) -> bool {
        match &self.auto_reorder {
            Some(auto) if !self.reorder_disabled => {
                auto.method != ReorderMethod::None
                    && auto.performed < auto.bound
                    && self.table.live_count() >= auto.threshold
            }
            _ => false,
        }
    }

    pub(crate) fn reorder_auto(&mut self) {
        let Some(method) = self.auto_reorder.as_ref().map(|a| a.method) else {
            return;
        };
        info!("Automatic reordering at {} used nodes", self.table.live_count());
        self.reorder(method);
        let live = self.table.live_count();
        let factor = self.config.reorder_growth_factor.max(1);
        if let Some(auto) = &mut self.auto_reorder {
            auto.performed += 1;
            auto.threshold = auto.threshold.max(live) * factor;
            debug!("next automatic reordering at {} used nodes", auto.threshold);
        }
    }
}

#[cfg(test)]
mod tests {
    use num_bigint::BigUint;
    use test_log::test;

    use super::*;
    use crate::debug::check_invariants;

    /// `(x0 ∧ x3) ∨ (x1 ∧ x4) ∨ (x2 ∧ x5)` under the identity order.
    /// Intermediate results stay referenced so that automatic reordering may run.
    fn interleaved(kernel: &mut Kernel) -> Ref {
        let mut res = Ref::ZERO;
        for i in 0..3 {
            let a = kernel.ith_var(Var::new(i));
            let b = kernel.ith_var(Var::new(i + 3));
            let ab = kernel.and(a, b);
            kernel.add_ref(ab);
            let next = kernel.or(res, ab);
            kernel.add_ref(next);
            kernel.del_ref(ab);
            kernel.del_ref(res);
            res = next;
        }
        res
    }

    fn truth_table(kernel: &Kernel, r: Ref) -> Vec<bool> {
        let n = kernel.var_count();
        (0..1u32 << n)
            .map(|mask| {
                let mut node = r;
                while !node.is_constant() {
                    let v = kernel.var_of(node).index();
                    node = if mask >> v & 1 == 1 { kernel.high(node) } else { kernel.low(node) };
                }
                node.is_one()
            })
            .collect()
    }

    #[test]
    fn test_swap_adjacent_preserves_function() {
        let mut kernel = Kernel::new(6, 200, 100);
        let f = interleaved(&mut kernel);
        let expected = truth_table(&kernel, f);

        kernel.swap_variables(Var::new(2), Var::new(3));
        check_invariants(&kernel);
        assert_eq!(kernel.level_of(Var::new(3)), 2);
        assert_eq!(kernel.level_of(Var::new(2)), 3);
        assert_eq!(kernel.var_at(2), Var::new(3));
        assert_eq!(truth_table(&kernel, f), expected);
    }

    #[test]
    fn test_swap_distant_variables() {
        let mut kernel = Kernel::new(6, 200, 100);
        let f = interleaved(&mut kernel);
        let expected = truth_table(&kernel, f);

        kernel.swap_variables(Var::new(1), Var::new(4));
        check_invariants(&kernel);
        let order: Vec<u32> = kernel.current_order().iter().map(|v| v.index()).collect();
        assert_eq!(order, vec![0, 4, 2, 3, 1, 5]);
        assert_eq!(truth_table(&kernel, f), expected);

        kernel.swap_variables(Var::new(4), Var::new(1));
        assert_eq!(kernel.current_order(), (0..6).map(Var::new).collect::<Vec<_>>());
        assert_eq!(kernel.node_count(f), 14);
    }

    #[test]
    #[should_panic(expected = "variable blocks")]
    fn test_swap_rejected_with_blocks() {
        let mut kernel = Kernel::new(2, 20, 10);
        kernel.add_all_variables_as_block();
        kernel.swap_variables(Var::new(0), Var::new(1));
    }

    #[test]
    fn test_sift_finds_interleaved_order() {
        let mut kernel = Kernel::new(6, 200, 100);
        let f = interleaved(&mut kernel);
        let expected = truth_table(&kernel, f);
        let before = kernel.node_count(f);

        kernel.add_all_variables_as_block();
        let stats = kernel.reorder(ReorderMethod::Sift);
        check_invariants(&kernel);
        assert_eq!(truth_table(&kernel, f), expected);
        assert!(stats.final_size <= stats.initial_size);
        assert!(kernel.node_count(f) < before);
    }

    #[test]
    fn test_all_methods_preserve_function() {
        for method in [
            ReorderMethod::Win2,
            ReorderMethod::Win2Ite,
            ReorderMethod::Win3,
            ReorderMethod::Win3Ite,
            ReorderMethod::Sift,
            ReorderMethod::SiftIte,
            ReorderMethod::Random,
        ] {
            let mut kernel = Kernel::new(6, 200, 100);
            let f = interleaved(&mut kernel);
            let expected = truth_table(&kernel, f);
            let before = kernel.node_count(f);
            kernel.add_all_variables_as_block();
            kernel.reorder(method);
            check_invariants(&kernel);
            assert_eq!(truth_table(&kernel, f), expected, "{:?}", method);
            if method != ReorderMethod::Random {
                assert!(kernel.node_count(f) <= before, "{:?}", method);
            }
        }
    }

    #[test]
    fn test_fixed_block_keeps_order() {
        let mut kernel = Kernel::new(6, 200, 100);
        let _f = interleaved(&mut kernel);
        kernel.add_variable_block(Var::new(0), Var::new(2), true).unwrap();
        kernel.add_variable_block(Var::new(3), Var::new(5), false).unwrap();
        kernel.reorder(ReorderMethod::Sift);
        check_invariants(&kernel);
        let levels: Vec<u32> = (0..3).map(|v| kernel.level_of(Var::new(v))).collect();
        assert!(levels.windows(2).all(|w| w[0] + 1 == w[1]));
    }

    #[test]
    fn test_unit_size_counts_each_node_once() {
        let mut kernel = Kernel::new(6, 200, 100);
        let _f = interleaved(&mut kernel);
        let mut session = kernel.session_begin();
        for l in [0, 2, 1, 3, 4, 2] {
            kernel.swap_levels(&mut session, l);
        }
        let top = session.level_nodes[0].clone();
        session.level_nodes[0].extend(top);

        for level in 0..6 {
            let var = kernel.level2var[level as usize];
            let live = kernel.table.live_nodes().filter(|&n| kernel.level(n) == level).count();
            assert_eq!(kernel.unit_size(&session, &BTreeSet::from([var])), live, "level {}", level);
        }
        kernel.session_end(session);
        check_invariants(&kernel);
    }

    #[test]
    fn test_no_blocks_is_noop() {
        let mut kernel = Kernel::new(6, 200, 100);
        let _f = interleaved(&mut kernel);
        let stats = kernel.reorder(ReorderMethod::Sift);
        assert_eq!(stats.swaps, 0);
        assert_eq!(kernel.reorder_count(), 0);
    }

    #[test]
    fn test_auto_reorder_during_operation() {
        let config = crate::kernel::KernelConfig {
            auto_reorder_initial_threshold: 0,
            ..Default::default()
        };
        let mut kernel = Kernel::with_config(6, 20, 100, config);
        kernel.add_all_variables_as_block();
        kernel.activate_reorder_during_build(ReorderMethod::Sift, 1);
        let f = interleaved(&mut kernel);
        check_invariants(&kernel);
        assert_eq!(kernel.reorder_count(), 1);

        let mut reference = Kernel::new(6, 200, 100);
        let g = interleaved(&mut reference);
        assert_eq!(kernel.sat_count(f), reference.sat_count(g));
    }

    /// `(x0 ∧ x6) ∨ ... ∨ (x5 ∧ x11)` under the identity order, one pair per step.
    /// Returns the result with the reorder count and threshold seen after each step.
    fn separated_pairs(kernel: &mut Kernel) -> (Ref, Vec<(usize, usize)>) {
        let mut res = Ref::ZERO;
        let mut trace = Vec::new();
        for i in 0..6 {
            let a = kernel.ith_var(Var::new(i));
            let b = kernel.ith_var(Var::new(i + 6));
            let ab = kernel.and(a, b);
            kernel.add_ref(ab);
            let next = kernel.or(res, ab);
            kernel.add_ref(next);
            kernel.del_ref(ab);
            kernel.del_ref(res);
            res = next;
            let threshold = kernel.auto_reorder.as_ref().map_or(0, |a| a.threshold);
            trace.push((kernel.reorder_count(), threshold));
        }
        (res, trace)
    }

    #[test]
    fn test_auto_reorder_threshold_grows() {
        let config = crate::kernel::KernelConfig {
            auto_reorder_initial_threshold: 0,
            reorder_growth_factor: 2,
            ..Default::default()
        };
        let mut kernel = Kernel::with_config(12, 30, 100, config);
        kernel.add_all_variables_as_block();
        kernel.activate_reorder_during_build(ReorderMethod::Sift, 5);
        let (f, trace) = separated_pairs(&mut kernel);
        check_invariants(&kernel);

        let reorders = kernel.reorder_count();
        assert!((1..=5).contains(&reorders), "{} reorderings", reorders);
        let auto = kernel.auto_reorder.as_ref().unwrap();
        assert_eq!(auto.performed, reorders);

        // The threshold only moves when a reordering ran, and at least doubles each time.
        let mut prev = (0, 0);
        for &(count, threshold) in &trace {
            if count == prev.0 {
                assert_eq!(threshold, prev.1);
            } else {
                assert!(threshold > 0 && threshold % 2 == 0, "{:?}", trace);
                assert!(threshold >= prev.1 * 2u32.pow((count - prev.0) as u32) as usize, "{:?}", trace);
            }
            prev = (count, threshold);
        }

        // 4096 assignments, 729 of which falsify every pair.
        assert_eq!(kernel.sat_count(f), BigUint::from(4096u32 - 729));
    }

    #[test]
    fn test_auto_reorder_respects_bound() {
        // Without growth every full table is due for a reordering.
        let config = crate::kernel::KernelConfig {
            auto_reorder_initial_threshold: 0,
            reorder_growth_factor: 1,
            ..Default::default()
        };
        let mut kernel = Kernel::with_config(12, 30, 100, config);
        kernel.add_all_variables_as_block();
        kernel.activate_reorder_during_build(ReorderMethod::Win2, 2);
        let (f, _) = separated_pairs(&mut kernel);
        check_invariants(&kernel);
        assert!((1..=2).contains(&kernel.reorder_count()), "{} reorderings", kernel.reorder_count());

        kernel.deactivate_reorder_during_build();
        let before = kernel.reorder_count();
        let g = kernel.not(f);
        assert_eq!(kernel.reorder_count(), before);
        assert_eq!(kernel.sat_count(f) + kernel.sat_count(g), BigUint::from(4096u32));
    }
}
