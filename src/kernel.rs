//! The shared node kernel.
//!
//! A [`Kernel`] owns the node table, the operation caches, the variable
//! mapping and the reordering state. Operations are split into topical
//! `impl Kernel` blocks: [`apply`](crate::apply), [`quantify`](crate::quantify),
//! [`count`](crate::count), [`sat`](crate::sat), [`paths`](crate::paths) and
//! [`reorder`](crate::reorder).
//!
//! Every recursive operation returns `Result<Ref, ReorderRequest>`: when
//! automatic reordering is armed and the table grows past its threshold,
//! [`make_node`](Kernel::make_node) refuses to allocate, the recursion unwinds
//! through `?`, and [`run`](Kernel::run) reorders and restarts the operation
//! with automatic reordering disabled.

use std::collections::HashMap;
use std::fmt::{Debug, Formatter};
use std::rc::Rc;

use log::{debug, info};
use num_bigint::BigUint;

use crate::blocks::BlockSpec;
use crate::cache::OpCache;
use crate::error::BddError;
use crate::factory::{DefaultFactory, FormulaFactory};
use crate::formula::Variable;
use crate::node::{MAX_REF, MAX_VARS};
use crate::primes::{prime_gte, prime_lte};
use crate::reference::Ref;
use crate::reorder::ReorderMethod;
use crate::table::NodeTable;
use crate::types::Var;

/// Signal raised by [`Kernel::make_node`] when the current top-level operation
/// must be restarted after an automatic reordering.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct ReorderRequest;

pub type OpResult = Result<Ref, ReorderRequest>;

/// Memory manager tuning knobs.
#[derive(Debug, Clone)]
pub struct KernelConfig {
    /// Grow the table when at most this percentage of slots is free after a GC.
    pub min_free_percent: usize,
    /// Largest number of slots added by a single resize.
    pub max_increase: usize,
    /// Hard limit on the table capacity.
    pub max_nodes: Option<usize>,
    /// Factor applied to the automatic reordering threshold after each trigger.
    pub reorder_growth_factor: usize,
    /// Number of used nodes that first triggers an automatic reordering.
    pub auto_reorder_initial_threshold: usize,
}

impl Default for KernelConfig {
    fn default() -> Self {
        Self {
            min_free_percent: 20,
            max_increase: 50_000,
            max_nodes: None,
            reorder_growth_factor: 2,
            auto_reorder_initial_threshold: 0,
        }
    }
}

#[derive(Debug, Clone)]
pub(crate) struct AutoReorder {
    pub method: ReorderMethod,
    /// Maximum number of automatic reorderings.
    pub bound: usize,
    pub performed: usize,
    pub threshold: usize,
}

/// Snapshot of the kernel counters.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct KernelStatistics {
    /// Nodes created since construction.
    pub produced: usize,
    /// Capacity of the node table.
    pub nodes: usize,
    pub free: usize,
    pub vars: usize,
    /// Size of the apply cache.
    pub cache: usize,
    pub gc_runs: usize,
    /// Occupied slots of the node table (constants included).
    pub used: usize,
    pub reorders: usize,
    pub cache_hits: usize,
    pub cache_misses: usize,
}

pub struct Kernel {
    pub(crate) table: NodeTable,
    var_count: u32,
    pub(crate) var2level: Vec<u32>,
    pub(crate) level2var: Vec<u32>,
    /// Positive and negative literal node of each kernel variable.
    literals: Vec<(Ref, Ref)>,
    names: Vec<Variable>,
    index_of: HashMap<Variable, Var>,
    refstack: Vec<Ref>,

    pub(crate) apply_cache: OpCache<Ref>,
    pub(crate) ite_cache: OpCache<Ref>,
    pub(crate) quant_cache: OpCache<Ref>,
    pub(crate) replace_cache: OpCache<Ref>,
    pub(crate) misc_cache: OpCache<BigUint>,

    /// Per-level tags of the current variable set session (`±varset_id`).
    varset: Vec<i32>,
    varset_id: i32,
    /// Deepest level of the current variable set.
    pub(crate) varset_last: u32,
    /// Session id of the current `replace` call, part of its cache keys.
    pub(crate) replace_id: u32,

    pub(crate) config: KernelConfig,
    produced: usize,
    gc_runs: usize,
    pub(crate) reorders: usize,
    pub(crate) auto_reorder: Option<AutoReorder>,
    pub(crate) reorder_disabled: bool,
    pub(crate) blocks: Vec<BlockSpec>,

    factory: Rc<dyn FormulaFactory>,
}

impl Kernel {
    /// Creates a kernel for at most `var_count` variables.
    ///
    /// `node_size` and `cache_size` are sizing hints; both end up prime.
    pub fn new(var_count: u32, node_size: usize, cache_size: usize) -> Self {
        Self::with_config(var_count, node_size, cache_size, KernelConfig::default())
    }

    pub fn with_config(var_count: u32, node_size: usize, cache_size: usize, config: KernelConfig) -> Self {
        assert!(var_count < MAX_VARS, "Too many variables: {}", var_count);

        let min_size = 2 * var_count as usize + 2;
        let capacity = prime_gte(node_size.max(min_size).max(3));
        if let Some(max_nodes) = config.max_nodes {
            assert!(
                capacity <= max_nodes,
                "Initial node table size {} exceeds the node limit {}",
                capacity,
                max_nodes
            );
        }
        debug!(
            "Creating kernel for {} variables, {} nodes, cache {}",
            var_count, capacity, cache_size
        );

        let mut kernel = Self {
            table: NodeTable::new(capacity, var_count),
            var_count,
            var2level: (0..var_count).collect(),
            level2var: (0..var_count).collect(),
            literals: Vec::with_capacity(var_count as usize),
            names: Vec::new(),
            index_of: HashMap::new(),
            refstack: Vec::new(),
            apply_cache: OpCache::new(cache_size),
            ite_cache: OpCache::new(cache_size),
            quant_cache: OpCache::new(cache_size),
            replace_cache: OpCache::new(cache_size),
            misc_cache: OpCache::new(cache_size),
            varset: vec![0; var_count as usize],
            varset_id: 0,
            varset_last: 0,
            replace_id: 0,
            config,
            produced: 0,
            gc_runs: 0,
            reorders: 0,
            auto_reorder: None,
            reorder_disabled: false,
            blocks: Vec::new(),
            factory: Rc::new(DefaultFactory),
        };

        for v in 0..var_count {
            let pos = kernel.alloc_pinned(v, Ref::ZERO, Ref::ONE);
            let neg = kernel.alloc_pinned(v, Ref::ONE, Ref::ZERO);
            kernel.literals.push((pos, neg));
        }
        kernel
    }

    /// Creates a kernel whose variables are registered in the given order.
    ///
    /// Panics if a variable occurs twice in `ordering`.
    pub fn with_ordering(ordering: &[Variable], node_size: usize, cache_size: usize) -> Self {
        let mut kernel = Self::new(ordering.len() as u32, node_size, cache_size);
        for (i, v) in ordering.iter().enumerate() {
            let registered = kernel.register_variable(v);
            assert_eq!(registered, Ok(Var::new(i as u32)), "Variable `{}` occurs twice in the ordering", v);
        }
        kernel
    }

    fn alloc_pinned(&mut self, level: u32, low: Ref, high: Ref) -> Ref {
        match self.table.alloc(level, low, high) {
            Some(r) => {
                self.table[r].ref_count = MAX_REF;
                self.produced += 1;
                r
            }
            None => panic!("Node table too small for the variable literals"),
        }
    }

    pub fn factory(&self) -> Rc<dyn FormulaFactory> {
        Rc::clone(&self.factory)
    }

    pub fn set_factory(&mut self, factory: Rc<dyn FormulaFactory>) {
        self.factory = factory;
    }

    pub fn config(&self) -> &KernelConfig {
        &self.config
    }
}

impl Debug for Kernel {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Kernel")
            .field("vars", &self.var_count)
            .field("capacity", &self.table.capacity())
            .field("used", &self.table.live_count())
            .field("free", &self.table.free_count())
            .finish()
    }
}

// Variables
impl Kernel {
    /// Maximum number of variables of this kernel.
    pub fn var_count(&self) -> u32 {
        self.var_count
    }

    /// Number of variables registered by name.
    pub fn registered_count(&self) -> usize {
        self.names.len()
    }

    /// Returns the kernel index of `v`, allocating the next free index on first use.
    pub fn register_variable(&mut self, v: &Variable) -> Result<Var, BddError> {
        if let Some(&var) = self.index_of.get(v) {
            return Ok(var);
        }
        if self.names.len() >= self.var_count as usize {
            return Err(BddError::TooManyVariables(self.var_count));
        }
        let var = Var::new(self.names.len() as u32);
        self.names.push(v.clone());
        self.index_of.insert(v.clone(), var);
        Ok(var)
    }

    pub fn index_for_variable(&self, v: &Variable) -> Option<Var> {
        self.index_of.get(v).copied()
    }

    /// The name registered for a kernel variable.
    pub fn variable_name(&self, var: Var) -> Option<&Variable> {
        self.names.get(var.index() as usize)
    }

    /// The name of a kernel variable, synthesized for unnamed indices.
    pub(crate) fn name_of(&self, var: Var) -> Variable {
        match self.variable_name(var) {
            Some(v) => v.clone(),
            None => Variable::new(var.to_string()),
        }
    }

    fn check_var(&self, var: Var) {
        assert!(
            var.index() < self.var_count,
            "Variable index {} out of range [0, {})",
            var.index(),
            self.var_count
        );
    }

    /// The pinned node of the literal `var` (or `¬var` when `phase` is false).
    pub fn literal(&self, var: Var, phase: bool) -> Ref {
        self.check_var(var);
        let (pos, neg) = self.literals[var.index() as usize];
        if phase {
            pos
        } else {
            neg
        }
    }

    pub fn ith_var(&self, var: Var) -> Ref {
        self.literal(var, true)
    }

    pub fn nith_var(&self, var: Var) -> Ref {
        self.literal(var, false)
    }

    /// Current level of `var`; level 0 is the top of the ordering.
    pub fn level_of(&self, var: Var) -> u32 {
        self.check_var(var);
        self.var2level[var.index() as usize]
    }

    pub fn var_at(&self, level: u32) -> Var {
        assert!(level < self.var_count, "Level {} out of range", level);
        Var::new(self.level2var[level as usize])
    }

    /// Kernel variables from the top level to the bottom one.
    pub fn current_order(&self) -> Vec<Var> {
        self.level2var.iter().map(|&v| Var::new(v)).collect()
    }
}

// Node access
impl Kernel {
    fn check_ref(&self, r: Ref) {
        assert!(
            r.is_valid() && r.index() < self.table.capacity(),
            "Invalid node index {}",
            r
        );
        assert!(!self.table[r].is_free(), "Node {} is not allocated", r);
    }

    #[inline]
    pub fn level(&self, r: Ref) -> u32 {
        self.table.level(r)
    }

    #[inline]
    pub fn low(&self, r: Ref) -> Ref {
        self.table.low(r)
    }

    #[inline]
    pub fn high(&self, r: Ref) -> Ref {
        self.table.high(r)
    }

    /// The kernel variable labelling an internal node.
    pub fn var_of(&self, r: Ref) -> Var {
        assert!(!r.is_constant(), "Constants have no variable");
        Var::new(self.level2var[self.level(r) as usize])
    }

    pub fn ref_count(&self, r: Ref) -> u32 {
        self.check_ref(r);
        self.table[r].ref_count
    }

    /// Increments the external reference counter of `r`.
    pub fn add_ref(&mut self, r: Ref) -> Ref {
        self.check_ref(r);
        self.table[r].inc_ref();
        r
    }

    /// Decrements the external reference counter of `r`.
    pub fn del_ref(&mut self, r: Ref) {
        self.check_ref(r);
        assert!(self.table[r].ref_count > 0, "Releasing node {} without references", r);
        self.table[r].dec_ref();
    }

    #[inline]
    pub(crate) fn push_ref(&mut self, r: Ref) -> Ref {
        self.refstack.push(r);
        r
    }

    #[inline]
    pub(crate) fn pop_refs(&mut self, n: usize) {
        let len = self.refstack.len();
        self.refstack.truncate(len - n);
    }

    /// Returns the unique node `(level, low, high)`, creating it if needed.
    pub(crate) fn make_node(&mut self, level: u32, low: Ref, high: Ref) -> OpResult {
        if low == high {
            return Ok(low);
        }
        debug_assert!(level < self.level(low) && level < self.level(high));

        if let Some(r) = self.table.find(level, low, high) {
            return Ok(r);
        }

        if self.table.is_full() {
            self.gc();
            let cap = self.table.capacity();
            if self.table.free_count() * 100 / cap <= self.config.min_free_percent {
                self.grow();
            }
            if self.table.is_full() {
                panic!("Cannot allocate a node: the node table is exhausted ({} nodes)", cap);
            }
            if self.auto_reorder_due() {
                return Err(ReorderRequest);
            }
        }

        match self.table.alloc(level, low, high) {
            Some(r) => {
                self.produced += 1;
                Ok(r)
            }
            None => panic!("Cannot allocate a node after garbage collection"),
        }
    }

    /// Runs a top-level operation, restarting it after automatic reorderings.
    pub(crate) fn run<T>(&mut self, mut op: impl FnMut(&mut Self) -> Result<T, ReorderRequest>) -> T {
        let was_disabled = self.reorder_disabled;
        loop {
            self.refstack.clear();
            match op(self) {
                Ok(res) => {
                    self.refstack.clear();
                    self.reorder_disabled = was_disabled;
                    return res;
                }
                Err(ReorderRequest) => {
                    self.refstack.clear();
                    self.reorder_auto();
                    self.reorder_disabled = true;
                }
            }
        }
    }
}

// Memory management
impl Kernel {
    /// Mark-sweep garbage collection rooted at the reference stack and
    /// every node with a non-zero reference count.
    pub fn gc(&mut self) {
        let before = self.table.free_count();

        let mut stack: Vec<Ref> = self.refstack.clone();
        stack.extend(
            self.table
                .live_nodes()
                .filter(|&r| self.table[r].ref_count > 0),
        );
        while let Some(r) = stack.pop() {
            if r.is_constant() || self.table[r].is_marked() {
                continue;
            }
            self.table[r].mark();
            stack.push(self.table.low(r));
            stack.push(self.table.high(r));
        }

        let reclaimed = self.table.sweep();
        self.clear_caches();
        self.gc_runs += 1;
        debug!(
            "gc #{}: reclaimed {} nodes, free {} -> {} of {}",
            self.gc_runs,
            reclaimed,
            before,
            self.table.free_count(),
            self.table.capacity()
        );
    }

    /// Grows the table by `min(cap, max_increase)` slots, rounded down to a prime.
    /// Returns `false` when no growth is permitted.
    pub(crate) fn grow(&mut self) -> bool {
        let cap = self.table.capacity();
        let mut new_cap = (2 * cap).min(cap + self.config.max_increase);
        if let Some(max_nodes) = self.config.max_nodes {
            new_cap = new_cap.min(max_nodes);
        }
        let new_cap = prime_lte(new_cap);
        if new_cap <= cap {
            debug!("Node table cannot grow beyond {} nodes", cap);
            return false;
        }
        info!("Resizing node table {} -> {}", cap, new_cap);
        self.table.grow(new_cap);
        true
    }

    pub(crate) fn clear_caches(&mut self) {
        self.apply_cache.clear();
        self.ite_cache.clear();
        self.quant_cache.clear();
        self.replace_cache.clear();
        self.misc_cache.clear();
    }

    pub fn statistics(&self) -> KernelStatistics {
        let caches = [&self.apply_cache, &self.ite_cache, &self.quant_cache, &self.replace_cache];
        KernelStatistics {
            produced: self.produced,
            nodes: self.table.capacity(),
            free: self.table.free_count(),
            vars: self.var_count as usize,
            cache: self.apply_cache.capacity(),
            gc_runs: self.gc_runs,
            used: self.table.live_count(),
            reorders: self.reorders,
            cache_hits: caches.iter().map(|c| c.hits()).sum::<usize>() + self.misc_cache.hits(),
            cache_misses: caches.iter().map(|c| c.misses()).sum::<usize>() + self.misc_cache.misses(),
        }
    }
}

// Variable sets
impl Kernel {
    /// Starts a new variable set session and returns its id.
    pub(crate) fn varset_begin(&mut self) -> i32 {
        if self.varset_id == i32::MAX {
            self.varset.fill(0);
            self.varset_id = 0;
        }
        self.varset_id += 1;
        self.varset_last = 0;
        self.varset_id
    }

    /// Loads the literals of `cube` into a fresh session: positive literals are
    /// tagged `+id`, negative ones `-id`.
    pub(crate) fn load_varset(&mut self, cube: Ref) {
        let id = self.varset_begin();
        let mut n = cube;
        while !n.is_constant() {
            let level = self.level(n);
            let (low, high) = (self.low(n), self.high(n));
            if low.is_zero() {
                self.varset[level as usize] = id;
                n = high;
            } else if high.is_zero() {
                self.varset[level as usize] = -id;
                n = low;
            } else {
                panic!("Node {} is not a cube", cube);
            }
            self.varset_last = self.varset_last.max(level);
        }
    }

    /// Tags a single level in the current session.
    pub(crate) fn tag_level(&mut self, level: u32) {
        self.varset[level as usize] = self.varset_id;
        self.varset_last = self.varset_last.max(level);
    }

    /// Polarity of `level` in the current session, `None` if it is not part of it.
    #[inline]
    pub(crate) fn varset_polarity(&self, level: u32) -> Option<bool> {
        let tag = self.varset[level as usize];
        if tag == self.varset_id {
            Some(true)
        } else if tag == -self.varset_id {
            Some(false)
        } else {
            None
        }
    }

    #[inline]
    pub(crate) fn in_varset(&self, level: u32) -> bool {
        self.varset_polarity(level).is_some()
    }
}
