//! Variable blocks.
//!
//! A block groups variables that occupy contiguous levels and therefore move
//! together during reordering. Blocks may nest or be disjoint but never
//! partially overlap. Only unfixed blocks have their children permuted.
//!
//! Blocks are recorded as variable sets and turned into a forest when a
//! reordering starts:
//!
//! ```text
//!              root (all variables)
//!             /          |          \
//!        [0 1 2]        [3]        [4 5]  fixed
//!        /     \                   /   \
//!      [0]    [1 2]              [4]   [5]
//! ```
//!
//! Inside a block with children, variables not covered by any child become
//! singleton leaves. A block without children is permuted as a whole.

use std::collections::BTreeSet;

use log::debug;

use crate::error::BddError;
use crate::kernel::Kernel;
use crate::types::Var;

/// A block as declared by the user.
#[derive(Debug, Clone, Eq, PartialEq)]
pub(crate) struct BlockSpec {
    pub vars: BTreeSet<u32>,
    pub fixed: bool,
}

/// A node of the block forest.
#[derive(Debug, Clone, Eq, PartialEq)]
pub(crate) struct Block {
    pub vars: BTreeSet<u32>,
    pub fixed: bool,
    pub children: Vec<Block>,
}

impl Block {
    fn leaf(vars: BTreeSet<u32>, fixed: bool) -> Self {
        Self {
            vars,
            fixed,
            children: Vec::new(),
        }
    }

    fn insert(&mut self, spec: &BlockSpec) {
        if let Some(child) = self.children.iter_mut().find(|c| spec.vars.is_subset(&c.vars)) {
            if child.vars != spec.vars {
                child.insert(spec);
            }
            return;
        }
        let (inner, outer): (Vec<Block>, Vec<Block>) = std::mem::take(&mut self.children)
            .into_iter()
            .partition(|c| c.vars.is_subset(&spec.vars));
        let mut block = Block::leaf(spec.vars.clone(), spec.fixed);
        block.children = inner;
        self.children = outer;
        self.children.push(block);
    }

    /// Adds singleton leaves for uncovered variables and sorts children by level.
    fn finish(&mut self, var2level: &[u32]) {
        if self.children.is_empty() {
            return;
        }
        let covered: BTreeSet<u32> = self.children.iter().flat_map(|c| c.vars.iter().copied()).collect();
        for &v in self.vars.difference(&covered) {
            self.children.push(Block::leaf(BTreeSet::from([v]), false));
        }
        self.children.sort_by_key(|c| c.top_level(var2level));
        for child in &mut self.children {
            child.finish(var2level);
        }
    }

    pub fn top_level(&self, var2level: &[u32]) -> u32 {
        self.vars.iter().map(|&v| var2level[v as usize]).min().unwrap_or(u32::MAX)
    }
}

/// Builds the block forest under a synthetic unfixed root.
/// Returns `None` when no blocks were declared.
pub(crate) fn build_tree(specs: &[BlockSpec], var2level: &[u32]) -> Option<Block> {
    if specs.is_empty() {
        return None;
    }
    let mut sorted: Vec<&BlockSpec> = specs.iter().collect();
    sorted.sort_by_key(|s| std::cmp::Reverse(s.vars.len()));

    let mut root = Block::leaf((0..var2level.len() as u32).collect(), false);
    for spec in sorted {
        root.insert(spec);
    }
    root.finish(var2level);
    Some(root)
}

impl Kernel {
    /// Declares the variables `first..=last` (kernel indices) as a block.
    ///
    /// The variables must occupy contiguous levels, and the block must either
    /// contain or be disjoint from every block declared before.
    pub fn add_variable_block(&mut self, first: Var, last: Var, fixed: bool) -> Result<(), BddError> {
        let (f, l) = (first.index(), last.index());
        let invalid = |reason: &str| BddError::InvalidBlock {
            first: f,
            last: l,
            reason: reason.to_string(),
        };
        if f > l {
            return Err(invalid("first variable after last"));
        }
        if l >= self.var_count() {
            return Err(invalid("variable out of range"));
        }

        let vars: BTreeSet<u32> = (f..=l).collect();
        let levels: Vec<u32> = vars.iter().map(|&v| self.var2level[v as usize]).collect();
        let (lo, hi) = (levels.iter().min(), levels.iter().max());
        if let (Some(&lo), Some(&hi)) = (lo, hi) {
            if (hi - lo) as usize + 1 != vars.len() {
                return Err(invalid("variables are not on contiguous levels"));
            }
        }
        for spec in &self.blocks {
            if spec.vars == vars {
                debug!("block [{}, {}] already declared", f, l);
                return Ok(());
            }
            let nested = spec.vars.is_subset(&vars) || vars.is_subset(&spec.vars);
            if !nested && !spec.vars.is_disjoint(&vars) {
                return Err(invalid("partially overlaps an existing block"));
            }
        }

        debug!("add_variable_block([{}, {}], fixed = {})", f, l, fixed);
        self.blocks.push(BlockSpec { vars, fixed });
        Ok(())
    }

    /// Declares every variable as its own unfixed block, allowing a free reordering.
    pub fn add_all_variables_as_block(&mut self) {
        for v in 0..self.var_count() {
            let vars = BTreeSet::from([v]);
            if !self.blocks.iter().any(|s| s.vars == vars) {
                self.blocks.push(BlockSpec { vars, fixed: false });
            }
        }
    }

    pub fn has_blocks(&self) -> bool {
        !self.blocks.is_empty()
    }

    pub fn clear_blocks(&mut self) {
        self.blocks.clear();
    }
}
