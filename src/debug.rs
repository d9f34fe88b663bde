//! Debug utilities for inspecting the node table.
//!
//! [`check_invariants`] verifies the structural properties every operation
//! must preserve. It walks the whole table, so it is meant for tests.

use std::collections::HashSet;
use std::fmt::Write;

use crate::kernel::Kernel;
use crate::node::MAX_REF;
use crate::reference::Ref;
use crate::types::Var;

/// Detailed information about a single node.
#[derive(Debug, Clone)]
pub struct NodeInfo {
    pub node_ref: Ref,
    /// Variable at this node (None for terminals)
    pub variable: Option<Var>,
    pub level: u32,
    pub low: Ref,
    pub high: Ref,
    pub ref_count: u32,
}

impl std::fmt::Display for NodeInfo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.variable {
            None if self.node_ref.is_one() => write!(f, "ONE"),
            None => write!(f, "ZERO"),
            Some(var) => write!(
                f,
                "{}(var={}, level={}, low={}, high={}, refs={})",
                self.node_ref, var, self.level, self.low, self.high, self.ref_count
            ),
        }
    }
}

impl Kernel {
    pub fn node_info(&self, r: Ref) -> NodeInfo {
        NodeInfo {
            node_ref: r,
            variable: if r.is_constant() { None } else { Some(self.var_of(r)) },
            level: self.level(r),
            low: self.low(r),
            high: self.high(r),
            ref_count: self.table[r].ref_count,
        }
    }

    /// All nodes reachable from `root`, sorted by level.
    pub fn debug_tree(&self, root: Ref) -> Vec<NodeInfo> {
        let mut nodes = Vec::new();
        let mut visited = HashSet::new();
        let mut stack = vec![root];
        while let Some(r) = stack.pop() {
            if !visited.insert(r) {
                continue;
            }
            nodes.push(self.node_info(r));
            if !r.is_constant() {
                stack.push(self.low(r));
                stack.push(self.high(r));
            }
        }
        nodes.sort_by_key(|n| (n.level, n.node_ref));
        nodes
    }

    /// Compact multi-line rendering of the nodes reachable from `root`.
    pub fn debug_string(&self, root: Ref) -> String {
        let tree = self.debug_tree(root);
        let mut result = String::new();
        let _ = writeln!(result, "BDD {} (size={}):", root, tree.len());
        for node in &tree {
            let _ = writeln!(result, "  {}", node);
        }
        result
    }

    pub fn debug_ordering(&self) -> String {
        let order: Vec<String> = self
            .current_order()
            .iter()
            .enumerate()
            .map(|(level, var)| format!("{}@L{}", self.name_of(*var), level))
            .collect();
        format!("Ordering: [{}]", order.join(", "))
    }
}

/// Panics with a description of the first violated structural invariant.
///
/// Checked: constants, pinned literal nodes, reducedness, ordering,
/// uniqueness, free count, clear marks, and the level permutations.
pub fn check_invariants(kernel: &Kernel) {
    let table = &kernel.table;
    let n = kernel.var_count();

    for c in [Ref::ZERO, Ref::ONE] {
        assert_eq!(table.low(c), c, "constant {} has low {}", c, table.low(c));
        assert_eq!(table.high(c), c, "constant {} has high {}", c, table.high(c));
        assert_eq!(table.level(c), n, "constant {} is not at the terminal level", c);
        assert!(table[c].is_pinned(), "constant {} is not pinned", c);
    }

    for (level, &var) in kernel.level2var.iter().enumerate() {
        assert_eq!(kernel.var2level[var as usize] as usize, level, "level permutation is inconsistent");
    }

    let mut seen = HashSet::new();
    let mut literal_nodes = vec![0usize; n as usize];
    let mut live = 0;
    for r in table.live_nodes() {
        live += 1;
        let (level, low, high) = (table.level(r), table.low(r), table.high(r));
        assert!(!table[r].is_marked(), "node {} is still marked", r);
        assert!(level < n, "node {} has level {} out of range", r, level);
        assert_ne!(low, high, "node {} is not reduced", r);
        for child in [low, high] {
            assert!(!table[child].is_free(), "node {} points to the free slot {}", r, child);
            assert!(level < table.level(child), "node {} at level {} has child {} above it", r, level, child);
        }
        assert!(seen.insert((level, low, high)), "node {} is a duplicate", r);
        assert_eq!(table.find(level, low, high), Some(r), "node {} is not reachable through its chain", r);

        if low.is_constant() && high.is_constant() {
            assert_eq!(table[r].ref_count, MAX_REF, "literal node {} is not pinned", r);
            literal_nodes[level as usize] += 1;
        }
    }
    for (level, &count) in literal_nodes.iter().enumerate() {
        assert_eq!(count, 2, "level {} has {} literal nodes", level, count);
    }
    assert_eq!(live + 2, table.live_count(), "free count is inaccurate");
}
