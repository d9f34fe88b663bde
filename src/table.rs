//! The node table: a dense array of node records with an embedded hash index.
//!
//! Slots `0` and `1` hold the constants. Every other slot is either a live
//! node linked into exactly one collision chain, or a free slot linked into
//! the free list. Both lists reuse the `next` field of the record and end at
//! index `0`, which is never part of either list.
//!
//! ```text
//! buckets[h] ──> n1 ──next──> n7 ──next──> 0
//! free_pos   ──> n3 ──next──> n4 ──next──> 0
//! ```

use std::ops::{Index, IndexMut};

use log::trace;

use crate::node::{Node, MAX_REF};
use crate::reference::Ref;
use crate::utils::{slot, MyHash};

pub struct NodeTable {
    nodes: Vec<Node>,
    buckets: Vec<u32>,
    /// Head of the free list (0 when the table is full).
    free_pos: u32,
    free_count: usize,
}

impl NodeTable {
    /// Creates a table with `capacity` slots whose constants sit at `terminal_level`.
    pub fn new(capacity: usize, terminal_level: u32) -> Self {
        assert!(capacity >= 2, "Node table needs room for both constants");
        assert!(capacity < u32::MAX as usize, "Node table capacity {} is too large", capacity);

        let mut nodes = vec![Node::FREE; capacity];
        for (i, node) in nodes.iter_mut().enumerate().take(2) {
            let c = Ref::new(i as u32);
            *node = Node::new(terminal_level, c, c);
            node.ref_count = MAX_REF;
        }

        let mut table = Self {
            nodes,
            buckets: vec![0; capacity],
            free_pos: 0,
            free_count: 0,
        };
        for i in (2..capacity).rev() {
            table.push_free(i as u32);
        }
        table
    }

    /// Number of slots (including the constants).
    pub fn capacity(&self) -> usize {
        self.nodes.len()
    }

    /// Number of free slots.
    pub fn free_count(&self) -> usize {
        self.free_count
    }

    /// Number of occupied slots (including the constants).
    pub fn live_count(&self) -> usize {
        self.capacity() - self.free_count
    }

    pub fn is_full(&self) -> bool {
        self.free_pos == 0
    }

    #[inline]
    pub fn level(&self, r: Ref) -> u32 {
        self.nodes[r.index()].level()
    }

    #[inline]
    pub fn low(&self, r: Ref) -> Ref {
        self.nodes[r.index()].low
    }

    #[inline]
    pub fn high(&self, r: Ref) -> Ref {
        self.nodes[r.index()].high
    }

    /// Iterates over the indices of all live internal nodes.
    pub fn live_nodes(&self) -> impl Iterator<Item = Ref> + '_ {
        (2..self.nodes.len())
            .filter(|&i| !self.nodes[i].is_free())
            .map(|i| Ref::new(i as u32))
    }

    fn bucket_of(&self, level: u32, low: Ref, high: Ref) -> usize {
        slot(Node::new(level, low, high).hash(), self.buckets.len())
    }

    /// Looks up the node with the given fields.
    pub fn find(&self, level: u32, low: Ref, high: Ref) -> Option<Ref> {
        let mut i = self.buckets[self.bucket_of(level, low, high)];
        while i != 0 {
            let node = &self.nodes[i as usize];
            if node.level() == level && node.low == low && node.high == high {
                return Some(Ref::new(i));
            }
            i = node.next;
        }
        None
    }

    /// Takes a slot from the free list, fills it and links it into its chain.
    ///
    /// Returns `None` when the free list is empty.
    pub fn alloc(&mut self, level: u32, low: Ref, high: Ref) -> Option<Ref> {
        if self.free_pos == 0 {
            return None;
        }
        let i = self.free_pos;
        self.free_pos = self.nodes[i as usize].next;
        self.free_count -= 1;
        self.nodes[i as usize] = Node::new(level, low, high);
        let r = Ref::new(i);
        self.link(r);
        Some(r)
    }

    /// Prepends a live node to the chain selected by its current fields.
    pub fn link(&mut self, r: Ref) {
        let node = self.nodes[r.index()];
        let b = self.bucket_of(node.level(), node.low, node.high);
        self.nodes[r.index()].next = self.buckets[b];
        self.buckets[b] = r.raw();
    }

    /// Removes a live node from its chain. Must be called before its fields change.
    pub fn unlink(&mut self, r: Ref) {
        let node = self.nodes[r.index()];
        let b = self.bucket_of(node.level(), node.low, node.high);
        let mut i = self.buckets[b];
        if i == r.raw() {
            self.buckets[b] = node.next;
        } else {
            while i != 0 {
                let next = self.nodes[i as usize].next;
                if next == r.raw() {
                    self.nodes[i as usize].next = node.next;
                    break;
                }
                i = next;
            }
            assert_ne!(i, 0, "Node {} is not linked into the node table", r);
        }
        self.nodes[r.index()].next = 0;
    }

    fn push_free(&mut self, i: u32) {
        self.nodes[i as usize] = Node::FREE;
        self.nodes[i as usize].next = self.free_pos;
        self.free_pos = i;
        self.free_count += 1;
    }

    /// Returns an unlinked node to the free list.
    pub fn release(&mut self, r: Ref) {
        assert!(!r.is_constant(), "Constants cannot be released");
        self.push_free(r.raw());
    }

    /// Sweep phase of garbage collection.
    ///
    /// Clears the collision chains, relinks every marked node (clearing its
    /// mark) and rebuilds the free list from everything else. Returns the
    /// number of slots that were reclaimed.
    pub fn sweep(&mut self) -> usize {
        let before = self.free_count;
        self.buckets.fill(0);
        self.free_pos = 0;
        self.free_count = 0;

        for i in (2..self.nodes.len()).rev() {
            let node = &mut self.nodes[i];
            if node.is_marked() && !node.is_free() {
                node.unmark();
                self.link(Ref::new(i as u32));
            } else {
                self.push_free(i as u32);
            }
        }

        self.free_count.saturating_sub(before)
    }

    /// Grows the table to `new_capacity` slots, keeping every index stable.
    pub fn grow(&mut self, new_capacity: usize) {
        let old_capacity = self.capacity();
        assert!(new_capacity > old_capacity, "Node table can only grow");
        trace!("Growing node table {} -> {}", old_capacity, new_capacity);

        self.nodes.resize(new_capacity, Node::FREE);
        self.buckets = vec![0; new_capacity];
        for i in (old_capacity..new_capacity).rev() {
            self.push_free(i as u32);
        }
        self.rehash();
    }

    /// Rebuilds every collision chain from the node fields.
    pub fn rehash(&mut self) {
        self.buckets.fill(0);
        for i in 2..self.nodes.len() {
            if !self.nodes[i].is_free() {
                self.link(Ref::new(i as u32));
            }
        }
    }
}

impl Index<Ref> for NodeTable {
    type Output = Node;

    fn index(&self, r: Ref) -> &Self::Output {
        &self.nodes[r.index()]
    }
}

impl IndexMut<Ref> for NodeTable {
    fn index_mut(&mut self, r: Ref) -> &mut Self::Output {
        &mut self.nodes[r.index()]
    }
}

#[cfg(test)]
mod tests {
    use test_log::test;

    use super::*;

    #[test]
    fn test_constants() {
        let table = NodeTable::new(11, 3);
        assert_eq!(table.level(Ref::ZERO), 3);
        assert_eq!(table.low(Ref::ZERO), Ref::ZERO);
        assert_eq!(table.high(Ref::ONE), Ref::ONE);
        assert!(table[Ref::ONE].is_pinned());
        assert_eq!(table.free_count(), 9);
        assert_eq!(table.live_count(), 2);
    }

    #[test]
    fn test_alloc_and_find() {
        let mut table = NodeTable::new(7, 2);
        let a = table.alloc(1, Ref::ZERO, Ref::ONE).unwrap();
        let b = table.alloc(0, Ref::ONE, a).unwrap();
        assert_eq!(table.find(1, Ref::ZERO, Ref::ONE), Some(a));
        assert_eq!(table.find(0, Ref::ONE, a), Some(b));
        assert_eq!(table.find(0, a, Ref::ONE), None);
        assert_eq!(table.free_count(), 3);
    }

    #[test]
    fn test_alloc_too_much() {
        let mut table = NodeTable::new(4, 5);
        assert!(table.alloc(0, Ref::ZERO, Ref::ONE).is_some());
        assert!(table.alloc(1, Ref::ZERO, Ref::ONE).is_some());
        assert!(table.is_full());
        assert!(table.alloc(2, Ref::ZERO, Ref::ONE).is_none());
    }

    #[test]
    fn test_unlink_and_release() {
        let mut table = NodeTable::new(5, 3);
        let a = table.alloc(0, Ref::ZERO, Ref::ONE).unwrap();
        let b = table.alloc(1, Ref::ZERO, Ref::ONE).unwrap();
        table.unlink(a);
        table.release(a);
        assert_eq!(table.find(0, Ref::ZERO, Ref::ONE), None);
        assert_eq!(table.find(1, Ref::ZERO, Ref::ONE), Some(b));
        assert!(table[a].is_free());
        assert_eq!(table.free_count(), 2);
    }

    #[test]
    fn test_sweep_keeps_marked() {
        let mut table = NodeTable::new(7, 3);
        let a = table.alloc(0, Ref::ZERO, Ref::ONE).unwrap();
        let b = table.alloc(1, Ref::ZERO, Ref::ONE).unwrap();
        table[b].mark();
        let reclaimed = table.sweep();
        assert_eq!(reclaimed, 1);
        assert!(table[a].is_free());
        assert!(!table[b].is_marked());
        assert_eq!(table.find(1, Ref::ZERO, Ref::ONE), Some(b));
    }

    #[test]
    fn test_grow_keeps_indices() {
        let mut table = NodeTable::new(3, 3);
        let a = table.alloc(2, Ref::ZERO, Ref::ONE).unwrap();
        assert!(table.is_full());
        table.grow(7);
        assert_eq!(table.capacity(), 7);
        assert_eq!(table.find(2, Ref::ZERO, Ref::ONE), Some(a));
        assert_eq!(table.free_count(), 4);
        let live: Vec<Ref> = table.live_nodes().collect();
        assert_eq!(live, vec![a]);
    }
}
