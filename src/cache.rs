//! Direct-mapped operation caches.
//!
//! Each cache is a fixed, prime-sized array of entries `(a, b, c) -> value`
//! where `a` and `b` are argument nodes and `c` discriminates the operation.
//! Every key maps to exactly one slot; a newer entry simply overwrites the
//! older one. A lookup only reports a hit when all three key fields match.
//!
//! Results refer to node indices, so the kernel clears all caches whenever
//! garbage collection or reordering may have invalidated them.

use crate::primes::prime_gte;
use crate::reference::Ref;
use crate::utils::{pairing3, slot};

#[derive(Debug, Clone)]
struct Entry<V> {
    /// First argument, [`Ref::INVALID`] marks an empty entry.
    a: Ref,
    b: Ref,
    c: u32,
    value: V,
}

impl<V: Default> Default for Entry<V> {
    fn default() -> Self {
        Self {
            a: Ref::INVALID,
            b: Ref::INVALID,
            c: 0,
            value: V::default(),
        }
    }
}

pub struct OpCache<V> {
    entries: Vec<Entry<V>>,
    hits: usize,
    misses: usize,
}

impl<V: Default + Clone> OpCache<V> {
    /// Creates a cache with at least `size` entries (rounded up to a prime).
    pub fn new(size: usize) -> Self {
        let size = prime_gte(size.max(3));
        Self {
            entries: vec![Entry::default(); size],
            hits: 0,
            misses: 0,
        }
    }

    /// Returns the number of slots in the cache.
    pub fn capacity(&self) -> usize {
        self.entries.len()
    }

    /// Returns the number of cache hits.
    pub fn hits(&self) -> usize {
        self.hits
    }

    /// Returns the number of cache misses.
    pub fn misses(&self) -> usize {
        self.misses
    }

    /// Invalidates every entry.
    pub fn clear(&mut self) {
        for entry in &mut self.entries {
            entry.a = Ref::INVALID;
        }
    }

    #[inline]
    fn index(&self, a: Ref, b: Ref, c: u32) -> usize {
        slot(pairing3(a.raw() as u64, b.raw() as u64, c as u64), self.entries.len())
    }

    /// Looks up the value stored for `(a, b, c)`.
    #[inline]
    pub fn get(&mut self, a: Ref, b: Ref, c: u32) -> Option<&V> {
        let idx = self.index(a, b, c);
        let entry = &self.entries[idx];
        if entry.a == a && entry.b == b && entry.c == c {
            self.hits += 1;
            Some(&self.entries[idx].value)
        } else {
            self.misses += 1;
            None
        }
    }

    /// Stores a value, overwriting whatever occupied the slot.
    #[inline]
    pub fn insert(&mut self, a: Ref, b: Ref, c: u32, value: V) {
        let idx = self.index(a, b, c);
        self.entries[idx] = Entry { a, b, c, value };
    }
}

#[cfg(test)]
mod tests {
    use num_bigint::BigUint;
    use test_log::test;

    use super::*;

    #[test]
    fn test_insert_get() {
        let mut cache = OpCache::<Ref>::new(16);
        assert_eq!(cache.capacity(), 17);

        cache.insert(Ref::new(2), Ref::new(3), 0, Ref::new(9));
        cache.insert(Ref::new(4), Ref::new(5), 1, Ref::new(11));

        assert_eq!(cache.get(Ref::new(2), Ref::new(3), 0), Some(&Ref::new(9)));
        assert_eq!(cache.get(Ref::new(4), Ref::new(5), 1), Some(&Ref::new(11)));
        assert_eq!(cache.get(Ref::new(2), Ref::new(3), 1), None);
        assert_eq!(cache.hits(), 2);
        assert_eq!(cache.misses(), 1);
    }

    #[test]
    fn test_clear() {
        let mut cache = OpCache::<Ref>::new(5);
        cache.insert(Ref::ZERO, Ref::ONE, 2, Ref::ONE);
        assert!(cache.get(Ref::ZERO, Ref::ONE, 2).is_some());
        cache.clear();
        assert!(cache.get(Ref::ZERO, Ref::ONE, 2).is_none());
    }

    #[test]
    fn test_collisions_overwrite() {
        let mut cache = OpCache::<Ref>::new(3);
        for i in 0..32 {
            cache.insert(Ref::new(i), Ref::ZERO, 0, Ref::new(i));
        }
        let found = (0..32)
            .filter(|&i| cache.get(Ref::new(i), Ref::ZERO, 0).is_some())
            .count();
        assert!(found <= 3);
    }

    #[test]
    fn test_big_values() {
        let mut cache = OpCache::<BigUint>::new(7);
        let big: BigUint = BigUint::from(1u32) << 200;
        cache.insert(Ref::new(5), Ref::INVALID, 3, big.clone());
        assert_eq!(cache.get(Ref::new(5), Ref::INVALID, 3), Some(&big));
    }
}
