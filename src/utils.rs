/// [Szudzik pairing function][szudzik-pairing].
///
/// ```text
/// (a, b) -> if (a<b) then (b^2 + a) else (a^2 + a + b)
/// ```
///
/// Injective on the node index range, so distinct triples only collide after
/// the reduction modulo the table size. Wrapping keeps the function total for
/// operands beyond 32 bits.
///
/// [szudzik-pairing]: http://szudzik.com/ElegantPairing.pdf
pub fn pairing2(a: u64, b: u64) -> u64 {
    if a < b {
        b.wrapping_mul(b).wrapping_add(a)
    } else {
        a.wrapping_mul(a).wrapping_add(a).wrapping_add(b)
    }
}

/// Pairing function for three `u64` values.
pub fn pairing3(a: u64, b: u64, c: u64) -> u64 {
    pairing2(pairing2(a, b), c)
}

/// Hash of a unique-table key, reduced to a slot with [`slot`].
pub trait MyHash {
    fn hash(&self) -> u64;
}

/// Reduces a hash to a slot of a table with `size` entries.
#[inline]
pub fn slot(hash: u64, size: usize) -> usize {
    (hash % size as u64) as usize
}

#[cfg(test)]
mod tests {
    use test_log::test;

    use super::*;

    #[test]
    fn test_szudzik() {
        // a\b  0  1  2  3  4
        // ------------------
        // 0    0  1  4  9 16
        // 1    2  3  5 10 17
        // 2    6  7  8 11 18
        // 3   12 13 14 15 19
        // 4   20 21 22 23 24
        assert_eq!(pairing2(0, 0), 0);
        assert_eq!(pairing2(0, 1), 1);
        assert_eq!(pairing2(1, 0), 2);
        assert_eq!(pairing2(1, 1), 3);
        assert_eq!(pairing2(0, 2), 4);
        assert_eq!(pairing2(1, 2), 5);
        assert_eq!(pairing2(2, 0), 6);
        assert_eq!(pairing2(4, 4), 24);
    }

    #[test]
    fn test_triples_distinct() {
        let mut seen = std::collections::HashSet::new();
        for a in 0..8 {
            for b in 0..8 {
                for c in 0..8 {
                    assert!(seen.insert(pairing3(a, b, c)));
                }
            }
        }
    }

    #[test]
    fn test_slot_in_range() {
        for h in [0, 1, 96, 97, u64::MAX] {
            assert!(slot(h, 97) < 97);
        }
    }
}
