//! Prime sizing for the node table and operation caches.
//!
//! Table sizes are kept prime so that `hash mod size` spreads the pairing
//! values evenly. Primality is tested by trial division with small primes
//! followed by a deterministic Miller-Rabin round set for 64-bit inputs.

const SMALL_PRIMES: [u64; 12] = [2, 3, 5, 7, 11, 13, 17, 19, 23, 29, 31, 37];

fn mul_mod(a: u64, b: u64, m: u64) -> u64 {
    ((a as u128 * b as u128) % m as u128) as u64
}

fn pow_mod(mut base: u64, mut exp: u64, m: u64) -> u64 {
    let mut result = 1 % m;
    base %= m;
    while exp > 0 {
        if exp & 1 == 1 {
            result = mul_mod(result, base, m);
        }
        base = mul_mod(base, base, m);
        exp >>= 1;
    }
    result
}

fn witness(a: u64, n: u64, d: u64, s: u32) -> bool {
    let mut x = pow_mod(a, d, n);
    if x == 1 || x == n - 1 {
        return false;
    }
    for _ in 1..s {
        x = mul_mod(x, x, n);
        if x == n - 1 {
            return false;
        }
    }
    true
}

pub fn is_prime(n: u64) -> bool {
    if n < 2 {
        return false;
    }
    for &p in &SMALL_PRIMES {
        if n == p {
            return true;
        }
        if n % p == 0 {
            return false;
        }
    }

    let mut d = n - 1;
    let mut s = 0;
    while d % 2 == 0 {
        d /= 2;
        s += 1;
    }

    // These bases are sufficient for every 64-bit n.
    !SMALL_PRIMES.iter().any(|&a| witness(a, n, d, s))
}

/// Smallest prime `>= n`.
pub fn prime_gte(n: usize) -> usize {
    let mut candidate = n.max(2);
    while !is_prime(candidate as u64) {
        candidate += 1;
    }
    candidate
}

/// Largest prime `<= n`, or 2 when there is none.
pub fn prime_lte(n: usize) -> usize {
    let mut candidate = n;
    while candidate > 2 && !is_prime(candidate as u64) {
        candidate -= 1;
    }
    candidate.max(2)
}

#[cfg(test)]
mod tests {
    use test_log::test;

    use super::*;

    #[test]
    fn test_small_numbers() {
        let primes: Vec<u64> = (0..50).filter(|&n| is_prime(n)).collect();
        assert_eq!(primes, vec![2, 3, 5, 7, 11, 13, 17, 19, 23, 29, 31, 37, 41, 43, 47]);
    }

    #[test]
    fn test_large_numbers() {
        assert!(is_prime(1_000_000_007));
        assert!(!is_prime(1_000_000_007 * 3));
        // Carmichael number.
        assert!(!is_prime(561));
        assert!(is_prime(18_446_744_073_709_551_557));
    }

    #[test]
    fn test_prime_gte() {
        assert_eq!(prime_gte(0), 2);
        assert_eq!(prime_gte(3), 3);
        assert_eq!(prime_gte(20_000), 20_011);
        assert_eq!(prime_gte(90), 97);
    }

    #[test]
    fn test_prime_lte() {
        assert_eq!(prime_lte(100), 97);
        assert_eq!(prime_lte(97), 97);
        assert_eq!(prime_lte(1), 2);
    }
}
