use std::fmt::{Display, Formatter};

/// A compact index of a node in the kernel's node table.
///
/// Index 0 is the constant `false` and index 1 the constant `true`.
/// Indices stay valid until the node is reclaimed by garbage collection.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
#[repr(transparent)]
pub struct Ref(u32);

impl Ref {
    /// The constant `false`.
    pub const ZERO: Self = Self(0);
    /// The constant `true`.
    pub const ONE: Self = Self(1);
    /// Sentinel for free table slots and empty cache entries.
    pub const INVALID: Self = Self(u32::MAX);

    pub const fn new(index: u32) -> Self {
        Self(index)
    }

    /// Returns the terminal for the given truth value.
    pub const fn constant(value: bool) -> Self {
        if value {
            Self::ONE
        } else {
            Self::ZERO
        }
    }

    /// Return the index of the reference.
    #[inline]
    pub const fn index(self) -> usize {
        self.0 as usize
    }

    /// Return the internal representation of the reference.
    #[inline]
    pub const fn raw(self) -> u32 {
        self.0
    }

    #[inline]
    pub const fn is_zero(self) -> bool {
        self.0 == 0
    }

    #[inline]
    pub const fn is_one(self) -> bool {
        self.0 == 1
    }

    #[inline]
    pub const fn is_constant(self) -> bool {
        self.0 < 2
    }

    pub const fn is_valid(self) -> bool {
        self.0 != u32::MAX
    }
}

impl Default for Ref {
    fn default() -> Self {
        Self::INVALID
    }
}

impl Display for Ref {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match *self {
            Ref::ZERO => write!(f, "@0"),
            Ref::ONE => write!(f, "@1"),
            Ref::INVALID => write!(f, "@?"),
            Ref(i) => write!(f, "@{}", i),
        }
    }
}

#[cfg(test)]
mod tests {
    use test_log::test;

    use super::*;

    #[test]
    fn test_constants() {
        assert!(Ref::ZERO.is_zero());
        assert!(Ref::ONE.is_one());
        assert!(Ref::ZERO.is_constant());
        assert!(Ref::ONE.is_constant());
        assert!(!Ref::new(2).is_constant());
        assert_eq!(Ref::constant(true), Ref::ONE);
        assert_eq!(Ref::constant(false), Ref::ZERO);
    }

    #[test]
    fn test_invalid() {
        assert!(!Ref::INVALID.is_valid());
        assert!(Ref::new(7).is_valid());
        assert_eq!(Ref::default(), Ref::INVALID);
    }

    #[test]
    fn test_display() {
        assert_eq!(Ref::new(42).to_string(), "@42");
        assert_eq!(Ref::INVALID.to_string(), "@?");
    }
}
