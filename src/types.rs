//! Type-safe wrapper for kernel variables.
//!
//! A kernel keeps two distinct integer spaces: variable indices, which are
//! assigned once and never change, and levels (plain `u32`), which are
//! positions in the current ordering and change whenever the kernel reorders.
use std::fmt;

/// A kernel variable index (0-indexed).
///
/// Indices are handed out in the order variables are first seen by a kernel.
/// Unlike levels, a variable index is stable across reordering.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct Var(u32);

impl Var {
    /// Creates a variable with the given kernel index.
    pub fn new(index: u32) -> Self {
        Var(index)
    }

    /// Returns the raw kernel index.
    pub fn index(self) -> u32 {
        self.0
    }
}

impl fmt::Display for Var {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "v{}", self.0)
    }
}

impl From<Var> for u32 {
    fn from(var: Var) -> Self {
        var.0
    }
}

impl From<u32> for Var {
    fn from(index: u32) -> Self {
        Var(index)
    }
}
