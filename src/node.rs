use crate::reference::Ref;
use crate::utils::{pairing3, MyHash};

/// Reserved bit in the level word used by marking traversals.
pub const MARK: u32 = 1 << 21;
/// Mask extracting the level from the level word.
pub const LEVEL_MASK: u32 = MARK - 1;
/// Largest number of variables a kernel supports.
pub const MAX_VARS: u32 = LEVEL_MASK;
/// Saturation value of the reference counter; also used to pin nodes.
pub const MAX_REF: u32 = 0x3FF;

/// A node record of the kernel's node table.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct Node {
    pub ref_count: u32,
    /// Level in the current ordering, with [`MARK`] as a transient flag.
    level: u32,
    /// Low child, or [`Ref::INVALID`] when the slot is free.
    pub low: Ref,
    pub high: Ref,
    /// Collision chain link, or the free list link for free slots (0 ends both).
    pub next: u32,
}

impl Default for Node {
    fn default() -> Self {
        Self::FREE
    }
}

impl Node {
    pub const FREE: Self = Self {
        ref_count: 0,
        level: 0,
        low: Ref::INVALID,
        high: Ref::INVALID,
        next: 0,
    };

    pub fn new(level: u32, low: Ref, high: Ref) -> Self {
        Self {
            ref_count: 0,
            level,
            low,
            high,
            next: 0,
        }
    }

    #[inline]
    pub fn level(&self) -> u32 {
        self.level & LEVEL_MASK
    }

    #[inline]
    pub fn set_level(&mut self, level: u32) {
        self.level = (self.level & MARK) | level;
    }

    #[inline]
    pub fn is_marked(&self) -> bool {
        self.level & MARK != 0
    }

    #[inline]
    pub fn mark(&mut self) {
        self.level |= MARK;
    }

    #[inline]
    pub fn unmark(&mut self) {
        self.level &= LEVEL_MASK;
    }

    #[inline]
    pub fn is_free(&self) -> bool {
        self.low == Ref::INVALID
    }

    pub fn is_pinned(&self) -> bool {
        self.ref_count == MAX_REF
    }

    /// Increments the reference counter, saturating at [`MAX_REF`].
    pub fn inc_ref(&mut self) {
        if self.ref_count < MAX_REF {
            self.ref_count += 1;
        }
    }

    /// Decrements the reference counter unless it is saturated.
    pub fn dec_ref(&mut self) {
        if self.ref_count != MAX_REF && self.ref_count > 0 {
            self.ref_count -= 1;
        }
    }
}

impl MyHash for Node {
    fn hash(&self) -> u64 {
        pairing3(self.level() as u64, self.low.raw() as u64, self.high.raw() as u64)
    }
}
