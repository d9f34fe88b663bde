//! Binary operators, negation and if-then-else.

use std::fmt::{Display, Formatter};

use log::debug;

use crate::kernel::{Kernel, OpResult};
use crate::reference::Ref;

/// Binary Boolean operators understood by [`Kernel::apply`].
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum BinaryOp {
    And,
    Xor,
    Or,
    Nand,
    Nor,
    /// `l ⇒ r`
    Imp,
    /// `l ⇔ r`
    Biimp,
    /// `l ∧ ¬r`
    Diff,
    /// `¬l ∧ r`
    Less,
    /// `l ⇐ r`
    InvImp,
}

/// Cache tag of negation in the apply cache (distinct from every [`BinaryOp`] tag).
const NOT_TAG: u32 = 16;

impl BinaryOp {
    pub const ALL: [BinaryOp; 10] = [
        BinaryOp::And,
        BinaryOp::Xor,
        BinaryOp::Or,
        BinaryOp::Nand,
        BinaryOp::Nor,
        BinaryOp::Imp,
        BinaryOp::Biimp,
        BinaryOp::Diff,
        BinaryOp::Less,
        BinaryOp::InvImp,
    ];

    /// Result on constant operands, indexed by `2·l + r`.
    fn truth_table(self) -> [bool; 4] {
        match self {
            BinaryOp::And => [false, false, false, true],
            BinaryOp::Xor => [false, true, true, false],
            BinaryOp::Or => [false, true, true, true],
            BinaryOp::Nand => [true, true, true, false],
            BinaryOp::Nor => [true, false, false, false],
            BinaryOp::Imp => [true, true, false, true],
            BinaryOp::Biimp => [true, false, false, true],
            BinaryOp::Diff => [false, false, true, false],
            BinaryOp::Less => [false, true, false, false],
            BinaryOp::InvImp => [true, false, true, true],
        }
    }

    pub fn evaluate(self, l: bool, r: bool) -> bool {
        self.truth_table()[2 * l as usize + r as usize]
    }

    fn tag(self) -> u32 {
        self as u32
    }
}

impl Display for BinaryOp {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            BinaryOp::And => "and",
            BinaryOp::Xor => "xor",
            BinaryOp::Or => "or",
            BinaryOp::Nand => "nand",
            BinaryOp::Nor => "nor",
            BinaryOp::Imp => "imp",
            BinaryOp::Biimp => "biimp",
            BinaryOp::Diff => "diff",
            BinaryOp::Less => "less",
            BinaryOp::InvImp => "invimp",
        };
        write!(f, "{}", s)
    }
}

impl Kernel {
    pub fn apply(&mut self, l: Ref, r: Ref, op: BinaryOp) -> Ref {
        debug!("apply(l = {}, r = {}, op = {})", l, r, op);
        self.run(|k| k.apply_rec(l, r, op))
    }

    pub fn and(&mut self, l: Ref, r: Ref) -> Ref {
        self.apply(l, r, BinaryOp::And)
    }

    pub fn or(&mut self, l: Ref, r: Ref) -> Ref {
        self.apply(l, r, BinaryOp::Or)
    }

    pub fn xor(&mut self, l: Ref, r: Ref) -> Ref {
        self.apply(l, r, BinaryOp::Xor)
    }

    pub fn implication(&mut self, l: Ref, r: Ref) -> Ref {
        self.apply(l, r, BinaryOp::Imp)
    }

    pub fn equivalence(&mut self, l: Ref, r: Ref) -> Ref {
        self.apply(l, r, BinaryOp::Biimp)
    }

    pub fn not(&mut self, r: Ref) -> Ref {
        debug!("not(r = {})", r);
        self.run(|k| k.not_rec(r))
    }

    pub fn ite(&mut self, f: Ref, g: Ref, h: Ref) -> Ref {
        debug!("ite(f = {}, g = {}, h = {})", f, g, h);
        self.run(|k| k.ite_rec(f, g, h))
    }

    /// Terminal rules of `apply`.
    fn apply_terminal(l: Ref, r: Ref, op: BinaryOp) -> Option<Ref> {
        match op {
            BinaryOp::And => {
                if l == r || r.is_one() {
                    return Some(l);
                }
                if l.is_zero() || r.is_zero() {
                    return Some(Ref::ZERO);
                }
                if l.is_one() {
                    return Some(r);
                }
            }
            BinaryOp::Or => {
                if l == r || r.is_zero() {
                    return Some(l);
                }
                if l.is_one() || r.is_one() {
                    return Some(Ref::ONE);
                }
                if l.is_zero() {
                    return Some(r);
                }
            }
            BinaryOp::Xor => {
                if l == r {
                    return Some(Ref::ZERO);
                }
                if l.is_zero() {
                    return Some(r);
                }
                if r.is_zero() {
                    return Some(l);
                }
            }
            BinaryOp::Nand => {
                if l.is_zero() || r.is_zero() {
                    return Some(Ref::ONE);
                }
            }
            BinaryOp::Nor => {
                if l.is_one() || r.is_one() {
                    return Some(Ref::ZERO);
                }
            }
            BinaryOp::Imp => {
                if l.is_zero() || r.is_one() || l == r {
                    return Some(Ref::ONE);
                }
                if l.is_one() {
                    return Some(r);
                }
            }
            BinaryOp::Biimp => {
                if l == r {
                    return Some(Ref::ONE);
                }
                if l.is_one() {
                    return Some(r);
                }
                if r.is_one() {
                    return Some(l);
                }
            }
            BinaryOp::Diff | BinaryOp::Less | BinaryOp::InvImp => {}
        }
        if l.is_constant() && r.is_constant() {
            return Some(Ref::constant(op.evaluate(l.is_one(), r.is_one())));
        }
        None
    }

    pub(crate) fn apply_rec(&mut self, l: Ref, r: Ref, op: BinaryOp) -> OpResult {
        if let Some(res) = Self::apply_terminal(l, r, op) {
            return Ok(res);
        }
        if let Some(&res) = self.apply_cache.get(l, r, op.tag()) {
            return Ok(res);
        }

        let (level_l, level_r) = (self.level(l), self.level(r));
        let level = level_l.min(level_r);
        let (l0, l1) = if level_l == level { (self.low(l), self.high(l)) } else { (l, l) };
        let (r0, r1) = if level_r == level { (self.low(r), self.high(r)) } else { (r, r) };

        let low = self.apply_rec(l0, r0, op)?;
        self.push_ref(low);
        let high = self.apply_rec(l1, r1, op)?;
        self.push_ref(high);
        let res = self.make_node(level, low, high)?;
        self.pop_refs(2);

        self.apply_cache.insert(l, r, op.tag(), res);
        Ok(res)
    }

    pub(crate) fn not_rec(&mut self, r: Ref) -> OpResult {
        if r.is_constant() {
            return Ok(Ref::constant(r.is_zero()));
        }
        if let Some(&res) = self.apply_cache.get(r, Ref::INVALID, NOT_TAG) {
            return Ok(res);
        }

        let low = self.not_rec(self.low(r))?;
        self.push_ref(low);
        let high = self.not_rec(self.high(r))?;
        self.push_ref(high);
        let res = self.make_node(self.level(r), low, high)?;
        self.pop_refs(2);

        self.apply_cache.insert(r, Ref::INVALID, NOT_TAG, res);
        Ok(res)
    }

    pub(crate) fn ite_rec(&mut self, f: Ref, g: Ref, h: Ref) -> OpResult {
        // ite(1,G,H) => G
        // ite(0,G,H) => H
        // ite(F,G,G) => G
        // ite(F,1,0) => F
        // ite(F,0,1) => ~F
        if f.is_one() {
            return Ok(g);
        }
        if f.is_zero() {
            return Ok(h);
        }
        if g == h {
            return Ok(g);
        }
        if g.is_one() && h.is_zero() {
            return Ok(f);
        }
        if g.is_zero() && h.is_one() {
            return self.not_rec(f);
        }
        if let Some(&res) = self.ite_cache.get(f, g, h.raw()) {
            return Ok(res);
        }

        let (i, j, k) = (self.level(f), self.level(g), self.level(h));
        let level = i.min(j).min(k);
        let cofactors = |kernel: &Self, x: Ref, lx: u32| {
            if lx == level {
                (kernel.low(x), kernel.high(x))
            } else {
                (x, x)
            }
        };
        let (f0, f1) = cofactors(self, f, i);
        let (g0, g1) = cofactors(self, g, j);
        let (h0, h1) = cofactors(self, h, k);

        let low = self.ite_rec(f0, g0, h0)?;
        self.push_ref(low);
        let high = self.ite_rec(f1, g1, h1)?;
        self.push_ref(high);
        let res = self.make_node(level, low, high)?;
        self.pop_refs(2);

        self.ite_cache.insert(f, g, h.raw(), res);
        Ok(res)
    }
}
