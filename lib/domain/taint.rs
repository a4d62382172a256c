//! The taint lattice.
//!
//! Taint marks the influence of externally-controlled input on a cell. The
//! lattice is `Untainted < Mask(m) < Tainted`, where `Mask` tracks taint per
//! bit and `Tainted` taints every bit regardless of width.

use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
pub enum Taint {
    Untainted,
    Mask(u64),
    Tainted,
}

impl Taint {
    /// Build a per-bit taint from a mask, normalizing the empty mask.
    pub fn from_mask(mask: u64) -> Taint {
        if mask == 0 {
            Taint::Untainted
        } else {
            Taint::Mask(mask)
        }
    }

    /// Join this taint with another.
    pub fn join(self, other: Taint) -> Taint {
        match (self, other) {
            (Taint::Tainted, _) | (_, Taint::Tainted) => Taint::Tainted,
            (Taint::Untainted, t) | (t, Taint::Untainted) => t,
            (Taint::Mask(lhs), Taint::Mask(rhs)) => Taint::from_mask(lhs | rhs),
        }
    }

    /// The greatest lower bound of this taint and another.
    pub fn glb(self, other: Taint) -> Taint {
        match (self, other) {
            (Taint::Untainted, _) | (_, Taint::Untainted) => Taint::Untainted,
            (Taint::Tainted, t) | (t, Taint::Tainted) => t,
            (Taint::Mask(lhs), Taint::Mask(rhs)) => Taint::from_mask(lhs & rhs),
        }
    }

    /// True if this taint is included in the other.
    pub fn is_subset(self, other: Taint) -> bool {
        match (self, other) {
            (Taint::Untainted, _) | (_, Taint::Tainted) => true,
            (Taint::Mask(lhs), Taint::Mask(rhs)) => lhs & !rhs == 0,
            _ => false,
        }
    }

    /// True if any bit is tainted.
    pub fn is_tainted(self) -> bool {
        !matches!(self, Taint::Untainted)
    }

    /// The taint of the bit-field `[lo..hi]`.
    pub fn extract(self, lo: usize, hi: usize) -> Taint {
        match self {
            Taint::Untainted => Taint::Untainted,
            Taint::Tainted => Taint::Tainted,
            Taint::Mask(mask) => {
                let width = hi - lo + 1;
                let field = if width >= 64 {
                    mask >> lo
                } else {
                    (mask >> lo) & ((1 << width) - 1)
                };
                Taint::from_mask(field)
            }
        }
    }
}

impl fmt::Display for Taint {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            Taint::Untainted => write!(f, "0x0"),
            Taint::Mask(mask) => write!(f, "0x{:x}", mask),
            Taint::Tainted => write!(f, "ALL"),
        }
    }
}
