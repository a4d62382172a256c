//! Initial register and memory contents supplied by an external
//! configuration.
//!
//! The analyzer's configuration file names registers and memory ranges
//! together with their initial value and an optional taint pattern; the
//! parser hands them to the domain in this representation. Contents are big
//! integers so that values wider than a machine word (long byte strings) can
//! be described.

use num_bigint::BigUint;
use num_traits::ToPrimitive;
use serde::{Deserialize, Serialize};

/// An initial cell content.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub enum Content {
    /// A fully-known concrete value.
    Concrete(BigUint),
    /// A concrete value of which only the bits outside the mask are known.
    ConcreteMask(BigUint, BigUint),
    /// A string of hexadecimal digits, written to memory big-endian.
    Bytes(String),
    /// Hexadecimal digits of which only the digits outside the mask are
    /// known.
    BytesMask(String, BigUint),
}

impl Content {
    /// A fully-known concrete content from a machine word.
    pub fn concrete(value: u64) -> Content {
        Content::Concrete(BigUint::from(value))
    }

    /// The bit width this content occupies, rounded to the operand size.
    ///
    /// Hexadecimal byte strings occupy four bits per digit.
    pub fn size(&self, operand_sz: usize) -> usize {
        match *self {
            Content::Concrete(ref value) | Content::ConcreteMask(ref value, _) => {
                let bits = value.bits() as usize;
                if bits <= operand_sz {
                    operand_sz
                } else {
                    (bits + operand_sz - 1) / operand_sz * operand_sz
                }
            }
            Content::Bytes(ref digits) | Content::BytesMask(ref digits, _) => 4 * digits.len(),
        }
    }

    /// True if this content fits a single memory byte.
    pub fn is_byte(&self) -> bool {
        match *self {
            Content::Concrete(ref value) | Content::ConcreteMask(ref value, _) => value.bits() <= 8,
            Content::Bytes(ref digits) | Content::BytesMask(ref digits, _) => digits.len() <= 2,
        }
    }

    /// True if this content is written to memory big-endian.
    pub fn is_big_endian(&self) -> bool {
        matches!(*self, Content::Bytes(_) | Content::BytesMask(_, _))
    }
}

/// A taint pattern attached to an initial content.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub enum TaintSpec {
    /// Every bit is tainted.
    Tainted,
    /// The bits set in the mask are tainted.
    Mask(BigUint),
}

impl TaintSpec {
    /// The taint mask truncated to a machine word, when one is needed.
    pub fn mask_u64(&self) -> Option<u64> {
        match *self {
            TaintSpec::Tainted => None,
            TaintSpec::Mask(ref mask) => Some(mask.to_u64().unwrap_or(u64::MAX)),
        }
    }
}
