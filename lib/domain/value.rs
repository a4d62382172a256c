//! Abstractions/traits for the domain's cell values.

use crate::domain::{Content, Taint, TaintSpec};
use crate::error::*;
use crate::il;
use serde::{Deserialize, Serialize};
use std::fmt::Debug;

/// The memory region a value belongs to.
///
/// Regions separate pointers into the binary's global space from stack and
/// heap pointers, so that common idioms (zeroing the stack pointer register
/// against itself) keep their region information.
#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
pub enum Region {
    Global,
    Stack,
    Heap,
}

impl Region {
    /// Join two regions; unequal regions lose their identity.
    pub fn join(self, other: Region) -> Region {
        if self == other {
            self
        } else {
            Region::Global
        }
    }
}

/// A cell value: one element of the abstraction the domain maps registers
/// and memory bytes to.
///
/// The domain is a functor over this trait. An implementation carries both a
/// value component (intervals, constants, bit masks...) and a taint
/// component, and provides the lattice discipline the enclosing fixpoint
/// engine relies on: `bot` is absorbing, `join`/`meet` are sound, and
/// `widen` stabilises any ascending chain.
pub trait Value: Clone + Debug + Eq + PartialEq + Sized {
    /// The empty concretization of the given width.
    fn bot(bits: usize) -> Self;

    /// The unconstrained value of the given width.
    fn top(bits: usize) -> Self;

    /// The width of this value in bits.
    fn bits(&self) -> usize;

    /// True if this value concretizes to nothing.
    fn is_bot(&self) -> bool;

    /// True if every concretization of this value is one of `other`.
    fn is_subset(&self, other: &Self) -> bool;

    /// Join this value with another.
    fn join(&self, other: &Self) -> Self;

    /// Meet this value with another.
    fn meet(&self, other: &Self) -> Self;

    /// Widen this value against the next iterate.
    fn widen(&self, other: &Self) -> Self;

    /// Lift a concrete word of known width.
    fn of_word(word: &il::Word) -> Self;

    /// Lift an externally-configured content of the given width, tagged with
    /// the region it lives in.
    fn of_config(region: Region, content: &Content, bits: usize) -> Result<Self>;

    /// Attach a configured taint pattern to a value.
    fn taint_of_config(taint: Option<&TaintSpec>, bits: usize, value: Self) -> Result<Self>;

    /// Materialise this value as a concrete word.
    fn to_word(&self) -> Result<il::Word>;

    /// Materialise this value as a byte.
    fn to_char(&self) -> Result<u8>;

    /// The printable form of the value component.
    fn value_string(&self) -> String;

    /// The printable form of the taint component.
    fn taint_string(&self) -> String;

    /// The finite set of concrete addresses in this value's concretization.
    fn to_addresses(&self) -> Result<Vec<u64>>;

    /// Apply a binary operator.
    fn binary(op: il::BinOp, lhs: &Self, rhs: &Self) -> Result<Self>;

    /// Apply a unary operator.
    fn unary(op: il::UnOp, value: &Self) -> Result<Self>;

    /// True if the comparison may hold between the two values.
    fn compare(lhs: &Self, op: il::CmpOp, rhs: &Self) -> Result<bool>;

    /// The bit-field `[lo..hi]` of this value.
    fn extract(&self, lo: usize, hi: usize) -> Self;

    /// `len` bits of this value starting at bit `position`.
    fn from_position(&self, position: usize, len: usize) -> Self;

    /// Concatenate values, first value most significant.
    fn concat(values: &[Self]) -> Self;

    /// This value with bits `[lo..hi]` replaced by `field`.
    fn combine(&self, field: &Self, lo: usize, hi: usize) -> Self;

    /// A value made of `count` copies of the low `pattern_bits` bits of
    /// `pattern`.
    fn of_repeat_val(pattern: &Self, pattern_bits: usize, count: usize) -> Self;

    /// Drop the value component, keep the taint.
    fn forget(&self) -> Self;

    /// This value with every bit untainted.
    fn untaint(&self) -> Self;

    /// This value with every bit tainted.
    fn taint(&self) -> Self;

    /// Raise the taint of every bit to at least `taint`.
    fn span_taint(&self, taint: Taint) -> Self;

    /// True if any bit of this value is tainted.
    fn is_tainted(&self) -> bool;

    /// The taint shared by every bit of this value.
    fn minimal_taint(&self) -> Taint;
}
