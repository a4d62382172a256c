//! A concrete-plus-taint instance of the cell-value abstraction.
//!
//! `TaintedConst` tracks a cell as either a single concrete word, top, or
//! bottom, together with a per-bit taint and the region the value lives in.
//! It is the default instance of the analyzer and the one the test suite
//! exercises: precise enough to decide branches on concrete inputs, and it
//! degrades to top the moment two different words meet.

use crate::domain::{Content, Region, Taint, TaintSpec, Value};
use crate::error::*;
use crate::il::{BinOp, CmpOp, UnOp, Word};
use num_traits::ToPrimitive;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub enum TaintedConst {
    Top { bits: usize, taint: Taint },
    Value { word: Word, taint: Taint, region: Region },
    Bottom(usize),
}

impl TaintedConst {
    /// The region of this value, when it holds one.
    pub fn region(&self) -> Option<Region> {
        match *self {
            TaintedConst::Value { region, .. } => Some(region),
            _ => None,
        }
    }

    /// The taint of this value.
    pub fn taint_of(&self) -> Taint {
        match *self {
            TaintedConst::Top { taint, .. } | TaintedConst::Value { taint, .. } => taint,
            TaintedConst::Bottom(_) => Taint::Untainted,
        }
    }

    fn with_taint(self, taint: Taint) -> TaintedConst {
        match self {
            TaintedConst::Top { bits, .. } => TaintedConst::Top { bits, taint },
            TaintedConst::Value { word, region, .. } => TaintedConst::Value {
                word,
                taint,
                region,
            },
            bottom => bottom,
        }
    }

    fn word_of_biguint(value: &num_bigint::BigUint, bits: usize) -> Result<Word> {
        if bits > 64 || value.bits() > 64 {
            bail!(ErrorKind::Concretization(format!(
                "configured content of {} bits does not fit a machine word",
                bits.max(value.bits() as usize)
            )));
        }
        let value = value.to_u64().expect("biguint checked to fit 64 bits");
        Ok(Word::new(value, bits))
    }

    /// Taint masks spliced: bits `[lo..hi]` of `taint` replaced by `field`.
    fn splice_taint(taint: Taint, field: Taint, lo: usize, hi: usize) -> Taint {
        match (taint, field) {
            (Taint::Tainted, _) | (_, Taint::Tainted) => Taint::Tainted,
            _ => {
                let mask = match taint {
                    Taint::Mask(mask) => mask,
                    _ => 0,
                };
                let field_mask = match field {
                    Taint::Mask(mask) => mask,
                    _ => 0,
                };
                let width = hi - lo + 1;
                let hole = if width >= 64 {
                    u64::MAX
                } else {
                    ((1u64 << width) - 1) << lo
                };
                Taint::from_mask((mask & !hole) | ((field_mask << lo) & hole))
            }
        }
    }

    /// Shift the accumulated taint mask left and append the next cell's.
    fn concat_taint(accumulated: Taint, next: Taint, next_bits: usize) -> Taint {
        match (accumulated, next) {
            (Taint::Tainted, _) | (_, Taint::Tainted) => Taint::Tainted,
            _ => {
                let mask = match accumulated {
                    Taint::Mask(mask) => mask,
                    _ => 0,
                };
                let next_mask = match next {
                    Taint::Mask(mask) => mask,
                    _ => 0,
                };
                match mask.checked_shl(next_bits as u32) {
                    Some(shifted) => Taint::from_mask(shifted | next_mask),
                    // shifted out of the mask's range, stay conservative
                    None if mask != 0 => Taint::Tainted,
                    None => Taint::from_mask(next_mask),
                }
            }
        }
    }
}

impl Value for TaintedConst {
    fn bot(bits: usize) -> TaintedConst {
        TaintedConst::Bottom(bits)
    }

    fn top(bits: usize) -> TaintedConst {
        TaintedConst::Top {
            bits,
            taint: Taint::Untainted,
        }
    }

    fn bits(&self) -> usize {
        match *self {
            TaintedConst::Top { bits, .. } => bits,
            TaintedConst::Value { ref word, .. } => word.bits(),
            TaintedConst::Bottom(bits) => bits,
        }
    }

    fn is_bot(&self) -> bool {
        matches!(*self, TaintedConst::Bottom(_))
    }

    fn is_subset(&self, other: &TaintedConst) -> bool {
        match (self, other) {
            (TaintedConst::Bottom(_), _) => true,
            (_, TaintedConst::Bottom(_)) => false,
            (
                TaintedConst::Value {
                    word, taint: lhs_taint, ..
                },
                TaintedConst::Value {
                    word: other_word,
                    taint: rhs_taint,
                    ..
                },
            ) => word == other_word && lhs_taint.is_subset(*rhs_taint),
            (
                TaintedConst::Value { taint: lhs_taint, .. },
                TaintedConst::Top { taint: rhs_taint, .. },
            )
            | (
                TaintedConst::Top { taint: lhs_taint, .. },
                TaintedConst::Top { taint: rhs_taint, .. },
            ) => lhs_taint.is_subset(*rhs_taint),
            (TaintedConst::Top { .. }, TaintedConst::Value { .. }) => false,
        }
    }

    fn join(&self, other: &TaintedConst) -> TaintedConst {
        match (self, other) {
            (TaintedConst::Bottom(_), value) | (value, TaintedConst::Bottom(_)) => value.clone(),
            (
                TaintedConst::Value {
                    word,
                    taint,
                    region,
                },
                TaintedConst::Value {
                    word: other_word,
                    taint: other_taint,
                    region: other_region,
                },
            ) => {
                if word == other_word {
                    TaintedConst::Value {
                        word: word.clone(),
                        taint: taint.join(*other_taint),
                        region: region.join(*other_region),
                    }
                } else {
                    TaintedConst::Top {
                        bits: word.bits(),
                        taint: taint.join(*other_taint),
                    }
                }
            }
            (lhs, rhs) => TaintedConst::Top {
                bits: lhs.bits(),
                taint: lhs.taint_of().join(rhs.taint_of()),
            },
        }
    }

    fn meet(&self, other: &TaintedConst) -> TaintedConst {
        match (self, other) {
            (TaintedConst::Bottom(bits), _) | (_, TaintedConst::Bottom(bits)) => {
                TaintedConst::Bottom(*bits)
            }
            (TaintedConst::Top { taint, .. }, value)
            | (value, TaintedConst::Top { taint, .. }) => {
                // taint is may-information: keep the union on restriction
                value.clone().with_taint(value.taint_of().join(*taint))
            }
            (
                TaintedConst::Value {
                    word,
                    taint,
                    region,
                },
                TaintedConst::Value {
                    word: other_word,
                    taint: other_taint,
                    ..
                },
            ) => {
                if word == other_word {
                    TaintedConst::Value {
                        word: word.clone(),
                        taint: taint.join(*other_taint),
                        region: *region,
                    }
                } else {
                    TaintedConst::Bottom(word.bits())
                }
            }
        }
    }

    fn widen(&self, other: &TaintedConst) -> TaintedConst {
        // the chain Value -> Top is finite, joining stabilises
        self.join(other)
    }

    fn of_word(word: &Word) -> TaintedConst {
        TaintedConst::Value {
            word: word.clone(),
            taint: Taint::Untainted,
            region: Region::Global,
        }
    }

    fn of_config(region: Region, content: &Content, bits: usize) -> Result<TaintedConst> {
        let word = match *content {
            Content::Concrete(ref value) => Self::word_of_biguint(value, bits)?,
            Content::ConcreteMask(ref value, ref mask) => {
                if mask.to_u64() != Some(0) {
                    return Ok(TaintedConst::top(bits));
                }
                Self::word_of_biguint(value, bits)?
            }
            Content::Bytes(ref digits) => {
                let value = num_bigint::BigUint::parse_bytes(digits.as_bytes(), 16)
                    .ok_or_else(|| {
                        Error::from(ErrorKind::Concretization(format!(
                            "invalid hexadecimal content {}",
                            digits
                        )))
                    })?;
                Self::word_of_biguint(&value, bits)?
            }
            Content::BytesMask(ref digits, ref mask) => {
                if mask.to_u64() != Some(0) {
                    return Ok(TaintedConst::top(bits));
                }
                let value = num_bigint::BigUint::parse_bytes(digits.as_bytes(), 16)
                    .ok_or_else(|| {
                        Error::from(ErrorKind::Concretization(format!(
                            "invalid hexadecimal content {}",
                            digits
                        )))
                    })?;
                Self::word_of_biguint(&value, bits)?
            }
        };
        Ok(TaintedConst::Value {
            word,
            taint: Taint::Untainted,
            region,
        })
    }

    fn taint_of_config(
        taint: Option<&TaintSpec>,
        _bits: usize,
        value: TaintedConst,
    ) -> Result<TaintedConst> {
        match taint {
            None => Ok(value),
            Some(&TaintSpec::Tainted) => Ok(value.with_taint(Taint::Tainted)),
            Some(&TaintSpec::Mask(_)) => {
                let mask = taint
                    .and_then(TaintSpec::mask_u64)
                    .expect("mask spec carries a mask");
                Ok(value.with_taint(Taint::from_mask(mask)))
            }
        }
    }

    fn to_word(&self) -> Result<Word> {
        match *self {
            TaintedConst::Value { ref word, .. } => Ok(word.clone()),
            _ => bail!(ErrorKind::Concretization(format!(
                "{} is not a single word",
                self
            ))),
        }
    }

    fn to_char(&self) -> Result<u8> {
        let word = self.to_word()?;
        if word.value() > 0xFF {
            bail!(ErrorKind::Concretization(format!(
                "{} does not fit one byte",
                word
            )));
        }
        Ok(word.value() as u8)
    }

    fn value_string(&self) -> String {
        match *self {
            TaintedConst::Value { ref word, .. } => format!("0x{:x}", word.value()),
            TaintedConst::Top { .. } => "?".to_string(),
            TaintedConst::Bottom(_) => "_".to_string(),
        }
    }

    fn taint_string(&self) -> String {
        self.taint_of().to_string()
    }

    fn to_addresses(&self) -> Result<Vec<u64>> {
        match *self {
            TaintedConst::Value { ref word, .. } => Ok(vec![word.value()]),
            TaintedConst::Top { .. } => bail!(ErrorKind::EnumFailure),
            TaintedConst::Bottom(_) => Ok(Vec::new()),
        }
    }

    fn binary(op: BinOp, lhs: &TaintedConst, rhs: &TaintedConst) -> Result<TaintedConst> {
        let bits = lhs.bits();
        let taint = lhs.taint_of().join(rhs.taint_of());

        let (lhs_word, lhs_region) = match *lhs {
            TaintedConst::Bottom(_) => return Ok(TaintedConst::Bottom(bits)),
            TaintedConst::Top { .. } => {
                return Ok(match *rhs {
                    TaintedConst::Bottom(_) => TaintedConst::Bottom(bits),
                    _ => TaintedConst::Top { bits, taint },
                })
            }
            TaintedConst::Value {
                ref word, region, ..
            } => (word, region),
        };
        let (rhs_word, rhs_region) = match *rhs {
            TaintedConst::Bottom(_) => return Ok(TaintedConst::Bottom(bits)),
            TaintedConst::Top { .. } => return Ok(TaintedConst::Top { bits, taint }),
            TaintedConst::Value {
                ref word, region, ..
            } => (word, region),
        };

        let result = match op {
            BinOp::Add => lhs_word.value().wrapping_add(rhs_word.value()),
            BinOp::Sub => lhs_word.value().wrapping_sub(rhs_word.value()),
            BinOp::Mul => lhs_word.value().wrapping_mul(rhs_word.value()),
            BinOp::Divu => {
                if rhs_word.value() == 0 {
                    bail!(ErrorKind::Arithmetic("Division by zero".to_string()));
                }
                lhs_word.value() / rhs_word.value()
            }
            BinOp::Modu => {
                if rhs_word.value() == 0 {
                    bail!(ErrorKind::Arithmetic("Division by zero".to_string()));
                }
                lhs_word.value() % rhs_word.value()
            }
            BinOp::Divs => {
                if rhs_word.value() == 0 {
                    bail!(ErrorKind::Arithmetic("Division by zero".to_string()));
                }
                (lhs_word.sign_extend() / rhs_word.sign_extend()) as u64
            }
            BinOp::Mods => {
                if rhs_word.value() == 0 {
                    bail!(ErrorKind::Arithmetic("Division by zero".to_string()));
                }
                (lhs_word.sign_extend() % rhs_word.sign_extend()) as u64
            }
            BinOp::And => lhs_word.value() & rhs_word.value(),
            BinOp::Or => lhs_word.value() | rhs_word.value(),
            BinOp::Xor => lhs_word.value() ^ rhs_word.value(),
            BinOp::Shl => lhs_word
                .value()
                .checked_shl(rhs_word.value() as u32)
                .unwrap_or(0),
            BinOp::Shr => lhs_word
                .value()
                .checked_shr(rhs_word.value() as u32)
                .unwrap_or(0),
        };

        // pointer arithmetic keeps the pointer's region
        let region = match op {
            BinOp::Add | BinOp::Sub => match (lhs_region, rhs_region) {
                (Region::Global, region) | (region, Region::Global) => region,
                (lhs_region, rhs_region) => lhs_region.join(rhs_region),
            },
            _ => Region::Global,
        };

        Ok(TaintedConst::Value {
            word: Word::new(result, bits),
            taint,
            region,
        })
    }

    fn unary(op: UnOp, value: &TaintedConst) -> Result<TaintedConst> {
        let bits = match op {
            UnOp::Not => value.bits(),
            UnOp::ZeroExt(bits) | UnOp::SignExt(bits) | UnOp::Trun(bits) => bits,
        };
        let (word, taint, region) = match *value {
            TaintedConst::Bottom(_) => return Ok(TaintedConst::Bottom(bits)),
            TaintedConst::Top { taint, .. } => return Ok(TaintedConst::Top { bits, taint }),
            TaintedConst::Value {
                ref word,
                taint,
                region,
            } => (word, taint, region),
        };

        let (result, taint) = match op {
            UnOp::Not => (!word.value(), taint),
            UnOp::ZeroExt(_) => (word.value(), taint),
            UnOp::SignExt(_) => (word.sign_extend() as u64, taint),
            UnOp::Trun(bits) => (word.value(), taint.extract(0, bits - 1)),
        };
        Ok(TaintedConst::Value {
            word: Word::new(result, bits),
            taint,
            region,
        })
    }

    fn compare(lhs: &TaintedConst, op: CmpOp, rhs: &TaintedConst) -> Result<bool> {
        let (lhs_word, rhs_word) = match (lhs, rhs) {
            (TaintedConst::Bottom(_), _) | (_, TaintedConst::Bottom(_)) => return Ok(false),
            (TaintedConst::Top { .. }, _) | (_, TaintedConst::Top { .. }) => return Ok(true),
            (
                TaintedConst::Value { word, .. },
                TaintedConst::Value {
                    word: other_word, ..
                },
            ) => (word, other_word),
        };

        Ok(match op {
            CmpOp::Eq => lhs_word.value() == rhs_word.value(),
            CmpOp::Neq => lhs_word.value() != rhs_word.value(),
            CmpOp::Ltu => lhs_word.value() < rhs_word.value(),
            CmpOp::Leu => lhs_word.value() <= rhs_word.value(),
            CmpOp::Gtu => lhs_word.value() > rhs_word.value(),
            CmpOp::Geu => lhs_word.value() >= rhs_word.value(),
            CmpOp::Lts => lhs_word.sign_extend() < rhs_word.sign_extend(),
            CmpOp::Les => lhs_word.sign_extend() <= rhs_word.sign_extend(),
            CmpOp::Gts => lhs_word.sign_extend() > rhs_word.sign_extend(),
            CmpOp::Ges => lhs_word.sign_extend() >= rhs_word.sign_extend(),
        })
    }

    fn extract(&self, lo: usize, hi: usize) -> TaintedConst {
        match *self {
            TaintedConst::Bottom(_) => TaintedConst::Bottom(hi - lo + 1),
            TaintedConst::Top { taint, .. } => TaintedConst::Top {
                bits: hi - lo + 1,
                taint: taint.extract(lo, hi),
            },
            TaintedConst::Value {
                ref word,
                taint,
                region,
            } => TaintedConst::Value {
                word: word.extract(lo, hi),
                taint: taint.extract(lo, hi),
                region,
            },
        }
    }

    fn from_position(&self, position: usize, len: usize) -> TaintedConst {
        self.extract(position, position + len - 1)
    }

    fn concat(values: &[TaintedConst]) -> TaintedConst {
        let total: usize = values.iter().map(TaintedConst::bits).sum();
        if values.iter().any(TaintedConst::is_bot) {
            return TaintedConst::Bottom(total);
        }

        let mut taint = Taint::Untainted;
        let mut region = None;
        let mut word: Option<u64> = Some(0);
        for value in values {
            taint = TaintedConst::concat_taint(taint, value.taint_of(), value.bits());
            match *value {
                TaintedConst::Value {
                    word: ref next,
                    region: next_region,
                    ..
                } => {
                    region = Some(match region {
                        Some(region) => Region::join(region, next_region),
                        None => next_region,
                    });
                    word = word.and_then(|accumulated| {
                        if next.bits() >= 64 {
                            if accumulated == 0 {
                                Some(next.value())
                            } else {
                                None
                            }
                        } else {
                            Some((accumulated << next.bits()) | next.value())
                        }
                    });
                }
                _ => word = None,
            }
        }

        match (word, total <= 64 && !values.is_empty()) {
            (Some(value), true) => TaintedConst::Value {
                word: Word::new(value, total),
                taint,
                region: region.unwrap_or(Region::Global),
            },
            _ => TaintedConst::Top { bits: total, taint },
        }
    }

    fn combine(&self, field: &TaintedConst, lo: usize, hi: usize) -> TaintedConst {
        let bits = self.bits();
        if self.is_bot() || field.is_bot() {
            return TaintedConst::Bottom(bits);
        }
        let taint = TaintedConst::splice_taint(self.taint_of(), field.taint_of(), lo, hi);
        match (self, field) {
            (
                TaintedConst::Value {
                    word, region, ..
                },
                TaintedConst::Value {
                    word: field_word, ..
                },
            ) => TaintedConst::Value {
                word: word.splice(field_word, lo, hi),
                taint,
                region: *region,
            },
            _ => TaintedConst::Top { bits, taint },
        }
    }

    fn of_repeat_val(pattern: &TaintedConst, pattern_bits: usize, count: usize) -> TaintedConst {
        let total = pattern_bits * count;
        let word = match *pattern {
            TaintedConst::Bottom(_) => return TaintedConst::Bottom(total),
            TaintedConst::Top { taint, .. } => return TaintedConst::Top { bits: total, taint },
            TaintedConst::Value { ref word, .. } => word,
        };
        if total > 64 {
            let taint = if pattern.is_tainted() {
                Taint::Tainted
            } else {
                Taint::Untainted
            };
            return TaintedConst::Top { bits: total, taint };
        }

        let pattern_value = word.extract(0, pattern_bits - 1).value();
        let mut value = 0u64;
        let mut taint = Taint::Untainted;
        for _ in 0..count {
            value = if pattern_bits >= 64 {
                pattern_value
            } else {
                (value << pattern_bits) | pattern_value
            };
            taint = TaintedConst::concat_taint(
                taint,
                pattern.taint_of().extract(0, pattern_bits - 1),
                pattern_bits,
            );
        }
        TaintedConst::Value {
            word: Word::new(value, total),
            taint,
            region: pattern.region().unwrap_or(Region::Global),
        }
    }

    fn forget(&self) -> TaintedConst {
        TaintedConst::Top {
            bits: self.bits(),
            taint: self.taint_of(),
        }
    }

    fn untaint(&self) -> TaintedConst {
        self.clone().with_taint(Taint::Untainted)
    }

    fn taint(&self) -> TaintedConst {
        self.clone().with_taint(Taint::Tainted)
    }

    fn span_taint(&self, taint: Taint) -> TaintedConst {
        let joined = self.taint_of().join(taint);
        self.clone().with_taint(joined)
    }

    fn is_tainted(&self) -> bool {
        self.taint_of().is_tainted()
    }

    fn minimal_taint(&self) -> Taint {
        self.taint_of()
    }
}

impl fmt::Display for TaintedConst {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        if self.is_tainted() {
            write!(f, "{}!{}", self.value_string(), self.taint_string())
        } else {
            write!(f, "{}", self.value_string())
        }
    }
}

#[cfg(test)]
mod tainted_tests {
    use super::TaintedConst;
    use crate::domain::{Content, Region, Taint, TaintSpec, Value};
    use crate::il;
    use crate::il::{BinOp, CmpOp, UnOp};
    use num_bigint::BigUint;

    fn value(v: u64, bits: usize) -> TaintedConst {
        TaintedConst::of_word(&il::const_(v, bits))
    }

    #[test]
    fn lattice_basics() {
        let one = value(1, 32);
        let two = value(2, 32);

        assert!(TaintedConst::bot(32).is_subset(&one));
        assert!(one.is_subset(&one));
        assert!(!one.is_subset(&two));

        let joined = one.join(&two);
        assert_eq!(joined, TaintedConst::top(32));
        assert!(one.is_subset(&joined));
        assert!(two.is_subset(&joined));

        assert!(one.meet(&two).is_bot());
        assert_eq!(one.meet(&TaintedConst::top(32)), one);
        assert_eq!(TaintedConst::top(32).meet(&one), one);
    }

    #[test]
    fn join_of_equal_words_joins_taint() {
        let plain = value(7, 32);
        let tainted = value(7, 32).taint();
        let joined = plain.join(&tainted);
        assert_eq!(joined.to_word().unwrap(), il::const_(7, 32));
        assert!(joined.is_tainted());
    }

    #[test]
    fn arithmetic() {
        let a = value(10, 32);
        let b = value(3, 32);
        assert_eq!(
            TaintedConst::binary(BinOp::Add, &a, &b).unwrap().to_word().unwrap(),
            il::const_(13, 32)
        );
        assert_eq!(
            TaintedConst::binary(BinOp::Sub, &b, &a).unwrap().to_word().unwrap(),
            il::const_(3u64.wrapping_sub(10), 32)
        );
        assert_eq!(
            TaintedConst::binary(BinOp::Divu, &a, &b).unwrap().to_word().unwrap(),
            il::const_(3, 32)
        );
        assert!(TaintedConst::binary(BinOp::Divu, &a, &value(0, 32)).is_err());
    }

    #[test]
    fn signed_comparison_uses_sign_extension() {
        let minus_one = value(0xFFFF_FFFF, 32);
        let one = value(1, 32);
        assert!(TaintedConst::compare(&minus_one, CmpOp::Lts, &one).unwrap());
        assert!(!TaintedConst::compare(&minus_one, CmpOp::Ltu, &one).unwrap());
    }

    #[test]
    fn comparisons_against_top_are_feasible() {
        let top = TaintedConst::top(32);
        assert!(TaintedConst::compare(&top, CmpOp::Eq, &value(42, 32)).unwrap());
        assert!(TaintedConst::compare(&top, CmpOp::Neq, &value(42, 32)).unwrap());
    }

    #[test]
    fn extract_concat_round_trip() {
        let word = value(0x12345678, 32);
        let bytes: Vec<TaintedConst> = (0..4)
            .map(|i| word.extract(i * 8, i * 8 + 7))
            .rev()
            .collect();
        assert_eq!(TaintedConst::concat(&bytes), word);
    }

    #[test]
    fn taint_masks_follow_extraction() {
        let cell = value(0xAABB, 16).span_taint(Taint::Mask(0xFF00));
        assert!(!cell.extract(0, 7).is_tainted());
        assert!(cell.extract(8, 15).is_tainted());
    }

    #[test]
    fn combine_splices_bits() {
        let word = value(0x12345678, 32);
        let field = value(0xAB, 8);
        let combined = word.combine(&field, 8, 15);
        assert_eq!(combined.to_word().unwrap(), il::const_(0x1234AB78, 32));
    }

    #[test]
    fn unary_operators() {
        let a = value(0x0F, 8);
        assert_eq!(
            TaintedConst::unary(UnOp::Not, &a).unwrap().to_word().unwrap(),
            il::const_(0xF0, 8)
        );
        assert_eq!(
            TaintedConst::unary(UnOp::ZeroExt(32), &a).unwrap().to_word().unwrap(),
            il::const_(0x0F, 32)
        );
        let signed = value(0xFF, 8);
        assert_eq!(
            TaintedConst::unary(UnOp::SignExt(16), &signed).unwrap().to_word().unwrap(),
            il::const_(0xFFFF, 16)
        );
        assert_eq!(
            TaintedConst::unary(UnOp::Trun(4), &a).unwrap().to_word().unwrap(),
            il::const_(0x0F, 4)
        );
    }

    #[test]
    fn of_config_concrete_and_bytes() {
        let concrete =
            TaintedConst::of_config(Region::Global, &Content::concrete(0xCAFE), 32).unwrap();
        assert_eq!(concrete.to_word().unwrap(), il::const_(0xCAFE, 32));

        let bytes = TaintedConst::of_config(
            Region::Global,
            &Content::Bytes("DEADBEEF".to_string()),
            32,
        )
        .unwrap();
        assert_eq!(bytes.to_word().unwrap(), il::const_(0xDEADBEEF, 32));

        let masked = TaintedConst::of_config(
            Region::Global,
            &Content::ConcreteMask(BigUint::from(0u8), BigUint::from(0xFFu32)),
            32,
        )
        .unwrap();
        assert_eq!(masked, TaintedConst::top(32));
    }

    #[test]
    fn taint_of_config_masks() {
        let cell = value(0, 32);
        let tainted =
            TaintedConst::taint_of_config(Some(&TaintSpec::Tainted), 32, cell.clone()).unwrap();
        assert!(tainted.is_tainted());

        let masked = TaintedConst::taint_of_config(
            Some(&TaintSpec::Mask(BigUint::from(0x0Fu8))),
            32,
            cell.clone(),
        )
        .unwrap();
        assert_eq!(masked.minimal_taint(), Taint::Mask(0x0F));

        let untouched = TaintedConst::taint_of_config(None, 32, cell).unwrap();
        assert!(!untouched.is_tainted());
    }

    #[test]
    fn repeat_builds_patterned_word() {
        let pattern = value(0xAB, 8);
        let repeated = TaintedConst::of_repeat_val(&pattern, 8, 4);
        assert_eq!(repeated.to_word().unwrap(), il::const_(0xABABABAB, 32));

        let wide = TaintedConst::of_repeat_val(&pattern, 8, 16);
        assert_eq!(wide.bits(), 128);
        assert!(wide.to_word().is_err());
    }

    #[test]
    fn forget_keeps_taint() {
        let cell = value(7, 32).taint();
        let forgotten = cell.forget();
        assert!(forgotten.to_word().is_err());
        assert!(forgotten.is_tainted());
    }

    #[test]
    fn addresses() {
        assert_eq!(value(0x1000, 32).to_addresses().unwrap(), vec![0x1000]);
        assert!(TaintedConst::top(32).to_addresses().is_err());
        assert!(TaintedConst::bot(32).to_addresses().unwrap().is_empty());
    }
}
