//! Bounded string scans, copies, and hexadecimal formatting.
//!
//! These back the analyzer's models of the C string and formatting
//! primitives (`strcpy`, `strnlen`, `sprintf %x`...). They stay sound under
//! address-set non-determinism: scans over several possible sources keep the
//! longest result, and copies to several possible destinations degrade to
//! weak updates or drop precision altogether.

use crate::domain::env::Env;
use crate::domain::eval;
use crate::domain::{State, Value};
use crate::error::*;
use crate::il;
use crate::il::{CmpOp, Expr};
use log::warn;
use std::io;
use std::io::Write;

/// Format a cell value as a hexadecimal string of exactly `nb` characters.
///
/// The value's low `word_sz` bits are materialised and rendered without
/// their `0x` prefix. When `full` is requested and the value is tainted, the
/// taint is appended as `value!taint`.
pub fn to_hex<V>(
    value: &V,
    nb: usize,
    word_sz: usize,
    capitalise: bool,
    pad: Option<(char, bool)>,
    full: bool,
) -> Result<String>
where
    V: Value,
{
    let narrowed = if word_sz < value.bits() {
        value.extract(0, word_sz - 1)
    } else {
        value.clone()
    };
    if narrowed.to_word().is_err() {
        bail!(ErrorKind::Concretization(
            "hex format of a non-singleton value".to_string()
        ));
    }

    let rendered = narrowed.value_string();
    let mut digits = rendered
        .get(2..)
        .map(|digits| digits.to_string())
        .unwrap_or_default();
    if capitalise {
        digits = digits.to_uppercase();
    }

    match pad {
        Some((pad_char, true)) => {
            while digits.len() < nb {
                digits.insert(0, pad_char);
            }
        }
        Some((pad_char, false)) => {
            while digits.len() < nb {
                digits.push(pad_char);
            }
        }
        None => {}
    }
    if digits.len() > nb {
        bail!(ErrorKind::Concretization(format!(
            "hex string {} wider than {} characters",
            digits, nb
        )));
    }

    if full && narrowed.is_tainted() {
        digits = format!("{}!{}", digits, narrowed.taint_string());
    }
    Ok(digits)
}

fn write_stdout(bytes: &[u8]) -> Result<()> {
    let stdout = io::stdout();
    let mut handle = stdout.lock();
    handle.write_all(bytes)?;
    Ok(())
}

impl<V> State<V>
where
    V: Value,
{
    /// Scan cells from the addresses of `src` until one compares against the
    /// terminator, bounded by `upper_bound` cells of `cell_bits` bits.
    ///
    /// On a match the scanned cells are returned; with right padding the
    /// cell list is padded to the bound. Exhausting the bound fails with
    /// `NotFound` when asked to, and otherwise reports the bound with no
    /// cells. Several possible source addresses keep the longest scan.
    fn scan_cells(
        env: &Env<V>,
        src: &Expr,
        op: CmpOp,
        terminator: &Expr,
        upper_bound: usize,
        cell_bits: usize,
        with_exception: bool,
        pad: Option<(char, bool)>,
    ) -> Result<(usize, Vec<V>)> {
        let (address_value, _) = eval::eval_exp(env, src)?;
        let addresses = address_value.to_addresses()?;
        if addresses.is_empty() {
            bail!(ErrorKind::NotFound(
                "scan source has no address".to_string()
            ));
        }
        let (term_value, _) = eval::eval_exp(env, terminator)?;

        let mut best: Option<(usize, Vec<V>)> = None;
        for start in addresses {
            let scanned = Self::scan_from(
                env,
                start,
                op,
                &term_value,
                upper_bound,
                cell_bits,
                with_exception,
                pad,
            )?;
            best = Some(match best {
                Some(previous) if previous.0 >= scanned.0 => previous,
                _ => scanned,
            });
        }
        Ok(best.expect("non-empty address set produced no scan"))
    }

    fn scan_from(
        env: &Env<V>,
        start: u64,
        op: CmpOp,
        term_value: &V,
        upper_bound: usize,
        cell_bits: usize,
        with_exception: bool,
        pad: Option<(char, bool)>,
    ) -> Result<(usize, Vec<V>)> {
        let step = (cell_bits / 8) as u64;
        let mut cells = Vec::new();
        for index in 0..upper_bound {
            let value = env.load(start + index as u64 * step, cell_bits, false)?;
            if V::compare(&value, op, term_value)? {
                if let Some((pad_char, pad_left)) = pad {
                    if pad_left {
                        panic!("left padding in bounded scans is unsupported");
                    }
                    let pad_cell = V::of_word(&il::const_(pad_char as u64, 8));
                    while cells.len() < upper_bound {
                        cells.push(pad_cell.clone());
                    }
                    return Ok((upper_bound, cells));
                }
                return Ok((index, cells));
            }
            cells.push(value);
        }
        if with_exception {
            bail!(ErrorKind::NotFound(format!(
                "no terminator within {} cells of 0x{:X}",
                upper_bound, start
            )));
        }
        Ok((upper_bound, Vec::new()))
    }

    /// Materialise the bytes from `src` up to a terminator.
    ///
    /// Every underlying failure, from the scan to the per-cell
    /// materialisation, surfaces as `Concretization`.
    pub fn get_bytes(
        &self,
        src: &Expr,
        op: CmpOp,
        terminator: &Expr,
        upper_bound: usize,
        cell_bits: usize,
    ) -> Result<(usize, Vec<u8>)> {
        let concretization = || ErrorKind::Concretization("string scan failed".to_string());
        let env = match self.env() {
            Some(env) => env,
            None => bail!(concretization()),
        };
        let (len, cells) = Self::scan_cells(
            env,
            src,
            op,
            terminator,
            upper_bound,
            cell_bits,
            true,
            None,
        )
        .map_err(|_| Error::from(concretization()))?;

        let mut bytes = Vec::with_capacity(cells.len());
        for cell in &cells {
            bytes.push(cell.to_char().map_err(|_| Error::from(concretization()))?);
        }
        Ok((len, bytes))
    }

    /// Copy cells from `src` to `dst` up to a terminator.
    pub fn copy_until(
        self,
        dst: &Expr,
        src: &Expr,
        terminator: &Expr,
        cell_bits: usize,
        upper_bound: usize,
        with_exception: bool,
        pad: Option<(char, bool)>,
    ) -> Result<(State<V>, usize)> {
        let mut env = match self {
            State::Bottom => return Ok((State::Bottom, 0)),
            State::Concrete(env) => env,
        };

        let (len, cells) = Self::scan_cells(
            &env,
            src,
            CmpOp::Eq,
            terminator,
            upper_bound,
            cell_bits,
            with_exception,
            pad,
        )?;

        let (dst_value, _) = eval::eval_exp(&env, dst)?;
        let addresses = dst_value.to_addresses()?;
        let step = (cell_bits / 8) as u64;
        match addresses.as_slice() {
            [] => bail!(ErrorKind::BotDeref),
            [address] => {
                for (index, cell) in cells.iter().enumerate() {
                    env.store(address + index as u64 * step, cell, true, false)?;
                }
            }
            _ => {
                for address in &addresses {
                    for (index, cell) in cells.iter().enumerate() {
                        match env.store(address + index as u64 * step, cell, false, false) {
                            Ok(()) => {}
                            Err(Error(ErrorKind::Empty(_), _)) => {
                                return Ok((State::Bottom, 0));
                            }
                            Err(e) => return Err(e),
                        }
                    }
                }
            }
        }
        Ok((State::Concrete(env), len))
    }

    /// Copy a zero-terminated byte string from `src` to `dst`, bounded by
    /// `count` bytes.
    pub fn copy_chars(
        self,
        dst: &Expr,
        src: &Expr,
        count: usize,
        pad: Option<(char, bool)>,
    ) -> Result<(State<V>, usize)> {
        self.copy_until(dst, src, &il::expr_const(0, 8), 8, count, false, pad)
    }

    /// Write the hexadecimal rendering of `src` to `dst`, one character per
    /// byte cell.
    ///
    /// A tainted source taints every written character. Several possible
    /// destinations drop the environment's precision instead of enumerating.
    pub fn copy_hex(
        self,
        dst: &Expr,
        src: &Expr,
        nb: usize,
        capitalise: bool,
        pad: Option<(char, bool)>,
        word_sz: usize,
    ) -> Result<(State<V>, usize)> {
        let mut env = match self {
            State::Bottom => return Ok((State::Bottom, 0)),
            State::Concrete(env) => env,
        };

        let (value, tainted) = eval::eval_exp(&env, src)?;
        let digits = to_hex(&value, nb, word_sz, capitalise, pad, false)?;

        let (dst_value, _) = eval::eval_exp(&env, dst)?;
        let addresses = dst_value.to_addresses()?;
        match addresses.as_slice() {
            [] => bail!(ErrorKind::BotDeref),
            [address] => {
                for (index, ch) in digits.bytes().enumerate() {
                    let mut cell = V::of_word(&il::const_(u64::from(ch), 8));
                    if tainted {
                        cell = cell.taint();
                    }
                    env.store(address + index as u64, &cell, true, false)?;
                }
                Ok((State::Concrete(env), digits.len()))
            }
            _ => {
                warn!("hex copy to several destinations, dropping cell precision");
                Ok((State::Concrete(env).forget(), digits.len()))
            }
        }
    }

    /// Print `count` bytes from the addresses of `src` on standard output.
    pub fn print_bytes(&self, src: &Expr, count: usize) -> Result<usize> {
        let env = match self.env() {
            Some(env) => env,
            None => bail!(ErrorKind::Empty("print on an infeasible state".to_string())),
        };
        let (address_value, _) = eval::eval_exp(env, src)?;
        let addresses = address_value.to_addresses()?;
        if addresses.is_empty() {
            bail!(ErrorKind::BotDeref);
        }

        let mut bytes = Vec::with_capacity(count);
        for index in 0..count as u64 {
            let mut cell: Option<V> = None;
            for address in &addresses {
                let value = env.load(address + index, 8, false)?;
                cell = Some(match cell {
                    Some(accumulated) => accumulated.join(&value),
                    None => value,
                });
            }
            let cell = cell.expect("non-empty address set produced no cell");
            bytes.push(cell.to_char()?);
        }
        write_stdout(&bytes)?;
        Ok(bytes.len())
    }

    /// Print the bytes from `src` up to a terminator on standard output.
    pub fn print_until(
        &self,
        src: &Expr,
        terminator: &Expr,
        cell_bits: usize,
        upper_bound: usize,
        with_exception: bool,
        pad: Option<(char, bool)>,
    ) -> Result<usize> {
        let env = match self.env() {
            Some(env) => env,
            None => bail!(ErrorKind::Empty("print on an infeasible state".to_string())),
        };
        let (len, cells) = Self::scan_cells(
            env,
            src,
            CmpOp::Eq,
            terminator,
            upper_bound,
            cell_bits,
            with_exception,
            pad,
        )?;
        let mut bytes = Vec::with_capacity(cells.len());
        for cell in &cells {
            bytes.push(cell.to_char()?);
        }
        write_stdout(&bytes)?;
        Ok(len)
    }

    /// Print a zero-terminated byte string from `src` on standard output.
    pub fn print_chars(
        &self,
        src: &Expr,
        count: usize,
        pad: Option<(char, bool)>,
    ) -> Result<usize> {
        self.print_until(src, &il::expr_const(0, 8), 8, count, false, pad)
    }

    /// Print the hexadecimal rendering of `src` on standard output.
    pub fn print_hex(
        &self,
        src: &Expr,
        nb: usize,
        capitalise: bool,
        pad: Option<(char, bool)>,
        word_sz: usize,
        full: bool,
    ) -> Result<usize> {
        let env = match self.env() {
            Some(env) => env,
            None => bail!(ErrorKind::Empty("print on an infeasible state".to_string())),
        };
        let (value, _) = eval::eval_exp(env, src)?;
        let digits = to_hex(&value, nb, word_sz, capitalise, pad, full)?;
        write_stdout(digits.as_bytes())?;
        Ok(digits.len())
    }
}

#[cfg(test)]
mod strings_tests {
    use super::to_hex;
    use crate::domain::env::Dimension;
    use crate::domain::{State, TaintedConst, Value};
    use crate::il;
    use crate::il::{CmpOp, Expr, Lval};

    type TState = State<TaintedConst>;

    fn byte(value: u64) -> TaintedConst {
        TaintedConst::of_word(&il::const_(value, 8))
    }

    fn state_with_string(start: u64, bytes: &[u8]) -> TState {
        let mut env = crate::domain::env::Env::new();
        for (i, b) in bytes.iter().enumerate() {
            env.insert(Dimension::Mem(start + i as u64), byte(u64::from(*b)));
        }
        State::Concrete(env)
    }

    #[test]
    fn terminator_scan() {
        let state = state_with_string(0x3000, b"hi\0!!");
        let (len, bytes) = state
            .get_bytes(
                &il::expr_const(0x3000, 32),
                CmpOp::Eq,
                &il::expr_const(0, 8),
                16,
                8,
            )
            .unwrap();
        assert_eq!(len, 2);
        assert_eq!(bytes, b"hi");
    }

    #[test]
    fn scan_without_terminator_is_concretization() {
        let state = state_with_string(0x3000, b"hi");
        // two cells then unset memory: the scan cannot finish
        let result = state.get_bytes(
            &il::expr_const(0x3000, 32),
            CmpOp::Eq,
            &il::expr_const(0, 8),
            16,
            8,
        );
        assert!(result.is_err());
    }

    #[test]
    fn copy_until_pads_on_the_right() {
        let state = state_with_string(0x3000, b"hi\0!!");
        let dst = il::expr_const(0x4000, 32);
        let (state, len) = state
            .copy_until(
                &dst,
                &il::expr_const(0x3000, 32),
                &il::expr_const(0, 8),
                8,
                16,
                false,
                Some(('_', false)),
            )
            .unwrap();
        assert_eq!(len, 16);

        let env = state.env().unwrap();
        assert_eq!(env.load(0x4000, 8, false).unwrap(), byte(b'h' as u64));
        assert_eq!(env.load(0x4001, 8, false).unwrap(), byte(b'i' as u64));
        for offset in 2..16 {
            assert_eq!(
                env.load(0x4000 + offset, 8, false).unwrap(),
                byte(b'_' as u64)
            );
        }
    }

    #[test]
    fn copy_chars_copies_zero_terminated() {
        let state = state_with_string(0x3000, b"abc\0");
        let (state, len) = state
            .copy_chars(
                &il::expr_const(0x5000, 32),
                &il::expr_const(0x3000, 32),
                8,
                None,
            )
            .unwrap();
        assert_eq!(len, 3);
        let env = state.env().unwrap();
        assert_eq!(env.load(0x5000, 8, false).unwrap(), byte(b'a' as u64));
        assert_eq!(env.load(0x5002, 8, false).unwrap(), byte(b'c' as u64));
    }

    #[test]
    fn hex_formatting() {
        let value = TaintedConst::of_word(&il::const_(0xAB, 32));
        assert_eq!(to_hex(&value, 2, 32, false, None, false).unwrap(), "ab");
        assert_eq!(to_hex(&value, 2, 32, true, None, false).unwrap(), "AB");
        assert_eq!(
            to_hex(&value, 4, 32, false, Some(('0', true)), false).unwrap(),
            "00ab"
        );
        assert_eq!(
            to_hex(&value, 4, 32, false, Some((' ', false)), false).unwrap(),
            "ab  "
        );
        assert!(to_hex(&value, 1, 32, false, None, false).is_err());
    }

    #[test]
    fn hex_formatting_shows_taint_when_asked() {
        let value = TaintedConst::of_word(&il::const_(0xAB, 32)).taint();
        let full = to_hex(&value, 2, 32, false, None, true).unwrap();
        assert_eq!(full, "ab!ALL");
    }

    #[test]
    fn copy_hex_writes_characters() {
        let state: TState = State::new(None);
        let (state, _) = state
            .set(&Lval::Reg(il::reg("eax", 32)), &il::expr_const(0xBEEF, 32))
            .unwrap();
        let (state, len) = state
            .copy_hex(
                &il::expr_const(0x6000, 32),
                &Expr::Lval(Lval::Reg(il::reg("eax", 32))),
                4,
                false,
                None,
                32,
            )
            .unwrap();
        assert_eq!(len, 4);
        let env = state.env().unwrap();
        assert_eq!(env.load(0x6000, 8, false).unwrap(), byte(b'b' as u64));
        assert_eq!(env.load(0x6001, 8, false).unwrap(), byte(b'e' as u64));
        assert_eq!(env.load(0x6002, 8, false).unwrap(), byte(b'e' as u64));
        assert_eq!(env.load(0x6003, 8, false).unwrap(), byte(b'f' as u64));
    }

    #[test]
    fn copy_hex_taints_characters_from_tainted_source() {
        let mut env = crate::domain::env::Env::new();
        env.insert(
            Dimension::Reg(il::reg("eax", 32)),
            TaintedConst::of_word(&il::const_(0x12, 32)).taint(),
        );
        let state: TState = State::Concrete(env);
        let (state, _) = state
            .copy_hex(
                &il::expr_const(0x6000, 32),
                &Expr::Lval(Lval::Reg(il::reg("eax", 32))),
                2,
                false,
                Some(('0', true)),
                32,
            )
            .unwrap();
        let env = state.env().unwrap();
        assert!(env.load(0x6000, 8, false).unwrap().is_tainted());
    }
}
