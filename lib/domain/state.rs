//! The abstract state: a two-point lift of the environment.
//!
//! `Bottom` is the empty concretization, reached when a branch or an update
//! is infeasible. Everything else is a `Concrete` environment. Lattice
//! operations are pointwise on cells; `Bottom` is absorbing for meet and
//! neutral for join.

use crate::domain::env::{Dimension, Env};
use crate::domain::eval;
use crate::domain::{Content, Region, TaintSpec, Value};
use crate::error::*;
use crate::il::{CmpOp, Expr, Lval, Register};
use crate::memory::backing;
use crate::RC;
use log::warn;
use serde::{Deserialize, Serialize};
use std::fmt;

/// An abstract state over cell values of type `V`.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub enum State<V: Value> {
    Bottom,
    Concrete(Env<V>),
}

impl<V> State<V>
where
    V: Value,
{
    /// Create an empty state, optionally backed by a loaded binary image.
    pub fn new(backing: Option<RC<backing::Memory>>) -> State<V> {
        match backing {
            Some(backing) => State::Concrete(Env::new_with_backing(backing)),
            None => State::Concrete(Env::new()),
        }
    }

    /// True if this state concretizes to nothing.
    pub fn is_bot(&self) -> bool {
        matches!(*self, State::Bottom)
    }

    /// Retrieve the environment of this state, if it is not bottom.
    pub fn env(&self) -> Option<&Env<V>> {
        match *self {
            State::Bottom => None,
            State::Concrete(ref env) => Some(env),
        }
    }

    /// True if every concretization of this state is one of `other`.
    ///
    /// Cells present on only one side constrain nothing here: comparison is
    /// pointwise on the shared dimensions.
    pub fn is_subset(&self, other: &State<V>) -> bool {
        match (self, other) {
            (State::Bottom, _) => true,
            (_, State::Bottom) => false,
            (State::Concrete(env), State::Concrete(other_env)) => {
                env.iter().all(|(dimension, value)| {
                    match other_env.get(dimension) {
                        Some(other_value) => value.is_subset(other_value),
                        None => true,
                    }
                })
            }
        }
    }

    /// Join this state with another.
    pub fn join(self, other: &State<V>) -> State<V> {
        match (self, other) {
            (State::Bottom, other) => other.clone(),
            (this, State::Bottom) => this,
            (State::Concrete(mut env), State::Concrete(other_env)) => {
                for (dimension, other_value) in other_env.iter() {
                    let joined = match env.get(dimension) {
                        Some(value) => value.join(other_value),
                        None => other_value.clone(),
                    };
                    env.insert(dimension.clone(), joined);
                }
                State::Concrete(env)
            }
        }
    }

    /// Meet this state with another.
    ///
    /// The result is restricted to the dimensions present on both sides; an
    /// empty environment is neutral.
    pub fn meet(self, other: &State<V>) -> State<V> {
        match (self, other) {
            (State::Bottom, _) => State::Bottom,
            (_, State::Bottom) => State::Bottom,
            (State::Concrete(env), State::Concrete(other_env)) => {
                if env.is_empty() {
                    return State::Concrete(other_env.clone());
                }
                if other_env.is_empty() {
                    return State::Concrete(env);
                }
                let mut met = env.clone();
                met.cells.clear();
                for (dimension, value) in env.iter() {
                    if let Some(other_value) = other_env.get(dimension) {
                        met.insert(dimension.clone(), value.meet(other_value));
                    }
                }
                State::Concrete(met)
            }
        }
    }

    /// Widen this state against the next iterate.
    ///
    /// Cells present on only one side widen to top.
    pub fn widen(self, other: &State<V>) -> State<V> {
        match (self, other) {
            (State::Bottom, other) => other.clone(),
            (this, State::Bottom) => this,
            (State::Concrete(mut env), State::Concrete(other_env)) => {
                let lone: Vec<(Dimension, usize)> = env
                    .iter()
                    .filter(|(dimension, _)| other_env.get(dimension).is_none())
                    .map(|(dimension, value)| (dimension.clone(), value.bits()))
                    .collect();
                for (dimension, bits) in lone {
                    env.insert(dimension, V::top(bits));
                }
                for (dimension, other_value) in other_env.iter() {
                    let widened = match env.get(dimension) {
                        Some(value) => value.widen(other_value),
                        None => V::top(other_value.bits()),
                    };
                    env.insert(dimension.clone(), widened);
                }
                State::Concrete(env)
            }
        }
    }

    /// Drop every cell's value, keeping only the dimensions.
    pub fn forget(self) -> State<V> {
        match self {
            State::Bottom => State::Bottom,
            State::Concrete(mut env) => {
                let dimensions: Vec<(Dimension, usize)> = env
                    .iter()
                    .map(|(dimension, value)| (dimension.clone(), value.bits()))
                    .collect();
                for (dimension, bits) in dimensions {
                    env.insert(dimension, V::top(bits));
                }
                State::Concrete(env)
            }
        }
    }

    /// Drop the value of one destination, keeping its taint.
    pub fn forget_lval(self, lval: &Lval) -> Result<State<V>> {
        let mut env = match self {
            State::Bottom => return Ok(State::Bottom),
            State::Concrete(env) => env,
        };
        match *lval {
            Lval::Reg(ref register) => {
                let cell = match env.get_register(register) {
                    Some(value) => value.forget(),
                    None => V::top(register.bits()),
                };
                env.insert(Dimension::Reg(register.clone()), cell);
            }
            Lval::Slice(ref register, lo, hi) => {
                let cell = match env.get_register(register) {
                    Some(value) => value.combine(&V::top(hi - lo + 1), lo, hi),
                    None => V::top(register.bits()),
                };
                env.insert(Dimension::Reg(register.clone()), cell);
            }
            Lval::Mem(ref address_expr, bits) => {
                let (address_value, _) = eval::eval_exp(&env, address_expr)?;
                match address_value.to_addresses() {
                    Ok(addresses) => {
                        for address in addresses {
                            env.store(address, &V::top(bits), true, false)?;
                        }
                    }
                    Err(Error(ErrorKind::EnumFailure, _)) => {
                        return Ok(State::Concrete(env).forget());
                    }
                    Err(e) => return Err(e),
                }
            }
        }
        Ok(State::Concrete(env))
    }

    /// Assign the value of `src` to the destination `dst`.
    ///
    /// Returns the updated state and whether the assigned value was fed by
    /// tainted cells. The minimal taint of the source's operands is spanned
    /// onto the assigned value so per-bit abstractions cannot drop it.
    pub fn set(self, dst: &Lval, src: &Expr) -> Result<(State<V>, bool)> {
        let mut env = match self {
            State::Bottom => return Ok((State::Bottom, false)),
            State::Concrete(env) => env,
        };

        let (value, tainted) = eval::eval_exp(&env, src)?;
        let value = match *src {
            Expr::Lval(Lval::Mem(_, _)) | Expr::BinOp(_, _, _) | Expr::UnOp(_, _) => {
                value.span_taint(eval::operand_taint(&env, src))
            }
            _ => value,
        };

        if value.is_bot() {
            return Ok((State::Bottom, tainted));
        }

        match *dst {
            Lval::Reg(ref register) => {
                env.insert(Dimension::Reg(register.clone()), value);
            }
            Lval::Slice(ref register, lo, hi) => {
                let previous = match env.get_register(register) {
                    Some(previous) => previous.clone(),
                    None => return Ok((State::Bottom, tainted)),
                };
                env.insert(
                    Dimension::Reg(register.clone()),
                    previous.combine(&value, lo, hi),
                );
            }
            Lval::Mem(ref address_expr, _) => {
                let (address_value, _) = eval::eval_exp(&env, address_expr)?;
                let addresses = match address_value.to_addresses() {
                    Ok(addresses) => addresses,
                    Err(Error(ErrorKind::EnumFailure, _)) => {
                        warn!("could not enumerate store addresses, forgetting the environment");
                        return Ok((State::Concrete(env).forget(), tainted));
                    }
                    Err(e) => return Err(e),
                };
                if addresses.is_empty() {
                    return Ok((State::Bottom, false));
                }
                if let [address] = addresses.as_slice() {
                    env.store(*address, &value, true, false)?;
                } else {
                    for address in addresses {
                        match env.store(address, &value, false, false) {
                            Ok(()) => {}
                            Err(Error(ErrorKind::Empty(_), _)) => {
                                return Ok((State::Bottom, false));
                            }
                            Err(e) => return Err(e),
                        }
                    }
                }
            }
        }

        Ok((State::Concrete(env), tainted))
    }

    /// Keep this state only if the comparison may hold, refining the
    /// left-hand register on an equality guard.
    pub fn compare(self, lhs: &Expr, op: CmpOp, rhs: &Expr) -> Result<(State<V>, bool)> {
        let mut env = match self {
            State::Bottom => return Ok((State::Bottom, false)),
            State::Concrete(env) => env,
        };

        let (lhs_value, lhs_tainted) = eval::eval_exp(&env, lhs)?;
        let (rhs_value, rhs_tainted) = eval::eval_exp(&env, rhs)?;
        if lhs_value.is_bot() || rhs_value.is_bot() {
            return Ok((State::Bottom, false));
        }

        if !V::compare(&lhs_value, op, &rhs_value)? {
            return Ok((State::Bottom, false));
        }

        if op == CmpOp::Eq {
            if let Expr::Lval(Lval::Reg(ref register)) = *lhs {
                let restricted = lhs_value.meet(&rhs_value);
                if restricted.is_bot() {
                    return Ok((State::Bottom, false));
                }
                env.insert(Dimension::Reg(register.clone()), restricted);
            }
        }

        Ok((State::Concrete(env), lhs_tainted || rhs_tainted))
    }

    /// Install a configured initial value in a register.
    pub fn set_register_from_config(
        self,
        register: &Register,
        region: Region,
        content: &Content,
        taint: Option<&TaintSpec>,
    ) -> Result<State<V>> {
        let mut env = match self {
            State::Bottom => return Ok(State::Bottom),
            State::Concrete(env) => env,
        };
        let value = V::of_config(region, content, register.bits())?;
        let value = V::taint_of_config(taint, register.bits(), value)?;
        env.insert(Dimension::Reg(register.clone()), value);
        Ok(State::Concrete(env))
    }

    /// Install a configured initial value in memory.
    ///
    /// `count` repetitions above one require a single-byte content and store
    /// a compressed run; a single installation writes the content at its
    /// natural width, big-endian when it is a byte string.
    pub fn set_memory_from_config(
        self,
        address: u64,
        region: Region,
        content: &Content,
        taint: Option<&TaintSpec>,
        count: u64,
        operand_sz: usize,
    ) -> Result<State<V>> {
        let mut env = match self {
            State::Bottom => return Ok(State::Bottom),
            State::Concrete(env) => env,
        };
        if count > 1 {
            if !content.is_byte() {
                panic!("Repeated memory init only works with bytes");
            }
            let value = V::of_config(region, content, 8)?;
            let value = V::taint_of_config(taint, 8, value)?;
            env.store_repeat_byte(address, &value, count)?;
        } else {
            let bits = content.size(operand_sz);
            let value = V::of_config(region, content, bits)?;
            let value = V::taint_of_config(taint, bits, value)?;
            env.store(address, &value, true, content.is_big_endian())?;
        }
        Ok(State::Concrete(env))
    }

    /// Apply a configured taint pattern to an existing register cell.
    pub fn taint_register_mask(
        self,
        register: &Register,
        taint: &TaintSpec,
    ) -> Result<State<V>> {
        let mut env = match self {
            State::Bottom => return Ok(State::Bottom),
            State::Concrete(env) => env,
        };
        let value = match env.get_register(register) {
            Some(value) => value.clone(),
            None => bail!(ErrorKind::NotFound(format!(
                "register {} has no cell to taint",
                register
            ))),
        };
        let value = V::taint_of_config(Some(taint), register.bits(), value)?;
        env.insert(Dimension::Reg(register.clone()), value);
        Ok(State::Concrete(env))
    }

    /// Apply a configured taint pattern to the memory byte at an address.
    pub fn taint_address_mask(self, address: u64, taint: &TaintSpec) -> Result<State<V>> {
        let mut env = match self {
            State::Bottom => return Ok(State::Bottom),
            State::Concrete(env) => env,
        };
        let found = env
            .find_addr(address)
            .map(|(dimension, value)| (dimension.clone(), value.clone()));
        let (dimension, value) = match found {
            Some(found) => found,
            None => bail!(ErrorKind::NotFound(format!(
                "address 0x{:X} has no cell to taint",
                address
            ))),
        };
        let value = V::taint_of_config(Some(taint), 8, value)?;
        if let Dimension::MemItv(lo, hi) = dimension {
            env.split_run(lo, hi, address);
        }
        env.insert(Dimension::Mem(address), value);
        Ok(State::Concrete(env))
    }
}

impl<V: Value> fmt::Display for State<V> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            State::Bottom => write!(f, "_"),
            State::Concrete(ref env) => {
                for (dimension, value) in env.iter() {
                    if value.is_tainted() {
                        writeln!(
                            f,
                            "{} = {}!{}",
                            dimension,
                            value.value_string(),
                            value.taint_string()
                        )?;
                    } else {
                        writeln!(f, "{} = {}", dimension, value.value_string())?;
                    }
                }
                Ok(())
            }
        }
    }
}

#[cfg(test)]
mod state_tests {
    use super::State;
    use crate::domain::env::Dimension;
    use crate::domain::{Content, Region, TaintSpec, TaintedConst, Value};
    use crate::il;
    use crate::il::{CmpOp, Expr, Lval};

    type TState = State<TaintedConst>;

    fn value(v: u64, bits: usize) -> TaintedConst {
        TaintedConst::of_word(&il::const_(v, bits))
    }

    fn with_register(name: &str, cell: TaintedConst) -> TState {
        let mut env = crate::domain::env::Env::new();
        env.insert(Dimension::Reg(il::reg(name, cell.bits())), cell);
        State::Concrete(env)
    }

    #[test]
    fn zero_fill_compresses_to_one_run() {
        let state: TState = TState::new(None);
        let state = state
            .set_memory_from_config(0x1000, Region::Global, &Content::concrete(0), None, 16, 32)
            .unwrap();

        let env = state.env().unwrap();
        assert_eq!(env.len(), 1);
        assert_eq!(
            *env.get(&Dimension::MemItv(0x1000, 0x1010)).unwrap(),
            value(0x00, 8)
        );
        assert_eq!(env.load(0x1005, 8, false).unwrap(), value(0x00, 8));
    }

    #[test]
    fn byte_store_splits_zero_fill() {
        let state: TState = TState::new(None);
        let state = state
            .set_memory_from_config(0x1000, Region::Global, &Content::concrete(0), None, 16, 32)
            .unwrap();

        let dst = Lval::Mem(Box::new(il::expr_const(0x1008, 32)), 8);
        let (state, tainted) = state.set(&dst, &il::expr_const(0xAB, 8)).unwrap();
        assert!(!tainted);

        let env = state.env().unwrap();
        assert_eq!(env.len(), 3);
        assert_eq!(
            *env.get(&Dimension::MemItv(0x1000, 0x1007)).unwrap(),
            value(0x00, 8)
        );
        assert_eq!(*env.get(&Dimension::Mem(0x1008)).unwrap(), value(0xAB, 8));
        assert_eq!(
            *env.get(&Dimension::MemItv(0x1009, 0x1010)).unwrap(),
            value(0x00, 8)
        );
    }

    #[test]
    fn repeated_init_requires_bytes() {
        let result = std::panic::catch_unwind(|| {
            let state: TState = TState::new(None);
            let _ = state.set_memory_from_config(
                0x1000,
                Region::Global,
                &Content::concrete(0x1234),
                None,
                16,
                32,
            );
        });
        assert!(result.is_err());
    }

    #[test]
    fn equality_guard_refines_register() {
        let eax = il::reg("eax", 32);
        let state = with_register("eax", TaintedConst::top(32));

        let guard_lhs = Expr::Lval(Lval::Reg(eax.clone()));
        let guard_rhs = il::expr_const(42, 32);
        let (state, _) = state.compare(&guard_lhs, CmpOp::Eq, &guard_rhs).unwrap();

        let env = state.env().unwrap();
        assert_eq!(
            env.get_register(&eax).unwrap().to_word().unwrap(),
            il::const_(42, 32)
        );
    }

    #[test]
    fn infeasible_guard_is_bottom() {
        let eax = il::reg("eax", 32);
        let state = with_register("eax", value(7, 32));

        let guard_lhs = Expr::Lval(Lval::Reg(eax));
        let (state, _) = state
            .compare(&guard_lhs, CmpOp::Eq, &il::expr_const(42, 32))
            .unwrap();
        assert!(state.is_bot());
    }

    #[test]
    fn set_to_register_and_back() {
        let eax = il::reg("eax", 32);
        let state: TState = TState::new(None);
        let (state, tainted) = state
            .set(&Lval::Reg(eax.clone()), &il::expr_const(0x1234, 32))
            .unwrap();
        assert!(!tainted);
        assert_eq!(
            state.env().unwrap().get_register(&eax).unwrap(),
            &value(0x1234, 32)
        );
    }

    #[test]
    fn set_slice_updates_bit_field() {
        let eax = il::reg("eax", 32);
        let state: TState = TState::new(None);
        let (state, _) = state
            .set(&Lval::Reg(eax.clone()), &il::expr_const(0x12345678, 32))
            .unwrap();
        let (state, _) = state
            .set(&Lval::Slice(eax.clone(), 8, 15), &il::expr_const(0xAB, 8))
            .unwrap();
        assert_eq!(
            state
                .env()
                .unwrap()
                .get_register(&eax)
                .unwrap()
                .to_word()
                .unwrap(),
            il::const_(0x1234AB78, 32)
        );
    }

    #[test]
    fn set_through_tainted_source_reports_taint() {
        let eax = il::reg("eax", 32);
        let ebx = il::reg("ebx", 32);
        let state = with_register("eax", value(7, 32).taint());
        let (state, tainted) = state
            .set(
                &Lval::Reg(ebx.clone()),
                &Expr::binop(
                    il::BinOp::Add,
                    Expr::Lval(Lval::Reg(eax)),
                    il::expr_const(1, 32),
                ),
            )
            .unwrap();
        assert!(tainted);
        assert!(state.env().unwrap().get_register(&ebx).unwrap().is_tainted());
    }

    #[test]
    fn lattice_properties() {
        let s1 = with_register("eax", value(1, 32));
        let s2 = with_register("eax", value(2, 32));

        assert!(s1.is_subset(&s1));
        assert!(TState::Bottom.is_subset(&s1));
        assert!(!s1.is_subset(&TState::Bottom));

        let joined = s1.clone().join(&s2);
        assert!(s1.is_subset(&joined));
        assert!(s2.is_subset(&joined));

        let met = s1.clone().meet(&s2);
        assert!(met.is_subset(&s1));
        assert!(met.is_subset(&s2));

        assert_eq!(TState::Bottom.join(&s1), s1);
        assert!(s1.clone().meet(&TState::Bottom).is_bot());
    }

    #[test]
    fn widen_stabilizes() {
        let eax = il::reg("eax", 32);
        let mut state = with_register("eax", value(0, 32));
        // f bumps the register to the next constant; widening must reach a
        // fixed point within a bounded number of steps
        for i in 1..8 {
            let next = with_register("eax", value(i, 32));
            let widened = state.clone().widen(&next);
            if widened == state {
                assert!(state
                    .env()
                    .unwrap()
                    .get_register(&eax)
                    .is_some());
                return;
            }
            state = widened;
        }
        let cell = state.env().unwrap().get_register(&eax).unwrap().clone();
        assert_eq!(cell, TaintedConst::top(32));
    }

    #[test]
    fn forget_keeps_dimensions() {
        let eax = il::reg("eax", 32);
        let state = with_register("eax", value(7, 32));
        let state = state.forget();
        assert_eq!(
            state.env().unwrap().get_register(&eax),
            Some(&TaintedConst::top(32))
        );
    }

    #[test]
    fn forget_lval_keeps_taint() {
        let eax = il::reg("eax", 32);
        let state = with_register("eax", value(7, 32).taint());
        let state = state.forget_lval(&Lval::Reg(eax.clone())).unwrap();
        let cell = state.env().unwrap().get_register(&eax).unwrap();
        assert!(cell.to_word().is_err());
        assert!(cell.is_tainted());
    }

    #[test]
    fn register_config_install() {
        let eax = il::reg("eax", 32);
        let state: TState = TState::new(None);
        let state = state
            .set_register_from_config(
                &eax,
                Region::Global,
                &Content::concrete(0xCAFE),
                Some(&TaintSpec::Tainted),
            )
            .unwrap();
        let cell = state.env().unwrap().get_register(&eax).unwrap();
        assert_eq!(cell.to_word().unwrap(), il::const_(0xCAFE, 32));
        assert!(cell.is_tainted());
    }

    #[test]
    fn taint_mask_on_existing_register() {
        let eax = il::reg("eax", 32);
        let state = with_register("eax", value(7, 32));
        let state = state
            .taint_register_mask(&eax, &TaintSpec::Mask(num_bigint::BigUint::from(0xFFu32)))
            .unwrap();
        assert!(state.env().unwrap().get_register(&eax).unwrap().is_tainted());
    }

    #[test]
    fn taint_mask_on_missing_register_is_not_found() {
        let eax = il::reg("eax", 32);
        let state: TState = TState::new(None);
        assert!(state.taint_register_mask(&eax, &TaintSpec::Tainted).is_err());
    }

    #[test]
    fn bytes_config_is_big_endian() {
        let state: TState = TState::new(None);
        let state = state
            .set_memory_from_config(
                0x2000,
                Region::Global,
                &Content::Bytes("DEADBEEF".to_string()),
                None,
                1,
                32,
            )
            .unwrap();
        let env = state.env().unwrap();
        assert_eq!(env.load(0x2000, 8, false).unwrap(), value(0xDE, 8));
        assert_eq!(env.load(0x2003, 8, false).unwrap(), value(0xEF, 8));
    }
}
