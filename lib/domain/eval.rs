//! Recursive evaluation of expressions over an environment.
//!
//! Evaluation produces a cell value together with a taint bit recording
//! whether any tainted cell fed the result. Boolean expressions evaluate to
//! a feasibility bit under an expected truth value, which is what the
//! conditional refinement and ternary selection build on.

use crate::domain::env::Env;
use crate::domain::{Content, Region, Taint, Value};
use crate::error::*;
use crate::il;
use crate::il::{BinOp, BoolExpr, Expr, Lval};
use log::trace;

/// Evaluate an expression to a cell value and its taint bit.
pub fn eval_exp<V>(env: &Env<V>, expr: &Expr) -> Result<(V, bool)>
where
    V: Value,
{
    match *expr {
        Expr::Const(ref word) => Ok((V::of_word(word), false)),

        Expr::Lval(ref lval) => eval_lval(env, lval),

        Expr::BinOp(op, ref lhs, ref rhs) => {
            // Zeroing a register against itself is an idiom, not a read: the
            // result is untainted whatever the register held. Zeroing the
            // stack pointer keeps its region.
            if op == BinOp::Xor {
                if let (Expr::Lval(Lval::Reg(ref lreg)), Expr::Lval(Lval::Reg(ref rreg))) =
                    (&**lhs, &**rhs)
                {
                    if lreg == rreg {
                        let value = if lreg.is_stack_pointer() {
                            V::of_config(Region::Stack, &Content::concrete(0), lreg.bits())?
                        } else {
                            V::of_word(&il::const_(0, lreg.bits())).untaint()
                        };
                        return Ok((value, false));
                    }
                }
            }

            let (lhs_value, lhs_tainted) = eval_exp(env, lhs)?;
            let (rhs_value, rhs_tainted) = eval_exp(env, rhs)?;
            let value = V::binary(op, &lhs_value, &rhs_value)?;
            let tainted = lhs_tainted || rhs_tainted || value.is_tainted();
            Ok((value, tainted))
        }

        Expr::UnOp(op, ref rhs) => {
            let (rhs_value, rhs_tainted) = eval_exp(env, rhs)?;
            let value = V::unary(op, &rhs_value)?;
            let tainted = rhs_tainted || value.is_tainted();
            Ok((value, tainted))
        }

        Expr::TernOp(ref cond, ref then, ref otherwise) => {
            let (feasible_true, tainted_true) = eval_bexp(env, cond, true)?;
            let (feasible_false, tainted_false) = eval_bexp(env, cond, false)?;

            let (value, tainted) = match (feasible_true, feasible_false) {
                (true, true) => {
                    let (then_value, then_tainted) = eval_exp(env, then)?;
                    let (else_value, else_tainted) = eval_exp(env, otherwise)?;
                    (then_value.join(&else_value), then_tainted || else_tainted)
                }
                (true, false) => eval_exp(env, then)?,
                (false, true) => eval_exp(env, otherwise)?,
                (false, false) => (V::bot(then.bits()), false),
            };

            let tainted = tainted || tainted_true || tainted_false;
            if tainted {
                Ok((value.taint(), true))
            } else {
                Ok((value, false))
            }
        }
    }
}

/// Evaluate a cell read.
fn eval_lval<V>(env: &Env<V>, lval: &Lval) -> Result<(V, bool)>
where
    V: Value,
{
    match *lval {
        Lval::Reg(ref register) => match env.get_register(register) {
            Some(value) => Ok((value.clone(), value.is_tainted())),
            None => Ok((V::bot(register.bits()), false)),
        },

        Lval::Slice(ref register, lo, hi) => match env.get_register(register) {
            Some(value) => Ok((value.extract(lo, hi), value.is_tainted())),
            None => Ok((V::bot(hi - lo + 1), false)),
        },

        Lval::Mem(ref address_expr, bits) => {
            let (address_value, address_tainted) = eval_exp(env, address_expr)?;

            let addresses = match address_value.to_addresses() {
                Ok(addresses) => addresses,
                Err(Error(ErrorKind::EnumFailure, _)) => {
                    trace!("could not enumerate load addresses, degrading to top");
                    return Ok((V::top(bits), true));
                }
                Err(e) => return Err(e),
            };
            if addresses.is_empty() {
                bail!(ErrorKind::BotDeref);
            }

            let mut tainted = address_tainted;
            let mut result: Option<V> = None;
            for address in addresses {
                let value = match env.load(address, bits, false) {
                    Ok(value) => value,
                    Err(_) => bail!(ErrorKind::BotDeref),
                };
                tainted = tainted || value.is_tainted();
                result = Some(match result {
                    Some(accumulated) => accumulated.join(&value),
                    None => value,
                });
            }

            let value = result.expect("non-empty address set produced no value");
            if value.is_bot() {
                bail!(ErrorKind::BotDeref);
            }
            Ok((value, tainted))
        }
    }
}

/// Evaluate a boolean expression against an expected truth value.
///
/// Returns whether the expected outcome is feasible in the environment, and
/// whether any tainted cell was read deciding it. Negation flips the
/// expected value; conjunction and disjunction dualize under it.
pub fn eval_bexp<V>(env: &Env<V>, expr: &BoolExpr, expected: bool) -> Result<(bool, bool)>
where
    V: Value,
{
    match *expr {
        BoolExpr::Const(value) => Ok((value == expected, false)),

        BoolExpr::Not(ref rhs) => eval_bexp(env, rhs, !expected),

        BoolExpr::And(ref lhs, ref rhs) => {
            let (lhs_feasible, lhs_tainted) = eval_bexp(env, lhs, expected)?;
            let (rhs_feasible, rhs_tainted) = eval_bexp(env, rhs, expected)?;
            let feasible = if expected {
                lhs_feasible && rhs_feasible
            } else {
                lhs_feasible || rhs_feasible
            };
            Ok((feasible, lhs_tainted || rhs_tainted))
        }

        BoolExpr::Or(ref lhs, ref rhs) => {
            let (lhs_feasible, lhs_tainted) = eval_bexp(env, lhs, expected)?;
            let (rhs_feasible, rhs_tainted) = eval_bexp(env, rhs, expected)?;
            let feasible = if expected {
                lhs_feasible || rhs_feasible
            } else {
                lhs_feasible && rhs_feasible
            };
            Ok((feasible, lhs_tainted || rhs_tainted))
        }

        BoolExpr::Cmp(op, ref lhs, ref rhs) => {
            let (lhs_value, lhs_tainted) = eval_exp(env, lhs)?;
            let (rhs_value, rhs_tainted) = eval_exp(env, rhs)?;
            let tainted = lhs_tainted || rhs_tainted;
            if lhs_value.is_bot() || rhs_value.is_bot() {
                return Ok((false, tainted));
            }
            let op = if expected { op } else { op.invert() };
            Ok((V::compare(&lhs_value, op, &rhs_value)?, tainted))
        }
    }
}

/// The taint shared by the cells an expression reads: the greatest lower
/// bound over its register and memory operands. Constants contribute
/// nothing.
pub(crate) fn operand_taint<V>(env: &Env<V>, expr: &Expr) -> Taint
where
    V: Value,
{
    let mut taints = Vec::new();
    collect_operand_taints(env, expr, &mut taints);
    match taints.split_first() {
        Some((first, rest)) => rest.iter().fold(*first, |acc, taint| acc.glb(*taint)),
        None => Taint::Untainted,
    }
}

fn collect_operand_taints<V>(env: &Env<V>, expr: &Expr, taints: &mut Vec<Taint>)
where
    V: Value,
{
    match *expr {
        Expr::Const(_) => {}
        Expr::Lval(ref lval) => match *lval {
            Lval::Reg(ref register) | Lval::Slice(ref register, _, _) => {
                let taint = env
                    .get_register(register)
                    .map(|value| value.minimal_taint())
                    .unwrap_or(Taint::Untainted);
                taints.push(taint);
            }
            Lval::Mem(_, _) => {
                let taint = match eval_lval(env, lval) {
                    Ok((value, _)) => value.minimal_taint(),
                    Err(_) => Taint::Untainted,
                };
                taints.push(taint);
            }
        },
        Expr::BinOp(_, ref lhs, ref rhs) => {
            collect_operand_taints(env, lhs, taints);
            collect_operand_taints(env, rhs, taints);
        }
        Expr::UnOp(_, ref rhs) => collect_operand_taints(env, rhs, taints),
        Expr::TernOp(_, ref then, ref otherwise) => {
            collect_operand_taints(env, then, taints);
            collect_operand_taints(env, otherwise, taints);
        }
    }
}
