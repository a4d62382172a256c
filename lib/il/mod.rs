//! The assembly expression language consumed by the abstract domain.

pub mod expression;
pub mod register;
pub mod word;

pub use self::expression::*;
pub use self::register::*;
pub use self::word::*;

/// A convenience function to create a new word.
///
/// This is the preferred way to create a `Word`.
pub fn const_(value: u64, bits: usize) -> Word {
    Word::new(value, bits)
}

/// A convenience function to create a new constant expression.
pub fn expr_const(value: u64, bits: usize) -> Expr {
    Expr::Const(Word::new(value, bits))
}

/// A convenience function to create a new register.
pub fn reg<S>(name: S, bits: usize) -> Register
where
    S: Into<String>,
{
    Register::new(name, bits)
}

/// A convenience function to create a whole-register read expression.
pub fn expr_reg<S>(name: S, bits: usize) -> Expr
where
    S: Into<String>,
{
    Expr::Lval(Lval::Reg(Register::new(name, bits)))
}
