#![recursion_limit = "128"]

//! Kestrel: an unrelational abstract domain for binary taint analysis.
//!
//! Kestrel implements the value domain of a forward abstract interpreter over
//! machine code. A quick synopsis of Kestrel's modules:
//!
//! * **domain** - The abstract environment mapping registers and memory bytes
//! to cell values, with lattice operations, expression evaluation, taint
//! propagation, and string/hex intrinsics.
//! * **il** - The assembly expression language handed to the domain by the
//! decoder.
//! * **memory** - The section map over a loaded binary image, used as a
//! read-through backing for otherwise-unset addresses.
//!
//! The domain is parametric in its cell-value abstraction: anything
//! implementing `domain::Value` can be plugged in at build time. A
//! concrete-plus-taint instance, `domain::TaintedConst`, is provided.
//!
//! ```
//! use kestrel::domain::{State, TaintedConst};
//! use kestrel::il;
//!
//! let state: State<TaintedConst> = State::new(None);
//! let eax = il::reg("eax", 32);
//! let (state, tainted) = state
//!     .set(&il::Lval::Reg(eax), &il::expr_const(42, 32))
//!     .unwrap();
//! assert!(!tainted);
//! assert!(!state.is_bot());
//! ```

#[macro_use]
extern crate error_chain;

pub mod domain;
pub mod il;
pub mod memory;

#[cfg(not(feature = "thread_safe"))]
use std::rc::Rc;
#[cfg(not(feature = "thread_safe"))]
pub type RC<T> = Rc<T>;

#[cfg(feature = "thread_safe")]
use std::sync::Arc;
#[cfg(feature = "thread_safe")]
pub type RC<T> = Arc<T>;

/// Kestrel Error types.
pub mod error {
    error_chain! {
        types {
            Error, ErrorKind, ResultExt, Result;
        }

        foreign_links {
            Io(::std::io::Error);
            Json(::serde_json::Error);
            ParseBigIntError(::num_bigint::ParseBigIntError);
            ParseIntError(::std::num::ParseIntError);
        }

        errors {
            Concretization(m: String) {
                description("A cell value could not be materialised")
                display("Concretization error: {}", m)
            }
            Empty(m: String) {
                description("An update would yield an infeasible state")
                display("Empty state: {}", m)
            }
            BotDeref {
                description("Dereference of an empty address set")
                display("Dereference of an empty address set")
            }
            EnumFailure {
                description("An address set could not be enumerated")
                display("Too many addresses in the concretization to enumerate")
            }
            NotFound(m: String) {
                description("A key or scan target was not found")
                display("Not found: {}", m)
            }
            Arithmetic(m: String) {
                description("Error in evaluation of arithmetic expression")
                display("Arithmetic expression evaluation error: {}", m)
            }
        }
    }
}

pub use crate::error::*;
