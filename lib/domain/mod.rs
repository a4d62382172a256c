//! The unrelational abstract domain.
//!
//! This module implements the value domain of the abstract interpreter: a
//! mapping from dimensions (registers and memory bytes) to cell values drawn
//! from a pluggable abstraction.
//!
//! * The `value` module declares the cell-value trait the domain is a
//! functor over, and the region tags values carry.
//! * The `taint` module is the taint lattice shared by every instance.
//! * The `env` module is the ordered dimension map, with compressed runs for
//! constant-filled memory ranges.
//! * The `memory` module is the byte-granular access engine over the
//! environment, with strong/weak updates and read-through to the image
//! backing.
//! * The `eval` module evaluates expressions and branch guards, propagating
//! taint.
//! * The `state` module is the two-point lifted domain state, with the
//! lattice operations, assignment, comparison refinement, and configuration
//! injection the fixpoint engine drives.
//! * The `strings` module holds the bounded string/hex intrinsics.
//! * The `tainted` module is a concrete-plus-taint instance of the
//! cell-value trait.

pub mod config;
pub mod env;
pub mod eval;
pub mod memory;
pub mod state;
pub mod strings;
pub mod taint;
pub mod tainted;
pub mod value;

pub use self::config::{Content, TaintSpec};
pub use self::env::{Dimension, Env};
pub use self::state::State;
pub use self::strings::to_hex;
pub use self::taint::Taint;
pub use self::tainted::TaintedConst;
pub use self::value::{Region, Value};
