//! A `Register` is a named CPU register of fixed width.

use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Clone, Debug, Deserialize, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
pub struct Register {
    name: String,
    bits: usize,
    stack_pointer: bool,
}

impl Register {
    /// Create a new `Register` with the given name and bitness.
    pub fn new<S>(name: S, bits: usize) -> Register
    where
        S: Into<String>,
    {
        Register {
            name: name.into(),
            bits,
            stack_pointer: false,
        }
    }

    /// Create the stack-pointer `Register` for an architecture.
    pub fn stack_pointer<S>(name: S, bits: usize) -> Register
    where
        S: Into<String>,
    {
        Register {
            name: name.into(),
            bits,
            stack_pointer: true,
        }
    }

    /// Gets the name of the `Register`.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Gets the bitness of the `Register`.
    pub fn bits(&self) -> usize {
        self.bits
    }

    /// True if this register is the architecture's stack pointer.
    pub fn is_stack_pointer(&self) -> bool {
        self.stack_pointer
    }
}

impl fmt::Display for Register {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}:{}", self.name, self.bits)
    }
}
