//! The read-through image backing for the abstract domain.
//!
//! When the domain is asked for a memory byte it has no cell for, it falls
//! back to the section map in this module. Cells the domain has written
//! always shadow the backing.

pub mod backing;
