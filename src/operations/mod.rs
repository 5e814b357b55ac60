//! Store-level operations.
//!
//! These functions take an explicit [`Stores`](crate::storage::Stores)
//! handle, read through its traits and write back with optimistic version
//! checks.

mod evidence_op;
mod statement_op;

pub use evidence_op::{add_evidence, justify, Justified};
pub use statement_op::{check_statement, make_statement, rescore_statement};
