//! Storage traits and in-memory backends.
//!
//! A [`Stores`] handle bundles the three collections of one database and
//! is passed explicitly to every operation.

mod handle;
mod memory;
mod traits;

pub use handle::Stores;
pub use memory::{InMemoryAssertionStore, InMemoryExternalReasonStore, InMemoryReasonStore};
pub use traits::{AssertionStore, ExternalReasonStore, ReasonStore, StorageError};
