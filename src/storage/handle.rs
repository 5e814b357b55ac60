//! Explicit store handles.

use std::fmt;
use std::sync::Arc;

use crate::resolver::StoreResolver;
use crate::storage::memory::{
    InMemoryAssertionStore, InMemoryExternalReasonStore, InMemoryReasonStore,
};
use crate::storage::traits::{AssertionStore, ExternalReasonStore, ReasonStore, StorageError};

/// The collections of one statement database.
#[derive(Clone)]
pub struct Stores {
    name: String,
    /// Statements.
    pub assertions: Arc<dyn AssertionStore>,
    /// Reason records.
    pub reasons: Arc<dyn ReasonStore>,
    /// External reasons.
    pub externals: Arc<dyn ExternalReasonStore>,
}

impl Stores {
    /// Bundles existing collections under a store name.
    #[must_use]
    pub fn new(
        name: impl Into<String>,
        assertions: Arc<dyn AssertionStore>,
        reasons: Arc<dyn ReasonStore>,
        externals: Arc<dyn ExternalReasonStore>,
    ) -> Self {
        Self {
            name: name.into(),
            assertions,
            reasons,
            externals,
        }
    }

    /// A fresh, empty in-memory database.
    #[must_use]
    pub fn in_memory(name: impl Into<String>) -> Self {
        Self::new(
            name,
            Arc::new(InMemoryAssertionStore::new()),
            Arc::new(InMemoryReasonStore::new()),
            Arc::new(InMemoryExternalReasonStore::new()),
        )
    }

    /// Name used in logs and errors.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Resolver over this database's statements and external reasons.
    #[must_use]
    pub fn resolver(&self) -> StoreResolver<'_> {
        StoreResolver::new(self.assertions.as_ref(), self.externals.as_ref())
    }

    /// Combined revision of the statement and reason collections.
    ///
    /// # Errors
    ///
    /// Propagates backend errors.
    pub fn revision(&self) -> Result<(u64, u64), StorageError> {
        Ok((self.assertions.revision()?, self.reasons.revision()?))
    }
}

impl fmt::Debug for Stores {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Stores").field("name", &self.name).finish_non_exhaustive()
    }
}
