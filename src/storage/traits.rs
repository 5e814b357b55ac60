//! Abstract storage traits for conceptdb.
//!
//! These traits define the contract that statement, reason and external
//! reason backends must implement. The merge engine only talks to stores
//! through them.

use thiserror::Error;

use crate::reason::{EvidencePolarity, ExternalReason, Reason, ReasonId, ReasonRecordId};
use crate::statement::{IdentityKey, NewStatement, Statement, StatementId};

/// Errors that can occur during storage operations.
#[derive(Debug, Error)]
pub enum StorageError {
    /// Statement not found.
    #[error("Statement not found: {0}")]
    StatementNotFound(StatementId),

    /// Key already exists.
    #[error("Duplicate key: {0}")]
    DuplicateKey(String),

    /// The stored statement moved on since it was read.
    #[error("Version conflict on statement {id}: expected version {expected}, found {actual}")]
    VersionConflict {
        /// Statement being written.
        id: StatementId,
        /// Version the writer read.
        expected: u64,
        /// Version now stored.
        actual: u64,
    },

    /// Backend error.
    #[error("Storage backend error: {0}")]
    BackendError(String),
}

/// Storage trait for statements.
///
/// # Identity
/// At most one statement per [`IdentityKey`]. `create` rejects a second
/// one with `DuplicateKey`, which keeps merges from creating duplicates
/// even when their identity index has gone stale.
///
/// # Concurrency
/// `update` is optimistic: it succeeds only if the stored version equals
/// the version of the statement passed in. `revision` increases on every
/// successful write.
pub trait AssertionStore: Send + Sync {
    /// Creates a statement with empty evidence and returns its id.
    fn create(&self, fields: NewStatement) -> Result<StatementId, StorageError>;

    /// Get a statement by ID.
    fn get(&self, id: StatementId) -> Result<Option<Statement>, StorageError>;

    /// Replaces a statement, returning its new version.
    ///
    /// # Errors
    /// - `StatementNotFound`: the statement does not exist
    /// - `VersionConflict`: the statement was updated since it was read
    /// - `BackendError`: the identity key changed
    fn update(&self, statement: Statement) -> Result<u64, StorageError>;

    /// Find the statement with the given identity key.
    fn find_by_identity_key(&self, key: &IdentityKey) -> Result<Option<Statement>, StorageError>;

    /// Find statements matching a predicate, in creation order.
    fn find_by_predicate(
        &self,
        predicate: &dyn Fn(&Statement) -> bool,
    ) -> Result<Vec<Statement>, StorageError>;

    /// Find statements in a dataset, in creation order.
    fn find_by_dataset(&self, dataset: &str) -> Result<Vec<Statement>, StorageError> {
        self.find_by_predicate(&|s: &Statement| s.dataset == dataset)
    }

    /// All statements, in creation order.
    fn all(&self) -> Result<Vec<Statement>, StorageError>;

    /// Monotonic write counter.
    fn revision(&self) -> Result<u64, StorageError>;
}

/// Storage trait for reason records.
pub trait ReasonStore: Send + Sync {
    /// Insert a new record. Returns error if ID already exists.
    fn insert(&self, reason: Reason) -> Result<(), StorageError>;

    /// Get a record by ID.
    fn get(&self, id: ReasonRecordId) -> Result<Option<Reason>, StorageError>;

    /// Records attached to a statement, in insertion order.
    fn find_by_target(&self, target: StatementId) -> Result<Vec<Reason>, StorageError>;

    /// The record carrying exactly this `(target, factors, weight, polarity)` tuple, if any.
    fn find_matching(
        &self,
        target: StatementId,
        factors: &[ReasonId],
        weight: f32,
        polarity: EvidencePolarity,
    ) -> Result<Option<Reason>, StorageError>;

    /// All records, in insertion order.
    fn all(&self) -> Result<Vec<Reason>, StorageError>;

    /// Monotonic write counter.
    fn revision(&self) -> Result<u64, StorageError>;
}

/// Storage trait for external reason records.
///
/// Records are immutable once inserted.
pub trait ExternalReasonStore: Send + Sync {
    /// Insert a new record. Returns error if the path already exists.
    fn insert(&self, reason: ExternalReason) -> Result<(), StorageError>;

    /// Get a record by its `/data/...` path.
    fn get(&self, id: &str) -> Result<Option<ExternalReason>, StorageError>;

    /// All records, ordered by path.
    fn all(&self) -> Result<Vec<ExternalReason>, StorageError>;

    /// Inserts the record unless one exists under its path. Returns true if inserted.
    fn ensure(&self, reason: ExternalReason) -> Result<bool, StorageError> {
        if self.get(&reason.id)?.is_some() {
            return Ok(false);
        }
        match self.insert(reason) {
            Ok(()) => Ok(true),
            Err(StorageError::DuplicateKey(_)) => Ok(false),
            Err(e) => Err(e),
        }
    }
}
