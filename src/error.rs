//! Error types for conceptdb.
//!
//! All errors in conceptdb are strongly typed using thiserror.
//! Evidence and merge errors carry the statement and reason identifiers
//! involved so a failed run can be audited.

use std::fmt;

use thiserror::Error;

use crate::evidence::ConsistencyViolation;
use crate::reason::{EvidencePolarity, ReasonId};
use crate::statement::StatementId;
use crate::storage::StorageError;

/// Validation errors that occur during input validation.
#[derive(Debug, Error)]
pub enum ValidationError {
    /// Dataset is empty or blank.
    #[error("Dataset cannot be empty")]
    EmptyDataset,

    /// Relation is empty or blank.
    #[error("Relation cannot be empty")]
    EmptyRelation,

    /// No arguments were given.
    #[error("Statement must have at least one argument")]
    EmptyArguments,

    /// Polarity outside -1, 0, 1.
    #[error("Polarity {value} is not one of -1, 0, 1")]
    InvalidPolarity {
        /// The rejected value.
        value: i64,
    },
}

/// Errors raised by evidence graphs and reason resolution.
#[derive(Debug, Error)]
pub enum EvidenceError {
    /// An evidence graph invariant does not hold. Never repaired automatically.
    #[error("Consistency violation: {0}")]
    Consistency(ConsistencyViolation),

    /// A supporting conjunction with no reasons.
    #[error("{polarity} evidence must contain at least one reason")]
    EmptyEvidence {
        /// Tree the conjunction was meant for.
        polarity: EvidencePolarity,
    },

    /// Reason id prefix is neither `/assertion/` nor `/data/`.
    #[error("Unknown reason kind: {id}")]
    UnknownReasonKind {
        /// The raw id.
        id: String,
    },

    /// Reason id has a known prefix but an unparsable body.
    #[error("Malformed reason id '{id}': {reason}")]
    MalformedReason {
        /// The raw id.
        id: String,
        /// What is wrong with it.
        reason: String,
    },

    /// Reason id is well formed but nothing exists under it.
    #[error("Reason does not resolve to an existing entity: {id}")]
    ReasonNotFound {
        /// The unresolved id.
        id: ReasonId,
    },

    /// Error attributed to the statement whose evidence raised it.
    #[error("Statement {statement}: {source}")]
    InStatement {
        /// Owning statement.
        statement: StatementId,
        /// Underlying error, never itself `InStatement`.
        #[source]
        source: Box<EvidenceError>,
    },

    /// Store failure while resolving a reason.
    #[error("Storage error during resolution: {0}")]
    Storage(#[from] StorageError),
}

impl EvidenceError {
    /// Attaches the owning statement to this error.
    ///
    /// Already-attributed errors are returned unchanged.
    #[must_use]
    pub fn in_statement(self, statement: StatementId) -> Self {
        match self {
            Self::InStatement { .. } => self,
            other => Self::InStatement {
                statement,
                source: Box::new(other),
            },
        }
    }

    /// Returns the innermost error, skipping statement attribution.
    #[must_use]
    pub fn root(&self) -> &Self {
        match self {
            Self::InStatement { source, .. } => source.root(),
            other => other,
        }
    }
}

/// Which way a merge pass copies statements.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    /// Left store is the source, right store is the target.
    LeftToRight,
    /// Right store is the source, left store is the target.
    RightToLeft,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::LeftToRight => write!(f, "left->right"),
            Self::RightToLeft => write!(f, "right->left"),
        }
    }
}

/// Errors that abort a merge direction.
///
/// Writes already applied by the failing direction stay committed; the
/// merge is safe to re-run.
#[derive(Debug, Error)]
pub enum MergeError {
    /// A store revision moved between scan and apply.
    #[error("{direction}: store '{store}' changed during merge (revision {expected} -> {actual})")]
    ConcurrentModification {
        /// Failing direction.
        direction: Direction,
        /// Name of the store that moved.
        store: String,
        /// Revision seen by the scan.
        expected: u64,
        /// Revision found before the first write.
        actual: u64,
    },

    /// A cited statement has no counterpart in the target store.
    #[error("{direction}: statement {statement} cites {reason}, which has no counterpart in the target store")]
    DanglingFactor {
        /// Failing direction.
        direction: Direction,
        /// Source statement carrying the reason.
        statement: StatementId,
        /// The untranslatable reason.
        reason: ReasonId,
    },

    /// Evidence could not be attached in the target store.
    #[error("{direction}: statement {statement}: {source}")]
    Evidence {
        /// Failing direction.
        direction: Direction,
        /// Target statement being written.
        statement: StatementId,
        /// Underlying error.
        #[source]
        source: EvidenceError,
    },

    /// Store failure during the direction.
    #[error("{direction}: {source}")]
    Storage {
        /// Failing direction.
        direction: Direction,
        /// Underlying error.
        #[source]
        source: StorageError,
    },
}

impl MergeError {
    /// Direction that failed.
    #[must_use]
    pub const fn direction(&self) -> Direction {
        match self {
            Self::ConcurrentModification { direction, .. }
            | Self::DanglingFactor { direction, .. }
            | Self::Evidence { direction, .. }
            | Self::Storage { direction, .. } => *direction,
        }
    }

    /// Returns true if re-running the merge may succeed without intervention.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::ConcurrentModification { .. }
                | Self::Storage {
                    source: StorageError::VersionConflict { .. },
                    ..
                }
        )
    }
}

/// Top-level error type for conceptdb.
#[derive(Debug, Error)]
pub enum ConceptError {
    /// Validation error.
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    /// Evidence error.
    #[error("Evidence error: {0}")]
    Evidence(#[from] EvidenceError),

    /// Storage error.
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    /// Merge error.
    #[error("Merge error: {0}")]
    Merge(#[from] MergeError),

    /// Merge configuration could not be read or parsed.
    #[error("Configuration error: {message}")]
    Config {
        /// What went wrong, including the file path when there is one.
        message: String,
    },
}

impl ConceptError {
    /// Creates a configuration error.
    #[must_use]
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Returns true if this is a validation error.
    #[must_use]
    pub const fn is_validation(&self) -> bool {
        matches!(self, Self::Validation(_))
    }

    /// Returns true if this error is retryable.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        match self {
            Self::Storage(StorageError::VersionConflict { .. }) => true,
            Self::Merge(e) => e.is_retryable(),
            _ => false,
        }
    }
}

/// Result type alias for conceptdb operations.
pub type ConceptResult<T> = Result<T, ConceptError>;
