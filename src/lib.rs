//! # conceptdb - Statements, Evidence and Store Reconciliation
//!
//! conceptdb keeps a graph of statements about concepts. Every statement
//! carries probabilistic evidence for and against it, and two independently
//! grown stores can be merged into a deduplicated union.
//!
//! ## Core Concepts
//!
//! - **Statement**: A claim `(dataset, relation, arguments, polarity, context)`
//! - **Reason**: A reference to evidence, either another statement or an external record
//! - **EvidenceGraph**: Support and opposition as disjunctions of weighted conjunctions
//! - **Merge**: Reconciliation of two stores by statement identity
//!
//! ## Usage
//!
//! ```rust,ignore
//! use conceptdb::{justify, make_statement, merge, EvidencePolarity, ExternalReason, NewStatement, Stores};
//!
//! let left = Stores::in_memory("left");
//! let alice = ExternalReason::contributor("/data/test", "alice")?;
//! left.externals.insert(alice.clone())?;
//!
//! let dog = make_statement(
//!     &left,
//!     NewStatement::builder()
//!         .dataset("/data/test")
//!         .relation("/rel/IsA")
//!         .arguments(["/c/dog", "/c/animal"])
//!         .build()?,
//! )?;
//! justify(&left, dog.id, EvidencePolarity::Support, [&alice], 0.9)?;
//!
//! let right = Stores::in_memory("right");
//! let report = merge(&left, &right)?;
//! assert_eq!(report.left_to_right.created, 1);
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

// Core types
pub mod confidence;
pub mod error;
pub mod evidence;
pub mod reason;
pub mod resolver;
pub mod statement;

// Storage, operations and reconciliation
pub mod merge;
pub mod operations;
pub mod snapshot;
pub mod storage;

// Re-export primary types at crate root for convenience
pub use confidence::{ConfidenceConfig, ConfidenceEngine, RecursiveEvaluator};
pub use error::{
    ConceptError, ConceptResult, Direction, EvidenceError, MergeError, ValidationError,
};
pub use evidence::{ConjunctionUpdate, ConsistencyViolation, EvidenceGraph, EvidenceTree};
pub use reason::{
    EvidencePolarity, ExternalReason, Reason, ReasonId, ReasonRecordId, ReasonRef, WeightedReason,
};
pub use resolver::{ReasonResolver, ResolvedReason, StaticResolver, StoreResolver};
pub use statement::{
    Expression, IdentityKey, NewStatement, Polarity, Statement, StatementBuilder, StatementId,
};

pub use merge::{
    merge, merge_dataset, DirectionReport, IndexStrategy, MergeConfig, MergeEngine, MergeReport,
};
pub use operations::{
    add_evidence, check_statement, justify, make_statement, rescore_statement, Justified,
};
pub use snapshot::{SnapshotDiff, StoreSnapshot};
pub use storage::{AssertionStore, ExternalReasonStore, ReasonStore, StorageError, Stores};
