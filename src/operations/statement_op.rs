//! Statement lookup, creation and validation.

use crate::confidence::{ConfidenceConfig, RecursiveEvaluator};
use crate::error::EvidenceError;
use crate::resolver::ReasonResolver;
use crate::statement::{NewStatement, Statement, StatementId};
use crate::storage::{StorageError, Stores};

/// Returns the statement with the identity key of `fields`, creating it if absent.
///
/// A created statement starts with empty evidence and confidence 0.
///
/// # Errors
///
/// Propagates storage errors.
pub fn make_statement(stores: &Stores, fields: NewStatement) -> Result<Statement, StorageError> {
    let key = fields.identity_key();
    if let Some(existing) = stores.assertions.find_by_identity_key(&key)? {
        return Ok(existing);
    }

    let id = match stores.assertions.create(fields) {
        Ok(id) => id,
        // Lost a race with another writer; theirs is the canonical copy.
        Err(StorageError::DuplicateKey(_)) => {
            return stores
                .assertions
                .find_by_identity_key(&key)?
                .ok_or_else(|| StorageError::BackendError(format!("identity key {key} vanished")));
        }
        Err(e) => return Err(e),
    };

    tracing::debug!(store = stores.name(), statement = %id, key = %key, "statement created");
    stores.assertions.get(id)?.ok_or(StorageError::StatementNotFound(id))
}

/// Validates a stored statement against its store.
///
/// # Errors
///
/// Returns the first violated invariant, or a storage `StatementNotFound`
/// if the statement does not exist.
pub fn check_statement(stores: &Stores, id: StatementId) -> Result<(), EvidenceError> {
    let statement = stores
        .assertions
        .get(id)?
        .ok_or(StorageError::StatementNotFound(id))?;
    statement.check_consistency(&stores.resolver())
}

/// Recomputes a statement's confidence through its statement reasons and stores it.
///
/// Returns the new score.
///
/// # Errors
///
/// Propagates resolution errors and `VersionConflict` if the statement
/// changed while it was being evaluated.
pub fn rescore_statement(
    stores: &Stores,
    id: StatementId,
    config: ConfidenceConfig,
) -> Result<f32, EvidenceError> {
    let resolver = stores.resolver();
    let mut statement = resolver.statement(id)?;
    let score = RecursiveEvaluator::new(&resolver, config).evaluate(id)?;
    if statement.evidence.confidence_score().to_bits() != score.to_bits() {
        statement.evidence.set_confidence_score(score);
        stores.assertions.update(statement)?;
    }
    Ok(score)
}
