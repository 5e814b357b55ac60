//! In-memory storage backend.
//!
//! This module provides thread-safe in-memory implementations of the storage traits.
//! It is intended for embedded usage, tests, and as a reference implementation.

use std::collections::{BTreeMap, HashMap};
use std::sync::RwLock;

use crate::reason::{EvidencePolarity, ExternalReason, Reason, ReasonId, ReasonRecordId};
use crate::statement::{IdentityKey, NewStatement, Statement, StatementId};
use crate::storage::traits::{AssertionStore, ExternalReasonStore, ReasonStore, StorageError};

fn lock_err(context: &'static str) -> StorageError {
    StorageError::BackendError(format!("poisoned lock: {context}"))
}

#[derive(Debug, Default)]
struct AssertionState {
    by_id: HashMap<StatementId, Statement>,
    by_key: HashMap<IdentityKey, StatementId>,
    order: Vec<StatementId>,
    revision: u64,
}

impl AssertionState {
    fn ordered(&self, predicate: &dyn Fn(&Statement) -> bool) -> Vec<Statement> {
        self.order
            .iter()
            .filter_map(|id| self.by_id.get(id))
            .filter(|s| predicate(s))
            .cloned()
            .collect()
    }
}

/// In-memory [`AssertionStore`].
#[derive(Debug, Default)]
pub struct InMemoryAssertionStore {
    state: RwLock<AssertionState>,
}

impl InMemoryAssertionStore {
    /// Create a new empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl AssertionStore for InMemoryAssertionStore {
    fn create(&self, fields: NewStatement) -> Result<StatementId, StorageError> {
        let statement = Statement::new(fields);
        let key = statement.identity_key();

        let mut state = self.state.write().map_err(|_| lock_err("assertion.create"))?;
        if let Some(existing) = state.by_key.get(&key) {
            return Err(StorageError::DuplicateKey(format!("{key} ({existing})")));
        }

        let id = statement.id;
        state.by_key.insert(key, id);
        state.order.push(id);
        state.by_id.insert(id, statement);
        state.revision += 1;
        Ok(id)
    }

    fn get(&self, id: StatementId) -> Result<Option<Statement>, StorageError> {
        let state = self.state.read().map_err(|_| lock_err("assertion.get"))?;
        Ok(state.by_id.get(&id).cloned())
    }

    fn update(&self, mut statement: Statement) -> Result<u64, StorageError> {
        let mut state = self.state.write().map_err(|_| lock_err("assertion.update"))?;
        let prev = state
            .by_id
            .get(&statement.id)
            .ok_or(StorageError::StatementNotFound(statement.id))?;

        if prev.version != statement.version {
            return Err(StorageError::VersionConflict {
                id: statement.id,
                expected: statement.version,
                actual: prev.version,
            });
        }
        if prev.identity_key() != statement.identity_key() {
            return Err(StorageError::BackendError(format!(
                "identity key of statement {} is immutable",
                statement.id
            )));
        }

        statement.version += 1;
        let version = statement.version;
        state.by_id.insert(statement.id, statement);
        state.revision += 1;
        Ok(version)
    }

    fn find_by_identity_key(&self, key: &IdentityKey) -> Result<Option<Statement>, StorageError> {
        let state = self
            .state
            .read()
            .map_err(|_| lock_err("assertion.find_by_identity_key"))?;
        Ok(state
            .by_key
            .get(key)
            .and_then(|id| state.by_id.get(id))
            .cloned())
    }

    fn find_by_predicate(
        &self,
        predicate: &dyn Fn(&Statement) -> bool,
    ) -> Result<Vec<Statement>, StorageError> {
        let state = self
            .state
            .read()
            .map_err(|_| lock_err("assertion.find_by_predicate"))?;
        Ok(state.ordered(predicate))
    }

    fn all(&self) -> Result<Vec<Statement>, StorageError> {
        let state = self.state.read().map_err(|_| lock_err("assertion.all"))?;
        Ok(state.ordered(&|_| true))
    }

    fn revision(&self) -> Result<u64, StorageError> {
        let state = self.state.read().map_err(|_| lock_err("assertion.revision"))?;
        Ok(state.revision)
    }
}

#[derive(Debug, Default)]
struct ReasonState {
    by_id: HashMap<ReasonRecordId, Reason>,
    by_target: HashMap<StatementId, Vec<ReasonRecordId>>,
    order: Vec<ReasonRecordId>,
    revision: u64,
}

/// In-memory [`ReasonStore`].
#[derive(Debug, Default)]
pub struct InMemoryReasonStore {
    state: RwLock<ReasonState>,
}

impl InMemoryReasonStore {
    /// Create a new empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl ReasonStore for InMemoryReasonStore {
    fn insert(&self, reason: Reason) -> Result<(), StorageError> {
        let mut state = self.state.write().map_err(|_| lock_err("reason.insert"))?;
        if state.by_id.contains_key(&reason.id) {
            return Err(StorageError::DuplicateKey(reason.id.to_string()));
        }

        state.by_target.entry(reason.target).or_default().push(reason.id);
        state.order.push(reason.id);
        state.by_id.insert(reason.id, reason);
        state.revision += 1;
        Ok(())
    }

    fn get(&self, id: ReasonRecordId) -> Result<Option<Reason>, StorageError> {
        let state = self.state.read().map_err(|_| lock_err("reason.get"))?;
        Ok(state.by_id.get(&id).cloned())
    }

    fn find_by_target(&self, target: StatementId) -> Result<Vec<Reason>, StorageError> {
        let state = self
            .state
            .read()
            .map_err(|_| lock_err("reason.find_by_target"))?;
        let Some(ids) = state.by_target.get(&target) else {
            return Ok(Vec::new());
        };
        Ok(ids.iter().filter_map(|id| state.by_id.get(id)).cloned().collect())
    }

    fn find_matching(
        &self,
        target: StatementId,
        factors: &[ReasonId],
        weight: f32,
        polarity: EvidencePolarity,
    ) -> Result<Option<Reason>, StorageError> {
        let state = self
            .state
            .read()
            .map_err(|_| lock_err("reason.find_matching"))?;
        let Some(ids) = state.by_target.get(&target) else {
            return Ok(None);
        };
        Ok(ids
            .iter()
            .filter_map(|id| state.by_id.get(id))
            .find(|r| r.matches(target, factors, weight, polarity))
            .cloned())
    }

    fn all(&self) -> Result<Vec<Reason>, StorageError> {
        let state = self.state.read().map_err(|_| lock_err("reason.all"))?;
        Ok(state
            .order
            .iter()
            .filter_map(|id| state.by_id.get(id))
            .cloned()
            .collect())
    }

    fn revision(&self) -> Result<u64, StorageError> {
        let state = self.state.read().map_err(|_| lock_err("reason.revision"))?;
        Ok(state.revision)
    }
}

/// In-memory [`ExternalReasonStore`].
#[derive(Debug, Default)]
pub struct InMemoryExternalReasonStore {
    state: RwLock<BTreeMap<String, ExternalReason>>,
}

impl InMemoryExternalReasonStore {
    /// Create a new empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl ExternalReasonStore for InMemoryExternalReasonStore {
    fn insert(&self, reason: ExternalReason) -> Result<(), StorageError> {
        let mut state = self.state.write().map_err(|_| lock_err("external.insert"))?;
        if state.contains_key(&reason.id) {
            return Err(StorageError::DuplicateKey(reason.id));
        }
        state.insert(reason.id.clone(), reason);
        Ok(())
    }

    fn get(&self, id: &str) -> Result<Option<ExternalReason>, StorageError> {
        let state = self.state.read().map_err(|_| lock_err("external.get"))?;
        Ok(state.get(id).cloned())
    }

    fn all(&self) -> Result<Vec<ExternalReason>, StorageError> {
        let state = self.state.read().map_err(|_| lock_err("external.all"))?;
        Ok(state.values().cloned().collect())
    }
}
