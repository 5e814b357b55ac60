//! Reason resolution.
//!
//! Resolves a parsed [`ReasonId`] to the entity it names: a statement in
//! the owning assertion store, or an external reason record. Resolution is
//! a pure read.

use std::collections::HashMap;

use chrono::Utc;

use crate::error::EvidenceError;
use crate::reason::{ExternalReason, ReasonId};
use crate::statement::{Statement, StatementId};
use crate::storage::{AssertionStore, ExternalReasonStore};

/// The entity a reason id names.
#[derive(Debug, Clone)]
pub enum ResolvedReason {
    /// A stored statement.
    Statement(Statement),
    /// An external provenance record.
    External(ExternalReason),
}

impl ResolvedReason {
    /// Confidence this reason lends: the stored score of a statement, or
    /// the fixed confidence of an external record.
    #[must_use]
    pub fn confidence(&self) -> f32 {
        match self {
            Self::Statement(s) => s.confidence(),
            Self::External(e) => e.confidence(),
        }
    }

    /// Id the entity is cited by.
    #[must_use]
    pub fn reason_id(&self) -> ReasonId {
        match self {
            Self::Statement(s) => s.reason_id(),
            Self::External(e) => e.reason_id(),
        }
    }
}

/// Resolves reason ids to entities.
pub trait ReasonResolver {
    /// Resolves a parsed reason id.
    ///
    /// # Errors
    ///
    /// Returns `ReasonNotFound` if nothing exists under the id.
    fn resolve(&self, id: &ReasonId) -> Result<ResolvedReason, EvidenceError>;

    /// Parses and resolves a raw reason id.
    ///
    /// # Errors
    ///
    /// Returns `UnknownReasonKind` for ids outside the known namespaces.
    fn resolve_str(&self, raw: &str) -> Result<ResolvedReason, EvidenceError> {
        self.resolve(&ReasonId::parse(raw)?)
    }

    /// Confidence of the named reason.
    ///
    /// # Errors
    ///
    /// Propagates resolution errors.
    fn confidence(&self, id: &ReasonId) -> Result<f32, EvidenceError> {
        Ok(self.resolve(id)?.confidence())
    }

    /// Fetches a statement through the resolver.
    ///
    /// # Errors
    ///
    /// Returns `ReasonNotFound` if the statement does not exist.
    fn statement(&self, id: StatementId) -> Result<Statement, EvidenceError> {
        let reason = ReasonId::Statement(id);
        match self.resolve(&reason)? {
            ResolvedReason::Statement(s) => Ok(s),
            ResolvedReason::External(_) => Err(EvidenceError::ReasonNotFound { id: reason }),
        }
    }
}

/// Resolver backed by one store's assertion and external-reason collections.
pub struct StoreResolver<'a> {
    assertions: &'a dyn AssertionStore,
    externals: &'a dyn ExternalReasonStore,
}

impl<'a> StoreResolver<'a> {
    /// Resolver over one statement collection and one external collection.
    #[must_use]
    pub fn new(assertions: &'a dyn AssertionStore, externals: &'a dyn ExternalReasonStore) -> Self {
        Self {
            assertions,
            externals,
        }
    }
}

impl ReasonResolver for StoreResolver<'_> {
    fn resolve(&self, id: &ReasonId) -> Result<ResolvedReason, EvidenceError> {
        let found = match id {
            ReasonId::Statement(sid) => self.assertions.get(*sid)?.map(ResolvedReason::Statement),
            ReasonId::External(path) => self.externals.get(path)?.map(ResolvedReason::External),
        };
        found.ok_or_else(|| EvidenceError::ReasonNotFound { id: id.clone() })
    }
}

/// Resolver over a fixed set of entities, for embedding and tests.
#[derive(Debug, Clone, Default)]
pub struct StaticResolver {
    statements: HashMap<StatementId, Statement>,
    externals: HashMap<String, ExternalReason>,
}

impl StaticResolver {
    /// Empty resolver.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds or replaces a statement.
    pub fn add_statement(&mut self, statement: Statement) {
        self.statements.insert(statement.id, statement);
    }

    /// Registers an external reason under `path`.
    pub fn add_external(&mut self, path: impl Into<String>) {
        let id = path.into();
        self.externals.insert(
            id.clone(),
            ExternalReason {
                id,
                description: None,
                created_at: Utc::now(),
            },
        );
    }
}

impl ReasonResolver for StaticResolver {
    fn resolve(&self, id: &ReasonId) -> Result<ResolvedReason, EvidenceError> {
        let found = match id {
            ReasonId::Statement(sid) => self.statements.get(sid).cloned().map(ResolvedReason::Statement),
            ReasonId::External(path) => self.externals.get(path).cloned().map(ResolvedReason::External),
        };
        found.ok_or_else(|| EvidenceError::ReasonNotFound { id: id.clone() })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::storage::{InMemoryAssertionStore, InMemoryExternalReasonStore};
    use crate::statement::NewStatement;

    #[test]
    fn store_resolver_dispatches_by_kind() {
        let assertions = InMemoryAssertionStore::new();
        let externals = InMemoryExternalReasonStore::new();
        externals
            .insert(ExternalReason::contributor("/data/test", "alice").unwrap())
            .unwrap();
        let id = assertions
            .create(
                NewStatement::builder()
                    .dataset("/data/test")
                    .relation("/rel/IsA")
                    .arguments(["/c/dog", "/c/animal"])
                    .build()
                    .unwrap(),
            )
            .unwrap();

        let resolver = StoreResolver::new(&assertions, &externals);
        let resolved = resolver.resolve_str(&format!("/assertion/{id}")).unwrap();
        assert!(matches!(resolved, ResolvedReason::Statement(ref s) if s.id == id));
        assert_eq!(resolved.confidence(), 0.0);

        let resolved = resolver.resolve_str("/data/test/contributor/alice").unwrap();
        assert_eq!(resolved.confidence(), 1.0);
        assert_eq!(resolver.statement(id).unwrap().id, id);
        assert_eq!(resolver.confidence(&ReasonId::Statement(id)).unwrap(), 0.0);
        assert_eq!(
            resolver
                .confidence(&ReasonId::External("/data/test/contributor/alice".to_string()))
                .unwrap(),
            1.0
        );
    }

    #[test]
    fn store_resolver_reports_missing_and_unknown() {
        let assertions = InMemoryAssertionStore::new();
        let externals = InMemoryExternalReasonStore::new();
        let resolver = StoreResolver::new(&assertions, &externals);

        assert!(matches!(
            resolver.resolve_str("/data/test/contributor/nobody"),
            Err(EvidenceError::ReasonNotFound { .. })
        ));
        assert!(matches!(
            resolver.resolve_str(&format!("/assertion/{}", StatementId::new())),
            Err(EvidenceError::ReasonNotFound { .. })
        ));
        assert!(matches!(
            resolver.confidence(&ReasonId::External("/data/test/contributor/nobody".to_string())),
            Err(EvidenceError::ReasonNotFound { .. })
        ));
        assert!(matches!(
            resolver.resolve_str("/rel/IsA"),
            Err(EvidenceError::UnknownReasonKind { .. })
        ));
    }

    #[test]
    fn static_resolver_statement_lookup_rejects_wrong_kind() {
        let mut resolver = StaticResolver::new();
        resolver.add_external("/data/test/root");
        assert!(resolver.statement(StatementId::new()).is_err());
        assert_eq!(
            resolver
                .confidence(&ReasonId::External("/data/test/root".to_string()))
                .unwrap(),
            1.0
        );
    }
}
