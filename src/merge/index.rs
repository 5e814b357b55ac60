//! Identity-key index over one store's statements.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::statement::{IdentityKey, Statement, StatementId};

/// How the merge looks statements up by identity key.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IndexStrategy {
    /// Hash map keyed by identity key. O(1) lookups.
    #[default]
    Hashed,
    /// Linear scan per lookup, O(n·m) over a whole merge.
    ///
    /// Reference implementation for small inputs and benchmarks only.
    LinearScan,
}

/// Maps identity keys to statement ids.
///
/// When several statements share a key the first one wins.
#[derive(Debug, Clone)]
pub enum IdentityIndex {
    /// Hash map lookup.
    Hashed(HashMap<IdentityKey, StatementId>),
    /// Scan of `(key, id)` pairs in statement order.
    LinearScan(Vec<(IdentityKey, StatementId)>),
}

impl IdentityIndex {
    /// Indexes `statements` with the given strategy.
    #[must_use]
    pub fn build(statements: &[Statement], strategy: IndexStrategy) -> Self {
        match strategy {
            IndexStrategy::Hashed => {
                let mut map = HashMap::with_capacity(statements.len());
                for s in statements {
                    map.entry(s.identity_key()).or_insert(s.id);
                }
                Self::Hashed(map)
            }
            IndexStrategy::LinearScan => {
                Self::LinearScan(statements.iter().map(|s| (s.identity_key(), s.id)).collect())
            }
        }
    }

    /// Id of the statement with this identity key, if indexed.
    #[must_use]
    pub fn get(&self, key: &IdentityKey) -> Option<StatementId> {
        match self {
            Self::Hashed(map) => map.get(key).copied(),
            Self::LinearScan(entries) => entries.iter().find(|(k, _)| k == key).map(|(_, id)| *id),
        }
    }

    /// True if a statement with this key is indexed.
    #[must_use]
    pub fn contains(&self, key: &IdentityKey) -> bool {
        self.get(key).is_some()
    }

    /// Number of indexed entries.
    #[must_use]
    pub fn len(&self) -> usize {
        match self {
            Self::Hashed(map) => map.len(),
            Self::LinearScan(entries) => entries.len(),
        }
    }

    /// True if nothing is indexed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
