//! Storage-id independent snapshots of a store.
//!
//! Two stores holding the same claims with the same evidence produce equal
//! snapshots, whatever ids their statements and records were given.
//! Statement reasons are rewritten to the identity fingerprint of the
//! statement they cite. Conjunctions and records are sorted.

use std::collections::BTreeMap;

use crate::reason::{EvidencePolarity, ReasonId};
use crate::statement::{IdentityKey, Statement, StatementId};
use crate::storage::{StorageError, Stores};

/// One conjunction, as `(reason, weight bits)` pairs.
type Conjunction = Vec<(String, u32)>;

/// Evidence of one statement in canonical form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatementEntry {
    /// Statement identity.
    pub key: IdentityKey,
    /// Sorted supporting conjunctions.
    pub support: Vec<Conjunction>,
    /// Sorted opposing conjunctions.
    pub oppose: Vec<Conjunction>,
    /// `(polarity, factors, weight bits)` of every record targeting the statement.
    pub records: Vec<(EvidencePolarity, Vec<String>, u32)>,
}

/// Identity keys that differ between two snapshots.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SnapshotDiff {
    /// Keys captured now but absent from `before`.
    pub added: Vec<IdentityKey>,
    /// Keys in `before` that are gone now.
    pub removed: Vec<IdentityKey>,
    /// Keys present in both with different evidence or records.
    pub changed: Vec<IdentityKey>,
}

impl SnapshotDiff {
    /// True if the snapshots agree.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.removed.is_empty() && self.changed.is_empty()
    }
}

/// Canonical view of a store's statements and evidence.
#[derive(Debug, Clone)]
pub struct StoreSnapshot {
    entries: BTreeMap<String, StatementEntry>,
    duplicates: Vec<IdentityKey>,
    digest: String,
}

/// Length-prefixed so that adjacent fields cannot run together.
fn field(hasher: &mut blake3::Hasher, bytes: &[u8]) {
    hasher.update(&(bytes.len() as u64).to_le_bytes());
    hasher.update(bytes);
}

fn canonical_reason(reason: &ReasonId, fingerprints: &BTreeMap<StatementId, String>) -> String {
    match reason {
        ReasonId::Statement(id) => match fingerprints.get(id) {
            Some(fp) => format!("statement:{fp}"),
            None => format!("missing:{id}"),
        },
        ReasonId::External(path) => format!("external:{path}"),
    }
}

fn canonical_tree(
    statement: &Statement,
    polarity: EvidencePolarity,
    fingerprints: &BTreeMap<StatementId, String>,
) -> Vec<Conjunction> {
    let mut conjunctions: Vec<Conjunction> = statement
        .evidence
        .tree(polarity)
        .conjunctions()
        .iter()
        .map(|conj| {
            conj.iter()
                .map(|wr| (canonical_reason(&wr.reason, fingerprints), wr.weight.to_bits()))
                .collect()
        })
        .collect();
    conjunctions.sort();
    conjunctions
}

impl StoreSnapshot {
    /// Captures every statement of a store.
    ///
    /// # Errors
    ///
    /// Propagates storage errors.
    pub fn capture(stores: &Stores) -> Result<Self, StorageError> {
        Self::build(stores, stores.assertions.all()?)
    }

    /// Captures the statements of one dataset.
    ///
    /// # Errors
    ///
    /// Propagates storage errors.
    pub fn capture_dataset(stores: &Stores, dataset: &str) -> Result<Self, StorageError> {
        Self::build(stores, stores.assertions.find_by_dataset(dataset)?)
    }

    fn build(stores: &Stores, statements: Vec<Statement>) -> Result<Self, StorageError> {
        // Citations may leave the captured scope, so fingerprint everything.
        let fingerprints: BTreeMap<StatementId, String> = stores
            .assertions
            .all()?
            .iter()
            .map(|s| (s.id, s.identity_key().fingerprint()))
            .collect();

        let mut entries = BTreeMap::new();
        let mut duplicates = Vec::new();
        for statement in &statements {
            let key = statement.identity_key();
            let fingerprint = key.fingerprint();
            if entries.contains_key(&fingerprint) {
                duplicates.push(key);
                continue;
            }

            let mut records: Vec<_> = stores
                .reasons
                .find_by_target(statement.id)?
                .into_iter()
                .map(|r| {
                    let factors: Vec<String> = r
                        .factors
                        .iter()
                        .map(|f| canonical_reason(f, &fingerprints))
                        .collect();
                    (r.polarity, factors, r.weight.to_bits())
                })
                .collect();
            records.sort();

            entries.insert(
                fingerprint,
                StatementEntry {
                    support: canonical_tree(statement, EvidencePolarity::Support, &fingerprints),
                    oppose: canonical_tree(statement, EvidencePolarity::Oppose, &fingerprints),
                    key,
                    records,
                },
            );
        }

        let digest = Self::hash(&entries);
        Ok(Self {
            entries,
            duplicates,
            digest,
        })
    }

    fn hash(entries: &BTreeMap<String, StatementEntry>) -> String {
        let mut hasher = blake3::Hasher::new();
        for (fingerprint, entry) in entries {
            field(&mut hasher, fingerprint.as_bytes());
            for (tag, tree) in [("support", &entry.support), ("oppose", &entry.oppose)] {
                field(&mut hasher, tag.as_bytes());
                for conj in tree {
                    field(&mut hasher, &(conj.len() as u64).to_le_bytes());
                    for (reason, weight) in conj {
                        field(&mut hasher, reason.as_bytes());
                        field(&mut hasher, &weight.to_le_bytes());
                    }
                }
            }
            for (polarity, factors, weight) in &entry.records {
                field(&mut hasher, polarity.to_string().as_bytes());
                field(&mut hasher, &(factors.len() as u64).to_le_bytes());
                for factor in factors {
                    field(&mut hasher, factor.as_bytes());
                }
                field(&mut hasher, &weight.to_le_bytes());
            }
        }
        hasher.finalize().to_hex().to_string()
    }

    /// blake3 digest of the canonical content, hex encoded.
    #[must_use]
    pub fn digest(&self) -> &str {
        &self.digest
    }

    /// Number of distinct identity keys.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True if no statement was captured.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Identity keys held by more than one statement.
    #[must_use]
    pub fn duplicates(&self) -> &[IdentityKey] {
        &self.duplicates
    }

    /// Captured identity keys, ordered by fingerprint.
    pub fn keys(&self) -> impl Iterator<Item = &IdentityKey> {
        self.entries.values().map(|e| &e.key)
    }

    /// Canonical entry of a statement, if captured.
    #[must_use]
    pub fn entry(&self, key: &IdentityKey) -> Option<&StatementEntry> {
        self.entries.get(&key.fingerprint())
    }

    /// What changed between `before` and this snapshot.
    #[must_use]
    pub fn diff(&self, before: &Self) -> SnapshotDiff {
        let mut diff = SnapshotDiff::default();
        for (fp, entry) in &self.entries {
            match before.entries.get(fp) {
                None => diff.added.push(entry.key.clone()),
                Some(old) if old != entry => diff.changed.push(entry.key.clone()),
                Some(_) => {}
            }
        }
        for (fp, entry) in &before.entries {
            if !self.entries.contains_key(fp) {
                diff.removed.push(entry.key.clone());
            }
        }
        diff
    }
}

impl PartialEq for StoreSnapshot {
    fn eq(&self, other: &Self) -> bool {
        self.digest == other.digest
    }
}

impl Eq for StoreSnapshot {}
