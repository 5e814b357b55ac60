//! Scan phase of a merge direction.
//!
//! Reads the source and target stores and stages every write the direction
//! will make. Nothing is written here, so a failed scan leaves both stores
//! untouched.

use std::collections::{BTreeMap, HashMap, HashSet};

use chrono::{DateTime, Utc};

use crate::error::{Direction, MergeError};
use crate::merge::index::IdentityIndex;
use crate::merge::MergeConfig;
use crate::reason::{EvidencePolarity, ExternalReason, Reason, ReasonId};
use crate::statement::{IdentityKey, NewStatement, Statement, StatementId};
use crate::storage::{StorageError, Stores};

/// A factor of carried evidence, in the target store's terms.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Factor {
    /// Resolves in the target as it stands.
    Existing(ReasonId),
    /// A statement this direction creates. `source` is its id in the source store.
    Created { key: IdentityKey, source: StatementId },
}

#[derive(Debug, Clone)]
pub(crate) struct CarriedConjunction {
    pub polarity: EvidencePolarity,
    pub factors: Vec<(Factor, f32)>,
}

#[derive(Debug, Clone)]
pub(crate) struct CarriedRecord {
    pub polarity: EvidencePolarity,
    pub factors: Vec<Factor>,
    pub weight: f32,
    /// Kept from the source record. Decides which weight survives a conflict.
    pub created_at: DateTime<Utc>,
}

impl CarriedRecord {
    /// True if `other`, sharing this record's factors, outranks it.
    ///
    /// The later record wins. Equal timestamps fall back to the larger weight
    /// so that both stores pick the same winner.
    pub(crate) fn is_superseded_by(&self, other: &Reason) -> bool {
        (other.created_at, other.weight.to_bits()) > (self.created_at, self.weight.to_bits())
    }
}

/// Indices of `creates` in the order their evidence is attached: cited
/// statements come before the statements citing them.
///
/// Statements on a citation cycle keep their staging order.
pub(crate) fn evidence_order(creates: &[StagedCreate]) -> Vec<usize> {
    let keys: Vec<IdentityKey> = creates.iter().map(|c| c.fields.identity_key()).collect();
    let position: HashMap<&IdentityKey, usize> = keys.iter().enumerate().map(|(i, k)| (k, i)).collect();
    let cites: Vec<Vec<usize>> = creates
        .iter()
        .map(|c| {
            c.evidence
                .iter()
                .flat_map(|conj| conj.factors.iter())
                .filter_map(|(factor, _)| match factor {
                    Factor::Created { key, .. } => position.get(key).copied(),
                    Factor::Existing(_) => None,
                })
                .collect()
        })
        .collect();

    let mut seen = vec![false; creates.len()];
    let mut order = Vec::with_capacity(creates.len());
    for start in 0..creates.len() {
        if seen[start] {
            continue;
        }
        seen[start] = true;
        let mut stack = vec![(start, 0usize)];
        while let Some(top) = stack.last_mut() {
            let (node, next) = *top;
            if let Some(&cited) = cites[node].get(next) {
                top.1 += 1;
                if !seen[cited] {
                    seen[cited] = true;
                    stack.push((cited, 0));
                }
            } else {
                order.push(node);
                stack.pop();
            }
        }
    }
    order
}

/// A statement missing from the target, with the evidence it brings along.
#[derive(Debug, Clone)]
pub(crate) struct StagedCreate {
    pub source: StatementId,
    pub fields: NewStatement,
    pub evidence: Vec<CarriedConjunction>,
    pub records: Vec<CarriedRecord>,
}

/// A reason record to attach to an existing target statement.
#[derive(Debug, Clone)]
pub(crate) struct StagedFold {
    pub source: StatementId,
    pub target: StatementId,
    pub record: CarriedRecord,
}

/// Staged writes of one direction.
#[derive(Debug, Clone)]
pub struct DirectionPlan {
    pub(crate) direction: Direction,
    pub(crate) target: String,
    pub(crate) revision: (u64, u64),
    pub(crate) scanned: usize,
    pub(crate) externals: Vec<ExternalReason>,
    pub(crate) creates: Vec<StagedCreate>,
    pub(crate) folds: Vec<StagedFold>,
}

impl DirectionPlan {
    /// Direction this plan writes.
    #[must_use]
    pub const fn direction(&self) -> Direction {
        self.direction
    }

    /// Name of the store this plan writes to.
    #[must_use]
    pub fn target_store(&self) -> &str {
        &self.target
    }

    /// Source statements considered.
    #[must_use]
    pub const fn scanned(&self) -> usize {
        self.scanned
    }

    /// Statements to create in the target.
    #[must_use]
    pub fn create_count(&self) -> usize {
        self.creates.len()
    }

    /// Reason records to fold onto existing target statements.
    #[must_use]
    pub fn fold_count(&self) -> usize {
        self.folds.len()
    }

    /// External reasons the target lacks.
    #[must_use]
    pub fn external_count(&self) -> usize {
        self.externals.len()
    }

    /// True if applying the plan cannot change the target.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.creates.is_empty() && self.folds.is_empty() && self.externals.is_empty()
    }
}

struct Scanner<'a> {
    direction: Direction,
    source: &'a Stores,
    target: &'a Stores,
    index: IdentityIndex,
    pending: HashSet<IdentityKey>,
    keys: HashMap<StatementId, Option<IdentityKey>>,
    externals: BTreeMap<String, ExternalReason>,
}

impl Scanner<'_> {
    fn storage(&self, source: StorageError) -> MergeError {
        MergeError::Storage {
            direction: self.direction,
            source,
        }
    }

    fn source_key(&mut self, id: StatementId) -> Result<Option<IdentityKey>, MergeError> {
        if let Some(key) = self.keys.get(&id) {
            return Ok(key.clone());
        }
        let key = self
            .source
            .assertions
            .get(id)
            .map_err(|e| self.storage(e))?
            .map(|s| s.identity_key());
        self.keys.insert(id, key.clone());
        Ok(key)
    }

    /// Translates a reason cited by `citing` into the target's terms.
    fn translate(&mut self, citing: StatementId, reason: &ReasonId) -> Result<Factor, MergeError> {
        let direction = self.direction;
        let dangling = || MergeError::DanglingFactor {
            direction,
            statement: citing,
            reason: reason.clone(),
        };

        match reason {
            ReasonId::External(path) => {
                let known = self.externals.contains_key(path)
                    || self
                        .target
                        .externals
                        .get(path)
                        .map_err(|e| self.storage(e))?
                        .is_some();
                if !known {
                    let record = self
                        .source
                        .externals
                        .get(path)
                        .map_err(|e| self.storage(e))?
                        .ok_or_else(dangling)?;
                    self.externals.insert(path.clone(), record);
                }
                Ok(Factor::Existing(reason.clone()))
            }
            ReasonId::Statement(id) => {
                let key = self.source_key(*id)?.ok_or_else(dangling)?;
                if let Some(target_id) = self.index.get(&key) {
                    return Ok(Factor::Existing(ReasonId::Statement(target_id)));
                }
                if self.pending.contains(&key) {
                    return Ok(Factor::Created { key, source: *id });
                }
                // Outside the merged scope, but the target may hold it anyway.
                match self
                    .target
                    .assertions
                    .find_by_identity_key(&key)
                    .map_err(|e| self.storage(e))?
                {
                    Some(found) => Ok(Factor::Existing(found.reason_id())),
                    None => Err(dangling()),
                }
            }
        }
    }

    fn carry_record(&mut self, citing: StatementId, record: &Reason) -> Result<CarriedRecord, MergeError> {
        let factors = record
            .factors
            .iter()
            .map(|f| self.translate(citing, f))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(CarriedRecord {
            polarity: record.polarity,
            factors,
            weight: record.weight,
            created_at: record.created_at,
        })
    }

    fn carry_evidence(&mut self, statement: &Statement) -> Result<Vec<CarriedConjunction>, MergeError> {
        let mut carried = Vec::new();
        for polarity in [EvidencePolarity::Support, EvidencePolarity::Oppose] {
            for conjunction in statement.evidence.tree(polarity).conjunctions() {
                let factors = conjunction
                    .iter()
                    .map(|wr| Ok((self.translate(statement.id, &wr.reason)?, wr.weight)))
                    .collect::<Result<Vec<_>, MergeError>>()?;
                carried.push(CarriedConjunction { polarity, factors });
            }
        }
        Ok(carried)
    }
}

fn scoped(stores: &Stores, dataset: Option<&str>) -> Result<Vec<Statement>, StorageError> {
    match dataset {
        Some(dataset) => stores.assertions.find_by_dataset(dataset),
        None => stores.assertions.all(),
    }
}

/// Stages the writes that copy `source` into `target`.
pub(crate) fn scan(
    direction: Direction,
    source: &Stores,
    target: &Stores,
    config: &MergeConfig,
) -> Result<DirectionPlan, MergeError> {
    let storage = |source: StorageError| MergeError::Storage { direction, source };

    // Taken first so that writes racing the scan are caught at apply time.
    let revision = target.revision().map_err(storage)?;

    let dataset = config.dataset.as_deref();
    let source_statements = scoped(source, dataset).map_err(storage)?;
    let target_statements = scoped(target, dataset).map_err(storage)?;

    let index = IdentityIndex::build(&target_statements, config.index);
    let pending = source_statements
        .iter()
        .map(Statement::identity_key)
        .filter(|key| !index.contains(key))
        .collect();
    let keys = source_statements
        .iter()
        .map(|s| (s.id, Some(s.identity_key())))
        .collect();

    let mut scanner = Scanner {
        direction,
        source,
        target,
        index,
        pending,
        keys,
        externals: BTreeMap::new(),
    };

    let mut creates = Vec::new();
    let mut folds = Vec::new();
    for statement in &source_statements {
        let records = source.reasons.find_by_target(statement.id).map_err(storage)?;

        match scanner.index.get(&statement.identity_key()) {
            Some(target_id) => {
                for record in &records {
                    let record = scanner.carry_record(statement.id, record)?;
                    tracing::debug!(
                        %direction,
                        source = %statement.id,
                        target = %target_id,
                        polarity = %record.polarity,
                        "fold staged"
                    );
                    folds.push(StagedFold {
                        source: statement.id,
                        target: target_id,
                        record,
                    });
                }
            }
            None => {
                let evidence = scanner.carry_evidence(statement)?;
                let records = records
                    .iter()
                    .map(|r| scanner.carry_record(statement.id, r))
                    .collect::<Result<Vec<_>, _>>()?;
                tracing::debug!(
                    %direction,
                    source = %statement.id,
                    conjunctions = evidence.len(),
                    records = records.len(),
                    "create staged"
                );
                creates.push(StagedCreate {
                    source: statement.id,
                    fields: NewStatement::from_statement(statement),
                    evidence,
                    records,
                });
            }
        }
    }

    Ok(DirectionPlan {
        direction,
        target: target.name().to_string(),
        revision,
        scanned: source_statements.len(),
        externals: scanner.externals.into_values().collect(),
        creates,
        folds,
    })
}
