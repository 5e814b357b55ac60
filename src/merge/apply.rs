//! Apply phase of a merge direction.
//!
//! Writes happen in a fixed order: external reasons, statement creates,
//! evidence of created statements, then folds. Evidence of created
//! statements is attached cited-first, so every incremental score reads
//! final scores of the statements it cites. A failure stops the direction;
//! what was written stays, and re-running skips it.
//!
//! When both stores recorded the same factors with different weights, the
//! graph keeps the weight of the newest record on both sides.

use std::collections::HashMap;

use crate::error::{Direction, EvidenceError, MergeError};
use crate::merge::plan::{evidence_order, CarriedRecord, DirectionPlan, Factor};
use crate::merge::{DirectionReport, MergeConfig};
use crate::operations::{add_evidence, check_statement};
use crate::reason::{Reason, ReasonId};
use crate::statement::{IdentityKey, NewStatement, StatementId};
use crate::storage::{StorageError, Stores};

fn evidence_err(direction: Direction, statement: StatementId) -> impl Fn(EvidenceError) -> MergeError {
    move |e| match e {
        EvidenceError::Storage(source) => MergeError::Storage { direction, source },
        source => MergeError::Evidence {
            direction,
            statement,
            source,
        },
    }
}

fn resolve(
    direction: Direction,
    citing: StatementId,
    factor: &Factor,
    created: &HashMap<IdentityKey, StatementId>,
) -> Result<ReasonId, MergeError> {
    match factor {
        Factor::Existing(reason) => Ok(reason.clone()),
        Factor::Created { key, source } => created
            .get(key)
            .map(|id| ReasonId::Statement(*id))
            .ok_or_else(|| MergeError::DanglingFactor {
                direction,
                statement: citing,
                reason: ReasonId::Statement(*source),
            }),
    }
}

fn check_revision(plan: &DirectionPlan, target: &Stores) -> Result<(), MergeError> {
    let direction = plan.direction;
    let actual = target
        .revision()
        .map_err(|source| MergeError::Storage { direction, source })?;
    if actual == plan.revision {
        return Ok(());
    }

    let (expected, actual) = if actual.0 == plan.revision.0 {
        (plan.revision.1, actual.1)
    } else {
        (plan.revision.0, actual.0)
    };
    tracing::warn!(
        %direction,
        store = %plan.target,
        expected,
        actual,
        "target store changed since scan"
    );
    Err(MergeError::ConcurrentModification {
        direction,
        store: plan.target.clone(),
        expected,
        actual,
    })
}

/// Creates a staged statement, or adopts the one that took its key since the scan.
fn create(
    direction: Direction,
    target: &Stores,
    fields: NewStatement,
) -> Result<(StatementId, bool), MergeError> {
    let storage = |source: StorageError| MergeError::Storage { direction, source };
    let key = fields.identity_key();
    match target.assertions.create(fields) {
        Ok(id) => Ok((id, true)),
        Err(StorageError::DuplicateKey(_)) => {
            tracing::warn!(%direction, store = target.name(), key = %key, "identity key taken since scan");
            let existing = target
                .assertions
                .find_by_identity_key(&key)
                .map_err(storage)?
                .ok_or_else(|| storage(StorageError::BackendError(format!("identity key {key} vanished"))))?;
            Ok((existing.id, false))
        }
        Err(e) => Err(storage(e)),
    }
}

/// Stores a copy of a carried record, keeping its timestamp.
fn insert_record(
    direction: Direction,
    target: &Stores,
    statement: StatementId,
    factors: Vec<ReasonId>,
    record: &CarriedRecord,
) -> Result<(), MergeError> {
    let mut reason = Reason::new(statement, factors, record.weight, record.polarity)
        .map_err(evidence_err(direction, statement))?;
    reason.created_at = record.created_at;
    target
        .reasons
        .insert(reason)
        .map_err(|source| MergeError::Storage { direction, source })
}

/// Applies one direction's staged writes to `target`.
pub(crate) fn apply(
    plan: &DirectionPlan,
    target: &Stores,
    config: &MergeConfig,
) -> Result<DirectionReport, MergeError> {
    let direction = plan.direction;
    let storage = |source: StorageError| MergeError::Storage { direction, source };

    if config.check_revisions {
        check_revision(plan, target)?;
    }

    let mut report = DirectionReport::new(direction, plan.scanned);

    for record in &plan.externals {
        if target.externals.ensure(record.clone()).map_err(storage)? {
            report.externals_copied += 1;
        }
    }

    // Every create runs before any evidence is attached, so carried
    // evidence may cite statements created later in the batch.
    let mut created = HashMap::with_capacity(plan.creates.len());
    let mut ids = Vec::with_capacity(plan.creates.len());
    for staged in &plan.creates {
        let key = staged.fields.identity_key();
        let (id, fresh) = create(direction, target, staged.fields.clone())?;
        if fresh {
            report.created += 1;
        }
        created.insert(key, id);
        ids.push(id);
    }

    for index in evidence_order(&plan.creates) {
        let staged = &plan.creates[index];
        let id = ids[index];
        for conjunction in &staged.evidence {
            let factors = conjunction
                .factors
                .iter()
                .map(|(f, w)| Ok((resolve(direction, staged.source, f, &created)?, *w)))
                .collect::<Result<Vec<_>, MergeError>>()?;
            add_evidence(target, id, conjunction.polarity, factors)
                .map_err(evidence_err(direction, id))?;
        }

        for record in &staged.records {
            let factors = record
                .factors
                .iter()
                .map(|f| resolve(direction, staged.source, f, &created))
                .collect::<Result<Vec<_>, _>>()?;
            let existing = target
                .reasons
                .find_matching(id, &factors, record.weight, record.polarity)
                .map_err(storage)?;
            if existing.is_none() {
                insert_record(direction, target, id, factors, record)?;
                report.records_copied += 1;
            }
        }
    }

    for fold in &plan.folds {
        let record = &fold.record;
        let factors = record
            .factors
            .iter()
            .map(|f| resolve(direction, fold.source, f, &created))
            .collect::<Result<Vec<_>, _>>()?;

        let on_target = target.reasons.find_by_target(fold.target).map_err(storage)?;
        if let Some(existing) = on_target
            .iter()
            .find(|r| r.matches(fold.target, &factors, record.weight, record.polarity))
        {
            tracing::debug!(
                %direction,
                target = %fold.target,
                reason = %existing.id,
                "fold skipped, equivalent reason present"
            );
            report.duplicate_folds += 1;
            continue;
        }

        let superseded = on_target
            .iter()
            .any(|r| r.polarity == record.polarity && r.factors == factors && record.is_superseded_by(r));
        if superseded {
            tracing::debug!(
                %direction,
                target = %fold.target,
                weight = record.weight,
                "fold recorded, newer weight kept"
            );
        } else {
            add_evidence(
                target,
                fold.target,
                record.polarity,
                factors.iter().map(|f| (f, record.weight)),
            )
            .map_err(evidence_err(direction, fold.target))?;
        }
        insert_record(direction, target, fold.target, factors, record)?;
        report.folded += 1;
    }

    if config.verify_consistency {
        for id in ids.iter().copied().chain(plan.folds.iter().map(|f| f.target)) {
            check_statement(target, id).map_err(evidence_err(direction, id))?;
        }
    }

    Ok(report)
}
