//! Attaching evidence to stored statements.

use crate::error::EvidenceError;
use crate::evidence::ConjunctionUpdate;
use crate::reason::{EvidencePolarity, Reason, ReasonId, ReasonRef};
use crate::statement::StatementId;
use crate::storage::{StorageError, Stores};

/// Outcome of [`justify`].
#[derive(Debug, Clone)]
pub enum Justified {
    /// A new record was stored and its conjunction added to the target.
    Recorded(Reason),
    /// An identical record already targets the statement. Nothing changed.
    Existing(Reason),
    /// An empty opposing conjunction. Nothing changed.
    Empty,
}

impl Justified {
    /// Returns true if the store was written.
    #[must_use]
    pub const fn is_recorded(&self) -> bool {
        matches!(self, Self::Recorded(_))
    }
}

/// Adds a conjunction to a stored statement's evidence graph.
///
/// No reason record is written; see [`justify`] for that.
///
/// # Errors
///
/// Returns evidence errors attributed to `target`, `StatementNotFound`,
/// or `VersionConflict` if the statement changed concurrently.
pub fn add_evidence<I, R>(
    stores: &Stores,
    target: StatementId,
    polarity: EvidencePolarity,
    reasons: I,
) -> Result<ConjunctionUpdate, EvidenceError>
where
    I: IntoIterator<Item = (R, f32)>,
    R: Into<ReasonRef>,
{
    let mut statement = stores
        .assertions
        .get(target)?
        .ok_or(StorageError::StatementNotFound(target))?;

    let resolver = stores.resolver();
    let update = match polarity {
        EvidencePolarity::Support => statement.add_support(reasons, &resolver)?,
        EvidencePolarity::Oppose => statement.add_oppose(reasons, &resolver)?,
    };
    if update != ConjunctionUpdate::Unchanged {
        stores.assertions.update(statement)?;
    }
    Ok(update)
}

/// Records that `factors` jointly support or oppose `target`.
///
/// Stores a [`Reason`] record and adds the matching conjunction, every
/// factor weighted by `weight`, to the target's evidence graph. Re-running
/// with the same `(target, factors, weight, polarity)` changes nothing.
///
/// # Errors
///
/// Returns `EmptyEvidence` for an empty supporting conjunction, plus the
/// errors of [`add_evidence`].
pub fn justify<I, R>(
    stores: &Stores,
    target: StatementId,
    polarity: EvidencePolarity,
    factors: I,
    weight: f32,
) -> Result<Justified, EvidenceError>
where
    I: IntoIterator<Item = R>,
    R: Into<ReasonRef>,
{
    let factors = factors
        .into_iter()
        .map(|f| f.into().into_reason_id())
        .collect::<Result<Vec<ReasonId>, _>>()
        .map_err(|e| e.in_statement(target))?;

    if factors.is_empty() {
        return match polarity {
            EvidencePolarity::Support => {
                Err(EvidenceError::EmptyEvidence { polarity }.in_statement(target))
            }
            EvidencePolarity::Oppose => Ok(Justified::Empty),
        };
    }

    if let Some(existing) = stores.reasons.find_matching(target, &factors, weight, polarity)? {
        return Ok(Justified::Existing(existing));
    }

    let reason = Reason::new(target, factors, weight, polarity)?;
    add_evidence(
        stores,
        target,
        polarity,
        reason.factors.iter().map(|f| (f, weight)),
    )?;
    stores.reasons.insert(reason.clone())?;

    tracing::debug!(
        store = stores.name(),
        statement = %target,
        %polarity,
        factors = reason.factors.len(),
        weight,
        "reason recorded"
    );
    Ok(Justified::Recorded(reason))
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::operations::make_statement;
    use crate::reason::ExternalReason;
    use crate::statement::NewStatement;

    fn setup() -> (Stores, StatementId, ExternalReason) {
        let stores = Stores::in_memory("test");
        let alice = ExternalReason::contributor("/data/test", "alice").unwrap();
        stores.externals.insert(alice.clone()).unwrap();
        let statement = make_statement(
            &stores,
            NewStatement::builder()
                .dataset("/data/test")
                .relation("/rel/IsA")
                .arguments(["/c/dog", "/c/animal"])
                .build()
                .unwrap(),
        )
        .unwrap();
        (stores, statement.id, alice)
    }

    #[test]
    fn justify_records_once() {
        let (stores, id, alice) = setup();

        let first = justify(&stores, id, EvidencePolarity::Support, [&alice], 0.8).unwrap();
        assert!(first.is_recorded());
        let again = justify(&stores, id, EvidencePolarity::Support, [&alice], 0.8).unwrap();
        assert!(matches!(again, Justified::Existing(_)));

        assert_eq!(stores.reasons.find_by_target(id).unwrap().len(), 1);
        let stored = stores.assertions.get(id).unwrap().unwrap();
        assert_eq!(stored.evidence.support().len(), 1);
        assert!((stored.confidence() - 0.8).abs() < 1e-6);
        assert_eq!(stored.version, 2);
    }

    #[test]
    fn justify_empty_support_fails_without_writes() {
        let (stores, id, _) = setup();
        let none: [&str; 0] = [];

        let err = justify(&stores, id, EvidencePolarity::Support, none, 1.0).unwrap_err();
        assert!(matches!(err.root(), EvidenceError::EmptyEvidence { .. }));
        assert!(matches!(
            justify(&stores, id, EvidencePolarity::Oppose, none, 1.0).unwrap(),
            Justified::Empty
        ));

        let stored = stores.assertions.get(id).unwrap().unwrap();
        assert_eq!(stored.confidence(), 0.0);
        assert_eq!(stored.version, 1);
        assert!(stores.reasons.all().unwrap().is_empty());
    }

    #[test]
    fn unresolvable_factor_leaves_statement_unchanged() {
        let (stores, id, _) = setup();

        let err = justify(
            &stores,
            id,
            EvidencePolarity::Support,
            ["/data/test/contributor/nobody"],
            1.0,
        )
        .unwrap_err();
        assert!(matches!(err.root(), EvidenceError::ReasonNotFound { .. }));

        let err = add_evidence(&stores, id, EvidencePolarity::Support, [("/rel/IsA", 1.0)])
            .unwrap_err();
        assert!(matches!(err.root(), EvidenceError::UnknownReasonKind { .. }));

        let stored = stores.assertions.get(id).unwrap().unwrap();
        assert!(stored.evidence.support().is_empty());
        assert!(stores.reasons.all().unwrap().is_empty());
    }

    #[test]
    fn opposition_lowers_confidence() {
        let (stores, id, alice) = setup();
        let bob = ExternalReason::contributor("/data/test", "bob").unwrap();
        stores.externals.insert(bob.clone()).unwrap();

        justify(&stores, id, EvidencePolarity::Support, [&alice], 1.0).unwrap();
        justify(&stores, id, EvidencePolarity::Oppose, [&bob], 0.25).unwrap();

        let stored = stores.assertions.get(id).unwrap().unwrap();
        assert!((stored.confidence() - 0.75).abs() < 1e-6);
    }
}
