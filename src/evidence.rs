//! Evidence graphs: support and opposition for a statement.
//!
//! Each statement carries two evidence trees. A tree is a disjunction (OR)
//! of conjunctions (AND) of weighted reasons, stored flattened:
//!
//! ```text
//! conjunctions:  [a b] [c] [d e f]
//! flat:          a b c d e f
//! weights:       w w w w w w
//! offsets:       0   2 3
//! ```
//!
//! `offsets` holds the start of every conjunction, so the first offset is
//! always 0 and there is one offset per conjunction.

use std::fmt;
use std::ops::Range;

use serde::{Deserialize, Serialize};

use crate::confidence::ConfidenceEngine;
use crate::error::EvidenceError;
use crate::reason::{EvidencePolarity, ReasonId, ReasonRef, WeightedReason};
use crate::resolver::{ReasonResolver, ResolvedReason};

/// A conjunction with every reason resolved to its entity.
pub type ResolvedConjunction = Vec<(ResolvedReason, f32)>;

/// The first evidence graph invariant found not to hold.
#[derive(Debug, Clone, PartialEq)]
pub enum ConsistencyViolation {
    /// First offset of a non-empty tree is not 0.
    FirstOffsetNotZero {
        /// Offending tree.
        tree: EvidencePolarity,
        /// The offset found.
        offset: usize,
    },
    /// Offsets do not strictly increase.
    OffsetsNotIncreasing {
        /// Offending tree.
        tree: EvidencePolarity,
        /// Position of the first offset not above its predecessor.
        index: usize,
    },
    /// An offset points past the end of `flat`.
    OffsetOutOfBounds {
        /// Offending tree.
        tree: EvidencePolarity,
        /// The offset found.
        offset: usize,
        /// Length of `flat`.
        len: usize,
    },
    /// `flat` and `weights` differ in length.
    LengthMismatch {
        /// Offending tree.
        tree: EvidencePolarity,
        /// Length of `flat`.
        flat: usize,
        /// Length of `weights`.
        weights: usize,
    },
    /// A cited reason does not resolve.
    UnresolvedReason {
        /// Tree that cites it.
        tree: EvidencePolarity,
        /// The unresolved id.
        reason: ReasonId,
    },
    /// Cached confidence score outside [0, 1].
    ScoreOutOfBounds {
        /// The stored score.
        score: f32,
    },
    /// Stored argstring does not match the arguments.
    ArgstringMismatch {
        /// The stored argstring.
        stored: String,
    },
}

impl fmt::Display for ConsistencyViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::FirstOffsetNotZero { tree, offset } => {
                write!(f, "{tree} tree: first offset is {offset}, expected 0")
            }
            Self::OffsetsNotIncreasing { tree, index } => {
                write!(f, "{tree} tree: offsets not strictly increasing at index {index}")
            }
            Self::OffsetOutOfBounds { tree, offset, len } => {
                write!(f, "{tree} tree: offset {offset} out of bounds for {len} reasons")
            }
            Self::LengthMismatch { tree, flat, weights } => {
                write!(f, "{tree} tree: {flat} reasons but {weights} weights")
            }
            Self::UnresolvedReason { tree, reason } => {
                write!(f, "{tree} tree: reason {reason} does not resolve")
            }
            Self::ScoreOutOfBounds { score } => {
                write!(f, "confidence score {score} outside [0, 1]")
            }
            Self::ArgstringMismatch { stored } => {
                write!(f, "stored argstring '{stored}' does not match arguments")
            }
        }
    }
}

/// Outcome of adding a conjunction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConjunctionUpdate {
    /// Appended as a new conjunction.
    Appended,
    /// A conjunction with the same reason sequence existed; its weights were overwritten.
    Updated,
    /// Nothing changed.
    Unchanged,
}

/// One flattened disjunction of conjunctions.
///
/// Only built through [`EvidenceGraph`], which keeps the layout valid.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct EvidenceTree {
    flat: Vec<ReasonId>,
    weights: Vec<f32>,
    offsets: Vec<usize>,
}

impl EvidenceTree {
    /// Reason ids, conjunction-major.
    #[must_use]
    pub fn flat(&self) -> &[ReasonId] {
        &self.flat
    }

    /// Weights aligned with [`flat`](Self::flat).
    #[must_use]
    pub fn weights(&self) -> &[f32] {
        &self.weights
    }

    /// Start index of each conjunction in `flat`.
    #[must_use]
    pub fn offsets(&self) -> &[usize] {
        &self.offsets
    }

    /// True if the tree holds no conjunction.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.offsets.is_empty()
    }

    /// Number of conjunctions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.offsets.len()
    }

    fn span(&self, index: usize) -> Range<usize> {
        let start = self.offsets[index];
        let end = self.offsets.get(index + 1).copied().unwrap_or(self.flat.len());
        start..end
    }

    /// Reconstructs the conjunctions, unresolved.
    #[must_use]
    pub fn conjunctions(&self) -> Vec<Vec<WeightedReason>> {
        (0..self.offsets.len())
            .map(|i| {
                let span = self.span(i);
                self.flat[span.clone()]
                    .iter()
                    .zip(&self.weights[span])
                    .map(|(r, w)| WeightedReason::new(r.clone(), *w))
                    .collect()
            })
            .collect()
    }

    fn find(&self, reasons: &[ReasonId]) -> Option<Range<usize>> {
        (0..self.offsets.len())
            .map(|i| self.span(i))
            .find(|span| self.flat[span.clone()] == *reasons)
    }

    fn upsert(&mut self, conjunction: Vec<WeightedReason>) -> ConjunctionUpdate {
        if conjunction.is_empty() {
            return ConjunctionUpdate::Unchanged;
        }
        let (reasons, weights): (Vec<ReasonId>, Vec<f32>) =
            conjunction.into_iter().map(|wr| (wr.reason, wr.weight)).unzip();

        if let Some(span) = self.find(&reasons) {
            let existing = &mut self.weights[span];
            if existing.iter().map(|w| w.to_bits()).eq(weights.iter().map(|w| w.to_bits())) {
                return ConjunctionUpdate::Unchanged;
            }
            existing.copy_from_slice(&weights);
            return ConjunctionUpdate::Updated;
        }

        self.offsets.push(self.flat.len());
        self.flat.extend(reasons);
        self.weights.extend(weights);
        ConjunctionUpdate::Appended
    }

    fn check_layout(&self, tree: EvidencePolarity) -> Result<(), ConsistencyViolation> {
        if self.flat.len() != self.weights.len() {
            return Err(ConsistencyViolation::LengthMismatch {
                tree,
                flat: self.flat.len(),
                weights: self.weights.len(),
            });
        }
        if let Some(&first) = self.offsets.first() {
            if first != 0 {
                return Err(ConsistencyViolation::FirstOffsetNotZero { tree, offset: first });
            }
        }
        for (index, pair) in self.offsets.windows(2).enumerate() {
            if pair[1] <= pair[0] {
                return Err(ConsistencyViolation::OffsetsNotIncreasing { tree, index: index + 1 });
            }
        }
        for &offset in &self.offsets {
            if offset >= self.flat.len() {
                return Err(ConsistencyViolation::OffsetOutOfBounds {
                    tree,
                    offset,
                    len: self.flat.len(),
                });
            }
        }
        Ok(())
    }

    fn resolve(&self, resolver: &dyn ReasonResolver) -> Result<Vec<ResolvedConjunction>, EvidenceError> {
        self.conjunctions()
            .into_iter()
            .map(|conj| {
                conj.into_iter()
                    .map(|wr| Ok((resolver.resolve(&wr.reason)?, wr.weight)))
                    .collect()
            })
            .collect()
    }
}

/// Support and opposition for one statement, with the derived confidence.
///
/// Deserializing checks the layout of both trees and the score bounds, so
/// a graph read back from storage can be traversed without further checks.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawGraph")]
pub struct EvidenceGraph {
    support: EvidenceTree,
    oppose: EvidenceTree,
    confidence_score: f32,
}

#[derive(Deserialize)]
struct RawTree {
    flat: Vec<ReasonId>,
    weights: Vec<f32>,
    offsets: Vec<usize>,
}

#[derive(Deserialize)]
struct RawGraph {
    support: RawTree,
    oppose: RawTree,
    confidence_score: f32,
}

impl From<RawTree> for EvidenceTree {
    fn from(raw: RawTree) -> Self {
        Self {
            flat: raw.flat,
            weights: raw.weights,
            offsets: raw.offsets,
        }
    }
}

impl TryFrom<RawGraph> for EvidenceGraph {
    type Error = ConsistencyViolation;

    fn try_from(raw: RawGraph) -> Result<Self, Self::Error> {
        let graph = Self {
            support: raw.support.into(),
            oppose: raw.oppose.into(),
            confidence_score: raw.confidence_score,
        };
        graph.support.check_layout(EvidencePolarity::Support)?;
        graph.oppose.check_layout(EvidencePolarity::Oppose)?;
        if !(0.0..=1.0).contains(&graph.confidence_score) {
            return Err(ConsistencyViolation::ScoreOutOfBounds {
                score: graph.confidence_score,
            });
        }
        Ok(graph)
    }
}

fn normalize<I, R>(reasons: I) -> Result<Vec<WeightedReason>, EvidenceError>
where
    I: IntoIterator<Item = (R, f32)>,
    R: Into<ReasonRef>,
{
    reasons
        .into_iter()
        .map(|(r, w)| Ok(WeightedReason::new(r.into().into_reason_id()?, w)))
        .collect()
}

impl EvidenceGraph {
    /// The graph of a statement with no evidence; confidence 0.
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    /// Builds a graph from nested support and opposition lists.
    ///
    /// Repeated reason sequences collapse as in [`Self::add_conjunction`].
    ///
    /// # Errors
    ///
    /// Fails on the first conjunction that cannot be added.
    pub fn from_disjunctions<R>(
        support: Vec<Vec<(R, f32)>>,
        oppose: Vec<Vec<(R, f32)>>,
        resolver: &dyn ReasonResolver,
    ) -> Result<Self, EvidenceError>
    where
        R: Into<ReasonRef>,
    {
        let mut graph = Self::empty();
        for conj in support {
            graph.support.upsert(normalize(conj)?);
        }
        for conj in oppose {
            graph.oppose.upsert(normalize(conj)?);
        }
        graph.confidence_score = ConfidenceEngine::score(&graph, resolver)?;
        Ok(graph)
    }

    /// Supporting tree.
    #[must_use]
    pub const fn support(&self) -> &EvidenceTree {
        &self.support
    }

    /// Opposing tree.
    #[must_use]
    pub const fn oppose(&self) -> &EvidenceTree {
        &self.oppose
    }

    /// Tree for `polarity`.
    #[must_use]
    pub const fn tree(&self, polarity: EvidencePolarity) -> &EvidenceTree {
        match polarity {
            EvidencePolarity::Support => &self.support,
            EvidencePolarity::Oppose => &self.oppose,
        }
    }

    /// Cached confidence, refreshed after every mutation.
    #[must_use]
    pub const fn confidence_score(&self) -> f32 {
        self.confidence_score
    }

    /// Replaces the score with one computed by deep evaluation.
    pub(crate) fn set_confidence_score(&mut self, score: f32) {
        self.confidence_score = score;
    }

    /// Adds a conjunction to one tree, or overwrites the weights of an
    /// existing conjunction with the same ordered reason sequence.
    ///
    /// Confidence is recomputed after the change. On error the graph is
    /// left as it was.
    ///
    /// # Errors
    ///
    /// Returns a resolution error if any reason in the graph does not resolve.
    pub fn add_conjunction(
        &mut self,
        polarity: EvidencePolarity,
        conjunction: Vec<WeightedReason>,
        resolver: &dyn ReasonResolver,
    ) -> Result<ConjunctionUpdate, EvidenceError> {
        let mut next = self.clone();
        let update = match polarity {
            EvidencePolarity::Support => next.support.upsert(conjunction),
            EvidencePolarity::Oppose => next.oppose.upsert(conjunction),
        };
        if update == ConjunctionUpdate::Unchanged {
            return Ok(update);
        }

        next.confidence_score = ConfidenceEngine::score(&next, resolver)?;
        tracing::trace!(
            tree = %polarity,
            ?update,
            confidence = next.confidence_score,
            "evidence conjunction added"
        );
        *self = next;
        Ok(update)
    }

    /// Adds a supporting conjunction.
    ///
    /// # Errors
    ///
    /// Returns `EmptyEvidence` if `reasons` is empty, or a parse/resolution error.
    pub fn add_support<I, R>(
        &mut self,
        reasons: I,
        resolver: &dyn ReasonResolver,
    ) -> Result<ConjunctionUpdate, EvidenceError>
    where
        I: IntoIterator<Item = (R, f32)>,
        R: Into<ReasonRef>,
    {
        let conjunction = normalize(reasons)?;
        if conjunction.is_empty() {
            return Err(EvidenceError::EmptyEvidence {
                polarity: EvidencePolarity::Support,
            });
        }
        self.add_conjunction(EvidencePolarity::Support, conjunction, resolver)
    }

    /// Adds an opposing conjunction.
    ///
    /// Unlike [`Self::add_support`], an empty conjunction is accepted and
    /// leaves the graph unchanged.
    ///
    /// # Errors
    ///
    /// Returns a parse or resolution error.
    pub fn add_oppose<I, R>(
        &mut self,
        reasons: I,
        resolver: &dyn ReasonResolver,
    ) -> Result<ConjunctionUpdate, EvidenceError>
    where
        I: IntoIterator<Item = (R, f32)>,
        R: Into<ReasonRef>,
    {
        let conjunction = normalize(reasons)?;
        self.add_conjunction(EvidencePolarity::Oppose, conjunction, resolver)
    }

    /// Supporting conjunctions with every reason resolved.
    ///
    /// # Errors
    ///
    /// Returns a resolution error for the first reason that does not resolve.
    pub fn get_support(&self, resolver: &dyn ReasonResolver) -> Result<Vec<ResolvedConjunction>, EvidenceError> {
        self.support.resolve(resolver)
    }

    /// Opposing conjunctions with every reason resolved.
    ///
    /// # Errors
    ///
    /// Returns a resolution error for the first reason that does not resolve.
    pub fn get_oppose(&self, resolver: &dyn ReasonResolver) -> Result<Vec<ResolvedConjunction>, EvidenceError> {
        self.oppose.resolve(resolver)
    }

    /// Validates every invariant of the graph.
    ///
    /// # Errors
    ///
    /// Returns `Consistency` naming the first violated invariant. Storage
    /// failures during resolution propagate as-is.
    pub fn check_consistency(&self, resolver: &dyn ReasonResolver) -> Result<(), EvidenceError> {
        for (polarity, tree) in [
            (EvidencePolarity::Support, &self.support),
            (EvidencePolarity::Oppose, &self.oppose),
        ] {
            tree.check_layout(polarity).map_err(EvidenceError::Consistency)?;
            for reason in &tree.flat {
                match resolver.resolve(reason) {
                    Ok(_) => {}
                    Err(EvidenceError::ReasonNotFound { .. }) => {
                        return Err(EvidenceError::Consistency(
                            ConsistencyViolation::UnresolvedReason {
                                tree: polarity,
                                reason: reason.clone(),
                            },
                        ));
                    }
                    Err(e) => return Err(e),
                }
            }
        }

        let score = self.confidence_score;
        if !(0.0..=1.0).contains(&score) {
            return Err(EvidenceError::Consistency(ConsistencyViolation::ScoreOutOfBounds {
                score,
            }));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::resolver::StaticResolver;
    use crate::statement::StatementId;

    fn ext(name: &str) -> String {
        format!("/data/test/contributor/{name}")
    }

    fn resolver() -> StaticResolver {
        let mut r = StaticResolver::new();
        for name in ["a", "b", "c", "d"] {
            r.add_external(&ext(name));
        }
        r
    }

    #[test]
    fn empty_graph_has_zero_confidence() {
        let graph = EvidenceGraph::empty();
        assert!(graph.support().is_empty());
        assert_eq!(graph.confidence_score(), 0.0);
        graph.check_consistency(&resolver()).unwrap();
    }

    #[test]
    fn offsets_start_at_zero_one_per_conjunction() {
        let r = resolver();
        let mut graph = EvidenceGraph::empty();
        graph.add_support(vec![(ext("a"), 1.0), (ext("b"), 1.0)], &r).unwrap();
        graph.add_support(vec![(ext("c"), 0.5)], &r).unwrap();
        graph.add_support(vec![(ext("d"), 0.5), (ext("a"), 0.5)], &r).unwrap();

        assert_eq!(graph.support().offsets(), &[0, 2, 3]);
        assert_eq!(graph.support().flat().len(), 5);
        assert_eq!(graph.support().weights().len(), 5);
        assert_eq!(graph.support().len(), 3);
        graph.check_consistency(&r).unwrap();
    }

    #[test]
    fn readding_same_sequence_overwrites_weights() {
        let r = resolver();
        let mut graph = EvidenceGraph::empty();
        graph.add_support(vec![(ext("a"), 1.0)], &r).unwrap();
        graph.add_support(vec![(ext("b"), 0.4), (ext("c"), 0.4)], &r).unwrap();
        let before = graph.confidence_score();

        let update = graph.add_support(vec![(ext("b"), 0.9), (ext("c"), 0.8)], &r).unwrap();
        assert_eq!(update, ConjunctionUpdate::Updated);
        assert_eq!(graph.support().offsets(), &[0, 1]);
        assert_eq!(graph.support().flat().len(), 3);
        assert_eq!(graph.support().weights(), &[1.0, 0.9, 0.8]);
        assert!(graph.confidence_score() >= before);

        let again = graph.add_support(vec![(ext("b"), 0.9), (ext("c"), 0.8)], &r).unwrap();
        assert_eq!(again, ConjunctionUpdate::Unchanged);
    }

    #[test]
    fn reordered_sequence_is_a_new_conjunction() {
        let r = resolver();
        let mut graph = EvidenceGraph::empty();
        graph.add_support(vec![(ext("a"), 0.5), (ext("b"), 0.5)], &r).unwrap();
        let update = graph.add_support(vec![(ext("b"), 0.5), (ext("a"), 0.5)], &r).unwrap();
        assert_eq!(update, ConjunctionUpdate::Appended);
        assert_eq!(graph.support().len(), 2);
    }

    #[test]
    fn empty_support_is_rejected_and_graph_unchanged() {
        let r = resolver();
        let mut graph = EvidenceGraph::empty();
        graph.add_support(vec![(ext("a"), 0.7)], &r).unwrap();
        let before = graph.clone();

        let err = graph
            .add_support(Vec::<(String, f32)>::new(), &r)
            .unwrap_err();
        assert!(matches!(err, EvidenceError::EmptyEvidence { polarity: EvidencePolarity::Support }));
        assert_eq!(graph, before);
    }

    #[test]
    fn empty_oppose_is_accepted_as_noop() {
        // Support and oppose differ here on purpose; see DESIGN.md.
        let r = resolver();
        let mut graph = EvidenceGraph::empty();
        graph.add_support(vec![(ext("a"), 0.7)], &r).unwrap();
        let update = graph.add_oppose(Vec::<(String, f32)>::new(), &r).unwrap();
        assert_eq!(update, ConjunctionUpdate::Unchanged);
        assert!(graph.oppose().is_empty());
        graph.check_consistency(&r).unwrap();
    }

    #[test]
    fn unresolvable_reason_leaves_graph_unchanged() {
        let r = resolver();
        let mut graph = EvidenceGraph::empty();
        graph.add_support(vec![(ext("a"), 0.7)], &r).unwrap();
        let before = graph.clone();

        let err = graph.add_support(vec![(ext("missing"), 1.0)], &r).unwrap_err();
        assert!(matches!(err, EvidenceError::ReasonNotFound { .. }));
        assert_eq!(graph, before);

        let err = graph.add_support(vec![("/bogus/x", 1.0)], &r).unwrap_err();
        assert!(matches!(err, EvidenceError::UnknownReasonKind { .. }));
        assert_eq!(graph, before);
    }

    #[test]
    fn opposition_lowers_confidence() {
        let r = resolver();
        let mut graph = EvidenceGraph::empty();
        graph.add_support(vec![(ext("a"), 0.8)], &r).unwrap();
        assert!((graph.confidence_score() - 0.8).abs() < 1e-6);

        graph.add_oppose(vec![(ext("b"), 0.5)], &r).unwrap();
        assert!((graph.confidence_score() - 0.4).abs() < 1e-6);
    }

    #[test]
    fn get_support_resolves_reasons() {
        let r = resolver();
        let mut graph = EvidenceGraph::empty();
        graph.add_support(vec![(ext("a"), 1.0), (ext("b"), 0.5)], &r).unwrap();

        let support = graph.get_support(&r).unwrap();
        assert_eq!(support.len(), 1);
        assert_eq!(support[0].len(), 2);
        assert_eq!(support[0][1].1, 0.5);
        assert!(matches!(&support[0][0].0, ResolvedReason::External(e) if e.id == ext("a")));
        assert!(graph.get_oppose(&r).unwrap().is_empty());
    }

    #[test]
    fn from_disjunctions_builds_corrected_offsets() {
        let r = resolver();
        let graph = EvidenceGraph::from_disjunctions(
            vec![
                vec![(ext("a"), 1.0), (ext("b"), 1.0)],
                vec![(ext("c"), 1.0)],
            ],
            vec![vec![(ext("d"), 0.25)]],
            &r,
        )
        .unwrap();
        assert_eq!(graph.support().offsets(), &[0, 2]);
        assert_eq!(graph.oppose().offsets(), &[0]);
        assert!((graph.confidence_score() - 0.75).abs() < 1e-6);
        graph.check_consistency(&r).unwrap();
    }

    #[test]
    fn check_consistency_names_first_violation() {
        let r = resolver();
        let mut graph = EvidenceGraph::empty();
        graph.add_support(vec![(ext("a"), 1.0)], &r).unwrap();

        let mut broken = graph.clone();
        broken.support.offsets = vec![1];
        assert!(matches!(
            broken.check_consistency(&r),
            Err(EvidenceError::Consistency(ConsistencyViolation::FirstOffsetNotZero { .. }))
        ));

        let mut broken = graph.clone();
        broken.support.weights.push(1.0);
        assert!(matches!(
            broken.check_consistency(&r),
            Err(EvidenceError::Consistency(ConsistencyViolation::LengthMismatch { .. }))
        ));

        let mut broken = graph.clone();
        broken.support.offsets = vec![0, 0];
        assert!(matches!(
            broken.check_consistency(&r),
            Err(EvidenceError::Consistency(ConsistencyViolation::OffsetsNotIncreasing { index: 1, .. }))
        ));

        let mut broken = graph.clone();
        broken.oppose.flat.push(ReasonId::Statement(StatementId::new()));
        broken.oppose.weights.push(1.0);
        broken.oppose.offsets.push(0);
        assert!(matches!(
            broken.check_consistency(&r),
            Err(EvidenceError::Consistency(ConsistencyViolation::UnresolvedReason {
                tree: EvidencePolarity::Oppose,
                ..
            }))
        ));

        let mut broken = graph;
        broken.confidence_score = 1.5;
        assert!(matches!(
            broken.check_consistency(&r),
            Err(EvidenceError::Consistency(ConsistencyViolation::ScoreOutOfBounds { .. }))
        ));
    }

    #[test]
    fn deserialize_round_trips_valid_graph() {
        let r = resolver();
        let mut graph = EvidenceGraph::empty();
        graph.add_support(vec![(ext("a"), 1.0), (ext("b"), 0.5)], &r).unwrap();
        graph.add_oppose(vec![(ext("c"), 0.25)], &r).unwrap();

        let json = serde_json::to_string(&graph).unwrap();
        let back: EvidenceGraph = serde_json::from_str(&json).unwrap();
        assert_eq!(back, graph);
    }

    #[test]
    fn deserialize_rejects_broken_layout() {
        let json = r#"{
            "support": {"flat": ["/data/test/a"], "weights": [1.0], "offsets": [3]},
            "oppose": {"flat": [], "weights": [], "offsets": []},
            "confidence_score": 0.0
        }"#;
        let err = serde_json::from_str::<EvidenceGraph>(json).unwrap_err();
        assert!(err.to_string().contains("first offset is 3"));

        let json = r#"{
            "support": {"flat": ["/data/test/a"], "weights": [1.0, 0.5], "offsets": [0]},
            "oppose": {"flat": [], "weights": [], "offsets": []},
            "confidence_score": 0.0
        }"#;
        let err = serde_json::from_str::<EvidenceGraph>(json).unwrap_err();
        assert!(err.to_string().contains("1 reasons but 2 weights"));

        let json = r#"{
            "support": {"flat": [], "weights": [], "offsets": []},
            "oppose": {"flat": ["/data/test/a"], "weights": [1.0], "offsets": [0, 1]},
            "confidence_score": 0.0
        }"#;
        let err = serde_json::from_str::<EvidenceGraph>(json).unwrap_err();
        assert!(err.to_string().contains("oppose tree"));

        let json = r#"{
            "support": {"flat": [], "weights": [], "offsets": []},
            "oppose": {"flat": [], "weights": [], "offsets": []},
            "confidence_score": 2.0
        }"#;
        assert!(serde_json::from_str::<EvidenceGraph>(json).is_err());
    }
}
