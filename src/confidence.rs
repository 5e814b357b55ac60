//! Confidence scoring over evidence graphs.
//!
//! A conjunction holds with the product of its clamped factor confidences
//! times their clamped weights. A disjunction combines its conjunctions by
//! noisy-OR. A statement's confidence is `P(support) * (1 - P(oppose))`,
//! treating support and opposition as independent.
//!
//! Incremental scoring ([`ConfidenceEngine::score`]) reads the stored
//! score of every cited statement and never recurses. Deep re-evaluation
//! goes through [`RecursiveEvaluator`], which cuts cycles.

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::error::EvidenceError;
use crate::evidence::{EvidenceGraph, EvidenceTree, ResolvedConjunction};
use crate::reason::ReasonId;
use crate::resolver::ReasonResolver;
use crate::statement::StatementId;

/// Clamps to [0, 1]; NaN counts as 0.
#[must_use]
pub fn clamp_unit(value: f32) -> f64 {
    if value.is_nan() {
        0.0
    } else {
        f64::from(value.clamp(0.0, 1.0))
    }
}

#[allow(clippy::cast_possible_truncation)]
fn to_score(p: f64) -> f32 {
    p.clamp(0.0, 1.0) as f32
}

/// Stateless scoring functions.
#[derive(Debug, Clone, Copy, Default)]
pub struct ConfidenceEngine;

impl ConfidenceEngine {
    /// Probability that every factor of a conjunction holds.
    ///
    /// Factors are `(reason confidence, weight)` pairs.
    pub fn conjunction_probability<I>(factors: I) -> f64
    where
        I: IntoIterator<Item = (f32, f32)>,
    {
        factors
            .into_iter()
            .map(|(confidence, weight)| clamp_unit(confidence) * clamp_unit(weight))
            .product()
    }

    /// Noisy-OR of conjunction probabilities. Empty input gives 0.
    pub fn noisy_or<I>(probabilities: I) -> f64
    where
        I: IntoIterator<Item = f64>,
    {
        let inverse: f64 = probabilities.into_iter().map(|p| 1.0 - p.clamp(0.0, 1.0)).product();
        1.0 - inverse
    }

    /// Confidence of a resolved disjunction.
    #[must_use]
    pub fn compute_confidence(disjunction: &[ResolvedConjunction]) -> f32 {
        to_score(Self::noisy_or(disjunction.iter().map(|conj| {
            Self::conjunction_probability(conj.iter().map(|(reason, weight)| (reason.confidence(), *weight)))
        })))
    }

    /// Combines support and opposition into a statement confidence.
    #[must_use]
    pub fn combine(support: f32, oppose: f32) -> f32 {
        to_score(clamp_unit(support) * (1.0 - clamp_unit(oppose)))
    }

    fn tree_probability(tree: &EvidenceTree, resolver: &dyn ReasonResolver) -> Result<f64, EvidenceError> {
        let mut probabilities = Vec::with_capacity(tree.len());
        for conj in tree.conjunctions() {
            let mut factors = Vec::with_capacity(conj.len());
            for wr in conj {
                factors.push((resolver.confidence(&wr.reason)?, wr.weight));
            }
            probabilities.push(Self::conjunction_probability(factors));
        }
        Ok(Self::noisy_or(probabilities))
    }

    /// Scores a graph using the stored confidence of every cited reason.
    ///
    /// # Errors
    ///
    /// Returns a resolution error if a reason does not resolve.
    pub fn score(graph: &EvidenceGraph, resolver: &dyn ReasonResolver) -> Result<f32, EvidenceError> {
        let support = Self::tree_probability(graph.support(), resolver)?;
        let oppose = Self::tree_probability(graph.oppose(), resolver)?;
        Ok(to_score(support * (1.0 - oppose)))
    }

    /// Recomputes a statement's confidence through its statement reasons.
    ///
    /// Shorthand for a one-off [`RecursiveEvaluator`].
    ///
    /// # Errors
    ///
    /// Returns a resolution error if any reason on the way does not resolve.
    pub fn evaluate(
        id: StatementId,
        resolver: &dyn ReasonResolver,
        config: ConfidenceConfig,
    ) -> Result<f32, EvidenceError> {
        RecursiveEvaluator::new(resolver, config).evaluate(id)
    }
}

/// Limits for [`RecursiveEvaluator`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConfidenceConfig {
    /// Past this depth a statement contributes its stored score.
    pub max_depth: usize,

    /// Confidence of a statement reached again while it is being evaluated.
    pub cycle_sentinel: f32,
}

impl Default for ConfidenceConfig {
    fn default() -> Self {
        Self {
            max_depth: 32,
            cycle_sentinel: 0.0,
        }
    }
}

/// Recomputes confidence through chains of statement reasons.
///
/// A statement met again on the current evaluation path contributes
/// `cycle_sentinel`. Results are memoized for the lifetime of the evaluator.
pub struct RecursiveEvaluator<'a> {
    resolver: &'a dyn ReasonResolver,
    config: ConfidenceConfig,
    memo: HashMap<StatementId, f32>,
    path: HashSet<StatementId>,
    cycles_cut: usize,
}

impl<'a> RecursiveEvaluator<'a> {
    /// Evaluator with an empty memo.
    #[must_use]
    pub fn new(resolver: &'a dyn ReasonResolver, config: ConfidenceConfig) -> Self {
        Self {
            resolver,
            config,
            memo: HashMap::new(),
            path: HashSet::new(),
            cycles_cut: 0,
        }
    }

    /// Number of back-edges replaced by the sentinel so far.
    #[must_use]
    pub const fn cycles_cut(&self) -> usize {
        self.cycles_cut
    }

    /// Evaluates the confidence of a statement from its leaves.
    ///
    /// # Errors
    ///
    /// Returns a resolution error if any reason on the way does not resolve.
    pub fn evaluate(&mut self, id: StatementId) -> Result<f32, EvidenceError> {
        self.visit(id, 0)
    }

    fn visit(&mut self, id: StatementId, depth: usize) -> Result<f32, EvidenceError> {
        if let Some(&score) = self.memo.get(&id) {
            return Ok(score);
        }
        if self.path.contains(&id) {
            self.cycles_cut += 1;
            tracing::debug!(statement = %id, depth, "confidence cycle cut");
            return Ok(to_score(clamp_unit(self.config.cycle_sentinel)));
        }

        let statement = self.resolver.statement(id)?;
        if depth >= self.config.max_depth {
            return Ok(statement.confidence());
        }

        self.path.insert(id);
        let result = self
            .tree_probability(statement.evidence.support(), depth)
            .and_then(|support| {
                let oppose = self.tree_probability(statement.evidence.oppose(), depth)?;
                Ok(to_score(support * (1.0 - oppose)))
            });
        self.path.remove(&id);

        let score = result.map_err(|e| e.in_statement(id))?;
        self.memo.insert(id, score);
        Ok(score)
    }

    fn tree_probability(&mut self, tree: &EvidenceTree, depth: usize) -> Result<f64, EvidenceError> {
        let mut probabilities = Vec::with_capacity(tree.len());
        for conj in tree.conjunctions() {
            let mut factors = Vec::with_capacity(conj.len());
            for wr in conj {
                let confidence = match &wr.reason {
                    ReasonId::Statement(cited) => self.visit(*cited, depth + 1)?,
                    ReasonId::External(_) => self.resolver.confidence(&wr.reason)?,
                };
                factors.push((confidence, wr.weight));
            }
            probabilities.push(ConfidenceEngine::conjunction_probability(factors));
        }
        Ok(ConfidenceEngine::noisy_or(probabilities))
    }
}
