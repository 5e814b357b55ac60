//! Reconciliation of two statement stores.
//!
//! A merge makes each store contain the union of both stores' statements,
//! deduplicated by identity key. Statements missing from a store are
//! created there with their evidence. Reasons targeting a statement that
//! both stores hold are folded onto the receiving store's copy.
//!
//! Both directions are scanned before anything is written. Each direction
//! then applies its staged writes, creates before folds. Applying checks
//! that the target did not change since its scan. A failed run can be
//! retried as a whole: creates are keyed by identity and folds skip
//! reasons the target already has.

mod apply;
mod index;
mod plan;

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{ConceptError, Direction, MergeError, ValidationError};
use crate::storage::Stores;

pub use index::{IdentityIndex, IndexStrategy};
pub use plan::DirectionPlan;

/// Settings for a merge run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MergeConfig {
    /// Restrict the merge to statements in this dataset. Others stay untouched.
    pub dataset: Option<String>,

    /// How target statements are looked up by identity key.
    pub index: IndexStrategy,

    /// Refuse to apply a direction if its target changed since the scan.
    pub check_revisions: bool,

    /// Validate every written statement after applying.
    pub verify_consistency: bool,
}

impl Default for MergeConfig {
    fn default() -> Self {
        Self {
            dataset: None,
            index: IndexStrategy::Hashed,
            check_revisions: true,
            verify_consistency: false,
        }
    }
}

impl MergeConfig {
    /// Config restricted to one dataset.
    #[must_use]
    pub fn for_dataset(dataset: impl Into<String>) -> Self {
        Self {
            dataset: Some(dataset.into()),
            ..Self::default()
        }
    }

    /// Checks the settings.
    ///
    /// # Errors
    ///
    /// Returns `EmptyDataset` if a dataset filter is set but blank.
    pub fn validate(self) -> Result<Self, ConceptError> {
        if let Some(dataset) = &self.dataset {
            if dataset.trim().is_empty() {
                return Err(ValidationError::EmptyDataset.into());
            }
        }
        Ok(self)
    }

    /// Parses and validates a JSON config. Missing fields take their defaults.
    ///
    /// # Errors
    ///
    /// Returns `Config` for malformed JSON, or a validation error.
    pub fn from_json_str(json: &str) -> Result<Self, ConceptError> {
        let config: Self = serde_json::from_str(json)
            .map_err(|e| ConceptError::config(format!("invalid merge config: {e}")))?;
        config.validate()
    }

    /// Reads a JSON config file.
    ///
    /// # Errors
    ///
    /// Returns `Config` if the file cannot be read, plus the errors of
    /// [`Self::from_json_str`].
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, ConceptError> {
        let path = path.as_ref();
        let json = fs::read_to_string(path)
            .map_err(|e| ConceptError::config(format!("cannot read {}: {e}", path.display())))?;
        Self::from_json_str(&json)
    }
}

/// What one direction wrote.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirectionReport {
    /// Direction this report covers.
    pub direction: Direction,
    /// Source statements in scope.
    pub scanned: usize,
    /// Statements created in the target.
    pub created: usize,
    /// Reason records copied along with created statements.
    pub records_copied: usize,
    /// Reasons folded onto existing target statements.
    pub folded: usize,
    /// Folds skipped because the target already held an equivalent reason.
    pub duplicate_folds: usize,
    /// External reasons copied into the target.
    pub externals_copied: usize,
}

impl DirectionReport {
    /// Empty report for a direction.
    #[must_use]
    pub const fn new(direction: Direction, scanned: usize) -> Self {
        Self {
            direction,
            scanned,
            created: 0,
            records_copied: 0,
            folded: 0,
            duplicate_folds: 0,
            externals_copied: 0,
        }
    }

    /// True if the direction wrote nothing.
    #[must_use]
    pub const fn is_noop(&self) -> bool {
        self.created == 0 && self.records_copied == 0 && self.folded == 0 && self.externals_copied == 0
    }
}

/// Outcome of a merge run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergeReport {
    /// Writes into the right store.
    pub left_to_right: DirectionReport,
    /// Writes into the left store.
    pub right_to_left: DirectionReport,
}

impl MergeReport {
    /// Statements created across both stores.
    #[must_use]
    pub const fn total_created(&self) -> usize {
        self.left_to_right.created + self.right_to_left.created
    }

    /// Reasons folded across both stores.
    #[must_use]
    pub const fn total_folded(&self) -> usize {
        self.left_to_right.folded + self.right_to_left.folded
    }

    /// True if neither store was written.
    #[must_use]
    pub const fn is_noop(&self) -> bool {
        self.left_to_right.is_noop() && self.right_to_left.is_noop()
    }
}

/// Staged writes of both directions.
#[derive(Debug, Clone)]
pub struct MergePlan {
    /// Writes into the right store.
    pub left_to_right: DirectionPlan,
    /// Writes into the left store.
    pub right_to_left: DirectionPlan,
}

impl MergePlan {
    /// True if applying the plan cannot change either store.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.left_to_right.is_empty() && self.right_to_left.is_empty()
    }
}

/// Reconciles pairs of stores.
#[derive(Debug, Clone, Default)]
pub struct MergeEngine {
    config: MergeConfig,
}

impl MergeEngine {
    /// Engine using `config`.
    #[must_use]
    pub const fn new(config: MergeConfig) -> Self {
        Self { config }
    }

    /// Settings in use.
    #[must_use]
    pub const fn config(&self) -> &MergeConfig {
        &self.config
    }

    /// Scans both directions without writing.
    ///
    /// # Errors
    ///
    /// Returns `DanglingFactor` if carried evidence cites something with no
    /// counterpart in the receiving store, or a storage error.
    pub fn plan(&self, left: &Stores, right: &Stores) -> Result<MergePlan, MergeError> {
        Ok(MergePlan {
            left_to_right: plan::scan(Direction::LeftToRight, left, right, &self.config)?,
            right_to_left: plan::scan(Direction::RightToLeft, right, left, &self.config)?,
        })
    }

    /// Applies a plan made by [`Self::plan`] for the same pair of stores.
    ///
    /// # Errors
    ///
    /// Returns `ConcurrentModification` if a target changed since the scan,
    /// or the first evidence or storage error. Writes made before the error
    /// stay in place.
    pub fn apply(&self, plan: &MergePlan, left: &Stores, right: &Stores) -> Result<MergeReport, MergeError> {
        let left_to_right = self.apply_direction(&plan.left_to_right, right)?;
        let right_to_left = self.apply_direction(&plan.right_to_left, left)?;
        Ok(MergeReport {
            left_to_right,
            right_to_left,
        })
    }

    /// Scans and applies both directions.
    ///
    /// # Errors
    ///
    /// See [`Self::plan`] and [`Self::apply`].
    pub fn merge(&self, left: &Stores, right: &Stores) -> Result<MergeReport, MergeError> {
        let plan = self.plan(left, right)?;
        self.apply(&plan, left, right)
    }

    fn apply_direction(&self, plan: &DirectionPlan, target: &Stores) -> Result<DirectionReport, MergeError> {
        let direction = plan.direction();
        tracing::info!(
            %direction,
            target = plan.target_store(),
            dataset = self.config.dataset.as_deref().unwrap_or("*"),
            creates = plan.create_count(),
            folds = plan.fold_count(),
            "merge direction started"
        );
        let report = apply::apply(plan, target, &self.config)?;
        tracing::info!(
            %direction,
            target = plan.target_store(),
            created = report.created,
            folded = report.folded,
            duplicate_folds = report.duplicate_folds,
            externals_copied = report.externals_copied,
            "merge direction finished"
        );
        Ok(report)
    }
}

/// Merges two stores with the default settings.
///
/// # Errors
///
/// See [`MergeEngine::merge`].
pub fn merge(left: &Stores, right: &Stores) -> Result<MergeReport, MergeError> {
    MergeEngine::default().merge(left, right)
}

/// Merges only the statements of one dataset.
///
/// # Errors
///
/// See [`MergeEngine::merge`].
pub fn merge_dataset(left: &Stores, right: &Stores, dataset: &str) -> Result<MergeReport, MergeError> {
    MergeEngine::new(MergeConfig::for_dataset(dataset)).merge(left, right)
}
