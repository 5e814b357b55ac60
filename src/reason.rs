//! Reasons: references to evidence.
//!
//! A reason id names either another statement (`/assertion/<id>`) or an
//! external provenance record (`/data/...`). The kind is decided once,
//! when the id is parsed, and carried as a tagged value afterwards.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::EvidenceError;
use crate::statement::{Statement, StatementId};

/// Namespace prefix of statement reasons.
pub const STATEMENT_PREFIX: &str = "/assertion/";

/// Namespace prefix of external reasons.
pub const EXTERNAL_PREFIX: &str = "/data/";

/// A parsed reason identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum ReasonId {
    /// Evidence from another statement.
    Statement(StatementId),

    /// Evidence from an external provenance record, keyed by its full path.
    External(String),
}

impl ReasonId {
    /// Parses a raw reason id, dispatching on its namespace prefix.
    ///
    /// Trailing path segments after a statement id are accepted and dropped.
    ///
    /// # Errors
    ///
    /// - `UnknownReasonKind` if the prefix is neither `/assertion/` nor `/data/`
    /// - `MalformedReason` if a statement reason does not carry a valid id
    pub fn parse(raw: &str) -> Result<Self, EvidenceError> {
        if let Some(rest) = raw.strip_prefix(STATEMENT_PREFIX) {
            let id_part = rest.split('/').next().unwrap_or_default();
            let id = StatementId::from_str(id_part).map_err(|e| EvidenceError::MalformedReason {
                id: raw.to_string(),
                reason: format!("invalid statement id: {e}"),
            })?;
            return Ok(Self::Statement(id));
        }

        if let Some(rest) = raw.strip_prefix(EXTERNAL_PREFIX) {
            if rest.trim_matches('/').is_empty() {
                return Err(EvidenceError::MalformedReason {
                    id: raw.to_string(),
                    reason: "external reason has an empty path".to_string(),
                });
            }
            return Ok(Self::External(raw.to_string()));
        }

        Err(EvidenceError::UnknownReasonKind { id: raw.to_string() })
    }

    /// Statement id, if this names a statement.
    #[must_use]
    pub const fn as_statement(&self) -> Option<StatementId> {
        match self {
            Self::Statement(id) => Some(*id),
            Self::External(_) => None,
        }
    }

    /// True for `/data/...` reasons.
    #[must_use]
    pub const fn is_external(&self) -> bool {
        matches!(self, Self::External(_))
    }
}

impl fmt::Display for ReasonId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Statement(id) => write!(f, "{STATEMENT_PREFIX}{id}"),
            Self::External(path) => f.write_str(path),
        }
    }
}

impl FromStr for ReasonId {
    type Err = EvidenceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for ReasonId {
    type Error = EvidenceError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<ReasonId> for String {
    fn from(id: ReasonId) -> Self {
        id.to_string()
    }
}

/// Anything that can name a reason: a raw id or a resolvable entity.
#[derive(Debug, Clone, PartialEq)]
pub enum ReasonRef {
    /// Unparsed id, checked when used.
    Raw(String),
    /// Already parsed id.
    Id(ReasonId),
}

impl ReasonRef {
    /// Normalizes to a parsed id.
    ///
    /// # Errors
    ///
    /// Propagates parse errors for raw ids.
    pub fn into_reason_id(self) -> Result<ReasonId, EvidenceError> {
        match self {
            Self::Raw(raw) => ReasonId::parse(&raw),
            Self::Id(id) => Ok(id),
        }
    }
}

impl From<&str> for ReasonRef {
    fn from(raw: &str) -> Self {
        Self::Raw(raw.to_string())
    }
}

impl From<String> for ReasonRef {
    fn from(raw: String) -> Self {
        Self::Raw(raw)
    }
}

impl From<ReasonId> for ReasonRef {
    fn from(id: ReasonId) -> Self {
        Self::Id(id)
    }
}

impl From<&ReasonId> for ReasonRef {
    fn from(id: &ReasonId) -> Self {
        Self::Id(id.clone())
    }
}

impl From<StatementId> for ReasonRef {
    fn from(id: StatementId) -> Self {
        Self::Id(ReasonId::Statement(id))
    }
}

impl From<&Statement> for ReasonRef {
    fn from(statement: &Statement) -> Self {
        Self::Id(statement.reason_id())
    }
}

impl From<&ExternalReason> for ReasonRef {
    fn from(reason: &ExternalReason) -> Self {
        Self::Id(reason.reason_id())
    }
}

/// Which evidence tree a conjunction belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EvidencePolarity {
    /// Evidence for the claim.
    Support,
    /// Evidence against the claim.
    Oppose,
}

impl fmt::Display for EvidencePolarity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Support => write!(f, "support"),
            Self::Oppose => write!(f, "oppose"),
        }
    }
}

/// A reason id paired with its weight inside a conjunction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeightedReason {
    /// Cited reason.
    pub reason: ReasonId,
    /// Weight in [0, 1].
    pub weight: f32,
}

impl WeightedReason {
    /// Pairs a reason with a weight.
    #[must_use]
    pub const fn new(reason: ReasonId, weight: f32) -> Self {
        Self { reason, weight }
    }
}

/// Unique identifier for a reason record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ReasonRecordId(uuid::Uuid);

impl ReasonRecordId {
    /// Creates a new random reason record ID.
    #[must_use]
    pub fn new() -> Self {
        Self(uuid::Uuid::new_v4())
    }
}

impl Default for ReasonRecordId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ReasonRecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Provenance record: one conjunction of factors attached to a target statement.
///
/// Every factor carries the record's weight when the record is expanded
/// into an evidence conjunction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Reason {
    /// Record id.
    pub id: ReasonRecordId,
    /// Statement the record is evidence for.
    pub target: StatementId,
    /// Reasons conjoined by the record.
    pub factors: Vec<ReasonId>,
    /// Weight given to every factor.
    pub weight: f32,
    /// Tree the conjunction goes into.
    pub polarity: EvidencePolarity,
    /// Kept when the record is copied by a merge.
    pub created_at: DateTime<Utc>,
}

impl Reason {
    /// Creates a record.
    ///
    /// # Errors
    ///
    /// Returns `EmptyEvidence` if `factors` is empty.
    pub fn new(
        target: StatementId,
        factors: Vec<ReasonId>,
        weight: f32,
        polarity: EvidencePolarity,
    ) -> Result<Self, EvidenceError> {
        if factors.is_empty() {
            return Err(EvidenceError::EmptyEvidence { polarity });
        }
        Ok(Self {
            id: ReasonRecordId::new(),
            target,
            factors,
            weight,
            polarity,
            created_at: Utc::now(),
        })
    }

    /// Expands the record into an evidence conjunction.
    #[must_use]
    pub fn conjunction(&self) -> Vec<WeightedReason> {
        self.factors
            .iter()
            .map(|f| WeightedReason::new(f.clone(), self.weight))
            .collect()
    }

    /// True if this record carries the given `(target, factors, weight, polarity)` tuple.
    ///
    /// Weights compare bit-for-bit.
    #[must_use]
    pub fn matches(
        &self,
        target: StatementId,
        factors: &[ReasonId],
        weight: f32,
        polarity: EvidencePolarity,
    ) -> bool {
        self.target == target
            && self.polarity == polarity
            && self.weight.to_bits() == weight.to_bits()
            && self.factors == factors
    }
}

/// Leaf provenance record outside the statement graph, such as a contributor.
///
/// Immutable once created. Its confidence is fixed at 1.0.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExternalReason {
    /// Full `/data/...` path.
    pub id: String,

    /// Free-text note.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Creation time.
    pub created_at: DateTime<Utc>,
}

impl ExternalReason {
    /// Fixed confidence of every external reason.
    pub const CONFIDENCE: f32 = 1.0;

    /// Creates a record for a `/data/...` path.
    ///
    /// # Errors
    ///
    /// Returns an evidence error if `path` is not an external reason id.
    pub fn new(path: impl Into<String>) -> Result<Self, EvidenceError> {
        let path = path.into();
        match ReasonId::parse(&path)? {
            ReasonId::External(id) => Ok(Self {
                id,
                description: None,
                created_at: Utc::now(),
            }),
            ReasonId::Statement(_) => Err(EvidenceError::UnknownReasonKind { id: path }),
        }
    }

    /// The root reason of a dataset, e.g. `/data/test/root`.
    ///
    /// # Errors
    ///
    /// Returns an evidence error if `dataset` is not under `/data/`.
    pub fn root(dataset: &str) -> Result<Self, EvidenceError> {
        Self::new(format!("{}/root", dataset.trim_end_matches('/')))
    }

    /// Attribution of a contributor within a dataset, e.g. `/data/test/contributor/alice`.
    ///
    /// # Errors
    ///
    /// Returns an evidence error if `dataset` is not under `/data/`.
    pub fn contributor(dataset: &str, user: &str) -> Result<Self, EvidenceError> {
        Self::new(format!("{}/contributor/{user}", dataset.trim_end_matches('/')))
    }

    /// The tagged id of this record.
    #[must_use]
    pub fn reason_id(&self) -> ReasonId {
        ReasonId::External(self.id.clone())
    }

    /// Always [`Self::CONFIDENCE`].
    #[must_use]
    pub const fn confidence(&self) -> f32 {
        Self::CONFIDENCE
    }
}
