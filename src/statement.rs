//! Statements: claims about concepts.
//!
//! A Statement relates an ordered list of concepts through a relation,
//! scoped to a dataset and an optional context. Two statements with the
//! same [`IdentityKey`] are the same semantic claim, whatever their
//! storage ids.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{EvidenceError, ValidationError};
use crate::evidence::{ConjunctionUpdate, EvidenceGraph};
use crate::reason::{ReasonId, ReasonRef};
use crate::resolver::ReasonResolver;

/// Separator between arguments in an argument string.
pub const ARG_SEPARATOR: char = ',';

/// Replacement for separators that occur inside an argument.
pub const ARG_ESCAPE: char = '_';

/// Argument placeholder that marks a statement as incomplete.
pub const WILDCARD: &str = "*";

/// Unique identifier for a statement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StatementId(uuid::Uuid);

impl StatementId {
    /// Creates a new random statement ID.
    #[must_use]
    pub fn new() -> Self {
        Self(uuid::Uuid::new_v4())
    }
}

impl Default for StatementId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for StatementId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<uuid::Uuid> for StatementId {
    fn from(uuid: uuid::Uuid) -> Self {
        Self(uuid)
    }
}

impl FromStr for StatementId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        uuid::Uuid::parse_str(s).map(Self)
    }
}

/// Whether a statement asserts, denies, or is neutral about its claim.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "i64")]
pub enum Polarity {
    /// Serialized as -1.
    Negative,
    /// Serialized as 0.
    Neutral,
    /// Serialized as 1.
    Positive,
}

impl Default for Polarity {
    fn default() -> Self {
        Self::Positive
    }
}

impl Polarity {
    /// Numeric form (-1, 0, 1).
    #[must_use]
    pub const fn as_i64(self) -> i64 {
        match self {
            Self::Negative => -1,
            Self::Neutral => 0,
            Self::Positive => 1,
        }
    }
}

impl TryFrom<i64> for Polarity {
    type Error = ValidationError;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        match value {
            -1 => Ok(Self::Negative),
            0 => Ok(Self::Neutral),
            1 => Ok(Self::Positive),
            other => Err(ValidationError::InvalidPolarity { value: other }),
        }
    }
}

impl From<Polarity> for i64 {
    fn from(p: Polarity) -> Self {
        p.as_i64()
    }
}

impl fmt::Display for Polarity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_i64())
    }
}

/// Joins arguments into the normalized argument string.
///
/// Separators inside an argument are replaced before joining. The mapping
/// is lossy: `["a,b"]` and `["a_b"]` produce the same string.
#[must_use]
pub fn make_arg_string<S: AsRef<str>>(arguments: &[S]) -> String {
    let escape = ARG_ESCAPE.to_string();
    arguments
        .iter()
        .map(|arg| arg.as_ref().replace(ARG_SEPARATOR, &escape))
        .collect::<Vec<_>>()
        .join(&ARG_SEPARATOR.to_string())
}

/// The tuple that decides whether two statements are the same claim.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct IdentityKey {
    /// Dataset path.
    pub dataset: String,
    /// Relation path.
    pub relation: String,
    /// Claim polarity.
    pub polarity: Polarity,
    /// Joined arguments, see [`make_arg_string`].
    pub argstring: String,
    /// Optional context.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context: Option<String>,
}

impl IdentityKey {
    /// Stable content hash of the key, independent of storage ids.
    #[must_use]
    pub fn fingerprint(&self) -> String {
        let polarity = self.polarity.to_string();
        let mut hasher = blake3::Hasher::new();
        for part in [
            self.dataset.as_str(),
            self.relation.as_str(),
            polarity.as_str(),
            self.argstring.as_str(),
            self.context.as_deref().unwrap_or(""),
        ] {
            hasher.update(&(part.len() as u64).to_le_bytes());
            hasher.update(part.as_bytes());
        }
        hasher.update(&[u8::from(self.context.is_some())]);
        hasher.finalize().to_hex().to_string()
    }
}

impl fmt::Display for IdentityKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} [{}] polarity={}",
            self.dataset, self.relation, self.argstring, self.polarity
        )?;
        if let Some(ctx) = &self.context {
            write!(f, " context={ctx}")?;
        }
        Ok(())
    }
}

/// A natural-language rendering of a statement.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Expression {
    /// The rendered text.
    pub text: String,
    /// Language code, e.g. `en`.
    pub language: String,
}

impl Expression {
    /// Expression of `text` in `language`.
    #[must_use]
    pub fn new(text: impl Into<String>, language: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            language: language.into(),
        }
    }
}

/// Validated fields for creating a statement.
///
/// Stores assign the id, the empty evidence graph and the version.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewStatement {
    /// Dataset path, e.g. `/data/conceptnet`.
    pub dataset: String,
    /// Relation path, e.g. `/rel/IsA`.
    pub relation: String,
    /// Ordered arguments.
    pub arguments: Vec<String>,
    /// Optional context.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context: Option<String>,
    /// Claim polarity.
    pub polarity: Polarity,
    /// Renderings of the claim.
    #[serde(default)]
    pub expressions: Vec<Expression>,
}

impl NewStatement {
    /// Shorthand for [`StatementBuilder::new`].
    #[must_use]
    pub fn builder() -> StatementBuilder {
        StatementBuilder::new()
    }

    /// Argument string of these fields.
    #[must_use]
    pub fn argstring(&self) -> String {
        make_arg_string(&self.arguments)
    }

    /// Identity key these fields will have once stored.
    #[must_use]
    pub fn identity_key(&self) -> IdentityKey {
        IdentityKey {
            dataset: self.dataset.clone(),
            relation: self.relation.clone(),
            polarity: self.polarity,
            argstring: self.argstring(),
            context: self.context.clone(),
        }
    }

    /// Copies the claim fields of an existing statement.
    ///
    /// Evidence is not copied; callers attach it after creation.
    #[must_use]
    pub fn from_statement(statement: &Statement) -> Self {
        Self {
            dataset: statement.dataset.clone(),
            relation: statement.relation.clone(),
            arguments: statement.arguments.clone(),
            context: statement.context.clone(),
            polarity: statement.polarity,
            expressions: statement.expressions.clone(),
        }
    }
}

/// Builder for [`NewStatement`].
#[derive(Debug, Default)]
pub struct StatementBuilder {
    dataset: Option<String>,
    relation: Option<String>,
    arguments: Vec<String>,
    context: Option<String>,
    polarity: Option<Polarity>,
    expressions: Vec<Expression>,
}

impl StatementBuilder {
    /// Empty builder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the dataset.
    #[must_use]
    pub fn dataset(mut self, dataset: impl Into<String>) -> Self {
        self.dataset = Some(dataset.into());
        self
    }

    /// Sets the relation.
    #[must_use]
    pub fn relation(mut self, relation: impl Into<String>) -> Self {
        self.relation = Some(relation.into());
        self
    }

    /// Appends one argument.
    #[must_use]
    pub fn argument(mut self, argument: impl Into<String>) -> Self {
        self.arguments.push(argument.into());
        self
    }

    /// Appends several arguments.
    #[must_use]
    pub fn arguments<I, S>(mut self, arguments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.arguments.extend(arguments.into_iter().map(Into::into));
        self
    }

    /// Sets the context.
    #[must_use]
    pub fn context(mut self, context: impl Into<String>) -> Self {
        self.context = Some(context.into());
        self
    }

    /// Sets the polarity. Defaults to positive.
    #[must_use]
    pub fn polarity(mut self, polarity: Polarity) -> Self {
        self.polarity = Some(polarity);
        self
    }

    /// Appends an expression.
    #[must_use]
    pub fn expression(mut self, expression: Expression) -> Self {
        self.expressions.push(expression);
        self
    }

    /// Validates and builds the fields.
    ///
    /// # Errors
    ///
    /// Returns `ValidationError` if the dataset, relation or argument list is empty.
    pub fn build(self) -> Result<NewStatement, ValidationError> {
        let dataset = self.dataset.map(|d| d.trim().to_string()).unwrap_or_default();
        if dataset.is_empty() {
            return Err(ValidationError::EmptyDataset);
        }
        let relation = self.relation.map(|r| r.trim().to_string()).unwrap_or_default();
        if relation.is_empty() {
            return Err(ValidationError::EmptyRelation);
        }
        if self.arguments.is_empty() {
            return Err(ValidationError::EmptyArguments);
        }

        Ok(NewStatement {
            dataset,
            relation,
            arguments: self.arguments,
            context: self.context,
            polarity: self.polarity.unwrap_or_default(),
            expressions: self.expressions,
        })
    }
}

/// A stored claim with its evidence.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Statement {
    /// Store-independent id.
    pub id: StatementId,
    /// Dataset path.
    pub dataset: String,
    /// Relation path.
    pub relation: String,
    /// Ordered arguments.
    pub arguments: Vec<String>,
    /// Joined arguments, derived on creation.
    pub argstring: String,

    /// False if any argument is the wildcard placeholder.
    pub complete: bool,

    /// Optional context.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context: Option<String>,

    /// Claim polarity.
    pub polarity: Polarity,

    /// Renderings of the claim.
    #[serde(default)]
    pub expressions: Vec<Expression>,

    /// Support and opposition with the cached score.
    pub evidence: EvidenceGraph,

    /// Bumped by the store on every successful update.
    pub version: u64,

    /// Creation time.
    pub created_at: DateTime<Utc>,
}

impl Statement {
    /// Materializes validated fields with a fresh id and empty evidence.
    #[must_use]
    pub fn new(fields: NewStatement) -> Self {
        let argstring = fields.argstring();
        let complete = !fields.arguments.iter().any(|a| a == WILDCARD);
        Self {
            id: StatementId::new(),
            dataset: fields.dataset,
            relation: fields.relation,
            arguments: fields.arguments,
            argstring,
            complete,
            context: fields.context,
            polarity: fields.polarity,
            expressions: fields.expressions,
            evidence: EvidenceGraph::empty(),
            version: 1,
            created_at: Utc::now(),
        }
    }

    /// Key used to match this statement across stores.
    #[must_use]
    pub fn identity_key(&self) -> IdentityKey {
        IdentityKey {
            dataset: self.dataset.clone(),
            relation: self.relation.clone(),
            polarity: self.polarity,
            argstring: self.argstring.clone(),
            context: self.context.clone(),
        }
    }

    /// The reason id other statements use to cite this one.
    #[must_use]
    pub const fn reason_id(&self) -> ReasonId {
        ReasonId::Statement(self.id)
    }

    /// Derived confidence score of this statement.
    #[must_use]
    pub fn confidence(&self) -> f32 {
        self.evidence.confidence_score()
    }

    /// Adds a supporting conjunction. See [`EvidenceGraph::add_support`].
    ///
    /// # Errors
    ///
    /// Errors are attributed to this statement.
    pub fn add_support<I, R>(
        &mut self,
        reasons: I,
        resolver: &dyn ReasonResolver,
    ) -> Result<ConjunctionUpdate, EvidenceError>
    where
        I: IntoIterator<Item = (R, f32)>,
        R: Into<ReasonRef>,
    {
        self.evidence
            .add_support(reasons, resolver)
            .map_err(|e| e.in_statement(self.id))
    }

    /// Adds an opposing conjunction. See [`EvidenceGraph::add_oppose`].
    ///
    /// # Errors
    ///
    /// Errors are attributed to this statement.
    pub fn add_oppose<I, R>(
        &mut self,
        reasons: I,
        resolver: &dyn ReasonResolver,
    ) -> Result<ConjunctionUpdate, EvidenceError>
    where
        I: IntoIterator<Item = (R, f32)>,
        R: Into<ReasonRef>,
    {
        self.evidence
            .add_oppose(reasons, resolver)
            .map_err(|e| e.in_statement(self.id))
    }

    /// Validates the evidence graph of this statement.
    ///
    /// # Errors
    ///
    /// Returns the first violated invariant, attributed to this statement.
    pub fn check_consistency(&self, resolver: &dyn ReasonResolver) -> Result<(), EvidenceError> {
        if self.argstring != make_arg_string(&self.arguments) {
            return Err(EvidenceError::Consistency(
                crate::evidence::ConsistencyViolation::ArgstringMismatch {
                    stored: self.argstring.clone(),
                },
            )
            .in_statement(self.id));
        }
        self.evidence
            .check_consistency(resolver)
            .map_err(|e| e.in_statement(self.id))
    }
}

impl PartialEq for Statement {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Statement {}

impl std::hash::Hash for Statement {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fields(args: &[&str]) -> NewStatement {
        NewStatement::builder()
            .dataset("/data/test")
            .relation("/rel/IsA")
            .arguments(args.iter().copied())
            .build()
            .unwrap()
    }

    #[test]
    fn arg_string_escapes_separators() {
        assert_eq!(make_arg_string(&["a", "b"]), "a,b");
        assert_eq!(make_arg_string(&["a,b", "c"]), "a_b,c");
    }

    #[test]
    fn arg_string_collision_is_lossy() {
        assert_eq!(make_arg_string(&["x,y"]), make_arg_string(&["x_y"]));
    }

    #[test]
    fn builder_rejects_missing_fields() {
        assert!(matches!(
            NewStatement::builder().relation("/rel/IsA").argument("a").build(),
            Err(ValidationError::EmptyDataset)
        ));
        assert!(matches!(
            NewStatement::builder().dataset("/data/test").argument("a").build(),
            Err(ValidationError::EmptyRelation)
        ));
        assert!(matches!(
            NewStatement::builder().dataset("/data/test").relation("/rel/IsA").build(),
            Err(ValidationError::EmptyArguments)
        ));
    }

    #[test]
    fn wildcard_marks_statement_incomplete() {
        assert!(Statement::new(fields(&["/c/dog", "/c/animal"])).complete);
        assert!(!Statement::new(fields(&["/c/dog", WILDCARD])).complete);
    }

    #[test]
    fn identity_key_ignores_storage_id() {
        let a = Statement::new(fields(&["/c/dog", "/c/animal"]));
        let b = Statement::new(fields(&["/c/dog", "/c/animal"]));
        assert_ne!(a.id, b.id);
        assert_eq!(a.identity_key(), b.identity_key());
        assert_eq!(a.identity_key().fingerprint(), b.identity_key().fingerprint());
        assert_eq!(a.identity_key(), fields(&["/c/dog", "/c/animal"]).identity_key());
    }

    #[test]
    fn identity_key_distinguishes_context_and_polarity() {
        let base = fields(&["/c/dog", "/c/animal"]);
        let mut negated = base.clone();
        negated.polarity = Polarity::Negative;
        let mut in_context = base.clone();
        in_context.context = Some(String::new());

        assert_ne!(base.identity_key(), negated.identity_key());
        assert_ne!(base.identity_key(), in_context.identity_key());
        assert_ne!(
            base.identity_key().fingerprint(),
            in_context.identity_key().fingerprint()
        );
    }

    #[test]
    fn polarity_round_trips_through_integers() {
        assert_eq!(Polarity::try_from(-1).unwrap(), Polarity::Negative);
        assert!(matches!(
            Polarity::try_from(2),
            Err(ValidationError::InvalidPolarity { value: 2 })
        ));
        let json = serde_json::to_string(&Polarity::Negative).unwrap();
        assert_eq!(json, "-1");
        assert!(serde_json::from_str::<Polarity>("5").is_err());
    }

    #[test]
    fn evidence_errors_name_the_statement() {
        use crate::evidence::ConsistencyViolation;
        use crate::reason::EvidencePolarity;
        use crate::resolver::StaticResolver;

        let resolver = StaticResolver::new();
        let mut s = Statement::new(fields(&["/c/dog", "/c/animal"]));
        let err = s.add_support(Vec::<(String, f32)>::new(), &resolver).unwrap_err();
        match &err {
            EvidenceError::InStatement { statement, source } => {
                assert_eq!(*statement, s.id);
                assert!(matches!(
                    **source,
                    EvidenceError::EmptyEvidence {
                        polarity: EvidencePolarity::Support
                    }
                ));
            }
            other => panic!("unattributed error: {other}"),
        }

        s.argstring = "/c/cat,/c/animal".to_string();
        let err = s.check_consistency(&resolver).unwrap_err();
        assert!(matches!(err, EvidenceError::InStatement { statement, .. } if statement == s.id));
        assert!(matches!(
            err.root(),
            EvidenceError::Consistency(ConsistencyViolation::ArgstringMismatch { .. })
        ));
    }
}
