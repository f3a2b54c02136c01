//! Domain filters: the backend's query expression language.
//!
//! A domain is a list of terms in prefix (Polish) notation. Conditions are
//! `(field, operator, value)` triples; logical operators `&`, `|` and `!`
//! combine the terms that follow them. Terms left over at the top level are
//! implicitly AND-ed, so an empty domain matches every record.

use std::fmt;

use serde::Serialize;
use serde::ser::{SerializeSeq, Serializer};
use serde_json::Value;

use crate::client::RecordId;

/// Comparison operator of a single condition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operator {
    Eq,
    NotEq,
    In,
    NotIn,
    Like,
    ILike,
    Gt,
    Ge,
    Lt,
    Le,
}

impl Operator {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Eq => "=",
            Self::NotEq => "!=",
            Self::In => "in",
            Self::NotIn => "not in",
            Self::Like => "like",
            Self::ILike => "ilike",
            Self::Gt => ">",
            Self::Ge => ">=",
            Self::Lt => "<",
            Self::Le => "<=",
        }
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single `(field, operator, value)` triple.
#[derive(Debug, Clone, PartialEq)]
pub struct Condition {
    pub field: String,
    pub operator: Operator,
    pub value: Value,
}

/// Escape `like`/`ilike` wildcards so `text` matches only itself.
#[must_use]
pub fn escape_like(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

impl Condition {
    pub fn new(field: impl Into<String>, operator: Operator, value: impl Into<Value>) -> Self {
        Self {
            field: field.into(),
            operator,
            value: value.into(),
        }
    }
}

impl Serialize for Condition {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut seq = serializer.serialize_seq(Some(3))?;
        seq.serialize_element(&self.field)?;
        seq.serialize_element(self.operator.as_str())?;
        seq.serialize_element(&self.value)?;
        seq.end()
    }
}

/// One element of a domain in prefix notation.
#[derive(Debug, Clone, PartialEq)]
pub enum Term {
    Condition(Condition),
    And,
    Or,
    Not,
}

impl Serialize for Term {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match self {
            Self::Condition(c) => c.serialize(serializer),
            Self::And => serializer.serialize_str("&"),
            Self::Or => serializer.serialize_str("|"),
            Self::Not => serializer.serialize_str("!"),
        }
    }
}

/// Query expression sent to `search_read`.
#[derive(Debug, Clone, Default, PartialEq)]
#[must_use]
pub struct Domain {
    terms: Vec<Term>,
}

impl Domain {
    /// Matches every record.
    pub fn all() -> Self {
        Self::default()
    }

    /// Matches the record with the given id.
    pub fn by_id(id: RecordId) -> Self {
        Self::all().with("id", Operator::Eq, id)
    }

    /// Matches any of the given ids.
    pub fn by_ids(ids: &[RecordId]) -> Self {
        Self::all().with("id", Operator::In, ids.to_vec())
    }

    /// AND-s a condition onto the domain.
    pub fn with(
        mut self,
        field: impl Into<String>,
        operator: Operator,
        value: impl Into<Value>,
    ) -> Self {
        self.terms
            .push(Term::Condition(Condition::new(field, operator, value)));
        self
    }

    /// AND-s the disjunction of `conditions` onto the domain.
    ///
    /// An empty list leaves the domain unchanged.
    pub fn with_any(mut self, conditions: Vec<Condition>) -> Self {
        let n = conditions.len();
        if n == 0 {
            return self;
        }
        self.terms
            .extend(std::iter::repeat_n(Term::Or, n.saturating_sub(1)));
        self.terms
            .extend(conditions.into_iter().map(Term::Condition));
        self
    }

    /// AND-s the negation of a condition onto the domain.
    pub fn without(
        mut self,
        field: impl Into<String>,
        operator: Operator,
        value: impl Into<Value>,
    ) -> Self {
        self.terms.push(Term::Not);
        self.terms
            .push(Term::Condition(Condition::new(field, operator, value)));
        self
    }

    #[must_use]
    pub fn terms(&self) -> &[Term] {
        &self.terms
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }
}

impl Serialize for Domain {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut seq = serializer.serialize_seq(Some(self.terms.len()))?;
        for term in &self.terms {
            seq.serialize_element(term)?;
        }
        seq.end()
    }
}
