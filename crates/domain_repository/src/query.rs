//! Query filters over document fields
//!
//! Filters are plain data so they can be shipped to a remote store or
//! evaluated in process by the in-memory adapter. Field paths use the
//! document's serialized (camelCase) names; nested fields are separated
//! by dots, e.g. `shippingAddress.city`.

use std::cmp::Ordering;

use serde_json::Value;

/// Field name of the soft-delete flag in stored documents
pub const IS_DELETED_FIELD: &str = "isDeleted";

/// Field name of the document id
pub const ID_FIELD: &str = "id";

/// Field name of the entity kind the repository writes into each document
pub const KIND_FIELD: &str = "entityKind";

/// A predicate over a JSON document
#[derive(Debug, Clone, PartialEq)]
pub enum Filter {
    Eq(String, Value),
    Ne(String, Value),
    Gt(String, Value),
    Gte(String, Value),
    Lt(String, Value),
    Lte(String, Value),
    In(String, Vec<Value>),
    Exists(String),
    And(Vec<Filter>),
    Or(Vec<Filter>),
    Not(Box<Filter>),
}

/// Entry point for building a filter on one field
///
/// ```rust
/// use domain_repository::query::Field;
///
/// let open_orders = Field::new("status").eq("open")
///     .and(Field::new("total").gte(100));
/// ```
#[derive(Debug, Clone)]
pub struct Field(String);

impl Field {
    pub fn new(path: impl Into<String>) -> Self {
        Self(path.into())
    }

    pub fn eq(self, value: impl Into<Value>) -> Filter {
        Filter::Eq(self.0, value.into())
    }

    pub fn ne(self, value: impl Into<Value>) -> Filter {
        Filter::Ne(self.0, value.into())
    }

    pub fn gt(self, value: impl Into<Value>) -> Filter {
        Filter::Gt(self.0, value.into())
    }

    pub fn gte(self, value: impl Into<Value>) -> Filter {
        Filter::Gte(self.0, value.into())
    }

    pub fn lt(self, value: impl Into<Value>) -> Filter {
        Filter::Lt(self.0, value.into())
    }

    pub fn lte(self, value: impl Into<Value>) -> Filter {
        Filter::Lte(self.0, value.into())
    }

    pub fn is_in<I, V>(self, values: I) -> Filter
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        Filter::In(self.0, values.into_iter().map(Into::into).collect())
    }

    pub fn exists(self) -> Filter {
        Filter::Exists(self.0)
    }
}

impl Filter {
    /// Matches every document
    pub fn all() -> Self {
        Filter::And(Vec::new())
    }

    /// Visible (not soft-deleted) documents
    pub fn not_deleted() -> Self {
        Field::new(IS_DELETED_FIELD).eq(false)
    }

    /// Conjunction, flattening nested `And`s
    pub fn and(self, other: Filter) -> Self {
        match (self, other) {
            (Filter::And(mut left), Filter::And(right)) => {
                left.extend(right);
                Filter::And(left)
            }
            (Filter::And(mut left), other) => {
                left.push(other);
                Filter::And(left)
            }
            (this, Filter::And(mut right)) => {
                right.insert(0, this);
                Filter::And(right)
            }
            (this, other) => Filter::And(vec![this, other]),
        }
    }

    pub fn or(self, other: Filter) -> Self {
        match self {
            Filter::Or(mut left) => {
                left.push(other);
                Filter::Or(left)
            }
            this => Filter::Or(vec![this, other]),
        }
    }

    pub fn negate(self) -> Self {
        Filter::Not(Box::new(self))
    }

    /// Evaluates the filter against a document
    pub fn matches(&self, document: &Value) -> bool {
        match self {
            Filter::Eq(path, expected) => {
                lookup(document, path).map_or(false, |actual| same_value(actual, expected))
            }
            // An absent field compares as undefined, which matches nothing.
            Filter::Ne(path, expected) => {
                lookup(document, path).map_or(false, |actual| !same_value(actual, expected))
            }
            Filter::Gt(path, bound) => compare(document, path, bound) == Some(Ordering::Greater),
            Filter::Gte(path, bound) => matches!(
                compare(document, path, bound),
                Some(Ordering::Greater | Ordering::Equal)
            ),
            Filter::Lt(path, bound) => compare(document, path, bound) == Some(Ordering::Less),
            Filter::Lte(path, bound) => matches!(
                compare(document, path, bound),
                Some(Ordering::Less | Ordering::Equal)
            ),
            Filter::In(path, candidates) => lookup(document, path)
                .map_or(false, |actual| candidates.iter().any(|c| same_value(actual, c))),
            Filter::Exists(path) => lookup(document, path).map_or(false, |v| !v.is_null()),
            Filter::And(filters) => filters.iter().all(|f| f.matches(document)),
            Filter::Or(filters) => filters.iter().any(|f| f.matches(document)),
            Filter::Not(inner) => !inner.matches(document),
        }
    }
}

fn lookup<'a>(document: &'a Value, path: &str) -> Option<&'a Value> {
    path.split('.')
        .try_fold(document, |current, segment| current.get(segment))
}

fn compare(document: &Value, path: &str, bound: &Value) -> Option<Ordering> {
    order_scalars(lookup(document, path)?, bound)
}

// Only like-typed scalars are ordered; anything else never matches.
fn order_scalars(a: &Value, b: &Value) -> Option<Ordering> {
    match (a, b) {
        (Value::Number(a), Value::Number(b)) => a.as_f64()?.partial_cmp(&b.as_f64()?),
        (Value::String(a), Value::String(b)) => Some(a.cmp(b)),
        (Value::Bool(a), Value::Bool(b)) => Some(a.cmp(b)),
        _ => None,
    }
}

// Numbers compare by value, so 250 and 250.0 are the same.
fn same_value(actual: &Value, expected: &Value) -> bool {
    match (actual, expected) {
        (Value::Number(_), Value::Number(_)) => {
            order_scalars(actual, expected) == Some(Ordering::Equal)
        }
        _ => actual == expected,
    }
}
