//! Query model for document collections.
//!
//! A [`Filter`] is a conjunction of simple field conditions over JSON
//! documents. Backends either evaluate it directly with [`Filter::matches`]
//! or compile it into their own query language.

use std::cmp::Ordering;

use serde_json::{Map, Value};

use crate::storage::StoreError;

use super::DocumentId;

/// Name of the identity field every stored document carries.
pub const ID_FIELD: &str = "id";

/// A single predicate on a (possibly dotted) field path.
#[derive(Debug, Clone, PartialEq)]
pub enum Condition {
    /// Field equals the value.
    Eq { field: String, value: Value },
    /// Field equals one of the values.
    In { field: String, values: Vec<Value> },
    /// Array field contains the value.
    Contains { field: String, value: Value },
}

/// A conjunction of conditions. The empty filter matches every document.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Filter {
    conditions: Vec<Condition>,
}

impl Filter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Filter matching a single document by id.
    pub fn by_id(id: DocumentId) -> Self {
        Self::new().eq(ID_FIELD, id.to_string())
    }

    /// Filter matching any of the given ids.
    pub fn by_ids(ids: &[DocumentId]) -> Self {
        Self::new().is_in(ID_FIELD, ids.iter().map(|id| id.to_string()))
    }

    pub fn eq(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.conditions.push(Condition::Eq {
            field: field.into(),
            value: value.into(),
        });
        self
    }

    pub fn is_in<V, I>(mut self, field: impl Into<String>, values: I) -> Self
    where
        V: Into<Value>,
        I: IntoIterator<Item = V>,
    {
        self.conditions.push(Condition::In {
            field: field.into(),
            values: values.into_iter().map(Into::into).collect(),
        });
        self
    }

    pub fn contains(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.conditions.push(Condition::Contains {
            field: field.into(),
            value: value.into(),
        });
        self
    }

    pub fn conditions(&self) -> &[Condition] {
        &self.conditions
    }

    pub fn is_empty(&self) -> bool {
        self.conditions.is_empty()
    }

    /// Evaluates the filter against a JSON document.
    ///
    /// # Examples
    ///
    /// ```
    /// use mango_core::document::Filter;
    /// use serde_json::json;
    ///
    /// let doc = json!({"status": "active", "include_in": ["user_rate"]});
    /// assert!(Filter::new().eq("status", "active").contains("include_in", "user_rate").matches(&doc));
    /// assert!(!Filter::new().is_in("status", ["inactive", "deleted"]).matches(&doc));
    /// ```
    pub fn matches(&self, doc: &Value) -> bool {
        self.conditions.iter().all(|condition| match condition {
            Condition::Eq { field, value } => lookup(doc, field).unwrap_or(&Value::Null) == value,
            Condition::In { field, values } => {
                let actual = lookup(doc, field).unwrap_or(&Value::Null);
                values.iter().any(|v| v == actual)
            }
            Condition::Contains { field, value } => match lookup(doc, field) {
                Some(Value::Array(items)) => items.contains(value),
                _ => false,
            },
        })
    }
}

/// Resolves a dotted field path (`title.on_rate`) inside a document.
pub fn lookup<'a>(doc: &'a Value, path: &str) -> Option<&'a Value> {
    path.split('.').try_fold(doc, |current, segment| current.get(segment))
}

/// Sort direction of a listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SortDirection {
    Ascending,
    Descending,
}

/// A sort key written as `+field` or `-field`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SortKey {
    pub field: String,
    pub direction: SortDirection,
}

impl SortKey {
    pub fn ascending(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            direction: SortDirection::Ascending,
        }
    }

    pub fn descending(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            direction: SortDirection::Descending,
        }
    }

    /// Parses `+field` / `-field`.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::InvalidFilter` when the direction prefix is
    /// missing or the field name is empty or contains characters other than
    /// ASCII alphanumerics, `_` and `.`.
    ///
    /// # Examples
    ///
    /// ```
    /// use mango_core::document::{SortDirection, SortKey};
    ///
    /// let key = SortKey::parse("-created_at").unwrap();
    /// assert_eq!(key.field, "created_at");
    /// assert_eq!(key.direction, SortDirection::Descending);
    /// assert!(SortKey::parse("created_at").is_err());
    /// ```
    pub fn parse(raw: &str) -> Result<Self, StoreError> {
        let invalid = || StoreError::InvalidFilter(format!("invalid sort key: {raw:?}"));
        let mut chars = raw.chars();
        let direction = match chars.next() {
            Some('+') => SortDirection::Ascending,
            Some('-') => SortDirection::Descending,
            _ => return Err(invalid()),
        };
        let field = chars.as_str();
        let well_formed = !field.is_empty()
            && field
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '.');
        if !well_formed {
            return Err(invalid());
        }
        Ok(Self {
            field: field.to_string(),
            direction,
        })
    }

    /// Canonical `+field` / `-field` rendering.
    pub fn render(&self) -> String {
        let sign = match self.direction {
            SortDirection::Ascending => '+',
            SortDirection::Descending => '-',
        };
        format!("{sign}{}", self.field)
    }

    /// Orders two documents by this key. Missing fields sort first.
    pub fn compare(&self, a: &Value, b: &Value) -> Ordering {
        let ordering = compare_values(
            lookup(a, &self.field).unwrap_or(&Value::Null),
            lookup(b, &self.field).unwrap_or(&Value::Null),
        );
        match self.direction {
            SortDirection::Ascending => ordering,
            SortDirection::Descending => ordering.reverse(),
        }
    }
}

fn type_rank(value: &Value) -> u8 {
    match value {
        Value::Null => 0,
        Value::Bool(_) => 1,
        Value::Number(_) => 2,
        Value::String(_) => 3,
        Value::Array(_) => 4,
        Value::Object(_) => 5,
    }
}

fn compare_values(a: &Value, b: &Value) -> Ordering {
    match (a, b) {
        (Value::Bool(x), Value::Bool(y)) => x.cmp(y),
        (Value::Number(x), Value::Number(y)) => {
            let x = x.as_f64().unwrap_or(f64::NAN);
            let y = y.as_f64().unwrap_or(f64::NAN);
            x.partial_cmp(&y).unwrap_or(Ordering::Equal)
        }
        (Value::String(x), Value::String(y)) => x.cmp(y),
        _ => type_rank(a).cmp(&type_rank(b)),
    }
}

/// Restricts materialized documents to a set of fields. The id is always kept.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Projection {
    fields: Vec<String>,
}

impl Projection {
    pub fn new<S, I>(fields: I) -> Self
    where
        S: Into<String>,
        I: IntoIterator<Item = S>,
    {
        Self {
            fields: fields.into_iter().map(Into::into).collect(),
        }
    }

    pub fn fields(&self) -> &[String] {
        &self.fields
    }

    /// Returns a copy of `doc` holding only the projected top-level fields.
    pub fn apply(&self, doc: &Value) -> Value {
        let Value::Object(source) = doc else {
            return doc.clone();
        };
        let mut projected = Map::new();
        for (key, value) in source {
            if key == ID_FIELD || self.fields.iter().any(|f| f == key) {
                projected.insert(key.clone(), value.clone());
            }
        }
        Value::Object(projected)
    }
}

/// Paging, ordering and projection applied to a `find`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FindOptions {
    pub skip: u64,
    pub limit: Option<u64>,
    pub sort: Option<SortKey>,
    pub projection: Option<Projection>,
}

impl FindOptions {
    pub fn with_skip(mut self, skip: u64) -> Self {
        self.skip = skip;
        self
    }

    pub fn with_limit(mut self, limit: u64) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn with_sort(mut self, sort: SortKey) -> Self {
        self.sort = Some(sort);
        self
    }

    pub fn with_projection(mut self, projection: Projection) -> Self {
        self.projection = Some(projection);
        self
    }
}
