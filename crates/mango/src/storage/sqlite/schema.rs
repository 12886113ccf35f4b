//! SQL for JSON document tables.
//!
//! Every collection is one table holding the full document as JSON text in
//! `body`, with the id duplicated into a unique column and an autoincrement
//! `seq` recording insertion order. Filters and sort keys compile to
//! `json_extract` / `json_each` expressions over `body`. Pure functions, no
//! I/O.

use rusqlite::types::Value as SqlValue;
use serde_json::Value;

use mango_core::document::{Condition, Filter, FindOptions, SortDirection, ID_FIELD};
use mango_core::storage::{Result, StoreError};

/// A SQL fragment with its positional parameters, in order.
#[derive(Debug, Clone, PartialEq)]
pub struct Sql {
    pub sql: String,
    pub params: Vec<SqlValue>,
}

/// Validates a collection name for use as a table name.
pub fn table_name(name: &str) -> Result<String> {
    let mut chars = name.chars();
    let valid = chars
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_');
    if valid {
        Ok(name.to_string())
    } else {
        Err(StoreError::QueryFailed(format!(
            "invalid collection name: {name:?}"
        )))
    }
}

pub fn create_table(table: &str) -> String {
    format!(
        r#"
CREATE TABLE IF NOT EXISTS "{table}" (
    seq INTEGER PRIMARY KEY AUTOINCREMENT,
    id TEXT NOT NULL UNIQUE,
    body TEXT NOT NULL
);
"#
    )
}

pub fn insert(table: &str) -> String {
    format!(r#"INSERT INTO "{table}" (id, body) VALUES (?1, ?2)"#)
}

pub fn update_body(table: &str) -> String {
    format!(r#"UPDATE "{table}" SET body = ?1 WHERE seq = ?2"#)
}

/// `$.a.b` path for a dotted field name.
fn json_path(field: &str) -> Result<String> {
    let valid = !field.is_empty()
        && field
            .split('.')
            .all(|segment| !segment.is_empty() && segment.chars().all(|c| c.is_ascii_alphanumeric() || c == '_'));
    if !valid {
        return Err(StoreError::InvalidFilter(format!(
            "invalid field name: {field:?}"
        )));
    }
    Ok(format!("$.{field}"))
}

/// Placeholder expression and parameter for a non-null JSON scalar or
/// container, comparable with what `json_extract` / `json_each` return.
fn bind(value: &Value) -> (&'static str, SqlValue) {
    match value {
        Value::Null => ("?", SqlValue::Null),
        Value::Bool(b) => ("?", SqlValue::Integer(i64::from(*b))),
        Value::Number(n) => match n.as_i64() {
            Some(i) => ("?", SqlValue::Integer(i)),
            None => ("?", SqlValue::Real(n.as_f64().unwrap_or(f64::NAN))),
        },
        Value::String(s) => ("?", SqlValue::Text(s.clone())),
        Value::Array(_) | Value::Object(_) => ("json(?)", SqlValue::Text(value.to_string())),
    }
}

fn equals(field: &str, value: &Value, out: &mut Sql) -> Result<String> {
    if field == ID_FIELD {
        if let Value::String(id) = value {
            out.params.push(SqlValue::Text(id.clone()));
            return Ok("id = ?".to_string());
        }
    }
    out.params.push(SqlValue::Text(json_path(field)?));
    if value.is_null() {
        return Ok("json_extract(body, ?) IS NULL".to_string());
    }
    let (placeholder, param) = bind(value);
    out.params.push(param);
    Ok(format!("json_extract(body, ?) = {placeholder}"))
}

/// Compiles a filter into a `WHERE` clause body. The empty filter is `1`.
pub fn compile_filter(filter: &Filter) -> Result<Sql> {
    let mut out = Sql {
        sql: String::new(),
        params: Vec::new(),
    };
    let mut clauses = Vec::with_capacity(filter.conditions().len());

    for condition in filter.conditions() {
        let clause = match condition {
            Condition::Eq { field, value } => equals(field, value, &mut out)?,
            Condition::In { field, values } => {
                if values.is_empty() {
                    "0".to_string()
                } else {
                    let alternatives = values
                        .iter()
                        .map(|value| equals(field, value, &mut out))
                        .collect::<Result<Vec<_>>>()?;
                    format!("({})", alternatives.join(" OR "))
                }
            }
            Condition::Contains { field, value } => {
                let path = json_path(field)?;
                let (placeholder, param) = bind(value);
                out.params.push(SqlValue::Text(path.clone()));
                out.params.push(SqlValue::Text(path));
                out.params.push(param);
                format!(
                    "(json_type(body, ?) = 'array' AND EXISTS \
                     (SELECT 1 FROM json_each(body, ?) WHERE json_each.value = {placeholder}))"
                )
            }
        };
        clauses.push(clause);
    }

    out.sql = if clauses.is_empty() {
        "1".to_string()
    } else {
        clauses.join(" AND ")
    };
    Ok(out)
}

/// `SELECT seq, body ... WHERE filter [ORDER BY] LIMIT OFFSET`.
pub fn select(table: &str, filter: &Filter, options: &FindOptions) -> Result<Sql> {
    let mut query = compile_filter(filter)?;
    let mut sql = format!(r#"SELECT seq, body FROM "{table}" WHERE {}"#, query.sql);

    match &options.sort {
        Some(sort) => {
            let direction = match sort.direction {
                SortDirection::Ascending => "ASC",
                SortDirection::Descending => "DESC",
            };
            query.params.push(SqlValue::Text(json_path(&sort.field)?));
            sql.push_str(&format!(
                " ORDER BY json_extract(body, ?) {direction}, seq ASC"
            ));
        }
        None => sql.push_str(" ORDER BY seq ASC"),
    }

    let limit = options
        .limit
        .and_then(|limit| i64::try_from(limit).ok())
        .unwrap_or(-1);
    let offset = i64::try_from(options.skip).unwrap_or(i64::MAX);
    sql.push_str(" LIMIT ? OFFSET ?");
    query.params.push(SqlValue::Integer(limit));
    query.params.push(SqlValue::Integer(offset));

    query.sql = sql;
    Ok(query)
}

pub fn count(table: &str, filter: &Filter) -> Result<Sql> {
    let mut query = compile_filter(filter)?;
    query.sql = format!(r#"SELECT COUNT(*) FROM "{table}" WHERE {}"#, query.sql);
    Ok(query)
}

/// One page of a natural-order scan, resuming after `after_seq`.
pub fn scan_page(table: &str, filter: &Filter, after_seq: i64, page_size: i64) -> Result<Sql> {
    let mut query = compile_filter(filter)?;
    let mut params = vec![SqlValue::Integer(after_seq)];
    params.append(&mut query.params);
    params.push(SqlValue::Integer(page_size));
    Ok(Sql {
        sql: format!(
            r#"SELECT seq, body FROM "{table}" WHERE seq > ? AND ({}) ORDER BY seq ASC LIMIT ?"#,
            query.sql
        ),
        params,
    })
}
