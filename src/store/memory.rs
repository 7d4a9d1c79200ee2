//! In-process store over JSON rows, keyed by table id. Honors the same contract as PgStore
//! (predicates, ordering with NULLs last, window, eager loads) for tests and local demos.

use crate::config::{Cardinality, OrderKey, ResolvedModel, TableDef};
use crate::error::AppError;
use crate::query::{EagerLoad, EntityQuery, Filter};
use crate::store::{Row, Store};
use async_trait::async_trait;
use serde_json::Value;
use std::cmp::Ordering;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

#[derive(Clone, Default)]
pub struct MemoryStore {
    tables: Arc<RwLock<HashMap<String, Vec<Row>>>>,
}

fn poisoned() -> AppError {
    AppError::Db(sqlx::Error::Protocol("memory store lock poisoned".into()))
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a row; non-object values are rejected.
    pub fn insert(&self, table_id: &str, row: Value) -> Result<(), AppError> {
        let Value::Object(row) = row else {
            return Err(AppError::BadRequest("row must be a JSON object".into()));
        };
        let mut tables = self.tables.write().map_err(|_| poisoned())?;
        tables.entry(table_id.to_string()).or_default().push(row);
        Ok(())
    }

    /// Replace fields on the row whose `key` column equals `id`. Returns whether a row matched.
    /// Test double for the external loader writing while requests are served. No request path calls it.
    pub fn update(&self, table_id: &str, key: &str, id: &Value, fields: Value) -> Result<bool, AppError> {
        let Value::Object(fields) = fields else {
            return Err(AppError::BadRequest("fields must be a JSON object".into()));
        };
        let mut tables = self.tables.write().map_err(|_| poisoned())?;
        let Some(rows) = tables.get_mut(table_id) else {
            return Ok(false);
        };
        match rows.iter_mut().find(|r| r.get(key).map(|v| values_equal(v, id)).unwrap_or(false)) {
            Some(row) => {
                row.extend(fields);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    pub fn len(&self, table_id: &str) -> usize {
        self.tables
            .read()
            .map(|t| t.get(table_id).map(Vec::len).unwrap_or(0))
            .unwrap_or(0)
    }

    pub fn is_empty(&self, table_id: &str) -> bool {
        self.len(table_id) == 0
    }
}

fn field<'a>(row: &'a Row, column: &str) -> &'a Value {
    row.get(column).unwrap_or(&Value::Null)
}

fn values_equal(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(n), Value::Number(m)) => n.as_f64() == m.as_f64(),
        _ => a == b,
    }
}

fn rank(v: &Value) -> u8 {
    match v {
        Value::Bool(_) => 0,
        Value::Number(_) => 1,
        Value::String(_) => 2,
        Value::Array(_) | Value::Object(_) => 3,
        Value::Null => 4,
    }
}

/// Total order over JSON scalars; NULL sorts after everything, as PostgreSQL does for ASC.
fn compare_values(a: &Value, b: &Value) -> Ordering {
    match (a, b) {
        (Value::Bool(x), Value::Bool(y)) => x.cmp(y),
        (Value::Number(x), Value::Number(y)) => x
            .as_f64()
            .unwrap_or(0.0)
            .partial_cmp(&y.as_f64().unwrap_or(0.0))
            .unwrap_or(Ordering::Equal),
        (Value::String(x), Value::String(y)) => x.cmp(y),
        _ => rank(a).cmp(&rank(b)).then_with(|| a.to_string().cmp(&b.to_string())),
    }
}

fn compare_rows(keys: &[OrderKey], a: &Row, b: &Row) -> Ordering {
    for k in keys {
        let ord = compare_values(field(a, &k.column), field(b, &k.column));
        let ord = if k.descending { ord.reverse() } else { ord };
        if ord != Ordering::Equal {
            return ord;
        }
    }
    Ordering::Equal
}

fn matches(
    tables: &HashMap<String, Vec<Row>>,
    model: &ResolvedModel,
    table: &TableDef,
    row: &Row,
    filter: &Filter,
) -> bool {
    match filter {
        Filter::Eq { column, value } => values_equal(field(row, column), value),
        Filter::Contains { column, value } => match field(row, column) {
            Value::Array(items) => items.iter().any(|v| values_equal(v, value)),
            _ => false,
        },
        Filter::Related { path, column, value } => {
            related_matches(tables, model, table, row, path, column, value)
        }
    }
}

/// Follow to_one keys along `path`; the last row reached must have `column = value`.
fn related_matches(
    tables: &HashMap<String, Vec<Row>>,
    model: &ResolvedModel,
    table: &TableDef,
    row: &Row,
    path: &[String],
    column: &str,
    value: &Value,
) -> bool {
    let Some((head, rest)) = path.split_first() else {
        return values_equal(field(row, column), value);
    };
    let Some(rel) = table.relation(head) else { return false };
    let Some(target) = model.table(&rel.target) else { return false };
    let key = field(row, &rel.our_key);
    if key.is_null() {
        return false;
    }
    tables.get(&rel.target).map_or(false, |rows| {
        rows.iter().any(|r| {
            values_equal(field(r, &rel.their_key), key) && related_matches(tables, model, target, r, rest, column, value)
        })
    })
}

fn attach_eager(tables: &HashMap<String, Vec<Row>>, loads: &[EagerLoad<'_>], row: &mut Row) {
    for load in loads {
        let rel = load.relation;
        let key = field(row, &rel.our_key).clone();
        let mut related: Vec<Row> = if key.is_null() {
            Vec::new()
        } else {
            tables
                .get(&rel.target)
                .map(|rows| {
                    rows.iter()
                        .filter(|r| values_equal(field(r, &rel.their_key), &key))
                        .cloned()
                        .collect()
                })
                .unwrap_or_default()
        };
        related.sort_by(|a, b| compare_rows(&rel.order_by, a, b));
        for child in related.iter_mut() {
            attach_eager(tables, &load.children, child);
        }
        let value = match rel.cardinality {
            Cardinality::ToMany => Value::Array(related.into_iter().map(Value::Object).collect()),
            Cardinality::ToOne => related.into_iter().next().map(Value::Object).unwrap_or(Value::Null),
        };
        row.insert(rel.name.clone(), value);
    }
}

impl MemoryStore {
    fn matching(&self, query: &EntityQuery<'_>) -> Result<Vec<Row>, AppError> {
        let tables = self.tables.read().map_err(|_| poisoned())?;
        let Some(rows) = tables.get(&query.table.id) else {
            return Ok(Vec::new());
        };
        Ok(rows
            .iter()
            .filter(|r| {
                query
                    .filters
                    .iter()
                    .all(|f| matches(&tables, query.model(), query.table, r, f))
            })
            .cloned()
            .collect())
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn fetch(&self, query: &EntityQuery<'_>) -> Result<Vec<Row>, AppError> {
        let mut rows = self.matching(query)?;
        rows.sort_by(|a, b| compare_rows(&query.order_by, a, b));
        let rows: Vec<Row> = match query.window {
            Some(w) => rows
                .into_iter()
                .skip(w.offset as usize)
                .take(w.limit as usize)
                .collect(),
            None => rows,
        };
        let tables = self.tables.read().map_err(|_| poisoned())?;
        Ok(rows
            .into_iter()
            .map(|mut row| {
                attach_eager(&tables, &query.eager, &mut row);
                row
            })
            .collect())
    }

    async fn count(&self, query: &EntityQuery<'_>) -> Result<u64, AppError> {
        Ok(self.matching(query)?.len() as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn nulls_sort_last_ascending_first_descending() {
        let keys = [OrderKey::asc("d")];
        let a: Row = json!({"d": null}).as_object().unwrap().clone();
        let b: Row = json!({"d": "2024-01-01"}).as_object().unwrap().clone();
        assert_eq!(compare_rows(&keys, &a, &b), Ordering::Greater);
        let desc = [OrderKey::parse("-d")];
        assert_eq!(compare_rows(&desc, &a, &b), Ordering::Less);
    }

    #[test]
    fn numbers_compare_numerically() {
        assert_eq!(compare_values(&json!(2), &json!(10)), Ordering::Less);
        assert!(values_equal(&json!(1), &json!(1.0)));
    }

    #[test]
    fn update_touches_matching_row_only() {
        let store = MemoryStore::new();
        store.insert("t", json!({"id": "a", "n": 1})).unwrap();
        store.insert("t", json!({"id": "b", "n": 1})).unwrap();
        assert!(store.update("t", "id", &json!("b"), json!({"n": 2})).unwrap());
        assert!(!store.update("t", "id", &json!("zzz"), json!({"n": 2})).unwrap());
        assert_eq!(store.len("t"), 2);
        assert!(store.insert("t", json!([1])).is_err());
    }
}
