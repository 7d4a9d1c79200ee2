//! Renders an EntityQuery as parameterized PostgreSQL.
//!
//! Identifiers come from validated config only; values are always bound parameters.
//! Each eager load becomes a correlated scalar subquery (`json_agg` for to_many,
//! `row_to_json` for to_one). Chained loads nest inside their parent's subquery, so
//! a request costs one data statement plus one count, with no joined row explosion.

use crate::config::{Cardinality, OrderKey, ResolvedModel, TableDef};
use crate::query::{EagerLoad, EntityQuery, Filter};
use serde_json::Value;

/// Alias of the filtered, windowed base rows.
const MAIN_ALIAS: &str = "main";
const PAGE_ALIAS: &str = "page";
const ROW_ALIAS: &str = "page_row";

/// Quote identifier for PostgreSQL (safe: only from config).
fn quoted(s: &str) -> String {
    format!("\"{}\"", s.replace('"', "\"\""))
}

fn qualified_table(table: &TableDef) -> String {
    format!("{}.{}", quoted(&table.schema_name), quoted(&table.table_name))
}

#[derive(Debug, Default)]
pub struct QueryBuf {
    pub sql: String,
    pub params: Vec<Value>,
}

impl QueryBuf {
    fn push_param(&mut self, v: Value) -> usize {
        self.params.push(v);
        self.params.len()
    }

    fn placeholder(&mut self, v: Value, pg_type: &str) -> String {
        let n = self.push_param(v);
        format!("${}::{}", n, pg_type)
    }
}

fn column_type<'a>(table: &'a TableDef, column: &str) -> &'a str {
    table.column(column).map(|c| c.pg_type.as_str()).unwrap_or("text")
}

fn order_clause(alias: &str, keys: &[OrderKey]) -> String {
    keys.iter()
        .map(|k| {
            let dir = if k.descending { " DESC" } else { "" };
            format!("{}.{}{}", alias, quoted(&k.column), dir)
        })
        .collect::<Vec<_>>()
        .join(", ")
}

fn where_clause(q: &mut QueryBuf, query: &EntityQuery<'_>, alias: &str) -> String {
    let table = query.table;
    let mut parts = Vec::new();
    for f in &query.filters {
        match f {
            Filter::Eq { column, value } => {
                if value.is_null() {
                    parts.push(format!("{}.{} IS NULL", alias, quoted(column)));
                } else {
                    let ph = q.placeholder(value.clone(), column_type(table, column));
                    parts.push(format!("{}.{} = {}", alias, quoted(column), ph));
                }
            }
            Filter::Contains { column, value } => {
                let elem = column_type(table, column).trim_end_matches("[]").to_string();
                let ph = q.placeholder(value.clone(), &elem);
                parts.push(format!("{} = ANY({}.{})", ph, alias, quoted(column)));
            }
            Filter::Related { path, column, value } => {
                if let Some(sql) = related_exists(q, query.model(), table, path, column, value, alias, 0) {
                    parts.push(sql);
                }
            }
        }
    }
    if parts.is_empty() {
        String::new()
    } else {
        format!(" WHERE {}", parts.join(" AND "))
    }
}

/// Nested `EXISTS` walking a to_one path, one level per relation, matching `column` on the last target.
fn related_exists(
    q: &mut QueryBuf,
    model: &ResolvedModel,
    table: &TableDef,
    path: &[String],
    column: &str,
    value: &Value,
    parent_alias: &str,
    depth: usize,
) -> Option<String> {
    let Some((head, rest)) = path.split_first() else {
        let ph = q.placeholder(value.clone(), column_type(table, column));
        return Some(format!("{}.{} = {}", parent_alias, quoted(column), ph));
    };
    let rel = table.relation(head)?;
    let target = model.table(&rel.target)?;
    let alias = format!("rel{}", depth);
    let inner = related_exists(q, model, target, rest, column, value, &alias, depth + 1)?;
    Some(format!(
        "EXISTS (SELECT 1 FROM {} {} WHERE {}.{} = {}.{} AND {})",
        qualified_table(target),
        alias,
        alias,
        quoted(&rel.their_key),
        parent_alias,
        quoted(&rel.our_key),
        inner
    ))
}

fn column_list(table: &TableDef, alias: &str) -> Vec<String> {
    table
        .columns
        .iter()
        .map(|c| format!("{}.{}", alias, quoted(&c.name)))
        .collect()
}

/// Correlated subquery for one eager load and its chained children.
fn eager_subquery(load: &EagerLoad<'_>, parent_alias: &str, depth: usize) -> String {
    let alias = format!("r{}", depth);
    let sub = format!("s{}", depth);
    let rel = load.relation;
    let mut cols = column_list(load.target, &alias);
    for child in &load.children {
        cols.push(format!(
            "{} AS {}",
            eager_subquery(child, &alias, depth + 1),
            quoted(&child.relation.name)
        ));
    }
    let from = format!(
        "{} {} WHERE {}.{} = {}.{}",
        qualified_table(load.target),
        alias,
        alias,
        quoted(&rel.their_key),
        parent_alias,
        quoted(&rel.our_key)
    );
    match rel.cardinality {
        Cardinality::ToOne => format!(
            "(SELECT row_to_json({sub}) FROM (SELECT {cols} FROM {from} LIMIT 1) {sub})",
            sub = sub,
            cols = cols.join(", "),
            from = from
        ),
        Cardinality::ToMany => format!(
            "(SELECT COALESCE(json_agg(row_to_json({sub}) ORDER BY {order}), '[]'::json) FROM (SELECT {cols} FROM {from}) {sub})",
            sub = sub,
            order = order_clause(&sub, &rel.order_by),
            cols = cols.join(", "),
            from = from
        ),
    }
}

/// Data statement: one JSON object per row, base columns plus one key per eager load.
pub fn select_rows(query: &EntityQuery<'_>) -> QueryBuf {
    let mut q = QueryBuf::default();
    let table = query.table;
    let where_sql = where_clause(&mut q, query, MAIN_ALIAS);
    let order_sql = if query.order_by.is_empty() {
        String::new()
    } else {
        format!(" ORDER BY {}", order_clause(MAIN_ALIAS, &query.order_by))
    };
    let window_sql = match query.window {
        Some(w) => format!(" LIMIT {} OFFSET {}", w.limit, w.offset),
        None => String::new(),
    };
    let base = format!(
        "SELECT {} FROM {} {}{}{}{}",
        column_list(table, MAIN_ALIAS).join(", "),
        qualified_table(table),
        MAIN_ALIAS,
        where_sql,
        order_sql,
        window_sql
    );

    let mut select_parts = vec![format!("{}.*", PAGE_ALIAS)];
    for load in &query.eager {
        select_parts.push(format!(
            "{} AS {}",
            eager_subquery(load, PAGE_ALIAS, 0),
            quoted(&load.relation.name)
        ));
    }
    let outer_order = if query.order_by.is_empty() {
        String::new()
    } else {
        format!(" ORDER BY {}", order_clause(ROW_ALIAS, &query.order_by))
    };
    q.sql = format!(
        "SELECT row_to_json({row}) AS row FROM (SELECT {cols} FROM ({base}) {page}) {row}{order}",
        row = ROW_ALIAS,
        cols = select_parts.join(", "),
        base = base,
        page = PAGE_ALIAS,
        order = outer_order
    );
    q
}

/// Count statement: same predicates, nothing else.
pub fn count_rows(query: &EntityQuery<'_>) -> QueryBuf {
    let mut q = QueryBuf::default();
    let where_sql = where_clause(&mut q, query, MAIN_ALIAS);
    q.sql = format!(
        "SELECT COUNT(*) FROM {} {}{}",
        qualified_table(query.table),
        MAIN_ALIAS,
        where_sql
    );
    q
}
