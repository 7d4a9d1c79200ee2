//! Detail lookups: turn a path identifier into a predicate on the resource table.

use crate::config::{LookupKind, ResourceDescriptor, TableDef};
use crate::error::AppError;
use crate::query::Filter;
use serde_json::Value;

const JURISDICTION_PREFIX: &str = "ocd-jurisdiction/";

/// OCD jurisdiction id for a two-letter abbreviation. DC and PR are not states.
fn abbr_to_jid(abbr: &str) -> String {
    let abbr = abbr.to_lowercase();
    match abbr.as_str() {
        "dc" => format!("{}country:us/district:dc/government", JURISDICTION_PREFIX),
        "pr" => format!("{}country:us/territory:pr/government", JURISDICTION_PREFIX),
        _ => format!("{}country:us/state:{}/government", JURISDICTION_PREFIX, abbr),
    }
}

/// Jurisdictions are addressed by OCD id, state abbreviation (`nc`), or full name (`North Carolina`).
/// `path` leads from the filtered table to the jurisdiction table; empty when filtering jurisdictions.
pub fn jurisdiction_filter(path: &[String], raw: &str) -> Filter {
    let (column, value) = if raw.starts_with(JURISDICTION_PREFIX) {
        ("id", raw.to_string())
    } else if raw.len() == 2 && raw.chars().all(|c| c.is_ascii_alphabetic()) {
        ("id", abbr_to_jid(raw))
    } else {
        ("name", raw.to_string())
    };
    if path.is_empty() {
        Filter::Eq {
            column: column.into(),
            value: Value::String(value),
        }
    } else {
        Filter::Related {
            path: path.to_vec(),
            column: column.into(),
            value: Value::String(value),
        }
    }
}

/// Detail lookup on the jurisdiction table itself.
pub fn jurisdiction_lookup(id: &str) -> Filter {
    jurisdiction_filter(&[], id)
}

fn primary_key_lookup(table: &TableDef, id: &str) -> Result<Filter, AppError> {
    let pg_type = table.column(&table.pk).map(|c| c.pg_type.as_str()).unwrap_or("text");
    let value = if pg_type.contains("uuid") {
        let u = uuid::Uuid::parse_str(id).map_err(|_| AppError::BadRequest("invalid uuid".into()))?;
        Value::String(u.to_string())
    } else if pg_type.contains("int") || pg_type.contains("serial") {
        let n: i64 = id.parse().map_err(|_| AppError::BadRequest("invalid id".into()))?;
        Value::Number(n.into())
    } else {
        Value::String(id.to_string())
    };
    Ok(Filter::Eq {
        column: table.pk.clone(),
        value,
    })
}

pub fn lookup_filter(descriptor: &ResourceDescriptor, table: &TableDef, id: &str) -> Result<Filter, AppError> {
    if id.is_empty() {
        return Err(AppError::BadRequest("empty identifier".into()));
    }
    match descriptor.lookup {
        LookupKind::PrimaryKey => primary_key_lookup(table, id),
        LookupKind::Jurisdiction => Ok(jurisdiction_lookup(id)),
    }
}
