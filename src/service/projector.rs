//! Fetched rows to public shape. Pure function of (row, eager loads): table columns that are
//! not null, then each loaded relation, with normalization rules applied per field.

use crate::config::{Cardinality, ComputedField, ComputedValue, NormalizationRule, ResolvedModel, TableDef, TemplatePart};
use crate::query::EagerLoad;
use crate::store::Row;
use serde_json::Value;

/// Alias stored values to their public names. Strings match whole; arrays match per element.
pub fn normalize_field(rules: &[NormalizationRule], field: &str, value: Value) -> Value {
    rules
        .iter()
        .filter(|r| r.field == field)
        .fold(value, |v, rule| match v {
            Value::String(s) if s == rule.stored => Value::String(rule.public.clone()),
            Value::Array(items) => Value::Array(
                items
                    .into_iter()
                    .map(|item| match item {
                        Value::String(s) if s == rule.stored => Value::String(rule.public.clone()),
                        other => other,
                    })
                    .collect(),
            ),
            other => other,
        })
}

/// Project one row. A requested to_many relation with no rows is `[]`; a missing to_one is omitted.
pub fn project(model: &ResolvedModel, table: &TableDef, eager: &[EagerLoad<'_>], row: &Row) -> Row {
    let rules = model.rules_for_table(&table.id);
    let mut out = Row::new();
    for col in &table.columns {
        match row.get(&col.name) {
            None | Some(Value::Null) => {}
            Some(v) => {
                out.insert(col.name.clone(), normalize_field(rules, &col.name, v.clone()));
            }
        }
    }
    for load in eager.iter().filter(|l| l.requested) {
        let name = &load.relation.name;
        match (load.relation.cardinality, row.get(name)) {
            (Cardinality::ToMany, Some(Value::Array(items))) => {
                let projected = items
                    .iter()
                    .filter_map(Value::as_object)
                    .map(|item| Value::Object(project(model, load.target, &load.children, item)))
                    .collect();
                out.insert(name.clone(), Value::Array(projected));
            }
            (Cardinality::ToMany, _) => {
                out.insert(name.clone(), Value::Array(Vec::new()));
            }
            (Cardinality::ToOne, Some(Value::Object(item))) => {
                out.insert(
                    name.clone(),
                    Value::Object(project(model, load.target, &load.children, item)),
                );
            }
            (Cardinality::ToOne, _) => {}
        }
    }
    out
}

/// Row reached by following loaded to_one keys.
fn follow<'r>(row: &'r Row, path: &[String]) -> Option<&'r Row> {
    path.iter().try_fold(row, |r, step| r.get(step)?.as_object())
}

fn template_text(v: &Value) -> Option<String> {
    match v {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

fn computed_value(model: &ResolvedModel, table: &TableDef, computed: &ComputedField, raw: &Row) -> Option<Value> {
    match &computed.value {
        ComputedValue::Related { path, column } => {
            let target = model.walk(table, path)?;
            let row = follow(raw, path)?;
            match column {
                Some(column) => match row.get(column)? {
                    Value::Null => None,
                    v => Some(normalize_field(model.rules_for_table(&target.id), column, v.clone())),
                },
                None => Some(Value::Object(project(model, target, &[], row))),
            }
        }
        ComputedValue::Template(parts) => {
            let mut out = String::new();
            for part in parts {
                match part {
                    TemplatePart::Literal(s) => out.push_str(s),
                    TemplatePart::Field { path, column, filter } => {
                        let text = template_text(follow(raw, path)?.get(column)?)?;
                        match filter {
                            Some(f) => out.push_str(&f.apply(&text)),
                            None => out.push_str(&text),
                        }
                    }
                }
            }
            Some(Value::String(out))
        }
    }
}

/// Add derived fields read from the raw row. A field whose inputs are missing is omitted.
pub fn apply_computed(model: &ResolvedModel, table: &TableDef, computed: &[ComputedField], raw: &Row, out: &mut Row) {
    for c in computed {
        if let Some(v) = computed_value(model, table, c, raw) {
            out.insert(c.field.clone(), v);
        }
    }
}
