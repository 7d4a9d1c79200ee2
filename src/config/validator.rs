//! Config validation: referential integrity of tables, relations and resources.
//! Runs before resolve so a bad catalog fails at startup instead of mid-request.

use crate::config::{parse_template, FilterLookup, FullConfig, RelationConfig, RelationKind, TableConfig, TemplatePart};
use crate::error::ConfigError;
use regex::Regex;
use std::collections::{HashMap, HashSet};

fn identifier_re() -> Result<Regex, ConfigError> {
    Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").map_err(|e| ConfigError::Validation(e.to_string()))
}

fn check_identifier(re: &Regex, s: &str) -> Result<(), ConfigError> {
    if re.is_match(s) {
        Ok(())
    } else {
        Err(ConfigError::UnsafeIdentifier(s.to_string()))
    }
}

fn require_column(table: &TableConfig, column: &str) -> Result<(), ConfigError> {
    if table.columns.iter().any(|c| c.name == column) {
        Ok(())
    } else {
        Err(ConfigError::UnknownColumn {
            table_id: table.id.clone(),
            column: column.to_string(),
        })
    }
}

fn order_column(key: &str) -> &str {
    key.strip_prefix('-').unwrap_or(key)
}

fn column_type(table: &TableConfig, column: &str) -> Option<String> {
    table
        .columns
        .iter()
        .find(|c| c.name == column)
        .map(|c| c.type_.to_lowercase())
}

fn steps(path: Option<&str>) -> Vec<&str> {
    match path {
        Some(p) if !p.is_empty() => p.split('.').collect(),
        _ => Vec::new(),
    }
}

type Tables<'c> = HashMap<&'c str, &'c TableConfig>;
type Relations<'c> = HashMap<(&'c str, &'c str), &'c RelationConfig>;

/// Follow a to_one path from `start`. Filters and computed fields must resolve to a single row.
fn walk_to_one<'c, S: AsRef<str>>(
    tables: &Tables<'c>,
    relations: &Relations<'c>,
    start: &'c TableConfig,
    path: &[S],
    what: &str,
) -> Result<&'c TableConfig, ConfigError> {
    let mut current = start;
    for step in path {
        let step = step.as_ref();
        let rel = relations
            .get(&(current.id.as_str(), step))
            .ok_or_else(|| ConfigError::MissingReference {
                kind: "relation",
                id: format!("{}.{}", current.id, step),
            })?;
        if rel.kind != RelationKind::ToOne {
            return Err(ConfigError::Validation(format!(
                "{} must go through to_one relations, {}.{} is to_many",
                what, current.id, step
            )));
        }
        current = *tables.get(rel.to_table.as_str()).ok_or_else(|| ConfigError::MissingReference {
            kind: "table",
            id: rel.to_table.clone(),
        })?;
    }
    Ok(current)
}

pub fn validate(config: &FullConfig) -> Result<(), ConfigError> {
    let ident = identifier_re()?;
    check_identifier(&ident, &config.schema)?;

    let mut tables: Tables = HashMap::new();
    for t in &config.tables {
        if tables.insert(t.id.as_str(), t).is_some() {
            return Err(ConfigError::Duplicate {
                kind: "table",
                id: t.id.clone(),
            });
        }
        if let Some(schema) = &t.schema {
            check_identifier(&ident, schema)?;
        }
        check_identifier(&ident, &t.name)?;
        let mut seen = HashSet::new();
        for c in &t.columns {
            check_identifier(&ident, &c.name)?;
            if !seen.insert(c.name.as_str()) {
                return Err(ConfigError::Duplicate {
                    kind: "column",
                    id: format!("{}.{}", t.id, c.name),
                });
            }
        }
        require_column(t, &t.primary_key)?;
    }

    let mut relations: Relations = HashMap::new();
    for r in &config.relations {
        let from = tables.get(r.from_table.as_str()).ok_or_else(|| ConfigError::MissingReference {
            kind: "table",
            id: r.from_table.clone(),
        })?;
        let to = tables.get(r.to_table.as_str()).ok_or_else(|| ConfigError::MissingReference {
            kind: "table",
            id: r.to_table.clone(),
        })?;
        check_identifier(&ident, &r.name)?;
        require_column(from, &r.from_column)?;
        require_column(to, &r.to_column)?;
        let (ours, theirs) = (column_type(from, &r.from_column), column_type(to, &r.to_column));
        if ours != theirs {
            return Err(ConfigError::Validation(format!(
                "relation {}.{} joins {} ({}) to {}.{} ({})",
                r.from_table,
                r.name,
                r.from_column,
                ours.unwrap_or_default(),
                r.to_table,
                r.to_column,
                theirs.unwrap_or_default()
            )));
        }
        if from.columns.iter().any(|c| c.name == r.name) {
            return Err(ConfigError::Validation(format!(
                "relation {}.{} shadows a column",
                r.from_table, r.name
            )));
        }
        for key in &r.order_by {
            require_column(to, order_column(key))?;
        }
        if relations.insert((r.from_table.as_str(), r.name.as_str()), r).is_some() {
            return Err(ConfigError::Duplicate {
                kind: "relation",
                id: format!("{}.{}", r.from_table, r.name),
            });
        }
    }

    let mut path_segments = HashSet::new();
    for res in &config.resources {
        if !path_segments.insert(res.path_segment.as_str()) {
            return Err(ConfigError::Duplicate {
                kind: "path segment",
                id: res.path_segment.clone(),
            });
        }
        let table = *tables.get(res.table_id.as_str()).ok_or_else(|| ConfigError::MissingReference {
            kind: "table",
            id: res.table_id.clone(),
        })?;
        for key in &res.order_by {
            require_column(table, order_column(key))?;
        }
        for rule in &res.normalize {
            require_column(table, &rule.field)?;
        }

        let mut tokens = HashSet::new();
        for inc in &res.includes {
            if !tokens.insert(inc.token.as_str()) {
                return Err(ConfigError::Duplicate {
                    kind: "include token",
                    id: format!("{}:{}", res.path_segment, inc.token),
                });
            }
            if inc.relations.is_empty() {
                return Err(ConfigError::InvalidIncludePath {
                    resource: res.path_segment.clone(),
                    token: inc.token.clone(),
                    reason: "maps to no relations".into(),
                });
            }
            for path in &inc.relations {
                let mut current = table.id.as_str();
                for step in path.split('.') {
                    let rel = relations.get(&(current, step)).ok_or_else(|| ConfigError::InvalidIncludePath {
                        resource: res.path_segment.clone(),
                        token: inc.token.clone(),
                        reason: format!("no relation '{}' on table {}", step, current),
                    })?;
                    current = rel.to_table.as_str();
                }
            }
        }

        for f in &res.filters {
            let what = format!("filter {} on {}", f.param, res.path_segment);
            let target = walk_to_one(&tables, &relations, table, &steps(f.via.as_deref()), &what)?;
            match f.lookup {
                FilterLookup::Exact => require_column(target, &f.column)?,
                FilterLookup::Jurisdiction => {
                    require_column(target, "id")?;
                    require_column(target, "name")?;
                }
            }
        }

        let mut fields = HashSet::new();
        for c in &res.computed {
            check_identifier(&ident, &c.field)?;
            let shadows = table.columns.iter().any(|col| col.name == c.field)
                || relations.contains_key(&(table.id.as_str(), c.field.as_str()));
            if shadows {
                return Err(ConfigError::Validation(format!(
                    "computed field {} on {} shadows a column or relation",
                    c.field, res.path_segment
                )));
            }
            if !fields.insert(c.field.as_str()) {
                return Err(ConfigError::Duplicate {
                    kind: "computed field",
                    id: format!("{}:{}", res.path_segment, c.field),
                });
            }
            let what = format!("computed field {} on {}", c.field, res.path_segment);
            match (&c.template, &c.path) {
                (Some(template), None) if c.column.is_none() => {
                    for part in parse_template(template)? {
                        if let TemplatePart::Field { path, column, .. } = part {
                            let target = walk_to_one(&tables, &relations, table, &path, &what)?;
                            require_column(target, &column)?;
                        }
                    }
                }
                (None, Some(path)) if !path.is_empty() => {
                    let target = walk_to_one(&tables, &relations, table, &steps(Some(path)), &what)?;
                    if let Some(column) = &c.column {
                        require_column(target, column)?;
                    }
                }
                _ => {
                    return Err(ConfigError::Validation(format!(
                        "{} needs either a template or a relation path",
                        what
                    )))
                }
            }
        }
    }

    Ok(())
}
