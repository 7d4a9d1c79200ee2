//! Load config from a JSON file and resolve it into the runtime model.

use crate::config::resolved::{
    parse_template, Cardinality, ColumnInfo, ComputedField, ComputedValue, FilterParam, FilterTarget, IncludeDef,
    LookupKind, NormalizationRule, OrderKey, RelationDef, RelationPath, ResolvedModel, ResourceDescriptor, TableDef,
};
use crate::config::types::*;
use crate::config::validate;
use crate::error::ConfigError;
use std::collections::HashMap;
use std::path::Path;

fn dotted(path: Option<&str>) -> RelationPath {
    path.filter(|p| !p.is_empty())
        .map(|p| p.split('.').map(str::to_string).collect())
        .unwrap_or_default()
}

fn computed_field(c: &ComputedConfig) -> Result<ComputedField, ConfigError> {
    let value = match &c.template {
        Some(t) => ComputedValue::Template(parse_template(t)?),
        None => ComputedValue::Related {
            path: dotted(c.path.as_deref()),
            column: c.column.clone(),
        },
    };
    Ok(ComputedField {
        field: c.field.clone(),
        value,
    })
}

/// Build resolved model from full config. Validates first.
pub fn resolve(config: &FullConfig) -> Result<ResolvedModel, ConfigError> {
    validate(config)?;

    let mut relations_by_table: HashMap<&str, Vec<RelationDef>> = HashMap::new();
    for r in &config.relations {
        let mut order_by: Vec<OrderKey> = r.order_by.iter().map(|k| OrderKey::parse(k)).collect();
        let target_pk = config
            .tables
            .iter()
            .find(|t| t.id == r.to_table)
            .map(|t| t.primary_key.clone())
            .ok_or_else(|| ConfigError::MissingReference {
                kind: "table",
                id: r.to_table.clone(),
            })?;
        if !order_by.iter().any(|k| k.column == target_pk) {
            order_by.push(OrderKey::asc(target_pk));
        }
        relations_by_table.entry(r.from_table.as_str()).or_default().push(RelationDef {
            name: r.name.clone(),
            target: r.to_table.clone(),
            cardinality: match r.kind {
                RelationKind::ToOne => Cardinality::ToOne,
                RelationKind::ToMany => Cardinality::ToMany,
            },
            our_key: r.from_column.clone(),
            their_key: r.to_column.clone(),
            order_by,
        });
    }

    let mut tables = HashMap::new();
    for t in &config.tables {
        let table = TableDef {
            id: t.id.clone(),
            schema_name: t.schema.clone().unwrap_or_else(|| config.schema.clone()),
            table_name: t.name.clone(),
            pk: t.primary_key.clone(),
            columns: t
                .columns
                .iter()
                .map(|c| ColumnInfo {
                    name: c.name.clone(),
                    pg_type: c.type_.to_lowercase(),
                })
                .collect(),
            relations: relations_by_table.remove(t.id.as_str()).unwrap_or_default(),
        };
        tables.insert(t.id.clone(), table);
    }

    let mut resources = HashMap::new();
    let mut rules_by_table: HashMap<String, Vec<NormalizationRule>> = HashMap::new();
    for res in &config.resources {
        let normalize: Vec<NormalizationRule> = res
            .normalize
            .iter()
            .map(|n| NormalizationRule {
                field: n.field.clone(),
                stored: n.from.clone(),
                public: n.to.clone(),
            })
            .collect();
        let entry = rules_by_table.entry(res.table_id.clone()).or_default();
        for rule in &normalize {
            if !entry.contains(rule) {
                entry.push(rule.clone());
            }
        }
        let descriptor = ResourceDescriptor {
            path_segment: res.path_segment.clone(),
            table_id: res.table_id.clone(),
            includes: res
                .includes
                .iter()
                .map(|i| IncludeDef {
                    token: i.token.clone(),
                    paths: i
                        .relations
                        .iter()
                        .map(|p| p.split('.').map(str::to_string).collect())
                        .collect(),
                })
                .collect(),
            normalize,
            order_by: res.order_by.iter().map(|k| OrderKey::parse(k)).collect(),
            filters: res
                .filters
                .iter()
                .map(|f| FilterParam {
                    param: f.param.clone(),
                    target: match (f.lookup, dotted(f.via.as_deref())) {
                        (FilterLookup::Jurisdiction, path) => FilterTarget::Jurisdiction { path },
                        (FilterLookup::Exact, path) if path.is_empty() => FilterTarget::Column(f.column.clone()),
                        (FilterLookup::Exact, path) => FilterTarget::Related {
                            path,
                            column: f.column.clone(),
                        },
                    },
                })
                .collect(),
            computed: res.computed.iter().map(computed_field).collect::<Result<_, _>>()?,
            lookup: match res.lookup {
                LookupConfig::PrimaryKey => LookupKind::PrimaryKey,
                LookupConfig::Jurisdiction => LookupKind::Jurisdiction,
            },
        };
        resources.insert(res.path_segment.clone(), descriptor);
    }

    tracing::debug!(
        tables = tables.len(),
        resources = resources.len(),
        "resolved resource model"
    );
    Ok(ResolvedModel {
        tables,
        resources,
        rules_by_table,
    })
}

/// Parse a catalog from JSON text.
pub fn parse_config(json: &str) -> Result<FullConfig, ConfigError> {
    serde_json::from_str(json).map_err(|e| ConfigError::Load(e.to_string()))
}

/// Read and parse a catalog file (e.g. from `CONFIG_PATH`).
pub async fn load_from_path(path: impl AsRef<Path>) -> Result<FullConfig, ConfigError> {
    let path = path.as_ref();
    let text = tokio::fs::read_to_string(path)
        .await
        .map_err(|e| ConfigError::Load(format!("{}: {}", path.display(), e)))?;
    parse_config(&text)
}
