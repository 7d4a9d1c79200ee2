//! Resolved resource model: config validated and flattened for runtime use.
//! Built once at startup and shared read-only across requests.

use crate::error::ConfigError;
use std::collections::HashMap;

/// Direction of a relation, seen from the table that declares it.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Cardinality {
    ToOne,
    ToMany,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OrderKey {
    pub column: String,
    pub descending: bool,
}

impl OrderKey {
    pub fn asc(column: impl Into<String>) -> Self {
        OrderKey {
            column: column.into(),
            descending: false,
        }
    }

    /// Parse "col" or "-col".
    pub fn parse(s: &str) -> Self {
        match s.strip_prefix('-') {
            Some(col) => OrderKey {
                column: col.to_string(),
                descending: true,
            },
            None => OrderKey::asc(s),
        }
    }
}

#[derive(Clone, Debug)]
pub struct ColumnInfo {
    pub name: String,
    /// PostgreSQL type for SQL casts when binding values.
    pub pg_type: String,
}

#[derive(Clone, Debug)]
pub struct RelationDef {
    pub name: String,
    /// Table id of the related entity.
    pub target: String,
    pub cardinality: Cardinality,
    /// Our column used in the join (our FK for to_one; our key for to_many).
    pub our_key: String,
    /// Their column used in the join (their PK for to_one; their FK for to_many).
    pub their_key: String,
    /// Row order for to_many relations, target pk appended.
    pub order_by: Vec<OrderKey>,
}

#[derive(Clone, Debug)]
pub struct TableDef {
    pub id: String,
    pub schema_name: String,
    pub table_name: String,
    pub pk: String,
    pub columns: Vec<ColumnInfo>,
    pub relations: Vec<RelationDef>,
}

impl TableDef {
    pub fn column(&self, name: &str) -> Option<&ColumnInfo> {
        self.columns.iter().find(|c| c.name == name)
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.column(name).is_some()
    }

    pub fn relation(&self, name: &str) -> Option<&RelationDef> {
        self.relations.iter().find(|r| r.name == name)
    }
}

/// Relation names walked from a resource's table, outermost first.
pub type RelationPath = Vec<String>;

#[derive(Clone, Debug)]
pub struct IncludeDef {
    pub token: String,
    pub paths: Vec<RelationPath>,
}

/// Aliases a stored value to its public name, e.g. classification "government" -> "state".
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NormalizationRule {
    pub field: String,
    pub stored: String,
    pub public: String,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum FilterTarget {
    Column(String),
    /// Column on the final target of a to_one path.
    Related { path: RelationPath, column: String },
    /// Jurisdiction reached through `path` (the table itself when empty), matched by id, abbreviation or name.
    Jurisdiction { path: RelationPath },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TemplateFilter {
    /// `ocd-jurisdiction/country:us/state:nc/government` -> `nc`.
    Abbr,
    /// Spaces removed: `HB 101` -> `HB101`.
    Compact,
}

impl TemplateFilter {
    pub fn apply(self, s: &str) -> String {
        match self {
            TemplateFilter::Abbr => {
                let tail = s.rsplit(':').next().unwrap_or(s);
                tail.split('/').next().unwrap_or(tail).to_string()
            }
            TemplateFilter::Compact => s.chars().filter(|c| *c != ' ').collect(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TemplatePart {
    Literal(String),
    Field {
        path: RelationPath,
        column: String,
        filter: Option<TemplateFilter>,
    },
}

/// Split `https://x/{a.b|abbr}/{c}` into literals and placeholders.
pub fn parse_template(template: &str) -> Result<Vec<TemplatePart>, ConfigError> {
    let bad = |why: &str| ConfigError::Validation(format!("template '{}': {}", template, why));
    let mut parts = Vec::new();
    let mut rest = template;
    while let Some(open) = rest.find('{') {
        if open > 0 {
            parts.push(TemplatePart::Literal(rest[..open].to_string()));
        }
        let after = &rest[open + 1..];
        let close = after.find('}').ok_or_else(|| bad("unclosed placeholder"))?;
        let inner = &after[..close];
        if inner.contains('{') {
            return Err(bad("nested placeholder"));
        }
        let (dotted, filter) = match inner.split_once('|') {
            Some((d, "abbr")) => (d, Some(TemplateFilter::Abbr)),
            Some((d, "compact")) => (d, Some(TemplateFilter::Compact)),
            Some((_, other)) => return Err(bad(&format!("unknown filter '{}'", other))),
            None => (inner, None),
        };
        let mut path: RelationPath = dotted.split('.').map(str::to_string).collect();
        let column = path.pop().filter(|c| !c.is_empty()).ok_or_else(|| bad("empty placeholder"))?;
        if path.iter().any(String::is_empty) {
            return Err(bad("empty relation name"));
        }
        parts.push(TemplatePart::Field { path, column, filter });
        rest = &after[close + 1..];
    }
    if rest.contains('}') {
        return Err(bad("unmatched '}'"));
    }
    if !rest.is_empty() {
        parts.push(TemplatePart::Literal(rest.to_string()));
    }
    Ok(parts)
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ComputedValue {
    /// A column of the path target, or the whole projected target row.
    Related { path: RelationPath, column: Option<String> },
    Template(Vec<TemplatePart>),
}

/// Derived field emitted on every row of a resource. Omitted when its inputs are missing.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ComputedField {
    pub field: String,
    pub value: ComputedValue,
}

impl ComputedField {
    /// Relation paths that must be loaded to derive this field.
    pub fn paths(&self) -> Vec<&RelationPath> {
        match &self.value {
            ComputedValue::Related { path, .. } => vec![path],
            ComputedValue::Template(parts) => parts
                .iter()
                .filter_map(|p| match p {
                    TemplatePart::Field { path, .. } if !path.is_empty() => Some(path),
                    _ => None,
                })
                .collect(),
        }
    }
}

#[derive(Clone, Debug)]
pub struct FilterParam {
    pub param: String,
    pub target: FilterTarget,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LookupKind {
    PrimaryKey,
    Jurisdiction,
}

/// Static per-resource declaration: valid includes, their relations, normalization, sort and filters.
#[derive(Clone, Debug)]
pub struct ResourceDescriptor {
    pub path_segment: String,
    pub table_id: String,
    pub includes: Vec<IncludeDef>,
    pub normalize: Vec<NormalizationRule>,
    pub order_by: Vec<OrderKey>,
    pub filters: Vec<FilterParam>,
    pub computed: Vec<ComputedField>,
    pub lookup: LookupKind,
}

impl ResourceDescriptor {
    pub fn include(&self, token: &str) -> Option<&IncludeDef> {
        self.includes.iter().find(|i| i.token == token)
    }

    pub fn valid_includes(&self) -> impl Iterator<Item = &str> {
        self.includes.iter().map(|i| i.token.as_str())
    }

    pub fn filter_param(&self, param: &str) -> Option<&FilterParam> {
        self.filters.iter().find(|f| f.param == param)
    }

    /// Relation paths loaded for computed fields; never emitted unless also included.
    pub fn support_paths(&self) -> impl Iterator<Item = &RelationPath> {
        self.computed.iter().flat_map(|c| c.paths())
    }

    /// Map a public filter value back to what is stored, so `classification=state` matches "government".
    pub fn stored_value<'a>(&'a self, field: &str, public: &'a str) -> &'a str {
        self.normalize
            .iter()
            .find(|r| r.field == field && r.public == public)
            .map(|r| r.stored.as_str())
            .unwrap_or(public)
    }
}

#[derive(Clone, Debug, Default)]
pub struct ResolvedModel {
    pub tables: HashMap<String, TableDef>,
    pub resources: HashMap<String, ResourceDescriptor>,
    /// Normalization rules indexed by the table they apply to, so nested rows of a resource are aliased too.
    pub rules_by_table: HashMap<String, Vec<NormalizationRule>>,
}

impl ResolvedModel {
    pub fn table(&self, id: &str) -> Option<&TableDef> {
        self.tables.get(id)
    }

    pub fn resource(&self, path: &str) -> Option<&ResourceDescriptor> {
        self.resources.get(path)
    }

    /// Table reached by walking `path` from `table`.
    pub fn walk<'a>(&'a self, table: &'a TableDef, path: &[String]) -> Option<&'a TableDef> {
        path.iter().try_fold(table, |t, step| {
            let rel = t.relation(step)?;
            self.table(&rel.target)
        })
    }

    pub fn rules_for_table(&self, table_id: &str) -> &[NormalizationRule] {
        self.rules_by_table
            .get(table_id)
            .map(|v| v.as_slice())
            .unwrap_or(&[])
    }
}
