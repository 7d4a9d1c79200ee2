//! Raw config types matching the resource catalog JSON (tables, relations, resources).

use serde::{Deserialize, Serialize};

fn default_schema() -> String {
    "public".into()
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ColumnConfig {
    pub name: String,
    /// PostgreSQL type used to cast bound filter values (e.g. "text", "uuid", "text[]").
    #[serde(rename = "type")]
    pub type_: String,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TableConfig {
    pub id: String,
    #[serde(default)]
    pub schema: Option<String>,
    pub name: String,
    pub primary_key: String,
    pub columns: Vec<ColumnConfig>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RelationKind {
    /// We hold the key pointing at them.
    ToOne,
    /// They hold the key pointing at us.
    ToMany,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RelationConfig {
    pub from_table: String,
    pub name: String,
    pub to_table: String,
    pub kind: RelationKind,
    pub from_column: String,
    pub to_column: String,
    /// Sort keys for to_many rows; "-col" sorts descending. Target pk is always the final tiebreak.
    #[serde(default)]
    pub order_by: Vec<String>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct IncludeConfig {
    pub token: String,
    /// Dotted relation paths walked from the resource table, e.g. "versions.links".
    pub relations: Vec<String>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct NormalizationConfig {
    pub field: String,
    /// Value as stored.
    pub from: String,
    /// Value as exposed.
    pub to: String,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FilterLookup {
    /// Value compared as given, after reverse normalization.
    #[default]
    Exact,
    /// Value is an OCD jurisdiction id, abbreviation or name, matched on the jurisdiction reached by `via`.
    Jurisdiction,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct FilterConfig {
    pub param: String,
    /// Matched column. Unused for jurisdiction lookups, which match `id` or `name`.
    #[serde(default)]
    pub column: String,
    /// Dotted to_one relation path; the column lives on its final target.
    #[serde(default)]
    pub via: Option<String>,
    #[serde(default)]
    pub lookup: FilterLookup,
}

/// Field derived from loaded to_one relations, present on every row of the resource.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ComputedConfig {
    pub field: String,
    /// Dotted to_one relation path. With `column`, that column of the target; without, the whole target row.
    #[serde(default)]
    pub path: Option<String>,
    #[serde(default)]
    pub column: Option<String>,
    /// String with `{path.column}` or `{path.column|filter}` placeholders; filters are `abbr` and `compact`.
    #[serde(default)]
    pub template: Option<String>,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LookupConfig {
    #[default]
    PrimaryKey,
    /// OCD jurisdiction id, two-letter state abbreviation, or name.
    Jurisdiction,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ResourceConfig {
    pub path_segment: String,
    pub table_id: String,
    #[serde(default)]
    pub order_by: Vec<String>,
    #[serde(default)]
    pub includes: Vec<IncludeConfig>,
    #[serde(default)]
    pub normalize: Vec<NormalizationConfig>,
    #[serde(default)]
    pub filters: Vec<FilterConfig>,
    #[serde(default)]
    pub computed: Vec<ComputedConfig>,
    #[serde(default)]
    pub lookup: LookupConfig,
}

/// All config types in one struct for in-memory loading.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct FullConfig {
    /// Default PostgreSQL schema for tables that omit one.
    #[serde(default = "default_schema")]
    pub schema: String,
    pub tables: Vec<TableConfig>,
    #[serde(default)]
    pub relations: Vec<RelationConfig>,
    pub resources: Vec<ResourceConfig>,
}

impl Default for FullConfig {
    fn default() -> Self {
        FullConfig {
            schema: default_schema(),
            tables: Vec::new(),
            relations: Vec::new(),
            resources: Vec::new(),
        }
    }
}
