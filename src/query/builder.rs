//! Store-independent query over one table: filters, ordering, eager loads, window.
//! Eager loads form a tree keyed by relation name, so attaching a path is an idempotent union.

use crate::config::{Cardinality, OrderKey, RelationDef, ResolvedModel, ResourceDescriptor, TableDef};
use crate::error::{AppError, ConfigError};
use crate::query::IncludePlan;
use serde_json::Value;

#[derive(Clone, Debug, PartialEq)]
pub enum Filter {
    /// `column = value`; a null value matches NULL.
    Eq { column: String, value: Value },
    /// Array column holds `value`.
    Contains { column: String, value: Value },
    /// The row reached through the to_one `path` has `column = value`.
    Related {
        path: Vec<String>,
        column: String,
        value: Value,
    },
}

/// One eager-load directive. Children load only through their parent, never as independent joins.
/// Loads that only feed computed fields are fetched but not `requested`, so they stay out of the output.
#[derive(Clone, Debug)]
pub struct EagerLoad<'m> {
    pub relation: &'m RelationDef,
    pub target: &'m TableDef,
    pub requested: bool,
    pub children: Vec<EagerLoad<'m>>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Window {
    pub limit: u64,
    pub offset: u64,
}

#[derive(Clone, Debug)]
pub struct EntityQuery<'m> {
    model: &'m ResolvedModel,
    pub table: &'m TableDef,
    pub filters: Vec<Filter>,
    pub order_by: Vec<OrderKey>,
    pub eager: Vec<EagerLoad<'m>>,
    pub window: Option<Window>,
}

impl<'m> EntityQuery<'m> {
    pub fn new(model: &'m ResolvedModel, table: &'m TableDef) -> Self {
        EntityQuery {
            model,
            table,
            filters: Vec::new(),
            order_by: Vec::new(),
            eager: Vec::new(),
            window: None,
        }
    }

    /// Unfiltered query over a resource's table.
    pub fn for_resource(model: &'m ResolvedModel, descriptor: &ResourceDescriptor) -> Result<Self, ConfigError> {
        let table = model.table(&descriptor.table_id).ok_or_else(|| ConfigError::MissingReference {
            kind: "table",
            id: descriptor.table_id.clone(),
        })?;
        Ok(Self::new(model, table))
    }

    pub fn model(&self) -> &'m ResolvedModel {
        self.model
    }

    /// Add a predicate. Columns and relations are checked against the table so renderers never see unknown names.
    pub fn filter(mut self, filter: Filter) -> Result<Self, AppError> {
        let table = self.table;
        let unknown = |column: &str| {
            AppError::BadRequest(format!("unknown filter column {} on {}", column, table.id))
        };
        match &filter {
            Filter::Eq { column, .. } | Filter::Contains { column, .. } => {
                if !table.has_column(column) {
                    return Err(unknown(column));
                }
            }
            Filter::Related { path, column, .. } => {
                let mut target = table;
                for step in path {
                    let rel = target
                        .relation(step)
                        .filter(|r| r.cardinality == Cardinality::ToOne)
                        .ok_or_else(|| {
                            AppError::BadRequest(format!("no to_one relation {} on {}", step, target.id))
                        })?;
                    target = self.model.table(&rel.target).ok_or_else(|| ConfigError::MissingReference {
                        kind: "table",
                        id: rel.target.clone(),
                    })?;
                }
                if !target.has_column(column) {
                    return Err(unknown(column));
                }
            }
        }
        self.filters.push(filter);
        Ok(self)
    }

    pub fn order_by(mut self, key: OrderKey) -> Self {
        if !self.order_by.iter().any(|k| k.column == key.column) {
            self.order_by.push(key);
        }
        self
    }

    /// Apply sort keys, then the primary key as the final tiebreak so windows are deterministic.
    pub fn stable_order(mut self, keys: &[OrderKey]) -> Self {
        for key in keys {
            self = self.order_by(key.clone());
        }
        let pk = self.table.pk.clone();
        self.order_by(OrderKey::asc(pk))
    }

    /// Attach one relation path. Shared prefixes merge into a single chained directive.
    pub fn eager_load(mut self, path: &[String]) -> Result<Self, ConfigError> {
        attach(self.model, &mut self.eager, self.table, path, true)?;
        Ok(self)
    }

    /// Attach a path needed only to derive fields. Emitted only if a requested path also covers it.
    pub fn support_load(mut self, path: &[String]) -> Result<Self, ConfigError> {
        attach(self.model, &mut self.eager, self.table, path, false)?;
        Ok(self)
    }

    /// Fold every relation path of the plan into the query.
    pub fn with_includes(self, plan: &IncludePlan<'_>) -> Result<Self, ConfigError> {
        plan.paths().try_fold(self, |q, path| q.eager_load(path))
    }

    pub fn window(mut self, limit: u64, offset: u64) -> Self {
        self.window = Some(Window { limit, offset });
        self
    }

    /// Same predicates with no ordering, eager loads or window.
    pub fn count_query(&self) -> Self {
        EntityQuery {
            model: self.model,
            table: self.table,
            filters: self.filters.clone(),
            order_by: Vec::new(),
            eager: Vec::new(),
            window: None,
        }
    }

    /// Number of distinct eager-load directives, chained children included.
    pub fn eager_directive_count(&self) -> usize {
        fn count(loads: &[EagerLoad<'_>]) -> usize {
            loads.iter().map(|l| 1 + count(&l.children)).sum()
        }
        count(&self.eager)
    }
}

fn attach<'m>(
    model: &'m ResolvedModel,
    loads: &mut Vec<EagerLoad<'m>>,
    table: &'m TableDef,
    path: &[String],
    requested: bool,
) -> Result<(), ConfigError> {
    let Some((head, rest)) = path.split_first() else {
        return Ok(());
    };
    let idx = match loads.iter().position(|l| l.relation.name == *head) {
        Some(i) => i,
        None => {
            let relation = table.relation(head).ok_or_else(|| ConfigError::MissingReference {
                kind: "relation",
                id: format!("{}.{}", table.id, head),
            })?;
            let target = model.table(&relation.target).ok_or_else(|| ConfigError::MissingReference {
                kind: "table",
                id: relation.target.clone(),
            })?;
            loads.push(EagerLoad {
                relation,
                target,
                requested,
                children: Vec::new(),
            });
            loads.len() - 1
        }
    };
    let load = &mut loads[idx];
    load.requested |= requested;
    let target = load.target;
    attach(model, &mut load.children, target, rest, requested)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog;

    fn path(s: &str) -> Vec<String> {
        s.split('.').map(str::to_string).collect()
    }

    #[test]
    fn same_relation_twice_is_one_directive() {
        let model = catalog::openstates_model().unwrap();
        let bills = model.resource("bills").unwrap();
        let q = EntityQuery::for_resource(&model, bills)
            .unwrap()
            .eager_load(&path("sources"))
            .unwrap()
            .eager_load(&path("sources"))
            .unwrap();
        assert_eq!(q.eager.len(), 1);
        assert_eq!(q.eager_directive_count(), 1);
    }

    #[test]
    fn nested_paths_chain_under_parent() {
        let model = catalog::openstates_model().unwrap();
        let bills = model.resource("bills").unwrap();
        let q = EntityQuery::for_resource(&model, bills)
            .unwrap()
            .eager_load(&path("versions.links"))
            .unwrap()
            .eager_load(&path("versions"))
            .unwrap();
        assert_eq!(q.eager.len(), 1);
        assert_eq!(q.eager[0].relation.name, "versions");
        assert_eq!(q.eager[0].children.len(), 1);
        assert_eq!(q.eager[0].children[0].relation.name, "links");
        assert_eq!(q.eager_directive_count(), 2);
    }

    #[test]
    fn stable_order_appends_pk_once() {
        let model = catalog::openstates_model().unwrap();
        let j = model.resource("jurisdictions").unwrap();
        let q = EntityQuery::for_resource(&model, j)
            .unwrap()
            .stable_order(&[OrderKey::asc("name"), OrderKey::asc("id")]);
        assert_eq!(q.order_by, vec![OrderKey::asc("name"), OrderKey::asc("id")]);
    }

    #[test]
    fn count_query_drops_order_and_eager() {
        let model = catalog::openstates_model().unwrap();
        let j = model.resource("jurisdictions").unwrap();
        let q = EntityQuery::for_resource(&model, j)
            .unwrap()
            .filter(Filter::Eq {
                column: "classification".into(),
                value: "government".into(),
            })
            .unwrap()
            .eager_load(&path("organizations"))
            .unwrap()
            .stable_order(&j.order_by)
            .window(20, 40);
        let c = q.count_query();
        assert_eq!(c.filters, q.filters);
        assert!(c.order_by.is_empty() && c.eager.is_empty() && c.window.is_none());
    }

    #[test]
    fn filter_on_unknown_column_is_rejected() {
        let model = catalog::openstates_model().unwrap();
        let j = model.resource("jurisdictions").unwrap();
        let err = EntityQuery::for_resource(&model, j)
            .unwrap()
            .filter(Filter::Eq {
                column: "nope".into(),
                value: Value::Null,
            })
            .unwrap_err();
        assert!(matches!(err, AppError::BadRequest(_)));
    }

    #[test]
    fn support_loads_merge_with_requested_ones() {
        let model = catalog::openstates_model().unwrap();
        let bills = model.resource("bills").unwrap();
        let q = EntityQuery::for_resource(&model, bills)
            .unwrap()
            .support_load(&path("legislative_session"))
            .unwrap();
        assert_eq!(q.eager.len(), 1);
        assert!(!q.eager[0].requested);
        let q = q.eager_load(&path("legislative_session")).unwrap().support_load(&path("legislative_session")).unwrap();
        assert_eq!(q.eager.len(), 1);
        assert!(q.eager[0].requested);
    }

    #[test]
    fn related_filter_walks_to_one_paths_only() {
        let model = catalog::openstates_model().unwrap();
        let bills = model.resource("bills").unwrap();
        let q = EntityQuery::for_resource(&model, bills).unwrap();
        assert!(q
            .clone()
            .filter(Filter::Related {
                path: path("legislative_session.jurisdiction"),
                column: "name".into(),
                value: "North Carolina".into(),
            })
            .is_ok());
        let err = q
            .filter(Filter::Related {
                path: path("sources"),
                column: "url".into(),
                value: "x".into(),
            })
            .unwrap_err();
        assert!(matches!(err, AppError::BadRequest(_)));
    }
}
