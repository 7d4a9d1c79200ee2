//! ResourceService: list and detail over any resource, sharing include resolution,
//! query preparation and projection so the two paths cannot drift apart.

mod detail;
mod paginator;
mod projector;

pub use detail::fetch_one;
pub use paginator::{page_window, paginate, total_pages, PageRequest, PageWindow};
pub use projector::{apply_computed, normalize_field, project};

use crate::config::{PaginationSettings, ResourceDescriptor};
use crate::error::{AppError, ConfigError};
use crate::query::{resolve_includes, EntityQuery};
use crate::response::PageEnvelope;
use crate::store::{Row, Store};
use serde_json::Value;

pub struct ResourceService;

impl ResourceService {
    /// Validate includes, attach their eager loads and the stable sort order.
    fn prepare<'m, S: AsRef<str>>(
        descriptor: &ResourceDescriptor,
        base: EntityQuery<'m>,
        includes: &[S],
    ) -> Result<EntityQuery<'m>, AppError> {
        if base.table.id != descriptor.table_id {
            return Err(ConfigError::Validation(format!(
                "query over {} used with resource {}",
                base.table.id, descriptor.path_segment
            ))
            .into());
        }
        let plan = resolve_includes(descriptor, includes)?;
        let query = descriptor
            .support_paths()
            .try_fold(base.with_includes(&plan)?, |q, path| q.support_load(path))?;
        Ok(query.stable_order(&descriptor.order_by))
    }

    fn project_row(descriptor: &ResourceDescriptor, query: &EntityQuery<'_>, row: &Row) -> Row {
        let mut out = project(query.model(), query.table, &query.eager, row);
        apply_computed(query.model(), query.table, &descriptor.computed, row, &mut out);
        out
    }

    /// One page of projected results.
    pub async fn list_resources<S: AsRef<str>>(
        store: &dyn Store,
        settings: &PaginationSettings,
        descriptor: &ResourceDescriptor,
        base: EntityQuery<'_>,
        includes: &[S],
        page: PageRequest,
    ) -> Result<PageEnvelope, AppError> {
        let query = Self::prepare(descriptor, base, includes)?;
        let window = page_window(settings, page)?;
        let (rows, pagination) = paginate(store, query.clone(), window, settings).await?;
        let results = rows
            .iter()
            .map(|row| Value::Object(Self::project_row(descriptor, &query, row)))
            .collect();
        tracing::debug!(
            resource = %descriptor.path_segment,
            page = pagination.page,
            total_items = pagination.total_items,
            "listed"
        );
        Ok(PageEnvelope { results, pagination })
    }

    /// The single projected entity matched by `base`.
    pub async fn get_resource<S: AsRef<str>>(
        store: &dyn Store,
        descriptor: &ResourceDescriptor,
        base: EntityQuery<'_>,
        includes: &[S],
    ) -> Result<Row, AppError> {
        let query = Self::prepare(descriptor, base, includes)?;
        let row = fetch_one(store, query.clone(), &descriptor.path_segment).await?;
        Ok(Self::project_row(descriptor, &query, &row))
    }
}
