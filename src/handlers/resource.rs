//! Resource handlers: list and detail for every resource in the model.

use crate::config::{FilterTarget, ResourceDescriptor, TableDef};
use crate::error::AppError;
use crate::query::{jurisdiction_filter, lookup_filter, EntityQuery, Filter};
use crate::response::PageEnvelope;
use crate::service::{PageRequest, ResourceService};
use crate::state::AppState;
use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde_json::Value;

/// Query string split into paging, includes and resource filters. Unknown keys are ignored.
#[derive(Debug, Default)]
struct ListParams {
    page: PageRequest,
    includes: Vec<String>,
    filters: Vec<(String, String)>,
}

fn parse_u32(name: &str, v: &str) -> Result<u32, AppError> {
    v.trim()
        .parse()
        .map_err(|_| AppError::BadRequest(format!("{} must be a positive integer", name)))
}

fn parse_params(params: Vec<(String, String)>) -> Result<ListParams, AppError> {
    let mut out = ListParams::default();
    for (k, v) in params {
        match k.as_str() {
            "page" => out.page.page = Some(parse_u32("page", &v)?),
            "per_page" => out.page.per_page = Some(parse_u32("per_page", &v)?),
            "include" => out.includes.extend(
                v.split(',')
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .map(str::to_string),
            ),
            _ => out.filters.push((k, v)),
        }
    }
    Ok(out)
}

/// Predicate for a declared param. Array columns match by membership; public values map back to stored ones.
fn param_filter(descriptor: &ResourceDescriptor, table: &TableDef, target: &FilterTarget, raw: &str) -> Filter {
    match target {
        FilterTarget::Column(column) => {
            let value = Value::String(descriptor.stored_value(column, raw).to_string());
            let is_array = table
                .column(column)
                .map(|c| c.pg_type.ends_with("[]"))
                .unwrap_or(false);
            if is_array {
                Filter::Contains {
                    column: column.clone(),
                    value,
                }
            } else {
                Filter::Eq {
                    column: column.clone(),
                    value,
                }
            }
        }
        FilterTarget::Related { path, column } => Filter::Related {
            path: path.clone(),
            column: column.clone(),
            value: Value::String(raw.to_string()),
        },
        FilterTarget::Jurisdiction { path } => jurisdiction_filter(path, raw),
    }
}

fn resource<'a>(state: &'a AppState, path_segment: &str) -> Result<&'a ResourceDescriptor, AppError> {
    state
        .model
        .resource(path_segment)
        .ok_or_else(|| AppError::NotFound(path_segment.to_string()))
}

pub async fn list(
    State(state): State<AppState>,
    Path(path_segment): Path<String>,
    Query(params): Query<Vec<(String, String)>>,
) -> Result<Json<PageEnvelope>, AppError> {
    let descriptor = resource(&state, &path_segment)?;
    let params = parse_params(params)?;
    let mut query = EntityQuery::for_resource(&state.model, descriptor)?;
    let table = query.table;
    for (k, v) in &params.filters {
        if let Some(fp) = descriptor.filter_param(k) {
            query = query.filter(param_filter(descriptor, table, &fp.target, v))?;
        }
    }
    let envelope = ResourceService::list_resources(
        state.store.as_ref(),
        &state.settings,
        descriptor,
        query,
        &params.includes,
        params.page,
    )
    .await
    .inspect_err(|e| {
        if e.is_client_error() {
            tracing::warn!(resource = %path_segment, error = %e, "list rejected");
        }
    })?;
    Ok(Json(envelope))
}

pub async fn detail(
    State(state): State<AppState>,
    Path((path_segment, id)): Path<(String, String)>,
    Query(params): Query<Vec<(String, String)>>,
) -> Result<Json<Value>, AppError> {
    let descriptor = resource(&state, &path_segment)?;
    let params = parse_params(params)?;
    let query = EntityQuery::for_resource(&state.model, descriptor)?;
    let lookup = lookup_filter(descriptor, query.table, &id)?;
    let query = query.filter(lookup)?;
    let row = ResourceService::get_resource(state.store.as_ref(), descriptor, query, &params.includes)
        .await
        .map_err(|e| match e {
            AppError::NotFound(_) => AppError::NotFound(format!("{}/{}", path_segment, id)),
            other => other,
        })
        .inspect_err(|e| {
            if e.is_client_error() {
                tracing::warn!(resource = %path_segment, id = %id, error = %e, "detail rejected");
            }
        })?;
    Ok(Json(Value::Object(row)))
}
