mod common;

use async_trait::async_trait;
use civic_api::{
    catalog, AppError, EntityQuery, MemoryStore, PageRequest, PaginationSettings, ResourceService, Row, Store,
};
use common::*;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Counts store round trips.
struct Counting {
    inner: MemoryStore,
    fetches: AtomicUsize,
    counts: AtomicUsize,
}

impl Counting {
    fn new(inner: MemoryStore) -> Self {
        Counting {
            inner,
            fetches: AtomicUsize::new(0),
            counts: AtomicUsize::new(0),
        }
    }

    fn calls(&self) -> (usize, usize) {
        (self.fetches.load(Ordering::SeqCst), self.counts.load(Ordering::SeqCst))
    }
}

#[async_trait]
impl Store for Counting {
    async fn fetch(&self, query: &EntityQuery<'_>) -> Result<Vec<Row>, AppError> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        self.inner.fetch(query).await
    }

    async fn count(&self, query: &EntityQuery<'_>) -> Result<u64, AppError> {
        self.counts.fetch_add(1, Ordering::SeqCst);
        self.inner.count(query).await
    }
}

#[tokio::test]
async fn list_is_one_fetch_and_one_count_whatever_the_includes() {
    let model = catalog::openstates_model().unwrap();
    let bills = model.resource("bills").unwrap();
    let all: Vec<String> = bills.valid_includes().map(str::to_string).collect();
    let store = Counting::new(seeded_store());
    let settings = PaginationSettings::default();

    let env = ResourceService::list_resources(
        &store,
        &settings,
        bills,
        EntityQuery::for_resource(&model, bills).unwrap(),
        &all,
        PageRequest {
            page: Some(1),
            per_page: Some(50),
        },
    )
    .await
    .unwrap();
    assert_eq!(env.results.len(), 50);
    assert_eq!(store.calls(), (1, 1));
}

#[tokio::test]
async fn past_the_end_skips_the_data_query() {
    let model = catalog::openstates_model().unwrap();
    let bills = model.resource("bills").unwrap();
    let store = Counting::new(seeded_store());
    let env = ResourceService::list_resources(
        &store,
        &PaginationSettings::default(),
        bills,
        EntityQuery::for_resource(&model, bills).unwrap(),
        &["votes"],
        PageRequest {
            page: Some(99),
            per_page: None,
        },
    )
    .await
    .unwrap();
    assert!(env.results.is_empty());
    assert_eq!(env.pagination.total_pages, 7);
    assert_eq!(store.calls(), (0, 1));
}

#[tokio::test]
async fn detail_is_a_single_fetch() {
    let model = catalog::openstates_model().unwrap();
    let bills = model.resource("bills").unwrap();
    let table = model.table(&bills.table_id).unwrap();
    let store = Counting::new(seeded_store());
    let query = EntityQuery::for_resource(&model, bills)
        .unwrap()
        .filter(civic_api::query::lookup_filter(bills, table, &bill_id(1)).unwrap())
        .unwrap();
    let row = ResourceService::get_resource(&store, bills, query, &["actions", "documents"])
        .await
        .unwrap();
    assert_eq!(row["identifier"], "HB 1");
    assert_eq!(row["actions"].as_array().unwrap().len(), 2);
    assert_eq!(row["documents"], serde_json::json!([]));
    assert_eq!(store.calls(), (1, 0));
}

#[tokio::test]
async fn query_for_another_table_is_refused() {
    let model = catalog::openstates_model().unwrap();
    let bills = model.resource("bills").unwrap();
    let votes = model.resource("votes").unwrap();
    let store = seeded_store();
    let err = ResourceService::get_resource(
        &store,
        bills,
        EntityQuery::for_resource(&model, votes).unwrap(),
        &[] as &[&str],
    )
    .await
    .unwrap_err();
    assert!(matches!(err, AppError::Config(_)));
}
