mod common;

use axum::http::StatusCode;
use civic_api::config::{EmptyTotalPages, OverMaxPolicy};
use civic_api::PaginationSettings;
use common::*;
use serde_json::json;

#[tokio::test]
async fn pages_cover_every_item_once() {
    let app = default_router();
    let mut seen = Vec::new();
    for page in 1..=7 {
        let (status, body) = get(&app, &format!("/bills?page={}", page)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(
            body["pagination"],
            json!({"page": page, "per_page": 20, "total_items": 134, "total_pages": 7, "max_page": 7})
        );
        let expected = if page == 7 { 14 } else { 20 };
        assert_eq!(body["results"].as_array().unwrap().len(), expected);
        seen.extend(ids(&body));
    }
    let mut unique = seen.clone();
    unique.sort();
    unique.dedup();
    assert_eq!(seen.len(), BILL_COUNT);
    assert_eq!(unique.len(), BILL_COUNT);
}

#[tokio::test]
async fn page_past_end_is_empty_with_same_totals() {
    let app = default_router();
    let (status, body) = get(&app, "/bills?page=8").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["results"], json!([]));
    assert_eq!(
        body["pagination"],
        json!({"page": 8, "per_page": 20, "total_items": 134, "total_pages": 7, "max_page": 7})
    );
}

#[tokio::test]
async fn ordering_is_stable_under_unrelated_writes() {
    let store = seeded_store();
    let app = router(store.clone(), PaginationSettings::default());
    let (_, before) = get(&app, "/bills?page=2").await;
    for i in [3, 40, 77] {
        assert!(store
            .update("bill", "id", &json!(bill_id(i)), json!({"title": "Amended title"}))
            .unwrap());
    }
    let (_, after) = get(&app, "/bills?page=2").await;
    assert_eq!(ids(&before), ids(&after));
}

#[tokio::test]
async fn ties_break_on_primary_key() {
    let app = default_router();
    let (_, body) = get(&app, "/bills?per_page=50").await;
    let results = body["results"].as_array().unwrap();
    for pair in results.windows(2) {
        let (a, b) = (&pair[0], &pair[1]);
        let (ua, ub) = (a["updated_at"].as_str().unwrap(), b["updated_at"].as_str().unwrap());
        assert!(ua >= ub);
        if ua == ub {
            assert!(a["id"].as_str().unwrap() < b["id"].as_str().unwrap());
        }
    }
}

#[tokio::test]
async fn over_max_rejected_by_default() {
    let app = default_router();
    let (status, body) = get(&app, "/bills?per_page=51").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "pagination_range");
    let (status, body) = get(&app, "/bills?per_page=50").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["results"].as_array().unwrap().len(), 50);
}

#[tokio::test]
async fn over_max_clamped_when_configured() {
    let settings = PaginationSettings {
        over_max: OverMaxPolicy::Clamp,
        ..Default::default()
    };
    let app = router(seeded_store(), settings);
    let (status, body) = get(&app, "/bills?per_page=500").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["pagination"]["per_page"], 50);
    assert_eq!(body["pagination"]["total_pages"], 3);
}

#[tokio::test]
async fn zero_page_values_rejected() {
    let app = default_router();
    for uri in ["/bills?page=0", "/bills?per_page=0"] {
        let (status, body) = get(&app, uri).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{}", uri);
        assert_eq!(body["error"]["code"], "pagination_range");
    }
    let (status, body) = get(&app, "/bills?page=first").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "bad_request");
}

#[tokio::test]
async fn empty_result_total_pages_follows_policy() {
    let app = default_router();
    let (_, body) = get(&app, "/votes?result=tabled").await;
    assert_eq!(body["results"], json!([]));
    assert_eq!(body["pagination"]["total_items"], 0);
    assert_eq!(body["pagination"]["total_pages"], 1);
    assert_eq!(body["pagination"]["max_page"], 1);

    let settings = PaginationSettings {
        empty_total_pages: EmptyTotalPages::Zero,
        ..Default::default()
    };
    let app = router(seeded_store(), settings);
    let (_, body) = get(&app, "/votes?result=tabled").await;
    assert_eq!(body["pagination"]["total_pages"], 0);
    assert_eq!(body["pagination"]["max_page"], 0);
}
