//! End-to-end sync cycles between local stores and an in-process backend

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use pretty_assertions::assert_eq;
use till_core::db::Database;
use till_core::models::{ProductSearch, SaleSearch};
use till_core::sync::protocol::SyncRequest;
use till_core::{Branch, LocalStoreService, Product, Sale, SyncClient, SyncError, SyncReconciler};

use crate::config::AppConfig;
use crate::routes::{app_router, AppState};

async fn spawn_backend() -> String {
    spawn_backend_with(AppConfig::for_tests(PathBuf::from(":memory:"))).await
}

async fn spawn_backend_with(config: AppConfig) -> String {
    let config = Arc::new(config);
    let state = AppState::with_database(config, Database::open_in_memory().unwrap()).unwrap();
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app_router(state)).await.unwrap();
    });
    format!("http://{addr}")
}

fn client(url: &str) -> SyncClient {
    SyncClient::new(url, Duration::from_secs(5)).unwrap()
}

fn device(url: &str) -> (LocalStoreService, SyncReconciler) {
    let store = LocalStoreService::open_in_memory().unwrap();
    let reconciler = SyncReconciler::new(store.clone(), client(url));
    (store, reconciler)
}

async fn remote_products(url: &str) -> Vec<Product> {
    client(url)
        .search::<Product>(&ProductSearch::default())
        .await
        .unwrap()
}

#[tokio::test]
async fn first_sync_uploads_and_echoes_records() {
    let url = spawn_backend().await;
    let (store, reconciler) = device(&url);
    let rice = store.upsert(Product::new("Rice", 100.0)).await.unwrap();

    let report = reconciler.request_sync().await.unwrap();

    assert_eq!(report.pushed_records, 1);
    assert_eq!(report.conflicts, 0);
    assert_eq!(store.list::<Product>().await, vec![rice.clone()]);
    assert_eq!(remote_products(&url).await, vec![rice]);
}

#[tokio::test]
async fn repeated_sync_is_idempotent() {
    let url = spawn_backend().await;
    let (store, reconciler) = device(&url);
    store.upsert(Product::new("Rice", 100.0)).await.unwrap();
    store.upsert(Branch::new("CBD", "Nairobi")).await.unwrap();

    reconciler.request_sync().await.unwrap();
    let after_first = store.snapshot_all().await;
    reconciler.request_sync().await.unwrap();
    let after_second = store.snapshot_all().await;

    assert_eq!(after_first, after_second);
}

#[tokio::test]
async fn stale_device_receives_authoritative_record() {
    let url = spawn_backend().await;
    let (store_a, sync_a) = device(&url);
    let (store_b, sync_b) = device(&url);

    let rice = store_a.upsert(Product::new("Rice", 90.0)).await.unwrap();
    sync_a.request_sync().await.unwrap();
    sync_b.request_sync().await.unwrap();
    assert_eq!(store_b.get::<Product>(&rice.id).await, Some(rice.clone()));

    let repriced = Product {
        price: 100.0,
        ..rice.clone()
    };
    store_a.upsert(repriced).await.unwrap();
    sync_a.request_sync().await.unwrap();

    // Device B still pushes its untouched copy
    let report = sync_b.request_sync().await.unwrap();

    assert_eq!(report.conflicts, 1);
    let on_b = store_b.get::<Product>(&rice.id).await.unwrap();
    assert_eq!(on_b.price, 100.0);
    assert_eq!(on_b.version, 2);

    let conflicts = client(&url).list_conflicts(10).await.unwrap();
    assert_eq!(conflicts.len(), 1);
    assert_eq!(conflicts[0].record_id, rice.id);
    assert_eq!(conflicts[0].collection, "products");
    assert_eq!(conflicts[0].strategy, "lww");
}

#[tokio::test]
async fn concurrent_edits_keep_the_later_write() {
    let url = spawn_backend().await;
    let (store_a, sync_a) = device(&url);
    let (store_b, sync_b) = device(&url);

    let rice = store_a.upsert(Product::new("Rice", 90.0)).await.unwrap();
    sync_a.request_sync().await.unwrap();
    sync_b.request_sync().await.unwrap();

    store_a
        .upsert(Product {
            price: 95.0,
            ..rice.clone()
        })
        .await
        .unwrap();
    tokio::time::sleep(Duration::from_millis(5)).await;
    store_b
        .upsert(Product {
            price: 99.0,
            ..rice.clone()
        })
        .await
        .unwrap();

    sync_b.request_sync().await.unwrap();
    let report = sync_a.request_sync().await.unwrap();

    assert_eq!(report.conflicts, 1);
    assert_eq!(store_a.get::<Product>(&rice.id).await.unwrap().price, 99.0);
}

#[tokio::test]
async fn deletion_propagates_and_stays_deleted() {
    let url = spawn_backend().await;
    let (store, reconciler) = device(&url);
    let rice = store.upsert(Product::new("Rice", 100.0)).await.unwrap();
    let beans = store.upsert(Product::new("Beans", 80.0)).await.unwrap();
    reconciler.request_sync().await.unwrap();

    store.delete::<Product>(&rice.id).await.unwrap();
    let report = reconciler.request_sync().await.unwrap();

    assert_eq!(report.acknowledged_deletions, 1);
    assert!(store.tombstones::<Product>().await.is_empty());
    assert_eq!(store.list::<Product>().await, vec![beans.clone()]);
    assert_eq!(remote_products(&url).await, vec![beans.clone()]);

    reconciler.request_sync().await.unwrap();
    assert_eq!(store.list::<Product>().await, vec![beans]);
    assert!(store.get::<Product>(&rice.id).await.is_none());
}

#[tokio::test]
async fn local_collections_match_server_after_sync() {
    let url = spawn_backend().await;
    let (store_a, sync_a) = device(&url);
    let (store_b, sync_b) = device(&url);

    store_a.upsert(Product::new("Rice", 100.0)).await.unwrap();
    sync_a.request_sync().await.unwrap();
    store_b.upsert(Product::new("Sugar", 150.0)).await.unwrap();
    sync_b.request_sync().await.unwrap();
    sync_a.request_sync().await.unwrap();

    let remote = remote_products(&url).await;
    assert_eq!(remote.len(), 2);
    assert_eq!(store_a.list::<Product>().await, remote);
    assert_eq!(store_b.list::<Product>().await.len(), 2);
}

#[tokio::test]
async fn owner_is_seeded_and_cached_after_sync() {
    let url = spawn_backend().await;
    let (store, reconciler) = device(&url);

    let report = reconciler.request_sync().await.unwrap();

    assert!(report.owner_refreshed);
    let owner = store.cached_owner().await.unwrap();
    assert_eq!(owner.id, "owner-1");
    assert_eq!(owner.name, "John Doe");
    assert_eq!(owner.pin, "5222");
}

#[tokio::test]
async fn search_filters_remote_collections() {
    let url = spawn_backend().await;
    let (store, reconciler) = device(&url);
    let mut rice = Product::new("Basmati Rice", 200.0);
    rice.category = "Grains".to_string();
    store.upsert(rice).await.unwrap();
    store.upsert(Product::new("Sugar", 150.0)).await.unwrap();
    let mut sale = Sale::new(Vec::new(), "cash");
    sale.user_name = "Wanjiru".to_string();
    store.upsert(sale.clone()).await.unwrap();
    reconciler.request_sync().await.unwrap();

    let api = client(&url);
    let by_name = api
        .search::<Product>(&ProductSearch {
            name: Some("rice".to_string()),
            ..ProductSearch::default()
        })
        .await
        .unwrap();
    assert_eq!(by_name.len(), 1);
    assert_eq!(by_name[0].name, "Basmati Rice");

    let by_category = api
        .search::<Product>(&ProductSearch {
            category: Some("grains".to_string()),
            ..ProductSearch::default()
        })
        .await
        .unwrap();
    assert!(by_category.is_empty());

    let sales = api
        .search::<Sale>(&SaleSearch {
            user_name: Some("wanj".to_string()),
            ..SaleSearch::default()
        })
        .await
        .unwrap();
    assert_eq!(sales.len(), 1);
    assert_eq!(sales[0].id, sale.id);
}

fn large_request() -> SyncRequest {
    let products: Vec<Product> = (0..3_000)
        .map(|index| Product {
            id: format!("p{index}"),
            description: "x".repeat(1_000),
            ..Product::new(format!("Product {index}"), 10.0)
        })
        .collect();
    SyncRequest {
        products,
        ..SyncRequest::default()
    }
}

#[tokio::test]
async fn sync_accepts_requests_above_two_megabytes() {
    let url = spawn_backend().await;
    let request = large_request();
    assert!(serde_json::to_vec(&request).unwrap().len() > 2 * 1024 * 1024);

    let response = client(&url).push(&request).await.unwrap();

    assert_eq!(response.products.len(), 3_000);
}

#[tokio::test]
async fn sync_rejects_requests_over_configured_limit() {
    let mut config = AppConfig::for_tests(PathBuf::from(":memory:"));
    config.max_body_bytes = 1024 * 1024;
    let url = spawn_backend_with(config).await;

    let err = client(&url).push(&large_request()).await.unwrap_err();

    assert!(
        matches!(err, SyncError::Api { status: 413, .. }),
        "{err:?}"
    );
}
