use std::sync::Arc;

use axum::extract::{DefaultBodyLimit, Query, State};
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tokio::sync::Mutex;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use till_core::db::{Database, DocumentStore, SqliteDocumentStore};
use till_core::merge::{self, MergeEngine};
use till_core::sync::protocol::{ConflictsResponse, OwnerResponse, SyncRequest, SyncResponse};
use till_core::{Branch, Cashier, Customer, Entity, Product, Sale, Supplier};

use crate::config::{seed_owner, AppConfig};
use crate::error::AppError;

const DEFAULT_CONFLICT_LIMIT: usize = 50;
const MAX_CONFLICT_LIMIT: usize = 500;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    db: Arc<Mutex<Database>>,
}

impl AppState {
    /// Open the document store and provision the owner account if missing.
    pub fn open(config: Arc<AppConfig>) -> till_core::Result<Self> {
        if let Some(parent) = config.db_path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let db = Database::open(&config.db_path)?;
        Self::with_database(config, db)
    }

    pub fn with_database(config: Arc<AppConfig>, db: Database) -> till_core::Result<Self> {
        merge::ensure_owner(&SqliteDocumentStore::new(db.connection()), &seed_owner(&config))?;
        Ok(Self {
            config,
            db: Arc::new(Mutex::new(db)),
        })
    }
}

pub fn app_router(state: AppState) -> Router {
    let max_body_bytes = state.config.max_body_bytes;
    Router::new()
        .route("/healthz", get(healthz))
        .route(
            "/api/sync",
            post(sync).layer(DefaultBodyLimit::max(max_body_bytes)),
        )
        .route("/api/sync/conflicts", get(list_conflicts))
        .route("/api/owner", get(owner))
        .route("/api/products/search", post(search::<Product>))
        .route("/api/branches/search", post(search::<Branch>))
        .route("/api/cashiers/search", post(search::<Cashier>))
        .route("/api/suppliers/search", post(search::<Supplier>))
        .route("/api/sales/search", post(search::<Sale>))
        .route("/api/customers/search", post(search::<Customer>))
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_headers(Any)
                .allow_methods(Any),
        )
        .with_state(state)
}

#[derive(Debug, Serialize)]
struct HealthResponse {
    status: &'static str,
    timestamp: i64,
}

async fn healthz() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        timestamp: Utc::now().timestamp(),
    })
}

async fn sync(
    State(state): State<AppState>,
    Json(request): Json<SyncRequest>,
) -> Result<Json<SyncResponse>, AppError> {
    let mut db = state.db.lock().await;
    let (response, summary) =
        MergeEngine::apply(db.connection_mut(), &request).map_err(|error| match error {
            till_core::Error::InvalidInput(message) => AppError::bad_request(message),
            other => {
                tracing::error!("Sync merge rolled back: {other}");
                AppError::internal("Sync failed")
            }
        })?;

    tracing::info!(
        endpoint = "sync",
        incoming = request.len(),
        written = summary.written_count(),
        deleted = summary.deleted_count(),
        conflicts = summary.conflict_count(),
        "Merged sync request"
    );
    Ok(Json(response))
}

#[derive(Debug, Deserialize)]
struct ConflictsQuery {
    limit: Option<usize>,
}

async fn list_conflicts(
    State(state): State<AppState>,
    Query(query): Query<ConflictsQuery>,
) -> Result<Json<ConflictsResponse>, AppError> {
    let limit = query
        .limit
        .unwrap_or(DEFAULT_CONFLICT_LIMIT)
        .clamp(1, MAX_CONFLICT_LIMIT);
    let db = state.db.lock().await;
    let conflicts = SqliteDocumentStore::new(db.connection()).list_conflicts(limit)?;
    Ok(Json(ConflictsResponse { conflicts }))
}

async fn owner(State(state): State<AppState>) -> Result<Json<OwnerResponse>, AppError> {
    let db = state.db.lock().await;
    let owner = merge::find_owner(&SqliteDocumentStore::new(db.connection()))?
        .ok_or_else(|| AppError::not_found("Owner not found"))?;
    Ok(Json(OwnerResponse { owner }))
}

async fn search<T: Entity>(
    State(state): State<AppState>,
    Json(filter): Json<T::Search>,
) -> Result<Json<Value>, AppError> {
    let records = {
        let db = state.db.lock().await;
        merge::search::<T>(&SqliteDocumentStore::new(db.connection()), &filter)?
    };

    tracing::debug!(
        endpoint = "search",
        collection = T::KIND.collection(),
        results = records.len(),
        "Served search"
    );
    let mut body = Map::new();
    body.insert(
        T::KIND.collection().to_string(),
        serde_json::to_value(records).map_err(till_core::Error::from)?,
    );
    Ok(Json(Value::Object(body)))
}
