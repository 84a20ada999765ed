use std::env;
use std::io::{self, IsTerminal, Read};
use std::path::PathBuf;

use chrono::Utc;
use serde::Serialize;
use serde_json::{Map, Value};
use till_core::config::ClientConfig;
use till_core::models::new_record_id;
use till_core::state::DEFAULT_USER_NAME;
use till_core::{
    AppState, Branch, Cashier, Customer, Entity, LocalStoreService, Product, Role, Sale, Session,
    Supplier, SyncClient, SyncConflict, SyncReconciler,
};

use crate::error::CliError;

/// Global options shared by every command
#[derive(Debug, Clone)]
pub struct Context {
    pub db_path: PathBuf,
    pub api_url: Option<String>,
    pub user: Option<String>,
}

impl Context {
    pub fn new(db_path: Option<PathBuf>, api_url: Option<String>, user: Option<String>) -> Self {
        Self {
            db_path: resolve_db_path(db_path),
            api_url,
            user,
        }
    }

    pub fn open_store(&self) -> Result<LocalStoreService, CliError> {
        Ok(LocalStoreService::open_path(&self.db_path)?)
    }

    pub fn client_config(&self) -> Result<ClientConfig, CliError> {
        let mut config = ClientConfig::from_env()?;
        if let Some(api_url) = self.api_url.as_deref() {
            config.api_url = api_url.to_string();
        }
        Ok(config)
    }

    pub fn client(&self) -> Result<SyncClient, CliError> {
        Ok(SyncClient::from_config(&self.client_config()?)?)
    }

    /// `--user` name, or the default attribution when none is given
    pub fn user_name(&self) -> String {
        self.user
            .as_deref()
            .and_then(normalize_content)
            .unwrap_or_else(|| DEFAULT_USER_NAME.to_string())
    }

    /// Application state with the `--user` session applied
    pub fn app_state(&self) -> Result<AppState, CliError> {
        let store = self.open_store()?;
        let reconciler = SyncReconciler::new(store.clone(), self.client()?);
        let state = AppState::new(store, reconciler);
        if let Some(user_name) = self.user.as_deref().and_then(normalize_content) {
            state.sign_in(Session {
                user_name,
                role: Role::Cashier,
                branch_id: None,
            });
        }
        Ok(state)
    }
}

/// One-line human rendering of a record
pub trait RecordLine: Entity {
    fn summary(&self) -> String;
}

impl RecordLine for Product {
    fn summary(&self) -> String {
        format!("{:<24}  {:>10.2}  stock={}", self.name, self.price, self.stock)
    }
}

impl RecordLine for Branch {
    fn summary(&self) -> String {
        format!("{:<24}  {}", self.name, self.location)
    }
}

impl RecordLine for Cashier {
    fn summary(&self) -> String {
        format!("{:<24}  branch={}", self.name, self.branch_id)
    }
}

impl RecordLine for Supplier {
    fn summary(&self) -> String {
        format!("{:<24}  {}  {}", self.name, self.category, self.phone)
    }
}

impl RecordLine for Sale {
    fn summary(&self) -> String {
        format!(
            "{:<24}  {:>10.2}  {}  by {}",
            self.receipt_no, self.total, self.payment_method, self.user_name
        )
    }
}

impl RecordLine for Customer {
    fn summary(&self) -> String {
        format!("{:<24}  {}", self.name, self.phone)
    }
}

#[derive(Debug, Serialize)]
pub struct SyncConflictItem {
    pub id: i64,
    pub collection: String,
    pub record_id: String,
    pub remote_last_modified: i64,
    pub incoming_last_modified: i64,
    pub remote_version: u64,
    pub incoming_version: u64,
    pub resolved_at: i64,
    pub resolved_at_iso: String,
    pub strategy: String,
}

pub fn format_record_lines<T: RecordLine>(records: &[T]) -> Vec<String> {
    let now_ms = Utc::now().timestamp_millis();
    records
        .iter()
        .map(|record| {
            let short_id = short_id(record.id());
            let relative_time = format_relative_time(record.last_modified(), now_ms);
            format!("{short_id:<13}  {}  {relative_time}", record.summary())
        })
        .collect()
}

pub fn short_id(id: &str) -> String {
    id.chars().take(13).collect()
}

pub fn sync_conflict_to_item(conflict: &SyncConflict) -> SyncConflictItem {
    SyncConflictItem {
        id: conflict.id,
        collection: conflict.collection.clone(),
        record_id: conflict.record_id.clone(),
        remote_last_modified: conflict.remote_last_modified,
        incoming_last_modified: conflict.incoming_last_modified,
        remote_version: conflict.remote_version,
        incoming_version: conflict.incoming_version,
        resolved_at: conflict.resolved_at,
        resolved_at_iso: format_sync_timestamp(conflict.resolved_at),
        strategy: conflict.strategy.clone(),
    }
}

pub fn format_sync_conflict_lines(conflicts: &[SyncConflict]) -> Vec<String> {
    conflicts
        .iter()
        .map(|conflict| {
            format!(
                "{}  {:<4}  {}={}  remote=v{}@{} incoming=v{}@{}",
                format_sync_timestamp(conflict.resolved_at),
                conflict.strategy,
                conflict.collection,
                conflict.record_id,
                conflict.remote_version,
                conflict.remote_last_modified,
                conflict.incoming_version,
                conflict.incoming_last_modified
            )
        })
        .collect()
}

pub fn format_sync_timestamp(timestamp_ms: i64) -> String {
    chrono::DateTime::from_timestamp_millis(timestamp_ms).map_or_else(
        || timestamp_ms.to_string(),
        |date_time| date_time.format("%Y-%m-%d %H:%M:%S UTC").to_string(),
    )
}

pub fn format_relative_time(timestamp_ms: i64, now_ms: i64) -> String {
    if timestamp_ms <= 0 {
        return "never".to_string();
    }

    let diff = now_ms.saturating_sub(timestamp_ms);
    let minute = 60_000;
    let hour = 60 * minute;
    let day = 24 * hour;
    let week = 7 * day;
    let month = 30 * day;
    let year = 365 * day;

    if diff < minute {
        "just now".to_string()
    } else if diff < hour {
        format!("{}m ago", diff / minute)
    } else if diff < day {
        format!("{}h ago", diff / hour)
    } else if diff < week {
        format!("{}d ago", diff / day)
    } else if diff < month {
        format!("{}w ago", diff / week)
    } else if diff < year {
        format!("{}mo ago", diff / month)
    } else {
        format!("{}y ago", diff / year)
    }
}

/// Record JSON from the argument, or from piped stdin
pub fn resolve_payload(payload: Option<&str>) -> Result<String, CliError> {
    if let Some(content) = payload.filter(|raw| *raw != "-").and_then(normalize_content) {
        return Ok(content);
    }

    read_piped_stdin()?.ok_or(CliError::EmptyPayload)
}

/// Decode a record, generating an id when the payload has none
pub fn parse_record<T: Entity>(raw: &str) -> Result<T, CliError> {
    let mut value: Value = serde_json::from_str(raw)?;
    let object = value.as_object_mut().ok_or(CliError::InvalidPayload)?;

    let has_id = object
        .get("id")
        .and_then(Value::as_str)
        .is_some_and(|id| !id.trim().is_empty());
    if !has_id {
        object.insert("id".to_string(), Value::String(new_record_id()));
    }

    Ok(serde_json::from_value(value)?)
}

/// Build a search filter from `key=value` pairs
pub fn parse_filters<T: Entity>(pairs: &[String]) -> Result<T::Search, CliError> {
    let mut object = Map::new();
    for pair in pairs {
        let (key, value) = pair
            .split_once('=')
            .filter(|(key, _)| !key.trim().is_empty())
            .ok_or_else(|| CliError::InvalidFilter(pair.clone()))?;
        object.insert(
            snake_to_camel(key.trim()),
            Value::String(value.trim().to_string()),
        );
    }
    Ok(serde_json::from_value(Value::Object(object))?)
}

fn snake_to_camel(key: &str) -> String {
    let mut out = String::with_capacity(key.len());
    let mut upper = false;
    for ch in key.chars() {
        if ch == '_' || ch == '-' {
            upper = true;
        } else if upper {
            out.extend(ch.to_uppercase());
            upper = false;
        } else {
            out.push(ch);
        }
    }
    out
}

pub fn normalize_content(content: &str) -> Option<String> {
    let trimmed = content.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

pub fn normalize_record_id(id: &str) -> Result<String, CliError> {
    normalize_content(id).ok_or(CliError::EmptyRecordId)
}

pub fn read_piped_stdin() -> Result<Option<String>, CliError> {
    let stdin = io::stdin();
    if stdin.is_terminal() {
        return Ok(None);
    }

    let mut buffer = String::new();
    stdin.lock().read_to_string(&mut buffer)?;
    Ok(normalize_content(&buffer))
}

pub fn resolve_db_path(cli_db_path: Option<PathBuf>) -> PathBuf {
    cli_db_path
        .or_else(|| env::var_os("TILL_DB_PATH").map(PathBuf::from))
        .unwrap_or_else(default_db_path)
}

pub fn default_db_path() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("till")
        .join("till.db")
}

pub fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<(), CliError> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
