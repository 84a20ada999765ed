//! HTTP client for the sync backend

use std::time::Duration;

use reqwest::{RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use serde::Deserialize;

use super::protocol::{ConflictsResponse, OwnerResponse, SyncRequest, SyncResponse};
use super::{SyncError, SyncResult};
use crate::config::ClientConfig;
use crate::models::{Entity, Owner, SyncConflict};
use crate::util::{compact_text, is_http_url, normalize_text_option};

#[derive(Clone)]
pub struct SyncClient {
    base_url: String,
    client: reqwest::Client,
}

impl SyncClient {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> SyncResult<Self> {
        let base_url = normalize_endpoint(base_url.into())?;
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|error| SyncError::InvalidConfiguration(error.to_string()))?;
        Ok(Self { base_url, client })
    }

    pub fn from_config(config: &ClientConfig) -> SyncResult<Self> {
        Self::new(config.api_url.clone(), config.sync_timeout)
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Push a full snapshot and receive the authoritative collections
    pub async fn push(&self, request: &SyncRequest) -> SyncResult<SyncResponse> {
        let builder = self.client.post(self.url("/api/sync")).json(request);
        self.send(builder).await
    }

    pub async fn fetch_owner(&self) -> SyncResult<Owner> {
        let response: OwnerResponse = self.send(self.client.get(self.url("/api/owner"))).await?;
        Ok(response.owner)
    }

    /// Filtered read of one remote collection
    pub async fn search<T: Entity>(&self, filter: &T::Search) -> SyncResult<Vec<T>> {
        let collection = T::KIND.collection();
        let builder = self
            .client
            .post(self.url(&format!("/api/{collection}/search")))
            .json(filter);
        let mut body: serde_json::Map<String, serde_json::Value> = self.send(builder).await?;
        let records = body.remove(collection).ok_or_else(|| {
            SyncError::MalformedResponse(format!("response did not include {collection}"))
        })?;
        serde_json::from_value(records)
            .map_err(|error| SyncError::MalformedResponse(error.to_string()))
    }

    /// Recently discarded writes recorded by the backend
    pub async fn list_conflicts(&self, limit: usize) -> SyncResult<Vec<SyncConflict>> {
        let builder = self
            .client
            .get(self.url("/api/sync/conflicts"))
            .query(&[("limit", limit)]);
        let response: ConflictsResponse = self.send(builder).await?;
        Ok(response.conflicts)
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    async fn send<R: DeserializeOwned>(&self, builder: RequestBuilder) -> SyncResult<R> {
        let response = builder.header("Accept", "application/json").send().await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(SyncError::Api {
                status: status.as_u16(),
                message: parse_api_error(status, &body),
            });
        }

        let body = response.bytes().await?;
        serde_json::from_slice(&body).map_err(|error| SyncError::MalformedResponse(error.to_string()))
    }
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    error: Option<String>,
    message: Option<String>,
}

fn parse_api_error(status: StatusCode, body: &str) -> String {
    if let Ok(payload) = serde_json::from_str::<ApiErrorBody>(body) {
        if let Some(message) = payload.error.or(payload.message) {
            return format!("{} ({})", message.trim(), status.as_u16());
        }
    }

    let compact = compact_text(body);
    if compact.is_empty() {
        format!("HTTP {}", status.as_u16())
    } else {
        format!("{compact} ({})", status.as_u16())
    }
}

fn normalize_endpoint(raw: String) -> SyncResult<String> {
    let endpoint = normalize_text_option(Some(raw)).ok_or_else(|| {
        SyncError::InvalidConfiguration("endpoint must not be empty".to_string())
    })?;
    if is_http_url(&endpoint) {
        Ok(endpoint.trim_end_matches('/').to_string())
    } else {
        Err(SyncError::InvalidConfiguration(
            "endpoint must include http:// or https://".to_string(),
        ))
    }
}
