//! REST client for a PocketBase server.
//!
//! Wraps the collection records API (list, view, create, update, delete)
//! using [`reqwest`], and hands realtime subscriptions to
//! [`RealtimeClient`](crate::realtime::RealtimeClient).

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Method;
use serde::Deserialize;
use serde_json::{Map, Value};

use pinboard_events::Record;

use crate::error::StoreError;
use crate::realtime::RealtimeClient;
use crate::reconnect::ReconnectConfig;
use crate::store::{Filter, ListQuery, RecordStore};
use crate::subscription::Subscription;

/// Records requested per page when listing.
pub const PAGE_SIZE: u32 = 500;

/// Default timeout for a single REST request.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

// ---------------------------------------------------------------------------
// Shared HTTP plumbing
// ---------------------------------------------------------------------------

/// Connection settings shared by the REST and realtime halves.
#[derive(Clone)]
pub(crate) struct HttpContext {
    pub(crate) client: reqwest::Client,
    pub(crate) base_url: String,
    pub(crate) token: Option<String>,
    pub(crate) request_timeout: Duration,
}

impl HttpContext {
    pub(crate) fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Request builder with the auth header attached when configured.
    pub(crate) fn request(&self, method: Method, url: String) -> reqwest::RequestBuilder {
        let builder = self.client.request(method, url);
        match &self.token {
            Some(token) => builder.header(reqwest::header::AUTHORIZATION, token),
            None => builder,
        }
    }
}

/// Ensure the response has a success status code. Returns the response
/// unchanged on success, or a [`StoreError::Api`] containing the status
/// and body text on failure.
pub(crate) async fn ensure_success(
    response: reqwest::Response,
) -> Result<reqwest::Response, StoreError> {
    let status = response.status();
    if !status.is_success() {
        let body = response
            .text()
            .await
            .unwrap_or_else(|_| "<unreadable body>".to_string());
        return Err(StoreError::Api {
            status: status.as_u16(),
            body,
        });
    }
    Ok(response)
}

/// Parse a successful JSON response body into the expected type.
async fn parse_response<T: serde::de::DeserializeOwned>(
    response: reqwest::Response,
) -> Result<T, StoreError> {
    let response = ensure_success(response).await?;
    let bytes = response.bytes().await?;
    Ok(serde_json::from_slice(&bytes)?)
}

// ---------------------------------------------------------------------------
// PocketBaseStore
// ---------------------------------------------------------------------------

/// One page of a list response.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ListPage {
    page: u32,
    total_pages: u32,
    items: Vec<Record>,
}

/// [`RecordStore`] backed by a PocketBase server.
pub struct PocketBaseStore {
    http: HttpContext,
    reconnect: ReconnectConfig,
}

impl PocketBaseStore {
    /// Create a client for the server at `base_url`.
    ///
    /// * `token` - optional auth token sent as the `Authorization` header.
    /// * `request_timeout` - per-request timeout for REST calls. The
    ///   realtime stream is long-lived and only bounded at connect time.
    pub fn new(
        base_url: impl Into<String>,
        token: Option<String>,
        request_timeout: Duration,
    ) -> Result<Self, StoreError> {
        let client = reqwest::Client::builder()
            .connect_timeout(request_timeout)
            .build()?;
        Ok(Self::with_client(client, base_url, token, request_timeout))
    }

    /// Create a store reusing an existing [`reqwest::Client`].
    pub fn with_client(
        client: reqwest::Client,
        base_url: impl Into<String>,
        token: Option<String>,
        request_timeout: Duration,
    ) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self {
            http: HttpContext {
                client,
                base_url,
                token,
                request_timeout,
            },
            reconnect: ReconnectConfig::default(),
        }
    }

    pub fn with_reconnect(mut self, reconnect: ReconnectConfig) -> Self {
        self.reconnect = reconnect;
        self
    }

    pub fn base_url(&self) -> &str {
        &self.http.base_url
    }

    // ---- private helpers ----

    fn records_url(&self, collection: &str) -> String {
        self.http
            .url(&format!("/api/collections/{collection}/records"))
    }

    fn record_url(&self, collection: &str, id: &str) -> String {
        self.http
            .url(&format!("/api/collections/{collection}/records/{id}"))
    }

    async fn send(&self, builder: reqwest::RequestBuilder) -> Result<reqwest::Response, StoreError> {
        Ok(builder.timeout(self.http.request_timeout).send().await?)
    }

    async fn fetch_page(
        &self,
        collection: &str,
        query: &ListQuery,
        page: u32,
    ) -> Result<ListPage, StoreError> {
        let mut params: Vec<(&str, String)> = vec![
            ("page", page.to_string()),
            ("perPage", PAGE_SIZE.to_string()),
        ];
        if let Some(filter) = query.filter.as_ref().filter(|f| !f.is_empty()) {
            params.push(("filter", filter.to_query()));
        }
        if let Some(sort) = &query.sort {
            params.push(("sort", sort.clone()));
        }

        let builder = self
            .http
            .request(Method::GET, self.records_url(collection))
            .query(&params);
        parse_response(self.send(builder).await?).await
    }
}

#[async_trait]
impl RecordStore for PocketBaseStore {
    async fn fetch_one(&self, collection: &str, id: &str) -> Result<Record, StoreError> {
        let builder = self.http.request(Method::GET, self.record_url(collection, id));
        parse_response(self.send(builder).await?)
            .await
            .map_err(|e| e.for_record(collection, id))
    }

    async fn fetch_all(
        &self,
        collection: &str,
        query: &ListQuery,
    ) -> Result<Vec<Record>, StoreError> {
        let mut records = Vec::new();
        let mut page = 1;

        loop {
            let batch = self.fetch_page(collection, query, page).await?;
            records.extend(batch.items);
            if batch.page >= batch.total_pages {
                break;
            }
            page = batch.page + 1;
        }

        tracing::debug!(collection, count = records.len(), "Fetched records");
        Ok(records)
    }

    async fn create(
        &self,
        collection: &str,
        fields: Map<String, Value>,
    ) -> Result<Record, StoreError> {
        let builder = self
            .http
            .request(Method::POST, self.records_url(collection))
            .json(&fields);
        parse_response(self.send(builder).await?).await
    }

    async fn update(
        &self,
        collection: &str,
        id: &str,
        fields: Map<String, Value>,
    ) -> Result<Record, StoreError> {
        let builder = self
            .http
            .request(Method::PATCH, self.record_url(collection, id))
            .json(&fields);
        parse_response(self.send(builder).await?)
            .await
            .map_err(|e| e.for_record(collection, id))
    }

    async fn delete(&self, collection: &str, id: &str) -> Result<(), StoreError> {
        let builder = self
            .http
            .request(Method::DELETE, self.record_url(collection, id));
        ensure_success(self.send(builder).await?)
            .await
            .map_err(|e| e.for_record(collection, id))?;
        Ok(())
    }

    async fn subscribe(
        &self,
        collection: &str,
        filter: Option<Filter>,
    ) -> Result<Subscription, StoreError> {
        let realtime = RealtimeClient::new(self.http.clone(), self.reconnect.clone());
        Ok(realtime.spawn(collection, filter))
    }
}
