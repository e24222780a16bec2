// 🌐 Notion REST client (reqwest-based)
//
// Implements RecordStore over the three endpoints the linking passes
// use: page retrieve, database query and page update.

use super::{FieldAssignment, Filter, Record, RecordStore};
use crate::config::Config;
use crate::error::{SyncError, SyncResult};
use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response};
use serde::Deserialize;
use serde_json::{json, Map, Value};
use tracing::{debug, warn};

/// Largest page size the query endpoint accepts.
const QUERY_PAGE_SIZE: u32 = 100;

/// One page of database query results.
#[derive(Debug, Deserialize)]
struct QueryResponse {
    results: Vec<Record>,
    #[serde(default)]
    has_more: bool,
    next_cursor: Option<String>,
}

/// Error object returned by the API on non-2xx responses.
#[derive(Debug, Deserialize)]
struct ApiError {
    #[serde(default)]
    code: String,
    #[serde(default)]
    message: String,
}

/// Notion API client sharing one connection pool and token across calls.
#[derive(Debug, Clone)]
pub struct NotionClient {
    base_url: String,
    token: String,
    notion_version: String,
    http_client: Client,
}

impl NotionClient {
    pub fn new(config: &Config) -> SyncResult<Self> {
        let http_client = Client::builder()
            .timeout(config.request_timeout)
            .user_agent(concat!("ledger-sync/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| SyncError::remote("build http client", e.to_string()))?;

        Ok(Self::with_http_client(
            &config.api_base_url,
            &config.notion_token,
            &config.notion_version,
            http_client,
        ))
    }

    /// Create a client with a pre-built `reqwest::Client` (for testing).
    pub fn with_http_client(base_url: &str, token: &str, notion_version: &str, http_client: Client) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            token: token.to_string(),
            notion_version: notion_version.to_string(),
            http_client,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn authorize(&self, builder: RequestBuilder) -> RequestBuilder {
        builder
            .bearer_auth(&self.token)
            .header("Notion-Version", &self.notion_version)
    }

    async fn handle_response<T: serde::de::DeserializeOwned>(
        &self,
        operation: &'static str,
        response: Response,
    ) -> SyncResult<T> {
        let status = response.status();
        if status.is_success() {
            return response.json::<T>().await.map_err(|e| SyncError::Remote {
                operation,
                status: Some(status.as_u16()),
                message: format!("unexpected response body: {e}"),
            });
        }

        let body = response.text().await.unwrap_or_default();
        let message = match serde_json::from_str::<ApiError>(&body) {
            Ok(err) if !err.message.is_empty() => format!("{}: {}", err.code, err.message),
            _ => body,
        };

        Err(SyncError::Remote {
            operation,
            status: Some(status.as_u16()),
            message,
        })
    }
}

#[async_trait]
impl RecordStore for NotionClient {
    async fn retrieve_record(&self, record_id: &str) -> SyncResult<Record> {
        let url = format!("{}/pages/{}", self.base_url, record_id);
        debug!("Notion GET {}", url);

        let response = self.authorize(self.http_client.get(&url)).send().await?;
        self.handle_response("retrieve page", response).await
    }

    async fn query_records(&self, database_id: &str, filter: &Filter) -> SyncResult<Vec<Record>> {
        let url = format!("{}/databases/{}/query", self.base_url, database_id);
        let mut records = Vec::new();
        let mut cursor: Option<String> = None;

        loop {
            let mut body = json!({
                "filter": filter.to_json(),
                "page_size": QUERY_PAGE_SIZE,
            });
            if let Some(c) = &cursor {
                body["start_cursor"] = Value::String(c.clone());
            }

            debug!("Notion POST {} (cursor={:?})", url, cursor);
            let response = self
                .authorize(self.http_client.post(&url))
                .json(&body)
                .send()
                .await?;
            let page: QueryResponse = self.handle_response("query database", response).await?;
            records.extend(page.results);

            match page.next_cursor {
                Some(next) if page.has_more => {
                    // A cursor that does not advance would repeat the same page forever
                    if cursor.as_deref() == Some(next.as_str()) {
                        warn!(database = database_id, cursor = %next, "Query cursor did not advance, stopping");
                        break;
                    }
                    cursor = Some(next);
                }
                _ => break,
            }
        }

        Ok(records)
    }

    async fn update_record(&self, record_id: &str, assignments: &[FieldAssignment]) -> SyncResult<()> {
        let url = format!("{}/pages/{}", self.base_url, record_id);
        let properties: Map<String, Value> = assignments
            .iter()
            .map(|a| (a.property().to_string(), a.to_json()))
            .collect();

        debug!("Notion PATCH {}", url);
        let response = self
            .authorize(self.http_client.patch(&url))
            .json(&json!({ "properties": properties }))
            .send()
            .await?;

        // Body is the updated page; only success matters here.
        let _: Value = self.handle_response("update page", response).await?;
        Ok(())
    }
}
