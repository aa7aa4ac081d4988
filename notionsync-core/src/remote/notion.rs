//! Notion HTTP client.
//!
//! Wraps async reqwest calls in a current-thread tokio runtime so the rest of
//! the engine can stay synchronous. Rate limiting and transient failures are
//! retried here; callers only see the final outcome.

use std::time::Duration;

use rand::Rng;
use reqwest::header::RETRY_AFTER;
use reqwest::Method;
use serde_json::{json, Value};
use tokio::runtime::Runtime;

use super::wire;
use super::{
    ChildrenPage, DatabasePage, PageMetadata, PageParent, RemoteBlock, RemoteClient, RemoteError,
};

pub const NOTION_API_URL: &str = "https://api.notion.com/v1";
pub const NOTION_VERSION: &str = "2022-06-28";

/// Items per listing request, the API maximum.
const PAGE_SIZE: usize = 100;
/// Nesting levels sent inline with an append; deeper content follows in
/// separate requests.
const INLINE_LEVELS: usize = 1;
const DEFAULT_MAX_RETRIES: u32 = 5;
const BASE_BACKOFF: Duration = Duration::from_millis(500);
const MAX_BACKOFF: Duration = Duration::from_secs(30);
const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

/// Blocking Notion API client.
pub struct NotionClient {
    http: reqwest::Client,
    runtime: Runtime,
    api_key: String,
    base_url: String,
    max_retries: u32,
}

impl NotionClient {
    /// Creates a client for the public Notion API.
    pub fn new(api_key: impl Into<String>) -> Result<Self, RemoteError> {
        Self::with_base_url(api_key, NOTION_API_URL)
    }

    /// Creates a client against a custom endpoint.
    pub fn with_base_url(
        api_key: impl Into<String>,
        base_url: impl Into<String>,
    ) -> Result<Self, RemoteError> {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(|e| RemoteError::Transient(format!("failed to start runtime: {}", e)))?;
        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| RemoteError::Transient(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self {
            http,
            runtime,
            api_key: api_key.into(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            max_retries: DEFAULT_MAX_RETRIES,
        })
    }

    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn call(&self, method: Method, path: &str, body: Option<Value>) -> Result<Value, RemoteError> {
        self.runtime
            .block_on(self.call_with_retry(method, path, body.as_ref()))
    }

    async fn call_with_retry(
        &self,
        method: Method,
        path: &str,
        body: Option<&Value>,
    ) -> Result<Value, RemoteError> {
        let mut attempt = 0u32;
        loop {
            match self.send_once(method.clone(), path, body).await {
                Err(error) if error.is_retryable() && attempt < self.max_retries => {
                    let delay = backoff_delay(attempt, &error);
                    tracing::warn!(
                        "{} {} failed ({}); retrying in {:?}",
                        method,
                        path,
                        error,
                        delay
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                result => return result,
            }
        }
    }

    async fn send_once(
        &self,
        method: Method,
        path: &str,
        body: Option<&Value>,
    ) -> Result<Value, RemoteError> {
        let url = format!("{}{}", self.base_url, path);
        tracing::debug!("{} {}", method, url);

        let mut request = self
            .http
            .request(method, &url)
            .bearer_auth(&self.api_key)
            .header("Notion-Version", NOTION_VERSION);
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request
            .send()
            .await
            .map_err(|e| RemoteError::Transient(e.to_string()))?;

        let status = response.status();
        if status.is_success() {
            return response
                .json::<Value>()
                .await
                .map_err(|e| RemoteError::Validation(format!("invalid response body: {}", e)));
        }

        let retry_after = response
            .headers()
            .get(RETRY_AFTER)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.trim().parse::<u64>().ok())
            .map(Duration::from_secs);
        let message = response
            .json::<Value>()
            .await
            .ok()
            .and_then(|v| v["message"].as_str().map(str::to_string))
            .unwrap_or_else(|| status.to_string());

        Err(RemoteError::from_status(status.as_u16(), message, retry_after))
    }

    /// Appends blocks in requests of at most [`PAGE_SIZE`], then fills in
    /// content nested deeper than the API accepts in one request.
    fn append_tree(&self, parent_id: &str, blocks: &[RemoteBlock]) -> Result<(), RemoteError> {
        for chunk in blocks.chunks(PAGE_SIZE) {
            let children: Vec<Value> = chunk
                .iter()
                .map(|block| wire::block_to_json(block, INLINE_LEVELS))
                .collect();
            let response = self.call(
                Method::PATCH,
                &format!("/blocks/{}/children", parent_id),
                Some(json!({ "children": children })),
            )?;

            let created: Vec<String> = response["results"]
                .as_array()
                .map(|results| {
                    results
                        .iter()
                        .filter_map(|r| r["id"].as_str().map(str::to_string))
                        .collect()
                })
                .unwrap_or_default();

            for (block, id) in chunk.iter().zip(created) {
                if wire::has_deferred_children(block, INLINE_LEVELS) {
                    self.append_deferred(&id, block)?;
                }
            }
        }
        Ok(())
    }

    /// Appends the grandchildren of `block`, whose direct children already
    /// exist under `block_id`.
    fn append_deferred(&self, block_id: &str, block: &RemoteBlock) -> Result<(), RemoteError> {
        let mut child_ids = Vec::new();
        let mut cursor: Option<String> = None;
        loop {
            let page = self.list_children_page(block_id, cursor.as_deref())?;
            child_ids.extend(page.blocks.into_iter().filter_map(|b| b.id));
            match page.next_cursor {
                Some(next) => cursor = Some(next),
                None => break,
            }
        }

        for (child, child_id) in block.children.iter().zip(child_ids) {
            if wire::has_deferred_children(child, 0) {
                self.append_tree(&child_id, &child.children)?;
            }
        }
        Ok(())
    }
}

impl std::fmt::Debug for NotionClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NotionClient")
            .field("base_url", &self.base_url)
            .field("max_retries", &self.max_retries)
            .finish_non_exhaustive()
    }
}

/// Delay before retry number `attempt` (zero based). A server-provided
/// `Retry-After` wins; otherwise exponential backoff with jitter.
fn backoff_delay(attempt: u32, error: &RemoteError) -> Duration {
    if let RemoteError::RateLimited {
        retry_after: Some(wait),
    } = error
    {
        return (*wait).min(MAX_BACKOFF);
    }
    let exponential = BASE_BACKOFF
        .saturating_mul(2u32.saturating_pow(attempt))
        .min(MAX_BACKOFF);
    let jitter_ms = rand::rng().random_range(0..=exponential.as_millis() as u64 / 4);
    exponential + Duration::from_millis(jitter_ms)
}

impl RemoteClient for NotionClient {
    fn create_page(&self, parent: &PageParent, title: &str) -> Result<String, RemoteError> {
        let response = self.call(
            Method::POST,
            "/pages",
            Some(wire::create_page_body(parent, title)),
        )?;
        response["id"]
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| RemoteError::Validation("create page response without id".to_string()))
    }

    fn append_blocks(&self, parent_id: &str, blocks: &[RemoteBlock]) -> Result<(), RemoteError> {
        if blocks.is_empty() {
            return Ok(());
        }
        self.append_tree(parent_id, blocks)
    }

    fn list_children_page(
        &self,
        block_id: &str,
        cursor: Option<&str>,
    ) -> Result<ChildrenPage, RemoteError> {
        let mut path = format!("/blocks/{}/children?page_size={}", block_id, PAGE_SIZE);
        if let Some(cursor) = cursor {
            path.push_str("&start_cursor=");
            path.push_str(&urlencoding::encode(cursor));
        }
        let response = self.call(Method::GET, &path, None)?;
        let blocks = response["results"]
            .as_array()
            .map(|results| results.iter().map(wire::block_from_json).collect())
            .unwrap_or_default();
        Ok(ChildrenPage {
            blocks,
            next_cursor: wire::next_cursor(&response),
        })
    }

    fn page_metadata(&self, page_id: &str) -> Result<PageMetadata, RemoteError> {
        let response = self.call(Method::GET, &format!("/pages/{}", page_id), None)?;
        wire::page_metadata_from_json(&response)
    }

    fn archive_page(&self, page_id: &str) -> Result<(), RemoteError> {
        self.call(
            Method::PATCH,
            &format!("/pages/{}", page_id),
            Some(json!({ "archived": true })),
        )?;
        Ok(())
    }

    fn delete_block(&self, block_id: &str) -> Result<(), RemoteError> {
        self.call(Method::DELETE, &format!("/blocks/{}", block_id), None)?;
        Ok(())
    }

    fn query_database(
        &self,
        database_id: &str,
        cursor: Option<&str>,
    ) -> Result<DatabasePage, RemoteError> {
        let mut body = json!({ "page_size": PAGE_SIZE });
        if let Some(cursor) = cursor {
            body["start_cursor"] = json!(cursor);
        }
        let response = self.call(
            Method::POST,
            &format!("/databases/{}/query", database_id),
            Some(body),
        )?;
        let pages = response["results"]
            .as_array()
            .map(|results| {
                results
                    .iter()
                    .map(wire::page_metadata_from_json)
                    .collect::<Result<Vec<_>, _>>()
            })
            .transpose()?
            .unwrap_or_default();
        Ok(DatabasePage {
            pages,
            next_cursor: wire::next_cursor(&response),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backoff_honors_retry_after() {
        let error = RemoteError::RateLimited {
            retry_after: Some(Duration::from_secs(3)),
        };
        assert_eq!(backoff_delay(0, &error), Duration::from_secs(3));
    }

    #[test]
    fn test_backoff_grows_and_is_capped() {
        let error = RemoteError::Transient("503".to_string());
        let first = backoff_delay(0, &error);
        assert!(first >= BASE_BACKOFF && first <= BASE_BACKOFF + BASE_BACKOFF / 4);
        let late = backoff_delay(20, &error);
        assert!(late >= MAX_BACKOFF && late <= MAX_BACKOFF + MAX_BACKOFF / 4);
    }

    #[test]
    fn test_client_trims_base_url() {
        let client = NotionClient::with_base_url("secret", "http://localhost:9999/v1/").unwrap();
        assert_eq!(client.base_url(), "http://localhost:9999/v1");
        assert!(!format!("{:?}", client).contains("secret"));
    }

    #[test]
    fn test_unreachable_server_is_transient() {
        let client = NotionClient::with_base_url("key", "http://127.0.0.1:9")
            .unwrap()
            .with_max_retries(0);
        let result = client.page_metadata("p1");
        assert!(matches!(result, Err(RemoteError::Transient(_))));
    }
}
