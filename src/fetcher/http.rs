//! HTTP JSON page loader
//!
//! Offset/limit pagination over a REST endpoint returning a body such as
//! `{"count": 1302, "results": [...]}`.

use super::types::PageLoader;
use crate::error::{Error, Result};
use crate::types::{PageRequest, PageResult};
use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::collections::HashMap;
use std::marker::PhantomData;
use std::time::Duration;
use tracing::debug;
use url::Url;

/// Page loader issuing one GET per page
pub struct HttpPageLoader<T> {
    client: Client,
    url: Url,
    offset_param: String,
    limit_param: String,
    page_param: Option<String>,
    items_path: String,
    total_path: Option<String>,
    headers: HashMap<String, String>,
    _item: PhantomData<fn() -> T>,
}

impl<T> HttpPageLoader<T> {
    /// Create a loader for `url` with `offset`/`limit` params and a
    /// `{count, results}` body
    pub fn new(url: &str) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .user_agent(format!("infinite-scroll/{}", env!("CARGO_PKG_VERSION")))
            .build()?;
        Self::with_client(client, url)
    }

    /// Create a loader sharing an existing reqwest client
    pub fn with_client(client: Client, url: &str) -> Result<Self> {
        Ok(Self {
            client,
            url: Url::parse(url)?,
            offset_param: "offset".to_string(),
            limit_param: "limit".to_string(),
            page_param: None,
            items_path: "results".to_string(),
            total_path: Some("count".to_string()),
            headers: HashMap::new(),
            _item: PhantomData,
        })
    }

    /// Set offset and limit query parameter names
    #[must_use]
    pub fn with_params(mut self, offset: impl Into<String>, limit: impl Into<String>) -> Self {
        self.offset_param = offset.into();
        self.limit_param = limit.into();
        self
    }

    /// Also send the page index under this query parameter
    #[must_use]
    pub fn with_page_param(mut self, page: impl Into<String>) -> Self {
        self.page_param = Some(page.into());
        self
    }

    /// Dot path to the item array (empty = body is the array)
    #[must_use]
    pub fn with_items_path(mut self, path: impl Into<String>) -> Self {
        self.items_path = path.into();
        self
    }

    /// Dot path to the total count, or None if the API has none
    #[must_use]
    pub fn with_total_path(mut self, path: Option<String>) -> Self {
        self.total_path = path;
        self
    }

    /// Add a request header
    #[must_use]
    pub fn header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(key.into(), value.into());
        self
    }

    /// Build the URL for a page request
    pub fn page_url(&self, request: &PageRequest) -> Url {
        let mut url = self.url.clone();
        {
            let mut pairs = url.query_pairs_mut();
            pairs.append_pair(&self.offset_param, &request.offset.to_string());
            pairs.append_pair(&self.limit_param, &request.limit.to_string());
            if let Some(page_param) = &self.page_param {
                pairs.append_pair(page_param, &request.page.to_string());
            }
        }
        url
    }

    /// Split a response body into items and total count
    pub fn parse_body(&self, body: &Value) -> Result<PageResult<T>>
    where
        T: DeserializeOwned,
    {
        let items = match extract_path(body, &self.items_path) {
            Some(Value::Array(arr)) => arr
                .iter()
                .map(|item| serde_json::from_value(item.clone()))
                .collect::<std::result::Result<Vec<T>, _>>()
                .map_err(|e| Error::decode(format!("Invalid item: {e}")))?,
            Some(Value::Null) | None => Vec::new(),
            Some(other) => {
                return Err(Error::decode(format!(
                    "Expected an array at '{}', found {}",
                    self.items_path,
                    json_kind(other)
                )))
            }
        };

        let total_count = self
            .total_path
            .as_deref()
            .and_then(|path| extract_path(body, path))
            .and_then(|v| match v {
                Value::Number(n) => n.as_u64(),
                Value::String(s) => s.parse().ok(),
                _ => None,
            });

        Ok(PageResult { items, total_count })
    }
}

#[async_trait]
impl<T> PageLoader<T> for HttpPageLoader<T>
where
    T: DeserializeOwned + Send + 'static,
{
    async fn load_page(&self, request: PageRequest) -> Result<PageResult<T>> {
        let url = self.page_url(&request);

        let mut req = self.client.get(url.clone());
        for (key, value) in &self.headers {
            req = req.header(key.as_str(), value.as_str());
        }

        let response = req.send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::http_status(status.as_u16(), body));
        }

        let body: Value = response
            .json()
            .await
            .map_err(|e| Error::decode(format!("Failed to parse JSON: {e}")))?;
        let page = self.parse_body(&body)?;

        debug!("GET {url}: {} items, total {:?}", page.len(), page.total_count);
        Ok(page)
    }
}

impl<T> std::fmt::Debug for HttpPageLoader<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpPageLoader")
            .field("url", &self.url.as_str())
            .field("items_path", &self.items_path)
            .field("total_path", &self.total_path)
            .finish_non_exhaustive()
    }
}

/// Follow a dot path (`data.items`, `$.count`) into a JSON value
pub fn extract_path<'a>(value: &'a Value, path: &str) -> Option<&'a Value> {
    let path = path.strip_prefix("$.").unwrap_or(path);
    if path.is_empty() || path == "$" {
        return Some(value);
    }

    let mut current = value;
    for part in path.split('.') {
        current = match current {
            Value::Object(map) => map.get(part)?,
            Value::Array(arr) => arr.get(part.parse::<usize>().ok()?)?,
            _ => return None,
        };
    }
    Some(current)
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
