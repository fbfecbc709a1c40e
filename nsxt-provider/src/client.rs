//! Policy API client
//!
//! `PolicyClient` is a small typed client for the NSX Policy REST API.
//! Collections reach it through the `PolicyApi` trait, which deals in raw
//! JSON bodies addressed by policy path.

use std::collections::HashSet;
use std::future::Future;
use std::time::Duration;

use nsxt_core::provider::{BoxFuture, ProviderError, ProviderResult};
use nsxt_core::remote::{ApiError, ApiResult};
use reqwest::{Client, RequestBuilder, Response};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::Value as Json;

use crate::config::ProviderConfig;

const REQUEST_TIMEOUT_SECS: u64 = 60;

/// Raw JSON access to the Policy API
///
/// Paths are policy paths relative to the API root (e.g. `/infra/ip-blocks/b1`).
pub trait PolicyApi: Send + Sync {
    /// GET a single object
    fn get(&self, path: &str, query: &[(&str, &str)]) -> BoxFuture<'_, ApiResult<Json>>;

    /// GET every page of a collection and return the concatenated `results`
    fn list(&self, path: &str) -> BoxFuture<'_, ApiResult<Vec<Json>>>;

    /// PATCH an object (create or full replace)
    fn patch(&self, path: &str, body: Json) -> BoxFuture<'_, ApiResult<()>>;

    fn delete(&self, path: &str) -> BoxFuture<'_, ApiResult<()>>;
}

/// One page of a list response
#[derive(Debug, Default, Deserialize)]
pub(crate) struct ListPage {
    #[serde(default)]
    pub results: Vec<Json>,
    #[serde(default)]
    pub cursor: Option<String>,
}

/// Error body returned by the manager on failed requests
#[derive(Debug, Deserialize)]
struct ErrorBody {
    error_code: Option<i64>,
    error_message: Option<String>,
}

/// Map a non-success HTTP status and body to an `ApiError`
pub(crate) fn status_error(status: u16, body: &str) -> ApiError {
    if status == 404 {
        return ApiError::NotFound;
    }

    let parsed = serde_json::from_str::<ErrorBody>(body).ok();
    let error_code = parsed.as_ref().and_then(|b| b.error_code);
    let message = parsed
        .and_then(|b| b.error_message)
        .unwrap_or_else(|| body.chars().take(200).collect());

    ApiError::Rejected {
        status,
        error_code,
        message,
    }
}

/// Follow `cursor` until the last page, concatenating results
///
/// Stops at a cursor that was already followed.
pub(crate) async fn collect_pages<F, Fut>(mut fetch: F) -> ApiResult<Vec<Json>>
where
    F: FnMut(Option<String>) -> Fut,
    Fut: Future<Output = ApiResult<ListPage>>,
{
    let mut results = Vec::new();
    let mut followed = HashSet::new();
    let mut cursor: Option<String> = None;

    loop {
        let page = fetch(cursor.take()).await?;
        results.extend(page.results);

        match page.cursor.filter(|c| !c.is_empty()) {
            Some(next) if followed.insert(next.clone()) => cursor = Some(next),
            _ => return Ok(results),
        }
    }
}

/// HTTP client for one NSX manager
pub struct PolicyClient {
    http: Client,
    base_url: String,
    username: String,
    password: String,
}

impl PolicyClient {
    pub fn new(config: &ProviderConfig) -> ProviderResult<Self> {
        config.validate()?;

        let http = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .danger_accept_invalid_certs(config.allow_unverified_ssl)
            .build()
            .map_err(|e| {
                ProviderError::Configuration(format!("failed to create HTTP client: {}", e))
            })?;

        Ok(Self {
            http,
            base_url: config.base_url(),
            username: config.username.clone(),
            password: config.password.clone(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn send(&self, request: RequestBuilder) -> ApiResult<Response> {
        let response = request
            .basic_auth(&self.username, Some(&self.password))
            .header("Accept", "application/json")
            .send()
            .await
            .map_err(|e| ApiError::Transport(e.to_string()))?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        Err(status_error(status.as_u16(), &body))
    }

    pub async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(String, String)],
    ) -> ApiResult<T> {
        log::debug!("GET {}", path);
        let response = self.send(self.http.get(self.url(path)).query(query)).await?;
        response
            .json::<T>()
            .await
            .map_err(|e| ApiError::Decode(e.to_string()))
    }

    pub async fn list_all(&self, path: &str) -> ApiResult<Vec<Json>> {
        collect_pages(|cursor| async move {
            let query: Vec<(String, String)> = cursor
                .map(|c| vec![("cursor".to_string(), c)])
                .unwrap_or_default();
            self.get_json::<ListPage>(path, &query).await
        })
        .await
    }

    pub async fn patch_json(&self, path: &str, body: &Json) -> ApiResult<()> {
        log::debug!("PATCH {}", path);
        self.send(self.http.patch(self.url(path)).json(body))
            .await
            .map(|_| ())
    }

    pub async fn delete(&self, path: &str) -> ApiResult<()> {
        log::debug!("DELETE {}", path);
        self.send(self.http.delete(self.url(path))).await.map(|_| ())
    }
}

impl PolicyApi for PolicyClient {
    fn get(&self, path: &str, query: &[(&str, &str)]) -> BoxFuture<'_, ApiResult<Json>> {
        let path = path.to_string();
        let query: Vec<(String, String)> = query
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Box::pin(async move { self.get_json(&path, &query).await })
    }

    fn list(&self, path: &str) -> BoxFuture<'_, ApiResult<Vec<Json>>> {
        let path = path.to_string();
        Box::pin(async move { self.list_all(&path).await })
    }

    fn patch(&self, path: &str, body: Json) -> BoxFuture<'_, ApiResult<()>> {
        let path = path.to_string();
        Box::pin(async move { self.patch_json(&path, &body).await })
    }

    fn delete(&self, path: &str) -> BoxFuture<'_, ApiResult<()>> {
        let path = path.to_string();
        Box::pin(async move { PolicyClient::delete(self, &path).await })
    }
}
