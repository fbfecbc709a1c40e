//! In-memory Policy API used by the provider tests

use std::collections::BTreeMap;
use std::sync::Mutex;

use nsxt_core::provider::BoxFuture;
use nsxt_core::remote::{ApiError, ApiResult};
use serde_json::{Value as Json, json};

use crate::client::PolicyApi;

/// Stores objects by policy path and behaves like the manager for PATCH:
/// the body replaces the stored object and server-owned fields are refreshed.
#[derive(Default)]
pub struct MemoryPolicyApi {
    objects: Mutex<BTreeMap<String, Json>>,
    requests: Mutex<Vec<String>>,
    bodies: Mutex<Vec<(String, Json)>>,
    failures: Mutex<Vec<(String, String, ApiError)>>,
}

impl MemoryPolicyApi {
    pub fn insert(&self, path: &str, mut object: Json) {
        if let Some(fields) = object.as_object_mut() {
            fields
                .entry("path")
                .or_insert_with(|| json!(path));
            if let Some((parent, id)) = path.rsplit_once('/') {
                fields.entry("id").or_insert_with(|| json!(id));
                fields
                    .entry("parent_path")
                    .or_insert_with(|| json!(parent));
            }
        }
        self.objects.lock().unwrap().insert(path.to_string(), object);
    }

    pub fn object(&self, path: &str) -> Option<Json> {
        self.objects.lock().unwrap().get(path).cloned()
    }

    pub fn paths(&self) -> Vec<String> {
        self.objects.lock().unwrap().keys().cloned().collect()
    }

    /// Requests seen so far, e.g. `PATCH /infra/ip-blocks/b1`
    pub fn requests(&self) -> Vec<String> {
        self.requests.lock().unwrap().clone()
    }

    /// Last PATCH body sent to `path`
    pub fn sent(&self, path: &str) -> Option<Json> {
        self.bodies
            .lock()
            .unwrap()
            .iter()
            .rev()
            .find(|(p, _)| p == path)
            .map(|(_, body)| body.clone())
    }

    pub fn writes(&self) -> usize {
        self.requests()
            .iter()
            .filter(|r| r.starts_with("PATCH") || r.starts_with("DELETE"))
            .count()
    }

    /// Make every `method` request on `path` fail with `error`
    pub fn fail(&self, method: &str, path: &str, error: ApiError) {
        self.failures
            .lock()
            .unwrap()
            .push((method.to_string(), path.to_string(), error));
    }

    fn record(&self, method: &str, path: &str) -> ApiResult<()> {
        self.requests
            .lock()
            .unwrap()
            .push(format!("{} {}", method, path));

        let failures = self.failures.lock().unwrap();
        match failures.iter().find(|(m, p, _)| m == method && p == path) {
            Some((_, _, error)) => Err(error.clone()),
            None => Ok(()),
        }
    }
}

impl PolicyApi for MemoryPolicyApi {
    fn get(&self, path: &str, query: &[(&str, &str)]) -> BoxFuture<'_, ApiResult<Json>> {
        let path = path.to_string();
        let query: Vec<String> = query.iter().map(|(k, v)| format!("{}={}", k, v)).collect();
        Box::pin(async move {
            if !query.is_empty() {
                self.requests
                    .lock()
                    .unwrap()
                    .push(format!("QUERY {}", query.join("&")));
            }
            self.record("GET", &path)?;
            self.object(&path).ok_or(ApiError::NotFound)
        })
    }

    fn list(&self, path: &str) -> BoxFuture<'_, ApiResult<Vec<Json>>> {
        let prefix = format!("{}/", path);
        let path = path.to_string();
        Box::pin(async move {
            self.record("LIST", &path)?;
            Ok(self
                .objects
                .lock()
                .unwrap()
                .iter()
                .filter(|(p, _)| {
                    p.strip_prefix(&prefix)
                        .is_some_and(|rest| !rest.is_empty() && !rest.contains('/'))
                })
                .map(|(_, o)| o.clone())
                .collect())
        })
    }

    fn patch(&self, path: &str, body: Json) -> BoxFuture<'_, ApiResult<()>> {
        let path = path.to_string();
        Box::pin(async move {
            self.record("PATCH", &path)?;
            self.bodies
                .lock()
                .unwrap()
                .push((path.clone(), body.clone()));

            let revision = self
                .object(&path)
                .and_then(|o| o.get("_revision").and_then(Json::as_i64))
                .map_or(0, |r| r + 1);
            let id = path.rsplit('/').next().unwrap_or_default().to_string();

            let mut object = body;
            if let Some(fields) = object.as_object_mut() {
                fields.insert("id".to_string(), json!(id));
                fields.insert("_revision".to_string(), json!(revision));
                fields.remove("path");
                fields.remove("parent_path");
            }
            self.insert(&path, object);
            Ok(())
        })
    }

    fn delete(&self, path: &str) -> BoxFuture<'_, ApiResult<()>> {
        let path = path.to_string();
        Box::pin(async move {
            self.record("DELETE", &path)?;
            match self.objects.lock().unwrap().remove(&path) {
                Some(_) => Ok(()),
                None => Err(ApiError::NotFound),
            }
        })
    }
}
