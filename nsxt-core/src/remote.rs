//! Remote - The transport capability the provider logic is written against
//!
//! A `RemoteCollection` is one kind of NSX object addressed inside one scope
//! (e.g. the VPCs of a single project). Scope is carried by the collection
//! value itself, never by shared state.

use thiserror::Error;

use crate::provider::BoxFuture;

/// Error reported by the transport for a single remote call
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ApiError {
    /// The remote system reports no object at this address
    #[error("object not found")]
    NotFound,

    /// The remote system rejected the request
    #[error("request rejected with status {status}: {message}")]
    Rejected {
        status: u16,
        error_code: Option<i64>,
        message: String,
    },

    /// Connection, TLS or timeout failure
    #[error("transport error: {0}")]
    Transport(String),

    /// The response body could not be decoded
    #[error("invalid response: {0}")]
    Decode(String),
}

impl ApiError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, ApiError::NotFound)
    }
}

pub type ApiResult<T> = Result<T, ApiError>;

/// An object owned by the remote system, addressed by id and labelled by a
/// (not necessarily unique) display name
pub trait RemoteObject {
    fn id(&self) -> Option<&str>;
    fn display_name(&self) -> Option<&str>;
}

/// The four remote calls used by lookup and upsert, bound to a single scope
pub trait RemoteCollection: Send + Sync {
    type Object: RemoteObject + Clone + Send + Sync;

    /// Human readable kind used in error messages (e.g., "Vpc")
    fn kind(&self) -> &'static str;

    /// Fetch a single object by id
    fn get(&self, id: &str) -> BoxFuture<'_, ApiResult<Self::Object>>;

    /// Fetch the whole collection (every page)
    fn list(&self) -> BoxFuture<'_, ApiResult<Vec<Self::Object>>>;

    /// Full-replace write of the object under `id`
    fn patch(&self, id: &str, object: &Self::Object) -> BoxFuture<'_, ApiResult<()>>;

    fn delete(&self, id: &str) -> BoxFuture<'_, ApiResult<()>>;
}

#[cfg(test)]
pub(crate) mod memory {
    //! In-memory collection used by the core tests

    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;

    #[derive(Debug, Clone, PartialEq)]
    pub struct Object {
        pub id: Option<String>,
        pub display_name: Option<String>,
        pub description: Option<String>,
    }

    impl Object {
        pub fn named(id: &str, display_name: &str) -> Self {
            Self {
                id: Some(id.to_string()),
                display_name: Some(display_name.to_string()),
                description: None,
            }
        }
    }

    impl RemoteObject for Object {
        fn id(&self) -> Option<&str> {
            self.id.as_deref()
        }

        fn display_name(&self) -> Option<&str> {
            self.display_name.as_deref()
        }
    }

    #[derive(Default)]
    pub struct MemoryCollection {
        pub objects: Mutex<Vec<Object>>,
        pub calls: AtomicUsize,
        pub writes: AtomicUsize,
        /// When set, every call fails with this error
        pub failure: Mutex<Option<ApiError>>,
        /// When set, `get` fails with this error after a write happened
        pub read_failure: Mutex<Option<ApiError>>,
        /// When set, `patch` fails with this error and changes nothing
        pub patch_failure: Mutex<Option<ApiError>>,
    }

    impl MemoryCollection {
        pub fn with_objects(objects: Vec<Object>) -> Self {
            Self {
                objects: Mutex::new(objects),
                ..Default::default()
            }
        }

        pub fn failing(error: ApiError) -> Self {
            Self {
                failure: Mutex::new(Some(error)),
                ..Default::default()
            }
        }

        pub fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }

        pub fn writes(&self) -> usize {
            self.writes.load(Ordering::SeqCst)
        }

        pub fn ids(&self) -> Vec<String> {
            self.objects
                .lock()
                .unwrap()
                .iter()
                .filter_map(|o| o.id.clone())
                .collect()
        }

        fn check(&self) -> ApiResult<()> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            match self.failure.lock().unwrap().clone() {
                Some(e) => Err(e),
                None => Ok(()),
            }
        }
    }

    impl RemoteCollection for MemoryCollection {
        type Object = Object;

        fn kind(&self) -> &'static str {
            "Widget"
        }

        fn get(&self, id: &str) -> BoxFuture<'_, ApiResult<Object>> {
            let id = id.to_string();
            Box::pin(async move {
                self.check()?;
                if self.writes() > 0
                    && let Some(e) = self.read_failure.lock().unwrap().clone()
                {
                    return Err(e);
                }
                self.objects
                    .lock()
                    .unwrap()
                    .iter()
                    .find(|o| o.id.as_deref() == Some(id.as_str()))
                    .cloned()
                    .ok_or(ApiError::NotFound)
            })
        }

        fn list(&self) -> BoxFuture<'_, ApiResult<Vec<Object>>> {
            Box::pin(async move {
                self.check()?;
                Ok(self.objects.lock().unwrap().clone())
            })
        }

        fn patch(&self, id: &str, object: &Object) -> BoxFuture<'_, ApiResult<()>> {
            let mut object = object.clone();
            object.id = Some(id.to_string());
            Box::pin(async move {
                self.check()?;
                if let Some(e) = self.patch_failure.lock().unwrap().clone() {
                    return Err(e);
                }
                self.writes.fetch_add(1, Ordering::SeqCst);
                let mut objects = self.objects.lock().unwrap();
                match objects.iter_mut().find(|o| o.id == object.id) {
                    Some(existing) => *existing = object,
                    None => objects.push(object),
                }
                Ok(())
            })
        }

        fn delete(&self, id: &str) -> BoxFuture<'_, ApiResult<()>> {
            let id = id.to_string();
            Box::pin(async move {
                self.check()?;
                let mut objects = self.objects.lock().unwrap();
                let before = objects.len();
                objects.retain(|o| o.id.as_deref() != Some(id.as_str()));
                if objects.len() == before {
                    Err(ApiError::NotFound)
                } else {
                    Ok(())
                }
            })
        }
    }
}
