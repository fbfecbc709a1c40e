//! Provider - Trait abstracting resource operations
//!
//! A Provider turns desired `Resource`s into calls against a management plane
//! and reports the resulting `State`. Data sources go through `lookup`.

use std::future::Future;
use std::pin::Pin;

use thiserror::Error;

use crate::remote::ApiError;
use crate::resource::{Resource, ResourceId, State};
use crate::schema::ResourceSchema;

/// Which partition of a name lookup was ambiguous
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchKind {
    Exact,
    Prefix,
}

/// Error type for Provider operations
///
/// Every variant carries the object kind and the id or name it was about.
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("{kind} '{subject}' was not found")]
    NotFound { kind: String, subject: String },

    #[error("{}", ambiguous_message(.kind, .name, .match_kind))]
    AmbiguousName {
        kind: String,
        name: String,
        match_kind: MatchKind,
    },

    #[error("invalid {kind} query: {message}")]
    InvalidQuery { kind: String, message: String },

    #[error("{kind} with ID '{id}' already exists")]
    AlreadyExists { kind: String, id: String },

    #[error("failed to create {kind} '{id}': {source}")]
    CreateFailed {
        kind: String,
        id: String,
        #[source]
        source: ApiError,
    },

    #[error("failed to update {kind} '{id}': {source}")]
    UpdateFailed {
        kind: String,
        id: String,
        #[source]
        source: ApiError,
    },

    #[error("failed to delete {kind} '{id}': {source}")]
    DeleteFailed {
        kind: String,
        id: String,
        #[source]
        source: ApiError,
    },

    #[error("failed to read {kind} '{id}': {source}")]
    ReadFailed {
        kind: String,
        id: String,
        #[source]
        source: ApiError,
    },

    #[error("failed to list {kind} objects: {source}")]
    ListFailed {
        kind: String,
        #[source]
        source: ApiError,
    },

    #[error("{kind} '{id}' still exists")]
    StillExists { kind: String, id: String },

    #[error("unknown resource type: {0}")]
    UnknownResourceType(String),

    #[error("invalid attribute '{name}': {message}")]
    InvalidAttribute { name: String, message: String },

    #[error("provider configuration error: {0}")]
    Configuration(String),
}

fn ambiguous_message(kind: &str, name: &str, match_kind: &MatchKind) -> String {
    match match_kind {
        MatchKind::Exact => format!("found multiple {kind} objects with name '{name}'"),
        MatchKind::Prefix => {
            format!("found multiple {kind} objects with name starting with '{name}'")
        }
    }
}

impl ProviderError {
    pub fn not_found(kind: impl Into<String>, subject: impl Into<String>) -> Self {
        Self::NotFound {
            kind: kind.into(),
            subject: subject.into(),
        }
    }

    pub fn invalid_query(kind: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidQuery {
            kind: kind.into(),
            message: message.into(),
        }
    }

    pub fn invalid_attribute(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidAttribute {
            name: name.into(),
            message: message.into(),
        }
    }

    pub fn read_failed(kind: impl Into<String>, id: impl Into<String>, source: ApiError) -> Self {
        Self::ReadFailed {
            kind: kind.into(),
            id: id.into(),
            source,
        }
    }

    /// The transport error underneath, if any
    pub fn api_error(&self) -> Option<&ApiError> {
        match self {
            Self::CreateFailed { source, .. }
            | Self::UpdateFailed { source, .. }
            | Self::DeleteFailed { source, .. }
            | Self::ReadFailed { source, .. }
            | Self::ListFailed { source, .. } => Some(source),
            _ => None,
        }
    }
}

pub type ProviderResult<T> = Result<T, ProviderError>;

/// Return type for async operations
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Definition of resource types that a Provider can handle
pub trait ResourceType: Send + Sync {
    /// Resource type name (e.g., "vpc")
    fn name(&self) -> &'static str;

    /// Attribute schema for this resource type
    fn schema(&self) -> ResourceSchema;

    /// Whether this type is a data source rather than a managed resource
    fn is_data_source(&self) -> bool {
        false
    }
}

/// Main Provider trait
///
/// All operations are async and involve side effects. Within one call the
/// remote requests are issued strictly one after another.
pub trait Provider: Send + Sync {
    /// Name of this Provider (e.g., "nsxt")
    fn name(&self) -> &'static str;

    /// Resource types and data sources this Provider can handle
    fn resource_types(&self) -> Vec<Box<dyn ResourceType>>;

    /// Get the current state of a managed resource
    ///
    /// Returns `State::not_found()` if the resource does not exist.
    fn read(
        &self,
        resource: &Resource,
        identifier: &str,
    ) -> BoxFuture<'_, ProviderResult<State>>;

    /// Create a resource
    ///
    /// Returns State with identifier set to the NSX id
    fn create(&self, resource: &Resource) -> BoxFuture<'_, ProviderResult<State>>;

    /// Update a resource in place (full replace)
    fn update(
        &self,
        identifier: &str,
        from: &State,
        to: &Resource,
    ) -> BoxFuture<'_, ProviderResult<State>>;

    /// Delete a resource
    fn delete(&self, resource: &Resource, identifier: &str) -> BoxFuture<'_, ProviderResult<()>>;

    /// Read a data source
    fn lookup(&self, query: &Resource) -> BoxFuture<'_, ProviderResult<State>>;

    /// Adopt an existing object given its policy path (or bare id)
    fn import(&self, id: &ResourceId, import_id: &str) -> BoxFuture<'_, ProviderResult<State>>;

    /// Verify that a deleted resource is gone
    ///
    /// Fails with `StillExists` when it can still be read. Errors other than
    /// not-found are returned, never taken as proof of absence.
    fn check_destroyed(
        &self,
        resource: &Resource,
        identifier: &str,
    ) -> BoxFuture<'_, ProviderResult<()>>;
}

/// Provider implementation for Box<dyn Provider>
/// This enables dynamic dispatch for Providers
impl Provider for Box<dyn Provider> {
    fn name(&self) -> &'static str {
        (**self).name()
    }

    fn resource_types(&self) -> Vec<Box<dyn ResourceType>> {
        (**self).resource_types()
    }

    fn read(
        &self,
        resource: &Resource,
        identifier: &str,
    ) -> BoxFuture<'_, ProviderResult<State>> {
        (**self).read(resource, identifier)
    }

    fn create(&self, resource: &Resource) -> BoxFuture<'_, ProviderResult<State>> {
        (**self).create(resource)
    }

    fn update(
        &self,
        identifier: &str,
        from: &State,
        to: &Resource,
    ) -> BoxFuture<'_, ProviderResult<State>> {
        (**self).update(identifier, from, to)
    }

    fn delete(&self, resource: &Resource, identifier: &str) -> BoxFuture<'_, ProviderResult<()>> {
        (**self).delete(resource, identifier)
    }

    fn lookup(&self, query: &Resource) -> BoxFuture<'_, ProviderResult<State>> {
        (**self).lookup(query)
    }

    fn import(&self, id: &ResourceId, import_id: &str) -> BoxFuture<'_, ProviderResult<State>> {
        (**self).import(id, import_id)
    }

    fn check_destroyed(
        &self,
        resource: &Resource,
        identifier: &str,
    ) -> BoxFuture<'_, ProviderResult<()>> {
        (**self).check_destroyed(resource, identifier)
    }
}
