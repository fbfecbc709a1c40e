//! NSX-T Policy Provider
//!
//! Manages VPCs, IP blocks and host transport nodes through the NSX-T Policy
//! API, and reads them (plus NAT rule statistics) as data sources.
//!
//! ## Module Structure
//!
//! - `client` - HTTP client for the Policy API
//! - `collections` - Scoped object collections (project, infra, enforcement point)
//! - `config` - Manager connection settings
//! - `marshal` - Conversion between attributes and wire models
//! - `model` - Wire models of the Policy API
//! - `provider` - NsxtProvider implementation
//! - `resources` - Resource type and data source definitions
//! - `schemas` - Attribute schemas per resource type
//! - `utils` - Policy path helpers

pub mod client;
pub mod collections;
pub mod config;
pub mod marshal;
pub mod model;
pub mod provider;
pub mod resources;
pub mod schemas;
pub mod utils;

#[cfg(test)]
mod testing;

// Re-export main types
pub use client::{PolicyApi, PolicyClient};
pub use config::ProviderConfig;
pub use provider::NsxtProvider;

use nsxt_core::provider::{BoxFuture, Provider, ProviderResult};
use nsxt_core::resource::{Resource, ResourceId, State};

use resources::resource_types;

// =============================================================================
// Provider Trait Implementation
// =============================================================================

impl Provider for NsxtProvider {
    fn name(&self) -> &'static str {
        "nsxt"
    }

    fn resource_types(&self) -> Vec<Box<dyn nsxt_core::provider::ResourceType>> {
        resource_types()
    }

    fn read(
        &self,
        resource: &Resource,
        identifier: &str,
    ) -> BoxFuture<'_, ProviderResult<State>> {
        let resource = resource.clone();
        let identifier = identifier.to_string();
        Box::pin(async move { self.read_resource(&resource, &identifier).await })
    }

    fn create(&self, resource: &Resource) -> BoxFuture<'_, ProviderResult<State>> {
        let resource = resource.clone();
        Box::pin(async move { self.create_resource(&resource).await })
    }

    fn update(
        &self,
        identifier: &str,
        from: &State,
        to: &Resource,
    ) -> BoxFuture<'_, ProviderResult<State>> {
        let identifier = identifier.to_string();
        let from = from.clone();
        let to = to.clone();
        Box::pin(async move { self.update_resource(&identifier, &from, &to).await })
    }

    fn delete(&self, resource: &Resource, identifier: &str) -> BoxFuture<'_, ProviderResult<()>> {
        let resource = resource.clone();
        let identifier = identifier.to_string();
        Box::pin(async move { self.delete_resource(&resource, &identifier).await })
    }

    fn lookup(&self, query: &Resource) -> BoxFuture<'_, ProviderResult<State>> {
        let query = query.clone();
        Box::pin(async move { self.lookup_data_source(&query).await })
    }

    fn import(&self, id: &ResourceId, import_id: &str) -> BoxFuture<'_, ProviderResult<State>> {
        let id = id.clone();
        let import_id = import_id.to_string();
        Box::pin(async move { self.import_resource(&id, &import_id).await })
    }

    fn check_destroyed(
        &self,
        resource: &Resource,
        identifier: &str,
    ) -> BoxFuture<'_, ProviderResult<()>> {
        let resource = resource.clone();
        let identifier = identifier.to_string();
        Box::pin(async move { self.check_destroyed_resource(&resource, &identifier).await })
    }
}
