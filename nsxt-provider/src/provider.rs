//! NSX-T Policy provider implementation
//!
//! Every operation validates the attributes against the schema of the
//! resource type, builds the scoped collection for the object kind and runs
//! the resolver or the upserter against it. Remote calls within one
//! operation are issued one after another.

use std::collections::HashMap;
use std::sync::Arc;

use nsxt_core::provider::{ProviderError, ProviderResult};
use nsxt_core::remote::{ApiError, RemoteCollection};
use nsxt_core::resolver::{Lookup, resolve};
use nsxt_core::resource::{Attributes, Resource, ResourceId, State, Value};
use nsxt_core::upsert;

use crate::client::{PolicyApi, PolicyClient};
use crate::collections::{
    EnforcementPointScope, IpBlockScope, NatRuleScope, PolicyCollection, ProjectScope,
};
use crate::config::ProviderConfig;
use crate::marshal;
use crate::model::NatRuleStatisticsListResult;
use crate::resources::{self, HOST_TRANSPORT_NODE, IP_BLOCK, NAT_RULE_STATISTICS, VPC};
use crate::schemas::host_transport_node::DEFAULT_SITE_PATH;
use crate::utils;

type AttributeMap = HashMap<String, Value>;

/// Query parameters accepted by the NAT rule statistics endpoint
const NAT_STATISTICS_PARAMETERS: [&str; 3] =
    ["action", "container_cluster_path", "enforcement_point_path"];

/// NSX-T Policy API provider
pub struct NsxtProvider {
    api: Arc<dyn PolicyApi>,
    config: ProviderConfig,
}

impl NsxtProvider {
    /// Create a provider talking to the manager named in `config`
    pub fn new(config: ProviderConfig) -> ProviderResult<Self> {
        let client = PolicyClient::new(&config)?;
        Ok(Self::with_api(Arc::new(client), config))
    }

    /// Create a provider on top of any Policy API implementation
    pub fn with_api(api: Arc<dyn PolicyApi>, config: ProviderConfig) -> Self {
        Self { api, config }
    }

    pub fn config(&self) -> &ProviderConfig {
        &self.config
    }

    // =========================================================================
    // Attributes and Scopes
    // =========================================================================

    /// Validate desired attributes and fill in schema defaults
    fn prepare(&self, resource: &Resource, data_source: bool) -> ProviderResult<AttributeMap> {
        let type_name = &resource.id.resource_type;
        let schema = resources::find_schema(type_name, data_source)
            .ok_or_else(|| ProviderError::UnknownResourceType(type_name.clone()))?;

        schema.validate(&resource.attributes).map_err(|errors| {
            let message = errors
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join("; ");
            ProviderError::invalid_attribute(resource.id.to_string(), message)
        })?;

        Ok(schema.with_defaults(&resource.attributes))
    }

    /// Attributes of a resource as recorded in state, with defaults filled in
    fn recorded(&self, resource: &Resource) -> ProviderResult<AttributeMap> {
        let type_name = &resource.id.resource_type;
        let schema = resources::find_schema(type_name, false)
            .ok_or_else(|| ProviderError::UnknownResourceType(type_name.clone()))?;
        Ok(schema.with_defaults(&resource.attributes))
    }

    fn project_scope(&self, attrs: &AttributeMap) -> ProviderResult<ProjectScope> {
        let project_id = required(attrs, "project_id")?;
        Ok(ProjectScope::new(self.config.org_id.as_str(), project_id))
    }

    fn ip_block_scope(&self, attrs: &AttributeMap) -> IpBlockScope {
        match attrs
            .get_block("context")
            .and_then(|c| c.get_string("project_id"))
        {
            Some(project_id) => {
                IpBlockScope::Project(ProjectScope::new(self.config.org_id.as_str(), project_id))
            }
            None => IpBlockScope::Infra,
        }
    }

    fn enforcement_point_scope(&self, attrs: &AttributeMap) -> ProviderResult<EnforcementPointScope> {
        let site_path = attrs.get_string("site_path").unwrap_or(DEFAULT_SITE_PATH);
        let site_id = utils::site_id(site_path).ok_or_else(|| {
            ProviderError::invalid_attribute(
                "site_path",
                format!("error obtaining Site ID from site path {}", site_path),
            )
        })?;
        let enforcement_point_id = attrs
            .get_string("enforcement_point")
            .unwrap_or(self.config.enforcement_point.as_str());

        Ok(EnforcementPointScope {
            site_id: site_id.to_string(),
            enforcement_point_id: enforcement_point_id.to_string(),
        })
    }

    fn vpcs(&self, scope: &ProjectScope) -> PolicyCollection<crate::model::Vpc> {
        PolicyCollection::vpcs(self.api.clone(), scope)
    }

    fn ip_blocks(&self, scope: &IpBlockScope) -> PolicyCollection<crate::model::IpBlock> {
        PolicyCollection::ip_blocks(self.api.clone(), scope)
    }

    fn host_transport_nodes(
        &self,
        scope: &EnforcementPointScope,
    ) -> PolicyCollection<crate::model::HostTransportNode> {
        PolicyCollection::host_transport_nodes(self.api.clone(), scope)
    }

    /// A host transport node can only be created on an existing site
    async fn ensure_site(&self, scope: &EnforcementPointScope) -> ProviderResult<()> {
        self.api
            .get(&scope.site_path(), &[])
            .await
            .map(|_| ())
            .map_err(|e| ProviderError::read_failed("Site", scope.site_id.as_str(), e))
    }

    // =========================================================================
    // Resource Operations
    // =========================================================================

    /// Create a resource and return its read-back state
    pub async fn create_resource(&self, resource: &Resource) -> ProviderResult<State> {
        let attrs = self.prepare(resource, false)?;
        let nsx_id = attrs.get_string("nsx_id");

        let (identifier, attributes) = match resource.id.resource_type.as_str() {
            VPC => {
                let scope = self.project_scope(&attrs)?;
                let desired = marshal::vpc_from_attributes(&attrs);
                let (id, vpc) = upsert::create(&self.vpcs(&scope), nsx_id, &desired).await?;
                (id, marshal::vpc_to_attributes(&vpc, &scope))
            }
            IP_BLOCK => {
                let scope = self.ip_block_scope(&attrs);
                let desired = marshal::ip_block_from_attributes(&attrs);
                let (id, block) = upsert::create(&self.ip_blocks(&scope), nsx_id, &desired).await?;
                (id, marshal::ip_block_to_attributes(&block, &scope))
            }
            HOST_TRANSPORT_NODE => {
                let scope = self.enforcement_point_scope(&attrs)?;
                self.ensure_site(&scope).await?;
                let desired = marshal::host_transport_node_from_attributes(&attrs, None);
                let (id, node) =
                    upsert::create(&self.host_transport_nodes(&scope), nsx_id, &desired).await?;
                (id, marshal::host_transport_node_to_attributes(&node, &scope))
            }
            other => return Err(ProviderError::UnknownResourceType(other.to_string())),
        };

        Ok(existing(&resource.id, identifier, attributes))
    }

    /// Read a resource; `State::not_found` when it is gone
    pub async fn read_resource(&self, resource: &Resource, identifier: &str) -> ProviderResult<State> {
        let attrs = self.recorded(resource)?;

        let attributes = match resource.id.resource_type.as_str() {
            VPC => {
                let scope = self.project_scope(&attrs)?;
                fetch(&self.vpcs(&scope), identifier)
                    .await?
                    .map(|vpc| marshal::vpc_to_attributes(&vpc, &scope))
            }
            IP_BLOCK => {
                let scope = self.ip_block_scope(&attrs);
                fetch(&self.ip_blocks(&scope), identifier)
                    .await?
                    .map(|block| marshal::ip_block_to_attributes(&block, &scope))
            }
            HOST_TRANSPORT_NODE => {
                let scope = self.enforcement_point_scope(&attrs)?;
                fetch(&self.host_transport_nodes(&scope), identifier)
                    .await?
                    .map(|node| marshal::host_transport_node_to_attributes(&node, &scope))
            }
            other => return Err(ProviderError::UnknownResourceType(other.to_string())),
        };

        Ok(match attributes {
            Some(attributes) => existing(&resource.id, identifier.to_string(), attributes),
            None => State::not_found(resource.id.clone()),
        })
    }

    /// Replace a resource with the desired attributes
    pub async fn update_resource(
        &self,
        identifier: &str,
        from: &State,
        to: &Resource,
    ) -> ProviderResult<State> {
        let attrs = self.prepare(to, false)?;

        let attributes = match to.id.resource_type.as_str() {
            VPC => {
                let scope = self.project_scope(&attrs)?;
                let desired = marshal::vpc_from_attributes(&attrs);
                let vpc = upsert::update(&self.vpcs(&scope), identifier, &desired).await?;
                marshal::vpc_to_attributes(&vpc, &scope)
            }
            IP_BLOCK => {
                let scope = self.ip_block_scope(&attrs);
                let desired = marshal::ip_block_from_attributes(&attrs);
                let block = upsert::update(&self.ip_blocks(&scope), identifier, &desired).await?;
                marshal::ip_block_to_attributes(&block, &scope)
            }
            HOST_TRANSPORT_NODE => {
                let scope = self.enforcement_point_scope(&attrs)?;
                let desired =
                    marshal::host_transport_node_from_attributes(&attrs, from.get_int("revision"));
                let node =
                    upsert::update(&self.host_transport_nodes(&scope), identifier, &desired)
                        .await?;
                marshal::host_transport_node_to_attributes(&node, &scope)
            }
            other => return Err(ProviderError::UnknownResourceType(other.to_string())),
        };

        Ok(existing(&to.id, identifier.to_string(), attributes))
    }

    /// Delete a resource
    pub async fn delete_resource(&self, resource: &Resource, identifier: &str) -> ProviderResult<()> {
        let attrs = self.recorded(resource)?;

        match resource.id.resource_type.as_str() {
            VPC => upsert::delete(&self.vpcs(&self.project_scope(&attrs)?), identifier).await,
            IP_BLOCK => upsert::delete(&self.ip_blocks(&self.ip_block_scope(&attrs)), identifier).await,
            HOST_TRANSPORT_NODE => {
                let scope = self.enforcement_point_scope(&attrs)?;
                upsert::delete(&self.host_transport_nodes(&scope), identifier).await
            }
            other => Err(ProviderError::UnknownResourceType(other.to_string())),
        }
    }

    /// Verify that a deleted resource cannot be read anymore
    pub async fn check_destroyed_resource(
        &self,
        resource: &Resource,
        identifier: &str,
    ) -> ProviderResult<()> {
        let attrs = self.recorded(resource)?;

        match resource.id.resource_type.as_str() {
            VPC => {
                let vpcs = self.vpcs(&self.project_scope(&attrs)?);
                upsert::ensure_absent(&vpcs, identifier).await
            }
            IP_BLOCK => {
                let blocks = self.ip_blocks(&self.ip_block_scope(&attrs));
                upsert::ensure_absent(&blocks, identifier).await
            }
            HOST_TRANSPORT_NODE => {
                let nodes = self.host_transport_nodes(&self.enforcement_point_scope(&attrs)?);
                upsert::ensure_absent(&nodes, identifier).await
            }
            other => Err(ProviderError::UnknownResourceType(other.to_string())),
        }
    }

    // =========================================================================
    // Data Sources
    // =========================================================================

    /// Resolve a data source by `id` or `display_name`
    pub async fn lookup_data_source(&self, query: &Resource) -> ProviderResult<State> {
        let attrs = self.prepare(query, true)?;
        let lookup = Lookup::new(attrs.get_string("id"), attrs.get_string("display_name"));

        let (identifier, attributes) = match query.id.resource_type.as_str() {
            VPC => {
                let scope = self.project_scope(&attrs)?;
                let vpc = resolve(&self.vpcs(&scope), &lookup).await?;
                (vpc.meta.id.clone(), marshal::vpc_to_attributes(&vpc, &scope))
            }
            IP_BLOCK => {
                let scope = self.ip_block_scope(&attrs);
                let block = resolve(&self.ip_blocks(&scope), &lookup).await?;
                (block.meta.id.clone(), marshal::ip_block_to_attributes(&block, &scope))
            }
            HOST_TRANSPORT_NODE => {
                let scope = self.enforcement_point_scope(&attrs)?;
                let node = resolve(&self.host_transport_nodes(&scope), &lookup).await?;
                (
                    node.meta.id.clone(),
                    marshal::host_transport_node_to_attributes(&node, &scope),
                )
            }
            NAT_RULE_STATISTICS => return self.read_nat_rule_statistics(query, attrs).await,
            other => return Err(ProviderError::UnknownResourceType(other.to_string())),
        };

        let identifier = identifier.unwrap_or_default();
        let mut attributes = attributes;
        attributes.insert("id".to_string(), Value::string(identifier.as_str()));
        Ok(existing(&query.id, identifier, attributes))
    }

    async fn read_nat_rule_statistics(
        &self,
        query: &Resource,
        attrs: AttributeMap,
    ) -> ProviderResult<State> {
        let scope = NatRuleScope {
            project: self.project_scope(&attrs)?,
            vpc_id: required(&attrs, "vpc_id")?.to_string(),
            nat_id: required(&attrs, "nat_id")?.to_string(),
            rule_id: required(&attrs, "rule_id")?.to_string(),
        };
        let kind = "NatRuleStatistics";

        let params: Vec<(&str, &str)> = NAT_STATISTICS_PARAMETERS
            .iter()
            .filter_map(|key| attrs.get_string(key).map(|value| (*key, value)))
            .collect();

        let json = self
            .api
            .get(&scope.statistics_path(), &params)
            .await
            .map_err(|e| match e {
                ApiError::NotFound => ProviderError::not_found("NatRule", scope.rule_id.as_str()),
                e => ProviderError::read_failed(kind, scope.rule_id.as_str(), e),
            })?;
        let result: NatRuleStatisticsListResult = serde_json::from_value(json).map_err(|e| {
            ProviderError::read_failed(
                kind,
                scope.rule_id.as_str(),
                ApiError::Decode(e.to_string()),
            )
        })?;

        let mut attributes = attrs;
        attributes.insert(
            "statistics".to_string(),
            marshal::nat_rule_statistics_to_value(&result),
        );
        Ok(existing(&query.id, scope.rule_id.clone(), attributes))
    }

    // =========================================================================
    // Import
    // =========================================================================

    /// Adopt an existing object by its policy path
    pub async fn import_resource(&self, id: &ResourceId, import_id: &str) -> ProviderResult<State> {
        let invalid = |expected: &str| {
            ProviderError::invalid_query(
                id.resource_type.as_str(),
                format!("invalid import ID '{}', expected {}", import_id, expected),
            )
        };

        // Later operations address the object under the configured org
        let same_org = |scope: &ProjectScope| {
            if scope.org_id == self.config.org_id {
                Ok(())
            } else {
                Err(ProviderError::invalid_query(
                    id.resource_type.as_str(),
                    format!(
                        "import ID '{}' is in org '{}', the provider is configured for org '{}'",
                        import_id, scope.org_id, self.config.org_id
                    ),
                ))
            }
        };

        let (identifier, attributes) = match id.resource_type.as_str() {
            VPC => {
                let (scope, vpc_id) = utils::parse_vpc_path(import_id)
                    .ok_or_else(|| invalid("/orgs/<org>/projects/<project>/vpcs/<id>"))?;
                same_org(&scope)?;
                let vpcs = self.vpcs(&scope);
                let vpc = fetch(&vpcs, &vpc_id)
                    .await?
                    .ok_or_else(|| ProviderError::not_found(vpcs.kind(), import_id))?;
                (vpc_id, marshal::vpc_to_attributes(&vpc, &scope))
            }
            IP_BLOCK => {
                let (scope, block_id) = utils::parse_ip_block_path(import_id)
                    .ok_or_else(|| invalid("an IP block policy path or ID"))?;
                if let IpBlockScope::Project(project) = &scope {
                    same_org(project)?;
                }
                let blocks = self.ip_blocks(&scope);
                let block = fetch(&blocks, &block_id)
                    .await?
                    .ok_or_else(|| ProviderError::not_found(blocks.kind(), import_id))?;
                (block_id, marshal::ip_block_to_attributes(&block, &scope))
            }
            HOST_TRANSPORT_NODE => {
                let (scope, node_id) = utils::parse_host_transport_node_path(import_id)
                    .ok_or_else(|| {
                        invalid("/infra/sites/<site>/enforcement-points/<ep>/host-transport-nodes/<id>")
                    })?;
                let nodes = self.host_transport_nodes(&scope);
                let node = fetch(&nodes, &node_id)
                    .await?
                    .ok_or_else(|| ProviderError::not_found(nodes.kind(), import_id))?;
                (
                    node_id,
                    marshal::host_transport_node_to_attributes(&node, &scope),
                )
            }
            other => return Err(ProviderError::UnknownResourceType(other.to_string())),
        };

        log::info!("Imported {} from {}", id, import_id);
        Ok(existing(id, identifier, attributes))
    }
}

fn existing(id: &ResourceId, identifier: String, attributes: AttributeMap) -> State {
    State::existing(id.clone(), attributes).with_identifier(identifier)
}

fn required<'a>(attrs: &'a AttributeMap, key: &str) -> ProviderResult<&'a str> {
    attrs
        .get_string(key)
        .ok_or_else(|| ProviderError::invalid_attribute(key, "must not be empty"))
}

/// Get an object; remote not-found is `None`
async fn fetch<C: RemoteCollection>(
    collection: &C,
    id: &str,
) -> ProviderResult<Option<C::Object>> {
    match collection.get(id).await {
        Ok(object) => Ok(Some(object)),
        Err(e) if e.is_not_found() => Ok(None),
        Err(e) => Err(ProviderError::read_failed(collection.kind(), id, e)),
    }
}
