//! Scoped collections
//!
//! Every object kind lives under a parent path that depends on its scope
//! (project, tenant, site and enforcement point). A `PolicyCollection` binds
//! the scope at construction, so lookup and upsert never see global state.

use std::marker::PhantomData;
use std::sync::Arc;

use nsxt_core::provider::BoxFuture;
use nsxt_core::remote::{ApiError, ApiResult, RemoteCollection, RemoteObject};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value as Json;

use crate::client::PolicyApi;
use crate::model::{HostTransportNode, IpBlock, Vpc};

/// A project inside an organization (multitenancy)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectScope {
    pub org_id: String,
    pub project_id: String,
}

impl ProjectScope {
    pub fn new(org_id: impl Into<String>, project_id: impl Into<String>) -> Self {
        Self {
            org_id: org_id.into(),
            project_id: project_id.into(),
        }
    }

    pub fn path(&self) -> String {
        format!("/orgs/{}/projects/{}", self.org_id, self.project_id)
    }
}

/// Where an IP block lives: the default tenant or a project
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IpBlockScope {
    Infra,
    Project(ProjectScope),
}

impl IpBlockScope {
    pub fn path(&self) -> String {
        match self {
            IpBlockScope::Infra => "/infra/ip-blocks".to_string(),
            IpBlockScope::Project(project) => format!("{}/infra/ip-blocks", project.path()),
        }
    }
}

/// An enforcement point of a site
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnforcementPointScope {
    pub site_id: String,
    pub enforcement_point_id: String,
}

impl EnforcementPointScope {
    pub fn site_path(&self) -> String {
        format!("/infra/sites/{}", self.site_id)
    }

    pub fn path(&self) -> String {
        format!(
            "{}/enforcement-points/{}",
            self.site_path(),
            self.enforcement_point_id
        )
    }
}

/// A NAT rule of a VPC NAT section
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NatRuleScope {
    pub project: ProjectScope,
    pub vpc_id: String,
    pub nat_id: String,
    pub rule_id: String,
}

impl NatRuleScope {
    pub fn statistics_path(&self) -> String {
        format!(
            "{}/vpcs/{}/nat/{}/nat-rules/{}/statistics",
            self.project.path(),
            self.vpc_id,
            self.nat_id,
            self.rule_id
        )
    }
}

/// One kind of policy object under one parent path
pub struct PolicyCollection<T> {
    api: Arc<dyn PolicyApi>,
    kind: &'static str,
    base_path: String,
    _object: PhantomData<fn() -> T>,
}

impl<T> PolicyCollection<T> {
    fn new(api: Arc<dyn PolicyApi>, kind: &'static str, base_path: String) -> Self {
        Self {
            api,
            kind,
            base_path,
            _object: PhantomData,
        }
    }

    pub fn base_path(&self) -> &str {
        &self.base_path
    }

    pub fn object_path(&self, id: &str) -> String {
        format!("{}/{}", self.base_path, id)
    }
}

impl PolicyCollection<Vpc> {
    pub fn vpcs(api: Arc<dyn PolicyApi>, scope: &ProjectScope) -> Self {
        Self::new(api, "Vpc", format!("{}/vpcs", scope.path()))
    }
}

impl PolicyCollection<IpBlock> {
    pub fn ip_blocks(api: Arc<dyn PolicyApi>, scope: &IpBlockScope) -> Self {
        Self::new(api, "IpBlock", scope.path())
    }
}

impl PolicyCollection<HostTransportNode> {
    pub fn host_transport_nodes(api: Arc<dyn PolicyApi>, scope: &EnforcementPointScope) -> Self {
        Self::new(
            api,
            "HostTransportNode",
            format!("{}/host-transport-nodes", scope.path()),
        )
    }
}

fn decode<T: DeserializeOwned>(json: Json) -> ApiResult<T> {
    serde_json::from_value(json).map_err(|e| ApiError::Decode(e.to_string()))
}

impl<T> RemoteCollection for PolicyCollection<T>
where
    T: Serialize + DeserializeOwned + RemoteObject + Clone + Send + Sync + 'static,
{
    type Object = T;

    fn kind(&self) -> &'static str {
        self.kind
    }

    fn get(&self, id: &str) -> BoxFuture<'_, ApiResult<T>> {
        let path = self.object_path(id);
        Box::pin(async move { decode(self.api.get(&path, &[]).await?) })
    }

    fn list(&self) -> BoxFuture<'_, ApiResult<Vec<T>>> {
        Box::pin(async move {
            self.api
                .list(&self.base_path)
                .await?
                .into_iter()
                .map(decode)
                .collect()
        })
    }

    fn patch(&self, id: &str, object: &T) -> BoxFuture<'_, ApiResult<()>> {
        let path = self.object_path(id);
        let body = serde_json::to_value(object).map_err(|e| ApiError::Decode(e.to_string()));
        Box::pin(async move { self.api.patch(&path, body?).await })
    }

    fn delete(&self, id: &str) -> BoxFuture<'_, ApiResult<()>> {
        let path = self.object_path(id);
        Box::pin(async move { self.api.delete(&path).await })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MemoryPolicyApi;
    use nsxt_core::resolver::{Lookup, resolve};
    use serde_json::json;

    fn project() -> ProjectScope {
        ProjectScope::new("default", "p1")
    }

    #[test]
    fn scopes_build_policy_paths() {
        let api: Arc<dyn PolicyApi> = Arc::new(MemoryPolicyApi::default());

        let vpcs = PolicyCollection::vpcs(api.clone(), &project());
        assert_eq!(vpcs.object_path("v1"), "/orgs/default/projects/p1/vpcs/v1");

        let blocks = PolicyCollection::ip_blocks(api.clone(), &IpBlockScope::Infra);
        assert_eq!(blocks.object_path("b1"), "/infra/ip-blocks/b1");

        let blocks = PolicyCollection::ip_blocks(api.clone(), &IpBlockScope::Project(project()));
        assert_eq!(
            blocks.object_path("b1"),
            "/orgs/default/projects/p1/infra/ip-blocks/b1"
        );

        let scope = EnforcementPointScope {
            site_id: "default".to_string(),
            enforcement_point_id: "default".to_string(),
        };
        let nodes = PolicyCollection::host_transport_nodes(api, &scope);
        assert_eq!(
            nodes.object_path("h1"),
            "/infra/sites/default/enforcement-points/default/host-transport-nodes/h1"
        );

        let nat = NatRuleScope {
            project: project(),
            vpc_id: "v1".to_string(),
            nat_id: "USER".to_string(),
            rule_id: "r1".to_string(),
        };
        assert_eq!(
            nat.statistics_path(),
            "/orgs/default/projects/p1/vpcs/v1/nat/USER/nat-rules/r1/statistics"
        );
    }

    #[tokio::test]
    async fn same_name_in_another_project_is_not_visible() {
        let memory = MemoryPolicyApi::default();
        memory.insert(
            "/orgs/default/projects/p1/vpcs/v1",
            json!({"id": "v1", "display_name": "web"}),
        );
        memory.insert(
            "/orgs/default/projects/p2/vpcs/v2",
            json!({"id": "v2", "display_name": "web"}),
        );
        let api: Arc<dyn PolicyApi> = Arc::new(memory);

        let vpcs = PolicyCollection::vpcs(api, &project());
        let found = resolve(&vpcs, &Lookup::by_name("web")).await.unwrap();
        assert_eq!(found.meta.id.as_deref(), Some("v1"));
    }

    #[tokio::test]
    async fn undecodable_object_is_a_decode_error() {
        let memory = MemoryPolicyApi::default();
        memory.insert("/infra/ip-blocks/b1", json!({"id": 42}));
        let blocks = PolicyCollection::ip_blocks(Arc::new(memory), &IpBlockScope::Infra);

        let err = blocks.get("b1").await.unwrap_err();
        assert!(matches!(err, ApiError::Decode(_)));
    }
}
