//! Wire models for the Policy API
//!
//! Field names follow the JSON bodies of the Policy API. Absent optional
//! fields are omitted on writes, which together with PATCH gives
//! full-replace semantics for everything the provider manages.

use nsxt_core::remote::RemoteObject;
use serde::{Deserialize, Serialize};

/// Fields shared by every policy object
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PolicyMetadata {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent_path: Option<String>,
    #[serde(rename = "_revision", skip_serializing_if = "Option::is_none")]
    pub revision: Option<i64>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<Tag>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Tag {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scope: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tag: Option<String>,
}

macro_rules! impl_remote_object {
    ($($model:ty),* $(,)?) => {
        $(
            impl RemoteObject for $model {
                fn id(&self) -> Option<&str> {
                    self.meta.id.as_deref()
                }

                fn display_name(&self) -> Option<&str> {
                    self.meta.display_name.as_deref()
                }
            }
        )*
    };
}

impl_remote_object!(Vpc, IpBlock, HostTransportNode, Site);

// =============================================================================
// VPC
// =============================================================================

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Vpc {
    #[serde(flatten)]
    pub meta: PolicyMetadata,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub short_id: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub site_infos: Vec<SiteInfo>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subnet_profiles: Option<SubnetProfiles>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub load_balancer_vpc_endpoint: Option<LoadBalancerVpcEndpoint>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default_gateway_path: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub service_gateway: Option<ServiceGateway>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ip_address_type: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub private_ipv4_blocks: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub external_ipv4_blocks: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub ipv6_profile_paths: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dhcp_config: Option<DhcpConfig>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SiteInfo {
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub edge_cluster_paths: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub site_path: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SubnetProfiles {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ip_discovery: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mac_discovery: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub qos: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub segment_security: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub spoof_guard: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoadBalancerVpcEndpoint {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enabled: Option<bool>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceGateway {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub auto_snat: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub disable: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub qos_config: Option<GatewayQosProfileConfig>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GatewayQosProfileConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ingress_qos_profile_path: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub egress_qos_profile_path: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DhcpConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dhcp_relay_config_path: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enable_dhcp: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dns_client_config: Option<DnsClientConfig>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DnsClientConfig {
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub dns_server_ips: Vec<String>,
}

// =============================================================================
// IP Block
// =============================================================================

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IpBlock {
    #[serde(flatten)]
    pub meta: PolicyMetadata,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cidr: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub visibility: Option<String>,
}

// =============================================================================
// Sites and Host Transport Nodes
// =============================================================================

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Site {
    #[serde(flatten)]
    pub meta: PolicyMetadata,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HostTransportNode {
    #[serde(flatten)]
    pub meta: PolicyMetadata,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub host_switch_spec: Option<HostSwitchSpec>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub node_deployment_info: Option<FabricHostNode>,
    #[serde(rename = "discovered_node_id_for_create", skip_serializing_if = "Option::is_none")]
    pub discovered_node_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "resource_type")]
pub enum HostSwitchSpec {
    #[serde(rename = "StandardHostSwitchSpec")]
    Standard {
        #[serde(default)]
        host_switches: Vec<StandardHostSwitch>,
    },
    #[serde(rename = "PreconfiguredHostSwitchSpec")]
    Preconfigured {
        #[serde(default)]
        host_switches: Vec<PreconfiguredHostSwitch>,
    },
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StandardHostSwitch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub host_switch_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub host_switch_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub host_switch_mode: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub host_switch_type: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub host_switch_profile_ids: Vec<HostSwitchProfileTypeIdEntry>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ip_assignment_spec: Option<IpAssignmentSpec>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub transport_zone_endpoints: Vec<TransportZoneEndPoint>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub uplinks: Vec<VdsUplink>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub pnics: Vec<Pnic>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_migrate_pnics: Option<bool>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HostSwitchProfileTypeIdEntry {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "resource_type")]
pub enum IpAssignmentSpec {
    AssignedByDhcp,
    #[serde(rename = "StaticIpPoolSpec")]
    StaticIpPool { ip_pool_id: String },
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TransportZoneEndPoint {
    pub transport_zone_id: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub transport_zone_profile_ids: Vec<TransportZoneProfileTypeIdEntry>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TransportZoneProfileTypeIdEntry {
    pub profile_id: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VdsUplink {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub uplink_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vds_uplink_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vds_lag_name: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Pnic {
    pub device_name: String,
    pub uplink_name: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PreconfiguredHostSwitch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub host_switch_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub transport_zone_endpoints: Vec<TransportZoneEndPoint>,
}

/// Deployment details of the host behind a transport node
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FabricHostNode {
    pub resource_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fqdn: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub ip_addresses: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub os_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub os_version: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub windows_install_location: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub host_credential: Option<HostNodeLoginCredential>,
}

impl Default for FabricHostNode {
    fn default() -> Self {
        Self {
            resource_type: "HostNode".to_string(),
            fqdn: None,
            ip_addresses: Vec::new(),
            os_type: None,
            os_version: None,
            windows_install_location: None,
            host_credential: None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HostNodeLoginCredential {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub thumbprint: Option<String>,
}

// =============================================================================
// NAT Rule Statistics
// =============================================================================

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NatRuleStatisticsListResult {
    pub results: Vec<NatRuleStatisticsPerEnforcementPoint>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NatRuleStatisticsPerEnforcementPoint {
    pub enforcement_point_path: Option<String>,
    pub results: Vec<NatRuleStatistics>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NatRuleStatistics {
    pub active_sessions: Option<i64>,
    pub total_bytes: Option<i64>,
    pub total_packets: Option<i64>,
    pub total_sessions: Option<i64>,
    pub hit_count: Option<i64>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn metadata_is_flattened_and_revision_renamed() {
        let block = IpBlock {
            meta: PolicyMetadata {
                id: Some("b1".to_string()),
                display_name: Some("private".to_string()),
                revision: Some(3),
                ..Default::default()
            },
            cidr: Some("10.0.0.0/16".to_string()),
            visibility: None,
        };

        assert_eq!(
            serde_json::to_value(&block).unwrap(),
            json!({
                "id": "b1",
                "display_name": "private",
                "_revision": 3,
                "cidr": "10.0.0.0/16",
            })
        );
    }

    #[test]
    fn unknown_fields_are_ignored_on_read() {
        let vpc: Vpc = serde_json::from_value(json!({
            "id": "v1",
            "display_name": "web",
            "resource_type": "Vpc",
            "_create_user": "admin",
            "ip_address_type": "IPV4",
            "vpc_connectivity_profile": "/orgs/default/projects/p1/vpc-connectivity-profiles/default",
        }))
        .unwrap();

        assert_eq!(vpc.id(), Some("v1"));
        assert_eq!(vpc.ip_address_type.as_deref(), Some("IPV4"));
    }

    #[test]
    fn host_switch_spec_is_tagged_by_resource_type() {
        let spec = HostSwitchSpec::Standard {
            host_switches: vec![StandardHostSwitch {
                host_switch_id: Some("50 0b 31 a4".to_string()),
                ip_assignment_spec: Some(IpAssignmentSpec::StaticIpPool {
                    ip_pool_id: "/infra/ip-pools/tep".to_string(),
                }),
                ..Default::default()
            }],
        };

        let value = serde_json::to_value(&spec).unwrap();
        assert_eq!(value["resource_type"], "StandardHostSwitchSpec");
        assert_eq!(
            value["host_switches"][0]["ip_assignment_spec"],
            json!({"resource_type": "StaticIpPoolSpec", "ip_pool_id": "/infra/ip-pools/tep"})
        );

        let dhcp = serde_json::to_value(IpAssignmentSpec::AssignedByDhcp).unwrap();
        assert_eq!(dhcp, json!({"resource_type": "AssignedByDhcp"}));
    }

    #[test]
    fn fabric_host_node_defaults_resource_type() {
        let node: FabricHostNode = serde_json::from_value(json!({"fqdn": "esx-1"})).unwrap();
        assert_eq!(node.resource_type, "HostNode");
    }
}
