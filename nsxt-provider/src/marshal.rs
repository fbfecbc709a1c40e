//! Conversion between attribute maps and Policy API models
//!
//! Writes build the complete object from the desired attributes only.
//! Reads turn the authoritative remote object back into attributes,
//! together with the scope attributes the object was addressed by.

use std::collections::HashMap;

use nsxt_core::resource::{Attributes, Value};

use crate::collections::{EnforcementPointScope, IpBlockScope, ProjectScope};
use crate::model::*;
use crate::utils::{enforcement_point_of, site_path_of};

type AttributeMap = HashMap<String, Value>;

fn string(attrs: &AttributeMap, key: &str) -> Option<String> {
    attrs.get_string(key).map(str::to_string)
}

fn put_string(map: &mut AttributeMap, key: &str, value: Option<&String>) {
    if let Some(value) = value {
        map.insert(key.to_string(), Value::String(value.clone()));
    }
}

fn put_bool(map: &mut AttributeMap, key: &str, value: Option<bool>) {
    if let Some(value) = value {
        map.insert(key.to_string(), Value::Bool(value));
    }
}

fn put_int(map: &mut AttributeMap, key: &str, value: Option<i64>) {
    if let Some(value) = value {
        map.insert(key.to_string(), Value::Int(value));
    }
}

fn put_strings(map: &mut AttributeMap, key: &str, values: &[String]) {
    if !values.is_empty() {
        map.insert(
            key.to_string(),
            Value::List(values.iter().cloned().map(Value::String).collect()),
        );
    }
}

fn put_blocks(map: &mut AttributeMap, key: &str, blocks: Vec<AttributeMap>) {
    if !blocks.is_empty() {
        map.insert(
            key.to_string(),
            Value::List(blocks.into_iter().map(Value::Map).collect()),
        );
    }
}

fn put_block(map: &mut AttributeMap, key: &str, block: Option<AttributeMap>) {
    put_blocks(map, key, block.into_iter().collect());
}

// =============================================================================
// Metadata
// =============================================================================

fn metadata(attrs: &AttributeMap) -> PolicyMetadata {
    PolicyMetadata {
        display_name: string(attrs, "display_name"),
        description: string(attrs, "description"),
        tags: attrs
            .get_blocks("tag")
            .into_iter()
            .map(|t| Tag {
                scope: string(t, "scope"),
                tag: string(t, "tag"),
            })
            .collect(),
        ..Default::default()
    }
}

fn put_metadata(map: &mut AttributeMap, meta: &PolicyMetadata) {
    put_string(map, "nsx_id", meta.id.as_ref());
    put_string(map, "path", meta.path.as_ref());
    put_string(map, "display_name", meta.display_name.as_ref());
    put_string(map, "description", meta.description.as_ref());
    put_int(map, "revision", meta.revision);

    let tags = meta
        .tags
        .iter()
        .map(|t| {
            let mut tag = AttributeMap::new();
            put_string(&mut tag, "scope", t.scope.as_ref());
            put_string(&mut tag, "tag", t.tag.as_ref());
            tag
        })
        .collect();
    put_blocks(map, "tag", tags);
}

fn put_project(map: &mut AttributeMap, project: &ProjectScope) {
    map.insert(
        "project_id".to_string(),
        Value::string(project.project_id.as_str()),
    );
}

// =============================================================================
// VPC
// =============================================================================

pub fn vpc_from_attributes(attrs: &AttributeMap) -> Vpc {
    Vpc {
        meta: metadata(attrs),
        short_id: string(attrs, "short_id"),
        site_infos: attrs
            .get_blocks("site_info")
            .into_iter()
            .map(|b| SiteInfo {
                edge_cluster_paths: b.get_string_list("edge_cluster_paths"),
                site_path: string(b, "site_path"),
            })
            .collect(),
        subnet_profiles: attrs.get_block("subnet_profile").map(|b| SubnetProfiles {
            ip_discovery: string(b, "ip_discovery"),
            mac_discovery: string(b, "mac_discovery"),
            qos: string(b, "qos"),
            segment_security: string(b, "segment_security"),
            spoof_guard: string(b, "spoof_guard"),
        }),
        load_balancer_vpc_endpoint: attrs
            .get_block("load_balancer_vpc_endpoint")
            .map(|b| LoadBalancerVpcEndpoint {
                enabled: b.get_bool("enabled"),
            }),
        default_gateway_path: string(attrs, "default_gateway_path"),
        service_gateway: attrs.get_block("service_gateway").map(|b| ServiceGateway {
            auto_snat: b.get_bool("auto_snat"),
            disable: b.get_bool("disable"),
            qos_config: b.get_block("qos_config").map(|q| GatewayQosProfileConfig {
                ingress_qos_profile_path: string(q, "ingress_qos_profile_path"),
                egress_qos_profile_path: string(q, "egress_qos_profile_path"),
            }),
        }),
        ip_address_type: string(attrs, "ip_address_type"),
        private_ipv4_blocks: attrs.get_string_list("private_ipv4_blocks"),
        external_ipv4_blocks: attrs.get_string_list("external_ipv4_blocks"),
        ipv6_profile_paths: attrs.get_string_list("ipv6_profile_paths"),
        dhcp_config: attrs.get_block("dhcp_config").map(|b| DhcpConfig {
            dhcp_relay_config_path: string(b, "dhcp_relay_config_path"),
            enable_dhcp: b.get_bool("enable_dhcp"),
            dns_client_config: b.get_block("dns_client_config").map(|d| DnsClientConfig {
                dns_server_ips: d.get_string_list("dns_server_ips"),
            }),
        }),
    }
}

pub fn vpc_to_attributes(vpc: &Vpc, project: &ProjectScope) -> AttributeMap {
    let mut map = AttributeMap::new();
    put_project(&mut map, project);
    put_metadata(&mut map, &vpc.meta);
    put_string(&mut map, "short_id", vpc.short_id.as_ref());

    let site_infos = vpc
        .site_infos
        .iter()
        .map(|s| {
            let mut info = AttributeMap::new();
            put_strings(&mut info, "edge_cluster_paths", &s.edge_cluster_paths);
            put_string(&mut info, "site_path", s.site_path.as_ref());
            info
        })
        .collect();
    put_blocks(&mut map, "site_info", site_infos);

    let subnet_profile = vpc.subnet_profiles.as_ref().map(|p| {
        let mut profile = AttributeMap::new();
        put_string(&mut profile, "ip_discovery", p.ip_discovery.as_ref());
        put_string(&mut profile, "mac_discovery", p.mac_discovery.as_ref());
        put_string(&mut profile, "qos", p.qos.as_ref());
        put_string(&mut profile, "segment_security", p.segment_security.as_ref());
        put_string(&mut profile, "spoof_guard", p.spoof_guard.as_ref());
        profile
    });
    put_block(&mut map, "subnet_profile", subnet_profile);

    let endpoint = vpc.load_balancer_vpc_endpoint.as_ref().map(|e| {
        let mut endpoint = AttributeMap::new();
        put_bool(&mut endpoint, "enabled", e.enabled);
        endpoint
    });
    put_block(&mut map, "load_balancer_vpc_endpoint", endpoint);

    put_string(
        &mut map,
        "default_gateway_path",
        vpc.default_gateway_path.as_ref(),
    );

    let service_gateway = vpc.service_gateway.as_ref().map(|g| {
        let mut gateway = AttributeMap::new();
        put_bool(&mut gateway, "auto_snat", g.auto_snat);
        put_bool(&mut gateway, "disable", g.disable);
        let qos = g.qos_config.as_ref().map(|q| {
            let mut qos = AttributeMap::new();
            put_string(
                &mut qos,
                "ingress_qos_profile_path",
                q.ingress_qos_profile_path.as_ref(),
            );
            put_string(
                &mut qos,
                "egress_qos_profile_path",
                q.egress_qos_profile_path.as_ref(),
            );
            qos
        });
        put_block(&mut gateway, "qos_config", qos);
        gateway
    });
    put_block(&mut map, "service_gateway", service_gateway);

    put_string(&mut map, "ip_address_type", vpc.ip_address_type.as_ref());
    put_strings(&mut map, "private_ipv4_blocks", &vpc.private_ipv4_blocks);
    put_strings(&mut map, "external_ipv4_blocks", &vpc.external_ipv4_blocks);
    put_strings(&mut map, "ipv6_profile_paths", &vpc.ipv6_profile_paths);

    let dhcp = vpc.dhcp_config.as_ref().map(|d| {
        let mut dhcp = AttributeMap::new();
        put_string(
            &mut dhcp,
            "dhcp_relay_config_path",
            d.dhcp_relay_config_path.as_ref(),
        );
        put_bool(&mut dhcp, "enable_dhcp", d.enable_dhcp);
        let dns = d.dns_client_config.as_ref().map(|c| {
            let mut dns = AttributeMap::new();
            put_strings(&mut dns, "dns_server_ips", &c.dns_server_ips);
            dns
        });
        put_block(&mut dhcp, "dns_client_config", dns);
        dhcp
    });
    put_block(&mut map, "dhcp_config", dhcp);

    map
}

// =============================================================================
// IP Block
// =============================================================================

pub fn ip_block_from_attributes(attrs: &AttributeMap) -> IpBlock {
    IpBlock {
        meta: metadata(attrs),
        cidr: string(attrs, "cidr"),
        visibility: string(attrs, "visibility"),
    }
}

pub fn ip_block_to_attributes(block: &IpBlock, scope: &IpBlockScope) -> AttributeMap {
    let mut map = AttributeMap::new();
    if let IpBlockScope::Project(project) = scope {
        let mut context = AttributeMap::new();
        put_project(&mut context, project);
        put_block(&mut map, "context", Some(context));
    }
    put_metadata(&mut map, &block.meta);
    put_string(&mut map, "cidr", block.cidr.as_ref());
    put_string(&mut map, "visibility", block.visibility.as_ref());
    map
}

// =============================================================================
// Host Transport Node
// =============================================================================

/// Build a host transport node; `revision` is the one last read
pub fn host_transport_node_from_attributes(
    attrs: &AttributeMap,
    revision: Option<i64>,
) -> HostTransportNode {
    let mut meta = metadata(attrs);
    meta.revision = revision;

    HostTransportNode {
        meta,
        host_switch_spec: host_switch_spec(attrs),
        node_deployment_info: attrs.get_block("node_deployment_info").map(fabric_host_node),
        discovered_node_id: string(attrs, "discovered_node_id"),
    }
}

fn fabric_host_node(info: &AttributeMap) -> FabricHostNode {
    FabricHostNode {
        ip_addresses: info.get_string_list("ip_addresses"),
        os_type: string(info, "os_type"),
        os_version: string(info, "os_version"),
        windows_install_location: string(info, "windows_install_location"),
        host_credential: info
            .get_block("host_credential")
            .map(|c| HostNodeLoginCredential {
                username: string(c, "username"),
                password: string(c, "password"),
                thumbprint: string(c, "thumbprint"),
            }),
        ..Default::default()
    }
}

fn host_switch_spec(attrs: &AttributeMap) -> Option<HostSwitchSpec> {
    let standard = attrs.get_blocks("standard_host_switch");
    if !standard.is_empty() {
        return Some(HostSwitchSpec::Standard {
            host_switches: standard.into_iter().map(standard_host_switch).collect(),
        });
    }

    let preconfigured = attrs.get_blocks("preconfigured_host_switch");
    if !preconfigured.is_empty() {
        return Some(HostSwitchSpec::Preconfigured {
            host_switches: preconfigured
                .into_iter()
                .map(|s| PreconfiguredHostSwitch {
                    host_switch_id: string(s, "host_switch_id"),
                    endpoint: string(s, "endpoint"),
                    transport_zone_endpoints: transport_zone_endpoints(s),
                })
                .collect(),
        });
    }

    None
}

fn standard_host_switch(switch: &AttributeMap) -> StandardHostSwitch {
    StandardHostSwitch {
        host_switch_id: string(switch, "host_switch_id"),
        host_switch_name: string(switch, "host_switch_name"),
        host_switch_mode: string(switch, "host_switch_mode"),
        host_switch_type: string(switch, "host_switch_type"),
        host_switch_profile_ids: switch
            .get_string_list("host_switch_profile")
            .into_iter()
            .map(|value| HostSwitchProfileTypeIdEntry { key: None, value })
            .collect(),
        ip_assignment_spec: switch.get_block("ip_assignment").and_then(ip_assignment_spec),
        transport_zone_endpoints: transport_zone_endpoints(switch),
        uplinks: switch
            .get_blocks("uplink")
            .into_iter()
            .map(|u| VdsUplink {
                uplink_name: string(u, "uplink_name"),
                vds_uplink_name: string(u, "vds_uplink_name"),
                vds_lag_name: string(u, "vds_lag_name"),
            })
            .collect(),
        pnics: switch
            .get_blocks("pnic")
            .into_iter()
            .map(|p| Pnic {
                device_name: string(p, "device_name").unwrap_or_default(),
                uplink_name: string(p, "uplink_name").unwrap_or_default(),
            })
            .collect(),
        is_migrate_pnics: switch.get_bool("is_migrate_pnics"),
    }
}

fn ip_assignment_spec(assignment: &AttributeMap) -> Option<IpAssignmentSpec> {
    if let Some(pool) = string(assignment, "static_ip_pool") {
        return Some(IpAssignmentSpec::StaticIpPool { ip_pool_id: pool });
    }
    assignment
        .get_bool("assigned_by_dhcp")
        .filter(|dhcp| *dhcp)
        .map(|_| IpAssignmentSpec::AssignedByDhcp)
}

fn transport_zone_endpoints(switch: &AttributeMap) -> Vec<TransportZoneEndPoint> {
    switch
        .get_blocks("transport_zone_endpoint")
        .into_iter()
        .map(|e| TransportZoneEndPoint {
            transport_zone_id: string(e, "transport_zone").unwrap_or_default(),
            transport_zone_profile_ids: e
                .get_string_list("transport_zone_profiles")
                .into_iter()
                .map(|profile_id| TransportZoneProfileTypeIdEntry { profile_id })
                .collect(),
        })
        .collect()
}

/// Attributes of a host transport node. The site and enforcement point come
/// from the object's parent path and fall back to `scope`.
pub fn host_transport_node_to_attributes(
    node: &HostTransportNode,
    scope: &EnforcementPointScope,
) -> AttributeMap {
    let mut map = AttributeMap::new();
    let parent = node.meta.parent_path.as_deref().unwrap_or_default();

    let site_path = site_path_of(parent)
        .map(str::to_string)
        .unwrap_or_else(|| scope.site_path());
    let enforcement_point =
        enforcement_point_of(parent).unwrap_or(scope.enforcement_point_id.as_str());
    map.insert("site_path".to_string(), Value::String(site_path));
    map.insert(
        "enforcement_point".to_string(),
        Value::string(enforcement_point),
    );

    put_metadata(&mut map, &node.meta);
    put_string(&mut map, "discovered_node_id", node.discovered_node_id.as_ref());

    let info = node.node_deployment_info.as_ref().map(|n| {
        let mut info = AttributeMap::new();
        put_string(&mut info, "fqdn", n.fqdn.as_ref());
        put_strings(&mut info, "ip_addresses", &n.ip_addresses);
        put_string(&mut info, "os_type", n.os_type.as_ref());
        put_string(&mut info, "os_version", n.os_version.as_ref());
        put_string(
            &mut info,
            "windows_install_location",
            n.windows_install_location.as_ref(),
        );
        // the password is never read back
        let credential = n.host_credential.as_ref().map(|c| {
            let mut credential = AttributeMap::new();
            put_string(&mut credential, "username", c.username.as_ref());
            put_string(&mut credential, "thumbprint", c.thumbprint.as_ref());
            credential
        });
        put_block(&mut info, "host_credential", credential);
        info
    });
    put_block(&mut map, "node_deployment_info", info);

    match &node.host_switch_spec {
        Some(HostSwitchSpec::Standard { host_switches }) => {
            let switches = host_switches.iter().map(standard_host_switch_attributes).collect();
            put_blocks(&mut map, "standard_host_switch", switches);
        }
        Some(HostSwitchSpec::Preconfigured { host_switches }) => {
            let switches = host_switches
                .iter()
                .map(|s| {
                    let mut switch = AttributeMap::new();
                    put_string(&mut switch, "host_switch_id", s.host_switch_id.as_ref());
                    put_string(&mut switch, "endpoint", s.endpoint.as_ref());
                    put_transport_zone_endpoints(&mut switch, &s.transport_zone_endpoints);
                    switch
                })
                .collect();
            put_blocks(&mut map, "preconfigured_host_switch", switches);
        }
        None => {}
    }

    map
}

fn standard_host_switch_attributes(s: &StandardHostSwitch) -> AttributeMap {
    let mut switch = AttributeMap::new();
    put_string(&mut switch, "host_switch_id", s.host_switch_id.as_ref());
    put_string(&mut switch, "host_switch_name", s.host_switch_name.as_ref());
    put_string(&mut switch, "host_switch_mode", s.host_switch_mode.as_ref());
    put_string(&mut switch, "host_switch_type", s.host_switch_type.as_ref());

    let profiles: Vec<String> = s
        .host_switch_profile_ids
        .iter()
        .map(|p| p.value.clone())
        .collect();
    put_strings(&mut switch, "host_switch_profile", &profiles);

    let assignment = s.ip_assignment_spec.as_ref().map(|spec| {
        let mut assignment = AttributeMap::new();
        match spec {
            IpAssignmentSpec::AssignedByDhcp => {
                put_bool(&mut assignment, "assigned_by_dhcp", Some(true));
            }
            IpAssignmentSpec::StaticIpPool { ip_pool_id } => {
                put_string(&mut assignment, "static_ip_pool", Some(ip_pool_id));
            }
        }
        assignment
    });
    put_block(&mut switch, "ip_assignment", assignment);

    put_transport_zone_endpoints(&mut switch, &s.transport_zone_endpoints);

    let uplinks = s
        .uplinks
        .iter()
        .map(|u| {
            let mut uplink = AttributeMap::new();
            put_string(&mut uplink, "uplink_name", u.uplink_name.as_ref());
            put_string(&mut uplink, "vds_uplink_name", u.vds_uplink_name.as_ref());
            put_string(&mut uplink, "vds_lag_name", u.vds_lag_name.as_ref());
            uplink
        })
        .collect();
    put_blocks(&mut switch, "uplink", uplinks);

    let pnics = s
        .pnics
        .iter()
        .map(|p| {
            let mut pnic = AttributeMap::new();
            put_string(&mut pnic, "device_name", Some(&p.device_name));
            put_string(&mut pnic, "uplink_name", Some(&p.uplink_name));
            pnic
        })
        .collect();
    put_blocks(&mut switch, "pnic", pnics);

    put_bool(&mut switch, "is_migrate_pnics", s.is_migrate_pnics);
    switch
}

fn put_transport_zone_endpoints(map: &mut AttributeMap, endpoints: &[TransportZoneEndPoint]) {
    let endpoints = endpoints
        .iter()
        .map(|e| {
            let mut endpoint = AttributeMap::new();
            put_string(&mut endpoint, "transport_zone", Some(&e.transport_zone_id));
            let profiles: Vec<String> = e
                .transport_zone_profile_ids
                .iter()
                .map(|p| p.profile_id.clone())
                .collect();
            put_strings(&mut endpoint, "transport_zone_profiles", &profiles);
            endpoint
        })
        .collect();
    put_blocks(map, "transport_zone_endpoint", endpoints);
}

// =============================================================================
// NAT Rule Statistics
// =============================================================================

/// Flatten per-enforcement-point results into `statistics` blocks
pub fn nat_rule_statistics_to_value(result: &NatRuleStatisticsListResult) -> Value {
    let blocks = result
        .results
        .iter()
        .flat_map(|per_ep| {
            per_ep.results.iter().map(move |stats| {
                let mut block = AttributeMap::new();
                put_string(
                    &mut block,
                    "enforcement_point_path",
                    per_ep.enforcement_point_path.as_ref(),
                );
                put_int(&mut block, "active_sessions", stats.active_sessions);
                put_int(&mut block, "total_bytes", stats.total_bytes);
                put_int(&mut block, "total_packets", stats.total_packets);
                put_int(&mut block, "total_sessions", stats.total_sessions);
                put_int(&mut block, "hit_count", stats.hit_count);
                Value::Map(block)
            })
        })
        .collect();
    Value::List(blocks)
}
