//! VPC schema definitions

use nsxt_core::resource::Value;
use nsxt_core::schema::{AttributeSchema, AttributeType, ResourceSchema, types};

use super::common::{
    block, path_list, project_id, read_back_only, string_list, with_common_attributes,
    with_data_source_attributes,
};

fn site_info() -> ResourceSchema {
    ResourceSchema::new("site_info")
        .attribute(
            AttributeSchema::new("edge_cluster_paths", path_list())
                .with_description("Edge cluster paths"),
        )
        .attribute(
            AttributeSchema::new("site_path", types::policy_path())
                .with_description("Site path"),
        )
}

fn subnet_profile() -> ResourceSchema {
    let profile = |name: &str| AttributeSchema::new(name, types::policy_path());
    ResourceSchema::new("subnet_profile")
        .attribute(profile("ip_discovery").with_description("IP discovery profile path"))
        .attribute(profile("mac_discovery").with_description("MAC discovery profile path"))
        .attribute(profile("qos").with_description("QoS profile path"))
        .attribute(profile("segment_security").with_description("Segment security profile path"))
        .attribute(profile("spoof_guard").with_description("Spoof guard profile path"))
}

fn load_balancer_vpc_endpoint() -> ResourceSchema {
    ResourceSchema::new("load_balancer_vpc_endpoint").attribute(
        AttributeSchema::new("enabled", AttributeType::Bool)
            .with_default(Value::Bool(false))
            .with_description("Enable load balancer endpoint"),
    )
}

fn service_gateway() -> ResourceSchema {
    ResourceSchema::new("service_gateway")
        .attribute(
            AttributeSchema::new("auto_snat", AttributeType::Bool)
                .with_default(Value::Bool(true))
                .with_description("Auto plumb SNAT rule for private subnets"),
        )
        .attribute(
            AttributeSchema::new("disable", AttributeType::Bool)
                .with_default(Value::Bool(false))
                .with_description("Disable the service gateway"),
        )
        .attribute(
            AttributeSchema::new(
                "qos_config",
                block(
                    ResourceSchema::new("qos_config")
                        .attribute(AttributeSchema::new(
                            "ingress_qos_profile_path",
                            types::policy_path(),
                        ))
                        .attribute(AttributeSchema::new(
                            "egress_qos_profile_path",
                            types::policy_path(),
                        )),
                ),
            )
            .max_items(1)
            .with_description("QoS profiles applied on the gateway"),
        )
}

fn dhcp_config() -> ResourceSchema {
    ResourceSchema::new("dhcp_config")
        .attribute(
            AttributeSchema::new("dhcp_relay_config_path", types::policy_path())
                .with_description("Policy path of DHCP relay config"),
        )
        .attribute(
            AttributeSchema::new("enable_dhcp", AttributeType::Bool)
                .with_description("Enable DHCP for subnets of this VPC"),
        )
        .attribute(
            AttributeSchema::new(
                "dns_client_config",
                block(ResourceSchema::new("dns_client_config").attribute(
                    AttributeSchema::new(
                        "dns_server_ips",
                        AttributeType::List(Box::new(types::ip_address())),
                    ),
                )),
            )
            .max_items(1)
            .with_description("DNS servers handed out to workloads"),
        )
}

/// Attributes the resource and the data source both read back
fn vpc_attributes(schema: ResourceSchema) -> ResourceSchema {
    schema
        .attribute(
            AttributeSchema::new("short_id", AttributeType::String)
                .computed()
                .force_new()
                .with_description("Short ID used for the VPC in realized entity names"),
        )
        .attribute(
            AttributeSchema::new("site_info", block(site_info()))
                .with_description("Information related to sites applicable for given VPC"),
        )
        .attribute(
            AttributeSchema::new("subnet_profile", block(subnet_profile()))
                .max_items(1)
                .with_description("Default subnet profiles for the VPC"),
        )
        .attribute(
            AttributeSchema::new(
                "load_balancer_vpc_endpoint",
                block(load_balancer_vpc_endpoint()),
            )
            .max_items(1)
            .with_description("Configuration for the load balancer endpoint"),
        )
        .attribute(
            AttributeSchema::new("default_gateway_path", types::policy_path())
                .computed()
                .with_description("Default gateway of the VPC"),
        )
        .attribute(
            AttributeSchema::new("service_gateway", block(service_gateway()))
                .max_items(1)
                .with_description("Service gateway configuration"),
        )
        .attribute(
            AttributeSchema::new(
                "ip_address_type",
                AttributeType::Enum(vec!["IPV4".to_string()]),
            )
            .with_default(Value::string("IPV4"))
            .with_description("IP address type of the VPC"),
        )
        .attribute(
            AttributeSchema::new("private_ipv4_blocks", path_list())
                .max_items(5)
                .with_description("IP blocks used for private subnets"),
        )
        .attribute(
            AttributeSchema::new("external_ipv4_blocks", path_list())
                .max_items(5)
                .with_description("IP blocks used for public subnets"),
        )
        .attribute(
            AttributeSchema::new("ipv6_profile_paths", string_list())
                .max_items(2)
                .with_description("IPv6 profile paths (NDRA and DAD)"),
        )
        .attribute(
            AttributeSchema::new("dhcp_config", block(dhcp_config()))
                .max_items(1)
                .with_description("DHCP configuration for the VPC"),
        )
}

/// Returns the schema for the `vpc` resource
pub fn resource_schema() -> ResourceSchema {
    let schema = ResourceSchema::new("vpc")
        .with_description("A VPC inside an NSX project")
        .attribute(project_id());
    vpc_attributes(with_common_attributes(schema))
}

/// Returns the schema for the `vpc` data source
pub fn data_source_schema() -> ResourceSchema {
    let schema = ResourceSchema::new("vpc")
        .with_description("Look up a VPC of a project by ID or name")
        .attribute(project_id());
    let schema = with_data_source_attributes(schema);

    // Everything except the selectors is read back
    read_back_only(vpc_attributes(ResourceSchema::new("vpc")))
        .into_iter()
        .fold(schema, |schema, attr| schema.attribute(attr))
}
