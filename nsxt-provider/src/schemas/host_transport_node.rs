//! Host transport node schema definitions

use nsxt_core::resource::Value;
use nsxt_core::schema::{AttributeSchema, AttributeType, ResourceSchema, types};

use super::common::{
    block, path_list, read_back_only, string_list, with_common_attributes,
    with_data_source_attributes,
};

/// Site used when a host transport node does not name one
pub const DEFAULT_SITE_PATH: &str = "/infra/sites/default";

fn host_credential() -> ResourceSchema {
    ResourceSchema::new("host_credential")
        .attribute(
            AttributeSchema::new("username", AttributeType::String)
                .required()
                .with_description("The username of the account on the host"),
        )
        .attribute(
            AttributeSchema::new("password", AttributeType::String)
                .required()
                .write_only()
                .with_description("The authentication password of the host"),
        )
        .attribute(
            AttributeSchema::new("thumbprint", AttributeType::String)
                .with_description("ESXi thumbprint or SSH key fingerprint of the host"),
        )
}

fn node_deployment_info() -> ResourceSchema {
    ResourceSchema::new("node_deployment_info")
        .attribute(
            AttributeSchema::new("fqdn", AttributeType::String)
                .read_only()
                .with_description("Fully qualified domain name of the fabric node"),
        )
        .attribute(
            AttributeSchema::new(
                "ip_addresses",
                AttributeType::List(Box::new(types::ip_address())),
            )
            .computed()
            .with_description("IP Addresses of the Node, version 4 or 6"),
        )
        .attribute(
            AttributeSchema::new("os_type", AttributeType::String)
                .required()
                .with_description("Operating system type of the host (e.g. ESXI)"),
        )
        .attribute(
            AttributeSchema::new("os_version", AttributeType::String)
                .with_description("Operating system version"),
        )
        .attribute(
            AttributeSchema::new("windows_install_location", AttributeType::String)
                .with_description("Install location of Windows Server on baremetal"),
        )
        .attribute(
            AttributeSchema::new("host_credential", block(host_credential()))
                .max_items(1)
                .with_description("Host login credentials"),
        )
}

fn ip_assignment() -> ResourceSchema {
    ResourceSchema::new("ip_assignment")
        .attribute(
            AttributeSchema::new("assigned_by_dhcp", AttributeType::Bool)
                .conflicts_with("static_ip_pool")
                .with_description("Enables DHCP assignment"),
        )
        .attribute(
            AttributeSchema::new("static_ip_pool", types::policy_path())
                .with_description("Policy path of a static IP pool"),
        )
}

fn transport_zone_endpoint() -> ResourceSchema {
    ResourceSchema::new("transport_zone_endpoint")
        .attribute(
            AttributeSchema::new("transport_zone", types::policy_path())
                .required()
                .with_description("Transport zone policy path"),
        )
        .attribute(
            AttributeSchema::new("transport_zone_profiles", path_list())
                .with_description("Transport zone profile paths"),
        )
}

fn uplink() -> ResourceSchema {
    ResourceSchema::new("uplink")
        .attribute(
            AttributeSchema::new("uplink_name", AttributeType::String)
                .required()
                .with_description("Uplink name from the uplink profile"),
        )
        .attribute(
            AttributeSchema::new("vds_uplink_name", AttributeType::String)
                .conflicts_with("vds_lag_name")
                .with_description("Uplink name of the VDS"),
        )
        .attribute(
            AttributeSchema::new("vds_lag_name", AttributeType::String)
                .with_description("Link aggregation group name of the VDS"),
        )
}

fn pnic() -> ResourceSchema {
    ResourceSchema::new("pnic")
        .attribute(
            AttributeSchema::new("device_name", AttributeType::String)
                .required()
                .with_description("Device name or key"),
        )
        .attribute(
            AttributeSchema::new("uplink_name", AttributeType::String)
                .required()
                .with_description("Uplink name for this pnic"),
        )
}

fn standard_host_switch() -> ResourceSchema {
    ResourceSchema::new("standard_host_switch")
        .attribute(
            AttributeSchema::new("host_switch_id", AttributeType::String)
                .computed()
                .with_description("The host switch id (VDS UUID for a VDS host switch)"),
        )
        .attribute(
            AttributeSchema::new("host_switch_name", AttributeType::String)
                .computed()
                .with_description("Host switch name"),
        )
        .attribute(
            AttributeSchema::new(
                "host_switch_mode",
                AttributeType::Enum(
                    ["STANDARD", "ENS", "ENS_INTERRUPT", "LEGACY"]
                        .map(String::from)
                        .to_vec(),
                ),
            )
            .computed()
            .with_description("Operational mode of a host switch"),
        )
        .attribute(
            AttributeSchema::new(
                "host_switch_type",
                AttributeType::Enum(["NVDS", "VDS"].map(String::from).to_vec()),
            )
            .with_default(Value::string("NVDS"))
            .with_description("Type of the host switch"),
        )
        .attribute(
            AttributeSchema::new("host_switch_profile", path_list())
                .with_description("Policy paths of host switch profiles"),
        )
        .attribute(
            AttributeSchema::new("ip_assignment", block(ip_assignment()))
                .max_items(1)
                .with_description("Specification for IPs to be used with host switch virtual tunnel endpoints"),
        )
        .attribute(
            AttributeSchema::new(
                "transport_zone_endpoint",
                block(transport_zone_endpoint()),
            )
            .with_description("Transport zone endpoints"),
        )
        .attribute(
            AttributeSchema::new("uplink", block(uplink()))
                .with_description("Uplink/LAG of VMware vSphere Distributed Switch connected to the host switch"),
        )
        .attribute(
            AttributeSchema::new("pnic", block(pnic()))
                .with_description("Physical NICs connected to the host switch"),
        )
        .attribute(
            AttributeSchema::new("is_migrate_pnics", AttributeType::Bool)
                .with_default(Value::Bool(false))
                .with_description("Migrate any pnics which are in use"),
        )
}

fn preconfigured_host_switch() -> ResourceSchema {
    ResourceSchema::new("preconfigured_host_switch")
        .attribute(
            AttributeSchema::new("host_switch_id", AttributeType::String)
                .required()
                .with_description("External Host Switch id"),
        )
        .attribute(
            AttributeSchema::new("endpoint", AttributeType::String)
                .with_description("Name of the virtual tunnel endpoint"),
        )
        .attribute(
            AttributeSchema::new(
                "transport_zone_endpoint",
                block(transport_zone_endpoint()),
            )
            .with_description("Transport zone endpoints"),
        )
}

fn host_transport_node_attributes(schema: ResourceSchema) -> ResourceSchema {
    schema
        .attribute(
            AttributeSchema::new("site_path", types::policy_path())
                .force_new()
                .with_default(Value::string(DEFAULT_SITE_PATH))
                .with_description("Path to the site this Host Transport Node belongs to"),
        )
        .attribute(
            AttributeSchema::new("enforcement_point", AttributeType::String)
                .computed()
                .force_new()
                .with_description("ID of the enforcement point this Host Transport Node belongs to"),
        )
        .attribute(
            AttributeSchema::new("discovered_node_id", AttributeType::String)
                .conflicts_with("node_deployment_info")
                .with_description("Discovered node id to create Host Transport Node"),
        )
        .attribute(
            AttributeSchema::new("node_deployment_info", block(node_deployment_info()))
                .max_items(1)
                .with_description("Deployment details of the host"),
        )
        .attribute(
            AttributeSchema::new("standard_host_switch", block(standard_host_switch()))
                .conflicts_with("preconfigured_host_switch")
                .with_description("Standard host switch specification"),
        )
        .attribute(
            AttributeSchema::new(
                "preconfigured_host_switch",
                block(preconfigured_host_switch()),
            )
            .with_description("Preconfigured host switch specification"),
        )
}

/// Returns the schema for the `host_transport_node` resource
pub fn resource_schema() -> ResourceSchema {
    let schema = ResourceSchema::new("host_transport_node")
        .with_description("A host transport node of an enforcement point");
    host_transport_node_attributes(with_common_attributes(schema))
}

/// Returns the schema for the `host_transport_node` data source
pub fn data_source_schema() -> ResourceSchema {
    let schema = ResourceSchema::new("host_transport_node")
        .with_description("Look up a host transport node by ID or name")
        .attribute(
            AttributeSchema::new("site_path", types::policy_path())
                .with_default(Value::string(DEFAULT_SITE_PATH))
                .with_description("Path of the site to search"),
        )
        .attribute(
            AttributeSchema::new("enforcement_point", AttributeType::String)
                .computed()
                .with_description("ID of the enforcement point to search"),
        );
    let schema = with_data_source_attributes(schema);

    let mut read_back = read_back_only(host_transport_node_attributes(ResourceSchema::new(
        "host_transport_node",
    )));
    read_back.retain(|attr| attr.name != "site_path" && attr.name != "enforcement_point");
    read_back
        .into_iter()
        .fold(schema, |schema, attr| schema.attribute(attr))
}
