//! NAT rule statistics data source schema

use nsxt_core::schema::{AttributeSchema, AttributeType, ResourceSchema, types};

use super::common::{block, project_id};

fn statistics() -> ResourceSchema {
    let counter = |name: &str| AttributeSchema::new(name, AttributeType::Int).read_only();
    ResourceSchema::new("statistics")
        .attribute(
            AttributeSchema::new("enforcement_point_path", AttributeType::String)
                .read_only()
                .with_description("Enforcement point the counters were collected on"),
        )
        .attribute(counter("active_sessions").with_description("Active network sessions"))
        .attribute(counter("total_bytes").with_description("Bytes processed by the rule"))
        .attribute(counter("total_packets").with_description("Packets processed by the rule"))
        .attribute(counter("total_sessions").with_description("Sessions handled by the rule"))
        .attribute(counter("hit_count").with_description("Times the rule was hit"))
}

/// Returns the schema for the `nat_rule_statistics` data source
pub fn data_source_schema() -> ResourceSchema {
    let required = |name: &str, description: &str| {
        AttributeSchema::new(name, AttributeType::String)
            .required()
            .with_description(description)
    };

    ResourceSchema::new("nat_rule_statistics")
        .with_description("Statistics of a NAT rule of a VPC")
        .attribute(project_id())
        .attribute(required("vpc_id", "VPC the NAT section belongs to"))
        .attribute(required("nat_id", "NAT section (USER or NAT64)"))
        .attribute(required("rule_id", "NAT rule ID"))
        .attribute(
            AttributeSchema::new("action", AttributeType::String)
                .with_description("Action on statistics"),
        )
        .attribute(
            AttributeSchema::new("container_cluster_path", types::policy_path())
                .with_description("Path of the container cluster entity"),
        )
        .attribute(
            AttributeSchema::new("enforcement_point_path", types::policy_path())
                .with_description("Path of the enforcement point"),
        )
        .attribute(
            AttributeSchema::new("statistics", block(statistics()))
                .read_only()
                .with_description("Statistics per enforcement point"),
        )
}
