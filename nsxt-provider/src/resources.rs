//! Resource type and data source definitions
//!
//! Resources and data sources share type names (e.g. `vpc`); a `Resource`
//! with `read_only` set addresses the data source.

use nsxt_core::provider::ResourceType;
use nsxt_core::schema::ResourceSchema;

use crate::schemas;

pub const VPC: &str = "vpc";
pub const IP_BLOCK: &str = "ip_block";
pub const HOST_TRANSPORT_NODE: &str = "host_transport_node";
pub const NAT_RULE_STATISTICS: &str = "nat_rule_statistics";

// =============================================================================
// Resource Type Definitions
// =============================================================================

macro_rules! define_resource_type {
    ($name:ident, $type_name:expr, $schema:path) => {
        pub struct $name;
        impl ResourceType for $name {
            fn name(&self) -> &'static str {
                $type_name
            }
            fn schema(&self) -> ResourceSchema {
                $schema()
            }
        }
    };
    ($name:ident, $type_name:expr, $schema:path, data_source) => {
        pub struct $name;
        impl ResourceType for $name {
            fn name(&self) -> &'static str {
                $type_name
            }
            fn schema(&self) -> ResourceSchema {
                $schema()
            }
            fn is_data_source(&self) -> bool {
                true
            }
        }
    };
}

define_resource_type!(VpcType, VPC, schemas::vpc::resource_schema);
define_resource_type!(IpBlockType, IP_BLOCK, schemas::ip_block::resource_schema);
define_resource_type!(
    HostTransportNodeType,
    HOST_TRANSPORT_NODE,
    schemas::host_transport_node::resource_schema
);

define_resource_type!(VpcDataSource, VPC, schemas::vpc::data_source_schema, data_source);
define_resource_type!(
    IpBlockDataSource,
    IP_BLOCK,
    schemas::ip_block::data_source_schema,
    data_source
);
define_resource_type!(
    HostTransportNodeDataSource,
    HOST_TRANSPORT_NODE,
    schemas::host_transport_node::data_source_schema,
    data_source
);
define_resource_type!(
    NatRuleStatisticsDataSource,
    NAT_RULE_STATISTICS,
    schemas::nat_rule_statistics::data_source_schema,
    data_source
);

/// Returns all resource types and data sources supported by this provider
pub fn resource_types() -> Vec<Box<dyn ResourceType>> {
    vec![
        Box::new(VpcType),
        Box::new(IpBlockType),
        Box::new(HostTransportNodeType),
        Box::new(VpcDataSource),
        Box::new(IpBlockDataSource),
        Box::new(HostTransportNodeDataSource),
        Box::new(NatRuleStatisticsDataSource),
    ]
}

/// Schema for a resource type, or for the data source when `data_source` is set
pub fn find_schema(type_name: &str, data_source: bool) -> Option<ResourceSchema> {
    resource_types()
        .into_iter()
        .find(|t| t.name() == type_name && t.is_data_source() == data_source)
        .map(|t| t.schema())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_type_has_a_matching_schema() {
        for t in resource_types() {
            assert_eq!(t.schema().resource_type, t.name());
        }
    }

    #[test]
    fn statistics_are_data_only() {
        assert!(find_schema(NAT_RULE_STATISTICS, true).is_some());
        assert!(find_schema(NAT_RULE_STATISTICS, false).is_none());
        assert!(find_schema(VPC, false).is_some());
        assert!(find_schema("segment", false).is_none());
    }
}
