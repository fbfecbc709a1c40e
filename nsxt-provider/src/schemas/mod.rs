//! NSX policy resource and data source schemas
//!
//! Each module exposes `resource_schema()` and/or `data_source_schema()`.

pub mod common;
pub mod host_transport_node;
pub mod ip_block;
pub mod nat_rule_statistics;
pub mod vpc;
