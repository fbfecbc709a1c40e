//! Attributes shared by every NSX policy resource and data source

use nsxt_core::schema::{AttributeSchema, AttributeType, ResourceSchema, types};

/// Nested block type built from `schema`
pub fn block(schema: ResourceSchema) -> AttributeType {
    AttributeType::Block(Box::new(schema))
}

pub fn string_list() -> AttributeType {
    AttributeType::List(Box::new(AttributeType::String))
}

pub fn path_list() -> AttributeType {
    AttributeType::List(Box::new(types::policy_path()))
}

/// `nsx_id`, `path`, `display_name`, `description`, `revision` and `tag`
pub fn with_common_attributes(schema: ResourceSchema) -> ResourceSchema {
    schema
        .attribute(
            AttributeSchema::new("nsx_id", AttributeType::String)
                .computed()
                .force_new()
                .with_description("NSX ID for this resource (generated when not set)"),
        )
        .attribute(
            AttributeSchema::new("path", AttributeType::String)
                .read_only()
                .with_description("Policy path for this resource"),
        )
        .attribute(
            AttributeSchema::new("display_name", AttributeType::String)
                .required()
                .with_description("Display name for this resource"),
        )
        .attribute(
            AttributeSchema::new("description", AttributeType::String)
                .with_description("Description for this resource"),
        )
        .attribute(
            AttributeSchema::new("revision", AttributeType::Int)
                .read_only()
                .with_description("The _revision property describes the current revision of the resource"),
        )
        .attribute(
            AttributeSchema::new("tag", types::tags())
                .with_description("Set of opaque identifiers meaningful to the user"),
        )
}

/// `id` and `display_name` select the object; the rest is read back
pub fn with_data_source_attributes(schema: ResourceSchema) -> ResourceSchema {
    schema
        .attribute(
            AttributeSchema::new("id", AttributeType::String)
                .computed()
                .with_description("Unique ID of this resource"),
        )
        .attribute(
            AttributeSchema::new("display_name", AttributeType::String)
                .computed()
                .with_description("Display name of this resource, exact or prefix"),
        )
        .attribute(
            AttributeSchema::new("description", AttributeType::String)
                .read_only()
                .with_description("Description of this resource"),
        )
        .attribute(
            AttributeSchema::new("path", AttributeType::String)
                .read_only()
                .with_description("Policy path of this resource"),
        )
}

/// Optional `context` block placing an object inside a project
pub fn context() -> AttributeSchema {
    AttributeSchema::new(
        "context",
        block(
            ResourceSchema::new("context").attribute(
                AttributeSchema::new("project_id", AttributeType::String)
                    .required()
                    .with_description("Id of the project which the resource belongs to"),
            ),
        ),
    )
    .max_items(1)
    .force_new()
    .with_description("Resource context")
}

/// Project the object lives in (multitenancy)
pub fn project_id() -> AttributeSchema {
    AttributeSchema::new("project_id", AttributeType::String)
        .required()
        .force_new()
        .with_description("Id of the project which the resource belongs to")
}

/// The attributes of `schema` as optional read-only ones without defaults, for data
/// sources that read back what the resource manages
pub fn read_back_only(schema: ResourceSchema) -> Vec<AttributeSchema> {
    schema
        .attributes
        .into_values()
        .map(|attr| {
            AttributeSchema {
                required: false,
                default: None,
                ..attr
            }
            .read_only()
        })
        .collect()
}
