//! IP block schema definitions

use nsxt_core::schema::{AttributeSchema, AttributeType, ResourceSchema, types};

use super::common::{context, read_back_only, with_common_attributes, with_data_source_attributes};

fn ip_block_attributes(schema: ResourceSchema) -> ResourceSchema {
    schema
        .attribute(
            AttributeSchema::new("cidr", types::cidr())
                .required()
                .force_new()
                .with_description("Network address and the prefix length of the IP block"),
        )
        .attribute(
            AttributeSchema::new(
                "visibility",
                AttributeType::Enum(vec!["PRIVATE".to_string(), "EXTERNAL".to_string()]),
            )
            .computed()
            .with_description("Visibility of the IP block to VPCs of a project"),
        )
}

/// Returns the schema for the `ip_block` resource
pub fn resource_schema() -> ResourceSchema {
    let schema = ResourceSchema::new("ip_block")
        .with_description("An IP block in the default tenant or in a project")
        .attribute(context());
    ip_block_attributes(with_common_attributes(schema))
}

/// Returns the schema for the `ip_block` data source
pub fn data_source_schema() -> ResourceSchema {
    let schema = ResourceSchema::new("ip_block")
        .with_description("Look up an IP block by ID or name")
        .attribute(context());

    read_back_only(ip_block_attributes(ResourceSchema::new("ip_block")))
        .into_iter()
        .fold(with_data_source_attributes(schema), |schema, attr| {
            schema.attribute(attr)
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use nsxt_core::resource::Value;
    use nsxt_core::schema::TypeError;
    use std::collections::HashMap;

    fn attrs(pairs: Vec<(&str, Value)>) -> HashMap<String, Value> {
        pairs.into_iter().map(|(k, v)| (k.to_string(), v)).collect()
    }

    #[test]
    fn cidr_is_validated() {
        let schema = resource_schema();

        let ok = attrs(vec![
            ("display_name", Value::string("private")),
            ("cidr", Value::string("192.168.0.0/16")),
            ("visibility", Value::string("PRIVATE")),
        ]);
        assert!(schema.validate(&ok).is_ok());

        let bad = attrs(vec![
            ("display_name", Value::string("private")),
            ("cidr", Value::string("192.168.0.0")),
        ]);
        assert!(matches!(
            schema.validate(&bad).unwrap_err()[0],
            TypeError::ValidationFailed { .. }
        ));
    }

    #[test]
    fn visibility_is_an_enum() {
        let bad = attrs(vec![
            ("display_name", Value::string("private")),
            ("cidr", Value::string("10.0.0.0/8")),
            ("visibility", Value::string("PUBLIC")),
        ]);
        assert!(matches!(
            resource_schema().validate(&bad).unwrap_err()[0],
            TypeError::InvalidEnumVariant { .. }
        ));
    }

    #[test]
    fn context_holds_one_project() {
        let project = |id: &str| {
            Value::Map(attrs(vec![("project_id", Value::string(id))]))
        };
        let two = attrs(vec![
            ("display_name", Value::string("private")),
            ("cidr", Value::string("10.0.0.0/8")),
            ("context", Value::List(vec![project("p1"), project("p2")])),
        ]);
        assert!(matches!(
            resource_schema().validate(&two).unwrap_err()[0],
            TypeError::TooManyItems { max: 1, .. }
        ));

        let empty_block = attrs(vec![
            ("display_name", Value::string("private")),
            ("cidr", Value::string("10.0.0.0/8")),
            ("context", Value::List(vec![Value::Map(HashMap::new())])),
        ]);
        assert!(resource_schema().validate(&empty_block).is_err());
    }

    #[test]
    fn data_source_reads_back_cidr() {
        let schema = data_source_schema();
        assert!(schema.attributes["cidr"].read_only);
        assert!(!schema.attributes["cidr"].required);
        assert!(schema.validate(&HashMap::new()).is_ok());
    }
}
