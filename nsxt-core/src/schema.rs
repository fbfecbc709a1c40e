//! Schema - Define type schemas for resources
//!
//! Providers define schemas for each resource type and data source,
//! enabling validation before any remote call is made.

use std::collections::HashMap;
use std::fmt;
use std::net::IpAddr;

use crate::resource::Value;

/// Attribute type
#[derive(Debug, Clone)]
pub enum AttributeType {
    /// String
    String,
    /// Integer
    Int,
    /// Boolean
    Bool,
    /// Enum (list of allowed values)
    Enum(Vec<String>),
    /// Custom type (with validation function)
    Custom {
        name: String,
        base: Box<AttributeType>,
        validate: fn(&Value) -> Result<(), String>,
    },
    /// List
    List(Box<AttributeType>),
    /// Map
    Map(Box<AttributeType>),
    /// Nested configuration block, given as a list of maps
    Block(Box<ResourceSchema>),
}

impl AttributeType {
    /// Check if a value conforms to this type
    pub fn validate(&self, value: &Value) -> Result<(), TypeError> {
        match (self, value) {
            (AttributeType::String, Value::String(_)) => Ok(()),
            (AttributeType::Int, Value::Int(_)) => Ok(()),
            (AttributeType::Bool, Value::Bool(_)) => Ok(()),

            (AttributeType::Enum(variants), Value::String(s)) => {
                if variants.iter().any(|v| v == s) {
                    Ok(())
                } else {
                    Err(TypeError::InvalidEnumVariant {
                        value: s.clone(),
                        expected: variants.clone(),
                    })
                }
            }

            (AttributeType::Custom { validate, .. }, v) => {
                validate(v).map_err(|message| TypeError::ValidationFailed { message })
            }

            (AttributeType::List(inner), Value::List(items)) => {
                for (i, item) in items.iter().enumerate() {
                    inner.validate(item).map_err(|e| TypeError::ListItemError {
                        index: i,
                        inner: Box::new(e),
                    })?;
                }
                Ok(())
            }

            (AttributeType::Map(inner), Value::Map(map)) => {
                for (k, v) in map {
                    inner.validate(v).map_err(|e| TypeError::MapValueError {
                        key: k.clone(),
                        inner: Box::new(e),
                    })?;
                }
                Ok(())
            }

            (AttributeType::Block(schema), Value::List(items)) => {
                for (i, item) in items.iter().enumerate() {
                    let Value::Map(block) = item else {
                        return Err(TypeError::ListItemError {
                            index: i,
                            inner: Box::new(TypeError::TypeMismatch {
                                expected: "Block".to_string(),
                                got: item.type_name(),
                            }),
                        });
                    };
                    if let Err(mut errors) = schema.validate(block) {
                        return Err(TypeError::ListItemError {
                            index: i,
                            inner: Box::new(errors.remove(0)),
                        });
                    }
                }
                Ok(())
            }

            _ => Err(TypeError::TypeMismatch {
                expected: self.type_name(),
                got: value.type_name(),
            }),
        }
    }

    fn type_name(&self) -> String {
        match self {
            AttributeType::String => "String".to_string(),
            AttributeType::Int => "Int".to_string(),
            AttributeType::Bool => "Bool".to_string(),
            AttributeType::Enum(variants) => format!("Enum({})", variants.join(" | ")),
            AttributeType::Custom { name, .. } => name.clone(),
            AttributeType::List(inner) => format!("List<{}>", inner.type_name()),
            AttributeType::Map(inner) => format!("Map<{}>", inner.type_name()),
            AttributeType::Block(schema) => format!("Block({})", schema.resource_type),
        }
    }
}

impl fmt::Display for AttributeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.type_name())
    }
}

/// Type error
#[derive(Debug, Clone, thiserror::Error)]
pub enum TypeError {
    #[error("Type mismatch: expected {expected}, got {got}")]
    TypeMismatch { expected: String, got: String },

    #[error("Invalid enum variant '{value}', expected one of: {}", expected.join(", "))]
    InvalidEnumVariant {
        value: String,
        expected: Vec<String>,
    },

    #[error("Validation failed: {message}")]
    ValidationFailed { message: String },

    #[error("Required attribute '{name}' is missing")]
    MissingRequired { name: String },

    #[error("Unknown attribute '{name}'")]
    UnknownAttribute { name: String },

    #[error("Attribute '{name}' is computed and cannot be set")]
    ReadOnly { name: String },

    #[error("Attribute '{name}' accepts at most {max} items, got {got}")]
    TooManyItems { name: String, max: usize, got: usize },

    #[error("Attributes '{name}' and '{other}' cannot be set together")]
    Conflict { name: String, other: String },

    #[error("List item at index {index}: {inner}")]
    ListItemError { index: usize, inner: Box<TypeError> },

    #[error("Map value for key '{key}': {inner}")]
    MapValueError { key: String, inner: Box<TypeError> },
}

impl Value {
    fn type_name(&self) -> String {
        match self {
            Value::String(_) => "String".to_string(),
            Value::Int(_) => "Int".to_string(),
            Value::Bool(_) => "Bool".to_string(),
            Value::List(_) => "List".to_string(),
            Value::Map(_) => "Map".to_string(),
        }
    }
}

/// Attribute schema
#[derive(Debug, Clone)]
pub struct AttributeSchema {
    pub name: String,
    pub attr_type: AttributeType,
    pub required: bool,
    /// The provider fills this attribute in when it is not set
    pub computed: bool,
    /// Only the provider sets this attribute
    pub read_only: bool,
    /// Changing this attribute requires replacing the object
    pub force_new: bool,
    /// Sent on writes but never returned by reads
    pub write_only: bool,
    pub default: Option<Value>,
    pub description: Option<String>,
    pub max_items: Option<usize>,
    pub conflicts_with: Vec<String>,
}

impl AttributeSchema {
    pub fn new(name: impl Into<String>, attr_type: AttributeType) -> Self {
        Self {
            name: name.into(),
            attr_type,
            required: false,
            computed: false,
            read_only: false,
            force_new: false,
            write_only: false,
            default: None,
            description: None,
            max_items: None,
            conflicts_with: Vec::new(),
        }
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn computed(mut self) -> Self {
        self.computed = true;
        self
    }

    pub fn read_only(mut self) -> Self {
        self.read_only = true;
        self.computed = true;
        self
    }

    pub fn force_new(mut self) -> Self {
        self.force_new = true;
        self
    }

    pub fn write_only(mut self) -> Self {
        self.write_only = true;
        self
    }

    pub fn with_default(mut self, value: Value) -> Self {
        self.default = Some(value);
        self
    }

    pub fn with_description(mut self, desc: impl Into<String>) -> Self {
        self.description = Some(desc.into());
        self
    }

    pub fn max_items(mut self, max: usize) -> Self {
        self.max_items = Some(max);
        self
    }

    pub fn conflicts_with(mut self, other: impl Into<String>) -> Self {
        self.conflicts_with.push(other.into());
        self
    }
}

/// Resource schema
#[derive(Debug, Clone)]
pub struct ResourceSchema {
    pub resource_type: String,
    pub attributes: HashMap<String, AttributeSchema>,
    pub description: Option<String>,
}

impl ResourceSchema {
    pub fn new(resource_type: impl Into<String>) -> Self {
        Self {
            resource_type: resource_type.into(),
            attributes: HashMap::new(),
            description: None,
        }
    }

    pub fn attribute(mut self, schema: AttributeSchema) -> Self {
        self.attributes.insert(schema.name.clone(), schema);
        self
    }

    pub fn with_description(mut self, desc: impl Into<String>) -> Self {
        self.description = Some(desc.into());
        self
    }

    /// Validate resource attributes
    pub fn validate(&self, attributes: &HashMap<String, Value>) -> Result<(), Vec<TypeError>> {
        let mut errors = Vec::new();

        // Check required attributes
        for (name, schema) in &self.attributes {
            if schema.required && !attributes.contains_key(name) && schema.default.is_none() {
                errors.push(TypeError::MissingRequired { name: name.clone() });
            }
        }

        let mut names: Vec<&String> = attributes.keys().collect();
        names.sort();

        for name in names {
            let value = &attributes[name];
            let Some(schema) = self.attributes.get(name) else {
                errors.push(TypeError::UnknownAttribute { name: name.clone() });
                continue;
            };

            if schema.read_only {
                errors.push(TypeError::ReadOnly { name: name.clone() });
                continue;
            }

            if let Err(e) = schema.attr_type.validate(value) {
                errors.push(e);
            }

            if let (Some(max), Value::List(items)) = (schema.max_items, value)
                && items.len() > max
            {
                errors.push(TypeError::TooManyItems {
                    name: name.clone(),
                    max,
                    got: items.len(),
                });
            }

            for other in &schema.conflicts_with {
                if !is_set(Some(value)) || !is_set(attributes.get(other)) {
                    continue;
                }
                // Report each pair once when both sides declare the conflict
                let mirrored = self
                    .attributes
                    .get(other)
                    .is_some_and(|o| o.conflicts_with.contains(name));
                if !mirrored || name < other {
                    errors.push(TypeError::Conflict {
                        name: name.clone(),
                        other: other.clone(),
                    });
                }
            }
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }

    /// Fill in defaults for unset attributes, including inside nested blocks
    pub fn with_defaults(&self, attributes: &HashMap<String, Value>) -> HashMap<String, Value> {
        let mut result = attributes.clone();

        for (name, schema) in &self.attributes {
            match (result.get_mut(name), &schema.default) {
                (None, Some(default)) => {
                    result.insert(name.clone(), default.clone());
                }
                (Some(Value::List(items)), _) => {
                    if let AttributeType::Block(block_schema) = &schema.attr_type {
                        for item in items.iter_mut() {
                            if let Value::Map(block) = item {
                                *block = block_schema.with_defaults(block);
                            }
                        }
                    }
                }
                _ => {}
            }
        }

        result
    }

    /// Names of attributes whose change forces replacement
    pub fn force_new_attributes(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self
            .attributes
            .values()
            .filter(|a| a.force_new)
            .map(|a| a.name.as_str())
            .collect();
        names.sort();
        names
    }
}

fn is_set(value: Option<&Value>) -> bool {
    match value {
        None => false,
        Some(Value::String(s)) => !s.is_empty(),
        Some(Value::List(items)) => !items.is_empty(),
        Some(_) => true,
    }
}

/// Helper functions for common types
pub mod types {
    use super::*;

    /// CIDR block type (e.g., "10.0.0.0/16" or "2001:db8::/32")
    pub fn cidr() -> AttributeType {
        AttributeType::Custom {
            name: "Cidr".to_string(),
            base: Box::new(AttributeType::String),
            validate: |value| {
                if let Value::String(s) = value {
                    validate_cidr(s)
                } else {
                    Err("Expected string".to_string())
                }
            },
        }
    }

    /// Single IPv4 or IPv6 address
    pub fn ip_address() -> AttributeType {
        AttributeType::Custom {
            name: "IpAddress".to_string(),
            base: Box::new(AttributeType::String),
            validate: |value| match value {
                Value::String(s) => s
                    .parse::<IpAddr>()
                    .map(|_| ())
                    .map_err(|_| format!("Invalid IP address '{}'", s)),
                _ => Err("Expected string".to_string()),
            },
        }
    }

    /// Absolute policy path (e.g., "/infra/sites/default")
    pub fn policy_path() -> AttributeType {
        AttributeType::Custom {
            name: "PolicyPath".to_string(),
            base: Box::new(AttributeType::String),
            validate: |value| match value {
                Value::String(s) => validate_policy_path(s),
                _ => Err("Expected string".to_string()),
            },
        }
    }

    /// List of `{scope, tag}` blocks
    pub fn tags() -> AttributeType {
        AttributeType::Block(Box::new(
            ResourceSchema::new("tag")
                .attribute(AttributeSchema::new("scope", AttributeType::String))
                .attribute(AttributeSchema::new("tag", AttributeType::String)),
        ))
    }
}

/// Validate CIDR block format (e.g., "10.0.0.0/16")
pub fn validate_cidr(cidr: &str) -> Result<(), String> {
    let Some((ip, prefix)) = cidr.split_once('/') else {
        return Err(format!(
            "Invalid CIDR format '{}': expected IP/prefix",
            cidr
        ));
    };

    let max_prefix = match ip.parse::<IpAddr>() {
        Ok(IpAddr::V4(_)) => 32,
        Ok(IpAddr::V6(_)) => 128,
        Err(_) => return Err(format!("Invalid IP address '{}' in CIDR", ip)),
    };

    match prefix.parse::<u8>() {
        Ok(p) if p <= max_prefix => Ok(()),
        Ok(p) => Err(format!(
            "Invalid prefix length '{}': must be 0-{}",
            p, max_prefix
        )),
        Err(_) => Err(format!(
            "Invalid prefix length '{}': must be a number",
            prefix
        )),
    }
}

/// Validate an absolute policy path
pub fn validate_policy_path(path: &str) -> Result<(), String> {
    if !path.starts_with('/') {
        return Err(format!("Invalid policy path '{}': must start with '/'", path));
    }
    if path.len() > 1 && path.ends_with('/') {
        return Err(format!("Invalid policy path '{}': trailing '/'", path));
    }
    if path.contains("//") {
        return Err(format!("Invalid policy path '{}': empty segment", path));
    }
    Ok(())
}
