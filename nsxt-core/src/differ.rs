//! Differ - Compare desired state with current state
//!
//! Compares the resources declared in configuration with the state read back
//! from the provider, and produces the list of changes `apply` has to make.

use std::collections::{HashMap, HashSet};

use crate::resource::{Resource, ResourceId, State, Value};
use crate::schema::{AttributeType, ResourceSchema};

/// Result of a diff operation
#[derive(Debug, Clone, PartialEq)]
pub enum Diff {
    /// Resource does not exist -> needs creation
    Create(Resource),
    /// Resource exists with differences -> full-replace write in place
    Update {
        id: ResourceId,
        from: State,
        to: Resource,
        changed_attributes: Vec<String>,
    },
    /// A force-new attribute changed -> delete, then create
    Replace {
        id: ResourceId,
        from: State,
        to: Resource,
        changed_attributes: Vec<String>,
    },
    /// Resource exists with no differences -> no action needed
    NoChange(ResourceId),
    /// Recorded in state but no longer declared -> needs deletion
    Delete(State),
}

impl Diff {
    /// Returns whether this Diff involves a change
    pub fn is_change(&self) -> bool {
        !matches!(self, Diff::NoChange(_))
    }

    pub fn id(&self) -> &ResourceId {
        match self {
            Diff::Create(r) => &r.id,
            Diff::Update { id, .. } | Diff::Replace { id, .. } | Diff::NoChange(id) => id,
            Diff::Delete(state) => &state.id,
        }
    }

    /// One-line description, e.g. `~ vpc.web (display_name)`
    pub fn summary(&self) -> String {
        match self {
            Diff::Create(r) => format!("+ {}", r.id),
            Diff::Update {
                id,
                changed_attributes,
                ..
            } => format!("~ {} ({})", id, changed_attributes.join(", ")),
            Diff::Replace {
                id,
                changed_attributes,
                ..
            } => format!("-/+ {} ({})", id, changed_attributes.join(", ")),
            Diff::NoChange(id) => format!("  {}", id),
            Diff::Delete(state) => format!("- {}", state.id),
        }
    }
}

/// Compare desired state with current state to compute a Diff
///
/// `desired` is expected to have schema defaults applied already. Attributes
/// the configuration leaves out are computed by the remote side and ignored.
pub fn diff(desired: &Resource, current: &State, schema: &ResourceSchema) -> Diff {
    if !current.exists {
        return Diff::Create(desired.clone());
    }

    let changed = find_changed_attributes(&desired.attributes, &current.attributes, schema);

    if changed.is_empty() {
        return Diff::NoChange(desired.id.clone());
    }

    let force_new = changed.iter().any(|name| {
        schema
            .attributes
            .get(name)
            .is_some_and(|attr| attr.force_new)
    });

    if force_new {
        Diff::Replace {
            id: desired.id.clone(),
            from: current.clone(),
            to: desired.clone(),
            changed_attributes: changed,
        }
    } else {
        Diff::Update {
            id: desired.id.clone(),
            from: current.clone(),
            to: desired.clone(),
            changed_attributes: changed,
        }
    }
}

/// Find changed attributes between desired and current state
fn find_changed_attributes(
    desired: &HashMap<String, Value>,
    current: &HashMap<String, Value>,
    schema: &ResourceSchema,
) -> Vec<String> {
    let mut changed: Vec<String> = desired
        .iter()
        .filter(|(key, desired_value)| {
            let attr_type = match schema.attributes.get(key.as_str()) {
                Some(attr) if attr.write_only => return false,
                Some(attr) => Some(&attr.attr_type),
                None => None,
            };
            !matches_remote(desired_value, current.get(key.as_str()), attr_type)
        })
        .map(|(key, _)| key.clone())
        .collect();

    // Full replace: a configurable value left out of the configuration is cleared
    changed.extend(
        current
            .iter()
            .filter(|(key, value)| {
                !desired.contains_key(key.as_str())
                    && !is_empty(value)
                    && schema.attributes.get(key.as_str()).is_some_and(|attr| {
                        !attr.computed && !attr.read_only && !attr.write_only
                    })
            })
            .map(|(key, _)| key.clone()),
    );

    changed.sort();
    changed
}

/// Whether a desired value is satisfied by the remote value
fn matches_remote(
    desired: &Value,
    current: Option<&Value>,
    attr_type: Option<&AttributeType>,
) -> bool {
    let Some(current) = current else {
        return is_empty(desired);
    };

    match (desired, current, attr_type) {
        (Value::List(want), Value::List(have), Some(AttributeType::Block(block))) => {
            want.len() == have.len()
                && want
                    .iter()
                    .zip(have)
                    .all(|(w, h)| block_matches(w, h, block))
        }
        (Value::List(want), Value::List(have), Some(AttributeType::List(inner))) => {
            want.len() == have.len()
                && want
                    .iter()
                    .zip(have)
                    .all(|(w, h)| matches_remote(w, Some(h), Some(inner.as_ref())))
        }
        _ => desired == current,
    }
}

fn block_matches(desired: &Value, current: &Value, schema: &ResourceSchema) -> bool {
    let (Value::Map(want), Value::Map(have)) = (desired, current) else {
        return desired == current;
    };

    want.iter().all(|(key, value)| {
        match schema.attributes.get(key) {
            Some(attr) if attr.write_only => true,
            attr => matches_remote(value, have.get(key), attr.map(|a| &a.attr_type)),
        }
    })
}

fn is_empty(value: &Value) -> bool {
    match value {
        Value::String(s) => s.is_empty(),
        Value::List(items) => items.is_empty(),
        Value::Map(map) => map.is_empty(),
        _ => false,
    }
}

/// Compute the changes for every declared resource, followed by deletions
/// of recorded resources that are no longer declared (in reverse order)
pub fn create_plan(
    desired: &[Resource],
    current: &[State],
    schemas: &HashMap<String, ResourceSchema>,
) -> Vec<Diff> {
    let empty = ResourceSchema::new("");
    let mut plan = Vec::new();

    for resource in desired {
        let state = current
            .iter()
            .find(|s| s.id == resource.id)
            .cloned()
            .unwrap_or_else(|| State::not_found(resource.id.clone()));
        let schema = schemas.get(&resource.id.resource_type).unwrap_or(&empty);
        plan.push(diff(resource, &state, schema));
    }

    let declared: HashSet<&ResourceId> = desired.iter().map(|r| &r.id).collect();
    for state in current.iter().rev() {
        if !declared.contains(&state.id) {
            plan.push(Diff::Delete(state.clone()));
        }
    }

    plan
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::AttributeSchema;

    fn schema() -> ResourceSchema {
        ResourceSchema::new("host_transport_node")
            .attribute(AttributeSchema::new("display_name", AttributeType::String))
            .attribute(AttributeSchema::new("site_path", AttributeType::String).force_new())
            .attribute(AttributeSchema::new(
                "node_deployment_info",
                AttributeType::Block(Box::new(
                    ResourceSchema::new("node_deployment_info")
                        .attribute(AttributeSchema::new("os_type", AttributeType::String))
                        .attribute(
                            AttributeSchema::new("password", AttributeType::String).write_only(),
                        ),
                )),
            ))
    }

    fn block(pairs: &[(&str, &str)]) -> Value {
        Value::List(vec![Value::Map(
            pairs
                .iter()
                .map(|(k, v)| (k.to_string(), Value::string(*v)))
                .collect(),
        )])
    }

    fn current(attrs: &[(&str, Value)]) -> State {
        State::existing(
            ResourceId::new("host_transport_node", "h"),
            attrs
                .iter()
                .map(|(k, v)| (k.to_string(), v.clone()))
                .collect(),
        )
        .with_identifier("h1")
    }

    #[test]
    fn diff_create_when_not_exists() {
        let desired = Resource::new("host_transport_node", "h");
        let state = State::not_found(desired.id.clone());
        assert!(matches!(diff(&desired, &state, &schema()), Diff::Create(_)));
    }

    #[test]
    fn computed_and_write_only_values_are_ignored() {
        let desired = Resource::new("host_transport_node", "h")
            .with_attribute("display_name", Value::string("esx-1"))
            .with_attribute(
                "node_deployment_info",
                block(&[("os_type", "ESXI"), ("password", "secret")]),
            );
        let state = current(&[
            ("display_name", Value::string("esx-1")),
            ("path", Value::string("/infra/sites/default/enforcement-points/default/host-transport-nodes/h1")),
            (
                "node_deployment_info",
                block(&[("os_type", "ESXI"), ("fqdn", "esx-1.example.com")]),
            ),
        ]);

        assert!(matches!(diff(&desired, &state, &schema()), Diff::NoChange(_)));
    }

    #[test]
    fn diff_update_when_different() {
        let desired = Resource::new("host_transport_node", "h")
            .with_attribute("display_name", Value::string("esx-2"))
            .with_attribute("description", Value::string(""));
        let state = current(&[("display_name", Value::string("esx-1"))]);

        match diff(&desired, &state, &schema()) {
            Diff::Update {
                changed_attributes, ..
            } => assert_eq!(changed_attributes, vec!["display_name".to_string()]),
            other => panic!("Expected Update, got {:?}", other),
        }
    }

    #[test]
    fn omitted_optional_value_is_cleared() {
        let schema = schema()
            .attribute(AttributeSchema::new("description", AttributeType::String))
            .attribute(AttributeSchema::new("revision", AttributeType::Int).read_only())
            .attribute(AttributeSchema::new("nsx_id", AttributeType::String).computed());
        let desired = Resource::new("host_transport_node", "h")
            .with_attribute("display_name", Value::string("esx-1"));
        let state = current(&[
            ("display_name", Value::string("esx-1")),
            ("description", Value::string("rack 4")),
            ("revision", Value::Int(3)),
            ("nsx_id", Value::string("h1")),
        ]);

        match diff(&desired, &state, &schema) {
            Diff::Update {
                changed_attributes, ..
            } => assert_eq!(changed_attributes, vec!["description".to_string()]),
            other => panic!("Expected Update, got {:?}", other),
        }
    }

    #[test]
    fn force_new_change_is_a_replace() {
        let desired = Resource::new("host_transport_node", "h")
            .with_attribute("site_path", Value::string("/infra/sites/site-b"));
        let state = current(&[("site_path", Value::string("/infra/sites/default"))]);

        let d = diff(&desired, &state, &schema());
        assert!(matches!(d, Diff::Replace { .. }));
        assert_eq!(d.summary(), "-/+ host_transport_node.h (site_path)");
    }

    #[test]
    fn plan_deletes_undeclared_resources_in_reverse_order() {
        let schemas: HashMap<String, ResourceSchema> =
            [("host_transport_node".to_string(), schema())].into_iter().collect();
        let desired = vec![Resource::new("host_transport_node", "new")];
        let recorded = vec![
            State::existing(ResourceId::new("vpc", "a"), HashMap::new()),
            State::existing(ResourceId::new("vpc", "b"), HashMap::new()),
        ];

        let plan = create_plan(&desired, &recorded, &schemas);
        let summaries: Vec<String> = plan.iter().map(Diff::summary).collect();
        assert_eq!(
            summaries,
            vec!["+ host_transport_node.new", "- vpc.b", "- vpc.a"]
        );
    }
}
