//! The record of NSX objects managed through this tool
//!
//! Entries keep the order in which they were first recorded, so destroying
//! in reverse removes dependents before the objects they live in.

use std::collections::HashMap;

use nsxt_core::resource::{ResourceId, State, Value};
use serde::{Deserialize, Serialize};

use crate::error::{StateError, StateResult};

/// On-disk format version
pub const FORMAT_VERSION: u32 = 1;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StateFile {
    pub format_version: u32,
    /// Bumped on every save
    pub serial: u64,
    /// Fixed when the file is first created; saves from another lineage are refused
    pub lineage: String,
    /// NSX manager host the objects live on
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub manager: Option<String>,
    #[serde(default)]
    pub managed: Vec<RecordedResource>,
}

impl StateFile {
    pub fn new() -> Self {
        Self {
            format_version: FORMAT_VERSION,
            serial: 0,
            lineage: uuid::Uuid::new_v4().to_string(),
            manager: None,
            managed: Vec::new(),
        }
    }

    /// Tie this state to `host`, or fail if it already belongs to another manager
    pub fn bind_manager(&mut self, host: &str) -> StateResult<()> {
        match &self.manager {
            Some(recorded) if recorded != host && !self.managed.is_empty() => {
                Err(StateError::ForeignManager {
                    recorded: recorded.clone(),
                    current: host.to_string(),
                })
            }
            _ => {
                self.manager = Some(host.to_string());
                Ok(())
            }
        }
    }

    pub fn is_empty(&self) -> bool {
        self.managed.is_empty()
    }

    pub fn get(&self, id: &ResourceId) -> Option<&RecordedResource> {
        self.managed.iter().find(|r| r.is(id))
    }

    /// Record the read-back `state` of a resource, replacing an earlier entry
    /// in place. Returns false when nothing exists remotely.
    pub fn record(&mut self, state: &State) -> bool {
        let Some(entry) = RecordedResource::from_state(state) else {
            return false;
        };
        match self.managed.iter_mut().find(|r| r.is(&state.id)) {
            Some(slot) => *slot = entry,
            None => self.managed.push(entry),
        }
        true
    }

    pub fn forget(&mut self, id: &ResourceId) -> Option<RecordedResource> {
        let pos = self.managed.iter().position(|r| r.is(id))?;
        Some(self.managed.remove(pos))
    }

    /// Drop entries whose object is absent from `present`
    pub fn retain_present(&mut self, present: &[State]) -> Vec<RecordedResource> {
        let (kept, gone): (Vec<_>, Vec<_>) = std::mem::take(&mut self.managed)
            .into_iter()
            .partition(|r| present.iter().any(|s| r.is(&s.id)));
        self.managed = kept;
        gone
    }

    /// Entries in the order they should be deleted
    pub fn destroy_order(&self) -> impl Iterator<Item = &RecordedResource> {
        self.managed.iter().rev()
    }
}

impl Default for StateFile {
    fn default() -> Self {
        Self::new()
    }
}

/// One managed NSX object
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordedResource {
    pub resource_type: String,
    pub name: String,
    pub nsx_id: String,
    /// Attributes as last read back, scope attributes included
    pub attributes: HashMap<String, serde_json::Value>,
}

impl RecordedResource {
    fn from_state(state: &State) -> Option<Self> {
        let nsx_id = state.identifier.as_deref().filter(|_| state.exists)?;
        Some(Self {
            resource_type: state.id.resource_type.clone(),
            name: state.id.name.clone(),
            nsx_id: nsx_id.to_string(),
            attributes: state
                .attributes
                .iter()
                .map(|(k, v)| (k.clone(), v.to_json()))
                .collect(),
        })
    }

    fn is(&self, id: &ResourceId) -> bool {
        self.resource_type == id.resource_type && self.name == id.name
    }

    pub fn id(&self) -> ResourceId {
        ResourceId::new(&self.resource_type, &self.name)
    }

    pub fn to_state(&self) -> State {
        let attributes: HashMap<String, Value> = self
            .attributes
            .iter()
            .filter_map(|(k, v)| Value::from_json(v).map(|v| (k.clone(), v)))
            .collect();
        State::existing(self.id(), attributes).with_identifier(&self.nsx_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vpc(name: &str, nsx_id: &str, display_name: &str) -> State {
        let attrs = HashMap::from([
            ("display_name".to_string(), Value::string(display_name)),
            ("project_id".to_string(), Value::string("p1")),
        ]);
        State::existing(ResourceId::new("vpc", name), attrs).with_identifier(nsx_id)
    }

    #[test]
    fn record_replaces_in_place_and_keeps_order() {
        let mut state = StateFile::new();
        assert!(state.record(&vpc("web", "v1", "web")));
        assert!(state.record(&vpc("db", "v2", "db")));
        assert!(state.record(&vpc("web", "v1", "web-2")));

        let names: Vec<_> = state.managed.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, ["web", "db"]);
        let web = state.get(&ResourceId::new("vpc", "web")).unwrap();
        assert_eq!(web.attributes["display_name"], serde_json::json!("web-2"));

        let order: Vec<_> = state.destroy_order().map(|r| r.nsx_id.as_str()).collect();
        assert_eq!(order, ["v2", "v1"]);
    }

    #[test]
    fn absent_object_is_not_recorded() {
        let mut state = StateFile::new();
        assert!(!state.record(&State::not_found(ResourceId::new("vpc", "web"))));
        assert!(state.is_empty());
    }

    #[test]
    fn forget_and_retain_present() {
        let mut state = StateFile::new();
        state.record(&vpc("web", "v1", "web"));
        state.record(&vpc("db", "v2", "db"));
        state.record(&vpc("cache", "v3", "cache"));

        assert!(state.forget(&ResourceId::new("vpc", "cache")).is_some());
        assert!(state.forget(&ResourceId::new("vpc", "cache")).is_none());

        let gone = state.retain_present(&[vpc("db", "v2", "db")]);
        assert_eq!(gone.len(), 1);
        assert_eq!(gone[0].nsx_id, "v1");
        assert_eq!(state.managed.len(), 1);
    }

    #[test]
    fn recorded_entry_converts_back_to_provider_state() {
        let mut attrs = HashMap::new();
        attrs.insert("cidr".to_string(), Value::string("10.0.0.0/16"));
        attrs.insert(
            "tag".to_string(),
            Value::List(vec![Value::Map(
                [("scope".to_string(), Value::string("env"))]
                    .into_iter()
                    .collect(),
            )]),
        );
        let original = State::existing(ResourceId::new("ip_block", "private"), attrs)
            .with_identifier("b1");

        let mut state = StateFile::new();
        state.record(&original);
        let entry = state.get(&original.id).unwrap();
        assert_eq!(entry.nsx_id, "b1");
        assert_eq!(entry.to_state(), original);
    }

    #[test]
    fn manager_binding() {
        let mut state = StateFile::new();
        state.bind_manager("nsx-a.example.com").unwrap();
        state.bind_manager("nsx-a.example.com").unwrap();

        // nothing recorded yet, so the state may move
        state.bind_manager("nsx-b.example.com").unwrap();
        state.record(&vpc("web", "v1", "web"));

        let err = state.bind_manager("nsx-a.example.com").unwrap_err();
        assert!(matches!(
            err,
            StateError::ForeignManager { ref recorded, .. } if recorded == "nsx-b.example.com"
        ));
    }

    #[test]
    fn file_without_manager_or_entries_parses() {
        let json = r#"{"format_version": 1, "serial": 4, "lineage": "l-1"}"#;
        let state: StateFile = serde_json::from_str(json).unwrap();
        assert_eq!(state.serial, 4);
        assert!(state.manager.is_none());
        assert!(state.is_empty());
    }
}
