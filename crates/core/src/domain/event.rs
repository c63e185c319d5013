// Event Domain Model
//
// Wire shape (field order not significant):
// {event_type, event_name, received_from, model_type, model_data: object|null, entity_id: string|null}

use crate::domain::error::{DomainError, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Default consumer hint carried by every envelope
pub const DEFAULT_RECEIVER: &str = "analytics";

/// Logical broker destination
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Topic {
    /// Model lifecycle events (create/update/delete/read)
    ModelsTopic,
    /// Discrete domain events (project membership changes)
    EventsTopic,
}

impl Topic {
    pub fn as_str(&self) -> &'static str {
        match self {
            Topic::ModelsTopic => "models_topic",
            Topic::EventsTopic => "events_topic",
        }
    }
}

impl std::fmt::Display for Topic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Closed vocabulary of event verbs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventName {
    Get,
    GetAll,
    Create,
    Update,
    Delete,
    AddOnProject,
    ChangeRoleOnProject,
    DeleteFromProject,
}

impl EventName {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventName::Get => "get_",
            EventName::GetAll => "get_all",
            EventName::Create => "create_",
            EventName::Update => "update_",
            EventName::Delete => "delete_",
            EventName::AddOnProject => "add_on_project",
            EventName::ChangeRoleOnProject => "change_role_on_project",
            EventName::DeleteFromProject => "delete_from_project",
        }
    }

    /// Verb + noun by plain concatenation (`create_` + `task` = `create_task`)
    pub fn with_noun(&self, noun: &str) -> String {
        format!("{}{}", self.as_str(), noun)
    }
}

impl std::fmt::Display for EventName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Coarse event category
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum EventType {
    #[default]
    ModelEvent,
    Model,
    Event,
}

impl EventType {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventType::ModelEvent => "ModelEvent",
            EventType::Model => "MODEL",
            EventType::Event => "EVENT",
        }
    }
}

/// Structured record describing one domain change or discrete event.
///
/// Immutable once built; use [`EventEnvelope::builder`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventEnvelope {
    event_type: String,
    event_name: String,
    received_from: String,
    model_type: String,
    model_data: Option<Value>,
    entity_id: Option<String>,
}

impl EventEnvelope {
    pub fn builder(event_name: impl Into<String>, model_type: impl Into<String>) -> EnvelopeBuilder {
        EnvelopeBuilder {
            event_name: event_name.into(),
            model_type: model_type.into(),
            event_type: EventType::default().as_str().to_string(),
            received_from: DEFAULT_RECEIVER.to_string(),
            model_data: None,
            entity_id: None,
        }
    }

    pub fn event_type(&self) -> &str {
        &self.event_type
    }

    pub fn event_name(&self) -> &str {
        &self.event_name
    }

    pub fn received_from(&self) -> &str {
        &self.received_from
    }

    pub fn model_type(&self) -> &str {
        &self.model_type
    }

    pub fn model_data(&self) -> Option<&Value> {
        self.model_data.as_ref()
    }

    pub fn entity_id(&self) -> Option<&str> {
        self.entity_id.as_deref()
    }

    /// Encode as UTF-8 JSON bytes
    pub fn to_bytes(&self) -> serde_json::Result<Vec<u8>> {
        serde_json::to_vec(self)
    }

    /// Decode from UTF-8 JSON bytes
    pub fn from_slice(bytes: &[u8]) -> serde_json::Result<Self> {
        serde_json::from_slice(bytes)
    }
}

pub struct EnvelopeBuilder {
    event_name: String,
    model_type: String,
    event_type: String,
    received_from: String,
    model_data: Option<Value>,
    entity_id: Option<String>,
}

impl EnvelopeBuilder {
    pub fn event_type(mut self, event_type: EventType) -> Self {
        self.event_type = event_type.as_str().to_string();
        self
    }

    pub fn received_from(mut self, receiver: impl Into<String>) -> Self {
        self.received_from = receiver.into();
        self
    }

    pub fn model_data(mut self, data: Option<Value>) -> Self {
        self.model_data = data;
        self
    }

    /// Any displayable id; UUIDs render in canonical hyphenated form
    pub fn entity_id(mut self, id: impl std::fmt::Display) -> Self {
        self.entity_id = Some(id.to_string());
        self
    }

    pub fn build(self) -> EventEnvelope {
        EventEnvelope {
            event_type: self.event_type,
            event_name: self.event_name,
            received_from: self.received_from,
            model_type: self.model_type,
            model_data: self.model_data,
            entity_id: self.entity_id,
        }
    }
}

/// Render a record as a flat mapping of field name to value
pub fn record_snapshot<T: Serialize>(record: &T) -> Result<Value> {
    let value =
        serde_json::to_value(record).map_err(|e| DomainError::InvalidSnapshot(e.to_string()))?;
    if !value.is_object() {
        return Err(DomainError::InvalidSnapshot(format!(
            "expected an object, got {}",
            value
        )));
    }
    Ok(value)
}
