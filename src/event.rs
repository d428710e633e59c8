use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use uuid::Uuid;

use crate::{EsError, Result};

/// The `Event` struct is an immutable fact about one state transition of one
/// aggregate instance.
///
/// The payload (`data`) is opaque to the engine: its schema is defined per
/// event type by the domain layer through [`Event::set_json_data`] and
/// [`Event::get_json_data`]. The `version` field is the version the owning
/// aggregate had *after* this event was applied; it is stamped by the
/// aggregate root on the command path and carried as-is on the replay path.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Event {
    /// The ID of the event.
    pub event_id: String,

    /// The type tag of the event.
    pub event_type: String,

    /// The payload of the event.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    data: Option<serde_json::Value>,

    /// The timestamp of the event.
    pub timestamp: DateTime<Utc>,

    /// The type of the aggregate that produced the event.
    pub aggregate_type: String,

    /// The ID of the aggregate that produced the event.
    pub aggregate_id: String,

    /// The version of the owning aggregate after this event was applied.
    pub version: i64,

    /// Optional metadata attached by collaborators.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    metadata: Option<serde_json::Value>,
}

impl Event {
    /// Creates a new event for the given aggregate identity, with a fresh id
    /// and the current UTC timestamp. The payload starts empty.
    pub fn new(
        event_type: impl Into<String>,
        aggregate_type: impl Into<String>,
        aggregate_id: impl Into<String>,
        version: i64,
    ) -> Self {
        Self {
            event_id: Uuid::new_v4().to_string(),
            event_type: event_type.into(),
            data: None,
            timestamp: Utc::now(),
            aggregate_type: aggregate_type.into(),
            aggregate_id: aggregate_id.into(),
            version,
            metadata: None,
        }
    }

    /// Serializes `data` as the event payload.
    pub fn set_json_data<T: Serialize>(&mut self, data: &T) -> Result<()> {
        self.data = Some(serde_json::to_value(data).map_err(EsError::Payload)?);
        Ok(())
    }

    /// Deserializes the event payload into `T`. A missing payload
    /// deserializes as JSON `null`.
    pub fn get_json_data<T: DeserializeOwned>(&self) -> Result<T> {
        let value = self.data.clone().unwrap_or(serde_json::Value::Null);
        serde_json::from_value(value).map_err(EsError::Payload)
    }

    /// Serializes `metadata` as the event metadata.
    pub fn set_json_metadata<T: Serialize>(&mut self, metadata: &T) -> Result<()> {
        self.metadata = Some(serde_json::to_value(metadata).map_err(EsError::Payload)?);
        Ok(())
    }

    /// Deserializes the event metadata into `T`.
    pub fn get_json_metadata<T: DeserializeOwned>(&self) -> Result<T> {
        let value = self.metadata.clone().unwrap_or(serde_json::Value::Null);
        serde_json::from_value(value).map_err(EsError::Payload)
    }
}
