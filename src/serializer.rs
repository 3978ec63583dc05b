//! Invertible encoding of history events and event batches to opaque bytes.
//!
//! The wire format is deliberately out of scope for the engine: persistence
//! stores whatever bytes come out of the serializer and hands them back
//! unchanged. One JSON implementation suffices; the trait exists so a binary
//! codec can be swapped in without touching the state machine.

use crate::errors::SerializationError;
use crate::HistoryEvent;
use serde::{Deserialize, Serialize};

/// Default version stamped on newly serialized event batches.
pub const DEFAULT_HISTORY_VERSION: i32 = 1;

const ENCODING_JSON: &str = "json";

/// A batch of history events before encoding.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventBatch {
    pub version: i32,
    pub events: Vec<HistoryEvent>,
}

impl EventBatch {
    pub fn new(version: i32, events: Vec<HistoryEvent>) -> Self {
        Self { version, events }
    }
}

/// An encoded batch as persistence stores it: opaque bytes plus the encoding
/// tag and batch version needed to decode them later.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SerializedEventBatch {
    pub version: i32,
    pub encoding: String,
    pub data: Vec<u8>,
}

/// Capability for encoding single events and event batches. Implementations
/// are stateless and shared.
pub trait EventSerializer: Send + Sync {
    fn serialize(&self, event: &HistoryEvent) -> Result<Vec<u8>, SerializationError>;
    fn deserialize(&self, data: &[u8]) -> Result<HistoryEvent, SerializationError>;
    fn serialize_batch(&self, batch: &EventBatch) -> Result<SerializedEventBatch, SerializationError>;
    fn deserialize_batch(&self, batch: &SerializedEventBatch) -> Result<EventBatch, SerializationError>;
}

/// JSON event serializer; the default encoding.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonEventSerializer;

impl EventSerializer for JsonEventSerializer {
    fn serialize(&self, event: &HistoryEvent) -> Result<Vec<u8>, SerializationError> {
        serde_json::to_vec(event).map_err(SerializationError::Encode)
    }

    fn deserialize(&self, data: &[u8]) -> Result<HistoryEvent, SerializationError> {
        serde_json::from_slice(data).map_err(SerializationError::Decode)
    }

    fn serialize_batch(&self, batch: &EventBatch) -> Result<SerializedEventBatch, SerializationError> {
        let data = serde_json::to_vec(&batch.events).map_err(SerializationError::Encode)?;
        Ok(SerializedEventBatch {
            version: batch.version,
            encoding: ENCODING_JSON.to_string(),
            data,
        })
    }

    fn deserialize_batch(&self, batch: &SerializedEventBatch) -> Result<EventBatch, SerializationError> {
        if batch.encoding != ENCODING_JSON {
            return Err(SerializationError::UnsupportedEncoding(batch.encoding.clone()));
        }
        let events: Vec<HistoryEvent> = serde_json::from_slice(&batch.data).map_err(SerializationError::Decode)?;
        Ok(EventBatch::new(batch.version, events))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{EventAttributes, FIRST_EVENT_ID};

    fn sample_event() -> HistoryEvent {
        HistoryEvent {
            event_id: FIRST_EVENT_ID,
            timestamp: 42,
            attributes: EventAttributes::TimerStarted {
                timer_id: "t1".to_string(),
                start_to_fire_timeout_seconds: 30,
                decision_task_completed_event_id: 4,
            },
        }
    }

    #[test]
    fn single_event_round_trip() {
        let serializer = JsonEventSerializer;
        let event = sample_event();
        let bytes = serializer.serialize(&event).unwrap();
        let decoded = serializer.deserialize(&bytes).unwrap();
        assert_eq!(event, decoded);
    }

    #[test]
    fn batch_round_trip_preserves_order() {
        let serializer = JsonEventSerializer;
        let mut second = sample_event();
        second.event_id = 2;
        let batch = EventBatch::new(DEFAULT_HISTORY_VERSION, vec![sample_event(), second]);
        let encoded = serializer.serialize_batch(&batch).unwrap();
        assert_eq!(encoded.encoding, "json");
        let decoded = serializer.deserialize_batch(&encoded).unwrap();
        assert_eq!(batch, decoded);
    }

    #[test]
    fn unknown_encoding_is_rejected() {
        let serializer = JsonEventSerializer;
        let batch = SerializedEventBatch {
            version: DEFAULT_HISTORY_VERSION,
            encoding: "thrift".to_string(),
            data: vec![],
        };
        let err = serializer.deserialize_batch(&batch).unwrap_err();
        assert!(matches!(err, SerializationError::UnsupportedEncoding(_)));
    }
}
