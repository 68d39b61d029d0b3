use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Who published an event, and when.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventMetadata {
    pub source: String,
    pub timestamp: DateTime<Utc>,
}

impl EventMetadata {
    pub fn new(source: impl Into<String>, timestamp: DateTime<Utc>) -> Self {
        Self {
            source: source.into(),
            timestamp,
        }
    }
}

/// A named event on the cross-app bus.
///
/// Events are facts: subscribers filter on `name` and must not assume they
/// saw every earlier event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BusEvent<P> {
    pub id: Uuid,
    pub name: String,
    pub payload: P,
    pub metadata: EventMetadata,
}

impl<P> BusEvent<P> {
    pub fn new(name: impl Into<String>, payload: P, metadata: EventMetadata) -> Self {
        Self {
            id: Uuid::now_v7(),
            name: name.into(),
            payload,
            metadata,
        }
    }

    pub fn is(&self, name: &str) -> bool {
        self.name == name
    }
}
