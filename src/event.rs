use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ulid::Ulid;

use crate::connection::PortRef;

/// A graph event with timestamp
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GraphEvent {
    pub timestamp: DateTime<Utc>,
    pub event: EventType,
}

impl GraphEvent {
    /// Create a new event with the current timestamp
    pub fn new(event: EventType) -> Self {
        Self {
            timestamp: Utc::now(),
            event,
        }
    }
}

/// Types of events that can occur in the graph
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub enum EventType {
    NodeAdded {
        id: Ulid,
        type_name: String,
        name: Option<String>,
    },

    NodeRemoved {
        id: Ulid,
    },

    ContainerAdded {
        id: Ulid,
        name: String,
        parent: Option<Ulid>,
    },

    /// Node moved into a container (`None` = canvas)
    NodeAssigned {
        node: Ulid,
        container: Option<Ulid>,
    },

    ConnectionCreated {
        from: PortRef,
        to: PortRef,
    },

    ConnectionDeleted {
        from: PortRef,
        to: PortRef,
    },

    /// Downstream solver should recompute the graph
    RecomputeRequested,
}
