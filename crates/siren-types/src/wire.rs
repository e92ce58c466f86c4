use serde::{Deserialize, Serialize};

use crate::models::{AlertRecord, Role};

/// Commands sent FROM the client TO the dispatch service.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "snake_case")]
pub enum ClientCommand {
    /// Bind the active identity to this connection.
    Auth { role: Role, id: String },

    /// Start receiving pushes for the given region topics.
    Subscribe { topics: Vec<String> },

    /// Stop receiving pushes for the given region topics.
    Unsubscribe { topics: Vec<String> },
}

/// Events pushed FROM the dispatch service TO the client.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "snake_case")]
pub enum ServerEvent {
    /// Full snapshot of alerts visible to this client, sent after auth.
    InitialAlerts(Vec<AlertRecord>),

    /// A new alert entered one of the subscribed regions.
    AlertCreated(AlertRecord),

    /// An existing alert changed (status, acceptance, routing).
    AlertUpdated(AlertRecord),

    /// An alert was removed server-side.
    AlertDeleted { id: i64 },
}
