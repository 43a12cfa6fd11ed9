//! Queue record model.
//!
//! # Invariants
//! - `name` is non-blank after trim.
//! - Member flights reference the queue through `Flight::queue_uuid`; the
//!   record itself stores no ordering.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Stable identifier for one persisted queue.
pub type QueueId = Uuid;

/// Durable counterpart of an in-memory flight sequence.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueRecord {
    pub uuid: QueueId,
    /// User-facing label, e.g. `Runway 18L departures`.
    pub name: String,
    /// Epoch ms creation timestamp.
    pub created_at: i64,
}

/// Trims a queue name, returning `None` when nothing is left.
pub fn normalize_queue_name(name: &str) -> Option<String> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}
