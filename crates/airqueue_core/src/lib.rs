//! Core domain logic for AirQueue.
//! Flight priority queues over an in-memory linked sequence, kept in step
//! with a SQLite record store.

pub mod db;
pub mod logging;
pub mod model;
pub mod repo;
pub mod sequence;
pub mod service;

pub use db::{open_db, open_db_in_memory, DbError, DbResult};
pub use logging::{default_log_level, init_logging, logging_status, LoggingError};
pub use model::flight::{
    EmergencyKind, Flight, FlightId, FlightKind, FlightStatus, FlightValidationError,
};
pub use model::queue::{QueueId, QueueRecord};
pub use repo::flight_store::{FlightStore, SqliteFlightStore, StoreError, StoreResult};
pub use sequence::list::{LinkedSequence, SequenceError, SequenceResult};
pub use sequence::priority::{PrioritySummary, Rank, Ranked};
pub use sequence::FlightSequence;
pub use service::flight_service::{FlightService, DEFAULT_PAGE_LIMIT};
pub use service::queue_manager::{QueueError, QueueManager, QueueResult, SharedSequence};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
