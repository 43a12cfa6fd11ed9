//! Record store abstraction and persistence implementation.
//!
//! # Responsibility
//! - Define the keyed get/insert/update contract the synchronization layer
//!   consumes.
//! - Isolate SQLite query details from queue orchestration.
//!
//! # Invariants
//! - Store writes enforce `Flight::validate()` before persistence.
//! - Store APIs return semantic errors (`FlightNotFound`, `QueueNotFound`) in
//!   addition to DB transport errors.

pub mod flight_store;
