//! Flight and queue domain model.
//!
//! # Responsibility
//! - Define canonical data structures shared by the sequence engine, the
//!   record store and the synchronization layer.
//!
//! # Invariants
//! - Every flight and queue is identified by a stable UUID.
//! - Cached flight snapshots are replaced, never edited field by field.

pub mod flight;
pub mod queue;
