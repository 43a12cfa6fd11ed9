//! In-memory flight ordering.
//!
//! # Responsibility
//! - Own the doubly linked sequence engine and its arena cells.
//! - Apply the urgency policy on insertion and re-sort.
//! - Render ordered traversals and structural dumps.
//!
//! # Invariants
//! - Arena cells never leave this module; callers only see items.
//! - Nothing here touches the record store.

mod node;

pub mod list;
pub mod priority;
pub mod report;

use crate::model::flight::Flight;

/// Sequence specialised to queue members.
pub type FlightSequence = list::LinkedSequence<Flight>;
