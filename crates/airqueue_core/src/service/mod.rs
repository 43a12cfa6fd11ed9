//! Core use-case services.
//!
//! # Responsibility
//! - Keep cached queue order and the record store in step.
//! - Expose flight lifecycle operations on top of that layer.

pub mod flight_service;
pub mod queue_manager;
