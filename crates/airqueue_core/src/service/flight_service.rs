//! Flight use-case service.
//!
//! # Responsibility
//! - Provide lifecycle entry points (register, status, emergency, delay).
//! - Keep cached queue order consistent after a flight changes urgency.
//!
//! # Invariants
//! - Every mutation is persisted before the cached queue is touched, under
//!   that queue's write lock.
//! - Service APIs never bypass store validation.

use crate::model::flight::{EmergencyKind, Flight, FlightId, FlightStatus};
use crate::model::queue::QueueId;
use crate::repo::flight_store::FlightStore;
use crate::service::queue_manager::{write_error, QueueError, QueueManager, QueueResult};
use log::info;

/// Page size used when a listing does not name one.
pub const DEFAULT_PAGE_LIMIT: u32 = 100;

/// Use-case wrapper over a shared queue manager.
pub struct FlightService<'m, S: FlightStore> {
    manager: &'m QueueManager<S>,
}

impl<'m, S: FlightStore> FlightService<'m, S> {
    pub fn new(manager: &'m QueueManager<S>) -> Self {
        Self { manager }
    }

    /// Validates and persists a new flight record.
    ///
    /// Registration does not enqueue; use the manager's insert operations.
    pub fn register_flight(&self, flight: &Flight) -> QueueResult<FlightId> {
        let id = self
            .manager
            .store()
            .create_flight(flight)
            .map_err(write_error)?;
        info!("event=flight_register module=flight status=ok flight_id={id}");
        Ok(id)
    }

    pub fn get_flight(&self, id: FlightId) -> QueueResult<Flight> {
        self.manager
            .store()
            .find_flight_by_id(id)?
            .ok_or(QueueError::FlightNotFound(id))
    }

    pub fn get_flight_by_code(&self, code: &str) -> QueueResult<Flight> {
        self.manager
            .store()
            .find_flight_by_code(code)?
            .ok_or_else(|| QueueError::FlightCodeNotFound(code.trim().to_string()))
    }

    /// Lists registered flights in registration order.
    ///
    /// `limit` defaults to `DEFAULT_PAGE_LIMIT`.
    pub fn list_flights(&self, offset: u32, limit: Option<u32>) -> QueueResult<Vec<Flight>> {
        let limit = limit.unwrap_or(DEFAULT_PAGE_LIMIT);
        Ok(self.manager.store().list_flights(offset, limit)?)
    }

    /// Sets a new status and re-sorts the flight's queue.
    pub fn update_status(&self, id: FlightId, status: FlightStatus) -> QueueResult<Flight> {
        let flight = self
            .manager
            .update_flight(id, |flight| flight.set_status(status))?;
        log_change("flight_status", &flight);
        Ok(flight)
    }

    /// Marks a flight as an emergency; it moves to the emergency block.
    pub fn declare_emergency(&self, code: &str, kind: EmergencyKind) -> QueueResult<Flight> {
        let id = self.get_flight_by_code(code)?.uuid;
        let flight = self
            .manager
            .update_flight(id, |flight| flight.declare_emergency(kind))?;
        log_change("flight_emergency", &flight);
        Ok(flight)
    }

    /// Accumulates a delay in minutes.
    pub fn apply_delay(&self, code: &str, minutes: u32) -> QueueResult<Flight> {
        let id = self.get_flight_by_code(code)?.uuid;
        let flight = self
            .manager
            .update_flight(id, |flight| flight.apply_delay(minutes))?;
        log_change("flight_delay", &flight);
        Ok(flight)
    }

    /// Flight to be served next in a queue.
    pub fn next_flight(&self, queue_id: QueueId) -> QueueResult<Flight> {
        self.manager.get_first(queue_id)
    }
}

fn log_change(event: &str, flight: &Flight) {
    info!(
        "event={event} module=flight status=ok flight_id={} flight_status={} queue_id={}",
        flight.uuid,
        flight.status.label(),
        flight
            .queue_uuid
            .map_or_else(|| "none".to_string(), |queue_id| queue_id.to_string())
    );
}
