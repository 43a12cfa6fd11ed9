//! In-memory `FlightStore` with write-failure injection.

#![allow(dead_code)]

use airqueue_core::{Flight, FlightId, FlightStore, QueueId, QueueRecord, StoreError, StoreResult};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;
use uuid::Uuid;

#[derive(Default)]
struct Records {
    queues: Vec<QueueRecord>,
    flights: Vec<Flight>,
}

#[derive(Default)]
pub struct MemoryStore {
    records: Mutex<Records>,
    fail_writes: AtomicBool,
    member_reads: AtomicUsize,
}

impl MemoryStore {
    /// Makes every following write fail until switched off.
    pub fn fail_writes(&self, enabled: bool) {
        self.fail_writes.store(enabled, Ordering::SeqCst);
    }

    /// Number of `find_flights_by_queue_id` calls so far.
    pub fn member_reads(&self) -> usize {
        self.member_reads.load(Ordering::SeqCst)
    }

    /// Stored copy of a flight, bypassing the trait.
    pub fn stored(&self, id: FlightId) -> Option<Flight> {
        self.records
            .lock()
            .unwrap()
            .flights
            .iter()
            .find(|flight| flight.uuid == id)
            .cloned()
    }

    fn check_writable(&self) -> StoreResult<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("injected write failure".to_string()));
        }
        Ok(())
    }
}

impl FlightStore for MemoryStore {
    fn create_queue(&self, name: &str) -> StoreResult<QueueRecord> {
        self.check_writable()?;
        let queue = QueueRecord {
            uuid: Uuid::new_v4(),
            name: name.trim().to_string(),
            created_at: 0,
        };
        self.records.lock().unwrap().queues.push(queue.clone());
        Ok(queue)
    }

    fn find_queue_by_id(&self, id: QueueId) -> StoreResult<Option<QueueRecord>> {
        Ok(self
            .records
            .lock()
            .unwrap()
            .queues
            .iter()
            .find(|queue| queue.uuid == id)
            .cloned())
    }

    fn list_queues(&self) -> StoreResult<Vec<QueueRecord>> {
        Ok(self.records.lock().unwrap().queues.clone())
    }

    fn create_flight(&self, flight: &Flight) -> StoreResult<FlightId> {
        self.check_writable()?;
        flight.validate()?;
        self.records.lock().unwrap().flights.push(flight.clone());
        Ok(flight.uuid)
    }

    fn find_flight_by_id(&self, id: FlightId) -> StoreResult<Option<Flight>> {
        Ok(self.stored(id))
    }

    fn find_flight_by_code(&self, code: &str) -> StoreResult<Option<Flight>> {
        Ok(self
            .records
            .lock()
            .unwrap()
            .flights
            .iter()
            .find(|flight| flight.code == code.trim())
            .cloned())
    }

    fn find_flights_by_queue_id(&self, id: QueueId) -> StoreResult<Vec<Flight>> {
        self.member_reads.fetch_add(1, Ordering::SeqCst);
        Ok(self
            .records
            .lock()
            .unwrap()
            .flights
            .iter()
            .filter(|flight| flight.queue_uuid == Some(id))
            .cloned()
            .collect())
    }

    fn list_flights(&self, offset: u32, limit: u32) -> StoreResult<Vec<Flight>> {
        Ok(self
            .records
            .lock()
            .unwrap()
            .flights
            .iter()
            .skip(offset as usize)
            .take(limit as usize)
            .cloned()
            .collect())
    }

    fn update_flight(&self, flight: &Flight) -> StoreResult<()> {
        self.check_writable()?;
        flight.validate()?;
        let mut records = self.records.lock().unwrap();
        let slot = records
            .flights
            .iter_mut()
            .find(|stored| stored.uuid == flight.uuid)
            .ok_or(StoreError::FlightNotFound(flight.uuid))?;
        let queue_uuid = slot.queue_uuid;
        *slot = flight.clone();
        slot.queue_uuid = queue_uuid;
        Ok(())
    }

    fn set_queue(&self, flight_id: FlightId, queue_id: Option<QueueId>) -> StoreResult<()> {
        self.check_writable()?;
        let mut records = self.records.lock().unwrap();
        if let Some(queue_id) = queue_id {
            if !records.queues.iter().any(|queue| queue.uuid == queue_id) {
                return Err(StoreError::QueueNotFound(queue_id));
            }
        }
        let slot = records
            .flights
            .iter_mut()
            .find(|stored| stored.uuid == flight_id)
            .ok_or(StoreError::FlightNotFound(flight_id))?;
        slot.queue_uuid = queue_id;
        Ok(())
    }
}
