//! Synchronization layer between cached flight sequences and the record store.
//!
//! # Responsibility
//! - Resolve a queue id to a ready sequence, loading it lazily from storage.
//! - Apply membership changes to the store before touching memory.
//! - Rebuild cached order on demand from storage.
//!
//! # Invariants
//! - A failed store write leaves the cached sequence untouched.
//! - Every mutation on one queue holds that sequence's write lock for the
//!   whole store-write-plus-mutation step.
//! - The cache lock is never held while a sequence lock is being acquired.
//! - Membership is written through `FlightStore::set_queue` only, and
//!   linked snapshots are read back from the store under the queue lock.
//! - Manual order (positional inserts, moves) lives only in memory and is
//!   lost on invalidation; priority order is rebuildable from storage.

use crate::model::flight::{Flight, FlightId, FlightValidationError};
use crate::model::queue::{normalize_queue_name, QueueId, QueueRecord};
use crate::repo::flight_store::{FlightStore, StoreError};
use crate::sequence::list::SequenceError;
use crate::sequence::priority::PrioritySummary;
use crate::sequence::FlightSequence;
use log::{debug, info, warn};
use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::sync::{Arc, PoisonError, RwLock};

/// Lockable handle to one cached queue order.
pub type SharedSequence = Arc<RwLock<FlightSequence>>;

pub type QueueResult<T> = Result<T, QueueError>;

/// Errors from queue synchronization and flight use-cases.
#[derive(Debug)]
pub enum QueueError {
    /// Queue id is absent from the record store.
    QueueNotFound(QueueId),
    /// Flight id is absent from the record store or the queue.
    FlightNotFound(FlightId),
    /// No flight carries this code.
    FlightCodeNotFound(String),
    /// Read or removal on an empty queue.
    Empty,
    /// Position outside the queue bounds.
    OutOfRange { position: i64, len: usize },
    /// Queue name is blank after trim.
    InvalidQueueName,
    /// Flight failed record-level validation.
    Validation(FlightValidationError),
    /// Store write failed; in-memory state was not changed.
    StoreWrite(StoreError),
    /// Store read failed.
    Store(StoreError),
    /// A thread panicked while holding a queue lock.
    LockPoisoned,
}

impl Display for QueueError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::QueueNotFound(id) => write!(f, "queue not found: {id}"),
            Self::FlightNotFound(id) => write!(f, "flight not found: {id}"),
            Self::FlightCodeNotFound(code) => write!(f, "flight not found: {code}"),
            Self::Empty => write!(f, "queue is empty"),
            Self::OutOfRange { position, len } => {
                write!(f, "position {position} is out of range for queue length {len}")
            }
            Self::InvalidQueueName => write!(f, "queue name must not be blank"),
            Self::Validation(err) => write!(f, "{err}"),
            Self::StoreWrite(err) => write!(f, "record store write failed: {err}"),
            Self::Store(err) => write!(f, "{err}"),
            Self::LockPoisoned => write!(f, "queue lock poisoned"),
        }
    }
}

impl Error for QueueError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::StoreWrite(err) | Self::Store(err) => Some(err),
            _ => None,
        }
    }
}

impl From<SequenceError> for QueueError {
    fn from(value: SequenceError) -> Self {
        match value {
            SequenceError::Empty => Self::Empty,
            SequenceError::OutOfRange { position, len } => Self::OutOfRange { position, len },
        }
    }
}

impl From<StoreError> for QueueError {
    fn from(value: StoreError) -> Self {
        match value {
            StoreError::QueueNotFound(id) => Self::QueueNotFound(id),
            StoreError::FlightNotFound(id) => Self::FlightNotFound(id),
            StoreError::InvalidQueueName => Self::InvalidQueueName,
            StoreError::Validation(err) => Self::Validation(err),
            other => Self::Store(other),
        }
    }
}

impl<T> From<PoisonError<T>> for QueueError {
    fn from(_: PoisonError<T>) -> Self {
        Self::LockPoisoned
    }
}

/// Maps a failed store write, keeping semantic failures distinguishable.
pub(crate) fn write_error(err: StoreError) -> QueueError {
    match err {
        StoreError::FlightNotFound(id) => QueueError::FlightNotFound(id),
        StoreError::QueueNotFound(id) => QueueError::QueueNotFound(id),
        StoreError::Validation(err) => QueueError::Validation(err),
        other => QueueError::StoreWrite(other),
    }
}

#[derive(Debug, Clone, Copy)]
enum Placement {
    First,
    Last,
    At(i64),
    ByPriority,
}

impl Placement {
    fn label(self) -> &'static str {
        match self {
            Self::First => "first",
            Self::Last => "last",
            Self::At(_) => "position",
            Self::ByPriority => "priority",
        }
    }
}

/// Keyed cache of flight sequences backed by a record store.
///
/// Construct one per application and share it by reference. It is `Sync`
/// only when the store is: `SqliteFlightStore` borrows a `!Sync`
/// `rusqlite::Connection`, so with SQLite the manager stays on one thread
/// and the per-queue locks matter for `Sync` stores only.
pub struct QueueManager<S: FlightStore> {
    store: S,
    cache: RwLock<HashMap<QueueId, SharedSequence>>,
}

impl<S: FlightStore> QueueManager<S> {
    pub fn new(store: S) -> Self {
        Self {
            store,
            cache: RwLock::new(HashMap::new()),
        }
    }

    /// Backing record store.
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Creates an empty queue record.
    pub fn create_queue(&self, name: &str) -> QueueResult<QueueRecord> {
        let name = normalize_queue_name(name).ok_or(QueueError::InvalidQueueName)?;
        let queue = self.store.create_queue(&name).map_err(write_error)?;
        info!(
            "event=queue_create module=queue status=ok queue_id={}",
            queue.uuid
        );
        Ok(queue)
    }

    pub fn list_queues(&self) -> QueueResult<Vec<QueueRecord>> {
        Ok(self.store.list_queues()?)
    }

    /// Returns the cached sequence, loading it from storage on a miss.
    ///
    /// A hit never re-reads storage. Use `invalidate` or
    /// `reorder_by_priority` to pick up out-of-band store changes.
    pub fn get_or_load(&self, queue_id: QueueId) -> QueueResult<SharedSequence> {
        if let Some(shared) = self.cached(queue_id)? {
            return Ok(shared);
        }

        let (sequence, summary) = self.load_from_store(queue_id)?;
        let mut cache = self.cache.write()?;
        let shared = cache
            .entry(queue_id)
            .or_insert_with(|| Arc::new(RwLock::new(sequence)));
        info!(
            "event=queue_load module=queue status=ok queue_id={queue_id} size={} emergency={} urgent={} regular={} other={}",
            summary.total, summary.emergency, summary.urgent, summary.regular, summary.other
        );
        Ok(Arc::clone(shared))
    }

    /// Evicts one cached sequence. Returns whether an entry existed.
    pub fn invalidate(&self, queue_id: QueueId) -> QueueResult<bool> {
        let removed = self.cache.write()?.remove(&queue_id).is_some();
        debug!("event=queue_invalidate module=queue status=ok queue_id={queue_id} evicted={removed}");
        Ok(removed)
    }

    /// Evicts every cached sequence. Returns the number evicted.
    pub fn invalidate_all(&self) -> QueueResult<usize> {
        let mut cache = self.cache.write()?;
        let evicted = cache.len();
        cache.clear();
        debug!("event=queue_invalidate_all module=queue status=ok evicted={evicted}");
        Ok(evicted)
    }

    pub fn is_cached(&self, queue_id: QueueId) -> QueueResult<bool> {
        Ok(self.cache.read()?.contains_key(&queue_id))
    }

    /// Persists membership, then links the flight after the header.
    pub fn add_first(&self, queue_id: QueueId, flight: Flight) -> QueueResult<Flight> {
        self.attach(queue_id, flight, Placement::First)
    }

    /// Persists membership, then links the flight before the trailer.
    pub fn add_last(&self, queue_id: QueueId, flight: Flight) -> QueueResult<Flight> {
        self.attach(queue_id, flight, Placement::Last)
    }

    /// Persists membership, then links the flight at a clamped position.
    pub fn insert_at(&self, queue_id: QueueId, position: i64, flight: Flight) -> QueueResult<Flight> {
        self.attach(queue_id, flight, Placement::At(position))
    }

    /// Persists membership, then links the flight at the back of its rank block.
    pub fn insert_by_priority(&self, queue_id: QueueId, flight: Flight) -> QueueResult<Flight> {
        self.attach(queue_id, flight, Placement::ByPriority)
    }

    /// Unlinks the flight at `position` and clears its membership.
    pub fn remove_at(&self, queue_id: QueueId, position: i64) -> QueueResult<Flight> {
        self.detach(queue_id, |sequence| {
            sequence.get_at(position)?;
            Ok(position)
        })
    }

    pub fn remove_first(&self, queue_id: QueueId) -> QueueResult<Flight> {
        self.detach(queue_id, |sequence| {
            sequence.get_first()?;
            Ok(0)
        })
    }

    pub fn remove_last(&self, queue_id: QueueId) -> QueueResult<Flight> {
        self.detach(queue_id, |sequence| {
            sequence.get_last()?;
            Ok(sequence.len() as i64 - 1)
        })
    }

    /// Unlinks one flight by id and clears its membership.
    pub fn remove_flight(&self, queue_id: QueueId, flight_id: FlightId) -> QueueResult<Flight> {
        self.detach(queue_id, |sequence| {
            sequence
                .position_of(|flight| flight.uuid == flight_id)
                .map(|position| position as i64)
                .ok_or(QueueError::FlightNotFound(flight_id))
        })
    }

    /// Moves one flight inside the cached order. Not persisted.
    pub fn move_flight(&self, queue_id: QueueId, from: i64, to: i64) -> QueueResult<()> {
        let shared = self.get_or_load(queue_id)?;
        let mut sequence = shared.write()?;
        sequence.move_item(from, to)?;
        debug!("event=queue_move module=queue status=ok queue_id={queue_id} from={from} to={to}");
        Ok(())
    }

    pub fn size(&self, queue_id: QueueId) -> QueueResult<usize> {
        self.read(queue_id, |sequence| Ok(sequence.len()))
    }

    pub fn get_first(&self, queue_id: QueueId) -> QueueResult<Flight> {
        self.read(queue_id, |sequence| Ok(sequence.get_first()?.clone()))
    }

    pub fn get_last(&self, queue_id: QueueId) -> QueueResult<Flight> {
        self.read(queue_id, |sequence| Ok(sequence.get_last()?.clone()))
    }

    pub fn get_at(&self, queue_id: QueueId, position: i64) -> QueueResult<Flight> {
        self.read(queue_id, |sequence| Ok(sequence.get_at(position)?.clone()))
    }

    /// Snapshot of the queue in serving order.
    pub fn list_flights(&self, queue_id: QueueId) -> QueueResult<Vec<Flight>> {
        self.read(queue_id, |sequence| Ok(sequence.to_vec()))
    }

    /// Structural dump of the cached order, for diagnostics.
    pub fn visualize(&self, queue_id: QueueId) -> QueueResult<String> {
        self.read(queue_id, |sequence| Ok(sequence.visualize()))
    }

    /// Rebuilds the queue from storage, bypassing the cache.
    ///
    /// Outstanding handles from `get_or_load` observe the rebuilt order.
    pub fn reorder_by_priority(&self, queue_id: QueueId) -> QueueResult<PrioritySummary> {
        let summary = match self.cached(queue_id)? {
            Some(shared) => self.rebuild_in_place(queue_id, &shared)?,
            None => {
                let (rebuilt, summary) = self.load_from_store(queue_id)?;
                let loaded_meanwhile = match self.cache.write()?.entry(queue_id) {
                    Entry::Vacant(slot) => {
                        slot.insert(Arc::new(RwLock::new(rebuilt)));
                        None
                    }
                    Entry::Occupied(slot) => Some(Arc::clone(slot.get())),
                };
                // A concurrent load may have let members change after our read.
                match loaded_meanwhile {
                    Some(shared) => self.rebuild_in_place(queue_id, &shared)?,
                    None => summary,
                }
            }
        };

        info!(
            "event=queue_reorder module=queue status=ok queue_id={queue_id} size={} emergency={} urgent={} regular={} other={}",
            summary.total, summary.emergency, summary.urgent, summary.regular, summary.other
        );
        Ok(summary)
    }

    /// Applies `change` to a stored flight, persists it, and re-sorts the
    /// queue it belongs to.
    ///
    /// The member queue's write lock is held across the read, the write and
    /// the re-sort. Membership is not part of the write; `change` edits to
    /// `queue_uuid` are ignored.
    pub fn update_flight(
        &self,
        flight_id: FlightId,
        change: impl FnOnce(&mut Flight),
    ) -> QueueResult<Flight> {
        let mut member_of = self.stored_flight(flight_id)?.queue_uuid;
        loop {
            let shared = member_of.map(|queue_id| self.get_or_load(queue_id)).transpose()?;
            let mut sequence = match &shared {
                Some(shared) => Some(shared.write()?),
                None => None,
            };

            let mut flight = self.stored_flight(flight_id)?;
            if flight.queue_uuid != member_of {
                member_of = flight.queue_uuid;
                continue;
            }

            change(&mut flight);
            flight.queue_uuid = member_of;
            self.store.update_flight(&flight).map_err(write_error)?;
            if let Some(sequence) = sequence.as_mut() {
                resort_with(sequence, &flight)?;
            }

            debug!(
                "event=flight_update module=queue status=ok flight_id={flight_id} queue_resorted={}",
                sequence.is_some()
            );
            return Ok(flight);
        }
    }

    /// Replaces a flight's cached snapshot after an out-of-band change and
    /// re-sorts its queue in memory.
    ///
    /// Returns `false` when the flight has no queue or the queue is not
    /// cached; the next load picks the change up from storage.
    pub fn refresh_flight(&self, flight: &Flight) -> QueueResult<bool> {
        let Some(queue_id) = flight.queue_uuid else {
            return Ok(false);
        };
        let Some(shared) = self.cached(queue_id)? else {
            return Ok(false);
        };

        resort_with(&mut *shared.write()?, flight)?;
        debug!(
            "event=queue_refresh module=queue status=ok queue_id={queue_id} flight_id={}",
            flight.uuid
        );
        Ok(true)
    }

    fn cached(&self, queue_id: QueueId) -> QueueResult<Option<SharedSequence>> {
        Ok(self.cache.read()?.get(&queue_id).cloned())
    }

    fn load_from_store(&self, queue_id: QueueId) -> QueueResult<(FlightSequence, PrioritySummary)> {
        self.store
            .find_queue_by_id(queue_id)?
            .ok_or(QueueError::QueueNotFound(queue_id))?;
        let flights = self.store.find_flights_by_queue_id(queue_id)?;
        Ok(FlightSequence::from_rank_buckets(flights))
    }

    fn read<R>(
        &self,
        queue_id: QueueId,
        reader: impl FnOnce(&FlightSequence) -> QueueResult<R>,
    ) -> QueueResult<R> {
        let shared = self.get_or_load(queue_id)?;
        let sequence = shared.read()?;
        reader(&*sequence)
    }

    fn stored_flight(&self, flight_id: FlightId) -> QueueResult<Flight> {
        self.store
            .find_flight_by_id(flight_id)?
            .ok_or(QueueError::FlightNotFound(flight_id))
    }

    fn rebuild_in_place(
        &self,
        queue_id: QueueId,
        shared: &SharedSequence,
    ) -> QueueResult<PrioritySummary> {
        let mut sequence = shared.write()?;
        let (rebuilt, summary) = self.load_from_store(queue_id)?;
        *sequence = rebuilt;
        Ok(summary)
    }

    /// Links the stored record of `flight`; only its id is taken from the
    /// argument.
    fn attach(&self, queue_id: QueueId, flight: Flight, placement: Placement) -> QueueResult<Flight> {
        let shared = self.get_or_load(queue_id)?;
        let mut sequence = shared.write()?;

        let mut member = self.stored_flight(flight.uuid)?;
        let previous_queue = member.queue_uuid.filter(|previous| *previous != queue_id);
        if let Err(err) = self.store.set_queue(member.uuid, Some(queue_id)) {
            warn!(
                "event=queue_attach module=queue status=error queue_id={queue_id} flight_id={} placement={} error={err}",
                member.uuid,
                placement.label()
            );
            return Err(write_error(err));
        }
        member.queue_uuid = Some(queue_id);

        if let Some(existing) = sequence.position_of(|current| current.uuid == member.uuid) {
            sequence.remove_at(existing as i64)?;
        }
        match placement {
            Placement::First => sequence.add_first(member.clone()),
            Placement::Last => sequence.add_last(member.clone()),
            Placement::At(position) => sequence.insert_at(position, member.clone()),
            Placement::ByPriority => sequence.insert_by_priority(member.clone()),
        }
        let size = sequence.len();
        drop(sequence);

        if let Some(previous) = previous_queue {
            self.forget_member(previous, member.uuid)?;
        }

        info!(
            "event=queue_attach module=queue status=ok queue_id={queue_id} flight_id={} placement={} size={size}",
            member.uuid,
            placement.label()
        );
        Ok(member)
    }

    fn detach(
        &self,
        queue_id: QueueId,
        locate: impl FnOnce(&FlightSequence) -> QueueResult<i64>,
    ) -> QueueResult<Flight> {
        let shared = self.get_or_load(queue_id)?;
        let mut sequence = shared.write()?;

        let position = locate(&*sequence)?;
        let flight_id = sequence.get_at(position)?.uuid;
        let mut flight = self.stored_flight(flight_id)?;
        if let Err(err) = self.store.set_queue(flight_id, None) {
            warn!(
                "event=queue_detach module=queue status=error queue_id={queue_id} flight_id={flight_id} error={err}"
            );
            return Err(write_error(err));
        }
        flight.queue_uuid = None;
        sequence.remove_at(position)?;

        info!(
            "event=queue_detach module=queue status=ok queue_id={queue_id} flight_id={flight_id} position={position} size={}",
            sequence.len()
        );
        Ok(flight)
    }

    /// Drops a flight that moved to another queue from a cached sequence.
    fn forget_member(&self, queue_id: QueueId, flight_id: FlightId) -> QueueResult<()> {
        let Some(shared) = self.cached(queue_id)? else {
            return Ok(());
        };
        let mut sequence = shared.write()?;
        if let Some(position) = sequence.position_of(|flight| flight.uuid == flight_id) {
            sequence.remove_at(position as i64)?;
        }
        Ok(())
    }
}

/// Swaps in a fresh snapshot of `flight` and re-sorts by rank.
fn resort_with(sequence: &mut FlightSequence, flight: &Flight) -> QueueResult<()> {
    match sequence.position_of(|current| current.uuid == flight.uuid) {
        Some(position) => *sequence.get_at_mut(position as i64)? = flight.clone(),
        None => sequence.add_last(flight.clone()),
    }
    sequence.reorder_by_priority();
    Ok(())
}
