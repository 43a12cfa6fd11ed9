//! Record store contracts and SQLite implementation.
//!
//! # Responsibility
//! - Provide keyed get/insert/update APIs over `queues` and `flights`.
//! - Keep SQL details inside the persistence boundary.
//!
//! # Invariants
//! - Write paths call `Flight::validate()` before SQL mutations.
//! - Read paths reject invalid persisted state instead of masking it.
//! - After insert, `queue_uuid` is written only by `set_queue`.
//! - Member listing follows storage insertion order; it carries no queue
//!   order, which lives only in memory.

use crate::db::migrations::{current_user_version, latest_version};
use crate::db::DbError;
use crate::model::flight::{
    EmergencyKind, Flight, FlightId, FlightKind, FlightStatus, FlightValidationError,
};
use crate::model::queue::{normalize_queue_name, QueueId, QueueRecord};
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

const FLIGHT_SELECT_SQL: &str = "SELECT
    uuid,
    code,
    airline,
    origin,
    destination,
    kind,
    scheduled_at,
    status,
    emergency,
    delay_minutes,
    gate,
    queue_uuid
FROM flights";

const QUEUE_SELECT_SQL: &str = "SELECT uuid, name, created_at FROM queues";

pub type StoreResult<T> = Result<T, StoreError>;

/// Errors from record store operations.
#[derive(Debug)]
pub enum StoreError {
    /// Underlying SQLite/bootstrap error.
    Db(DbError),
    /// Flight failed record-level validation.
    Validation(FlightValidationError),
    /// No flight row matched the key.
    FlightNotFound(FlightId),
    /// No queue row matched the key.
    QueueNotFound(QueueId),
    /// Queue name is blank after trim.
    InvalidQueueName,
    /// Persisted data cannot be converted into a valid model.
    InvalidData(String),
    /// Connection schema is not at the expected migrated version.
    UninitializedConnection {
        expected_version: u32,
        actual_version: u32,
    },
    /// Non-SQLite backend could not serve the request.
    Unavailable(String),
}

impl Display for StoreError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Db(err) => write!(f, "{err}"),
            Self::Validation(err) => write!(f, "{err}"),
            Self::FlightNotFound(id) => write!(f, "flight not found: {id}"),
            Self::QueueNotFound(id) => write!(f, "queue not found: {id}"),
            Self::InvalidQueueName => write!(f, "queue name must not be blank"),
            Self::InvalidData(message) => write!(f, "invalid persisted flight data: {message}"),
            Self::UninitializedConnection {
                expected_version,
                actual_version,
            } => write!(
                f,
                "record store requires schema version {expected_version}, got {actual_version}"
            ),
            Self::Unavailable(message) => write!(f, "record store unavailable: {message}"),
        }
    }
}

impl Error for StoreError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Db(err) => Some(err),
            Self::Validation(err) => Some(err),
            _ => None,
        }
    }
}

impl From<DbError> for StoreError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for StoreError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

impl From<FlightValidationError> for StoreError {
    fn from(value: FlightValidationError) -> Self {
        Self::Validation(value)
    }
}

/// Durable record store consumed by the synchronization layer.
pub trait FlightStore {
    /// Creates one queue record with a generated id.
    fn create_queue(&self, name: &str) -> StoreResult<QueueRecord>;
    /// Loads one queue record by id.
    fn find_queue_by_id(&self, id: QueueId) -> StoreResult<Option<QueueRecord>>;
    /// Lists every queue record, oldest first.
    fn list_queues(&self) -> StoreResult<Vec<QueueRecord>>;
    /// Inserts one flight record.
    fn create_flight(&self, flight: &Flight) -> StoreResult<FlightId>;
    /// Loads one flight by id.
    fn find_flight_by_id(&self, id: FlightId) -> StoreResult<Option<Flight>>;
    /// Loads one flight by its unique code.
    fn find_flight_by_code(&self, code: &str) -> StoreResult<Option<Flight>>;
    /// Lists flights whose membership key points at `id`, in storage order.
    fn find_flights_by_queue_id(&self, id: QueueId) -> StoreResult<Vec<Flight>>;
    /// Lists every flight in storage order, one page at a time.
    fn list_flights(&self, offset: u32, limit: u32) -> StoreResult<Vec<Flight>>;
    /// Persists every mutable field except the membership key.
    fn update_flight(&self, flight: &Flight) -> StoreResult<()>;
    /// Points the membership key at `queue_id`, or clears it.
    fn set_queue(&self, flight_id: FlightId, queue_id: Option<QueueId>) -> StoreResult<()>;
}

/// SQLite-backed record store.
pub struct SqliteFlightStore<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteFlightStore<'conn> {
    /// Creates a store from a migrated connection.
    pub fn try_new(conn: &'conn Connection) -> StoreResult<Self> {
        let expected_version = latest_version();
        let actual_version = current_user_version(conn)?;
        if actual_version != expected_version {
            return Err(StoreError::UninitializedConnection {
                expected_version,
                actual_version,
            });
        }
        Ok(Self { conn })
    }
}

impl FlightStore for SqliteFlightStore<'_> {
    fn create_queue(&self, name: &str) -> StoreResult<QueueRecord> {
        let name = normalize_queue_name(name).ok_or(StoreError::InvalidQueueName)?;
        let uuid = Uuid::new_v4();
        self.conn.execute(
            "INSERT INTO queues (uuid, name) VALUES (?1, ?2);",
            params![uuid.to_string(), name],
        )?;

        self.find_queue_by_id(uuid)?
            .ok_or(StoreError::QueueNotFound(uuid))
    }

    fn find_queue_by_id(&self, id: QueueId) -> StoreResult<Option<QueueRecord>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{QUEUE_SELECT_SQL} WHERE uuid = ?1;"))?;
        let mut rows = stmt.query([id.to_string()])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(parse_queue_row(row)?));
        }
        Ok(None)
    }

    fn list_queues(&self) -> StoreResult<Vec<QueueRecord>> {
        let mut stmt = self.conn.prepare(&format!(
            "{QUEUE_SELECT_SQL} ORDER BY created_at ASC, rowid ASC;"
        ))?;
        let mut rows = stmt.query([])?;
        let mut queues = Vec::new();
        while let Some(row) = rows.next()? {
            queues.push(parse_queue_row(row)?);
        }
        Ok(queues)
    }

    fn create_flight(&self, flight: &Flight) -> StoreResult<FlightId> {
        flight.validate()?;

        self.conn.execute(
            "INSERT INTO flights (
                uuid,
                code,
                airline,
                origin,
                destination,
                kind,
                scheduled_at,
                status,
                emergency,
                delay_minutes,
                gate,
                queue_uuid
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12);",
            params![
                flight.uuid.to_string(),
                flight.code.as_str(),
                flight.airline.as_deref(),
                flight.origin.trim(),
                flight.destination.trim(),
                flight_kind_to_db(flight.kind),
                flight.scheduled_at,
                flight_status_to_db(flight.status),
                flight.emergency.map(emergency_kind_to_db),
                flight.delay_minutes,
                flight.gate.as_deref(),
                flight.queue_uuid.map(|value| value.to_string()),
            ],
        )?;

        Ok(flight.uuid)
    }

    fn find_flight_by_id(&self, id: FlightId) -> StoreResult<Option<Flight>> {
        self.conn
            .query_row(
                &format!("{FLIGHT_SELECT_SQL} WHERE uuid = ?1;"),
                [id.to_string()],
                |row| Ok(parse_flight_row(row)),
            )
            .optional()?
            .transpose()
    }

    fn find_flight_by_code(&self, code: &str) -> StoreResult<Option<Flight>> {
        self.conn
            .query_row(
                &format!("{FLIGHT_SELECT_SQL} WHERE code = ?1;"),
                [code.trim()],
                |row| Ok(parse_flight_row(row)),
            )
            .optional()?
            .transpose()
    }

    fn find_flights_by_queue_id(&self, id: QueueId) -> StoreResult<Vec<Flight>> {
        let mut stmt = self.conn.prepare(&format!(
            "{FLIGHT_SELECT_SQL} WHERE queue_uuid = ?1 ORDER BY rowid ASC;"
        ))?;
        let mut rows = stmt.query([id.to_string()])?;
        let mut flights = Vec::new();
        while let Some(row) = rows.next()? {
            flights.push(parse_flight_row(row)?);
        }
        Ok(flights)
    }

    fn list_flights(&self, offset: u32, limit: u32) -> StoreResult<Vec<Flight>> {
        let mut stmt = self.conn.prepare(&format!(
            "{FLIGHT_SELECT_SQL} ORDER BY rowid ASC LIMIT ?1 OFFSET ?2;"
        ))?;
        let mut rows = stmt.query(params![i64::from(limit), i64::from(offset)])?;
        let mut flights = Vec::new();
        while let Some(row) = rows.next()? {
            flights.push(parse_flight_row(row)?);
        }
        Ok(flights)
    }

    fn update_flight(&self, flight: &Flight) -> StoreResult<()> {
        flight.validate()?;

        let changed = self.conn.execute(
            "UPDATE flights
             SET
                code = ?1,
                airline = ?2,
                origin = ?3,
                destination = ?4,
                kind = ?5,
                scheduled_at = ?6,
                status = ?7,
                emergency = ?8,
                delay_minutes = ?9,
                gate = ?10,
                updated_at = (strftime('%s', 'now') * 1000)
             WHERE uuid = ?11;",
            params![
                flight.code.as_str(),
                flight.airline.as_deref(),
                flight.origin.trim(),
                flight.destination.trim(),
                flight_kind_to_db(flight.kind),
                flight.scheduled_at,
                flight_status_to_db(flight.status),
                flight.emergency.map(emergency_kind_to_db),
                flight.delay_minutes,
                flight.gate.as_deref(),
                flight.uuid.to_string(),
            ],
        )?;

        if changed == 0 {
            return Err(StoreError::FlightNotFound(flight.uuid));
        }
        Ok(())
    }

    fn set_queue(&self, flight_id: FlightId, queue_id: Option<QueueId>) -> StoreResult<()> {
        if let Some(queue_id) = queue_id {
            self.find_queue_by_id(queue_id)?
                .ok_or(StoreError::QueueNotFound(queue_id))?;
        }

        let changed = self.conn.execute(
            "UPDATE flights
             SET queue_uuid = ?1, updated_at = (strftime('%s', 'now') * 1000)
             WHERE uuid = ?2;",
            params![
                queue_id.map(|value| value.to_string()),
                flight_id.to_string()
            ],
        )?;

        if changed == 0 {
            return Err(StoreError::FlightNotFound(flight_id));
        }
        Ok(())
    }
}

fn parse_queue_row(row: &Row<'_>) -> StoreResult<QueueRecord> {
    let uuid_text: String = row.get("uuid")?;
    Ok(QueueRecord {
        uuid: parse_uuid(&uuid_text, "queues.uuid")?,
        name: row.get("name")?,
        created_at: row.get("created_at")?,
    })
}

fn parse_flight_row(row: &Row<'_>) -> StoreResult<Flight> {
    let uuid_text: String = row.get("uuid")?;
    let uuid = parse_uuid(&uuid_text, "flights.uuid")?;

    let kind_text: String = row.get("kind")?;
    let kind = parse_flight_kind(&kind_text).ok_or_else(|| {
        StoreError::InvalidData(format!("invalid flight kind `{kind_text}` in flights.kind"))
    })?;

    let status_text: String = row.get("status")?;
    let status = parse_flight_status(&status_text).ok_or_else(|| {
        StoreError::InvalidData(format!(
            "invalid flight status `{status_text}` in flights.status"
        ))
    })?;

    let emergency = match row.get::<_, Option<String>>("emergency")? {
        Some(value) => Some(parse_emergency_kind(&value).ok_or_else(|| {
            StoreError::InvalidData(format!(
                "invalid emergency kind `{value}` in flights.emergency"
            ))
        })?),
        None => None,
    };

    let queue_uuid = row
        .get::<_, Option<String>>("queue_uuid")?
        .map(|value| parse_uuid(&value, "flights.queue_uuid"))
        .transpose()?;

    let flight = Flight {
        uuid,
        code: row.get("code")?,
        airline: row.get("airline")?,
        origin: row.get("origin")?,
        destination: row.get("destination")?,
        kind,
        scheduled_at: row.get("scheduled_at")?,
        status,
        emergency,
        delay_minutes: row.get("delay_minutes")?,
        gate: row.get("gate")?,
        queue_uuid,
    };
    flight.validate()?;
    Ok(flight)
}

fn parse_uuid(value: &str, column: &'static str) -> StoreResult<Uuid> {
    Uuid::parse_str(value)
        .map_err(|_| StoreError::InvalidData(format!("invalid uuid `{value}` in {column}")))
}

fn flight_kind_to_db(kind: FlightKind) -> &'static str {
    match kind {
        FlightKind::Departure => "departure",
        FlightKind::Arrival => "arrival",
    }
}

fn parse_flight_kind(value: &str) -> Option<FlightKind> {
    match value {
        "departure" => Some(FlightKind::Departure),
        "arrival" => Some(FlightKind::Arrival),
        _ => None,
    }
}

fn flight_status_to_db(status: FlightStatus) -> &'static str {
    match status {
        FlightStatus::Scheduled => "scheduled",
        FlightStatus::Boarding => "boarding",
        FlightStatus::Delayed => "delayed",
        FlightStatus::Departed => "departed",
        FlightStatus::Landed => "landed",
        FlightStatus::Emergency => "emergency",
        FlightStatus::Cancelled => "cancelled",
    }
}

fn parse_flight_status(value: &str) -> Option<FlightStatus> {
    match value {
        "scheduled" => Some(FlightStatus::Scheduled),
        "boarding" => Some(FlightStatus::Boarding),
        "delayed" => Some(FlightStatus::Delayed),
        "departed" => Some(FlightStatus::Departed),
        "landed" => Some(FlightStatus::Landed),
        "emergency" => Some(FlightStatus::Emergency),
        "cancelled" => Some(FlightStatus::Cancelled),
        _ => None,
    }
}

fn emergency_kind_to_db(kind: EmergencyKind) -> &'static str {
    match kind {
        EmergencyKind::TechnicalFailure => "technical_failure",
        EmergencyKind::LowFuel => "low_fuel",
        EmergencyKind::Medical => "medical",
        EmergencyKind::AdverseWeather => "adverse_weather",
    }
}

fn parse_emergency_kind(value: &str) -> Option<EmergencyKind> {
    match value {
        "technical_failure" => Some(EmergencyKind::TechnicalFailure),
        "low_fuel" => Some(EmergencyKind::LowFuel),
        "medical" => Some(EmergencyKind::Medical),
        "adverse_weather" => Some(EmergencyKind::AdverseWeather),
        _ => None,
    }
}
