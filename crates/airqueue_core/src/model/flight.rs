//! Flight domain model.
//!
//! # Responsibility
//! - Define the canonical flight record shared by queues and the record store.
//! - Provide lifecycle helpers for status, emergency and delay changes.
//!
//! # Invariants
//! - `uuid` is stable and never reused for another flight.
//! - `code` is unique across the record store.
//! - `emergency` is only set while `status == FlightStatus::Emergency`.
//! - `queue_uuid` is the only persisted trace of queue membership.

use crate::model::queue::QueueId;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

/// Stable identifier for one flight record.
pub type FlightId = Uuid;

static FLIGHT_CODE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Z0-9]{2}[0-9]{1,4}[A-Z]?$").expect("valid flight code regex"));

const MILLIS_PER_MINUTE: i64 = 60_000;

/// Operational status of a flight.
///
/// Urgency classes used for queue ordering are derived from this value, see
/// `crate::sequence::priority::Rank`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FlightStatus {
    /// Planned, not yet boarding. Regular priority.
    Scheduled,
    /// Passengers boarding. Urgent priority.
    Boarding,
    /// Pushed back by an applied delay.
    Delayed,
    /// Left the gate.
    Departed,
    /// Arrived at destination.
    Landed,
    /// Declared emergency. Highest priority.
    Emergency,
    /// Will not operate.
    Cancelled,
}

impl FlightStatus {
    /// Stable uppercase label used in diagnostics.
    pub fn label(self) -> &'static str {
        match self {
            Self::Scheduled => "SCHEDULED",
            Self::Boarding => "BOARDING",
            Self::Delayed => "DELAYED",
            Self::Departed => "DEPARTED",
            Self::Landed => "LANDED",
            Self::Emergency => "EMERGENCY",
            Self::Cancelled => "CANCELLED",
        }
    }

    /// Whether the flight has finished its lifecycle.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Departed | Self::Landed | Self::Cancelled)
    }
}

/// Direction of a flight relative to this airport.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FlightKind {
    Departure,
    Arrival,
}

/// Reason attached to a declared emergency.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EmergencyKind {
    TechnicalFailure,
    LowFuel,
    Medical,
    AdverseWeather,
}

/// Validation failures for flight records.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FlightValidationError {
    /// Code does not match the `XX1234A` shape.
    InvalidCode(String),
    /// Origin is blank after trim.
    EmptyOrigin,
    /// Destination is blank after trim.
    EmptyDestination,
    /// Origin and destination are the same airport.
    SameOriginAndDestination(String),
    /// Emergency kind set on a flight that is not in emergency.
    EmergencyKindWithoutEmergency,
}

impl Display for FlightValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidCode(code) => write!(f, "invalid flight code `{code}`"),
            Self::EmptyOrigin => write!(f, "flight origin must not be blank"),
            Self::EmptyDestination => write!(f, "flight destination must not be blank"),
            Self::SameOriginAndDestination(airport) => {
                write!(f, "flight origin and destination are both `{airport}`")
            }
            Self::EmergencyKindWithoutEmergency => {
                write!(f, "emergency kind requires emergency status")
            }
        }
    }
}

impl Error for FlightValidationError {}

/// Canonical flight record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Flight {
    /// Stable global ID.
    pub uuid: FlightId,
    /// Unique flight code, e.g. `IB3456`.
    pub code: String,
    pub airline: Option<String>,
    pub origin: String,
    pub destination: String,
    pub kind: FlightKind,
    /// Unix epoch milliseconds, already shifted by applied delays.
    pub scheduled_at: i64,
    pub status: FlightStatus,
    /// Meaningful only when `status == FlightStatus::Emergency`.
    pub emergency: Option<EmergencyKind>,
    /// Total delay applied so far.
    pub delay_minutes: u32,
    pub gate: Option<String>,
    /// Queue-membership foreign key. `None` means the flight is in no queue.
    pub queue_uuid: Option<QueueId>,
}

impl Flight {
    /// Creates a scheduled departure with a generated stable ID.
    pub fn new(
        code: impl Into<String>,
        origin: impl Into<String>,
        destination: impl Into<String>,
        scheduled_at: i64,
    ) -> Self {
        Self {
            uuid: Uuid::new_v4(),
            code: code.into(),
            airline: None,
            origin: origin.into(),
            destination: destination.into(),
            kind: FlightKind::Departure,
            scheduled_at,
            status: FlightStatus::Scheduled,
            emergency: None,
            delay_minutes: 0,
            gate: None,
            queue_uuid: None,
        }
    }

    /// Builder-style status override.
    pub fn with_status(mut self, status: FlightStatus) -> Self {
        self.status = status;
        self
    }

    /// Builder-style kind override.
    pub fn with_kind(mut self, kind: FlightKind) -> Self {
        self.kind = kind;
        self
    }

    /// Validates record-level invariants before persistence.
    pub fn validate(&self) -> Result<(), FlightValidationError> {
        if !FLIGHT_CODE_RE.is_match(&self.code) {
            return Err(FlightValidationError::InvalidCode(self.code.clone()));
        }

        let origin = self.origin.trim();
        let destination = self.destination.trim();
        if origin.is_empty() {
            return Err(FlightValidationError::EmptyOrigin);
        }
        if destination.is_empty() {
            return Err(FlightValidationError::EmptyDestination);
        }
        if origin.eq_ignore_ascii_case(destination) {
            return Err(FlightValidationError::SameOriginAndDestination(
                origin.to_string(),
            ));
        }

        if self.emergency.is_some() && self.status != FlightStatus::Emergency {
            return Err(FlightValidationError::EmergencyKindWithoutEmergency);
        }

        Ok(())
    }

    /// Sets a new status, dropping any emergency kind when leaving emergency.
    pub fn set_status(&mut self, status: FlightStatus) {
        self.status = status;
        if status != FlightStatus::Emergency {
            self.emergency = None;
        }
    }

    /// Marks the flight as an emergency of the given kind.
    pub fn declare_emergency(&mut self, kind: EmergencyKind) {
        self.status = FlightStatus::Emergency;
        self.emergency = Some(kind);
    }

    /// Accumulates a delay and shifts the scheduled time accordingly.
    ///
    /// Emergencies keep their status; any other flight becomes `Delayed`.
    pub fn apply_delay(&mut self, minutes: u32) {
        self.delay_minutes = self.delay_minutes.saturating_add(minutes);
        self.scheduled_at = self
            .scheduled_at
            .saturating_add(i64::from(minutes) * MILLIS_PER_MINUTE);
        if self.status != FlightStatus::Emergency {
            self.status = FlightStatus::Delayed;
        }
    }
}

impl Display for Flight {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.code, self.status.label())
    }
}
