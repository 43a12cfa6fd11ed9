//! Demo entry point for the runway queue.
//!
//! Usage: `airqueue_cli [DB_PATH]`. Without a path the record store lives in
//! memory. Set `AIRQUEUE_LOG_DIR` to an absolute directory to enable file logs.

use airqueue_core::{
    default_log_level, init_logging, open_db, open_db_in_memory, EmergencyKind, Flight,
    FlightKind, FlightService, FlightStatus, QueueManager, SqliteFlightStore,
};
use log::info;
use std::error::Error;
use std::process::ExitCode;

fn main() -> ExitCode {
    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("airqueue: {err}");
            ExitCode::FAILURE
        }
    }
}

fn run() -> Result<(), Box<dyn Error>> {
    if let Ok(log_dir) = std::env::var("AIRQUEUE_LOG_DIR") {
        init_logging(default_log_level(), &log_dir)?;
    }

    let conn = match std::env::args().nth(1) {
        Some(path) => open_db(path)?,
        None => open_db_in_memory()?,
    };
    let manager = QueueManager::new(SqliteFlightStore::try_new(&conn)?);
    let flights = FlightService::new(&manager);

    let runway = manager.create_queue("Runway 1")?;
    let arrivals = [
        Flight::new("IB3456", "MAD", "LHR", 0),
        Flight::new("FR1234", "DUB", "MAD", 0).with_status(FlightStatus::Boarding),
        Flight::new("BA7890", "LHR", "MAD", 0)
            .with_kind(FlightKind::Arrival)
            .with_status(FlightStatus::Emergency),
    ];
    for flight in arrivals {
        flights.register_flight(&flight)?;
        manager.insert_by_priority(runway.uuid, flight)?;
    }
    println!("{}", manager.visualize(runway.uuid)?);

    flights.declare_emergency("IB3456", EmergencyKind::LowFuel)?;
    flights.apply_delay("FR1234", 20)?;
    println!("{}", manager.visualize(runway.uuid)?);

    let next = flights.next_flight(runway.uuid)?;
    println!("next: {next}");
    info!(
        "event=demo_done module=cli status=ok queue_id={} next_flight_id={}",
        runway.uuid, next.uuid
    );
    Ok(())
}
