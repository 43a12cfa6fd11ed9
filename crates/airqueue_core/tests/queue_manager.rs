mod support;

use airqueue_core::db::open_db_in_memory;
use airqueue_core::{
    Flight, FlightStatus, FlightStore, QueueError, QueueId, QueueManager, SqliteFlightStore,
    StoreError,
};
use support::MemoryStore;
use uuid::Uuid;

fn register<S: FlightStore>(manager: &QueueManager<S>, code: &str, status: FlightStatus) -> Flight {
    let flight = Flight::new(code, "MAD", "LHR", 0).with_status(status);
    manager.store().create_flight(&flight).unwrap();
    flight
}

fn codes<S: FlightStore>(manager: &QueueManager<S>, queue_id: QueueId) -> Vec<String> {
    manager
        .list_flights(queue_id)
        .unwrap()
        .into_iter()
        .map(|flight| flight.code)
        .collect()
}

#[test]
fn priority_insertion_serves_emergency_first() {
    let conn = open_db_in_memory().unwrap();
    let manager = QueueManager::new(SqliteFlightStore::try_new(&conn).unwrap());
    let queue = manager.create_queue("Runway 1").unwrap();

    for (code, status) in [
        ("IB3456", FlightStatus::Scheduled),
        ("FR1234", FlightStatus::Boarding),
        ("BA7890", FlightStatus::Emergency),
    ] {
        let flight = register(&manager, code, status);
        manager.insert_by_priority(queue.uuid, flight).unwrap();
    }

    assert_eq!(codes(&manager, queue.uuid), ["BA7890", "FR1234", "IB3456"]);
    assert_eq!(
        manager.visualize(queue.uuid).unwrap(),
        "Sequence (size: 3)\n\
         HEAD\n\
         0: x [BA7890: EMERGENCY] ->\n\
         1: <- [FR1234: BOARDING] ->\n\
         2: <- [IB3456: SCHEDULED] x\n\
         TAIL"
    );

    let stored = manager.store().find_flights_by_queue_id(queue.uuid).unwrap();
    assert_eq!(stored.len(), 3);
}

#[test]
fn load_groups_ranks_regardless_of_storage_order() {
    let conn = open_db_in_memory().unwrap();
    let store = SqliteFlightStore::try_new(&conn).unwrap();
    let queue = store.create_queue("Runway 2").unwrap();
    for (code, status) in [
        ("IB3456", FlightStatus::Scheduled),
        ("BA7890", FlightStatus::Emergency),
        ("LH400", FlightStatus::Cancelled),
        ("FR1234", FlightStatus::Boarding),
        ("AF1001", FlightStatus::Emergency),
        ("KL1002", FlightStatus::Scheduled),
    ] {
        let mut flight = Flight::new(code, "MAD", "LHR", 0).with_status(status);
        flight.queue_uuid = Some(queue.uuid);
        store.create_flight(&flight).unwrap();
    }

    let manager = QueueManager::new(store);
    assert_eq!(
        codes(&manager, queue.uuid),
        ["BA7890", "AF1001", "FR1234", "IB3456", "KL1002", "LH400"]
    );
    let shared = manager.get_or_load(queue.uuid).unwrap();
    assert!(shared.read().unwrap().is_priority_ordered());
}

#[test]
fn unknown_queue_is_reported() {
    let manager = QueueManager::new(MemoryStore::default());
    let missing = Uuid::new_v4();

    assert!(matches!(
        manager.get_or_load(missing),
        Err(QueueError::QueueNotFound(id)) if id == missing
    ));
    assert!(!manager.is_cached(missing).unwrap());
}

#[test]
fn blank_queue_name_is_rejected() {
    let manager = QueueManager::new(MemoryStore::default());
    assert!(matches!(
        manager.create_queue("  "),
        Err(QueueError::InvalidQueueName)
    ));
    assert!(manager.list_queues().unwrap().is_empty());
}

#[test]
fn cache_hit_skips_store_until_invalidated() {
    let manager = QueueManager::new(MemoryStore::default());
    let queue = manager.create_queue("Runway 1").unwrap();
    let flight = register(&manager, "IB3456", FlightStatus::Scheduled);
    manager.add_last(queue.uuid, flight).unwrap();
    let reads_after_load = manager.store().member_reads();

    manager.get_or_load(queue.uuid).unwrap();
    manager.size(queue.uuid).unwrap();
    assert_eq!(manager.store().member_reads(), reads_after_load);

    let mut outside = Flight::new("FR1234", "DUB", "MAD", 0).with_status(FlightStatus::Emergency);
    outside.queue_uuid = Some(queue.uuid);
    manager.store().create_flight(&outside).unwrap();
    assert_eq!(codes(&manager, queue.uuid), ["IB3456"]);

    assert!(manager.invalidate(queue.uuid).unwrap());
    assert!(!manager.is_cached(queue.uuid).unwrap());
    assert_eq!(codes(&manager, queue.uuid), ["FR1234", "IB3456"]);
    assert_eq!(manager.store().member_reads(), reads_after_load + 1);
}

#[test]
fn invalidate_all_evicts_every_queue() {
    let manager = QueueManager::new(MemoryStore::default());
    let first = manager.create_queue("Runway 1").unwrap();
    let second = manager.create_queue("Runway 2").unwrap();
    manager.get_or_load(first.uuid).unwrap();
    manager.get_or_load(second.uuid).unwrap();

    assert_eq!(manager.invalidate_all().unwrap(), 2);
    assert!(!manager.is_cached(first.uuid).unwrap());
    assert!(!manager.invalidate(second.uuid).unwrap());
}

#[test]
fn add_then_remove_from_both_ends() {
    let manager = QueueManager::new(MemoryStore::default());
    let queue = manager.create_queue("Runway 1").unwrap();
    let a = register(&manager, "IB3456", FlightStatus::Scheduled);
    let b = register(&manager, "FR1234", FlightStatus::Scheduled);

    manager.add_first(queue.uuid, a.clone()).unwrap();
    manager.add_last(queue.uuid, b.clone()).unwrap();
    assert_eq!(manager.get_first(queue.uuid).unwrap().uuid, a.uuid);
    assert_eq!(manager.get_last(queue.uuid).unwrap().uuid, b.uuid);

    let removed = manager.remove_first(queue.uuid).unwrap();
    assert_eq!(removed.uuid, a.uuid);
    assert_eq!(removed.queue_uuid, None);
    assert_eq!(manager.store().stored(a.uuid).unwrap().queue_uuid, None);

    assert_eq!(manager.remove_first(queue.uuid).unwrap().uuid, b.uuid);
    assert!(matches!(
        manager.remove_first(queue.uuid),
        Err(QueueError::Empty)
    ));
    assert!(matches!(manager.remove_last(queue.uuid), Err(QueueError::Empty)));
    assert_eq!(manager.size(queue.uuid).unwrap(), 0);
}

#[test]
fn positional_insert_and_remove() {
    let manager = QueueManager::new(MemoryStore::default());
    let queue = manager.create_queue("Runway 1").unwrap();
    for code in ["IB3456", "FR1234", "BA7890"] {
        let flight = register(&manager, code, FlightStatus::Scheduled);
        manager.add_last(queue.uuid, flight).unwrap();
    }

    let middle = register(&manager, "LH400", FlightStatus::Scheduled);
    manager.insert_at(queue.uuid, 1, middle.clone()).unwrap();
    assert_eq!(manager.get_at(queue.uuid, 1).unwrap().uuid, middle.uuid);

    let removed = manager.remove_at(queue.uuid, 1).unwrap();
    assert_eq!(removed.uuid, middle.uuid);
    assert_eq!(manager.get_at(queue.uuid, 1).unwrap().code, "FR1234");

    assert!(matches!(
        manager.get_at(queue.uuid, 3),
        Err(QueueError::OutOfRange { position: 3, len: 3 })
    ));
    assert!(matches!(
        manager.remove_at(queue.uuid, -1),
        Err(QueueError::OutOfRange { position: -1, len: 3 })
    ));
}

#[test]
fn remove_flight_by_id() {
    let manager = QueueManager::new(MemoryStore::default());
    let queue = manager.create_queue("Runway 1").unwrap();
    let a = register(&manager, "IB3456", FlightStatus::Scheduled);
    let b = register(&manager, "FR1234", FlightStatus::Boarding);
    manager.add_last(queue.uuid, a.clone()).unwrap();
    manager.add_last(queue.uuid, b.clone()).unwrap();

    manager.remove_flight(queue.uuid, a.uuid).unwrap();
    assert_eq!(codes(&manager, queue.uuid), ["FR1234"]);
    assert!(matches!(
        manager.remove_flight(queue.uuid, a.uuid),
        Err(QueueError::FlightNotFound(id)) if id == a.uuid
    ));
}

#[test]
fn failed_store_write_leaves_sequence_unchanged() {
    let manager = QueueManager::new(MemoryStore::default());
    let queue = manager.create_queue("Runway 1").unwrap();
    let kept = register(&manager, "IB3456", FlightStatus::Scheduled);
    let rejected = register(&manager, "FR1234", FlightStatus::Emergency);
    manager.add_last(queue.uuid, kept.clone()).unwrap();
    let before = manager.visualize(queue.uuid).unwrap();

    manager.store().fail_writes(true);
    assert!(matches!(
        manager.insert_by_priority(queue.uuid, rejected.clone()),
        Err(QueueError::StoreWrite(StoreError::Unavailable(_)))
    ));
    assert!(matches!(
        manager.remove_at(queue.uuid, 0),
        Err(QueueError::StoreWrite(_))
    ));
    assert_eq!(manager.visualize(queue.uuid).unwrap(), before);
    assert_eq!(manager.store().stored(rejected.uuid).unwrap().queue_uuid, None);
    assert_eq!(
        manager.store().stored(kept.uuid).unwrap().queue_uuid,
        Some(queue.uuid)
    );

    manager.store().fail_writes(false);
    manager.insert_by_priority(queue.uuid, rejected).unwrap();
    assert_eq!(codes(&manager, queue.uuid), ["FR1234", "IB3456"]);
}

#[test]
fn unregistered_flight_cannot_be_queued() {
    let manager = QueueManager::new(MemoryStore::default());
    let queue = manager.create_queue("Runway 1").unwrap();
    let ghost = Flight::new("IB3456", "MAD", "LHR", 0);

    assert!(matches!(
        manager.add_last(queue.uuid, ghost.clone()),
        Err(QueueError::FlightNotFound(id)) if id == ghost.uuid
    ));
    assert_eq!(manager.size(queue.uuid).unwrap(), 0);
}

#[test]
fn removal_keeps_status_written_behind_the_cache() {
    let manager = QueueManager::new(MemoryStore::default());
    let queue = manager.create_queue("Runway 1").unwrap();
    let flight = register(&manager, "IB3456", FlightStatus::Scheduled);
    manager.add_last(queue.uuid, flight.clone()).unwrap();

    let mut landed = manager.store().stored(flight.uuid).unwrap();
    landed.set_status(FlightStatus::Landed);
    manager.store().update_flight(&landed).unwrap();

    let removed = manager.remove_at(queue.uuid, 0).unwrap();
    assert_eq!(removed.status, FlightStatus::Landed);
    assert_eq!(removed.queue_uuid, None);
    let stored = manager.store().stored(flight.uuid).unwrap();
    assert_eq!(stored.status, FlightStatus::Landed);
    assert_eq!(stored.queue_uuid, None);
}

#[test]
fn adding_a_stale_copy_keeps_the_stored_fields() {
    let conn = open_db_in_memory().unwrap();
    let manager = QueueManager::new(SqliteFlightStore::try_new(&conn).unwrap());
    let queue = manager.create_queue("Runway 1").unwrap();
    let stale = register(&manager, "FR1234", FlightStatus::Scheduled);

    let mut boarding = stale.clone();
    boarding.set_status(FlightStatus::Boarding);
    manager.store().update_flight(&boarding).unwrap();

    let linked = manager.add_last(queue.uuid, stale.clone()).unwrap();
    assert_eq!(linked.status, FlightStatus::Boarding);
    assert_eq!(manager.get_first(queue.uuid).unwrap().status, FlightStatus::Boarding);

    let stored = manager.store().find_flight_by_id(stale.uuid).unwrap().unwrap();
    assert_eq!(stored.status, FlightStatus::Boarding);
    assert_eq!(stored.queue_uuid, Some(queue.uuid));
}

#[test]
fn re_adding_a_member_moves_it() {
    let manager = QueueManager::new(MemoryStore::default());
    let queue = manager.create_queue("Runway 1").unwrap();
    let a = register(&manager, "IB3456", FlightStatus::Scheduled);
    let b = register(&manager, "FR1234", FlightStatus::Scheduled);
    manager.add_last(queue.uuid, a.clone()).unwrap();
    manager.add_last(queue.uuid, b).unwrap();

    manager.add_last(queue.uuid, a).unwrap();
    assert_eq!(codes(&manager, queue.uuid), ["FR1234", "IB3456"]);
}

#[test]
fn joining_another_queue_leaves_the_previous_one() {
    let manager = QueueManager::new(MemoryStore::default());
    let north = manager.create_queue("North").unwrap();
    let south = manager.create_queue("South").unwrap();
    let a = register(&manager, "IB3456", FlightStatus::Scheduled);
    let b = register(&manager, "FR1234", FlightStatus::Scheduled);
    let c = register(&manager, "BA7890", FlightStatus::Scheduled);
    for flight in [a.clone(), b, c] {
        manager.add_last(north.uuid, flight).unwrap();
    }
    manager.move_flight(north.uuid, 2, 0).unwrap();
    assert_eq!(codes(&manager, north.uuid), ["BA7890", "IB3456", "FR1234"]);

    manager.add_last(south.uuid, a.clone()).unwrap();
    assert_eq!(codes(&manager, north.uuid), ["BA7890", "FR1234"]);
    assert_eq!(codes(&manager, south.uuid), ["IB3456"]);
    assert_eq!(
        manager.store().stored(a.uuid).unwrap().queue_uuid,
        Some(south.uuid)
    );
}

#[test]
fn reorder_rebuilds_from_store_and_drops_manual_moves() {
    let manager = QueueManager::new(MemoryStore::default());
    let queue = manager.create_queue("Runway 1").unwrap();
    for (code, status) in [
        ("IB3456", FlightStatus::Scheduled),
        ("FR1234", FlightStatus::Boarding),
        ("BA7890", FlightStatus::Emergency),
    ] {
        let flight = register(&manager, code, status);
        manager.add_last(queue.uuid, flight).unwrap();
    }
    let handle = manager.get_or_load(queue.uuid).unwrap();
    assert_eq!(codes(&manager, queue.uuid), ["IB3456", "FR1234", "BA7890"]);

    let summary = manager.reorder_by_priority(queue.uuid).unwrap();
    assert_eq!((summary.emergency, summary.urgent, summary.regular), (1, 1, 1));
    assert_eq!(summary.total, 3);
    let once = codes(&manager, queue.uuid);
    assert_eq!(once, ["BA7890", "FR1234", "IB3456"]);
    assert_eq!(
        handle.read().unwrap().get_first().unwrap().code,
        "BA7890"
    );

    manager.reorder_by_priority(queue.uuid).unwrap();
    assert_eq!(codes(&manager, queue.uuid), once);
}

#[test]
fn reorder_of_uncached_queue_populates_cache() {
    let manager = QueueManager::new(MemoryStore::default());
    let queue = manager.create_queue("Runway 1").unwrap();
    let summary = manager.reorder_by_priority(queue.uuid).unwrap();

    assert_eq!(summary.total, 0);
    assert!(manager.is_cached(queue.uuid).unwrap());
    assert_eq!(manager.visualize(queue.uuid).unwrap(), "[empty sequence]");
}

#[test]
fn concurrent_inserts_on_separate_queues() {
    let manager = QueueManager::new(MemoryStore::default());
    let queues: Vec<QueueId> = (0..4)
        .map(|index| manager.create_queue(&format!("Runway {index}")).unwrap().uuid)
        .collect();

    std::thread::scope(|scope| {
        for (worker, queue_id) in queues.iter().enumerate() {
            let manager = &manager;
            scope.spawn(move || {
                for index in 0..25 {
                    let status = if index % 5 == 0 {
                        FlightStatus::Emergency
                    } else {
                        FlightStatus::Scheduled
                    };
                    let flight = register(manager, &format!("Q{worker}{index:03}"), status);
                    manager.insert_by_priority(*queue_id, flight).unwrap();
                }
            });
        }
    });

    for queue_id in queues {
        assert_eq!(manager.size(queue_id).unwrap(), 25);
        let shared = manager.get_or_load(queue_id).unwrap();
        let sequence = shared.read().unwrap();
        assert!(sequence.is_priority_ordered());
        assert!(sequence.is_well_linked());
        assert_eq!(sequence.bucket_counts().emergency, 5);
    }
}

#[test]
fn concurrent_inserts_on_one_queue_are_serialized() {
    let manager = QueueManager::new(MemoryStore::default());
    let queue = manager.create_queue("Runway 1").unwrap().uuid;

    std::thread::scope(|scope| {
        for worker in 0..4 {
            let manager = &manager;
            scope.spawn(move || {
                for index in 0..20 {
                    let flight = register(manager, &format!("S{worker}{index:03}"), FlightStatus::Boarding);
                    manager.add_last(queue, flight).unwrap();
                }
            });
        }
    });

    assert_eq!(manager.size(queue).unwrap(), 80);
    assert_eq!(manager.store().find_flights_by_queue_id(queue).unwrap().len(), 80);
    assert!(manager.get_or_load(queue).unwrap().read().unwrap().is_well_linked());
}

#[test]
fn reorder_racing_inserts_on_uncached_queue_keeps_every_member() {
    for round in 0..10 {
        let manager = QueueManager::new(MemoryStore::default());
        let queue = manager.create_queue("Runway 1").unwrap().uuid;
        let flights: Vec<Flight> = (0..10)
            .map(|index| register(&manager, &format!("R{round}{index:02}"), FlightStatus::Scheduled))
            .collect();

        std::thread::scope(|scope| {
            let manager = &manager;
            scope.spawn(move || manager.reorder_by_priority(queue).unwrap());
            scope.spawn(move || {
                for flight in flights {
                    manager.add_last(queue, flight).unwrap();
                }
            });
        });

        assert_eq!(manager.size(queue).unwrap(), 10);
        manager.reorder_by_priority(queue).unwrap();
        assert_eq!(manager.size(queue).unwrap(), 10);
    }
}
