use std::time::Duration;

use maap_common::constants;
use maap_engine::{Error, SenderId, State};
use maap_wire::control::{ErrorCode, Notification, NotifyKind};

use crate::{Harness, CLIENT};

const OTHER: SenderId = SenderId(2);

#[test]
fn init_is_idempotent() {
    let mut h = Harness::new();

    h.engine.init(OTHER, constants::DYNAMIC_POOL_BASE, constants::DYNAMIC_POOL_SIZE).unwrap();
    assert_eq!(
        h.engine.pop_notification(),
        Some((
            OTHER,
            Notification::new(
                NotifyKind::Initialized,
                -1,
                constants::DYNAMIC_POOL_BASE,
                constants::DYNAMIC_POOL_SIZE
            )
        ))
    );

    assert_eq!(h.engine.init(OTHER, 0x91E0_F000_1000, 16), Err(Error::AlreadyInitialized));
    let (to, note) = h.engine.pop_notification().unwrap();
    assert_eq!(to, OTHER);
    assert_eq!(note.kind, NotifyKind::Initialized);
    // Reports the pool that is actually active.
    assert_eq!((note.start, note.count), (constants::DYNAMIC_POOL_BASE, constants::DYNAMIC_POOL_SIZE));
    assert_eq!(note.result, ErrorCode::AlreadyInitialized);

    assert_eq!(h.engine.pool().map(|p| p.base), Some(constants::DYNAMIC_POOL_BASE));
}

#[test]
fn init_ignores_bits_above_the_address() {
    let mut h = Harness::new();
    h.engine.deinit();

    let wide = 0xABCD_0000_0000_0000 | 0x91E0_F000_1000;
    h.engine.init(CLIENT, wide, 16).unwrap();
    h.engine.init(OTHER, wide, 16).unwrap();

    let notes = h.notifications();
    assert_eq!(notes.len(), 2);
    for note in notes {
        assert_eq!((note.start, note.count), (0x91E0_F000_1000, 16));
        assert_eq!(note.result, ErrorCode::None);
    }
    assert_eq!(h.engine.pool().map(|p| p.base), Some(0x91E0_F000_1000));
}

#[test]
fn release_frees_the_range() {
    let mut h = Harness::new();
    let info = h.acquire(None, 8);

    h.engine.release(CLIENT, info.id).unwrap();
    let notes = h.notifications();
    assert_eq!(notes, vec![Notification::new(NotifyKind::Released, info.id, info.start, 8)]);
    assert!(h.engine.reservations().is_empty());

    // The range can be had again straight away.
    let again = h.acquire(Some(info.start), 8);
    assert_eq!(again.start, info.start);
    assert_eq!(again.id, info.id + 1);

    // Nothing more is sent for the released one once its timer has fired.
    h.advance(Duration::from_secs(32));
    let packets = h.packets();
    assert_eq!(packets.len(), 1);
    assert_eq!(packets[0].requested_start_address, again.start);
}

#[test]
fn release_while_probing() {
    let mut h = Harness::new();
    let id = h.engine.reserve(CLIENT, None, 8).unwrap();
    h.packets();
    h.notifications();

    h.engine.release(CLIENT, id).unwrap();
    assert_eq!(h.notifications()[0].kind, NotifyKind::Released);

    for _ in 0..6 {
        h.step();
    }
    assert!(h.packets().is_empty());
    assert!(h.notifications().is_empty());
    assert_eq!(h.engine.next_timer_deadline(), Duration::from_secs(3600));
}

#[test]
fn release_notifies_owner_too() {
    let mut h = Harness::new();
    let info = h.acquire(None, 4);

    h.engine.release(OTHER, info.id).unwrap();

    let note = Notification::new(NotifyKind::Released, info.id, info.start, 4);
    assert_eq!(h.engine.pop_notification(), Some((OTHER, note)));
    assert_eq!(h.engine.pop_notification(), Some((CLIENT, note)));
    assert_eq!(h.engine.pop_notification(), None);
}

#[test]
fn release_unknown_id() {
    let mut h = Harness::new();
    let info = h.acquire(None, 4);
    h.engine.release(CLIENT, info.id).unwrap();
    h.notifications();

    for id in [info.id, 42, -1] {
        assert_eq!(h.engine.release(CLIENT, id), Err(Error::ReleaseInvalidId(id)));
        let notes = h.notifications();
        assert_eq!(notes.len(), 1);
        assert_eq!((notes[0].kind, notes[0].id), (NotifyKind::Released, id));
        assert_eq!(notes[0].result, ErrorCode::ReleaseInvalidId);
    }
}

#[test]
fn status_only_reports_acquired_ranges() {
    let mut h = Harness::new();
    let id = h.engine.reserve(CLIENT, None, 4).unwrap();
    h.notifications();

    assert_eq!(h.engine.status(CLIENT, id), Err(Error::ReleaseInvalidId(id)));
    let notes = h.notifications();
    assert_eq!((notes[0].kind, notes[0].result), (NotifyKind::Status, ErrorCode::ReleaseInvalidId));

    while h.info(id).state == State::Probing {
        h.step();
    }
    h.notifications();
    let info = h.info(id);

    h.engine.status(OTHER, id).unwrap();
    assert_eq!(
        h.engine.pop_notification(),
        Some((OTHER, Notification::new(NotifyKind::Status, id, info.start, 4)))
    );

    assert_eq!(h.engine.status(CLIENT, 99), Err(Error::ReleaseInvalidId(99)));
}

#[test]
fn yield_unknown_id() {
    let mut h = Harness::new();

    assert_eq!(h.engine.yield_(CLIENT, 7), Err(Error::ReleaseInvalidId(7)));
    let notes = h.notifications();
    assert_eq!((notes[0].kind, notes[0].id), (NotifyKind::Yielded, 7));
    assert_eq!(notes[0].result, ErrorCode::ReleaseInvalidId);
}

#[test]
fn deinit_forgets_everything() {
    let mut h = Harness::new();
    let info = h.acquire(None, 4);
    h.engine.reserve(CLIENT, None, 4).unwrap();

    h.engine.deinit();
    assert!(!h.engine.is_initialized());
    assert!(h.engine.reservations().is_empty());
    assert!(h.engine.pop_packet().is_none());
    assert_eq!(h.engine.next_timer_deadline(), Duration::from_secs(3600));
    assert_eq!(h.engine.release(CLIENT, info.id), Err(Error::ReleaseInvalidId(info.id)));

    // A different pool is accepted after a deinit.
    h.engine.init(CLIENT, 0x91E0_F000_8000, 64).unwrap();
    h.notifications();
    let fresh = h.acquire(None, 64);
    assert_eq!(fresh.start, 0x91E0_F000_8000);
}
