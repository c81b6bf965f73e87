use maap_common::{constants, MacAddr};
use maap_engine::State;
use maap_wire::{
    control::{ErrorCode, NotifyKind},
    MaapPacket, MessageType,
};

use crate::{announce, defend, overlaps, probe, Harness, CLIENT, HIGHER, LOCAL, LOWER};

const BASE: u64 = 0x91E0_F000_1000;

#[test]
fn defend_reports_overlap() {
    let mut h = Harness::new();
    let info = h.acquire(Some(BASE), 10);
    assert_eq!(info.start, BASE);

    // (probe start, probe count) -> (conflict start, conflict count)
    let cases = [
        ((BASE - 4, 5), (BASE, 1)),
        ((BASE + 8, 5), (BASE + 8, 2)),
        ((BASE + 2, 3), (BASE + 2, 3)),
        ((BASE - 100, 200), (BASE, 10)),
    ];

    for ((start, count), (conflict_start, conflict_count)) in cases {
        // Defending answers every probe, whoever wins the tie-break.
        for remote in [LOWER, HIGHER] {
            assert!(h.inject(probe(remote, start, count)));

            let packets = h.packets();
            assert_eq!(packets.len(), 1);
            let defend = packets[0];
            assert!(defend.is_maap());
            assert_eq!(defend.kind(), Some(MessageType::Defend));
            assert_eq!(defend.dest, remote);
            assert_eq!(defend.src, LOCAL);
            assert_eq!(defend.requested_start_address, start);
            assert_eq!(defend.requested_count, count);
            assert_eq!(defend.conflict_start_address, conflict_start);
            assert_eq!(defend.conflict_count, conflict_count);
        }
    }

    assert!(h.notifications().is_empty());
    assert_eq!(h.info(info.id), info);
}

#[test]
fn probe_next_to_our_range_is_not_a_conflict() {
    let mut h = Harness::new();
    h.acquire(Some(BASE), 10);

    assert!(h.inject(probe(LOWER, BASE - 5, 5)));
    assert!(h.inject(probe(LOWER, BASE + 10, 5)));
    assert!(h.packets().is_empty());
}

#[test]
fn every_overlapping_reservation_is_handled() {
    let mut h = Harness::new();
    let a = h.acquire(Some(BASE), 4);
    let b = h.acquire(Some(BASE + 4), 4);
    let c = h.acquire(Some(BASE + 8), 4);
    let outside = h.acquire(Some(BASE + 12), 4);

    assert!(h.inject(probe(HIGHER, BASE + 2, 8)));

    let conflicts: Vec<_> =
        h.packets().iter().map(|p| (p.conflict_start_address, p.conflict_count)).collect();
    assert_eq!(conflicts, vec![(BASE + 2, 2), (BASE + 4, 4), (BASE + 8, 2)]);

    for info in [a, b, c, outside] {
        assert_eq!(h.info(info.id).state, State::Defending);
    }
}

#[test]
fn probing_ignores_probe_from_higher_mac() {
    let mut h = Harness::new();
    let id = h.engine.reserve(CLIENT, Some(BASE), 8).unwrap();
    h.packets();
    h.notifications();

    assert!(h.inject(probe(HIGHER, BASE, 8)));

    assert!(h.packets().is_empty());
    assert!(h.notifications().is_empty());
    assert_eq!(h.info(id).start, BASE);
}

#[test]
fn probing_moves_away_from_probe_from_lower_mac() {
    let mut h = Harness::new();
    let id = h.engine.reserve(CLIENT, Some(BASE), 8).unwrap();
    h.packets();
    h.notifications();

    assert!(h.inject(probe(LOWER, BASE + 4, 8)));

    let moved = h.info(id);
    assert_eq!(moved.state, State::Probing);
    assert_eq!(moved.count, 8);
    assert!(!overlaps((moved.start, 8), (BASE, 8)));
    assert!(!overlaps((moved.start, 8), (BASE + 4, 8)));

    let notes = h.notifications();
    assert_eq!(notes.len(), 1);
    assert_eq!(notes[0].kind, NotifyKind::Acquiring);
    assert_eq!((notes[0].id, notes[0].start, notes[0].count), (id, moved.start, 8));

    // The new range is probed right away.
    let packets = h.packets();
    assert_eq!(packets.len(), 1);
    assert_eq!(packets[0].kind(), Some(MessageType::Probe));
    assert_eq!(packets[0].requested_start_address, moved.start);
}

#[test]
fn probing_gives_way_to_announce_and_defend_regardless_of_mac() {
    for (remote, kind) in [
        (HIGHER, MessageType::Announce),
        (LOWER, MessageType::Announce),
        (HIGHER, MessageType::Defend),
        (LOWER, MessageType::Defend),
    ] {
        let mut h = Harness::new();
        let id = h.engine.reserve(CLIENT, Some(BASE), 8).unwrap();
        h.packets();

        let packet = match kind {
            MessageType::Announce => announce(remote, BASE, 8),
            _ => defend(remote, LOCAL, BASE, 8),
        };
        assert!(h.inject(packet));

        assert_ne!(h.info(id).start, BASE, "{kind} from {remote} should move us");
    }
}

#[test]
fn retry_on_defend() {
    let mut h = Harness::new();
    let id = h.engine.reserve(CLIENT, Some(BASE), 10).unwrap();

    let mut probes = h.packets().len();
    assert_eq!(probes, 1);

    // Someone already owns it and tells us after our first probe.
    assert!(h.inject(defend(LOWER, LOCAL, BASE, 10)));
    let moved = h.info(id).start;
    assert_ne!(moved, BASE);

    // The counter restarts: 4 probes for the new range, then the announce.
    probes = 0;
    let mut announces = 0;
    while h.info(id).state == State::Probing {
        for p in h.packets() {
            assert_eq!(p.requested_start_address, moved);
            match p.kind() {
                Some(MessageType::Probe) => probes += 1,
                Some(MessageType::Announce) => announces += 1,
                other => panic!("unexpected {other:?}"),
            }
        }
        h.step();
    }
    announces += h.packets().iter().filter(|p| p.kind() == Some(MessageType::Announce)).count();

    assert_eq!(probes, 4);
    assert_eq!(announces, 1);

    let acquired: Vec<_> =
        h.notifications().into_iter().filter(|n| n.kind == NotifyKind::Acquired).collect();
    assert_eq!(acquired.len(), 1);
    assert_eq!((acquired[0].id, acquired[0].start), (id, moved));
}

#[test]
fn defending_yields_to_announce_from_lower_mac() {
    let mut h = Harness::new();
    let old = h.acquire(Some(BASE), 8);

    assert!(h.inject(announce(LOWER, BASE + 6, 4)));

    let notes = h.notifications();
    assert_eq!(notes.len(), 2);
    assert_eq!(notes[0].kind, NotifyKind::Yielded);
    assert_eq!((notes[0].id, notes[0].start, notes[0].count), (old.id, BASE, 8));
    assert_eq!(notes[1].kind, NotifyKind::Acquiring);
    assert_eq!((notes[1].id, notes[1].count), (old.id, 8));

    let new = h.info(old.id);
    assert_eq!(new.state, State::Probing);
    assert_eq!(new.start, notes[1].start);
    assert!(!overlaps((new.start, 8), (BASE, 8)));
    assert!(!overlaps((new.start, 8), (BASE + 6, 4)));

    let packets = h.packets();
    assert_eq!(packets.len(), 1);
    assert_eq!(packets[0].kind(), Some(MessageType::Probe));

    // The replacement goes through the full probe cycle under the same id.
    while h.info(old.id).state == State::Probing {
        h.step();
    }
    let acquired: Vec<_> =
        h.notifications().into_iter().filter(|n| n.kind == NotifyKind::Acquired).collect();
    assert_eq!(acquired.len(), 1);
    assert_eq!((acquired[0].id, acquired[0].start), (old.id, new.start));
    assert_eq!(h.engine.reservations().len(), 1);
}

#[test]
fn defending_yields_to_defend_from_lower_mac() {
    let mut h = Harness::new();
    let old = h.acquire(Some(BASE), 8);

    assert!(h.inject(defend(LOWER, constants::DEST_MAC, BASE, 8)));

    assert_eq!(h.notifications()[0].kind, NotifyKind::Yielded);
    assert_ne!(h.info(old.id).start, BASE);
}

#[test]
fn defending_keeps_range_against_higher_mac() {
    let mut h = Harness::new();
    let info = h.acquire(Some(BASE), 8);

    assert!(h.inject(announce(HIGHER, BASE, 8)));
    assert!(h.inject(defend(HIGHER, LOCAL, BASE + 2, 2)));

    assert!(h.packets().is_empty());
    assert!(h.notifications().is_empty());
    assert_eq!(h.info(info.id), info);
}

#[test]
fn yield_command_moves_the_range() {
    let mut h = Harness::new();
    let old = h.acquire(Some(BASE), 8);

    h.engine.yield_(CLIENT, old.id).unwrap();

    let notes = h.notifications();
    assert_eq!(notes[0].kind, NotifyKind::Yielded);
    assert_eq!(notes[1].kind, NotifyKind::Acquiring);
    assert_ne!(h.info(old.id).start, BASE);

    // Nothing about the synthesized announce goes on the wire.
    let packets = h.packets();
    assert_eq!(packets.len(), 1);
    assert_eq!(packets[0].kind(), Some(MessageType::Probe));
}

#[test]
fn yield_with_no_replacement_available() {
    let mut h = Harness::new();
    h.engine.deinit();
    h.engine.init(CLIENT, BASE, 8).unwrap();
    h.notifications();

    let old = h.acquire(None, 8);
    assert!(h.inject(announce(LOWER, BASE, 1)));

    let notes = h.notifications();
    assert_eq!(notes.len(), 2);
    assert_eq!((notes[0].kind, notes[0].result), (NotifyKind::Yielded, ErrorCode::None));
    assert_eq!((notes[1].kind, notes[1].id), (NotifyKind::Yielded, old.id));
    assert_eq!(notes[1].result, ErrorCode::ReserveNotAvailable);

    assert!(h.engine.reservation(old.id).is_none());
    assert!(h.packets().is_empty());
}

#[test]
fn irrelevant_frames_are_dropped() {
    let mut h = Harness::new();
    let info = h.acquire(Some(BASE), 8);
    let good = probe(LOWER, BASE, 8);

    let mut not_maap = good;
    not_maap.ethertype = 0x0800;
    let mut wrong_subtype = good;
    wrong_subtype.subtype = 0x7E;
    let mut wrong_length = good;
    wrong_length.control_data_length = 17;
    let mut wrong_version = good;
    wrong_version.version = 1;
    let mut unknown_type = good;
    unknown_type.message_type = 4;
    let empty = probe(LOWER, BASE, 0);
    let outside = probe(LOWER, 0x0011_2233_4455, 8);

    for packet in
        [not_maap, wrong_subtype, wrong_length, wrong_version, unknown_type, empty, outside]
    {
        assert!(!h.inject(packet), "{packet:?}");
    }
    assert!(!h.engine.handle_packet(&good.encode()[..41]));

    assert!(h.packets().is_empty());
    assert_eq!(h.info(info.id), info);

    // Padded frames are fine.
    let mut padded = [0u8; 60];
    padded[..42].copy_from_slice(&good.encode());
    assert!(h.engine.handle_packet(&padded));
    assert_eq!(h.packets().len(), 1);
}

#[test]
fn frames_are_dropped_before_init() {
    let mut h = Harness::new();
    h.engine.deinit();
    assert!(!h.inject(probe(LOWER, BASE, 8)));
}

/// Moves every frame queued by `from` into `to`.
fn deliver(from: &mut Harness, to: &mut Harness) -> Vec<MaapPacket> {
    let packets = from.packets();
    for packet in &packets {
        to.inject(*packet);
    }
    packets
}

#[test]
fn concurrent_probes_are_resolved_by_mac() {
    let mut local = Harness::with_mac(LOCAL, 1);
    let mut remote = Harness::with_mac(LOWER, 2);

    let ours = local.engine.reserve(CLIENT, Some(BASE), 16).unwrap();
    let theirs = remote.engine.reserve(CLIENT, Some(BASE + 8), 16).unwrap();

    deliver(&mut local, &mut remote);
    deliver(&mut remote, &mut local);

    // The remote wins the tie-break and stays put. We move.
    assert_eq!(remote.info(theirs).start, BASE + 8);
    assert!(!overlaps((local.info(ours).start, 16), (BASE + 8, 16)));

    for _ in 0..8 {
        local.step();
        remote.step();
        deliver(&mut local, &mut remote);
        deliver(&mut remote, &mut local);
    }

    let ours = local.info(ours);
    let theirs = remote.info(theirs);
    assert_eq!(ours.state, State::Defending);
    assert_eq!(theirs.state, State::Defending);
    assert!(!overlaps((ours.start, 16), (theirs.start, 16)));
}

#[test]
fn late_prober_is_defended_off() {
    let mut owner = Harness::with_mac(HIGHER, 3);
    let mut late = Harness::with_mac(LOWER, 4);

    let owned = owner.acquire(Some(BASE), 8);
    let id = late.engine.reserve(CLIENT, Some(BASE), 8).unwrap();

    // The late prober would win a probe tie-break, but a defend always wins.
    let sent = deliver(&mut late, &mut owner);
    assert_eq!(sent.len(), 1);
    let defends = deliver(&mut owner, &mut late);
    assert_eq!(defends.len(), 1);
    assert_eq!(defends[0].dest, LOWER);

    assert_eq!(owner.info(owned.id), owned);
    assert!(!overlaps((late.info(id).start, 8), (BASE, 8)));
}

#[test]
fn identical_macs_keep_local_range() {
    let mac = MacAddr::new(0x0200_0000_0001);
    let mut h = Harness::with_mac(mac, 5);
    let id = h.engine.reserve(CLIENT, Some(BASE), 8).unwrap();
    h.packets();

    assert!(h.inject(probe(mac, BASE, 8)));
    assert_eq!(h.info(id).start, BASE);
}
