use std::{
    collections::VecDeque,
    time::{Duration, Instant},
};

use rand::{rngs::StdRng, Rng, SeedableRng};
use rustc_hash::FxHashMap;
use thiserror::Error;
use tracing::{debug, info, trace, warn};

use maap_common::{compare_mac, constants, unix_nanos, Clock, MacAddr, MonotonicClock};
use maap_wire::{
    control::{ErrorCode, Notification, NotifyKind},
    MaapPacket, MessageType, PACKET_LEN,
};

use crate::{
    intervals::{Handle, IntervalTree},
    notify::{NotificationSink, SenderId},
    timer::{TimerQueue, TimerToken},
};

/// Random placements tried before giving up on finding a free range.
const MAX_ASSIGN_ATTEMPTS: usize = 1000;

/// What [`Engine::next_timer_deadline`] reports when nothing is scheduled.
const IDLE_DEADLINE: Duration = Duration::from_secs(3600);

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    #[error("MAAP is not initialized")]
    RequiresInitialization,
    #[error("MAAP is already initialized with a different range")]
    AlreadyInitialized,
    #[error("No free address range of the requested size")]
    ReserveNotAvailable,
    #[error("No active reservation with id {0}")]
    ReleaseInvalidId(i32),
    #[error("Out of memory")]
    OutOfMemory,
    #[error("Internal error: {0}")]
    Internal(&'static str),
}

impl Error {
    /// The result code reported to clients for this error.
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::RequiresInitialization => ErrorCode::RequiresInitialization,
            Self::AlreadyInitialized => ErrorCode::AlreadyInitialized,
            Self::ReserveNotAvailable => ErrorCode::ReserveNotAvailable,
            Self::ReleaseInvalidId(_) => ErrorCode::ReleaseInvalidId,
            Self::OutOfMemory => ErrorCode::OutOfMemory,
            Self::Internal(_) => ErrorCode::Internal,
        }
    }
}

impl From<Error> for ErrorCode {
    fn from(e: Error) -> Self {
        e.code()
    }
}

/// Engine settings.
#[derive(Debug, Clone, Copy)]
pub struct EngineConfig {
    /// Our own station address, used as the source of every frame and for tie-breaks.
    pub src_mac: MacAddr,
    /// Destination of probes and announces.
    pub dest_mac: MacAddr,
    /// Fixed RNG seed. When unset the RNG is seeded from `src_mac` and the wall clock.
    pub seed: Option<u64>,
}

impl EngineConfig {
    pub fn new(src_mac: MacAddr) -> Self {
        Self { src_mac, dest_mac: constants::DEST_MAC, seed: None }
    }

    pub fn with_dest_mac(mut self, dest_mac: MacAddr) -> Self {
        self.dest_mac = dest_mac;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }
}

/// The block of addresses this engine allocates from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AddressPool {
    pub base: u64,
    pub len: u32,
}

impl AddressPool {
    /// Last address in the pool.
    fn last(&self) -> u64 {
        self.base + self.len as u64 - 1
    }

    fn address(&self, offset: u32) -> u64 {
        self.base + offset as u64
    }
}

/// Lifecycle of a reservation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum State {
    /// Probing the network before claiming the range.
    Probing,
    /// Holding the range, announcing and defending it.
    Defending,
    /// Given up. Freed when its pending timer next fires.
    Released,
}

/// A snapshot of a live reservation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReservationInfo {
    pub id: i32,
    pub state: State,
    pub start: u64,
    pub count: u32,
    pub requester: SenderId,
    /// When its timer next fires.
    pub next_action_time: Option<Instant>,
}

/// Internal reservation key. Unlike the public id, never shared between two reservations: a yield
/// hands the id over to a fresh reservation while the old one waits for its timer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
struct Key(u64);

#[derive(Debug)]
struct Reservation {
    id: i32,
    state: State,
    retry_counter: u32,
    timer: Option<TimerToken>,
    interval: Option<Handle>,
    requester: SenderId,
}

/// The MAAP protocol engine.
///
/// Entirely synchronous: the caller feeds it commands, received frames and timer ticks, then
/// drains the frames to send with [`Engine::pop_packet`] and the results to deliver with
/// [`Engine::pop_notification`].
#[derive(Debug)]
pub struct Engine<C = MonotonicClock> {
    config: EngineConfig,
    clock: C,
    rng: StdRng,
    pool: Option<AddressPool>,
    /// Allocated ranges, as offsets into the pool.
    intervals: IntervalTree<Key>,
    reservations: FxHashMap<Key, Reservation>,
    timers: TimerQueue<Key>,
    next_key: u64,
    next_id: i32,
    notifications: NotificationSink,
    /// Frames waiting to be put on the wire.
    egress_queue: VecDeque<[u8; PACKET_LEN]>,
}

impl Engine<MonotonicClock> {
    pub fn new(config: EngineConfig) -> Self {
        Self::with_clock(config, MonotonicClock)
    }
}

impl<C: Clock> Engine<C> {
    pub fn with_clock(config: EngineConfig, clock: C) -> Self {
        let seed = config.seed.unwrap_or_else(|| config.src_mac.as_u64() ^ unix_nanos());

        Self {
            config,
            clock,
            rng: StdRng::seed_from_u64(seed),
            pool: None,
            intervals: IntervalTree::new(),
            reservations: FxHashMap::default(),
            timers: TimerQueue::default(),
            next_key: 0,
            next_id: 1,
            notifications: NotificationSink::default(),
            egress_queue: VecDeque::new(),
        }
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }

    pub fn pool(&self) -> Option<AddressPool> {
        self.pool
    }

    pub fn is_initialized(&self) -> bool {
        self.pool.is_some()
    }

    /// Sets the pool to allocate from. Initializing again with the same pool is a no-op that
    /// still confirms with an `Initialized` notification.
    pub fn init(&mut self, sender: SenderId, base: u64, len: u32) -> Result<(), Error> {
        let base = MacAddr::new(base).as_u64();

        if let Some(pool) = self.pool {
            let note = Notification::new(NotifyKind::Initialized, -1, pool.base, pool.len);

            if pool.base == base && pool.len == len {
                debug!(base = %MacAddr::new(base), len, "MAAP already initialized with this range");
                self.notify(sender, note);
                return Ok(());
            }

            warn!(
                base = %MacAddr::new(base),
                len,
                current = %MacAddr::new(pool.base),
                "MAAP already initialized with a different range"
            );
            self.notify(sender, note.with_result(ErrorCode::AlreadyInitialized));
            return Err(Error::AlreadyInitialized);
        }

        let pool = AddressPool { base, len };
        self.pool = Some(pool);

        info!(start = %MacAddr::new(pool.base), count = len, "MAAP initialized");
        self.notify(sender, Notification::new(NotifyKind::Initialized, -1, pool.base, len));

        Ok(())
    }

    /// Drops all reservations and pending timers and forgets the pool.
    pub fn deinit(&mut self) {
        debug!(
            reservations = self.reservations.len(),
            timers = self.timers.len(),
            "Deinitializing MAAP"
        );

        self.intervals.clear();
        self.reservations.clear();
        self.timers.clear();
        self.egress_queue.clear();
        self.pool = None;
    }

    /// Starts probing for `len` addresses, at `preferred` if it is free. Returns the id of the new
    /// reservation. A frame can only carry up to `u16::MAX` addresses, so longer ranges are never
    /// available.
    pub fn reserve(
        &mut self,
        sender: SenderId,
        preferred: Option<u64>,
        len: u32,
    ) -> Result<i32, Error> {
        let failed = Notification::new(NotifyKind::Acquired, -1, 0, len);

        if self.pool.is_none() {
            self.notify(sender, failed.with_result(ErrorCode::RequiresInitialization));
            return Err(Error::RequiresInitialization);
        }

        if len > u16::MAX as u32 {
            warn!(len, "Requested range does not fit in a MAAP frame");
            self.notify(sender, failed.with_result(ErrorCode::ReserveNotAvailable));
            return Err(Error::ReserveNotAvailable);
        }

        let key = self.next_key();
        let Some(handle) = self.assign_interval(key, preferred, len, &[]) else {
            warn!(len, "No free address range for reservation");
            self.notify(sender, failed.with_result(ErrorCode::ReserveNotAvailable));
            return Err(Error::ReserveNotAvailable);
        };

        let id = self.next_id;
        self.next_id = self.next_id.wrapping_add(1).max(1);

        self.reservations.insert(
            key,
            Reservation {
                id,
                state: State::Probing,
                retry_counter: constants::PROBE_RETRANSMITS,
                timer: None,
                interval: Some(handle),
                requester: sender,
            },
        );

        let (start, count) = self.range_of(key).ok_or(Error::Internal("unassigned reservation"))?;
        info!(id, start = %MacAddr::new(start), count, "Probing address range");
        self.notify(sender, Notification::new(NotifyKind::Acquiring, id, start, count));

        self.send_probe(key);
        self.schedule_timer(key, self.clock.now());

        Ok(id)
    }

    /// Gives up the range behind `id`.
    pub fn release(&mut self, sender: SenderId, id: i32) -> Result<(), Error> {
        let Some((key, requester)) = self.find_live(id).map(|(k, r)| (k, r.requester)) else {
            debug!(id, "Release of unknown reservation");
            self.notify(
                sender,
                Notification::new(NotifyKind::Released, id, 0, 0)
                    .with_result(ErrorCode::ReleaseInvalidId),
            );
            return Err(Error::ReleaseInvalidId(id));
        };

        let (start, count) = self.range_of(key).unwrap_or_default();
        let note = Notification::new(NotifyKind::Released, id, start, count);
        self.notify(sender, note);
        if requester != sender {
            self.notify(requester, note);
        }

        self.retire(key);
        info!(id, start = %MacAddr::new(start), count, "Released address range");

        Ok(())
    }

    /// Reports the range behind `id`, if it has been acquired.
    pub fn status(&mut self, sender: SenderId, id: i32) -> Result<(), Error> {
        let acquired = self
            .find_live(id)
            .filter(|(_, r)| r.state == State::Defending)
            .map(|(key, _)| key)
            .and_then(|key| self.range_of(key));

        match acquired {
            Some((start, count)) => {
                self.notify(sender, Notification::new(NotifyKind::Status, id, start, count));
                Ok(())
            }
            None => {
                self.notify(
                    sender,
                    Notification::new(NotifyKind::Status, id, 0, 0)
                        .with_result(ErrorCode::ReleaseInvalidId),
                );
                Err(Error::ReleaseInvalidId(id))
            }
        }
    }

    /// Gives up the range behind `id` as if a peer that outranks everyone had announced it, then
    /// starts probing for a replacement under the same id.
    pub fn yield_(&mut self, sender: SenderId, id: i32) -> Result<(), Error> {
        let Some(key) = self.find_live(id).map(|(key, _)| key) else {
            self.notify(
                sender,
                Notification::new(NotifyKind::Yielded, id, 0, 0)
                    .with_result(ErrorCode::ReleaseInvalidId),
            );
            return Err(Error::ReleaseInvalidId(id));
        };

        let (start, count) = self.range_of(key).ok_or(Error::Internal("unassigned reservation"))?;
        debug!(id, start = %MacAddr::new(start), count, "Yielding address range on request");

        let announce = MaapPacket::new(MessageType::Announce, self.config.src_mac, MacAddr::ZERO)
            .with_request(start, count as u16);
        self.handle_packet(&announce.encode());

        Ok(())
    }

    /// Processes a received frame. Returns `false` if the frame was not a MAAP PDU about our pool.
    pub fn handle_packet(&mut self, frame: &[u8]) -> bool {
        let packet = match MaapPacket::decode(frame) {
            Ok(packet) => packet,
            Err(e) => {
                trace!(?e, "Dropping undecodable frame");
                return false;
            }
        };

        let Some(kind) = packet.kind().filter(|_| packet.is_maap()) else {
            trace!(src = %packet.src, "Dropping non-MAAP frame");
            return false;
        };

        let Some(pool) = self.pool else {
            trace!("Dropping MAAP frame, not initialized");
            return false;
        };

        if packet.requested_count == 0 {
            trace!(src = %packet.src, %kind, "Dropping MAAP frame with an empty range");
            return false;
        }

        let req_start = packet.requested_start_address;
        let req_last = req_start + packet.requested_count as u64 - 1;
        if pool.len == 0 || req_last < pool.base || req_start > pool.last() {
            trace!(src = %packet.src, %kind, "MAAP frame is about a range outside our pool");
            return false;
        }

        let low = (req_start.max(pool.base) - pool.base) as u32;
        let high = (req_last.min(pool.last()) - pool.base) as u32;

        trace!(
            src = %packet.src,
            %kind,
            start = %MacAddr::new(req_start),
            count = packet.requested_count,
            "Received MAAP frame"
        );

        let mut conflicting = Vec::new();
        let mut current = self.intervals.search_overlap(low, high - low + 1);
        while let Some(handle) = current {
            match self.intervals.get(handle) {
                Some(interval) if interval.overlaps(low, high) => conflicting.push(interval.data),
                _ => break,
            }
            current = self.intervals.successor(handle);
        }

        for key in conflicting {
            self.handle_conflict(key, &packet, kind, (low, high));
        }

        true
    }

    /// Fires every timer due at `now`.
    pub fn handle_timer(&mut self, now: Instant) {
        while let Some(key) = self.timers.pop_due(now) {
            let Some(reservation) = self.reservations.get_mut(&key) else {
                continue;
            };
            reservation.timer = None;

            let state = reservation.state;
            match state {
                State::Probing if reservation.retry_counter == 0 => {
                    reservation.state = State::Defending;
                    let (id, requester) = (reservation.id, reservation.requester);

                    let (start, count) = self.range_of(key).unwrap_or_default();
                    info!(id, start = %MacAddr::new(start), count, "Acquired address range");
                    self.notify(requester, Notification::new(NotifyKind::Acquired, id, start, count));

                    self.send_announce(key);
                    self.schedule_timer(key, now);
                }
                State::Probing => {
                    reservation.retry_counter -= 1;
                    self.send_probe(key);
                    self.schedule_timer(key, now);
                }
                State::Defending => {
                    self.send_announce(key);
                    self.schedule_timer(key, now);
                }
                State::Released => {
                    trace!(id = reservation.id, "Freeing released reservation");
                    self.reservations.remove(&key);
                }
            }
        }
    }

    /// Time until the next timer is due. Zero if one is already overdue.
    pub fn next_timer_deadline(&self) -> Duration {
        self.timers
            .next_deadline()
            .map_or(IDLE_DEADLINE, |at| at.saturating_duration_since(self.clock.now()))
    }

    pub fn pop_notification(&mut self) -> Option<(SenderId, Notification)> {
        self.notifications.pop()
    }

    pub fn pop_packet(&mut self) -> Option<[u8; PACKET_LEN]> {
        self.egress_queue.pop_front()
    }

    /// Snapshots of every reservation that is probing or defending, in address order.
    pub fn reservations(&self) -> Vec<ReservationInfo> {
        self.intervals
            .iter()
            .filter_map(|(_, interval)| {
                let reservation = self.reservations.get(&interval.data)?;
                let pool = self.pool?;
                Some(ReservationInfo {
                    id: reservation.id,
                    state: reservation.state,
                    start: pool.address(interval.low),
                    count: interval.count(),
                    requester: reservation.requester,
                    next_action_time: reservation.timer.map(|t| t.deadline()),
                })
            })
            .collect()
    }

    /// Snapshot of the live reservation behind `id`.
    pub fn reservation(&self, id: i32) -> Option<ReservationInfo> {
        self.reservations().into_iter().find(|r| r.id == id)
    }

    fn handle_conflict(
        &mut self,
        key: Key,
        packet: &MaapPacket,
        kind: MessageType,
        contested: (u32, u32),
    ) {
        let Some(reservation) = self.reservations.get(&key) else {
            return;
        };
        let (id, state) = (reservation.id, reservation.state);
        let local = self.config.src_mac;

        match state {
            State::Probing => {
                if kind == MessageType::Probe && compare_mac(local, packet.src) {
                    debug!(id, remote = %packet.src, "Ignoring conflicting probe, we have priority");
                    return;
                }

                debug!(id, remote = %packet.src, %kind, "Conflict while probing, picking a new range");
                self.reassign(key, contested);
            }
            State::Defending => match kind {
                MessageType::Probe => {
                    debug!(id, remote = %packet.src, "Defending address range");
                    self.send_defend(key, packet);
                }
                _ if compare_mac(local, packet.src) => {
                    debug!(id, remote = %packet.src, %kind, "Ignoring conflict, we have priority");
                }
                _ => {
                    debug!(id, remote = %packet.src, %kind, "Yielding address range");
                    self.yield_range(key, contested);
                }
            },
            State::Released => {}
        }
    }

    /// Moves a probing reservation to a new range and restarts the probe sequence.
    fn reassign(&mut self, key: Key, contested: (u32, u32)) {
        let Some(old) = self.take_interval(key) else {
            return;
        };
        let count = old.1 - old.0 + 1;

        match self.assign_interval(key, None, count, &[old, contested]) {
            Some(handle) => {
                let Some(reservation) = self.reservations.get_mut(&key) else {
                    return;
                };
                reservation.interval = Some(handle);
                reservation.retry_counter = constants::PROBE_RETRANSMITS;
                let (id, requester) = (reservation.id, reservation.requester);

                let (start, count) = self.range_of(key).unwrap_or_default();
                info!(id, start = %MacAddr::new(start), count, "Probing replacement address range");
                self.notify(requester, Notification::new(NotifyKind::Acquiring, id, start, count));

                self.send_probe(key);
                self.schedule_timer(key, self.clock.now());
            }
            None => {
                let Some(reservation) = self.reservations.get_mut(&key) else {
                    return;
                };
                reservation.state = State::Released;
                let (id, requester) = (reservation.id, reservation.requester);

                warn!(id, count, "No replacement address range available");
                self.notify(
                    requester,
                    Notification::new(NotifyKind::Acquired, id, 0, count)
                        .with_result(ErrorCode::ReserveNotAvailable),
                );
            }
        }
    }

    /// Gives up a defended range and starts probing a replacement under the same id.
    fn yield_range(&mut self, key: Key, contested: (u32, u32)) {
        let Some((id, requester)) = self.reservations.get(&key).map(|r| (r.id, r.requester))
        else {
            return;
        };

        let (start, count) = self.range_of(key).unwrap_or_default();
        self.notify(requester, Notification::new(NotifyKind::Yielded, id, start, count));

        let Some(old) = self.take_interval(key) else {
            return;
        };
        self.retire(key);

        let replacement = self.next_key();
        let Some(handle) = self.assign_interval(replacement, None, count, &[old, contested]) else {
            warn!(id, count, "No replacement address range available");
            self.notify(
                requester,
                Notification::new(NotifyKind::Yielded, id, 0, count)
                    .with_result(ErrorCode::ReserveNotAvailable),
            );
            return;
        };

        self.reservations.insert(
            replacement,
            Reservation {
                id,
                state: State::Probing,
                retry_counter: constants::PROBE_RETRANSMITS,
                timer: None,
                interval: Some(handle),
                requester,
            },
        );

        let (start, count) = self.range_of(replacement).unwrap_or_default();
        info!(id, start = %MacAddr::new(start), count, "Probing replacement address range");
        self.notify(requester, Notification::new(NotifyKind::Acquiring, id, start, count));

        self.send_probe(replacement);
        self.schedule_timer(replacement, self.clock.now());
    }

    /// Places `len` addresses in the pool for `key`: at `preferred` if it is free, otherwise at a
    /// random free spot clear of every range in `avoid`.
    fn assign_interval(
        &mut self,
        key: Key,
        preferred: Option<u64>,
        len: u32,
        avoid: &[(u32, u32)],
    ) -> Option<Handle> {
        let pool = self.pool?;
        if len == 0 || len > pool.len {
            return None;
        }
        let max_low = pool.len - len;

        if let Some(base) = preferred {
            let fits = base >= pool.base && base - pool.base <= max_low as u64;
            if fits {
                let low = (base - pool.base) as u32;
                if let Ok(handle) = self.intervals.insert(low, low + len - 1, key) {
                    return Some(handle);
                }
            }
            debug!(preferred = %MacAddr::new(base), len, "Preferred range unavailable");
        }

        for _ in 0..MAX_ASSIGN_ATTEMPTS {
            let low = self.rng.gen_range(0..=max_low);
            let high = low + len - 1;

            if avoid.iter().any(|&(l, h)| l <= high && low <= h) {
                continue;
            }

            if let Ok(handle) = self.intervals.insert(low, high, key) {
                return Some(handle);
            }
        }

        None
    }

    /// Detaches `key`'s range from the tree and returns its offsets.
    fn take_interval(&mut self, key: Key) -> Option<(u32, u32)> {
        let handle = self.reservations.get_mut(&key)?.interval.take()?;
        self.intervals.remove(handle).map(|interval| (interval.low, interval.high))
    }

    /// Marks `key` released and drops its range. The entry itself goes away with its next timer.
    fn retire(&mut self, key: Key) {
        self.take_interval(key);
        if let Some(reservation) = self.reservations.get_mut(&key) {
            reservation.state = State::Released;
            if reservation.timer.is_none() {
                self.reservations.remove(&key);
            }
        }
    }

    /// The live reservation carrying `id`.
    fn find_live(&self, id: i32) -> Option<(Key, &Reservation)> {
        self.reservations
            .iter()
            .find(|(_, r)| r.id == id && r.state != State::Released)
            .map(|(key, r)| (*key, r))
    }

    /// First address and length of `key`'s range.
    fn range_of(&self, key: Key) -> Option<(u64, u32)> {
        let handle = self.reservations.get(&key)?.interval?;
        let interval = self.intervals.get(handle)?;
        let pool = self.pool?;

        Some((pool.address(interval.low), interval.count()))
    }

    fn next_key(&mut self) -> Key {
        let key = Key(self.next_key);
        self.next_key += 1;
        key
    }

    /// (Re)arms `key`'s timer relative to `now`, according to its state.
    fn schedule_timer(&mut self, key: Key, now: Instant) {
        let Some(reservation) = self.reservations.get_mut(&key) else {
            return;
        };

        let delay = match reservation.state {
            State::Probing => {
                constants::PROBE_INTERVAL_BASE +
                    Duration::from_millis(
                        self.rng.gen_range(1..constants::PROBE_INTERVAL_VARIATION_MS),
                    )
            }
            State::Defending => {
                constants::ANNOUNCE_INTERVAL_BASE +
                    Duration::from_millis(
                        self.rng.gen_range(1..constants::ANNOUNCE_INTERVAL_VARIATION_MS),
                    )
            }
            State::Released => return,
        };

        if let Some(token) = reservation.timer.take() {
            self.timers.cancel(token);
        }
        reservation.timer = Some(self.timers.push(now + delay, key));
    }

    fn send_probe(&mut self, key: Key) {
        self.send_range(key, MessageType::Probe);
    }

    fn send_announce(&mut self, key: Key) {
        self.send_range(key, MessageType::Announce);
    }

    fn send_range(&mut self, key: Key, kind: MessageType) {
        let Some((start, count)) = self.range_of(key) else {
            return;
        };

        let packet = MaapPacket::new(kind, self.config.dest_mac, self.config.src_mac)
            .with_request(start, count as u16);
        trace!(%kind, start = %MacAddr::new(start), count, "Queueing MAAP frame");
        self.egress_queue.push_back(packet.encode());
    }

    /// Answers `probe` with the part of its range that overlaps ours.
    fn send_defend(&mut self, key: Key, probe: &MaapPacket) {
        let Some((start, count)) = self.range_of(key) else {
            return;
        };

        let ours_last = start + count as u64 - 1;
        let theirs_last = probe.requested_start_address + probe.requested_count as u64 - 1;
        let conflict_start = start.max(probe.requested_start_address);
        let conflict_last = ours_last.min(theirs_last);

        let packet = MaapPacket::new(MessageType::Defend, probe.src, self.config.src_mac)
            .with_request(probe.requested_start_address, probe.requested_count)
            .with_conflict(conflict_start, (conflict_last - conflict_start + 1) as u16);
        trace!(
            remote = %probe.src,
            conflict_start = %MacAddr::new(conflict_start),
            conflict_count = packet.conflict_count,
            "Queueing MAAP defend"
        );
        self.egress_queue.push_back(packet.encode());
    }

    fn notify(&mut self, recipient: SenderId, notification: Notification) {
        trace!(%recipient, %notification, "Queueing notification");
        self.notifications.push(recipient, notification);
    }
}
