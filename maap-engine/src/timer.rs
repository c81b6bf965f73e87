use std::{collections::BTreeMap, time::Instant};

/// Identifies one scheduled entry in a [`TimerQueue`], so it can be cancelled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub(crate) struct TimerToken {
    at: Instant,
    seq: u64,
}

impl TimerToken {
    pub(crate) fn deadline(&self) -> Instant {
        self.at
    }
}

/// Deadlines ordered by time. Entries with the same deadline fire in the order they were pushed.
#[derive(Debug)]
pub(crate) struct TimerQueue<K> {
    entries: BTreeMap<TimerToken, K>,
    seq: u64,
}

impl<K> Default for TimerQueue<K> {
    fn default() -> Self {
        Self { entries: BTreeMap::new(), seq: 0 }
    }
}

impl<K> TimerQueue<K> {
    pub(crate) fn push(&mut self, at: Instant, key: K) -> TimerToken {
        let token = TimerToken { at, seq: self.seq };
        self.seq += 1;
        self.entries.insert(token, key);
        token
    }

    pub(crate) fn cancel(&mut self, token: TimerToken) -> Option<K> {
        self.entries.remove(&token)
    }

    /// Pops the earliest entry if it is due at `now`.
    pub(crate) fn pop_due(&mut self, now: Instant) -> Option<K> {
        let (token, _) = self.entries.first_key_value()?;
        if token.at > now {
            return None;
        }

        self.entries.pop_first().map(|(_, key)| key)
    }

    pub(crate) fn next_deadline(&self) -> Option<Instant> {
        self.entries.first_key_value().map(|(token, _)| token.at)
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }

    pub(crate) fn clear(&mut self) {
        self.entries.clear();
    }
}
