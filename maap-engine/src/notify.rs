use std::collections::VecDeque;

use maap_wire::control::Notification;

/// Opaque tag naming who asked for something, so results can be routed back to them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct SenderId(pub u64);

impl SenderId {
    /// The daemon's own console.
    pub const CONSOLE: Self = Self(0);
}

impl std::fmt::Display for SenderId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "sender-{}", self.0)
    }
}

/// FIFO of pending notifications, each tagged with its recipient.
#[derive(Debug, Default)]
pub struct NotificationSink {
    queue: VecDeque<(SenderId, Notification)>,
}

impl NotificationSink {
    pub fn push(&mut self, recipient: SenderId, notification: Notification) {
        self.queue.push_back((recipient, notification));
    }

    pub fn pop(&mut self) -> Option<(SenderId, Notification)> {
        self.queue.pop_front()
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }
}
