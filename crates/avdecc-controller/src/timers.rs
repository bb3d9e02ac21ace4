//! The engine's deadline queue.
//!
//! One timer worker drives everything time-based: AECP and ACMP transaction
//! deadlines, the 1-second discovery sweep and the advertising cadence. The
//! queue is a min-heap keyed by deadline, with an insertion counter to keep
//! equal deadlines in registration order.

use avdecc_core::types::UniqueIdentifier;
use std::cmp::{Ordering, Reverse};
use std::collections::BinaryHeap;
use tokio::time::Instant;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum TimerEvent {
    AecpDeadline {
        target: UniqueIdentifier,
        sequence_id: u16,
        token: u64,
    },
    AcmpDeadline {
        sequence_id: u16,
    },
    DiscoverySweep,
    /// Advertising cadence tick. The epoch ties the tick to one
    /// enable_advertising call, so disabling or re-enabling kills the old
    /// chain instead of doubling it.
    Advertise {
        epoch: u64,
    },
}

struct Entry {
    deadline: Instant,
    order: u64,
    event: TimerEvent,
}

impl PartialEq for Entry {
    fn eq(&self, other: &Self) -> bool {
        self.deadline == other.deadline && self.order == other.order
    }
}

impl Eq for Entry {}

impl PartialOrd for Entry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Entry {
    fn cmp(&self, other: &Self) -> Ordering {
        self.deadline
            .cmp(&other.deadline)
            .then(self.order.cmp(&other.order))
    }
}

#[derive(Default)]
pub(crate) struct TimerQueue {
    heap: BinaryHeap<Reverse<Entry>>,
    counter: u64,
}

impl TimerQueue {
    pub fn push(&mut self, deadline: Instant, event: TimerEvent) {
        self.counter += 1;
        self.heap.push(Reverse(Entry {
            deadline,
            order: self.counter,
            event,
        }));
    }

    pub fn next_deadline(&self) -> Option<Instant> {
        self.heap.peek().map(|Reverse(entry)| entry.deadline)
    }

    /// Pops every event whose deadline has passed, earliest first.
    pub fn pop_due(&mut self, now: Instant) -> Vec<TimerEvent> {
        let mut due = Vec::new();
        while let Some(Reverse(entry)) = self.heap.peek() {
            if entry.deadline > now {
                break;
            }
            let Reverse(entry) = self.heap.pop().expect("peeked entry vanished");
            due.push(entry.event);
        }
        due
    }
}

#[cfg(test)]
mod tests {
    use super::{TimerEvent, TimerQueue};
    use tokio::time::{Duration, Instant};

    #[test]
    fn pops_in_deadline_order() {
        let mut queue = TimerQueue::default();
        let now = Instant::now();
        queue.push(
            now + Duration::from_millis(500),
            TimerEvent::Advertise { epoch: 1 },
        );
        queue.push(now + Duration::from_millis(250), TimerEvent::DiscoverySweep);
        queue.push(
            now + Duration::from_millis(250),
            TimerEvent::AcmpDeadline { sequence_id: 1 },
        );

        assert_eq!(
            queue.next_deadline(),
            Some(now + Duration::from_millis(250))
        );
        let due = queue.pop_due(now + Duration::from_millis(300));
        // Equal deadlines fire in registration order.
        assert_eq!(
            due,
            vec![
                TimerEvent::DiscoverySweep,
                TimerEvent::AcmpDeadline { sequence_id: 1 }
            ]
        );
        assert_eq!(queue.pop_due(now + Duration::from_millis(300)), vec![]);
        assert_eq!(
            queue.next_deadline(),
            Some(now + Duration::from_millis(500))
        );
    }
}
