//! Deterministic event queue.
//!
//! A `BinaryHeap` with reversed `Ord` on [`QueueEntry`] acts as a min-heap
//! keyed by `(scheduled_at, admission)`. Admission numbers are handed out
//! by the scheduler itself, so two events due at the same time run in the
//! order they were admitted, not the order they were created.

use std::cmp::Ordering;
use std::collections::BinaryHeap;

use crate::event::{EventId, EventIdGen};
use crate::time::VirtualTime;

/// One admitted event waiting in the queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueueEntry {
    pub scheduled_at: VirtualTime,
    pub admission: u64,
    pub id: EventId,
}

/// Ordering: smallest `(scheduled_at, admission)` first.
///
/// `BinaryHeap` is a max-heap, so the natural ordering is reversed here.
impl Ord for QueueEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .scheduled_at
            .cmp(&self.scheduled_at)
            .then_with(|| other.admission.cmp(&self.admission))
    }
}

impl PartialOrd for QueueEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Owns the event queue, the id generator and the admission counter.
#[derive(Debug, Clone, Default)]
pub struct Scheduler {
    queue: BinaryHeap<QueueEntry>,
    id_gen: EventIdGen,
    admissions: u64,
}

impl Scheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mint a fresh event id. Does not touch the queue.
    pub fn mint_id(&mut self) -> EventId {
        self.id_gen.next_id()
    }

    /// Push an event into the queue and return its admission number.
    ///
    /// Causality is the caller's concern; the scheduler does not know the
    /// current time.
    pub fn admit(&mut self, id: EventId, scheduled_at: VirtualTime) -> u64 {
        let admission = self.admissions;
        self.admissions += 1;
        self.queue.push(QueueEntry { scheduled_at, admission, id });
        admission
    }

    /// Pop the next entry (earliest time, earliest admission).
    pub fn pop_next(&mut self) -> Option<QueueEntry> {
        self.queue.pop()
    }

    /// The entry `pop_next` would return, left in place.
    pub fn peek_next(&self) -> Option<&QueueEntry> {
        self.queue.peek()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    /// Number of admitted events not yet dispatched.
    pub fn len(&self) -> usize {
        self.queue.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn admit_new(sched: &mut Scheduler, at: u64) -> EventId {
        let id = sched.mint_id();
        sched.admit(id, VirtualTime::new(at));
        id
    }

    fn pop_all(sched: &mut Scheduler) -> Vec<QueueEntry> {
        std::iter::from_fn(|| sched.pop_next()).collect()
    }

    #[test]
    fn test_time_ordering() {
        let mut sched = Scheduler::new();
        admit_new(&mut sched, 30);
        admit_new(&mut sched, 10);
        admit_new(&mut sched, 20);

        let times: Vec<u64> = pop_all(&mut sched)
            .iter()
            .map(|e| e.scheduled_at.ticks())
            .collect();
        assert_eq!(times, vec![10, 20, 30]);
    }

    #[test]
    fn test_ties_follow_admission_not_creation() {
        let mut sched = Scheduler::new();
        let first_created = sched.mint_id();
        let second_created = sched.mint_id();

        // Admit in reverse creation order.
        sched.admit(second_created, VirtualTime::new(10));
        sched.admit(first_created, VirtualTime::new(10));

        assert_eq!(sched.pop_next().unwrap().id, second_created);
        assert_eq!(sched.pop_next().unwrap().id, first_created);
    }

    #[test]
    fn test_mixed_ordering() {
        let mut sched = Scheduler::new();
        for at in [50, 10, 10, 30, 10, 50, 0] {
            admit_new(&mut sched, at);
        }

        let entries = pop_all(&mut sched);
        for pair in entries.windows(2) {
            let (a, b) = (&pair[0], &pair[1]);
            assert!(
                (a.scheduled_at, a.admission) < (b.scheduled_at, b.admission),
                "entries out of order: {:?} vs {:?}",
                a,
                b
            );
        }
    }

    #[test]
    fn test_admit_while_draining() {
        // Admitting between pops must not disturb the order of what is
        // already queued.
        let mut sched = Scheduler::new();
        admit_new(&mut sched, 5);
        admit_new(&mut sched, 10);

        let first = sched.pop_next().unwrap();
        assert_eq!(first.scheduled_at, VirtualTime::new(5));

        let late = admit_new(&mut sched, 10);
        let early = admit_new(&mut sched, 7);

        assert_eq!(sched.pop_next().unwrap().id, early);
        assert_eq!(sched.pop_next().unwrap().scheduled_at, VirtualTime::new(10));
        assert_eq!(sched.pop_next().unwrap().id, late);
        assert!(sched.pop_next().is_none());
    }

    #[test]
    fn test_empty_scheduler() {
        let mut sched = Scheduler::new();
        assert!(sched.is_empty());
        assert_eq!(sched.len(), 0);
        assert!(sched.peek_next().is_none());
        assert!(sched.pop_next().is_none());
    }

    #[test]
    fn test_mint_does_not_queue() {
        let mut sched = Scheduler::new();
        assert_eq!(sched.mint_id(), EventId::new(0));
        assert_eq!(sched.mint_id(), EventId::new(1));
        assert!(sched.is_empty());
    }

    #[test]
    fn test_peek_leaves_entry_queued() {
        let mut sched = Scheduler::new();
        admit_new(&mut sched, 20);
        let due = admit_new(&mut sched, 5);

        assert_eq!(sched.peek_next().map(|e| e.id), Some(due));
        assert_eq!(sched.len(), 2);
        assert_eq!(sched.pop_next().unwrap().id, due);
    }
}
